//! Load-gated offload of batch computation with main-thread apply.
//!
//! Heavy per-batch computation (planning, pathing, regroup math) runs on
//! the blocking pool so the tick loop never stalls, but its results only
//! touch live state on the simulation thread. The [`WorkCoordinator`]
//! owns that handshake:
//!
//! 1. [`WorkCoordinator::submit`] consults the [`LoadProbe`] and
//!    [`ThrottlePolicy`]; over-load submissions are refused immediately so
//!    the caller can fall back to a synchronous path.
//! 2. Accepted work runs on `spawn_blocking`; a relay task forwards the
//!    finished result into the completion channel.
//! 3. The tick loop calls [`WorkCoordinator::drain_completions`] with
//!    exclusive access to live state; each completion's apply closure runs
//!    there, under a panic guard, and resolves the submitter's
//!    [`CompletionTicket`].
//!
//! # Design Principles
//!
//! - **State mutation stays single-threaded**: background work computes,
//!   the simulation thread applies. No completion ever holds a lock on
//!   live state.
//! - **Every ticket resolves**: panic, throttle, shutdown, or a dropped
//!   coordinator all settle the ticket rather than leaving a waiter
//!   hanging.
//! - **Panics are contained**: a panicking compute or apply marks that one
//!   work item [`WorkOutcome::Failed`] and the pipeline keeps going.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use menagerie_types::OwnerId;
use tokio::runtime::Handle;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, trace, warn};

use crate::telemetry::DispatchTelemetry;

// ---------------------------------------------------------------------------
// Load probing and throttling
// ---------------------------------------------------------------------------

/// Source of the current load factor, nominally `0.0` to `1.0`.
pub trait LoadProbe: Send + Sync {
    /// Sample the current load.
    fn load(&self) -> f64;
}

impl<F> LoadProbe for F
where
    F: Fn() -> f64 + Send + Sync,
{
    fn load(&self) -> f64 {
        self()
    }
}

/// Decides whether new background work may start at a given load.
pub trait ThrottlePolicy: Send + Sync {
    /// True when a submission at `load` should be accepted.
    fn admit(&self, load: f64) -> bool;
}

/// Load at or above which [`LoadThreshold`] refuses work by default.
pub const DEFAULT_MAX_LOAD: f64 = 0.85;

/// Admit work while load stays below a fixed ceiling.
#[derive(Debug, Clone, Copy)]
pub struct LoadThreshold {
    /// Load at or above which submissions are refused.
    pub max_load: f64,
}

impl LoadThreshold {
    /// Build a threshold policy with an explicit ceiling.
    pub const fn new(max_load: f64) -> Self {
        Self { max_load }
    }
}

impl Default for LoadThreshold {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_LOAD)
    }
}

impl ThrottlePolicy for LoadThreshold {
    fn admit(&self, load: f64) -> bool {
        load < self.max_load
    }
}

// ---------------------------------------------------------------------------
// Outcomes and tickets
// ---------------------------------------------------------------------------

/// Final fate of one submitted work item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkOutcome {
    /// Computed and applied to live state.
    Applied,
    /// Panicked during compute or apply; live state is untouched by it.
    Failed,
    /// Dropped without completing (shutdown, cancelled runtime).
    Rejected,
}

/// Why a submission was refused up front.
#[derive(Debug, thiserror::Error)]
pub enum SubmitError {
    /// The throttle policy refused the work at the sampled load.
    #[error("background work throttled at load {load:.2}")]
    Throttled {
        /// Load factor sampled at submission time.
        load: f64,
    },

    /// The coordinator has shut down and takes no new work.
    #[error("work coordinator is shut down")]
    ExecutorClosed,
}

impl SubmitError {
    /// True for the throttle case, where a synchronous fallback applies.
    pub const fn is_throttle(&self) -> bool {
        matches!(self, Self::Throttled { .. })
    }
}

/// Handle resolving to the [`WorkOutcome`] of one submission.
#[derive(Debug)]
pub struct CompletionTicket {
    rx: oneshot::Receiver<WorkOutcome>,
}

impl CompletionTicket {
    /// Wait for the final outcome. Resolves [`WorkOutcome::Rejected`] if
    /// the pipeline dropped the work without reporting.
    pub async fn outcome(self) -> WorkOutcome {
        self.rx.await.unwrap_or(WorkOutcome::Rejected)
    }

    /// Check for an outcome without waiting.
    pub fn try_outcome(&mut self) -> Option<WorkOutcome> {
        match self.rx.try_recv() {
            Ok(outcome) => Some(outcome),
            Err(oneshot::error::TryRecvError::Empty) => None,
            Err(oneshot::error::TryRecvError::Closed) => Some(WorkOutcome::Rejected),
        }
    }
}

/// A finished computation waiting to be applied on the simulation thread.
struct Completion<C> {
    /// Applies the computed result to live state.
    apply: Box<dyn FnOnce(&mut C) + Send>,
    /// Resolves the submitter's ticket once the apply step settles.
    done: oneshot::Sender<WorkOutcome>,
    /// Submission label, for logs.
    label: String,
    /// Owner the work was scoped to, if any.
    owner: Option<OwnerId>,
}

// ---------------------------------------------------------------------------
// WorkCoordinator
// ---------------------------------------------------------------------------

/// Offloads compute to the blocking pool and funnels results back to the
/// simulation thread.
pub struct WorkCoordinator<C> {
    probe: Arc<dyn LoadProbe>,
    policy: Arc<dyn ThrottlePolicy>,
    runtime: Handle,
    completions_tx: mpsc::UnboundedSender<Completion<C>>,
    completions_rx: mpsc::UnboundedReceiver<Completion<C>>,
    telemetry: Arc<DispatchTelemetry>,
    accepting: AtomicBool,
}

impl<C: 'static> WorkCoordinator<C> {
    /// Build a coordinator spawning onto `runtime`.
    pub fn new(
        runtime: Handle,
        probe: Arc<dyn LoadProbe>,
        policy: Arc<dyn ThrottlePolicy>,
        telemetry: Arc<DispatchTelemetry>,
    ) -> Self {
        let (completions_tx, completions_rx) = mpsc::unbounded_channel();
        Self {
            probe,
            policy,
            runtime,
            completions_tx,
            completions_rx,
            telemetry,
            accepting: AtomicBool::new(true),
        }
    }

    /// Submit one unit of background work.
    ///
    /// `compute` runs on the blocking pool; `apply` runs later, on the
    /// thread that calls [`WorkCoordinator::drain_completions`], with
    /// exclusive access to live state.
    ///
    /// # Errors
    ///
    /// [`SubmitError::Throttled`] when the policy refuses the sampled
    /// load -- callers should fall back to computing synchronously.
    /// [`SubmitError::ExecutorClosed`] after [`WorkCoordinator::shutdown`].
    pub fn submit<T, R, A>(
        &self,
        label: impl Into<String>,
        owner: Option<OwnerId>,
        compute: T,
        apply: A,
    ) -> Result<CompletionTicket, SubmitError>
    where
        T: FnOnce() -> R + Send + 'static,
        R: Send + 'static,
        A: FnOnce(&mut C, R) + Send + 'static,
    {
        if !self.accepting.load(Ordering::Acquire) {
            self.telemetry.record_rejected();
            return Err(SubmitError::ExecutorClosed);
        }
        let load = self.probe.load();
        if !self.policy.admit(load) {
            self.telemetry.record_throttled();
            debug!(load, "Throttled background work submission");
            return Err(SubmitError::Throttled { load });
        }

        let label = label.into();
        let (done_tx, done_rx) = oneshot::channel();
        let join = self.runtime.spawn_blocking(compute);
        let tx = self.completions_tx.clone();
        let telemetry = Arc::clone(&self.telemetry);
        let relay_label = label.clone();
        self.runtime.spawn(async move {
            match join.await {
                Ok(result) => {
                    let completion = Completion {
                        apply: Box::new(move |ctx: &mut C| apply(ctx, result)),
                        done: done_tx,
                        label: relay_label,
                        owner,
                    };
                    if let Err(returned) = tx.send(completion) {
                        // The coordinator is gone; settle the ticket so no
                        // waiter hangs.
                        telemetry.record_rejected();
                        let _ = returned.0.done.send(WorkOutcome::Rejected);
                    }
                }
                Err(join_error) if join_error.is_panic() => {
                    warn!(label = %relay_label, owner = ?owner, "Background compute panicked");
                    telemetry.record_failed();
                    let _ = done_tx.send(WorkOutcome::Failed);
                }
                Err(_) => {
                    telemetry.record_rejected();
                    let _ = done_tx.send(WorkOutcome::Rejected);
                }
            }
        });
        trace!(label = %label, load, "Submitted background work");
        Ok(CompletionTicket { rx: done_rx })
    }

    /// Submit work scoped to one owner's batch.
    pub fn submit_for_owner<T, R, A>(
        &self,
        label: impl Into<String>,
        owner: OwnerId,
        compute: T,
        apply: A,
    ) -> Result<CompletionTicket, SubmitError>
    where
        T: FnOnce() -> R + Send + 'static,
        R: Send + 'static,
        A: FnOnce(&mut C, R) + Send + 'static,
    {
        self.submit(label, Some(owner), compute, apply)
    }

    /// Submit work not tied to any owner.
    pub fn submit_standalone<T, R, A>(
        &self,
        label: impl Into<String>,
        compute: T,
        apply: A,
    ) -> Result<CompletionTicket, SubmitError>
    where
        T: FnOnce() -> R + Send + 'static,
        R: Send + 'static,
        A: FnOnce(&mut C, R) + Send + 'static,
    {
        self.submit(label, None, compute, apply)
    }

    /// Submit work whose result is compared against a precomputed
    /// baseline before applying.
    ///
    /// The computed result is authoritative and is what `apply` receives;
    /// a mismatch against `baseline` is logged and counted as shadow
    /// divergence. Used when validating an offloaded computation against
    /// the synchronous path it replaces.
    pub fn submit_shadow<T, R, A>(
        &self,
        label: impl Into<String>,
        owner: Option<OwnerId>,
        compute: T,
        baseline: R,
        apply: A,
    ) -> Result<CompletionTicket, SubmitError>
    where
        T: FnOnce() -> R + Send + 'static,
        R: PartialEq + core::fmt::Debug + Send + 'static,
        A: FnOnce(&mut C, R) + Send + 'static,
    {
        let telemetry = Arc::clone(&self.telemetry);
        let label = label.into();
        let shadow_label = label.clone();
        self.submit(label, owner, compute, move |ctx, result| {
            if result != baseline {
                warn!(label = %shadow_label, expected = ?baseline, computed = ?result,
                    "Shadow computation diverged from baseline");
                telemetry.record_shadow_divergence();
            }
            apply(ctx, result);
        })
    }

    /// Apply up to `max` queued completions against `ctx`.
    ///
    /// Each apply closure runs under a panic guard: a panic marks that
    /// completion [`WorkOutcome::Failed`] and draining continues. Returns
    /// the number of completions taken off the queue.
    pub fn drain_completions(&mut self, ctx: &mut C, max: usize) -> usize {
        let mut drained = 0_usize;
        while drained < max {
            let Ok(completion) = self.completions_rx.try_recv() else {
                break;
            };
            let Completion {
                apply,
                done,
                label,
                owner,
            } = completion;
            let outcome = match catch_unwind(AssertUnwindSafe(|| apply(ctx))) {
                Ok(()) => {
                    self.telemetry.record_applied();
                    WorkOutcome::Applied
                }
                Err(payload) => {
                    warn!(label = %label, owner = ?owner,
                        message = panic_message(payload.as_ref()),
                        "Completion apply panicked; live state unchanged for this work");
                    self.telemetry.record_failed();
                    WorkOutcome::Failed
                }
            };
            if done.send(outcome).is_err() {
                trace!(label = %label, "Completion ticket receiver dropped");
            }
            drained = drained.saturating_add(1);
        }
        drained
    }

    /// Completions queued and waiting for a drain.
    pub fn pending_completions(&self) -> usize {
        self.completions_rx.len()
    }

    /// The telemetry counters this coordinator feeds.
    pub const fn telemetry(&self) -> &Arc<DispatchTelemetry> {
        &self.telemetry
    }

    /// True until [`WorkCoordinator::shutdown`] is called.
    pub fn is_accepting(&self) -> bool {
        self.accepting.load(Ordering::Acquire)
    }

    /// Refuse all new work. In-flight work still completes and can be
    /// drained.
    pub fn shutdown(&self) {
        let was_accepting = self.accepting.swap(false, Ordering::AcqRel);
        if was_accepting {
            info!("Work coordinator shut down; refusing new submissions");
        }
    }
}

impl<C> core::fmt::Debug for WorkCoordinator<C> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("WorkCoordinator")
            .field("accepting", &self.accepting.load(Ordering::Acquire))
            .field("pending_completions", &self.completions_rx.len())
            .finish_non_exhaustive()
    }
}

/// Best-effort extraction of a panic payload's message.
fn panic_message(payload: &(dyn std::any::Any + Send)) -> &str {
    payload.downcast_ref::<&str>().map_or_else(
        || {
            payload
                .downcast_ref::<String>()
                .map_or("non-string panic payload", String::as_str)
        },
        |message| *message,
    )
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::time::Duration;

    use super::*;

    fn make_coordinator(load: f64) -> WorkCoordinator<u64> {
        WorkCoordinator::new(
            Handle::current(),
            Arc::new(move || load),
            Arc::new(LoadThreshold::default()),
            Arc::new(DispatchTelemetry::new()),
        )
    }

    /// Poll the drain until `want` completions have been applied.
    async fn drain_until(coordinator: &mut WorkCoordinator<u64>, ctx: &mut u64, want: usize) -> usize {
        let mut total = 0_usize;
        for _ in 0..200 {
            total += coordinator.drain_completions(ctx, want);
            if total >= want {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        total
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn computed_result_lands_in_context() {
        let mut coordinator = make_coordinator(0.1);
        let ticket = coordinator
            .submit("sum", None, || 40_u64 + 2, |ctx, result| *ctx = result)
            .unwrap();

        let mut ctx = 0_u64;
        assert_eq!(drain_until(&mut coordinator, &mut ctx, 1).await, 1);
        assert_eq!(ctx, 42);
        assert_eq!(ticket.outcome().await, WorkOutcome::Applied);
        assert_eq!(coordinator.telemetry().current().applied, 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn empty_result_still_applies_once() {
        let mut coordinator = make_coordinator(0.1);
        let ticket = coordinator
            .submit(
                "plan",
                None,
                || Option::<u64>::None,
                |ctx, plan| {
                    assert!(plan.is_none());
                    *ctx += 1;
                },
            )
            .unwrap();

        let mut ctx = 0_u64;
        assert_eq!(drain_until(&mut coordinator, &mut ctx, 1).await, 1);
        assert_eq!(ctx, 1);
        assert_eq!(ticket.outcome().await, WorkOutcome::Applied);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn throttle_refuses_before_spawning() {
        let coordinator = make_coordinator(0.95);
        let result = coordinator.submit("hot", None, || 1_u64, |ctx, v| *ctx = v);

        match result {
            Err(error) => {
                assert!(error.is_throttle());
                assert!(matches!(error, SubmitError::Throttled { load } if load > 0.9));
            }
            Ok(_) => panic!("expected throttled submission"),
        }
        assert_eq!(coordinator.telemetry().current().throttled, 1);
        assert_eq!(coordinator.pending_completions(), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn shutdown_refuses_new_work() {
        let coordinator = make_coordinator(0.1);
        coordinator.shutdown();
        assert!(!coordinator.is_accepting());

        let result = coordinator.submit("late", None, || 1_u64, |ctx, v| *ctx = v);
        assert!(matches!(result, Err(SubmitError::ExecutorClosed)));

        // Refusal lands in the rejected counter, not the throttled one.
        let report = coordinator.telemetry().current();
        assert_eq!(report.rejected, 1);
        assert_eq!(report.throttled, 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn compute_panic_resolves_ticket_failed() {
        let mut coordinator = make_coordinator(0.1);
        let ticket = coordinator
            .submit(
                "boom",
                None,
                || -> u64 { panic!("compute exploded") },
                |ctx, v| *ctx = v,
            )
            .unwrap();

        assert_eq!(ticket.outcome().await, WorkOutcome::Failed);
        assert_eq!(coordinator.telemetry().current().failed, 1);
        // Nothing reaches the completion queue for panicked compute.
        let mut ctx = 0_u64;
        assert_eq!(coordinator.drain_completions(&mut ctx, 16), 0);
        assert_eq!(ctx, 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn apply_panic_is_contained() {
        let mut coordinator = make_coordinator(0.1);
        let bad = coordinator
            .submit("bad-apply", None, || 7_u64, |_ctx, _v| panic!("apply exploded"))
            .unwrap();

        let mut ctx = 0_u64;
        assert_eq!(drain_until(&mut coordinator, &mut ctx, 1).await, 1);
        assert_eq!(bad.outcome().await, WorkOutcome::Failed);
        assert_eq!(ctx, 0);

        // The coordinator keeps working after a poisoned apply.
        let good = coordinator
            .submit("good", None, || 5_u64, |ctx, v| *ctx = v)
            .unwrap();
        assert_eq!(drain_until(&mut coordinator, &mut ctx, 1).await, 1);
        assert_eq!(good.outcome().await, WorkOutcome::Applied);
        assert_eq!(ctx, 5);

        let report = coordinator.telemetry().current();
        assert_eq!(report.failed, 1);
        assert_eq!(report.applied, 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn drain_respects_the_cap() {
        let mut coordinator = make_coordinator(0.1);
        for index in 0..3_u64 {
            coordinator
                .submit("burst", None, move || index, |ctx, v| *ctx += v)
                .unwrap();
        }

        // Wait until all three completions are queued.
        for _ in 0..200 {
            if coordinator.pending_completions() == 3 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        assert_eq!(coordinator.pending_completions(), 3);

        let mut ctx = 0_u64;
        assert_eq!(coordinator.drain_completions(&mut ctx, 2), 2);
        assert_eq!(coordinator.drain_completions(&mut ctx, 16), 1);
        assert_eq!(ctx, 0 + 1 + 2);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn shadow_divergence_is_counted_and_computed_result_wins() {
        let mut coordinator = make_coordinator(0.1);
        let ticket = coordinator
            .submit_shadow("shadow", None, || 11_u64, 10_u64, |ctx, v| *ctx = v)
            .unwrap();

        let mut ctx = 0_u64;
        assert_eq!(drain_until(&mut coordinator, &mut ctx, 1).await, 1);
        assert_eq!(ticket.outcome().await, WorkOutcome::Applied);
        assert_eq!(ctx, 11);
        assert_eq!(coordinator.telemetry().current().shadow_divergence, 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn shadow_agreement_counts_nothing() {
        let mut coordinator = make_coordinator(0.1);
        coordinator
            .submit_shadow("shadow", None, || 10_u64, 10_u64, |ctx, v| *ctx = v)
            .unwrap();

        let mut ctx = 0_u64;
        assert_eq!(drain_until(&mut coordinator, &mut ctx, 1).await, 1);
        assert_eq!(coordinator.telemetry().current().shadow_divergence, 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn dropping_the_coordinator_settles_tickets() {
        let coordinator = make_coordinator(0.1);
        let ticket = coordinator
            .submit("orphan", None, || 1_u64, |ctx, v| *ctx = v)
            .unwrap();

        drop(coordinator);
        assert_eq!(ticket.outcome().await, WorkOutcome::Rejected);
    }
}

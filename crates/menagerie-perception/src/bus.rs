//! Per-pet publish/subscribe router for stimulus events.
//!
//! One [`PerceptionBus`] belongs to one pet. Gameplay systems subscribe
//! either to every stimulus (broadcast) or to a single kind; producers call
//! [`PerceptionBus::publish`], which dispatches synchronously on the calling
//! thread -- there is no internal queue.
//!
//! # Design Principles
//!
//! - **Copy-on-write registration**: each subscribe builds a new backing
//!   `Arc<[listener]>` and swaps it in under a brief write lock. Publish
//!   clones the current `Arc` (no allocation, no lock held while
//!   dispatching), so a slow listener never blocks registration and a
//!   subscribe during dispatch never mutates the array being walked.
//! - **Deterministic order**: broadcast listeners run first in registration
//!   order, then the kind-keyed listeners for the stimulus kind in
//!   registration order.
//! - **Failure isolation**: a listener returning an error is logged and
//!   counted; dispatch always continues with the remaining listeners.

use std::collections::BTreeMap;
use std::sync::{Arc, PoisonError, RwLock};

use menagerie_types::{Stimulus, StimulusKind};
use tracing::warn;

/// What a listener reports back to the bus.
pub type ListenerResult = Result<(), ListenerError>;

/// Failure reported by a listener; logged by the bus, never propagated.
#[derive(Debug, thiserror::Error)]
#[error("{message}")]
pub struct ListenerError {
    /// Human-readable description of the failure.
    message: String,
}

impl ListenerError {
    /// Wrap a failure description.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Boxed listener callback shared by the copy-on-write arrays.
type ListenerFn = dyn Fn(&Stimulus) -> ListenerResult + Send + Sync;

/// One immutable listener array generation.
type ListenerList = Arc<[Arc<ListenerFn>]>;

/// Per-publish delivery accounting.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchStats {
    /// Listeners that ran and returned `Ok`.
    pub delivered: usize,
    /// Listeners that ran and returned an error.
    pub failed: usize,
}

impl DispatchStats {
    /// Fold another stats value into this one.
    pub const fn merge(&mut self, other: Self) {
        self.delivered = self.delivered.saturating_add(other.delivered);
        self.failed = self.failed.saturating_add(other.failed);
    }

    /// Total listeners that ran.
    pub const fn total(self) -> usize {
        self.delivered.saturating_add(self.failed)
    }
}

/// Publish/subscribe router for one pet's stimuli.
pub struct PerceptionBus {
    /// Listeners receiving every stimulus, in registration order.
    broadcast: RwLock<ListenerList>,
    /// Kind-keyed listeners, each list in registration order.
    by_kind: RwLock<BTreeMap<StimulusKind, ListenerList>>,
}

fn empty_list() -> ListenerList {
    Arc::from(Vec::new())
}

impl PerceptionBus {
    /// Create a bus with no listeners.
    pub fn new() -> Self {
        Self {
            broadcast: RwLock::new(empty_list()),
            by_kind: RwLock::new(BTreeMap::new()),
        }
    }

    /// Register a listener for one stimulus kind.
    ///
    /// Builds a new backing array and swaps it in; in-flight publishes keep
    /// dispatching over the array they already cloned.
    pub fn subscribe<F>(&self, kind: StimulusKind, listener: F)
    where
        F: Fn(&Stimulus) -> ListenerResult + Send + Sync + 'static,
    {
        let mut map = self
            .by_kind
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        let current = map.get(&kind).cloned().unwrap_or_else(empty_list);
        map.insert(kind, appended(&current, Arc::new(listener)));
    }

    /// Register a listener for every stimulus regardless of kind.
    pub fn subscribe_all<F>(&self, listener: F)
    where
        F: Fn(&Stimulus) -> ListenerResult + Send + Sync + 'static,
    {
        let mut list = self
            .broadcast
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        *list = appended(&list, Arc::new(listener));
    }

    /// Dispatch a stimulus synchronously to all matching listeners.
    ///
    /// Broadcast listeners run first, then the kind-keyed listeners for
    /// `stimulus.kind`. A failing listener is logged and counted but never
    /// stops delivery to the listeners after it.
    pub fn publish(&self, stimulus: &Stimulus) -> DispatchStats {
        let broadcast = self
            .broadcast
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        let keyed = self
            .by_kind
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&stimulus.kind)
            .cloned();

        let mut stats = DispatchStats::default();
        for listener in broadcast.iter() {
            run_listener(listener, stimulus, &mut stats);
        }
        if let Some(list) = keyed {
            for listener in list.iter() {
                run_listener(listener, stimulus, &mut stats);
            }
        }
        stats
    }

    /// Drop every listener, broadcast and kind-keyed alike.
    pub fn clear(&self) {
        *self
            .broadcast
            .write()
            .unwrap_or_else(PoisonError::into_inner) = empty_list();
        self.by_kind
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    /// Total registered listeners across broadcast and all kinds.
    pub fn listener_count(&self) -> usize {
        let broadcast = self
            .broadcast
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len();
        let keyed: usize = self
            .by_kind
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .map(|list| list.len())
            .sum();
        broadcast.saturating_add(keyed)
    }
}

impl Default for PerceptionBus {
    fn default() -> Self {
        Self::new()
    }
}

impl core::fmt::Debug for PerceptionBus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("PerceptionBus")
            .field("listener_count", &self.listener_count())
            .finish_non_exhaustive()
    }
}

/// Build a new array generation with one listener appended.
fn appended(current: &ListenerList, listener: Arc<ListenerFn>) -> ListenerList {
    let mut next: Vec<Arc<ListenerFn>> = Vec::with_capacity(current.len().saturating_add(1));
    next.extend(current.iter().cloned());
    next.push(listener);
    Arc::from(next)
}

/// Run one listener, folding the outcome into `stats`.
fn run_listener(listener: &Arc<ListenerFn>, stimulus: &Stimulus, stats: &mut DispatchStats) {
    match listener(stimulus) {
        Ok(()) => stats.delivered = stats.delivered.saturating_add(1),
        Err(error) => {
            warn!(kind = %stimulus.kind, tick = stimulus.tick, error = %error,
                "Perception listener failed; continuing dispatch");
            stats.failed = stats.failed.saturating_add(1);
        }
    }
}

//! Lock-free counters for the background work pipeline.
//!
//! One [`DispatchTelemetry`] is shared (via `Arc`) between the coordinator,
//! its relay tasks, and whoever reports metrics. Counters only ever
//! increment; [`DispatchTelemetry::snapshot_and_reset`] atomically swaps
//! each one to zero so periodic reporting never double-counts.

use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Shared counters incremented across threads without locking.
#[derive(Debug, Default)]
pub struct DispatchTelemetry {
    /// Submissions refused up front by the throttle policy.
    throttled: AtomicU64,
    /// Work that never produced a completion (runtime shutdown, cancelled).
    rejected: AtomicU64,
    /// Completions whose apply step ran to the end.
    applied: AtomicU64,
    /// Work that panicked, in compute or in apply.
    failed: AtomicU64,
    /// Shadow comparisons where the computed result differed from the
    /// baseline.
    shadow_divergence: AtomicU64,
}

impl DispatchTelemetry {
    /// Create zeroed counters.
    pub const fn new() -> Self {
        Self {
            throttled: AtomicU64::new(0),
            rejected: AtomicU64::new(0),
            applied: AtomicU64::new(0),
            failed: AtomicU64::new(0),
            shadow_divergence: AtomicU64::new(0),
        }
    }

    /// Count a submission refused by the throttle policy.
    pub fn record_throttled(&self) {
        self.throttled.fetch_add(1, Ordering::AcqRel);
    }

    /// Count work that was accepted but never completed.
    pub fn record_rejected(&self) {
        self.rejected.fetch_add(1, Ordering::AcqRel);
    }

    /// Count a completion applied to live state.
    pub fn record_applied(&self) {
        self.applied.fetch_add(1, Ordering::AcqRel);
    }

    /// Count work that panicked.
    pub fn record_failed(&self) {
        self.failed.fetch_add(1, Ordering::AcqRel);
    }

    /// Count a shadow comparison that diverged.
    pub fn record_shadow_divergence(&self) {
        self.shadow_divergence.fetch_add(1, Ordering::AcqRel);
    }

    /// Read every counter without resetting, for spot checks.
    pub fn current(&self) -> TelemetryReport {
        TelemetryReport {
            captured_at: Utc::now(),
            throttled: self.throttled.load(Ordering::Acquire),
            rejected: self.rejected.load(Ordering::Acquire),
            applied: self.applied.load(Ordering::Acquire),
            failed: self.failed.load(Ordering::Acquire),
            shadow_divergence: self.shadow_divergence.load(Ordering::Acquire),
        }
    }

    /// Capture every counter and zero it in the same atomic step, so
    /// back-to-back reports partition increments exactly.
    pub fn snapshot_and_reset(&self) -> TelemetryReport {
        TelemetryReport {
            captured_at: Utc::now(),
            throttled: self.throttled.swap(0, Ordering::AcqRel),
            rejected: self.rejected.swap(0, Ordering::AcqRel),
            applied: self.applied.swap(0, Ordering::AcqRel),
            failed: self.failed.swap(0, Ordering::AcqRel),
            shadow_divergence: self.shadow_divergence.swap(0, Ordering::AcqRel),
        }
    }
}

/// Point-in-time counter values, ready for structured logging.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct TelemetryReport {
    /// When the counters were read.
    pub captured_at: DateTime<Utc>,
    /// Submissions refused up front by the throttle policy.
    pub throttled: u64,
    /// Work that never produced a completion.
    pub rejected: u64,
    /// Completions applied to live state.
    pub applied: u64,
    /// Work that panicked.
    pub failed: u64,
    /// Shadow comparisons that diverged.
    pub shadow_divergence: u64,
}

impl TelemetryReport {
    /// True when any counter is nonzero; quiet intervals skip logging.
    pub const fn has_activity(&self) -> bool {
        self.throttled != 0
            || self.rejected != 0
            || self.applied != 0
            || self.failed != 0
            || self.shadow_divergence != 0
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use super::*;

    #[test]
    fn counters_accumulate() {
        let telemetry = DispatchTelemetry::new();
        telemetry.record_applied();
        telemetry.record_applied();
        telemetry.record_throttled();
        telemetry.record_failed();

        let report = telemetry.current();
        assert_eq!(report.applied, 2);
        assert_eq!(report.throttled, 1);
        assert_eq!(report.failed, 1);
        assert_eq!(report.rejected, 0);
        assert!(report.has_activity());
    }

    #[test]
    fn snapshot_and_reset_partitions_increments() {
        let telemetry = DispatchTelemetry::new();
        telemetry.record_applied();
        telemetry.record_shadow_divergence();

        let first = telemetry.snapshot_and_reset();
        assert_eq!(first.applied, 1);
        assert_eq!(first.shadow_divergence, 1);

        let second = telemetry.snapshot_and_reset();
        assert_eq!(second.applied, 0);
        assert_eq!(second.shadow_divergence, 0);
        assert!(!second.has_activity());
    }

    #[test]
    fn current_leaves_counters_intact() {
        let telemetry = DispatchTelemetry::new();
        telemetry.record_rejected();
        assert_eq!(telemetry.current().rejected, 1);
        assert_eq!(telemetry.current().rejected, 1);
    }

    #[test]
    fn increments_from_many_threads_all_land() {
        let telemetry = Arc::new(DispatchTelemetry::new());
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let telemetry = Arc::clone(&telemetry);
                std::thread::spawn(move || {
                    for _ in 0..100 {
                        telemetry.record_applied();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(telemetry.current().applied, 400);
    }

    #[test]
    fn report_serializes_for_structured_logs() {
        let telemetry = DispatchTelemetry::new();
        telemetry.record_applied();
        let json = serde_json::to_value(telemetry.current()).unwrap();
        assert_eq!(json.get("applied").unwrap().as_u64(), Some(1));
        assert!(json.get("captured_at").is_some());
    }
}

//! Owner-scoped task dispatch for the Menagerie simulation.
//!
//! Scheduled work flows through this crate in a fixed shape: pets are
//! tracked to owners by the [`ProcessingManager`], tasks queue in each
//! owner's [`ProcessingGroup`], the tick loop drains due tasks into a
//! [`TaskBatch`], wraps batch plus snapshot in an [`EventFrame`], and
//! hands heavy computation to the [`WorkCoordinator`] -- which brings
//! results back to the simulation thread before any state changes.
//!
//! # Modules
//!
//! - [`group`] -- Per-owner membership and kind-ordered FIFO task queues.
//! - [`manager`] -- Pet-to-owner tracking and the owner-keyed group table.
//! - [`frame`] -- Short-lived per-event context bundling batch, snapshot,
//!   and payload.
//! - [`coordinator`] -- Load-gated blocking-pool offload with
//!   main-thread apply and per-work panic containment.
//! - [`telemetry`] -- Lock-free counters and periodic report snapshots.

pub mod coordinator;
pub mod frame;
pub mod group;
pub mod manager;
pub mod telemetry;

// Re-export primary types at crate root.
pub use coordinator::{
    CompletionTicket, DEFAULT_MAX_LOAD, LoadProbe, LoadThreshold, SubmitError, ThrottlePolicy,
    WorkCoordinator, WorkOutcome,
};
pub use frame::{EventFrame, FrameKind};
pub use group::{ProcessingGroup, TaskBatch};
pub use manager::{DispatchError, ProcessingManager};
pub use telemetry::{DispatchTelemetry, TelemetryReport};

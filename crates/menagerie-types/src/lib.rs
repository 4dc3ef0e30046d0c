//! Shared type definitions for the Menagerie companion-agent simulation.
//!
//! This crate is the single source of truth for the data types that flow
//! through the perception and dispatch pipeline. It holds no behavior beyond
//! constructors and invariant enforcement; the stateful services live in
//! `menagerie-perception` and `menagerie-dispatch`.
//!
//! # Modules
//!
//! - [`ids`] -- Type-safe UUID wrappers for pet and owner handles
//! - [`slice`] -- Context slices and the immutable bitmask over them
//! - [`stimulus`] -- Stimulus events and their materialized snapshot form
//! - [`snapshot`] -- Immutable per-dispatch batch captures
//! - [`task`] -- Scheduled background task types

pub mod ids;
pub mod slice;
pub mod snapshot;
pub mod stimulus;
pub mod task;

// Re-export all public types at crate root for convenience.
pub use ids::{OwnerId, PetId};
pub use slice::{ContextSlice, SliceMask};
pub use snapshot::{BatchSnapshot, PetSummary, Position};
pub use stimulus::{Stimulus, StimulusError, StimulusKind, StimulusRecord, StimulusSnapshot};
pub use task::{ScheduledTask, TaskKind};

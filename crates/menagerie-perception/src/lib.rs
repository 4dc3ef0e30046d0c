//! Per-pet perception: stimulus routing, context caching, and history.
//!
//! This crate owns the reactive side of a pet -- how world events reach it
//! and what it remembers about them. Producers hand a [`Stimulus`] to the
//! [`PerceptionRegistry`]; for each targeted pet the registry invalidates
//! the pet's [`ContextCache`] slices, appends to its [`StimulusTimeline`],
//! and fans out to [`PerceptionBus`] listeners.
//!
//! # Modules
//!
//! - [`bus`] -- Synchronous publish/subscribe with copy-on-write listener
//!   arrays and per-listener failure isolation.
//! - [`cache`] -- Dirty-slice-tracked snapshot cache with an idle-refresh
//!   budget.
//! - [`timeline`] -- Bounded, TTL-trimmed stimulus history with tick-aged
//!   read views.
//! - [`registry`] -- One perception bundle per pet, keyed by [`PetId`],
//!   with single and fan-out routing.
//!
//! [`Stimulus`]: menagerie_types::Stimulus
//! [`PetId`]: menagerie_types::PetId

pub mod bus;
pub mod cache;
pub mod registry;
pub mod timeline;

// Re-export primary types at crate root.
pub use bus::{DispatchStats, ListenerError, ListenerResult, PerceptionBus};
pub use cache::{ContextCache, DEFAULT_MAX_IDLE_TICKS};
pub use registry::{PerceptionConfig, PerceptionError, PerceptionRegistry, PetPerception};
pub use timeline::{DEFAULT_CAPACITY, DEFAULT_TTL_TICKS, StimulusTimeline};

//! Short-lived processing context for one owner-scoped event.
//!
//! An [`EventFrame`] bundles everything a worker needs to process one
//! event against one owner's pets: the event kind, the affected context
//! slices, the drained [`TaskBatch`] (if the event carries scheduled
//! work), an immutable [`BatchSnapshot`] of the owner's pets, and an
//! optional free-form payload. Frames are cheap to build, live for the
//! duration of one dispatch, and log their own lifetime on drop so slow
//! event handling shows up in traces without extra plumbing.

use std::sync::Arc;
use std::time::{Duration, Instant};

use menagerie_types::{BatchSnapshot, OwnerId, PetId, SliceMask};
use serde_json::Value;
use tracing::trace;

use crate::group::TaskBatch;

/// What kind of event a frame was opened for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum FrameKind {
    /// A pet or crowd moved.
    Movement,
    /// A pet took or dealt damage.
    Damage,
    /// An ability fired and needs follow-up bookkeeping.
    AbilityTrigger,
    /// A whole-swarm state change affecting every pet of the owner.
    SwarmUpdate,
}

impl FrameKind {
    /// Stable lowercase name, used in logs.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Movement => "movement",
            Self::Damage => "damage",
            Self::AbilityTrigger => "ability_trigger",
            Self::SwarmUpdate => "swarm_update",
        }
    }
}

impl core::fmt::Display for FrameKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.name())
    }
}

/// Everything one event dispatch needs, assembled once and dropped when
/// the dispatch finishes.
#[derive(Debug)]
pub struct EventFrame {
    kind: FrameKind,
    owner: OwnerId,
    pets: Vec<PetId>,
    slices: SliceMask,
    tick: u64,
    batch: Option<TaskBatch>,
    snapshot: Arc<BatchSnapshot>,
    extra: Option<Value>,
    opened: Instant,
}

impl EventFrame {
    /// Open a frame around a snapshot and optional drained batch.
    ///
    /// The owner and tick come from the snapshot. The involved pets come
    /// from the batch when it carries tasks, otherwise every pet in the
    /// snapshot is considered involved.
    pub fn obtain(
        kind: FrameKind,
        slices: SliceMask,
        batch: Option<TaskBatch>,
        snapshot: Arc<BatchSnapshot>,
        extra: Option<Value>,
    ) -> Self {
        let owner = snapshot.owner();
        let tick = snapshot.tick();
        let pets = match &batch {
            Some(drained) if !drained.is_empty() => drained.pet_ids(),
            _ => snapshot.pet_ids(),
        };
        trace!(kind = %kind, owner = %owner, tick, pets = pets.len(), "Opened event frame");
        Self {
            kind,
            owner,
            pets,
            slices,
            tick,
            batch,
            snapshot,
            extra,
            opened: Instant::now(),
        }
    }

    /// The event kind this frame was opened for.
    pub const fn kind(&self) -> FrameKind {
        self.kind
    }

    /// The owner whose pets this frame covers.
    pub const fn owner(&self) -> OwnerId {
        self.owner
    }

    /// The tick the frame's snapshot was captured at.
    pub const fn tick(&self) -> u64 {
        self.tick
    }

    /// Context slices the event touches.
    pub const fn slices(&self) -> SliceMask {
        self.slices
    }

    /// Pets involved in the event, in sorted order.
    pub fn pets(&self) -> &[PetId] {
        &self.pets
    }

    /// The drained batch, if the event carries scheduled work.
    pub const fn batch(&self) -> Option<&TaskBatch> {
        self.batch.as_ref()
    }

    /// Take the batch out of the frame, leaving `None` behind.
    pub const fn take_batch(&mut self) -> Option<TaskBatch> {
        self.batch.take()
    }

    /// Borrow the immutable pet snapshot.
    pub fn snapshot(&self) -> &BatchSnapshot {
        &self.snapshot
    }

    /// Clone the snapshot handle for a background worker; the data
    /// outlives the frame as long as any handle does.
    pub fn share_snapshot(&self) -> Arc<BatchSnapshot> {
        Arc::clone(&self.snapshot)
    }

    /// Free-form event payload, if the producer attached one.
    pub const fn extra(&self) -> Option<&Value> {
        self.extra.as_ref()
    }

    /// How long the frame has been open.
    pub fn held(&self) -> Duration {
        self.opened.elapsed()
    }
}

impl Drop for EventFrame {
    fn drop(&mut self) {
        let held_ms = u64::try_from(self.opened.elapsed().as_millis()).unwrap_or(u64::MAX);
        trace!(kind = %self.kind, owner = %self.owner, tick = self.tick, held_ms,
            "Released event frame");
    }
}

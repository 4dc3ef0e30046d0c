//! Scheduled background task types.
//!
//! Tasks are the deferred-work currency of the pipeline: an external
//! scheduler mints a [`ScheduledTask`] for a pet, the per-owner processing
//! group queues it, and a later drain delivers it exactly once.

use serde::{Deserialize, Serialize};

use crate::ids::PetId;

/// Kinds of deferred per-pet work the processing groups carry.
///
/// The set is closed: each kind gets its own pending queue inside a group,
/// so drains interleave kinds without reordering within one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum TaskKind {
    /// Re-evaluate goal priorities from a fresh context snapshot.
    GoalPlanning,
    /// Expire cooldowns and recharge ability budgets.
    AbilityMaintenance,
    /// Age relationship edges toward their resting values.
    SocialDecay,
    /// Age raw emotion accumulators toward neutral.
    EmotionDecay,
}

impl TaskKind {
    /// Every kind in declaration order.
    pub const VARIANTS: [Self; 4] = [
        Self::GoalPlanning,
        Self::AbilityMaintenance,
        Self::SocialDecay,
        Self::EmotionDecay,
    ];

    /// Stable lowercase name used in logs.
    pub const fn name(self) -> &'static str {
        match self {
            Self::GoalPlanning => "goal_planning",
            Self::AbilityMaintenance => "ability_maintenance",
            Self::SocialDecay => "social_decay",
            Self::EmotionDecay => "emotion_decay",
        }
    }
}

impl core::fmt::Display for TaskKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.name())
    }
}

/// One unit of deferred work for one pet.
///
/// Lifecycle: created by a scheduler, enqueued into exactly one processing
/// group (the pet's owner's), delivered at most once by a drain, then
/// discarded. The pet handle doubles as the component key for pruning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduledTask {
    /// The pet this work is for.
    pub pet: PetId,
    /// What kind of work to run.
    pub kind: TaskKind,
    /// Earliest tick at which a drain may deliver this task.
    pub due_tick: u64,
}

impl ScheduledTask {
    /// Build a task.
    pub const fn new(pet: PetId, kind: TaskKind, due_tick: u64) -> Self {
        Self {
            pet,
            kind,
            due_tick,
        }
    }

    /// Whether the task may be delivered at `tick`.
    pub const fn is_due(&self, tick: u64) -> bool {
        self.due_tick <= tick
    }
}

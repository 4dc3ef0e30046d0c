//! Owner-scoped task grouping and due-task batching.
//!
//! Every pet belongs to exactly one owner, and all of a pet's scheduled
//! work funnels through its owner's [`ProcessingGroup`]. The group keeps
//! one FIFO queue per [`TaskKind`] and hands out work through
//! [`ProcessingGroup::drain`], which collects due tasks into a
//! [`TaskBatch`] -- the unit the rest of the pipeline operates on.
//!
//! # Design Principles
//!
//! - **Arrival order is the contract**: within a kind, tasks leave in the
//!   order they were enqueued. A task that is not yet due blocks everything
//!   behind it in the same queue, even later arrivals that already qualify.
//! - **Cursor drain, deferred compaction**: popping the front of a `Vec`
//!   per task would be quadratic, so drained entries stay in place behind a
//!   cursor and the backing vector resets once fully consumed.

use std::collections::{BTreeMap, BTreeSet};

use menagerie_types::{OwnerId, PetId, ScheduledTask, TaskKind};
use tracing::trace;

// ---------------------------------------------------------------------------
// TaskQueue
// ---------------------------------------------------------------------------

/// FIFO queue for one task kind, drained with a moving cursor.
#[derive(Debug, Default)]
struct TaskQueue {
    /// Stored tasks; entries before `cursor` have already been drained.
    tasks: Vec<ScheduledTask>,
    /// Index of the next undrained entry.
    cursor: usize,
}

impl TaskQueue {
    fn enqueue(&mut self, task: ScheduledTask) {
        self.tasks.push(task);
    }

    /// Entries not yet drained.
    fn pending(&self) -> usize {
        self.tasks.len().saturating_sub(self.cursor)
    }

    /// Move up to `room` due tasks into `out`, in arrival order.
    ///
    /// Stops at the first task that is not yet due; later arrivals stay
    /// queued behind it regardless of their own due ticks.
    fn drain_into(
        &mut self,
        out: &mut Vec<ScheduledTask>,
        current_tick: u64,
        room: usize,
    ) -> usize {
        let mut drained = 0_usize;
        while drained < room {
            let Some(task) = self.tasks.get(self.cursor) else {
                break;
            };
            if !task.is_due(current_tick) {
                break;
            }
            out.push(*task);
            self.cursor = self.cursor.saturating_add(1);
            drained = drained.saturating_add(1);
        }
        self.compact_if_consumed();
        drained
    }

    /// Drop every task belonging to `pet`, keeping the cursor aligned
    /// with the surviving entries.
    ///
    /// Already-drained leftovers are swept out as well but do not count
    /// toward the returned total: the count is undelivered tasks only.
    fn prune_pet(&mut self, pet: PetId) -> usize {
        let old = std::mem::take(&mut self.tasks);
        let mut kept = Vec::with_capacity(old.len());
        let mut removed = 0_usize;
        let mut removed_before_cursor = 0_usize;
        for (index, task) in old.into_iter().enumerate() {
            if task.pet == pet {
                removed = removed.saturating_add(1);
                if index < self.cursor {
                    removed_before_cursor = removed_before_cursor.saturating_add(1);
                }
            } else {
                kept.push(task);
            }
        }
        self.tasks = kept;
        self.cursor = self.cursor.saturating_sub(removed_before_cursor);
        self.compact_if_consumed();
        removed.saturating_sub(removed_before_cursor)
    }

    fn compact_if_consumed(&mut self) {
        if self.cursor >= self.tasks.len() {
            self.tasks.clear();
            self.cursor = 0;
        }
    }

    fn is_unused(&self) -> bool {
        self.tasks.is_empty()
    }
}

// ---------------------------------------------------------------------------
// ProcessingGroup
// ---------------------------------------------------------------------------

/// One owner's member pets and their per-kind task queues.
#[derive(Debug)]
pub struct ProcessingGroup {
    /// The owner this group belongs to.
    owner: OwnerId,
    /// Pets currently assigned to this owner.
    members: BTreeSet<PetId>,
    /// Per-kind queues, visited in [`TaskKind`] order during a drain.
    queues: BTreeMap<TaskKind, TaskQueue>,
}

impl ProcessingGroup {
    /// Create an empty group for `owner`.
    pub const fn new(owner: OwnerId) -> Self {
        Self {
            owner,
            members: BTreeSet::new(),
            queues: BTreeMap::new(),
        }
    }

    /// The owner this group belongs to.
    pub const fn owner(&self) -> OwnerId {
        self.owner
    }

    /// Add a pet. Returns false if it was already a member.
    pub fn add_member(&mut self, pet: PetId) -> bool {
        self.members.insert(pet)
    }

    /// Remove a pet, dropping its queued tasks.
    ///
    /// Returns the number of tasks pruned, or `None` if the pet was not a
    /// member.
    pub fn remove_member(&mut self, pet: PetId) -> Option<usize> {
        if !self.members.remove(&pet) {
            return None;
        }
        Some(self.prune_pet(pet))
    }

    /// True when `pet` is a member of this group.
    pub fn has_member(&self, pet: PetId) -> bool {
        self.members.contains(&pet)
    }

    /// Number of member pets.
    pub fn member_count(&self) -> usize {
        self.members.len()
    }

    /// Member pet ids in sorted order.
    pub fn member_ids(&self) -> Vec<PetId> {
        self.members.iter().copied().collect()
    }

    /// Append a task to its kind's queue.
    pub fn enqueue(&mut self, task: ScheduledTask) {
        self.queues.entry(task.kind).or_default().enqueue(task);
    }

    /// Tasks waiting across every kind.
    pub fn pending_tasks(&self) -> usize {
        self.queues
            .values()
            .fold(0_usize, |acc, queue| acc.saturating_add(queue.pending()))
    }

    /// True when the group has no members and no queued work.
    pub fn is_idle(&self) -> bool {
        self.members.is_empty() && self.pending_tasks() == 0
    }

    /// Collect up to `max_tasks` due tasks into a batch, removing them
    /// from their queues.
    ///
    /// Kinds are visited in [`TaskKind`] order; within a kind, arrival
    /// order holds. The returned batch may be empty.
    pub fn drain(&mut self, current_tick: u64, max_tasks: usize) -> TaskBatch {
        let mut tasks = Vec::new();
        for queue in self.queues.values_mut() {
            let room = max_tasks.saturating_sub(tasks.len());
            if room == 0 {
                break;
            }
            queue.drain_into(&mut tasks, current_tick, room);
        }
        self.queues.retain(|_, queue| !queue.is_unused());
        if !tasks.is_empty() {
            trace!(owner = %self.owner, tick = current_tick, count = tasks.len(),
                "Drained due tasks");
        }
        TaskBatch::new(self.owner, current_tick, tasks)
    }

    /// Drop every queued task belonging to `pet` across all kinds.
    fn prune_pet(&mut self, pet: PetId) -> usize {
        let mut removed = 0_usize;
        for queue in self.queues.values_mut() {
            removed = removed.saturating_add(queue.prune_pet(pet));
        }
        self.queues.retain(|_, queue| !queue.is_unused());
        removed
    }
}

// ---------------------------------------------------------------------------
// TaskBatch
// ---------------------------------------------------------------------------

/// The due tasks drained from one owner's group at one tick.
#[derive(Debug, Clone)]
pub struct TaskBatch {
    owner: OwnerId,
    tick: u64,
    tasks: Vec<ScheduledTask>,
}

impl TaskBatch {
    /// Assemble a batch from already-drained tasks.
    pub const fn new(owner: OwnerId, tick: u64, tasks: Vec<ScheduledTask>) -> Self {
        Self { owner, tick, tasks }
    }

    /// The owner whose group was drained.
    pub const fn owner(&self) -> OwnerId {
        self.owner
    }

    /// The tick the drain ran at.
    pub const fn tick(&self) -> u64 {
        self.tick
    }

    /// Number of tasks in the batch.
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    /// True when the drain found nothing due.
    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// The drained tasks, kind-ordered then arrival-ordered.
    pub fn tasks(&self) -> &[ScheduledTask] {
        &self.tasks
    }

    /// Consume the batch, yielding its tasks.
    pub fn into_tasks(self) -> Vec<ScheduledTask> {
        self.tasks
    }

    /// Distinct pets named by the batch, in sorted order.
    pub fn pet_ids(&self) -> Vec<PetId> {
        let unique: BTreeSet<PetId> = self.tasks.iter().map(|task| task.pet).collect();
        unique.into_iter().collect()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn make_task(pet: PetId, kind: TaskKind, due_tick: u64) -> ScheduledTask {
        ScheduledTask::new(pet, kind, due_tick)
    }

    #[test]
    fn drain_preserves_arrival_order_within_kind() {
        let mut group = ProcessingGroup::new(OwnerId::new());
        let pet = PetId::new();
        group.add_member(pet);
        for due in [3, 1, 2] {
            group.enqueue(make_task(pet, TaskKind::GoalPlanning, due));
        }

        let batch = group.drain(10, 16);
        let dues: Vec<u64> = batch.tasks().iter().map(|t| t.due_tick).collect();
        assert_eq!(dues, vec![3, 1, 2]);
        assert_eq!(group.pending_tasks(), 0);
    }

    #[test]
    fn undue_task_blocks_later_arrivals_of_same_kind() {
        let mut group = ProcessingGroup::new(OwnerId::new());
        let pet = PetId::new();
        group.add_member(pet);
        group.enqueue(make_task(pet, TaskKind::SocialDecay, 5));
        group.enqueue(make_task(pet, TaskKind::SocialDecay, 1));

        // Tick 2: the head task (due 5) is not due, so nothing drains even
        // though the task behind it already qualifies.
        let batch = group.drain(2, 16);
        assert!(batch.is_empty());
        assert_eq!(group.pending_tasks(), 2);

        // Tick 5: both drain, still in arrival order.
        let batch = group.drain(5, 16);
        let dues: Vec<u64> = batch.tasks().iter().map(|t| t.due_tick).collect();
        assert_eq!(dues, vec![5, 1]);
    }

    #[test]
    fn task_due_exactly_now_drains() {
        let mut group = ProcessingGroup::new(OwnerId::new());
        let pet = PetId::new();
        group.add_member(pet);
        group.enqueue(make_task(pet, TaskKind::EmotionDecay, 7));
        assert_eq!(group.drain(7, 16).len(), 1);
    }

    #[test]
    fn cap_limits_batch_across_kinds_and_remainder_survives() {
        let mut group = ProcessingGroup::new(OwnerId::new());
        let pet = PetId::new();
        group.add_member(pet);
        for _ in 0..3 {
            group.enqueue(make_task(pet, TaskKind::GoalPlanning, 0));
            group.enqueue(make_task(pet, TaskKind::AbilityMaintenance, 0));
        }

        let batch = group.drain(1, 4);
        assert_eq!(batch.len(), 4);
        // Kind order: all goal-planning tasks come before ability upkeep.
        let kinds: Vec<TaskKind> = batch.tasks().iter().map(|t| t.kind).collect();
        assert_eq!(
            kinds,
            vec![
                TaskKind::GoalPlanning,
                TaskKind::GoalPlanning,
                TaskKind::GoalPlanning,
                TaskKind::AbilityMaintenance,
            ]
        );

        assert_eq!(group.pending_tasks(), 2);
        assert_eq!(group.drain(1, 4).len(), 2);
        assert_eq!(group.pending_tasks(), 0);
    }

    #[test]
    fn remove_member_prunes_its_tasks() {
        let mut group = ProcessingGroup::new(OwnerId::new());
        let kept = PetId::new();
        let removed = PetId::new();
        group.add_member(kept);
        group.add_member(removed);
        group.enqueue(make_task(kept, TaskKind::GoalPlanning, 0));
        group.enqueue(make_task(removed, TaskKind::GoalPlanning, 0));
        group.enqueue(make_task(removed, TaskKind::SocialDecay, 0));

        assert_eq!(group.remove_member(removed), Some(2));
        assert!(!group.has_member(removed));

        let batch = group.drain(1, 16);
        assert_eq!(batch.len(), 1);
        assert_eq!(batch.tasks().first().unwrap().pet, kept);
    }

    #[test]
    fn remove_nonmember_is_none() {
        let mut group = ProcessingGroup::new(OwnerId::new());
        assert_eq!(group.remove_member(PetId::new()), None);
    }

    #[test]
    fn prune_mid_drain_keeps_cursor_aligned() {
        let mut group = ProcessingGroup::new(OwnerId::new());
        let first = PetId::new();
        let second = PetId::new();
        group.add_member(first);
        group.add_member(second);
        group.enqueue(make_task(first, TaskKind::GoalPlanning, 0));
        group.enqueue(make_task(second, TaskKind::GoalPlanning, 0));
        group.enqueue(make_task(first, TaskKind::GoalPlanning, 0));

        // Drain one task (pet `first`), then remove that pet mid-queue.
        assert_eq!(group.drain(1, 1).len(), 1);
        assert_eq!(group.remove_member(first), Some(1));

        // The surviving pet's task must drain exactly once.
        let batch = group.drain(1, 16);
        assert_eq!(batch.len(), 1);
        assert_eq!(batch.tasks().first().unwrap().pet, second);
        assert_eq!(group.pending_tasks(), 0);
    }

    #[test]
    fn idle_tracks_members_and_pending_work() {
        let mut group = ProcessingGroup::new(OwnerId::new());
        assert!(group.is_idle());

        let pet = PetId::new();
        group.add_member(pet);
        assert!(!group.is_idle());

        group.remove_member(pet);
        assert!(group.is_idle());
    }

    #[test]
    fn empty_drain_still_stamps_owner_and_tick() {
        let owner = OwnerId::new();
        let mut group = ProcessingGroup::new(owner);
        let batch = group.drain(42, 16);
        assert!(batch.is_empty());
        assert_eq!(batch.owner(), owner);
        assert_eq!(batch.tick(), 42);
    }

    #[test]
    fn batch_pet_ids_deduplicate() {
        let owner = OwnerId::new();
        let pet = PetId::new();
        let other = PetId::new();
        let batch = TaskBatch::new(
            owner,
            1,
            vec![
                make_task(pet, TaskKind::GoalPlanning, 0),
                make_task(pet, TaskKind::SocialDecay, 0),
                make_task(other, TaskKind::GoalPlanning, 0),
            ],
        );
        assert_eq!(batch.pet_ids().len(), 2);
    }
}

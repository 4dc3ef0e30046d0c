//! Pet-to-owner tracking and the owner-keyed group table.
//!
//! The [`ProcessingManager`] is the front door for scheduling: it knows
//! which owner every pet belongs to, creates [`ProcessingGroup`]s on
//! demand, routes enqueued tasks to the right group, and retires groups
//! that end up with no members and no work.

use std::collections::BTreeMap;

use menagerie_types::{OwnerId, PetId, ScheduledTask};
use tracing::{debug, info};

use crate::group::{ProcessingGroup, TaskBatch};

/// Errors from tracking and scheduling operations.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    /// A task or membership operation referenced a pet no owner tracks.
    #[error("pet {pet} is not tracked by any owner")]
    UntrackedPet {
        /// The unknown pet.
        pet: PetId,
    },

    /// A pet was tracked to a second owner without being untracked first.
    #[error("pet {pet} is already tracked by owner {owner}")]
    AlreadyTracked {
        /// The pet that is already assigned.
        pet: PetId,
        /// The owner it is currently assigned to.
        owner: OwnerId,
    },
}

/// Owner-keyed groups plus the pet-to-owner membership index.
#[derive(Debug, Default)]
pub struct ProcessingManager {
    /// Live groups, created on first track and removed when idle.
    groups: BTreeMap<OwnerId, ProcessingGroup>,
    /// Which owner each tracked pet belongs to.
    membership: BTreeMap<PetId, OwnerId>,
}

impl ProcessingManager {
    /// Create an empty manager.
    pub const fn new() -> Self {
        Self {
            groups: BTreeMap::new(),
            membership: BTreeMap::new(),
        }
    }

    /// Assign a pet to an owner, creating the owner's group on demand.
    ///
    /// Tracking a pet to the owner it already belongs to is a no-op.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::AlreadyTracked`] if the pet belongs to a
    /// different owner; it must be untracked first.
    pub fn track_pet(&mut self, pet: PetId, owner: OwnerId) -> Result<(), DispatchError> {
        if let Some(&current) = self.membership.get(&pet) {
            if current == owner {
                return Ok(());
            }
            return Err(DispatchError::AlreadyTracked {
                pet,
                owner: current,
            });
        }
        self.membership.insert(pet, owner);
        self.groups
            .entry(owner)
            .or_insert_with(|| ProcessingGroup::new(owner))
            .add_member(pet);
        debug!(pet = %pet, owner = %owner, "Tracking pet");
        Ok(())
    }

    /// Remove a pet from its owner's group, dropping its queued tasks.
    ///
    /// Returns the number of tasks pruned. A group left with no members
    /// and no work is removed.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::UntrackedPet`] if the pet is not tracked.
    pub fn untrack_pet(&mut self, pet: PetId) -> Result<usize, DispatchError> {
        let owner = self
            .membership
            .remove(&pet)
            .ok_or(DispatchError::UntrackedPet { pet })?;
        let Some(group) = self.groups.get_mut(&owner) else {
            return Ok(0);
        };
        let pruned = group.remove_member(pet).unwrap_or(0);
        debug!(pet = %pet, owner = %owner, pruned, "Untracked pet");
        if group.is_idle() {
            self.groups.remove(&owner);
            debug!(owner = %owner, "Removed idle processing group");
        }
        Ok(pruned)
    }

    /// Queue a task with the owner of the task's pet.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::UntrackedPet`] if the task names a pet no
    /// owner tracks; tasks are never queued for unknown pets.
    pub fn enqueue(&mut self, task: ScheduledTask) -> Result<(), DispatchError> {
        let owner = *self
            .membership
            .get(&task.pet)
            .ok_or(DispatchError::UntrackedPet { pet: task.pet })?;
        let Some(group) = self.groups.get_mut(&owner) else {
            return Err(DispatchError::UntrackedPet { pet: task.pet });
        };
        group.enqueue(task);
        Ok(())
    }

    /// Drain an owner's due tasks into a batch.
    ///
    /// Returns `None` when the owner has no group. The batch itself may be
    /// empty when nothing is due yet.
    pub fn drain(
        &mut self,
        owner: OwnerId,
        current_tick: u64,
        max_tasks: usize,
    ) -> Option<TaskBatch> {
        let group = self.groups.get_mut(&owner)?;
        let batch = group.drain(current_tick, max_tasks);
        if group.is_idle() {
            self.groups.remove(&owner);
        }
        Some(batch)
    }

    /// The owner a pet is tracked to, if any.
    pub fn owner_of(&self, pet: PetId) -> Option<OwnerId> {
        self.membership.get(&pet).copied()
    }

    /// Borrow an owner's group, if it exists.
    pub fn group(&self, owner: OwnerId) -> Option<&ProcessingGroup> {
        self.groups.get(&owner)
    }

    /// Owners that currently have a live group, in sorted order.
    pub fn owner_ids(&self) -> Vec<OwnerId> {
        self.groups.keys().copied().collect()
    }

    /// Number of live groups.
    pub fn group_count(&self) -> usize {
        self.groups.len()
    }

    /// Number of tracked pets across all owners.
    pub fn tracked_pet_count(&self) -> usize {
        self.membership.len()
    }

    /// Drop every group and membership record, logging what was discarded.
    pub fn shutdown(&mut self) {
        let dropped_tasks = self
            .groups
            .values()
            .fold(0_usize, |acc, group| acc.saturating_add(group.pending_tasks()));
        info!(
            groups = self.groups.len(),
            pets = self.membership.len(),
            dropped_tasks,
            "Shutting down processing manager"
        );
        self.groups.clear();
        self.membership.clear();
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use menagerie_types::TaskKind;

    use super::*;

    fn make_task(pet: PetId, due_tick: u64) -> ScheduledTask {
        ScheduledTask::new(pet, TaskKind::GoalPlanning, due_tick)
    }

    #[test]
    fn tracking_same_owner_twice_is_idempotent() {
        let mut manager = ProcessingManager::new();
        let pet = PetId::new();
        let owner = OwnerId::new();
        manager.track_pet(pet, owner).unwrap();
        manager.track_pet(pet, owner).unwrap();
        assert_eq!(manager.tracked_pet_count(), 1);
        assert_eq!(manager.group(owner).unwrap().member_count(), 1);
    }

    #[test]
    fn tracking_to_second_owner_fails_with_current_owner() {
        let mut manager = ProcessingManager::new();
        let pet = PetId::new();
        let first = OwnerId::new();
        manager.track_pet(pet, first).unwrap();

        let result = manager.track_pet(pet, OwnerId::new());
        assert!(matches!(
            result,
            Err(DispatchError::AlreadyTracked { owner, .. }) if owner == first
        ));
        assert_eq!(manager.owner_of(pet), Some(first));
    }

    #[test]
    fn enqueue_for_untracked_pet_fails() {
        let mut manager = ProcessingManager::new();
        let result = manager.enqueue(make_task(PetId::new(), 0));
        assert!(matches!(result, Err(DispatchError::UntrackedPet { .. })));
    }

    #[test]
    fn enqueue_routes_to_owning_group() {
        let mut manager = ProcessingManager::new();
        let pet = PetId::new();
        let owner = OwnerId::new();
        manager.track_pet(pet, owner).unwrap();
        manager.enqueue(make_task(pet, 0)).unwrap();

        let batch = manager.drain(owner, 1, 16).unwrap();
        assert_eq!(batch.len(), 1);
        assert_eq!(batch.owner(), owner);
    }

    #[test]
    fn drain_unknown_owner_is_none() {
        let mut manager = ProcessingManager::new();
        assert!(manager.drain(OwnerId::new(), 1, 16).is_none());
    }

    #[test]
    fn drain_keeps_group_while_members_remain() {
        let mut manager = ProcessingManager::new();
        let pet = PetId::new();
        let owner = OwnerId::new();
        manager.track_pet(pet, owner).unwrap();

        let batch = manager.drain(owner, 1, 16).unwrap();
        assert!(batch.is_empty());
        assert_eq!(manager.group_count(), 1);
    }

    #[test]
    fn untracking_last_member_retires_group() {
        let mut manager = ProcessingManager::new();
        let pet = PetId::new();
        let owner = OwnerId::new();
        manager.track_pet(pet, owner).unwrap();
        manager.enqueue(make_task(pet, 5)).unwrap();

        let pruned = manager.untrack_pet(pet).unwrap();
        assert_eq!(pruned, 1);
        assert_eq!(manager.group_count(), 0);
        assert_eq!(manager.tracked_pet_count(), 0);
        assert!(manager.drain(owner, 10, 16).is_none());
    }

    #[test]
    fn untracking_unknown_pet_fails() {
        let mut manager = ProcessingManager::new();
        assert!(matches!(
            manager.untrack_pet(PetId::new()),
            Err(DispatchError::UntrackedPet { .. })
        ));
    }

    #[test]
    fn owners_share_nothing() {
        let mut manager = ProcessingManager::new();
        let (pet_a, owner_a) = (PetId::new(), OwnerId::new());
        let (pet_b, owner_b) = (PetId::new(), OwnerId::new());
        manager.track_pet(pet_a, owner_a).unwrap();
        manager.track_pet(pet_b, owner_b).unwrap();
        manager.enqueue(make_task(pet_a, 0)).unwrap();
        manager.enqueue(make_task(pet_b, 0)).unwrap();

        let batch = manager.drain(owner_a, 1, 16).unwrap();
        assert_eq!(batch.len(), 1);
        assert_eq!(batch.tasks().first().unwrap().pet, pet_a);
        assert_eq!(manager.group(owner_b).unwrap().pending_tasks(), 1);
    }

    #[test]
    fn shutdown_discards_all_state() {
        let mut manager = ProcessingManager::new();
        let pet = PetId::new();
        manager.track_pet(pet, OwnerId::new()).unwrap();
        manager.enqueue(make_task(pet, 0)).unwrap();

        manager.shutdown();
        assert_eq!(manager.group_count(), 0);
        assert_eq!(manager.tracked_pet_count(), 0);
    }
}

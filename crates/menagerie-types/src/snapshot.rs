//! Immutable per-dispatch captures of one owner and its pets.
//!
//! A [`BatchSnapshot`] is the only data that crosses from the main
//! simulation thread into a worker: a pure copy of primitive fields taken at
//! capture time. It holds no reference to live state, exposes no mutation,
//! and is shared as `Arc<BatchSnapshot>`, so reading it from any thread is
//! safe by construction. Work that wants to change the world produces a
//! separate plan value and hands it back to the main thread.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::ids::{OwnerId, PetId};

/// A point in world space.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    /// East-west coordinate.
    pub x: f64,
    /// Vertical coordinate.
    pub y: f64,
    /// North-south coordinate.
    pub z: f64,
}

impl Position {
    /// Build a position from coordinates.
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Euclidean distance to another position.
    pub fn distance_to(self, other: Self) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        let dz = self.z - other.z;
        dx.mul_add(dx, dy.mul_add(dy, dz * dz)).sqrt()
    }
}

/// Copied primitive state for one pet at capture time.
///
/// Only owned, copyable data -- never a handle to a live entity. The
/// cooldown map carries expiry ticks keyed by ability id; recent tags are
/// short behavior markers planners read (for example `"regrouped"`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PetSummary {
    /// Stable pet handle.
    pub pet: PetId,
    /// Role identifier (data-driven; opaque to the pipeline).
    pub role: String,
    /// Progression level.
    pub level: u32,
    /// Ability id -> tick at which its cooldown expires.
    pub cooldowns: BTreeMap<String, u64>,
    /// Position at capture time.
    pub position: Position,
    /// Whether the pet has opted out of batch work this dispatch
    /// (sleeping, staying, despawning).
    pub opted_out: bool,
    /// Recent behavior tags, newest last.
    pub recent_tags: Vec<String>,
}

impl PetSummary {
    /// Whether the named ability is still cooling down at `tick`.
    pub fn on_cooldown(&self, ability: &str, tick: u64) -> bool {
        self.cooldowns
            .get(ability)
            .is_some_and(|expiry| *expiry > tick)
    }
}

/// Immutable capture of one owner's pets for one dispatch.
///
/// Field access goes through read-only methods; there is deliberately no way
/// to mutate a constructed snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchSnapshot {
    owner: OwnerId,
    tick: u64,
    pets: Vec<PetSummary>,
}

impl BatchSnapshot {
    /// Seal a capture. The summary list is taken by value; the caller must
    /// not retain a way to mutate it.
    pub const fn new(owner: OwnerId, tick: u64, pets: Vec<PetSummary>) -> Self {
        Self { owner, tick, pets }
    }

    /// The owner this capture is scoped to.
    pub const fn owner(&self) -> OwnerId {
        self.owner
    }

    /// World tick at capture time.
    pub const fn tick(&self) -> u64 {
        self.tick
    }

    /// All captured pet summaries, in capture order.
    pub fn pets(&self) -> &[PetSummary] {
        &self.pets
    }

    /// The summary for one pet, if it was captured.
    pub fn get(&self, pet: PetId) -> Option<&PetSummary> {
        self.pets.iter().find(|summary| summary.pet == pet)
    }

    /// Ids of all captured pets, in capture order.
    pub fn pet_ids(&self) -> Vec<PetId> {
        self.pets.iter().map(|summary| summary.pet).collect()
    }

    /// Number of captured pets.
    pub fn len(&self) -> usize {
        self.pets.len()
    }

    /// Whether the capture holds no pets.
    pub fn is_empty(&self) -> bool {
        self.pets.is_empty()
    }

    /// Summaries that have not opted out of batch work.
    pub fn active_pets(&self) -> impl Iterator<Item = &PetSummary> {
        self.pets.iter().filter(|summary| !summary.opted_out)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn make_summary(opted_out: bool) -> PetSummary {
        let mut cooldowns = BTreeMap::new();
        cooldowns.insert(String::from("howl"), 120_u64);
        PetSummary {
            pet: PetId::new(),
            role: String::from("scout"),
            level: 3,
            cooldowns,
            position: Position::new(1.0, 64.0, -3.5),
            opted_out,
            recent_tags: vec![String::from("fed")],
        }
    }

    #[test]
    fn distance_is_symmetric() {
        let a = Position::new(0.0, 0.0, 0.0);
        let b = Position::new(3.0, 4.0, 0.0);
        assert!((a.distance_to(b) - 5.0).abs() < 1e-9);
        assert!((b.distance_to(a) - 5.0).abs() < 1e-9);
    }

    #[test]
    fn cooldown_check_uses_expiry_tick() {
        let summary = make_summary(false);
        assert!(summary.on_cooldown("howl", 100));
        assert!(!summary.on_cooldown("howl", 120));
        assert!(!summary.on_cooldown("pounce", 0));
    }

    #[test]
    fn snapshot_lookup_by_pet() {
        let first = make_summary(false);
        let second = make_summary(true);
        let wanted = second.pet;
        let snapshot = BatchSnapshot::new(OwnerId::new(), 50, vec![first, second]);
        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot.get(wanted).map(|s| s.pet), Some(wanted));
        assert!(snapshot.get(PetId::new()).is_none());
    }

    #[test]
    fn active_pets_skips_opted_out() {
        let snapshot = BatchSnapshot::new(
            OwnerId::new(),
            50,
            vec![make_summary(false), make_summary(true), make_summary(false)],
        );
        assert_eq!(snapshot.active_pets().count(), 2);
        assert_eq!(snapshot.pet_ids().len(), 3);
    }
}

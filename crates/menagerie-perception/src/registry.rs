//! Per-pet perception state and the registry that routes stimuli to it.
//!
//! A [`PetPerception`] bundles the three reactive pieces owned by one pet:
//! the listener bus, the dirty-tracked context cache, and the stimulus
//! timeline. The [`PerceptionRegistry`] keys those bundles by [`PetId`] and
//! fans incoming stimuli out to them in a fixed order: invalidate the cache
//! first, then record history, then run listeners -- so a listener that
//! immediately asks for a snapshot sees the effects of the stimulus it is
//! reacting to.

use std::collections::BTreeMap;

use menagerie_types::{PetId, Stimulus};
use tracing::{debug, warn};

use crate::bus::{DispatchStats, PerceptionBus};
use crate::cache::ContextCache;
use crate::timeline::StimulusTimeline;

/// Errors from registry membership operations.
#[derive(Debug, thiserror::Error)]
pub enum PerceptionError {
    /// A pet was registered twice.
    #[error("pet {pet} is already registered")]
    DuplicatePet {
        /// The pet that already has perception state.
        pet: PetId,
    },

    /// An operation referenced a pet the registry has never seen or has
    /// already removed.
    #[error("pet {pet} is not registered")]
    UnknownPet {
        /// The missing pet.
        pet: PetId,
    },
}

/// Tuning knobs applied to each newly registered pet.
#[derive(Debug, Clone, Copy)]
pub struct PerceptionConfig {
    /// Timeline capacity cap.
    pub timeline_capacity: usize,
    /// Timeline tick TTL.
    pub timeline_ttl_ticks: u64,
    /// Context cache idle budget.
    pub max_idle_ticks: u64,
}

impl Default for PerceptionConfig {
    fn default() -> Self {
        Self {
            timeline_capacity: crate::timeline::DEFAULT_CAPACITY,
            timeline_ttl_ticks: crate::timeline::DEFAULT_TTL_TICKS,
            max_idle_ticks: crate::cache::DEFAULT_MAX_IDLE_TICKS,
        }
    }
}

/// The reactive state owned by a single pet.
#[derive(Debug)]
pub struct PetPerception<S> {
    /// Listener fan-out for this pet.
    pub bus: PerceptionBus,
    /// Dirty-tracked context snapshots.
    pub cache: ContextCache<S>,
    /// Recent stimulus history.
    pub timeline: StimulusTimeline,
}

impl<S> PetPerception<S> {
    /// Build a bundle tuned by `config`.
    pub fn new(config: &PerceptionConfig) -> Self {
        let mut timeline = StimulusTimeline::new();
        timeline.set_capacity(config.timeline_capacity);
        timeline.set_ttl_ticks(config.timeline_ttl_ticks);
        let mut cache = ContextCache::new();
        cache.set_max_idle_ticks(config.max_idle_ticks);
        Self {
            bus: PerceptionBus::new(),
            cache,
            timeline,
        }
    }

    /// Apply one stimulus: invalidate, record, then dispatch.
    pub fn route(&mut self, stimulus: &Stimulus) -> DispatchStats {
        self.cache.mark_dirty(stimulus.slices);
        self.timeline.record(stimulus.clone());
        self.bus.publish(stimulus)
    }
}

impl<S> Default for PetPerception<S> {
    fn default() -> Self {
        Self::new(&PerceptionConfig::default())
    }
}

/// All registered pets' perception state, keyed by pet id.
#[derive(Debug)]
pub struct PerceptionRegistry<S> {
    config: PerceptionConfig,
    pets: BTreeMap<PetId, PetPerception<S>>,
}

impl<S> PerceptionRegistry<S> {
    /// Create an empty registry applying `config` to future registrations.
    pub const fn new(config: PerceptionConfig) -> Self {
        Self {
            config,
            pets: BTreeMap::new(),
        }
    }

    /// Register perception state for a pet.
    ///
    /// # Errors
    ///
    /// Returns [`PerceptionError::DuplicatePet`] if the pet already has
    /// state; the existing bundle (and its listeners) is left untouched.
    pub fn register(&mut self, pet: PetId) -> Result<(), PerceptionError> {
        if self.pets.contains_key(&pet) {
            return Err(PerceptionError::DuplicatePet { pet });
        }
        self.pets.insert(pet, PetPerception::new(&self.config));
        debug!(pet = %pet, "Registered pet perception");
        Ok(())
    }

    /// Remove a pet's state, dropping its listeners and history.
    ///
    /// # Errors
    ///
    /// Returns [`PerceptionError::UnknownPet`] if the pet is not registered.
    pub fn remove(&mut self, pet: PetId) -> Result<PetPerception<S>, PerceptionError> {
        self.pets
            .remove(&pet)
            .ok_or(PerceptionError::UnknownPet { pet })
    }

    /// Borrow a pet's bundle.
    pub fn get(&self, pet: PetId) -> Option<&PetPerception<S>> {
        self.pets.get(&pet)
    }

    /// Mutably borrow a pet's bundle.
    pub fn get_mut(&mut self, pet: PetId) -> Option<&mut PetPerception<S>> {
        self.pets.get_mut(&pet)
    }

    /// Route a stimulus to one pet.
    ///
    /// # Errors
    ///
    /// Returns [`PerceptionError::UnknownPet`] if the pet is not registered.
    pub fn route(&mut self, pet: PetId, stimulus: &Stimulus) -> Result<DispatchStats, PerceptionError> {
        let perception = self
            .pets
            .get_mut(&pet)
            .ok_or(PerceptionError::UnknownPet { pet })?;
        Ok(perception.route(stimulus))
    }

    /// Route a stimulus to many pets, skipping unregistered ones.
    ///
    /// Unknown pets are logged and skipped rather than failing the batch;
    /// despawn between scheduling and delivery is routine.
    pub fn route_to_many(&mut self, pets: &[PetId], stimulus: &Stimulus) -> DispatchStats {
        let mut stats = DispatchStats::default();
        for &pet in pets {
            let Some(perception) = self.pets.get_mut(&pet) else {
                warn!(pet = %pet, kind = %stimulus.kind, "Skipping stimulus for unregistered pet");
                continue;
            };
            stats.merge(perception.route(stimulus));
        }
        stats
    }

    /// Number of registered pets.
    pub fn len(&self) -> usize {
        self.pets.len()
    }

    /// True when no pets are registered.
    pub fn is_empty(&self) -> bool {
        self.pets.is_empty()
    }

    /// Ids of all registered pets, in sorted order.
    pub fn pet_ids(&self) -> Vec<PetId> {
        self.pets.keys().copied().collect()
    }
}

impl<S> Default for PerceptionRegistry<S> {
    fn default() -> Self {
        Self::new(PerceptionConfig::default())
    }
}

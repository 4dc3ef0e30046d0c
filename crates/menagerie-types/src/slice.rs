//! Context slices and the immutable bitmask over them.
//!
//! A pet's situational context partitions into a closed set of named domains
//! ([`ContextSlice`]). Stimuli carry a [`SliceMask`] naming the domains they
//! invalidate, and the per-pet context cache refreshes only when at least one
//! dirty domain exists -- this is what makes invalidation cheap enough to run
//! on every published stimulus.
//!
//! # Design Principles
//!
//! - **Closed set**: the slice enum is the complete vocabulary of
//!   invalidation. New domains are added here, never stringly-typed.
//! - **Canonical masks**: a mask containing the [`ContextSlice::All`] bit
//!   normalizes to the full bit pattern at construction, so `is_all` and
//!   `contains` are single bitwise tests and [`SliceMask::EMPTY`] /
//!   [`SliceMask::ALL`] are the only representations of their states.
//! - **Value semantics**: `SliceMask` is a `Copy` newtype over one machine
//!   word. Every construction path is allocation-free, and two masks built
//!   from the same slices are indistinguishable values.

use serde::{Deserialize, Serialize};

/// Bit pattern with every slice set, the catch-all included.
const FULL_BITS: u16 = 0x1FFF;

/// One named dimension of a pet's situational context.
///
/// Each slice can be invalidated independently; [`ContextSlice::All`] is the
/// aggregate marker that invalidates every domain at once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ContextSlice {
    /// Owner presence, distance, and activity.
    Owner,
    /// Composition of nearby entities (allies, rivals, threats).
    Crowd,
    /// Terrain, weather, light, and other ambient conditions.
    Environment,
    /// Relationship edges to other pets and owners.
    Social,
    /// Current mood blend.
    Mood,
    /// Raw emotion accumulators feeding the mood blend.
    Emotions,
    /// Stamina and exertion reserves.
    Energy,
    /// Long-horizon history aggregates.
    History,
    /// Recent stimulus window.
    Stimuli,
    /// Persistent state fields attached to the pet.
    StateData,
    /// World clock phase (time of day, day count).
    WorldTime,
    /// Simulation level-of-detail tier for distant pets.
    LevelOfDetail,
    /// Catch-all that supersedes every other slice.
    All,
}

impl ContextSlice {
    /// Number of slices, the catch-all included.
    pub const COUNT: usize = 13;

    /// Every slice in declaration order. Iteration and logging rely on this
    /// order being stable.
    pub const VARIANTS: [Self; Self::COUNT] = [
        Self::Owner,
        Self::Crowd,
        Self::Environment,
        Self::Social,
        Self::Mood,
        Self::Emotions,
        Self::Energy,
        Self::History,
        Self::Stimuli,
        Self::StateData,
        Self::WorldTime,
        Self::LevelOfDetail,
        Self::All,
    ];

    /// The bit this slice occupies in a [`SliceMask`] word.
    pub const fn bit(self) -> u16 {
        match self {
            Self::Owner => 0x0001,
            Self::Crowd => 0x0002,
            Self::Environment => 0x0004,
            Self::Social => 0x0008,
            Self::Mood => 0x0010,
            Self::Emotions => 0x0020,
            Self::Energy => 0x0040,
            Self::History => 0x0080,
            Self::Stimuli => 0x0100,
            Self::StateData => 0x0200,
            Self::WorldTime => 0x0400,
            Self::LevelOfDetail => 0x0800,
            Self::All => 0x1000,
        }
    }

    /// Stable lowercase name used in logs and config.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Owner => "owner",
            Self::Crowd => "crowd",
            Self::Environment => "environment",
            Self::Social => "social",
            Self::Mood => "mood",
            Self::Emotions => "emotions",
            Self::Energy => "energy",
            Self::History => "history",
            Self::Stimuli => "stimuli",
            Self::StateData => "state_data",
            Self::WorldTime => "world_time",
            Self::LevelOfDetail => "level_of_detail",
            Self::All => "all",
        }
    }
}

impl core::fmt::Display for ContextSlice {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.name())
    }
}

/// Immutable set of [`ContextSlice`]s packed into one word.
///
/// Invariant: if the [`ContextSlice::All`] bit is set, the mask holds the
/// full bit pattern. Every constructor normalizes, so equality checks against
/// [`SliceMask::ALL`] are exact and `contains` never special-cases the
/// catch-all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "u16", into = "u16")]
pub struct SliceMask(u16);

impl SliceMask {
    /// The mask with no slices set.
    pub const EMPTY: Self = Self(0);

    /// The mask with every slice set.
    pub const ALL: Self = Self(FULL_BITS);

    /// Normalize a raw bit pattern: the catch-all bit absorbs everything,
    /// and bits outside the slice range are discarded.
    const fn from_bits(bits: u16) -> Self {
        if bits & ContextSlice::All.bit() != 0 {
            Self::ALL
        } else {
            Self(bits & FULL_BITS)
        }
    }

    /// Build a mask from a set of slices. Order and duplicates are
    /// irrelevant; including [`ContextSlice::All`] yields [`Self::ALL`].
    pub fn of(slices: &[ContextSlice]) -> Self {
        slices.iter().fold(Self::EMPTY, |mask, slice| mask.with(*slice))
    }

    /// Return this mask with one additional slice set.
    pub const fn with(self, slice: ContextSlice) -> Self {
        Self::from_bits(self.0 | slice.bit())
    }

    /// Union of two masks. Commutative and associative; anything unioned
    /// with [`Self::ALL`] is [`Self::ALL`].
    pub const fn union(self, other: Self) -> Self {
        Self::from_bits(self.0 | other.0)
    }

    /// Whether the given slice is set. O(1); always true on [`Self::ALL`].
    pub const fn contains(self, slice: ContextSlice) -> bool {
        self.0 & slice.bit() != 0
    }

    /// Whether this is the full mask. O(1) thanks to normalization.
    pub const fn is_all(self) -> bool {
        self.0 == FULL_BITS
    }

    /// Whether no slice is set.
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Number of slices set.
    pub const fn len(self) -> u32 {
        self.0.count_ones()
    }

    /// The raw bit pattern.
    pub const fn bits(self) -> u16 {
        self.0
    }

    /// Iterate the set slices in declaration order.
    ///
    /// A full mask yields all [`ContextSlice::COUNT`] slices (the terminal
    /// catch-all included), so callers never branch on the ALL state.
    pub fn slices(self) -> impl Iterator<Item = ContextSlice> {
        ContextSlice::VARIANTS
            .into_iter()
            .filter(move |slice| self.contains(*slice))
    }
}

impl Default for SliceMask {
    fn default() -> Self {
        Self::EMPTY
    }
}

impl From<ContextSlice> for SliceMask {
    fn from(slice: ContextSlice) -> Self {
        Self::EMPTY.with(slice)
    }
}

impl From<u16> for SliceMask {
    fn from(bits: u16) -> Self {
        Self::from_bits(bits)
    }
}

impl From<SliceMask> for u16 {
    fn from(mask: SliceMask) -> Self {
        mask.0
    }
}

impl core::fmt::Display for SliceMask {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        if self.is_empty() {
            return f.write_str("empty");
        }
        if self.is_all() {
            return f.write_str("all");
        }
        let mut first = true;
        for slice in self.slices() {
            if !first {
                f.write_str("|")?;
            }
            f.write_str(slice.name())?;
            first = false;
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn variants_and_bits_agree() {
        // Every variant has a distinct single bit inside the full pattern.
        let mut seen: u16 = 0;
        for slice in ContextSlice::VARIANTS {
            let bit = slice.bit();
            assert_eq!(bit.count_ones(), 1);
            assert_eq!(seen & bit, 0, "duplicate bit for {slice}");
            seen |= bit;
        }
        assert_eq!(seen, SliceMask::ALL.bits());
    }

    #[test]
    fn union_with_all_is_all() {
        for slice in ContextSlice::VARIANTS {
            let mask = SliceMask::from(slice);
            assert_eq!(mask.union(SliceMask::ALL), SliceMask::ALL);
        }
        assert_eq!(SliceMask::EMPTY.union(SliceMask::ALL), SliceMask::ALL);
    }

    #[test]
    fn all_contains_every_slice() {
        for slice in ContextSlice::VARIANTS {
            assert!(SliceMask::ALL.contains(slice));
        }
    }

    #[test]
    fn all_bit_normalizes_to_full_pattern() {
        // Adding the catch-all to any mask collapses it to the canonical ALL.
        let partial = SliceMask::of(&[ContextSlice::Owner, ContextSlice::Mood]);
        assert!(!partial.is_all());
        assert_eq!(partial.with(ContextSlice::All), SliceMask::ALL);
        assert_eq!(SliceMask::from(ContextSlice::All), SliceMask::ALL);
    }

    #[test]
    fn construction_is_canonical() {
        // Same slice set, different construction paths, identical value.
        let a = SliceMask::of(&[ContextSlice::Crowd, ContextSlice::Social]);
        let b = SliceMask::from(ContextSlice::Social).with(ContextSlice::Crowd);
        let c = SliceMask::of(&[
            ContextSlice::Social,
            ContextSlice::Crowd,
            ContextSlice::Crowd,
        ]);
        assert_eq!(a, b);
        assert_eq!(b, c);
        assert_eq!(a.bits(), b.bits());
    }

    #[test]
    fn union_is_commutative_and_associative() {
        let a = SliceMask::from(ContextSlice::Owner);
        let b = SliceMask::from(ContextSlice::Energy);
        let c = SliceMask::from(ContextSlice::WorldTime);
        assert_eq!(a.union(b), b.union(a));
        assert_eq!(a.union(b).union(c), a.union(b.union(c)));
    }

    #[test]
    fn empty_mask_properties() {
        assert!(SliceMask::EMPTY.is_empty());
        assert_eq!(SliceMask::EMPTY.len(), 0);
        for slice in ContextSlice::VARIANTS {
            assert!(!SliceMask::EMPTY.contains(slice));
        }
        assert_eq!(SliceMask::default(), SliceMask::EMPTY);
    }

    #[test]
    fn full_mask_iterates_every_slice() {
        let visited: Vec<ContextSlice> = SliceMask::ALL.slices().collect();
        assert_eq!(visited.len(), ContextSlice::COUNT);
        assert_eq!(visited, ContextSlice::VARIANTS.to_vec());
    }

    #[test]
    fn partial_mask_iterates_only_set_bits() {
        let mask = SliceMask::of(&[ContextSlice::Mood, ContextSlice::History]);
        let visited: Vec<ContextSlice> = mask.slices().collect();
        assert_eq!(visited, vec![ContextSlice::Mood, ContextSlice::History]);
    }

    #[test]
    fn out_of_range_bits_are_discarded() {
        let mask = SliceMask::from(0xE000_u16);
        assert_eq!(mask, SliceMask::EMPTY);
    }

    #[test]
    fn serde_roundtrip_preserves_normalization() {
        // The wire form is the raw word; deserialization re-normalizes.
        let json = serde_json::to_string(&SliceMask::ALL).unwrap();
        let back: SliceMask = serde_json::from_str(&json).unwrap();
        assert_eq!(back, SliceMask::ALL);

        let sneaky: SliceMask =
            serde_json::from_str(&ContextSlice::All.bit().to_string()).unwrap();
        assert_eq!(sneaky, SliceMask::ALL);
    }

    #[test]
    fn display_names() {
        assert_eq!(SliceMask::EMPTY.to_string(), "empty");
        assert_eq!(SliceMask::ALL.to_string(), "all");
        let mask = SliceMask::of(&[ContextSlice::Owner, ContextSlice::Crowd]);
        assert_eq!(mask.to_string(), "owner|crowd");
    }
}

//! Stimulus events and their materialized snapshot form.
//!
//! A [`Stimulus`] is the unit of perception traffic: something happened at a
//! tick, and it dirties a set of context slices. Raw stimuli are routed
//! through the perception bus and retained in a rolling timeline; scoring
//! code reads them back as an immutable [`StimulusSnapshot`] with per-event
//! ages relative to the caller's tick.
//!
//! Kind identifiers are namespaced (`combat:damage`) and validated at
//! construction -- a malformed kind is a synchronous error at the producer,
//! never a silent bad key deep in dispatch.

use serde::{Deserialize, Serialize};

use crate::slice::SliceMask;

/// Errors raised while constructing stimulus values.
#[derive(Debug, thiserror::Error)]
pub enum StimulusError {
    /// The kind identifier was empty or whitespace.
    #[error("stimulus kind is blank")]
    BlankKind,

    /// The kind identifier has no `namespace:name` separator.
    #[error("stimulus kind `{value}` is not namespaced (expected `namespace:name`)")]
    UnnamespacedKind {
        /// The rejected identifier.
        value: String,
    },

    /// The kind identifier contains a character outside the allowed set.
    #[error("stimulus kind `{value}` contains invalid character `{character}`")]
    InvalidKindChar {
        /// The rejected identifier.
        value: String,
        /// The first offending character.
        character: char,
    },
}

/// Whether `c` may appear in the namespace half of a kind identifier.
const fn is_namespace_char(c: char) -> bool {
    c.is_ascii_lowercase() || c.is_ascii_digit() || matches!(c, '_' | '-' | '.')
}

/// Whether `c` may appear in the name half of a kind identifier.
const fn is_name_char(c: char) -> bool {
    is_namespace_char(c) || c == '/'
}

/// A validated, namespaced stimulus type identifier.
///
/// The wire form is `namespace:name` with lowercase ASCII, digits, and
/// `_ - . /` (slash in the name half only). Producers mint these once at
/// startup and reuse them; the type is cheap to clone and orders lexically,
/// so it doubles as a `BTreeMap` key on the bus.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct StimulusKind(String);

impl StimulusKind {
    /// Validate and wrap a kind identifier.
    ///
    /// # Errors
    ///
    /// Returns [`StimulusError::BlankKind`] for empty or whitespace input,
    /// [`StimulusError::UnnamespacedKind`] when the `:` separator is missing
    /// or either half is empty, and [`StimulusError::InvalidKindChar`] for
    /// characters outside the allowed set.
    pub fn new(value: impl Into<String>) -> Result<Self, StimulusError> {
        let value = value.into();
        if value.trim().is_empty() {
            return Err(StimulusError::BlankKind);
        }
        let Some((namespace, name)) = value.split_once(':') else {
            return Err(StimulusError::UnnamespacedKind { value });
        };
        if namespace.is_empty() || name.is_empty() {
            return Err(StimulusError::UnnamespacedKind { value });
        }
        if let Some(character) = namespace.chars().find(|c| !is_namespace_char(*c)) {
            return Err(StimulusError::InvalidKindChar { value, character });
        }
        if let Some(character) = name.chars().find(|c| !is_name_char(*c)) {
            return Err(StimulusError::InvalidKindChar { value, character });
        }
        Ok(Self(value))
    }

    /// The full `namespace:name` identifier.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The namespace half of the identifier.
    pub fn namespace(&self) -> &str {
        self.0.split_once(':').map_or("", |(namespace, _)| namespace)
    }

    /// The name half of the identifier.
    pub fn name(&self) -> &str {
        self.0.split_once(':').map_or("", |(_, name)| name)
    }
}

impl core::fmt::Display for StimulusKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for StimulusKind {
    type Error = StimulusError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl TryFrom<&str> for StimulusKind {
    type Error = StimulusError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<StimulusKind> for String {
    fn from(kind: StimulusKind) -> Self {
        kind.0
    }
}

/// One perceived event: what happened, when, and which context slices it
/// dirties.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stimulus {
    /// Namespaced event type.
    pub kind: StimulusKind,
    /// World tick at which the event occurred.
    pub tick: u64,
    /// Context slices the event invalidates. Never empty: [`Stimulus::new`]
    /// coerces an empty mask to [`SliceMask::ALL`], since a stimulus must
    /// always invalidate something.
    pub slices: SliceMask,
    /// Optional opaque payload for listeners; the pipeline never reads it.
    pub payload: Option<serde_json::Value>,
}

impl Stimulus {
    /// Build a stimulus, coercing an empty slice mask to the full mask.
    pub fn new(
        kind: StimulusKind,
        tick: u64,
        slices: SliceMask,
        payload: Option<serde_json::Value>,
    ) -> Self {
        let slices = if slices.is_empty() {
            SliceMask::ALL
        } else {
            slices
        };
        Self {
            kind,
            tick,
            slices,
            payload,
        }
    }
}

/// One entry of a materialized stimulus snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StimulusRecord {
    /// Namespaced event type.
    pub kind: StimulusKind,
    /// World tick at which the event occurred.
    pub tick: u64,
    /// Age relative to the snapshot's `now` tick; zero for events at or
    /// after `now`, never negative.
    pub age_ticks: u64,
    /// Context slices the event invalidated.
    pub slices: SliceMask,
    /// Optional opaque payload carried through from the stimulus.
    pub payload: Option<serde_json::Value>,
}

impl StimulusRecord {
    /// Materialize one stimulus relative to the caller's `now` tick.
    pub fn from_stimulus(stimulus: &Stimulus, now: u64) -> Self {
        Self {
            kind: stimulus.kind.clone(),
            tick: stimulus.tick,
            age_ticks: now.saturating_sub(stimulus.tick),
            slices: stimulus.slices,
            payload: stimulus.payload.clone(),
        }
    }
}

/// Immutable, newest-first view of recent stimuli.
///
/// Ages are computed against the `now` the caller supplied at snapshot time,
/// not against publish time, so two snapshots of the same timeline at
/// different ticks report different ages for the same event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StimulusSnapshot {
    /// The tick ages were computed against.
    pub now: u64,
    /// Records ordered strictly newest-first.
    pub records: Vec<StimulusRecord>,
}

impl StimulusSnapshot {
    /// Bundle an already-ordered record list with its reference tick.
    pub const fn new(now: u64, records: Vec<StimulusRecord>) -> Self {
        Self { now, records }
    }

    /// Number of records in the view.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the view holds no records.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// The most recent record, if any.
    pub fn newest(&self) -> Option<&StimulusRecord> {
        self.records.first()
    }
}

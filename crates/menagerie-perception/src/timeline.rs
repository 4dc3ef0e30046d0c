//! Bounded, TTL-trimmed history of recently perceived stimuli.
//!
//! The timeline keeps the raw [`Stimulus`] values a pet has perceived, in
//! arrival order, so behavior systems can ask "what just happened to you".
//! Two independent limits bound it: a capacity cap evicting the oldest
//! entries, and a tick TTL measured against the newest recorded tick.
//! Reads go through [`StimulusTimeline::snapshot`], which re-ages every
//! entry against the caller's current tick.

use std::collections::VecDeque;

use menagerie_types::{Stimulus, StimulusRecord, StimulusSnapshot};

/// Entries kept before the oldest is evicted.
pub const DEFAULT_CAPACITY: usize = 32;

/// Ticks an entry stays visible after its stimulus tick.
pub const DEFAULT_TTL_TICKS: u64 = 600;

/// Rolling per-pet stimulus history.
#[derive(Debug)]
pub struct StimulusTimeline {
    /// Stored stimuli, oldest at the front.
    entries: VecDeque<Stimulus>,
    /// Highest stimulus tick ever recorded, the TTL reference point.
    newest_tick: u64,
    /// Capacity cap, always at least 1.
    capacity: usize,
    /// Tick TTL for both buffer trimming and snapshot filtering.
    ttl_ticks: u64,
}

impl StimulusTimeline {
    /// Create an empty timeline with default capacity and TTL.
    pub const fn new() -> Self {
        Self {
            entries: VecDeque::new(),
            newest_tick: 0,
            capacity: DEFAULT_CAPACITY,
            ttl_ticks: DEFAULT_TTL_TICKS,
        }
    }

    /// Set the capacity cap (clamped to at least 1) and evict immediately.
    pub fn set_capacity(&mut self, capacity: usize) {
        self.capacity = capacity.max(1);
        self.trim();
    }

    /// Set the tick TTL and trim immediately.
    pub fn set_ttl_ticks(&mut self, ttl_ticks: u64) {
        self.ttl_ticks = ttl_ticks;
        self.trim();
    }

    /// Append one stimulus, then enforce both limits.
    pub fn record(&mut self, stimulus: Stimulus) {
        self.newest_tick = self.newest_tick.max(stimulus.tick);
        self.entries.push_back(stimulus);
        self.trim();
    }

    /// Stored entries after the last trim.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Highest stimulus tick ever recorded.
    pub const fn newest_tick(&self) -> u64 {
        self.newest_tick
    }

    /// Drop every stored entry. The newest-tick watermark is kept.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Build a read view aged against `now`, newest first.
    ///
    /// Entries whose age relative to `now` exceeds the TTL are omitted from
    /// the view even if the buffer trim has not caught up with them yet.
    pub fn snapshot(&mut self, now: u64) -> StimulusSnapshot {
        self.trim();
        let mut records: Vec<StimulusRecord> = self
            .entries
            .iter()
            .rev()
            .filter(|stimulus| now.saturating_sub(stimulus.tick) <= self.ttl_ticks)
            .map(|stimulus| StimulusRecord::from_stimulus(stimulus, now))
            .collect();
        // Arrival order is not tick order when producers replay old events;
        // the view contract is newest-first by tick.
        records.sort_by(|a, b| b.tick.cmp(&a.tick));
        StimulusSnapshot::new(now, records)
    }

    /// Enforce capacity first, then the TTL measured from the newest tick.
    fn trim(&mut self) {
        while self.entries.len() > self.capacity {
            self.entries.pop_front();
        }
        let cutoff = self.newest_tick.saturating_sub(self.ttl_ticks);
        while self
            .entries
            .front()
            .is_some_and(|stimulus| stimulus.tick < cutoff)
        {
            self.entries.pop_front();
        }
    }
}

impl Default for StimulusTimeline {
    fn default() -> Self {
        Self::new()
    }
}

//! Dirty-tracked context cache with idle-based refresh.
//!
//! Each pet keeps one [`ContextCache`] wrapping whatever snapshot type the
//! caller builds from world state. Stimuli mark slices dirty; the next
//! snapshot request rebuilds only when something is dirty or the cached
//! value has sat unused past the idle budget. Rebuilt snapshots are handed
//! out as `Arc` clones so background workers can hold them while the cache
//! moves on.

use std::sync::Arc;

use menagerie_types::{ContextSlice, SliceMask};
use tracing::trace;

/// Ticks a cached snapshot may be reused before a forced rebuild.
pub const DEFAULT_MAX_IDLE_TICKS: u64 = 200;

/// Lazily refreshed snapshot holder keyed by dirty context slices.
pub struct ContextCache<S> {
    /// Slices invalidated since the last capture.
    dirty: SliceMask,
    /// Tick of the last capture, `None` until the first one runs.
    last_capture_tick: Option<u64>,
    /// Forced-refresh budget; a capture this many ticks old is stale.
    max_idle_ticks: u64,
    /// Most recent capture, shared with any worker still reading it.
    cached: Option<Arc<S>>,
}

impl<S> ContextCache<S> {
    /// Create an empty cache; the first snapshot request always captures.
    pub const fn new() -> Self {
        Self {
            dirty: SliceMask::EMPTY,
            last_capture_tick: None,
            max_idle_ticks: DEFAULT_MAX_IDLE_TICKS,
            cached: None,
        }
    }

    /// Override the idle budget. Zero forces a rebuild on every request.
    pub const fn set_max_idle_ticks(&mut self, ticks: u64) {
        self.max_idle_ticks = ticks;
    }

    /// Mark every slice in `mask` dirty.
    pub const fn mark_dirty(&mut self, mask: SliceMask) {
        self.dirty = self.dirty.union(mask);
    }

    /// Mark a single slice dirty.
    pub const fn mark_slice_dirty(&mut self, slice: ContextSlice) {
        self.dirty = self.dirty.with(slice);
    }

    /// Invalidate the whole cached snapshot.
    pub const fn mark_all_dirty(&mut self) {
        self.dirty = SliceMask::ALL;
    }

    /// Slices currently flagged for rebuild.
    pub const fn dirty_slices(&self) -> SliceMask {
        self.dirty
    }

    /// True when the next snapshot request will run the capture closure.
    pub fn needs_refresh(&self, now: u64) -> bool {
        if self.cached.is_none() || !self.dirty.is_empty() {
            return true;
        }
        self.last_capture_tick
            .is_none_or(|last| now.saturating_sub(last) >= self.max_idle_ticks)
    }

    /// Return the cached snapshot, rebuilding via `capture` when dirty or
    /// idle-expired. Clears the dirty mask and stamps the capture tick on
    /// rebuild.
    pub fn snapshot<F>(&mut self, now: u64, capture: F) -> Arc<S>
    where
        F: FnOnce() -> S,
    {
        if let (false, Some(cached)) = (self.needs_refresh(now), self.cached.as_ref()) {
            return Arc::clone(cached);
        }

        trace!(tick = now, dirty = %self.dirty, "Rebuilding context snapshot");
        let fresh = Arc::new(capture());
        self.cached = Some(Arc::clone(&fresh));
        self.dirty = SliceMask::EMPTY;
        self.last_capture_tick = Some(now);
        fresh
    }

    /// Peek at the cached value without refreshing, if one exists.
    pub const fn peek(&self) -> Option<&Arc<S>> {
        self.cached.as_ref()
    }

    /// Tick of the last capture, if any has run.
    pub const fn last_capture_tick(&self) -> Option<u64> {
        self.last_capture_tick
    }
}

impl<S> Default for ContextCache<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S> core::fmt::Debug for ContextCache<S> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ContextCache")
            .field("dirty", &self.dirty)
            .field("last_capture_tick", &self.last_capture_tick)
            .field("max_idle_ticks", &self.max_idle_ticks)
            .field("cached", &self.cached.is_some())
            .finish_non_exhaustive()
    }
}

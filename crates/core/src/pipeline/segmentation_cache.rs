use std::time::{Duration, Instant};

use crate::detection::domain::segmentation::{SegmentationRequest, SegmentationResult};
use crate::shared::constants::DEFAULT_SEGMENTATION_WINDOW;

/// A value with a creation stamp and a time-to-live.
#[derive(Clone, Debug, PartialEq)]
pub struct TimedCacheEntry<T> {
    pub value: T,
    pub created_at: Instant,
    pub ttl: Duration,
}

impl<T> TimedCacheEntry<T> {
    pub fn new(value: T, created_at: Instant, ttl: Duration) -> Self {
        Self {
            value,
            created_at,
            ttl,
        }
    }

    /// Strictly older than the ttl. An entry read exactly at `created_at +
    /// ttl` is still live.
    pub fn is_expired(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.created_at) > self.ttl
    }
}

/// The search currently on screen.
#[derive(Clone, Debug, PartialEq)]
pub struct ActiveSearch {
    pub request: SegmentationRequest,
    /// `None` until the first segmentation pass for the request lands.
    pub result: Option<SegmentationResult>,
    /// Identifies this search so late results for a superseded one can be
    /// dropped.
    pub generation: u64,
}

/// Time-windowed holder for one search-triggered segmentation.
///
/// Most recent query wins: a new search replaces the previous entry and
/// its timestamp outright. Expired entries are evicted on read, so callers
/// never observe them.
#[derive(Debug)]
pub struct SegmentationCache {
    entry: Option<TimedCacheEntry<ActiveSearch>>,
    window: Duration,
    next_generation: u64,
}

impl SegmentationCache {
    pub fn new(window: Duration) -> Self {
        Self {
            entry: None,
            window,
            next_generation: 1,
        }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Starts a new search stamped `now`.
    ///
    /// An expired entry is evicted first and never blocks the new search.
    /// An empty request clears the cache. A request stamped earlier than
    /// the live entry is rejected so that a slow query cannot resurrect an
    /// older search over a newer one. Returns the new generation, or
    /// `None` when nothing was stored.
    pub fn set(
        &mut self,
        request: SegmentationRequest,
        result: Option<SegmentationResult>,
        now: Instant,
    ) -> Option<u64> {
        self.evict_expired(now);
        if let Some(entry) = &self.entry {
            if now < entry.created_at {
                return None;
            }
        }
        if request.is_empty() {
            self.entry = None;
            return None;
        }
        let generation = self.next_generation;
        self.next_generation += 1;
        self.entry = Some(TimedCacheEntry::new(
            ActiveSearch {
                request,
                result,
                generation,
            },
            now,
            self.window,
        ));
        Some(generation)
    }

    /// Replaces the result of the live search without touching its
    /// timestamp. Ignored when `generation` no longer matches.
    pub fn update_result(&mut self, generation: u64, result: SegmentationResult) -> bool {
        match &mut self.entry {
            Some(entry) if entry.value.generation == generation => {
                entry.value.result = Some(result);
                true
            }
            _ => false,
        }
    }

    /// The live entry, evicting it first if it has expired.
    pub fn current(&mut self, now: Instant) -> Option<&TimedCacheEntry<ActiveSearch>> {
        self.evict_expired(now);
        self.entry.as_ref()
    }

    /// Clears the entry if its window has passed. Returns whether it did.
    pub fn evict_expired(&mut self, now: Instant) -> bool {
        if self.entry.as_ref().is_some_and(|e| e.is_expired(now)) {
            self.entry = None;
            return true;
        }
        false
    }

    /// True when an entry is stored, without checking expiry.
    pub fn is_occupied(&self) -> bool {
        self.entry.is_some()
    }

    pub fn clear(&mut self) {
        self.entry = None;
    }
}

impl Default for SegmentationCache {
    fn default() -> Self {
        Self::new(DEFAULT_SEGMENTATION_WINDOW)
    }
}

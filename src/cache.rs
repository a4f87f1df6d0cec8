//! Persistent, expiring, size-bounded cache of analysis results keyed by photo id.
//!
//! The whole map is serialized to one key of a [`KeyValueStore`] after every
//! mutation. Storage failures are logged and otherwise ignored: the in-memory
//! map stays authoritative for the rest of the session.

use chrono::{DateTime, Duration, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

use crate::config::CacheConfig;
use crate::photo::{AnalysisMethod, Category, MethodDetails};
use crate::storage::KeyValueStore;

/// Storage key the serialized cache lives under.
pub const CACHE_STORAGE_KEY: &str = "photo_analysis_cache";

pub const DEFAULT_EXPIRY_DAYS: i64 = 7;
pub const DEFAULT_MAX_ENTRIES: usize = 1000;

/// Source of "now" for expiry decisions.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Persisted outcome of a successful analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CachedResult {
    pub category: Category,
    pub quality_score: f64,
    pub method: AnalysisMethod,
    #[serde(default)]
    pub raw_method_details: MethodDetails,
    /// Stamped by the cache on every write.
    pub cached_at: DateTime<Utc>,
}

impl CachedResult {
    pub fn new(
        category: Category,
        quality_score: f64,
        method: AnalysisMethod,
        raw_method_details: MethodDetails,
    ) -> Self {
        Self {
            category,
            quality_score,
            method,
            raw_method_details,
            cached_at: Utc::now(),
        }
    }
}

/// Diagnostic snapshot of the cache.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub total_entries: usize,
    pub valid_entries: usize,
    pub expired_entries: usize,
    pub approx_memory_bytes: usize,
}

struct Slot {
    result: CachedResult,
    /// Write order, breaks ties between equal timestamps.
    seq: u64,
}

#[derive(Default)]
struct Entries {
    slots: HashMap<String, Slot>,
    next_seq: u64,
}

impl Entries {
    fn insert(&mut self, id: String, result: CachedResult) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.slots.insert(id, Slot { result, seq });
    }
}

pub struct ResultCache {
    entries: Mutex<Entries>,
    store: Arc<dyn KeyValueStore>,
    clock: Arc<dyn Clock>,
    expiry: Duration,
    max_entries: usize,
}

impl ResultCache {
    /// Cache with the default 7 day expiry and 1000 entry ceiling.
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self::with_settings(
            store,
            Arc::new(SystemClock),
            Duration::days(DEFAULT_EXPIRY_DAYS),
            DEFAULT_MAX_ENTRIES,
        )
    }

    pub fn from_config(store: Arc<dyn KeyValueStore>, config: &CacheConfig) -> Self {
        Self::with_settings(
            store,
            Arc::new(SystemClock),
            Duration::days(i64::from(config.expiry_days)),
            config.max_entries,
        )
    }

    pub fn with_settings(
        store: Arc<dyn KeyValueStore>,
        clock: Arc<dyn Clock>,
        expiry: Duration,
        max_entries: usize,
    ) -> Self {
        let cache = Self {
            entries: Mutex::new(Entries::default()),
            store,
            clock,
            expiry,
            max_entries,
        };
        cache.load();
        cache
    }

    fn is_expired(&self, result: &CachedResult, now: DateTime<Utc>) -> bool {
        now - result.cached_at >= self.expiry
    }

    fn load(&self) {
        let raw = match self.store.get(CACHE_STORAGE_KEY) {
            Ok(Some(raw)) => raw,
            Ok(None) => return,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to read analysis cache, starting empty");
                return;
            }
        };

        let stored: HashMap<String, CachedResult> = match serde_json::from_str(&raw) {
            Ok(stored) => stored,
            Err(e) => {
                tracing::warn!(error = %e, "Discarding unreadable analysis cache");
                return;
            }
        };

        let now = self.clock.now();
        let total = stored.len();
        let mut live: Vec<(String, CachedResult)> = stored
            .into_iter()
            .filter(|(_, result)| !self.is_expired(result, now))
            .collect();
        live.sort_by_key(|(_, result)| result.cached_at);

        let purged = total - live.len();
        let mut entries = self.entries.lock();
        for (id, result) in live {
            entries.insert(id, result);
        }
        // The ceiling may have been lowered since the cache was written.
        let evicted = self.enforce_capacity(&mut entries, now);
        tracing::debug!(entries = entries.slots.len(), purged, evicted, "Analysis cache loaded");

        if purged > 0 || evicted > 0 {
            self.flush(&entries);
        }
    }

    /// Drop expired entries, then the oldest ones, until the ceiling holds.
    /// Returns how many entries were removed.
    fn enforce_capacity(&self, entries: &mut Entries, now: DateTime<Utc>) -> usize {
        if entries.slots.len() <= self.max_entries {
            return 0;
        }
        let before = entries.slots.len();
        entries
            .slots
            .retain(|_, slot| now - slot.result.cached_at < self.expiry);

        let overflow = entries.slots.len().saturating_sub(self.max_entries);
        if overflow > 0 {
            let mut by_age: Vec<(DateTime<Utc>, u64, String)> = entries
                .slots
                .iter()
                .map(|(id, slot)| (slot.result.cached_at, slot.seq, id.clone()))
                .collect();
            by_age.sort();
            for (_, _, id) in by_age.into_iter().take(overflow) {
                entries.slots.remove(&id);
            }
            tracing::debug!(evicted = overflow, "Evicted oldest analysis cache entries");
        }
        before - entries.slots.len()
    }

    fn flush(&self, entries: &Entries) {
        let snapshot: HashMap<&String, &CachedResult> = entries
            .slots
            .iter()
            .map(|(id, slot)| (id, &slot.result))
            .collect();

        let serialized = match serde_json::to_string(&snapshot) {
            Ok(s) => s,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to serialize analysis cache");
                return;
            }
        };

        if let Err(e) = self.store.set(CACHE_STORAGE_KEY, &serialized) {
            tracing::warn!(error = %e, "Failed to persist analysis cache");
        }
    }

    /// Unexpired result for `photo_id`. Expired entries are dropped on the way.
    pub fn get(&self, photo_id: &str) -> Option<CachedResult> {
        let now = self.clock.now();
        let mut entries = self.entries.lock();

        let expired = match entries.slots.get(photo_id) {
            None => return None,
            Some(slot) => self.is_expired(&slot.result, now),
        };

        if expired {
            entries.slots.remove(photo_id);
            self.flush(&entries);
            return None;
        }

        entries.slots.get(photo_id).map(|slot| slot.result.clone())
    }

    /// Insert or overwrite. `cached_at` is set to the current time.
    pub fn put(&self, photo_id: &str, mut result: CachedResult) {
        let now = self.clock.now();
        result.cached_at = now;

        let mut entries = self.entries.lock();
        entries.insert(photo_id.to_string(), result);
        self.enforce_capacity(&mut entries, now);

        self.flush(&entries);
    }

    pub fn invalidate(&self, photo_id: &str) {
        let mut entries = self.entries.lock();
        if entries.slots.remove(photo_id).is_some() {
            self.flush(&entries);
        }
    }

    pub fn clear(&self) {
        let mut entries = self.entries.lock();
        entries.slots.clear();
        if let Err(e) = self.store.remove(CACHE_STORAGE_KEY) {
            tracing::warn!(error = %e, "Failed to clear persisted analysis cache");
        }
    }

    pub fn len(&self) -> usize {
        self.entries.lock().slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> CacheStats {
        let now = self.clock.now();
        let entries = self.entries.lock();

        let mut stats = CacheStats {
            total_entries: entries.slots.len(),
            ..CacheStats::default()
        };
        for (id, slot) in &entries.slots {
            if self.is_expired(&slot.result, now) {
                stats.expired_entries += 1;
            } else {
                stats.valid_entries += 1;
            }
            let encoded = serde_json::to_string(&slot.result)
                .map(|s| s.len())
                .unwrap_or(0);
            stats.approx_memory_bytes += id.len() + encoded;
        }
        stats
    }
}

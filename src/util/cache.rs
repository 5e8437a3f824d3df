//! Response cache with per-entry TTL and size-triggered sweeping.

use std::borrow::Borrow;
use std::collections::HashMap;
use std::hash::Hash;
use std::time::Duration;

use tokio::time::Instant;

/// Default number of entries above which `set` sweeps expired entries.
pub const DEFAULT_SWEEP_THRESHOLD: usize = 100;

/// A time-based cache. Entries expire once `now - inserted_at >= ttl`;
/// there is no LRU/LFU eviction.
#[derive(Debug)]
pub struct TtlCache<K, V> {
    entries: HashMap<K, CacheEntry<V>>,
    default_ttl: Duration,
    sweep_threshold: usize,
}

#[derive(Debug)]
struct CacheEntry<V> {
    value: V,
    inserted_at: Instant,
    ttl: Duration,
}

impl<V> CacheEntry<V> {
    fn is_fresh(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.inserted_at) < self.ttl
    }
}

impl<K: Eq + Hash, V: Clone> TtlCache<K, V> {
    pub fn new(default_ttl: Duration, sweep_threshold: usize) -> Self {
        Self {
            entries: HashMap::new(),
            default_ttl,
            sweep_threshold,
        }
    }

    /// Get a cached value, removing it if it has expired.
    pub fn get<Q>(&mut self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let now = Instant::now();
        match self.entries.get(key) {
            Some(entry) if entry.is_fresh(now) => Some(entry.value.clone()),
            Some(_) => {
                self.entries.remove(key);
                None
            }
            None => None,
        }
    }

    /// Insert with the default TTL.
    pub fn set(&mut self, key: K, value: V) {
        let ttl = self.default_ttl;
        self.set_with_ttl(key, value, ttl);
    }

    /// Insert (overwriting) with an explicit TTL. Sweeps expired entries
    /// when the cache has grown past its threshold.
    pub fn set_with_ttl(&mut self, key: K, value: V, ttl: Duration) {
        self.entries.insert(
            key,
            CacheEntry {
                value,
                inserted_at: Instant::now(),
                ttl,
            },
        );

        if self.entries.len() > self.sweep_threshold {
            self.sweep_expired();
        }
    }

    /// Remove every expired entry, returning how many were dropped.
    pub fn sweep_expired(&mut self) -> usize {
        let now = Instant::now();
        let before = self.entries.len();
        self.entries.retain(|_, e| e.is_fresh(now));
        before - self.entries.len()
    }

    /// Remove entries whose key matches `predicate`, returning how many were dropped.
    pub fn invalidate_where(&mut self, mut predicate: impl FnMut(&K) -> bool) -> usize {
        let before = self.entries.len();
        self.entries.retain(|k, _| !predicate(k));
        before - self.entries.len()
    }

    /// Clear all entries.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Current number of entries, expired ones included until they are swept or read.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

//! Bounded key cache with deferred-visible eviction.
//!
//! A plain LRU would make a key unreachable the instant it's displaced.
//! Here, eviction moves the displaced entry into a holding area instead of
//! dropping it, so a snapshot built at the end of a batch can still see an
//! entry that got evicted earlier in the same batch. The holding area is
//! only cleared by an explicit `sweep()`, called after the emit step.

use std::collections::HashMap;
use std::num::NonZeroUsize;

use lru::LruCache;

use crate::error::Error;

#[cfg(not(feature = "ahash-hasher"))]
use std::collections::hash_map::RandomState;

#[cfg(feature = "ahash-hasher")]
use ahash::RandomState;

/// Alias for the default hasher, selected by the `ahash-hasher` crate feature.
type Hasher = RandomState;

/// An LRU-bounded `key -> value` mapping whose evictions stay reachable
/// until the next [`BoundedKeyCache::sweep`].
pub struct BoundedKeyCache<V> {
    active: LruCache<String, V, Hasher>,
    held: HashMap<String, V, Hasher>,
}

impl<V: Clone> BoundedKeyCache<V> {
    /// Build a cache with the given capacity. Fails if `capacity == 0`.
    pub fn new(capacity: usize) -> Result<Self, Error> {
        let capacity = NonZeroUsize::new(capacity)
            .ok_or_else(|| Error::Config("cache capacity must be positive".to_string()))?;
        Ok(Self {
            active: LruCache::with_hasher(capacity, Hasher::default()),
            held: HashMap::with_hasher(Hasher::default()),
        })
    }

    /// Insert `key -> value` if absent (first-writer-wins); promote to MRU
    /// if already active. Never overwrites an existing value.
    pub fn contains_or_add(&mut self, key: &str, make_value: impl FnOnce() -> V) {
        if self.active.contains(key) {
            self.active.promote(key);
            return;
        }
        if self.held.contains_key(key) {
            return;
        }
        if let Some((evicted_key, evicted_value)) = self.active.push(key.to_string(), make_value())
        {
            self.held.insert(evicted_key, evicted_value);
        }
    }

    /// Look up a value, whether it lives in the active set or the holding
    /// area. A pure read: never changes recency. Used only at snapshot time.
    pub fn get(&self, key: &str) -> Option<&V> {
        self.active.peek(key).or_else(|| self.held.get(key))
    }

    /// Iterate every live key, active or held.
    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.active.iter().map(|(k, _)| k).chain(self.held.keys())
    }

    /// Discard the holding area. Call after a cumulative emit, once the
    /// snapshot has been built.
    pub fn sweep(&mut self) {
        self.held.clear();
    }

    /// Empty both the active set and the holding area. Call after a delta
    /// emit.
    pub fn purge(&mut self) {
        self.active.clear();
        self.held.clear();
    }
}

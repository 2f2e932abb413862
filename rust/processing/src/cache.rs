// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Read-through caches for loaded meshes and rasterized labels.
//!
//! Each key owns a `OnceLock` slot. The first caller computes the value
//! outside the map lock; concurrent callers for the same key block on the
//! slot and receive the same result. Failed computations are dropped so a
//! later call retries. Completed entries beyond the capacity are evicted
//! least-recently-used first.

use crate::error::Result;
use crate::texture::PngImage;
use pcb3d_geometry::Mesh;
use rustc_hash::FxHashMap;
use std::sync::{Arc, Mutex, MutexGuard, OnceLock, PoisonError};

/// Cache of parsed models keyed by `"{reference}:{transform}"`
pub type MeshCache = KeyedCache<Arc<Mesh>>;

/// Cache of rendered label images keyed by their joined style parameters
pub type LabelCache = KeyedCache<PngImage>;

/// Capacity bounds for the conversion caches
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheConfig {
    pub mesh_capacity: usize,
    pub label_capacity: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            mesh_capacity: 256,
            label_capacity: 1024,
        }
    }
}

impl CacheConfig {
    /// No eviction, for short-lived batch runs
    pub const UNBOUNDED: CacheConfig = CacheConfig {
        mesh_capacity: usize::MAX,
        label_capacity: usize::MAX,
    };
}

type Slot<V> = Arc<OnceLock<Result<V>>>;

struct Entry<V> {
    slot: Slot<V>,
    last_used: u64,
}

struct State<V> {
    entries: FxHashMap<String, Entry<V>>,
    clock: u64,
}

/// Bounded at-most-once memoization keyed by string
pub struct KeyedCache<V> {
    capacity: usize,
    state: Mutex<State<V>>,
}

impl<V: Clone> KeyedCache<V> {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            state: Mutex::new(State {
                entries: FxHashMap::default(),
                clock: 0,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, State<V>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Return the cached value for `key`, computing it with `compute` if absent.
    ///
    /// The map lock is released before `compute` runs.
    pub fn get_or_try_insert_with<F>(&self, key: &str, compute: F) -> Result<V>
    where
        F: FnOnce() -> Result<V>,
    {
        let slot = {
            let mut state = self.lock();
            state.clock += 1;
            let now = state.clock;
            let entry = state.entries.entry(key.to_string()).or_insert_with(|| Entry {
                slot: Arc::new(OnceLock::new()),
                last_used: now,
            });
            entry.last_used = now;
            Arc::clone(&entry.slot)
        };

        if slot.get().is_some() {
            tracing::trace!(key = %key, "cache hit");
        }
        let result = slot.get_or_init(compute).clone();

        let mut state = self.lock();
        match &result {
            Ok(_) => Self::evict(&mut state, self.capacity),
            Err(error) => {
                let same_slot = state
                    .entries
                    .get(key)
                    .is_some_and(|e| Arc::ptr_eq(&e.slot, &slot));
                if same_slot {
                    state.entries.remove(key);
                    tracing::debug!(key = %key, error = %error, "dropped failed cache entry");
                }
            }
        }
        result
    }

    fn evict(state: &mut State<V>, capacity: usize) {
        let completed = state.entries.values().filter(|e| e.slot.get().is_some()).count();
        if completed <= capacity {
            return;
        }

        let mut candidates: Vec<(u64, String)> = state
            .entries
            .iter()
            .filter(|(_, e)| e.slot.get().is_some())
            .map(|(k, e)| (e.last_used, k.clone()))
            .collect();
        candidates.sort_unstable();
        for (_, key) in candidates.into_iter().take(completed - capacity) {
            state.entries.remove(&key);
            tracing::trace!(key = %key, "evicted cache entry");
        }
    }

    /// Completed value for `key`, if any
    pub fn get(&self, key: &str) -> Option<V> {
        let state = self.lock();
        state
            .entries
            .get(key)
            .and_then(|e| e.slot.get())
            .and_then(|r| r.as_ref().ok())
            .cloned()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.lock().entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Barrier;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn test_computes_once_per_key() {
        let cache: KeyedCache<u32> = KeyedCache::new(8);
        let calls = AtomicUsize::new(0);
        for _ in 0..3 {
            let v = cache
                .get_or_try_insert_with("a", || {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok(7)
                })
                .unwrap();
            assert_eq!(v, 7);
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_concurrent_requests_coalesce() {
        let cache: Arc<KeyedCache<u32>> = Arc::new(KeyedCache::new(8));
        let calls = Arc::new(AtomicUsize::new(0));
        let barrier = Arc::new(Barrier::new(8));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let cache = Arc::clone(&cache);
                let calls = Arc::clone(&calls);
                let barrier = Arc::clone(&barrier);
                thread::spawn(move || {
                    barrier.wait();
                    cache
                        .get_or_try_insert_with("shared", || {
                            calls.fetch_add(1, Ordering::SeqCst);
                            thread::sleep(Duration::from_millis(50));
                            Ok(42)
                        })
                        .unwrap()
                })
            })
            .collect();

        for handle in handles {
            assert_eq!(handle.join().unwrap(), 42);
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_failures_are_not_cached() {
        let cache: KeyedCache<u32> = KeyedCache::new(8);
        let err = cache
            .get_or_try_insert_with("k", || Err(Error::Footprint("nope".into())))
            .unwrap_err();
        assert_eq!(err, Error::Footprint("nope".into()));
        assert!(cache.is_empty());

        assert_eq!(cache.get_or_try_insert_with("k", || Ok(1)).unwrap(), 1);
        assert!(cache.contains("k"));
    }

    #[test]
    fn test_least_recently_used_is_evicted() {
        let cache: KeyedCache<u32> = KeyedCache::new(2);
        cache.get_or_try_insert_with("a", || Ok(1)).unwrap();
        cache.get_or_try_insert_with("b", || Ok(2)).unwrap();
        // Touch "a" so "b" becomes the oldest
        cache.get_or_try_insert_with("a", || Ok(99)).unwrap();
        cache.get_or_try_insert_with("c", || Ok(3)).unwrap();

        assert_eq!(cache.len(), 2);
        assert_eq!(cache.get("a"), Some(1));
        assert_eq!(cache.get("b"), None);
        assert_eq!(cache.get("c"), Some(3));
    }

    #[test]
    fn test_clear() {
        let cache: KeyedCache<u32> = KeyedCache::new(usize::MAX);
        cache.get_or_try_insert_with("a", || Ok(1)).unwrap();
        cache.clear();
        assert!(cache.is_empty());
    }
}

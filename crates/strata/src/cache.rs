//! Pin-counted caches with a size budget.
//!
//! A cache entry is *pinned* while somebody is using its value. Pinned entries are never evicted,
//! even if that means the cache has to exceed its size budget; only entries whose pin count has
//! dropped back to zero are candidates for eviction.
//!
//! The [`Cache`] trait describes the contract, [`LruCache`] implements it by evicting the entry
//! that was unpinned the longest time ago.

mod lru;
mod set_queue;

pub use lru::{CacheStats, LruCache};
pub use set_queue::SetQueue;

/// A key/value cache with pin-counted entries and a size budget.
///
/// Sizes are measured in an arbitrary unit chosen by the user (image caches use bytes). The cache
/// owns every value stored in it until the value is evicted or the cache is dropped.
pub trait Cache<K, V> {
    /// Looks up `key` and pins its entry.
    ///
    /// Returns [`None`] without side effects if `key` is not in the cache.
    fn fetch_and_pin(&mut self, key: &K) -> Option<&V>;

    /// Stores `value` under `key` with a size of 1, pinned once.
    fn store_and_pin(&mut self, key: K, value: V) {
        self.store_and_pin_sized(key, value, 1);
    }

    /// Stores `value` under `key` with the given size, pinned once, then evicts unpinned entries
    /// until the cache fits its budget again (or no unpinned entry is left).
    ///
    /// # Panics
    ///
    /// Implementations panic if `key` is already present. Callers are expected to check with
    /// [`Cache::fetch_and_pin`] first.
    fn store_and_pin_sized(&mut self, key: K, value: V, size: usize);

    /// Releases one pin of `key`'s entry.
    ///
    /// When the pin count reaches zero the entry becomes evictable.
    ///
    /// # Panics
    ///
    /// Implementations panic if `key` is not present or its entry is not pinned.
    fn unpin(&mut self, key: &K);

    /// Releases exactly one pin of every pinned entry.
    fn mass_unpin(&mut self);

    /// Returns whether `key` is present, regardless of its pin state.
    fn contains_key(&self, key: &K) -> bool;

    /// Changes the size budget and immediately evicts entries to fit it.
    fn set_max_size(&mut self, max_size: usize);

    /// Returns the size budget.
    fn max_size(&self) -> usize;

    /// Returns the total size of all entries, pinned or not.
    fn size(&self) -> usize;
}

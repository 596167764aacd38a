use std::collections::BTreeMap;

use super::{Cache, SetQueue};

/// A [`Cache`] that evicts the entry that was unpinned least recently.
///
/// Recency is tracked over *unpin events*, not over accesses: an entry enters the eviction queue
/// when its last pin is released, and leaves it again when it is pinned. Eviction always removes
/// the entry at the oldest end of that queue.
///
/// The size budget is soft. If every entry is pinned, the cache grows past
/// [`max_size`][Cache::max_size] and shrinks back as soon as entries are unpinned.
///
/// Values are dropped exactly once, either when they are evicted or when the cache is dropped.
#[derive(Debug)]
pub struct LruCache<K, V> {
    items: BTreeMap<K, CachedItem<V>>,
    unpinned: SetQueue<K>,
    size: usize,
    max_size: usize,
    hits: u64,
    misses: u64,
    evictions: u64,
}

#[derive(Debug)]
struct CachedItem<V> {
    value: V,
    use_count: usize,
    size: usize,
}

/// Statistics about cache usage.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Number of entries currently stored.
    pub entries: usize,
    /// Number of entries with a nonzero pin count.
    pub pinned: usize,
    /// Total size of all entries.
    pub size: usize,
    /// Size budget.
    pub max_size: usize,
    /// Number of [`Cache::fetch_and_pin`] calls that found their key.
    pub hits: u64,
    /// Number of [`Cache::fetch_and_pin`] calls that did not find their key.
    pub misses: u64,
    /// Number of entries evicted to stay within the size budget.
    pub evictions: u64,
}

impl CacheStats {
    /// Calculates the fraction of lookups that were hits (0.0 to 1.0).
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

impl<K: Ord + Clone, V> LruCache<K, V> {
    /// Creates an empty cache with the given size budget.
    pub fn new(max_size: usize) -> Self {
        Self {
            items: BTreeMap::new(),
            unpinned: SetQueue::new(),
            size: 0,
            max_size,
            hits: 0,
            misses: 0,
            evictions: 0,
        }
    }

    /// Returns the number of stored entries.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Returns the pin count of `key`'s entry, or [`None`] if `key` is not present.
    pub fn pin_count(&self, key: &K) -> Option<usize> {
        self.items.get(key).map(|item| item.use_count)
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            entries: self.items.len(),
            pinned: self.items.len() - self.unpinned.len(),
            size: self.size,
            max_size: self.max_size,
            hits: self.hits,
            misses: self.misses,
            evictions: self.evictions,
        }
    }

    fn evict(&mut self) {
        while self.size > self.max_size {
            let Some(key) = self.unpinned.pop_front() else {
                log::debug!(
                    "cache size {} exceeds budget {} with all {} entries pinned",
                    self.size,
                    self.max_size,
                    self.items.len(),
                );
                return;
            };
            if let Some(item) = self.items.remove(&key) {
                self.size -= item.size;
                self.evictions += 1;
                log::trace!(
                    "evicted entry of size {} (cache size now {}/{})",
                    item.size,
                    self.size,
                    self.max_size,
                );
            }
        }
    }
}

impl<K: Ord + Clone, V> Cache<K, V> for LruCache<K, V> {
    fn fetch_and_pin(&mut self, key: &K) -> Option<&V> {
        match self.items.get_mut(key) {
            Some(item) => {
                if item.use_count == 0 {
                    self.unpinned.remove(key);
                }
                item.use_count += 1;
                self.hits += 1;
                Some(&item.value)
            }
            None => {
                self.misses += 1;
                None
            }
        }
    }

    #[track_caller]
    fn store_and_pin_sized(&mut self, key: K, value: V, size: usize) {
        assert!(
            !self.items.contains_key(&key),
            "stored a key that is already cached"
        );

        self.items.insert(
            key,
            CachedItem {
                value,
                use_count: 1,
                size,
            },
        );
        self.size += size;
        self.evict();
    }

    #[track_caller]
    fn unpin(&mut self, key: &K) {
        let Some(item) = self.items.get_mut(key) else {
            panic!("unpinned a key that is not in the cache");
        };
        assert!(
            item.use_count > 0,
            "unpinned a cache entry that is not pinned"
        );

        item.use_count -= 1;
        if item.use_count == 0 {
            self.unpinned.push_back(key.clone());
            self.evict();
        }
    }

    fn mass_unpin(&mut self) {
        for (key, item) in &mut self.items {
            if item.use_count > 0 {
                item.use_count -= 1;
                if item.use_count == 0 {
                    self.unpinned.push_back(key.clone());
                }
            }
        }
        self.evict();
    }

    fn contains_key(&self, key: &K) -> bool {
        self.items.contains_key(key)
    }

    fn set_max_size(&mut self, max_size: usize) {
        self.max_size = max_size;
        self.evict();
    }

    fn max_size(&self) -> usize {
        self.max_size
    }

    fn size(&self) -> usize {
        self.size
    }
}

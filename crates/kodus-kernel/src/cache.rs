//! LRU Cache (spec §4.1): bounded associative cache keyed by
//! tenant/thread/namespace, evicting the least-recently-accessed entry.
//!
//! Grounded on `restflow-core/src/performance/cache.rs`'s `Cache<K, V>` over
//! a `DashMap`, adapted from TTL-based eviction to strict LRU (`lastAccessed`
//! ordering) because spec §4.1 has no TTL concept, only a `maxSize` bound.

use dashmap::DashMap;
use serde_json::Value;
use std::sync::atomic::{AtomicU64, Ordering};

struct Entry {
    value: Value,
    last_accessed: u64,
}

#[derive(Debug, Clone, Default)]
pub struct CacheStats {
    pub size: usize,
    pub max_size: usize,
    pub hits: u64,
    pub misses: u64,
}

/// Builds the tuple-encoded cache key from spec §4.1: `tenantId[:threadId]:namespace:key`.
pub fn cache_key(tenant_id: &str, thread_id: Option<&str>, namespace: &str, key: &str) -> String {
    match thread_id {
        Some(thread_id) => format!("{tenant_id}:{thread_id}:{namespace}:{key}"),
        None => format!("{tenant_id}:{namespace}:{key}"),
    }
}

/// Per-kernel LRU cache. No background thread; eviction and access-time
/// bookkeeping both happen synchronously inside `get`/`set`.
pub struct LruCache {
    data: DashMap<String, Entry>,
    max_size: usize,
    clock: AtomicU64,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl LruCache {
    pub fn new(max_size: usize) -> Self {
        Self {
            data: DashMap::new(),
            max_size,
            clock: AtomicU64::new(0),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    fn tick(&self) -> u64 {
        self.clock.fetch_add(1, Ordering::Relaxed)
    }

    pub fn get(&self, key: &str) -> Option<Value> {
        let now = self.tick();
        match self.data.get_mut(key) {
            Some(mut entry) => {
                entry.last_accessed = now;
                self.hits.fetch_add(1, Ordering::Relaxed);
                Some(entry.value.clone())
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    pub fn set(&self, key: String, value: Value) {
        let now = self.tick();
        let is_new = !self.data.contains_key(&key);
        if is_new && self.data.len() >= self.max_size {
            self.evict_lru();
        }
        self.data.insert(key, Entry { value, last_accessed: now });
    }

    pub fn has(&self, key: &str) -> bool {
        self.data.contains_key(key)
    }

    pub fn delete(&self, key: &str) -> bool {
        self.data.remove(key).is_some()
    }

    pub fn clear(&self) {
        self.data.clear();
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            size: self.data.len(),
            max_size: self.max_size,
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }

    /// Evicts the entry with the minimum `last_accessed`, per spec §4.1.
    fn evict_lru(&self) {
        let mut oldest_key: Option<String> = None;
        let mut oldest_ts = u64::MAX;
        for entry in self.data.iter() {
            if entry.last_accessed < oldest_ts {
                oldest_ts = entry.last_accessed;
                oldest_key = Some(entry.key().clone());
            }
        }
        if let Some(key) = oldest_key {
            self.data.remove(&key);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn evicts_least_recently_accessed_on_overflow() {
        let cache = LruCache::new(2);
        cache.set("a".into(), json!(1));
        cache.set("b".into(), json!(2));
        // touch "a" so "b" becomes the least-recently-accessed entry
        cache.get("a");
        cache.set("c".into(), json!(3));

        assert!(cache.has("a"));
        assert!(!cache.has("b"));
        assert!(cache.has("c"));
    }

    #[test]
    fn get_updates_last_accessed() {
        let cache = LruCache::new(1);
        cache.set("a".into(), json!(1));
        assert_eq!(cache.get("a"), Some(json!(1)));
        assert_eq!(cache.get("missing"), None);
        let stats = cache.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
    }

    #[test]
    fn key_encoding_matches_spec() {
        assert_eq!(cache_key("t1", Some("th1"), "ns", "k"), "t1:th1:ns:k");
        assert_eq!(cache_key("t1", None, "ns", "k"), "t1:ns:k");
    }
}

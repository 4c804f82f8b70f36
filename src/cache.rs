//! Caching infrastructure for product lookups
//!
//! Products rarely change, so a found product is kept in memory for a while
//! to spare the food database repeated requests for the same barcode.
//!
//! ## Usage Examples
//!
//! ```rust
//! use is_it_safe::cache::ProductCache;
//! use is_it_safe::product::ProductRecord;
//! use std::time::Duration;
//!
//! let cache = ProductCache::new(Duration::from_secs(3600), 1000);
//! cache.insert("3017620422003", ProductRecord::new("Nutella", "sugar, palm oil"));
//! assert!(cache.get("3017620422003").is_some());
//! ```

use std::collections::HashMap;
use std::hash::Hash;
use std::time::{Duration, Instant};

use parking_lot::RwLock;

use crate::product::ProductRecord;

/// Generic cache entry with expiration time
#[derive(Debug, Clone)]
pub struct CacheEntry<T> {
    /// The cached value
    pub value: T,
    /// When this entry was inserted
    pub inserted_at: Instant,
    /// When this entry expires
    pub expires_at: Instant,
}

impl<T> CacheEntry<T> {
    /// Create a new cache entry
    pub fn new(value: T, ttl: Duration) -> Self {
        let now = Instant::now();
        Self {
            value,
            inserted_at: now,
            expires_at: now + ttl,
        }
    }

    /// Check if this entry has expired
    pub fn is_expired(&self) -> bool {
        Instant::now() >= self.expires_at
    }

    /// Get the remaining time to live
    pub fn ttl_remaining(&self) -> Duration {
        self.expires_at.saturating_duration_since(Instant::now())
    }
}

/// Cache statistics
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CacheStats {
    /// Total number of entries
    pub entries: usize,
    /// Number of hits
    pub hits: u64,
    /// Number of misses
    pub misses: u64,
    /// Hit rate (hits / (hits + misses))
    pub hit_rate: f64,
}

/// Thread-safe in-memory TTL cache with a bounded number of entries
#[derive(Debug)]
pub struct MemoryCache<K, V> {
    data: RwLock<HashMap<K, CacheEntry<V>>>,
    stats: RwLock<CacheStats>,
    max_entries: usize,
}

impl<K, V> MemoryCache<K, V>
where
    K: Clone + Eq + Hash,
    V: Clone,
{
    /// Create a new memory cache holding at most `max_entries` values
    pub fn new(max_entries: usize) -> Self {
        Self {
            data: RwLock::new(HashMap::new()),
            stats: RwLock::new(CacheStats::default()),
            max_entries: max_entries.max(1),
        }
    }

    pub fn get(&self, key: &K) -> Option<V> {
        let value = self
            .data
            .read()
            .get(key)
            .filter(|entry| !entry.is_expired())
            .map(|entry| entry.value.clone());

        let mut stats = self.stats.write();
        if value.is_some() {
            stats.hits += 1;
        } else {
            stats.misses += 1;
        }
        value
    }

    /// Insert a value, evicting expired entries first and then the oldest
    /// entry when the cache is full
    pub fn insert(&self, key: K, value: V, ttl: Duration) {
        let mut data = self.data.write();
        if data.len() >= self.max_entries && !data.contains_key(&key) {
            data.retain(|_, entry| !entry.is_expired());
            if data.len() >= self.max_entries {
                if let Some(oldest) = data
                    .iter()
                    .min_by_key(|(_, entry)| entry.inserted_at)
                    .map(|(k, _)| k.clone())
                {
                    data.remove(&oldest);
                }
            }
        }
        data.insert(key, CacheEntry::new(value, ttl));
    }

    pub fn remove(&self, key: &K) -> Option<V> {
        self.data.write().remove(key).map(|entry| entry.value)
    }

    /// Clear all expired entries
    pub fn cleanup(&self) {
        let mut data = self.data.write();
        let initial_len = data.len();

        data.retain(|_, entry| !entry.is_expired());

        let removed = initial_len - data.len();
        if removed > 0 {
            tracing::debug!("Cache cleanup removed {} expired entries", removed);
        }
    }

    pub fn stats(&self) -> CacheStats {
        let mut stats = self.stats.read().clone();
        stats.entries = self.data.read().len();

        let total_requests = stats.hits + stats.misses;
        if total_requests > 0 {
            stats.hit_rate = stats.hits as f64 / total_requests as f64;
        }

        stats
    }

    pub fn clear(&self) {
        self.data.write().clear();
        *self.stats.write() = CacheStats::default();
    }

    pub fn len(&self) -> usize {
        self.data.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.read().is_empty()
    }
}

/// Cache of found products keyed by barcode
///
/// "Not found" answers are never cached, so a product added to the database
/// later shows up on the next scan.
#[derive(Debug)]
pub struct ProductCache {
    cache: MemoryCache<String, ProductRecord>,
    ttl: Duration,
}

impl ProductCache {
    pub fn new(ttl: Duration, max_entries: usize) -> Self {
        Self {
            cache: MemoryCache::new(max_entries),
            ttl,
        }
    }

    pub fn get(&self, barcode: &str) -> Option<ProductRecord> {
        let hit = self.cache.get(&barcode.to_string());
        if hit.is_some() {
            metrics::counter!("product_cache_hits_total").increment(1);
        } else {
            metrics::counter!("product_cache_misses_total").increment(1);
        }
        hit
    }

    pub fn insert(&self, barcode: &str, product: ProductRecord) {
        self.cache.insert(barcode.to_string(), product, self.ttl);
    }

    pub fn cleanup(&self) {
        self.cache.cleanup();
    }

    pub fn stats(&self) -> CacheStats {
        self.cache.stats()
    }

    pub fn clear(&self) {
        self.cache.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_cache_entry_expiration() {
        let entry = CacheEntry::new("value", Duration::from_millis(10));
        assert!(!entry.is_expired());
        thread::sleep(Duration::from_millis(20));
        assert!(entry.is_expired());
        assert_eq!(entry.ttl_remaining(), Duration::ZERO);
    }

    #[test]
    fn test_memory_cache_hit_and_miss_stats() {
        let cache: MemoryCache<String, u32> = MemoryCache::new(10);
        cache.insert("a".to_string(), 1, Duration::from_secs(60));

        assert_eq!(cache.get(&"a".to_string()), Some(1));
        assert_eq!(cache.get(&"b".to_string()), None);

        let stats = cache.stats();
        assert_eq!(stats.entries, 1);
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert!((stats.hit_rate - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn test_memory_cache_expired_entry_is_a_miss() {
        let cache: MemoryCache<String, u32> = MemoryCache::new(10);
        cache.insert("a".to_string(), 1, Duration::from_millis(5));
        thread::sleep(Duration::from_millis(15));

        assert_eq!(cache.get(&"a".to_string()), None);
        cache.cleanup();
        assert!(cache.is_empty());
    }

    #[test]
    fn test_memory_cache_evicts_oldest_when_full() {
        let cache: MemoryCache<u32, u32> = MemoryCache::new(2);
        cache.insert(1, 1, Duration::from_secs(60));
        thread::sleep(Duration::from_millis(2));
        cache.insert(2, 2, Duration::from_secs(60));
        cache.insert(3, 3, Duration::from_secs(60));

        assert_eq!(cache.len(), 2);
        assert_eq!(cache.get(&1), None);
        assert_eq!(cache.get(&3), Some(3));
    }

    #[test]
    fn test_product_cache_round_trip_and_clear() {
        let cache = ProductCache::new(Duration::from_secs(60), 10);
        cache.insert("123", ProductRecord::new("Soda", "water, sugar"));

        assert_eq!(
            cache.get("123").and_then(|p| p.name),
            Some("Soda".to_string())
        );
        cache.clear();
        assert!(cache.get("123").is_none());
        assert_eq!(cache.stats().hits, 0);
    }
}

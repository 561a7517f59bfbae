use crate::cache::{CacheEntry, CacheSizeEstimator, CacheStats};
use brandlens_core::{BrandProfile, CacheConfig, Platform, PlatformRanking};
use dashmap::DashMap;
use sha2::{Digest, Sha256};
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock as AsyncRwLock;
use tracing::debug;

/// Cached per-platform visibility result. `brand_key` is the lowercased
/// brand name, kept alongside the ranking so entries can be invalidated
/// by brand.
#[derive(Debug, Clone)]
pub struct CachedVisibility {
    pub brand_key: String,
    pub ranking: PlatformRanking,
}

impl CacheSizeEstimator for CachedVisibility {
    fn estimate_size(&self) -> usize {
        std::mem::size_of::<Self>() + self.brand_key.len() + self.ranking.estimate_size()
    }
}

/// TTL/LRU cache for per-platform visibility results.
///
/// Keys are derived from the platform plus the parts of the brand profile
/// that influence the result; repeated analyses of the same brand hit the
/// cache until the TTL lapses or the brand is invalidated.
#[derive(Clone)]
pub struct VisibilityCache {
    /// Thread-safe cache storage
    cache: Arc<DashMap<String, CacheEntry<CachedVisibility>>>,
    /// LRU tracking for eviction
    lru_queue: Arc<AsyncRwLock<VecDeque<String>>>,
    /// Performance metrics
    stats: Arc<AsyncRwLock<CacheStats>>,
    /// Memory usage tracking
    memory_usage: Arc<parking_lot::Mutex<usize>>,
    enabled: bool,
    ttl: Duration,
    max_entries: usize,
    max_memory_bytes: usize,
}

impl VisibilityCache {
    pub fn new(config: &CacheConfig) -> Self {
        Self {
            cache: Arc::new(DashMap::new()),
            lru_queue: Arc::new(AsyncRwLock::new(VecDeque::new())),
            stats: Arc::new(AsyncRwLock::new(CacheStats::default())),
            memory_usage: Arc::new(parking_lot::Mutex::new(0)),
            enabled: config.enabled,
            ttl: Duration::from_secs(config.ttl_secs),
            max_entries: config.max_entries,
            max_memory_bytes: config.max_memory_bytes,
        }
    }

    /// Create a cache key for one platform's slice of a brand profile.
    /// Keyword order does not affect the key.
    pub fn cache_key(
        platform: Platform,
        profile: &BrandProfile,
        queries_per_platform: usize,
    ) -> String {
        let mut keywords = profile.keywords.clone();
        keywords.sort();

        let mut hasher = Sha256::new();
        hasher.update(platform.to_string().as_bytes());
        hasher.update([0u8]);
        hasher.update(profile.brand_name.to_lowercase().as_bytes());
        hasher.update([0u8]);
        hasher.update(profile.industry.as_bytes());
        hasher.update([0u8]);
        hasher.update(profile.location.as_deref().unwrap_or("").as_bytes());
        hasher.update([0u8]);
        for keyword in &keywords {
            hasher.update(keyword.as_bytes());
            hasher.update([0u8]);
        }
        hasher.update(queries_per_platform.to_le_bytes());
        format!("visibility_{:x}", hasher.finalize())
    }

    /// Look up a cached ranking. Expired entries are dropped and counted
    /// as misses.
    pub async fn get(&self, key: &str) -> Option<PlatformRanking> {
        if !self.enabled {
            return None;
        }

        if let Some(mut entry) = self.cache.get_mut(key) {
            if entry.is_expired() {
                drop(entry);
                self.remove_entry(key);

                let mut stats = self.stats.write().await;
                stats.misses += 1;
                return None;
            }

            entry.touch();
            let ranking = entry.value.ranking.clone();
            drop(entry);

            self.update_lru(key).await;

            let mut stats = self.stats.write().await;
            stats.hits += 1;

            Some(ranking)
        } else {
            let mut stats = self.stats.write().await;
            stats.misses += 1;
            None
        }
    }

    /// Store a fresh ranking under the given key, evicting LRU entries
    /// while the cache is over its entry or memory budget.
    pub async fn insert(&self, key: String, brand_name: &str, ranking: PlatformRanking) {
        if !self.enabled {
            return;
        }

        let value = CachedVisibility {
            brand_key: brand_name.to_lowercase(),
            ranking,
        };
        let size_bytes = value.estimate_size() + key.len();
        let entry = CacheEntry::new(value, size_bytes, Some(self.ttl));

        {
            let mut memory_usage = self.memory_usage.lock();
            *memory_usage += size_bytes;
        }

        if let Some(old) = self.cache.insert(key.clone(), entry) {
            let mut memory_usage = self.memory_usage.lock();
            *memory_usage = memory_usage.saturating_sub(old.size_bytes);
        }
        self.update_lru(&key).await;
        self.evict_over_budget().await;

        let mut stats = self.stats.write().await;
        stats.entries = self.cache.len();
        stats.memory_usage = *self.memory_usage.lock() as u64;
    }

    /// Drop every entry belonging to the given brand. Returns the number
    /// of entries removed.
    pub async fn invalidate_brand(&self, brand_name: &str) -> usize {
        let brand_key = brand_name.to_lowercase();
        let mut keys = Vec::new();
        for entry in self.cache.iter() {
            if entry.value().value.brand_key == brand_key {
                keys.push(entry.key().clone());
            }
        }

        for key in &keys {
            self.remove_entry(key);
        }

        if !keys.is_empty() {
            debug!("Invalidated {} cache entries for '{}'", keys.len(), brand_name);
            let mut lru_queue = self.lru_queue.write().await;
            lru_queue.retain(|k| self.cache.contains_key(k));
            let mut stats = self.stats.write().await;
            stats.entries = self.cache.len();
            stats.memory_usage = *self.memory_usage.lock() as u64;
        }

        keys.len()
    }

    /// Remove expired entries. Returns the number removed.
    pub async fn cleanup_expired(&self) -> usize {
        let mut keys_to_remove = Vec::new();
        for entry in self.cache.iter() {
            if entry.value().is_expired() {
                keys_to_remove.push(entry.key().clone());
            }
        }

        for key in &keys_to_remove {
            self.remove_entry(key);
        }

        let removed = keys_to_remove.len();
        if removed > 0 {
            debug!("Cleaned up {} expired cache entries", removed);
            let mut lru_queue = self.lru_queue.write().await;
            lru_queue.retain(|key| self.cache.contains_key(key));
            let mut stats = self.stats.write().await;
            stats.entries = self.cache.len();
            stats.memory_usage = *self.memory_usage.lock() as u64;
        }

        removed
    }

    pub async fn clear(&self) {
        self.cache.clear();
        self.lru_queue.write().await.clear();
        *self.memory_usage.lock() = 0;

        let mut stats = self.stats.write().await;
        stats.entries = 0;
        stats.memory_usage = 0;
    }

    pub async fn stats(&self) -> CacheStats {
        let mut stats = self.stats.read().await.clone();
        stats.hit_rate = stats.hit_rate();
        stats.entries = self.cache.len();
        stats.memory_usage = *self.memory_usage.lock() as u64;
        stats
    }

    /// Update LRU position for accessed key
    async fn update_lru(&self, key: &str) {
        let mut lru_queue = self.lru_queue.write().await;

        // Remove key if it exists
        lru_queue.retain(|k| k != key);
        // Add to back as most recently used
        lru_queue.push_back(key.to_string());
    }

    fn over_budget(&self) -> bool {
        self.cache.len() > self.max_entries || *self.memory_usage.lock() > self.max_memory_bytes
    }

    /// Evict least recently used entries until within budget. Keys whose
    /// entries were already removed are skipped.
    async fn evict_over_budget(&self) {
        let mut evicted = 0u64;
        let mut lru_queue = self.lru_queue.write().await;

        while self.over_budget() {
            let Some(key) = lru_queue.pop_front() else {
                break;
            };
            if let Some((_, entry)) = self.cache.remove(&key) {
                let mut memory_usage = self.memory_usage.lock();
                *memory_usage = memory_usage.saturating_sub(entry.size_bytes);
                evicted += 1;
            }
        }

        if evicted > 0 {
            let mut stats = self.stats.write().await;
            stats.evictions += evicted;
        }
    }

    fn remove_entry(&self, key: &str) {
        if let Some((_, entry)) = self.cache.remove(key) {
            let mut memory_usage = self.memory_usage.lock();
            *memory_usage = memory_usage.saturating_sub(entry.size_bytes);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use brandlens_core::Trend;

    fn test_config() -> CacheConfig {
        CacheConfig {
            enabled: true,
            ttl_secs: 3600,
            max_entries: 100,
            max_memory_bytes: 1024 * 1024,
        }
    }

    fn test_profile(brand: &str) -> BrandProfile {
        BrandProfile {
            website_url: format!("https://{}.com", brand.to_lowercase()),
            brand_name: brand.to_string(),
            industry: "software".to_string(),
            location: None,
            keywords: vec!["crm".to_string(), "sales".to_string()],
            competitors: vec![],
            competitor_choice: Default::default(),
        }
    }

    fn test_ranking(platform: Platform, score: u32) -> PlatformRanking {
        PlatformRanking {
            platform,
            rank: Some(1),
            score,
            mentions: 3,
            trend: Trend::Stable,
            recommendations: vec![],
        }
    }

    #[test]
    fn test_cache_key_ignores_keyword_order() {
        let profile = test_profile("Acme");
        let mut shuffled = profile.clone();
        shuffled.keywords.reverse();

        assert_eq!(
            VisibilityCache::cache_key(Platform::ChatGpt, &profile, 3),
            VisibilityCache::cache_key(Platform::ChatGpt, &shuffled, 3),
        );
    }

    #[test]
    fn test_cache_key_varies_by_platform_and_depth() {
        let profile = test_profile("Acme");
        let base = VisibilityCache::cache_key(Platform::ChatGpt, &profile, 3);

        assert_ne!(
            base,
            VisibilityCache::cache_key(Platform::Claude, &profile, 3)
        );
        assert_ne!(
            base,
            VisibilityCache::cache_key(Platform::ChatGpt, &profile, 5)
        );
        assert_ne!(
            base,
            VisibilityCache::cache_key(Platform::ChatGpt, &test_profile("Globex"), 3)
        );
    }

    #[tokio::test]
    async fn test_insert_and_hit() {
        let cache = VisibilityCache::new(&test_config());
        let key = VisibilityCache::cache_key(Platform::ChatGpt, &test_profile("Acme"), 3);

        cache
            .insert(key.clone(), "Acme", test_ranking(Platform::ChatGpt, 80))
            .await;

        let hit = cache.get(&key).await;
        assert_eq!(hit.map(|r| r.score), Some(80));

        let stats = cache.stats().await;
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 0);
        assert_eq!(stats.entries, 1);
        assert!(stats.memory_usage > 0);
    }

    #[tokio::test]
    async fn test_miss_is_counted() {
        let cache = VisibilityCache::new(&test_config());
        assert!(cache.get("visibility_missing").await.is_none());

        let stats = cache.stats().await;
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.hit_rate, 0.0);
    }

    #[tokio::test]
    async fn test_expired_entry_is_dropped() {
        let config = CacheConfig {
            ttl_secs: 0,
            ..test_config()
        };
        let cache = VisibilityCache::new(&config);
        let key = "visibility_expiring".to_string();

        cache
            .insert(key.clone(), "Acme", test_ranking(Platform::ChatGpt, 80))
            .await;
        tokio::time::sleep(Duration::from_millis(10)).await;

        assert!(cache.get(&key).await.is_none());
        let stats = cache.stats().await;
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.entries, 0);
    }

    #[tokio::test]
    async fn test_lru_eviction_over_entry_budget() {
        let config = CacheConfig {
            max_entries: 2,
            ..test_config()
        };
        let cache = VisibilityCache::new(&config);

        cache
            .insert("key_a".into(), "A", test_ranking(Platform::ChatGpt, 10))
            .await;
        cache
            .insert("key_b".into(), "B", test_ranking(Platform::Claude, 20))
            .await;
        // Touch key_a so key_b is the least recently used
        cache.get("key_a").await;
        cache
            .insert("key_c".into(), "C", test_ranking(Platform::Gemini, 30))
            .await;

        assert!(cache.get("key_b").await.is_none());
        assert!(cache.get("key_a").await.is_some());
        assert!(cache.get("key_c").await.is_some());

        let stats = cache.stats().await;
        assert!(stats.evictions >= 1);
        assert!(stats.entries <= 2);
    }

    #[tokio::test]
    async fn test_invalidate_brand_is_selective() {
        let cache = VisibilityCache::new(&test_config());
        cache
            .insert("key_acme_1".into(), "Acme", test_ranking(Platform::ChatGpt, 10))
            .await;
        cache
            .insert("key_acme_2".into(), "acme", test_ranking(Platform::Claude, 20))
            .await;
        cache
            .insert("key_globex".into(), "Globex", test_ranking(Platform::Gemini, 30))
            .await;

        // Invalidation matches case-insensitively on the brand
        let removed = cache.invalidate_brand("ACME").await;
        assert_eq!(removed, 2);

        assert!(cache.get("key_acme_1").await.is_none());
        assert!(cache.get("key_acme_2").await.is_none());
        assert!(cache.get("key_globex").await.is_some());
    }

    #[tokio::test]
    async fn test_cleanup_expired() {
        let config = CacheConfig {
            ttl_secs: 0,
            ..test_config()
        };
        let cache = VisibilityCache::new(&config);
        cache
            .insert("key_a".into(), "A", test_ranking(Platform::ChatGpt, 10))
            .await;
        cache
            .insert("key_b".into(), "B", test_ranking(Platform::Claude, 20))
            .await;
        tokio::time::sleep(Duration::from_millis(10)).await;

        assert_eq!(cache.cleanup_expired().await, 2);
        assert_eq!(cache.stats().await.entries, 0);
    }

    #[tokio::test]
    async fn test_disabled_cache_never_stores() {
        let config = CacheConfig {
            enabled: false,
            ..test_config()
        };
        let cache = VisibilityCache::new(&config);
        cache
            .insert("key_a".into(), "A", test_ranking(Platform::ChatGpt, 10))
            .await;

        assert!(cache.get("key_a").await.is_none());
        assert_eq!(cache.stats().await.entries, 0);
    }
}

use brandlens_core::PlatformRanking;
use std::time::{Duration, SystemTime};

/// Cache entry metadata
#[derive(Debug, Clone)]
pub struct CacheEntry<T> {
    pub value: T,
    pub created_at: SystemTime,
    pub last_accessed: SystemTime,
    pub access_count: u64,
    pub size_bytes: usize,
    pub ttl: Option<Duration>,
}

impl<T> CacheEntry<T> {
    pub fn new(value: T, size_bytes: usize, ttl: Option<Duration>) -> Self {
        let now = SystemTime::now();
        Self {
            value,
            created_at: now,
            last_accessed: now,
            access_count: 1,
            size_bytes,
            ttl,
        }
    }

    pub fn is_expired(&self) -> bool {
        if let Some(ttl) = self.ttl {
            self.created_at.elapsed().unwrap_or(Duration::ZERO) > ttl
        } else {
            false
        }
    }

    pub fn touch(&mut self) {
        self.last_accessed = SystemTime::now();
        self.access_count += 1;
    }
}

/// Cache performance statistics
#[derive(Debug, Clone, Default)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    pub entries: usize,
    pub memory_usage: u64,
    pub hit_rate: f64,
}

impl CacheStats {
    pub fn hit_rate(&self) -> f64 {
        if self.hits + self.misses == 0 {
            0.0
        } else {
            self.hits as f64 / (self.hits + self.misses) as f64
        }
    }

    pub fn miss_rate(&self) -> f64 {
        1.0 - self.hit_rate()
    }
}

/// Trait for cache size estimation
pub trait CacheSizeEstimator {
    fn estimate_size(&self) -> usize;
}

impl CacheSizeEstimator for String {
    fn estimate_size(&self) -> usize {
        self.len()
    }
}

impl CacheSizeEstimator for Vec<String> {
    fn estimate_size(&self) -> usize {
        self.iter().map(|s| s.len()).sum::<usize>() + self.len() * std::mem::size_of::<String>()
    }
}

impl CacheSizeEstimator for PlatformRanking {
    fn estimate_size(&self) -> usize {
        std::mem::size_of::<Self>() + self.recommendations.estimate_size()
    }
}

pub mod cache;
pub mod visibility;

pub use brandlens_core::CacheConfig;
pub use cache::{CacheEntry, CacheSizeEstimator, CacheStats};
pub use visibility::{CachedVisibility, VisibilityCache};

use brandlens_analysis::{EngineOptions, VisibilityEngine};
use brandlens_cache::VisibilityCache;
use brandlens_core::{BrandLensConfig, BrandLensError, Result};
use brandlens_providers::ProviderRegistry;
use brandlens_store::AnalysisStore;
use std::sync::Arc;
use std::time::Instant;

#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<VisibilityEngine>,
    pub store: Arc<AnalysisStore>,
    pub config: Arc<BrandLensConfig>,
    pub started_at: Instant,
}

impl AppState {
    /// Build the full state from configuration: provider registry, cache,
    /// SQLite store and the engine wired together.
    pub fn from_config(config: BrandLensConfig) -> Result<Self> {
        let registry = ProviderRegistry::from_config(&config.providers)
            .map_err(|e| BrandLensError::Provider(e.to_string()))?;
        let store = Arc::new(AnalysisStore::open_at(&config.storage.db_path)?);
        Self::with_parts(config, registry, store)
    }

    /// Assemble state from pre-built parts. Tests use this with an in-memory
    /// store and injected providers.
    pub fn with_parts(
        config: BrandLensConfig,
        registry: ProviderRegistry,
        store: Arc<AnalysisStore>,
    ) -> Result<Self> {
        let options = EngineOptions::from_config(&config)?;
        let cache = Arc::new(VisibilityCache::new(&config.cache));
        let engine = Arc::new(VisibilityEngine::new(
            registry,
            cache,
            Arc::clone(&store),
            options,
        ));

        Ok(Self {
            engine,
            store,
            config: Arc::new(config),
            started_at: Instant::now(),
        })
    }

    /// The user scope requests are recorded under.
    pub fn user_id(&self) -> &str {
        &self.config.analysis.user_id
    }
}

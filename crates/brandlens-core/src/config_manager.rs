use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;
use tracing::{info, warn};

use crate::types::{Platform, SubscriptionTier};

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Config file not found: {0}")]
    NotFound(String),

    #[error("Failed to read config: {0}")]
    ReadError(String),

    #[error("Failed to parse config: {0}")]
    ParseError(String),

    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

/// Main configuration for BrandLens
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct BrandLensConfig {
    /// Per-vendor LLM provider settings
    #[serde(default)]
    pub providers: ProvidersConfig,

    /// Analysis behavior (query counts, concurrency, judge provider)
    #[serde(default)]
    pub analysis: AnalysisConfig,

    /// Visibility cache settings
    #[serde(default)]
    pub cache: CacheConfig,

    /// Persistence settings
    #[serde(default)]
    pub storage: StorageConfig,

    /// HTTP API settings
    #[serde(default)]
    pub api: ApiConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Settings for all four LLM vendors
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ProvidersConfig {
    #[serde(default)]
    pub openai: ProviderConfig,

    #[serde(default)]
    pub anthropic: ProviderConfig,

    #[serde(default)]
    pub gemini: ProviderConfig,

    #[serde(default)]
    pub perplexity: ProviderConfig,
}

impl ProvidersConfig {
    pub fn for_platform(&self, platform: Platform) -> &ProviderConfig {
        match platform {
            Platform::ChatGpt => &self.openai,
            Platform::Claude => &self.anthropic,
            Platform::Gemini => &self.gemini,
            Platform::Perplexity => &self.perplexity,
        }
    }
}

/// Settings for a single LLM vendor
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Whether this vendor participates in analyses
    #[serde(default = "default_provider_enabled")]
    pub enabled: bool,

    /// API key (usually supplied via environment variable)
    #[serde(default)]
    pub api_key: Option<String>,

    /// Model identifier (None = vendor default)
    #[serde(default)]
    pub model: Option<String>,

    /// Base URL override (None = vendor default)
    #[serde(default)]
    pub base_url: Option<String>,

    /// Request timeout in seconds
    #[serde(default = "default_provider_timeout_secs")]
    pub timeout_secs: u64,

    /// Maximum retries for retryable failures
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            enabled: default_provider_enabled(),
            api_key: None,
            model: None,
            base_url: None,
            timeout_secs: default_provider_timeout_secs(),
            max_retries: default_max_retries(),
        }
    }
}

/// Analysis behavior
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisConfig {
    /// Queries sent to each platform per analysis
    #[serde(default = "default_queries_per_platform")]
    pub queries_per_platform: usize,

    /// Maximum concurrent provider requests
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent_requests: usize,

    /// Maximum tokens per generation
    #[serde(default = "default_max_tokens")]
    pub max_tokens: usize,

    /// Sampling temperature
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Platform used for competitor discovery and estimates:
    /// "chatgpt", "claude", "gemini", or "perplexity"
    #[serde(default = "default_judge_provider")]
    pub judge_provider: String,

    /// Subscription tier: "free", "starter", "pro", or "enterprise"
    #[serde(default = "default_subscription_tier")]
    pub subscription_tier: String,

    /// Scope string usage and analyses are recorded under
    #[serde(default = "default_user_id")]
    pub user_id: String,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            queries_per_platform: default_queries_per_platform(),
            max_concurrent_requests: default_max_concurrent(),
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
            judge_provider: default_judge_provider(),
            subscription_tier: default_subscription_tier(),
            user_id: default_user_id(),
        }
    }
}

/// Visibility cache settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Serve repeated brand+platform queries from cache
    #[serde(default = "default_cache_enabled")]
    pub enabled: bool,

    /// Entry time-to-live in seconds
    #[serde(default = "default_cache_ttl_secs")]
    pub ttl_secs: u64,

    /// Maximum cached entries before LRU eviction
    #[serde(default = "default_cache_max_entries")]
    pub max_entries: usize,

    /// Maximum cache memory in bytes before LRU eviction
    #[serde(default = "default_cache_max_memory_bytes")]
    pub max_memory_bytes: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: default_cache_enabled(),
            ttl_secs: default_cache_ttl_secs(),
            max_entries: default_cache_max_entries(),
            max_memory_bytes: default_cache_max_memory_bytes(),
        }
    }
}

/// Persistence settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// SQLite database path
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
        }
    }
}

/// HTTP API settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Listen address for the API server
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    /// Expected bearer token. None = accept any non-empty bearer.
    #[serde(default)]
    pub auth_token: Option<String>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            auth_token: None,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level: "trace", "debug", "info", "warn", "error"
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format: "pretty", "json", "compact"
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

// Default value functions
fn default_provider_enabled() -> bool {
    true
}
fn default_provider_timeout_secs() -> u64 {
    30
}
fn default_max_retries() -> u32 {
    3
}
fn default_queries_per_platform() -> usize {
    3
}
fn default_max_concurrent() -> usize {
    4
}
fn default_max_tokens() -> usize {
    300
}
fn default_temperature() -> f32 {
    0.7
}
fn default_judge_provider() -> String {
    "chatgpt".to_string()
}
fn default_subscription_tier() -> String {
    "free".to_string()
}
fn default_user_id() -> String {
    "local".to_string()
}
fn default_cache_enabled() -> bool {
    true
}
fn default_cache_ttl_secs() -> u64 {
    86_400
} // 24 hours
fn default_cache_max_entries() -> usize {
    10_000
}
fn default_cache_max_memory_bytes() -> usize {
    64 * 1024 * 1024
}
fn default_db_path() -> PathBuf {
    dirs::home_dir()
        .map(|home| home.join(".brandlens").join("brandlens.db"))
        .unwrap_or_else(|| PathBuf::from("brandlens.db"))
}
fn default_bind_addr() -> String {
    "127.0.0.1:8787".to_string()
}
fn default_log_level() -> String {
    "info".to_string()
}
fn default_log_format() -> String {
    "pretty".to_string()
}

/// Configuration manager with env and file discovery
pub struct ConfigManager {
    config: BrandLensConfig,
    config_path: Option<PathBuf>,
}

impl ConfigManager {
    /// Load configuration with the following precedence:
    /// 1. Environment variables (.env file)
    /// 2. Config file (.brandlens.toml)
    /// 3. Sensible defaults
    pub fn load() -> Result<Self, ConfigError> {
        info!("🔧 Loading BrandLens configuration...");

        // Try to load .env file from current directory or home
        Self::load_dotenv();

        // Try to find and load config file
        let (config, config_path) = Self::load_config_file()?;

        // Override with environment variables
        let config = Self::apply_env_overrides(config);

        // Validate configuration
        Self::validate_config(&config)?;

        info!("✅ Configuration loaded successfully");
        if let Some(ref path) = config_path {
            info!("   📄 Config file: {}", path.display());
        } else {
            info!("   📄 Config file: NONE (using defaults)");
        }
        let configured: Vec<&str> = Platform::ALL
            .iter()
            .filter(|p| config.providers.for_platform(**p).api_key.is_some())
            .map(|p| p.display_name())
            .collect();
        info!("   🔑 Providers with API keys: {:?}", configured);
        info!(
            "   🔍 Queries per platform: {}",
            config.analysis.queries_per_platform
        );
        info!(
            "   💾 Cache: {}",
            if config.cache.enabled {
                "enabled"
            } else {
                "disabled"
            }
        );

        Ok(Self {
            config,
            config_path,
        })
    }

    /// Load configuration from an explicit config file path. Env overrides
    /// still apply. A missing file is an error here, unlike `load`'s
    /// discovery which falls back to defaults.
    pub fn load_from(path: Option<&Path>) -> Result<Self, ConfigError> {
        let Some(path) = path else {
            return Self::load();
        };

        Self::load_dotenv();

        if !path.exists() {
            return Err(ConfigError::NotFound(path.display().to_string()));
        }

        let config = Self::read_toml_file(path)?;
        let config = Self::apply_env_overrides(config);
        Self::validate_config(&config)?;

        Ok(Self {
            config,
            config_path: Some(path.to_path_buf()),
        })
    }

    /// Load .env file if it exists
    fn load_dotenv() {
        // Try current directory first
        if Path::new(".env").exists() {
            if let Err(e) = dotenv::from_filename(".env") {
                warn!("Failed to load .env file: {}", e);
            } else {
                info!("📋 Loaded .env file from current directory");
            }
            return;
        }

        // Try home directory
        if let Some(home) = dirs::home_dir() {
            let home_env = home.join(".brandlens.env");
            if home_env.exists() {
                if let Err(e) = dotenv::from_path(&home_env) {
                    warn!("Failed to load .brandlens.env: {}", e);
                } else {
                    info!("📋 Loaded .brandlens.env from home directory");
                }
            }
        }
    }

    /// Find and load config file
    /// Search order:
    /// 1. ./.brandlens.toml (current directory)
    /// 2. ~/.brandlens/config.toml (user config)
    /// 3. Use defaults
    fn load_config_file() -> Result<(BrandLensConfig, Option<PathBuf>), ConfigError> {
        // Try current directory
        let local_config = Path::new(".brandlens.toml");
        if local_config.exists() {
            let config = Self::read_toml_file(local_config)?;
            return Ok((config, Some(local_config.to_path_buf())));
        }

        // Try user config directory
        if let Some(home) = dirs::home_dir() {
            let user_config = home.join(".brandlens").join("config.toml");
            if user_config.exists() {
                let config = Self::read_toml_file(&user_config)?;
                return Ok((config, Some(user_config)));
            }
        }

        // Use defaults
        info!("📋 No config file found, using defaults");
        Ok((BrandLensConfig::default(), None))
    }

    /// Read TOML config file
    fn read_toml_file(path: &Path) -> Result<BrandLensConfig, ConfigError> {
        let content =
            std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError(e.to_string()))?;

        let config: BrandLensConfig =
            toml::from_str(&content).map_err(|e| ConfigError::ParseError(e.to_string()))?;

        Ok(config)
    }

    /// Apply environment variable overrides
    fn apply_env_overrides(mut config: BrandLensConfig) -> BrandLensConfig {
        // Vendor API keys (the names the hosted original used)
        if let Ok(key) = std::env::var("OPENAI_API_KEY") {
            config.providers.openai.api_key = Some(key);
        }
        if let Ok(key) = std::env::var("ANTHROPIC_API_KEY") {
            config.providers.anthropic.api_key = Some(key);
        }
        if let Ok(key) =
            std::env::var("GOOGLE_API_KEY").or_else(|_| std::env::var("GEMINI_API_KEY"))
        {
            config.providers.gemini.api_key = Some(key);
        }
        if let Ok(key) = std::env::var("PERPLEXITY_API_KEY") {
            config.providers.perplexity.api_key = Some(key);
        }

        // Analysis configuration
        if let Ok(judge) = std::env::var("BRANDLENS_JUDGE_PROVIDER") {
            config.analysis.judge_provider = judge;
        }
        if let Ok(tier) = std::env::var("BRANDLENS_TIER") {
            config.analysis.subscription_tier = tier;
        }
        if let Ok(user) = std::env::var("BRANDLENS_USER_ID") {
            config.analysis.user_id = user;
        }
        if let Ok(queries) = std::env::var("BRANDLENS_QUERIES_PER_PLATFORM") {
            if let Ok(n) = queries.parse() {
                config.analysis.queries_per_platform = n;
            }
        }
        if let Ok(concurrent) = std::env::var("BRANDLENS_MAX_CONCURRENT") {
            if let Ok(n) = concurrent.parse() {
                config.analysis.max_concurrent_requests = n;
            }
        }

        // Cache configuration
        if let Ok(enabled) = std::env::var("BRANDLENS_CACHE_ENABLED") {
            config.cache.enabled = enabled.to_lowercase() == "true" || enabled == "1";
        }
        if let Ok(ttl) = std::env::var("BRANDLENS_CACHE_TTL_SECS") {
            if let Ok(secs) = ttl.parse() {
                config.cache.ttl_secs = secs;
            }
        }

        // Storage and API
        if let Ok(path) = std::env::var("BRANDLENS_DB_PATH") {
            config.storage.db_path = PathBuf::from(path);
        }
        if let Ok(addr) = std::env::var("BRANDLENS_BIND_ADDR") {
            config.api.bind_addr = addr;
        }
        if let Ok(token) = std::env::var("BRANDLENS_AUTH_TOKEN") {
            config.api.auth_token = Some(token);
        }

        // Logging
        if let Ok(level) = std::env::var("RUST_LOG") {
            config.logging.level = level;
        }

        config
    }

    /// Validate configuration
    fn validate_config(config: &BrandLensConfig) -> Result<(), ConfigError> {
        // Validate judge provider
        if Platform::from_str(&config.analysis.judge_provider).is_err() {
            return Err(ConfigError::ValidationError(format!(
                "Invalid judge provider: {}. Must be one of: chatgpt, claude, gemini, perplexity",
                config.analysis.judge_provider
            )));
        }

        // Validate subscription tier
        if SubscriptionTier::from_str(&config.analysis.subscription_tier).is_err() {
            return Err(ConfigError::ValidationError(format!(
                "Invalid subscription tier: {}. Must be one of: free, starter, pro, enterprise",
                config.analysis.subscription_tier
            )));
        }

        // Validate analysis bounds
        if config.analysis.queries_per_platform == 0 {
            return Err(ConfigError::ValidationError(
                "queries_per_platform must be at least 1".to_string(),
            ));
        }
        if config.analysis.max_concurrent_requests == 0 {
            return Err(ConfigError::ValidationError(
                "max_concurrent_requests must be at least 1".to_string(),
            ));
        }

        // Validate log level
        match config.logging.level.as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            // RUST_LOG directives pass through untouched
            other if other.contains('=') || other.contains(',') => {}
            other => {
                return Err(ConfigError::ValidationError(format!(
                    "Invalid log level: {}. Must be one of: trace, debug, info, warn, error",
                    other
                )))
            }
        }

        // Validate log format
        match config.logging.format.as_str() {
            "pretty" | "json" | "compact" => {}
            other => {
                return Err(ConfigError::ValidationError(format!(
                    "Invalid log format: {}. Must be one of: pretty, json, compact",
                    other
                )))
            }
        }

        Ok(())
    }

    /// Get the loaded configuration
    pub fn config(&self) -> &BrandLensConfig {
        &self.config
    }

    /// Get the path to the config file that was loaded, if any
    pub fn config_path(&self) -> Option<&Path> {
        self.config_path.as_deref()
    }

    /// Create a default config file
    pub fn create_default_config(path: &Path) -> Result<(), ConfigError> {
        let config = BrandLensConfig::default();
        let toml_str =
            toml::to_string_pretty(&config).map_err(|e| ConfigError::ParseError(e.to_string()))?;

        // Create parent directory if needed
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::ReadError(e.to_string()))?;
        }

        std::fs::write(path, toml_str).map_err(|e| ConfigError::ReadError(e.to_string()))?;

        Ok(())
    }
}

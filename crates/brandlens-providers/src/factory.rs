use anyhow::{bail, Result};
use brandlens_core::{Platform, ProviderConfig, ProvidersConfig};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, warn};

use crate::anthropic::{AnthropicConfig, AnthropicProvider};
use crate::gemini::{GeminiConfig, GeminiProvider};
use crate::keys::validate_key_format;
use crate::llm_provider::LLMProvider;
use crate::openai::{OpenAIConfig, OpenAIProvider};
use crate::perplexity::{PerplexityConfig, PerplexityProvider};

/// The set of LLM providers configured for this run, one per platform.
pub struct ProviderRegistry {
    providers: HashMap<Platform, Arc<dyn LLMProvider>>,
}

impl ProviderRegistry {
    /// Build one provider per enabled platform that has an API key.
    /// Platforms without a key are skipped with a warning; a key that does
    /// not match the vendor's format is an error. An empty registry is
    /// allowed here and rejected when an analysis is attempted.
    pub fn from_config(config: &ProvidersConfig) -> Result<Self> {
        let mut providers: HashMap<Platform, Arc<dyn LLMProvider>> = HashMap::new();

        for platform in Platform::ALL {
            let provider_config = config.for_platform(platform);
            if !provider_config.enabled {
                continue;
            }

            let Some(api_key) = provider_config.api_key.clone() else {
                warn!(
                    "{} has no API key configured, skipping",
                    platform.display_name()
                );
                continue;
            };

            if !validate_key_format(platform, &api_key) {
                bail!(
                    "{} API key does not match the expected format",
                    platform.display_name()
                );
            }

            let provider = Self::build_provider(platform, api_key, provider_config)?;
            providers.insert(platform, provider);
        }

        info!("Configured {} LLM provider(s)", providers.len());
        Ok(Self { providers })
    }

    /// Registry with no providers.
    pub fn empty() -> Self {
        Self {
            providers: HashMap::new(),
        }
    }

    fn build_provider(
        platform: Platform,
        api_key: String,
        config: &ProviderConfig,
    ) -> Result<Arc<dyn LLMProvider>> {
        match platform {
            Platform::ChatGpt => {
                let mut vendor = OpenAIConfig {
                    api_key,
                    timeout_secs: config.timeout_secs,
                    max_retries: config.max_retries,
                    ..Default::default()
                };
                if let Some(model) = &config.model {
                    vendor.model = model.clone();
                }
                if let Some(base_url) = &config.base_url {
                    vendor.base_url = base_url.clone();
                }
                Ok(Arc::new(OpenAIProvider::new(vendor)?))
            }
            Platform::Claude => {
                let mut vendor = AnthropicConfig {
                    api_key,
                    timeout_secs: config.timeout_secs,
                    max_retries: config.max_retries,
                    ..Default::default()
                };
                if let Some(model) = &config.model {
                    vendor.model = model.clone();
                }
                if let Some(base_url) = &config.base_url {
                    vendor.base_url = base_url.clone();
                }
                Ok(Arc::new(AnthropicProvider::new(vendor)?))
            }
            Platform::Gemini => {
                let mut vendor = GeminiConfig {
                    api_key,
                    timeout_secs: config.timeout_secs,
                    max_retries: config.max_retries,
                    ..Default::default()
                };
                if let Some(model) = &config.model {
                    vendor.model = model.clone();
                }
                if let Some(base_url) = &config.base_url {
                    vendor.base_url = base_url.clone();
                }
                Ok(Arc::new(GeminiProvider::new(vendor)?))
            }
            Platform::Perplexity => {
                let mut vendor = PerplexityConfig {
                    api_key,
                    timeout_secs: config.timeout_secs,
                    max_retries: config.max_retries,
                    ..Default::default()
                };
                if let Some(model) = &config.model {
                    vendor.model = model.clone();
                }
                if let Some(base_url) = &config.base_url {
                    vendor.base_url = base_url.clone();
                }
                Ok(Arc::new(PerplexityProvider::new(vendor)?))
            }
        }
    }

    /// Register a provider directly. Used to inject test doubles.
    pub fn insert(&mut self, provider: Arc<dyn LLMProvider>) {
        self.providers.insert(provider.platform(), provider);
    }

    pub fn get(&self, platform: Platform) -> Option<Arc<dyn LLMProvider>> {
        self.providers.get(&platform).map(Arc::clone)
    }

    /// Configured platforms in canonical order.
    pub fn platforms(&self) -> Vec<Platform> {
        Platform::ALL
            .iter()
            .copied()
            .filter(|p| self.providers.contains_key(p))
            .collect()
    }

    /// Iterate providers in canonical platform order.
    pub fn iter(&self) -> impl Iterator<Item = (Platform, Arc<dyn LLMProvider>)> + '_ {
        Platform::ALL
            .iter()
            .filter_map(move |p| self.providers.get(p).map(|prov| (*p, Arc::clone(prov))))
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }
}

impl Default for ProviderRegistry {
    fn default() -> Self {
        Self::empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_builds_empty_registry() {
        let registry = ProviderRegistry::from_config(&ProvidersConfig::default()).unwrap();
        assert!(registry.is_empty());
        assert!(registry.platforms().is_empty());
    }

    #[test]
    fn test_configured_platform_is_registered() {
        let mut config = ProvidersConfig::default();
        config.openai.api_key = Some("sk-test-0000000000000000000".to_string());

        let registry = ProviderRegistry::from_config(&config).unwrap();
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.platforms(), vec![Platform::ChatGpt]);
        assert!(registry.get(Platform::ChatGpt).is_some());
        assert!(registry.get(Platform::Claude).is_none());
    }

    #[test]
    fn test_disabled_platform_is_skipped() {
        let mut config = ProvidersConfig::default();
        config.openai.api_key = Some("sk-test-0000000000000000000".to_string());
        config.openai.enabled = false;

        let registry = ProviderRegistry::from_config(&config).unwrap();
        assert!(registry.is_empty());
    }

    #[test]
    fn test_malformed_key_is_an_error() {
        let mut config = ProvidersConfig::default();
        config.anthropic.api_key = Some("sk-wrong-prefix-000000000".to_string());

        assert!(ProviderRegistry::from_config(&config).is_err());
    }

    #[test]
    fn test_platform_order_is_canonical() {
        let mut config = ProvidersConfig::default();
        config.perplexity.api_key = Some("pplx-test-000000000000000000".to_string());
        config.openai.api_key = Some("sk-test-0000000000000000000".to_string());

        let registry = ProviderRegistry::from_config(&config).unwrap();
        assert_eq!(
            registry.platforms(),
            vec![Platform::ChatGpt, Platform::Perplexity]
        );
    }
}

use crate::llm_provider::*;
use crate::retry::{ProviderError, RetryPolicy};
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use brandlens_core::Platform;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

const PERPLEXITY_API_BASE: &str = "https://api.perplexity.ai";
const DEFAULT_MODEL: &str = "llama-3.1-sonar-small-128k-online";

/// Configuration for Perplexity provider
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PerplexityConfig {
    /// API key for Perplexity
    pub api_key: String,
    /// Base URL for API (default: https://api.perplexity.ai)
    pub base_url: String,
    /// Model to use (e.g., "llama-3.1-sonar-small-128k-online")
    pub model: String,
    /// Request timeout in seconds
    pub timeout_secs: u64,
    /// Maximum retries for failed requests
    pub max_retries: u32,
}

impl Default for PerplexityConfig {
    fn default() -> Self {
        Self {
            api_key: std::env::var("PERPLEXITY_API_KEY").unwrap_or_default(),
            base_url: PERPLEXITY_API_BASE.to_string(),
            model: DEFAULT_MODEL.to_string(),
            timeout_secs: 30,
            max_retries: 3,
        }
    }
}

/// Perplexity LLM provider. The API is OpenAI chat-completions
/// compatible with online (search-grounded) models.
pub struct PerplexityProvider {
    config: PerplexityConfig,
    client: Client,
    retry: RetryPolicy,
}

impl PerplexityProvider {
    /// Create a new Perplexity provider
    pub fn new(config: PerplexityConfig) -> Result<Self> {
        if config.api_key.is_empty() {
            return Err(anyhow!(
                "Perplexity API key is required. Set PERPLEXITY_API_KEY environment variable."
            ));
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .context("Failed to create HTTP client")?;

        let retry = RetryPolicy::new(config.max_retries);

        Ok(Self {
            config,
            client,
            retry,
        })
    }

    /// Create from environment variables
    pub fn from_env() -> Result<Self> {
        Self::new(PerplexityConfig::default())
    }

    fn build_request(&self, messages: &[Message], config: &GenerationConfig) -> ChatRequest {
        ChatRequest {
            model: self.config.model.clone(),
            messages: messages
                .iter()
                .map(|m| ChatMessage {
                    role: m.role.to_string(),
                    content: m.content.clone(),
                })
                .collect(),
            max_tokens: config.max_tokens,
            temperature: Some(config.temperature),
            top_p: config.top_p,
        }
    }

    /// Try a single request to the chat completions endpoint
    async fn try_request(
        &self,
        messages: &[Message],
        config: &GenerationConfig,
    ) -> Result<ChatResponse, ProviderError> {
        let request = self.build_request(messages, config);

        let response = self
            .client
            .post(format!("{}/chat/completions", self.config.base_url))
            .bearer_auth(&self.config.api_key)
            .json(&request)
            .send()
            .await
            .map_err(ProviderError::from_reqwest)?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(ProviderError::Http {
                status: status.as_u16(),
                body,
            });
        }

        response
            .json::<ChatResponse>()
            .await
            .map_err(|e| ProviderError::Parse(e.to_string()))
    }
}

#[async_trait]
impl LLMProvider for PerplexityProvider {
    async fn generate_chat(
        &self,
        messages: &[Message],
        config: &GenerationConfig,
    ) -> LLMResult<LLMResponse> {
        let response = self
            .retry
            .run("Perplexity", || self.try_request(messages, config))
            .await?;

        let choice = response
            .choices
            .into_iter()
            .next()
            .ok_or(ProviderError::EmptyResponse)?;

        if choice.message.content.trim().is_empty() {
            return Err(ProviderError::EmptyResponse.into());
        }

        Ok(LLMResponse {
            content: choice.message.content,
            total_tokens: response.usage.as_ref().map(|u| u.total_tokens),
            prompt_tokens: response.usage.as_ref().map(|u| u.prompt_tokens),
            completion_tokens: response.usage.as_ref().map(|u| u.completion_tokens),
            finish_reason: choice.finish_reason,
            model: response.model,
        })
    }

    async fn is_available(&self) -> bool {
        let config = GenerationConfig {
            max_tokens: Some(1),
            ..Default::default()
        };
        self.generate_chat(&[Message::user("ping")], &config)
            .await
            .is_ok()
    }

    fn platform(&self) -> Platform {
        Platform::Perplexity
    }

    fn model_name(&self) -> &str {
        &self.config.model
    }
}

// Perplexity API request/response types (OpenAI-compatible)

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_p: Option<f32>,
}

#[derive(Debug, Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    model: String,
    choices: Vec<ChatChoice>,
    usage: Option<ChatUsage>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    #[serde(default)]
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatUsage {
    prompt_tokens: usize,
    completion_tokens: usize,
    total_tokens: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_creation_requires_api_key() {
        let config = PerplexityConfig {
            api_key: String::new(),
            ..Default::default()
        };
        assert!(PerplexityProvider::new(config).is_err());
    }

    #[test]
    fn test_request_targets_online_model() {
        let provider = PerplexityProvider::new(PerplexityConfig {
            api_key: "pplx-test-0000000000000000".to_string(),
            ..Default::default()
        })
        .unwrap();

        let request = provider.build_request(
            &[Message::user("best accounting software")],
            &GenerationConfig::default(),
        );
        assert_eq!(request.model, "llama-3.1-sonar-small-128k-online");
        assert_eq!(request.messages.len(), 1);
    }
}

use crate::llm_provider::*;
use crate::retry::{ProviderError, RetryPolicy};
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use brandlens_core::Platform;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";
const DEFAULT_MODEL: &str = "gemini-pro";

/// Configuration for Google Gemini provider
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeminiConfig {
    /// API key for Google AI
    pub api_key: String,
    /// Base URL for API (default: https://generativelanguage.googleapis.com/v1beta)
    pub base_url: String,
    /// Model to use (e.g., "gemini-pro")
    pub model: String,
    /// Request timeout in seconds
    pub timeout_secs: u64,
    /// Maximum retries for failed requests
    pub max_retries: u32,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            api_key: std::env::var("GOOGLE_API_KEY").unwrap_or_default(),
            base_url: GEMINI_API_BASE.to_string(),
            model: DEFAULT_MODEL.to_string(),
            timeout_secs: 30,
            max_retries: 3,
        }
    }
}

/// Google Gemini LLM provider
pub struct GeminiProvider {
    config: GeminiConfig,
    client: Client,
    retry: RetryPolicy,
}

impl GeminiProvider {
    /// Create a new Gemini provider
    pub fn new(config: GeminiConfig) -> Result<Self> {
        if config.api_key.is_empty() {
            return Err(anyhow!(
                "Google API key is required. Set GOOGLE_API_KEY environment variable."
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
        Self::new(GeminiConfig::default())
    }

    /// generateContent has no chat roles in the shape we use; system and
    /// user turns are folded into a single text blob.
    fn build_request(&self, messages: &[Message], config: &GenerationConfig) -> GeminiRequest {
        let text = messages
            .iter()
            .map(|m| m.content.as_str())
            .collect::<Vec<_>>()
            .join("\n\n");

        GeminiRequest {
            contents: vec![GeminiContent {
                parts: vec![GeminiPart { text }],
            }],
            generation_config: Some(GeminiGenerationConfig {
                max_output_tokens: config.max_tokens,
                temperature: Some(config.temperature),
                top_p: config.top_p,
            }),
        }
    }

    /// Try a single request to the generateContent endpoint
    async fn try_request(
        &self,
        messages: &[Message],
        config: &GenerationConfig,
    ) -> Result<GeminiResponse, ProviderError> {
        let request = self.build_request(messages, config);
        let url = format!(
            "{}/models/{}:generateContent?key={}",
            self.config.base_url, self.config.model, self.config.api_key
        );

        let response = self
            .client
            .post(url)
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
            .json::<GeminiResponse>()
            .await
            .map_err(|e| ProviderError::Parse(e.to_string()))
    }
}

#[async_trait]
impl LLMProvider for GeminiProvider {
    async fn generate_chat(
        &self,
        messages: &[Message],
        config: &GenerationConfig,
    ) -> LLMResult<LLMResponse> {
        let response = self
            .retry
            .run("Gemini", || self.try_request(messages, config))
            .await?;

        let candidate = response
            .candidates
            .into_iter()
            .next()
            .ok_or(ProviderError::EmptyResponse)?;

        let content = candidate
            .content
            .map(|c| {
                c.parts
                    .iter()
                    .map(|p| p.text.as_str())
                    .collect::<Vec<_>>()
                    .join("")
            })
            .unwrap_or_default();

        if content.trim().is_empty() {
            return Err(ProviderError::EmptyResponse.into());
        }

        Ok(LLMResponse {
            content,
            total_tokens: response
                .usage_metadata
                .as_ref()
                .and_then(|u| u.total_token_count),
            prompt_tokens: response
                .usage_metadata
                .as_ref()
                .and_then(|u| u.prompt_token_count),
            completion_tokens: response
                .usage_metadata
                .as_ref()
                .and_then(|u| u.candidates_token_count),
            finish_reason: candidate.finish_reason,
            model: self.config.model.clone(),
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
        Platform::Gemini
    }

    fn model_name(&self) -> &str {
        &self.config.model
    }
}

// Gemini API request/response types

#[derive(Debug, Serialize)]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
    #[serde(rename = "generationConfig", skip_serializing_if = "Option::is_none")]
    generation_config: Option<GeminiGenerationConfig>,
}

#[derive(Debug, Serialize)]
struct GeminiContent {
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Serialize)]
struct GeminiPart {
    text: String,
}

#[derive(Debug, Serialize)]
struct GeminiGenerationConfig {
    #[serde(rename = "maxOutputTokens", skip_serializing_if = "Option::is_none")]
    max_output_tokens: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(rename = "topP", skip_serializing_if = "Option::is_none")]
    top_p: Option<f32>,
}

#[derive(Debug, Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
    #[serde(rename = "usageMetadata")]
    usage_metadata: Option<GeminiUsageMetadata>,
}

#[derive(Debug, Deserialize)]
struct GeminiCandidate {
    content: Option<GeminiCandidateContent>,
    #[serde(rename = "finishReason")]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GeminiCandidateContent {
    #[serde(default)]
    parts: Vec<GeminiResponsePart>,
}

#[derive(Debug, Deserialize)]
struct GeminiResponsePart {
    #[serde(default)]
    text: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiUsageMetadata {
    prompt_token_count: Option<usize>,
    candidates_token_count: Option<usize>,
    total_token_count: Option<usize>,
}

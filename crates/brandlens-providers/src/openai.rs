use crate::llm_provider::*;
use crate::retry::{ProviderError, RetryPolicy};
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use brandlens_core::Platform;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

const OPENAI_API_BASE: &str = "https://api.openai.com/v1";
const DEFAULT_MODEL: &str = "gpt-4o-mini";

/// Configuration for OpenAI provider
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenAIConfig {
    /// API key for OpenAI
    pub api_key: String,
    /// Base URL for API (default: https://api.openai.com/v1)
    pub base_url: String,
    /// Model to use (e.g., "gpt-4o-mini")
    pub model: String,
    /// Request timeout in seconds
    pub timeout_secs: u64,
    /// Maximum retries for failed requests
    pub max_retries: u32,
}

impl Default for OpenAIConfig {
    fn default() -> Self {
        Self {
            api_key: std::env::var("OPENAI_API_KEY").unwrap_or_default(),
            base_url: OPENAI_API_BASE.to_string(),
            model: DEFAULT_MODEL.to_string(),
            timeout_secs: 30,
            max_retries: 3,
        }
    }
}

/// OpenAI Chat Completions provider (the ChatGPT platform)
pub struct OpenAIProvider {
    config: OpenAIConfig,
    client: Client,
    retry: RetryPolicy,
}

impl OpenAIProvider {
    /// Create a new OpenAI provider
    pub fn new(config: OpenAIConfig) -> Result<Self> {
        if config.api_key.is_empty() {
            return Err(anyhow!(
                "OpenAI API key is required. Set OPENAI_API_KEY environment variable."
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
        Self::new(OpenAIConfig::default())
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
            stop: config.stop.clone(),
        }
    }

    /// Try a single request to the Chat Completions API
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
impl LLMProvider for OpenAIProvider {
    async fn generate_chat(
        &self,
        messages: &[Message],
        config: &GenerationConfig,
    ) -> LLMResult<LLMResponse> {
        let response = self
            .retry
            .run("OpenAI", || self.try_request(messages, config))
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
        Platform::ChatGpt
    }

    fn model_name(&self) -> &str {
        &self.config.model
    }
}

// OpenAI API request/response types

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
    #[serde(skip_serializing_if = "Option::is_none")]
    stop: Option<Vec<String>>,
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

    fn test_provider() -> OpenAIProvider {
        OpenAIProvider::new(OpenAIConfig {
            api_key: "sk-test-0000000000000000000".to_string(),
            ..Default::default()
        })
        .unwrap()
    }

    #[test]
    fn test_provider_creation_requires_api_key() {
        let config = OpenAIConfig {
            api_key: String::new(),
            ..Default::default()
        };
        assert!(OpenAIProvider::new(config).is_err());
    }

    #[test]
    fn test_request_shape() {
        let provider = test_provider();
        let messages = vec![Message::system("be brief"), Message::user("hello")];
        let request = provider.build_request(&messages, &GenerationConfig::default());

        assert_eq!(request.model, "gpt-4o-mini");
        assert_eq!(request.messages.len(), 2);
        assert_eq!(request.messages[0].role, "system");
        assert_eq!(request.messages[1].role, "user");
        assert_eq!(request.max_tokens, Some(300));

        let json = serde_json::to_value(&request).unwrap();
        assert!(json.get("top_p").is_none());
        assert!(json.get("stop").is_none());
    }

    #[test]
    fn test_response_parsing() {
        let raw = r#"{
            "model": "gpt-4o-mini",
            "choices": [
                {"message": {"role": "assistant", "content": "Acme is a leader."}, "finish_reason": "stop"}
            ],
            "usage": {"prompt_tokens": 12, "completion_tokens": 6, "total_tokens": 18}
        }"#;
        let response: ChatResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(response.choices[0].message.content, "Acme is a leader.");
        assert_eq!(response.usage.as_ref().unwrap().total_tokens, 18);
    }
}

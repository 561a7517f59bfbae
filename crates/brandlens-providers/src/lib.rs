pub mod anthropic;
pub mod factory;
pub mod gemini;
pub mod keys;
pub mod llm_provider;
pub mod openai;
pub mod perplexity;
pub mod retry;

pub use anthropic::{AnthropicConfig, AnthropicProvider};
pub use factory::ProviderRegistry;
pub use gemini::{GeminiConfig, GeminiProvider};
pub use keys::validate_key_format;
pub use llm_provider::*;
pub use openai::{OpenAIConfig, OpenAIProvider};
pub use perplexity::{PerplexityConfig, PerplexityProvider};
pub use retry::{ProviderError, RetryPolicy};

use std::future::Future;
use std::time::Duration;
use thiserror::Error;
use tracing::warn;

/// Failure modes of a single provider request.
#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },

    #[error("Network error: {0}")]
    Network(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Provider returned an empty response")]
    EmptyResponse,

    #[error("Failed to parse provider response: {0}")]
    Parse(String),
}

impl ProviderError {
    /// Whether retrying can plausibly succeed. Transient transport
    /// failures and HTTP 408/429/5xx are retryable; other statuses,
    /// empty responses, and parse failures fail fast.
    pub fn is_retryable(&self) -> bool {
        match self {
            ProviderError::Network(_) | ProviderError::Timeout(_) => true,
            ProviderError::Http { status, .. } => {
                *status == 408 || *status == 429 || *status >= 500
            }
            ProviderError::EmptyResponse | ProviderError::Parse(_) => false,
        }
    }

    pub fn from_reqwest(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            ProviderError::Timeout(e.to_string())
        } else {
            ProviderError::Network(e.to_string())
        }
    }
}

/// Exponential backoff policy for provider requests.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_retries: u32) -> Self {
        Self {
            max_retries,
            ..Default::default()
        }
    }

    /// Delay before the given retry attempt (1-based): 1s, 2s, 4s, ...
    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.base_delay * 2u32.saturating_pow(attempt.saturating_sub(1))
    }

    /// Run `op` until it succeeds, retrying retryable failures with
    /// exponential backoff. Non-retryable failures are returned
    /// immediately.
    pub async fn run<T, F, Fut>(&self, provider: &str, mut op: F) -> Result<T, ProviderError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, ProviderError>>,
    {
        let mut last_error = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                // Exponential backoff: 1s, 2s, 4s
                tokio::time::sleep(self.delay_for(attempt)).await;
            }

            match op().await {
                Ok(value) => return Ok(value),
                Err(e) => {
                    if !e.is_retryable() || attempt == self.max_retries {
                        return Err(e);
                    }
                    warn!(
                        "{} request failed (attempt {}/{}), retrying: {}",
                        provider,
                        attempt + 1,
                        self.max_retries + 1,
                        e
                    );
                    last_error = Some(e);
                }
            }
        }

        // The loop always returns; this satisfies the compiler.
        Err(last_error.unwrap_or(ProviderError::EmptyResponse))
    }
}

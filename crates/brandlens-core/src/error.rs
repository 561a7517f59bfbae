use thiserror::Error;

#[derive(Error, Debug)]
pub enum BrandLensError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Config error: {0}")]
    Config(String),

    #[error("Provider error: {0}")]
    Provider(String),

    #[error("Analysis error: {0}")]
    Analysis(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    #[error("Monthly usage limit reached: {used}/{limit} analyses")]
    UsageLimit { used: u32, limit: u32 },

    #[error("All LLM providers failed: {0}")]
    AllProvidersFailed(String),
}

pub type Result<T> = std::result::Result<T, BrandLensError>;

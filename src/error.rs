//! Error types for the merchant lending assistant

use thiserror::Error;

/// Result type alias for assistant operations
pub type Result<T> = std::result::Result<T, AssistantError>;

#[derive(Error, Debug)]
pub enum AssistantError {

    // =============================
    // Core Pipeline Errors
    // =============================

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Record store error: {0}")]
    StoreError(String),

    #[error("Policy search error: {0}")]
    SearchError(String),

    #[error("Invalid record: {0}")]
    InvalidRecord(String),

    #[error("Invalid upload: {0}")]
    InvalidUpload(String),

    #[error(transparent)]
    Generation(#[from] GenerationError),

    // =============================
    // External Library Conversions
    // =============================

    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("HTTP client error: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Failures of the generative-text backend.
///
/// Only `RateLimited` and `Transient` are worth another attempt.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GenerationError {
    #[error("LLM rate limited: {0}")]
    RateLimited(String),

    #[error("LLM transient failure: {0}")]
    Transient(String),

    #[error("LLM request rejected: {0}")]
    Rejected(String),

    #[error("LLM returned no text")]
    EmptyResponse,
}

impl GenerationError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::RateLimited(_) | Self::Transient(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_classification() {
        assert!(GenerationError::RateLimited("429".into()).is_retryable());
        assert!(GenerationError::Transient("timeout".into()).is_retryable());
        assert!(!GenerationError::Rejected("bad key".into()).is_retryable());
        assert!(!GenerationError::EmptyResponse.is_retryable());
    }

    #[test]
    fn test_generation_error_is_transparent() {
        let err: AssistantError = GenerationError::RateLimited("quota".into()).into();
        assert_eq!(err.to_string(), "LLM rate limited: quota");
    }
}

//! Error types for the inference client.

use thiserror::Error;

/// Result type for inference client operations.
pub type Result<T> = std::result::Result<T, InferenceError>;

/// Inference client errors.
#[derive(Debug, Error)]
pub enum InferenceError {
    /// Connection failed, timeout
    #[error("Network error: {0}")]
    Network(String),

    /// Non-2xx response from the provider
    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// Provider answered 2xx but the body was not what we expected
    #[error("Parse error: {0}")]
    Parse(String),

    /// 2xx response with no choices / no embeddings
    #[error("Empty response: {0}")]
    EmptyResponse(String),
}

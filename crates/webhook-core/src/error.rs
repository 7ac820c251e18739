//! Webhook payload errors

use thiserror::Error;

/// Errors raised while decoding or authenticating webhook payloads
#[derive(Debug, Error)]
pub enum EventError {
    /// Body is not one of the known payload shapes
    #[error("Malformed payload: {0}")]
    MalformedPayload(String),

    /// Timestamp could not be parsed as ISO-8601
    #[error("Invalid timestamp format: {0}")]
    InvalidTimestamp(String),

    /// Signature could not be computed
    #[error("Signature error: {0}")]
    Signature(String),

    /// JSON serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

//! Reporter errors

use thiserror::Error;

/// Errors that can occur when delivering a report
#[derive(Debug, Error)]
pub enum ReporterError {
    /// HTTP request/response error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Sink answered with a non-success status
    #[error("Endpoint {endpoint} returned status {status}")]
    Status {
        /// Target URL
        endpoint: String,
        /// HTTP status code
        status: u16,
    },

    /// JSON serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Request signature could not be computed
    #[error("Signature error: {0}")]
    Signature(String),
}

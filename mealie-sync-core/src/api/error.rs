//! Errors from the Mealie HTTP API.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    /// No server URL has been configured.
    #[error("Server not configured. Run 'mealie auth login' first.")]
    NotConfigured,

    #[error("Invalid server URL: {0}")]
    InvalidUrl(String),

    /// The server rejected the token or credentials (401).
    #[error("Unauthorized. Please check your credentials.")]
    Unauthorized,

    #[error("Not found: {0}")]
    NotFound(String),

    /// The server rejected the request body (422).
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Server returned status {status}: {message}")]
    Status { status: u16, message: String },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Failed to decode response: {0}")]
    Decode(String),
}

impl ApiError {
    /// True for failures that a fresh login would fix.
    pub fn is_auth(&self) -> bool {
        matches!(self, ApiError::Unauthorized | ApiError::NotConfigured)
    }
}

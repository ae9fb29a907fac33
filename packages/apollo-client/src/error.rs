//! Typed errors for the Apollo client.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApolloError {
    /// HTTP transport failed
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Apollo API returned a non-success status
    #[error("Apollo API error {status}: {message}")]
    Api { status: u16, message: String },

    /// Response body did not match the expected shape
    #[error("unexpected Apollo response: {0}")]
    UnexpectedResponse(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, ApolloError>;

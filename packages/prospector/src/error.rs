//! Typed errors for the prospecting pipeline.
//!
//! Uses `thiserror` for library errors (not `anyhow`). Note that most
//! failure modes in this crate are deliberately *not* errors: provider
//! outages degrade to empty contributions and deadline exhaustion is a
//! warning-level progress event. What remains here are the failures a
//! caller can actually act on.

use thiserror::Error;

/// Errors surfaced to callers of the discovery pipeline.
#[derive(Debug, Error)]
pub enum DiscoveryError {
    /// Request parameters failed validation before any work started
    #[error("invalid discovery criteria: {reason}")]
    InvalidCriteria { reason: String },

    /// An HTTP client could not be constructed
    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    /// The storage collaborator failed in a way that prevents the run
    #[error("storage error: {0}")]
    Storage(#[source] anyhow::Error),

    /// JSON payload could not be parsed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, DiscoveryError>;

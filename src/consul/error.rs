//! Discovery client error types.

use thiserror::Error;

/// Errors raised while talking to the Consul HTTP API.
///
/// Every variant is fatal for an inventory run: a missing catalog or health
/// response leaves no way to produce a complete document.
#[derive(Error, Debug)]
pub enum DiscoveryError {
    /// The configured agent URL cannot be used as an API base.
    #[error("Invalid Consul URL: {0}")]
    InvalidUrl(String),

    /// The agent could not be reached at all.
    #[error("Cannot connect to Consul at {0}")]
    Connect(String),

    /// The request did not complete within the configured timeout.
    #[error("Request to {url} timed out after {seconds}s")]
    Timeout { url: String, seconds: u64 },

    /// Any other transport failure.
    #[error("Request to {url} failed: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// Consul answered with a non-success status.
    #[error("Consul API error {status} for {url}: {body}")]
    Status {
        status: u16,
        url: String,
        body: String,
    },

    /// The response body did not have the expected shape.
    #[error("Failed to decode response from {url}: {message}")]
    Decode { url: String, message: String },
}

/// Result type for discovery operations.
pub type DiscoveryResult<T> = Result<T, DiscoveryError>;

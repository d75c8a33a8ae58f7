//! Error types for the portal client.

use thiserror::Error;

/// Errors that can occur while talking to the directory portal.
#[derive(Error, Debug)]
pub enum ClientError {
    /// Geocoding yielded no usable result
    #[error("no location found for '{query}': {reason}")]
    NotFound {
        /// City name that was looked up
        query: String,
        /// Why the lookup produced nothing
        reason: String,
    },

    /// The anti-forgery token could not be obtained
    #[error("session bootstrap failed: {reason}")]
    Bootstrap {
        /// What went wrong
        reason: String,
        /// Start of the page body that was searched
        excerpt: String,
    },

    /// The directory search was blocked or failed
    #[error("directory search unavailable: {reason}")]
    Unavailable {
        /// What went wrong
        reason: String,
    },

    /// A header value could not be encoded
    #[error("invalid header value for {name}: {reason}")]
    InvalidHeader {
        /// Header name
        name: String,
        /// Encoding error
        reason: String,
    },

    /// Network error
    #[error("network error: {0}")]
    Transport(#[from] reqwest::Error),
}

/// Result type alias for portal client operations.
pub type Result<T> = std::result::Result<T, ClientError>;

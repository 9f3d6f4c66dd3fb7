use reqwest::StatusCode;
use thiserror::Error;

/// Errors returned by [`crate::AmadeusClient`].
#[derive(Debug, Error)]
pub enum AmadeusError {
    /// A required credential is not configured.
    #[error("missing credential: set {0}")]
    MissingCredentials(&'static str),

    /// The request could not be sent or its body could not be read.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The API answered with a non-success status.
    #[error("API returned {status}: {body}")]
    Status {
        /// The HTTP status.
        status: StatusCode,
        /// The response body, truncated.
        body: String,
    },

    /// The response body has an unexpected shape.
    #[error("unexpected response: {0}")]
    Decode(#[from] serde_json::Error),
}

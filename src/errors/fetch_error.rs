use thiserror::Error;

/// Failure of an HTTP observable.
///
/// Delivered through the `error` signal wrapped in a [`StreamError`]; recover it
/// with `downcast_ref::<FetchError>()`.
///
/// [`StreamError`]: crate::StreamError
#[derive(Debug, Error)]
pub enum FetchError {
    /// The request could not be sent or the response body could not be read.
    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// The server answered with a non-success status.
    #[error("request to {url} failed with status code: {status}")]
    Status { url: String, status: u16 },

    /// The response body is not the expected JSON document.
    #[error("failed to decode response from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: serde_json::Error,
    },

    /// The request body could not be serialized.
    #[error("failed to encode request body for {url}: {source}")]
    Encode {
        url: String,
        #[source]
        source: serde_json::Error,
    },

    /// The endpoint path could not be joined onto the base url.
    #[error("invalid request url {url}: {reason}")]
    InvalidUrl { url: String, reason: String },
}

impl FetchError {
    /// The requested url.
    pub fn url(&self) -> &str {
        match self {
            FetchError::Transport { url, .. }
            | FetchError::Status { url, .. }
            | FetchError::Decode { url, .. }
            | FetchError::Encode { url, .. }
            | FetchError::InvalidUrl { url, .. } => url,
        }
    }

    /// The HTTP status code, for responses that were received but not successful.
    pub fn status(&self) -> Option<u16> {
        match self {
            FetchError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Whether sending the same request again may succeed.
    ///
    /// Transport failures, `429 Too Many Requests` and server errors are
    /// retryable, other client errors and malformed payloads are not.
    pub fn is_retryable(&self) -> bool {
        match self {
            FetchError::Transport { source, .. } => !source.is_builder(),
            FetchError::Status { status, .. } => *status == 429 || (500..600).contains(status),
            _ => false,
        }
    }
}

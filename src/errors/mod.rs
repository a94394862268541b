mod fetch_error;

pub use fetch_error::FetchError;

use thiserror::Error;

/// A course form that does not pass validation.
#[derive(Debug, Error)]
#[error("invalid course form: {0}")]
pub struct FormError(#[from] pub validator::ValidationErrors);

/// Errors of the course store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("no course with id {0} in the store")]
    UnknownCourse(u64),

    #[error(transparent)]
    InvalidForm(#[from] FormError),
}

/// Errors building a [`ClientConfig`](crate::ClientConfig) or the HTTP client from it.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid base url {value:?}: {reason}")]
    InvalidBaseUrl { value: String, reason: String },

    #[error("invalid value {value:?} for {var}, expected {expected}")]
    InvalidValue {
        var: &'static str,
        value: String,
        expected: &'static str,
    },

    #[error("failed to build HTTP client: {0}")]
    HttpClient(#[from] reqwest::Error),
}

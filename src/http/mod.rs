//! Cancellable HTTP observables.
//!
//! [`HttpClient`] wraps a `reqwest::Client` and turns requests into cold
//! observables: nothing is sent until subscription, every subscription sends its
//! own request, a successful response is emitted once followed by completion,
//! and unsubscribing while the request is in flight aborts it without notifying
//! the subscriber.
//!
//! Non-success statuses, transport failures and undecodable bodies arrive as a
//! [`FetchError`] in the `error` signal.

mod fetch;
mod retry;

pub use retry::RetryPolicy;

use reqwest::Url;
use serde::{de::DeserializeOwned, Serialize};

use crate::{ClientConfig, ConfigError, FetchError, Observable};

/// Per-request behaviour of the HTTP observables.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RequestOptions {
    /// Retry transport failures, throttling and server errors. `None` sends a
    /// single request.
    pub retry: Option<RetryPolicy>,
}

impl RequestOptions {
    pub fn with_retry(mut self, policy: RetryPolicy) -> Self {
        self.retry = Some(policy);
        self
    }
}

/// Shared HTTP client bound to the base url of the course server.
///
/// Cloning is cheap, clones share the connection pool.
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: reqwest::Client,
    base_url: Url,
}

impl HttpClient {
    /// Builds the client with the timeout and base url of `config`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::HttpClient`] if the TLS backend cannot be initialized.
    pub fn new(config: &ClientConfig) -> Result<Self, ConfigError> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()?;
        Ok(Self::with_client(client, config.base_url.clone()))
    }

    /// Uses an already configured `reqwest::Client`.
    pub fn with_client(client: reqwest::Client, base_url: Url) -> Self {
        Self { client, base_url }
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Joins `path` onto the base url and appends `query` pairs, url-encoded.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::InvalidUrl`] if `path` cannot be joined.
    pub fn endpoint(&self, path: &str, query: &[(&str, &str)]) -> Result<Url, FetchError> {
        let mut url = self
            .base_url
            .join(path.trim_start_matches('/'))
            .map_err(|e| FetchError::InvalidUrl {
                url: format!("{}{}", self.base_url, path),
                reason: e.to_string(),
            })?;
        if !query.is_empty() {
            url.query_pairs_mut().extend_pairs(query);
        }
        Ok(url)
    }

    /// GET `url` and decode the JSON body as `T`.
    pub fn get_json<T>(&self, url: Url, options: &RequestOptions) -> Observable<T>
    where
        T: DeserializeOwned + Send + 'static,
    {
        let client = self.client.clone();
        fetch::request_observable(url, options.clone(), move |url| {
            let request = client.get(url.clone());
            async move {
                let response = request.send().await.map_err(|source| FetchError::Transport {
                    url: url.to_string(),
                    source,
                })?;
                fetch::read_json(&url, response).await
            }
        })
    }

    /// PUT `body` as JSON to `url`. Emits `()` once the server accepted it.
    pub fn put_json<B>(&self, url: Url, body: &B, options: &RequestOptions) -> Observable<()>
    where
        B: Serialize + ?Sized,
    {
        let body = match serde_json::to_value(body) {
            Ok(body) => body,
            Err(source) => {
                return Observable::throw(FetchError::Encode {
                    url: url.to_string(),
                    source,
                })
            }
        };

        let client = self.client.clone();
        fetch::request_observable(url, options.clone(), move |url| {
            let request = client.put(url.clone()).json(&body);
            async move {
                let response = request.send().await.map_err(|source| FetchError::Transport {
                    url: url.to_string(),
                    source,
                })?;
                fetch::check_status(&url, response).map(|_| ())
            }
        })
    }
}

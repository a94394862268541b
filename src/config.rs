//! Client configuration.
//!
//! [`ClientConfig::from_env`] reads:
//!
//! | variable                        | default                  |
//! |---------------------------------|--------------------------|
//! | `RXCOURSES_BASE_URL`            | `http://localhost:9000/` |
//! | `RXCOURSES_SEARCH_DEBOUNCE_MS`  | `400`                    |
//! | `RXCOURSES_PAGE_SIZE`           | `100`                    |
//! | `RXCOURSES_TIMEOUT_MS`          | `10000`                  |
//! | `RXCOURSES_RETRY_ATTEMPTS`      | unset, no retries        |

use std::{str::FromStr, time::Duration};

use reqwest::Url;

use crate::{dialog::SavePolicy, ConfigError, RetryPolicy};

pub const DEFAULT_BASE_URL: &str = "http://localhost:9000/";
pub const DEFAULT_SEARCH_DEBOUNCE: Duration = Duration::from_millis(400);
pub const DEFAULT_PAGE_SIZE: u32 = 100;
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

const BASE_URL_VAR: &str = "RXCOURSES_BASE_URL";
const SEARCH_DEBOUNCE_VAR: &str = "RXCOURSES_SEARCH_DEBOUNCE_MS";
const PAGE_SIZE_VAR: &str = "RXCOURSES_PAGE_SIZE";
const TIMEOUT_VAR: &str = "RXCOURSES_TIMEOUT_MS";
const RETRY_ATTEMPTS_VAR: &str = "RXCOURSES_RETRY_ATTEMPTS";

#[derive(Debug, Clone, PartialEq)]
pub struct ClientConfig {
    /// Base url of the course server, always ending with `/`.
    pub base_url: Url,
    /// Quiet period of the lesson search box.
    pub search_debounce: Duration,
    /// `pageSize` of lesson requests.
    pub lessons_page_size: u32,
    pub request_timeout: Duration,
    /// Applied to every GET. Saves are never retried.
    pub retry: Option<RetryPolicy>,
    /// Policy of the course dialog autosave on form changes.
    pub autosave_policy: SavePolicy,
    /// Policy of the course dialog save button.
    pub save_button_policy: SavePolicy,
}

impl ClientConfig {
    /// Configuration with default settings for the server at `base_url`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidBaseUrl`] if `base_url` is not an absolute
    /// http(s) url.
    pub fn new(base_url: &str) -> Result<Self, ConfigError> {
        Ok(ClientConfig {
            base_url: parse_base_url(base_url)?,
            search_debounce: DEFAULT_SEARCH_DEBOUNCE,
            lessons_page_size: DEFAULT_PAGE_SIZE,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            retry: None,
            autosave_policy: SavePolicy::Concat,
            save_button_policy: SavePolicy::Exhaust,
        })
    }

    /// Reads the configuration from `RXCOURSES_*` environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error naming the variable whose value cannot be parsed.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let base_url = lookup(BASE_URL_VAR).unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        let mut config = ClientConfig::new(&base_url)?;

        if let Some(ms) = parse_var::<u64>(&lookup, SEARCH_DEBOUNCE_VAR, "milliseconds")? {
            config.search_debounce = Duration::from_millis(ms);
        }
        if let Some(size) = parse_var::<u32>(&lookup, PAGE_SIZE_VAR, "a page size")? {
            config.lessons_page_size = size;
        }
        if let Some(ms) = parse_var::<u64>(&lookup, TIMEOUT_VAR, "milliseconds")? {
            config.request_timeout = Duration::from_millis(ms);
        }
        let attempts = parse_var::<u32>(&lookup, RETRY_ATTEMPTS_VAR, "an attempt count")?;
        if let Some(attempts) = attempts {
            config.retry = (attempts > 1).then(|| RetryPolicy::new().with_max_attempts(attempts));
        }
        Ok(config)
    }

    pub fn with_search_debounce(mut self, quiet: Duration) -> Self {
        self.search_debounce = quiet;
        self
    }

    pub fn with_lessons_page_size(mut self, size: u32) -> Self {
        self.lessons_page_size = size;
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn with_retry(mut self, policy: RetryPolicy) -> Self {
        self.retry = Some(policy);
        self
    }

    pub fn with_save_policies(mut self, autosave: SavePolicy, save_button: SavePolicy) -> Self {
        self.autosave_policy = autosave;
        self.save_button_policy = save_button;
        self
    }
}

fn parse_base_url(value: &str) -> Result<Url, ConfigError> {
    let invalid = |reason: String| ConfigError::InvalidBaseUrl {
        value: value.to_string(),
        reason,
    };

    let mut url = Url::parse(value).map_err(|e| invalid(e.to_string()))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(invalid(format!("unsupported scheme {}", url.scheme())));
    }
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

fn parse_var<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    var: &'static str,
    expected: &'static str,
) -> Result<Option<T>, ConfigError> {
    let Some(value) = lookup(var) else {
        return Ok(None);
    };
    value
        .trim()
        .parse()
        .map(Some)
        .map_err(|_| ConfigError::InvalidValue {
            var,
            value,
            expected,
        })
}

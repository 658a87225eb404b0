//! Page fetcher implementation
//!
//! This module handles all remote page loads, including:
//! - Building the HTTP client with user agent and timeouts
//! - Classifying transport and status failures into `FetchError`
//! - The bounded, fixed-backoff retry policy shared by discovery and crawling

use crate::config::FetchConfig;
use crate::FetchError;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use scraper::Html;
use std::time::Duration;
use url::Url;

/// A successfully loaded page
#[derive(Debug, Clone)]
pub struct Page {
    /// Final URL after redirects, used to resolve relative links
    pub url: Url,

    /// Raw HTML body
    pub body: String,
}

impl Page {
    /// Parses the body into a queryable document
    pub fn document(&self) -> Html {
        Html::parse_document(&self.body)
    }
}

/// Timeout and retry settings applied to every page load
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Attempts per page, including the first
    pub max_attempts: u32,

    /// Per-request timeout
    pub timeout: Duration,

    /// Fixed delay between attempts
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            timeout: Duration::from_secs(30),
            backoff: Duration::from_secs(5),
        }
    }
}

impl From<&FetchConfig> for RetryPolicy {
    fn from(config: &FetchConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            timeout: config.timeout(),
            backoff: config.backoff(),
        }
    }
}

/// Something that can load a page by URL
///
/// The production implementation is [`HttpFetcher`]; tests substitute
/// scripted fetchers.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// The retry policy callers should apply to this fetcher
    fn policy(&self) -> &RetryPolicy;

    /// Loads a page once, bounded by the policy timeout
    async fn fetch(&self, url: &Url) -> Result<Page, FetchError>;
}

/// Builds an HTTP client with proper configuration
///
/// # Arguments
///
/// * `config` - The fetch configuration
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(reqwest::Error)` - Failed to build client
pub fn build_http_client(config: &FetchConfig) -> Result<Client, reqwest::Error> {
    let timeout = config.timeout();

    Client::builder()
        .user_agent(config.user_agent.clone())
        .timeout(timeout)
        .connect_timeout(timeout.min(Duration::from_secs(10)))
        .gzip(true)
        .brotli(true)
        .build()
}

/// HTTP page fetcher backed by `reqwest`
pub struct HttpFetcher {
    client: Client,
    policy: RetryPolicy,
}

impl HttpFetcher {
    /// Creates a fetcher whose client and retry policy follow `config`
    pub fn new(config: &FetchConfig) -> Result<Self, reqwest::Error> {
        Ok(Self {
            client: build_http_client(config)?,
            policy: RetryPolicy::from(config),
        })
    }
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Fetches a URL and classifies failures
    ///
    /// | Condition | Result |
    /// |-----------|--------|
    /// | 2xx | `Page` |
    /// | HTTP 429 | `RateLimited` |
    /// | other non-2xx | `Status` |
    /// | timeout | `Timeout` |
    /// | connect/transport/body error | `Network` |
    async fn fetch(&self, url: &Url) -> Result<Page, FetchError> {
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| classify_transport_error(url, e))?;

        let status = response.status();
        let final_url = response.url().clone();

        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(FetchError::RateLimited {
                url: url.to_string(),
            });
        }

        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let body = response
            .text()
            .await
            .map_err(|e| classify_transport_error(url, e))?;

        Ok(Page {
            url: final_url,
            body,
        })
    }
}

fn classify_transport_error(url: &Url, err: reqwest::Error) -> FetchError {
    if err.is_timeout() {
        FetchError::Timeout {
            url: url.to_string(),
        }
    } else if err.is_connect() {
        FetchError::Network {
            url: url.to_string(),
            reason: "Connection refused".to_string(),
        }
    } else {
        FetchError::Network {
            url: url.to_string(),
            reason: err.to_string(),
        }
    }
}

/// Fetches a URL, retrying according to the fetcher's policy
///
/// Sleeps `backoff` between attempts and returns the last error once
/// `max_attempts` attempts have failed.
pub async fn fetch_with_retry(fetcher: &dyn PageFetcher, url: &Url) -> Result<Page, FetchError> {
    let policy = *fetcher.policy();
    let mut attempt = 1;

    loop {
        match fetcher.fetch(url).await {
            Ok(page) => return Ok(page),
            Err(e) if attempt < policy.max_attempts => {
                tracing::warn!(
                    "Fetch attempt {}/{} for {} failed: {}",
                    attempt,
                    policy.max_attempts,
                    url,
                    e
                );
                tokio::time::sleep(policy.backoff).await;
                attempt += 1;
            }
            Err(e) => {
                tracing::error!(
                    "Giving up on {} after {} attempts: {}",
                    url,
                    policy.max_attempts,
                    e
                );
                return Err(e);
            }
        }
    }
}

//! HTTP fetch collaborator
//!
//! This module defines the seam between the crawl core and the network:
//! - `Fetch`: the `fetch(request) -> response | FetchError` contract
//! - `HttpFetcher`: the reqwest-backed implementation, which owns retries
//! - `fetch_with_timeout`: the core-side wrapper applying the per-call
//!   timeout and turning non-2xx statuses into errors

use crate::config::CrawlerConfig;
use crate::FetchError;
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;

/// HTTP method of a catalog request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

/// One outbound request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRequest {
    pub method: Method,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<String>,
}

impl FetchRequest {
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            method: Method::Get,
            url: url.into(),
            headers: Vec::new(),
            body: None,
        }
    }

    pub fn post(url: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            method: Method::Post,
            url: url.into(),
            headers: Vec::new(),
            body: Some(body.into()),
        }
    }

    pub fn with_headers(mut self, headers: Vec<(String, String)>) -> Self {
        self.headers = headers;
        self
    }
}

/// Raw response of a request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchResponse {
    pub status: u16,
    pub body: String,
}

impl FetchResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Returns the body of a 2xx response, or a `Status` error
    pub fn into_success(self, url: &str) -> Result<String, FetchError> {
        if self.is_success() {
            Ok(self.body)
        } else {
            Err(FetchError::Status {
                url: url.to_string(),
                status: self.status,
            })
        }
    }
}

/// Fetch collaborator used by listing walkers and detail fetchers
///
/// Implementations own retry/backoff and connection reuse. They must be
/// shareable across tasks.
#[async_trait]
pub trait Fetch: Send + Sync {
    async fn fetch(&self, request: FetchRequest) -> Result<FetchResponse, FetchError>;
}

/// Runs one fetch under a timeout and returns the body of a 2xx response
///
/// Expiry of the timeout is reported as `FetchError::Timeout`.
pub async fn fetch_with_timeout(
    fetcher: &dyn Fetch,
    request: FetchRequest,
    timeout: Duration,
) -> Result<String, FetchError> {
    let url = request.url.clone();
    let response = tokio::time::timeout(timeout, fetcher.fetch(request))
        .await
        .map_err(|_| FetchError::Timeout { url: url.clone() })??;
    response.into_success(&url)
}

/// Builds an HTTP client with proper configuration
///
/// Identification headers (user agent, city, ...) are sent per request, so
/// the client itself only carries transport settings.
///
/// # Arguments
///
/// * `timeout` - Timeout of a single attempt
pub fn build_http_client(timeout: Duration) -> Result<Client, reqwest::Error> {
    Client::builder()
        .timeout(timeout)
        .connect_timeout(timeout.min(Duration::from_secs(10)))
        .gzip(true)
        .brotli(true)
        .build()
}

/// reqwest-backed fetcher with retry logic
///
/// # Retry Logic
///
/// | Condition | Action |
/// |-----------|--------|
/// | HTTP 2xx/3xx/4xx (except 429) | Returned as-is |
/// | HTTP 429 | Retry up to `max_retries` times |
/// | HTTP 5xx | Retry up to `max_retries` times |
/// | Timeout | Retry up to `max_retries` times |
/// | Connection error | Retry up to `max_retries` times |
pub struct HttpFetcher {
    client: Client,
    max_retries: u32,
    retry_delay: Duration,
}

impl HttpFetcher {
    /// Creates a fetcher from crawler settings
    pub fn new(config: &CrawlerConfig) -> Result<Self, reqwest::Error> {
        Ok(Self {
            client: build_http_client(config.request_timeout())?,
            max_retries: config.max_retries,
            retry_delay: config.retry_delay(),
        })
    }

    /// Sends a single attempt
    async fn send_once(&self, request: &FetchRequest) -> Result<FetchResponse, FetchError> {
        let method = match request.method {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
        };

        let mut builder = self.client.request(method, &request.url);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = &request.body {
            builder = builder.body(body.clone());
        }

        let response = builder
            .send()
            .await
            .map_err(|e| classify_error(&request.url, e))?;
        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| classify_error(&request.url, e))?;

        Ok(FetchResponse { status, body })
    }
}

#[async_trait]
impl Fetch for HttpFetcher {
    async fn fetch(&self, request: FetchRequest) -> Result<FetchResponse, FetchError> {
        let mut attempt = 0;
        loop {
            let outcome = self.send_once(&request).await;

            let retryable = match &outcome {
                Ok(response) => response.status == 429 || response.status >= 500,
                Err(error) => error.is_retryable(),
            };
            if !retryable || attempt >= self.max_retries {
                return outcome;
            }

            attempt += 1;
            tracing::debug!(
                "Retrying {} (attempt {}/{})",
                request.url,
                attempt,
                self.max_retries
            );
            tokio::time::sleep(self.retry_delay).await;
        }
    }
}

/// Maps a reqwest error to a fetch error
fn classify_error(url: &str, error: reqwest::Error) -> FetchError {
    if error.is_timeout() {
        FetchError::Timeout {
            url: url.to_string(),
        }
    } else if error.is_connect() {
        FetchError::Transport {
            url: url.to_string(),
            message: format!("Connection refused: {}", error),
        }
    } else {
        FetchError::Transport {
            url: url.to_string(),
            message: error.to_string(),
        }
    }
}

//! HTTP fetch pipeline
//!
//! This module handles all HTTP requests for the crawler, including:
//! - Building the shared HTTP client (connection pool, timeouts, redirects)
//! - Per-host pacing through the rate limiter
//! - Retry with exponential backoff for transient failures
//! - Error classification
//! - Title and link extraction from HTML bodies
//!
//! Content-encoding negotiation is left entirely to reqwest: the `gzip` and
//! `brotli` features make it advertise `Accept-Encoding` and decompress the
//! body. No encoding header is ever set by hand and no body is decoded here.

use crate::config::{HttpConfig, RetryConfig};
use crate::crawler::job::CrawlJob;
use crate::crawler::parser::parse_html;
use crate::crawler::rate_limiter::RateLimiter;
use crate::url::UrlFilter;
use chrono::{DateTime, Utc};
use reqwest::header::CONTENT_TYPE;
use reqwest::{redirect::Policy, Client};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

/// Classified reason a fetch did not fully succeed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The request or body read exceeded the request timeout
    Timeout,
    /// Connection refused, reset, or otherwise failed to establish
    ConnectionRefused,
    /// Non-success HTTP status
    HttpError { code: u16 },
    /// Malformed body or unsupported content encoding
    DecodeError,
    /// The redirect chain exceeded the configured hop count
    TooManyRedirects,
    /// The HTML was malformed; title and links were salvaged where possible
    ParseError,
}

impl ErrorKind {
    /// Timeouts, connection failures, and 5xx responses are retried;
    /// 4xx responses and decode failures are permanent.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Timeout | Self::ConnectionRefused => true,
            Self::HttpError { code } => *code >= 500,
            Self::DecodeError | Self::TooManyRedirects | Self::ParseError => false,
        }
    }

    /// Short label used for error tallies
    pub fn label(&self) -> String {
        match self {
            Self::Timeout => "timeout".to_string(),
            Self::ConnectionRefused => "connection-refused".to_string(),
            Self::HttpError { code } => format!("http-{}", code),
            Self::DecodeError => "decode-error".to_string(),
            Self::TooManyRedirects => "too-many-redirects".to_string(),
            Self::ParseError => "parse-error".to_string(),
        }
    }

    fn from_reqwest(error: &reqwest::Error) -> Self {
        if error.is_timeout() {
            Self::Timeout
        } else if error.is_redirect() {
            Self::TooManyRedirects
        } else if error.is_connect() {
            Self::ConnectionRefused
        } else if let Some(status) = error.status() {
            Self::HttpError {
                code: status.as_u16(),
            }
        } else if error.is_decode() || error.is_body() {
            Self::DecodeError
        } else {
            Self::ConnectionRefused
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Timeout => write!(f, "request timed out"),
            Self::ConnectionRefused => write!(f, "connection failed"),
            Self::HttpError { code } => write!(f, "HTTP {}", code),
            Self::DecodeError => write!(f, "could not decode body"),
            Self::TooManyRedirects => write!(f, "too many redirects"),
            Self::ParseError => write!(f, "malformed HTML"),
        }
    }
}

/// Result of one completed fetch (success or final failure)
///
/// Sinks receive it read-only once the worker is done with it.
#[derive(Debug, Clone)]
pub struct FetchResult {
    pub job: CrawlJob,
    /// URL the content was finally served from, after redirects
    pub final_url: Url,
    /// HTTP status, or 0 when no response was received
    pub status_code: u16,
    pub content_type: String,
    /// Decoded body; empty on failure
    pub body: Vec<u8>,
    pub title: String,
    /// Absolute, filtered links in document order
    pub links: Vec<String>,
    pub fetched_at: DateTime<Utc>,
    pub error: Option<ErrorKind>,
    /// Number of requests issued for this job
    pub attempts: u32,
}

impl FetchResult {
    /// True when the page counts as fetched (a salvaged parse still counts)
    pub fn is_success(&self) -> bool {
        matches!(self.error, None | Some(ErrorKind::ParseError))
    }

    fn failure(job: CrawlJob, kind: ErrorKind, attempts: u32) -> Self {
        let status_code = match kind {
            ErrorKind::HttpError { code } => code,
            _ => 0,
        };
        Self {
            final_url: job.url().clone(),
            job,
            status_code,
            content_type: String::new(),
            body: Vec::new(),
            title: String::new(),
            links: Vec::new(),
            fetched_at: Utc::now(),
            error: Some(kind),
            attempts,
        }
    }
}

/// Exponential backoff schedule for retries
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first request
    pub max_attempts: u32,
    pub initial_delay: Duration,
    pub max_delay: Duration,
}

impl RetryPolicy {
    pub fn from_config(config: &RetryConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            initial_delay: Duration::from_millis(config.initial_delay_ms),
            max_delay: Duration::from_millis(config.max_delay_ms),
        }
    }

    /// Delay before retry number `retry` (1-based): `initial * 2^(retry-1)`,
    /// capped at `max_delay`
    pub fn delay_for(&self, retry: u32) -> Duration {
        let exponent = retry.saturating_sub(1).min(31);
        self.initial_delay
            .checked_mul(1u32 << exponent)
            .map_or(self.max_delay, |delay| delay.min(self.max_delay))
    }
}

/// Builds the shared HTTP client
///
/// The client owns the connection pool; cloning it is cheap and every clone
/// shares that pool.
pub fn build_http_client(config: &HttpConfig, timeout: Duration) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(config.user_agent.clone())
        .timeout(timeout)
        .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
        .redirect(Policy::limited(config.max_redirects))
        .pool_max_idle_per_host(config.pool_max_idle_per_host)
        .pool_idle_timeout(Duration::from_secs(config.pool_idle_timeout_secs))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Successful response, before HTML processing
struct Response {
    final_url: Url,
    status_code: u16,
    content_type: String,
    body: Vec<u8>,
}

/// Issues requests for crawl jobs: pace, send, retry, decode, extract
pub struct FetchPipeline {
    client: Client,
    rate_limiter: Arc<RateLimiter>,
    retry: RetryPolicy,
    filter: UrlFilter,
}

impl FetchPipeline {
    pub fn new(
        client: Client,
        rate_limiter: Arc<RateLimiter>,
        retry: RetryPolicy,
        filter: UrlFilter,
    ) -> Self {
        Self {
            client,
            rate_limiter,
            retry,
            filter,
        }
    }

    pub fn rate_limiter(&self) -> &Arc<RateLimiter> {
        &self.rate_limiter
    }

    /// Fetches a job's URL
    ///
    /// # Retry Logic
    ///
    /// | Condition | Action |
    /// |-----------|--------|
    /// | Timeout | Retry with backoff |
    /// | Connection refused/reset | Retry with backoff |
    /// | HTTP 5xx | Retry with backoff |
    /// | HTTP 4xx | Immediate failure |
    /// | Redirect chain too long | Immediate failure |
    /// | Body decode failure | Immediate failure |
    ///
    /// Every attempt passes through the rate limiter first. This never
    /// returns an error: the outcome is classified in [`FetchResult::error`].
    pub async fn fetch(&self, job: CrawlJob) -> FetchResult {
        let mut attempt = 0;

        loop {
            attempt += 1;
            self.rate_limiter.wait(job.host()).await;

            match self.send(job.url()).await {
                Ok(response) => return self.process(job, response, attempt),
                Err(kind) if kind.is_retryable() && attempt < self.retry.max_attempts => {
                    let delay = self.retry.delay_for(attempt);
                    tracing::debug!(
                        "Attempt {}/{} for {} failed ({}), retrying in {:?}",
                        attempt,
                        self.retry.max_attempts,
                        job.url(),
                        kind,
                        delay
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(kind) => return FetchResult::failure(job, kind, attempt),
            }
        }
    }

    async fn send(&self, url: &Url) -> Result<Response, ErrorKind> {
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| ErrorKind::from_reqwest(&e))?;

        let status = response.status();
        if status.is_client_error() || status.is_server_error() {
            return Err(ErrorKind::HttpError {
                code: status.as_u16(),
            });
        }

        // A 3xx that reqwest did not follow (no Location header)
        if status.is_redirection() {
            return Err(ErrorKind::TooManyRedirects);
        }

        let final_url = response.url().clone();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_string();

        let body = response
            .bytes()
            .await
            .map_err(|e| match ErrorKind::from_reqwest(&e) {
                ErrorKind::Timeout => ErrorKind::Timeout,
                _ => ErrorKind::DecodeError,
            })?;

        Ok(Response {
            final_url,
            status_code: status.as_u16(),
            content_type,
            body: body.to_vec(),
        })
    }

    fn process(&self, job: CrawlJob, response: Response, attempts: u32) -> FetchResult {
        let mut title = String::new();
        let mut links = Vec::new();
        let mut error = None;

        if is_html(&response.content_type) {
            let text = match std::str::from_utf8(&response.body) {
                Ok(text) => std::borrow::Cow::Borrowed(text),
                Err(_) => {
                    error = Some(ErrorKind::ParseError);
                    String::from_utf8_lossy(&response.body)
                }
            };

            let parsed = parse_html(&text, &response.final_url, &self.filter);
            title = parsed.title.unwrap_or_default();
            links = parsed.links;
        }

        FetchResult {
            job,
            final_url: response.final_url,
            status_code: response.status_code,
            content_type: response.content_type,
            body: response.body,
            title,
            links,
            fetched_at: Utc::now(),
            error,
            attempts,
        }
    }
}

/// Pages without a declared type are treated as HTML
fn is_html(content_type: &str) -> bool {
    let content_type = content_type.to_ascii_lowercase();
    content_type.is_empty()
        || content_type.contains("text/html")
        || content_type.contains("application/xhtml")
}

//! Crawler module: the concurrent crawl engine
//!
//! This module contains the core crawling logic, including:
//! - The three-tier frontier queue and crawl jobs
//! - Per-host rate limiting
//! - URL deduplication
//! - HTTP fetching with retry logic and HTML link extraction
//! - The worker pool and the session controller that drives it

mod coordinator;
mod fetcher;
mod job;
mod parser;
mod queue;
mod rate_limiter;
mod session;
mod visited;

pub use coordinator::{CrawlLimits, CrawlStats, WorkerPool, WorkerState};
pub use fetcher::{build_http_client, ErrorKind, FetchPipeline, FetchResult, RetryPolicy};
pub use job::{CrawlJob, Priority};
pub use parser::{parse_html, ParsedPage};
pub use queue::{FrontierQueue, PushOutcome, QueueClosed, QueueStats};
pub use rate_limiter::{HostRateState, RateLimiter};
pub use session::{CrawlSession, SessionState, ShutdownHandle, StopReason};
pub use visited::VisitedSet;

use crate::config::Config;
use crate::output::CrawlSummary;

/// Runs a complete crawl for `config`
///
/// Convenience wrapper around [`CrawlSession`] for callers that need no
/// shutdown handle.
///
/// # Example
///
/// ```no_run
/// use weft_crawler::config::load_config;
/// use weft_crawler::crawler::crawl;
/// use std::path::Path;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let config = load_config(Path::new("config.toml"))?;
/// let summary = crawl(config).await?;
/// println!("{} pages", summary.pages_fetched);
/// # Ok(())
/// # }
/// ```
pub async fn crawl(config: Config) -> crate::Result<CrawlSummary> {
    CrawlSession::new(config)?.run().await
}

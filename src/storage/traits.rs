//! Archive sink trait and error types
//!
//! This module defines the interface fetched pages are handed to, and the
//! page record those sinks receive.

use crate::crawler::FetchResult;
use chrono::{DateTime, Utc};
use thiserror::Error;

/// Errors that can occur in archive and content sinks
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Invalid page URL: {0}")]
    InvalidUrl(String),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// A fetched page as handed to sinks
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchivedPage {
    pub url: String,
    pub title: String,
    pub content: String,
    pub links: Vec<String>,
    pub crawled_at: DateTime<Utc>,
    pub status_code: u16,
    pub content_type: String,
}

impl ArchivedPage {
    /// Builds the sink record for a successful fetch
    ///
    /// The record is keyed by the URL the job was admitted under, so
    /// upserts line up with the visited set even across redirects.
    pub fn from_fetch(result: &FetchResult) -> Self {
        Self {
            url: result.job.url().to_string(),
            title: result.title.clone(),
            content: String::from_utf8_lossy(&result.body).into_owned(),
            links: result.links.clone(),
            crawled_at: result.fetched_at,
            status_code: result.status_code,
            content_type: result.content_type.clone(),
        }
    }

    /// Size of the page content in bytes
    pub fn size(&self) -> usize {
        self.content.len()
    }
}

/// Destination for fetched pages
///
/// Called once per successfully fetched page from the sink dispatch task,
/// never from a crawl worker. Errors are logged and the crawl continues.
pub trait ArchiveSink: Send + Sync {
    fn store(&self, page: &ArchivedPage) -> StorageResult<()>;
}

//! Concurrency-safe URL deduplication
//!
//! The visited set is the only gate into the frontier: a link is pushed if
//! and only if `try_admit` returned true for it.

use crate::url::normalize_url;
use crate::UrlResult;
use dashmap::DashSet;
use url::Url;

/// Set of normalized URLs admitted during one crawl session
#[derive(Debug, Default)]
pub struct VisitedSet {
    seen: DashSet<String>,
}

impl VisitedSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Atomically inserts an already-normalized URL
    ///
    /// Returns true only to the single caller that performed the insertion;
    /// every concurrent caller with the same URL gets false.
    pub fn try_admit(&self, url: &Url) -> bool {
        // DashSet::insert locks one shard for check-and-insert.
        self.seen.insert(url.as_str().to_string())
    }

    /// Normalizes a raw URL string, then admits it
    ///
    /// Returns the normalized URL when this caller won the admission.
    pub fn try_admit_str(&self, raw: &str) -> UrlResult<Option<Url>> {
        let normalized = normalize_url(raw)?;
        Ok(self.try_admit(&normalized).then_some(normalized))
    }

    pub fn contains(&self, url: &Url) -> bool {
        self.seen.contains(url.as_str())
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}

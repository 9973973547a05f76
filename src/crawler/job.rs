//! Frontier job types

use std::fmt;
use tokio::time::Instant;
use url::Url;

/// Scheduling tier of a frontier job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Priority {
    High,
    Normal,
    Low,
}

impl Priority {
    pub const ALL: [Priority; 3] = [Priority::High, Priority::Normal, Priority::Low];

    /// The tier a push falls back to when this tier is full
    pub fn fallback(self) -> Option<Priority> {
        match self {
            Self::High => Some(Self::Normal),
            Self::Normal => Some(Self::Low),
            Self::Low => None,
        }
    }

    pub(crate) fn index(self) -> usize {
        match self {
            Self::High => 0,
            Self::Normal => 1,
            Self::Low => 2,
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::High => "high",
            Self::Normal => "normal",
            Self::Low => "low",
        };
        f.write_str(label)
    }
}

/// One unit of frontier work
///
/// Jobs are immutable once created. The queue owns a job until a worker
/// dequeues it; the worker then owns it for a single fetch attempt.
#[derive(Debug, Clone)]
pub struct CrawlJob {
    url: Url,
    priority: Priority,
    host: String,
    depth: u32,
    enqueued_at: Instant,
}

impl CrawlJob {
    pub fn new(url: Url, priority: Priority, host: String, depth: u32) -> Self {
        Self {
            url,
            priority,
            host,
            depth,
            enqueued_at: Instant::now(),
        }
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn priority(&self) -> Priority {
        self.priority
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn depth(&self) -> u32 {
        self.depth
    }

    pub fn enqueued_at(&self) -> Instant {
        self.enqueued_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fallback_chain() {
        assert_eq!(Priority::High.fallback(), Some(Priority::Normal));
        assert_eq!(Priority::Normal.fallback(), Some(Priority::Low));
        assert_eq!(Priority::Low.fallback(), None);
    }

    #[test]
    fn test_priority_display() {
        assert_eq!(Priority::High.to_string(), "high");
        assert_eq!(Priority::Low.to_string(), "low");
    }
}

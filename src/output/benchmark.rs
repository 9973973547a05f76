//! Periodic throughput samples
//!
//! The session samples `(pages fetched, frontier size)` on a fixed interval
//! while running. Samples are kept in memory and reported in the summary.

use chrono::{DateTime, Utc};
use std::sync::Mutex;

/// One throughput snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BenchmarkSample {
    pub timestamp: DateTime<Utc>,
    pub pages: u64,
    pub queued: u64,
}

/// Thread-safe list of benchmark samples
#[derive(Debug, Default)]
pub struct BenchmarkRecorder {
    samples: Mutex<Vec<BenchmarkSample>>,
}

impl BenchmarkRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, pages: u64, queued: u64) {
        let sample = BenchmarkSample {
            timestamp: Utc::now(),
            pages,
            queued,
        };
        self.lock().push(sample);
    }

    pub fn samples(&self) -> Vec<BenchmarkSample> {
        self.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Largest frontier size seen in any sample
    pub fn peak_queued(&self) -> u64 {
        self.lock().iter().map(|s| s.queued).max().unwrap_or(0)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<BenchmarkSample>> {
        // Samples are plain data; a panic mid-push cannot leave them invalid
        self.samples.lock().unwrap_or_else(|e| e.into_inner())
    }
}

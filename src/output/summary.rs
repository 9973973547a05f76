//! End-of-session crawl summary
//!
//! This module collects the final counters of a session into one value and
//! prints it to stdout.

use crate::crawler::{QueueStats, StopReason};
use crate::output::benchmark::BenchmarkSample;
use crate::output::dispatch::SinkReport;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::time::Duration;

/// Summary statistics for a finished crawl session
#[derive(Debug, Clone)]
pub struct CrawlSummary {
    // Run metadata
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub elapsed: Duration,
    pub stop_reason: StopReason,
    pub config_hash: String,
    pub workers: usize,
    /// Workers that exited cleanly
    pub workers_stopped: usize,

    // Page outcomes
    pub pages_fetched: u64,
    pub pages_failed: u64,
    /// Error kind label -> count (includes salvaged parse errors)
    pub failures_by_kind: BTreeMap<String, u64>,
    pub links_discovered: u64,
    pub links_admitted: u64,

    // Frontier
    pub queue: QueueStats,
    pub visited: usize,
    pub hosts: usize,

    // Collaborators
    pub sinks: SinkReport,
    pub benchmark: Vec<BenchmarkSample>,
}

impl CrawlSummary {
    /// Successful pages per second over the whole session
    pub fn pages_per_second(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs > 0.0 {
            self.pages_fetched as f64 / secs
        } else {
            0.0
        }
    }

    /// Share of attempted pages that were fetched, in percent
    pub fn success_rate(&self) -> f64 {
        let attempted = self.pages_fetched + self.pages_failed;
        if attempted > 0 {
            (self.pages_fetched as f64 / attempted as f64) * 100.0
        } else {
            0.0
        }
    }

    pub fn total_errors(&self) -> u64 {
        self.failures_by_kind.values().sum()
    }
}

/// Prints a summary to stdout in a formatted manner
pub fn print_summary(summary: &CrawlSummary) {
    println!("=== Crawl Summary ===\n");

    println!("Overview:");
    println!("  Stopped because: {}", summary.stop_reason);
    println!("  Elapsed: {:.2}s", summary.elapsed.as_secs_f64());
    println!("  Workers: {} ({} stopped)", summary.workers, summary.workers_stopped);
    println!("  Pages fetched: {}", summary.pages_fetched);
    println!("  Pages failed: {}", summary.pages_failed);
    println!("  Throughput: {:.2} pages/sec", summary.pages_per_second());
    println!("  Success rate: {:.1}%", summary.success_rate());
    println!("  Hosts seen: {}", summary.hosts);
    println!("  URLs admitted: {}", summary.visited);
    println!();

    if !summary.failures_by_kind.is_empty() {
        println!("Errors by Kind:");
        let mut counts: Vec<_> = summary.failures_by_kind.iter().collect();
        counts.sort_by(|a, b| b.1.cmp(a.1));
        for (kind, count) in counts {
            println!("  {}: {}", kind, count);
        }
        println!();
    }

    let q = &summary.queue;
    println!("Frontier:");
    println!("  Queued: {}", q.total_queued);
    println!("  Dequeued: {}", q.total_dequeued);
    println!("  Dropped (all tiers full): {}", q.dropped);
    println!("  Discarded at shutdown: {}", q.discarded);
    println!(
        "  By tier: high {}, normal {}, low {}",
        q.queued_high, q.queued_normal, q.queued_low
    );
    println!();

    println!("Sinks:");
    println!("  Delivered: {}", summary.sinks.delivered);
    println!("  Store errors: {}", summary.sinks.failed);
    println!("  Dropped (sink queue full): {}", summary.sinks.dropped);

    if !summary.benchmark.is_empty() {
        println!();
        println!("Benchmark samples: {}", summary.benchmark.len());
    }

    println!("\nConfig hash: {}", summary.config_hash);
}

//! Crawl session controller
//!
//! A session owns every shared structure for one crawl: the frontier, the
//! visited set, per-host pacing state, and the crawl counters. It seeds the
//! frontier, runs the worker pool, and returns a summary once every worker
//! has stopped.
//!
//! # Lifecycle
//!
//! `Created -> Running -> Draining -> Stopped`
//!
//! Draining starts when the frontier is closed, which happens on natural
//! exhaustion (no queued jobs and none in flight), when the page budget is
//! reached, or when a [`ShutdownHandle`] is triggered. In-flight fetches
//! always complete; pending jobs are discarded.

use crate::config::Config;
use crate::crawler::coordinator::{CrawlLimits, CrawlStats, WorkerContext, WorkerPool};
use crate::crawler::fetcher::{build_http_client, FetchPipeline, RetryPolicy};
use crate::crawler::job::CrawlJob;
use crate::crawler::queue::{FrontierQueue, PushOutcome};
use crate::crawler::rate_limiter::RateLimiter;
use crate::crawler::visited::VisitedSet;
use crate::output::{BenchmarkRecorder, CrawlSummary, SinkDispatcher, SinkReport};
use crate::storage::{ArchiveSink, ContentSaver, SqliteArchive};
use crate::url::{classify_priority, extract_host, normalize_url, UrlFilter};
use crate::{CrawlerError, Result};
use chrono::Utc;
use std::fmt;
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;
use tokio::task::JoinHandle;

/// Pages buffered between workers and the sink task
const SINK_QUEUE_CAPACITY: usize = 1024;

/// Session lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Created,
    Running,
    Draining,
    Stopped,
}

impl SessionState {
    fn as_u8(self) -> u8 {
        match self {
            Self::Created => 0,
            Self::Running => 1,
            Self::Draining => 2,
            Self::Stopped => 3,
        }
    }

    fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::Created,
            1 => Self::Running,
            2 => Self::Draining,
            _ => Self::Stopped,
        }
    }
}

/// Why a session stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// Frontier empty with nothing in flight
    Exhausted,
    /// `max_pages` successful fetches
    PageBudget,
    /// External shutdown request
    Shutdown,
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Exhausted => "frontier exhausted",
            Self::PageBudget => "page budget reached",
            Self::Shutdown => "shutdown requested",
        };
        f.write_str(label)
    }
}

/// Atomic holder for the session state, shared with workers
#[derive(Debug)]
pub(crate) struct StateCell(AtomicU8);

impl StateCell {
    pub(crate) fn new() -> Self {
        Self(AtomicU8::new(SessionState::Created.as_u8()))
    }

    pub(crate) fn get(&self) -> SessionState {
        SessionState::from_u8(self.0.load(Ordering::SeqCst))
    }

    fn transition(&self, from: SessionState, to: SessionState) -> bool {
        self.0
            .compare_exchange(from.as_u8(), to.as_u8(), Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
    }

    /// Running -> Draining; no-op from any other state
    pub(crate) fn begin_draining(&self) {
        self.transition(SessionState::Running, SessionState::Draining);
    }

    fn stop(&self) {
        self.0.store(SessionState::Stopped.as_u8(), Ordering::SeqCst);
    }
}

/// Requests a graceful stop of a running session
///
/// Cloneable and usable from any task, e.g. a Ctrl-C listener.
#[derive(Debug, Clone)]
pub struct ShutdownHandle {
    state: Arc<StateCell>,
    queue: Arc<FrontierQueue>,
    requested: Arc<AtomicBool>,
}

impl ShutdownHandle {
    pub fn shutdown(&self) {
        if !self.requested.swap(true, Ordering::SeqCst) {
            tracing::info!("Shutdown requested, finishing in-flight fetches");
        }
        self.state.begin_draining();
        self.queue.close();
    }

    pub fn is_requested(&self) -> bool {
        self.requested.load(Ordering::SeqCst)
    }
}

/// One crawl, from seeds to summary
pub struct CrawlSession {
    config: Config,
    config_hash: String,
    state: Arc<StateCell>,
    queue: Arc<FrontierQueue>,
    visited: Arc<VisitedSet>,
    rate_limiter: Arc<RateLimiter>,
    stats: Arc<CrawlStats>,
    benchmark: Arc<BenchmarkRecorder>,
    sinks: Vec<Arc<dyn ArchiveSink>>,
    shutdown_requested: Arc<AtomicBool>,
}

impl CrawlSession {
    /// Creates a session and opens the configured sinks
    ///
    /// Failing to open the archive database is fatal.
    pub fn new(config: Config) -> Result<Self> {
        let mut sinks: Vec<Arc<dyn ArchiveSink>> = Vec::new();

        if let Some(path) = &config.archive.database_path {
            sinks.push(Arc::new(SqliteArchive::new(Path::new(path))?));
        }

        if config.content_saver.enabled {
            let saver = ContentSaver::new(&config.content_saver);
            tracing::info!("Saving page content under {}", saver.output_dir().display());
            sinks.push(Arc::new(saver));
        }

        Ok(Self {
            queue: Arc::new(FrontierQueue::new(&config.queue)),
            rate_limiter: Arc::new(RateLimiter::new(config.crawler.rate_limit())),
            config,
            config_hash: String::new(),
            state: Arc::new(StateCell::new()),
            visited: Arc::new(VisitedSet::new()),
            stats: Arc::new(CrawlStats::new()),
            benchmark: Arc::new(BenchmarkRecorder::new()),
            sinks,
            shutdown_requested: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Records the hash of the configuration file in the summary
    pub fn with_config_hash(mut self, hash: impl Into<String>) -> Self {
        self.config_hash = hash.into();
        self
    }

    /// Attaches an extra sink; only effective before `run`
    pub fn add_sink(&mut self, sink: Arc<dyn ArchiveSink>) {
        self.sinks.push(sink);
    }

    pub fn shutdown_handle(&self) -> ShutdownHandle {
        ShutdownHandle {
            state: Arc::clone(&self.state),
            queue: Arc::clone(&self.queue),
            requested: Arc::clone(&self.shutdown_requested),
        }
    }

    pub fn state(&self) -> SessionState {
        self.state.get()
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn queue(&self) -> &Arc<FrontierQueue> {
        &self.queue
    }

    pub fn visited(&self) -> &Arc<VisitedSet> {
        &self.visited
    }

    pub fn stats(&self) -> &Arc<CrawlStats> {
        &self.stats
    }

    pub fn benchmark(&self) -> &Arc<BenchmarkRecorder> {
        &self.benchmark
    }

    /// Runs the crawl to completion
    ///
    /// Returns once the frontier is closed and every worker has stopped.
    /// Only startup problems are errors; page failures are counted in the
    /// summary.
    pub async fn run(&self) -> Result<CrawlSummary> {
        if !self
            .state
            .transition(SessionState::Created, SessionState::Running)
        {
            return Err(CrawlerError::AlreadyStarted);
        }

        let result = self.crawl().await;

        self.queue.close();
        self.state.stop();
        result
    }

    async fn crawl(&self) -> Result<CrawlSummary> {
        let started_at = Utc::now();
        let clock = std::time::Instant::now();
        let crawler = &self.config.crawler;

        let client = build_http_client(&self.config.http, crawler.timeout())?;
        let fetcher = FetchPipeline::new(
            client,
            Arc::clone(&self.rate_limiter),
            RetryPolicy::from_config(&self.config.retry),
            UrlFilter::from_config(&self.config.filters),
        );

        let seeded = self.seed_frontier();
        if seeded == 0 {
            return Err(CrawlerError::NoSeeds);
        }

        tracing::info!(
            "Starting crawl: {} seed(s), {} workers, {:?} between requests per host",
            seeded,
            crawler.workers,
            crawler.rate_limit()
        );

        let dispatcher = SinkDispatcher::spawn(self.sinks.clone(), SINK_QUEUE_CAPACITY);
        let ctx = Arc::new(WorkerContext::new(
            Arc::clone(&self.queue),
            Arc::clone(&self.visited),
            fetcher,
            dispatcher.handle(),
            Arc::clone(&self.stats),
            CrawlLimits {
                max_depth: crawler.max_depth,
                max_pages: crawler.max_pages,
            },
            Arc::clone(&self.state),
            crawler.workers,
        ));

        let sampler = self.spawn_sampler();
        let pool = WorkerPool::spawn(Arc::clone(&ctx));
        let workers = pool.len();
        let workers_stopped = pool.join().await;
        if workers_stopped < workers {
            tracing::warn!("Only {} of {} workers stopped cleanly", workers_stopped, workers);
        }

        // Releases the last sink handle so the dispatcher can finish
        drop(ctx);

        if let Some(sampler) = sampler {
            sampler.stop().await;
            self.benchmark
                .record(self.stats.pages_fetched(), self.queue.len() as u64);
        }

        let sinks = match dispatcher.finish().await {
            Ok(report) => report,
            Err(e) => {
                tracing::error!("{}", e);
                SinkReport::default()
            }
        };

        let summary = CrawlSummary {
            started_at,
            finished_at: Utc::now(),
            elapsed: clock.elapsed(),
            stop_reason: self.stop_reason(),
            config_hash: self.config_hash.clone(),
            workers,
            workers_stopped,
            pages_fetched: self.stats.pages_fetched(),
            pages_failed: self.stats.pages_failed(),
            failures_by_kind: self.stats.failures_by_kind(),
            links_discovered: self.stats.links_discovered(),
            links_admitted: self.stats.links_admitted(),
            queue: self.queue.stats(),
            visited: self.visited.len(),
            hosts: self.rate_limiter.host_count(),
            sinks,
            benchmark: self.benchmark.samples(),
        };

        tracing::info!(
            "Crawl finished ({}): {} pages fetched, {} failed in {:.2?}",
            summary.stop_reason,
            summary.pages_fetched,
            summary.pages_failed,
            summary.elapsed
        );

        Ok(summary)
    }

    /// Admits and queues the seed URLs at depth 0
    fn seed_frontier(&self) -> usize {
        let mut seeded = 0;

        for raw in &self.config.seeds {
            let url = match normalize_url(raw) {
                Ok(url) => url,
                Err(e) => {
                    tracing::warn!("Skipping seed {}: {}", raw, e);
                    continue;
                }
            };

            let Some(host) = extract_host(&url) else {
                tracing::warn!("Skipping seed without host: {}", raw);
                continue;
            };

            if !self.visited.try_admit(&url) {
                tracing::debug!("Duplicate seed {}", url);
                continue;
            }

            let priority = classify_priority(&url);
            self.stats.begin_job();
            match self.queue.push(CrawlJob::new(url, priority, host, 0)) {
                Ok(PushOutcome::Queued(_)) => seeded += 1,
                Ok(PushOutcome::Dropped) => {
                    self.stats.end_job();
                    tracing::warn!("Frontier full, dropped seed {}", raw);
                }
                Err(_) => {
                    self.stats.end_job();
                    tracing::warn!("Frontier closed before seed {} was queued", raw);
                }
            }
        }

        seeded
    }

    fn stop_reason(&self) -> StopReason {
        let max_pages = self.config.crawler.max_pages;
        if self.shutdown_requested.load(Ordering::SeqCst) {
            StopReason::Shutdown
        } else if max_pages > 0 && self.stats.pages_fetched() >= max_pages {
            StopReason::PageBudget
        } else {
            StopReason::Exhausted
        }
    }

    fn spawn_sampler(&self) -> Option<Sampler> {
        let benchmark = &self.config.benchmark;
        if !benchmark.enabled {
            return None;
        }

        let interval = Duration::from_millis(benchmark.interval_ms.max(1));
        let stop = Arc::new(Notify::new());
        let recorder = Arc::clone(&self.benchmark);
        let stats = Arc::clone(&self.stats);
        let queue = Arc::clone(&self.queue);
        let stop_signal = Arc::clone(&stop);

        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            loop {
                tokio::select! {
                    _ = ticker.tick() => recorder.record(stats.pages_fetched(), queue.len() as u64),
                    _ = stop_signal.notified() => break,
                }
            }
        });

        Some(Sampler { stop, task })
    }
}

/// Background benchmark sampling task
struct Sampler {
    stop: Arc<Notify>,
    task: JoinHandle<()>,
}

impl Sampler {
    async fn stop(self) {
        // notify_one keeps a permit if the task is between ticks
        self.stop.notify_one();
        if let Err(e) = self.task.await {
            tracing::warn!("Benchmark sampler failed: {}", e);
        }
    }
}

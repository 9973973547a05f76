//! Worker pool - the crawl loop each worker runs
//!
//! This module contains the worker loop that coordinates all aspects of
//! crawling one job, including:
//! - Pulling jobs from the frontier queue
//! - Enforcing the page budget
//! - Fetching through the fetch pipeline
//! - Admitting discovered links through the visited set
//! - Handing fetched pages to the sinks
//! - Detecting natural exhaustion of the frontier

use crate::crawler::fetcher::{FetchPipeline, FetchResult};
use crate::crawler::job::CrawlJob;
use crate::crawler::queue::{FrontierQueue, PushOutcome, QueueClosed};
use crate::crawler::session::StateCell;
use crate::crawler::visited::VisitedSet;
use crate::output::SinkHandle;
use crate::storage::ArchivedPage;
use crate::url::{classify_priority, extract_host, normalize_url};
use dashmap::DashMap;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, AtomicU8, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::Notify;
use tokio::task::JoinHandle;

/// Lifecycle of a single worker
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
    /// Waiting on the frontier
    Idle,
    /// Inside the fetch pipeline (pacing, request, retries)
    Fetching,
    /// Admitting links and handing the result to sinks
    Processing,
    /// Exited; the frontier reported no more jobs
    Stopped,
}

impl WorkerState {
    fn as_u8(self) -> u8 {
        match self {
            Self::Idle => 0,
            Self::Fetching => 1,
            Self::Processing => 2,
            Self::Stopped => 3,
        }
    }

    fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::Idle,
            1 => Self::Fetching,
            2 => Self::Processing,
            _ => Self::Stopped,
        }
    }
}

/// Crawl limits read once at session start
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CrawlLimits {
    pub max_depth: u32,
    /// 0 means unlimited
    pub max_pages: u64,
}

impl CrawlLimits {
    fn unlimited_pages(&self) -> bool {
        self.max_pages == 0
    }
}

/// Crawl-wide counters shared by every worker
#[derive(Debug, Default)]
pub struct CrawlStats {
    /// Page-budget reservations held by in-flight and successful fetches
    reserved: AtomicU64,
    pages_fetched: AtomicU64,
    pages_failed: AtomicU64,
    links_discovered: AtomicU64,
    links_admitted: AtomicU64,
    /// Jobs queued plus jobs in flight
    outstanding: AtomicUsize,
    in_flight: AtomicUsize,
    failures: DashMap<String, u64>,
    /// Signalled when a failed fetch hands its reservation back
    budget_freed: Notify,
}

impl CrawlStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Successfully fetched pages
    pub fn pages_fetched(&self) -> u64 {
        self.pages_fetched.load(Ordering::SeqCst)
    }

    pub fn pages_failed(&self) -> u64 {
        self.pages_failed.load(Ordering::SeqCst)
    }

    pub fn links_discovered(&self) -> u64 {
        self.links_discovered.load(Ordering::Relaxed)
    }

    pub fn links_admitted(&self) -> u64 {
        self.links_admitted.load(Ordering::Relaxed)
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    pub fn outstanding(&self) -> usize {
        self.outstanding.load(Ordering::SeqCst)
    }

    /// Failure counts keyed by error kind label
    pub fn failures_by_kind(&self) -> BTreeMap<String, u64> {
        self.failures
            .iter()
            .map(|entry| (entry.key().clone(), *entry.value()))
            .collect()
    }

    /// Claims one unit of the page budget before fetching
    ///
    /// Successful fetches can never exceed `max_pages`, however many
    /// workers are in flight.
    fn try_reserve_page(&self, limits: &CrawlLimits) -> bool {
        if limits.unlimited_pages() {
            return true;
        }
        self.reserved
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |reserved| {
                (reserved < limits.max_pages).then_some(reserved + 1)
            })
            .is_ok()
    }

    fn release_reservation(&self, limits: &CrawlLimits) {
        if !limits.unlimited_pages() {
            self.reserved.fetch_sub(1, Ordering::SeqCst);
            self.budget_freed.notify_waiters();
        }
    }

    fn budget_reached(&self, limits: &CrawlLimits) -> bool {
        !limits.unlimited_pages() && self.pages_fetched() >= limits.max_pages
    }

    fn record_success(&self) -> u64 {
        self.pages_fetched.fetch_add(1, Ordering::SeqCst) + 1
    }

    fn record_failure(&self, label: String) {
        self.pages_failed.fetch_add(1, Ordering::SeqCst);
        *self.failures.entry(label).or_insert(0) += 1;
    }

    /// Registers a job about to be pushed
    pub(crate) fn begin_job(&self) {
        self.outstanding.fetch_add(1, Ordering::SeqCst);
    }

    /// Retires a job; true when it was the last outstanding one
    pub(crate) fn end_job(&self) -> bool {
        self.outstanding.fetch_sub(1, Ordering::SeqCst) == 1
    }
}

/// Everything a worker touches, shared behind one `Arc`
pub struct WorkerContext {
    pub(crate) queue: Arc<FrontierQueue>,
    pub(crate) visited: Arc<VisitedSet>,
    pub(crate) fetcher: FetchPipeline,
    pub(crate) sinks: SinkHandle,
    pub(crate) stats: Arc<CrawlStats>,
    pub(crate) limits: CrawlLimits,
    pub(crate) session_state: Arc<StateCell>,
    worker_states: Box<[AtomicU8]>,
}

impl WorkerContext {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        queue: Arc<FrontierQueue>,
        visited: Arc<VisitedSet>,
        fetcher: FetchPipeline,
        sinks: SinkHandle,
        stats: Arc<CrawlStats>,
        limits: CrawlLimits,
        session_state: Arc<StateCell>,
        workers: usize,
    ) -> Self {
        Self {
            queue,
            visited,
            fetcher,
            sinks,
            stats,
            limits,
            session_state,
            worker_states: (0..workers.max(1))
                .map(|_| AtomicU8::new(WorkerState::Idle.as_u8()))
                .collect(),
        }
    }

    pub fn worker_count(&self) -> usize {
        self.worker_states.len()
    }

    pub(crate) fn worker_state(&self, id: usize) -> Option<WorkerState> {
        self.worker_states
            .get(id)
            .map(|state| WorkerState::from_u8(state.load(Ordering::SeqCst)))
    }

    fn set_state(&self, id: usize, state: WorkerState) {
        if let Some(slot) = self.worker_states.get(id) {
            slot.store(state.as_u8(), Ordering::SeqCst);
        }
    }

    /// Moves the session to Draining and releases every blocked worker
    fn close_frontier(&self) {
        self.session_state.begin_draining();
        self.queue.close();
    }

    /// Waits for a unit of the page budget
    ///
    /// While every unit is held by in-flight fetches the job is parked
    /// rather than dropped: a failing fetch returns its unit, and a full
    /// budget closes the frontier. Returns false once the frontier closes.
    async fn reserve_page(&self) -> bool {
        loop {
            let freed = self.stats.budget_freed.notified();
            tokio::pin!(freed);
            freed.as_mut().enable();

            if self.stats.try_reserve_page(&self.limits) {
                return true;
            }
            if self.queue.is_closed() {
                return false;
            }

            tokio::select! {
                _ = freed => {}
                _ = self.queue.closed() => return false,
            }
        }
    }

    fn finish_job(&self) {
        if self.stats.end_job() && !self.queue.is_closed() {
            tracing::info!("Frontier exhausted with no fetches in flight");
            self.close_frontier();
        }
    }
}

/// The fixed set of spawned workers
pub struct WorkerPool {
    ctx: Arc<WorkerContext>,
    handles: Vec<JoinHandle<()>>,
}

impl WorkerPool {
    /// Spawns one task per worker slot in the context
    pub fn spawn(ctx: Arc<WorkerContext>) -> Self {
        let handles = (0..ctx.worker_count())
            .map(|id| {
                let ctx = Arc::clone(&ctx);
                tokio::spawn(async move { run_worker(id, ctx).await })
            })
            .collect();

        Self { ctx, handles }
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// Waits for every worker to exit, returning how many reached
    /// [`WorkerState::Stopped`]
    pub async fn join(self) -> usize {
        for handle in self.handles {
            if let Err(e) = handle.await {
                tracing::error!("Worker task failed: {}", e);
            }
        }

        (0..self.ctx.worker_count())
            .filter(|&id| self.ctx.worker_state(id) == Some(WorkerState::Stopped))
            .count()
    }
}

async fn run_worker(id: usize, ctx: Arc<WorkerContext>) {
    tracing::debug!("Worker {} started", id);

    loop {
        ctx.set_state(id, WorkerState::Idle);

        let Some(job) = ctx.queue.pop_blocking().await else {
            break;
        };

        if !ctx.reserve_page().await {
            tracing::trace!("Frontier closed before {} got a page slot", job.url());
            ctx.finish_job();
            continue;
        }

        ctx.set_state(id, WorkerState::Fetching);
        ctx.stats.in_flight.fetch_add(1, Ordering::SeqCst);
        let result = ctx.fetcher.fetch(job).await;
        ctx.stats.in_flight.fetch_sub(1, Ordering::SeqCst);

        ctx.set_state(id, WorkerState::Processing);
        process_result(&ctx, result);
        ctx.finish_job();
    }

    ctx.set_state(id, WorkerState::Stopped);
    tracing::debug!("Worker {} stopped", id);
}

fn process_result(ctx: &WorkerContext, result: FetchResult) {
    if !result.is_success() {
        ctx.stats.release_reservation(&ctx.limits);
        if let Some(kind) = result.error {
            tracing::warn!(
                "Failed to fetch {} after {} attempt(s): {}",
                result.job.url(),
                result.attempts,
                kind
            );
            ctx.stats.record_failure(kind.label());
        }
        return;
    }

    if let Some(kind) = result.error {
        tracing::debug!("Salvaged {} despite {}", result.job.url(), kind);
        ctx.stats.record_failure(kind.label());
    }

    let fetched = ctx.stats.record_success();
    tracing::debug!(
        "Fetched {} (depth {}, {} links)",
        result.job.url(),
        result.job.depth(),
        result.links.len()
    );

    if fetched % 100 == 0 {
        tracing::info!(
            "Progress: {} pages fetched, {} in frontier",
            fetched,
            ctx.queue.len()
        );
    }

    enqueue_links(ctx, &result.job, &result.links);
    ctx.sinks.submit(ArchivedPage::from_fetch(&result));

    if ctx.stats.budget_reached(&ctx.limits) && !ctx.queue.is_closed() {
        tracing::info!("Page budget of {} reached", ctx.limits.max_pages);
        ctx.close_frontier();
    }
}

/// Admits and pushes the links discovered on one page
fn enqueue_links(ctx: &WorkerContext, parent: &CrawlJob, links: &[String]) {
    ctx.stats
        .links_discovered
        .fetch_add(links.len() as u64, Ordering::Relaxed);

    let depth = parent.depth() + 1;
    if depth > ctx.limits.max_depth {
        return;
    }

    for link in links {
        if ctx.stats.budget_reached(&ctx.limits) {
            break;
        }

        let url = match normalize_url(link) {
            Ok(url) => url,
            Err(e) => {
                tracing::trace!("Skipping {}: {}", link, e);
                continue;
            }
        };

        let Some(host) = extract_host(&url) else {
            continue;
        };

        if !ctx.visited.try_admit(&url) {
            continue;
        }

        let priority = classify_priority(&url);
        let job = CrawlJob::new(url, priority, host, depth);
        ctx.stats.begin_job();

        match ctx.queue.push(job) {
            Ok(PushOutcome::Queued(_)) => {
                ctx.stats.links_admitted.fetch_add(1, Ordering::Relaxed);
            }
            Ok(PushOutcome::Dropped) => {
                ctx.finish_job();
            }
            Err(QueueClosed(job)) => {
                tracing::trace!("Frontier closed, not queueing {}", job.url());
                ctx.finish_job();
                break;
            }
        }
    }
}

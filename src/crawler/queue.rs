//! Frontier queue of pending crawl jobs
//!
//! This module handles:
//! - Three independent bounded sub-queues (High, Normal, Low)
//! - Cross-tier fallback on push, then drop, never block
//! - Strict High-first popping with unbiased Normal/Low service
//! - Blocking pops released by `close`
//! - Atomic queue statistics for the benchmark recorder

use crate::config::QueueConfig;
use crate::crawler::job::{CrawlJob, Priority};
use crossbeam::queue::ArrayQueue;
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicU64, AtomicUsize, Ordering};
use thiserror::Error;
use tokio::sync::Notify;

/// Returned by [`FrontierQueue::push`] once the queue is stopped
#[derive(Debug, Error)]
#[error("frontier queue is closed")]
pub struct QueueClosed(pub CrawlJob);

/// Where a pushed job ended up
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushOutcome {
    /// Stored in the given tier (possibly a fallback tier)
    Queued(Priority),
    /// Every applicable tier was full
    Dropped,
}

/// Point-in-time copy of the queue counters
///
/// Outside of a concurrent update,
/// `size == total_queued - total_dequeued - dropped - discarded`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueueStats {
    pub total_queued: u64,
    pub total_dequeued: u64,
    pub dropped: u64,
    /// Jobs still pending when the queue was closed
    pub discarded: u64,
    pub queued_high: u64,
    pub queued_normal: u64,
    pub queued_low: u64,
    pub size: i64,
}

#[derive(Debug, Default)]
struct Counters {
    total_queued: AtomicU64,
    total_dequeued: AtomicU64,
    dropped: AtomicU64,
    discarded: AtomicU64,
    per_priority: [AtomicU64; 3],
    size: AtomicI64,
}

/// Bounded three-tier priority frontier
///
/// Each tier is its own lock-free bounded queue; there is no lock shared
/// between tiers or between producers and consumers.
#[derive(Debug)]
pub struct FrontierQueue {
    tiers: [ArrayQueue<CrawlJob>; 3],
    notify: Notify,
    /// Signalled once by `close`
    closed_notify: Notify,
    closed: AtomicBool,
    /// Alternates which of Normal/Low is tried first
    ticket: AtomicUsize,
    /// Pushes between their closed check and their tier insert
    pushers: AtomicUsize,
    counters: Counters,
}

/// Holds `pushers` up for the duration of one push
struct PushGuard<'a>(&'a AtomicUsize);

impl<'a> PushGuard<'a> {
    fn enter(pushers: &'a AtomicUsize) -> Self {
        pushers.fetch_add(1, Ordering::SeqCst);
        Self(pushers)
    }
}

impl Drop for PushGuard<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl FrontierQueue {
    /// Creates a queue with the given tier capacities
    ///
    /// # Panics
    ///
    /// Panics if any capacity is zero; configuration validation rejects that.
    pub fn new(config: &QueueConfig) -> Self {
        Self {
            tiers: [
                ArrayQueue::new(config.high_capacity),
                ArrayQueue::new(config.normal_capacity),
                ArrayQueue::new(config.low_capacity),
            ],
            notify: Notify::new(),
            closed_notify: Notify::new(),
            closed: AtomicBool::new(false),
            ticket: AtomicUsize::new(0),
            pushers: AtomicUsize::new(0),
            counters: Counters::default(),
        }
    }

    /// Adds a job without ever blocking
    ///
    /// The job goes to its own tier; if that tier is full it falls back
    /// High → Normal → Low, and is dropped only when every applicable tier
    /// is saturated.
    pub fn push(&self, job: CrawlJob) -> Result<PushOutcome, QueueClosed> {
        let _guard = PushGuard::enter(&self.pushers);
        if self.closed.load(Ordering::SeqCst) {
            return Err(QueueClosed(job));
        }

        self.counters.total_queued.fetch_add(1, Ordering::AcqRel);

        let mut tier = job.priority();
        let mut job = job;
        loop {
            match self.tiers[tier.index()].push(job) {
                Ok(()) => {
                    self.counters.size.fetch_add(1, Ordering::AcqRel);
                    self.counters.per_priority[tier.index()].fetch_add(1, Ordering::AcqRel);
                    self.notify.notify_one();
                    return Ok(PushOutcome::Queued(tier));
                }
                Err(rejected) => match tier.fallback() {
                    Some(next) => {
                        tracing::trace!("{} tier full, falling back to {}", tier, next);
                        job = rejected;
                        tier = next;
                    }
                    None => {
                        self.counters.dropped.fetch_add(1, Ordering::AcqRel);
                        tracing::debug!("Frontier saturated, dropping {}", rejected.url());
                        return Ok(PushOutcome::Dropped);
                    }
                },
            }
        }
    }

    /// Removes the next job without blocking
    ///
    /// High is always tried first. Normal and Low are then tried in an
    /// alternating order so neither tier can starve the other.
    pub fn pop(&self) -> Option<CrawlJob> {
        if self.is_closed() {
            return None;
        }

        let order = if self.ticket.fetch_add(1, Ordering::Relaxed) % 2 == 0 {
            [Priority::High, Priority::Normal, Priority::Low]
        } else {
            [Priority::High, Priority::Low, Priority::Normal]
        };

        for tier in order {
            if let Some(job) = self.tiers[tier.index()].pop() {
                self.counters.total_dequeued.fetch_add(1, Ordering::AcqRel);
                self.counters.size.fetch_sub(1, Ordering::AcqRel);
                return Some(job);
            }
        }

        None
    }

    /// Waits until a job is available or the queue is closed
    ///
    /// Returns `None` only once the queue is closed.
    pub async fn pop_blocking(&self) -> Option<CrawlJob> {
        loop {
            // Register interest before checking, so a push or close that
            // lands between the check and the await still wakes us.
            let notified = self.notify.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if self.is_closed() {
                return None;
            }

            if let Some(job) = self.pop() {
                return Some(job);
            }

            notified.await;
        }
    }

    /// Drains up to `n` available jobs without blocking
    pub fn pop_batch(&self, n: usize) -> Vec<CrawlJob> {
        let mut batch = Vec::with_capacity(n.min(self.len()));
        while batch.len() < n {
            match self.pop() {
                Some(job) => batch.push(job),
                None => break,
            }
        }
        batch
    }

    /// Stops the queue
    ///
    /// Further pushes fail, pending jobs are discarded, and every blocked
    /// `pop_blocking` caller wakes up with `None`. Closing twice is a no-op.
    pub fn close(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }

        // A push that saw the queue open must land before the drain
        while self.pushers.load(Ordering::SeqCst) > 0 {
            std::thread::yield_now();
        }

        let mut discarded = 0u64;
        for tier in &self.tiers {
            while tier.pop().is_some() {
                discarded += 1;
            }
        }
        self.counters
            .discarded
            .fetch_add(discarded, Ordering::AcqRel);
        self.counters
            .size
            .fetch_sub(discarded as i64, Ordering::AcqRel);

        tracing::debug!("Frontier closed, discarded {} pending jobs", discarded);
        self.notify.notify_waiters();
        self.closed_notify.notify_waiters();
    }

    /// Resolves once the queue has been closed
    pub async fn closed(&self) {
        let notified = self.closed_notify.notified();
        tokio::pin!(notified);
        notified.as_mut().enable();

        if self.is_closed() {
            return;
        }
        notified.await;
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Current number of queued jobs (the signed size gauge, floored at 0)
    pub fn len(&self) -> usize {
        self.counters.size.load(Ordering::Acquire).max(0) as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of jobs currently held by one tier
    pub fn tier_len(&self, priority: Priority) -> usize {
        self.tiers[priority.index()].len()
    }

    pub fn stats(&self) -> QueueStats {
        let c = &self.counters;
        QueueStats {
            total_queued: c.total_queued.load(Ordering::Acquire),
            total_dequeued: c.total_dequeued.load(Ordering::Acquire),
            dropped: c.dropped.load(Ordering::Acquire),
            discarded: c.discarded.load(Ordering::Acquire),
            queued_high: c.per_priority[0].load(Ordering::Acquire),
            queued_normal: c.per_priority[1].load(Ordering::Acquire),
            queued_low: c.per_priority[2].load(Ordering::Acquire),
            size: c.size.load(Ordering::Acquire),
        }
    }
}

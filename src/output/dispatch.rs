//! Non-blocking handoff of fetched pages to sinks
//!
//! Workers submit pages with `try_send` on a bounded channel; a dedicated
//! blocking task drains the channel and calls every sink in order. A full
//! channel drops the page instead of stalling the worker.

use crate::storage::{ArchiveSink, ArchivedPage};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Errors from the sink dispatch task itself
///
/// Individual sink failures are not errors here; they are counted in
/// [`SinkReport::failed`].
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("Sink dispatch task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// What happened to the pages handed to the sinks
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SinkReport {
    /// Pages every sink was called with
    pub delivered: u64,
    /// Individual sink calls that returned an error
    pub failed: u64,
    /// Pages dropped because the channel was full
    pub dropped: u64,
}

/// Cloneable sending side held by workers
#[derive(Debug, Clone)]
pub struct SinkHandle {
    sender: Option<mpsc::Sender<ArchivedPage>>,
    dropped: Arc<AtomicU64>,
}

impl SinkHandle {
    /// A handle that discards everything (no sinks configured)
    pub fn disabled() -> Self {
        Self {
            sender: None,
            dropped: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Hands a page over without waiting
    ///
    /// Returns false when the page was dropped.
    pub fn submit(&self, page: ArchivedPage) -> bool {
        let Some(sender) = &self.sender else {
            return true;
        };

        match sender.try_send(page) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(page)) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                tracing::debug!("Sink queue full, dropping {}", page.url);
                false
            }
            Err(mpsc::error::TrySendError::Closed(page)) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                tracing::warn!("Sink dispatcher gone, dropping {}", page.url);
                false
            }
        }
    }

    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

/// Owns the dispatch task
pub struct SinkDispatcher {
    handle: SinkHandle,
    task: Option<JoinHandle<SinkReport>>,
}

impl SinkDispatcher {
    /// Starts the dispatch task for the given sinks
    ///
    /// With no sinks, no task is spawned and submitted pages are discarded.
    pub fn spawn(sinks: Vec<Arc<dyn ArchiveSink>>, capacity: usize) -> Self {
        if sinks.is_empty() {
            return Self {
                handle: SinkHandle::disabled(),
                task: None,
            };
        }

        let (sender, mut receiver) = mpsc::channel::<ArchivedPage>(capacity.max(1));
        let task = tokio::task::spawn_blocking(move || {
            let mut report = SinkReport::default();
            while let Some(page) = receiver.blocking_recv() {
                for sink in &sinks {
                    if let Err(e) = sink.store(&page) {
                        tracing::warn!("Failed to store {}: {}", page.url, e);
                        report.failed += 1;
                    }
                }
                report.delivered += 1;
            }
            report
        });

        Self {
            handle: SinkHandle {
                sender: Some(sender),
                dropped: Arc::new(AtomicU64::new(0)),
            },
            task: Some(task),
        }
    }

    pub fn handle(&self) -> SinkHandle {
        self.handle.clone()
    }

    /// Waits for every queued page to reach the sinks
    ///
    /// Completes once all [`SinkHandle`] clones have been dropped.
    pub async fn finish(self) -> Result<SinkReport, SinkError> {
        let dropped = self.handle.dropped();
        drop(self.handle);

        let mut report = match self.task {
            Some(task) => task.await?,
            None => SinkReport::default(),
        };
        report.dropped = dropped;
        Ok(report)
    }
}

//! Per-host request pacing
//!
//! Every host gets its own pacing state, created lazily on first use and kept
//! for the whole session. Callers for the same host serialize on that host's
//! lock; callers for different hosts never contend.

use dashmap::DashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

/// Pacing state for a single host
#[derive(Debug, Clone)]
pub struct HostRateState {
    /// The host this state belongs to
    pub host: String,

    /// Start time of the most recent request to this host
    pub last_request_at: Option<Instant>,

    /// Minimum spacing between consecutive requests
    pub min_interval: Duration,

    /// Number of requests let through so far
    pub request_count: u64,
}

impl HostRateState {
    pub fn new(host: &str, min_interval: Duration) -> Self {
        Self {
            host: host.to_string(),
            last_request_at: None,
            min_interval,
            request_count: 0,
        }
    }

    /// Time left until the next request may start, or None if it may start now
    pub fn time_until_next_request(&self, now: Instant) -> Option<Duration> {
        let last = self.last_request_at?;
        let ready_at = last + self.min_interval;
        (ready_at > now).then(|| ready_at - now)
    }

    pub fn record_request(&mut self, now: Instant) {
        self.request_count += 1;
        self.last_request_at = Some(now);
    }
}

/// Rate limiter keyed by host
#[derive(Debug)]
pub struct RateLimiter {
    min_interval: Duration,
    hosts: DashMap<String, Arc<Mutex<HostRateState>>>,
}

impl RateLimiter {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            hosts: DashMap::new(),
        }
    }

    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }

    /// Suspends the caller until a request to `host` is allowed, then stamps it
    ///
    /// The host lock is held across the sleep, so compute, sleep, and stamp
    /// form one critical section: two callers for the same host can never
    /// both pass without the second one waiting out the interval.
    ///
    /// Returns the instant recorded as this request's start.
    pub async fn wait(&self, host: &str) -> Instant {
        let state = self.state_for(host);
        let mut state = state.lock().await;

        if let Some(delay) = state.time_until_next_request(Instant::now()) {
            tracing::trace!("Pacing {} for {:?}", host, delay);
            tokio::time::sleep(delay).await;
        }

        let now = Instant::now();
        state.record_request(now);
        now
    }

    /// Returns a copy of the pacing state for a host, if it has been seen
    pub async fn snapshot(&self, host: &str) -> Option<HostRateState> {
        let state = self.hosts.get(host).map(|entry| Arc::clone(entry.value()))?;
        let guard = state.lock().await;
        Some(guard.clone())
    }

    /// Number of distinct hosts seen this session
    pub fn host_count(&self) -> usize {
        self.hosts.len()
    }

    fn state_for(&self, host: &str) -> Arc<Mutex<HostRateState>> {
        if let Some(entry) = self.hosts.get(host) {
            return Arc::clone(entry.value());
        }

        // The shard guard is released at the end of this statement, before
        // the caller awaits the host lock.
        Arc::clone(
            self.hosts
                .entry(host.to_string())
                .or_insert_with(|| Arc::new(Mutex::new(HostRateState::new(host, self.min_interval))))
                .value(),
        )
    }
}

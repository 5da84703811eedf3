//! Process-wide request gate for the remote catalog.
//!
//! Every remote call from every group matcher goes through one shared
//! [`RequestGate`]. Callers hold a [`RequestPermit`] for the whole remote
//! call, so at most one request is in flight at any time, and issue times
//! are spaced at least `interval` apart. Backoff is adaptive: failures
//! double the interval (up to 16x), a run of successes halves it back
//! toward the base.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::thread;
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use crate::error::CatalogError;

/// Minimum-interval limiter with adaptive backoff. Not thread-safe on its
/// own; [`RequestGate`] wraps it in a mutex.
#[derive(Debug)]
struct IntervalLimiter {
    last_request: Option<Instant>,
    current_interval: Duration,
    base_interval: Duration,
    max_interval: Duration,
    success_count: u32,
    successes_to_reduce: u32,
}

impl IntervalLimiter {
    fn new(base_interval: Duration, max_interval: Duration, successes_to_reduce: u32) -> Self {
        IntervalLimiter {
            last_request: None,
            current_interval: base_interval,
            base_interval,
            max_interval,
            success_count: 0,
            successes_to_reduce,
        }
    }

    /// Time left before the next request may be issued.
    fn remaining(&self, now: Instant) -> Duration {
        match self.last_request {
            Some(last) => self.current_interval.saturating_sub(now.duration_since(last)),
            None => Duration::ZERO,
        }
    }

    fn report_success(&mut self) {
        if self.successes_to_reduce == 0 {
            return;
        }
        self.success_count += 1;
        if self.success_count >= self.successes_to_reduce && self.current_interval > self.base_interval {
            self.current_interval = (self.current_interval / 2).max(self.base_interval);
            info!(
                "Catalog rate limit reduced to {:.1}s after {} successes",
                self.current_interval.as_secs_f64(),
                self.success_count
            );
            self.success_count = 0;
        }
    }

    fn report_failure(&mut self) {
        self.current_interval = (self.current_interval * 2).min(self.max_interval);
        warn!(
            "Catalog rate limit increased to {:.1}s due to error",
            self.current_interval.as_secs_f64()
        );
        self.success_count = 0;
    }
}

/// Shared gate every remote catalog request must pass through.
#[derive(Debug)]
pub struct RequestGate {
    limiter: Mutex<IntervalLimiter>,
    shutdown: AtomicBool,
}

impl RequestGate {
    /// Gate with the given minimum spacing. Backoff caps at 16x the base and
    /// recovers after 10 consecutive successes.
    pub fn new(interval: Duration) -> Self {
        RequestGate {
            limiter: Mutex::new(IntervalLimiter::new(interval, interval * 16, 10)),
            shutdown: AtomicBool::new(false),
        }
    }

    pub fn from_millis(millis: u64) -> Self {
        Self::new(Duration::from_millis(millis))
    }

    /// Block until this caller may issue a request.
    ///
    /// The returned permit keeps the gate locked until it is dropped or
    /// reported on, so the caller must hold it across the remote call.
    /// Concurrent callers queue behind it and the next request is issued
    /// no sooner than the current interval after this one. Fails once
    /// [`RequestGate::shut_down`] was called.
    pub fn acquire(&self) -> Result<RequestPermit<'_>, CatalogError> {
        if self.is_shut_down() {
            return Err(CatalogError::ShuttingDown);
        }

        let mut limiter = self.limiter.lock().unwrap_or_else(PoisonError::into_inner);
        let wait = limiter.remaining(Instant::now());
        if !wait.is_zero() {
            debug!("Catalog rate limiting: waiting {:.2}s", wait.as_secs_f64());
            thread::sleep(wait);
        }

        // Re-check: stop may have been requested while we slept
        if self.is_shut_down() {
            return Err(CatalogError::ShuttingDown);
        }
        limiter.last_request = Some(Instant::now());
        Ok(RequestPermit { limiter })
    }

    /// Current spacing between requests.
    pub fn interval(&self) -> Duration {
        self.limiter
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .current_interval
    }

    /// Refuse all further requests. Requests already issued are not affected.
    pub fn shut_down(&self) {
        self.shutdown.store(true, Ordering::SeqCst);
    }

    pub fn is_shut_down(&self) -> bool {
        self.shutdown.load(Ordering::SeqCst)
    }
}

/// Exclusive right to one remote request. Releases the gate when dropped.
#[must_use = "the gate is released as soon as the permit is dropped"]
pub struct RequestPermit<'a> {
    limiter: MutexGuard<'a, IntervalLimiter>,
}

impl RequestPermit<'_> {
    /// Record the outcome of the request and release the gate.
    pub fn finish(mut self, ok: bool) {
        if ok {
            self.limiter.report_success();
        } else {
            self.limiter.report_failure();
        }
    }
}

impl std::fmt::Debug for RequestPermit<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestPermit").finish_non_exhaustive()
    }
}

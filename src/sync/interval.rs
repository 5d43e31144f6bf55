// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Interval throttling around the synchronizer.
//!
//! The attempt timestamp is stamped when a pass *starts*, not when it
//! finishes, so a slow or failing pass cannot cause a burst of immediate
//! retries once the interval nominally elapses. The flip side: a failed
//! pass is not retried before the next full interval.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use parking_lot::Mutex;
use tokio::time::Instant;

use super::synchronizer::{PassStats, Synchronizer};
use crate::storage::traits::AdapterError;

/// Default spacing between reconciliation attempts.
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(10);

/// Throttles a [`Synchronizer`] to at most one pass per interval.
///
/// An atomic in-flight flag keeps concurrent callers from racing into
/// overlapping passes once the interval expires; losers of the race return
/// immediately and serve whatever the winner's pass produces.
pub struct IntervalSynchronizer {
    synchronizer: Synchronizer,
    interval: Duration,
    last_attempt: Mutex<Option<Instant>>,
    in_flight: AtomicBool,
}

impl IntervalSynchronizer {
    #[must_use]
    pub fn new(synchronizer: Synchronizer, interval: Duration) -> Self {
        Self {
            synchronizer,
            interval,
            last_attempt: Mutex::new(None),
            in_flight: AtomicBool::new(false),
        }
    }

    #[must_use]
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Run a pass if the interval has elapsed and no pass is in flight.
    ///
    /// Returns `Ok(None)` when throttled. Pass failures are already filtered
    /// by the synchronizer's `raise_exceptions` policy before they reach the
    /// caller here.
    pub async fn attempt(&self) -> Result<Option<PassStats>, AdapterError> {
        if !self.due() {
            crate::metrics::record_sync_skip();
            return Ok(None);
        }
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            crate::metrics::record_sync_skip();
            return Ok(None);
        }

        *self.last_attempt.lock() = Some(Instant::now());
        let result = self.synchronizer.run().await;
        self.in_flight.store(false, Ordering::Release);
        result.map(Some)
    }

    /// Run a pass unconditionally, stamping the attempt time.
    ///
    /// Used at construction time and by the background refresh task; neither
    /// contends with `attempt()`'s single-flight flag.
    pub async fn force(&self) -> Result<PassStats, AdapterError> {
        *self.last_attempt.lock() = Some(Instant::now());
        self.synchronizer.run().await
    }

    fn due(&self) -> bool {
        let last = *self.last_attempt.lock();
        last.map_or(true, |at| at.elapsed() >= self.interval)
    }
}

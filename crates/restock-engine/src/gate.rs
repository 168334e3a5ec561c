//! Schedule gate: hold a worker until its buy time.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::clock::{nap, Clock, Wake};

/// Longest single sleep before the clock is re-read.
pub const DEFAULT_MAX_NAP: Duration = Duration::from_secs(1);

/// How a gate wait ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateResult {
    /// Current time reached the target.
    Reached,
    /// Cancelled before the target.
    Cancelled,
}

/// Blocks a worker until a target wall-clock time.
///
/// Sleeps in naps of at most `max_nap`, re-reading the clock after each, so
/// a wall-clock adjustment shifts the wake-up by at most one nap.
#[derive(Clone)]
pub struct ScheduleGate {
    clock: Arc<dyn Clock>,
    max_nap: Duration,
}

impl ScheduleGate {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self::with_max_nap(clock, DEFAULT_MAX_NAP)
    }

    /// A zero `max_nap` falls back to [`DEFAULT_MAX_NAP`].
    pub fn with_max_nap(clock: Arc<dyn Clock>, max_nap: Duration) -> Self {
        let max_nap = if max_nap.is_zero() {
            DEFAULT_MAX_NAP
        } else {
            max_nap
        };
        Self { clock, max_nap }
    }

    /// Time left until `target`, or `None` once it has been reached.
    pub fn remaining(&self, target: DateTime<Utc>) -> Option<Duration> {
        (target - self.clock.now())
            .to_std()
            .ok()
            .filter(|d| !d.is_zero())
    }

    /// Wait until `target`. Returns immediately if it is not in the future.
    pub async fn wait_until(&self, target: DateTime<Utc>, cancel: &CancellationToken) -> GateResult {
        if cancel.is_cancelled() {
            return GateResult::Cancelled;
        }

        if let Some(remaining) = self.remaining(target) {
            debug!(
                target = %target,
                remaining_secs = remaining.as_secs(),
                "Waiting for scheduled buy time"
            );
        }

        while let Some(remaining) = self.remaining(target) {
            if nap(remaining.min(self.max_nap), cancel).await == Wake::Cancelled {
                return GateResult::Cancelled;
            }
        }

        GateResult::Reached
    }
}

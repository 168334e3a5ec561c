//! Wall-clock source and cancellation-aware sleeping.
//!
//! Worker suspension points all go through [`nap`], which races a tokio
//! sleep against the worker's cancellation token. Wall-clock time comes from
//! an injected [`Clock`] so tests can pause tokio time and still get a
//! consistent "now".

use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Trait for obtaining current wall-clock time, enabling testability.
pub trait Clock: Send + Sync {
    /// Returns the current wall-clock time.
    fn now(&self) -> DateTime<Utc>;
}

/// System clock implementation using real time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Wall clock driven by tokio's clock.
///
/// `now()` is `origin + (tokio::time::Instant::now() - created_at)`, so under
/// `tokio::time::pause` wall time advances exactly as virtual time does.
#[derive(Debug, Clone)]
pub struct PausedClock {
    origin: DateTime<Utc>,
    created_at: Instant,
}

impl PausedClock {
    /// Create a clock that reads `origin` right now.
    #[must_use]
    pub fn starting_at(origin: DateTime<Utc>) -> Self {
        Self {
            origin,
            created_at: Instant::now(),
        }
    }
}

impl Clock for PausedClock {
    fn now(&self) -> DateTime<Utc> {
        let elapsed = Instant::now().saturating_duration_since(self.created_at);
        self.origin + chrono::Duration::from_std(elapsed).unwrap_or_else(|_| chrono::Duration::zero())
    }
}

/// How a [`nap`] ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Wake {
    Elapsed,
    Cancelled,
}

/// Sleep for `duration` unless `cancel` fires first.
///
/// Returns immediately with `Wake::Cancelled` if the token is already
/// cancelled.
pub async fn nap(duration: Duration, cancel: &CancellationToken) -> Wake {
    if cancel.is_cancelled() {
        return Wake::Cancelled;
    }
    tokio::select! {
        biased;
        () = cancel.cancelled() => Wake::Cancelled,
        () = tokio::time::sleep(duration) => Wake::Elapsed,
    }
}

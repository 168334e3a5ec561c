//! Worker state machine phases and terminal outcomes.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Phase of one item worker.
///
/// `Scheduled -> Polling -> Submitting -> {Purchased | Exhausted}`, with
/// `Submitting -> Polling` after an exhausted batch and `* -> Aborted` on an
/// unanticipated error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkerPhase {
    /// Waiting for the scheduled buy time.
    Scheduled,
    /// Checking stock at a fixed interval.
    Polling,
    /// Running a bounded submission batch.
    Submitting,
    /// Order placed (terminal).
    Purchased,
    /// Stopped without an order (terminal).
    Exhausted,
    /// Unanticipated error (terminal).
    Aborted,
}

impl WorkerPhase {
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            WorkerPhase::Purchased | WorkerPhase::Exhausted | WorkerPhase::Aborted
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            WorkerPhase::Scheduled => "scheduled",
            WorkerPhase::Polling => "polling",
            WorkerPhase::Submitting => "submitting",
            WorkerPhase::Purchased => "purchased",
            WorkerPhase::Exhausted => "exhausted",
            WorkerPhase::Aborted => "aborted",
        }
    }
}

impl fmt::Display for WorkerPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Terminal result of a worker run. Produced exactly once per worker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", content = "reason", rename_all = "snake_case")]
pub enum WorkerOutcome {
    /// An order was placed.
    Purchased,
    /// The worker stopped without placing an order (cancelled, or the
    /// optional round limit was reached).
    Exhausted,
    /// An unanticipated error escaped the stock-check/submit contracts.
    Aborted(String),
}

impl WorkerOutcome {
    #[must_use]
    pub fn is_purchased(&self) -> bool {
        matches!(self, WorkerOutcome::Purchased)
    }

    /// Terminal phase matching this outcome.
    pub fn phase(&self) -> WorkerPhase {
        match self {
            WorkerOutcome::Purchased => WorkerPhase::Purchased,
            WorkerOutcome::Exhausted => WorkerPhase::Exhausted,
            WorkerOutcome::Aborted(_) => WorkerPhase::Aborted,
        }
    }
}

impl fmt::Display for WorkerOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WorkerOutcome::Aborted(reason) => write!(f, "aborted: {reason}"),
            other => f.write_str(other.phase().as_str()),
        }
    }
}

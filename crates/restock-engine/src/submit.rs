//! Bounded submission: up to `attempts` submit calls, `interval` apart.
//!
//! From the worker's point of view one batch has two results, placed or
//! exhausted. An attempt that errors counts as a failed attempt.

use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use restock_core::{ItemTask, RetryPolicy};
use restock_session::Storefront;
use restock_telemetry::Metrics;

use crate::clock::{nap, Wake};

/// How a submission batch ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// Order placed on attempt `attempt` (1-based).
    Placed { attempt: u32 },
    /// All `attempts` calls failed.
    Exhausted { attempts: u32 },
    /// Cancelled during an inter-attempt delay after `attempts` calls.
    Cancelled { attempts: u32 },
}

/// Retry loop around a single-shot `submit_order`.
#[derive(Debug, Clone, Copy)]
pub struct SubmissionAttempt {
    policy: RetryPolicy,
}

impl SubmissionAttempt {
    pub fn new(policy: RetryPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    /// Run one bounded batch.
    ///
    /// Makes exactly `policy.attempts` calls unless one succeeds or the
    /// batch is cancelled; sleeps only between attempts.
    pub async fn run(
        &self,
        storefront: &dyn Storefront,
        task: &ItemTask,
        cancel: &CancellationToken,
    ) -> SubmitOutcome {
        let sku = task.sku.as_str();
        let max_attempts = self.policy.attempts;

        for attempt in 1..=max_attempts {
            match storefront
                .submit_order(&task.sku, task.quantity, &task.area)
                .await
            {
                Ok(true) => {
                    Metrics::submit_attempt(sku, "placed");
                    Metrics::submit_batch(sku, "placed");
                    info!(attempt, max_attempts, "Order placed");
                    return SubmitOutcome::Placed { attempt };
                }
                Ok(false) => {
                    Metrics::submit_attempt(sku, "rejected");
                    warn!(attempt, max_attempts, "Order submission rejected");
                }
                Err(e) => {
                    Metrics::submit_attempt(sku, "error");
                    warn!(attempt, max_attempts, error = %e, "Order submission failed");
                }
            }

            if attempt < max_attempts
                && nap(self.policy.interval, cancel).await == Wake::Cancelled
            {
                return SubmitOutcome::Cancelled { attempts: attempt };
            }
        }

        Metrics::submit_batch(sku, "exhausted");
        SubmitOutcome::Exhausted {
            attempts: max_attempts,
        }
    }
}

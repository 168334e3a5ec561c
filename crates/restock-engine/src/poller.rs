//! Availability poller: check stock at a fixed cadence until it shows up.
//!
//! Check errors are treated as "not available yet". There is no upper bound
//! on polling time and no backoff; the interval stays constant so a short
//! release window is not missed.

use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use restock_core::ItemTask;
use restock_session::Storefront;
use restock_telemetry::Metrics;

use crate::clock::{nap, Wake};

/// How a polling run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    /// Stock confirmed after `checks` stock-check calls.
    Available { checks: u64 },
    /// Cancelled after `checks` stock-check calls.
    Cancelled { checks: u64 },
}

/// Repeatedly queries `check_stock` until it returns true.
#[derive(Debug, Clone, Copy)]
pub struct AvailabilityPoller {
    interval: Duration,
}

impl AvailabilityPoller {
    pub fn new(interval: Duration) -> Self {
        Self { interval }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Poll until the item is available or `cancel` fires.
    ///
    /// The first check is issued immediately; later checks are `interval`
    /// apart.
    pub async fn poll_until_available(
        &self,
        storefront: &dyn Storefront,
        task: &ItemTask,
        cancel: &CancellationToken,
    ) -> PollOutcome {
        let sku = task.sku.as_str();
        let mut checks = 0u64;

        loop {
            if cancel.is_cancelled() {
                return PollOutcome::Cancelled { checks };
            }

            checks += 1;
            match storefront
                .check_stock(&task.sku, task.quantity, &task.area)
                .await
            {
                Ok(true) => {
                    Metrics::stock_check(sku, "in_stock");
                    info!(checks, "Item in stock, proceeding to order");
                    return PollOutcome::Available { checks };
                }
                Ok(false) => {
                    Metrics::stock_check(sku, "out_of_stock");
                    debug!(
                        checks,
                        interval_secs = self.interval.as_secs_f64(),
                        "Order conditions not met, checking again after interval"
                    );
                }
                Err(e) => {
                    Metrics::stock_check(sku, "error");
                    warn!(
                        checks,
                        error = %e,
                        retryable = e.is_retryable(),
                        "Stock check failed, treating as unavailable"
                    );
                }
            }

            if nap(self.interval, cancel).await == Wake::Cancelled {
                return PollOutcome::Cancelled { checks };
            }
        }
    }
}

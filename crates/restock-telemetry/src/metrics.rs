//! Prometheus metrics for the restock bot.
//!
//! Covers the worker lifecycle:
//! - Stock checks by result
//! - Individual submit attempts and whole submission batches
//! - Terminal worker outcomes and active worker count
//! - Push notification delivery
//!
//! # Panics
//!
//! Metric registration uses `unwrap()`. A registration failure means a
//! duplicate metric name, which is a programming error surfaced on first use.

use crate::error::{TelemetryError, TelemetryResult};
use once_cell::sync::Lazy;
use prometheus::{register_counter_vec, register_int_gauge, CounterVec, Encoder, IntGauge};

/// Total stock checks.
/// Labels: sku, result (in_stock/out_of_stock/error)
pub static STOCK_CHECKS_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "restock_stock_checks_total",
        "Total stock availability checks",
        &["sku", "result"]
    )
    .unwrap()
});

/// Total individual submit attempts.
/// Labels: sku, result (placed/rejected/error)
pub static SUBMIT_ATTEMPTS_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "restock_submit_attempts_total",
        "Total order submit attempts",
        &["sku", "result"]
    )
    .unwrap()
});

/// Total submission batches.
/// Labels: sku, result (placed/exhausted)
pub static SUBMIT_BATCHES_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "restock_submit_batches_total",
        "Total bounded submission batches",
        &["sku", "result"]
    )
    .unwrap()
});

/// Terminal worker outcomes.
/// Labels: outcome (purchased/exhausted/aborted)
pub static WORKER_OUTCOMES_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "restock_worker_outcomes_total",
        "Terminal worker outcomes",
        &["outcome"]
    )
    .unwrap()
});

/// Workers currently running.
pub static WORKERS_ACTIVE: Lazy<IntGauge> =
    Lazy::new(|| register_int_gauge!("restock_workers_active", "Workers currently running").unwrap());

/// Push notifications.
/// Labels: result (sent/failed)
pub static NOTIFICATIONS_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "restock_notifications_total",
        "Purchase notifications by delivery result",
        &["result"]
    )
    .unwrap()
});

/// Metrics facade for easy access.
pub struct Metrics;

impl Metrics {
    /// Record a stock check result.
    pub fn stock_check(sku: &str, result: &str) {
        STOCK_CHECKS_TOTAL.with_label_values(&[sku, result]).inc();
    }

    /// Record one submit attempt.
    pub fn submit_attempt(sku: &str, result: &str) {
        SUBMIT_ATTEMPTS_TOTAL.with_label_values(&[sku, result]).inc();
    }

    /// Record the end of a submission batch.
    pub fn submit_batch(sku: &str, result: &str) {
        SUBMIT_BATCHES_TOTAL.with_label_values(&[sku, result]).inc();
    }

    /// Record a terminal worker outcome.
    pub fn worker_outcome(outcome: &str) {
        WORKER_OUTCOMES_TOTAL.with_label_values(&[outcome]).inc();
    }

    pub fn worker_started() {
        WORKERS_ACTIVE.inc();
    }

    pub fn worker_finished() {
        WORKERS_ACTIVE.dec();
    }

    /// Record a notification delivery result.
    pub fn notification(result: &str) {
        NOTIFICATIONS_TOTAL.with_label_values(&[result]).inc();
    }

    /// Render every registered metric in the Prometheus text format.
    ///
    /// # Errors
    /// Returns `TelemetryError::Metrics` if encoding fails.
    pub fn gather_text() -> TelemetryResult<String> {
        let families = prometheus::gather();
        let mut buf = Vec::new();
        prometheus::TextEncoder::new()
            .encode(&families, &mut buf)
            .map_err(|e| TelemetryError::Metrics(e.to_string()))?;
        String::from_utf8(buf).map_err(|e| TelemetryError::Metrics(e.to_string()))
    }
}

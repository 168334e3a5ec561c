//! Prometheus metrics and structured logging for restock.
//!
//! - Structured logging with tracing (pretty for development, JSON in production)
//! - Prometheus counters for stock checks, submissions and worker outcomes

pub mod error;
pub mod logging;
pub mod metrics;

pub use error::{TelemetryError, TelemetryResult};
pub use logging::{init_logging, DEFAULT_LOG_DIRECTIVE};
pub use metrics::Metrics;

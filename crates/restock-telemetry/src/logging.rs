//! Structured logging initialization.

use crate::error::{TelemetryError, TelemetryResult};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Filter used when neither `RUST_LOG` nor a configured level is available.
pub const DEFAULT_LOG_DIRECTIVE: &str = "info,restock=debug";

/// Initialize structured logging.
///
/// `RUST_LOG` takes precedence over `default_directive`. Output is JSON when
/// `RUST_ENV=production`, pretty otherwise.
///
/// # Errors
/// Returns `TelemetryError::LoggingInit` if the directive is invalid or a
/// global subscriber is already installed.
pub fn init_logging(default_directive: &str) -> TelemetryResult<()> {
    let env_filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(default_directive)
            .map_err(|e| TelemetryError::LoggingInit(format!("{default_directive}: {e}")))?,
    };

    let is_production = std::env::var("RUST_ENV")
        .map(|v| v == "production")
        .unwrap_or(false);

    let result = if is_production {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(
                fmt::layer()
                    .json()
                    .with_current_span(true)
                    .with_span_list(true),
            )
            .try_init()
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(
                fmt::layer()
                    .pretty()
                    .with_target(true)
                    .with_thread_names(true),
            )
            .try_init()
    };

    result.map_err(|e| TelemetryError::LoggingInit(e.to_string()))
}


//! Application error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Item configuration error: {0}")]
    Core(#[from] restock_core::CoreError),

    #[error("Session error: {0}")]
    Session(#[from] restock_session::SessionError),

    #[error("Engine error: {0}")]
    Engine(#[from] restock_engine::EngineError),

    #[error("Telemetry error: {0}")]
    Telemetry(#[from] restock_telemetry::TelemetryError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Storefront session is not logged in; refresh the session cookie")]
    NotAuthenticated,
}

pub type AppResult<T> = Result<T, AppError>;

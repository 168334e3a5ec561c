//! Error types for restock-core.

use thiserror::Error;

/// Core error types.
///
/// Every variant is a configuration error: it is raised while building
/// item tasks, before any worker is launched.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CoreError {
    #[error("Item #{index} is missing its skuid")]
    MissingSkuId { index: usize },

    #[error("Invalid sku id: {0:?}")]
    InvalidSkuId(String),

    #[error("Invalid area id: {0:?}")]
    InvalidAreaId(String),

    #[error("Invalid buy time {value:?}: {reason}")]
    InvalidBuyTime { value: String, reason: String },

    #[error("Invalid quantity for sku {sku}: must be at least 1")]
    InvalidQuantity { sku: String },

    #[error("Invalid retry policy: {0}")]
    InvalidRetryPolicy(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Result type alias for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;

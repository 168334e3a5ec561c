//! Item task identification and configuration types.
//!
//! An `ItemTask` is built once at startup from a shopping-cart entry and is
//! then owned by exactly one worker for the rest of the run.

use crate::error::{CoreError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Storefront item identifier (SKU).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SkuId(String);

impl SkuId {
    /// Create a SKU id, rejecting empty or whitespace-only values.
    pub fn new(id: impl Into<String>) -> Result<Self> {
        let id = id.into();
        let trimmed = id.trim();
        if trimmed.is_empty() || trimmed.chars().any(char::is_whitespace) {
            return Err(CoreError::InvalidSkuId(id));
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SkuId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for SkuId {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self> {
        Self::new(value)
    }
}

impl From<SkuId> for String {
    fn from(id: SkuId) -> Self {
        id.0
    }
}

/// Delivery area identifier.
///
/// Storefronts encode areas as underscore-separated region codes
/// (e.g. "1_72_2799_0"); the value is passed through opaquely.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct AreaId(String);

impl AreaId {
    pub fn new(id: impl Into<String>) -> Result<Self> {
        let id = id.into();
        let trimmed = id.trim();
        if trimmed.is_empty() {
            return Err(CoreError::InvalidAreaId(id));
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AreaId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for AreaId {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self> {
        Self::new(value)
    }
}

impl From<AreaId> for String {
    fn from(id: AreaId) -> Self {
        id.0
    }
}

/// Bounded retry budget for one submission batch.
///
/// `attempts` submissions at most, `interval` apart. No backoff.
/// Serialize-only: build through [`RetryPolicy::new`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RetryPolicy {
    /// Maximum number of submit calls per batch (>= 1).
    pub attempts: u32,
    /// Fixed delay between consecutive attempts.
    pub interval: Duration,
}

impl RetryPolicy {
    /// Create a retry policy.
    ///
    /// # Errors
    /// Returns `CoreError::InvalidRetryPolicy` if `attempts` is zero, since a
    /// zero budget can never place an order.
    pub fn new(attempts: u32, interval: Duration) -> Result<Self> {
        if attempts == 0 {
            return Err(CoreError::InvalidRetryPolicy(
                "submit retry count must be at least 1".to_string(),
            ));
        }
        Ok(Self { attempts, interval })
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 3,
            interval: Duration::from_secs(5),
        }
    }
}

/// Immutable per-item purchase configuration.
///
/// Serialize-only: build through [`ItemTask::new`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ItemTask {
    /// Item to buy.
    pub sku: SkuId,
    /// Delivery area used for stock checks and orders.
    pub area: AreaId,
    /// Desired quantity (>= 1).
    pub quantity: u32,
    /// Delay between consecutive stock checks.
    pub stock_interval: Duration,
    /// Retry budget for each submission batch.
    pub retry: RetryPolicy,
    /// Wall-clock instant before which no stock check is issued.
    pub buy_time: DateTime<Utc>,
}

impl ItemTask {
    /// Build a validated item task.
    ///
    /// # Errors
    /// Returns a configuration error if the quantity is zero or the stock
    /// interval is zero (a zero interval would spin against the storefront).
    pub fn new(
        sku: SkuId,
        area: AreaId,
        quantity: u32,
        stock_interval: Duration,
        retry: RetryPolicy,
        buy_time: DateTime<Utc>,
    ) -> Result<Self> {
        if quantity == 0 {
            return Err(CoreError::InvalidQuantity {
                sku: sku.to_string(),
            });
        }
        if stock_interval.is_zero() {
            return Err(CoreError::InvalidConfig(format!(
                "stock interval for sku {sku} must be greater than zero"
            )));
        }
        Ok(Self {
            sku,
            area,
            quantity,
            stock_interval,
            retry,
            buy_time,
        })
    }

    /// Identity used in logs and duplicate detection: `{sku}@{area}`.
    pub fn key(&self) -> String {
        format!("{}@{}", self.sku, self.area)
    }
}

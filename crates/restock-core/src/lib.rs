//! Core domain types for the restock purchasing bot.
//!
//! This crate provides the fundamental types shared by every other crate:
//! - `SkuId`, `AreaId`: Identifiers of a storefront item and a delivery area
//! - `ItemTask`: Immutable per-item purchase configuration
//! - `RetryPolicy`: Bounded submission retry budget
//! - `WorkerPhase`, `WorkerOutcome`: Worker state machine and terminal result
//! - `parse_buy_time`: Scheduled start time parsing

pub mod error;
pub mod outcome;
pub mod schedule;
pub mod task;

pub use error::{CoreError, Result};
pub use outcome::{WorkerOutcome, WorkerPhase};
pub use schedule::{parse_buy_time, parse_buy_time_in, BUY_TIME_FORMAT, IMMEDIATE_BUY_TIME};
pub use task::{AreaId, ItemTask, RetryPolicy, SkuId};

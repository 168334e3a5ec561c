//! Concurrent per-item scheduling and retry engine.
//!
//! Every configured item gets its own [`ItemWorker`], launched into a
//! [`WorkerPool`]. A worker waits for its buy time, polls stock at a fixed
//! interval, and on availability runs one bounded submission batch. An
//! exhausted batch sends it back to polling. Workers share nothing but the
//! storefront session and the notifier.
//!
//! # Key Components
//!
//! - [`ScheduleGate`]: Holds a worker until its buy time
//! - [`AvailabilityPoller`]: Fixed-interval stock polling
//! - [`SubmissionAttempt`]: Bounded retry batch around a single submit call
//! - [`ItemWorker`]: Per-item state machine
//! - [`WorkerPool`]: Launch, cancel and join all workers
//! - [`Clock`], [`PausedClock`]: Injectable wall-clock time

pub mod clock;
pub mod error;
pub mod gate;
pub mod poller;
pub mod pool;
pub mod submit;
pub mod worker;

pub use clock::{nap, Clock, PausedClock, SystemClock, Wake};
pub use error::{EngineError, EngineResult};
pub use gate::{GateResult, ScheduleGate, DEFAULT_MAX_NAP};
pub use poller::{AvailabilityPoller, PollOutcome};
pub use pool::{PoolReport, WorkerHandle, WorkerId, WorkerPool, WorkerReport};
pub use submit::{SubmissionAttempt, SubmitOutcome};
pub use worker::{purchase_message, ItemWorker, WorkerContext, WorkerSettings, DEFAULT_NOTIFY_TITLE};

//! Engine error types.
//!
//! Only launch-time failures are errors at this level; everything that
//! happens inside a running worker is reported as a `WorkerOutcome`.

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EngineError {
    #[error("No item tasks to launch")]
    NoTasks,

    #[error("Duplicate item task: {0}")]
    DuplicateTask(String),

    #[error("Storefront session is not authenticated")]
    NotAuthenticated,

    #[error("Worker pool is shut down")]
    ShutDown,
}

pub type EngineResult<T> = Result<T, EngineError>;

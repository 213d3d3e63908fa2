//! Error types for scheduler operations.

use crate::common::TaskId;
use thiserror::Error;

/// Errors produced by the scheduler and its configuration layer.
///
/// None of these are fatal to a running scheduler: a rejected call is a no-op
/// and the caller keeps its task handle.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScheduleError {
    /// A non-positive delay was passed to `after` or `every`.
    #[error("invalid argument: {operation} delay must be positive, got {delay}")]
    InvalidArgument { operation: &'static str, delay: i64 },
    /// A category name that does not name any `AsyncCategory`.
    #[error("unknown async category: {0}")]
    UnknownCategory(String),
    /// A configuration value that cannot drive a scheduler.
    #[error("invalid config: {0}")]
    InvalidConfig(String),
}

/// A one-call `after`/`every` whose delay was rejected.
///
/// The task is registered anyway, with its default timing, exactly as if the
/// rejected call had been chained onto `schedule`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("task {id:?} kept with default timing: {source}")]
pub struct RejectedDelay {
    pub id: TaskId,
    #[source]
    pub source: ScheduleError,
}

impl From<RejectedDelay> for ScheduleError {
    fn from(rejected: RejectedDelay) -> Self {
        rejected.source
    }
}

//! Defines all public event types broadcast by the scheduler and its engine.
//!
//! Nothing in the scheduler depends on these being received; they exist so that
//! tooling (the shell, a debugger overlay, tests) can observe task lifecycles
//! without reaching into the registry.

use crate::common::{CorrelationKey, TaskId};
use tokio::time::Instant;

/// Events related to the lifecycle of individual tasks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskEvent {
    /// Fired when a task is inserted into the registry.
    TaskScheduled { id: TaskId },
    /// Fired each time a task's callback runs from the tick driver.
    TaskFired { id: TaskId, tick: u64 },
    /// Fired when a timer-driven task finishes and leaves the registry.
    TaskCompleted { id: TaskId, tick: u64 },
    /// Fired when an async completion resolves a waiting task.
    TaskResolved { id: TaskId, key: CorrelationKey },
    /// Fired when an async completion matched no waiting task.
    CompletionUnmatched { key: CorrelationKey },
    /// Fired on teardown with the number of tasks that were still live.
    TasksReleased { count: usize },
}

/// Events related to the lifecycle of the engine itself.
#[derive(Debug, Clone)]
pub enum SystemEvent {
    /// Fired once when the engine's run loop begins.
    EngineStarted { timestamp: Instant },
    /// Fired once when the engine's run loop has exited and torn down.
    EngineShutdown { released: usize },
}

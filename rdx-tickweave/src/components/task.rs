//! Defines the schedulable unit of work and its per-tick state machine.

use crate::common::{AsyncCategory, AsyncId, CorrelationKey, TaskId};
use crate::error::ScheduleError;
use crate::payload::AsyncPayload;
use std::fmt;
use tracing::{debug, warn};

/// What a callback asks the scheduler to do next.
///
/// Under no-repeat mode all three variants differ: `Done` finishes the task,
/// `RetryImmediately` fires it again on the very next tick and `ResetTimer`
/// waits another full `after` window. Under repeat mode only `Done` is
/// special: it keeps the current cadence, while either of the others restarts
/// the whole after-then-every cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Done,
    RetryImmediately,
    ResetTimer,
}

/// How a callback is being invoked.
///
/// The tick driver hands over the params alone; the async dispatcher hands
/// over the host's payload first and the params second.
pub enum Trigger<'a, P> {
    Tick(&'a mut P),
    Completed {
        payload: &'a AsyncPayload,
        params: &'a mut P,
    },
}

impl<'a, P> Trigger<'a, P> {
    pub fn params(&mut self) -> &mut P {
        match self {
            Trigger::Tick(params) => &mut **params,
            Trigger::Completed { params, .. } => &mut **params,
        }
    }

    pub fn payload(&self) -> Option<&AsyncPayload> {
        match self {
            Trigger::Tick(_) => None,
            Trigger::Completed { payload, .. } => Some(*payload),
        }
    }
}

/// The boxed callback every task carries.
pub type Callback<P> = Box<dyn FnMut(Trigger<'_, P>) -> Outcome + Send>;

/// Result of evaluating one task for one tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Step {
    /// Still waiting (or suspended); the callback did not run.
    Idle,
    /// The callback ran and the task stays registered.
    Fired,
    /// The callback ran and returned `Done` in no-repeat mode.
    Completed,
}

/// A single schedulable unit of work.
pub struct Task<P> {
    callback: Callback<P>,
    params: P,
    pub(crate) delay_after: u64,
    pub(crate) remaining_after: u64,
    pub(crate) delay_every: u64,
    pub(crate) remaining_every: u64,
    pub(crate) suspended: bool,
    pub(crate) pending_async: Option<CorrelationKey>,
}

impl<P> fmt::Debug for Task<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Task")
            .field("delay_after", &self.delay_after)
            .field("remaining_after", &self.remaining_after)
            .field("delay_every", &self.delay_every)
            .field("remaining_every", &self.remaining_every)
            .field("suspended", &self.suspended)
            .field("pending_async", &self.pending_async)
            .finish_non_exhaustive()
    }
}

impl<P> Task<P> {
    /// A task that fires once on the next tick unless configured otherwise.
    pub(crate) fn new(callback: Callback<P>, params: P) -> Self {
        Self {
            callback,
            params,
            delay_after: 1,
            remaining_after: 1,
            delay_every: 0,
            remaining_every: 0,
            suspended: false,
            pending_async: None,
        }
    }

    pub(crate) fn is_awaiting(&self, key: &CorrelationKey) -> bool {
        self.pending_async.as_ref() == Some(key)
    }

    /// Applies one tick of the state machine.
    pub(crate) fn advance(&mut self) -> Step {
        if self.suspended {
            return Step::Idle;
        }
        if self.remaining_after > 1 {
            self.remaining_after -= 1;
            return Step::Idle;
        }

        if self.delay_every == 0 {
            return match (self.callback)(Trigger::Tick(&mut self.params)) {
                Outcome::Done => Step::Completed,
                Outcome::RetryImmediately => Step::Fired,
                Outcome::ResetTimer => {
                    self.remaining_after = self.delay_after;
                    Step::Fired
                }
            };
        }

        if self.remaining_every > 1 {
            self.remaining_every -= 1;
            return Step::Idle;
        }
        let outcome = (self.callback)(Trigger::Tick(&mut self.params));
        self.remaining_every = self.delay_every;
        if outcome != Outcome::Done {
            self.rearm_cycle();
        }
        Step::Fired
    }

    /// Hands the task to its callback as the resolution of an async wait.
    /// The task is consumed; its callback and params are dropped afterwards.
    pub(crate) fn resolve(mut self, payload: &AsyncPayload) {
        let _ = (self.callback)(Trigger::Completed {
            payload,
            params: &mut self.params,
        });
    }

    /// Restarts the after gate; the first repeat of a cycle lands on the gate.
    fn rearm_cycle(&mut self) {
        self.remaining_after = self.delay_after;
        self.remaining_every = 1;
    }

    fn resume_timer_mode(&mut self) {
        self.suspended = false;
        self.pending_async = None;
    }
}

fn positive_delay(operation: &'static str, delay: i64) -> Result<u64, ScheduleError> {
    u64::try_from(delay)
        .ok()
        .filter(|ticks| *ticks > 0)
        .ok_or(ScheduleError::InvalidArgument { operation, delay })
}

/// A chainable handle for configuring a task that lives in the registry.
///
/// ```rust
/// use tickweave::prelude::*;
///
/// let mut scheduler: Scheduler<u32> = Scheduler::new();
/// let id = scheduler
///     .schedule(|_trigger| Outcome::Done, 0)
///     .after(10)?
///     .every(5)?
///     .id();
/// assert!(scheduler.contains(id));
/// # Ok::<(), tickweave::error::ScheduleError>(())
/// ```
pub struct TaskMut<'a, P> {
    id: TaskId,
    task: &'a mut Task<P>,
}

impl<'a, P> TaskMut<'a, P> {
    pub(crate) fn new(id: TaskId, task: &'a mut Task<P>) -> Self {
        Self { id, task }
    }

    pub fn id(&self) -> TaskId {
        self.id
    }

    /// Waits `delay` ticks before the first (or next) firing.
    ///
    /// Calling it again restarts the countdown from the new value. A
    /// non-positive delay is rejected and leaves the task's timing unchanged.
    pub fn after(&mut self, delay: i64) -> Result<&mut Self, ScheduleError> {
        let ticks = self.checked("after", delay)?;
        self.task.delay_after = ticks;
        self.task.rearm_cycle();
        self.task.resume_timer_mode();
        Ok(self)
    }

    /// Repeats the callback every `delay` ticks once the after gate opens.
    ///
    /// Does not touch the after delay: with the default of 1 the task fires on
    /// the next tick and then every `delay` ticks.
    pub fn every(&mut self, delay: i64) -> Result<&mut Self, ScheduleError> {
        let ticks = self.checked("every", delay)?;
        self.task.delay_every = ticks;
        self.task.rearm_cycle();
        self.task.resume_timer_mode();
        Ok(self)
    }

    /// Suspends the task until the host reports completion of the operation
    /// `(category, id)`. A later call replaces the earlier key.
    pub fn await_on(&mut self, category: AsyncCategory, id: impl Into<AsyncId>) -> &mut Self {
        let key = CorrelationKey::new(category, id);
        if let Some(previous) = self.task.pending_async.replace(key) {
            if previous != key {
                warn!(task = ?self.id, %previous, %key, "Replacing pending async key.");
            }
        }
        self.task.suspended = true;
        debug!(task = ?self.id, %key, "Task suspended until completion.");
        self
    }

    pub fn summary(&self) -> TaskSummary {
        TaskSummary::of(self.id, self.task)
    }

    fn checked(&self, operation: &'static str, delay: i64) -> Result<u64, ScheduleError> {
        positive_delay(operation, delay).inspect_err(|err| {
            warn!(task = ?self.id, "{err}; timing left unchanged.");
        })
    }
}

/// A read-only view of a task's timing state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaskSummary {
    pub id: TaskId,
    pub delay_after: u64,
    pub remaining_after: u64,
    pub delay_every: u64,
    pub remaining_every: u64,
    pub suspended: bool,
    pub pending_async: Option<CorrelationKey>,
}

impl TaskSummary {
    pub(crate) fn of<P>(id: TaskId, task: &Task<P>) -> Self {
        Self {
            id,
            delay_after: task.delay_after,
            remaining_after: task.remaining_after,
            delay_every: task.delay_every,
            remaining_every: task.remaining_every,
            suspended: task.suspended,
            pending_async: task.pending_async,
        }
    }
}

//! The scheduler: an owned task registry plus the tick driver and the async
//! dispatcher that operate on it.

use crate::common::{AsyncCategory, AsyncId, CorrelationKey, TaskId};
use crate::components::registry::{TaskRegistry, Visit};
use crate::components::task::{Outcome, Step, Task, TaskMut, TaskSummary, Trigger};
use crate::config::SchedulerConfig;
use crate::error::{RejectedDelay, ScheduleError};
use crate::events::TaskEvent;
use crate::payload::AsyncPayload;
use tokio::sync::broadcast;
use tracing::{debug, trace};

const DEFAULT_EVENT_CAPACITY: usize = 256;

/// What one call to `Scheduler::tick` did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickSummary {
    /// The number of this tick, starting at 1.
    pub tick: u64,
    /// Callbacks invoked during the tick, including the ones that completed.
    pub fired: usize,
    /// Tasks that finished and were removed.
    pub completed: usize,
}

/// A cooperative, frame-driven task scheduler.
///
/// A `Scheduler` is an ordinary owned value: the host creates one, calls
/// [`tick`](Self::tick) once per frame and [`on_async_event`](Self::on_async_event)
/// once per reported completion, and calls [`teardown`](Self::teardown) when
/// it is done. Both entry points take `&mut self`, so they can never overlap.
///
/// `P` is the params type handed to every callback; the scheduler only ever
/// moves it around.
pub struct Scheduler<P> {
    registry: TaskRegistry<Task<P>>,
    tick_count: u64,
    task_event_sender: broadcast::Sender<TaskEvent>,
}

impl<P: 'static> Default for Scheduler<P> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P: 'static> Scheduler<P> {
    pub fn new() -> Self {
        Self::with_event_capacity(DEFAULT_EVENT_CAPACITY)
    }

    pub fn from_config(config: &SchedulerConfig) -> Self {
        Self::with_event_capacity(config.event_capacity)
    }

    fn with_event_capacity(capacity: usize) -> Self {
        let (task_event_sender, _) = broadcast::channel(capacity.max(1));
        Self {
            registry: TaskRegistry::new(),
            tick_count: 0,
            task_event_sender,
        }
    }

    /// Creates a task and appends it to the registry.
    ///
    /// Unconfigured, the task fires once on the next tick. Chain `after`,
    /// `every` or `await_on` on the returned handle to change that.
    pub fn schedule<F>(&mut self, callback: F, params: P) -> TaskMut<'_, P>
    where
        F: FnMut(Trigger<'_, P>) -> Outcome + Send + 'static,
    {
        let (id, task) = self.registry.add_mut(Task::new(Box::new(callback), params));
        debug!(task = ?id, "Task scheduled.");
        self.task_event_sender
            .send(TaskEvent::TaskScheduled { id })
            .ok();
        TaskMut::new(id, task)
    }

    /// Re-opens a live task for configuration.
    pub fn task_mut(&mut self, id: TaskId) -> Option<TaskMut<'_, P>> {
        self.registry.get_mut(id).map(|task| TaskMut::new(id, task))
    }

    // --- One-call forms ---

    /// Schedules `callback` to fire after `delay` ticks.
    ///
    /// A non-positive delay still registers the task, with default timing, and
    /// reports its id alongside the error.
    pub fn after<F>(&mut self, delay: i64, callback: F, params: P) -> Result<TaskId, RejectedDelay>
    where
        F: FnMut(Trigger<'_, P>) -> Outcome + Send + 'static,
    {
        self.checked_one_call(callback, params, |task| task.after(delay).map(|_| ()))
    }

    /// Schedules `callback` to fire on the next tick and every `delay` ticks after.
    pub fn every<F>(&mut self, delay: i64, callback: F, params: P) -> Result<TaskId, RejectedDelay>
    where
        F: FnMut(Trigger<'_, P>) -> Outcome + Send + 'static,
    {
        self.checked_one_call(callback, params, |task| task.every(delay).map(|_| ()))
    }

    /// Schedules `callback` to run once the operation `(category, id)` completes.
    pub fn await_on<F>(
        &mut self,
        category: AsyncCategory,
        id: impl Into<AsyncId>,
        callback: F,
        params: P,
    ) -> TaskId
    where
        F: FnMut(Trigger<'_, P>) -> Outcome + Send + 'static,
    {
        self.schedule(callback, params).await_on(category, id).id()
    }

    pub fn on_network<F>(&mut self, id: impl Into<AsyncId>, callback: F, params: P) -> TaskId
    where
        F: FnMut(Trigger<'_, P>) -> Outcome + Send + 'static,
    {
        self.await_on(AsyncCategory::Network, id, callback, params)
    }

    pub fn on_platform_service<F>(&mut self, id: impl Into<AsyncId>, callback: F, params: P) -> TaskId
    where
        F: FnMut(Trigger<'_, P>) -> Outcome + Send + 'static,
    {
        self.await_on(AsyncCategory::PlatformService, id, callback, params)
    }

    pub fn on_buffer_io<F>(&mut self, id: impl Into<AsyncId>, callback: F, params: P) -> TaskId
    where
        F: FnMut(Trigger<'_, P>) -> Outcome + Send + 'static,
    {
        self.await_on(AsyncCategory::BufferIo, id, callback, params)
    }

    pub fn on_dialog<F>(&mut self, id: impl Into<AsyncId>, callback: F, params: P) -> TaskId
    where
        F: FnMut(Trigger<'_, P>) -> Outcome + Send + 'static,
    {
        self.await_on(AsyncCategory::Dialog, id, callback, params)
    }

    pub fn on_asset_load<F>(&mut self, id: impl Into<AsyncId>, callback: F, params: P) -> TaskId
    where
        F: FnMut(Trigger<'_, P>) -> Outcome + Send + 'static,
    {
        self.await_on(AsyncCategory::AssetLoad, id, callback, params)
    }

    /// Schedules and configures in one go. A rejected configuration leaves the
    /// task registered with its default timing.
    fn checked_one_call<F>(
        &mut self,
        callback: F,
        params: P,
        configure: impl FnOnce(&mut TaskMut<'_, P>) -> Result<(), ScheduleError>,
    ) -> Result<TaskId, RejectedDelay>
    where
        F: FnMut(Trigger<'_, P>) -> Outcome + Send + 'static,
    {
        let mut task = self.schedule(callback, params);
        let id = task.id();
        configure(&mut task).map(|()| id).map_err(|source| RejectedDelay { id, source })
    }

    // --- Host entry points ---

    /// Runs one frame: evaluates every task in registry order and removes the
    /// ones that completed.
    pub fn tick(&mut self) -> TickSummary {
        self.tick_count += 1;
        let tick = self.tick_count;
        let mut summary = TickSummary {
            tick,
            ..Default::default()
        };
        let sender = &self.task_event_sender;

        self.registry.for_each_removable(|id, task| match task.advance() {
            Step::Idle => Visit::Keep,
            Step::Fired => {
                summary.fired += 1;
                sender.send(TaskEvent::TaskFired { id, tick }).ok();
                Visit::Keep
            }
            Step::Completed => {
                summary.fired += 1;
                summary.completed += 1;
                sender.send(TaskEvent::TaskFired { id, tick }).ok();
                sender.send(TaskEvent::TaskCompleted { id, tick }).ok();
                Visit::Remove
            }
        });

        trace!(
            tick,
            fired = summary.fired,
            completed = summary.completed,
            live = self.registry.len(),
            "Tick processed."
        );
        summary
    }

    /// Resolves the first task, in registry order, awaiting `(category, id)`.
    ///
    /// The task's callback receives `payload` and its params, after which the
    /// task is gone. Other tasks awaiting the same key are left pending. An
    /// unmatched completion is ignored.
    pub fn dispatch(
        &mut self,
        category: AsyncCategory,
        id: AsyncId,
        payload: &AsyncPayload,
    ) -> Option<TaskId> {
        let key = CorrelationKey { category, id };
        let Some((task_id, task)) = self.registry.remove_first_matching(|task| task.is_awaiting(&key))
        else {
            debug!(%key, "Completion matched no waiting task.");
            self.task_event_sender
                .send(TaskEvent::CompletionUnmatched { key })
                .ok();
            return None;
        };

        debug!(task = ?task_id, %key, "Resolving task.");
        task.resolve(payload);
        self.task_event_sender
            .send(TaskEvent::TaskResolved { id: task_id, key })
            .ok();
        Some(task_id)
    }

    /// Host-facing form of [`dispatch`](Self::dispatch): pulls the operation id
    /// out of the payload's `"id"` field.
    pub fn on_async_event(
        &mut self,
        category: AsyncCategory,
        payload: &AsyncPayload,
    ) -> Option<TaskId> {
        match payload.id() {
            Some(id) => self.dispatch(category, id, payload),
            None => {
                debug!(%category, "Completion payload carries no usable id; ignoring.");
                None
            }
        }
    }

    /// Releases every live task, dropping callbacks and params, and returns
    /// how many there were. Tasks still awaiting a completion go with them.
    pub fn teardown(&mut self) -> usize {
        let count = self.registry.drain().len();
        debug!(count, "Scheduler torn down.");
        self.task_event_sender
            .send(TaskEvent::TasksReleased { count })
            .ok();
        count
    }

    // --- Inspection ---

    pub fn len(&self) -> usize {
        self.registry.len()
    }

    pub fn is_empty(&self) -> bool {
        self.registry.is_empty()
    }

    pub fn contains(&self, id: TaskId) -> bool {
        self.registry.contains(id)
    }

    /// The number of ticks driven so far.
    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    /// Timing state of every live task, in registry order.
    pub fn snapshot(&self) -> Vec<TaskSummary> {
        self.registry
            .iter()
            .map(|(id, task)| TaskSummary::of(id, task))
            .collect()
    }

    /// Subscribes to the `TaskEvent` stream.
    pub fn subscribe_task_events(&self) -> broadcast::Receiver<TaskEvent> {
        self.task_event_sender.subscribe()
    }

    pub(crate) fn task_event_sender(&self) -> broadcast::Sender<TaskEvent> {
        self.task_event_sender.clone()
    }
}

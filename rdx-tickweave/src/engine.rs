//! The host integration layer that drives a `Scheduler` in real time.

use crate::common::AsyncCategory;
use crate::config::SchedulerConfig;
use crate::events::{SystemEvent, TaskEvent};
use crate::payload::{AsyncCompletion, AsyncPayload};
use crate::scheduler::Scheduler;
use crate::time::{FrameClock, TickEvent};
use anyhow::Context;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc, Mutex, MutexGuard};
use tracing::{debug, info, trace};

/// The main Tickweave engine.
///
/// This struct owns a `Scheduler`, a `FrameClock` and the queue of pending
/// async completions. Its run loop is the only place ticks and completions
/// are delivered, one at a time, so the tick driver and the async dispatcher
/// never overlap. The engine is cheap to clone; every clone is a handle to
/// the same instance.
pub struct TickweaveEngine<P> {
    config: Arc<SchedulerConfig>,
    scheduler: Arc<Mutex<Scheduler<P>>>,

    // --- Senders for each public event category ---
    tick_sender: broadcast::Sender<TickEvent>,
    system_event_sender: broadcast::Sender<SystemEvent>,
    task_event_sender: broadcast::Sender<TaskEvent>,

    completion_sender: mpsc::UnboundedSender<AsyncCompletion>,
    completion_receiver: Arc<Mutex<Option<mpsc::UnboundedReceiver<AsyncCompletion>>>>,
}

impl<P> Clone for TickweaveEngine<P> {
    fn clone(&self) -> Self {
        Self {
            config: self.config.clone(),
            scheduler: self.scheduler.clone(),
            tick_sender: self.tick_sender.clone(),
            system_event_sender: self.system_event_sender.clone(),
            task_event_sender: self.task_event_sender.clone(),
            completion_sender: self.completion_sender.clone(),
            completion_receiver: self.completion_receiver.clone(),
        }
    }
}

impl<P: Send + 'static> TickweaveEngine<P> {
    /// Creates a new `TickweaveEngine` with the given configuration.
    pub fn new(config: SchedulerConfig) -> Self {
        let scheduler = Scheduler::from_config(&config);
        let task_event_sender = scheduler.task_event_sender();
        let (tick_sender, _) = broadcast::channel(config.event_capacity.max(1));
        let (system_event_sender, _) = broadcast::channel(64);
        let (completion_sender, completion_receiver) = mpsc::unbounded_channel();

        Self {
            config: Arc::new(config),
            scheduler: Arc::new(Mutex::new(scheduler)),
            tick_sender,
            system_event_sender,
            task_event_sender,
            completion_sender,
            completion_receiver: Arc::new(Mutex::new(Some(completion_receiver))),
        }
    }

    /// Runs the engine until Ctrl+C is received.
    pub async fn run(&self) -> anyhow::Result<()> {
        let ctrl_c = async {
            if let Err(err) = tokio::signal::ctrl_c().await {
                tracing::error!("Failed to listen for Ctrl+C: {err}");
            }
        };
        self.run_until(ctrl_c).await
    }

    /// Runs the engine until `shutdown` resolves, then tears the scheduler
    /// down.
    ///
    /// Each loop iteration either delivers one tick or dispatches one queued
    /// completion, never both at once. Only one run loop may be active per
    /// engine.
    pub async fn run_until(&self, shutdown: impl Future<Output = ()>) -> anyhow::Result<()> {
        let mut completions = self
            .completion_receiver
            .lock()
            .await
            .take()
            .context("TickweaveEngine is already running")?;

        let mut clock = FrameClock::new(self.config.frame_rate);
        info!(
            "TickweaveEngine starting at {:?} ({:?} per frame).",
            self.config.frame_rate,
            clock.period()
        );
        self.system_event_sender
            .send(SystemEvent::EngineStarted {
                timestamp: tokio::time::Instant::now(),
            })
            .ok();

        tokio::pin!(shutdown);
        loop {
            // A due tick is taken before queued completions; each pass handles
            // at most one completion.
            tokio::select! {
                biased;
                _ = &mut shutdown => break,
                tick = clock.next_tick() => {
                    let summary = self.scheduler.lock().await.tick();
                    trace!("Tick #{} processed: {:?}", tick.tick_count, summary);
                    self.tick_sender.send(tick).ok();
                }
                Some(completion) = completions.recv() => {
                    let resolved = self
                        .scheduler
                        .lock()
                        .await
                        .on_async_event(completion.category, &completion.payload);
                    trace!(category = %completion.category, ?resolved, "Completion dispatched.");
                }
            }
        }

        info!("Shutdown signal received. Tearing down the scheduler...");
        let released = self.scheduler.lock().await.teardown();
        *self.completion_receiver.lock().await = Some(completions);
        self.system_event_sender
            .send(SystemEvent::EngineShutdown { released })
            .ok();
        info!("TickweaveEngine has shut down ({released} task(s) released).");
        Ok(())
    }

    /// Locks the scheduler for scheduling or inspection.
    ///
    /// Holding the guard stalls the run loop, so keep it short.
    pub async fn lock(&self) -> MutexGuard<'_, Scheduler<P>> {
        self.scheduler.lock().await
    }

    /// Queues an async completion for the run loop to dispatch.
    pub fn report_completion(&self, category: AsyncCategory, payload: AsyncPayload) {
        debug!(%category, id = ?payload.id(), "Completion reported.");
        // The receiver lives as long as the engine, so this cannot fail while
        // `self` exists.
        self.completion_sender
            .send(AsyncCompletion { category, payload })
            .ok();
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    /// Subscribes to the `SystemEvent` stream.
    pub fn subscribe_system_events(&self) -> broadcast::Receiver<SystemEvent> {
        self.system_event_sender.subscribe()
    }

    /// Subscribes to the `TickEvent` stream.
    pub fn subscribe_tick_events(&self) -> broadcast::Receiver<TickEvent> {
        self.tick_sender.subscribe()
    }

    /// Subscribes to the `TaskEvent` stream.
    pub fn subscribe_task_events(&self) -> broadcast::Receiver<TaskEvent> {
        self.task_event_sender.subscribe()
    }
}

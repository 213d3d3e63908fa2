//! # Tickweave
//!
//! A cooperative, frame-driven task scheduler for real-time host loops.
//!
//! Tickweave lets code defer a callback by N host ticks, repeat it every N
//! ticks, combine both, or park it until an asynchronous host operation
//! (network, platform service, buffered I/O, a dialog, an asset load) reports
//! completion.
//!
//! ## Core Concepts
//!
//! - **Scheduler**: an owned registry of tasks. The host calls `tick()` once per
//!   frame and `on_async_event()` once per reported completion.
//! - **Task**: a callback plus opaque params and two countdowns. `after` gates
//!   the first firing, `every` sets the repeat cadence, `await_on` suspends the
//!   task until a matching completion arrives.
//! - **Outcome**: what a callback returns to steer its own lifecycle (`Done`,
//!   `RetryImmediately`, `ResetTimer`).
//! - **Engine**: an optional tokio host that ticks the scheduler at a configured
//!   frame rate and feeds it queued completions.
//!
//! ## Example Usage
//!
//! ```rust
//! use tickweave::prelude::*;
//!
//! let mut scheduler: Scheduler<&'static str> = Scheduler::new();
//!
//! // Fire once, three ticks from now.
//! scheduler.after(3, |_| Outcome::Done, "spawn wave")?;
//!
//! // Wait for an HTTP request the host started with id 17.
//! scheduler.on_network(17, |trigger| {
//!     if let Trigger::Completed { payload, params } = trigger {
//!         println!("{params}: {:?}", payload.get("status"));
//!     }
//!     Outcome::Done
//! }, "fetch leaderboard");
//!
//! for _ in 0..3 {
//!     scheduler.tick();
//! }
//! scheduler.on_async_event(AsyncCategory::Network, &AsyncPayload::with_id(17).field("status", 200));
//! assert!(scheduler.is_empty());
//! # Ok::<(), tickweave::error::ScheduleError>(())
//! ```

pub const ENGINE_NAME: &str = "Tickweave";
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// Declare all the modules in the crate.
pub mod common;
pub mod components;
pub mod config;
pub mod engine;
pub mod error;
pub mod events;
pub mod payload;
pub mod scheduler;
pub mod telemetry;
pub mod time;

/// A prelude module for easy importing of the most common Tickweave types.
pub mod prelude {
    pub use crate::common::{AsyncCategory, AsyncId, CorrelationKey, TaskId};
    pub use crate::components::task::{Outcome, TaskMut, TaskSummary, Trigger};
    pub use crate::config::{FrameRate, SchedulerConfig};
    pub use crate::engine::TickweaveEngine;
    pub use crate::error::{RejectedDelay, ScheduleError};
    pub use crate::events::{SystemEvent, TaskEvent};
    pub use crate::payload::{AsyncCompletion, AsyncPayload};
    pub use crate::scheduler::{Scheduler, TickSummary};
    pub use crate::time::TickEvent;
}

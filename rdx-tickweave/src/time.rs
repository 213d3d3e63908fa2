//! The frame clock that stands in for the host's per-frame notification.

use crate::config::FrameRate;
use std::pin::Pin;
use std::time::Duration;
use tokio::time::{sleep, Instant, Sleep};

/// A single host frame, as delivered to the tick driver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TickEvent {
    /// The 1-based number of this tick since the clock started.
    pub tick_count: u64,
    pub timestamp: Instant,
}

/// Produces one `TickEvent` per frame.
///
/// The clock does not run on a fixed period: each tick re-arms the timer one
/// frame after the tick was taken, so a slow frame pushes the next one back
/// instead of triggering a burst of catch-up ticks.
pub struct FrameClock {
    period: Duration,
    tick_count: u64,
    timer: Pin<Box<Sleep>>,
}

impl FrameClock {
    pub fn new(frame_rate: FrameRate) -> Self {
        let period = frame_rate.frame_duration();
        Self {
            period,
            tick_count: 0,
            timer: Box::pin(sleep(period)),
        }
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    /// Waits for the next frame.
    ///
    /// Cancel-safe: if the future is dropped before the frame elapses, the
    /// pending timer is kept and the next call resumes waiting on it.
    pub async fn next_tick(&mut self) -> TickEvent {
        self.timer.as_mut().await;
        let now = Instant::now();
        self.tick_count += 1;
        self.timer.as_mut().reset(now + self.period);
        TickEvent {
            tick_count: self.tick_count,
            timestamp: now,
        }
    }
}

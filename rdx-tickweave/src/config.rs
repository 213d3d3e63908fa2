//! Defines the configuration structures for the scheduler and its host engine.
//!
//! These structs are designed to be deserialized from a configuration file
//! (e.g., a TOML file) using `serde`, layered with `TICKWEAVE_*` environment
//! variables through the `config` crate.

use crate::error::ScheduleError;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

/// The top-level configuration for a `Scheduler` and the `TickweaveEngine`
/// that drives it.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SchedulerConfig {
    /// How often the engine delivers a tick to the scheduler.
    #[serde(default = "default_frame_rate")]
    pub frame_rate: FrameRate,

    /// Capacity of each broadcast event channel.
    #[serde(default = "default_event_capacity")]
    pub event_capacity: usize,
}

/// Defines how many host frames (ticks) the engine produces per second.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FrameRate {
    /// 60 ticks per second. A typical render loop.
    High,
    /// 30 ticks per second.
    Medium,
    /// 1 tick per second. Handy for watching the scheduler by eye.
    Low,
    /// A user-defined speed in ticks per second.
    Custom { ticks_per_second: u64 },
}

impl FrameRate {
    pub fn ticks_per_second(self) -> u64 {
        match self {
            FrameRate::High => 60,
            FrameRate::Medium => 30,
            FrameRate::Low => 1,
            FrameRate::Custom { ticks_per_second } => ticks_per_second,
        }
    }

    /// The length of one frame. A zero rate is clamped to one tick per second;
    /// `SchedulerConfig::validate` rejects it before it gets here.
    pub fn frame_duration(self) -> Duration {
        Duration::from_secs_f64(1.0 / self.ticks_per_second().max(1) as f64)
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            frame_rate: default_frame_rate(),
            event_capacity: default_event_capacity(),
        }
    }
}

impl SchedulerConfig {
    /// Loads the configuration from an optional TOML file, then applies any
    /// `TICKWEAVE_*` environment overrides (e.g. `TICKWEAVE_FRAME_RATE=low`).
    ///
    /// A missing file is not an error; the defaults are used instead.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let mut builder = config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path).required(false));
        }
        let loaded: SchedulerConfig = builder
            .add_source(
                config::Environment::with_prefix("TICKWEAVE")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;
        loaded.validate()?;
        Ok(loaded)
    }

    /// Rejects values that cannot drive a scheduler.
    pub fn validate(&self) -> Result<(), ScheduleError> {
        if self.frame_rate.ticks_per_second() == 0 {
            return Err(ScheduleError::InvalidConfig(
                "frame_rate must produce at least one tick per second".to_string(),
            ));
        }
        if self.event_capacity == 0 {
            return Err(ScheduleError::InvalidConfig(
                "event_capacity must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

// --- Default value functions for serde ---

fn default_frame_rate() -> FrameRate {
    FrameRate::High
}

fn default_event_capacity() -> usize {
    256
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::sync::Mutex;

    // `load` reads the process environment, which the override test mutates.
    static ENV_LOCK: Mutex<()> = Mutex::new(());

    #[test]
    fn frame_durations() {
        assert_eq!(FrameRate::Low.frame_duration(), Duration::from_secs(1));
        assert_eq!(
            FrameRate::Custom { ticks_per_second: 1000 }.frame_duration(),
            Duration::from_millis(1)
        );
    }

    #[test]
    fn load_without_file_uses_defaults() {
        let _env = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        let config = SchedulerConfig::load(None).unwrap();
        assert_eq!(config, SchedulerConfig::default());
    }

    #[test]
    fn load_reads_toml_file() {
        let path = std::env::temp_dir().join(format!("tickweave-config-{}.toml", std::process::id()));
        fs::write(
            &path,
            "event_capacity = 32\n\n[frame_rate.custom]\nticks_per_second = 120\n",
        )
        .unwrap();

        let _env = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        let config = SchedulerConfig::load(Some(&path)).unwrap();
        fs::remove_file(&path).ok();

        assert_eq!(config.event_capacity, 32);
        assert_eq!(config.frame_rate, FrameRate::Custom { ticks_per_second: 120 });
    }

    #[test]
    fn environment_overrides_file_and_defaults() {
        let path = std::env::temp_dir().join(format!("tickweave-env-{}.toml", std::process::id()));
        fs::write(&path, "frame_rate = \"medium\"\nevent_capacity = 32\n").unwrap();

        let _env = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        std::env::set_var("TICKWEAVE_FRAME_RATE", "low");
        std::env::set_var("TICKWEAVE_EVENT_CAPACITY", "64");
        let loaded = SchedulerConfig::load(Some(&path));
        std::env::remove_var("TICKWEAVE_FRAME_RATE");
        std::env::remove_var("TICKWEAVE_EVENT_CAPACITY");
        fs::remove_file(&path).ok();

        let config = loaded.unwrap();
        assert_eq!(config.frame_rate, FrameRate::Low);
        assert_eq!(config.event_capacity, 64);
    }

    #[test]
    fn zero_rate_and_capacity_are_rejected() {
        let config = SchedulerConfig {
            frame_rate: FrameRate::Custom { ticks_per_second: 0 },
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(ScheduleError::InvalidConfig(_))));

        let config = SchedulerConfig {
            event_capacity: 0,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(ScheduleError::InvalidConfig(_))));
    }
}

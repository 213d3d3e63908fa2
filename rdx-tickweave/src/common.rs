//! Contains common, primitive types shared across the scheduler.
//!
//! This module defines the identifier types used to refer to scheduled tasks and
//! to the asynchronous host operations they may be waiting on. Using distinct
//! types keeps task handles, operation ids and categories from being mixed up.

use crate::error::ScheduleError;
use serde::{Deserialize, Serialize};
use slotmap::new_key_type;
use std::fmt;
use std::str::FromStr;

new_key_type! {
    /// Uniquely and safely identifies a task held by a `Scheduler`.
    ///
    /// A key is handed out when the task is scheduled and is never reused after
    /// the task leaves the registry, so a stale id simply stops resolving.
    pub struct TaskId;
}

/// A class of long-running host operation whose completion is reported
/// out-of-band from the tick loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AsyncCategory {
    /// An HTTP or socket request.
    Network,
    /// A call into a platform service (store, achievements, social).
    PlatformService,
    /// A buffered load or save.
    BufferIo,
    /// A modal prompt waiting on the user.
    Dialog,
    /// An asset being streamed in.
    AssetLoad,
}

impl AsyncCategory {
    /// All categories, in declaration order.
    pub const ALL: [AsyncCategory; 5] = [
        AsyncCategory::Network,
        AsyncCategory::PlatformService,
        AsyncCategory::BufferIo,
        AsyncCategory::Dialog,
        AsyncCategory::AssetLoad,
    ];

    /// The canonical lowercase name, matching the serde representation.
    pub fn as_str(self) -> &'static str {
        match self {
            AsyncCategory::Network => "network",
            AsyncCategory::PlatformService => "platform_service",
            AsyncCategory::BufferIo => "buffer_io",
            AsyncCategory::Dialog => "dialog",
            AsyncCategory::AssetLoad => "asset_load",
        }
    }
}

impl fmt::Display for AsyncCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AsyncCategory {
    type Err = ScheduleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace('-', "_");
        AsyncCategory::ALL
            .into_iter()
            .find(|category| category.as_str() == normalized)
            .ok_or_else(|| ScheduleError::UnknownCategory(s.to_string()))
    }
}

/// The opaque identifier the host assigns to an outstanding operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AsyncId(pub i64);

impl From<i64> for AsyncId {
    fn from(value: i64) -> Self {
        AsyncId(value)
    }
}

impl fmt::Display for AsyncId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The (category, identifier) pair used to match a completion event to the
/// task awaiting it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CorrelationKey {
    pub category: AsyncCategory,
    pub id: AsyncId,
}

impl CorrelationKey {
    pub fn new(category: AsyncCategory, id: impl Into<AsyncId>) -> Self {
        Self {
            category,
            id: id.into(),
        }
    }
}

impl fmt::Display for CorrelationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.category, self.id)
    }
}

//! Shared identifiers and task-kind enums.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Prefix of identifiers minted while offline.
pub const TEMPORARY_ID_PREFIX: &str = "pending-";
/// Prefix of provisional identifiers minted while online.
pub const ONLINE_ID_PREFIX: &str = "rec-";

/// Monotonic mutation-queue entry identifier.
pub type EntryId = u64;
/// User identifier.
pub type UserId = String;
/// Milliseconds since the Unix epoch.
pub type TimestampMs = u64;

/// Record identifier, either temporary (minted offline) or canonical.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(String);

impl RecordId {
    /// Wraps a raw identifier.
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// Borrows the raw identifier.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// True for identifiers minted locally while offline.
    pub fn is_temporary(&self) -> bool {
        self.0.starts_with(TEMPORARY_ID_PREFIX)
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RecordId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for RecordId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Kind of user activity a record captures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskKind {
    /// A logged run.
    Running,
    /// An early wake-up confirmation.
    WakeUp,
    /// A daily to-do plan.
    DailyPlan,
    /// A book reading session.
    BookReading,
}

impl TaskKind {
    /// Kinds limited to one record per owner per calendar day.
    pub fn is_singleton_per_day(self) -> bool {
        matches!(self, Self::WakeUp | Self::DailyPlan)
    }

    /// Kinds that can satisfy a mandatory item on a daily plan.
    pub fn completes_plan_items(self) -> bool {
        !matches!(self, Self::DailyPlan)
    }

    /// Human-readable label.
    pub fn label(self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::WakeUp => "wake-up",
            Self::DailyPlan => "daily plan",
            Self::BookReading => "book reading",
        }
    }
}

impl fmt::Display for TaskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

//! Tunables for the sync core.

use std::path::Path;
use std::time::Duration;

use chrono::FixedOffset;
use serde::{Deserialize, Serialize};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("reading config: {0}")]
    Io(#[from] std::io::Error),
    #[error("parsing config: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Sync core configuration. Missing fields take their defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Failed attempts after which an entry is exhausted.
    pub max_retries: u32,
    /// Fixed delay before each remote attempt.
    pub pacing_ms: u64,
    /// Upper bound on one remote call.
    pub remote_timeout_ms: u64,
    /// Offset from UTC that decides calendar-day boundaries.
    pub utc_offset_minutes: i32,
    /// Capacity of the runtime command channel.
    pub command_queue_bound: usize,
    /// Capacity of the event broadcast channel.
    pub event_buffer: usize,
    /// How long a retry notice stays visible.
    pub retry_notice_ms: u64,
    /// How long a permanent-failure or storage notice stays visible.
    pub failure_notice_ms: u64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            pacing_ms: 500,
            remote_timeout_ms: 10_000,
            utc_offset_minutes: 0,
            command_queue_bound: 256,
            event_buffer: 1024,
            retry_notice_ms: 4_000,
            failure_notice_ms: 5_000,
        }
    }
}

impl SyncConfig {
    pub fn from_json_str(raw: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json_str(&raw)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_retries == 0 {
            return Err(ConfigError::Invalid("max_retries must be at least 1".to_string()));
        }
        if self.command_queue_bound == 0 || self.event_buffer == 0 {
            return Err(ConfigError::Invalid("channel capacities must be non-zero".to_string()));
        }
        if self.day_offset().is_none() {
            return Err(ConfigError::Invalid(format!(
                "utc_offset_minutes out of range: {}",
                self.utc_offset_minutes
            )));
        }
        Ok(())
    }

    pub fn pacing(&self) -> Duration {
        Duration::from_millis(self.pacing_ms)
    }

    pub fn remote_timeout(&self) -> Duration {
        Duration::from_millis(self.remote_timeout_ms)
    }

    pub fn day_offset(&self) -> Option<FixedOffset> {
        FixedOffset::east_opt(self.utc_offset_minutes.checked_mul(60)?)
    }
}

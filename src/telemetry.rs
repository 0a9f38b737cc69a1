//! Log subscriber setup for binaries and tests embedding the sync core.

use tracing_subscriber::EnvFilter;

/// Default filter when `RUST_LOG` is unset.
pub const DEFAULT_DIRECTIVE: &str = "info,feedsync=info";

#[derive(Debug, thiserror::Error)]
pub enum TelemetryError {
    #[error("installing tracing subscriber: {0}")]
    Init(String),
}

/// Installs a global fmt subscriber. `RUST_LOG` overrides `default_directive`.
///
/// Fails if a global subscriber is already set.
pub fn init_tracing(default_directive: &str) -> Result<(), TelemetryError> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init()
        .map_err(|err| TelemetryError::Init(err.to_string()))
}

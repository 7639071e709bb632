//! Logging setup for binaries built on Playdeck.

use tracing_subscriber::EnvFilter;

use crate::PlaydeckError;

/// Installs a `fmt` subscriber filtered by `RUST_LOG`, or by
/// `default_filter` when `RUST_LOG` is unset or invalid.
///
/// # Errors
/// Returns [`PlaydeckError::Logging`] if a global subscriber is already
/// installed.
pub fn init_logging(default_filter: &str) -> Result<(), PlaydeckError> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .try_init()
        .map_err(|e| PlaydeckError::Logging(e.to_string()))
}

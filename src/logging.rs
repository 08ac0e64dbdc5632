//! Installs the global `tracing` subscriber used by the binary and by tests.

use crate::error::{RelalgError, Result};
use tracing_subscriber::{fmt, EnvFilter};

/// Installs a formatted subscriber filtered by `level` (any `EnvFilter` directive).
pub fn init_logging(level: &str) -> Result<()> {
    fmt()
        .with_env_filter(
            EnvFilter::try_new(level)
                .map_err(|e| RelalgError::InvalidArgument(format!("Invalid log level: {e}")))?,
        )
        .with_target(true)
        .with_thread_ids(true)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|_| RelalgError::InvalidArgument("Logging already initialized".into()))
}

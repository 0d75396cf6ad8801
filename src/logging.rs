//! Structured logging bootstrap.

use crate::error::{CodexError, Result};
use tracing_subscriber::{fmt, EnvFilter};

/// Initializes `tracing` with an `EnvFilter` directive string (e.g. `"info"`
/// or `"codex_core=debug,warn"`). Safe to call once per process; a second
/// call returns `InvalidInput` rather than panicking.
pub fn init_logging(directives: &str) -> Result<()> {
    fmt()
        .with_env_filter(
            EnvFilter::try_new(directives)
                .map_err(|e| CodexError::InvalidInput(format!("invalid log directive: {e}")))?,
        )
        .with_target(true)
        .with_thread_ids(true)
        .try_init()
        .map_err(|_| CodexError::InvalidInput("logging already initialized".into()))
}

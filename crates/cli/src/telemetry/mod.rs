//! Telemetry initialisation for the CLI.
//!
//! One JSON object per event, written to **stderr**. Stdout is reserved for
//! the command result (a blob, a value, or an `inspect` report) so it can be
//! piped or captured without filtering log lines out of it.
//!
//! The library only logs column names, logical types, operations and error
//! codes. Values, blobs and key material never reach a log line.
//!
//! Only `encrypt` and `decrypt` initialise telemetry, after configuration has
//! loaded; `inspect` runs without it.

use anyhow::Result;
use tracing_subscriber::EnvFilter;

/// Initialise the tracing subscriber at the configured log level.
///
/// `RUST_LOG`, when set, takes precedence over `log_level`.
///
/// # Errors
///
/// Returns an error if the subscriber has already been set.
pub fn init(log_level: &str) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    tracing_subscriber::fmt()
        .json()
        .with_writer(std::io::stderr)
        .with_env_filter(filter)
        .try_init()
        .map_err(|e| anyhow::anyhow!("failed to initialise fieldseal tracing subscriber: {e}"))
}

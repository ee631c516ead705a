//! Process-wide `tracing` setup.
//!
//! `RUST_LOG` wins when set; otherwise the configured filter applies. Output
//! goes to stderr, or is appended to a log file when one is configured.

use std::fs::OpenOptions;
use std::path::Path;
use std::sync::Mutex;

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::models::CoreError;

/// Installs the global subscriber. Calling it again is a no-op.
pub fn init(default_filter: &str, log_file: Option<&Path>) -> Result<(), CoreError> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_filter))
        .map_err(|error| {
            CoreError::invalid_input(format!("invalid log filter '{default_filter}': {error}"))
        })?;

    let registry = tracing_subscriber::registry().with(filter);
    let installed = match log_file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .map_err(|error| {
                    CoreError::storage(format!("open log file '{}': {error}", path.display()))
                })?;
            registry
                .with(fmt::layer().with_writer(Mutex::new(file)).with_ansi(false))
                .try_init()
        }
        None => registry
            .with(fmt::layer().with_writer(std::io::stderr).compact())
            .try_init(),
    };

    if installed.is_err() {
        tracing::debug!("tracing subscriber already installed");
    }
    Ok(())
}

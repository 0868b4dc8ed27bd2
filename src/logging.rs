//! Tracing subscriber setup for the binary.

use thiserror::Error;
use tracing_subscriber::{fmt, EnvFilter};

const DEFAULT_FILTER: &str = "info";

#[derive(Error, Debug)]
pub enum LoggingError {
    #[error("failed to initialize logging: {0}")]
    Init(#[source] Box<dyn std::error::Error + Send + Sync + 'static>),
}

/// Install the global fmt subscriber. `RUST_LOG` overrides the default
/// `info` filter. Fails if a subscriber is already installed.
pub fn init_logging() -> Result<(), LoggingError> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(LoggingError::Init)?;

    tracing::debug!("logging initialized");
    Ok(())
}

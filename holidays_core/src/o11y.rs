//! Global `tracing` subscriber setup.

use crate::{Error, Result};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum LogFormat {
    Json,
    Pretty,
}

impl LogFormat {
    #[tracing::instrument(level = "debug")]
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "json" => Some(Self::Json),
            "pretty" | "text" => Some(Self::Pretty),
            _ => None,
        }
    }

    /// `HOLIDAYS_LOG_FORMAT`, JSON when unset.
    pub fn from_env() -> Result<Self> {
        match std::env::var("HOLIDAYS_LOG_FORMAT") {
            Err(_) => Ok(Self::Json),
            Ok(v) => Self::parse(&v).ok_or_else(|| {
                Error::InvalidInput(format!("HOLIDAYS_LOG_FORMAT has an invalid value: {v}"))
            }),
        }
    }
}

#[tracing::instrument(level = "info", skip_all)]
pub fn init_global_from_env() -> Result<()> {
    init_global(LogFormat::from_env()?)
}

/// Install the global subscriber: `RUST_LOG` filter (default `info`) plus a
/// JSON or human-readable fmt layer.
pub fn init_global(format: LogFormat) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let fmt = match format {
        LogFormat::Json => tracing_subscriber::fmt::layer()
            .json()
            .with_target(true)
            .boxed(),
        LogFormat::Pretty => tracing_subscriber::fmt::layer().with_target(true).boxed(),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt)
        .try_init()
        .map_err(|e| Error::BackendMessage(format!("tracing already initialized: {e}")))
}

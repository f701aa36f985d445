//! Tracing subscriber setup for the `groundwork` binary.
//!
//! Filtering follows `RUST_LOG` when set and falls back to `info`. Output is
//! either human-readable or one JSON object per event.

use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use tracing_subscriber::{EnvFilter, fmt as subscriber_fmt, prelude::*};

const DEFAULT_FILTER: &str = "info";

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable lines.
    #[default]
    Pretty,
    /// One JSON object per event.
    Json,
}

impl fmt::Display for LogFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Pretty => "pretty",
            Self::Json => "json",
        })
    }
}

/// Error returned when a log format name is not recognised.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown log format '{0}', expected 'pretty' or 'json'")]
pub struct ParseLogFormatError(pub String);

impl FromStr for LogFormat {
    type Err = ParseLogFormatError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "pretty" | "text" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            _ => Err(ParseLogFormatError(value.to_owned())),
        }
    }
}

/// Installs the global tracing subscriber.
///
/// Returns `false` when a subscriber was already installed, in which case the
/// existing one keeps receiving events.
#[must_use]
pub fn init_logging(format: LogFormat) -> bool {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    let registry = tracing_subscriber::registry().with(filter);
    let installed = match format {
        LogFormat::Pretty => registry
            .with(subscriber_fmt::layer().with_target(true))
            .try_init(),
        LogFormat::Json => registry
            .with(
                subscriber_fmt::layer()
                    .json()
                    .with_target(true)
                    .with_current_span(false),
            )
            .try_init(),
    };
    installed.is_ok()
}

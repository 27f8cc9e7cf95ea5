//! # relay-logging
//!
//! `tracing` subscriber setup for the relay hub.
//!
//! The filter comes from `RUST_LOG` when set, otherwise from the configured
//! default directive. Output is human-readable or JSON lines.

#![deny(unsafe_code)]

use thiserror::Error;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Output format for log lines.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable, one event per line.
    #[default]
    Pretty,
    /// Structured JSON, one object per line.
    Json,
}

impl LogFormat {
    /// Pick the format from the `json` flag used in settings.
    pub fn from_json_flag(json: bool) -> Self {
        if json { Self::Json } else { Self::Pretty }
    }
}

/// Errors raised while installing the subscriber.
#[derive(Debug, Error)]
pub enum LoggingError {
    /// The filter directive could not be parsed.
    #[error("invalid log filter {directive:?}: {source}")]
    Filter {
        /// The rejected directive.
        directive: String,
        /// Parser error.
        #[source]
        source: tracing_subscriber::filter::ParseError,
    },
    /// A global subscriber was already installed.
    #[error("global subscriber already installed")]
    AlreadyInitialized,
}

/// Build the env filter: `RUST_LOG` if present, else `default_directive`.
pub fn build_filter(default_directive: &str) -> Result<EnvFilter, LoggingError> {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return Ok(filter);
    }
    EnvFilter::try_new(default_directive).map_err(|source| LoggingError::Filter {
        directive: default_directive.to_string(),
        source,
    })
}

/// Install the global subscriber.
///
/// Returns [`LoggingError::AlreadyInitialized`] if another subscriber is
/// already set, which callers may ignore.
pub fn init_subscriber(default_directive: &str, format: LogFormat) -> Result<(), LoggingError> {
    let filter = build_filter(default_directive)?;
    let registry = tracing_subscriber::registry().with(filter);

    let result = match format {
        LogFormat::Pretty => registry
            .with(tracing_subscriber::fmt::layer().with_target(true))
            .try_init(),
        LogFormat::Json => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_target(true)
                    .with_current_span(true),
            )
            .try_init(),
    };
    result.map_err(|_| LoggingError::AlreadyInitialized)
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

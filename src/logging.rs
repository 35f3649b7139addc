//! Structured logging setup
//!
//! Log lines go to stderr, human-readable or JSON, with an optional copy
//! appended to a file. Stdout is reserved for command output such as
//! NDJSON event frames.

use crate::config::LoggingConfig;
use anyhow::Result;
use std::fs::OpenOptions;
use std::sync::Arc;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Build the level filter: `RUST_LOG` wins over the configured level
///
/// # Errors
///
/// Returns an error if neither `RUST_LOG` nor `level` is a valid directive.
pub fn build_filter(level: &str) -> Result<EnvFilter> {
    Ok(EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(level))?)
}

/// Stderr subscriber for warnings raised before configuration is loaded
///
/// Honors `RUST_LOG` and otherwise shows warnings and errors.
pub fn bootstrap_subscriber() -> impl tracing::Subscriber + Send + Sync {
    let filter = build_filter("warn").unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .finish()
}

/// Install the global subscriber
///
/// # Errors
///
/// Returns an error if the filter is invalid, the log file cannot be
/// opened, or a global subscriber is already installed.
///
/// # Examples
///
/// ```no_run
/// use blobpilot::config::LoggingConfig;
/// use blobpilot::logging::init_logging;
///
/// init_logging(&LoggingConfig::default()).unwrap();
/// tracing::info!("ready");
/// ```
pub fn init_logging(config: &LoggingConfig) -> Result<()> {
    let registry = tracing_subscriber::registry().with(build_filter(&config.level)?);

    let file = match &config.file_path {
        Some(path) => Some(Arc::new(
            OpenOptions::new().create(true).append(true).open(path)?,
        )),
        None => None,
    };

    if config.json {
        let stderr_layer = fmt::layer()
            .json()
            .with_current_span(true)
            .with_writer(std::io::stderr);

        let file_layer = file.map(|file| fmt::layer().json().with_current_span(true).with_writer(file));
        registry.with(stderr_layer).with(file_layer).try_init()?;
    } else {
        let stderr_layer = fmt::layer()
            .with_target(true)
            .with_level(true)
            .with_writer(std::io::stderr);

        let file_layer = file.map(|file| {
            fmt::layer()
                .with_target(true)
                .with_ansi(false)
                .with_writer(file)
        });
        registry.with(stderr_layer).with(file_layer).try_init()?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn test_build_filter_uses_configured_level() {
        std::env::remove_var("RUST_LOG");
        let filter = build_filter("debug").unwrap();
        assert_eq!(filter.to_string(), "debug");
    }

    #[test]
    #[serial]
    fn test_build_filter_prefers_rust_log() {
        std::env::set_var("RUST_LOG", "warn");
        let filter = build_filter("debug").unwrap();
        std::env::remove_var("RUST_LOG");
        assert_eq!(filter.to_string(), "warn");
    }

    #[test]
    #[serial]
    fn test_bootstrap_subscriber_is_scoped() {
        std::env::remove_var("RUST_LOG");
        let value = tracing::subscriber::with_default(bootstrap_subscriber(), || {
            tracing::warn!("still loading");
            42
        });
        assert_eq!(value, 42);
    }
}

//! Centralized file-based logging system
//!
//! Writes logs under the configured directory, separated by log type:
//! - main/    - All events as JSON
//! - error/   - Warnings and errors only
//! - health/  - Heartbeat and connectivity events
//! - routing/ - Budget and venue selection events

use super::config::LoggingConfig;
use crate::Result;
use std::fs;
use std::path::Path;
use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{
    layer::{Layer, SubscriberExt},
    util::SubscriberInitExt,
    EnvFilter,
};

const LOG_TYPES: [&str; 4] = ["main", "error", "health", "routing"];

/// Initialize logging
///
/// With file logging enabled, creates one rolling appender per log type under
/// `config.directory`. The returned guards must be kept alive for the duration
/// of the program or buffered events are lost. `RUST_LOG` overrides the
/// configured level.
pub fn init_logging(config: &LoggingConfig) -> Result<Vec<WorkerGuard>> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.level.as_str()));

    if !config.file_logging {
        let console_layer = tracing_subscriber::fmt::layer()
            .with_target(true)
            .with_level(true);
        tracing_subscriber::registry()
            .with(filter)
            .with(console_layer)
            .init();
        return Ok(Vec::new());
    }

    let logs_dir = config.directory.as_path();
    for log_type in LOG_TYPES {
        fs::create_dir_all(logs_dir.join(log_type))?;
    }

    let mut guards = Vec::with_capacity(LOG_TYPES.len());

    let (main_appender, main_guard) = create_appender(logs_dir, "main");
    guards.push(main_guard);

    let (error_appender, error_guard) = create_appender(logs_dir, "error");
    guards.push(error_guard);

    let (health_appender, health_guard) = create_appender(logs_dir, "health");
    guards.push(health_guard);

    let (routing_appender, routing_guard) = create_appender(logs_dir, "routing");
    guards.push(routing_guard);

    let main_layer = tracing_subscriber::fmt::layer()
        .with_writer(main_appender)
        .with_ansi(false)
        .with_target(true)
        .with_level(true)
        .with_thread_ids(true)
        .with_thread_names(true)
        .json();

    let error_layer = tracing_subscriber::fmt::layer()
        .with_writer(error_appender)
        .with_ansi(false)
        .with_target(true)
        .with_level(true)
        .with_filter(tracing_subscriber::filter::LevelFilter::WARN);

    let health_layer = tracing_subscriber::fmt::layer()
        .with_writer(health_appender)
        .with_ansi(false)
        .with_target(true)
        .with_level(true)
        .with_filter(tracing_subscriber::filter::filter_fn(|metadata| {
            metadata.target().contains("health") || metadata.target().contains("heartbeat")
        }));

    let routing_layer = tracing_subscriber::fmt::layer()
        .with_writer(routing_appender)
        .with_ansi(false)
        .with_target(true)
        .with_level(true)
        .with_filter(tracing_subscriber::filter::filter_fn(|metadata| {
            metadata.target().contains("routing") || metadata.target().contains("budget")
        }));

    let console_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_level(true);

    tracing_subscriber::registry()
        .with(filter)
        .with(main_layer)
        .with(error_layer)
        .with(health_layer)
        .with(routing_layer)
        .with(console_layer)
        .init();

    tracing::info!(
        directory = %logs_dir.display(),
        "Logging system initialized"
    );

    Ok(guards)
}

/// Create a daily rolling, non-blocking file appender
fn create_appender(root: &Path, name: &str) -> (NonBlocking, WorkerGuard) {
    let appender = RollingFileAppender::new(Rotation::DAILY, root.join(name), name);
    tracing_appender::non_blocking(appender)
}

/// Log macro helpers for specific log types
#[macro_export]
macro_rules! log_health {
    ($level:expr, $($arg:tt)+) => {
        tracing::event!(target: "health", $level, $($arg)+)
    };
}

#[macro_export]
macro_rules! log_routing {
    ($level:expr, $($arg:tt)+) => {
        tracing::event!(target: "routing", $level, $($arg)+)
    };
}

#[macro_export]
macro_rules! log_engine {
    ($level:expr, $($arg:tt)+) => {
        tracing::event!(target: "engine", $level, $($arg)+)
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_appender_directories() {
        let test_dir = std::env::temp_dir().join("hft_exec_core_logs_test");
        if test_dir.exists() {
            fs::remove_dir_all(&test_dir).ok();
        }

        for log_type in LOG_TYPES {
            fs::create_dir_all(test_dir.join(log_type)).unwrap();
        }
        let (_writer, _guard) = create_appender(&test_dir, "main");

        assert!(test_dir.join("main").exists());
        assert!(test_dir.join("routing").exists());

        fs::remove_dir_all(&test_dir).ok();
    }

    // The only test in this binary that installs the global subscriber
    #[test]
    fn test_init_logging_with_files() {
        let test_dir = std::env::temp_dir().join("hft_exec_core_init_logging_test");
        if test_dir.exists() {
            fs::remove_dir_all(&test_dir).ok();
        }
        let config = LoggingConfig {
            level: "debug".to_string(),
            directory: test_dir.clone(),
            file_logging: true,
        };

        let guards = init_logging(&config).unwrap();
        assert_eq!(guards.len(), LOG_TYPES.len());
        for log_type in LOG_TYPES {
            assert!(test_dir.join(log_type).is_dir());
        }
        crate::log_health!(tracing::Level::INFO, venue = "ALPHA", "connected");

        drop(guards);
        fs::remove_dir_all(&test_dir).ok();
    }

    #[test]
    fn test_log_macros_expand_without_subscriber() {
        crate::log_health!(tracing::Level::INFO, venue = "BINANCE", "connected");
        crate::log_routing!(tracing::Level::DEBUG, budget_us = 400.0, "routed");
        crate::log_engine!(tracing::Level::TRACE, "tick");
    }
}

//! Infrastructure - cold path only
//!
//! This module contains non-latency-critical code:
//! - Configuration loading and validation
//! - Logging
//! - Metrics

pub mod config;
pub mod logging;
pub mod metrics;

pub use config::{Config, ConfigError};
pub use logging::init_logging;
pub use metrics::{MetricsCollector, MetricsSnapshot};

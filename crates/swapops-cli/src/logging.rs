//! Tracing subscriber setup
//!
//! Filter precedence: `RUST_LOG`, then `--log`, then `log_filter` from the
//! configuration file. Logs go to stderr so command output stays pipeable.

use swapops_core::ConsoleConfig;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Resolve the active filter
pub(crate) fn filter(cli: Option<&str>, config: &ConsoleConfig) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(cli.unwrap_or(&config.log_filter)))
        .unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Install the global subscriber
pub(crate) fn init(cli: Option<&str>, config: &ConsoleConfig, json: bool) {
    let registry = tracing_subscriber::registry().with(filter(cli, config));
    if json {
        registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
            .init();
    }
    tracing::debug!("Logging initialized");
}

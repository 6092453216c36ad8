//! # Logging
//!
//! Tracing subscriber setup for the hook binary.
//!
//! `RUST_LOG` wins when set; otherwise `LOG_LEVEL` from the hook config applies
//! to this crate. `LOG_FORMAT=json` switches to one JSON object per line.

use crate::config::HookConfig;
use anyhow::Result;
use tracing_subscriber::EnvFilter;

/// Build the env filter for the configured log level
#[must_use]
pub fn env_filter(log_level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let level = log_level.to_lowercase();
        EnvFilter::new(format!("service_reconciler={level}"))
    })
}

/// Install the global tracing subscriber
///
/// Logs go to stderr so stdout stays free for `render` output.
pub fn init_tracing(config: &HookConfig) -> Result<()> {
    let builder = tracing_subscriber::fmt()
        .with_env_filter(env_filter(&config.log_level))
        .with_writer(std::io::stderr);

    let installed = if config.log_format.eq_ignore_ascii_case("json") {
        builder.json().try_init()
    } else {
        builder.with_ansi(false).try_init()
    };
    installed.map_err(|e| anyhow::anyhow!("Failed to initialize tracing: {e}"))
}

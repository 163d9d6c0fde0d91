//! Logging initialization for meshtest-runner.
//!
//! Configures `tracing-subscriber` based on the `[general]` section
//! of `MeshtestConfig`: JSON lines for CI, pretty output for
//! development. `RUST_LOG` overrides the configured level filter.

use anyhow::Result;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use meshtest_core::config::GeneralConfig;

/// Install the global tracing subscriber. Must be called exactly once,
/// before any tracing macros are used.
pub fn init_tracing(config: &GeneralConfig) -> Result<()> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));
    let registry = tracing_subscriber::registry().with(env_filter);

    // config validation only admits "json" and "pretty"; anything that
    // slips past it gets the machine-readable default
    match config.log_format.as_str() {
        "pretty" => registry
            .with(tracing_subscriber::fmt::layer().pretty())
            .try_init(),
        _ => registry
            .with(tracing_subscriber::fmt::layer().json())
            .try_init(),
    }
    .map_err(|e| anyhow::anyhow!("tracing subscriber already set: {}", e))
}

//! CLI argument definitions for meshtest-runner.
//!
//! Uses `clap` v4 derive macros to parse command-line arguments.

use std::path::PathBuf;

use clap::Parser;

/// Meshtest continuous test runner.
///
/// Brings storage node groups online in containers, verifies overlay
/// convergence, collects node metrics, and keeps a set of continuous
/// tests looping until shut down.
#[derive(Parser, Debug)]
#[command(name = "meshtest-runner")]
#[command(version, about, long_about = None)]
pub struct RunnerCli {
    /// Path to meshtest.toml configuration file.
    #[arg(short, long, default_value = "/etc/meshtest/meshtest.toml")]
    pub config: PathBuf,

    /// Override log level (trace, debug, info, warn, error).
    ///
    /// Takes precedence over the config file and environment variables.
    #[arg(long)]
    pub log_level: Option<String>,

    /// Override log format (json, pretty).
    ///
    /// Takes precedence over the config file and environment variables.
    #[arg(long)]
    pub log_format: Option<String>,

    /// Override the isolation namespace (takes precedence over config file).
    #[arg(long, env = "MESHTEST_NAMESPACE")]
    pub namespace: Option<String>,

    /// Validate configuration file and exit without starting the runner.
    #[arg(long)]
    pub validate: bool,
}

//! Meshtest runner library.
//!
//! This library exposes internal modules for integration testing.
//! In production, `meshtest-runner` is used as a binary (main.rs).

pub mod cli;
pub mod context;
pub mod logdl;
pub mod logging;
pub mod metrics_server;
pub mod scheduler;
pub mod suite;
pub mod testloop;

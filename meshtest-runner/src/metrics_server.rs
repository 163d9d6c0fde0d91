//! Prometheus metrics HTTP server for the runner's own metrics.
//!
//! Uses the built-in HTTP listener from `metrics-exporter-prometheus`
//! to expose a scrape endpoint for the runner process itself. This is
//! unrelated to the node metrics collected by `meshtest-metrics`.

use std::net::{Ipv4Addr, SocketAddr};
use std::time::Instant;

use anyhow::Result;
use metrics_exporter_prometheus::PrometheusBuilder;
use tokio_util::sync::CancellationToken;

use meshtest_core::config::SchedulerConfig;

/// Install the global metrics recorder and start the HTTP listener.
///
/// This function should be called once per process. After calling
/// this, all `metrics::counter!()`, `metrics::gauge!()` and
/// `metrics::histogram!()` macros record to the Prometheus format.
///
/// # Errors
///
/// - Socket binding fails
/// - Global recorder is already installed
pub fn install_metrics_recorder(config: &SchedulerConfig) -> Result<()> {
    let addr = SocketAddr::from((Ipv4Addr::UNSPECIFIED, config.self_metrics_port));

    tracing::info!(
        listen_addr = %addr,
        "installing Prometheus metrics recorder"
    );

    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|e| anyhow::anyhow!("failed to install metrics recorder: {}", e))?;

    meshtest_core::metrics::describe_all();

    tracing::info!(
        listen_addr = %addr,
        "Prometheus metrics endpoint active"
    );

    Ok(())
}

/// Keep the runner uptime gauge current until cancelled.
pub fn spawn_uptime_gauge(token: CancellationToken) -> tokio::task::JoinHandle<()> {
    let started = Instant::now();
    tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = token.cancelled() => break,
                _ = tokio::time::sleep(std::time::Duration::from_secs(10)) => {
                    metrics::gauge!(meshtest_core::metrics::RUNNER_UPTIME_SECONDS)
                        .set(started.elapsed().as_secs_f64());
                }
            }
        }
    })
}

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;

use meshtest_cluster::{BollardOrchestrator, HttpApiProvider};
use meshtest_core::config::MeshtestConfig;

use meshtest_runner::cli::RunnerCli;
use meshtest_runner::context::TestContext;
use meshtest_runner::logdl::spawn_log_downloader;
use meshtest_runner::scheduler::{TestScheduler, wait_for_shutdown_signal};
use meshtest_runner::suite::{MeshConvergenceTest, MetricsScrapeTest};
use meshtest_runner::{logging, metrics_server};

/// Iteration cadence of the built-in tests.
const CONVERGENCE_INTERVAL: Duration = Duration::from_secs(600);
const SCRAPE_INTERVAL: Duration = Duration::from_secs(900);

const CONVERGENCE_GROUP_SIZE: usize = 3;
const SCRAPE_GROUP_SIZE: usize = 2;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = RunnerCli::parse();

    let mut config = MeshtestConfig::load(&cli.config)
        .await
        .map_err(|e| anyhow::anyhow!("failed to load config: {}", e))?;

    // CLI overrides take precedence over file and environment
    if let Some(level) = &cli.log_level {
        config.general.log_level = level.clone();
    }
    if let Some(format) = &cli.log_format {
        config.general.log_format = format.clone();
    }
    if let Some(namespace) = &cli.namespace {
        config.cluster.namespace = namespace.clone();
    }
    config
        .validate()
        .map_err(|e| anyhow::anyhow!("config validation failed: {}", e))?;

    if cli.validate {
        println!("configuration OK: {}", cli.config.display());
        return Ok(());
    }

    logging::init_tracing(&config.general)?;
    tracing::info!("meshtest-runner starting");

    if config.scheduler.self_metrics_enabled {
        metrics_server::install_metrics_recorder(&config.scheduler)?;
        tracing::info!(
            port = config.scheduler.self_metrics_port,
            "self metrics endpoint enabled"
        );
    }

    let orchestrator = Arc::new(
        BollardOrchestrator::connect_with_socket(
            &config.cluster.docker_socket,
            config.cluster.namespace.clone(),
        )
        .map_err(|e| anyhow::anyhow!("failed to create docker client: {}", e))?,
    );
    let context = Arc::new(TestContext::new(
        config.clone(),
        orchestrator,
        HttpApiProvider::new(),
    ));

    // leftover containers from a previous run share our namespace label
    context
        .starter
        .delete_all_resources()
        .await
        .map_err(|e| anyhow::anyhow!("namespace cleanup failed: {}", e))?;
    tracing::info!(namespace = %config.cluster.namespace, "namespace cleaned");

    // the scrape test runs in its own namespace so its collectors and
    // groups never collide with the convergence test's resources
    let scrape_context = {
        let mut scrape_config = config.clone();
        scrape_config.cluster.namespace = format!("{}-scrape", config.cluster.namespace);
        let orchestrator = Arc::new(
            BollardOrchestrator::connect_with_socket(
                &scrape_config.cluster.docker_socket,
                scrape_config.cluster.namespace.clone(),
            )
            .map_err(|e| anyhow::anyhow!("failed to create docker client: {}", e))?,
        );
        Arc::new(TestContext::new(
            scrape_config,
            orchestrator,
            HttpApiProvider::new(),
        ))
    };

    let mut scheduler = TestScheduler::new(&config.scheduler);
    scheduler.register(Arc::new(MeshConvergenceTest::new(
        Arc::clone(&context),
        CONVERGENCE_GROUP_SIZE,
        CONVERGENCE_INTERVAL,
    )));
    scheduler.register(Arc::new(MetricsScrapeTest::new(
        Arc::clone(&scrape_context),
        SCRAPE_GROUP_SIZE,
        SCRAPE_INTERVAL,
    )));

    let uptime = metrics_server::spawn_uptime_gauge(scheduler.token().child_token());

    let downloader = if config.scheduler.download_container_logs {
        Some(spawn_log_downloader(
            Arc::clone(&context),
            PathBuf::from(&config.general.log_path),
            Duration::from_secs(config.scheduler.log_download_interval_secs),
            scheduler.token().child_token(),
        ))
    } else {
        None
    };

    scheduler.start().await;
    tracing::info!("meshtest-runner running");

    wait_for_shutdown_signal().await?;
    tracing::info!("shutting down");

    scheduler.shutdown().await;
    if let Some(downloader) = downloader {
        let _ = downloader.await;
    }
    let _ = uptime.await;
    scrape_context.aggregator.stop_all().await;

    tracing::info!("meshtest-runner shut down");
    Ok(())
}

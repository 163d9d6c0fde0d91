//! The continuous test suite shipped with the runner.
//!
//! Two tests exercise the infrastructure end to end: one brings a
//! group online and verifies full-mesh convergence, one attaches a
//! metrics collector and checks that every node is being scraped.
//! Both tear their group down at the end of each iteration.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context as _;
use futures_util::future::BoxFuture;
use metrics::counter;
use tracing::info;

use meshtest_cluster::{Bootstrap, GroupSetup, NodeApiProvider};
use meshtest_connectivity::NodeHandle;
use meshtest_core::metrics::{GROUP_STARTUP_FAILURES_TOTAL, GROUPS_STARTED_TOTAL};
use meshtest_core::{ContainerOrchestrator, FileLogSink};
use meshtest_metrics::TargetNode;

use crate::context::TestContext;
use crate::testloop::ContinuousTest;

/// Bring a group online, verify that every node discovers every other
/// node, then bring it offline again.
pub struct MeshConvergenceTest<O, P: NodeApiProvider> {
    context: Arc<TestContext<O, P>>,
    group_size: usize,
    interval: Duration,
}

impl<O, P: NodeApiProvider> MeshConvergenceTest<O, P> {
    pub fn new(context: Arc<TestContext<O, P>>, group_size: usize, interval: Duration) -> Self {
        Self {
            context,
            group_size,
            interval,
        }
    }
}

impl<O, P> ContinuousTest for MeshConvergenceTest<O, P>
where
    O: ContainerOrchestrator,
    P: NodeApiProvider,
    P::Api: Clone,
{
    fn name(&self) -> &str {
        "mesh-convergence"
    }

    fn interval(&self) -> Duration {
        self.interval
    }

    fn run(&self) -> BoxFuture<'_, anyhow::Result<()>> {
        Box::pin(async move {
            let setup = GroupSetup::new(self.group_size)
                .with_name_prefix("mesh")
                .with_bootstrap(Bootstrap::FirstNode);

            let mut group = match self.context.starter.bring_online(setup).await {
                Ok(group) => {
                    counter!(GROUPS_STARTED_TOTAL).increment(1);
                    group
                }
                Err(e) => {
                    counter!(GROUP_STARTUP_FAILURES_TOTAL).increment(1);
                    return Err(e).context("group failed to come online");
                }
            };

            let handles: Vec<NodeHandle<P::Api>> = group
                .nodes()
                .iter()
                .map(|n| NodeHandle::new(n.name(), n.api.clone()))
                .collect();

            let verdict = self.context.verifier.verify_full_mesh(&handles).await;
            self.context.starter.bring_offline(&mut group).await?;

            match verdict {
                Ok(matrix) => {
                    info!(pairs = matrix.len(), "mesh fully connected");
                    Ok(())
                }
                Err(e) => Err(anyhow::anyhow!(e.describe())),
            }
        })
    }
}

/// Bring a group online, attach a Prometheus collector and check that
/// every node reports as scraped.
pub struct MetricsScrapeTest<O, P: NodeApiProvider> {
    context: Arc<TestContext<O, P>>,
    group_size: usize,
    interval: Duration,
}

impl<O, P: NodeApiProvider> MetricsScrapeTest<O, P> {
    pub fn new(context: Arc<TestContext<O, P>>, group_size: usize, interval: Duration) -> Self {
        Self {
            context,
            group_size,
            interval,
        }
    }
}

impl<O, P> ContinuousTest for MetricsScrapeTest<O, P>
where
    O: ContainerOrchestrator,
    P: NodeApiProvider,
{
    fn name(&self) -> &str {
        "metrics-scrape"
    }

    fn interval(&self) -> Duration {
        self.interval
    }

    fn isolation_namespace(&self) -> Option<&str> {
        Some(&self.context.config.cluster.namespace)
    }

    // leftover collectors and groups from a previous run share the
    // namespace label, so one sweep removes them all
    fn prepare(&self) -> BoxFuture<'_, anyhow::Result<()>> {
        Box::pin(async move {
            self.context
                .starter
                .delete_all_resources()
                .await
                .context("namespace pre-run cleanup failed")
        })
    }

    fn run(&self) -> BoxFuture<'_, anyhow::Result<()>> {
        Box::pin(async move {
            let setup = GroupSetup::new(self.group_size)
                .with_name_prefix("scrape")
                .with_bootstrap(Bootstrap::FirstNode);

            let mut group = match self.context.starter.bring_online(setup).await {
                Ok(group) => {
                    counter!(GROUPS_STARTED_TOTAL).increment(1);
                    group
                }
                Err(e) => {
                    counter!(GROUP_STARTUP_FAILURES_TOTAL).increment(1);
                    return Err(e).context("group failed to come online");
                }
            };

            let targets: Vec<TargetNode> = group
                .nodes()
                .iter()
                .map(|n| TargetNode {
                    name: n.name().to_owned(),
                    address: n.container.address,
                    metrics_port: n.node.descriptor.ports.metrics,
                })
                .collect();

            let handle = self.context.aggregator.begin_collecting_for(&targets).await?;
            let verdict = self.await_scrapes(&handle, targets.len()).await;

            if verdict.is_ok() {
                self.save_metrics_artifact(&handle).await;
            }
            if let Err(e) = self.context.aggregator.stop(&handle).await {
                tracing::warn!(error = %e, "collector stop failed");
            }
            self.context.starter.bring_offline(&mut group).await?;

            verdict
        })
    }
}

impl<O, P> MetricsScrapeTest<O, P>
where
    O: ContainerOrchestrator,
    P: NodeApiProvider,
{
    /// Dump every collected series to a per-collector artifact file.
    /// Failures are logged; the iteration verdict is the scrape check.
    async fn save_metrics_artifact(&self, handle: &meshtest_metrics::MetricsHandle) {
        let path = Path::new(&self.context.config.general.log_path)
            .join("metrics")
            .join(format!("collector-{}.log", handle.instance_no));

        let mut sink = match FileLogSink::create(&path) {
            Ok(sink) => sink,
            Err(e) => {
                tracing::warn!(error = %e, "cannot open metrics artifact file");
                return;
            }
        };
        if let Err(e) = self
            .context
            .aggregator
            .download_all_metrics(&self.context.query, &mut sink)
            .await
        {
            tracing::warn!(error = %e, "metrics artifact download failed");
            return;
        }
        if let Err(e) = sink.flush() {
            tracing::warn!(error = %e, "metrics artifact flush failed");
        }
    }

    /// Poll the collector until every target reports `up == 1`.
    async fn await_scrapes(
        &self,
        handle: &meshtest_metrics::MetricsHandle,
        expected: usize,
    ) -> anyhow::Result<()> {
        let scrape_interval =
            Duration::from_secs(self.context.config.metrics.scrape_interval_secs);
        let endpoint = format!(
            "http://{}:{}",
            handle.container.address, self.context.config.metrics.api_port
        );

        // allow a few scrape cycles before declaring failure
        let deadline = tokio::time::Instant::now() + scrape_interval * 4;
        loop {
            match self.context.query.instant(&endpoint, "count(up == 1)").await {
                Ok(Some(v)) if v >= expected as f64 => {
                    info!(collector = handle.instance_no, targets = expected, "all nodes scraped");
                    return Ok(());
                }
                Ok(_) => {}
                Err(e) => {
                    tracing::debug!(error = %e, "collector not queryable yet");
                }
            }

            if tokio::time::Instant::now() >= deadline {
                anyhow::bail!(
                    "collector {} did not scrape all {expected} targets in time",
                    handle.instance_no
                );
            }
            tokio::time::sleep(scrape_interval).await;
        }
    }
}

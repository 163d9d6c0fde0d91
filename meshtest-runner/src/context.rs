//! Shared infrastructure handed to every continuous test.
//!
//! A [`TestContext`] bundles the cluster starter, the convergence
//! verifier, the metrics aggregator and the query client. Tests hold
//! it behind an `Arc` so loops can run concurrently against the same
//! orchestrator and registries.

use std::path::PathBuf;
use std::sync::Arc;

use meshtest_cluster::{ClusterStarter, NodeApiProvider};
use meshtest_connectivity::ConnectivityVerifier;
use meshtest_core::ContainerOrchestrator;
use meshtest_core::config::MeshtestConfig;
use meshtest_metrics::{MetricsAggregator, MetricsQuery};

/// Everything a continuous test needs to touch the cluster.
pub struct TestContext<O, P: NodeApiProvider> {
    /// Node group lifecycle.
    pub starter: ClusterStarter<O, P>,
    /// Full-mesh convergence verification.
    pub verifier: ConnectivityVerifier,
    /// Prometheus collector lifecycle.
    pub aggregator: MetricsAggregator<O>,
    /// Prometheus query client.
    pub query: MetricsQuery,
    /// Loaded runner configuration.
    pub config: MeshtestConfig,
}

impl<O, P> TestContext<O, P>
where
    O: ContainerOrchestrator,
    P: NodeApiProvider,
{
    /// Wire the context from a validated configuration.
    pub fn new(config: MeshtestConfig, orchestrator: Arc<O>, provider: P) -> Self {
        let starter = ClusterStarter::new(
            config.cluster.clone(),
            config.general.data_dir.clone(),
            Arc::clone(&orchestrator),
            provider,
        )
        .with_log_dir(PathBuf::from(&config.general.log_path));

        let verifier = ConnectivityVerifier::from_config(&config.connectivity);
        let aggregator = MetricsAggregator::new(config.metrics.clone(), orchestrator);

        Self {
            starter,
            verifier,
            aggregator,
            query: MetricsQuery::new(),
            config,
        }
    }
}

//! Background container log downloader.
//!
//! Periodically snapshots the starter's live container registry and
//! downloads each container's full log to
//! `<dir>/containers/<name>.log`, overwriting the previous capture.
//! Download failures are logged and skipped; a container that went
//! away between snapshot and download is not an error.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use meshtest_cluster::NodeApiProvider;
use meshtest_core::{ContainerOrchestrator, FileLogSink, OrchestratorError};

use crate::context::TestContext;

/// Spawn the downloader task. Cancelling the token stops it after the
/// current sweep.
pub fn spawn_log_downloader<O, P>(
    context: Arc<TestContext<O, P>>,
    dir: PathBuf,
    interval: Duration,
    token: CancellationToken,
) -> JoinHandle<()>
where
    O: ContainerOrchestrator,
    P: NodeApiProvider,
{
    tokio::spawn(async move {
        info!(dir = %dir.display(), interval_secs = interval.as_secs(), "log downloader started");
        loop {
            tokio::select! {
                _ = token.cancelled() => break,
                _ = tokio::time::sleep(interval) => {}
            }
            download_sweep(&context, &dir).await;
        }
        // final sweep so shutdown captures the latest logs
        download_sweep(&context, &dir).await;
        info!("log downloader stopped");
    })
}

async fn download_sweep<O, P>(context: &TestContext<O, P>, dir: &Path)
where
    O: ContainerOrchestrator,
    P: NodeApiProvider,
{
    let starter = &context.starter;
    let containers = starter.live_containers();
    debug!(count = containers.len(), "downloading container logs");

    for container in containers {
        let path = dir.join("containers").join(format!("{}.log", container.name));
        let mut sink = match FileLogSink::create(&path) {
            Ok(sink) => sink,
            Err(e) => {
                warn!(container = %container.name, error = %e, "cannot open log file");
                continue;
            }
        };
        match starter.orchestrator().download_log(&container, &mut sink).await {
            Ok(()) => {
                if let Err(e) = sink.flush() {
                    warn!(container = %container.name, error = %e, "log flush failed");
                }
            }
            Err(OrchestratorError::NotFound(_)) => {
                debug!(container = %container.name, "container gone before log download");
            }
            Err(e) => {
                warn!(container = %container.name, error = %e, "log download failed");
            }
        }
    }
}

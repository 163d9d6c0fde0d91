//! Test scheduler -- staggered launch and graceful drain.
//!
//! Registered tests are launched one by one with a configurable delay
//! between launches, so the loops do not hammer the shared docker
//! daemon at the same instant. Shutdown cancels every loop and waits
//! for the in-flight iterations to finish.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use meshtest_core::config::SchedulerConfig;

use crate::testloop::{ContinuousTest, TestLoop};

/// Owns the test loops for the lifetime of the runner.
pub struct TestScheduler {
    stagger: Duration,
    token: CancellationToken,
    tests: Vec<Arc<dyn ContinuousTest>>,
    loops: Vec<TestLoop>,
}

impl TestScheduler {
    pub fn new(config: &SchedulerConfig) -> Self {
        Self {
            stagger: Duration::from_secs(config.stagger_secs),
            token: CancellationToken::new(),
            tests: Vec::new(),
            loops: Vec::new(),
        }
    }

    /// Root cancellation token. Auxiliary tasks (log downloader,
    /// uptime gauge) should use a child of this token.
    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    /// Queue a test for launch.
    pub fn register(&mut self, test: Arc<dyn ContinuousTest>) {
        info!(test = test.name(), "test registered");
        self.tests.push(test);
    }

    /// Launch every registered test, pausing `stagger` between
    /// launches. Tests with a dedicated namespace get their pre-run
    /// cleanup before their loop starts.
    pub async fn start(&mut self) {
        let tests = std::mem::take(&mut self.tests);
        for (i, test) in tests.into_iter().enumerate() {
            if i > 0 {
                tokio::select! {
                    _ = self.token.cancelled() => {
                        info!("cancelled during staggered launch");
                        break;
                    }
                    _ = tokio::time::sleep(self.stagger) => {}
                }
            }
            if let Some(namespace) = test.isolation_namespace() {
                info!(test = test.name(), namespace, "preparing isolation namespace");
            }
            if let Err(e) = test.prepare().await {
                warn!(test = test.name(), error = %e, "test preparation failed");
            }
            self.loops
                .push(TestLoop::spawn(test, self.token.child_token()));
        }
        info!(loops = self.loops.len(), "all test loops launched");
    }

    /// Cancel every loop and wait for in-flight iterations to finish.
    pub async fn shutdown(self) {
        info!("cancelling test loops");
        self.token.cancel();
        for test_loop in self.loops {
            let name = test_loop.name().to_owned();
            test_loop.join().await;
            info!(test = %name, "loop drained");
        }
    }
}

/// Block until SIGINT or SIGTERM.
pub async fn wait_for_shutdown_signal() -> anyhow::Result<()> {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};
        let mut term = signal(SignalKind::terminate())?;
        tokio::select! {
            _ = tokio::signal::ctrl_c() => info!("SIGINT received"),
            _ = term.recv() => info!("SIGTERM received"),
        }
        Ok(())
    }
    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c().await?;
        info!("ctrl-c received");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::atomic::{AtomicU32, Ordering};

    use futures_util::future::BoxFuture;

    struct CountingTest {
        name: String,
        runs: Arc<AtomicU32>,
    }

    impl ContinuousTest for CountingTest {
        fn name(&self) -> &str {
            &self.name
        }

        fn interval(&self) -> Duration {
            Duration::from_secs(60)
        }

        fn run(&self) -> BoxFuture<'_, anyhow::Result<()>> {
            Box::pin(async move {
                self.runs.fetch_add(1, Ordering::SeqCst);
                Ok(())
            })
        }
    }

    #[tokio::test(start_paused = true)]
    async fn launches_are_staggered() {
        let first = Arc::new(AtomicU32::new(0));
        let second = Arc::new(AtomicU32::new(0));

        let mut scheduler = TestScheduler::new(&SchedulerConfig {
            stagger_secs: 5,
            ..SchedulerConfig::default()
        });
        scheduler.register(Arc::new(CountingTest {
            name: "first".into(),
            runs: Arc::clone(&first),
        }));
        scheduler.register(Arc::new(CountingTest {
            name: "second".into(),
            runs: Arc::clone(&second),
        }));

        let start = tokio::spawn(async move {
            scheduler.start().await;
            scheduler
        });

        // first loop fires immediately, second after the stagger
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(first.load(Ordering::SeqCst), 1);
        assert_eq!(second.load(Ordering::SeqCst), 0);

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(second.load(Ordering::SeqCst), 1);

        let scheduler = start.await.unwrap();
        scheduler.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_during_stagger_stops_launching() {
        let first = Arc::new(AtomicU32::new(0));
        let second = Arc::new(AtomicU32::new(0));

        let mut scheduler = TestScheduler::new(&SchedulerConfig {
            stagger_secs: 10,
            ..SchedulerConfig::default()
        });
        scheduler.register(Arc::new(CountingTest {
            name: "first".into(),
            runs: Arc::clone(&first),
        }));
        scheduler.register(Arc::new(CountingTest {
            name: "second".into(),
            runs: Arc::clone(&second),
        }));

        let token = scheduler.token();
        let start = tokio::spawn(async move {
            scheduler.start().await;
            scheduler
        });

        // cancel while start() is still sleeping the stagger
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(first.load(Ordering::SeqCst), 1);
        token.cancel();

        let scheduler = start.await.unwrap();
        tokio::time::sleep(Duration::from_secs(30)).await;
        assert_eq!(second.load(Ordering::SeqCst), 0);

        scheduler.shutdown().await;
    }

    struct NamespacedTest {
        prepared: Arc<AtomicU32>,
        runs: Arc<AtomicU32>,
    }

    impl ContinuousTest for NamespacedTest {
        fn name(&self) -> &str {
            "namespaced"
        }

        fn interval(&self) -> Duration {
            Duration::from_secs(60)
        }

        fn isolation_namespace(&self) -> Option<&str> {
            Some("meshtest-private")
        }

        fn prepare(&self) -> BoxFuture<'_, anyhow::Result<()>> {
            Box::pin(async move {
                assert_eq!(self.runs.load(Ordering::SeqCst), 0);
                self.prepared.fetch_add(1, Ordering::SeqCst);
                Ok(())
            })
        }

        fn run(&self) -> BoxFuture<'_, anyhow::Result<()>> {
            Box::pin(async move {
                self.runs.fetch_add(1, Ordering::SeqCst);
                Ok(())
            })
        }
    }

    #[tokio::test(start_paused = true)]
    async fn prepare_runs_before_the_first_iteration() {
        let prepared = Arc::new(AtomicU32::new(0));
        let runs = Arc::new(AtomicU32::new(0));

        let mut scheduler = TestScheduler::new(&SchedulerConfig {
            stagger_secs: 0,
            ..SchedulerConfig::default()
        });
        scheduler.register(Arc::new(NamespacedTest {
            prepared: Arc::clone(&prepared),
            runs: Arc::clone(&runs),
        }));

        scheduler.start().await;
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(prepared.load(Ordering::SeqCst), 1);
        assert_eq!(runs.load(Ordering::SeqCst), 1);

        scheduler.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_drains_every_loop() {
        let runs = Arc::new(AtomicU32::new(0));
        let mut scheduler = TestScheduler::new(&SchedulerConfig {
            stagger_secs: 0,
            ..SchedulerConfig::default()
        });
        scheduler.register(Arc::new(CountingTest {
            name: "only".into(),
            runs: Arc::clone(&runs),
        }));

        scheduler.start().await;
        tokio::time::sleep(Duration::from_secs(1)).await;
        scheduler.shutdown().await;

        let after = runs.load(Ordering::SeqCst);
        tokio::time::sleep(Duration::from_secs(120)).await;
        assert_eq!(runs.load(Ordering::SeqCst), after);
    }
}

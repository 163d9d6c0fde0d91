//! Continuous test trait and the per-test loop task.
//!
//! Each registered test runs in its own loop: run once, wait the
//! test's interval measured from completion, run again. A failing or
//! panicking iteration is recorded and the loop keeps going; only
//! cancellation ends it. Iteration bodies run in a spawned task so a
//! panic unwinds that task, not the loop.

use std::sync::Arc;
use std::time::Duration;

use futures_util::future::BoxFuture;
use metrics::{counter, gauge, histogram};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use meshtest_core::metrics::{
    ACTIVE_TEST_LOOPS, LABEL_TEST, TEST_FAILURES_TOTAL, TEST_ITERATION_DURATION_SECONDS,
    TEST_RUNS_TOTAL,
};

/// A test that runs forever at a fixed cadence.
///
/// Implementations carry their own context (cluster starter, verifier,
/// collectors); the scheduler only knows the name, the interval and
/// how to run one iteration.
pub trait ContinuousTest: Send + Sync + 'static {
    /// Test name, used in logs and metric labels.
    fn name(&self) -> &str;

    /// Pause between the end of one iteration and the start of the next.
    fn interval(&self) -> Duration;

    /// Dedicated resource namespace, if this test runs in one.
    fn isolation_namespace(&self) -> Option<&str> {
        None
    }

    /// One-time setup before the loop starts. Tests with a dedicated
    /// namespace clean up leftovers from previous runs here.
    fn prepare(&self) -> BoxFuture<'_, anyhow::Result<()>> {
        Box::pin(async { Ok(()) })
    }

    /// Run one iteration.
    fn run(&self) -> BoxFuture<'_, anyhow::Result<()>>;
}

/// Handle to a spawned test loop.
pub struct TestLoop {
    name: String,
    token: CancellationToken,
    handle: JoinHandle<()>,
}

impl TestLoop {
    /// Spawn the loop for `test`. The first iteration starts
    /// immediately; later ones wait `interval()` after completion.
    pub fn spawn(test: Arc<dyn ContinuousTest>, token: CancellationToken) -> Self {
        let name = test.name().to_owned();
        let loop_token = token.clone();
        let handle = tokio::spawn(run_loop(test, loop_token));
        Self {
            name,
            token,
            handle,
        }
    }

    /// Loop name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Request cancellation. The loop finishes its current iteration.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// Wait for the loop task to finish.
    pub async fn join(self) {
        if let Err(e) = self.handle.await {
            if e.is_panic() {
                error!(test = %self.name, "test loop task panicked");
            }
        }
    }
}

async fn run_loop(test: Arc<dyn ContinuousTest>, token: CancellationToken) {
    let name = test.name().to_owned();
    gauge!(ACTIVE_TEST_LOOPS).increment(1.0);
    info!(test = %name, interval_secs = test.interval().as_secs(), "test loop started");

    loop {
        if token.is_cancelled() {
            break;
        }

        let started = tokio::time::Instant::now();
        let iteration = tokio::spawn({
            let test = Arc::clone(&test);
            async move { test.run().await }
        });

        match iteration.await {
            Ok(Ok(())) => {
                counter!(TEST_RUNS_TOTAL, LABEL_TEST => name.clone()).increment(1);
                info!(
                    test = %name,
                    elapsed_secs = started.elapsed().as_secs(),
                    "iteration passed"
                );
            }
            Ok(Err(e)) => {
                counter!(TEST_RUNS_TOTAL, LABEL_TEST => name.clone()).increment(1);
                counter!(TEST_FAILURES_TOTAL, LABEL_TEST => name.clone()).increment(1);
                error!(test = %name, error = %e, "iteration failed");
            }
            Err(join_err) if join_err.is_panic() => {
                counter!(TEST_RUNS_TOTAL, LABEL_TEST => name.clone()).increment(1);
                counter!(TEST_FAILURES_TOTAL, LABEL_TEST => name.clone()).increment(1);
                error!(test = %name, "iteration panicked");
            }
            Err(_) => break,
        }
        histogram!(TEST_ITERATION_DURATION_SECONDS, LABEL_TEST => name.clone())
            .record(started.elapsed().as_secs_f64());

        tokio::select! {
            _ = token.cancelled() => break,
            _ = tokio::time::sleep(test.interval()) => {}
        }
    }

    gauge!(ACTIVE_TEST_LOOPS).decrement(1.0);
    info!(test = %name, "test loop stopped");
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::atomic::{AtomicU32, Ordering};

    struct CountingTest {
        runs: Arc<AtomicU32>,
        interval: Duration,
    }

    impl ContinuousTest for CountingTest {
        fn name(&self) -> &str {
            "counting"
        }

        fn interval(&self) -> Duration {
            self.interval
        }

        fn run(&self) -> BoxFuture<'_, anyhow::Result<()>> {
            Box::pin(async move {
                self.runs.fetch_add(1, Ordering::SeqCst);
                Ok(())
            })
        }
    }

    struct SlowTest {
        started: Arc<AtomicU32>,
        completed: Arc<AtomicU32>,
    }

    impl ContinuousTest for SlowTest {
        fn name(&self) -> &str {
            "slow"
        }

        fn interval(&self) -> Duration {
            Duration::from_secs(5)
        }

        fn run(&self) -> BoxFuture<'_, anyhow::Result<()>> {
            Box::pin(async move {
                self.started.fetch_add(1, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_secs(5)).await;
                self.completed.fetch_add(1, Ordering::SeqCst);
                Ok(())
            })
        }
    }

    struct PanickingTest {
        attempts: Arc<AtomicU32>,
    }

    impl ContinuousTest for PanickingTest {
        fn name(&self) -> &str {
            "panicking"
        }

        fn interval(&self) -> Duration {
            Duration::from_secs(5)
        }

        fn run(&self) -> BoxFuture<'_, anyhow::Result<()>> {
            Box::pin(async move {
                self.attempts.fetch_add(1, Ordering::SeqCst);
                panic!("iteration blew up");
            })
        }
    }

    #[tokio::test(start_paused = true)]
    async fn loop_runs_on_the_interval_and_stops_on_cancel() {
        let runs = Arc::new(AtomicU32::new(0));
        let test = Arc::new(CountingTest {
            runs: Arc::clone(&runs),
            interval: Duration::from_secs(5),
        });

        let token = CancellationToken::new();
        let test_loop = TestLoop::spawn(test, token.clone());

        // first iteration fires immediately
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(runs.load(Ordering::SeqCst), 1);

        // second at t=5, third at t=10
        tokio::time::sleep(Duration::from_secs(11)).await;
        assert_eq!(runs.load(Ordering::SeqCst), 3);

        // cancel mid-wait: the t=15 iteration never happens
        test_loop.cancel();
        test_loop.join().await;
        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(runs.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_during_an_iteration_lets_it_finish() {
        let started = Arc::new(AtomicU32::new(0));
        let completed = Arc::new(AtomicU32::new(0));
        let test = Arc::new(SlowTest {
            started: Arc::clone(&started),
            completed: Arc::clone(&completed),
        });

        let token = CancellationToken::new();
        let test_loop = TestLoop::spawn(test, token.clone());

        // first run spans t=0..5, second starts at t=10 and is still
        // in flight at t=12
        tokio::time::sleep(Duration::from_secs(12)).await;
        assert_eq!(started.load(Ordering::SeqCst), 2);
        assert_eq!(completed.load(Ordering::SeqCst), 1);

        // cancel mid-run: the in-flight iteration completes
        test_loop.cancel();
        test_loop.join().await;
        assert_eq!(completed.load(Ordering::SeqCst), 2);

        // and nothing starts afterwards, t=15 included
        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(started.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn panicking_iteration_does_not_kill_the_loop() {
        let attempts = Arc::new(AtomicU32::new(0));
        let test = Arc::new(PanickingTest {
            attempts: Arc::clone(&attempts),
        });

        let token = CancellationToken::new();
        let test_loop = TestLoop::spawn(test, token.clone());

        tokio::time::sleep(Duration::from_secs(12)).await;
        assert!(attempts.load(Ordering::SeqCst) >= 2);

        test_loop.cancel();
        test_loop.join().await;
    }
}

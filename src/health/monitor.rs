//! Background health polling feeding the connectivity banner.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::info;

use super::poller::{HealthCheckResult, HealthPoller, HealthStatus};
use crate::net::AbortSignal;

/// Periodically runs [`HealthPoller::ping_with_retry`] and publishes results.
///
/// Subscribers see `idle` until the first run completes. Aborting the signal
/// stops the loop and cancels the probe in flight.
pub struct HealthMonitor {
    results: watch::Receiver<HealthCheckResult>,
    task: JoinHandle<()>,
}

impl HealthMonitor {
    /// Starts polling immediately, then every `interval`.
    #[must_use]
    pub fn spawn(
        poller: Arc<HealthPoller>,
        interval: Duration,
        tries: u32,
        delay: Duration,
        signal: AbortSignal,
    ) -> Self {
        let (tx, results) = watch::channel(HealthCheckResult::IDLE);
        let task = tokio::spawn(async move {
            let mut last = HealthStatus::Idle;
            loop {
                let result = poller.ping_with_retry(tries, delay, Some(&signal)).await;
                if signal.is_aborted() {
                    break;
                }
                if result.status != last {
                    info!(from = %last, to = %result.status, "health status changed");
                    last = result.status;
                }
                if tx.send(result).is_err() {
                    break;
                }
                tokio::select! {
                    () = tokio::time::sleep(interval) => {}
                    _ = signal.aborted() => break,
                }
            }
        });
        Self { results, task }
    }

    /// The most recent result.
    #[must_use]
    pub fn latest(&self) -> HealthCheckResult {
        *self.results.borrow()
    }

    /// A receiver for following updates.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<HealthCheckResult> {
        self.results.clone()
    }

    /// Returns `true` once the polling loop has exited.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

impl Drop for HealthMonitor {
    fn drop(&mut self) {
        self.task.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::net::{AbortController, AbortReason, SafeFetch};
    use crate::ports::HttpTransport;
    use crate::testing::{Reply, ScriptedTransport};

    fn poller(transport: &Arc<ScriptedTransport>) -> Arc<HealthPoller> {
        let fetcher = SafeFetch::new(Arc::clone(transport) as Arc<dyn HttpTransport>);
        Arc::new(HealthPoller::new(Arc::new(fetcher)))
    }

    #[tokio::test(start_paused = true)]
    async fn publishes_each_run_until_aborted() {
        let transport = Arc::new(ScriptedTransport::new([
            Reply::json(500, ""),
            Reply::json(500, ""),
            Reply::json(200, r#"{"ok":true}"#),
        ]));
        let controller = AbortController::new();
        let monitor = HealthMonitor::spawn(
            poller(&transport),
            Duration::from_secs(30),
            2,
            Duration::from_millis(100),
            controller.signal(),
        );
        let mut updates = monitor.subscribe();
        assert_eq!(monitor.latest().status, HealthStatus::Idle);

        updates.changed().await.unwrap();
        assert_eq!(updates.borrow_and_update().status, HealthStatus::Down);

        updates.changed().await.unwrap();
        assert_eq!(updates.borrow_and_update().status, HealthStatus::Ok);
        assert_eq!(transport.calls(), 3);

        controller.abort(AbortReason::Finalize);
        tokio::time::sleep(Duration::from_millis(1)).await;
        assert!(monitor.is_finished());
    }
}

//! Periodic dashboard refresh.
//!
//! The poller runs on its own tokio task. Each tick takes one [`DashboardSnapshot`] through the
//! queue's read accessors and hands it to a sink; the queue lock is released before the sink
//! runs. Cancelling stops future ticks only; a tick in progress always finishes.

use crate::queue::{DashboardSnapshot, TriageQueue};
use chrono::Utc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

pub struct DashboardPoller {
    cancel: CancellationToken,
    handle: Option<JoinHandle<()>>,
}

impl DashboardPoller {
    /// Starts polling `queue` every `interval`, beginning immediately.
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn<S>(queue: TriageQueue, interval: Duration, mut sink: S) -> Self
    where
        S: FnMut(DashboardSnapshot) + Send + 'static,
    {
        let cancel = CancellationToken::new();
        let token = cancel.clone();

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            tracing::info!(interval_secs = interval.as_secs_f64(), "dashboard poller started");

            loop {
                tokio::select! {
                    biased;
                    _ = token.cancelled() => break,
                    _ = ticker.tick() => {
                        let snapshot = queue.snapshot(Utc::now());
                        tracing::debug!(
                            queued = snapshot.stats.total(),
                            critical = snapshot.has_critical,
                            overdue = snapshot.overdue,
                            "dashboard tick"
                        );
                        sink(snapshot);
                    }
                }
            }

            tracing::info!("dashboard poller stopped");
        });

        Self {
            cancel,
            handle: Some(handle),
        }
    }

    /// Stops future ticks without waiting for the task.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Cancels and waits for the polling task to exit.
    pub async fn shutdown(&mut self) {
        self.cancel();
        if let Some(handle) = self.handle.take() {
            if let Err(err) = handle.await {
                tracing::warn!(error = %err, "dashboard poller task ended abnormally");
            }
        }
    }
}

impl Drop for DashboardPoller {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::tests::triaged;
    use crate::urgency::{UrgencyLevel, WaitTargets};
    use tokio::sync::mpsc;

    #[tokio::test]
    async fn test_poller_delivers_snapshots() {
        let queue = TriageQueue::new(WaitTargets::default());
        queue
            .add_patient(triaged("F001", 0, UrgencyLevel::Critical))
            .unwrap();

        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut poller =
            DashboardPoller::spawn(queue.clone(), Duration::from_millis(10), move |snapshot| {
                let _ = tx.send(snapshot);
            });

        let first = rx.recv().await.unwrap();
        assert!(first.has_critical);
        assert_eq!(first.stats.critical, 1);

        queue.remove_patient(&first.next.unwrap().id);
        let mut later = rx.recv().await.unwrap();
        while later.has_critical {
            later = rx.recv().await.unwrap();
        }
        assert_eq!(later.stats.total(), 0);

        poller.shutdown().await;
    }

    #[tokio::test]
    async fn test_cancellation_stops_future_ticks() {
        let queue = TriageQueue::new(WaitTargets::default());
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut poller =
            DashboardPoller::spawn(queue.clone(), Duration::from_millis(5), move |snapshot| {
                let _ = tx.send(snapshot);
            });

        rx.recv().await.unwrap();
        poller.shutdown().await;
        assert!(poller.is_cancelled());

        // The sink (and its sender) went away with the task; only already-sent ticks remain.
        while rx.try_recv().is_ok() {}
        assert!(rx.recv().await.is_none());

        // The queue itself is untouched by cancellation.
        queue
            .add_patient(triaged("F002", 1, UrgencyLevel::Low))
            .unwrap();
        assert_eq!(queue.len(), 1);
    }
}

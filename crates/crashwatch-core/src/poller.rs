//! Periodic snapshot polling for dashboard consumers.

use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::aggregator::{Aggregator, MarketSnapshot};
use crate::cache::CacheMode;

const MIN_INTERVAL: Duration = Duration::from_millis(1);

/// Latest published snapshot, `None` before the first cycle completes.
pub type SnapshotReceiver = watch::Receiver<Option<Arc<MarketSnapshot>>>;

/// Polls the aggregator on an interval and publishes each snapshot.
///
/// Subscribers always observe whole snapshots; a cycle that is still running
/// never replaces the previous one.
pub struct DashboardPoller {
    aggregator: Aggregator,
    interval: Duration,
    sender: watch::Sender<Option<Arc<MarketSnapshot>>>,
}

impl DashboardPoller {
    pub fn new(aggregator: Aggregator, interval: Duration) -> Self {
        let (sender, _) = watch::channel(None);
        Self {
            aggregator,
            interval: interval.max(MIN_INTERVAL),
            sender,
        }
    }

    pub fn aggregator(&self) -> &Aggregator {
        &self.aggregator
    }

    pub const fn interval(&self) -> Duration {
        self.interval
    }

    pub fn latest(&self) -> Option<Arc<MarketSnapshot>> {
        self.sender.borrow().clone()
    }

    pub fn subscribe(&self) -> SnapshotReceiver {
        self.sender.subscribe()
    }

    /// Runs one cycle and publishes its snapshot.
    pub async fn poll_once(&self) -> Arc<MarketSnapshot> {
        let snapshot = Arc::new(self.aggregator.snapshot(CacheMode::Use).await);
        self.sender.send_replace(Some(Arc::clone(&snapshot)));
        snapshot
    }

    /// Polls until `cycles` snapshots were published, or forever with `None`.
    pub async fn run(&self, cycles: Option<u64>) {
        let published = self
            .run_each(cycles, |_| Ok::<(), Infallible>(()))
            .await;
        if let Err(never) = published {
            match never {}
        }
    }

    /// Like [`run`](Self::run), handing each published snapshot to
    /// `on_snapshot`. The first error stops polling and is returned.
    pub async fn run_each<F, E>(&self, cycles: Option<u64>, mut on_snapshot: F) -> Result<(), E>
    where
        F: FnMut(&MarketSnapshot) -> Result<(), E>,
    {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let mut completed = 0_u64;
        loop {
            ticker.tick().await;
            let snapshot = self.poll_once().await;
            completed += 1;
            tracing::debug!(
                cycle = completed,
                cycle_id = %snapshot.cycle_id,
                "snapshot published"
            );
            on_snapshot(&snapshot)?;

            if cycles.is_some_and(|limit| completed >= limit) {
                return Ok(());
            }
        }
    }

    /// Polls forever on a background task.
    pub fn spawn(self: Arc<Self>) -> JoinHandle<()> {
        tokio::spawn(async move { self.run(None).await })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregator::AggregatorConfig;
    use crate::cache::RevalidationWindows;
    use crate::http_client::FixtureHttpClient;
    use crate::retry::RetryConfig;

    fn offline_aggregator() -> Aggregator {
        Aggregator::builder()
            .with_http_client(Arc::new(FixtureHttpClient::new()))
            .with_config(AggregatorConfig {
                windows: RevalidationWindows::disabled(),
                retry: RetryConfig::no_retry(),
                ..AggregatorConfig::default()
            })
            .build()
    }

    #[tokio::test]
    async fn publishes_snapshots_to_subscribers() {
        let poller = DashboardPoller::new(offline_aggregator(), Duration::from_millis(5));
        let mut receiver = poller.subscribe();
        assert!(poller.latest().is_none());

        poller.run(Some(2)).await;

        assert!(receiver.has_changed().expect("sender alive"));
        let latest = receiver
            .borrow_and_update()
            .clone()
            .expect("snapshot published");
        assert_eq!(latest.indicators.len(), 6);
        assert_eq!(
            poller.latest().map(|snapshot| snapshot.cycle_id),
            Some(latest.cycle_id)
        );
    }

    #[tokio::test]
    async fn run_each_hands_over_every_cycle_and_stops_on_error() {
        let poller = DashboardPoller::new(offline_aggregator(), Duration::from_millis(5));

        let mut seen = Vec::new();
        poller
            .run_each(Some(3), |snapshot| {
                seen.push(snapshot.cycle_id);
                Ok::<(), &str>(())
            })
            .await
            .expect("no handler error");
        assert_eq!(seen.len(), 3);
        assert_eq!(poller.latest().map(|snapshot| snapshot.cycle_id), seen.last().copied());

        let mut calls = 0;
        let stopped = poller
            .run_each(None, |_| {
                calls += 1;
                Err("closed pipe")
            })
            .await;
        assert_eq!(stopped, Err("closed pipe"));
        assert_eq!(calls, 1);
    }

    #[tokio::test]
    async fn each_cycle_builds_a_new_snapshot() {
        let poller = DashboardPoller::new(offline_aggregator(), Duration::from_secs(60));

        let first = poller.poll_once().await;
        let second = poller.poll_once().await;

        assert_ne!(first.cycle_id, second.cycle_id);
    }
}

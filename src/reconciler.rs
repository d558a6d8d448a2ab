//! Live price reconciliation
//!
//! A subscription runs two tasks. The reader owns the feed connection and
//! forwards each message over an mpsc channel; the reconcile loop applies
//! messages in arrival order and publishes every merged result as a new
//! immutable [`LiveSnapshot`] through a `watch` channel.
//!
//! ```text
//! PriceFeed::connect()
//!     ↓
//! reader task ──mpsc──▶ reconcile loop
//!                           ↓ reconcile()
//!                       watch<Arc<LiveSnapshot>>
//!                           ↓
//!                       views (snapshot(), watch_snapshot())
//! ```
//!
//! A closed or failed stream moves the subscription to
//! [`FeedStatus::Disconnected`] for good; the last merged snapshot stays
//! readable. Reconnecting means subscribing again.

use crate::{
    constants::{FEED_CHANNEL_CAPACITY, FEED_EVENT_CAPACITY},
    error::StreamError,
    feed::{PriceFeed, PriceStream},
    types::{FeedEvent, FeedStatus, LiveSnapshot, PriceUpdate},
};
use futures::StreamExt;
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc, watch};
use tokio::task::JoinHandle;

/// Outcome of merging one message into a snapshot
#[derive(Debug, Clone, PartialEq)]
pub struct Reconciled {
    pub snapshot: LiveSnapshot,
    /// Ids in the message that matched the snapshot
    pub applied: usize,
    /// Ids in the message the snapshot does not track
    pub ignored: usize,
}

/// Merges a price message into a snapshot
///
/// Only `price_usd` of already tracked ids changes. Membership and order
/// are preserved, and ids the message does not mention keep their price.
pub fn reconcile(snapshot: &LiveSnapshot, update: &PriceUpdate) -> Reconciled {
    let prices = update.prices();
    let mut applied = 0;

    let assets = snapshot
        .assets()
        .iter()
        .map(|asset| match prices.get(&asset.id) {
            Some(price) => {
                applied += 1;
                let mut patched = asset.clone();
                patched.price_usd = price.clone();
                patched
            }
            None => asset.clone(),
        })
        .collect();

    Reconciled {
        snapshot: LiveSnapshot::new(assets),
        applied,
        ignored: update.len().saturating_sub(applied),
    }
}

enum FeedMessage {
    Prices(PriceUpdate),
    Closed(Option<StreamError>),
}

/// Subscribes snapshots to a streaming price feed
#[derive(Clone)]
pub struct LivePriceReconciler {
    feed: Arc<dyn PriceFeed>,
}

impl LivePriceReconciler {
    /// Reconciler whose subscriptions read from `feed`
    pub fn new(feed: Arc<dyn PriceFeed>) -> Self {
        Self { feed }
    }

    /// Starts merging live prices into `snapshot`
    ///
    /// Must be called within a tokio runtime. The subscription begins
    /// `Disconnected` and turns `Connected` once the feed accepts it.
    pub fn subscribe(&self, snapshot: LiveSnapshot) -> LiveSubscription {
        let (snapshot_tx, snapshot_rx) = watch::channel(Arc::new(snapshot));
        let (status_tx, status_rx) = watch::channel(FeedStatus::Disconnected);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let (events_tx, _) = broadcast::channel(FEED_EVENT_CAPACITY);

        let task = tokio::spawn(run(
            self.feed.clone(),
            snapshot_tx,
            status_tx,
            events_tx.clone(),
            shutdown_rx,
        ));

        LiveSubscription {
            snapshot_rx,
            status_rx,
            events_tx,
            shutdown_tx,
            task: Some(task),
        }
    }
}

/// Handle to a running live price subscription
///
/// Dropping the handle tears the feed connection down.
pub struct LiveSubscription {
    snapshot_rx: watch::Receiver<Arc<LiveSnapshot>>,
    status_rx: watch::Receiver<FeedStatus>,
    events_tx: broadcast::Sender<FeedEvent>,
    shutdown_tx: watch::Sender<bool>,
    task: Option<JoinHandle<()>>,
}

impl LiveSubscription {
    /// Latest merged snapshot
    pub fn snapshot(&self) -> Arc<LiveSnapshot> {
        self.snapshot_rx.borrow().clone()
    }

    /// Receiver notified on every merge that changed a price
    pub fn watch_snapshot(&self) -> watch::Receiver<Arc<LiveSnapshot>> {
        self.snapshot_rx.clone()
    }

    /// Current connection state
    pub fn status(&self) -> FeedStatus {
        *self.status_rx.borrow()
    }

    pub fn watch_status(&self) -> watch::Receiver<FeedStatus> {
        self.status_rx.clone()
    }

    /// Feed events emitted after this call
    pub fn events(&self) -> broadcast::Receiver<FeedEvent> {
        self.events_tx.subscribe()
    }

    /// Stops the feed and waits until the socket is released and the
    /// reconcile loop has exited
    pub async fn close(mut self) {
        let _ = self.shutdown_tx.send(true);
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }
}

impl Drop for LiveSubscription {
    fn drop(&mut self) {
        let _ = self.shutdown_tx.send(true);
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

async fn run(
    feed: Arc<dyn PriceFeed>,
    snapshot_tx: watch::Sender<Arc<LiveSnapshot>>,
    status_tx: watch::Sender<FeedStatus>,
    events_tx: broadcast::Sender<FeedEvent>,
    mut shutdown: watch::Receiver<bool>,
) {
    let stream = tokio::select! {
        result = feed.connect() => result,
        _ = shutdown.changed() => return,
    };

    let stream = match stream {
        Ok(stream) => stream,
        Err(e) => {
            tracing::warn!(feed = feed.feed_name(), error = %e, "Price feed connect failed");
            let _ = events_tx.send(FeedEvent::disconnected(Some(e.to_string())));
            return;
        }
    };

    status_tx.send_replace(FeedStatus::Connected);
    let _ = events_tx.send(FeedEvent::connected());
    tracing::info!(feed = feed.feed_name(), "Price feed connected");

    let (msg_tx, mut msg_rx) = mpsc::channel(FEED_CHANNEL_CAPACITY);
    let reader = tokio::spawn(read_feed(stream, msg_tx, shutdown.clone()));

    let reason = loop {
        tokio::select! {
            msg = msg_rx.recv() => match msg {
                Some(FeedMessage::Prices(update)) => {
                    let current = snapshot_tx.borrow().clone();
                    let merged = reconcile(&current, &update);
                    tracing::debug!(
                        applied = merged.applied,
                        ignored = merged.ignored,
                        "Applied price message"
                    );
                    let _ = events_tx.send(FeedEvent::prices_applied(merged.applied, merged.ignored));
                    if merged.applied > 0 {
                        snapshot_tx.send_replace(Arc::new(merged.snapshot));
                    }
                }
                Some(FeedMessage::Closed(reason)) => break reason,
                None => break None,
            },
            _ = shutdown.changed() => break None,
        }
    };

    // unblocks a reader parked on a full channel
    drop(msg_rx);
    let _ = reader.await;

    match &reason {
        Some(e) => tracing::warn!(error = %e, "Price feed disconnected"),
        None => tracing::info!("Price feed closed"),
    }
    let _ = events_tx.send(FeedEvent::disconnected(reason.map(|e| e.to_string())));
    status_tx.send_replace(FeedStatus::Disconnected);
}

async fn read_feed(
    mut stream: PriceStream,
    msg_tx: mpsc::Sender<FeedMessage>,
    mut shutdown: watch::Receiver<bool>,
) {
    loop {
        tokio::select! {
            next = stream.next() => {
                let msg = match next {
                    Some(Ok(update)) => FeedMessage::Prices(update),
                    Some(Err(e)) => FeedMessage::Closed(Some(e)),
                    None => FeedMessage::Closed(None),
                };
                let closing = matches!(msg, FeedMessage::Closed(_));
                if msg_tx.send(msg).await.is_err() || closing {
                    return;
                }
            }
            _ = shutdown.changed() => return,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feed::mock::MockFeed;
    use crate::types::Asset;
    use std::time::Duration;

    fn asset(id: &str, price: &str) -> Asset {
        let mut asset = Asset::new(id, id.to_uppercase(), id);
        asset.price_usd = price.to_string();
        asset
    }

    fn prices(snapshot: &LiveSnapshot) -> Vec<(String, String)> {
        snapshot
            .assets()
            .iter()
            .map(|a| (a.id.clone(), a.price_usd.clone()))
            .collect()
    }

    fn pairs(items: &[(&str, &str)]) -> Vec<(String, String)> {
        items
            .iter()
            .map(|(a, b)| (a.to_string(), b.to_string()))
            .collect()
    }

    #[test]
    fn test_reconcile_overwrites_known_ids() {
        let snapshot = LiveSnapshot::new(vec![asset("a", "1"), asset("b", "2")]);
        let merged = reconcile(&snapshot, &[("a", "5")].into_iter().collect());

        assert_eq!(prices(&merged.snapshot), pairs(&[("a", "5"), ("b", "2")]));
        assert_eq!(merged.applied, 1);
        assert_eq!(merged.ignored, 0);
    }

    #[test]
    fn test_reconcile_ignores_unknown_ids() {
        let snapshot = LiveSnapshot::new(vec![asset("a", "1"), asset("b", "2")]);
        let merged = reconcile(&snapshot, &[("c", "9")].into_iter().collect());

        assert_eq!(merged.snapshot.len(), 2);
        assert_eq!(prices(&merged.snapshot), pairs(&[("a", "1"), ("b", "2")]));
        assert_eq!(merged.applied, 0);
        assert_eq!(merged.ignored, 1);
    }

    #[test]
    fn test_reconcile_only_touches_price() {
        let mut btc = asset("bitcoin", "100");
        btc.change_percent_24_hr = "3.5".to_string();
        btc.rank = 1;
        let snapshot = LiveSnapshot::new(vec![btc.clone()]);

        let merged = reconcile(&snapshot, &[("bitcoin", "101")].into_iter().collect());
        let patched = &merged.snapshot.assets()[0];
        assert_eq!(patched.price_usd, "101");
        assert_eq!(patched.change_percent_24_hr, "3.5");
        assert_eq!(patched.rank, 1);
    }

    #[tokio::test]
    async fn test_subscription_applies_in_arrival_order() {
        let (feed, tx) = MockFeed::new();
        let reconciler = LivePriceReconciler::new(Arc::new(feed));
        let sub = reconciler.subscribe(LiveSnapshot::new(vec![asset("a", "1"), asset("b", "2")]));
        let mut snapshots = sub.watch_snapshot();

        tx.unbounded_send(Ok([("a", "5")].into_iter().collect())).unwrap();
        snapshots.changed().await.unwrap();
        assert_eq!(prices(&sub.snapshot()), pairs(&[("a", "5"), ("b", "2")]));
        assert_eq!(sub.status(), FeedStatus::Connected);

        // an unknown id publishes nothing; the next real change still lands
        tx.unbounded_send(Ok([("c", "9")].into_iter().collect())).unwrap();
        tx.unbounded_send(Ok([("a", "6")].into_iter().collect())).unwrap();
        tx.unbounded_send(Ok([("a", "7"), ("b", "3")].into_iter().collect()))
            .unwrap();

        let final_prices = pairs(&[("a", "7"), ("b", "3")]);
        tokio::time::timeout(Duration::from_secs(5), async {
            loop {
                snapshots.changed().await.unwrap();
                if prices(&snapshots.borrow_and_update()) == final_prices {
                    break;
                }
            }
        })
        .await
        .unwrap();
        assert_eq!(sub.snapshot().len(), 2);
    }

    #[tokio::test]
    async fn test_stream_close_disconnects_and_keeps_prices() {
        let (feed, tx) = MockFeed::new();
        let sub = LivePriceReconciler::new(Arc::new(feed))
            .subscribe(LiveSnapshot::new(vec![asset("a", "1")]));
        let mut status = sub.watch_status();
        let mut events = sub.events();

        status
            .wait_for(|s| *s == FeedStatus::Connected)
            .await
            .unwrap();
        tx.unbounded_send(Ok([("a", "2")].into_iter().collect())).unwrap();
        tx.unbounded_send(Err(StreamError::Protocol("reset".to_string())))
            .unwrap();

        status
            .wait_for(|s| *s == FeedStatus::Disconnected)
            .await
            .unwrap();
        assert_eq!(prices(&sub.snapshot()), pairs(&[("a", "2")]));

        let mut saw_disconnect = false;
        while let Ok(event) = events.try_recv() {
            if let FeedEvent::Disconnected { reason, .. } = event {
                assert_eq!(reason.as_deref(), Some("Protocol error: reset"));
                saw_disconnect = true;
            }
        }
        assert!(saw_disconnect);
    }

    #[tokio::test]
    async fn test_connect_failure_stays_disconnected() {
        let feed = MockFeed::failing(StreamError::Connect("refused".to_string()));
        let sub = LivePriceReconciler::new(Arc::new(feed))
            .subscribe(LiveSnapshot::new(vec![asset("a", "1")]));
        let mut events = sub.events();

        let event = tokio::time::timeout(Duration::from_secs(5), events.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(event.event_type(), "DISCONNECTED");
        assert_eq!(sub.status(), FeedStatus::Disconnected);
        assert_eq!(prices(&sub.snapshot()), pairs(&[("a", "1")]));
    }

    #[tokio::test]
    async fn test_drop_releases_feed() {
        let (feed, tx) = MockFeed::new();
        let sub = LivePriceReconciler::new(Arc::new(feed))
            .subscribe(LiveSnapshot::new(vec![asset("a", "1")]));
        sub.watch_status()
            .wait_for(|s| *s == FeedStatus::Connected)
            .await
            .unwrap();

        drop(sub);

        tokio::time::timeout(Duration::from_secs(5), async {
            while !tx.is_closed() {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn test_close_waits_for_disconnect() {
        let (feed, tx) = MockFeed::new();
        let sub = LivePriceReconciler::new(Arc::new(feed))
            .subscribe(LiveSnapshot::new(vec![asset("a", "1")]));
        let status = sub.watch_status();
        let mut ready = sub.watch_status();
        ready
            .wait_for(|s| *s == FeedStatus::Connected)
            .await
            .unwrap();

        sub.close().await;
        assert_eq!(*status.borrow(), FeedStatus::Disconnected);
        // the reader task dropped the stream before close returned
        assert!(tx.is_closed());
    }
}

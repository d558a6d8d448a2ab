//! Dashboard facade and view models
//!
//! Each view is loaded in one call and is either ready or failed. A failed
//! view carries a fixed user-facing message and holds no handle to the
//! data source, so it cannot issue further requests.
//!
//! ```no_run
//! use coincap_dashboard::{Dashboard, DashboardConfig, ViewState};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let dashboard = Dashboard::from_config(&DashboardConfig::from_env()?)?;
//!
//! match dashboard.listing().await {
//!     ViewState::Ready(mut listing) => {
//!         listing.set_query("bit");
//!         for row in listing.rows() {
//!             println!("{} {} {}", row.rank, row.symbol, row.price);
//!         }
//!     }
//!     ViewState::Failed { message, .. } => eprintln!("{}", message),
//! }
//! # Ok(())
//! # }
//! ```

use crate::{
    config::DashboardConfig,
    constants::DEFAULT_RANKING_SIZE,
    error::FetchError,
    favorites::{FavoritesStore, FileStore, KeyValueStore},
    feed::{CoinCapFeed, PriceFeed},
    fetcher::{fetch_detail, fetch_snapshot},
    format::{format_percent, format_price, format_usd_whole, Trend},
    ranking::{filter_by_query, top_gainers, top_losers},
    reconciler::{LivePriceReconciler, LiveSubscription},
    source::MarketDataSource,
    sources::CoinCapSource,
    types::{Asset, AssetDetail, ChartPoint, FavoriteOutcome, FeedStatus, LiveSnapshot, PricePoint},
};
use chrono::Utc;
use std::sync::Arc;

pub const LISTING_ERROR: &str = "Error fetching data";
pub const DETAIL_ERROR: &str = "Error: Asset data breach detected";
pub const FAVORITES_ERROR: &str = "Error: Favorite assets data breach detected";
pub const FAVORITES_EMPTY: &str = "No favorite assets yet. Add some from the main list!";

/// Favorites shared between views
pub type SharedFavorites = Arc<FavoritesStore<Arc<dyn KeyValueStore>>>;

/// A loaded view, or the fixed message to show instead of it
#[derive(Debug)]
pub enum ViewState<T> {
    Ready(T),
    Failed {
        message: &'static str,
        error: FetchError,
    },
}

impl<T> ViewState<T> {
    fn from_result(result: Result<T, FetchError>, message: &'static str) -> Self {
        match result {
            Ok(view) => ViewState::Ready(view),
            Err(error) => {
                tracing::warn!(error = %error, view_message = message, "View failed to load");
                ViewState::Failed { message, error }
            }
        }
    }

    /// Whether the view loaded
    pub fn is_ready(&self) -> bool {
        matches!(self, ViewState::Ready(_))
    }

    /// The loaded view, if any
    pub fn ready(&self) -> Option<&T> {
        match self {
            ViewState::Ready(view) => Some(view),
            ViewState::Failed { .. } => None,
        }
    }

    /// Consumes the state, keeping only a loaded view
    pub fn into_ready(self) -> Option<T> {
        match self {
            ViewState::Ready(view) => Some(view),
            ViewState::Failed { .. } => None,
        }
    }

    /// The error message, for failed views
    pub fn message(&self) -> Option<&'static str> {
        match self {
            ViewState::Ready(_) => None,
            ViewState::Failed { message, .. } => Some(*message),
        }
    }
}

/// Toast-style feedback for favorites actions
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub title: String,
    pub description: String,
}

impl Notification {
    fn for_add(outcome: FavoriteOutcome, id: &str) -> Self {
        match outcome {
            FavoriteOutcome::Added => Self {
                title: "Added to Favorites".to_string(),
                description: format!("{} has been added to your favorites.", id),
            },
            FavoriteOutcome::AlreadyPresent => Self {
                title: "Already in Favorites".to_string(),
                description: format!("{} is already in your favorites.", id),
            },
        }
    }

    fn for_remove() -> Self {
        Self {
            title: "Removed from Favorites".to_string(),
            description: "Asset has been removed from your favorites.".to_string(),
        }
    }
}

/// One formatted table row
#[derive(Debug, Clone, PartialEq)]
pub struct AssetRow {
    pub id: String,
    pub rank: u32,
    pub symbol: String,
    pub name: String,
    pub price: String,
    pub change: String,
    pub trend: Trend,
    pub market_cap: String,
    pub volume: String,
}

impl From<&Asset> for AssetRow {
    fn from(asset: &Asset) -> Self {
        let change = asset.change_percent_24h();
        Self {
            id: asset.id.clone(),
            rank: asset.rank,
            symbol: asset.symbol.clone(),
            name: asset.name.clone(),
            price: format_price(asset.price_usd()),
            change: format_percent(change),
            trend: Trend::of(change.unwrap_or(0.0)),
            market_cap: format_usd_whole(asset.market_cap_usd()),
            volume: format_usd_whole(asset.volume_usd_24h()),
        }
    }
}

fn rows<'a>(assets: impl IntoIterator<Item = &'a Asset>) -> Vec<AssetRow> {
    assets.into_iter().map(AssetRow::from).collect()
}

/// Entry point tying the data source, favorites storage and price feed together
pub struct Dashboard {
    source: Arc<dyn MarketDataSource>,
    favorites: SharedFavorites,
    reconciler: LivePriceReconciler,
}

impl Dashboard {
    /// Dashboard over explicit seams; used by tests and embedders
    pub fn new(
        source: Arc<dyn MarketDataSource>,
        storage: Arc<dyn KeyValueStore>,
        feed: Arc<dyn PriceFeed>,
    ) -> Self {
        Self {
            source,
            favorites: Arc::new(FavoritesStore::new(storage)),
            reconciler: LivePriceReconciler::new(feed),
        }
    }

    /// CoinCap REST source, file-backed favorites and the CoinCap websocket feed
    pub fn from_config(config: &DashboardConfig) -> Result<Self, FetchError> {
        let source = CoinCapSource::new(config)?;
        tracing::info!(
            api = %config.api_base_url,
            data_dir = %config.data_dir.display(),
            "Dashboard configured"
        );
        Ok(Self::new(
            Arc::new(source),
            Arc::new(FileStore::new(config.data_dir.clone())),
            Arc::new(CoinCapFeed::new(config.ws_url.clone())),
        ))
    }

    /// Favorites storage shared by every view
    pub fn favorites(&self) -> &SharedFavorites {
        &self.favorites
    }

    /// Loads the asset listing
    pub async fn listing(&self) -> ViewState<ListingView> {
        let result = fetch_snapshot(self.source.as_ref())
            .await
            .map(|snapshot| ListingView {
                snapshot: Arc::new(snapshot),
                query: String::new(),
                favorites: self.favorites.clone(),
                reconciler: self.reconciler.clone(),
                live: None,
            });
        ViewState::from_result(result, LISTING_ERROR)
    }

    /// Loads one asset with its 30-day history
    pub async fn detail(&self, id: &str) -> ViewState<DetailView> {
        let result = fetch_detail(self.source.as_ref(), id, Utc::now())
            .await
            .map(|detail| DetailView { detail });
        ViewState::from_result(result, DETAIL_ERROR)
    }

    /// Loads every favorite's current data, one request per id, concurrently
    pub async fn favorites_view(&self) -> ViewState<FavoritesView> {
        let ids = self.favorites.list();
        let fetches = ids.iter().map(|id| self.source.fetch_asset(id));
        let result = futures::future::join_all(fetches)
            .await
            .into_iter()
            .collect::<Result<Vec<Asset>, FetchError>>()
            .map(|assets| FavoritesView {
                assets,
                favorites: self.favorites.clone(),
            });
        ViewState::from_result(result, FAVORITES_ERROR)
    }
}

/// The main asset table with search and rankings
pub struct ListingView {
    snapshot: Arc<LiveSnapshot>,
    query: String,
    favorites: SharedFavorites,
    reconciler: LivePriceReconciler,
    live: Option<LiveSubscription>,
}

impl ListingView {
    /// Current snapshot, including live price merges when live
    pub fn snapshot(&self) -> Arc<LiveSnapshot> {
        match &self.live {
            Some(live) => live.snapshot(),
            None => self.snapshot.clone(),
        }
    }

    /// Current search text
    pub fn query(&self) -> &str {
        &self.query
    }

    /// Replaces the search text; rows and rankings follow it
    pub fn set_query(&mut self, query: impl Into<String>) {
        self.query = query.into();
    }

    /// Filtered table rows in rank order
    pub fn rows(&self) -> Vec<AssetRow> {
        let snapshot = self.snapshot();
        rows(filter_by_query(snapshot.assets(), &self.query))
    }

    /// The `n` best 24h performers among the filtered rows
    pub fn top_gainers(&self, n: usize) -> Vec<AssetRow> {
        let snapshot = self.snapshot();
        rows(top_gainers(filter_by_query(snapshot.assets(), &self.query), n))
    }

    /// The `n` worst 24h performers among the filtered rows
    pub fn top_losers(&self, n: usize) -> Vec<AssetRow> {
        let snapshot = self.snapshot();
        rows(top_losers(filter_by_query(snapshot.assets(), &self.query), n))
    }

    /// Default-sized gainers and losers
    pub fn movers(&self) -> (Vec<AssetRow>, Vec<AssetRow>) {
        (
            self.top_gainers(DEFAULT_RANKING_SIZE),
            self.top_losers(DEFAULT_RANKING_SIZE),
        )
    }

    /// Adds `id` to the favorites and describes the outcome
    pub fn add_favorite(&self, id: &str) -> Notification {
        Notification::for_add(self.favorites.add(id), id)
    }

    /// Starts merging live prices; a no-op while a connected feed exists
    ///
    /// After a disconnect, calling this again resubscribes from the last
    /// known prices.
    pub fn go_live(&mut self) {
        if let Some(live) = &self.live {
            if live.status() == FeedStatus::Connected {
                return;
            }
            self.snapshot = live.snapshot();
        }
        self.live = Some(self.reconciler.subscribe((*self.snapshot).clone()));
    }

    /// Stops the live feed, keeping the last merged prices
    pub fn stop_live(&mut self) {
        if let Some(live) = self.live.take() {
            self.snapshot = live.snapshot();
        }
    }

    /// The running live subscription, if any
    pub fn live(&self) -> Option<&LiveSubscription> {
        self.live.as_ref()
    }

    /// `Disconnected` when no subscription is running
    pub fn feed_status(&self) -> FeedStatus {
        self.live
            .as_ref()
            .map(LiveSubscription::status)
            .unwrap_or(FeedStatus::Disconnected)
    }
}

/// One asset's details and price chart
pub struct DetailView {
    detail: AssetDetail,
}

impl DetailView {
    /// Asset as of the detail fetch
    pub fn asset(&self) -> &Asset {
        &self.detail.asset
    }

    /// Daily samples, oldest first
    pub fn history(&self) -> &[PricePoint] {
        &self.detail.history
    }

    /// Points for the 30-day price chart
    pub fn chart(&self) -> Vec<ChartPoint> {
        self.detail.chart()
    }

    /// `Name (SYMBOL)`
    pub fn title(&self) -> String {
        format!("{} ({})", self.detail.asset.name, self.detail.asset.symbol)
    }

    /// Label/value pairs for the details panel
    pub fn summary(&self) -> Vec<(&'static str, String)> {
        let asset = &self.detail.asset;
        vec![
            ("Rank", asset.rank.to_string()),
            ("Price", format_price(asset.price_usd())),
            ("Market Cap", format_usd_whole(asset.market_cap_usd())),
            ("24h Change", format_percent(asset.change_percent_24h())),
            ("Volume (24h)", format_usd_whole(asset.volume_usd_24h())),
        ]
    }
}

/// Favorite assets, in the order they were added
pub struct FavoritesView {
    assets: Vec<Asset>,
    favorites: SharedFavorites,
}

impl FavoritesView {
    pub fn assets(&self) -> &[Asset] {
        &self.assets
    }

    /// Formatted rows, one per favorite
    pub fn rows(&self) -> Vec<AssetRow> {
        rows(&self.assets)
    }

    pub fn is_empty(&self) -> bool {
        self.assets.is_empty()
    }

    /// Drops `id` from storage and from this view
    pub fn remove(&mut self, id: &str) -> Notification {
        self.favorites.remove(id);
        self.assets.retain(|asset| asset.id != id);
        Notification::for_remove()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::favorites::MemoryStore;
    use crate::feed::mock::MockFeed;
    use crate::source::mock::MockSource;
    use std::time::Duration;

    fn asset(id: &str, name: &str, price: &str, change: &str) -> Asset {
        let mut asset = Asset::new(id, id.to_uppercase(), name);
        asset.price_usd = price.to_string();
        asset.change_percent_24_hr = change.to_string();
        asset.market_cap_usd = "1000000".to_string();
        asset
    }

    fn market() -> Vec<Asset> {
        vec![
            asset("bitcoin", "Bitcoin", "62000", "-3"),
            asset("ethereum", "Ethereum", "3100", "10"),
            asset("solana", "Solana", "150", "1"),
        ]
    }

    fn dashboard(source: Arc<MockSource>) -> (Dashboard, crate::feed::mock::FeedSender) {
        let (feed, tx) = MockFeed::new();
        let dashboard = Dashboard::new(source, Arc::new(MemoryStore::new()), Arc::new(feed));
        (dashboard, tx)
    }

    #[tokio::test]
    async fn test_listing_rows_and_rankings() {
        let (dashboard, _tx) = dashboard(Arc::new(MockSource::with_assets(market())));
        let mut listing = dashboard.listing().await.into_ready().unwrap();

        assert_eq!(listing.rows().len(), 3);
        let gainers: Vec<_> = listing.top_gainers(2).into_iter().map(|r| r.id).collect();
        assert_eq!(gainers, vec!["ethereum", "solana"]);
        let losers: Vec<_> = listing.top_losers(2).into_iter().map(|r| r.id).collect();
        assert_eq!(losers, vec!["bitcoin", "solana"]);

        listing.set_query("BIT");
        let rows = listing.rows();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].price, "$62,000.00");
        assert_eq!(rows[0].trend, Trend::Down);
    }

    #[tokio::test]
    async fn test_listing_failure_issues_no_further_requests() {
        let source = Arc::new(MockSource::with_assets(market()));
        source.fail_with_status(500);
        let (dashboard, _tx) = dashboard(source.clone());

        let view = dashboard.listing().await;
        assert!(!view.is_ready());
        assert_eq!(view.message(), Some(LISTING_ERROR));
        assert_eq!(source.call_count(), 1);
    }

    #[tokio::test]
    async fn test_add_favorite_notifications() {
        let (dashboard, _tx) = dashboard(Arc::new(MockSource::with_assets(market())));
        let listing = dashboard.listing().await.into_ready().unwrap();

        assert_eq!(listing.add_favorite("bitcoin").title, "Added to Favorites");
        assert_eq!(listing.add_favorite("bitcoin").title, "Already in Favorites");
        assert_eq!(dashboard.favorites().list(), vec!["bitcoin"]);
    }

    #[tokio::test]
    async fn test_favorites_view_fetches_each_id() {
        let source = Arc::new(MockSource::with_assets(market()));
        let (dashboard, _tx) = dashboard(source.clone());
        dashboard.favorites().add("solana");
        dashboard.favorites().add("bitcoin");

        let mut view = dashboard.favorites_view().await.into_ready().unwrap();
        let ids: Vec<_> = view.assets().iter().map(|a| a.id.clone()).collect();
        assert_eq!(ids, vec!["solana", "bitcoin"]);
        assert_eq!(source.call_count(), 2);

        let note = view.remove("solana");
        assert_eq!(note.title, "Removed from Favorites");
        assert_eq!(view.assets().len(), 1);
        assert_eq!(dashboard.favorites().list(), vec!["bitcoin"]);
    }

    #[tokio::test]
    async fn test_favorites_view_empty_makes_no_requests() {
        let source = Arc::new(MockSource::with_assets(market()));
        let (dashboard, _tx) = dashboard(source.clone());

        let view = dashboard.favorites_view().await.into_ready().unwrap();
        assert!(view.is_empty());
        assert_eq!(source.call_count(), 0);
    }

    #[tokio::test]
    async fn test_favorites_view_any_failure_fails_view() {
        let source = Arc::new(MockSource::with_assets(market()));
        let (dashboard, _tx) = dashboard(source);
        dashboard.favorites().add("bitcoin");
        dashboard.favorites().add("delisted-coin");

        let view = dashboard.favorites_view().await;
        assert_eq!(view.message(), Some(FAVORITES_ERROR));
    }

    #[tokio::test]
    async fn test_detail_view() {
        let source = Arc::new(MockSource::with_assets(market()));
        let (dashboard, _tx) = dashboard(source);

        let view = dashboard.detail("ethereum").await.into_ready().unwrap();
        assert_eq!(view.title(), "Ethereum (ETHEREUM)");
        assert_eq!(view.summary()[1], ("Price", "$3,100.00".to_string()));
        assert_eq!(view.summary()[3], ("24h Change", "10.00%".to_string()));
    }

    #[tokio::test]
    async fn test_detail_view_failure_message() {
        let source = Arc::new(MockSource::with_assets(market()));
        source.fail_history_for("ethereum");
        let (dashboard, _tx) = dashboard(source);

        let view = dashboard.detail("ethereum").await;
        assert_eq!(view.message(), Some(DETAIL_ERROR));
    }

    #[tokio::test]
    async fn test_live_listing_reorders_nothing_and_updates_prices() {
        let (dashboard, tx) = dashboard(Arc::new(MockSource::with_assets(market())));
        let mut listing = dashboard.listing().await.into_ready().unwrap();
        assert_eq!(listing.feed_status(), FeedStatus::Disconnected);

        listing.go_live();
        let mut snapshots = listing.live().unwrap().watch_snapshot();
        tx.unbounded_send(Ok([("solana", "175.5"), ("dogecoin", "0.1")]
            .into_iter()
            .collect()))
            .unwrap();

        tokio::time::timeout(Duration::from_secs(5), snapshots.changed())
            .await
            .unwrap()
            .unwrap();

        let rows = listing.rows();
        let ids: Vec<_> = rows.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["bitcoin", "ethereum", "solana"]);
        assert_eq!(rows[2].price, "$175.50");

        listing.stop_live();
        assert_eq!(listing.feed_status(), FeedStatus::Disconnected);
        assert_eq!(listing.rows()[2].price, "$175.50");
    }
}

//! # CoinCap Dashboard
//!
//! Data layer of a cryptocurrency price dashboard backed by the public
//! CoinCap API: asset listings, 30-day price history, locally persisted
//! favorites, and live prices merged from the CoinCap price socket.
//!
//! Presentation (tables, charts, routing) is left to the caller; views
//! here hand out plain rows, chart points and formatted strings.
//!
//! ## Usage
//!
//! ```no_run
//! use coincap_dashboard::{Dashboard, DashboardConfig, ViewState};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let dashboard = Dashboard::from_config(&DashboardConfig::from_env()?)?;
//!
//! if let ViewState::Ready(mut listing) = dashboard.listing().await {
//!     listing.go_live();
//!     let (gainers, losers) = listing.movers();
//!     println!("top gainer: {:?}", gainers.first().map(|r| &r.symbol));
//!     println!("top loser:  {:?}", losers.first().map(|r| &r.symbol));
//!
//!     listing.add_favorite("bitcoin");
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! MarketDataSource (CoinCap REST)
//!     ↓ fetch_snapshot / fetch_detail
//! LiveSnapshot ◀── LivePriceReconciler ◀── PriceFeed (CoinCap websocket)
//!     ↓
//! filter_by_query → top_gainers / top_losers
//!     ↓
//! ListingView / DetailView / FavoritesView ◀── FavoritesStore (KeyValueStore)
//! ```

pub mod config;
pub mod constants;
pub mod dashboard;
pub mod error;
pub mod favorites;
pub mod feed;
pub mod fetcher;
pub mod format;
pub mod ranking;
pub mod reconciler;
pub mod source;
pub mod sources;
pub mod types;

// Re-export commonly used types
pub use config::DashboardConfig;
pub use dashboard::{
    AssetRow, Dashboard, DetailView, FavoritesView, ListingView, Notification, ViewState,
};
pub use error::{ConfigError, FetchError, StorageError, StreamError};
pub use favorites::{FavoritesStore, FileStore, KeyValueStore, MemoryStore};
pub use feed::{CoinCapFeed, PriceFeed, PriceStream};
pub use reconciler::{reconcile, LivePriceReconciler, LiveSubscription};
pub use source::MarketDataSource;
pub use sources::CoinCapSource;
pub use types::{
    Asset, AssetDetail, ChartPoint, FavoriteOutcome, FeedEvent, FeedStatus, LiveSnapshot,
    PricePoint, PriceUpdate,
};

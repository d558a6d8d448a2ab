//! Constants for the CoinCap dashboard
//!
//! Compile-time defaults. Every value here can be overridden at runtime
//! through [`DashboardConfig`](crate::config::DashboardConfig) except the
//! history window and storage key, which are part of the dashboard's
//! observable behavior.

/// CoinCap REST API base URL
pub const COINCAP_API_URL: &str = "https://api.coincap.io/v2";

/// CoinCap streaming price socket, subscribed to every asset
pub const COINCAP_WS_URL: &str = "wss://ws.coincap.io/prices?assets=ALL";

/// Listing endpoint, relative to the API base
pub const ASSETS_ENDPOINT: &str = "/assets";

/// Interval parameter for the history endpoint (daily samples)
pub const HISTORY_INTERVAL: &str = "d1";

/// Lookback window of the detail view's price history (in days)
pub const HISTORY_LOOKBACK_DAYS: i64 = 30;

/// HTTP request timeout (in seconds)
pub const REQUEST_TIMEOUT_SECS: u64 = 10;

/// Attempts per REST call; 1 means failures are not retried
pub const DEFAULT_FETCH_ATTEMPTS: u32 = 1;

/// Initial backoff delay between REST attempts (in milliseconds)
pub const INITIAL_BACKOFF_MS: u64 = 500;

/// Maximum backoff delay between REST attempts (in milliseconds)
pub const MAX_BACKOFF_MS: u64 = 8000;

/// Size of the top gainers / top losers lists
pub const DEFAULT_RANKING_SIZE: usize = 5;

/// Storage key holding the JSON array of favorite asset ids
pub const FAVORITES_KEY: &str = "favorites";

/// Default directory for the file-backed key-value store
pub const DEFAULT_DATA_DIR: &str = ".coincap-dashboard";

/// Capacity of the channel between the socket task and the reconcile loop
pub const FEED_CHANNEL_CAPACITY: usize = 256;

/// Capacity of the feed event broadcast channel
pub const FEED_EVENT_CAPACITY: usize = 64;

/// User agent for HTTP requests
pub const USER_AGENT: &str = "coincap-dashboard/0.1.0";

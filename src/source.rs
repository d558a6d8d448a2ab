//! Request/response seam for the pricing API

use crate::{
    error::FetchError,
    types::{Asset, PricePoint},
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// Trait for market data sources
///
/// Implementations answer the three REST calls the dashboard makes. The
/// CoinCap implementation lives in [`sources`](crate::sources); tests use
/// in-memory fakes.
#[async_trait]
pub trait MarketDataSource: Send + Sync {
    /// Fetches every tracked asset, ranked by market capitalization
    async fn fetch_assets(&self) -> Result<Vec<Asset>, FetchError>;

    /// Fetches a single asset by id
    async fn fetch_asset(&self, id: &str) -> Result<Asset, FetchError>;

    /// Fetches daily price samples for `id` between `start` and `end`, oldest first
    async fn fetch_history(
        &self,
        id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<PricePoint>, FetchError>;

    /// Returns the name of this source
    fn source_name(&self) -> &'static str;
}

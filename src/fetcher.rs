//! Snapshot and detail fetching

use crate::{
    constants::HISTORY_LOOKBACK_DAYS,
    error::FetchError,
    source::MarketDataSource,
    types::{AssetDetail, LiveSnapshot},
};
use chrono::{DateTime, Duration, Utc};

/// Fetches the current asset listing as a fresh snapshot
pub async fn fetch_snapshot(source: &dyn MarketDataSource) -> Result<LiveSnapshot, FetchError> {
    let assets = source.fetch_assets().await?;
    tracing::debug!(
        count = assets.len(),
        source = source.source_name(),
        "Fetched asset snapshot"
    );
    Ok(LiveSnapshot::new(assets))
}

/// History window ending at `now`
pub fn history_window(now: DateTime<Utc>) -> (DateTime<Utc>, DateTime<Utc>) {
    (now - Duration::days(HISTORY_LOOKBACK_DAYS), now)
}

/// Fetches an asset and its 30-day daily history ending at `now`
///
/// Both requests are in flight together and both are awaited; the first
/// error (detail before history) is returned if either fails.
pub async fn fetch_detail(
    source: &dyn MarketDataSource,
    id: &str,
    now: DateTime<Utc>,
) -> Result<AssetDetail, FetchError> {
    let (start, end) = history_window(now);

    let (asset, history) = tokio::join!(
        source.fetch_asset(id),
        source.fetch_history(id, start, end)
    );

    match (asset, history) {
        (Ok(asset), Ok(history)) => {
            tracing::debug!(asset = id, samples = history.len(), "Fetched asset detail");
            Ok(AssetDetail { asset, history })
        }
        (Err(e), _) | (_, Err(e)) => {
            tracing::warn!(asset = id, error = %e, "Asset detail fetch failed");
            Err(e)
        }
    }
}

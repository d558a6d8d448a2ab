//! CoinCap REST source implementation

use crate::{
    config::DashboardConfig,
    constants::{
        ASSETS_ENDPOINT, HISTORY_INTERVAL, INITIAL_BACKOFF_MS, MAX_BACKOFF_MS, USER_AGENT,
    },
    error::FetchError,
    source::MarketDataSource,
    types::{Asset, PricePoint},
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{header, Client, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::{Duration, Instant};
use tokio::time::sleep;

/// Every CoinCap response wraps its payload in `{ "data": ... }`
#[derive(Debug, Deserialize)]
struct Envelope<T> {
    data: Option<T>,
}

/// CoinCap market data source
pub struct CoinCapSource {
    client: Client,
    base_url: String,
    max_attempts: u32,
}

impl CoinCapSource {
    /// Creates a CoinCap source from the dashboard configuration
    pub fn new(config: &DashboardConfig) -> Result<Self, FetchError> {
        let mut headers = header::HeaderMap::new();
        if let Some(key) = &config.api_key {
            let value = header::HeaderValue::from_str(&format!("Bearer {}", key))
                .map_err(|e| FetchError::InvalidResponse(format!("Invalid API key: {}", e)))?;
            headers.insert(header::AUTHORIZATION, value);
        }

        let client = Client::builder()
            .timeout(config.request_timeout)
            .user_agent(USER_AGENT)
            .default_headers(headers)
            .build()
            .map_err(FetchError::Network)?;

        Ok(Self {
            client,
            base_url: config.api_base_url.trim_end_matches('/').to_string(),
            max_attempts: config.fetch_attempts.max(1),
        })
    }

    fn assets_url(&self) -> String {
        format!("{}{}", self.base_url, ASSETS_ENDPOINT)
    }

    fn asset_url(&self, id: &str) -> String {
        format!("{}{}/{}", self.base_url, ASSETS_ENDPOINT, id)
    }

    fn history_url(&self, id: &str, start: DateTime<Utc>, end: DateTime<Utc>) -> String {
        format!(
            "{}{}/{}/history?interval={}&start={}&end={}",
            self.base_url,
            ASSETS_ENDPOINT,
            id,
            HISTORY_INTERVAL,
            start.timestamp_millis(),
            end.timestamp_millis()
        )
    }

    /// GETs `url` and unwraps the `data` envelope, retrying retryable
    /// failures with exponential backoff up to `max_attempts`
    async fn get_data<T: DeserializeOwned>(&self, url: &str) -> Result<Option<T>, FetchError> {
        let mut backoff_ms = INITIAL_BACKOFF_MS;
        let start = Instant::now();

        for attempt in 1..=self.max_attempts {
            match self.get_once(url).await {
                Ok(data) => {
                    tracing::debug!(
                        url = url,
                        attempt = attempt,
                        latency_ms = start.elapsed().as_millis() as u64,
                        "Fetched from CoinCap"
                    );
                    return Ok(data);
                }
                Err(e) if e.is_retryable() && attempt < self.max_attempts => {
                    tracing::warn!(
                        attempt = attempt,
                        max_attempts = self.max_attempts,
                        error = %e,
                        "CoinCap request failed, retrying"
                    );
                    sleep(Duration::from_millis(backoff_ms)).await;
                    backoff_ms = next_backoff(backoff_ms);
                }
                Err(e) => {
                    tracing::warn!(url = url, error = %e, "CoinCap request failed");
                    return Err(e);
                }
            }
        }

        Err(FetchError::InvalidResponse(
            "Max retries exceeded".to_string(),
        ))
    }

    async fn get_once<T: DeserializeOwned>(&self, url: &str) -> Result<Option<T>, FetchError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(FetchError::Network)?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(FetchError::RateLimited);
        }
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            return Err(FetchError::Status {
                status: status.as_u16(),
                body: response.text().await.unwrap_or_default(),
            });
        }

        let body = response.text().await.map_err(FetchError::Network)?;
        let envelope: Envelope<T> = serde_json::from_str(&body).map_err(|e| {
            FetchError::InvalidResponse(format!(
                "Failed to parse CoinCap response: {}. Response: {}",
                e, body
            ))
        })?;

        Ok(envelope.data)
    }
}

/// Doubles the delay, capped at `MAX_BACKOFF_MS`
fn next_backoff(current_ms: u64) -> u64 {
    current_ms.saturating_mul(2).min(MAX_BACKOFF_MS)
}

#[async_trait]
impl MarketDataSource for CoinCapSource {
    async fn fetch_assets(&self) -> Result<Vec<Asset>, FetchError> {
        let assets: Vec<Asset> = self
            .get_data(&self.assets_url())
            .await?
            .ok_or_else(|| FetchError::InvalidResponse("Listing has no data".to_string()))?;

        tracing::debug!(count = assets.len(), "Fetched asset listing");
        Ok(assets)
    }

    async fn fetch_asset(&self, id: &str) -> Result<Asset, FetchError> {
        self.get_data(&self.asset_url(id))
            .await?
            .ok_or_else(|| FetchError::NotFound(id.to_string()))
    }

    async fn fetch_history(
        &self,
        id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<PricePoint>, FetchError> {
        let mut points: Vec<PricePoint> = self
            .get_data(&self.history_url(id, start, end))
            .await?
            .ok_or_else(|| FetchError::NotFound(id.to_string()))?;

        points.sort_by_key(|p| p.time);
        tracing::debug!(asset = id, count = points.len(), "Fetched price history");
        Ok(points)
    }

    fn source_name(&self) -> &'static str {
        "coincap"
    }
}

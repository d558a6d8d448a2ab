//! Types for the dashboard

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// One tracked cryptocurrency and its current market metrics
///
/// Decimal fields are kept as the strings CoinCap sends. Use the typed
/// accessors (`price_usd()`, `change_percent_24h()`, ...) for arithmetic or
/// comparison; they return `None` when the upstream value is missing or
/// not numeric.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Asset {
    /// Unique identifier (e.g. "bitcoin"); the join key everywhere
    pub id: String,

    /// Ticker symbol; not guaranteed unique upstream
    pub symbol: String,

    /// Display name
    #[serde(default)]
    pub name: String,

    /// Rank by market capitalization, 1 being the largest
    #[serde(deserialize_with = "wire::rank")]
    pub rank: u32,

    #[serde(default, deserialize_with = "wire::decimal")]
    pub price_usd: String,

    #[serde(default, deserialize_with = "wire::decimal")]
    pub change_percent_24_hr: String,

    #[serde(default, deserialize_with = "wire::decimal")]
    pub market_cap_usd: String,

    #[serde(default, deserialize_with = "wire::decimal")]
    pub volume_usd_24_hr: String,

    #[serde(default, deserialize_with = "wire::decimal")]
    pub supply: String,

    /// Absent for assets without a supply cap
    #[serde(default)]
    pub max_supply: Option<String>,

    #[serde(default, deserialize_with = "wire::decimal")]
    pub vwap_24_hr: String,

    /// Block explorer link, when CoinCap knows one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explorer: Option<String>,
}

impl Asset {
    /// Creates an asset with only identity fields set; numeric fields are empty
    pub fn new(id: impl Into<String>, symbol: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            symbol: symbol.into(),
            name: name.into(),
            rank: 0,
            price_usd: String::new(),
            change_percent_24_hr: String::new(),
            market_cap_usd: String::new(),
            volume_usd_24_hr: String::new(),
            supply: String::new(),
            max_supply: None,
            vwap_24_hr: String::new(),
            explorer: None,
        }
    }

    /// Price in USD
    pub fn price_usd(&self) -> Option<f64> {
        parse_decimal(&self.price_usd)
    }

    /// Signed 24h change, in percent
    pub fn change_percent_24h(&self) -> Option<f64> {
        parse_decimal(&self.change_percent_24_hr)
    }

    /// Market capitalization in USD
    pub fn market_cap_usd(&self) -> Option<f64> {
        parse_decimal(&self.market_cap_usd)
    }

    /// Trading volume over the last 24h, in USD
    pub fn volume_usd_24h(&self) -> Option<f64> {
        parse_decimal(&self.volume_usd_24_hr)
    }

    /// Circulating supply
    pub fn supply(&self) -> Option<f64> {
        parse_decimal(&self.supply)
    }

    /// Supply cap; `None` for uncapped assets
    pub fn max_supply(&self) -> Option<f64> {
        self.max_supply.as_deref().and_then(parse_decimal)
    }

    /// Volume-weighted average price over the last 24h
    pub fn vwap_24h(&self) -> Option<f64> {
        parse_decimal(&self.vwap_24_hr)
    }

    /// Label used by search and tables: the name, or the symbol when unnamed
    pub fn label(&self) -> &str {
        if self.name.is_empty() {
            &self.symbol
        } else {
            &self.name
        }
    }
}

/// Parses a numeric-looking API string; empty or non-finite values yield `None`
pub fn parse_decimal(raw: &str) -> Option<f64> {
    raw.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

/// One historical price sample
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PricePoint {
    /// Sample time (epoch milliseconds on the wire)
    #[serde(with = "wire::timestamp_ms")]
    pub time: DateTime<Utc>,

    #[serde(deserialize_with = "wire::decimal")]
    pub price_usd: String,
}

impl PricePoint {
    /// Sampled price in USD
    pub fn price_usd(&self) -> Option<f64> {
        parse_decimal(&self.price_usd)
    }

    /// Chart-ready sample: calendar date and numeric price
    pub fn chart_point(&self) -> Option<ChartPoint> {
        self.price_usd().map(|price| ChartPoint {
            date: self.time.date_naive(),
            price,
        })
    }
}

/// A point on the detail view's line chart
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ChartPoint {
    pub date: chrono::NaiveDate,
    pub price: f64,
}

/// A single asset with its recent daily price history (oldest first)
#[derive(Debug, Clone, PartialEq)]
pub struct AssetDetail {
    pub asset: Asset,
    pub history: Vec<PricePoint>,
}

impl AssetDetail {
    /// Chart points for the history, skipping samples without a usable price
    pub fn chart(&self) -> Vec<ChartPoint> {
        self.history.iter().filter_map(PricePoint::chart_point).collect()
    }
}

/// The list of assets currently displayed
///
/// Immutable once built: live price merges produce a new snapshot rather
/// than patching this one.
#[derive(Debug, Clone, PartialEq)]
pub struct LiveSnapshot {
    assets: Vec<Asset>,
    updated_at: DateTime<Utc>,
}

impl LiveSnapshot {
    /// Snapshot stamped with the current time
    pub fn new(assets: Vec<Asset>) -> Self {
        Self {
            assets,
            updated_at: Utc::now(),
        }
    }

    /// Assets in upstream rank order
    pub fn assets(&self) -> &[Asset] {
        &self.assets
    }

    /// Looks an asset up by id
    pub fn get(&self, id: &str) -> Option<&Asset> {
        self.assets.iter().find(|a| a.id == id)
    }

    pub fn len(&self) -> usize {
        self.assets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assets.is_empty()
    }

    /// When the snapshot was fetched or last patched
    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }
}

/// One message from the price feed: asset id -> new price string
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PriceUpdate(HashMap<String, String>);

impl PriceUpdate {
    pub fn new(prices: HashMap<String, String>) -> Self {
        Self(prices)
    }

    /// Prices keyed by asset id
    pub fn prices(&self) -> &HashMap<String, String> {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for PriceUpdate {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

/// Connection state of the live price reconciler
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeedStatus {
    /// Initial state, and the state after every stream close
    Disconnected,
    /// Subscribed and applying updates
    Connected,
}

/// Events emitted by a live subscription
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FeedEvent {
    /// Feed connection established
    Connected { id: Uuid, timestamp: DateTime<Utc> },

    /// A feed message was merged into the snapshot
    PricesApplied {
        id: Uuid,
        applied: usize,
        ignored: usize,
        timestamp: DateTime<Utc>,
    },

    /// Feed closed; `reason` is set when it closed on an error
    Disconnected {
        id: Uuid,
        reason: Option<String>,
        timestamp: DateTime<Utc>,
    },
}

impl FeedEvent {
    pub fn connected() -> Self {
        FeedEvent::Connected {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
        }
    }

    pub fn prices_applied(applied: usize, ignored: usize) -> Self {
        FeedEvent::PricesApplied {
            id: Uuid::new_v4(),
            applied,
            ignored,
            timestamp: Utc::now(),
        }
    }

    pub fn disconnected(reason: Option<String>) -> Self {
        FeedEvent::Disconnected {
            id: Uuid::new_v4(),
            reason,
            timestamp: Utc::now(),
        }
    }

    /// Get the event ID
    pub fn id(&self) -> Uuid {
        match self {
            FeedEvent::Connected { id, .. } => *id,
            FeedEvent::PricesApplied { id, .. } => *id,
            FeedEvent::Disconnected { id, .. } => *id,
        }
    }

    /// Get the event type as string
    pub fn event_type(&self) -> &'static str {
        match self {
            FeedEvent::Connected { .. } => "CONNECTED",
            FeedEvent::PricesApplied { .. } => "PRICES_APPLIED",
            FeedEvent::Disconnected { .. } => "DISCONNECTED",
        }
    }
}

impl std::fmt::Display for FeedEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FeedEvent::Connected { .. } => write!(f, "Price feed connected"),
            FeedEvent::PricesApplied {
                applied, ignored, ..
            } => write!(f, "Applied {} prices ({} untracked)", applied, ignored),
            FeedEvent::Disconnected {
                reason: Some(reason),
                ..
            } => write!(f, "Price feed disconnected: {}", reason),
            FeedEvent::Disconnected { reason: None, .. } => write!(f, "Price feed disconnected"),
        }
    }
}

/// Result of adding an id to the favorites
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FavoriteOutcome {
    Added,
    AlreadyPresent,
}

impl FavoriteOutcome {
    pub fn is_added(&self) -> bool {
        matches!(self, FavoriteOutcome::Added)
    }
}

/// Serde helpers for CoinCap's wire format
mod wire {
    use serde::{Deserialize, Deserializer};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum StringOrNumber {
        Str(String),
        Num(serde_json::Number),
    }

    /// CoinCap sends `rank` as a string ("1"); accept a bare number too.
    pub fn rank<'de, D>(deserializer: D) -> Result<u32, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = match StringOrNumber::deserialize(deserializer)? {
            StringOrNumber::Str(s) => s,
            StringOrNumber::Num(n) => n.to_string(),
        };
        raw.trim()
            .parse::<u32>()
            .map_err(|_| serde::de::Error::custom(format!("Invalid rank: {}", raw)))
    }

    /// Decimal strings may arrive as `null` or as bare numbers.
    pub fn decimal<'de, D>(deserializer: D) -> Result<String, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(
            match Option::<StringOrNumber>::deserialize(deserializer)? {
                Some(StringOrNumber::Str(s)) => s,
                Some(StringOrNumber::Num(n)) => n.to_string(),
                None => String::new(),
            },
        )
    }

    pub mod timestamp_ms {
        use chrono::{DateTime, Utc};
        use serde::{Deserialize, Deserializer, Serializer};

        pub fn serialize<S>(time: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
        where
            S: Serializer,
        {
            serializer.serialize_i64(time.timestamp_millis())
        }

        pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
        where
            D: Deserializer<'de>,
        {
            let millis = i64::deserialize(deserializer)?;
            DateTime::<Utc>::from_timestamp_millis(millis)
                .ok_or_else(|| serde::de::Error::custom(format!("Invalid timestamp: {}", millis)))
        }
    }
}

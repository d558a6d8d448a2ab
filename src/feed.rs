//! Streaming price feed seam and the CoinCap websocket implementation

use crate::{error::StreamError, types::PriceUpdate};
use async_trait::async_trait;
use futures::stream::{BoxStream, StreamExt};
use futures::future;
use tokio_tungstenite::tungstenite::Message;

/// Inbound price messages, in arrival order. The stream ends when the
/// server closes the connection; dropping it closes the socket.
pub type PriceStream = BoxStream<'static, Result<PriceUpdate, StreamError>>;

/// Trait for streaming price feeds
#[async_trait]
pub trait PriceFeed: Send + Sync {
    /// Opens a subscription to every asset's price
    async fn connect(&self) -> Result<PriceStream, StreamError>;

    /// Returns the name of this feed
    fn feed_name(&self) -> &'static str;
}

/// CoinCap `prices` websocket feed
pub struct CoinCapFeed {
    url: String,
}

impl CoinCapFeed {
    /// Feed reading from the websocket at `url`
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }
}

/// Parses one text frame; malformed frames yield `None`
pub fn parse_price_message(text: &str) -> Option<PriceUpdate> {
    match serde_json::from_str::<PriceUpdate>(text) {
        Ok(update) => Some(update),
        Err(e) => {
            tracing::debug!(error = %e, "Failed to parse price message");
            None
        }
    }
}

#[async_trait]
impl PriceFeed for CoinCapFeed {
    async fn connect(&self) -> Result<PriceStream, StreamError> {
        tracing::info!(url = %self.url, "Connecting to CoinCap price feed");

        let (ws_stream, _resp) = tokio_tungstenite::connect_async(self.url.as_str())
            .await
            .map_err(|e| StreamError::Connect(e.to_string()))?;

        let stream = ws_stream
            .take_while(|msg| future::ready(!matches!(msg, Ok(Message::Close(_)))))
            .filter_map(|msg| {
                future::ready(match msg {
                    Ok(Message::Text(text)) => parse_price_message(&text).map(Ok),
                    // tungstenite answers pings on its own
                    Ok(_) => None,
                    Err(e) => Some(Err(StreamError::Protocol(e.to_string()))),
                })
            });

        Ok(stream.boxed())
    }

    fn feed_name(&self) -> &'static str {
        "coincap-ws"
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_price_message() {
        let update = parse_price_message(r#"{"bitcoin":"62011.12","tether":"1.0001"}"#).unwrap();
        assert_eq!(update.len(), 2);
        assert_eq!(update.prices()["tether"], "1.0001");
    }

    #[test]
    fn test_parse_price_message_rejects_non_map() {
        assert!(parse_price_message("not json").is_none());
        assert!(parse_price_message(r#"["bitcoin"]"#).is_none());
        assert!(parse_price_message(r#"{"bitcoin": 5}"#).is_none());
    }
}

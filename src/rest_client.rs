//! REST retrieval of depth snapshots
//!
//! [`DepthSource`] is the seam between the collector and the venue; the
//! Binance implementation lives here and tests substitute in-memory sources.

use crate::config::CollectorConfig;
use crate::data::{OrderBookSnapshot, RawLevel, Segment};
use crate::error::{CollectorError, FeatureError};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Depth payload as returned by the venue
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DepthSnapshot {
    #[serde(rename = "lastUpdateId", default)]
    pub last_update_id: u64,
    pub bids: Vec<RawLevel>,
    pub asks: Vec<RawLevel>,
}

impl DepthSnapshot {
    /// Validate into an engine-ready snapshot
    pub fn into_snapshot(self, segment: Segment) -> Result<OrderBookSnapshot, FeatureError> {
        OrderBookSnapshot::from_raw(segment, &self.bids, &self.asks)
    }
}

/// Source of raw depth snapshots
#[async_trait]
pub trait DepthSource: Send + Sync {
    /// Fetch one depth snapshot for `symbol` in `segment`
    async fn fetch_depth(&self, symbol: &str, segment: Segment, limit: u32) -> Result<DepthSnapshot, CollectorError>;
}

/// Binance public REST client
pub struct BinanceRestClient {
    spot_endpoint: String,
    future_endpoint: String,
    http_client: reqwest::Client,
}

impl BinanceRestClient {
    /// Create from collector configuration
    pub fn new(config: &CollectorConfig) -> Result<Self, CollectorError> {
        let http_client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| CollectorError::Configuration(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            spot_endpoint: config.spot_endpoint.trim_end_matches('/').to_string(),
            future_endpoint: config.future_endpoint.trim_end_matches('/').to_string(),
            http_client,
        })
    }

    /// Depth URL for a segment
    pub fn depth_url(&self, segment: Segment) -> String {
        match segment {
            Segment::Spot => format!("{}/api/v3/depth", self.spot_endpoint),
            Segment::Future => format!("{}/fapi/v1/depth", self.future_endpoint),
        }
    }
}

#[async_trait]
impl DepthSource for BinanceRestClient {
    async fn fetch_depth(&self, symbol: &str, segment: Segment, limit: u32) -> Result<DepthSnapshot, CollectorError> {
        let url = self.depth_url(segment);
        tracing::debug!("GET {} symbol={} limit={}", url, symbol, limit);

        let response = self
            .http_client
            .get(&url)
            .query(&[("symbol", symbol.to_uppercase()), ("limit", limit.to_string())])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(CollectorError::Http {
                status: status.as_u16(),
                body,
            });
        }

        let snapshot = response.json::<DepthSnapshot>().await?;
        Ok(snapshot)
    }
}

impl std::fmt::Debug for BinanceRestClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BinanceRestClient")
            .field("spot_endpoint", &self.spot_endpoint)
            .field("future_endpoint", &self.future_endpoint)
            .finish()
    }
}

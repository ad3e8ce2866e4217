//! Collector configuration

use crate::data::Segment;
use crate::error::CollectorError;
use crate::features::FeatureConfig;
use crate::retry::RetryPolicy;
use std::time::Duration;

pub const DEFAULT_SPOT_ENDPOINT: &str = "https://api.binance.com";
pub const DEFAULT_FUTURE_ENDPOINT: &str = "https://fapi.binance.com";
pub const DEFAULT_DEPTH_LIMIT: u32 = 1000;
/// Largest depth the spot endpoint serves per request
pub const MAX_SPOT_DEPTH_LIMIT: u32 = 5000;
/// Largest depth the futures endpoint serves per request
pub const MAX_FUTURE_DEPTH_LIMIT: u32 = 1000;

/// Collector configuration
#[derive(Debug, Clone)]
pub struct CollectorConfig {
    pub symbols: Vec<String>,
    pub segments: Vec<Segment>,
    pub depth_limit: u32,
    pub spot_endpoint: String,
    pub future_endpoint: String,
    pub timeout: Duration,
    pub retry: RetryPolicy,
    pub features: FeatureConfig,
    /// Poll every interval; `None` collects once
    pub interval: Option<Duration>,
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            symbols: vec!["BNBUSDT".to_string(), "LINKUSDT".to_string()],
            segments: vec![Segment::Spot, Segment::Future],
            depth_limit: DEFAULT_DEPTH_LIMIT,
            spot_endpoint: DEFAULT_SPOT_ENDPOINT.to_string(),
            future_endpoint: DEFAULT_FUTURE_ENDPOINT.to_string(),
            timeout: Duration::from_secs(10),
            retry: RetryPolicy::default(),
            features: FeatureConfig::default(),
            interval: None,
        }
    }
}

impl CollectorConfig {
    /// Load from `COLLECTOR_*` environment variables, reading `.env` first
    ///
    /// Unset variables keep their defaults.
    pub fn from_env() -> Result<Self, CollectorError> {
        if let Err(e) = dotenvy::dotenv() {
            tracing::debug!("No .env file loaded: {}", e);
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, CollectorError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(symbols) = lookup("COLLECTOR_SYMBOLS") {
            config.symbols = split_list(&symbols).map(|s| s.to_uppercase()).collect();
        }

        if let Some(segments) = lookup("COLLECTOR_SEGMENTS") {
            config.segments = split_list(&segments)
                .map(|s| s.parse::<Segment>())
                .collect::<Result<_, _>>()
                .map_err(CollectorError::Configuration)?;
        }

        if let Some(limit) = lookup("COLLECTOR_DEPTH_LIMIT") {
            config.depth_limit = parse_number("COLLECTOR_DEPTH_LIMIT", &limit)?;
        }

        if let Some(endpoint) = lookup("COLLECTOR_SPOT_ENDPOINT") {
            config.spot_endpoint = endpoint;
        }

        if let Some(endpoint) = lookup("COLLECTOR_FUTURE_ENDPOINT") {
            config.future_endpoint = endpoint;
        }

        if let Some(secs) = lookup("COLLECTOR_TIMEOUT_SECS") {
            config.timeout = Duration::from_secs(parse_number("COLLECTOR_TIMEOUT_SECS", &secs)?);
        }

        if let Some(secs) = lookup("COLLECTOR_INTERVAL_SECS") {
            let secs: u64 = parse_number("COLLECTOR_INTERVAL_SECS", &secs)?;
            config.interval = (secs > 0).then(|| Duration::from_secs(secs));
        }

        config.validate()?;
        Ok(config)
    }

    /// Base URL for a segment
    pub fn endpoint(&self, segment: Segment) -> &str {
        match segment {
            Segment::Spot => &self.spot_endpoint,
            Segment::Future => &self.future_endpoint,
        }
    }

    /// Depth to request for a segment, capped at what its endpoint serves
    pub fn depth_limit_for(&self, segment: Segment) -> u32 {
        let max = match segment {
            Segment::Spot => MAX_SPOT_DEPTH_LIMIT,
            Segment::Future => MAX_FUTURE_DEPTH_LIMIT,
        };
        self.depth_limit.min(max)
    }

    /// Validate configuration parameters
    pub fn validate(&self) -> Result<(), CollectorError> {
        if self.symbols.is_empty() {
            return Err(CollectorError::Configuration("At least one symbol is required".to_string()));
        }

        if self.segments.is_empty() {
            return Err(CollectorError::Configuration("At least one segment is required".to_string()));
        }

        if self.depth_limit == 0 || self.depth_limit > MAX_SPOT_DEPTH_LIMIT {
            return Err(CollectorError::Configuration(format!(
                "Depth limit must be in 1..={}",
                MAX_SPOT_DEPTH_LIMIT
            )));
        }

        for endpoint in [&self.spot_endpoint, &self.future_endpoint] {
            let url = url::Url::parse(endpoint)
                .map_err(|e| CollectorError::Configuration(format!("Invalid endpoint {}: {}", endpoint, e)))?;
            if url.scheme() != "http" && url.scheme() != "https" {
                return Err(CollectorError::Configuration(format!(
                    "Endpoint must be an HTTP(S) URL: {}",
                    endpoint
                )));
            }
        }

        if self.timeout.is_zero() {
            return Err(CollectorError::Configuration("Timeout must be greater than 0".to_string()));
        }

        self.retry.validate().map_err(CollectorError::Configuration)?;
        self.features.validate()?;

        Ok(())
    }
}

fn split_list(value: &str) -> impl Iterator<Item = &str> {
    value.split(',').map(str::trim).filter(|s| !s.is_empty())
}

fn parse_number<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, CollectorError> {
    value
        .trim()
        .parse()
        .map_err(|_| CollectorError::Configuration(format!("{} must be a number, got {:?}", key, value)))
}

//! # Order Book Features
//!
//! Microstructure feature extraction from point-in-time order book depth
//! snapshots, plus a small collector that pulls spot and futures depth from
//! Binance and emits one merged feature row per symbol.
//!
//! ## Quick Start
//! ```rust,ignore
//! use orderbook_features::prelude::*;
//!
//! let bids: Vec<RawLevel> = vec![["100.0".into(), "5".into()], ["99.0".into(), "3".into()]];
//! let asks: Vec<RawLevel> = vec![["101.0".into(), "4".into()], ["102.0".into(), "2".into()]];
//!
//! let record = FeatureEngine::default().compute_raw(Segment::Spot, &bids, &asks)?;
//! assert_eq!(record.get("spotSpread"), Some(1.0));
//! ```

pub mod collector;
pub mod config;
pub mod data;
pub mod error;
pub mod features;
pub mod liquidity;
pub mod merge;
pub mod orderbook;
pub mod rest_client;
pub mod retry;
pub mod stats;
pub mod whale_detection;

pub use data::*;
pub use error::*;

pub use features::{
    Feature, FeatureConfig, FeatureEngine, FeatureRecord, UnavailableMetric, UnavailableReason,
};

pub use orderbook::{AggregatedLevels, LevelAggregator};

pub use whale_detection::{LargeOrders, WhaleActivity};

// Collection pipeline exports
pub use collector::{Collector, SymbolResult};
pub use config::CollectorConfig;
pub use merge::{MergedRecord, SnapshotMerger};
pub use rest_client::{BinanceRestClient, DepthSnapshot, DepthSource};
pub use retry::RetryPolicy;

/// Prelude - minimal public API surface
///
/// Import with: `use orderbook_features::prelude::*;`
pub mod prelude {
    // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
    // FEATURE EXTRACTION
    // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

    /// Engine and its output
    pub use crate::features::{FeatureConfig, FeatureEngine, FeatureRecord, UnavailableReason};

    /// Core data types
    pub use crate::data::{BookSide, OrderBookSnapshot, PriceLevel, RawLevel, RawValue, Segment};

    /// Errors
    pub use crate::error::{CollectorError, FeatureError};

    // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
    // OPTIONAL: Collection
    // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
    pub use crate::collector::Collector;
    pub use crate::config::CollectorConfig;
    pub use crate::merge::MergedRecord;
    pub use crate::rest_client::{BinanceRestClient, DepthSource};
}

/// Initialize logging
///
/// Honors `RUST_LOG`, defaulting to `info`.
pub fn init_logging() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();
}

//! Order book feature engine
//!
//! Turns one [`OrderBookSnapshot`] into a flat, segment-prefixed set of
//! microstructure features: volume balance, support/resistance, spread and
//! near-market liquidity, price-bracket distribution, large-order impact,
//! sentiment, depth imbalance, concentration, VWAP, cumulative-depth
//! slippage and whale activity.
//!
//! Groups run in a fixed order and every group re-derives what it needs
//! from the two aggregated sides. A metric whose inputs are undefined (an
//! empty side, a zero denominator) is listed in
//! [`FeatureRecord::unavailable`] instead of being emitted.
//!
//! ## Example
//!
//! ```rust,ignore
//! use orderbook_features::prelude::*;
//!
//! let snapshot = OrderBookSnapshot::from_raw(Segment::Spot, &bids, &asks)?;
//! let record = FeatureEngine::default().compute(&snapshot);
//!
//! println!("spread = {:?}", record.get("spotSpread"));
//! for skipped in record.unavailable() {
//!     println!("{} unavailable: {}", skipped.name, skipped.reason);
//! }
//! ```

use crate::data::{BookSide, OrderBookSnapshot, Segment};
use crate::error::FeatureError;
use crate::liquidity;
use crate::orderbook::{AggregatedLevels, LevelAggregator};
use crate::stats::QuantileBrackets;
use crate::whale_detection::{LargeOrders, WhaleActivity};
use serde::{Deserialize, Serialize};
use std::fmt;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// CONFIGURATION
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Tuning for the feature engine
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureConfig {
    /// Support/resistance levels to emit per side
    pub support_levels: usize,
    /// Fractional band around the market price for near-market volume
    pub near_market_band: f64,
    /// Fractional band for the concentration ratios
    pub concentration_band: f64,
    /// Equal-frequency price brackets per side
    pub price_brackets: usize,
    /// Volume quantile marking a large order (impact and sentiment)
    pub large_order_quantile: f64,
    /// Volume quantile marking a whale order
    pub whale_quantile: f64,
    /// Depth-imbalance ranges, in percent of the market price
    pub depth_ranges_pct: Vec<u32>,
    /// Levels considered for VWAP, in native order
    pub vwap_depth: usize,
    /// Order-size percentiles for cumulative-depth price movement
    pub movement_percentiles: Vec<u32>,
}

impl Default for FeatureConfig {
    fn default() -> Self {
        Self {
            support_levels: 5,
            near_market_band: 0.005,
            concentration_band: 0.005,
            price_brackets: 10,
            large_order_quantile: 0.95,
            whale_quantile: 0.99,
            depth_ranges_pct: vec![1, 2, 5],
            vwap_depth: 100,
            movement_percentiles: vec![95, 99],
        }
    }
}

impl FeatureConfig {
    /// Validate configuration parameters
    pub fn validate(&self) -> Result<(), FeatureError> {
        if self.price_brackets == 0 {
            return Err(FeatureError::Configuration("Price brackets must be greater than 0".to_string()));
        }

        if self.vwap_depth == 0 {
            return Err(FeatureError::Configuration("VWAP depth must be greater than 0".to_string()));
        }

        for (name, band) in [
            ("Near-market band", self.near_market_band),
            ("Concentration band", self.concentration_band),
        ] {
            if !(band > 0.0 && band < 1.0) {
                return Err(FeatureError::Configuration(format!("{} must be in (0, 1)", name)));
            }
        }

        for (name, q) in [
            ("Large order quantile", self.large_order_quantile),
            ("Whale quantile", self.whale_quantile),
        ] {
            if !(0.0..=1.0).contains(&q) {
                return Err(FeatureError::Configuration(format!("{} must be in [0, 1]", name)));
            }
        }

        if self.depth_ranges_pct.iter().any(|&pct| pct == 0 || pct >= 100) {
            return Err(FeatureError::Configuration("Depth ranges must be in 1..=99 percent".to_string()));
        }

        if self.movement_percentiles.iter().any(|&pct| pct > 100) {
            return Err(FeatureError::Configuration("Movement percentiles must be at most 100".to_string()));
        }

        Ok(())
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// FEATURE RECORD
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Why a metric was not computed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnavailableReason {
    /// The side has no levels
    EmptySide(BookSide),
    /// The side's total volume is zero
    ZeroVolume(BookSide),
    /// Bids and asks together carry no volume
    ZeroCombinedVolume,
    /// Inputs were valid but the result overflowed to NaN or infinity
    NonFinite,
}

impl fmt::Display for UnavailableReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnavailableReason::EmptySide(side) => write!(f, "{} side is empty", side),
            UnavailableReason::ZeroVolume(side) => write!(f, "{} side has zero volume", side),
            UnavailableReason::ZeroCombinedVolume => write!(f, "book has zero volume"),
            UnavailableReason::NonFinite => write!(f, "result is not finite"),
        }
    }
}

/// A metric that was skipped, with the reason
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnavailableMetric {
    pub name: String,
    pub reason: UnavailableReason,
}

/// One named feature value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feature {
    pub name: String,
    pub value: f64,
}

/// Features computed from one snapshot
///
/// Keys are `{segment}{MetricName}[_{index}]` and keep emission order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureRecord {
    segment: Segment,
    features: Vec<Feature>,
    unavailable: Vec<UnavailableMetric>,
}

impl FeatureRecord {
    fn new(segment: Segment) -> Self {
        Self {
            segment,
            features: Vec::new(),
            unavailable: Vec::new(),
        }
    }

    pub fn segment(&self) -> Segment {
        self.segment
    }

    /// Look up a feature by its full (prefixed) name
    pub fn get(&self, name: &str) -> Option<f64> {
        self.features.iter().find(|f| f.name == name).map(|f| f.value)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Features in emission order
    pub fn features(&self) -> &[Feature] {
        &self.features
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.features.iter().map(|f| (f.name.as_str(), f.value))
    }

    /// Metrics that could not be computed
    pub fn unavailable(&self) -> &[UnavailableMetric] {
        &self.unavailable
    }

    pub fn is_unavailable(&self, name: &str) -> bool {
        self.unavailable.iter().any(|u| u.name == name)
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    pub fn into_parts(self) -> (Vec<Feature>, Vec<UnavailableMetric>) {
        (self.features, self.unavailable)
    }
}

impl fmt::Display for FeatureRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Features[{}]: {} computed, {} unavailable",
            self.segment,
            self.features.len(),
            self.unavailable.len()
        )
    }
}

/// Accumulates prefixed features and skips for one snapshot
struct RecordBuilder {
    record: FeatureRecord,
}

impl RecordBuilder {
    fn new(segment: Segment) -> Self {
        Self {
            record: FeatureRecord::new(segment),
        }
    }

    fn key(&self, metric: &str) -> String {
        format!("{}{}", self.record.segment.prefix(), metric)
    }

    /// Emit `value`; an overflowed result is recorded as unavailable
    fn put(&mut self, metric: &str, value: f64) {
        if !value.is_finite() {
            return self.skip(metric, UnavailableReason::NonFinite);
        }
        let name = self.key(metric);
        self.record.features.push(Feature { name, value });
    }

    /// Emit `value`, or record the metric as unavailable
    fn put_or_skip(&mut self, metric: &str, value: Result<f64, UnavailableReason>) {
        match value {
            Ok(value) => self.put(metric, value),
            Err(reason) => self.skip(metric, reason),
        }
    }

    fn skip(&mut self, metric: &str, reason: UnavailableReason) {
        let name = self.key(metric);
        self.record.unavailable.push(UnavailableMetric { name, reason });
    }

    fn finish(self) -> FeatureRecord {
        self.record
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// AVAILABILITY HELPERS
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

fn non_empty(side: &AggregatedLevels) -> Result<(), UnavailableReason> {
    if side.is_empty() {
        Err(UnavailableReason::EmptySide(side.side()))
    } else {
        Ok(())
    }
}

fn both_sides(bids: &AggregatedLevels, asks: &AggregatedLevels) -> Result<(), UnavailableReason> {
    non_empty(bids)?;
    non_empty(asks)
}

/// Side's total volume, if it is usable as a denominator
fn side_volume(side: &AggregatedLevels) -> Result<f64, UnavailableReason> {
    non_empty(side)?;
    let total = side.total_volume();
    if total > 0.0 {
        Ok(total)
    } else {
        Err(UnavailableReason::ZeroVolume(side.side()))
    }
}

fn market_price(bids: &AggregatedLevels, asks: &AggregatedLevels) -> Result<f64, UnavailableReason> {
    both_sides(bids, asks)?;
    liquidity::market_price(bids, asks).ok_or(UnavailableReason::EmptySide(BookSide::Bid))
}

fn side_label(side: BookSide) -> (&'static str, &'static str) {
    // (singular, plural) as used in feature names
    match side {
        BookSide::Bid => ("Bid", "Bids"),
        BookSide::Ask => ("Ask", "Asks"),
    }
}

fn pct_key(pct: u32) -> String {
    format!("{:.1}", pct as f64)
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// FEATURE ENGINE
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Stateless order book feature extractor
///
/// Holds only configuration; every call to [`compute`](Self::compute)
/// allocates its own intermediates, so one engine can be shared freely.
#[derive(Debug, Clone, Default)]
pub struct FeatureEngine {
    config: FeatureConfig,
}

impl FeatureEngine {
    /// Create an engine with default tuning
    pub fn new() -> Self {
        Self::default()
    }

    /// Create with custom config
    pub fn with_config(config: FeatureConfig) -> Result<Self, FeatureError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &FeatureConfig {
        &self.config
    }

    /// Compute every feature group for one snapshot
    pub fn compute(&self, snapshot: &OrderBookSnapshot) -> FeatureRecord {
        let bids = LevelAggregator::aggregate(BookSide::Bid, snapshot.bids());
        let asks = LevelAggregator::aggregate(BookSide::Ask, snapshot.asks());
        let mut out = RecordBuilder::new(snapshot.segment());

        self.volume_balance(&mut out, &bids, &asks);
        self.support_resistance(&mut out, &bids, &asks);
        self.spread_and_liquidity(&mut out, &bids, &asks);
        self.volume_distribution(&mut out, &bids, &asks);
        self.price_impact(&mut out, &bids, &asks);
        self.market_sentiment(&mut out, &bids, &asks);
        self.depth_imbalance(&mut out, &bids, &asks);
        self.near_market_concentration(&mut out, &bids, &asks);
        self.vwap(&mut out, &bids, &asks);
        self.price_movement(&mut out, &bids, &asks);
        self.whale_activity(&mut out, &bids, &asks);

        let record = out.finish();
        tracing::debug!(
            segment = %record.segment(),
            bids = bids.len(),
            asks = asks.len(),
            computed = record.len(),
            unavailable = record.unavailable().len(),
            "Computed order book features"
        );
        record
    }

    /// Parse raw venue pairs and compute features in one step
    pub fn compute_raw(
        &self,
        segment: Segment,
        bids: &[crate::data::RawLevel],
        asks: &[crate::data::RawLevel],
    ) -> Result<FeatureRecord, FeatureError> {
        let snapshot = OrderBookSnapshot::from_raw(segment, bids, asks)?;
        Ok(self.compute(&snapshot))
    }

    /// Share of combined volume on each side
    fn volume_balance(&self, out: &mut RecordBuilder, bids: &AggregatedLevels, asks: &AggregatedLevels) {
        let combined = both_sides(bids, asks).and_then(|_| {
            let total = bids.total_volume() + asks.total_volume();
            if total > 0.0 {
                Ok(total)
            } else {
                Err(UnavailableReason::ZeroCombinedVolume)
            }
        });

        out.put_or_skip("TotalBidVolumeRatio", combined.map(|total| bids.total_volume() / total));
        out.put_or_skip("TotalAskVolumeRatio", combined.map(|total| asks.total_volume() / total));
    }

    /// Highest-volume prices on each side
    fn support_resistance(&self, out: &mut RecordBuilder, bids: &AggregatedLevels, asks: &AggregatedLevels) {
        for (side, metric) in [(bids, "Support"), (asks, "Resistance")] {
            match non_empty(side) {
                Ok(()) => {
                    for (i, level) in side.ranked_by_volume().iter().take(self.config.support_levels).enumerate() {
                        out.put(&format!("{}_{}", metric, i), level.price);
                    }
                }
                Err(reason) => {
                    for i in 0..self.config.support_levels {
                        out.skip(&format!("{}_{}", metric, i), reason);
                    }
                }
            }
        }
    }

    /// Spread and the share of each side resting near the market price
    fn spread_and_liquidity(&self, out: &mut RecordBuilder, bids: &AggregatedLevels, asks: &AggregatedLevels) {
        let market = market_price(bids, asks);

        let spread = market.and_then(|_| match (bids.best_price(), asks.best_price()) {
            (Some(best_bid), Some(best_ask)) => {
                if best_bid > best_ask {
                    tracing::warn!("Crossed order book detected: bid={}, ask={}", best_bid, best_ask);
                }
                Ok(best_ask - best_bid)
            }
            _ => Err(UnavailableReason::EmptySide(BookSide::Ask)),
        });
        out.put_or_skip("Spread", spread);

        for side in [bids, asks] {
            let (_, plural) = side_label(side.side());
            let value = market.and_then(|market| {
                let total = side_volume(side)?;
                Ok(liquidity::volume_near_market(side, market, self.config.near_market_band) / total)
            });
            out.put_or_skip(&format!("Total{}VolumeNearMarket", plural), value);
        }
    }

    /// Volume share per equal-frequency price bracket, in percent
    fn volume_distribution(&self, out: &mut RecordBuilder, bids: &AggregatedLevels, asks: &AggregatedLevels) {
        let count = self.config.price_brackets;

        for side in [bids, asks] {
            let (singular, _) = side_label(side.side());
            let metric = |i: usize| format!("{}VolumePercentage_{}", singular, i);

            let shares = side_volume(side).and_then(|_| {
                let brackets = QuantileBrackets::new(&side.prices(), count)
                    .ok_or(UnavailableReason::EmptySide(side.side()))?;
                let relative = side.relative_volumes().ok_or(UnavailableReason::ZeroVolume(side.side()))?;

                let mut shares = vec![0.0; count];
                for (level, share) in side.native().iter().zip(relative) {
                    shares[brackets.index_of(level.price)] += share;
                }
                Ok(shares)
            });

            match shares {
                Ok(shares) => {
                    for (i, share) in shares.into_iter().enumerate() {
                        out.put(&metric(i), share);
                    }
                }
                Err(reason) => {
                    for i in 0..count {
                        out.skip(&metric(i), reason);
                    }
                }
            }
        }
    }

    /// Large-order notional normalized by the side's total volume
    fn price_impact(&self, out: &mut RecordBuilder, bids: &AggregatedLevels, asks: &AggregatedLevels) {
        for side in [bids, asks] {
            let (_, plural) = side_label(side.side());
            let value = side_volume(side).and_then(|total| {
                let large = LargeOrders::detect(side, self.config.large_order_quantile)
                    .ok_or(UnavailableReason::EmptySide(side.side()))?;
                Ok(large.notional() / total)
            });
            out.put_or_skip(&format!("PriceImpact{}", plural), value);
        }
    }

    /// Market price, bid/ask volume ratio and large-order counts
    fn market_sentiment(&self, out: &mut RecordBuilder, bids: &AggregatedLevels, asks: &AggregatedLevels) {
        out.put_or_skip("MarketPrice", market_price(bids, asks));

        let ratio = non_empty(bids).and_then(|_| Ok(bids.total_volume() / side_volume(asks)?));
        out.put_or_skip("BidToAskRatio", ratio);

        // Threshold evaluated afresh, independent of the price-impact group
        for side in [bids, asks] {
            let (_, plural) = side_label(side.side());
            let count = LargeOrders::detect(side, self.config.large_order_quantile)
                .map(|large| large.count() as f64)
                .ok_or(UnavailableReason::EmptySide(side.side()));
            out.put_or_skip(&format!("Large{}Count", plural), count);
        }
    }

    /// Bid depth minus ask depth within each range of the market price
    fn depth_imbalance(&self, out: &mut RecordBuilder, bids: &AggregatedLevels, asks: &AggregatedLevels) {
        let market = market_price(bids, asks);

        for &pct in &self.config.depth_ranges_pct {
            let range = pct as f64 / 100.0;
            let value = market.map(|market| {
                liquidity::depth_within(bids, market, range) - liquidity::depth_within(asks, market, range)
            });
            out.put_or_skip(&format!("DepthImbalance_{}", pct_key(pct)), value);
        }
    }

    /// Share of each side's volume within the concentration band
    fn near_market_concentration(&self, out: &mut RecordBuilder, bids: &AggregatedLevels, asks: &AggregatedLevels) {
        let market = market_price(bids, asks);

        for side in [bids, asks] {
            let (_, plural) = side_label(side.side());
            let value = market.and_then(|market| {
                let total = side_volume(side)?;
                Ok(liquidity::volume_concentrated(side, market, self.config.concentration_band) / total)
            });
            out.put_or_skip(&format!("{}ConcentrationNearMarketRatio", plural), value);
        }
    }

    /// VWAP of the top levels in native order
    fn vwap(&self, out: &mut RecordBuilder, bids: &AggregatedLevels, asks: &AggregatedLevels) {
        for side in [bids, asks] {
            let (_, plural) = side_label(side.side());
            let value = non_empty(side).and_then(|_| {
                liquidity::vwap(side, self.config.vwap_depth).ok_or(UnavailableReason::ZeroVolume(side.side()))
            });
            out.put_or_skip(&format!("Vwap{}", plural), value);
        }
    }

    /// How far the price walks to fill a percentile-sized order
    fn price_movement(&self, out: &mut RecordBuilder, bids: &AggregatedLevels, asks: &AggregatedLevels) {
        let market = market_price(bids, asks);

        for side in [bids, asks] {
            let (singular, _) = side_label(side.side());
            for &pct in &self.config.movement_percentiles {
                let value = market.and_then(|market| {
                    liquidity::price_movement(side, market, pct as f64 / 100.0)
                        .ok_or(UnavailableReason::EmptySide(side.side()))
                });
                out.put_or_skip(&format!("Large{}PriceMovementRange_{}", singular, pct_key(pct)), value);
            }
        }
    }

    /// Whale share of volume and relative whale size
    fn whale_activity(&self, out: &mut RecordBuilder, bids: &AggregatedLevels, asks: &AggregatedLevels) {
        let activity = [bids, asks].map(|side| {
            let whales = WhaleActivity::analyze(side, self.config.whale_quantile)
                .ok_or(UnavailableReason::EmptySide(side.side()));
            (side.side(), whales)
        });

        for (side, whales) in &activity {
            let (_, plural) = side_label(*side);
            let value = whales
                .clone()
                .and_then(|w| w.distribution_ratio.ok_or(UnavailableReason::ZeroVolume(*side)));
            out.put_or_skip(&format!("Large{}DistributionRatio", plural), value);
        }

        for (side, whales) in &activity {
            let (_, plural) = side_label(*side);
            let value = whales
                .clone()
                .and_then(|w| w.relative_mean_size.ok_or(UnavailableReason::ZeroVolume(*side)));
            out.put_or_skip(&format!("Large{}RelativeMeanSize", plural), value);
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// TESTS
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

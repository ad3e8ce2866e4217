//! Large-order and whale detection within a single snapshot
//!
//! An order is "large" when its volume reaches a chosen quantile of its
//! side's volume distribution. The price-impact and sentiment groups use the
//! 95th percentile; whale activity uses the 99th. Every caller evaluates its
//! own threshold, nothing is cached between groups.
//!
//! ```rust,ignore
//! use orderbook_features::whale_detection::{LargeOrders, WhaleActivity};
//!
//! let large = LargeOrders::detect(&bids, 0.95).unwrap();
//! println!("{} large bids above {}", large.count(), large.threshold());
//!
//! let whales = WhaleActivity::analyze(&bids, 0.99).unwrap();
//! println!("whale share {:.2}", whales.distribution_ratio.unwrap_or_default());
//! ```

use crate::data::PriceLevel;
use crate::orderbook::{AggregatedLevels, LevelAggregator};
use crate::stats;
use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// LARGE ORDERS
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Raw levels whose volume is at or above a quantile threshold
#[derive(Debug, Clone, PartialEq)]
pub struct LargeOrders {
    threshold: f64,
    levels: Vec<PriceLevel>,
}

impl LargeOrders {
    /// Select levels with `volume >= quantile(volumes, q)`
    ///
    /// Returns `None` for an empty side.
    pub fn detect(side: &AggregatedLevels, q: f64) -> Option<Self> {
        let threshold = stats::quantile(&side.volumes(), q)?;
        let levels = side
            .native()
            .iter()
            .filter(|level| level.volume >= threshold)
            .copied()
            .collect();

        Some(Self { threshold, levels })
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    pub fn levels(&self) -> &[PriceLevel] {
        &self.levels
    }

    pub fn count(&self) -> usize {
        self.levels.len()
    }

    /// Sum of price * volume over the large levels
    pub fn notional(&self) -> f64 {
        self.levels.iter().map(PriceLevel::notional).sum()
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// WHALE ACTIVITY
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Whale statistics for one side of a snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WhaleActivity {
    /// Volume threshold a level had to reach
    pub threshold: f64,
    /// Number of raw levels at or above the threshold
    pub whale_count: usize,
    /// Number of distinct prices carrying whale volume
    pub whale_prices: usize,
    /// Whale volume (grouped by price) over the side's total volume
    pub distribution_ratio: Option<f64>,
    /// Mean of whale volume / side's mean order size
    pub relative_mean_size: Option<f64>,
}

impl WhaleActivity {
    /// Analyze one side at quantile `q`; `None` for an empty side
    ///
    /// Ratios are `None` when the side carries no volume.
    pub fn analyze(side: &AggregatedLevels, q: f64) -> Option<Self> {
        let large = LargeOrders::detect(side, q)?;
        let grouped = LevelAggregator::aggregate(side.side(), large.levels());

        let total = side.total_volume();
        let distribution_ratio = (total > 0.0).then(|| grouped.total_volume() / total);

        let relative_mean_size = side
            .mean_volume()
            .filter(|mean| *mean > 0.0)
            .and_then(|mean| {
                let relative: Vec<f64> = large.levels().iter().map(|l| l.volume / mean).collect();
                stats::mean(&relative)
            });

        Some(Self {
            threshold: large.threshold(),
            whale_count: large.count(),
            whale_prices: grouped.by_price().len(),
            distribution_ratio,
            relative_mean_size,
        })
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// TESTS
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

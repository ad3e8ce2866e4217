//! Per-side level aggregation

use crate::data::{BookSide, PriceLevel};
use std::cmp::Ordering;

/// Groups one side's raw levels by price
pub struct LevelAggregator;

impl LevelAggregator {
    /// Aggregate one side of a snapshot
    pub fn aggregate(side: BookSide, levels: &[PriceLevel]) -> AggregatedLevels {
        AggregatedLevels::new(side, levels)
    }
}

/// One side of a snapshot with duplicate prices collapsed
///
/// Keeps the raw levels in their native order alongside the per-price
/// totals, since some metrics scan the venue order and others rank by
/// aggregated volume.
#[derive(Debug, Clone, PartialEq)]
pub struct AggregatedLevels {
    side: BookSide,
    /// Raw levels, native order
    levels: Vec<PriceLevel>,
    /// Summed volume per unique price, ascending price
    by_price: Vec<PriceLevel>,
    total_volume: f64,
}

impl AggregatedLevels {
    fn new(side: BookSide, levels: &[PriceLevel]) -> Self {
        let mut sorted = levels.to_vec();
        sorted.sort_by(|a, b| a.price.total_cmp(&b.price));

        let mut by_price: Vec<PriceLevel> = Vec::with_capacity(sorted.len());
        for level in sorted {
            match by_price.last_mut() {
                Some(last) if last.price == level.price => last.volume += level.volume,
                _ => by_price.push(level),
            }
        }

        let total_volume = levels.iter().map(|level| level.volume).sum();

        Self {
            side,
            levels: levels.to_vec(),
            by_price,
            total_volume,
        }
    }

    pub fn side(&self) -> BookSide {
        self.side
    }

    /// Raw levels in the venue's native order
    pub fn native(&self) -> &[PriceLevel] {
        &self.levels
    }

    /// Summed volume per unique price, ascending by price
    pub fn by_price(&self) -> &[PriceLevel] {
        &self.by_price
    }

    /// Aggregated levels ranked by volume, largest first
    ///
    /// Equal volumes are ordered by price, highest first.
    pub fn ranked_by_volume(&self) -> Vec<PriceLevel> {
        let mut ranked = self.by_price.clone();
        ranked.sort_by(|a, b| match b.volume.total_cmp(&a.volume) {
            Ordering::Equal => b.price.total_cmp(&a.price),
            other => other,
        });
        ranked
    }

    /// Total volume on this side (0 when empty)
    pub fn total_volume(&self) -> f64 {
        self.total_volume
    }

    /// Best price: highest bid or lowest ask
    pub fn best_price(&self) -> Option<f64> {
        match self.side {
            BookSide::Bid => self.by_price.last().map(|level| level.price),
            BookSide::Ask => self.by_price.first().map(|level| level.price),
        }
    }

    /// Raw volumes in native order
    pub fn volumes(&self) -> Vec<f64> {
        self.levels.iter().map(|level| level.volume).collect()
    }

    /// Raw prices in native order
    pub fn prices(&self) -> Vec<f64> {
        self.levels.iter().map(|level| level.price).collect()
    }

    /// Each raw level's share of the side's volume, in percent
    ///
    /// `None` when the side carries no volume.
    pub fn relative_volumes(&self) -> Option<Vec<f64>> {
        if self.total_volume <= 0.0 {
            return None;
        }
        Some(
            self.levels
                .iter()
                .map(|level| level.volume / self.total_volume * 100.0)
                .collect(),
        )
    }

    /// Mean raw order size
    pub fn mean_volume(&self) -> Option<f64> {
        if self.levels.is_empty() {
            return None;
        }
        Some(self.total_volume / self.levels.len() as f64)
    }

    /// Sum of raw volume whose price lies within `[low, high]`
    pub fn volume_between(&self, low: f64, high: f64) -> f64 {
        self.levels
            .iter()
            .filter(|level| level.price >= low && level.price <= high)
            .map(|level| level.volume)
            .sum()
    }

    /// Number of raw levels
    pub fn len(&self) -> usize {
        self.levels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }
}

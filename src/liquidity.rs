//! Liquidity measures around the market price
//!
//! Depth, near-market bands, VWAP and cumulative-depth slippage for one
//! side of a snapshot. All functions are pure and take the side already
//! aggregated.

use crate::data::BookSide;
use crate::orderbook::AggregatedLevels;
use crate::stats;

/// Midpoint of best bid and best ask; `None` if either side is empty
pub fn market_price(bids: &AggregatedLevels, asks: &AggregatedLevels) -> Option<f64> {
    Some((bids.best_price()? + asks.best_price()?) / 2.0)
}

/// Volume resting between the market price and `band` away from it
///
/// Bids are taken from `[market * (1 - band), market]`, asks from
/// `[market, market * (1 + band)]`.
pub fn volume_near_market(side: &AggregatedLevels, market: f64, band: f64) -> f64 {
    let reach = market * band;
    match side.side() {
        BookSide::Bid => side.volume_between(market - reach, market),
        BookSide::Ask => side.volume_between(market, market + reach),
    }
}

/// Volume between the market price and `market * (1 -/+ band)`
///
/// Same band as [`volume_near_market`], but the bound is scaled from the
/// market price rather than offset from it; the two round differently at
/// the edge.
pub fn volume_concentrated(side: &AggregatedLevels, market: f64, band: f64) -> f64 {
    match side.side() {
        BookSide::Bid => side.volume_between(market * (1.0 - band), market),
        BookSide::Ask => side.volume_between(market, market * (1.0 + band)),
    }
}

/// Volume on the market side of a price `range` away from the market
///
/// Bids count every level priced at or above `market * (1 - range)`; asks
/// every level at or below `market * (1 + range)`.
pub fn depth_within(side: &AggregatedLevels, market: f64, range: f64) -> f64 {
    match side.side() {
        BookSide::Bid => {
            let floor = market * (1.0 - range);
            side.native().iter().filter(|l| l.price >= floor).map(|l| l.volume).sum()
        }
        BookSide::Ask => {
            let ceiling = market * (1.0 + range);
            side.native().iter().filter(|l| l.price <= ceiling).map(|l| l.volume).sum()
        }
    }
}

/// Volume-weighted average price over the first `depth` levels in native order
///
/// `None` when those levels carry no volume.
pub fn vwap(side: &AggregatedLevels, depth: usize) -> Option<f64> {
    let top = &side.native()[..depth.min(side.len())];
    let volume: f64 = top.iter().map(|l| l.volume).sum();
    if volume <= 0.0 {
        return None;
    }
    let notional: f64 = top.iter().map(|l| l.notional()).sum();
    Some(notional / volume)
}

/// Price reached when walking the book until cumulative volume covers an
/// order the size of the `q`-quantile of the side's order sizes
///
/// Levels are walked in native order. If the levels run out first, the
/// last price seen is returned. `None` only for an empty side.
pub fn fill_price(side: &AggregatedLevels, q: f64) -> Option<f64> {
    let target = stats::quantile(&side.volumes(), q)?;

    let mut cumulative = 0.0;
    let mut reached = None;
    for level in side.native() {
        cumulative += level.volume;
        reached = Some(level.price);
        if cumulative >= target {
            break;
        }
    }
    reached
}

/// Distance the price moves away from the market to fill a `q`-quantile order
///
/// Positive when the fill is worse than the market price.
pub fn price_movement(side: &AggregatedLevels, market: f64, q: f64) -> Option<f64> {
    let price = fill_price(side, q)?;
    Some(match side.side() {
        BookSide::Bid => market - price,
        BookSide::Ask => price - market,
    })
}

//! Data models for order book snapshots

use crate::error::{FeatureError, LevelDefect, LevelField};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Market segment, used as the feature-name prefix
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Segment {
    Spot,
    Future,
}

impl Segment {
    /// Prefix prepended to every feature name for this segment
    pub fn prefix(&self) -> &'static str {
        match self {
            Segment::Spot => "spot",
            Segment::Future => "future",
        }
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.prefix())
    }
}

impl FromStr for Segment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "spot" => Ok(Segment::Spot),
            "future" | "futures" => Ok(Segment::Future),
            other => Err(format!("Unknown segment: {}", other)),
        }
    }
}

/// Side of the order book
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BookSide {
    Bid,
    Ask,
}

impl fmt::Display for BookSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BookSide::Bid => write!(f, "bid"),
            BookSide::Ask => write!(f, "ask"),
        }
    }
}

/// Price level in an order book snapshot
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceLevel {
    pub price: f64,
    pub volume: f64,
}

impl PriceLevel {
    pub fn new(price: f64, volume: f64) -> Self {
        Self { price, volume }
    }

    /// Price times volume
    pub fn notional(&self) -> f64 {
        self.price * self.volume
    }
}

impl fmt::Display for PriceLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.volume, self.price)
    }
}

/// A raw price or volume as delivered by the venue
///
/// Binance encodes both as JSON strings; numeric encodings are accepted too.
/// Anything else (`null`, booleans, nested values) is kept as-is so that
/// validation can report it with its side and index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawValue {
    Number(f64),
    Text(String),
    Other(serde_json::Value),
}

impl RawValue {
    fn parse(&self) -> Result<f64, LevelDefect> {
        let value = match self {
            RawValue::Number(n) => *n,
            RawValue::Text(s) => s.trim().parse::<f64>().map_err(|_| LevelDefect::NotNumeric)?,
            RawValue::Other(_) => return Err(LevelDefect::NotNumeric),
        };

        if !value.is_finite() {
            return Err(LevelDefect::NotFinite);
        }

        Ok(value)
    }
}

impl fmt::Display for RawValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RawValue::Number(n) => write!(f, "{}", n),
            RawValue::Text(s) => f.write_str(s),
            RawValue::Other(v) => write!(f, "{}", v),
        }
    }
}

impl From<&str> for RawValue {
    fn from(s: &str) -> Self {
        RawValue::Text(s.to_string())
    }
}

impl From<f64> for RawValue {
    fn from(n: f64) -> Self {
        RawValue::Number(n)
    }
}

/// Raw `[price, volume]` pair
pub type RawLevel = [RawValue; 2];

/// One static bid/ask snapshot for a single market segment
///
/// Levels keep the venue's native ordering; nothing here assumes they are
/// sorted. Construction validates every level, so a snapshot in hand is
/// always numerically sound.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrderBookSnapshot {
    segment: Segment,
    bids: Vec<PriceLevel>,
    asks: Vec<PriceLevel>,
}

impl OrderBookSnapshot {
    /// Build a snapshot from already-numeric levels
    pub fn new(
        segment: Segment,
        bids: Vec<PriceLevel>,
        asks: Vec<PriceLevel>,
    ) -> Result<Self, FeatureError> {
        validate_side(BookSide::Bid, &bids)?;
        validate_side(BookSide::Ask, &asks)?;

        Ok(Self { segment, bids, asks })
    }

    /// Parse raw venue pairs into a snapshot
    ///
    /// The first unparseable or out-of-range value fails the whole snapshot
    /// with [`FeatureError::MalformedLevel`].
    pub fn from_raw(
        segment: Segment,
        bids: &[RawLevel],
        asks: &[RawLevel],
    ) -> Result<Self, FeatureError> {
        Ok(Self {
            segment,
            bids: parse_side(BookSide::Bid, bids)?,
            asks: parse_side(BookSide::Ask, asks)?,
        })
    }

    pub fn segment(&self) -> Segment {
        self.segment
    }

    pub fn bids(&self) -> &[PriceLevel] {
        &self.bids
    }

    pub fn asks(&self) -> &[PriceLevel] {
        &self.asks
    }

    pub fn side(&self, side: BookSide) -> &[PriceLevel] {
        match side {
            BookSide::Bid => &self.bids,
            BookSide::Ask => &self.asks,
        }
    }

    /// Check if both sides are empty
    pub fn is_empty(&self) -> bool {
        self.bids.is_empty() && self.asks.is_empty()
    }
}

impl fmt::Display for OrderBookSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "OrderBook[{}]: {} bids, {} asks",
            self.segment,
            self.bids.len(),
            self.asks.len()
        )
    }
}

fn parse_side(side: BookSide, raw: &[RawLevel]) -> Result<Vec<PriceLevel>, FeatureError> {
    raw.iter()
        .enumerate()
        .map(|(index, [price, volume])| {
            let price = parse_field(side, index, LevelField::Price, price)?;
            let volume = parse_field(side, index, LevelField::Volume, volume)?;
            Ok(PriceLevel { price, volume })
        })
        .collect()
}

fn parse_field(
    side: BookSide,
    index: usize,
    field: LevelField,
    raw: &RawValue,
) -> Result<f64, FeatureError> {
    let malformed = |defect| FeatureError::MalformedLevel {
        side,
        index,
        field,
        raw: raw.to_string(),
        defect,
    };

    let value = raw.parse().map_err(malformed)?;
    check_range(field, value).map_err(malformed)?;
    Ok(value)
}

fn validate_side(side: BookSide, levels: &[PriceLevel]) -> Result<(), FeatureError> {
    for (index, level) in levels.iter().enumerate() {
        for (field, value) in [(LevelField::Price, level.price), (LevelField::Volume, level.volume)] {
            let checked = if value.is_finite() {
                check_range(field, value)
            } else {
                Err(LevelDefect::NotFinite)
            };

            checked.map_err(|defect| FeatureError::MalformedLevel {
                side,
                index,
                field,
                raw: value.to_string(),
                defect,
            })?;
        }
    }

    Ok(())
}

fn check_range(field: LevelField, value: f64) -> Result<(), LevelDefect> {
    let in_range = match field {
        LevelField::Price => value > 0.0,
        LevelField::Volume => value >= 0.0,
    };

    if in_range {
        Ok(())
    } else {
        Err(LevelDefect::OutOfRange)
    }
}

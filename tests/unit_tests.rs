//! Unit tests for the feature engine's public surface

use orderbook_features::{
    data::*,
    error::*,
    features::*,
};

fn raw(pairs: &[(&str, &str)]) -> Vec<RawLevel> {
    pairs.iter().map(|&(p, v)| [RawValue::from(p), RawValue::from(v)]).collect()
}

fn levels(pairs: &[(f64, f64)]) -> Vec<PriceLevel> {
    pairs.iter().map(|&(p, v)| PriceLevel::new(p, v)).collect()
}

fn approx(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-9
}

// Two-level book on each side
#[test]
fn test_two_level_book_headline_metrics() {
    let bids = raw(&[("100", "5"), ("99", "3")]);
    let asks = raw(&[("101", "4"), ("102", "2")]);

    let record = FeatureEngine::new().compute_raw(Segment::Spot, &bids, &asks).unwrap();

    assert!(approx(record.get("spotTotalBidVolumeRatio").unwrap(), 8.0 / 14.0));
    assert_eq!(record.get("spotSpread"), Some(1.0));
    assert_eq!(record.get("spotMarketPrice"), Some(100.5));
    assert!(record.unavailable().is_empty());
}

#[test]
fn test_two_level_book_secondary_metrics() {
    let snapshot = OrderBookSnapshot::new(
        Segment::Future,
        levels(&[(100.0, 5.0), (99.0, 3.0)]),
        levels(&[(101.0, 4.0), (102.0, 2.0)]),
    )
    .unwrap();

    let record = FeatureEngine::new().compute(&snapshot);

    assert!(approx(record.get("futureBidToAskRatio").unwrap(), 8.0 / 6.0));
    assert!(approx(record.get("futurePriceImpactBids").unwrap(), 500.0 / 8.0));
    assert_eq!(record.get("futureLargeBidsCount"), Some(1.0));
    assert!(approx(record.get("futureVwapBids").unwrap(), 797.0 / 8.0));
    assert!(approx(record.get("futureLargeBidsDistributionRatio").unwrap(), 5.0 / 8.0));
    assert!(approx(record.get("futureLargeBidsRelativeMeanSize").unwrap(), 5.0 / 4.0));
    assert_eq!(record.get("futureSupport_0"), Some(100.0));
    assert_eq!(record.get("futureResistance_0"), Some(101.0));
}

// One side missing entirely
#[test]
fn test_empty_asks_reports_unavailable() {
    let bids = raw(&[("100", "5"), ("99", "3")]);

    let record = FeatureEngine::new().compute_raw(Segment::Spot, &bids, &[]).unwrap();

    for name in [
        "spotTotalBidVolumeRatio",
        "spotTotalAskVolumeRatio",
        "spotSpread",
        "spotMarketPrice",
        "spotBidToAskRatio",
        "spotResistance_0",
    ] {
        assert!(record.is_unavailable(name), "{} should be unavailable", name);
        assert!(!record.contains(name));
    }

    assert_eq!(record.get("spotSupport_0"), Some(100.0));
    assert_eq!(record.get("spotSupport_1"), Some(99.0));
    assert!(record.contains("spotVwapBids"));
}

#[test]
fn test_unavailable_reason_names_the_side() {
    let bids = raw(&[("100", "5")]);
    let record = FeatureEngine::new().compute_raw(Segment::Spot, &bids, &[]).unwrap();

    let spread = record
        .unavailable()
        .iter()
        .find(|u| u.name == "spotSpread")
        .unwrap();
    assert_eq!(spread.reason, UnavailableReason::EmptySide(BookSide::Ask));
}

// Fewer levels than support slots
#[test]
fn test_short_side_emits_only_available_supports() {
    let snapshot = OrderBookSnapshot::new(
        Segment::Spot,
        levels(&[(100.0, 1.0), (99.0, 3.0), (98.0, 2.0)]),
        levels(&[(101.0, 1.0)]),
    )
    .unwrap();

    let record = FeatureEngine::new().compute(&snapshot);

    assert_eq!(record.get("spotSupport_0"), Some(99.0));
    assert_eq!(record.get("spotSupport_1"), Some(98.0));
    assert_eq!(record.get("spotSupport_2"), Some(100.0));
    assert!(!record.contains("spotSupport_3"));
    assert!(!record.contains("spotSupport_4"));
    assert!(!record.is_unavailable("spotSupport_3"));
}

// Malformed input fails the whole snapshot
#[test]
fn test_malformed_price_fails_snapshot() {
    let bids = raw(&[("100", "5"), ("abc", "3")]);
    let asks = raw(&[("101", "4")]);

    let err = FeatureEngine::new().compute_raw(Segment::Spot, &bids, &asks).unwrap_err();

    match err {
        FeatureError::MalformedLevel { side, index, field, raw, defect } => {
            assert_eq!(side, BookSide::Bid);
            assert_eq!(index, 1);
            assert_eq!(field, LevelField::Price);
            assert_eq!(raw, "abc");
            assert_eq!(defect, LevelDefect::NotNumeric);
        }
        other => panic!("unexpected error: {}", other),
    }
}

#[test]
fn test_negative_volume_is_out_of_range() {
    let asks = raw(&[("101", "-1")]);
    let err = OrderBookSnapshot::from_raw(Segment::Spot, &[], &asks).unwrap_err();

    assert!(matches!(
        err,
        FeatureError::MalformedLevel {
            side: BookSide::Ask,
            field: LevelField::Volume,
            defect: LevelDefect::OutOfRange,
            ..
        }
    ));
}

#[test]
fn test_zero_price_rejected() {
    let result = OrderBookSnapshot::new(Segment::Spot, levels(&[(0.0, 1.0)]), vec![]);
    assert!(result.is_err());
}

#[test]
fn test_compute_is_idempotent() {
    let snapshot = OrderBookSnapshot::new(
        Segment::Spot,
        levels(&[(100.0, 5.0), (99.5, 1.0), (99.0, 3.0), (100.0, 2.0)]),
        levels(&[(101.0, 4.0), (102.0, 2.0), (101.5, 7.0)]),
    )
    .unwrap();
    let engine = FeatureEngine::new();

    assert_eq!(engine.compute(&snapshot), engine.compute(&snapshot));
}

#[test]
fn test_segments_only_change_prefix() {
    let bids = levels(&[(100.0, 5.0), (99.0, 3.0)]);
    let asks = levels(&[(101.0, 4.0)]);
    let engine = FeatureEngine::new();

    let spot = engine.compute(&OrderBookSnapshot::new(Segment::Spot, bids.clone(), asks.clone()).unwrap());
    let future = engine.compute(&OrderBookSnapshot::new(Segment::Future, bids, asks).unwrap());

    assert_eq!(spot.len(), future.len());
    for ((spot_name, spot_value), (future_name, future_value)) in spot.iter().zip(future.iter()) {
        assert_eq!(spot_name.strip_prefix("spot"), future_name.strip_prefix("future"));
        assert_eq!(spot_value, future_value);
    }
}

#[test]
fn test_emission_follows_group_order() {
    let snapshot = OrderBookSnapshot::new(
        Segment::Spot,
        levels(&[(100.0, 5.0), (99.0, 3.0)]),
        levels(&[(101.0, 4.0), (102.0, 2.0)]),
    )
    .unwrap();
    let record = FeatureEngine::new().compute(&snapshot);
    let names: Vec<&str> = record.iter().map(|(name, _)| name).collect();

    let position = |name: &str| names.iter().position(|n| *n == name).unwrap();
    assert_eq!(position("spotTotalBidVolumeRatio"), 0);
    assert!(position("spotSupport_0") < position("spotSpread"));
    assert!(position("spotSpread") < position("spotBidVolumePercentage_0"));
    assert!(position("spotPriceImpactAsks") < position("spotMarketPrice"));
    assert!(position("spotDepthImbalance_5.0") < position("spotBidsConcentrationNearMarketRatio"));
    assert!(position("spotVwapAsks") < position("spotLargeBidPriceMovementRange_95.0"));
    assert_eq!(*names.last().unwrap(), "spotLargeAsksRelativeMeanSize");
}

#[test]
fn test_invalid_config_rejected() {
    let config = FeatureConfig {
        price_brackets: 0,
        ..Default::default()
    };
    assert!(matches!(FeatureEngine::with_config(config), Err(FeatureError::Configuration(_))));
}

#[test]
fn test_custom_support_levels() {
    let config = FeatureConfig {
        support_levels: 2,
        ..Default::default()
    };
    let engine = FeatureEngine::with_config(config).unwrap();
    let snapshot = OrderBookSnapshot::new(
        Segment::Spot,
        levels(&[(100.0, 5.0), (99.0, 3.0), (98.0, 1.0)]),
        levels(&[(101.0, 4.0)]),
    )
    .unwrap();

    let record = engine.compute(&snapshot);
    assert!(record.contains("spotSupport_1"));
    assert!(!record.contains("spotSupport_2"));
}

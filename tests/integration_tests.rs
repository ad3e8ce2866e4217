//! Integration tests for the collection pipeline

use async_trait::async_trait;
use orderbook_features::{
    Collector, CollectorConfig, CollectorError, DepthSnapshot, DepthSource, RawValue, RetryPolicy,
    Segment,
};
use std::collections::HashMap;
use std::sync::{
    atomic::{AtomicU32, Ordering},
    Mutex,
};
use std::time::Duration;
use tokio_test::assert_ok;

/// In-memory depth source with scripted failures
struct ScriptedSource {
    books: HashMap<(String, Segment), DepthSnapshot>,
    transient_failures: AtomicU32,
    calls: Mutex<Vec<(String, Segment, u32)>>,
}

impl ScriptedSource {
    fn new() -> Self {
        Self {
            books: HashMap::new(),
            transient_failures: AtomicU32::new(0),
            calls: Mutex::new(Vec::new()),
        }
    }

    fn with_book(mut self, symbol: &str, segment: Segment, bids: &[(&str, &str)], asks: &[(&str, &str)]) -> Self {
        let raw = |pairs: &[(&str, &str)]| -> Vec<[RawValue; 2]> {
            pairs
                .iter()
                .map(|&(p, v)| [RawValue::from(p), RawValue::from(v)])
                .collect()
        };
        self.books.insert(
            (symbol.to_string(), segment),
            DepthSnapshot {
                last_update_id: 1,
                bids: raw(bids),
                asks: raw(asks),
            },
        );
        self
    }

    fn failing_first(self, failures: u32) -> Self {
        self.transient_failures.store(failures, Ordering::SeqCst);
        self
    }

    fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl DepthSource for ScriptedSource {
    async fn fetch_depth(&self, symbol: &str, segment: Segment, limit: u32) -> Result<DepthSnapshot, CollectorError> {
        self.calls.lock().unwrap().push((symbol.to_string(), segment, limit));

        let remaining = self.transient_failures.load(Ordering::SeqCst);
        if remaining > 0 {
            self.transient_failures.store(remaining - 1, Ordering::SeqCst);
            return Err(CollectorError::Http {
                status: 429,
                body: "Too many requests".to_string(),
            });
        }

        self.books
            .get(&(symbol.to_string(), segment))
            .cloned()
            .ok_or_else(|| CollectorError::Http {
                status: 400,
                body: format!("Invalid symbol {}", symbol),
            })
    }
}

fn fast_config(symbols: &[&str]) -> CollectorConfig {
    CollectorConfig {
        symbols: symbols.iter().map(|s| s.to_string()).collect(),
        retry: RetryPolicy {
            max_attempts: 3,
            initial_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
            jitter: false,
            ..Default::default()
        },
        ..Default::default()
    }
}

fn standard_source() -> ScriptedSource {
    ScriptedSource::new()
        .with_book("BNBUSDT", Segment::Spot, &[("100", "5"), ("99", "3")], &[("101", "4"), ("102", "2")])
        .with_book("BNBUSDT", Segment::Future, &[("100.2", "7")], &[("100.4", "1")])
        .with_book("LINKUSDT", Segment::Spot, &[("14.1", "50")], &[])
        .with_book("LINKUSDT", Segment::Future, &[("14.0", "20")], &[("14.2", "30")])
}

#[tokio::test]
async fn test_collect_all_merges_spot_and_future_per_symbol() {
    let collector = Collector::new(standard_source(), fast_config(&["BNBUSDT", "LINKUSDT"])).unwrap();

    let results = collector.collect_all().await;
    assert_eq!(results.len(), 2);
    assert_eq!(results[0].symbol, "BNBUSDT");
    assert_eq!(results[1].symbol, "LINKUSDT");

    let bnb = results[0].result.as_ref().unwrap();
    assert_eq!(bnb.get("spotSpread"), Some(1.0));
    assert_eq!(bnb.get("spotMarketPrice"), Some(100.5));
    assert!(bnb.get("futureSpread").is_some());
    assert!(bnb.unavailable.is_empty());

    let spot_columns = bnb.columns().iter().filter(|c| c.starts_with("spot")).count();
    let future_columns = bnb.columns().iter().filter(|c| c.starts_with("future")).count();
    assert_eq!(spot_columns + future_columns, bnb.features.len());
    assert_eq!(bnb.columns()[0], "spotTotalBidVolumeRatio");
}

#[tokio::test]
async fn test_empty_side_is_not_an_error() {
    let collector = Collector::new(standard_source(), fast_config(&["LINKUSDT"])).unwrap();

    let merged = collector.collect_symbol("LINKUSDT").await.unwrap();

    assert_eq!(merged.get("spotSupport_0"), Some(14.1));
    assert!(merged.get("spotSpread").is_none());
    assert!(merged.unavailable.iter().any(|u| u.name == "spotSpread"));
    assert!(merged.get("futureSpread").is_some());
}

#[tokio::test]
async fn test_rate_limited_fetch_is_retried() {
    let source = standard_source().failing_first(2);
    let config = CollectorConfig {
        segments: vec![Segment::Spot],
        ..fast_config(&["BNBUSDT"])
    };
    let collector = Collector::new(source, config).unwrap();

    let record = assert_ok!(collector.collect_segment("BNBUSDT", Segment::Spot).await);

    assert_eq!(record.get("spotMarketPrice"), Some(100.5));
    assert_eq!(collector.source().call_count(), 3);
}

#[tokio::test]
async fn test_unknown_symbol_fails_without_retry() {
    let source = ScriptedSource::new();
    let config = CollectorConfig {
        segments: vec![Segment::Spot],
        ..fast_config(&["NOPEUSDT"])
    };
    let collector = Collector::new(source, config).unwrap();

    let results = collector.collect_all().await;

    assert!(matches!(results[0].result, Err(CollectorError::Http { status: 400, .. })));
    assert_eq!(collector.source().call_count(), 1);
}

#[tokio::test]
async fn test_depth_limit_is_forwarded() {
    let config = CollectorConfig {
        depth_limit: 100,
        ..fast_config(&["BNBUSDT"])
    };
    let collector = Collector::new(standard_source(), config).unwrap();

    assert_ok!(collector.collect_symbol("BNBUSDT").await);

    let calls = collector.source().calls.lock().unwrap();
    assert_eq!(calls.len(), 2);
    assert!(calls.iter().all(|(_, _, limit)| *limit == 100));
}

#[tokio::test]
async fn test_future_depth_request_is_capped() {
    let config = CollectorConfig {
        depth_limit: 5000,
        ..fast_config(&["BNBUSDT"])
    };
    let collector = Collector::new(standard_source(), config).unwrap();

    assert_ok!(collector.collect_symbol("BNBUSDT").await);

    let calls = collector.source().calls.lock().unwrap();
    let limit_for = |segment: Segment| {
        calls
            .iter()
            .find(|(_, s, _)| *s == segment)
            .map(|(_, _, limit)| *limit)
    };
    assert_eq!(limit_for(Segment::Spot), Some(5000));
    assert_eq!(limit_for(Segment::Future), Some(1000));
}

#[tokio::test]
async fn test_json_row_contains_every_feature() {
    let collector = Collector::new(standard_source(), fast_config(&["BNBUSDT"])).unwrap();

    let merged = collector.collect_symbol("BNBUSDT").await.unwrap();
    let json = merged.to_json();
    let row = json.as_object().unwrap();

    assert_eq!(row["symbol"], "BNBUSDT");
    assert!(row.contains_key("collectedAt"));
    for feature in &merged.features {
        assert_eq!(row[&feature.name], feature.value);
    }
    assert!(!row.contains_key("unavailable"));
}

#[test]
fn test_invalid_config_rejected_at_construction() {
    let config = CollectorConfig {
        symbols: Vec::new(),
        ..Default::default()
    };
    assert!(matches!(
        Collector::new(ScriptedSource::new(), config),
        Err(CollectorError::Configuration(_))
    ));
}

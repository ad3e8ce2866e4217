//! Collection pipeline: fetch, extract, merge
//!
//! One future per (symbol, segment) pair runs concurrently; each computes
//! its own feature record and the records of a symbol are merged once all
//! of its segments are in. A failing segment fails only its symbol.

use crate::config::CollectorConfig;
use crate::data::Segment;
use crate::error::{CollectorError, ErrorReporter};
use crate::features::{FeatureEngine, FeatureRecord};
use crate::merge::{MergedRecord, SnapshotMerger};
use crate::rest_client::DepthSource;
use futures_util::future::join_all;

/// Outcome of collecting one symbol
#[derive(Debug)]
pub struct SymbolResult {
    pub symbol: String,
    pub result: Result<MergedRecord, CollectorError>,
}

/// Periodic order book feature collector
pub struct Collector<S: DepthSource> {
    source: S,
    engine: FeatureEngine,
    config: CollectorConfig,
}

impl<S: DepthSource> Collector<S> {
    pub fn new(source: S, config: CollectorConfig) -> Result<Self, CollectorError> {
        config.validate()?;
        let engine = FeatureEngine::with_config(config.features.clone())?;

        Ok(Self {
            source,
            engine,
            config,
        })
    }

    pub fn config(&self) -> &CollectorConfig {
        &self.config
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Fetch and compute features for one (symbol, segment) pair
    pub async fn collect_segment(&self, symbol: &str, segment: Segment) -> Result<FeatureRecord, CollectorError> {
        let limit = self.config.depth_limit_for(segment);
        let depth = self
            .config
            .retry
            .execute("fetch_depth", || self.source.fetch_depth(symbol, segment, limit))
            .await?;

        let snapshot = depth.into_snapshot(segment)?;
        let record = self.engine.compute(&snapshot);

        if !record.unavailable().is_empty() {
            tracing::warn!(
                "{} {}: {} metrics unavailable",
                symbol,
                segment,
                record.unavailable().len()
            );
        }

        Ok(record)
    }

    /// Collect every configured segment of one symbol and merge them
    pub async fn collect_symbol(&self, symbol: &str) -> Result<MergedRecord, CollectorError> {
        let segments = self
            .config
            .segments
            .iter()
            .map(|&segment| self.collect_segment(symbol, segment));

        let records = join_all(segments)
            .await
            .into_iter()
            .collect::<Result<Vec<_>, _>>()?;

        SnapshotMerger::merge(symbol, records)
    }

    /// Collect all configured symbols concurrently
    pub async fn collect_all(&self) -> Vec<SymbolResult> {
        let symbols = self.config.symbols.iter().map(|symbol| async move {
            let result = self.collect_symbol(symbol).await;
            match &result {
                Ok(record) => tracing::info!("Collected {}", record),
                Err(e) => ErrorReporter::report_error(e, symbol),
            }
            SymbolResult {
                symbol: symbol.clone(),
                result,
            }
        });

        join_all(symbols).await
    }
}

//! Merging per-segment feature records into one row per symbol

use crate::error::CollectorError;
use crate::features::{Feature, FeatureRecord, UnavailableMetric};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

/// Features of every segment for one symbol
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MergedRecord {
    pub symbol: String,
    pub collected_at: DateTime<Utc>,
    pub features: Vec<Feature>,
    pub unavailable: Vec<UnavailableMetric>,
}

impl MergedRecord {
    /// Column names in emission order
    pub fn columns(&self) -> Vec<&str> {
        self.features.iter().map(|f| f.name.as_str()).collect()
    }

    /// Values aligned with [`columns`](Self::columns)
    pub fn values(&self) -> Vec<f64> {
        self.features.iter().map(|f| f.value).collect()
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.features.iter().find(|f| f.name == name).map(|f| f.value)
    }

    /// Flat JSON object of feature name to value
    pub fn to_json(&self) -> serde_json::Value {
        let mut row = serde_json::Map::new();
        row.insert("symbol".to_string(), serde_json::Value::from(self.symbol.clone()));
        row.insert("collectedAt".to_string(), serde_json::Value::from(self.collected_at.to_rfc3339()));
        for feature in &self.features {
            row.insert(feature.name.clone(), serde_json::Value::from(feature.value));
        }
        if !self.unavailable.is_empty() {
            let skipped: Vec<&str> = self.unavailable.iter().map(|u| u.name.as_str()).collect();
            row.insert("unavailable".to_string(), serde_json::Value::from(skipped));
        }
        serde_json::Value::Object(row)
    }
}

impl fmt::Display for MergedRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Merged[{}]: {} features, {} unavailable @ {}",
            self.symbol,
            self.features.len(),
            self.unavailable.len(),
            self.collected_at
        )
    }
}

/// Unions segment records by key
pub struct SnapshotMerger;

impl SnapshotMerger {
    /// Merge records for `symbol`, stamped with the current time
    pub fn merge<I>(symbol: &str, records: I) -> Result<MergedRecord, CollectorError>
    where
        I: IntoIterator<Item = FeatureRecord>,
    {
        Self::merge_at(symbol, Utc::now(), records)
    }

    /// Merge records for `symbol` with an explicit timestamp
    ///
    /// Keys are segment-prefixed, so a collision means the same segment was
    /// supplied twice.
    pub fn merge_at<I>(symbol: &str, collected_at: DateTime<Utc>, records: I) -> Result<MergedRecord, CollectorError>
    where
        I: IntoIterator<Item = FeatureRecord>,
    {
        let mut seen = HashSet::new();
        let mut features = Vec::new();
        let mut unavailable = Vec::new();

        for record in records {
            let segment = record.segment();
            let (record_features, record_unavailable) = record.into_parts();

            for feature in record_features {
                if !seen.insert(feature.name.clone()) {
                    return Err(CollectorError::MergeConflict(format!(
                        "{}: duplicate feature {} from {} segment",
                        symbol, feature.name, segment
                    )));
                }
                features.push(feature);
            }
            unavailable.extend(record_unavailable);
        }

        Ok(MergedRecord {
            symbol: symbol.to_string(),
            collected_at,
            features,
            unavailable,
        })
    }
}

//! Fusion provenance: the record emitted alongside every fused canonical
//! record, carrying enough detail to audit how each field's value was
//! derived.
//!
//! Grounded on `original_source/src/wearables/fusion_engine.py`'s
//! `MetricFusionResult`/`FusionResult` dataclasses.

use std::collections::HashMap;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::enums::MetricGroup;

/// Detail recorded only when a metric's active sources disagreed beyond
/// tolerance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConflictDetail {
    pub values: HashMap<String, f64>,
    pub diff: f64,
    pub tolerance: f64,
    pub primary_used: String,
}

/// Provenance for a single fused metric.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricFusionResult {
    pub metric_name: String,
    pub fused_value: Option<f64>,
    pub sources_used: Vec<String>,
    pub normalized_weights: HashMap<String, f64>,
    pub had_conflict: bool,
    pub conflict_detail: Option<ConflictDetail>,
    pub confidence: f64,
}

/// Provenance for one fused canonical record (one subject-date, one metric
/// group).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FusionResult {
    pub owner: uuid::Uuid,
    pub date: NaiveDate,
    pub metric_group: MetricGroup,
    pub metrics: HashMap<String, MetricFusionResult>,
    pub contributing_sources: Vec<String>,
    pub conflicted_fields: HashMap<String, bool>,
    pub config_version: String,
    pub computed_at: DateTime<Utc>,
}

impl FusionResult {
    pub fn new(owner: uuid::Uuid, date: NaiveDate, metric_group: MetricGroup, config_version: String) -> Self {
        Self {
            owner,
            date,
            metric_group,
            metrics: HashMap::new(),
            contributing_sources: Vec::new(),
            conflicted_fields: HashMap::new(),
            config_version,
            computed_at: Utc::now(),
        }
    }

    /// Record `result` under `field_name`, the destination field it fused
    /// into — distinct from `result.metric_name`, since several fields can
    /// share one metric (e.g. `rem_minutes`/`deep_minutes` both fuse via the
    /// `"sleep_stages"` metric).
    pub fn record(&mut self, field_name: &str, result: MetricFusionResult) {
        for source in &result.sources_used {
            if !self.contributing_sources.contains(source) {
                self.contributing_sources.push(source.clone());
            }
        }
        if result.had_conflict {
            self.conflicted_fields.insert(field_name.to_string(), true);
        }
        self.metrics.insert(field_name.to_string(), result);
    }
}

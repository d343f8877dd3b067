//! Typed configuration model and the raw YAML document shape it's built from.
//!
//! Grounded on `original_source/src/wearables/config_loader.py`: the raw
//! document uses loose, optional keys with defaults; `FusionConfig` is the
//! single validated, immutable value every other component is parameterized
//! by (spec.md §4.1).

use std::collections::HashMap;

use serde::Deserialize;

/// One weighted component of the readiness score formula.
#[derive(Debug, Clone, PartialEq)]
pub struct ReadinessComponent {
    pub name: String,
    pub weight: f64,
    pub description: String,
}

/// Readiness score computation settings.
#[derive(Debug, Clone, PartialEq)]
pub struct ReadinessConfig {
    pub enabled: bool,
    pub components: Vec<ReadinessComponent>,
    pub thriving_threshold: i32,
    pub watch_threshold: i32,
}

impl ReadinessConfig {
    pub fn total_weight(&self) -> f64 {
        self.components.iter().map(|c| c.weight).sum()
    }
}

/// Settings for matching sleep sessions across devices.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SleepMatchingConfig {
    pub min_overlap_pct: f64,
    pub max_start_diff_minutes: i64,
    pub sleep_day_cutoff_hour: u8,
}

/// The fusion engine's menstrual cycle prediction model choice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PredictionModel {
    CalendarOnly,
    TemperatureAssisted,
}

impl PredictionModel {
    fn parse(s: &str) -> Option<Self> {
        match s {
            "calendar_only" => Some(Self::CalendarOnly),
            "temperature_assisted" => Some(Self::TemperatureAssisted),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CalendarOnly => "calendar_only",
            Self::TemperatureAssisted => "temperature_assisted",
        }
    }
}

/// Menstrual cycle tracking settings.
#[derive(Debug, Clone, PartialEq)]
pub struct MenstrualConfig {
    pub enabled: bool,
    pub prediction_model: PredictionModel,
    pub temp_source_priority: Vec<String>,
    pub temp_shift_threshold_c: f64,
    pub ovulation_confirmation_days: u32,
    pub fertile_window_days: u32,
    pub rolling_average_cycles: u32,
    pub min_cycle_days: u32,
    pub max_cycle_days: u32,
}

/// Historical backfill settings per source. Informational to the core —
/// rate-limit pacing itself lives in the (out of scope) sync layer.
#[derive(Debug, Clone, PartialEq)]
pub struct BackfillConfig {
    pub enabled: bool,
    pub max_days: HashMap<String, u32>,
    pub batch_size_days: u32,
    pub rate_limit_ms: u32,
}

/// The complete, validated fusion configuration.
///
/// Constructed once via [`crate::config::load_fusion_config`] and replaced
/// atomically through a [`crate::config::ConfigHandle`]. All other
/// components — the matcher, fusion engine, readiness scorer, and menstrual
/// core — are parameterized by this single value.
#[derive(Debug, Clone, PartialEq)]
pub struct FusionConfig {
    pub version: String,
    pub device_weights: HashMap<String, HashMap<String, f64>>,
    pub tolerances: HashMap<String, f64>,
    pub sleep_matching: SleepMatchingConfig,
    pub readiness: ReadinessConfig,
    pub menstrual: MenstrualConfig,
    pub backfill: BackfillConfig,
}

impl FusionConfig {
    /// Fusion weight for a metric+source pair. Absent entries are 0.0,
    /// which excludes that source from the metric's fusion.
    pub fn weight(&self, metric: &str, source: &str) -> f64 {
        self.device_weights
            .get(metric)
            .and_then(|sources| sources.get(source))
            .copied()
            .unwrap_or(0.0)
    }

    /// Conflict tolerance for a metric. Absent keys mean "no conflict
    /// detection" (treated as +∞).
    pub fn tolerance(&self, key: &str) -> f64 {
        self.tolerances.get(key).copied().unwrap_or(f64::INFINITY)
    }

    /// Sources configured for a metric with weight > 0, descending by weight.
    pub fn sources_for_metric(&self, metric: &str) -> Vec<String> {
        let mut sources: Vec<(String, f64)> = self
            .device_weights
            .get(metric)
            .map(|m| {
                m.iter()
                    .filter(|(_, &w)| w > 0.0)
                    .map(|(s, &w)| (s.clone(), w))
                    .collect()
            })
            .unwrap_or_default();
        sources.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        sources.into_iter().map(|(s, _)| s).collect()
    }

    /// Highest-weight source configured for a metric, if any.
    pub fn primary_source(&self, metric: &str) -> Option<String> {
        self.sources_for_metric(metric).into_iter().next()
    }
}

// ---------------------------------------------------------------------
// Raw YAML document shape (§6: "Exact key names are preserved as given")
// ---------------------------------------------------------------------

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub(crate) struct RawDocument {
    pub version: Option<String>,
    pub device_weights: HashMap<String, HashMap<String, serde_yaml::Value>>,
    pub tolerances: HashMap<String, serde_yaml::Value>,
    pub sleep_matching: RawSleepMatching,
    pub readiness_score: RawReadinessScore,
    pub menstrual_cycle: RawMenstrualCycle,
    pub backfill: RawBackfill,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub(crate) struct RawSleepMatching {
    pub min_overlap_pct: Option<f64>,
    pub max_start_diff_minutes: Option<i64>,
    pub sleep_day_cutoff_hour: Option<i64>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub(crate) struct RawReadinessScore {
    pub enabled: Option<bool>,
    pub components: HashMap<String, RawReadinessComponent>,
    pub thresholds: RawReadinessThresholds,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub(crate) struct RawReadinessComponent {
    pub weight: Option<serde_yaml::Value>,
    pub description: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub(crate) struct RawReadinessThresholds {
    pub thriving: Option<i32>,
    pub watch: Option<i32>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub(crate) struct RawMenstrualCycle {
    pub enabled: Option<bool>,
    pub prediction_model: Option<String>,
    pub temp_source_priority: Option<Vec<String>>,
    pub temp_shift_threshold_c: Option<f64>,
    pub fertile_window: RawFertileWindow,
    pub cycle_length: RawCycleLength,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub(crate) struct RawFertileWindow {
    pub confirmation_days: Option<u32>,
    pub predicted_window_days: Option<u32>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub(crate) struct RawCycleLength {
    pub rolling_average_cycles: Option<u32>,
    pub min_cycle_days: Option<u32>,
    pub max_cycle_days: Option<u32>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub(crate) struct RawBackfill {
    pub enabled: Option<bool>,
    pub garmin_max_days: Option<u32>,
    pub oura_max_days: Option<u32>,
    pub apple_health_max_days: Option<u32>,
    pub whoop_max_days: Option<u32>,
    pub batch_size_days: Option<u32>,
    pub rate_limit_ms: Option<u32>,
}

impl PredictionModel {
    pub(crate) fn parse_or(s: Option<&str>, default: Self) -> (Self, Option<String>) {
        match s {
            None => (default, None),
            Some(raw) => match Self::parse(raw) {
                Some(model) => (model, None),
                None => (
                    default,
                    Some(format!(
                        "menstrual_cycle.prediction_model '{raw}' is not one of calendar_only, temperature_assisted"
                    )),
                ),
            },
        }
    }
}

//! Fusion Engine: per-metric weighted merge with conflict detection, and the
//! daily/sleep record-level orchestration built on top of it.
//!
//! Grounded on `original_source/src/wearables/fusion_engine.py`.

use std::collections::HashMap;

use chrono::NaiveDate;

use crate::config::FusionConfig;
use crate::error::{FusionError, Result};
use crate::matcher::{match_sessions, SleepMatchGroup};
use crate::models::{
    CanonicalDailyRecord, CanonicalSleepRecord, ConflictDetail, FusionResult, MetricFusionResult,
    MetricGroup,
};

/// (field accessor result, metric name, tolerance key) tuples describing how
/// a daily record's mergable fields map onto fusion metrics.
const DAILY_METRIC_MAP: &[(&str, &str, Option<&str>)] = &[
    ("resting_hr_bpm", "resting_heart_rate", Some("resting_hr_bpm")),
    ("hrv_rmssd_ms", "hrv", Some("hrv_ms")),
    ("steps", "steps", Some("steps_count")),
    ("active_calories_kcal", "calories_burned", None),
    ("total_calories_kcal", "calories_burned", None),
    ("spo2_avg_pct", "spo2", Some("spo2_pct")),
    ("respiratory_rate_avg", "respiratory_rate", Some("respiratory_rate_brpm")),
    ("skin_temp_deviation_c", "skin_temperature", Some("skin_temp_celsius")),
];

const SLEEP_METRIC_MAP: &[(&str, &str, Option<&str>)] = &[
    ("total_sleep_minutes", "sleep_duration", Some("sleep_duration_minutes")),
    ("rem_minutes", "sleep_stages", Some("sleep_stage_minutes")),
    ("deep_minutes", "sleep_stages", Some("sleep_stage_minutes")),
    ("light_minutes", "sleep_stages", Some("sleep_stage_minutes")),
    ("awake_minutes", "sleep_stages", Some("sleep_stage_minutes")),
    ("avg_hrv_ms", "hrv", Some("hrv_ms")),
    ("avg_hr_bpm", "resting_heart_rate", Some("resting_hr_bpm")),
    ("avg_spo2_pct", "spo2", Some("spo2_pct")),
    ("avg_respiratory_rate", "respiratory_rate", Some("respiratory_rate_brpm")),
    ("avg_skin_temp_deviation_c", "skin_temperature", Some("skin_temp_celsius")),
];

fn round4(value: f64) -> f64 {
    (value * 10_000.0).round() / 10_000.0
}

/// Fuse one metric's readings from multiple sources into a single value with
/// provenance. `readings` holds only sources that actually reported a value.
#[tracing::instrument(skip(config, readings), fields(source_count = readings.len()))]
pub fn fuse_metric(
    config: &FusionConfig,
    metric_name: &str,
    readings: &HashMap<String, f64>,
    tolerance_key: Option<&str>,
) -> MetricFusionResult {
    let raw_weights: HashMap<String, f64> = readings
        .keys()
        .map(|source| (source.clone(), config.weight(metric_name, source)))
        .collect();

    let mut active: Vec<(String, f64, f64)> = readings
        .iter()
        .map(|(source, value)| (source.clone(), *value, raw_weights[source]))
        .filter(|(_, _, w)| *w > 0.0)
        .collect();

    // No configured weights at all for this metric: fall back to uniform
    // weighting over everything reported, so a metric with no
    // `device_weights` entry still yields a value instead of null.
    if active.is_empty() {
        active = readings
            .iter()
            .map(|(source, value)| (source.clone(), *value, 1.0))
            .collect();
    }

    active.sort_by(|a, b| a.0.cmp(&b.0));

    if active.len() == 1 {
        let (source, value, weight) = &active[0];
        let mut normalized_weights = HashMap::new();
        normalized_weights.insert(source.clone(), 1.0);
        return MetricFusionResult {
            metric_name: metric_name.to_string(),
            fused_value: Some(round4(*value)),
            sources_used: vec![source.clone()],
            normalized_weights,
            had_conflict: false,
            conflict_detail: None,
            confidence: *weight,
        };
    }

    if let Some(key) = tolerance_key {
        let tolerance = config.tolerance(key);
        let max = active
            .iter()
            .map(|(_, v, _)| *v)
            .fold(f64::NEG_INFINITY, f64::max);
        let min = active.iter().map(|(_, v, _)| *v).fold(f64::INFINITY, f64::min);
        let spread = max - min;

        if spread > tolerance {
            tracing::warn!(metric = metric_name, spread, tolerance, "sources disagree beyond tolerance");
            let (primary_source, primary_value, primary_weight) = active
                .iter()
                .max_by(|a, b| a.2.partial_cmp(&b.2).unwrap_or(std::cmp::Ordering::Equal))
                .cloned()
                .expect("active is non-empty");

            let mut normalized_weights = HashMap::new();
            normalized_weights.insert(primary_source.clone(), 1.0);

            let values: HashMap<String, f64> =
                active.iter().map(|(s, v, _)| (s.clone(), *v)).collect();

            return MetricFusionResult {
                metric_name: metric_name.to_string(),
                fused_value: Some(round4(primary_value)),
                sources_used: vec![primary_source.clone()],
                normalized_weights,
                had_conflict: true,
                conflict_detail: Some(ConflictDetail {
                    values,
                    diff: spread,
                    tolerance,
                    primary_used: primary_source,
                }),
                confidence: primary_weight * 0.8,
            };
        }
    }

    let raw_sum: f64 = active.iter().map(|(_, _, w)| w).sum();
    let mut normalized_weights = HashMap::new();
    let mut fused_value = 0.0;
    let mut confidence = 0.0;
    for (source, value, raw_w) in &active {
        let normalized = raw_w / raw_sum;
        normalized_weights.insert(source.clone(), round4(normalized));
        fused_value += normalized * value;
        confidence += normalized * raw_w;
    }

    MetricFusionResult {
        metric_name: metric_name.to_string(),
        fused_value: Some(round4(fused_value)),
        sources_used: active.iter().map(|(s, _, _)| s.clone()).collect(),
        normalized_weights,
        had_conflict: false,
        conflict_detail: None,
        confidence: confidence.min(1.0),
    }
}

fn collect_readings<'a, T>(
    records: &'a [T],
    accessor: impl Fn(&'a T) -> Option<f64>,
    source_of: impl Fn(&'a T) -> &'a str,
) -> HashMap<String, f64> {
    records
        .iter()
        .filter_map(|r| accessor(r).map(|v| (source_of(r).to_string(), v)))
        .collect()
}

/// Fuse a set of canonical daily records for one subject-date into a single
/// record plus provenance. `records` must be non-empty.
#[tracing::instrument(skip(records, config), fields(owner = %owner, date = %date, record_count = records.len()))]
pub fn fuse_daily(
    owner: uuid::Uuid,
    date: NaiveDate,
    records: &[CanonicalDailyRecord],
    config: &FusionConfig,
) -> Result<(CanonicalDailyRecord, FusionResult)> {
    if records.is_empty() {
        return Err(FusionError::invalid_argument(
            "fuse_daily requires at least one input record",
        ));
    }

    let mut result = FusionResult::new(owner, date, MetricGroup::Daily, config.version.clone());

    macro_rules! field {
        ($name:ident) => {
            collect_readings(records, |r| r.$name, |r| r.source.as_str())
        };
    }

    let resting_hr = field!(resting_hr_bpm);
    let hrv = field!(hrv_rmssd_ms);
    let steps = collect_readings(records, |r| r.steps.map(|v| v as f64), |r| r.source.as_str());
    let active_kcal = field!(active_calories_kcal);
    let total_kcal = field!(total_calories_kcal);
    let spo2 = field!(spo2_avg_pct);
    let resp_rate = field!(respiratory_rate_avg);
    let skin_temp = field!(skin_temp_deviation_c);

    let inputs: &[(&str, &HashMap<String, f64>)] = &[
        ("resting_hr_bpm", &resting_hr),
        ("hrv_rmssd_ms", &hrv),
        ("steps", &steps),
        ("active_calories_kcal", &active_kcal),
        ("total_calories_kcal", &total_kcal),
        ("spo2_avg_pct", &spo2),
        ("respiratory_rate_avg", &resp_rate),
        ("skin_temp_deviation_c", &skin_temp),
    ];

    let mut fused_values: HashMap<&str, f64> = HashMap::new();
    for &(field, readings) in inputs {
        let &(_, metric, tolerance_key) = DAILY_METRIC_MAP
            .iter()
            .find(|&&(f, _, _)| f == field)
            .expect("field present in DAILY_METRIC_MAP");
        if readings.is_empty() {
            continue;
        }
        let fused = fuse_metric(config, metric, readings, tolerance_key);
        if let Some(v) = fused.fused_value {
            fused_values.insert(field, v);
        }
        result.record(field, fused);
    }

    let fused_record = CanonicalDailyRecord {
        owner,
        date,
        source: CanonicalDailyRecord::FUSED_SOURCE.to_string(),
        resting_hr_bpm: fused_values.get("resting_hr_bpm").copied(),
        max_hr_bpm: None,
        hrv_rmssd_ms: fused_values.get("hrv_rmssd_ms").copied(),
        steps: fused_values.get("steps").map(|v| v.round() as i32),
        active_calories_kcal: fused_values.get("active_calories_kcal").copied(),
        total_calories_kcal: fused_values.get("total_calories_kcal").copied(),
        active_minutes: None,
        distance_m: None,
        floors: None,
        spo2_avg_pct: fused_values.get("spo2_avg_pct").copied(),
        respiratory_rate_avg: fused_values.get("respiratory_rate_avg").copied(),
        stress_index: None,
        skin_temp_deviation_c: fused_values.get("skin_temp_deviation_c").copied(),
        vo2_max: None,
        readiness_score: None,
        recovery_score: None,
        extended_metrics: serde_json::Map::new(),
        provenance_payload: None,
    };

    Ok((fused_record, result))
}

/// Fuse one sleep match group into a single sleep record plus provenance.
/// `group` must contain at least one record.
#[tracing::instrument(skip(group, config), fields(owner = %owner, date = %date, source_count = group.records.len()))]
pub fn fuse_sleep(
    owner: uuid::Uuid,
    date: NaiveDate,
    group: &SleepMatchGroup,
    config: &FusionConfig,
) -> Result<(CanonicalSleepRecord, FusionResult)> {
    if group.records.is_empty() {
        return Err(FusionError::invalid_argument(
            "fuse_sleep requires at least one input record",
        ));
    }

    let mut result = FusionResult::new(owner, date, MetricGroup::Sleep, config.version.clone());
    let records = &group.records;

    macro_rules! field {
        ($name:ident) => {
            collect_readings(records, |r| r.$name, |r| r.source.as_str())
        };
    }

    let total = field!(total_sleep_minutes);
    let rem = field!(rem_minutes);
    let deep = field!(deep_minutes);
    let light = field!(light_minutes);
    let awake = field!(awake_minutes);
    let hrv = field!(avg_hrv_ms);
    let hr = field!(avg_hr_bpm);
    let spo2 = field!(avg_spo2_pct);
    let resp_rate = field!(avg_respiratory_rate);
    let skin_temp = field!(avg_skin_temp_deviation_c);

    let inputs: &[(&str, &HashMap<String, f64>)] = &[
        ("total_sleep_minutes", &total),
        ("rem_minutes", &rem),
        ("deep_minutes", &deep),
        ("light_minutes", &light),
        ("awake_minutes", &awake),
        ("avg_hrv_ms", &hrv),
        ("avg_hr_bpm", &hr),
        ("avg_spo2_pct", &spo2),
        ("avg_respiratory_rate", &resp_rate),
        ("avg_skin_temp_deviation_c", &skin_temp),
    ];

    let mut fused_values: HashMap<&str, f64> = HashMap::new();
    for &(field, readings) in inputs {
        let &(_, metric, tolerance_key) = SLEEP_METRIC_MAP
            .iter()
            .find(|&&(f, _, _)| f == field)
            .expect("field present in SLEEP_METRIC_MAP");
        if readings.is_empty() {
            continue;
        }
        let fused = fuse_metric(config, metric, readings, tolerance_key);
        if let Some(v) = fused.fused_value {
            fused_values.insert(field, v);
        }
        result.record(field, fused);
    }

    let primary = group
        .select_primary(config, "sleep_duration")
        .unwrap_or(&records[0]);

    let fused_record = CanonicalSleepRecord {
        owner,
        sleep_date: date,
        source: CanonicalDailyRecord::FUSED_SOURCE.to_string(),
        sleep_start: primary.sleep_start,
        sleep_end: primary.sleep_end,
        total_sleep_minutes: fused_values.get("total_sleep_minutes").map(|v| v.round() as i32),
        rem_minutes: fused_values.get("rem_minutes").map(|v| v.round() as i32),
        deep_minutes: fused_values.get("deep_minutes").map(|v| v.round() as i32),
        light_minutes: fused_values.get("light_minutes").map(|v| v.round() as i32),
        awake_minutes: fused_values.get("awake_minutes").map(|v| v.round() as i32),
        sleep_latency_minutes: primary.sleep_latency_minutes,
        sleep_efficiency_pct: primary.sleep_efficiency_pct,
        sleep_score: primary.sleep_score,
        interruption_count: primary.interruption_count,
        avg_hr_bpm: fused_values.get("avg_hr_bpm").copied(),
        min_hr_bpm: None,
        avg_hrv_ms: fused_values.get("avg_hrv_ms").copied(),
        avg_respiratory_rate: fused_values.get("avg_respiratory_rate").copied(),
        avg_spo2_pct: fused_values.get("avg_spo2_pct").copied(),
        avg_skin_temp_deviation_c: fused_values.get("avg_skin_temp_deviation_c").copied(),
        hypnogram: primary.hypnogram.clone(),
        provenance_payload: None,
    };

    Ok((fused_record, result))
}

/// Top-level orchestration: matches sleep sessions before fusing each group
/// independently, so a night-plus-nap day yields two distinct fused sleep
/// records.
pub struct FusionEngine<'a> {
    config: &'a FusionConfig,
}

impl<'a> FusionEngine<'a> {
    pub fn new(config: &'a FusionConfig) -> Self {
        Self { config }
    }

    #[tracing::instrument(skip(self, records))]
    pub fn fuse_daily_records(
        &self,
        owner: uuid::Uuid,
        date: NaiveDate,
        records: &[CanonicalDailyRecord],
    ) -> Result<(CanonicalDailyRecord, FusionResult)> {
        fuse_daily(owner, date, records, self.config)
    }

    #[tracing::instrument(skip(self, sessions))]
    pub fn fuse_sleep_sessions(
        &self,
        owner: uuid::Uuid,
        date: NaiveDate,
        sessions: &[CanonicalSleepRecord],
    ) -> Result<Vec<(CanonicalSleepRecord, FusionResult)>> {
        let groups = match_sessions(sessions, self.config);
        tracing::debug!(owner = %owner, date = %date, group_count = groups.len(), "matched sleep sessions");
        groups
            .iter()
            .map(|group| fuse_sleep(owner, date, group, self.config))
            .collect()
    }
}

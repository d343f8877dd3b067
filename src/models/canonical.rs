//! Canonical sleep and daily records — the vendor-neutral shapes every
//! adapter normalizes into and the fusion engine consumes.
//!
//! Grounded on `src/models/health_metrics.rs` (flat struct + hand-rolled
//! `.validate()` convention) and `original_source/src/wearables/fusion_engine.py`
//! (the metric/tolerance-key field tables these records feed).

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::enums::SleepStage;

/// One (epoch_seconds, stage) pair in a sleep hypnogram.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HypnogramEpoch {
    pub epoch_seconds: i64,
    pub stage: SleepStage,
}

/// One sensor's account of a single sleep period.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonicalSleepRecord {
    pub owner: uuid::Uuid,
    pub sleep_date: NaiveDate,
    pub source: String,

    pub sleep_start: Option<DateTime<Utc>>,
    pub sleep_end: Option<DateTime<Utc>>,

    pub total_sleep_minutes: Option<i32>,
    pub rem_minutes: Option<i32>,
    pub deep_minutes: Option<i32>,
    pub light_minutes: Option<i32>,
    pub awake_minutes: Option<i32>,

    pub sleep_latency_minutes: Option<i32>,
    pub sleep_efficiency_pct: Option<f64>,
    pub sleep_score: Option<i32>,
    pub interruption_count: Option<i32>,

    pub avg_hr_bpm: Option<f64>,
    pub min_hr_bpm: Option<f64>,
    pub avg_hrv_ms: Option<f64>,
    pub avg_respiratory_rate: Option<f64>,
    pub avg_spo2_pct: Option<f64>,
    pub avg_skin_temp_deviation_c: Option<f64>,

    pub hypnogram: Option<Vec<HypnogramEpoch>>,

    pub provenance_payload: Option<serde_json::Value>,
}

impl CanonicalSleepRecord {
    pub fn validate(&self) -> Result<(), String> {
        if self.source.trim().is_empty() {
            return Err("source must be non-empty".to_string());
        }
        if let (Some(start), Some(end)) = (self.sleep_start, self.sleep_end) {
            if start > end {
                return Err(format!(
                    "sleep_start ({start}) must be <= sleep_end ({end})"
                ));
            }
        }
        if let Some(score) = self.sleep_score {
            if !(0..=100).contains(&score) {
                return Err(format!("sleep_score {score} must be in 0..=100"));
            }
        }
        Ok(())
    }
}

/// One sensor's account of a single calendar day's activity and vitals.
///
/// `readiness_score` and `recovery_score` are the sensor's own proprietary
/// figures, carried through for reference but never fused — a fused record
/// always forces both to `None`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonicalDailyRecord {
    pub owner: uuid::Uuid,
    pub date: NaiveDate,
    pub source: String,

    pub resting_hr_bpm: Option<f64>,
    pub max_hr_bpm: Option<f64>,
    pub hrv_rmssd_ms: Option<f64>,
    pub steps: Option<i32>,
    pub active_calories_kcal: Option<f64>,
    pub total_calories_kcal: Option<f64>,
    pub active_minutes: Option<i32>,
    pub distance_m: Option<f64>,
    pub floors: Option<i32>,
    pub spo2_avg_pct: Option<f64>,
    pub respiratory_rate_avg: Option<f64>,
    pub stress_index: Option<f64>,
    pub skin_temp_deviation_c: Option<f64>,
    pub vo2_max: Option<f64>,

    /// Sensor-proprietary, never fused.
    pub readiness_score: Option<i32>,
    /// Sensor-proprietary, never fused.
    pub recovery_score: Option<i32>,

    pub extended_metrics: serde_json::Map<String, serde_json::Value>,
    pub provenance_payload: Option<serde_json::Value>,
}

impl CanonicalDailyRecord {
    pub const FUSED_SOURCE: &'static str = "fused";

    pub fn validate(&self) -> Result<(), String> {
        if self.source.trim().is_empty() {
            return Err("source must be non-empty".to_string());
        }
        Ok(())
    }

    pub fn is_fused(&self) -> bool {
        self.source == Self::FUSED_SOURCE
    }
}

//! Data types shared by the menstrual core: temperature readings, cycle
//! records, and symptom logs.
//!
//! Grounded on `original_source/src/wearables/menstrual/temp_ovulation.py`
//! (`DailyTemperature`), `cycle_tracker.py` (`CycleRecord`), and
//! `symptom_correlator.py` (`SymptomLog`, `SYMPTOM_SCHEMA`).

use std::collections::HashMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::enums::CyclePhase;

/// A single day's basal-temperature deviation from personal baseline, in °C.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyTemperatureReading {
    pub date: NaiveDate,
    pub deviation_c: f64,
    pub source: String,
}

/// One tracked menstrual cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CycleRecord {
    pub id: uuid::Uuid,
    pub period_start: NaiveDate,
    pub period_end: Option<NaiveDate>,
    pub cycle_length_days: Option<i32>,
    pub ovulation_date: Option<NaiveDate>,
    pub temperatures: Vec<DailyTemperatureReading>,
    pub is_complete: bool,
}

impl CycleRecord {
    /// `is_complete` holds iff `cycle_length_days` is known; `cycle_length_days`
    /// must equal the gap to the following cycle's `period_start`.
    pub fn validate(&self) -> Result<(), String> {
        if self.is_complete != self.cycle_length_days.is_some() {
            return Err(
                "is_complete must be true exactly when cycle_length_days is known".to_string(),
            );
        }
        Ok(())
    }
}

/// Symptom value after coercion: either a raw number or an unrecognized
/// categorical string excluded from numeric analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SymptomValue {
    Number(f64),
    Text(String),
}

/// One day's self-reported symptom entries, optionally joined with same-day
/// fused metrics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SymptomLog {
    pub date: NaiveDate,
    pub cycle_day: u32,
    pub phase: CyclePhase,
    pub symptoms: HashMap<String, SymptomValue>,
    pub fused_hrv_ms: Option<f64>,
    pub fused_rhr_bpm: Option<f64>,
    pub fused_sleep_minutes: Option<i32>,
}

//! Cycle Predictor: predicts the next period, ovulation, and fertile
//! window; classifies current phase and cycle day.
//!
//! Grounded on `original_source/src/wearables/menstrual/cycle_tracker.py`.

use chrono::NaiveDate;

use crate::config::{FusionConfig, PredictionModel};
use crate::menstrual::ovulation::detect_ovulation;
use crate::models::{CycleRecord, CyclePhase, DailyTemperatureReading};

/// Prediction produced by [`predict`].
#[derive(Debug, Clone, PartialEq)]
pub struct CyclePrediction {
    pub predicted_period_start: Option<NaiveDate>,
    pub predicted_period_start_early: Option<NaiveDate>,
    pub predicted_period_start_late: Option<NaiveDate>,
    pub predicted_ovulation_date: Option<NaiveDate>,
    pub fertile_window: Option<(NaiveDate, NaiveDate)>,
    pub avg_cycle_length_days: Option<f64>,
    pub is_irregular: bool,
    pub model_used: PredictionModel,
    pub confidence: f64,
    pub warnings: Vec<String>,
    pub current_phase: Option<CyclePhase>,
    pub current_cycle_day: Option<u32>,
}

fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

fn stdev(values: &[f64], mean_value: f64) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let variance = values
        .iter()
        .map(|v| (v - mean_value).powi(2))
        .sum::<f64>()
        / (values.len() - 1) as f64;
    variance.sqrt()
}

/// Length, in days, of a complete cycle record.
pub fn compute_cycle_length(record: &CycleRecord, next_period_start: NaiveDate) -> i64 {
    (next_period_start - record.period_start).num_days()
}

/// Cycle day (1-indexed) for `date` given the cycle's start date.
pub fn cycle_day_from_start(date: NaiveDate, cycle_start: NaiveDate) -> u32 {
    ((date - cycle_start).num_days().max(0) + 1) as u32
}

/// Classify the phase for cycle day `day`, preferring the known ovulation
/// date when available.
pub fn classify_cycle(day: u32, today: NaiveDate, ovulation_date: Option<NaiveDate>) -> CyclePhase {
    if day <= 5 {
        return CyclePhase::Menstrual;
    }
    if let Some(ov) = ovulation_date {
        let delta = (ov - today).num_days();
        return if delta > 1 {
            CyclePhase::Follicular
        } else if delta >= -1 {
            CyclePhase::Ovulation
        } else {
            CyclePhase::Luteal
        };
    }
    if day <= 13 {
        CyclePhase::Follicular
    } else if day <= 15 {
        CyclePhase::Ovulation
    } else {
        CyclePhase::Luteal
    }
}

/// Predict the next period, ovulation, and fertile window from historical
/// cycles (oldest first) and, optionally, the in-progress cycle's start
/// date and temperature readings.
#[tracing::instrument(skip(history, current_temperatures, config), fields(as_of = %as_of, history_len = history.len()))]
pub fn predict(
    history: &[CycleRecord],
    current_cycle_start: Option<NaiveDate>,
    current_temperatures: &[DailyTemperatureReading],
    as_of: NaiveDate,
    config: &FusionConfig,
) -> CyclePrediction {
    let mut warnings = Vec::new();

    let complete: Vec<&CycleRecord> = history.iter().filter(|c| c.is_complete).collect();
    let n = config.menstrual.rolling_average_cycles as usize;
    let considered: Vec<&CycleRecord> = complete.iter().rev().take(n).rev().copied().collect();
    let lengths: Vec<f64> = considered
        .iter()
        .filter_map(|c| c.cycle_length_days)
        .map(|l| l as f64)
        .collect();

    if lengths.is_empty() {
        return CyclePrediction {
            predicted_period_start: None,
            predicted_period_start_early: None,
            predicted_period_start_late: None,
            predicted_ovulation_date: None,
            fertile_window: None,
            avg_cycle_length_days: None,
            is_irregular: false,
            model_used: config.menstrual.prediction_model,
            confidence: 0.1,
            warnings: vec!["No complete cycles available for prediction".to_string()],
            current_phase: None,
            current_cycle_day: None,
        };
    }

    let avg = mean(&lengths);
    let std = stdev(&lengths, avg);
    let is_irregular = std > 7.0;

    for length in &lengths {
        if (*length as u32) < config.menstrual.min_cycle_days || (*length as u32) > config.menstrual.max_cycle_days
        {
            warnings.push(format!(
                "cycle length {length} outside configured bounds [{}, {}]",
                config.menstrual.min_cycle_days, config.menstrual.max_cycle_days
            ));
        }
    }

    let anchor = current_cycle_start.or_else(|| complete.last().map(|c| c.period_start));
    let anchor = match anchor {
        Some(a) => a,
        None => {
            return CyclePrediction {
                predicted_period_start: None,
                predicted_period_start_early: None,
                predicted_period_start_late: None,
                predicted_ovulation_date: None,
                fertile_window: None,
                avg_cycle_length_days: Some(avg),
                is_irregular,
                model_used: config.menstrual.prediction_model,
                confidence: 0.1,
                warnings: vec!["No anchor cycle start available for prediction".to_string()],
                current_phase: None,
                current_cycle_day: None,
            };
        }
    };

    let predicted_period_start = anchor + chrono::Duration::days(avg.round() as i64);
    let predicted_period_start_early = anchor + chrono::Duration::days((avg - std).round() as i64);
    let predicted_period_start_late = anchor + chrono::Duration::days((avg + std).round() as i64);

    let mut predicted_ovulation_date = predicted_period_start - chrono::Duration::days(14);
    let fertile_window_days = config.menstrual.fertile_window_days as i64;
    let mut fertile_window = (
        predicted_ovulation_date - chrono::Duration::days(fertile_window_days - 1),
        predicted_ovulation_date,
    );

    let mut confidence = 0.5 * (considered.len() as f64 / n as f64).min(1.0)
        + 0.5 * (1.0 - std / 14.0).max(0.2);
    let mut model_used = PredictionModel::CalendarOnly;
    let mut predicted_period_start = predicted_period_start;

    if config.menstrual.prediction_model == PredictionModel::TemperatureAssisted
        && !current_temperatures.is_empty()
    {
        let detector_result = detect_ovulation(current_temperatures, current_cycle_start, config);
        if detector_result.detected {
            if let Some(ov) = detector_result.ovulation_date {
                predicted_ovulation_date = ov;
                fertile_window = detector_result
                    .fertile_window
                    .unwrap_or(fertile_window);
                predicted_period_start = ov + chrono::Duration::days(14);
                confidence = (0.6 + detector_result.confidence * 0.3).min(0.9);
                model_used = PredictionModel::TemperatureAssisted;
            }
        }
    }

    let day = cycle_day_from_start(as_of, anchor);
    let phase = classify_cycle(day, as_of, Some(predicted_ovulation_date));

    CyclePrediction {
        predicted_period_start: Some(predicted_period_start),
        predicted_period_start_early: Some(predicted_period_start_early),
        predicted_period_start_late: Some(predicted_period_start_late),
        predicted_ovulation_date: Some(predicted_ovulation_date),
        fertile_window: Some(fertile_window),
        avg_cycle_length_days: Some(avg),
        is_irregular,
        current_phase: Some(phase),
        current_cycle_day: Some(day),
        model_used,
        confidence: confidence.clamp(0.0, 1.0),
        warnings,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> FusionConfig {
        crate::config::parse_fusion_config(
            r#"
version: "1.0"
device_weights:
  placeholder:
    x: 1.0
readiness_score:
  enabled: false
menstrual_cycle:
  prediction_model: calendar_only
  fertile_window:
    confirmation_days: 3
    predicted_window_days: 6
  cycle_length:
    rolling_average_cycles: 6
    min_cycle_days: 21
    max_cycle_days: 45
backfill:
  enabled: false
"#,
        )
        .expect("valid test config")
    }

    fn date(day: i64) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 1).unwrap() + chrono::Duration::days(day)
    }

    #[test]
    fn regular_cycles_predict_28_day_period_and_14_day_ovulation() {
        let cfg = config();
        let mut history = Vec::new();
        for i in 0..6 {
            let start = date(-28 * (6 - i));
            history.push(CycleRecord {
                id: uuid::Uuid::new_v4(),
                period_start: start,
                period_end: None,
                cycle_length_days: Some(28),
                ovulation_date: None,
                temperatures: Vec::new(),
                is_complete: true,
            });
        }

        let prediction = predict(&history, Some(date(0)), &[], date(0), &cfg);
        assert_eq!(prediction.predicted_period_start, Some(date(28)));
        assert_eq!(prediction.predicted_ovulation_date, Some(date(14)));
        assert_eq!(prediction.avg_cycle_length_days, Some(28.0));
        assert!(!prediction.is_irregular);
    }

    #[test]
    fn empty_history_yields_low_confidence_warning() {
        let cfg = config();
        let prediction = predict(&[], None, &[], date(0), &cfg);
        assert!(prediction.confidence <= 0.1);
        assert!(prediction
            .warnings
            .iter()
            .any(|w| w.contains("No complete cycles available for prediction")));
    }

    #[test]
    fn classify_cycle_early_days_are_menstrual() {
        assert_eq!(classify_cycle(3, date(3), None), CyclePhase::Menstrual);
    }

    #[test]
    fn classify_cycle_fallback_without_ovulation() {
        assert_eq!(classify_cycle(10, date(10), None), CyclePhase::Follicular);
        assert_eq!(classify_cycle(14, date(14), None), CyclePhase::Ovulation);
        assert_eq!(classify_cycle(20, date(20), None), CyclePhase::Luteal);
    }
}

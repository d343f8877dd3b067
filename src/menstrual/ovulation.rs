//! Temperature-driven ovulation detector: locates the ovulation day from a
//! basal temperature-deviation sequence via the biphasic-shift pattern.
//!
//! Grounded on `original_source/src/wearables/menstrual/temp_ovulation.py`.

use chrono::NaiveDate;

use crate::config::FusionConfig;
use crate::models::DailyTemperatureReading;

/// Outcome of running the ovulation detector over one cycle's temperatures.
#[derive(Debug, Clone, PartialEq)]
pub struct OvulationDetectionResult {
    pub detected: bool,
    pub ovulation_date: Option<NaiveDate>,
    pub baseline_mean_c: Option<f64>,
    pub baseline_stdev_c: Option<f64>,
    pub temp_shift_c: Option<f64>,
    pub fertile_window: Option<(NaiveDate, NaiveDate)>,
    pub confidence: f64,
    pub note: Option<String>,
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

fn unavailable(note: &str) -> OvulationDetectionResult {
    OvulationDetectionResult {
        detected: false,
        ovulation_date: None,
        baseline_mean_c: None,
        baseline_stdev_c: None,
        temp_shift_c: None,
        fertile_window: None,
        confidence: 0.0,
        note: Some(note.to_string()),
    }
}

/// Detect ovulation from a chronological temperature sequence. `cycle_start`
/// anchors the baseline window to the first 10 days of the cycle when
/// known; otherwise the first half of the sequence (minimum 5 readings) is
/// used.
#[tracing::instrument(skip(readings, config), fields(reading_count = readings.len()))]
pub fn detect_ovulation(
    readings: &[DailyTemperatureReading],
    cycle_start: Option<NaiveDate>,
    config: &FusionConfig,
) -> OvulationDetectionResult {
    if readings.is_empty() {
        return unavailable("no temperature readings available");
    }

    let mut ordered = readings.to_vec();
    ordered.sort_by_key(|r| r.date);

    let baseline_readings: Vec<&DailyTemperatureReading> = match cycle_start {
        Some(start) => ordered
            .iter()
            .filter(|r| {
                let day = (r.date - start).num_days();
                (0..10).contains(&day)
            })
            .collect(),
        None => {
            let half = (ordered.len() / 2).max(5).min(ordered.len());
            ordered.iter().take(half).collect()
        }
    };

    if baseline_readings.len() < 3 {
        return unavailable("fewer than 3 baseline readings available");
    }

    let baseline_values: Vec<f64> = baseline_readings.iter().map(|r| r.deviation_c).collect();
    let baseline_mean = mean(&baseline_values);
    let baseline_stdev = stdev(&baseline_values, baseline_mean);

    let effective_threshold = config.menstrual.temp_shift_threshold_c.max(2.0 * baseline_stdev);
    let shift_target = baseline_mean + effective_threshold;

    let baseline_end_date = baseline_readings
        .iter()
        .map(|r| r.date)
        .max()
        .expect("baseline non-empty");

    let post_baseline: Vec<&DailyTemperatureReading> = ordered
        .iter()
        .filter(|r| r.date > baseline_end_date)
        .collect();

    let confirmation_days = config.menstrual.ovulation_confirmation_days as usize;
    let mut streak_start_idx: Option<usize> = None;
    let mut streak_len = 0usize;
    let mut confirmed_at: Option<(usize, usize)> = None; // (streak_start_idx, streak_len)

    for (i, reading) in post_baseline.iter().enumerate() {
        if reading.deviation_c >= shift_target {
            if streak_start_idx.is_none() {
                streak_start_idx = Some(i);
            }
            streak_len += 1;
            if streak_len >= confirmation_days && confirmed_at.is_none() {
                confirmed_at = Some((streak_start_idx.unwrap(), streak_len));
            }
        } else {
            streak_start_idx = None;
            streak_len = 0;
        }
    }

    let (shift_start_idx, streak_len) = match confirmed_at {
        Some(v) => v,
        None => {
            return OvulationDetectionResult {
                detected: false,
                ovulation_date: None,
                baseline_mean_c: Some(baseline_mean),
                baseline_stdev_c: Some(baseline_stdev),
                temp_shift_c: None,
                fertile_window: None,
                confidence: 0.0,
                note: Some(format!(
                    "no sustained elevation of >= {confirmation_days} days found above {shift_target:.2} C"
                )),
            };
        }
    };

    let shift_start_date = post_baseline[shift_start_idx].date;
    let ovulation_date = shift_start_date - chrono::Duration::days(1);

    let post_shift_values: Vec<f64> = post_baseline[shift_start_idx..]
        .iter()
        .map(|r| r.deviation_c)
        .collect();
    let post_mean = mean(&post_shift_values);
    let temp_shift = post_mean - baseline_mean;

    let fertile_window_days = config.menstrual.fertile_window_days as i64;
    let fertile_window = (
        ovulation_date - chrono::Duration::days(fertile_window_days - 1),
        ovulation_date,
    );

    let confidence = 0.6 * (temp_shift / 0.5).min(1.0)
        + 0.4 * (streak_len as f64 / (2.0 * confirmation_days as f64)).min(1.0);

    OvulationDetectionResult {
        detected: true,
        ovulation_date: Some(ovulation_date),
        baseline_mean_c: Some(baseline_mean),
        baseline_stdev_c: Some(baseline_stdev),
        temp_shift_c: Some(temp_shift),
        fertile_window: Some(fertile_window),
        confidence: confidence.clamp(0.0, 1.0),
        note: None,
    }
}

/// Current phase's temperature given the most recent known ovulation date.
pub fn phase_for_date(date: NaiveDate, ovulation_date: Option<NaiveDate>) -> &'static str {
    match ovulation_date {
        Some(ov) if date < ov => "follicular",
        Some(_) => "luteal",
        None => "unknown",
    }
}

/// Average pre-ovulation ("follicular") and post-ovulation ("luteal")
/// temperature deviations given a known ovulation date. Requires at least 3
/// readings on each side; otherwise that side is `None`.
pub fn compute_follicular_luteal_averages(
    readings: &[DailyTemperatureReading],
    ovulation_date: NaiveDate,
) -> (Option<f64>, Option<f64>) {
    let follicular: Vec<f64> = readings
        .iter()
        .filter(|r| r.date < ovulation_date)
        .map(|r| r.deviation_c)
        .collect();
    let luteal: Vec<f64> = readings
        .iter()
        .filter(|r| r.date >= ovulation_date)
        .map(|r| r.deviation_c)
        .collect();

    let follicular_avg = if follicular.len() >= 3 {
        Some(mean(&follicular))
    } else {
        None
    };
    let luteal_avg = if luteal.len() >= 3 { Some(mean(&luteal)) } else { None };

    (follicular_avg, luteal_avg)
}

//! Symptom Correlator: derives ranked insights from a multi-cycle symptom
//! log — phase-symptom patterns, symptom-metric correlations, and
//! phase-sleep patterns.
//!
//! Grounded on `original_source/src/wearables/menstrual/symptom_correlator.py`.

use std::collections::HashMap;

use crate::models::{CyclePhase, SymptomLog, SymptomValue};

const MIN_DATA_POINTS: usize = 7;

/// One ranked insight produced by the correlator.
#[derive(Debug, Clone, PartialEq)]
pub struct SymptomInsight {
    pub kind: InsightKind,
    pub summary: String,
    pub confidence: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsightKind {
    PhaseSymptomPattern,
    SymptomMetricCorrelation,
    PhaseSleepPattern,
}

fn severity_to_numeric(s: &str) -> Option<f64> {
    match s.to_lowercase().as_str() {
        "none" => Some(0.0),
        "mild" => Some(1.0),
        "moderate" => Some(2.0),
        "severe" => Some(3.0),
        "spotting" => Some(0.5),
        "light" => Some(1.0),
        "medium" => Some(2.0),
        "heavy" => Some(3.0),
        "low" => Some(0.0),
        "normal" => Some(1.0),
        "high" => Some(2.0),
        _ => None,
    }
}

fn symptom_to_numeric(value: &SymptomValue) -> Option<f64> {
    match value {
        SymptomValue::Number(n) => Some(*n),
        SymptomValue::Text(s) => severity_to_numeric(s),
    }
}

fn pearson_r(xs: &[f64], ys: &[f64]) -> Option<f64> {
    if xs.len() != ys.len() || xs.len() < 3 {
        return None;
    }
    let n = xs.len() as f64;
    let mean_x = xs.iter().sum::<f64>() / n;
    let mean_y = ys.iter().sum::<f64>() / n;

    let mut cov = 0.0;
    let mut var_x = 0.0;
    let mut var_y = 0.0;
    for (x, y) in xs.iter().zip(ys.iter()) {
        let dx = x - mean_x;
        let dy = y - mean_y;
        cov += dx * dy;
        var_x += dx * dx;
        var_y += dy * dy;
    }
    if var_x == 0.0 || var_y == 0.0 {
        return None;
    }
    Some((cov / (var_x.sqrt() * var_y.sqrt())).clamp(-1.0, 1.0))
}

fn phase_logs(logs: &[SymptomLog]) -> HashMap<CyclePhase, Vec<&SymptomLog>> {
    let mut map: HashMap<CyclePhase, Vec<&SymptomLog>> = HashMap::new();
    for log in logs {
        map.entry(log.phase).or_default().push(log);
    }
    map
}

fn phase_symptom_insights(logs: &[SymptomLog]) -> Vec<SymptomInsight> {
    let by_phase = phase_logs(logs);
    let mut symptom_phase_means: HashMap<String, HashMap<CyclePhase, f64>> = HashMap::new();

    for (phase, phase_entries) in &by_phase {
        if phase_entries.len() < 3 {
            continue;
        }
        let mut sums: HashMap<String, (f64, usize)> = HashMap::new();
        for log in phase_entries {
            for (symptom, value) in &log.symptoms {
                if let Some(numeric) = symptom_to_numeric(value) {
                    let entry = sums.entry(symptom.clone()).or_insert((0.0, 0));
                    entry.0 += numeric;
                    entry.1 += 1;
                }
            }
        }
        for (symptom, (sum, count)) in sums {
            symptom_phase_means
                .entry(symptom)
                .or_default()
                .insert(*phase, sum / count as f64);
        }
    }

    let total_logs = logs.len();
    let mut insights = Vec::new();

    for (symptom, phase_means) in &symptom_phase_means {
        if phase_means.len() < 2 {
            continue;
        }
        let (peak_phase, peak_mean) = phase_means
            .iter()
            .max_by(|a, b| a.1.partial_cmp(b.1).unwrap_or(std::cmp::Ordering::Equal))
            .map(|(p, v)| (*p, *v))
            .expect("phase_means non-empty");
        let (trough_phase, trough_mean) = phase_means
            .iter()
            .min_by(|a, b| a.1.partial_cmp(b.1).unwrap_or(std::cmp::Ordering::Equal))
            .map(|(p, v)| (*p, *v))
            .expect("phase_means non-empty");

        if peak_mean <= 0.0 || (peak_mean - trough_mean) < 0.3 {
            continue;
        }

        let pct_increase = (peak_mean - trough_mean) / trough_mean.max(0.1) * 100.0;
        let confidence = (0.5 + (total_logs as f64 / 60.0).min(0.4)).min(0.9);

        insights.push(SymptomInsight {
            kind: InsightKind::PhaseSymptomPattern,
            summary: format!(
                "{symptom} is {pct_increase:.0}% worse in {peak_phase} phase than {trough_phase} phase"
            ),
            confidence,
        });
    }

    insights
}

fn symptom_metric_insights(logs: &[SymptomLog], metric: &str) -> Vec<SymptomInsight> {
    let mut symptom_pairs: HashMap<String, (Vec<f64>, Vec<f64>)> = HashMap::new();

    for log in logs {
        let metric_value = match metric {
            "hrv" => log.fused_hrv_ms,
            "rhr" => log.fused_rhr_bpm,
            "sleep_minutes" => log.fused_sleep_minutes.map(|v| v as f64),
            _ => None,
        };
        let metric_value = match metric_value {
            Some(v) => v,
            None => continue,
        };
        for (symptom, value) in &log.symptoms {
            if let Some(numeric) = symptom_to_numeric(value) {
                let entry = symptom_pairs.entry(symptom.clone()).or_default();
                entry.0.push(numeric);
                entry.1.push(metric_value);
            }
        }
    }

    let mut insights = Vec::new();
    for (symptom, (xs, ys)) in symptom_pairs {
        if xs.len() < 10 {
            continue;
        }
        if let Some(r) = pearson_r(&xs, &ys) {
            if r.abs() >= 0.25 {
                let confidence = (0.8 * r.abs() + 0.002 * xs.len() as f64).min(0.9);
                insights.push(SymptomInsight {
                    kind: InsightKind::SymptomMetricCorrelation,
                    summary: format!("{symptom} correlates with {metric} (r = {r:.2})"),
                    confidence,
                });
            }
        }
    }
    insights
}

fn phase_sleep_insights(logs: &[SymptomLog]) -> Vec<SymptomInsight> {
    let by_phase = phase_logs(logs);
    let mut phase_means: HashMap<CyclePhase, f64> = HashMap::new();

    for (phase, entries) in &by_phase {
        if entries.len() < 3 {
            continue;
        }
        let values: Vec<f64> = entries
            .iter()
            .filter_map(|l| l.fused_sleep_minutes)
            .map(|v| v as f64)
            .collect();
        if values.is_empty() {
            continue;
        }
        phase_means.insert(*phase, values.iter().sum::<f64>() / values.len() as f64);
    }

    if phase_means.len() < 2 {
        return Vec::new();
    }

    let (best_phase, best_mean) = phase_means
        .iter()
        .max_by(|a, b| a.1.partial_cmp(b.1).unwrap_or(std::cmp::Ordering::Equal))
        .map(|(p, v)| (*p, *v))
        .expect("non-empty");
    let (worst_phase, worst_mean) = phase_means
        .iter()
        .min_by(|a, b| a.1.partial_cmp(b.1).unwrap_or(std::cmp::Ordering::Equal))
        .map(|(p, v)| (*p, *v))
        .expect("non-empty");

    if (best_mean - worst_mean) < 15.0 {
        return Vec::new();
    }

    vec![SymptomInsight {
        kind: InsightKind::PhaseSleepPattern,
        summary: format!(
            "sleep averages {:.0} min more in {best_phase} phase than {worst_phase} phase",
            best_mean - worst_mean
        ),
        confidence: 0.7,
    }]
}

/// Generate ranked insights from `logs` against `correlation_metric`
/// ("hrv", "rhr", or "sleep_minutes"). Returns empty when fewer than
/// [`MIN_DATA_POINTS`] logs are present.
#[tracing::instrument(skip(logs), fields(log_count = logs.len()))]
pub fn generate_insights(logs: &[SymptomLog], correlation_metric: &str) -> Vec<SymptomInsight> {
    if logs.len() < MIN_DATA_POINTS {
        tracing::debug!(log_count = logs.len(), "too few symptom logs for insight generation");
        return Vec::new();
    }

    let mut insights = Vec::new();
    insights.extend(phase_symptom_insights(logs));
    insights.extend(symptom_metric_insights(logs, correlation_metric));
    insights.extend(phase_sleep_insights(logs));

    insights.sort_by(|a, b| b.confidence.partial_cmp(&a.confidence).unwrap_or(std::cmp::Ordering::Equal));
    insights
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn log(day: i64, phase: CyclePhase, cramps: f64, sleep: i32) -> SymptomLog {
        let mut symptoms = HashMap::new();
        symptoms.insert("cramps".to_string(), SymptomValue::Number(cramps));
        SymptomLog {
            date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap() + chrono::Duration::days(day),
            cycle_day: (day + 1).max(1) as u32,
            phase,
            symptoms,
            fused_hrv_ms: None,
            fused_rhr_bpm: None,
            fused_sleep_minutes: Some(sleep),
        }
    }

    #[test]
    fn below_minimum_sample_returns_empty() {
        let logs = vec![log(0, CyclePhase::Menstrual, 2.0, 400); 3];
        assert!(generate_insights(&logs, "hrv").is_empty());
    }

    #[test]
    fn pearson_r_is_none_for_zero_variance() {
        let xs = vec![1.0, 1.0, 1.0, 1.0];
        let ys = vec![2.0, 3.0, 4.0, 5.0];
        assert_eq!(pearson_r(&xs, &ys), None);
    }

    #[test]
    fn pearson_r_is_bounded() {
        let xs = vec![1.0, 2.0, 3.0, 4.0, 5.0];
        let ys = vec![2.0, 4.0, 6.0, 8.0, 10.0];
        let r = pearson_r(&xs, &ys).unwrap();
        assert!((-1.0..=1.0).contains(&r));
        assert!((r - 1.0).abs() < 1e-9);
    }

    #[test]
    fn phase_with_worse_symptoms_surfaces_as_insight() {
        let mut logs = Vec::new();
        for day in 0..4 {
            logs.push(log(day, CyclePhase::Menstrual, 3.0, 380));
        }
        for day in 10..14 {
            logs.push(log(day, CyclePhase::Follicular, 0.5, 440));
        }
        let insights = generate_insights(&logs, "hrv");
        assert!(insights
            .iter()
            .any(|i| i.kind == InsightKind::PhaseSymptomPattern));
    }
}

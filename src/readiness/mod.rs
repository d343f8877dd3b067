//! Readiness Scorer: composes a 0-100 daily readiness score from fused
//! metrics, rolling personal baselines, and workout recency.
//!
//! Grounded on `original_source/src/wearables/readiness_score.py`. Per the
//! documented discrepancy in that source — where the confidence/raw-score
//! expression is computed once, then immediately overwritten by a simpler
//! re-normalization — this only implements the second, simpler formula.

use chrono::{DateTime, NaiveDate, Utc};

use crate::config::FusionConfig;
use crate::models::{CanonicalDailyRecord, CanonicalSleepRecord, ComponentBreakdown, ReadinessBand, ReadinessScore};

fn sigmoid_score(z: f64, steepness: f64) -> f64 {
    1.0 / (1.0 + (-steepness * z).exp())
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

/// A single component's scoring outcome before weighting.
struct ComponentResult {
    name: &'static str,
    raw_score: f64,
    available: bool,
}

fn score_hrv_vs_baseline(today_hrv: Option<f64>, baseline: &[f64]) -> ComponentResult {
    if baseline.len() < 7 {
        return ComponentResult {
            name: "hrv_vs_baseline",
            raw_score: 0.5,
            available: false,
        };
    }
    match today_hrv {
        Some(today) => {
            let mu = mean(baseline);
            let sigma = stdev(baseline, mu);
            if sigma == 0.0 {
                return ComponentResult {
                    name: "hrv_vs_baseline",
                    raw_score: 0.5,
                    available: true,
                };
            }
            let z = (today - mu) / sigma;
            ComponentResult {
                name: "hrv_vs_baseline",
                raw_score: sigmoid_score(z, 1.5),
                available: true,
            }
        }
        None => ComponentResult {
            name: "hrv_vs_baseline",
            raw_score: 0.5,
            available: false,
        },
    }
}

fn score_rhr_vs_baseline(today_rhr: Option<f64>, baseline: &[f64]) -> ComponentResult {
    if baseline.len() < 7 {
        return ComponentResult {
            name: "resting_hr_vs_baseline",
            raw_score: 0.5,
            available: false,
        };
    }
    match today_rhr {
        Some(today) => {
            let mu = mean(baseline);
            let sigma = stdev(baseline, mu);
            if sigma == 0.0 {
                return ComponentResult {
                    name: "resting_hr_vs_baseline",
                    raw_score: 0.5,
                    available: true,
                };
            }
            // Lower RHR is better: invert the sign relative to HRV.
            let z = (mu - today) / sigma;
            ComponentResult {
                name: "resting_hr_vs_baseline",
                raw_score: sigmoid_score(z, 1.5),
                available: true,
            }
        }
        None => ComponentResult {
            name: "resting_hr_vs_baseline",
            raw_score: 0.5,
            available: false,
        },
    }
}

fn clamp01(v: f64) -> f64 {
    v.clamp(0.0, 1.0)
}

fn score_sleep_quality(sleep: Option<&CanonicalSleepRecord>) -> ComponentResult {
    let sleep = match sleep {
        Some(s) => s,
        None => {
            return ComponentResult {
                name: "sleep_quality",
                raw_score: 0.5,
                available: false,
            }
        }
    };

    let duration_score = match sleep.total_sleep_minutes {
        Some(total) => clamp01((total as f64 - 300.0) / (450.0 - 300.0)),
        None => 0.5,
    };

    let deep_score = match (sleep.deep_minutes, sleep.total_sleep_minutes) {
        (Some(deep), Some(total)) if total > 0 => {
            clamp01((deep as f64 / total as f64) / 0.20)
        }
        _ => 0.5,
    };

    let efficiency_score = match sleep.sleep_efficiency_pct {
        Some(pct) => clamp01((pct - 70.0) / (100.0 - 70.0)),
        None => 0.5,
    };

    let raw = duration_score * 0.5 + deep_score * 0.3 + efficiency_score * 0.2;
    ComponentResult {
        name: "sleep_quality",
        raw_score: raw,
        available: true,
    }
}

fn score_sleep_consistency(recent_starts: &[DateTime<Utc>]) -> ComponentResult {
    if recent_starts.len() < 3 {
        return ComponentResult {
            name: "sleep_consistency",
            raw_score: 0.5,
            available: false,
        };
    }
    let minutes: Vec<f64> = recent_starts
        .iter()
        .map(|dt| {
            let hour: f64 = dt.format("%H").to_string().parse().unwrap_or(0.0);
            let minute: f64 = dt.format("%M").to_string().parse().unwrap_or(0.0);
            hour * 60.0 + minute
        })
        .collect();
    let mu = mean(&minutes);
    let sigma = stdev(&minutes, mu);
    ComponentResult {
        name: "sleep_consistency",
        raw_score: (1.0 - sigma / 60.0).max(0.0),
        available: true,
    }
}

fn score_recovery_time(days_since_hard_workout: Option<u32>) -> ComponentResult {
    match days_since_hard_workout {
        None => ComponentResult {
            name: "recovery_time",
            raw_score: 0.7,
            available: false,
        },
        Some(days) => {
            let raw_score = match days {
                0 => 0.3,
                1 => 0.5,
                2 => 0.75,
                3 => 0.9,
                _ => 1.0,
            };
            ComponentResult {
                name: "recovery_time",
                raw_score,
                available: true,
            }
        }
    }
}

/// Inputs the caller assembles for a single subject-date readiness
/// computation. All baselines/histories are the caller's responsibility to
/// windowed correctly; the scorer does not look beyond what it's given.
pub struct ReadinessInputs<'a> {
    pub daily: Option<&'a CanonicalDailyRecord>,
    pub sleep: Option<&'a CanonicalSleepRecord>,
    pub hrv_baseline: &'a [f64],
    pub rhr_baseline: &'a [f64],
    pub recent_sleep_starts: &'a [DateTime<Utc>],
    pub days_since_hard_workout: Option<u32>,
}

/// Compose the readiness score for `date` from `inputs`, per the weights and
/// thresholds in `config`.
#[tracing::instrument(skip(inputs, config), fields(owner = %owner, date = %date))]
pub fn compute_readiness(
    owner: uuid::Uuid,
    date: NaiveDate,
    inputs: &ReadinessInputs,
    config: &FusionConfig,
) -> ReadinessScore {
    if !config.readiness.enabled {
        return ReadinessScore {
            owner,
            date,
            score: 0,
            band: ReadinessBand::Concern,
            components: Vec::new(),
            available: false,
            computed_at: Utc::now(),
        };
    }

    let today_hrv = inputs.daily.and_then(|d| d.hrv_rmssd_ms);
    let today_rhr = inputs.daily.and_then(|d| d.resting_hr_bpm);

    let results = [
        score_hrv_vs_baseline(today_hrv, inputs.hrv_baseline),
        score_rhr_vs_baseline(today_rhr, inputs.rhr_baseline),
        score_sleep_quality(inputs.sleep),
        score_sleep_consistency(inputs.recent_sleep_starts),
        score_recovery_time(inputs.days_since_hard_workout),
    ];

    let weight_of = |name: &str| -> f64 {
        config
            .readiness
            .components
            .iter()
            .find(|c| c.name == name)
            .map(|c| c.weight)
            .unwrap_or(0.0)
    };

    let mut breakdown = Vec::with_capacity(results.len());
    let mut available_weight_sum = 0.0;
    let mut weighted_raw_sum = 0.0;

    for result in &results {
        let weight = weight_of(result.name);
        breakdown.push(ComponentBreakdown {
            name: result.name.to_string(),
            weight,
            raw_score: result.raw_score,
            available: result.available,
        });
        if result.available {
            available_weight_sum += weight;
            weighted_raw_sum += result.raw_score * weight;
        }
    }

    if available_weight_sum <= 0.0 {
        return ReadinessScore {
            owner,
            date,
            score: 50,
            band: ReadinessBand::Watch,
            components: breakdown,
            available: false,
            computed_at: Utc::now(),
        };
    }

    let raw = weighted_raw_sum / available_weight_sum;
    let score = (raw * 100.0).round().clamp(0.0, 100.0) as i32;
    let band = if score >= config.readiness.thriving_threshold {
        ReadinessBand::Thriving
    } else if score >= config.readiness.watch_threshold {
        ReadinessBand::Watch
    } else {
        ReadinessBand::Concern
    };

    ReadinessScore {
        owner,
        date,
        score,
        band,
        components: breakdown,
        available: true,
        computed_at: Utc::now(),
    }
}

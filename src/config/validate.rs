//! Validation: collects every violation before failing, matching the
//! teacher's validation modules and `config_loader.py`'s `_validate_and_build`.

use std::collections::HashMap;

use crate::error::{FusionError, Result};

use super::schema::{
    BackfillConfig, FusionConfig, MenstrualConfig, PredictionModel, RawDocument, ReadinessComponent,
    ReadinessConfig, SleepMatchingConfig,
};

pub(crate) fn validate_and_build(raw: RawDocument) -> Result<FusionConfig> {
    let mut errors: Vec<String> = Vec::new();

    let version = raw.version.clone().unwrap_or_else(|| "1.0".to_string());

    // ---- device_weights ----
    if raw.device_weights.is_empty() {
        errors.push("'device_weights' section is missing or empty".to_string());
    }
    let mut device_weights: HashMap<String, HashMap<String, f64>> = HashMap::new();
    for (metric, sources) in &raw.device_weights {
        let mut inner = HashMap::new();
        for (source, value) in sources {
            match value_as_f64(value) {
                Some(w) if (0.0..=1.0).contains(&w) => {
                    inner.insert(source.clone(), w);
                }
                Some(w) => errors.push(format!(
                    "device_weights.{metric}.{source} = {w} is out of range [0.0, 1.0]"
                )),
                None => errors.push(format!(
                    "device_weights.{metric}.{source} must be a number, got {value:?}"
                )),
            }
        }
        device_weights.insert(metric.clone(), inner);
    }

    // ---- tolerances ----
    let mut tolerances: HashMap<String, f64> = HashMap::new();
    for (key, value) in &raw.tolerances {
        match value_as_f64(value) {
            Some(t) if t >= 0.0 => {
                tolerances.insert(key.clone(), t);
            }
            Some(t) => errors.push(format!("tolerances.{key} = {t} must be non-negative")),
            None => errors.push(format!("tolerances.{key} must be a number, got {value:?}")),
        }
    }

    // ---- sleep_matching ----
    let min_overlap_pct = raw.sleep_matching.min_overlap_pct.unwrap_or(60.0);
    let max_start_diff_minutes = raw.sleep_matching.max_start_diff_minutes.unwrap_or(60);
    let sleep_day_cutoff_hour = raw.sleep_matching.sleep_day_cutoff_hour.unwrap_or(18);

    if !(0.0..=100.0).contains(&min_overlap_pct) {
        errors.push(format!(
            "sleep_matching.min_overlap_pct = {min_overlap_pct} must be in [0, 100]"
        ));
    }
    if max_start_diff_minutes < 0 {
        errors.push(format!(
            "sleep_matching.max_start_diff_minutes = {max_start_diff_minutes} must be >= 0"
        ));
    }
    if !(0..=23).contains(&sleep_day_cutoff_hour) {
        errors.push(format!(
            "sleep_matching.sleep_day_cutoff_hour = {sleep_day_cutoff_hour} must be in [0, 23]"
        ));
    }
    let sleep_matching = SleepMatchingConfig {
        min_overlap_pct,
        max_start_diff_minutes,
        sleep_day_cutoff_hour: sleep_day_cutoff_hour.clamp(0, 23) as u8,
    };

    // ---- readiness_score ----
    let readiness_enabled = raw.readiness_score.enabled.unwrap_or(true);
    let mut components = Vec::new();
    for (name, raw_component) in &raw.readiness_score.components {
        let weight = match &raw_component.weight {
            Some(v) => match value_as_f64(v) {
                Some(w) => w,
                None => {
                    errors.push(format!(
                        "readiness_score.components.{name}.weight must be a number"
                    ));
                    0.0
                }
            },
            None => 0.0,
        };
        components.push(ReadinessComponent {
            name: name.clone(),
            weight,
            description: raw_component.description.clone().unwrap_or_default(),
        });
    }
    if readiness_enabled && components.is_empty() {
        errors.push("readiness_score.components must be non-empty when readiness is enabled".to_string());
    }

    let thriving_threshold = raw.readiness_score.thresholds.thriving.unwrap_or(75);
    let watch_threshold = raw.readiness_score.thresholds.watch.unwrap_or(50);
    if thriving_threshold <= watch_threshold {
        errors.push(format!(
            "readiness_score.thresholds.thriving ({thriving_threshold}) must be > thresholds.watch ({watch_threshold})"
        ));
    }

    let readiness = ReadinessConfig {
        enabled: readiness_enabled,
        components,
        thriving_threshold,
        watch_threshold,
    };

    let total_weight = readiness.total_weight();
    if !readiness.components.is_empty() && !(0.95..=1.05).contains(&total_weight) {
        tracing::warn!(
            total_weight,
            "readiness component weights do not sum to ~1.0; scorer will re-normalize at runtime"
        );
    }

    // ---- menstrual_cycle ----
    let (prediction_model, model_warning) = PredictionModel::parse_or(
        raw.menstrual_cycle.prediction_model.as_deref(),
        PredictionModel::TemperatureAssisted,
    );
    if let Some(w) = model_warning {
        errors.push(w);
    }

    let ovulation_confirmation_days = raw
        .menstrual_cycle
        .fertile_window
        .confirmation_days
        .unwrap_or(3);
    let fertile_window_days = raw
        .menstrual_cycle
        .fertile_window
        .predicted_window_days
        .unwrap_or(6);
    let rolling_average_cycles = raw
        .menstrual_cycle
        .cycle_length
        .rolling_average_cycles
        .unwrap_or(6);
    let min_cycle_days = raw.menstrual_cycle.cycle_length.min_cycle_days.unwrap_or(21);
    let max_cycle_days = raw.menstrual_cycle.cycle_length.max_cycle_days.unwrap_or(45);

    if ovulation_confirmation_days < 1 {
        errors.push("menstrual_cycle.fertile_window.confirmation_days must be >= 1".to_string());
    }
    if fertile_window_days < 1 {
        errors
            .push("menstrual_cycle.fertile_window.predicted_window_days must be >= 1".to_string());
    }
    if rolling_average_cycles < 1 {
        errors.push("menstrual_cycle.cycle_length.rolling_average_cycles must be >= 1".to_string());
    }
    if min_cycle_days >= max_cycle_days {
        errors.push(format!(
            "menstrual_cycle.cycle_length.min_cycle_days ({min_cycle_days}) must be < max_cycle_days ({max_cycle_days})"
        ));
    }
    let temp_shift_threshold_c = raw.menstrual_cycle.temp_shift_threshold_c.unwrap_or(0.2);
    if temp_shift_threshold_c < 0.0 {
        errors.push(format!(
            "menstrual_cycle.temp_shift_threshold_c = {temp_shift_threshold_c} must be >= 0"
        ));
    }

    let menstrual = MenstrualConfig {
        enabled: raw.menstrual_cycle.enabled.unwrap_or(true),
        prediction_model,
        temp_source_priority: raw
            .menstrual_cycle
            .temp_source_priority
            .clone()
            .unwrap_or_else(|| {
                vec![
                    "oura".to_string(),
                    "apple_watch".to_string(),
                    "whoop".to_string(),
                    "garmin".to_string(),
                ]
            }),
        temp_shift_threshold_c,
        ovulation_confirmation_days,
        fertile_window_days,
        rolling_average_cycles,
        min_cycle_days,
        max_cycle_days,
    };

    // ---- backfill ----
    let mut max_days = HashMap::new();
    max_days.insert(
        "garmin".to_string(),
        raw.backfill.garmin_max_days.unwrap_or(3650),
    );
    max_days.insert(
        "oura".to_string(),
        raw.backfill.oura_max_days.unwrap_or(3650),
    );
    max_days.insert(
        "apple_health".to_string(),
        raw.backfill.apple_health_max_days.unwrap_or(3650),
    );
    max_days.insert(
        "whoop".to_string(),
        raw.backfill.whoop_max_days.unwrap_or(3650),
    );
    let backfill = BackfillConfig {
        enabled: raw.backfill.enabled.unwrap_or(true),
        max_days,
        batch_size_days: raw.backfill.batch_size_days.unwrap_or(30),
        rate_limit_ms: raw.backfill.rate_limit_ms.unwrap_or(500),
    };

    if !errors.is_empty() {
        return Err(FusionError::invalid_configuration(errors));
    }

    Ok(FusionConfig {
        version,
        device_weights,
        tolerances,
        sleep_matching,
        readiness,
        menstrual,
        backfill,
    })
}

fn value_as_f64(value: &serde_yaml::Value) -> Option<f64> {
    value.as_f64().or_else(|| value.as_i64().map(|v| v as f64))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(yaml: &str) -> Result<FusionConfig> {
        let raw: RawDocument = serde_yaml::from_str(yaml).expect("valid yaml");
        validate_and_build(raw)
    }

    const MINIMAL_VALID: &str = r#"
version: "1.0"
device_weights:
  hrv:
    oura: 0.95
    garmin: 0.65
tolerances:
  hrv_ms: 15.0
sleep_matching:
  min_overlap_pct: 60
  max_start_diff_minutes: 60
  sleep_day_cutoff_hour: 18
readiness_score:
  enabled: true
  components:
    hrv_vs_baseline:
      weight: 0.30
      description: HRV vs baseline
    resting_hr_vs_baseline:
      weight: 0.20
      description: RHR vs baseline
    sleep_quality:
      weight: 0.25
      description: sleep quality
    sleep_consistency:
      weight: 0.10
      description: sleep consistency
    recovery_time:
      weight: 0.15
      description: recovery time
  thresholds:
    thriving: 75
    watch: 50
menstrual_cycle:
  enabled: true
  prediction_model: temperature_assisted
  fertile_window:
    confirmation_days: 3
    predicted_window_days: 6
  cycle_length:
    rolling_average_cycles: 6
    min_cycle_days: 21
    max_cycle_days: 45
backfill:
  enabled: true
  batch_size_days: 30
  rate_limit_ms: 500
"#;

    #[test]
    fn minimal_valid_document_parses() {
        let config = parse(MINIMAL_VALID).expect("should validate");
        assert_eq!(config.weight("hrv", "oura"), 0.95);
        assert_eq!(config.tolerance("hrv_ms"), 15.0);
        assert_eq!(config.tolerance("missing_key"), f64::INFINITY);
        assert_eq!(config.readiness.thriving_threshold, 75);
    }

    #[test]
    fn out_of_range_weight_is_rejected() {
        let yaml = MINIMAL_VALID.replace("oura: 0.95", "oura: 1.5");
        let err = parse(&yaml).unwrap_err();
        match err {
            FusionError::InvalidConfiguration { violations } => {
                assert!(violations.iter().any(|v| v.contains("out of range")));
            }
            _ => panic!("expected InvalidConfiguration"),
        }
    }

    #[test]
    fn threshold_ordering_is_enforced() {
        let yaml = MINIMAL_VALID
            .replace("thriving: 75", "thriving: 40")
            .replace("watch: 50", "watch: 50");
        let err = parse(&yaml).unwrap_err();
        match err {
            FusionError::InvalidConfiguration { violations } => {
                assert!(violations.iter().any(|v| v.contains("must be >")));
            }
            _ => panic!("expected InvalidConfiguration"),
        }
    }

    #[test]
    fn missing_device_weights_is_rejected() {
        let yaml = r#"
version: "1.0"
device_weights: {}
"#;
        let err = parse(yaml).unwrap_err();
        match err {
            FusionError::InvalidConfiguration { violations } => {
                assert!(violations
                    .iter()
                    .any(|v| v.contains("device_weights") && v.contains("missing")));
            }
            _ => panic!("expected InvalidConfiguration"),
        }
    }

    #[test]
    fn collects_multiple_violations_at_once() {
        let yaml = MINIMAL_VALID
            .replace("oura: 0.95", "oura: 2.0")
            .replace("thriving: 75", "thriving: 10");
        let err = parse(&yaml).unwrap_err();
        match err {
            FusionError::InvalidConfiguration { violations } => {
                assert!(violations.len() >= 2);
            }
            _ => panic!("expected InvalidConfiguration"),
        }
    }
}

//! End-to-end scenarios spanning matcher, fusion engine, and menstrual core
//! together, the way a caller composes the library.

use chrono::{NaiveDate, TimeZone, Utc};
use uuid::Uuid;

use wearable_fusion_core::config::parse_fusion_config;
use wearable_fusion_core::fusion::FusionEngine;
use wearable_fusion_core::matcher::match_sessions;
use wearable_fusion_core::menstrual::{detect_ovulation, predict};
use wearable_fusion_core::models::{CanonicalSleepRecord, CycleRecord, DailyTemperatureReading};

const CONFIG_YAML: &str = r#"
version: "1.0"
device_weights:
  hrv:
    oura: 0.95
    garmin: 0.65
  sleep_duration:
    oura: 0.9
    garmin: 0.6
    whoop: 0.8
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
    resting_hr_vs_baseline:
      weight: 0.20
    sleep_quality:
      weight: 0.25
    sleep_consistency:
      weight: 0.10
    recovery_time:
      weight: 0.15
  thresholds:
    thriving: 75
    watch: 50
menstrual_cycle:
  enabled: true
  prediction_model: calendar_only
  temp_shift_threshold_c: 0.2
  fertile_window:
    confirmation_days: 3
    predicted_window_days: 6
  cycle_length:
    rolling_average_cycles: 6
    min_cycle_days: 21
    max_cycle_days: 45
backfill:
  enabled: false
"#;

fn sleep_record(
    source: &str,
    date: NaiveDate,
    start: (u32, u32, u32, u32, u32, u32),
    end: (u32, u32, u32, u32, u32, u32),
) -> CanonicalSleepRecord {
    let (sy, sm, sd, sh, smin, ssec) = start;
    let (ey, em, ed, eh, emin, esec) = end;
    CanonicalSleepRecord {
        owner: Uuid::nil(),
        sleep_date: date,
        source: source.to_string(),
        sleep_start: Some(Utc.with_ymd_and_hms(sy as i32, sm, sd, sh, smin, ssec).unwrap()),
        sleep_end: Some(Utc.with_ymd_and_hms(ey as i32, em, ed, eh, emin, esec).unwrap()),
        total_sleep_minutes: Some(420),
        rem_minutes: None,
        deep_minutes: None,
        light_minutes: None,
        awake_minutes: None,
        sleep_latency_minutes: None,
        sleep_efficiency_pct: None,
        sleep_score: None,
        interruption_count: None,
        avg_hr_bpm: None,
        min_hr_bpm: None,
        avg_hrv_ms: None,
        avg_respiratory_rate: None,
        avg_spo2_pct: None,
        avg_skin_temp_deviation_c: None,
        hypnogram: None,
        provenance_payload: None,
    }
}

#[test]
fn sleep_match_single_night_picks_oura_as_primary_start() {
    let config = parse_fusion_config(CONFIG_YAML).expect("valid config");
    let date = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();

    let oura = sleep_record("oura", date, (2024, 2, 29, 23, 0, 0), (2024, 3, 1, 6, 45, 0));
    let garmin = sleep_record("garmin", date, (2024, 2, 29, 23, 15, 0), (2024, 3, 1, 6, 40, 0));

    let engine = FusionEngine::new(&config);
    let fused = engine
        .fuse_sleep_sessions(Uuid::nil(), date, &[oura, garmin])
        .expect("fusion should succeed");

    assert_eq!(fused.len(), 1);
    let (record, _provenance) = &fused[0];
    assert_eq!(
        record.sleep_start,
        Some(Utc.with_ymd_and_hms(2024, 2, 29, 23, 0, 0).unwrap())
    );
}

#[test]
fn night_plus_nap_yields_two_fused_sleep_records() {
    let config = parse_fusion_config(CONFIG_YAML).expect("valid config");
    let date = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();

    let oura = sleep_record("oura", date, (2024, 2, 29, 23, 0, 0), (2024, 3, 1, 6, 45, 0));
    let garmin = sleep_record("garmin", date, (2024, 2, 29, 23, 15, 0), (2024, 3, 1, 6, 40, 0));
    let whoop_nap = sleep_record("whoop", date, (2024, 3, 1, 13, 0, 0), (2024, 3, 1, 14, 30, 0));

    let engine = FusionEngine::new(&config);
    let fused = engine
        .fuse_sleep_sessions(Uuid::nil(), date, &[oura, garmin, whoop_nap])
        .expect("fusion should succeed");

    assert_eq!(fused.len(), 2);
}

#[test]
fn matcher_never_duplicates_a_source_within_a_group() {
    let config = parse_fusion_config(CONFIG_YAML).expect("valid config");
    let date = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
    let oura = sleep_record("oura", date, (2024, 2, 29, 23, 0, 0), (2024, 3, 1, 6, 45, 0));
    let garmin = sleep_record("garmin", date, (2024, 2, 29, 23, 15, 0), (2024, 3, 1, 6, 40, 0));
    let whoop_nap = sleep_record("whoop", date, (2024, 3, 1, 13, 0, 0), (2024, 3, 1, 14, 30, 0));

    for group in match_sessions(&[oura, garmin, whoop_nap], &config) {
        let mut sources: Vec<&str> = group.sources();
        sources.sort_unstable();
        sources.dedup();
        assert_eq!(sources.len(), group.records.len());
    }
}

#[test]
fn regular_six_cycle_history_predicts_28_day_cycle() {
    let config = parse_fusion_config(CONFIG_YAML).expect("valid config");
    let anchor = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();

    let mut history = Vec::new();
    for i in 0..6i64 {
        history.push(CycleRecord {
            id: Uuid::new_v4(),
            period_start: anchor - chrono::Duration::days(28 * (6 - i)),
            period_end: None,
            cycle_length_days: Some(28),
            ovulation_date: None,
            temperatures: Vec::new(),
            is_complete: true,
        });
    }

    let prediction = predict(&history, Some(anchor), &[], anchor, &config);

    assert_eq!(prediction.predicted_period_start, Some(anchor + chrono::Duration::days(28)));
    assert_eq!(prediction.predicted_ovulation_date, Some(anchor + chrono::Duration::days(14)));
    assert_eq!(prediction.avg_cycle_length_days, Some(28.0));
    assert!(!prediction.is_irregular);
}

#[test]
fn biphasic_temperature_shift_locates_ovulation_one_day_before_streak() {
    let config = parse_fusion_config(CONFIG_YAML).expect("valid config");
    let cycle_start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();

    let mut readings = Vec::new();
    for day in 0..13i64 {
        let deviation = if day < 7 { -0.10 } else { -0.07 };
        readings.push(DailyTemperatureReading {
            date: cycle_start + chrono::Duration::days(day),
            deviation_c: deviation,
            source: "oura".to_string(),
        });
    }
    for day in 13..18i64 {
        readings.push(DailyTemperatureReading {
            date: cycle_start + chrono::Duration::days(day),
            deviation_c: 0.22,
            source: "oura".to_string(),
        });
    }

    let result = detect_ovulation(&readings, Some(cycle_start), &config);
    assert!(result.detected);
    assert_eq!(result.ovulation_date, Some(cycle_start + chrono::Duration::days(12)));
}

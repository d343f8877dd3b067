//! Sleep Session Matcher: partitions canonical sleep records into groups
//! that represent the same sleep period.
//!
//! Grounded on `original_source/src/wearables/sleep_matcher.py`.

use chrono::NaiveDate;

use crate::config::FusionConfig;
use crate::models::CanonicalSleepRecord;

/// An unordered set of canonical sleep records judged to cover the same
/// sleep period. At most one record per source.
#[derive(Debug, Clone, PartialEq)]
pub struct SleepMatchGroup {
    pub records: Vec<CanonicalSleepRecord>,
    /// Minimum pairwise overlap percentage observed within the group; `100.0`
    /// for singleton groups.
    pub min_overlap_pct: f64,
}

impl SleepMatchGroup {
    fn singleton(record: CanonicalSleepRecord) -> Self {
        Self {
            records: vec![record],
            min_overlap_pct: 100.0,
        }
    }

    pub fn sources(&self) -> Vec<&str> {
        self.records.iter().map(|r| r.source.as_str()).collect()
    }

    /// Highest-weighted record in the group for the given metric (typically
    /// `sleep_duration`), used by the fusion engine to pick timing and
    /// hypnogram authority.
    pub fn select_primary(&self, config: &FusionConfig, metric: &str) -> Option<&CanonicalSleepRecord> {
        self.records.iter().max_by(|a, b| {
            let wa = config.weight(metric, &a.source);
            let wb = config.weight(metric, &b.source);
            wa.partial_cmp(&wb).unwrap_or(std::cmp::Ordering::Equal)
        })
    }
}

fn overlap_seconds(a: &CanonicalSleepRecord, b: &CanonicalSleepRecord) -> i64 {
    let (a_start, a_end) = match (a.sleep_start, a.sleep_end) {
        (Some(s), Some(e)) => (s, e),
        _ => return 0,
    };
    let (b_start, b_end) = match (b.sleep_start, b.sleep_end) {
        (Some(s), Some(e)) => (s, e),
        _ => return 0,
    };
    let start = a_start.max(b_start);
    let end = a_end.min(b_end);
    (end - start).num_seconds().max(0)
}

fn overlap_pct(a: &CanonicalSleepRecord, b: &CanonicalSleepRecord) -> f64 {
    let overlap = overlap_seconds(a, b) as f64;
    if overlap <= 0.0 {
        return 0.0;
    }
    let dur_a = a
        .sleep_start
        .zip(a.sleep_end)
        .map(|(s, e)| (e - s).num_seconds())
        .unwrap_or(0);
    let dur_b = b
        .sleep_start
        .zip(b.sleep_end)
        .map(|(s, e)| (e - s).num_seconds())
        .unwrap_or(0);
    let shorter = dur_a.min(dur_b);
    if shorter <= 0 {
        return 0.0;
    }
    (overlap / shorter as f64) * 100.0
}

fn same_sleep(a: &CanonicalSleepRecord, b: &CanonicalSleepRecord, config: &FusionConfig) -> bool {
    let both_have_timing =
        (a.sleep_start.is_some() || a.sleep_end.is_some()) && (b.sleep_start.is_some() || b.sleep_end.is_some());

    if !both_have_timing {
        return a.sleep_date == b.sleep_date;
    }

    if let (Some(start_a), Some(start_b)) = (a.sleep_start, b.sleep_start) {
        let diff_minutes = (start_a - start_b).num_minutes().abs();
        if diff_minutes <= config.sleep_matching.max_start_diff_minutes {
            return true;
        }
    }

    overlap_pct(a, b) >= config.sleep_matching.min_overlap_pct
}

/// Partition `sessions` into maximal same-sleep groups via anchor-greedy
/// assignment: sort by start time, then for each unassigned record seed a
/// group and absorb unassigned records from sources not yet in the group
/// that match the anchor.
#[tracing::instrument(skip(sessions, config), fields(session_count = sessions.len()))]
pub fn match_sessions(sessions: &[CanonicalSleepRecord], config: &FusionConfig) -> Vec<SleepMatchGroup> {
    let mut order: Vec<usize> = (0..sessions.len()).collect();
    order.sort_by(|&i, &j| {
        let a = &sessions[i];
        let b = &sessions[j];
        match (a.sleep_start, b.sleep_start) {
            (None, None) => a.source.cmp(&b.source),
            (None, Some(_)) => std::cmp::Ordering::Less,
            (Some(_), None) => std::cmp::Ordering::Greater,
            (Some(sa), Some(sb)) => sa.cmp(&sb).then_with(|| a.source.cmp(&b.source)),
        }
    });

    let mut assigned = vec![false; sessions.len()];
    let mut groups = Vec::new();

    for &anchor_idx in &order {
        if assigned[anchor_idx] {
            continue;
        }
        assigned[anchor_idx] = true;
        let anchor = &sessions[anchor_idx];
        let mut group_records = vec![anchor.clone()];
        let mut group_sources = vec![anchor.source.clone()];

        for &idx in &order {
            if assigned[idx] {
                continue;
            }
            let candidate = &sessions[idx];
            if group_sources.contains(&candidate.source) {
                continue;
            }
            if same_sleep(anchor, candidate, config) {
                assigned[idx] = true;
                group_sources.push(candidate.source.clone());
                group_records.push(candidate.clone());
            }
        }

        let min_overlap_pct = if group_records.len() <= 1 {
            100.0
        } else {
            group_records
                .iter()
                .enumerate()
                .flat_map(|(i, r1)| {
                    group_records[i + 1..]
                        .iter()
                        .map(move |r2| overlap_pct(r1, r2))
                })
                .fold(f64::INFINITY, f64::min)
        };

        groups.push(SleepMatchGroup {
            records: group_records,
            min_overlap_pct,
        });
    }

    groups
}

/// Pre-filter `sessions` by `sleep_date` before matching.
pub fn match_for_date(
    sessions: &[CanonicalSleepRecord],
    date: NaiveDate,
    config: &FusionConfig,
) -> Vec<SleepMatchGroup> {
    let filtered: Vec<CanonicalSleepRecord> = sessions
        .iter()
        .filter(|s| s.sleep_date == date)
        .cloned()
        .collect();
    match_sessions(&filtered, config)
}

/// Wake-morning convention: a record whose `sleep_start` hour is at or past
/// `sleep_day_cutoff_hour` belongs to the following calendar date; otherwise
/// the same date. Used by upstream ingestion; matching itself trusts the
/// date already stored on each record.
pub fn estimate_sleep_date_from_start(
    sleep_start: chrono::DateTime<chrono::Utc>,
    cutoff_hour: u8,
) -> NaiveDate {
    let date = sleep_start.date_naive();
    if sleep_start.format("%H").to_string().parse::<u8>().unwrap_or(0) >= cutoff_hour {
        date + chrono::Duration::days(1)
    } else {
        date
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use std::collections::HashMap;

    fn config() -> FusionConfig {
        let mut device_weights = HashMap::new();
        let mut sleep_duration = HashMap::new();
        sleep_duration.insert("oura".to_string(), 0.9);
        sleep_duration.insert("garmin".to_string(), 0.6);
        sleep_duration.insert("whoop".to_string(), 0.8);
        device_weights.insert("sleep_duration".to_string(), sleep_duration);

        crate::config::parse_fusion_config(
            r#"
version: "1.0"
device_weights:
  placeholder:
    x: 1.0
sleep_matching:
  min_overlap_pct: 60
  max_start_diff_minutes: 60
  sleep_day_cutoff_hour: 18
readiness_score:
  enabled: false
menstrual_cycle:
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
        .map(|mut c| {
            c.device_weights = device_weights;
            c
        })
        .expect("valid test config")
    }

    fn record(source: &str, date: NaiveDate, start: Option<chrono::DateTime<Utc>>, end: Option<chrono::DateTime<Utc>>) -> CanonicalSleepRecord {
        CanonicalSleepRecord {
            owner: uuid::Uuid::nil(),
            sleep_date: date,
            source: source.to_string(),
            sleep_start: start,
            sleep_end: end,
            total_sleep_minutes: None,
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
    fn single_night_two_sources_match() {
        let cfg = config();
        let date = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        let oura = record(
            "oura",
            date,
            Some(Utc.with_ymd_and_hms(2024, 2, 29, 23, 0, 0).unwrap()),
            Some(Utc.with_ymd_and_hms(2024, 3, 1, 6, 45, 0).unwrap()),
        );
        let garmin = record(
            "garmin",
            date,
            Some(Utc.with_ymd_and_hms(2024, 2, 29, 23, 15, 0).unwrap()),
            Some(Utc.with_ymd_and_hms(2024, 3, 1, 6, 40, 0).unwrap()),
        );
        let groups = match_sessions(&[oura, garmin], &cfg);
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].records.len(), 2);
    }

    #[test]
    fn night_plus_nap_forms_two_groups() {
        let cfg = config();
        let date = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        let oura = record(
            "oura",
            date,
            Some(Utc.with_ymd_and_hms(2024, 2, 29, 23, 0, 0).unwrap()),
            Some(Utc.with_ymd_and_hms(2024, 3, 1, 6, 45, 0).unwrap()),
        );
        let garmin = record(
            "garmin",
            date,
            Some(Utc.with_ymd_and_hms(2024, 2, 29, 23, 15, 0).unwrap()),
            Some(Utc.with_ymd_and_hms(2024, 3, 1, 6, 40, 0).unwrap()),
        );
        let whoop_nap = record(
            "whoop",
            date,
            Some(Utc.with_ymd_and_hms(2024, 3, 1, 13, 0, 0).unwrap()),
            Some(Utc.with_ymd_and_hms(2024, 3, 1, 14, 30, 0).unwrap()),
        );
        let groups = match_sessions(&[oura, garmin, whoop_nap], &cfg);
        assert_eq!(groups.len(), 2);
        let sizes: Vec<usize> = groups.iter().map(|g| g.records.len()).collect();
        assert!(sizes.contains(&2));
        assert!(sizes.contains(&1));
    }

    #[test]
    fn no_source_appears_twice_in_a_group() {
        let cfg = config();
        let date = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        let a = record(
            "oura",
            date,
            Some(Utc.with_ymd_and_hms(2024, 2, 29, 23, 0, 0).unwrap()),
            Some(Utc.with_ymd_and_hms(2024, 3, 1, 6, 45, 0).unwrap()),
        );
        let b = record(
            "oura",
            date,
            Some(Utc.with_ymd_and_hms(2024, 2, 29, 23, 5, 0).unwrap()),
            Some(Utc.with_ymd_and_hms(2024, 3, 1, 6, 40, 0).unwrap()),
        );
        let groups = match_sessions(&[a, b], &cfg);
        for g in &groups {
            let mut sources: Vec<&str> = g.sources();
            sources.sort_unstable();
            sources.dedup();
            assert_eq!(sources.len(), g.records.len());
        }
    }

    #[test]
    fn disjoint_intervals_beyond_threshold_never_match() {
        let cfg = config();
        let date = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        let a = record(
            "oura",
            date,
            Some(Utc.with_ymd_and_hms(2024, 2, 28, 22, 0, 0).unwrap()),
            Some(Utc.with_ymd_and_hms(2024, 3, 1, 5, 0, 0).unwrap()),
        );
        let b = record(
            "garmin",
            date,
            Some(Utc.with_ymd_and_hms(2024, 3, 1, 13, 0, 0).unwrap()),
            Some(Utc.with_ymd_and_hms(2024, 3, 1, 14, 0, 0).unwrap()),
        );
        let groups = match_sessions(&[a, b], &cfg);
        assert_eq!(groups.len(), 2);
    }

    #[test]
    fn estimate_sleep_date_uses_cutoff_hour() {
        let late = Utc.with_ymd_and_hms(2024, 3, 1, 22, 0, 0).unwrap();
        let early = Utc.with_ymd_and_hms(2024, 3, 1, 1, 0, 0).unwrap();
        assert_eq!(
            estimate_sleep_date_from_start(late, 18),
            NaiveDate::from_ymd_opt(2024, 3, 2).unwrap()
        );
        assert_eq!(
            estimate_sleep_date_from_start(early, 18),
            NaiveDate::from_ymd_opt(2024, 3, 1).unwrap()
        );
    }
}

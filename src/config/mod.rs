pub mod logging;
mod schema;
mod validate;

use std::fs;
use std::path::Path;
use std::sync::Arc;

use arc_swap::ArcSwap;
use parking_lot::Mutex;

pub use logging::{LogContext, LoggingConfig};
pub use schema::{
    BackfillConfig, FusionConfig, MenstrualConfig, PredictionModel, ReadinessComponent,
    ReadinessConfig, SleepMatchingConfig,
};

use crate::error::{FusionError, Result};

/// Parse and validate a YAML configuration document into a [`FusionConfig`].
///
/// Every violation is collected before returning
/// [`FusionError::InvalidConfiguration`] — callers see the whole list, not
/// just the first failure.
pub fn parse_fusion_config(yaml: &str) -> Result<FusionConfig> {
    let raw: schema::RawDocument = serde_yaml::from_str(yaml)
        .map_err(|e| FusionError::invalid_argument(format!("malformed YAML: {e}")))?;
    validate::validate_and_build(raw)
}

/// Load and validate a [`FusionConfig`] from a file on disk.
pub fn load_fusion_config(path: impl AsRef<Path>) -> Result<FusionConfig> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path).map_err(|e| {
        FusionError::invalid_argument(format!("cannot read config file {}: {e}", path.display()))
    })?;
    parse_fusion_config(&contents)
}

/// Lock-free-read, mutex-guarded-write handle to a live [`FusionConfig`].
///
/// Readers call [`ConfigHandle::current`] to get an `Arc` snapshot with no
/// locking involved — a reload in progress never blocks or tears a reader's
/// view. Writers serialize through an internal mutex so concurrent
/// `reload()` calls can't race each other; the new document is fully
/// validated before anything is swapped in, so a bad reload leaves the old
/// configuration live.
pub struct ConfigHandle {
    current: Arc<ArcSwap<FusionConfig>>,
    write_lock: Mutex<()>,
}

impl ConfigHandle {
    pub fn new(initial: FusionConfig) -> Self {
        Self {
            current: Arc::new(ArcSwap::from_pointee(initial)),
            write_lock: Mutex::new(()),
        }
    }

    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        Ok(Self::new(parse_fusion_config(yaml)?))
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        Ok(Self::new(load_fusion_config(path)?))
    }

    /// Current configuration snapshot. Cheap, lock-free, safe to call from
    /// any number of concurrent readers.
    pub fn current(&self) -> Arc<FusionConfig> {
        self.current.load_full()
    }

    /// Validate a new document and, if it passes, atomically replace the
    /// live configuration. Concurrent reloads are serialized; concurrent
    /// reads are never blocked.
    pub fn reload(&self, yaml: &str) -> Result<()> {
        let next = parse_fusion_config(yaml)?;
        let _guard = self.write_lock.lock();
        self.current.store(Arc::new(next));
        tracing::info!(event = "config_reloaded", "fusion configuration reloaded");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const VALID_YAML: &str = r#"
version: "1.0"
device_weights:
  hrv:
    oura: 0.9
tolerances:
  hrv_ms: 10.0
sleep_matching:
  min_overlap_pct: 60
  max_start_diff_minutes: 60
  sleep_day_cutoff_hour: 18
readiness_score:
  enabled: true
  components:
    hrv_vs_baseline:
      weight: 1.0
  thresholds:
    thriving: 75
    watch: 50
menstrual_cycle:
  enabled: true
  fertile_window:
    confirmation_days: 3
    predicted_window_days: 6
  cycle_length:
    rolling_average_cycles: 6
    min_cycle_days: 21
    max_cycle_days: 45
backfill:
  enabled: true
"#;

    const INVALID_YAML: &str = r#"
version: "1.0"
device_weights:
  hrv:
    oura: 5.0
"#;

    #[test]
    fn handle_exposes_parsed_config() {
        let handle = ConfigHandle::from_yaml_str(VALID_YAML).expect("valid config");
        assert_eq!(handle.current().weight("hrv", "oura"), 0.9);
    }

    #[test]
    fn failed_reload_leaves_previous_config_live() {
        let handle = ConfigHandle::from_yaml_str(VALID_YAML).expect("valid config");
        let before = handle.current();

        let err = handle.reload(INVALID_YAML).unwrap_err();
        assert!(matches!(err, FusionError::InvalidConfiguration { .. }));

        let after = handle.current();
        assert_eq!(before.weight("hrv", "oura"), after.weight("hrv", "oura"));
    }

    #[test]
    fn successful_reload_replaces_config() {
        let handle = ConfigHandle::from_yaml_str(VALID_YAML).expect("valid config");
        let updated = VALID_YAML.replace("oura: 0.9", "oura: 0.5");
        handle.reload(&updated).expect("reload should succeed");
        assert_eq!(handle.current().weight("hrv", "oura"), 0.5);
    }
}

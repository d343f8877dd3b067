//! Menstrual Core: temperature-driven ovulation detection, calendar+temperature
//! cycle prediction, and symptom correlation — the three subsystems sharing
//! the same provenance model as the rest of the fusion pipeline.

pub mod cycle;
pub mod ovulation;
pub mod symptoms;

pub use cycle::{classify_cycle, compute_cycle_length, cycle_day_from_start, predict, CyclePrediction};
pub use ovulation::{compute_follicular_luteal_averages, detect_ovulation, phase_for_date, OvulationDetectionResult};
pub use symptoms::{generate_insights, InsightKind, SymptomInsight};

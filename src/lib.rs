//! Fusion core for overlapping multi-sensor health telemetry.
//!
//! Reconciles per-sensor canonical records into one authoritative record per
//! subject-date with provenance, matches sleep sessions across devices,
//! scores daily readiness against personal baselines, and runs the
//! temperature-driven menstrual cycle core. Every operation here is pure and
//! synchronous; the one piece of shared state is the hot-reloadable
//! [`config::ConfigHandle`].

pub mod config;
pub mod error;
pub mod fusion;
pub mod matcher;
pub mod menstrual;
pub mod models;
pub mod readiness;

pub use error::{FusionError, Result};

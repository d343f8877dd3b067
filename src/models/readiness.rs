//! Readiness score output types.
//!
//! Grounded on `original_source/src/wearables/readiness_score.py`'s
//! `ReadinessCalculator.compute()` return shape.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::enums::ReadinessBand;

/// One component's contribution to the overall score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentBreakdown {
    pub name: String,
    pub weight: f64,
    /// Raw component score in [0, 1] before weighting; present even when
    /// `available` is false, so callers can log why a fallback was used.
    pub raw_score: f64,
    pub available: bool,
}

/// A subject-date's composed readiness score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReadinessScore {
    pub owner: uuid::Uuid,
    pub date: NaiveDate,
    pub score: i32,
    pub band: ReadinessBand,
    pub components: Vec<ComponentBreakdown>,
    pub available: bool,
    pub computed_at: DateTime<Utc>,
}

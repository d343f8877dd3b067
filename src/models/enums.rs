use serde::{Deserialize, Serialize};
use std::fmt;

/// Sleep hypnogram stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SleepStage {
    Deep,
    Light,
    Rem,
    Awake,
}

impl fmt::Display for SleepStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Deep => "deep",
            Self::Light => "light",
            Self::Rem => "rem",
            Self::Awake => "awake",
        };
        write!(f, "{s}")
    }
}

/// Menstrual cycle phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CyclePhase {
    Menstrual,
    Follicular,
    Ovulation,
    Luteal,
    Unknown,
}

impl fmt::Display for CyclePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Menstrual => "menstrual",
            Self::Follicular => "follicular",
            Self::Ovulation => "ovulation",
            Self::Luteal => "luteal",
            Self::Unknown => "unknown",
        };
        write!(f, "{s}")
    }
}

/// Readiness score band, derived strictly from configured thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReadinessBand {
    Thriving,
    Watch,
    Concern,
}

impl fmt::Display for ReadinessBand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Thriving => "thriving",
            Self::Watch => "watch",
            Self::Concern => "concern",
        };
        write!(f, "{s}")
    }
}

/// Grouping of canonical records fused together by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricGroup {
    Daily,
    Sleep,
    Activity,
}

impl fmt::Display for MetricGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Daily => "daily",
            Self::Sleep => "sleep",
            Self::Activity => "activity",
        };
        write!(f, "{s}")
    }
}

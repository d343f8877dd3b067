use thiserror::Error;

/// Error taxonomy for the fusion core.
///
/// `InsufficientData` is deliberately not a variant here — the ovulation
/// detector, cycle predictor, symptom correlator, and readiness scorer all
/// represent "not enough data" as a data outcome (`available: bool`,
/// explanatory notes) rather than a failure. See the relevant result types.
#[derive(Debug, Error)]
pub enum FusionError {
    /// Raised by `FusionConfig` construction when any validation rule fails.
    /// Enumerates every violation found, not just the first.
    #[error("invalid configuration: {} violation(s): {}", violations.len(), violations.join("; "))]
    InvalidConfiguration { violations: Vec<String> },

    /// Raised by `fuse_daily`/`fuse_sleep` when the input record set is
    /// empty, or by any function whose preconditions are violated at the
    /// boundary. Never raised mid-computation.
    #[error("invalid argument: {message}")]
    InvalidArgument { message: String },
}

impl FusionError {
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        FusionError::InvalidArgument {
            message: message.into(),
        }
    }

    pub fn invalid_configuration(violations: Vec<String>) -> Self {
        FusionError::InvalidConfiguration { violations }
    }
}

pub type Result<T> = std::result::Result<T, FusionError>;

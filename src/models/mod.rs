//! Canonical record, provenance, and result types shared across the fusion
//! core's components.

pub mod canonical;
pub mod enums;
pub mod menstrual;
pub mod provenance;
pub mod readiness;

pub use canonical::*;
pub use enums::*;
pub use menstrual::*;
pub use provenance::*;
pub use readiness::*;

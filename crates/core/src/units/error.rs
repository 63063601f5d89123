//! Unit normalization errors.

use thiserror::Error;

use super::Unit;

/// Errors that can occur while parsing or converting units.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UnitError {
    /// The text does not name a supported unit.
    #[error("unknown unit: '{0}'")]
    Unknown(String),

    /// The units measure different things (e.g. weight vs volume).
    #[error("cannot convert {from} to {to}: incompatible units")]
    Incompatible {
        /// Source unit.
        from: Unit,
        /// Target unit.
        to: Unit,
    },

    /// The converted quantity does not fit in a decimal.
    #[error("quantity out of range")]
    Overflow,
}

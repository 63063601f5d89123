//! Pricing error types.

use rust_decimal::Decimal;
use thiserror::Error;

use crate::units::UnitError;

/// Errors that can occur while reading a pack description.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PackSizeError {
    /// Nothing to parse.
    #[error("pack size is empty")]
    Empty,

    /// The text does not look like `count/quantity unit`.
    #[error("malformed pack size: '{0}'")]
    Malformed(String),

    /// The unit part is not a known unit.
    #[error(transparent)]
    Unit(#[from] UnitError),

    /// Pack count or unit quantity is zero.
    #[error("pack count and unit quantity must be greater than zero")]
    Zero,

    /// Pack count or unit quantity is implausibly large.
    #[error(
        "pack size out of range: count must be at most {max_count}, \
         quantity at most {max_quantity}"
    )]
    OutOfRange {
        /// Largest accepted pack count.
        max_count: u32,
        /// Largest accepted unit quantity.
        max_quantity: Decimal,
    },
}

/// Errors that can occur in price arithmetic and validation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PriceError {
    /// Prices must be strictly positive.
    #[error("price must be greater than zero, got {0}")]
    NotPositive(Decimal),

    /// Prices carry at most four decimal places.
    #[error("price {0} has more than 4 decimal places")]
    TooPrecise(Decimal),

    /// The requested unit measures something else than the pack.
    #[error(transparent)]
    Unit(#[from] UnitError),

    /// The pack holds no measurable quantity.
    #[error("pack quantity is zero")]
    EmptyPack,
}

//! Distributor pack sizes such as `6/5 LB` or `200 CT`.

use std::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::error::PackSizeError;
use crate::units::{Unit, UnitKind};

/// Largest pack count accepted from a pack description.
pub const MAX_PACK_COUNT: u32 = 10_000;

/// Largest unit quantity accepted from a pack description.
pub const MAX_UNIT_QUANTITY: Decimal = Decimal::from_parts(1_000_000, 0, 0, false, 0);

/// How a distributor sells a product: `pack_count` units of `unit_quantity`
/// `unit` each, for one case price.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackSize {
    /// Number of inner units per case.
    pub pack_count: u32,
    /// Size of each inner unit.
    pub unit_quantity: Decimal,
    /// Unit of `unit_quantity`.
    pub unit: Unit,
}

impl PackSize {
    /// Creates a pack size, enforcing positive and plausible values.
    pub fn new(pack_count: u32, unit_quantity: Decimal, unit: Unit) -> Result<Self, PackSizeError> {
        if pack_count == 0 || unit_quantity <= Decimal::ZERO {
            return Err(PackSizeError::Zero);
        }
        if pack_count > MAX_PACK_COUNT || unit_quantity > MAX_UNIT_QUANTITY {
            return Err(PackSizeError::OutOfRange {
                max_count: MAX_PACK_COUNT,
                max_quantity: MAX_UNIT_QUANTITY,
            });
        }
        Ok(Self {
            pack_count,
            unit_quantity,
            unit,
        })
    }

    /// Parses a pack description as printed on distributor invoices.
    ///
    /// Accepted shapes are `count/quantity unit` (`6/5 LB`, `1/10#`),
    /// `countxquantity unit` (`2x5kg`) and a bare `quantity unit`
    /// (`25 LB`, `200 CT`), which means a single unit per case.
    ///
    /// ```
    /// use restaurantek_core::pricing::PackSize;
    /// use restaurantek_core::units::Unit;
    /// use rust_decimal::Decimal;
    ///
    /// let pack = PackSize::parse("6/5 LB").unwrap();
    /// assert_eq!(pack.pack_count, 6);
    /// assert_eq!(pack.unit_quantity, Decimal::from(5));
    /// assert_eq!(pack.unit, Unit::Pound);
    /// ```
    pub fn parse(input: &str) -> Result<Self, PackSizeError> {
        let text = input.trim();
        if text.is_empty() {
            return Err(PackSizeError::Empty);
        }
        let malformed = || PackSizeError::Malformed(text.to_string());

        let (count_text, size_text) = split_count(text).unwrap_or(("1", text));
        let pack_count: u32 = count_text.trim().parse().map_err(|_| malformed())?;

        let size_text = size_text.trim();
        let number_end = size_text
            .find(|c: char| !(c.is_ascii_digit() || c == '.'))
            .unwrap_or(size_text.len());
        let (quantity_text, unit_text) = size_text.split_at(number_end);
        if quantity_text.is_empty() || unit_text.trim().is_empty() {
            return Err(malformed());
        }
        let unit_quantity: Decimal = quantity_text.parse().map_err(|_| malformed())?;
        let unit = Unit::parse(unit_text)?;

        Self::new(pack_count, unit_quantity, unit)
    }

    /// The kind of quantity this pack holds.
    #[must_use]
    pub const fn kind(&self) -> UnitKind {
        self.unit.kind()
    }

    /// Total case contents in the kind's base unit.
    ///
    /// Bounded by [`MAX_PACK_COUNT`] and [`MAX_UNIT_QUANTITY`] for packs built
    /// through [`PackSize::new`]; `None` only for hand-built packs that overflow.
    #[must_use]
    pub fn base_quantity(&self) -> Option<Decimal> {
        Decimal::from(self.pack_count)
            .checked_mul(self.unit_quantity)?
            .checked_mul(self.unit.factor())
    }
}

impl fmt::Display for PackSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{} {}",
            self.pack_count,
            self.unit_quantity.normalize(),
            self.unit
        )
    }
}

/// Splits `6/5 LB` or `2x5kg` into count and size; `None` for a bare size.
fn split_count(text: &str) -> Option<(&str, &str)> {
    if let Some((count, size)) = text.split_once('/') {
        return Some((count, size));
    }

    let digits_end = text.find(|c: char| !c.is_ascii_digit())?;
    if digits_end == 0 {
        return None;
    }
    let (count, rest) = text.split_at(digits_end);
    let rest = rest.trim_start();
    let mut chars = rest.chars();
    match chars.next() {
        Some('x' | 'X' | '×' | '*') => {
            let size = chars.as_str();
            size.trim_start()
                .starts_with(|c: char| c.is_ascii_digit())
                .then_some((count, size))
        }
        _ => None,
    }
}

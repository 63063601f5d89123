//! Distributor pack sizes and price arithmetic.
//!
//! Distributors quote a price per case. Everything downstream (recipe costing,
//! cheapest-supplier selection) works on the cost of one base unit, which is
//! the case price divided by the case contents in grams, milliliters or each.

pub mod change;
pub mod error;
pub mod pack;

pub use change::{PriceChange, PriceDirection};
pub use error::{PackSizeError, PriceError};
pub use pack::{MAX_PACK_COUNT, MAX_UNIT_QUANTITY, PackSize};

use rust_decimal::Decimal;

use crate::units::{Unit, UnitError};

/// Decimal places a recorded price may carry.
pub const PRICE_SCALE: u32 = 4;

/// Checks that a case price can be recorded.
pub fn ensure_valid_price(price: Decimal) -> Result<(), PriceError> {
    if price <= Decimal::ZERO {
        return Err(PriceError::NotPositive(price));
    }
    if price.normalize().scale() > PRICE_SCALE {
        return Err(PriceError::TooPrecise(price));
    }
    Ok(())
}

/// Cost of one base unit (gram, milliliter or each) of a pack.
///
/// ```
/// use restaurantek_core::pricing::{cost_per_base_unit, PackSize};
/// use rust_decimal::Decimal;
///
/// let pack = PackSize::parse("200 CT").unwrap();
/// let each = cost_per_base_unit(Decimal::from(50), &pack).unwrap();
/// assert_eq!(each, Decimal::new(25, 2));
/// ```
pub fn cost_per_base_unit(case_price: Decimal, pack: &PackSize) -> Result<Decimal, PriceError> {
    let contents = pack
        .base_quantity()
        .ok_or(PriceError::Unit(UnitError::Overflow))?;
    if contents.is_zero() {
        return Err(PriceError::EmptyPack);
    }
    case_price
        .checked_div(contents)
        .ok_or(PriceError::Unit(UnitError::Overflow))
}

/// Cost of one `unit` of a pack, e.g. the price per pound of a case of flour.
pub fn cost_per_unit(
    case_price: Decimal,
    pack: &PackSize,
    unit: Unit,
) -> Result<Decimal, PriceError> {
    if unit.kind() != pack.kind() {
        return Err(PriceError::Unit(UnitError::Incompatible {
            from: pack.unit,
            to: unit,
        }));
    }
    let per_base = cost_per_base_unit(case_price, pack)?;
    per_base
        .checked_mul(unit.factor())
        .ok_or(PriceError::Unit(UnitError::Overflow))
}

//! Unit normalization for ingredient quantities.
//!
//! Every unit belongs to one [`UnitKind`] and converts exactly to that kind's
//! base unit (gram, milliliter or each). Factors are the exact US customary
//! definitions, so conversions never go through floating point.

mod error;

#[cfg(test)]
mod props;

pub use error::UnitError;

use std::fmt;
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Physical dimension of a unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnitKind {
    /// Mass, measured in grams.
    Weight,
    /// Volume, measured in milliliters.
    Volume,
    /// Discrete items, measured in each.
    Count,
}

impl UnitKind {
    /// The unit all quantities of this kind normalize to.
    #[must_use]
    pub const fn base_unit(self) -> Unit {
        match self {
            Self::Weight => Unit::Gram,
            Self::Volume => Unit::Milliliter,
            Self::Count => Unit::Each,
        }
    }
}

impl fmt::Display for UnitKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Weight => "weight",
            Self::Volume => "volume",
            Self::Count => "count",
        })
    }
}

/// A supported unit of measure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Unit {
    /// Milligram.
    #[serde(rename = "mg")]
    Milligram,
    /// Gram.
    #[serde(rename = "g")]
    Gram,
    /// Kilogram.
    #[serde(rename = "kg")]
    Kilogram,
    /// Avoirdupois ounce.
    #[serde(rename = "oz")]
    Ounce,
    /// Avoirdupois pound.
    #[serde(rename = "lb")]
    Pound,
    /// Milliliter.
    #[serde(rename = "ml")]
    Milliliter,
    /// Liter.
    #[serde(rename = "l")]
    Liter,
    /// US teaspoon.
    #[serde(rename = "tsp")]
    Teaspoon,
    /// US tablespoon.
    #[serde(rename = "tbsp")]
    Tablespoon,
    /// US fluid ounce.
    #[serde(rename = "fl_oz")]
    FluidOunce,
    /// US cup.
    #[serde(rename = "cup")]
    Cup,
    /// US liquid pint.
    #[serde(rename = "pint")]
    Pint,
    /// US liquid quart.
    #[serde(rename = "quart")]
    Quart,
    /// US liquid gallon.
    #[serde(rename = "gallon")]
    Gallon,
    /// A single item.
    #[serde(rename = "each")]
    Each,
    /// Twelve items.
    #[serde(rename = "dozen")]
    Dozen,
}

impl Unit {
    /// Every supported unit.
    pub const ALL: [Self; 16] = [
        Self::Milligram,
        Self::Gram,
        Self::Kilogram,
        Self::Ounce,
        Self::Pound,
        Self::Milliliter,
        Self::Liter,
        Self::Teaspoon,
        Self::Tablespoon,
        Self::FluidOunce,
        Self::Cup,
        Self::Pint,
        Self::Quart,
        Self::Gallon,
        Self::Each,
        Self::Dozen,
    ];

    /// Returns the unit's kind.
    #[must_use]
    pub const fn kind(self) -> UnitKind {
        match self {
            Self::Milligram | Self::Gram | Self::Kilogram | Self::Ounce | Self::Pound => {
                UnitKind::Weight
            }
            Self::Milliliter
            | Self::Liter
            | Self::Teaspoon
            | Self::Tablespoon
            | Self::FluidOunce
            | Self::Cup
            | Self::Pint
            | Self::Quart
            | Self::Gallon => UnitKind::Volume,
            Self::Each | Self::Dozen => UnitKind::Count,
        }
    }

    /// How many base units one of this unit is.
    #[must_use]
    pub fn factor(self) -> Decimal {
        match self {
            Self::Milligram => Decimal::new(1, 3),
            Self::Gram | Self::Milliliter | Self::Each => Decimal::ONE,
            Self::Kilogram | Self::Liter => Decimal::ONE_THOUSAND,
            Self::Ounce => Decimal::new(28_349_523_125, 9),
            Self::Pound => Decimal::new(45_359_237, 5),
            Self::Teaspoon => Decimal::new(492_892_159_375, 11),
            Self::Tablespoon => Decimal::new(1_478_676_478_125, 11),
            Self::FluidOunce => Decimal::new(295_735_295_625, 10),
            Self::Cup => Decimal::new(2_365_882_365, 7),
            Self::Pint => Decimal::new(473_176_473, 6),
            Self::Quart => Decimal::new(946_352_946, 6),
            Self::Gallon => Decimal::new(3_785_411_784, 6),
            Self::Dozen => Decimal::from(12),
        }
    }

    /// Stable lowercase code, as stored in the database.
    #[must_use]
    pub const fn canonical(self) -> &'static str {
        match self {
            Self::Milligram => "mg",
            Self::Gram => "g",
            Self::Kilogram => "kg",
            Self::Ounce => "oz",
            Self::Pound => "lb",
            Self::Milliliter => "ml",
            Self::Liter => "l",
            Self::Teaspoon => "tsp",
            Self::Tablespoon => "tbsp",
            Self::FluidOunce => "fl_oz",
            Self::Cup => "cup",
            Self::Pint => "pint",
            Self::Quart => "quart",
            Self::Gallon => "gallon",
            Self::Each => "each",
            Self::Dozen => "dozen",
        }
    }

    /// Parses a unit as written on invoices, pack labels and recipes.
    ///
    /// Matching ignores case, surrounding whitespace, periods and plurals, so
    /// `"LBS."`, `"#"` and `"Pounds"` all mean [`Unit::Pound`].
    ///
    /// ```
    /// use restaurantek_core::units::Unit;
    ///
    /// assert_eq!(Unit::parse("fl. oz").unwrap(), Unit::FluidOunce);
    /// assert_eq!(Unit::parse(" Tbsp ").unwrap(), Unit::Tablespoon);
    /// assert!(Unit::parse("handful").is_err());
    /// ```
    pub fn parse(input: &str) -> Result<Self, UnitError> {
        let key = normalize_unit_text(input);
        let unit = match key.as_str() {
            "mg" | "mgs" | "milligram" | "milligrams" => Self::Milligram,
            "g" | "gr" | "gm" | "gms" | "grs" | "gram" | "grams" | "gramme" | "grammes" => {
                Self::Gram
            }
            "kg" | "kgs" | "kilo" | "kilos" | "kilogram" | "kilograms" => Self::Kilogram,
            "oz" | "ozs" | "ounce" | "ounces" => Self::Ounce,
            "lb" | "lbs" | "#" | "pound" | "pounds" => Self::Pound,
            "ml" | "mls" | "cc" | "milliliter" | "milliliters" | "millilitre" | "millilitres" => {
                Self::Milliliter
            }
            "l" | "lt" | "ltr" | "ltrs" | "liter" | "liters" | "litre" | "litres" => Self::Liter,
            "tsp" | "tsps" | "teaspoon" | "teaspoons" => Self::Teaspoon,
            "tbsp" | "tbsps" | "tbs" | "tbl" | "tblsp" | "tablespoon" | "tablespoons" => {
                Self::Tablespoon
            }
            "fl oz" | "floz" | "fl ozs" | "fl ounce" | "fl ounces" | "fluid ounce"
            | "fluid ounces" => Self::FluidOunce,
            "c" | "cup" | "cups" => Self::Cup,
            "pt" | "pts" | "pint" | "pints" => Self::Pint,
            "qt" | "qts" | "quart" | "quarts" => Self::Quart,
            "gal" | "gals" | "gallon" | "gallons" => Self::Gallon,
            "each" | "ea" | "ct" | "count" | "pc" | "pcs" | "piece" | "pieces" | "unit"
            | "units" | "whole" => Self::Each,
            "dozen" | "dozens" | "doz" | "dz" => Self::Dozen,
            _ => return Err(UnitError::Unknown(input.trim().to_string())),
        };
        Ok(unit)
    }

    /// Converts a quantity of this unit into its kind's base unit.
    pub fn to_base(self, quantity: Decimal) -> Result<Decimal, UnitError> {
        quantity
            .checked_mul(self.factor())
            .ok_or(UnitError::Overflow)
    }
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.canonical())
    }
}

impl FromStr for Unit {
    type Err = UnitError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Lowercases, turns `.`, `_` and `-` into spaces and collapses whitespace.
fn normalize_unit_text(input: &str) -> String {
    let replaced: String = input
        .trim()
        .to_lowercase()
        .chars()
        .map(|c| if matches!(c, '.' | '_' | '-') { ' ' } else { c })
        .collect();
    replaced.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Converts `quantity` of `unit` into base units.
pub fn to_base(quantity: Decimal, unit: Unit) -> Result<Decimal, UnitError> {
    unit.to_base(quantity)
}

/// Converts `quantity` from one unit to another of the same kind.
///
/// ```
/// use restaurantek_core::units::{convert, Unit};
/// use rust_decimal::Decimal;
///
/// let grams = convert(Decimal::from(2), Unit::Kilogram, Unit::Gram).unwrap();
/// assert_eq!(grams, Decimal::from(2000));
/// assert!(convert(Decimal::ONE, Unit::Cup, Unit::Gram).is_err());
/// ```
pub fn convert(quantity: Decimal, from: Unit, to: Unit) -> Result<Decimal, UnitError> {
    if from.kind() != to.kind() {
        return Err(UnitError::Incompatible { from, to });
    }
    if from == to {
        return Ok(quantity);
    }

    from.to_base(quantity)?
        .checked_div(to.factor())
        .ok_or(UnitError::Overflow)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use rust_decimal_macros::dec;

    #[rstest]
    #[case("lb", Unit::Pound)]
    #[case("LBS.", Unit::Pound)]
    #[case("#", Unit::Pound)]
    #[case("Pounds", Unit::Pound)]
    #[case("kgs", Unit::Kilogram)]
    #[case("gr", Unit::Gram)]
    #[case("ltr", Unit::Liter)]
    #[case("floz", Unit::FluidOunce)]
    #[case("fl. oz", Unit::FluidOunce)]
    #[case("fl_oz", Unit::FluidOunce)]
    #[case("Fluid Ounces", Unit::FluidOunce)]
    #[case("c", Unit::Cup)]
    #[case("pt", Unit::Pint)]
    #[case("qt", Unit::Quart)]
    #[case("gal", Unit::Gallon)]
    #[case("ea", Unit::Each)]
    #[case("CT", Unit::Each)]
    #[case("pcs", Unit::Each)]
    #[case("pieces", Unit::Each)]
    #[case("doz", Unit::Dozen)]
    #[case("dz", Unit::Dozen)]
    #[case("  tsp  ", Unit::Teaspoon)]
    #[case("Tbsp.", Unit::Tablespoon)]
    fn test_parse_aliases(#[case] input: &str, #[case] expected: Unit) {
        assert_eq!(Unit::parse(input).unwrap(), expected);
    }

    #[test]
    fn test_parse_unknown() {
        let err = Unit::parse(" pinch ").unwrap_err();
        assert!(matches!(err, UnitError::Unknown(ref s) if s == "pinch"));
        assert!(Unit::parse("").is_err());
    }

    #[test]
    fn test_canonical_codes_parse_back() {
        for unit in Unit::ALL {
            assert_eq!(Unit::parse(unit.canonical()).unwrap(), unit);
            assert_eq!(unit.to_string(), unit.canonical());
        }
    }

    #[test]
    fn test_serde_uses_canonical_codes() {
        let json = serde_json::to_string(&Unit::FluidOunce).unwrap();
        assert_eq!(json, "\"fl_oz\"");
        let unit: Unit = serde_json::from_str("\"gallon\"").unwrap();
        assert_eq!(unit, Unit::Gallon);
    }

    #[test]
    fn test_base_units_have_factor_one() {
        for kind in [UnitKind::Weight, UnitKind::Volume, UnitKind::Count] {
            assert_eq!(kind.base_unit().factor(), Decimal::ONE);
            assert_eq!(kind.base_unit().kind(), kind);
        }
    }

    #[rstest]
    #[case(dec!(1), Unit::Pound, dec!(453.59237))]
    #[case(dec!(16), Unit::Ounce, dec!(453.59237))]
    #[case(dec!(2.5), Unit::Kilogram, dec!(2500))]
    #[case(dec!(500), Unit::Milligram, dec!(0.5))]
    #[case(dec!(3), Unit::Teaspoon, dec!(14.78676478125))]
    #[case(dec!(1), Unit::Gallon, dec!(3785.411784))]
    #[case(dec!(2), Unit::Dozen, dec!(24))]
    fn test_to_base(#[case] qty: Decimal, #[case] unit: Unit, #[case] expected: Decimal) {
        assert_eq!(to_base(qty, unit).unwrap(), expected);
    }

    #[test]
    fn test_customary_volume_ladder_is_exact() {
        assert_eq!(convert(dec!(1), Unit::Gallon, Unit::Quart).unwrap(), dec!(4));
        assert_eq!(convert(dec!(1), Unit::Quart, Unit::Pint).unwrap(), dec!(2));
        assert_eq!(convert(dec!(1), Unit::Pint, Unit::Cup).unwrap(), dec!(2));
        assert_eq!(convert(dec!(1), Unit::Cup, Unit::FluidOunce).unwrap(), dec!(8));
        assert_eq!(convert(dec!(1), Unit::FluidOunce, Unit::Tablespoon).unwrap(), dec!(2));
        assert_eq!(convert(dec!(1), Unit::Tablespoon, Unit::Teaspoon).unwrap(), dec!(3));
    }

    #[test]
    fn test_convert_incompatible() {
        let err = convert(dec!(1), Unit::Cup, Unit::Pound).unwrap_err();
        assert!(matches!(
            err,
            UnitError::Incompatible {
                from: Unit::Cup,
                to: Unit::Pound
            }
        ));
    }

    #[test]
    fn test_to_base_overflow() {
        assert!(matches!(
            to_base(Decimal::MAX, Unit::Gallon),
            Err(UnitError::Overflow)
        ));
    }
}

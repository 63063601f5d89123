//! Property-based tests for unit conversion.

use proptest::prelude::*;
use rust_decimal::Decimal;

use super::{Unit, UnitError, UnitKind, convert, to_base};

/// Quantities from 0.001 to 1,000,000.000 as written in recipes and packs.
fn quantity() -> impl Strategy<Value = Decimal> {
    (1i64..1_000_000_000i64).prop_map(|milli| Decimal::new(milli, 3))
}

fn unit() -> impl Strategy<Value = Unit> {
    prop::sample::select(Unit::ALL.to_vec())
}

fn units_of_same_kind() -> impl Strategy<Value = (Unit, Unit)> {
    (unit(), unit()).prop_filter("units must share a kind", |(a, b)| a.kind() == b.kind())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// Converting there and back returns the original quantity at 10 dp.
    #[test]
    fn prop_convert_round_trip((from, to) in units_of_same_kind(), qty in quantity()) {
        let there = convert(qty, from, to).unwrap();
        let back = convert(there, to, from).unwrap();
        prop_assert_eq!(back.round_dp(10), qty);
    }

    /// Converting to the base unit agrees with `to_base`.
    #[test]
    fn prop_convert_to_base_matches_to_base(from in unit(), qty in quantity()) {
        let base = from.kind().base_unit();
        prop_assert_eq!(convert(qty, from, base).unwrap(), to_base(qty, from).unwrap());
    }

    /// Units of different kinds never convert.
    #[test]
    fn prop_cross_kind_conversion_fails(a in unit(), b in unit(), qty in quantity()) {
        prop_assume!(a.kind() != b.kind());
        let is_incompatible = matches!(convert(qty, a, b), Err(UnitError::Incompatible { .. }));
        prop_assert!(is_incompatible);
    }

    /// Base quantities are positive for positive inputs and scale linearly.
    #[test]
    fn prop_to_base_is_linear(from in unit(), qty in quantity()) {
        let single = to_base(qty, from).unwrap();
        let double = to_base(qty * Decimal::TWO, from).unwrap();
        prop_assert!(single > Decimal::ZERO);
        prop_assert_eq!(double, single * Decimal::TWO);
    }
}

#[test]
fn every_kind_has_units() {
    for kind in [UnitKind::Weight, UnitKind::Volume, UnitKind::Count] {
        assert!(Unit::ALL.iter().filter(|u| u.kind() == kind).count() >= 2);
    }
}

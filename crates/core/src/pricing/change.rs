//! Price movement between two recorded prices.

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

/// Which way a price moved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PriceDirection {
    /// Current price is higher.
    Up,
    /// Current price is lower.
    Down,
    /// No change.
    Unchanged,
}

/// Difference between a previous and a current price.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceChange {
    /// Earlier price.
    pub previous: Decimal,
    /// Later price.
    pub current: Decimal,
    /// `current - previous`.
    pub change: Decimal,
    /// Change relative to `previous` in percent, 2 dp. `None` when `previous` is zero.
    pub percent: Option<Decimal>,
    /// Direction of the move.
    pub direction: PriceDirection,
}

impl PriceChange {
    /// Compares two prices.
    ///
    /// Percentages use banker's rounding to two places.
    #[must_use]
    pub fn between(previous: Decimal, current: Decimal) -> Self {
        let change = current - previous;
        let percent = if previous.is_zero() {
            None
        } else {
            change
                .checked_div(previous)
                .and_then(|ratio| ratio.checked_mul(Decimal::ONE_HUNDRED))
                .map(|pct| pct.round_dp_with_strategy(2, RoundingStrategy::MidpointNearestEven))
        };

        let direction = if change.is_zero() {
            PriceDirection::Unchanged
        } else if change.is_sign_positive() {
            PriceDirection::Up
        } else {
            PriceDirection::Down
        };

        Self {
            previous,
            current,
            change,
            percent,
            direction,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_price_increase() {
        let change = PriceChange::between(dec!(40.00), dec!(45.00));
        assert_eq!(change.change, dec!(5.00));
        assert_eq!(change.percent, Some(dec!(12.50)));
        assert_eq!(change.direction, PriceDirection::Up);
    }

    #[test]
    fn test_price_decrease() {
        let change = PriceChange::between(dec!(30), dec!(20));
        assert_eq!(change.change, dec!(-10));
        // -33.333... rounds to -33.33
        assert_eq!(change.percent, Some(dec!(-33.33)));
        assert_eq!(change.direction, PriceDirection::Down);
    }

    #[test]
    fn test_unchanged() {
        let change = PriceChange::between(dec!(12.3456), dec!(12.3456));
        assert_eq!(change.change, Decimal::ZERO);
        assert_eq!(change.percent, Some(Decimal::ZERO));
        assert_eq!(change.direction, PriceDirection::Unchanged);
    }

    #[test]
    fn test_zero_previous_has_no_percent() {
        let change = PriceChange::between(Decimal::ZERO, dec!(10));
        assert_eq!(change.percent, None);
        assert_eq!(change.direction, PriceDirection::Up);
    }

    #[test]
    fn test_bankers_rounding_on_percent() {
        // 0.125% -> 0.12, 0.135% -> 0.14
        let down = PriceChange::between(dec!(800), dec!(801));
        assert_eq!(down.percent, Some(dec!(0.12)));
        let up = PriceChange::between(dec!(1000), dec!(1001.35));
        assert_eq!(up.percent, Some(dec!(0.14)));
    }
}

//! Lenient quantity reading for model output.

use std::str::FromStr;

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// Decimal places kept for parsed quantities.
pub const QUANTITY_SCALE: u32 = 4;

fn vulgar_fraction(c: char) -> Option<(i64, i64)> {
    Some(match c {
        '½' => (1, 2),
        '⅓' => (1, 3),
        '⅔' => (2, 3),
        '¼' => (1, 4),
        '¾' => (3, 4),
        '⅕' => (1, 5),
        '⅖' => (2, 5),
        '⅗' => (3, 5),
        '⅘' => (4, 5),
        '⅙' => (1, 6),
        '⅚' => (5, 6),
        '⅛' => (1, 8),
        '⅜' => (3, 8),
        '⅝' => (5, 8),
        '⅞' => (7, 8),
        _ => return None,
    })
}

fn ratio(numerator: i64, denominator: i64) -> Option<Decimal> {
    if denominator == 0 {
        return None;
    }
    Decimal::from(numerator).checked_div(Decimal::from(denominator))
}

fn parse_simple(part: &str) -> Option<Decimal> {
    if let Some((num, den)) = part.split_once('/') {
        let num: i64 = num.trim().parse().ok()?;
        let den: i64 = den.trim().parse().ok()?;
        return ratio(num, den);
    }

    let mut chars = part.chars();
    let last = chars.next_back()?;
    if let Some((num, den)) = vulgar_fraction(last) {
        let whole = chars.as_str().trim();
        let whole = if whole.is_empty() {
            Decimal::ZERO
        } else {
            Decimal::from_str(whole).ok()?
        };
        return whole.checked_add(ratio(num, den)?);
    }

    Decimal::from_str(part).ok()
}

/// Reads a quantity written as `2`, `1.5`, `1/2`, `1 1/2`, `1-1/2`, `½` or `1½`.
///
/// Results are rounded to [`QUANTITY_SCALE`] places; negative values and
/// anything unreadable give `None`.
///
/// ```
/// use restaurantek_core::parser::parse_quantity;
/// use rust_decimal::Decimal;
///
/// assert_eq!(parse_quantity("1 1/2"), Some(Decimal::new(15, 1)));
/// assert_eq!(parse_quantity("½"), Some(Decimal::new(5, 1)));
/// assert_eq!(parse_quantity("a pinch"), None);
/// ```
#[must_use]
pub fn parse_quantity(text: &str) -> Option<Decimal> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }

    let is_fraction =
        |part: &str| part.contains('/') || part.chars().any(|c| vulgar_fraction(c).is_some());
    let mixed = text
        .split_once(' ')
        .or_else(|| text.split_once('-').filter(|(_, frac)| is_fraction(frac)));

    let value = match mixed {
        Some((whole, frac)) if is_fraction(frac) => {
            let whole: i64 = whole.trim().parse().ok()?;
            Decimal::from(whole).checked_add(parse_simple(frac.trim())?)?
        }
        Some(_) => return None,
        None => parse_simple(text)?,
    };

    if value.is_sign_negative() {
        return None;
    }
    Some(value.round_dp_with_strategy(QUANTITY_SCALE, RoundingStrategy::MidpointNearestEven))
}

/// Reads a JSON number, numeric string or null as an optional quantity.
pub fn quantity_from_json(value: &Value) -> Option<Decimal> {
    match value {
        Value::Number(n) => {
            let text = n.to_string();
            let parsed = Decimal::from_str(&text)
                .or_else(|_| Decimal::from_scientific(&text))
                .ok()?;
            (!parsed.is_sign_negative()).then(|| {
                parsed.round_dp_with_strategy(QUANTITY_SCALE, RoundingStrategy::MidpointNearestEven)
            })
        }
        Value::String(s) => parse_quantity(s),
        _ => None,
    }
}

/// Serde helper for optional quantity fields in model output.
pub fn deserialize_quantity<'de, D>(deserializer: D) -> Result<Option<Decimal>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(quantity_from_json(&value))
}

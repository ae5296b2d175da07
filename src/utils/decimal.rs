//! Conversions between the f64 price domain and Decimal money/lot amounts.

use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

/// Venues accept lot sizes in steps of 0.01.
pub const LOT_STEP: Decimal = dec!(0.01);

/// Convert a computed lot size to a Decimal rounded to two places.
///
/// Returns `None` for NaN, infinities and values outside Decimal's range.
pub fn lots_from_f64(value: f64) -> Option<Decimal> {
    if !value.is_finite() {
        return None;
    }
    Decimal::from_f64(value).map(|lots| lots.round_dp(2))
}

/// Lossy conversion for feeding Decimal amounts into f64 formulas.
pub fn to_f64(value: Decimal) -> f64 {
    value.to_f64().unwrap_or(f64::NAN)
}

/// `part` as a percentage of `whole`, `None` when `whole` is zero.
pub fn percentage_of(part: Decimal, whole: Decimal) -> Option<Decimal> {
    if whole == Decimal::ZERO {
        None
    } else {
        Some(part / whole * dec!(100))
    }
}

/// Round down to a whole number of lot steps.
pub fn round_down_to_lot(value: Decimal, lot_size: Decimal) -> Decimal {
    if lot_size == Decimal::ZERO {
        return value;
    }
    (value / lot_size).floor() * lot_size
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lots_from_f64() {
        assert_eq!(lots_from_f64(0.12345), Some(dec!(0.12)));
        assert_eq!(lots_from_f64(0.125_1), Some(dec!(0.13)));
        assert_eq!(lots_from_f64(f64::NAN), None);
        assert_eq!(lots_from_f64(f64::INFINITY), None);
    }

    #[test]
    fn test_percentage_of() {
        assert_eq!(percentage_of(dec!(1000), dec!(10000)), Some(dec!(10)));
        assert_eq!(percentage_of(dec!(1), Decimal::ZERO), None);
    }

    #[test]
    fn test_round_down_to_lot() {
        assert_eq!(round_down_to_lot(dec!(1.567), LOT_STEP), dec!(1.56));
        assert_eq!(round_down_to_lot(dec!(1.567), dec!(0.1)), dec!(1.5));
        assert_eq!(round_down_to_lot(dec!(1.567), Decimal::ZERO), dec!(1.567));
    }

    #[test]
    fn test_to_f64() {
        assert_eq!(to_f64(dec!(10000)), 10000.0);
    }
}

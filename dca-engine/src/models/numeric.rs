use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::{Decimal, RoundingStrategy};

/// Decimal places used for fiat amounts and limit prices.
pub const FIAT_PLACES: u32 = 2;
/// Decimal places used for crypto order sizes.
pub const SIZE_PLACES: u32 = 8;

/// Cuts `value` to `places` decimals without rounding.
pub fn truncate_decimal(value: Decimal, places: u32) -> Decimal {
    value.round_dp_with_strategy(places, RoundingStrategy::ToZero)
}

/// Float front-end for [`truncate_decimal`]. Non-finite input is returned as is.
pub fn truncate(value: f64, places: u32) -> f64 {
    if !value.is_finite() {
        return value;
    }
    to_f64(truncate_decimal(to_decimal(value), places))
}

/// Converts through the float's shortest round-trip representation, so
/// `0.29_f64` becomes exactly `0.29` rather than `0.28999999999999998`.
pub fn to_decimal(value: f64) -> Decimal {
    value
        .to_string()
        .parse::<Decimal>()
        .ok()
        .or_else(|| Decimal::from_f64(value))
        .unwrap_or_default()
}

/// Inverse of [`to_decimal`]: `25.01` comes back as the float nearest to it.
pub fn to_f64(value: Decimal) -> f64 {
    value
        .to_string()
        .parse::<f64>()
        .ok()
        .or_else(|| value.to_f64())
        .unwrap_or_default()
}

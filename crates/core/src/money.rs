//! Decimal helpers for money and stock quantities.

use rust_decimal::{Decimal, RoundingStrategy};

/// Amount in currency units (not minor units).
pub type Money = Decimal;

/// Stock quantity in the batch's unit (pieces, kg, liters, ...).
pub type Quantity = Decimal;

/// Round to 2 decimal places, midpoint away from zero.
///
/// This is the precision used for every displayed percentage and unit cost;
/// the result always carries exactly two fractional digits.
pub fn round_2dp(value: Decimal) -> Decimal {
    let mut rounded = value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    rounded.rescale(2);
    rounded
}

/// `numerator / denominator`, or `None` when the denominator is zero.
pub fn checked_ratio(numerator: Decimal, denominator: Decimal) -> Option<Decimal> {
    if denominator.is_zero() {
        return None;
    }
    numerator.checked_div(denominator)
}

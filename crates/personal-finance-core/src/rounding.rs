//! Monetary rounding shared by every engine.
//!
//! One rule everywhere: two fractional digits, midpoint away from zero
//! (round-half-up for the non-negative amounts the engines produce). It is
//! applied after every step that yields a monetary value, so long schedules
//! reproduce cent-for-cent the figures a spreadsheet rounding each row would.

use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;

use crate::types::{Money, Rate};

/// Fractional digits kept on every monetary value.
pub const MONEY_DP: u32 = 2;

/// Smallest representable monetary amount.
pub const ROUNDING_UNIT: Money = dec!(0.01);

/// Round a monetary value to cents, half away from zero.
pub fn round_money(value: Decimal) -> Money {
    value.round_dp_with_strategy(MONEY_DP, RoundingStrategy::MidpointAwayFromZero)
}

/// `part` as a percentage of `total`, rounded to cents. Zero when `total` is zero.
pub fn percent_of(part: Money, total: Money) -> Rate {
    if total.is_zero() {
        return Decimal::ZERO;
    }
    round_money(part / total * dec!(100))
}

/// Sum a sequence of monetary values and round the total.
pub fn sum_money<I: IntoIterator<Item = Money>>(values: I) -> Money {
    round_money(values.into_iter().sum())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_half_up_at_midpoint() {
        assert_eq!(round_money(dec!(1.005)), dec!(1.01));
        assert_eq!(round_money(dec!(2.675)), dec!(2.68));
        assert_eq!(round_money(dec!(1.0049)), dec!(1.00));
    }

    #[test]
    fn test_negative_rounds_away_from_zero() {
        assert_eq!(round_money(dec!(-1.005)), dec!(-1.01));
    }

    #[test]
    fn test_percent_of_zero_total() {
        assert_eq!(percent_of(dec!(10), Decimal::ZERO), Decimal::ZERO);
        assert_eq!(percent_of(dec!(1), dec!(3)), dec!(33.33));
    }

    #[test]
    fn test_sum_money() {
        assert_eq!(sum_money(vec![dec!(0.10), dec!(0.20), dec!(0.30)]), dec!(0.60));
    }
}

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use rust_decimal::MathematicalOps;

use crate::error::FinanceError;
use crate::types::Rate;
use crate::FinanceResult;

/// Compounding factor `(1 + rate)^periods`.
///
/// Whole period counts use exact integer powers; fractional counts (e.g. an
/// 18-month horizon compounded annually) fall back to `powd`. Overflow of the
/// 96-bit mantissa is reported rather than saturated.
pub fn compound_factor(rate: Rate, periods: Decimal) -> FinanceResult<Decimal> {
    let base = Decimal::ONE + rate;
    let factor = if periods.fract().is_zero() {
        periods
            .to_i64()
            .and_then(|n| base.checked_powi(n))
    } else {
        base.checked_powd(periods)
    };

    factor.ok_or_else(|| FinanceError::Overflow {
        context: format!("compounding (1 + {rate})^{periods}"),
    })
}

/// Level payment that amortises `present_value` over `periods` at `rate` per
/// period: `PV·r(1+r)^n / ((1+r)^n − 1)`. Unrounded.
pub fn annuity_payment(rate: Rate, periods: u32, present_value: Decimal) -> FinanceResult<Decimal> {
    if periods == 0 {
        return Ok(Decimal::ZERO);
    }
    if rate.is_zero() {
        return Ok(present_value / Decimal::from(periods));
    }

    let factor = compound_factor(rate, Decimal::from(periods))?;
    let denominator = factor - Decimal::ONE;
    if denominator.is_zero() {
        return Err(FinanceError::InvariantViolation {
            context: "annuity payment".into(),
            detail: format!("degenerate annuity factor at rate {rate} over {periods} periods"),
        });
    }

    Ok(present_value * rate * factor / denominator)
}

/// Future value of an ordinary annuity of `payment` per period:
/// `PMT·((1+r)^n − 1)/r`. Unrounded.
pub fn annuity_future_value(rate: Rate, periods: Decimal, payment: Decimal) -> FinanceResult<Decimal> {
    if rate.is_zero() {
        return Ok(payment * periods);
    }
    let factor = compound_factor(rate, periods)?;
    Ok(payment * (factor - Decimal::ONE) / rate)
}

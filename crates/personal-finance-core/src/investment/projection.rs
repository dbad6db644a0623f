//! Compound growth of an initial amount plus monthly contributions.
//!
//! Two independent derivations are kept. The closed form (future value of
//! the principal plus an ordinary annuity at the chosen compounding
//! frequency) gives the headline totals. The month-by-month simulation
//! (contribute, then accrue `rate/12`) gives the shape of the breakdown.
//! The breakdown's interest is rescaled so its final period lands exactly on
//! the closed-form totals; intermediate periods trade a little precision for
//! a consistent endpoint.

use log::debug;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::error::FinanceError;
use crate::rounding::round_money;
use crate::time_value::{annuity_future_value, compound_factor};
use crate::types::{with_metadata, ComputationOutput, Money, Rate};
use crate::validation::ValidationErrors;
use crate::FinanceResult;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

pub const MAX_INITIAL_AMOUNT: Money = dec!(1_000_000_000);
pub const MAX_MONTHLY_CONTRIBUTION: Money = dec!(1_000_000);
pub const MAX_DURATION_MONTHS: u32 = 1200;
pub const MAX_RATE_PCT: Decimal = dec!(100);

const MONTHS_PER_YEAR: Decimal = dec!(12);

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CompoundingFrequency {
    Monthly,
    Quarterly,
    Annually,
}

impl CompoundingFrequency {
    pub fn periods_per_year(self) -> u32 {
        match self {
            CompoundingFrequency::Monthly => 12,
            CompoundingFrequency::Quarterly => 4,
            CompoundingFrequency::Annually => 1,
        }
    }
}

/// Spacing of the reported breakdown periods.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BreakdownGranularity {
    #[default]
    Monthly,
    Yearly,
}

impl BreakdownGranularity {
    fn step_months(self) -> u32 {
        match self {
            BreakdownGranularity::Monthly => 1,
            BreakdownGranularity::Yearly => 12,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvestmentTerms {
    pub initial_amount: Money,
    pub monthly_contribution: Money,
    pub duration_months: u32,
    /// Nominal annual rate as a percentage (7.5 = 7.5%).
    pub annual_rate_pct: Decimal,
    pub compounding: CompoundingFrequency,
    #[serde(default)]
    pub granularity: BreakdownGranularity,
}

impl InvestmentTerms {
    pub fn annual_rate(&self) -> Rate {
        self.annual_rate_pct / dec!(100)
    }

    pub fn years(&self) -> Decimal {
        Decimal::from(self.duration_months) / MONTHS_PER_YEAR
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvestmentPeriod {
    /// 1-based index in units of the breakdown granularity.
    pub period: u32,
    pub months_elapsed: u32,
    pub contributed: Money,
    pub interest: Money,
    pub balance: Money,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClosedFormTotals {
    pub total_invested: Money,
    pub fv_principal: Money,
    pub fv_contributions: Money,
    pub final_value: Money,
    pub total_interest: Money,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvestmentResult {
    pub total_contributed: Money,
    pub total_interest: Money,
    pub final_value: Money,
    pub fv_principal: Money,
    pub fv_contributions: Money,
    pub periods: Vec<InvestmentPeriod>,
}

// ---------------------------------------------------------------------------
// Closed form
// ---------------------------------------------------------------------------

/// `periods_per_year × years`, normalised so a whole number of months divided
/// by 12 and multiplied back does not leave a 28th-digit remainder.
fn compounding_periods(periods_per_year: u32, years: Decimal) -> Decimal {
    (Decimal::from(periods_per_year) * years).round_dp(9).normalize()
}

/// Future value of a lump sum: `P·(1 + r/n)^(n·t)`, rounded to cents.
pub fn future_value_principal(
    principal: Money,
    annual_rate: Rate,
    periods_per_year: u32,
    years: Decimal,
) -> FinanceResult<Money> {
    if principal <= Decimal::ZERO || years <= Decimal::ZERO || periods_per_year == 0 {
        return Ok(Decimal::ZERO);
    }
    if annual_rate.is_zero() {
        return Ok(principal);
    }

    let n = Decimal::from(periods_per_year);
    let factor = compound_factor(annual_rate / n, compounding_periods(periods_per_year, years))?;
    Ok(round_money(principal * factor))
}

/// Future value of monthly contributions as an ordinary annuity at the
/// compounding frequency, rounded to cents.
///
/// Each compounding period receives `monthly × 12/n` and the exponent is the
/// same fractional `n·t` as [`future_value_principal`]. A horizon shorter than
/// one compounding period credits no interest, as does a zero rate: both give
/// the plain sum `monthly × months`.
pub fn future_value_contributions(
    monthly_contribution: Money,
    annual_rate: Rate,
    periods_per_year: u32,
    years: Decimal,
) -> FinanceResult<Money> {
    if monthly_contribution <= Decimal::ZERO || years <= Decimal::ZERO || periods_per_year == 0 {
        return Ok(Decimal::ZERO);
    }

    let periods = compounding_periods(periods_per_year, years);
    if annual_rate.is_zero() || periods < Decimal::ONE {
        return Ok(round_money(monthly_contribution * compounding_periods(12, years)));
    }

    let n = Decimal::from(periods_per_year);
    let fv = annuity_future_value(
        annual_rate / n,
        periods,
        monthly_contribution * (MONTHS_PER_YEAR / n),
    )?;
    Ok(round_money(fv))
}

/// Headline totals from the closed-form formulas.
pub fn closed_form_totals(terms: &InvestmentTerms) -> FinanceResult<ClosedFormTotals> {
    let rate = terms.annual_rate();
    let ppy = terms.compounding.periods_per_year();
    let years = terms.years();

    let total_invested = round_money(
        terms.initial_amount + terms.monthly_contribution * Decimal::from(terms.duration_months),
    );
    let fv_principal = future_value_principal(terms.initial_amount, rate, ppy, years)?;
    let fv_contributions = future_value_contributions(terms.monthly_contribution, rate, ppy, years)?;
    let final_value = round_money(fv_principal + fv_contributions);

    Ok(ClosedFormTotals {
        total_invested,
        fv_principal,
        fv_contributions,
        final_value,
        total_interest: round_money(final_value - total_invested),
    })
}

// ---------------------------------------------------------------------------
// Simulation
// ---------------------------------------------------------------------------

fn overflow(month: u32) -> FinanceError {
    FinanceError::Overflow {
        context: format!("investment simulation at month {month}"),
    }
}

/// Month-by-month simulation: add the contribution, then accrue `rate/12` on
/// the running balance. Snapshots every `granularity` step and at the final
/// month.
pub fn simulate_breakdown(
    terms: &InvestmentTerms,
    granularity: BreakdownGranularity,
) -> FinanceResult<Vec<InvestmentPeriod>> {
    let monthly_rate = terms.annual_rate() / MONTHS_PER_YEAR;
    let step = granularity.step_months();

    let mut periods = Vec::with_capacity((terms.duration_months / step + 1) as usize);
    let mut balance = terms.initial_amount;
    let mut contributed = terms.initial_amount;

    for month in 1..=terms.duration_months {
        balance = balance
            .checked_add(terms.monthly_contribution)
            .ok_or_else(|| overflow(month))?;
        contributed += terms.monthly_contribution;
        let interest = balance.checked_mul(monthly_rate).ok_or_else(|| overflow(month))?;
        balance = balance.checked_add(interest).ok_or_else(|| overflow(month))?;

        if month % step == 0 || month == terms.duration_months {
            let contributed_r = round_money(contributed);
            let interest_r = round_money(balance - contributed);
            periods.push(InvestmentPeriod {
                period: month.div_ceil(step),
                months_elapsed: month,
                contributed: contributed_r,
                interest: interest_r,
                balance: contributed_r + interest_r,
            });
        }
    }

    Ok(periods)
}

/// Rescale simulated interest so the last period equals the closed-form totals.
pub fn reconcile_breakdown(
    periods: Vec<InvestmentPeriod>,
    totals: &ClosedFormTotals,
) -> Vec<InvestmentPeriod> {
    let Some(last) = periods.last() else {
        return periods;
    };

    let simulated_interest = last.interest;
    let scale = if simulated_interest > Decimal::ZERO {
        Some(totals.total_interest / simulated_interest)
    } else {
        None
    };
    debug!(
        "reconciling breakdown: simulated interest {simulated_interest}, closed form {}",
        totals.total_interest
    );

    let count = periods.len();
    periods
        .into_iter()
        .enumerate()
        .map(|(i, p)| {
            let interest = if i + 1 == count {
                totals.total_interest
            } else {
                match scale {
                    Some(s) => round_money(p.interest * s),
                    None => p.interest,
                }
            };
            InvestmentPeriod {
                balance: round_money(p.contributed + interest),
                interest,
                ..p
            }
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

pub fn validate_investment_terms(terms: &InvestmentTerms) -> FinanceResult<()> {
    let mut errors = ValidationErrors::new();
    errors.positive("initial_amount", "Initial amount", terms.initial_amount);
    errors.at_most("initial_amount", "Initial amount", terms.initial_amount, MAX_INITIAL_AMOUNT);
    errors.non_negative(
        "monthly_contribution",
        "Monthly contribution",
        terms.monthly_contribution,
    );
    errors.at_most(
        "monthly_contribution",
        "Monthly contribution",
        terms.monthly_contribution,
        MAX_MONTHLY_CONTRIBUTION,
    );
    errors.within("duration_months", "Duration", terms.duration_months, 1, MAX_DURATION_MONTHS);
    errors.non_negative("annual_rate_pct", "Interest rate", terms.annual_rate_pct);
    errors.at_most("annual_rate_pct", "Interest rate", terms.annual_rate_pct, MAX_RATE_PCT);
    errors.into_result()
}

/// Project an investment: closed-form totals plus a reconciled breakdown.
pub fn project_investment(
    terms: &InvestmentTerms,
) -> FinanceResult<ComputationOutput<InvestmentResult>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    validate_investment_terms(terms)?;

    let totals = closed_form_totals(terms)?;
    let simulated = simulate_breakdown(terms, terms.granularity)?;
    let periods = reconcile_breakdown(simulated, &totals);

    if terms.granularity == BreakdownGranularity::Yearly && terms.duration_months % 12 != 0 {
        warnings.push(format!(
            "Duration of {} months is not a whole number of years; the last period is partial",
            terms.duration_months
        ));
    }

    let result = InvestmentResult {
        total_contributed: totals.total_invested,
        total_interest: totals.total_interest,
        final_value: totals.final_value,
        fv_principal: totals.fv_principal,
        fv_contributions: totals.fv_contributions,
        periods,
    };

    Ok(with_metadata(
        "Closed-form compound growth with rescaled monthly simulation",
        &serde_json::json!({
            "initial_amount": terms.initial_amount.to_string(),
            "monthly_contribution": terms.monthly_contribution.to_string(),
            "duration_months": terms.duration_months,
            "annual_rate_pct": terms.annual_rate_pct.to_string(),
            "periods_per_year": terms.compounding.periods_per_year(),
        }),
        warnings,
        start,
        result,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn plan() -> InvestmentTerms {
        InvestmentTerms {
            initial_amount: dec!(10_000),
            monthly_contribution: dec!(500),
            duration_months: 60,
            annual_rate_pct: dec!(7),
            compounding: CompoundingFrequency::Monthly,
            granularity: BreakdownGranularity::Monthly,
        }
    }

    #[test]
    fn test_fv_principal_annual_reference() {
        let fv = future_value_principal(dec!(10_000), dec!(0.075), 1, dec!(5)).unwrap();
        assert_eq!(fv, dec!(14356.29));
    }

    #[test]
    fn test_fv_principal_monthly_compounding() {
        let fv = future_value_principal(dec!(10_000), dec!(0.075), 12, dec!(5)).unwrap();
        assert!(fv > dec!(14_500) && fv < dec!(14_600), "got {fv}");
    }

    #[test]
    fn test_fv_principal_edges() {
        assert_eq!(
            future_value_principal(dec!(10_000), Decimal::ZERO, 12, dec!(5)).unwrap(),
            dec!(10_000)
        );
        assert_eq!(
            future_value_principal(Decimal::ZERO, dec!(0.05), 12, dec!(5)).unwrap(),
            Decimal::ZERO
        );
        assert_eq!(
            future_value_principal(dec!(10_000), dec!(0.05), 12, Decimal::ZERO).unwrap(),
            Decimal::ZERO
        );
    }

    #[test]
    fn test_fv_contributions_monthly() {
        let fv = future_value_contributions(dec!(500), dec!(0.06), 12, dec!(5)).unwrap();
        assert!(fv > dec!(34_000) && fv < dec!(37_000), "got {fv}");
    }

    #[test]
    fn test_fv_contributions_quarterly() {
        let fv = future_value_contributions(dec!(500), dec!(0.06), 4, dec!(5)).unwrap();
        assert!(fv > dec!(34_000), "got {fv}");
    }

    #[test]
    fn test_fv_contributions_zero_rate_is_plain_sum() {
        let fv = future_value_contributions(dec!(500), Decimal::ZERO, 12, dec!(5)).unwrap();
        assert_eq!(fv, dec!(30_000));

        // Seven months compounded quarterly still counts every month
        let years = Decimal::from(7) / dec!(12);
        let fv = future_value_contributions(dec!(250), Decimal::ZERO, 4, years).unwrap();
        assert_eq!(fv, dec!(1_750));
    }

    #[test]
    fn test_fv_contributions_fractional_periods() {
        // 18 months compounded annually: 1,200 per period over 1.5 periods,
        // 1200·(1.1^1.5 − 1)/0.1 ≈ 1,844.28
        let fv = future_value_contributions(dec!(100), dec!(0.10), 1, dec!(1.5)).unwrap();
        assert!(fv >= dec!(1_844.27) && fv <= dec!(1_844.28), "got {fv}");

        // The principal uses the same exponent
        let principal = future_value_principal(dec!(1_000), dec!(0.10), 1, dec!(1.5)).unwrap();
        assert!(principal >= dec!(1_153.68) && principal <= dec!(1_153.70), "got {principal}");
    }

    #[test]
    fn test_fv_contributions_under_one_period_earn_nothing() {
        // Seven months compounded annually: no period has closed yet
        let years = Decimal::from(7) / dec!(12);
        let fv = future_value_contributions(dec!(100), dec!(0.10), 1, years).unwrap();
        assert_eq!(fv, dec!(700));
    }

    #[test]
    fn test_fv_contributions_zero_contribution() {
        let fv = future_value_contributions(Decimal::ZERO, dec!(0.06), 12, dec!(5)).unwrap();
        assert_eq!(fv, Decimal::ZERO);
    }

    #[test]
    fn test_monthly_breakdown_shape() {
        let mut terms = plan();
        terms.duration_months = 12;
        let periods = simulate_breakdown(&terms, BreakdownGranularity::Monthly).unwrap();

        assert_eq!(periods.len(), 12);
        assert_eq!(periods[0].period, 1);
        assert_eq!(periods[11].period, 12);
        assert_eq!(periods[11].contributed, dec!(16_000));
        for pair in periods.windows(2) {
            assert!(pair[1].balance > pair[0].balance);
        }
    }

    #[test]
    fn test_yearly_breakdown_with_partial_year() {
        let mut terms = plan();
        terms.duration_months = 30;
        let periods = simulate_breakdown(&terms, BreakdownGranularity::Yearly).unwrap();

        assert_eq!(periods.len(), 3);
        assert_eq!(periods[0].months_elapsed, 12);
        assert_eq!(periods[1].months_elapsed, 24);
        assert_eq!(periods[2].months_elapsed, 30);
        assert_eq!(periods[2].period, 3);
    }

    #[test]
    fn test_reconciled_breakdown_ends_on_closed_form() {
        let out = project_investment(&plan()).unwrap();
        let r = &out.result;
        let last = r.periods.last().unwrap();

        assert_eq!(r.total_contributed, dec!(40_000));
        assert_eq!(last.contributed, r.total_contributed);
        assert_eq!(last.interest, r.total_interest);
        assert_eq!(last.balance, r.final_value);
        assert_eq!(r.final_value, r.total_contributed + r.total_interest);
        assert_eq!(r.final_value, r.fv_principal + r.fv_contributions);

        for p in &r.periods {
            assert_eq!(p.balance, p.contributed + p.interest);
        }
        for pair in r.periods.windows(2) {
            assert!(pair[1].balance >= pair[0].balance);
        }
    }

    #[test]
    fn test_zero_rate_projection_has_no_interest() {
        let mut terms = plan();
        terms.annual_rate_pct = Decimal::ZERO;
        let out = project_investment(&terms).unwrap();
        assert_eq!(out.result.total_interest, Decimal::ZERO);
        assert_eq!(out.result.final_value, out.result.total_contributed);
        assert!(out.result.periods.iter().all(|p| p.interest.is_zero()));
    }

    #[test]
    fn test_no_contributions() {
        let mut terms = plan();
        terms.monthly_contribution = Decimal::ZERO;
        terms.compounding = CompoundingFrequency::Annually;
        let out = project_investment(&terms).unwrap();
        assert_eq!(out.result.total_contributed, dec!(10_000));
        assert!(out.result.total_interest > Decimal::ZERO);
    }

    #[test]
    fn test_yearly_partial_warns() {
        let mut terms = plan();
        terms.duration_months = 30;
        terms.granularity = BreakdownGranularity::Yearly;
        let out = project_investment(&terms).unwrap();
        assert_eq!(out.result.periods.len(), 3);
        assert_eq!(out.warnings.len(), 1);
    }

    #[test]
    fn test_validation() {
        let mut terms = plan();
        terms.duration_months = 0;
        terms.monthly_contribution = dec!(-1);
        match project_investment(&terms).unwrap_err() {
            FinanceError::Validation(errors) => {
                assert_eq!(errors.len(), 2);
                assert!(errors.reason_for("duration_months").is_some());
                assert!(errors.reason_for("monthly_contribution").is_some());
            }
            other => panic!("expected validation error, got {other}"),
        }
    }

    #[test]
    fn test_extreme_growth_overflows_cleanly() {
        let mut terms = plan();
        terms.annual_rate_pct = dec!(100);
        terms.duration_months = 1200;
        let err = project_investment(&terms).unwrap_err();
        assert!(matches!(err, FinanceError::Overflow { .. }));
    }

    #[test]
    fn test_compounding_serialises_kebab_case() {
        let parsed: CompoundingFrequency = serde_json::from_str("\"quarterly\"").unwrap();
        assert_eq!(parsed, CompoundingFrequency::Quarterly);
        assert_eq!(parsed.periods_per_year(), 4);
    }
}

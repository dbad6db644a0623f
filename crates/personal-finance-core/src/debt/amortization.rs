//! Fixed-payment (French) loan amortisation.
//!
//! Every monetary step is rounded to cents. The last month absorbs whatever
//! residual the rounded payment leaves behind, and that residual is reported
//! on the schedule as `final_adjustment`.

use log::{debug, error};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::error::FinanceError;
use crate::rounding::{round_money, sum_money, ROUNDING_UNIT};
use crate::time_value::{annuity_future_value, annuity_payment};
use crate::types::{with_metadata, ComputationOutput, Money, Rate};
use crate::validation::ValidationErrors;
use crate::FinanceResult;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

pub const MAX_PRINCIPAL: Money = dec!(100_000_000);
pub const MAX_RATE_PCT: Decimal = dec!(100);
pub const MAX_TERM_MONTHS: u32 = 600;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Loan parameters. The rate is a nominal annual percentage (5 = 5%).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoanTerms {
    pub principal: Money,
    pub annual_rate_pct: Decimal,
    pub term_months: u32,
}

impl LoanTerms {
    /// Annual rate as a decimal fraction.
    pub fn annual_rate(&self) -> Rate {
        self.annual_rate_pct / dec!(100)
    }

    pub fn monthly_rate(&self) -> Rate {
        self.annual_rate() / dec!(12)
    }
}

/// One month of a schedule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduleEntry {
    /// 1-based month index.
    pub month: u32,
    /// Regular payment actually made this month (principal + interest).
    pub payment: Money,
    pub principal: Money,
    /// Prepayment applied on top of the regular payment.
    pub extra_principal: Money,
    pub interest: Money,
    pub remaining_balance: Money,
}

impl ScheduleEntry {
    /// Balance outstanding at the start of the month, before any payment.
    pub fn opening_balance(&self) -> Money {
        self.remaining_balance + self.principal + self.extra_principal
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Schedule {
    pub fixed_payment: Money,
    /// Regular plus extra principal.
    pub total_principal: Money,
    pub total_extra_principal: Money,
    pub total_interest: Money,
    pub total_paid: Money,
    /// Number of entries actually generated.
    pub term_months: u32,
    /// Residual absorbed by the final entry (positive when the last payment
    /// was larger than the fixed payment).
    pub final_adjustment: Money,
    pub entries: Vec<ScheduleEntry>,
}

impl Schedule {
    pub fn from_entries(fixed_payment: Money, final_adjustment: Money, entries: Vec<ScheduleEntry>) -> Self {
        let total_interest = sum_money(entries.iter().map(|e| e.interest));
        let total_extra_principal = sum_money(entries.iter().map(|e| e.extra_principal));
        let total_principal = sum_money(entries.iter().map(|e| e.principal + e.extra_principal));

        Schedule {
            fixed_payment,
            total_principal,
            total_extra_principal,
            total_interest,
            total_paid: round_money(total_principal + total_interest),
            term_months: entries.len() as u32,
            final_adjustment,
            entries,
        }
    }

    /// Balance outstanding at the start of `month`, before its regular payment.
    pub fn balance_before(&self, month: u32) -> Option<Money> {
        if month == 0 {
            return None;
        }
        self.entries
            .get((month - 1) as usize)
            .map(ScheduleEntry::opening_balance)
    }
}

/// Interest/principal split of one regular payment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentSplit {
    pub principal: Money,
    pub interest: Money,
}

// ---------------------------------------------------------------------------
// Formulas
// ---------------------------------------------------------------------------

/// Fixed monthly payment `P·r(1+r)^n / ((1+r)^n − 1)` with `r = annual_rate/12`,
/// rounded to cents. `annual_rate` is a decimal fraction (0.05 = 5%).
///
/// Zero rate divides the principal evenly; a non-positive principal or zero
/// term yields a zero payment.
pub fn fixed_payment(principal: Money, annual_rate: Rate, term_months: u32) -> FinanceResult<Money> {
    if principal <= Decimal::ZERO || term_months == 0 {
        return Ok(Decimal::ZERO);
    }
    let payment = annuity_payment(annual_rate / dec!(12), term_months, principal)?;
    Ok(round_money(payment))
}

/// Split a payment into interest on `balance` and the principal remainder.
pub fn split_payment(balance: Money, payment: Money, monthly_rate: Rate) -> PaymentSplit {
    let interest = round_money(balance * monthly_rate);
    let principal = round_money(payment - interest);
    PaymentSplit { principal, interest }
}

/// Raise `payment` so it repays at least one cent of principal on `balance`.
///
/// A small balance spread over a long term can round its payment down to the
/// month's interest (or to zero); such a payment would never amortise.
pub(crate) fn covering_payment(balance: Money, payment: Money, monthly_rate: Rate) -> Money {
    let floor = round_money(balance * monthly_rate) + ROUNDING_UNIT;
    if payment < floor {
        debug!("payment {payment} does not cover interest on {balance}; raised to {floor}");
        floor
    } else {
        payment
    }
}

/// Largest residual per-step cent rounding can leave after `months`: one cent
/// of drift per month, compounded at the monthly rate.
fn residual_tolerance(payment: Money, monthly_rate: Rate, months: u32) -> FinanceResult<Money> {
    let drift = annuity_future_value(monthly_rate, Decimal::from(months), ROUNDING_UNIT)?;
    Ok(payment.max(round_money(drift)))
}

/// Result of amortising a single month.
pub(crate) struct MonthOutcome {
    pub entry: ScheduleEntry,
    /// Residual absorbed when `is_final`; zero otherwise.
    pub adjustment: Money,
}

/// Pay one regular month against `balance`.
///
/// A payment that would overshoot the balance is cut down to a payoff. On the
/// final month of the term the principal portion becomes the whole balance;
/// a residual beyond what cent rounding can accumulate is an invariant
/// violation.
pub(crate) fn amortize_month(
    month: u32,
    balance: Money,
    payment: Money,
    monthly_rate: Rate,
    is_final: bool,
) -> FinanceResult<MonthOutcome> {
    let split = split_payment(balance, payment, monthly_rate);

    let (principal, adjustment) = if is_final {
        let residual = round_money(balance - split.principal);
        let tolerance = residual_tolerance(payment, monthly_rate, month)?;
        if residual.abs() > tolerance {
            error!(
                "month {month}: residual {residual} exceeds the rounding tolerance {tolerance}; schedule does not amortise"
            );
            return Err(FinanceError::InvariantViolation {
                context: "amortization schedule".into(),
                detail: format!(
                    "balance of {residual} left after the final month exceeds the rounding tolerance of {tolerance}"
                ),
            });
        }
        if !residual.is_zero() {
            debug!("month {month}: final entry absorbs rounding residual {residual}");
        }
        (balance, residual)
    } else {
        (split.principal.min(balance), Decimal::ZERO)
    };

    Ok(MonthOutcome {
        entry: ScheduleEntry {
            month,
            payment: round_money(principal + split.interest),
            principal,
            extra_principal: Decimal::ZERO,
            interest: split.interest,
            remaining_balance: round_money(balance - principal),
        },
        adjustment,
    })
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

/// Field-keyed checks on loan terms.
pub fn validate_loan_terms(terms: &LoanTerms) -> FinanceResult<()> {
    let mut errors = ValidationErrors::new();
    collect_loan_errors(terms, "", &mut errors);
    errors.into_result()
}

pub(crate) fn collect_loan_errors(terms: &LoanTerms, prefix: &str, errors: &mut ValidationErrors) {
    let principal = format!("{prefix}principal");
    errors.positive(&principal, "Loan amount", terms.principal);
    errors.at_most(&principal, "Loan amount", terms.principal, MAX_PRINCIPAL);

    let rate = format!("{prefix}annual_rate_pct");
    errors.non_negative(&rate, "Interest rate", terms.annual_rate_pct);
    errors.at_most(&rate, "Interest rate", terms.annual_rate_pct, MAX_RATE_PCT);

    errors.within(
        &format!("{prefix}term_months"),
        "Loan term",
        terms.term_months,
        1,
        MAX_TERM_MONTHS,
    );
}

// ---------------------------------------------------------------------------
// Schedule generation
// ---------------------------------------------------------------------------

/// Generate the full month-by-month schedule for `terms`.
pub fn generate_schedule(terms: &LoanTerms) -> FinanceResult<Schedule> {
    validate_loan_terms(terms)?;

    let monthly_rate = terms.monthly_rate();
    let payment = covering_payment(
        terms.principal,
        fixed_payment(terms.principal, terms.annual_rate(), terms.term_months)?,
        monthly_rate,
    );

    let mut entries = Vec::with_capacity(terms.term_months as usize);
    let mut balance = terms.principal;
    let mut final_adjustment = Decimal::ZERO;

    for month in 1..=terms.term_months {
        let outcome = amortize_month(
            month,
            balance,
            payment,
            monthly_rate,
            month == terms.term_months,
        )?;
        final_adjustment = outcome.adjustment;
        balance = outcome.entry.remaining_balance;
        entries.push(outcome.entry);

        if balance.is_zero() {
            break;
        }
    }

    Ok(Schedule::from_entries(payment, final_adjustment, entries))
}

/// Validated amortisation entry point with the standard envelope.
pub fn build_amortization_schedule(terms: &LoanTerms) -> FinanceResult<ComputationOutput<Schedule>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    let schedule = generate_schedule(terms)?;

    if schedule.term_months < terms.term_months {
        warnings.push(format!(
            "Loan paid off in {} months, before the {}-month term",
            schedule.term_months, terms.term_months
        ));
    }

    Ok(with_metadata(
        "Fixed-payment amortization (per-step half-up rounding)",
        &serde_json::json!({
            "principal": terms.principal.to_string(),
            "annual_rate_pct": terms.annual_rate_pct.to_string(),
            "term_months": terms.term_months,
        }),
        warnings,
        start,
        schedule,
    ))
}

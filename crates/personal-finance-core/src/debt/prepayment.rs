//! Extra principal payments replayed against an amortisation schedule.
//!
//! Interest depends on the running balance, so prepayments are folded over
//! in month order rather than adjusted in closed form. Two strategies:
//! `reduce-term` keeps the payment and shortens the loan, `reduce-payment`
//! keeps the term and re-amortises the balance after each prepayment.

use log::{debug, warn};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use super::amortization::{
    amortize_month, collect_loan_errors, covering_payment, fixed_payment, generate_schedule,
    LoanTerms, Schedule, ScheduleEntry,
};
use crate::rounding::{percent_of, round_money};
use crate::types::{with_metadata, ComputationOutput, Money, Rate};
use crate::validation::ValidationErrors;
use crate::FinanceResult;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PrepaymentStrategy {
    /// Keep the payment fixed and finish the loan early.
    ReduceTerm,
    /// Keep the term fixed and recompute the payment.
    ReducePayment,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prepayment {
    /// Month (1-based) in which the extra amount is paid, after the regular payment.
    pub month: u32,
    pub amount: Money,
    pub strategy: PrepaymentStrategy,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrepaymentInput {
    pub loan: LoanTerms,
    #[serde(default)]
    pub prepayments: Vec<Prepayment>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrepaymentResult {
    /// Schedule without any prepayment.
    pub base: Schedule,
    /// Schedule with the prepayments applied.
    pub adjusted: Schedule,
    /// Prepayments actually applied, with the amount actually applied.
    pub prepayments: Vec<Prepayment>,
    pub interest_savings: Money,
    pub interest_savings_pct: Rate,
    /// Months saved (`reduce-term` only).
    pub term_reduction: Option<u32>,
    /// Payment after the last recalculation (`reduce-payment` only).
    pub new_monthly_payment: Option<Money>,
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

/// Check every prepayment against the base schedule.
///
/// The month must fall inside the schedule and the amount must be positive
/// and no larger than the balance outstanding before that month's payment.
pub fn validate_prepayments(prepayments: &[Prepayment], base: &Schedule) -> FinanceResult<()> {
    let mut errors = ValidationErrors::new();
    collect_prepayment_errors(prepayments, base, &mut errors);
    errors.into_result()
}

fn collect_prepayment_errors(prepayments: &[Prepayment], base: &Schedule, errors: &mut ValidationErrors) {
    for (i, p) in prepayments.iter().enumerate() {
        let outstanding = base.balance_before(p.month);
        if outstanding.is_none() {
            errors.push(
                format!("prepayments[{i}].month"),
                format!(
                    "Prepayment month must be within the loan term (1-{})",
                    base.term_months
                ),
            );
        }

        if p.amount <= Decimal::ZERO {
            errors.push(
                format!("prepayments[{i}].amount"),
                "Prepayment amount must be positive",
            );
        } else if let Some(balance) = outstanding {
            if p.amount > balance {
                errors.push(
                    format!("prepayments[{i}].amount"),
                    format!("Prepayment amount cannot exceed the outstanding balance ({balance})"),
                );
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Replay
// ---------------------------------------------------------------------------

/// Running state of the month-by-month replay.
struct Replay<'a> {
    terms: &'a LoanTerms,
    strategy: PrepaymentStrategy,
    monthly_rate: Rate,
    payment: Money,
    balance: Money,
    entries: Vec<ScheduleEntry>,
    applied: Vec<Prepayment>,
    final_adjustment: Money,
    warnings: Vec<String>,
}

impl<'a> Replay<'a> {
    fn new(terms: &'a LoanTerms, strategy: PrepaymentStrategy, payment: Money) -> Self {
        Replay {
            terms,
            strategy,
            monthly_rate: terms.monthly_rate(),
            payment,
            balance: terms.principal,
            entries: Vec::with_capacity(terms.term_months as usize),
            applied: Vec::new(),
            final_adjustment: Decimal::ZERO,
            warnings: Vec::new(),
        }
    }

    fn next_month(&self) -> u32 {
        self.entries.len() as u32 + 1
    }

    fn is_paid_off(&self) -> bool {
        self.balance <= Decimal::ZERO
    }

    fn pay_regular_month(&mut self) -> FinanceResult<()> {
        let month = self.next_month();
        let outcome = amortize_month(
            month,
            self.balance,
            self.payment,
            self.monthly_rate,
            month == self.terms.term_months,
        )?;
        self.final_adjustment = outcome.adjustment;
        self.balance = outcome.entry.remaining_balance;
        self.entries.push(outcome.entry);
        Ok(())
    }

    /// Pay regular months up to and including `month`.
    fn advance_through(mut self, month: u32) -> FinanceResult<Self> {
        while !self.is_paid_off() && self.next_month() <= month {
            self.pay_regular_month()?;
        }
        Ok(self)
    }

    /// Fold step: reach the prepayment month, then pay the extra amount.
    fn apply(self, prepayment: &Prepayment) -> FinanceResult<Self> {
        let mut replay = self.advance_through(prepayment.month)?;

        if replay.is_paid_off() {
            let note = format!(
                "Prepayment of {} in month {} skipped: loan already paid off",
                prepayment.amount, prepayment.month
            );
            warn!("{note}");
            replay.warnings.push(note);
            return Ok(replay);
        }

        let extra = prepayment.amount.min(replay.balance);
        if extra < prepayment.amount {
            let note = format!(
                "Prepayment in month {} reduced from {} to the outstanding balance {}",
                prepayment.month, prepayment.amount, extra
            );
            warn!("{note}");
            replay.warnings.push(note);
        }

        replay.balance = round_money(replay.balance - extra);
        if let Some(entry) = replay.entries.last_mut() {
            entry.extra_principal = round_money(entry.extra_principal + extra);
            entry.remaining_balance = replay.balance;
        }
        replay.applied.push(Prepayment {
            amount: extra,
            ..prepayment.clone()
        });

        if replay.strategy == PrepaymentStrategy::ReducePayment && !replay.is_paid_off() {
            let remaining_months = replay.terms.term_months.saturating_sub(prepayment.month);
            if remaining_months > 0 {
                let recomputed = fixed_payment(
                    replay.balance,
                    replay.terms.annual_rate(),
                    remaining_months,
                )?;
                replay.payment = covering_payment(replay.balance, recomputed, replay.monthly_rate);
                if replay.payment > recomputed {
                    let note = format!(
                        "Balance of {} after month {} is too small to spread over {} months: payment raised to {}",
                        replay.balance, prepayment.month, remaining_months, replay.payment
                    );
                    warn!("{note}");
                    replay.warnings.push(note);
                }
                debug!(
                    "month {}: balance {} re-amortised over {} months at {}",
                    prepayment.month, replay.balance, remaining_months, replay.payment
                );
            }
        }

        Ok(replay)
    }

    /// Run the remaining regular months.
    fn finish(self) -> FinanceResult<Self> {
        let term = self.terms.term_months;
        self.advance_through(term)
    }
}

/// Replay `prepayments` (already sorted, single strategy) against the loan.
fn replay_prepayments<'a>(
    terms: &'a LoanTerms,
    strategy: PrepaymentStrategy,
    base_payment: Money,
    prepayments: &[Prepayment],
) -> FinanceResult<Replay<'a>> {
    prepayments
        .iter()
        .try_fold(Replay::new(terms, strategy, base_payment), |replay, p| {
            replay.apply(p)
        })?
        .finish()
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

/// Compare a loan with and without prepayments.
pub fn simulate_prepayments(
    input: &PrepaymentInput,
) -> FinanceResult<ComputationOutput<PrepaymentResult>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    let mut errors = ValidationErrors::new();
    collect_loan_errors(&input.loan, "loan.", &mut errors);
    errors.into_result()?;

    let base = generate_schedule(&input.loan)?;
    validate_prepayments(&input.prepayments, &base)?;

    let mut sorted = input.prepayments.clone();
    sorted.sort_by_key(|p| p.month);

    let result = match sorted.first() {
        None => PrepaymentResult {
            adjusted: base.clone(),
            base,
            prepayments: Vec::new(),
            interest_savings: Decimal::ZERO,
            interest_savings_pct: Decimal::ZERO,
            term_reduction: None,
            new_monthly_payment: None,
        },
        Some(first) => {
            let strategy = first.strategy;
            let to_apply = if sorted.iter().any(|p| p.strategy != strategy) {
                let note = format!(
                    "Mixed prepayment strategies: only the prepayment in month {} was applied, {} ignored",
                    first.month,
                    sorted.len() - 1
                );
                warn!("{note}");
                warnings.push(note);
                &sorted[..1]
            } else {
                &sorted[..]
            };

            let replay = replay_prepayments(&input.loan, strategy, base.fixed_payment, to_apply)?;
            warnings.extend(replay.warnings);

            let new_payment = replay.payment;
            let adjusted = Schedule::from_entries(new_payment, replay.final_adjustment, replay.entries);

            let interest_savings = round_money(base.total_interest - adjusted.total_interest);
            let interest_savings_pct = percent_of(interest_savings, base.total_interest);

            let (term_reduction, new_monthly_payment) = match strategy {
                PrepaymentStrategy::ReduceTerm => (
                    Some(base.term_months.saturating_sub(adjusted.term_months)),
                    None,
                ),
                PrepaymentStrategy::ReducePayment => (None, Some(new_payment)),
            };

            debug!(
                "{} prepayment(s) applied, interest savings {} ({}%)",
                replay.applied.len(),
                interest_savings,
                interest_savings_pct
            );

            PrepaymentResult {
                base,
                adjusted,
                prepayments: replay.applied,
                interest_savings,
                interest_savings_pct,
                term_reduction,
                new_monthly_payment,
            }
        }
    };

    Ok(with_metadata(
        "Sequential prepayment replay against fixed-payment amortization",
        &serde_json::json!({
            "principal": input.loan.principal.to_string(),
            "annual_rate_pct": input.loan.annual_rate_pct.to_string(),
            "term_months": input.loan.term_months,
            "prepayments": input.prepayments.len(),
        }),
        warnings,
        start,
        result,
    ))
}

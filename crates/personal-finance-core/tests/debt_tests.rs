use personal_finance_core::debt::amortization::{
    build_amortization_schedule, fixed_payment, generate_schedule, LoanTerms,
};
use personal_finance_core::debt::prepayment::{
    simulate_prepayments, Prepayment, PrepaymentInput, PrepaymentStrategy,
};
use personal_finance_core::rounding::sum_money;
use personal_finance_core::FinanceError;
use pretty_assertions::assert_eq;
use proptest::prelude::*;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

// ===========================================================================
// Amortization
// ===========================================================================

fn mortgage() -> LoanTerms {
    LoanTerms {
        principal: dec!(200_000),
        annual_rate_pct: dec!(5),
        term_months: 360,
    }
}

#[test]
fn test_reference_mortgage_schedule() {
    let out = build_amortization_schedule(&mortgage()).unwrap();
    let s = &out.result;

    assert_eq!(s.fixed_payment, dec!(1073.64));
    assert_eq!(s.entries.len(), 360);
    assert_eq!(s.total_principal, dec!(200_000));
    assert_eq!(s.total_paid, s.total_principal + s.total_interest);
    assert_eq!(s.entries.last().unwrap().remaining_balance, Decimal::ZERO);

    // Payment rounds down, so the last month pays a little more
    assert_eq!(s.final_adjustment, dec!(2.84));
    assert_eq!(
        s.entries.last().unwrap().payment,
        s.fixed_payment + s.final_adjustment
    );
    assert!(out.warnings.is_empty());
    assert_eq!(out.metadata.precision, "rust_decimal_128bit");
}

#[test]
fn test_short_loan_final_adjustment() {
    let s = generate_schedule(&LoanTerms {
        principal: dec!(10_000),
        annual_rate_pct: dec!(6),
        term_months: 12,
    })
    .unwrap();

    assert_eq!(s.fixed_payment, dec!(860.66));
    assert_eq!(s.final_adjustment, dec!(0.04));
    assert_eq!(sum_money(s.entries.iter().map(|e| e.principal)), dec!(10_000));
}

#[test]
fn test_schedule_balance_never_increases() {
    let s = generate_schedule(&LoanTerms {
        principal: dec!(300_000),
        annual_rate_pct: dec!(12),
        term_months: 240,
    })
    .unwrap();

    for pair in s.entries.windows(2) {
        assert!(pair[1].remaining_balance <= pair[0].remaining_balance);
    }
    // Payment rounds up here, so the last month pays less
    assert_eq!(s.final_adjustment, dec!(-1.40));
    assert_eq!(s.entries.last().unwrap().remaining_balance, Decimal::ZERO);
}

#[test]
fn test_tiny_principal_over_long_term_pays_off_early() {
    let out = build_amortization_schedule(&LoanTerms {
        principal: dec!(2.50),
        annual_rate_pct: Decimal::ZERO,
        term_months: 600,
    })
    .unwrap();

    assert_eq!(out.result.fixed_payment, dec!(0.01));
    assert_eq!(out.result.term_months, 250);
    assert!(out.warnings.iter().any(|w| w.contains("250 months")));
}

#[test]
fn test_usurious_rate_still_amortises() {
    let s = generate_schedule(&LoanTerms {
        principal: dec!(100_000),
        annual_rate_pct: dec!(100),
        term_months: 600,
    })
    .unwrap();
    assert!(s.fixed_payment > s.entries[0].interest);
    assert_eq!(s.total_principal, dec!(100_000));
}

#[test]
fn test_fixed_payment_degenerate_inputs() {
    assert_eq!(fixed_payment(Decimal::ZERO, dec!(0.05), 12).unwrap(), Decimal::ZERO);
    assert_eq!(fixed_payment(dec!(1200), dec!(0.05), 0).unwrap(), Decimal::ZERO);
    assert_eq!(fixed_payment(dec!(1200), Decimal::ZERO, 12).unwrap(), dec!(100));
}

// ===========================================================================
// Prepayments
// ===========================================================================

fn prepay(month: u32, amount: Decimal, strategy: PrepaymentStrategy) -> Prepayment {
    Prepayment {
        month,
        amount,
        strategy,
    }
}

#[test]
fn test_reduce_term_against_reference_mortgage() {
    let input = PrepaymentInput {
        loan: mortgage(),
        prepayments: vec![prepay(12, dec!(20_000), PrepaymentStrategy::ReduceTerm)],
    };
    let r = simulate_prepayments(&input).unwrap().result;

    assert_eq!(r.adjusted.fixed_payment, r.base.fixed_payment);
    assert!(r.adjusted.term_months < 360);
    assert_eq!(r.term_reduction, Some(360 - r.adjusted.term_months));
    assert_eq!(r.new_monthly_payment, None);
    assert!(r.interest_savings > Decimal::ZERO);
    assert_eq!(r.adjusted.total_principal, dec!(200_000));
    assert_eq!(r.adjusted.total_extra_principal, dec!(20_000));
    assert_eq!(r.adjusted.entries[11].extra_principal, dec!(20_000));
}

#[test]
fn test_reduce_payment_against_reference_mortgage() {
    let input = PrepaymentInput {
        loan: mortgage(),
        prepayments: vec![prepay(60, dec!(30_000), PrepaymentStrategy::ReducePayment)],
    };
    let r = simulate_prepayments(&input).unwrap().result;

    assert_eq!(r.adjusted.term_months, 360);
    assert_eq!(r.term_reduction, None);
    let new_payment = r.new_monthly_payment.unwrap();
    assert!(new_payment < r.base.fixed_payment);
    assert_eq!(r.adjusted.entries[59].payment, r.base.fixed_payment);
    assert_eq!(r.adjusted.entries[60].payment, new_payment);
    assert_eq!(r.adjusted.entries.last().unwrap().remaining_balance, Decimal::ZERO);
}

#[test]
fn test_prepayments_validated_against_base_schedule() {
    let input = PrepaymentInput {
        loan: mortgage(),
        prepayments: vec![
            prepay(361, dec!(1_000), PrepaymentStrategy::ReduceTerm),
            prepay(1, dec!(250_000), PrepaymentStrategy::ReduceTerm),
        ],
    };
    match simulate_prepayments(&input).unwrap_err() {
        FinanceError::Validation(errors) => {
            assert!(errors.reason_for("prepayments[0].month").is_some());
            assert!(errors.reason_for("prepayments[1].amount").is_some());
        }
        other => panic!("expected validation error, got {other}"),
    }
}

#[test]
fn test_prepayment_input_from_json() {
    let input: PrepaymentInput = serde_json::from_str(
        r#"{
            "loan": { "principal": "50000", "annual_rate_pct": "8", "term_months": 60 },
            "prepayments": [ { "month": 6, "amount": "5000", "strategy": "reduce-term" } ]
        }"#,
    )
    .unwrap();
    let out = simulate_prepayments(&input).unwrap();
    assert_eq!(out.result.prepayments.len(), 1);
    assert!(out.result.term_reduction.unwrap() > 0);
}

// ===========================================================================
// Properties
// ===========================================================================

fn loan(principal: u32, rate_bp: u32, term: u32) -> LoanTerms {
    LoanTerms {
        principal: Decimal::from(principal),
        annual_rate_pct: Decimal::new(rate_bp as i64, 2),
        term_months: term,
    }
}

proptest! {
    #![proptest_config(proptest::test_runner::Config::with_cases(32))]

    #[test]
    fn prop_schedule_amortises_exactly(
        principal in 1_000u32..2_000_000,
        rate_bp in 1u32..3_000,
        term in 1u32..=360,
    ) {
        let s = generate_schedule(&loan(principal, rate_bp, term)).unwrap();
        let last = s.entries.last().unwrap();

        prop_assert_eq!(last.remaining_balance, Decimal::ZERO);
        prop_assert_eq!(
            sum_money(s.entries.iter().map(|e| e.principal)),
            Decimal::from(principal)
        );
        prop_assert_eq!(s.total_paid, s.total_principal + s.total_interest);
        for pair in s.entries.windows(2) {
            prop_assert!(pair[1].remaining_balance <= pair[0].remaining_balance);
        }
    }

    #[test]
    fn prop_base_schedule_is_reproducible(
        principal in 1_000u32..500_000,
        rate_bp in 0u32..2_500,
        term in 12u32..=240,
    ) {
        let terms = loan(principal, rate_bp, term);
        let r = simulate_prepayments(&PrepaymentInput {
            loan: terms.clone(),
            prepayments: Vec::new(),
        })
        .unwrap()
        .result;
        prop_assert_eq!(r.base, generate_schedule(&terms).unwrap());
    }

    #[test]
    fn prop_reduce_term_shortens_schedule(
        principal in 10_000u32..1_000_000,
        rate_bp in 100u32..3_000,
        term in 24u32..=360,
        month_frac in 1u32..=50,
    ) {
        let terms = loan(principal, rate_bp, term);
        let base = generate_schedule(&terms).unwrap();
        let month = (term * month_frac / 100).max(1);
        let amount = (base.balance_before(month).unwrap() / Decimal::from(5)).round_dp(2);

        let r = simulate_prepayments(&PrepaymentInput {
            loan: terms,
            prepayments: vec![prepay(month, amount, PrepaymentStrategy::ReduceTerm)],
        })
        .unwrap()
        .result;

        prop_assert!(r.adjusted.term_months < r.base.term_months);
        prop_assert_eq!(r.adjusted.fixed_payment, r.base.fixed_payment);
        prop_assert!(r.interest_savings > Decimal::ZERO);
    }

    #[test]
    fn prop_reduce_payment_keeps_term_and_lowers_payment(
        principal in 10_000u32..1_000_000,
        rate_bp in 100u32..1_500,
        term in 24u32..=360,
        month_frac in 1u32..=50,
    ) {
        let terms = loan(principal, rate_bp, term);
        let base = generate_schedule(&terms).unwrap();
        let month = (term * month_frac / 100).max(1);
        let amount = (base.balance_before(month).unwrap() / Decimal::from(5)).round_dp(2);

        let r = simulate_prepayments(&PrepaymentInput {
            loan: terms,
            prepayments: vec![prepay(month, amount, PrepaymentStrategy::ReducePayment)],
        })
        .unwrap()
        .result;

        prop_assert_eq!(r.adjusted.term_months, r.base.term_months);
        for entry in r.adjusted.entries.iter().filter(|e| e.month > month) {
            prop_assert!(entry.payment < r.base.fixed_payment);
        }
    }
}

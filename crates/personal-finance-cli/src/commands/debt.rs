use clap::Args;
use rust_decimal::Decimal;
use serde_json::Value;

use personal_finance_core::debt::amortization::{self, LoanTerms};
use personal_finance_core::debt::prepayment::{
    self, Prepayment, PrepaymentInput, PrepaymentStrategy,
};

use crate::input;

/// Arguments for a fixed-payment amortization schedule
#[derive(Args)]
pub struct AmortizeArgs {
    /// Path to JSON/YAML input file (overrides individual flags)
    #[arg(long)]
    pub input: Option<String>,

    /// Loan principal
    #[arg(long)]
    pub principal: Option<Decimal>,

    /// Nominal annual rate in percent (5 = 5%)
    #[arg(long)]
    pub rate: Option<Decimal>,

    /// Term in months
    #[arg(long)]
    pub term_months: Option<u32>,
}

/// Arguments for a prepayment simulation
#[derive(Args)]
pub struct PrepayArgs {
    /// Path to JSON/YAML input file (overrides individual flags)
    #[arg(long)]
    pub input: Option<String>,

    /// Loan principal
    #[arg(long)]
    pub principal: Option<Decimal>,

    /// Nominal annual rate in percent (5 = 5%)
    #[arg(long)]
    pub rate: Option<Decimal>,

    /// Term in months
    #[arg(long)]
    pub term_months: Option<u32>,

    /// Extra payment as MONTH:AMOUNT:STRATEGY, strategy `reduce-term` or
    /// `reduce-payment` (repeatable)
    #[arg(long = "prepayment", value_parser = parse_prepayment)]
    pub prepayments: Vec<Prepayment>,
}

fn loan_from_flags(
    principal: Option<Decimal>,
    rate: Option<Decimal>,
    term_months: Option<u32>,
) -> Result<LoanTerms, Box<dyn std::error::Error>> {
    Ok(LoanTerms {
        principal: principal.ok_or("--principal is required (or provide --input)")?,
        annual_rate_pct: rate.ok_or("--rate is required (or provide --input)")?,
        term_months: term_months.ok_or("--term-months is required (or provide --input)")?,
    })
}

/// Parse `MONTH:AMOUNT:STRATEGY`.
pub fn parse_prepayment(raw: &str) -> Result<Prepayment, String> {
    let parts: Vec<&str> = raw.split(':').collect();
    let [month, amount, strategy] = parts.as_slice() else {
        return Err(format!("expected MONTH:AMOUNT:STRATEGY, got '{raw}'"));
    };

    let month: u32 = month
        .trim()
        .parse()
        .map_err(|_| format!("invalid prepayment month '{month}'"))?;
    let amount: Decimal = amount
        .trim()
        .parse()
        .map_err(|_| format!("invalid prepayment amount '{amount}'"))?;
    let strategy = match strategy.trim() {
        "reduce-term" => PrepaymentStrategy::ReduceTerm,
        "reduce-payment" => PrepaymentStrategy::ReducePayment,
        other => {
            return Err(format!(
                "unknown strategy '{other}' (expected reduce-term or reduce-payment)"
            ))
        }
    };

    Ok(Prepayment {
        month,
        amount,
        strategy,
    })
}

pub fn run_amortize(args: AmortizeArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let terms: LoanTerms = if let Some(ref path) = args.input {
        input::file::read_input(path)?
    } else if let Some(data) = input::stdin::read_stdin()? {
        data
    } else {
        loan_from_flags(args.principal, args.rate, args.term_months)?
    };

    let result = amortization::build_amortization_schedule(&terms)?;
    Ok(serde_json::to_value(result)?)
}

pub fn run_prepay(args: PrepayArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let prepay_input: PrepaymentInput = if let Some(ref path) = args.input {
        input::file::read_input(path)?
    } else if let Some(data) = input::stdin::read_stdin()? {
        data
    } else {
        PrepaymentInput {
            loan: loan_from_flags(args.principal, args.rate, args.term_months)?,
            prepayments: args.prepayments,
        }
    };

    let result = prepayment::simulate_prepayments(&prepay_input)?;
    Ok(serde_json::to_value(result)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_parse_prepayment() {
        let p = parse_prepayment("12:5000.50:reduce-term").unwrap();
        assert_eq!(p.month, 12);
        assert_eq!(p.amount, dec!(5000.50));
        assert_eq!(p.strategy, PrepaymentStrategy::ReduceTerm);

        let p = parse_prepayment("36:10000:reduce-payment").unwrap();
        assert_eq!(p.strategy, PrepaymentStrategy::ReducePayment);
    }

    #[test]
    fn test_parse_prepayment_rejects_malformed() {
        assert!(parse_prepayment("12:5000").is_err());
        assert!(parse_prepayment("x:5000:reduce-term").is_err());
        assert!(parse_prepayment("12:lots:reduce-term").is_err());
        assert!(parse_prepayment("12:5000:shorten").is_err());
    }

    #[test]
    fn test_flags_require_every_loan_field() {
        let err = loan_from_flags(Some(dec!(1000)), None, Some(12)).unwrap_err();
        assert!(err.to_string().contains("--rate"));
    }
}

use clap::{Args, ValueEnum};
use rust_decimal::Decimal;
use serde_json::Value;

use personal_finance_core::investment::projection::{
    self, BreakdownGranularity, CompoundingFrequency, InvestmentTerms,
};

use crate::input;

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum CompoundingArg {
    Monthly,
    Quarterly,
    Annually,
}

impl From<CompoundingArg> for CompoundingFrequency {
    fn from(arg: CompoundingArg) -> Self {
        match arg {
            CompoundingArg::Monthly => CompoundingFrequency::Monthly,
            CompoundingArg::Quarterly => CompoundingFrequency::Quarterly,
            CompoundingArg::Annually => CompoundingFrequency::Annually,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum GranularityArg {
    Monthly,
    Yearly,
}

impl From<GranularityArg> for BreakdownGranularity {
    fn from(arg: GranularityArg) -> Self {
        match arg {
            GranularityArg::Monthly => BreakdownGranularity::Monthly,
            GranularityArg::Yearly => BreakdownGranularity::Yearly,
        }
    }
}

/// Arguments for an investment projection
#[derive(Args)]
pub struct InvestArgs {
    /// Path to JSON/YAML input file (overrides individual flags)
    #[arg(long)]
    pub input: Option<String>,

    /// Initial amount invested
    #[arg(long)]
    pub initial: Option<Decimal>,

    /// Monthly contribution
    #[arg(long, default_value = "0")]
    pub monthly: Decimal,

    /// Duration in months
    #[arg(long)]
    pub months: Option<u32>,

    /// Nominal annual rate in percent (7.5 = 7.5%)
    #[arg(long)]
    pub rate: Option<Decimal>,

    /// Compounding frequency
    #[arg(long, value_enum, default_value = "monthly")]
    pub compounding: CompoundingArg,

    /// Breakdown granularity
    #[arg(long, value_enum, default_value = "monthly")]
    pub granularity: GranularityArg,
}

pub fn run_invest(args: InvestArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let terms: InvestmentTerms = if let Some(ref path) = args.input {
        input::file::read_input(path)?
    } else if let Some(data) = input::stdin::read_stdin()? {
        data
    } else {
        InvestmentTerms {
            initial_amount: args
                .initial
                .ok_or("--initial is required (or provide --input)")?,
            monthly_contribution: args.monthly,
            duration_months: args
                .months
                .ok_or("--months is required (or provide --input)")?,
            annual_rate_pct: args.rate.ok_or("--rate is required (or provide --input)")?,
            compounding: args.compounding.into(),
            granularity: args.granularity.into(),
        }
    };

    let result = projection::project_investment(&terms)?;
    Ok(serde_json::to_value(result)?)
}

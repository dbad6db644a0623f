use clap::{Args, ValueEnum};
use log::{info, warn};
use rust_decimal::Decimal;
use serde_json::Value;

use personal_finance_core::taxes::tables::TaxTable;
use personal_finance_core::taxes::withholding::{self, SalaryPeriodicity, TaxInput};

use crate::input;

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum PeriodicityArg {
    Monthly,
    Annual,
}

impl From<PeriodicityArg> for SalaryPeriodicity {
    fn from(arg: PeriodicityArg) -> Self {
        match arg {
            PeriodicityArg::Monthly => SalaryPeriodicity::Monthly,
            PeriodicityArg::Annual => SalaryPeriodicity::Annual,
        }
    }
}

/// Arguments for a payroll withholding calculation
#[derive(Args)]
pub struct WithholdArgs {
    /// Path to JSON/YAML input file (overrides individual flags)
    #[arg(long)]
    pub input: Option<String>,

    /// Base salary, transport allowance excluded
    #[arg(long)]
    pub salary: Option<Decimal>,

    /// Whether --salary is a monthly or an annual amount
    #[arg(long, value_enum, default_value = "monthly")]
    pub periodicity: PeriodicityArg,

    /// Number of dependents
    #[arg(long, default_value_t = 0)]
    pub dependents: u32,

    /// Monthly prepaid-health premium
    #[arg(long, default_value = "0")]
    pub prepaid_health: Decimal,

    /// Monthly voluntary pension contribution
    #[arg(long, default_value = "0")]
    pub voluntary_pension: Decimal,

    /// Fiscal-year table (JSON/YAML); defaults to the built-in 2026 table
    #[arg(long)]
    pub table: Option<String>,
}

/// Arguments for printing the active tax table
#[derive(Args)]
pub struct TaxTableArgs {
    /// Fiscal-year table (JSON/YAML); defaults to the built-in 2026 table
    #[arg(long)]
    pub table: Option<String>,
}

/// Load and validate a table file, or fall back to the built-in table.
fn load_table(path: Option<&str>) -> Result<TaxTable, Box<dyn std::error::Error>> {
    let table = match path {
        Some(p) => {
            info!("loading tax table from {p}");
            input::file::read_input::<TaxTable>(p)?
        }
        None => TaxTable::colombia_2026(),
    };
    table.validate()?;
    for note in table.accumulated_tax_warnings() {
        warn!("{note}");
    }
    Ok(table)
}

pub fn run_withhold(args: WithholdArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let table = load_table(args.table.as_deref())?;

    let tax_input: TaxInput = if let Some(ref path) = args.input {
        input::file::read_input(path)?
    } else if let Some(data) = input::stdin::read_stdin()? {
        data
    } else {
        TaxInput {
            salary: args
                .salary
                .ok_or("--salary is required (or provide --input)")?,
            periodicity: args.periodicity.into(),
            dependents: args.dependents,
            prepaid_health: args.prepaid_health,
            voluntary_pension: args.voluntary_pension,
        }
    };

    let result = withholding::calculate_withholding(&tax_input, &table)?;
    Ok(serde_json::to_value(result)?)
}

pub fn run_tax_table(args: TaxTableArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let table = load_table(args.table.as_deref())?;
    Ok(serde_json::to_value(table)?)
}

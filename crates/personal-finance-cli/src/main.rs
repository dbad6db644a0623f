mod commands;
mod input;
mod output;

use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use colored::Colorize;
use std::process;

use commands::debt::{AmortizeArgs, PrepayArgs};
use commands::investment::InvestArgs;
use commands::taxes::{TaxTableArgs, WithholdArgs};

/// Personal finance calculations with decimal precision
#[derive(Parser)]
#[command(
    name = "pfe",
    version,
    about = "Personal finance calculations with decimal precision",
    long_about = "A CLI for loan amortization, prepayment simulation, investment growth \
                  projection and payroll withholding. Every monetary step is computed \
                  in decimal and rounded to cents."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format
    #[arg(long, default_value = "json", global = true)]
    output: OutputFormat,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Fixed-payment loan amortization schedule
    Amortize(AmortizeArgs),
    /// Simulate extra principal payments against a loan
    Prepay(PrepayArgs),
    /// Project compound growth of an investment with monthly contributions
    Invest(InvestArgs),
    /// Payroll deductions and income-tax withholding for a salary
    Withhold(WithholdArgs),
    /// Print the active fiscal-year tax table
    TaxTable(TaxTableArgs),
    /// Print version information
    Version,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    Json,
    Yaml,
    Table,
    Csv,
    Minimal,
}

fn init_logging(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .format_timestamp(None)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result: Result<serde_json::Value, Box<dyn std::error::Error>> = match cli.command {
        Commands::Amortize(args) => commands::debt::run_amortize(args),
        Commands::Prepay(args) => commands::debt::run_prepay(args),
        Commands::Invest(args) => commands::investment::run_invest(args),
        Commands::Withhold(args) => commands::taxes::run_withhold(args),
        Commands::TaxTable(args) => commands::taxes::run_tax_table(args),
        Commands::Version => {
            println!("pfe {}", env!("CARGO_PKG_VERSION"));
            return;
        }
    };

    match result {
        Ok(value) => {
            output::format_output(&cli.output, &value);
            process::exit(0);
        }
        Err(e) => {
            eprintln!("{}: {}", "error".red().bold(), e);
            process::exit(1);
        }
    }
}

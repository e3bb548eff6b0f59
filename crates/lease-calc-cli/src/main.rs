mod commands;
mod input;
mod logging;
mod output;

use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use colored::Colorize;
use std::process;

use commands::acceptance::AcceptanceArgs;
use commands::schedule::LoanArgs;

/// Lease and loan amortization calculator
#[derive(Parser)]
#[command(
    name = "lcalc",
    version,
    about = "Lease and loan amortization schedules, cash flows and comprehensive rates",
    long_about = "A CLI for generating lease/loan repayment schedules and lender cash-flow \
                  tables with decimal precision. Supports equal installment (in arrears or \
                  in advance), equal principal and interest-only repayment, upfront fees, \
                  brokerage and deposits, IRR-based comprehensive rates, and bank \
                  acceptance bill discounting."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format
    #[arg(long, default_value = "json", global = true)]
    output: OutputFormat,

    /// Solver configuration file (YAML or JSON)
    #[arg(long, global = true)]
    config: Option<String>,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a repayment schedule
    Schedule(LoanArgs),
    /// Generate the schedule, cash-flow table and comprehensive rate
    CashFlow(LoanArgs),
    /// Comprehensive (IRR) rate of a lease including fees and deposits
    Rate(LoanArgs),
    /// Discount a bank acceptance bill
    Acceptance(AcceptanceArgs),
    /// Print version information
    Version,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Csv,
    Minimal,
}

fn main() {
    let cli = Cli::parse();
    logging::init_tracing(cli.verbose);

    let result: Result<serde_json::Value, Box<dyn std::error::Error>> =
        input::config::load_solver_config(cli.config.as_deref()).and_then(|solver| {
            match cli.command {
                Commands::Schedule(args) => commands::schedule::run_schedule(args),
                Commands::CashFlow(args) => commands::schedule::run_cash_flow(args, &solver),
                Commands::Rate(args) => commands::schedule::run_rate(args, &solver),
                Commands::Acceptance(args) => commands::acceptance::run_acceptance(args, &solver),
                Commands::Version => Ok(serde_json::json!({
                    "name": "lcalc",
                    "version": env!("CARGO_PKG_VERSION"),
                })),
            }
        });

    match result {
        Ok(value) => {
            output::format_output(&cli.output, &value);
            process::exit(0);
        }
        Err(e) => {
            tracing::debug!(error = %e, "command failed");
            eprintln!("{}: {}", "error".red().bold(), e);
            process::exit(1);
        }
    }
}

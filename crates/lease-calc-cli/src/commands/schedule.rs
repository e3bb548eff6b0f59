use chrono::NaiveDate;
use clap::{Args, ValueEnum};
use rust_decimal::Decimal;
use serde_json::Value;

use lease_calc_core::amortization::cash_flow;
use lease_calc_core::amortization::schedule::{self, LoanParameters, RepaymentMethod};
use lease_calc_core::rounding::RoundingPolicy;
use lease_calc_core::time_value::SolverConfig;
use lease_calc_core::types::with_metadata;

use crate::input;

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum MethodArg {
    /// Level payment at period end
    EqualInstallment,
    /// Level rent at period start
    InAdvance,
    /// Constant principal per period
    EqualPrincipal,
    /// Interest only, bullet principal
    InterestOnly,
}

impl From<MethodArg> for RepaymentMethod {
    fn from(m: MethodArg) -> Self {
        match m {
            MethodArg::EqualInstallment => RepaymentMethod::EqualInstallment,
            MethodArg::InAdvance => RepaymentMethod::EqualInstallmentInAdvance,
            MethodArg::EqualPrincipal => RepaymentMethod::EqualPrincipal,
            MethodArg::InterestOnly => RepaymentMethod::InterestOnly,
        }
    }
}

/// Loan / lease parameters shared by schedule, cash-flow and rate
#[derive(Args)]
pub struct LoanArgs {
    /// Path to JSON input file (overrides individual flags)
    #[arg(long)]
    pub input: Option<String>,

    /// Amount financed
    #[arg(long)]
    pub principal: Option<Decimal>,

    /// Nominal annual rate (e.g. 0.045 for 4.5%)
    #[arg(long)]
    pub annual_rate: Option<Decimal>,

    /// Number of repayment periods
    #[arg(long)]
    pub periods: Option<u32>,

    /// Months between payments
    #[arg(long, default_value_t = 1)]
    pub interval_months: u32,

    /// Repayment method
    #[arg(long, value_enum, default_value = "equal-installment")]
    pub method: MethodArg,

    /// Disbursement date (YYYY-MM-DD)
    #[arg(long)]
    pub start_date: Option<NaiveDate>,

    /// Upfront fee as a fraction of principal
    #[arg(long)]
    pub fee_rate: Option<Decimal>,

    /// Brokerage paid out as a fraction of principal
    #[arg(long)]
    pub brokerage_rate: Option<Decimal>,

    /// Refundable deposit as a fraction of principal
    #[arg(long)]
    pub deposit_rate: Option<Decimal>,

    /// Decimal places for rounding per-period amounts
    #[arg(long, default_value_t = 2)]
    pub decimal_places: u32,
}

impl LoanArgs {
    fn into_parameters(self) -> Result<LoanParameters, Box<dyn std::error::Error>> {
        let path = self.input.clone();
        input::from_file_stdin_or(path.as_deref(), move || {
            let principal = self
                .principal
                .ok_or("--principal is required (or provide --input)")?;
            let annual_rate = self
                .annual_rate
                .ok_or("--annual-rate is required (or provide --input)")?;
            let total_periods = self
                .periods
                .ok_or("--periods is required (or provide --input)")?;
            let disbursement_date = self
                .start_date
                .ok_or("--start-date is required (or provide --input)")?;

            Ok(LoanParameters {
                principal,
                annual_rate,
                total_periods,
                method: self.method.into(),
                payment_interval_months: self.interval_months,
                disbursement_date,
                fee_rate: self.fee_rate,
                brokerage_rate: self.brokerage_rate,
                deposit_rate: self.deposit_rate,
                rounding: RoundingPolicy {
                    decimal_places: self.decimal_places,
                    ..RoundingPolicy::default()
                },
            })
        })
    }
}

pub fn run_schedule(args: LoanArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let params = args.into_parameters()?;
    let result = schedule::build_schedule(&params)?;
    Ok(serde_json::to_value(result)?)
}

pub fn run_cash_flow(
    args: LoanArgs,
    solver: &SolverConfig,
) -> Result<Value, Box<dyn std::error::Error>> {
    let params = args.into_parameters()?;
    let result = cash_flow::build_cash_flow_report(&params, solver)?;
    Ok(serde_json::to_value(result)?)
}

pub fn run_rate(args: LoanArgs, solver: &SolverConfig) -> Result<Value, Box<dyn std::error::Error>> {
    let params = args.into_parameters()?;
    let report = cash_flow::build_cash_flow_report(&params, solver)?;
    let summary = with_metadata(
        &report.methodology,
        &report.assumptions,
        report.warnings.clone(),
        report.metadata.computation_time_us,
        report.result.comprehensive_rate,
    );
    Ok(serde_json::to_value(summary)?)
}

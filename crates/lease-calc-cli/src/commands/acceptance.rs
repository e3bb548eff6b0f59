use chrono::NaiveDate;
use clap::{Args, ValueEnum};
use rust_decimal::Decimal;
use serde_json::Value;

use lease_calc_core::calendar::DayCountConvention;
use lease_calc_core::rounding::RoundingPolicy;
use lease_calc_core::time_value::SolverConfig;
use lease_calc_core::trade_finance::bank_acceptance::{self, BankAcceptanceInput};

use crate::input;

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum DayCountArg {
    Act360,
    Act365,
}

impl From<DayCountArg> for DayCountConvention {
    fn from(d: DayCountArg) -> Self {
        match d {
            DayCountArg::Act360 => DayCountConvention::Actual360,
            DayCountArg::Act365 => DayCountConvention::Actual365,
        }
    }
}

/// Arguments for bank acceptance bill discounting
#[derive(Args)]
pub struct AcceptanceArgs {
    /// Path to JSON input file (overrides individual flags)
    #[arg(long)]
    pub input: Option<String>,

    /// Face value payable at maturity
    #[arg(long)]
    pub face_value: Option<Decimal>,

    /// Annual discount rate (e.g. 0.03 for 3%)
    #[arg(long)]
    pub discount_rate: Option<Decimal>,

    /// Issue / discount date (YYYY-MM-DD)
    #[arg(long)]
    pub issue_date: Option<NaiveDate>,

    /// Tenor in days
    #[arg(long)]
    pub tenor_days: Option<u32>,

    /// Maturity date (YYYY-MM-DD), alternative to --tenor-days
    #[arg(long)]
    pub maturity_date: Option<NaiveDate>,

    /// Day-count basis
    #[arg(long, value_enum, default_value = "act360")]
    pub day_count: DayCountArg,

    /// Extra days added to the discount period
    #[arg(long)]
    pub adjustment_days: Option<u32>,

    /// Acceptance commission as a fraction of face value
    #[arg(long)]
    pub acceptance_fee_rate: Option<Decimal>,

    /// Margin deposit as a fraction of face value
    #[arg(long)]
    pub deposit_ratio: Option<Decimal>,
}

pub fn run_acceptance(
    args: AcceptanceArgs,
    solver: &SolverConfig,
) -> Result<Value, Box<dyn std::error::Error>> {
    let path = args.input.clone();
    let bill: BankAcceptanceInput = input::from_file_stdin_or(path.as_deref(), move || {
        let face_value = args
            .face_value
            .ok_or("--face-value is required (or provide --input)")?;
        let discount_rate = args
            .discount_rate
            .ok_or("--discount-rate is required (or provide --input)")?;
        let issue_date = args
            .issue_date
            .ok_or("--issue-date is required (or provide --input)")?;

        Ok(BankAcceptanceInput {
            face_value,
            discount_rate,
            issue_date,
            tenor_days: args.tenor_days,
            maturity_date: args.maturity_date,
            day_count: args.day_count.into(),
            adjustment_days: args.adjustment_days,
            acceptance_fee_rate: args.acceptance_fee_rate,
            deposit_ratio: args.deposit_ratio,
            rounding: RoundingPolicy::default(),
        })
    })?;

    let result = bank_acceptance::price_bank_acceptance(&bill, solver)?;
    Ok(serde_json::to_value(result)?)
}

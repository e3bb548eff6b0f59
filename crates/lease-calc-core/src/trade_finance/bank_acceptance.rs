//! Bank acceptance bill discounting.
//!
//! A single-period discounted instrument: the holder receives face value
//! less the discount fee at issuance and the bill pays face value at
//! maturity. The discount period is the tenor plus any adjustment days
//! (e.g. out-of-town collection), converted to a year fraction on an
//! ACT/360 or ACT/365 basis. The result is expressed through the same
//! schedule and cash-flow types as amortizing leases so both feed one
//! comprehensive-rate calculation.

use chrono::{Days, NaiveDate};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::amortization::cash_flow::{
    self, CashFlowRecord, ComprehensiveRateSummary, UpfrontCharges,
};
use crate::amortization::schedule::PeriodRecord;
use crate::calendar::{self, DayCountConvention};
use crate::error::LeaseCalcError;
use crate::rounding::RoundingPolicy;
use crate::time_value::SolverConfig;
use crate::types::{with_metadata, ComputationOutput, Money, Rate};
use crate::LeaseCalcResult;

// ---------------------------------------------------------------------------
// Input types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BankAcceptanceInput {
    /// Amount payable at maturity
    pub face_value: Money,
    /// Annual discount rate (decimal)
    pub discount_rate: Rate,
    pub issue_date: NaiveDate,
    /// Days from issue to maturity; derived from `maturity_date` when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tenor_days: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub maturity_date: Option<NaiveDate>,
    #[serde(default)]
    pub day_count: DayCountConvention,
    /// Extra days added to the discount period (default 0)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub adjustment_days: Option<u32>,
    /// Acceptance commission on face value, charged at issuance
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub acceptance_fee_rate: Option<Rate>,
    /// Margin deposit as a fraction of face value, released at maturity
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deposit_ratio: Option<Rate>,
    #[serde(default)]
    pub rounding: RoundingPolicy,
}

// ---------------------------------------------------------------------------
// Output types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BankAcceptanceOutput {
    pub tenor_days: u32,
    pub discount_days: u32,
    pub maturity_date: NaiveDate,
    pub day_count: DayCountConvention,
    pub discount_fee: Money,
    /// Face value less discount fee, paid out at issuance
    pub net_proceeds: Money,
    pub acceptance_fee: Money,
    pub deposit: Money,
    /// Discount fee over net proceeds, annualised on the day-count basis
    pub effective_yield: Rate,
    pub schedule: Vec<PeriodRecord>,
    pub cash_flows: Vec<CashFlowRecord>,
    pub comprehensive_rate: ComprehensiveRateSummary,
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Discount a bank acceptance bill and derive its cash flows.
pub fn compute_bank_acceptance_cash_flow(
    input: &BankAcceptanceInput,
) -> LeaseCalcResult<BankAcceptanceOutput> {
    compute_with_config(input, &SolverConfig::default())
}

/// As [`compute_bank_acceptance_cash_flow`] with an explicit solver configuration.
pub fn compute_with_config(
    input: &BankAcceptanceInput,
    config: &SolverConfig,
) -> LeaseCalcResult<BankAcceptanceOutput> {
    validate_input(input)?;

    let (tenor_days, maturity_date) = resolve_tenor(input)?;
    let discount_days = tenor_days
        .checked_add(input.adjustment_days.unwrap_or(0))
        .ok_or_else(|| LeaseCalcError::invalid("adjustment_days", "Discount days overflow"))?;

    let policy = input.rounding;
    let year_fraction = input.day_count.year_fraction_days(discount_days);
    let discount_fee = policy.apply(input.face_value * input.discount_rate * year_fraction);
    let net_proceeds = input.face_value - discount_fee;

    if net_proceeds <= Decimal::ZERO {
        return Err(LeaseCalcError::FinancialImpossibility(
            "Net proceeds are zero or negative -- discount exceeds face value".into(),
        ));
    }

    let charges = UpfrontCharges {
        fee: policy.apply(input.face_value * input.acceptance_fee_rate.unwrap_or(Decimal::ZERO)),
        brokerage: Decimal::ZERO,
        deposit: policy.apply(input.face_value * input.deposit_ratio.unwrap_or(Decimal::ZERO)),
    };

    let period = PeriodRecord {
        period: 1,
        start_date: input.issue_date,
        end_date: maturity_date,
        payment_date: maturity_date,
        payment_offset: 1,
        opening_balance: net_proceeds,
        interest: discount_fee,
        principal: net_proceeds,
        payment: input.face_value,
        closing_balance: Decimal::ZERO,
    };
    let schedule = vec![period];
    let cash_flows = cash_flow::assemble_cash_flow(&schedule, &charges)?;

    let periods_per_year = input.day_count.basis_days() / Decimal::from(discount_days);
    let exposure = net_proceeds - charges.fee - charges.deposit;
    let solver = widen_for_bill(config, input.face_value, exposure);
    let comprehensive_rate =
        cash_flow::compute_comprehensive_rate(&cash_flows, periods_per_year, &solver)?;

    Ok(BankAcceptanceOutput {
        tenor_days,
        discount_days,
        maturity_date,
        day_count: input.day_count,
        discount_fee,
        net_proceeds,
        acceptance_fee: charges.fee,
        deposit: charges.deposit,
        effective_yield: discount_fee / net_proceeds * periods_per_year,
        schedule,
        cash_flows,
        comprehensive_rate,
    })
}

/// [`compute_with_config`] wrapped in the standard output envelope.
pub fn price_bank_acceptance(
    input: &BankAcceptanceInput,
    config: &SolverConfig,
) -> LeaseCalcResult<ComputationOutput<BankAcceptanceOutput>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    let output = compute_with_config(input, config)?;

    if output.tenor_days > 365 {
        warnings.push(format!(
            "Tenor of {} days exceeds the usual one-year limit for acceptance bills",
            output.tenor_days
        ));
    }
    if output.deposit > Decimal::ZERO {
        warnings.push(format!(
            "Margin deposit of {} is held until maturity",
            output.deposit
        ));
    }

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        &format!(
            "Bank acceptance discounting, {} basis",
            input.day_count.label()
        ),
        &serde_json::json!({
            "face_value": input.face_value.to_string(),
            "discount_rate": input.discount_rate.to_string(),
            "day_count": input.day_count.label(),
            "adjustment_days": input.adjustment_days.unwrap_or(0),
        }),
        warnings,
        elapsed,
        output,
    ))
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn validate_input(input: &BankAcceptanceInput) -> LeaseCalcResult<()> {
    if input.face_value <= Decimal::ZERO {
        return Err(LeaseCalcError::invalid(
            "face_value",
            "Face value must be positive",
        ));
    }
    if input.discount_rate < Decimal::ZERO {
        return Err(LeaseCalcError::invalid(
            "discount_rate",
            "Discount rate cannot be negative",
        ));
    }
    if matches!(input.acceptance_fee_rate, Some(r) if r < Decimal::ZERO) {
        return Err(LeaseCalcError::invalid(
            "acceptance_fee_rate",
            "Acceptance fee rate cannot be negative",
        ));
    }
    if matches!(input.deposit_ratio, Some(r) if r < Decimal::ZERO || r > Decimal::ONE) {
        return Err(LeaseCalcError::invalid(
            "deposit_ratio",
            "Deposit ratio must be between 0 and 1",
        ));
    }
    Ok(())
}

/// The bill's periodic rate is below face / exposure − 1, so lift the upper
/// bound to face / exposure when a steep discount puts it past the bracket.
fn widen_for_bill(config: &SolverConfig, face_value: Money, exposure: Money) -> SolverConfig {
    if exposure <= Decimal::ZERO {
        return *config;
    }
    match face_value.checked_div(exposure) {
        Some(ceiling) if ceiling > config.upper_bound => SolverConfig {
            upper_bound: ceiling,
            ..*config
        },
        _ => *config,
    }
}

/// Tenor in days and maturity date from whichever of the two was given.
fn resolve_tenor(input: &BankAcceptanceInput) -> LeaseCalcResult<(u32, NaiveDate)> {
    let from_days = |days: u32| {
        input
            .issue_date
            .checked_add_days(Days::new(u64::from(days)))
            .ok_or_else(|| LeaseCalcError::DateError(format!("maturity {days} days after issue is out of range")))
    };

    let (tenor, maturity) = match (input.tenor_days, input.maturity_date) {
        (Some(days), Some(maturity)) => {
            let implied = calendar::days_between(input.issue_date, maturity)?;
            if implied != days {
                return Err(LeaseCalcError::invalid(
                    "maturity_date",
                    format!("Maturity implies {implied} days but tenor_days is {days}"),
                ));
            }
            (days, maturity)
        }
        (Some(days), None) => (days, from_days(days)?),
        (None, Some(maturity)) => (calendar::days_between(input.issue_date, maturity)?, maturity),
        (None, None) => {
            return Err(LeaseCalcError::invalid(
                "tenor_days",
                "Either tenor_days or maturity_date is required",
            ))
        }
    };

    if tenor == 0 {
        return Err(LeaseCalcError::invalid(
            "tenor_days",
            "Tenor must be at least one day",
        ));
    }
    Ok((tenor, maturity))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn bill() -> BankAcceptanceInput {
        BankAcceptanceInput {
            face_value: dec!(1000000),
            discount_rate: dec!(0.03),
            issue_date: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
            tenor_days: Some(180),
            maturity_date: None,
            day_count: DayCountConvention::Actual360,
            adjustment_days: None,
            acceptance_fee_rate: None,
            deposit_ratio: None,
            rounding: RoundingPolicy::default(),
        }
    }

    #[test]
    fn test_discount_fee_actual_360() {
        let out = compute_bank_acceptance_cash_flow(&bill()).unwrap();
        assert_eq!(out.discount_fee, dec!(15000));
        assert_eq!(out.net_proceeds, dec!(985000));
        assert_eq!(
            out.maturity_date,
            NaiveDate::from_ymd_opt(2024, 8, 28).unwrap()
        );
    }

    #[test]
    fn test_actual_365_basis() {
        let mut input = bill();
        input.day_count = DayCountConvention::Actual365;
        input.tenor_days = Some(73);
        let out = compute_bank_acceptance_cash_flow(&input).unwrap();
        // 1,000,000 × 0.03 × 73/365 = 6,000
        assert_eq!(out.discount_fee, dec!(6000));
    }

    #[test]
    fn test_adjustment_days_extend_discount() {
        let mut input = bill();
        input.adjustment_days = Some(3);
        let out = compute_bank_acceptance_cash_flow(&input).unwrap();
        assert_eq!(out.discount_days, 183);
        // 1,000,000 × 0.03 × 183/360 = 15,250
        assert_eq!(out.discount_fee, dec!(15250));
        assert_eq!(out.tenor_days, 180);
    }

    #[test]
    fn test_maturity_date_drives_tenor() {
        let mut input = bill();
        input.tenor_days = None;
        input.maturity_date = NaiveDate::from_ymd_opt(2024, 5, 30);
        let out = compute_bank_acceptance_cash_flow(&input).unwrap();
        assert_eq!(out.tenor_days, 90);
        assert_eq!(out.discount_fee, dec!(7500));
    }

    #[test]
    fn test_conflicting_tenor_rejected() {
        let mut input = bill();
        input.maturity_date = NaiveDate::from_ymd_opt(2024, 5, 30);
        assert!(compute_bank_acceptance_cash_flow(&input).is_err());

        let mut input = bill();
        input.tenor_days = None;
        assert!(compute_bank_acceptance_cash_flow(&input).is_err());
    }

    #[test]
    fn test_effective_yield_matches_comprehensive_rate() {
        let out = compute_bank_acceptance_cash_flow(&bill()).unwrap();
        // 15,000 / 985,000 × 2 ≈ 3.0457%
        assert!((out.effective_yield - dec!(0.030457)).abs() < dec!(0.000001));
        assert!(
            (out.comprehensive_rate.nominal_annual_rate - out.effective_yield).abs()
                < dec!(0.0000001)
        );
    }

    #[test]
    fn test_fee_and_deposit_flow_through() {
        let mut input = bill();
        input.acceptance_fee_rate = Some(dec!(0.0005));
        input.deposit_ratio = Some(dec!(0.30));
        let out = compute_bank_acceptance_cash_flow(&input).unwrap();
        assert_eq!(out.acceptance_fee, dec!(500));
        assert_eq!(out.deposit, dec!(300000));
        assert_eq!(out.cash_flows.len(), 2);
        assert_eq!(
            out.cash_flows[0].net_amount,
            dec!(-985000) + dec!(500) + dec!(300000)
        );
        assert_eq!(out.cash_flows[1].net_amount, dec!(1000000) - dec!(300000));
        // Fee and margin both raise the all-in rate above the plain yield
        assert!(out.comprehensive_rate.nominal_annual_rate > out.effective_yield);
    }

    #[test]
    fn test_discount_exceeding_face_is_impossible() {
        let mut input = bill();
        input.discount_rate = dec!(3);
        input.tenor_days = Some(120);
        let err = compute_bank_acceptance_cash_flow(&input).unwrap_err();
        assert!(matches!(err, LeaseCalcError::FinancialImpossibility(_)));
    }

    #[test]
    fn test_deposit_warning_in_envelope() {
        let mut input = bill();
        input.deposit_ratio = Some(dec!(0.5));
        let out = price_bank_acceptance(&input, &SolverConfig::default()).unwrap();
        assert!(out.warnings.iter().any(|w| w.contains("Margin deposit")));
        assert_eq!(out.methodology, "Bank acceptance discounting, ACT/360 basis");
    }
}

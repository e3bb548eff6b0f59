//! Lease / loan repayment schedules.
//!
//! Supports post-paid and pre-paid equal installments, equal principal, and
//! interest-only (bullet) repayment. Per-period amounts are rounded to the
//! parameters' [`RoundingPolicy`]; the final period repays the full opening
//! balance, so rounding residue lands in its principal and the schedule
//! always closes at exactly zero.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::{debug, warn};

use crate::amortization::cash_flow::FeeTerms;
use crate::calendar;
use crate::error::LeaseCalcError;
use crate::rounding::RoundingPolicy;
use crate::time_value::{self, PaymentTiming};
use crate::types::{with_metadata, ComputationOutput, Money, Rate};
use crate::LeaseCalcResult;

const MONTHS_PER_YEAR: Decimal = dec!(12);

/// Longest schedule accepted: 100 years of monthly periods.
pub const MAX_PERIODS: u32 = 1200;

// ---------------------------------------------------------------------------
// Input types
// ---------------------------------------------------------------------------

/// How principal is repaid across the term.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RepaymentMethod {
    /// Level payment at each period end (post-paid annuity).
    EqualInstallment,
    /// Level rent due at each period start (pre-paid annuity).
    EqualInstallmentInAdvance,
    /// Constant principal, interest on the declining balance.
    EqualPrincipal,
    /// Interest only, principal repaid with the final period.
    InterestOnly,
}

impl RepaymentMethod {
    pub fn timing(self) -> PaymentTiming {
        match self {
            RepaymentMethod::EqualInstallmentInAdvance => PaymentTiming::Advance,
            _ => PaymentTiming::Arrears,
        }
    }
}

/// Parameters for a single schedule run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoanParameters {
    /// Amount financed at disbursement
    pub principal: Money,
    /// Nominal annual rate (0.045 = 4.5%)
    pub annual_rate: Rate,
    /// Number of repayment periods
    pub total_periods: u32,
    pub method: RepaymentMethod,
    /// Months between payments (1 = monthly, 3 = quarterly, 6 = semi-annual)
    pub payment_interval_months: u32,
    pub disbursement_date: NaiveDate,
    /// Upfront fee charged to the lessee, fraction of principal
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fee_rate: Option<Rate>,
    /// Commission paid by the lender to an intermediary, fraction of principal
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub brokerage_rate: Option<Rate>,
    /// Refundable security deposit, fraction of principal
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deposit_rate: Option<Rate>,
    #[serde(default)]
    pub rounding: RoundingPolicy,
}

impl LoanParameters {
    /// Nominal annual rate scaled to one payment interval.
    pub fn per_period_rate(&self) -> Rate {
        self.annual_rate * Decimal::from(self.payment_interval_months) / MONTHS_PER_YEAR
    }

    /// Payment periods per year (may be fractional for odd intervals).
    pub fn periods_per_year(&self) -> Decimal {
        MONTHS_PER_YEAR / Decimal::from(self.payment_interval_months.max(1))
    }

    pub fn fee_terms(&self) -> FeeTerms {
        FeeTerms {
            fee_rate: self.fee_rate.unwrap_or(Decimal::ZERO),
            brokerage_rate: self.brokerage_rate.unwrap_or(Decimal::ZERO),
            deposit_rate: self.deposit_rate.unwrap_or(Decimal::ZERO),
            rounding: self.rounding,
        }
    }
}

// ---------------------------------------------------------------------------
// Output types
// ---------------------------------------------------------------------------

/// One row of the repayment schedule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeriodRecord {
    /// 1-based period index
    pub period: u32,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    /// Period end for arrears methods, period start for rent in advance
    pub payment_date: NaiveDate,
    /// Position of the payment on the period grid (0 = disbursement)
    pub payment_offset: u32,
    pub opening_balance: Money,
    pub interest: Money,
    pub principal: Money,
    pub payment: Money,
    pub closing_balance: Money,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduleOutput {
    pub method: RepaymentMethod,
    pub per_period_rate: Rate,
    /// Rounded level payment for installment methods
    #[serde(skip_serializing_if = "Option::is_none")]
    pub level_payment: Option<Money>,
    pub periods: Vec<PeriodRecord>,
    pub total_interest: Money,
    pub total_principal: Money,
    pub total_payments: Money,
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Reject parameters that violate the schedule invariants.
pub fn validate_parameters(params: &LoanParameters) -> LeaseCalcResult<()> {
    if params.principal <= Decimal::ZERO {
        return Err(LeaseCalcError::invalid(
            "principal",
            "Principal must be positive",
        ));
    }
    if params.annual_rate < Decimal::ZERO {
        return Err(LeaseCalcError::invalid(
            "annual_rate",
            "Annual rate cannot be negative",
        ));
    }
    if params.total_periods == 0 {
        return Err(LeaseCalcError::invalid(
            "total_periods",
            "Schedule needs at least one period",
        ));
    }
    if params.total_periods > MAX_PERIODS {
        return Err(LeaseCalcError::invalid(
            "total_periods",
            format!("At most {MAX_PERIODS} periods are supported"),
        ));
    }
    if params.payment_interval_months == 0 {
        return Err(LeaseCalcError::invalid(
            "payment_interval_months",
            "Payment interval must be at least one month",
        ));
    }
    if params.rounding.decimal_places > 10 {
        return Err(LeaseCalcError::invalid(
            "rounding.decimal_places",
            "At most 10 decimal places are supported",
        ));
    }
    params.fee_terms().validate()
}

/// Generate the period-by-period repayment schedule.
pub fn compute_schedule(params: &LoanParameters) -> LeaseCalcResult<ScheduleOutput> {
    validate_parameters(params)?;

    let policy = params.rounding;
    let n = params.total_periods;
    let rate = params.per_period_rate();
    let timing = params.method.timing();

    let level_payment = match params.method {
        RepaymentMethod::EqualInstallment | RepaymentMethod::EqualInstallmentInAdvance => Some(
            policy.apply(time_value::level_payment(params.principal, rate, n, timing)?),
        ),
        RepaymentMethod::EqualPrincipal | RepaymentMethod::InterestOnly => None,
    };
    let straight_principal = policy.apply(params.principal / Decimal::from(n));

    // Last date must exist before the grid is allocated.
    calendar::period_end(params.disbursement_date, params.payment_interval_months, n)?;
    let mut periods = Vec::with_capacity(n as usize);
    let mut balance = params.principal;
    let mut total_interest = Decimal::ZERO;
    let mut total_principal = Decimal::ZERO;

    for k in 1..=n {
        let start_date = calendar::period_end(params.disbursement_date, params.payment_interval_months, k - 1)?;
        let end_date = calendar::period_end(params.disbursement_date, params.payment_interval_months, k)?;
        let opening = balance;

        // Rent paid in advance on day one has not accrued anything yet.
        let interest = if timing == PaymentTiming::Advance && k == 1 {
            Decimal::ZERO
        } else {
            policy.apply(
                opening
                    .checked_mul(rate)
                    .ok_or_else(|| LeaseCalcError::overflow(format!("interest for period {k}")))?,
            )
        };

        let principal = if k == n {
            opening
        } else {
            let scheduled = match params.method {
                RepaymentMethod::EqualInstallment | RepaymentMethod::EqualInstallmentInAdvance => {
                    level_payment.unwrap_or(Decimal::ZERO) - interest
                }
                RepaymentMethod::EqualPrincipal => straight_principal,
                RepaymentMethod::InterestOnly => Decimal::ZERO,
            };
            scheduled.max(Decimal::ZERO).min(opening)
        };

        balance = opening - principal;
        let payment = interest
            .checked_add(principal)
            .ok_or_else(|| LeaseCalcError::overflow(format!("payment for period {k}")))?;
        total_interest = total_interest
            .checked_add(interest)
            .ok_or_else(|| LeaseCalcError::overflow("total interest"))?;
        total_principal += principal;

        let (payment_date, payment_offset) = match timing {
            PaymentTiming::Arrears => (end_date, k),
            PaymentTiming::Advance => (start_date, k - 1),
        };

        periods.push(PeriodRecord {
            period: k,
            start_date,
            end_date,
            payment_date,
            payment_offset,
            opening_balance: opening,
            interest,
            principal,
            payment,
            closing_balance: balance,
        });
    }

    debug!(
        periods = n,
        method = ?params.method,
        %rate,
        "repayment schedule generated"
    );

    Ok(ScheduleOutput {
        method: params.method,
        per_period_rate: rate,
        level_payment,
        periods,
        total_interest,
        total_principal,
        total_payments: total_interest + total_principal,
    })
}

/// [`compute_schedule`] wrapped in the standard output envelope.
pub fn build_schedule(
    params: &LoanParameters,
) -> LeaseCalcResult<ComputationOutput<ScheduleOutput>> {
    let start = Instant::now();
    let output = compute_schedule(params)?;
    let warnings = schedule_warnings(params, &output);
    for w in &warnings {
        warn!("{w}");
    }

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        methodology(params.method),
        &serde_json::json!({
            "principal": params.principal.to_string(),
            "annual_rate": params.annual_rate.to_string(),
            "per_period_rate": output.per_period_rate.to_string(),
            "total_periods": params.total_periods,
            "payment_interval_months": params.payment_interval_months,
            "decimal_places": params.rounding.decimal_places,
            "residue_policy": "final period principal absorbs rounding residue",
        }),
        warnings,
        elapsed,
        output,
    ))
}

pub(crate) fn methodology(method: RepaymentMethod) -> &'static str {
    match method {
        RepaymentMethod::EqualInstallment => "Equal installment (annuity in arrears)",
        RepaymentMethod::EqualInstallmentInAdvance => "Equal installment (annuity in advance)",
        RepaymentMethod::EqualPrincipal => "Equal principal, interest on declining balance",
        RepaymentMethod::InterestOnly => "Interest only with bullet principal",
    }
}

fn schedule_warnings(params: &LoanParameters, output: &ScheduleOutput) -> Vec<String> {
    let mut warnings = Vec::new();

    if params.annual_rate.is_zero() {
        warnings.push("Annual rate is zero; payments are principal only".into());
    }

    if let (Some(level), Some(last)) = (output.level_payment, output.periods.last()) {
        let residue = last.payment - level;
        if output.periods.len() > 1 && residue.abs() > params.rounding.unit() {
            warnings.push(format!(
                "Final payment {} differs from level payment {} by rounding residue {}",
                last.payment, level, residue
            ));
        }
    }

    warnings
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn base_params() -> LoanParameters {
        LoanParameters {
            principal: dec!(1200),
            annual_rate: dec!(0.12),
            total_periods: 12,
            method: RepaymentMethod::EqualInstallment,
            payment_interval_months: 1,
            disbursement_date: NaiveDate::from_ymd_opt(2024, 1, 15).unwrap(),
            fee_rate: None,
            brokerage_rate: None,
            deposit_rate: None,
            rounding: RoundingPolicy::default(),
        }
    }

    #[test]
    fn test_per_period_rate_scales_by_interval() {
        let mut p = base_params();
        assert_eq!(p.per_period_rate(), dec!(0.01));
        p.payment_interval_months = 3;
        assert_eq!(p.per_period_rate(), dec!(0.03));
        assert_eq!(p.periods_per_year(), dec!(4));
    }

    #[test]
    fn test_equal_installment_level_payment() {
        let sched = compute_schedule(&base_params()).unwrap();
        // 1200 at 1%/month over 12 months: 106.62
        assert_eq!(sched.level_payment, Some(dec!(106.62)));
        assert_eq!(sched.periods[0].interest, dec!(12.00));
        assert_eq!(sched.periods[0].principal, dec!(94.62));
        assert_eq!(sched.periods[0].closing_balance, dec!(1105.38));
        for p in &sched.periods[..11] {
            assert_eq!(p.payment, dec!(106.62));
        }
        assert_eq!(sched.periods[11].closing_balance, Decimal::ZERO);
    }

    #[test]
    fn test_equal_principal_schedule() {
        let mut p = base_params();
        p.method = RepaymentMethod::EqualPrincipal;
        let sched = compute_schedule(&p).unwrap();
        assert!(sched.level_payment.is_none());
        for rec in &sched.periods {
            assert_eq!(rec.principal, dec!(100));
        }
        // Interest declines 12, 11, 10, ...
        assert_eq!(sched.periods[0].interest, dec!(12.00));
        assert_eq!(sched.periods[1].interest, dec!(11.00));
        assert_eq!(sched.periods[11].interest, dec!(1.00));
        assert_eq!(sched.total_interest, dec!(78.00));
    }

    #[test]
    fn test_interest_only_bullet() {
        let mut p = base_params();
        p.method = RepaymentMethod::InterestOnly;
        p.total_periods = 4;
        let sched = compute_schedule(&p).unwrap();
        for rec in &sched.periods[..3] {
            assert_eq!(rec.principal, Decimal::ZERO);
            assert_eq!(rec.interest, dec!(12.00));
            assert_eq!(rec.closing_balance, dec!(1200));
        }
        assert_eq!(sched.periods[3].principal, dec!(1200));
        assert_eq!(sched.periods[3].payment, dec!(1212.00));
    }

    #[test]
    fn test_in_advance_first_rent_is_principal_only() {
        let mut p = base_params();
        p.method = RepaymentMethod::EqualInstallmentInAdvance;
        let sched = compute_schedule(&p).unwrap();
        let first = &sched.periods[0];
        assert_eq!(first.interest, Decimal::ZERO);
        assert_eq!(first.payment_offset, 0);
        assert_eq!(first.payment_date, p.disbursement_date);
        assert_eq!(Some(first.principal), sched.level_payment);
        // Level rent in advance is the arrears rent discounted one period
        assert_eq!(sched.level_payment, Some(dec!(105.56)));
        assert_eq!(sched.periods[11].closing_balance, Decimal::ZERO);
    }

    #[test]
    fn test_dates_follow_interval() {
        let mut p = base_params();
        p.payment_interval_months = 6;
        p.disbursement_date = NaiveDate::from_ymd_opt(2024, 8, 31).unwrap();
        p.total_periods = 3;
        let sched = compute_schedule(&p).unwrap();
        let ends: Vec<NaiveDate> = sched.periods.iter().map(|r| r.end_date).collect();
        assert_eq!(
            ends,
            vec![
                NaiveDate::from_ymd_opt(2025, 2, 28).unwrap(),
                NaiveDate::from_ymd_opt(2025, 8, 31).unwrap(),
                NaiveDate::from_ymd_opt(2026, 2, 28).unwrap(),
            ]
        );
        assert_eq!(sched.periods[1].start_date, ends[0]);
    }

    #[test]
    fn test_zero_rate_warning() {
        let mut p = base_params();
        p.annual_rate = Decimal::ZERO;
        let out = build_schedule(&p).unwrap();
        assert_eq!(out.result.level_payment, Some(dec!(100)));
        assert_eq!(out.result.total_interest, Decimal::ZERO);
        assert!(out.warnings.iter().any(|w| w.contains("zero")));
    }

    #[test]
    fn test_validation_errors() {
        let mut p = base_params();
        p.principal = Decimal::ZERO;
        assert!(compute_schedule(&p).is_err());

        let mut p = base_params();
        p.annual_rate = dec!(-0.01);
        assert!(compute_schedule(&p).is_err());

        let mut p = base_params();
        p.total_periods = 0;
        assert!(compute_schedule(&p).is_err());

        let mut p = base_params();
        p.payment_interval_months = 0;
        assert!(compute_schedule(&p).is_err());

        let mut p = base_params();
        p.fee_rate = Some(dec!(-0.01));
        assert!(compute_schedule(&p).is_err());
    }

    #[test]
    fn test_metadata_populated() {
        let out = build_schedule(&base_params()).unwrap();
        assert_eq!(out.methodology, "Equal installment (annuity in arrears)");
        assert_eq!(out.metadata.precision, "rust_decimal_128bit");
    }
}

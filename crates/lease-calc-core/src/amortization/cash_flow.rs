//! Lender-side cash-flow table and the comprehensive (IRR) rate.
//!
//! Sign convention: money leaving the lender is negative. Period 0 carries
//! the disbursement together with upfront charges; every later row carries
//! the scheduled principal and interest.

use chrono::NaiveDate;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, MathematicalOps};
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::debug;

use crate::amortization::schedule::{self, LoanParameters, PeriodRecord, ScheduleOutput};
use crate::error::LeaseCalcError;
use crate::rounding::RoundingPolicy;
use crate::time_value::{self, SolverConfig, SolverMethod};
use crate::types::{with_metadata, ComputationOutput, Money, Rate};
use crate::LeaseCalcResult;

// ---------------------------------------------------------------------------
// Input types
// ---------------------------------------------------------------------------

/// Charges expressed as fractions of the disbursed principal.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeeTerms {
    /// Upfront fee received from the lessee at disbursement
    pub fee_rate: Rate,
    /// Commission paid out to a broker at disbursement
    pub brokerage_rate: Rate,
    /// Security deposit received at disbursement, refunded with the last period
    pub deposit_rate: Rate,
    pub rounding: RoundingPolicy,
}

impl FeeTerms {
    pub fn validate(&self) -> LeaseCalcResult<()> {
        if self.fee_rate < Decimal::ZERO {
            return Err(LeaseCalcError::invalid("fee_rate", "Fee rate cannot be negative"));
        }
        if self.brokerage_rate < Decimal::ZERO {
            return Err(LeaseCalcError::invalid(
                "brokerage_rate",
                "Brokerage rate cannot be negative",
            ));
        }
        if self.deposit_rate < Decimal::ZERO || self.deposit_rate >= Decimal::ONE {
            return Err(LeaseCalcError::invalid(
                "deposit_rate",
                "Deposit rate must be >= 0 and < 1",
            ));
        }
        Ok(())
    }

    /// Resolve the rates into amounts on `principal`.
    pub fn charges_on(&self, principal: Money) -> UpfrontCharges {
        UpfrontCharges {
            fee: self.rounding.apply(principal * self.fee_rate),
            brokerage: self.rounding.apply(principal * self.brokerage_rate),
            deposit: self.rounding.apply(principal * self.deposit_rate),
        }
    }
}

/// Upfront charges as absolute amounts, all non-negative.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct UpfrontCharges {
    pub fee: Money,
    pub brokerage: Money,
    pub deposit: Money,
}

// ---------------------------------------------------------------------------
// Output types
// ---------------------------------------------------------------------------

/// One row of the cash-flow table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CashFlowRecord {
    /// 0 = disbursement, otherwise the schedule period
    pub period: u32,
    pub date: NaiveDate,
    /// Position on the period grid used for discounting
    pub time_offset: u32,
    pub principal: Money,
    pub interest: Money,
    pub fee: Money,
    pub brokerage: Money,
    pub deposit: Money,
    pub net_amount: Money,
    pub cumulative: Money,
}

/// IRR of a complete cash-flow table, periodic and annualised.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ComprehensiveRateSummary {
    pub periodic_rate: Rate,
    /// periodic × periods per year
    pub nominal_annual_rate: Rate,
    /// (1 + periodic)^(periods per year) − 1
    pub effective_annual_rate: Rate,
    pub iterations: u32,
    pub solver: SolverMethod,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CashFlowTotals {
    pub disbursed: Money,
    pub total_principal: Money,
    pub total_interest: Money,
    /// Fee income net of brokerage
    pub total_fees: Money,
    pub net_cash_flow: Money,
    /// Σ net − (interest + net fees); zero when the table conserves value
    pub conservation_residual: Money,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CashFlowReport {
    pub schedule: ScheduleOutput,
    pub cash_flows: Vec<CashFlowRecord>,
    pub totals: CashFlowTotals,
    pub comprehensive_rate: ComprehensiveRateSummary,
}

// ---------------------------------------------------------------------------
// Cash-flow table
// ---------------------------------------------------------------------------

/// Build the cash-flow table for a schedule, charging `fees` on the
/// principal disbursed (the first period's opening balance).
pub fn compute_cash_flow(
    schedule: &[PeriodRecord],
    fees: &FeeTerms,
) -> LeaseCalcResult<Vec<CashFlowRecord>> {
    fees.validate()?;
    let first = schedule.first().ok_or_else(|| {
        LeaseCalcError::InsufficientData("Cash flow requires a non-empty schedule".into())
    })?;
    assemble_cash_flow(schedule, &fees.charges_on(first.opening_balance))
}

/// Build the cash-flow table from already resolved charge amounts.
pub fn assemble_cash_flow(
    schedule: &[PeriodRecord],
    charges: &UpfrontCharges,
) -> LeaseCalcResult<Vec<CashFlowRecord>> {
    let (first, last) = match (schedule.first(), schedule.last()) {
        (Some(f), Some(l)) => (f, l),
        _ => {
            return Err(LeaseCalcError::InsufficientData(
                "Cash flow requires a non-empty schedule".into(),
            ))
        }
    };
    if charges.fee < Decimal::ZERO || charges.brokerage < Decimal::ZERO || charges.deposit < Decimal::ZERO {
        return Err(LeaseCalcError::invalid(
            "charges",
            "Upfront charges cannot be negative",
        ));
    }

    let disbursed = first.opening_balance;
    let mut records = Vec::with_capacity(schedule.len() + 1);

    let opening_net = -disbursed + charges.fee - charges.brokerage + charges.deposit;
    records.push(CashFlowRecord {
        period: 0,
        date: first.start_date,
        time_offset: 0,
        principal: -disbursed,
        interest: Decimal::ZERO,
        fee: charges.fee,
        brokerage: -charges.brokerage,
        deposit: charges.deposit,
        net_amount: opening_net,
        cumulative: opening_net,
    });

    let mut cumulative = opening_net;
    for rec in schedule {
        let deposit = if rec.period == last.period {
            -charges.deposit
        } else {
            Decimal::ZERO
        };
        let net = rec.principal + rec.interest + deposit;
        cumulative += net;
        records.push(CashFlowRecord {
            period: rec.period,
            date: rec.payment_date,
            time_offset: rec.payment_offset,
            principal: rec.principal,
            interest: rec.interest,
            fee: Decimal::ZERO,
            brokerage: Decimal::ZERO,
            deposit,
            net_amount: net,
            cumulative,
        });
    }

    Ok(records)
}

/// Schedule and cash-flow table in one call.
pub fn compute_cash_flow_for(
    params: &LoanParameters,
) -> LeaseCalcResult<(ScheduleOutput, Vec<CashFlowRecord>)> {
    let sched = schedule::compute_schedule(params)?;
    let flows = compute_cash_flow(&sched.periods, &params.fee_terms())?;
    Ok((sched, flows))
}

/// Totals of a cash-flow table, including the conservation residual.
pub fn summarize_totals(records: &[CashFlowRecord]) -> CashFlowTotals {
    let mut disbursed = Decimal::ZERO;
    let mut total_principal = Decimal::ZERO;
    let mut total_interest = Decimal::ZERO;
    let mut total_fees = Decimal::ZERO;
    let mut net = Decimal::ZERO;

    for r in records {
        if r.principal < Decimal::ZERO {
            disbursed -= r.principal;
        } else {
            total_principal += r.principal;
        }
        total_interest += r.interest;
        total_fees += r.fee + r.brokerage;
        net += r.net_amount;
    }

    CashFlowTotals {
        disbursed,
        total_principal,
        total_interest,
        total_fees,
        net_cash_flow: net,
        conservation_residual: net - (total_interest + total_fees),
    }
}

// ---------------------------------------------------------------------------
// Comprehensive rate
// ---------------------------------------------------------------------------

/// Net amounts summed per grid position; flows sharing a date share a bucket.
///
/// Offsets beyond [`schedule::MAX_PERIODS`] cannot come from a schedule and
/// are rejected.
pub fn bucket_by_offset(records: &[CashFlowRecord]) -> LeaseCalcResult<Vec<Money>> {
    let last = records.iter().map(|r| r.time_offset).max().unwrap_or(0);
    if last > schedule::MAX_PERIODS {
        return Err(LeaseCalcError::invalid(
            "time_offset",
            format!("Offset {last} exceeds the {}-period grid", schedule::MAX_PERIODS),
        ));
    }
    let mut buckets = vec![Decimal::ZERO; last as usize + 1];
    for r in records {
        buckets[r.time_offset as usize] += r.net_amount;
    }
    Ok(buckets)
}

/// Solve for the periodic rate that zeroes the table's NPV and annualise it
/// with `periods_per_year`.
pub fn compute_comprehensive_rate(
    records: &[CashFlowRecord],
    periods_per_year: Decimal,
    config: &SolverConfig,
) -> LeaseCalcResult<ComprehensiveRateSummary> {
    if records.is_empty() {
        return Err(LeaseCalcError::InsufficientData(
            "Comprehensive rate requires a cash-flow table".into(),
        ));
    }
    if periods_per_year <= Decimal::ZERO {
        return Err(LeaseCalcError::invalid(
            "periods_per_year",
            "Periods per year must be positive",
        ));
    }

    let buckets = bucket_by_offset(records)?;
    let solution = time_value::irr(&buckets, config)?;
    debug!(
        rate = %solution.rate,
        iterations = solution.iterations,
        solver = ?solution.method,
        "comprehensive rate solved"
    );

    let growth = annualise(solution.rate, periods_per_year)?;
    Ok(ComprehensiveRateSummary {
        periodic_rate: solution.rate,
        nominal_annual_rate: solution.rate * periods_per_year,
        effective_annual_rate: growth - Decimal::ONE,
        iterations: solution.iterations,
        solver: solution.method,
    })
}

/// (1 + rate)^periods_per_year, exact for whole period counts.
fn annualise(rate: Rate, periods_per_year: Decimal) -> LeaseCalcResult<Decimal> {
    if periods_per_year.fract().is_zero() {
        if let Some(whole) = periods_per_year.to_u32() {
            return time_value::compound_factor(rate, whole);
        }
    }
    (Decimal::ONE + rate)
        .checked_powd(periods_per_year)
        .ok_or_else(|| LeaseCalcError::overflow(format!("(1 + {rate})^{periods_per_year}")))
}

/// Schedule, cash flows, totals and comprehensive rate in one envelope.
pub fn build_cash_flow_report(
    params: &LoanParameters,
    config: &SolverConfig,
) -> LeaseCalcResult<ComputationOutput<CashFlowReport>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    let (sched, cash_flows) = compute_cash_flow_for(params)?;
    let totals = summarize_totals(&cash_flows);
    if !totals.conservation_residual.is_zero() {
        warnings.push(format!(
            "Cash flows do not conserve value: residual {}",
            totals.conservation_residual
        ));
    }

    let comprehensive_rate =
        compute_comprehensive_rate(&cash_flows, params.periods_per_year(), config)?;
    if comprehensive_rate.nominal_annual_rate > params.annual_rate && totals.total_fees > Decimal::ZERO {
        warnings.push(format!(
            "Fees lift the comprehensive rate {} above the nominal rate {}",
            comprehensive_rate.nominal_annual_rate.round_dp(6),
            params.annual_rate
        ));
    }

    let report = CashFlowReport {
        schedule: sched,
        cash_flows,
        totals,
        comprehensive_rate,
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        &format!(
            "{}; comprehensive rate by IRR on the lender cash flows",
            schedule::methodology(params.method)
        ),
        &serde_json::json!({
            "principal": params.principal.to_string(),
            "annual_rate": params.annual_rate.to_string(),
            "fee_rate": params.fee_rate.unwrap_or(Decimal::ZERO).to_string(),
            "brokerage_rate": params.brokerage_rate.unwrap_or(Decimal::ZERO).to_string(),
            "deposit_rate": params.deposit_rate.unwrap_or(Decimal::ZERO).to_string(),
            "solver_tolerance": config.tolerance.to_string(),
            "solver_max_iterations": config.max_iterations,
        }),
        warnings,
        elapsed,
        report,
    ))
}

use chrono::NaiveDate;
use lease_calc_core::amortization::cash_flow::{self, FeeTerms};
use lease_calc_core::amortization::schedule::{self, LoanParameters, RepaymentMethod};
use lease_calc_core::rounding::RoundingPolicy;
use lease_calc_core::time_value::{self, SolverConfig};
use lease_calc_core::LeaseCalcError;
use pretty_assertions::assert_eq;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

fn lease(method: RepaymentMethod) -> LoanParameters {
    LoanParameters {
        principal: dec!(50000000),
        annual_rate: dec!(0.045),
        total_periods: 12,
        method,
        payment_interval_months: 6,
        disbursement_date: NaiveDate::from_ymd_opt(2024, 6, 30).unwrap(),
        fee_rate: Some(dec!(0.01)),
        brokerage_rate: Some(dec!(0.002)),
        deposit_rate: Some(dec!(0.05)),
        rounding: RoundingPolicy::default(),
    }
}

// ===========================================================================
// Conservation
// ===========================================================================

#[test]
fn test_conservation_all_methods() {
    for method in [
        RepaymentMethod::EqualInstallment,
        RepaymentMethod::EqualInstallmentInAdvance,
        RepaymentMethod::EqualPrincipal,
        RepaymentMethod::InterestOnly,
    ] {
        let p = lease(method);
        let (sched, flows) = cash_flow::compute_cash_flow_for(&p).unwrap();

        let net: Decimal = flows.iter().map(|f| f.net_amount).sum();
        let fee = dec!(500000);
        let brokerage = dec!(100000);
        assert_eq!(net, sched.total_interest + fee - brokerage, "{method:?}");

        let totals = cash_flow::summarize_totals(&flows);
        assert_eq!(totals.conservation_residual, Decimal::ZERO);
        assert_eq!(totals.disbursed, dec!(50000000));
        assert_eq!(totals.total_principal, dec!(50000000));
        assert_eq!(flows.last().unwrap().cumulative, net);
    }
}

#[test]
fn test_period_zero_layout() {
    let (_, flows) = cash_flow::compute_cash_flow_for(&lease(RepaymentMethod::EqualInstallment)).unwrap();
    let first = &flows[0];
    assert_eq!(first.period, 0);
    assert_eq!(first.time_offset, 0);
    assert_eq!(first.date, NaiveDate::from_ymd_opt(2024, 6, 30).unwrap());
    assert_eq!(first.fee, dec!(500000));
    assert_eq!(first.brokerage, dec!(-100000));
    assert_eq!(first.deposit, dec!(2500000));
    assert_eq!(
        first.net_amount,
        dec!(-50000000) + dec!(500000) - dec!(100000) + dec!(2500000)
    );
    assert_eq!(flows.len(), 13);
    assert_eq!(flows[12].deposit, dec!(-2500000));
}

#[test]
fn test_cash_flow_rows_reference_schedule() {
    let p = lease(RepaymentMethod::EqualPrincipal);
    let sched = schedule::compute_schedule(&p).unwrap();
    let flows = cash_flow::compute_cash_flow(&sched.periods, &p.fee_terms()).unwrap();
    for (rec, flow) in sched.periods.iter().zip(flows.iter().skip(1)) {
        assert_eq!(flow.period, rec.period);
        assert_eq!(flow.date, rec.payment_date);
        assert_eq!(flow.principal, rec.principal);
        assert_eq!(flow.interest, rec.interest);
    }
}

#[test]
fn test_empty_schedule_is_validation_error() {
    let err = cash_flow::compute_cash_flow(&[], &FeeTerms::default()).unwrap_err();
    assert!(matches!(err, LeaseCalcError::InsufficientData(_)));
}

// ===========================================================================
// Comprehensive rate
// ===========================================================================

#[test]
fn test_comprehensive_rate_equals_contract_rate_without_charges() {
    let mut p = lease(RepaymentMethod::EqualInstallment);
    p.fee_rate = None;
    p.brokerage_rate = None;
    p.deposit_rate = None;
    let (_, flows) = cash_flow::compute_cash_flow_for(&p).unwrap();
    let summary =
        cash_flow::compute_comprehensive_rate(&flows, p.periods_per_year(), &SolverConfig::default())
            .unwrap();
    // Only cent rounding separates the IRR from 2.25% per half-year
    assert!((summary.periodic_rate - dec!(0.0225)).abs() < dec!(0.0000001));
    assert!((summary.nominal_annual_rate - dec!(0.045)).abs() < dec!(0.0000002));
    // (1.0225)^2 - 1
    assert!((summary.effective_annual_rate - dec!(0.04550625)).abs() < dec!(0.000001));
}

#[test]
fn test_comprehensive_rate_zeroes_npv() {
    let p = lease(RepaymentMethod::EqualInstallment);
    let (_, flows) = cash_flow::compute_cash_flow_for(&p).unwrap();
    let summary =
        cash_flow::compute_comprehensive_rate(&flows, p.periods_per_year(), &SolverConfig::default())
            .unwrap();
    let buckets = cash_flow::bucket_by_offset(&flows).unwrap();
    let residual = time_value::npv(summary.periodic_rate, &buckets).unwrap();
    assert!(residual.abs() < dec!(0.0001), "NPV at IRR was {residual}");
    // Net fee income of 0.8% lifts the rate above the contract rate
    assert!(summary.nominal_annual_rate > dec!(0.045));
}

#[test]
fn test_comprehensive_rate_iteration_cap_surfaces_error() {
    let p = lease(RepaymentMethod::EqualInstallment);
    let (_, flows) = cash_flow::compute_cash_flow_for(&p).unwrap();
    let config = SolverConfig {
        max_iterations: 1,
        initial_guess: dec!(5),
        ..SolverConfig::default()
    };
    let err = cash_flow::compute_comprehensive_rate(&flows, dec!(2), &config).unwrap_err();
    assert!(matches!(err, LeaseCalcError::ConvergenceFailure { .. }));
}

#[test]
fn test_comprehensive_rate_rejects_offsets_off_the_grid() {
    let p = lease(RepaymentMethod::EqualInstallment);
    let (_, mut flows) = cash_flow::compute_cash_flow_for(&p).unwrap();
    flows.last_mut().unwrap().time_offset = u32::MAX;
    match cash_flow::compute_comprehensive_rate(&flows, dec!(2), &SolverConfig::default()) {
        Err(LeaseCalcError::InvalidInput { field, .. }) => assert_eq!(field, "time_offset"),
        other => panic!("expected InvalidInput, got {other:?}"),
    }
}

#[test]
fn test_report_envelope() {
    let p = lease(RepaymentMethod::EqualPrincipal);
    let out = cash_flow::build_cash_flow_report(&p, &SolverConfig::default()).unwrap();
    assert_eq!(out.result.cash_flows.len(), 13);
    assert_eq!(out.result.totals.total_fees, dec!(400000));
    assert!(out.methodology.starts_with("Equal principal"));
    assert!(out.warnings.iter().any(|w| w.contains("Fees lift")));
}

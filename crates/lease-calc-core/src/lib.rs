pub mod amortization;
pub mod calendar;
pub mod error;
pub mod rounding;
pub mod time_value;
pub mod types;

#[cfg(feature = "trade_finance")]
pub mod trade_finance;

pub use amortization::cash_flow::{
    compute_cash_flow, compute_comprehensive_rate, CashFlowRecord, ComprehensiveRateSummary,
    FeeTerms,
};
pub use amortization::schedule::{
    compute_schedule, LoanParameters, PeriodRecord, RepaymentMethod, ScheduleOutput,
};
pub use error::LeaseCalcError;
pub use time_value::SolverConfig;
pub use types::*;

/// Standard result type for all lease-calc operations
pub type LeaseCalcResult<T> = Result<T, LeaseCalcError>;

//! Period-based amortization: the repayment schedule and the lender-side
//! cash-flow table derived from it.

pub mod cash_flow;
pub mod schedule;

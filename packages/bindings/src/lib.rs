use napi::Result as NapiResult;
use napi_derive::napi;
use serde::Deserialize;

use lease_calc_core::amortization::cash_flow::{self, CashFlowRecord};
use lease_calc_core::amortization::schedule::{self, LoanParameters};
use lease_calc_core::time_value::SolverConfig;
use lease_calc_core::trade_finance::bank_acceptance::{self, BankAcceptanceInput};

/// Convert any Display error into a napi::Error.
fn to_napi_error(e: impl std::fmt::Display) -> napi::Error {
    napi::Error::from_reason(e.to_string())
}

/// Parse an optional solver configuration; empty means defaults.
fn solver_config(config_json: Option<String>) -> NapiResult<SolverConfig> {
    match config_json.as_deref().map(str::trim) {
        None | Some("") => Ok(SolverConfig::default()),
        Some(json) => {
            let config: SolverConfig = serde_json::from_str(json).map_err(to_napi_error)?;
            config.validate().map_err(to_napi_error)?;
            Ok(config)
        }
    }
}

// ---------------------------------------------------------------------------
// Amortization
// ---------------------------------------------------------------------------

#[napi]
pub fn compute_schedule(input_json: String) -> NapiResult<String> {
    let params: LoanParameters = serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output = schedule::build_schedule(&params).map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

#[napi]
pub fn compute_cash_flow(input_json: String, config_json: Option<String>) -> NapiResult<String> {
    let params: LoanParameters = serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let config = solver_config(config_json)?;
    let output = cash_flow::build_cash_flow_report(&params, &config).map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

#[derive(Deserialize)]
struct RateRequest {
    cash_flows: Vec<CashFlowRecord>,
    periods_per_year: rust_decimal::Decimal,
}

/// Comprehensive rate of an existing cash-flow table.
#[napi]
pub fn comprehensive_rate(input_json: String, config_json: Option<String>) -> NapiResult<String> {
    let request: RateRequest = serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let config = solver_config(config_json)?;
    let summary =
        cash_flow::compute_comprehensive_rate(&request.cash_flows, request.periods_per_year, &config)
            .map_err(to_napi_error)?;
    serde_json::to_string(&summary).map_err(to_napi_error)
}

// ---------------------------------------------------------------------------
// Trade Finance
// ---------------------------------------------------------------------------

#[napi]
pub fn price_bank_acceptance(input_json: String, config_json: Option<String>) -> NapiResult<String> {
    let input: BankAcceptanceInput = serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let config = solver_config(config_json)?;
    let output =
        bank_acceptance::price_bank_acceptance(&input, &config).map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

use napi::Result as NapiResult;
use napi_derive::napi;

use fund_waterfall_core::compute::{self, ComputeRequest, ReturnsRequest};
use fund_waterfall_core::FundWaterfallError;

/// Malformed JSON and other transport failures.
fn to_napi_error(e: impl std::fmt::Display) -> napi::Error {
    napi::Error::from_reason(e.to_string())
}

/// Computation failures carry the serialized `{category, kind, message}`
/// report as the thrown reason.
fn report_error(e: FundWaterfallError) -> napi::Error {
    match serde_json::to_string(&e.report()) {
        Ok(reason) => napi::Error::from_reason(reason),
        Err(_) => to_napi_error(e),
    }
}

#[napi]
pub fn compute_waterfall(input_json: String) -> NapiResult<String> {
    let input: ComputeRequest = serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output = compute::compute(&input).map_err(report_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

#[napi]
pub fn solve_irr(input_json: String) -> NapiResult<String> {
    let input: ReturnsRequest = serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output = compute::solve_returns(&input).map_err(report_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

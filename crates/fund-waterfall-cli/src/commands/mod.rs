pub mod irr;
pub mod waterfall;

use fund_waterfall_core::FundWaterfallError;

/// 2 for rejected input, 3 when the numbers admit no answer, 1 otherwise.
pub fn exit_code(err: &(dyn std::error::Error + 'static)) -> i32 {
    match err.downcast_ref::<FundWaterfallError>() {
        Some(FundWaterfallError::Validation { .. }) => 2,
        Some(FundWaterfallError::Numerical { .. }) => 3,
        _ => 1,
    }
}

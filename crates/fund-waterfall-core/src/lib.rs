pub mod error;
pub mod schedule;
pub mod terms;
pub mod time_value;
pub mod types;
pub mod waterfall;

#[cfg(feature = "compute")]
pub mod compute;

pub use error::{FundWaterfallError, NumericalKind, ValidationKind};
pub use schedule::{CashFlowEvent, CashFlowSchedule};
pub use terms::{TermSet, TermsInput};
pub use types::*;

/// Standard result type for all fund-waterfall operations
pub type FundWaterfallResult<T> = Result<T, FundWaterfallError>;

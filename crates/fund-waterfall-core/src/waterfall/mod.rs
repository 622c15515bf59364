//! European (whole-fund) distribution waterfall.
//!
//! Tiers, filled strictly in order for every distribution:
//! 1. Return of capital to LPs
//! 2. Compounding preferred return to LPs
//! 3. GP catch-up to the target share of profit distributed so far
//! 4. Residual carried-interest split
//!
//! The management fee is taken out of each gross distribution before tier 1.

pub mod accrual;
pub mod allocator;
pub mod engine;
pub mod fees;

pub use accrual::{AccrualState, PreferredReturnAccrual};
pub use allocator::{TierAllocation, WaterfallAllocator};
pub use engine::{
    allocate_schedule, gp_profit_share, run_waterfall, EventAllocation, ScheduleAllocation,
    WaterfallResult, WaterfallTotals,
};
pub use fees::{FeeDeduction, ManagementFeeAccrual};

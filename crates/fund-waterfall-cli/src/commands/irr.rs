use chrono::NaiveDate;
use clap::Args;
use rust_decimal::Decimal;
use serde_json::Value;

use fund_waterfall_core::compute::{self, CashFlowInput, ReturnsRequest};

use crate::input;

/// Arguments for an IRR/MOIC solve
#[derive(Args)]
pub struct IrrArgs {
    /// Path to a JSON or YAML file with `cashflows` (overrides individual flags)
    #[arg(long)]
    pub input: Option<String>,

    /// Annual cash flows (comma-separated, e.g. "-100,30,30,130")
    #[arg(long, value_delimiter = ',', allow_hyphen_values = true)]
    pub cash_flows: Option<Vec<Decimal>>,

    /// Date of the first period (YYYY-MM-DD)
    #[arg(long)]
    pub start_date: Option<NaiveDate>,
}

pub fn run_irr(args: IrrArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let request: ReturnsRequest = if let Some(ref path) = args.input {
        input::file::read_input(path)?
    } else if let Some(data) = input::stdin::read_stdin()? {
        serde_json::from_value(data)?
    } else {
        let cash_flows = args
            .cash_flows
            .ok_or("--cash-flows is required (or provide --input)")?;
        ReturnsRequest {
            cashflows: CashFlowInput::Periodic(cash_flows),
            start_date: args.start_date,
            solver: None,
        }
    };

    let result = compute::solve_returns(&request)?;
    Ok(serde_json::to_value(result)?)
}

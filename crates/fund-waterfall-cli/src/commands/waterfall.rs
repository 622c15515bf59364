use chrono::NaiveDate;
use clap::Args;
use rust_decimal::Decimal;
use serde_json::Value;

use fund_waterfall_core::compute::{self, CashFlowInput, ComputeRequest, TargetPeriod};
use fund_waterfall_core::TermsInput;

use crate::input;

/// Arguments for a waterfall computation
#[derive(Args)]
pub struct WaterfallArgs {
    /// Path to a JSON or YAML request file (overrides individual flags)
    #[arg(long)]
    pub input: Option<String>,

    /// Annual management fee rate (e.g. 0.02)
    #[arg(long)]
    pub mgmt_fee: Option<Decimal>,

    /// Annual preferred return rate (e.g. 0.08)
    #[arg(long)]
    pub pref: Option<Decimal>,

    /// LP share of the residual split
    #[arg(long)]
    pub split_lp: Option<Decimal>,

    /// GP share of the residual split
    #[arg(long)]
    pub split_gp: Option<Decimal>,

    /// GP catch-up target share of profit (defaults to --split-gp)
    #[arg(long)]
    pub catch_up: Option<Decimal>,

    /// Target gross IRR, used when no cash flows are given
    #[arg(long, allow_hyphen_values = true)]
    pub gross_irr: Option<Decimal>,

    /// Annual cash flows (comma-separated, e.g. "-100,0,30,150")
    #[arg(long, value_delimiter = ',', allow_hyphen_values = true)]
    pub cash_flows: Option<Vec<Decimal>>,

    /// Date of the first period (YYYY-MM-DD)
    #[arg(long)]
    pub start_date: Option<NaiveDate>,

    /// Capital called in target-IRR mode
    #[arg(long)]
    pub capital: Option<Decimal>,

    /// Holding period in whole years for target-IRR mode
    #[arg(long)]
    pub holding_years: Option<u32>,
}

pub fn run_waterfall(args: WaterfallArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let request: ComputeRequest = if let Some(ref path) = args.input {
        input::file::read_input(path)?
    } else if let Some(data) = input::stdin::read_stdin()? {
        serde_json::from_value(data)?
    } else {
        request_from_flags(args)?
    };

    tracing::debug!(
        has_cash_flows = request.cashflows.is_some(),
        "computing waterfall"
    );
    let result = compute::compute(&request)?;
    Ok(serde_json::to_value(result)?)
}

fn request_from_flags(args: WaterfallArgs) -> Result<ComputeRequest, Box<dyn std::error::Error>> {
    if args.cash_flows.is_none() && args.gross_irr.is_none() {
        return Err("--cash-flows or --gross-irr is required (or provide --input)".into());
    }

    let target = if args.capital.is_some() || args.holding_years.is_some() {
        let defaults = TargetPeriod::default();
        Some(TargetPeriod {
            capital: args.capital.unwrap_or(defaults.capital),
            holding_years: args.holding_years.unwrap_or(defaults.holding_years),
        })
    } else {
        None
    };

    Ok(ComputeRequest {
        terms: TermsInput {
            mgmt_fee: args.mgmt_fee,
            pref: args.pref,
            split_lp: args.split_lp,
            split_gp: args.split_gp,
            catch_up: args.catch_up,
            gross_irr: args.gross_irr,
        },
        cashflows: args.cash_flows.map(CashFlowInput::Periodic),
        start_date: args.start_date,
        target,
    })
}

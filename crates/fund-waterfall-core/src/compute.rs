//! Request/response surface for callers posting the portal's `terms`
//! object, with or without a cash-flow schedule.
//!
//! Two modes:
//! - **Full schedule**: the posted cash flows run through the waterfall.
//! - **Target IRR**: no cash flows, only `grossIRR`. The schedule is one
//!   contribution and one distribution sized so the fund's gross IRR equals
//!   the target, then run through the same waterfall.

use chrono::{Days, NaiveDate};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::error::{FundWaterfallError, ValidationKind};
use crate::schedule::{CashFlowEvent, CashFlowSchedule};
use crate::terms::{TermSet, TermsInput};
use crate::time_value::{compound_factor, moic, xirr, xirr_with, SolverConfig};
use crate::types::*;
use crate::waterfall::engine::dated;
use crate::waterfall::{gp_profit_share, run_waterfall, WaterfallResult};
use crate::FundWaterfallResult;

const TARGET_RECONCILIATION_TOLERANCE: Decimal = dec!(0.000001);

// ---------------------------------------------------------------------------
// Input types
// ---------------------------------------------------------------------------

/// Cash flows as posted: dated events, or plain signed amounts one year apart.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CashFlowInput {
    Dated(Vec<CashFlowEvent>),
    Periodic(Vec<Money>),
}

impl CashFlowInput {
    pub fn is_empty(&self) -> bool {
        match self {
            CashFlowInput::Dated(v) => v.is_empty(),
            CashFlowInput::Periodic(v) => v.is_empty(),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            CashFlowInput::Dated(v) => v.len(),
            CashFlowInput::Periodic(v) => v.len(),
        }
    }

    /// Validate into a schedule; periodic amounts start at `start`.
    pub fn to_schedule(&self, start: NaiveDate) -> FundWaterfallResult<CashFlowSchedule> {
        match self {
            CashFlowInput::Dated(events) => CashFlowSchedule::new(events.clone()),
            CashFlowInput::Periodic(amounts) => CashFlowSchedule::from_periodic(start, amounts),
        }
    }
}

/// Shape of the synthetic schedule used in target-IRR mode.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TargetPeriod {
    /// Capital called at the start date
    #[serde(default = "default_target_capital")]
    pub capital: Money,
    /// Whole years until the single distribution
    #[serde(default = "default_holding_years")]
    pub holding_years: u32,
}

fn default_target_capital() -> Money {
    dec!(100_000_000)
}

fn default_holding_years() -> u32 {
    5
}

impl Default for TargetPeriod {
    fn default() -> Self {
        Self {
            capital: default_target_capital(),
            holding_years: default_holding_years(),
        }
    }
}

/// Input for a waterfall computation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComputeRequest {
    pub terms: TermsInput,
    #[serde(default, alias = "cashFlows", skip_serializing_if = "Option::is_none")]
    pub cashflows: Option<CashFlowInput>,
    /// First period date for periodic cash flows and target-IRR mode
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<TargetPeriod>,
}

/// Input for a standalone IRR/MOIC solve.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReturnsRequest {
    #[serde(alias = "cashFlows")]
    pub cashflows: CashFlowInput,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub solver: Option<SolverConfig>,
}

// ---------------------------------------------------------------------------
// Output types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComputeMode {
    FullSchedule,
    TargetIrr,
}

/// Headline metrics (percentages) plus the full waterfall.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComputeResponse {
    pub mode: ComputeMode,
    /// Gross fund IRR, percent
    #[serde(rename = "computedIRR")]
    pub computed_irr: Decimal,
    /// LP net IRR after fees and carry, percent
    #[serde(rename = "lpNetIRR")]
    pub lp_net_irr: Decimal,
    /// GP carry as a share of fund profit, percent
    #[serde(rename = "gpCarry")]
    pub gp_carry: Decimal,
    /// Gross IRR above the preferred rate, percentage points
    #[serde(rename = "overPref")]
    pub over_pref: Decimal,
    /// Gross IRR lost to management fees, percentage points
    #[serde(rename = "feeDrag", skip_serializing_if = "Option::is_none")]
    pub fee_drag: Option<Decimal>,
    #[serde(rename = "moicLP")]
    pub moic_lp: Multiple,
    #[serde(rename = "gpCarryTotal")]
    pub gp_carry_total: Money,
    pub note: String,
    pub waterfall: WaterfallResult,
}

/// Output of a standalone IRR/MOIC solve.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReturnsResponse {
    pub irr: Rate,
    #[serde(rename = "irrPct")]
    pub irr_pct: Decimal,
    pub moic: Multiple,
    #[serde(rename = "totalContributed")]
    pub total_contributed: Money,
    #[serde(rename = "totalDistributed")]
    pub total_distributed: Money,
    pub iterations: u32,
}

// ---------------------------------------------------------------------------
// Calculation
// ---------------------------------------------------------------------------

/// Validate the request, pick the mode, run the waterfall and derive the
/// headline metrics.
pub fn compute(request: &ComputeRequest) -> FundWaterfallResult<ComputationOutput<ComputeResponse>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    let terms = TermSet::try_from(&request.terms)?;
    let start_date = request.start_date.unwrap_or_default();
    let posted = request.cashflows.as_ref().filter(|cf| !cf.is_empty());

    let (mode, schedule, note) = match posted {
        Some(cash_flows) => {
            if request.terms.gross_irr.is_some() {
                tracing::warn!("grossIRR ignored: cash flows were supplied");
                warnings.push(
                    "grossIRR target ignored because a cash-flow schedule was supplied".into(),
                );
            }
            let schedule = cash_flows.to_schedule(start_date)?;
            let distributions = schedule
                .events()
                .iter()
                .filter(|e| !e.is_contribution())
                .count();
            let note = format!(
                "Full schedule: time-phased European waterfall over {} cash flows ({} distributions)",
                schedule.events().len(),
                distributions
            );
            (ComputeMode::FullSchedule, schedule, note)
        }
        None => {
            let target_irr = request.terms.gross_irr.ok_or_else(|| {
                FundWaterfallError::validation(
                    ValidationKind::EmptySchedule,
                    "cashflows",
                    "Provide cash flows or a grossIRR target",
                )
            })?;
            let period = request.target.clone().unwrap_or_default();
            let schedule = target_schedule(target_irr, &period, start_date)?;
            let note = format!(
                "Single-period target IRR: {} called on {}, one distribution after {} years sized for a {}% gross IRR",
                period.capital,
                start_date,
                period.holding_years,
                pct(target_irr)
            );
            (ComputeMode::TargetIrr, schedule, note)
        }
    };

    let waterfall = run_waterfall(&terms, &schedule)?;

    if let (ComputeMode::TargetIrr, Some(target)) = (mode, request.terms.gross_irr) {
        let gap = (waterfall.gross_irr_fund - target).abs();
        if gap > TARGET_RECONCILIATION_TOLERANCE {
            warnings.push(format!(
                "Solved gross IRR {} differs from target {} by {}",
                waterfall.gross_irr_fund, target, gap
            ));
        }
    }

    let fee_drag = if waterfall.totals.management_fees.is_zero() {
        Some(Decimal::ZERO)
    } else {
        match xirr(&dated(&waterfall.fund_net_cash_flows)) {
            Ok(net_of_fees) => Some(pct(waterfall.gross_irr_fund - net_of_fees)),
            Err(e) => {
                warnings.push(format!("Fee drag unavailable: {e}"));
                None
            }
        }
    };

    if !waterfall.totals.unpaid_management_fees.is_zero() {
        warnings.push(format!(
            "{} of management fee accrued but not covered by distributions",
            waterfall.totals.unpaid_management_fees
        ));
    }

    let over_pref = (waterfall.gross_irr_fund - terms.preferred_return_rate()).max(Decimal::ZERO);

    let output = ComputeResponse {
        mode,
        computed_irr: pct(waterfall.gross_irr_fund),
        lp_net_irr: pct(waterfall.net_irr_lp),
        gp_carry: pct(gp_profit_share(&waterfall)),
        over_pref: pct(over_pref),
        fee_drag,
        moic_lp: waterfall.moic_lp,
        gp_carry_total: waterfall.gp_carry_total,
        note,
        waterfall,
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "European Fund Waterfall: ROC, Compounding Preferred Return, GP Catch-Up, Carry Split",
        &serde_json::json!({
            "mode": mode,
            "terms": terms,
            "num_cash_flows": schedule.events().len(),
            "day_count": "actual/365",
        }),
        warnings,
        elapsed,
        output,
    ))
}

/// Solve IRR and MOIC for a bare cash-flow series.
pub fn solve_returns(
    request: &ReturnsRequest,
) -> FundWaterfallResult<ComputationOutput<ReturnsResponse>> {
    let start = Instant::now();

    let schedule = request
        .cashflows
        .to_schedule(request.start_date.unwrap_or_default())?;
    let config = request.solver.clone().unwrap_or_default();
    let solution = xirr_with(&schedule.dated_amounts(), &config)?;
    let amounts: Vec<Money> = schedule.events().iter().map(|e| e.amount).collect();

    let output = ReturnsResponse {
        irr: solution.rate,
        irr_pct: pct(solution.rate),
        moic: moic(&amounts)?,
        total_contributed: schedule.total_contributions()?,
        total_distributed: schedule.total_distributions()?,
        iterations: solution.iterations,
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "XIRR (bisection then Newton-Raphson, actual/365) and MOIC",
        &serde_json::json!({
            "num_cash_flows": schedule.events().len(),
            "bracket": [config.lower_bound, config.upper_bound],
        }),
        Vec::new(),
        elapsed,
        output,
    ))
}

/// One contribution and one distribution implying `gross_irr`.
pub fn target_schedule(
    gross_irr: Rate,
    period: &TargetPeriod,
    start: NaiveDate,
) -> FundWaterfallResult<CashFlowSchedule> {
    let config = SolverConfig::default();
    let lower = Decimal::try_from(config.lower_bound).unwrap_or(dec!(-0.999));
    let upper = Decimal::try_from(config.upper_bound).unwrap_or(dec!(10));
    if gross_irr <= lower || gross_irr > upper {
        return Err(FundWaterfallError::validation(
            ValidationKind::InvalidTargetIrr,
            "grossIRR",
            format!("Target gross IRR must be in ({lower}, {upper}], got {gross_irr}"),
        ));
    }
    if period.capital <= Decimal::ZERO {
        return Err(FundWaterfallError::validation(
            ValidationKind::InvalidTargetIrr,
            "target.capital",
            "Target capital must be positive",
        ));
    }
    if period.holding_years == 0 {
        return Err(FundWaterfallError::validation(
            ValidationKind::InvalidTargetIrr,
            "target.holdingYears",
            "Holding period must be at least one year",
        ));
    }

    let days = DAYS_PER_YEAR * i64::from(period.holding_years);
    let factor = compound_factor(gross_irr, days)?;
    let distribution = checked_mul(period.capital, factor, "target schedule")?;
    let exit = start
        .checked_add_days(Days::new(days as u64))
        .ok_or_else(|| {
            FundWaterfallError::validation(
                ValidationKind::InvalidTargetIrr,
                "startDate",
                "Exit date is out of the supported calendar range",
            )
        })?;

    CashFlowSchedule::new(vec![
        CashFlowEvent::new(start, -period.capital),
        CashFlowEvent::new(exit, distribution),
    ])
}

/// Fraction to percent, 4 dp.
fn pct(r: Rate) -> Decimal {
    (r * dec!(100)).round_dp(4)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::NumericalKind;

    fn request(value: serde_json::Value) -> ComputeRequest {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_full_schedule_reference() {
        let req = request(serde_json::json!({
            "terms": { "mgmtFee": 0, "pref": 0.08, "splitLP": 0.8, "splitGP": 0.2, "catchUp": 0.2 },
            "cashflows": [
                { "date": "2021-01-01", "amount": "-100000000" },
                { "date": "2024-01-01", "amount": "150000000" }
            ]
        }));
        let out = compute(&req).unwrap();
        let r = &out.result;
        assert_eq!(r.mode, ComputeMode::FullSchedule);
        assert_eq!(r.gp_carry, dec!(20));
        assert_eq!(r.gp_carry_total, dec!(10_000_000));
        assert_eq!(r.moic_lp, dec!(1.4));
        assert_eq!(r.computed_irr, dec!(14.4714));
        assert_eq!(r.lp_net_irr, dec!(11.8689));
        assert_eq!(r.over_pref, dec!(6.4714));
        assert_eq!(r.fee_drag, Some(Decimal::ZERO));
        assert!(out.warnings.is_empty());
    }

    #[test]
    fn test_target_irr_mode() {
        let req = request(serde_json::json!({
            "terms": { "mgmtFee": 0, "pref": 0.08, "splitLP": 0.8, "splitGP": 0.2, "grossIRR": 0.18 }
        }));
        let out = compute(&req).unwrap();
        let r = &out.result;
        assert_eq!(r.mode, ComputeMode::TargetIrr);
        assert_eq!(r.computed_irr, dec!(18));
        assert!(r.lp_net_irr < r.computed_irr);
        assert!(r.note.contains("target IRR"));
        assert_eq!(r.waterfall.events.len(), 1);
        assert!(out.warnings.is_empty(), "{:?}", out.warnings);
    }

    #[test]
    fn test_periodic_cash_flows_with_ignored_target() {
        let req = request(serde_json::json!({
            "terms": { "mgmtFee": 0.02, "pref": 0.08, "splitLP": 0.6, "splitGP": 0.4, "grossIRR": 0.18 },
            "cashflows": [-1000000, 100000, 120000, 1400000],
            "startDate": "2020-01-01"
        }));
        let out = compute(&req).unwrap();
        assert_eq!(out.result.mode, ComputeMode::FullSchedule);
        assert_eq!(out.result.waterfall.events.len(), 3);
        assert!(out.warnings.iter().any(|w| w.contains("grossIRR")));
        let drag = out.result.fee_drag.unwrap();
        assert!(drag > Decimal::ZERO);
    }

    #[test]
    fn test_no_cash_flows_no_target() {
        let req = request(serde_json::json!({
            "terms": { "mgmtFee": 0.02, "pref": 0.08, "splitLP": 0.8, "splitGP": 0.2 },
            "cashflows": []
        }));
        let err = compute(&req).unwrap_err();
        assert_eq!(err.validation_kind(), Some(ValidationKind::EmptySchedule));
    }

    #[test]
    fn test_invalid_target_irr() {
        let req = request(serde_json::json!({
            "terms": { "mgmtFee": 0, "pref": 0.08, "splitLP": 0.8, "splitGP": 0.2, "grossIRR": -1 }
        }));
        let err = compute(&req).unwrap_err();
        assert_eq!(err.validation_kind(), Some(ValidationKind::InvalidTargetIrr));

        for outside in [dec!(-0.999), dec!(10.5)] {
            let err = target_schedule(outside, &TargetPeriod::default(), NaiveDate::default())
                .unwrap_err();
            assert_eq!(err.validation_kind(), Some(ValidationKind::InvalidTargetIrr));
        }
        assert!(target_schedule(dec!(10), &TargetPeriod::default(), NaiveDate::default()).is_ok());
    }

    #[test]
    fn test_solve_returns_periodic() {
        let req: ReturnsRequest = serde_json::from_value(serde_json::json!({
            "cashflows": [-100, 0, 0, 300]
        }))
        .unwrap();
        let out = solve_returns(&req).unwrap();
        assert_eq!(out.result.moic, dec!(3));
        // 3^(1/3) - 1
        assert!((out.result.irr - dec!(0.44224957)).abs() < dec!(0.000001));
    }

    #[test]
    fn test_solve_returns_no_sign_change() {
        let req: ReturnsRequest = serde_json::from_value(serde_json::json!({
            "cashflows": [-100, -50]
        }))
        .unwrap();
        let err = solve_returns(&req).unwrap_err();
        assert_eq!(err.numerical_kind(), Some(NumericalKind::NoSignChange));
    }

    #[test]
    fn test_solve_returns_all_distributions_is_no_sign_change() {
        let req: ReturnsRequest = serde_json::from_value(serde_json::json!({
            "cashflows": [100, 50]
        }))
        .unwrap();
        let err = solve_returns(&req).unwrap_err();
        assert_eq!(err.numerical_kind(), Some(NumericalKind::NoSignChange));
    }

    #[test]
    fn test_compute_all_distributions_is_no_sign_change() {
        let req = request(serde_json::json!({
            "terms": { "mgmtFee": 0, "pref": 0.08, "splitLP": 0.8, "splitGP": 0.2 },
            "cashflows": [
                { "date": "2021-01-01", "amount": "100" },
                { "date": "2022-01-01", "amount": "50" }
            ]
        }));
        let err = compute(&req).unwrap_err();
        assert_eq!(err.numerical_kind(), Some(NumericalKind::NoSignChange));
    }

    #[test]
    fn test_target_distribution_beyond_decimal_range_is_overflow() {
        let period = TargetPeriod {
            capital: Decimal::MAX,
            ..TargetPeriod::default()
        };
        let err = target_schedule(dec!(0.5), &period, NaiveDate::default()).unwrap_err();
        assert_eq!(err.numerical_kind(), Some(NumericalKind::Overflow));
    }
}

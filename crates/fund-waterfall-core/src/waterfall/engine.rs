use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{FundWaterfallError, ValidationKind};
use crate::schedule::CashFlowSchedule;
use crate::terms::TermSet;
use crate::time_value::{moic, xirr};
use crate::types::{checked_add, CashFlowPoint, Money, Multiple, Rate, SeriesBuilder};
use crate::waterfall::accrual::{AccrualState, PreferredReturnAccrual};
use crate::waterfall::allocator::{TierAllocation, WaterfallAllocator};
use crate::waterfall::fees::ManagementFeeAccrual;
use crate::FundWaterfallResult;

// ---------------------------------------------------------------------------
// Output types
// ---------------------------------------------------------------------------

/// Allocation of one distribution event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventAllocation {
    /// Position of the event in the input schedule
    pub index: usize,
    pub date: NaiveDate,
    /// Cash available before the management fee
    pub gross_amount: Money,
    pub management_fee: Money,
    /// Cash run through the tiers
    pub distributable: Money,
    /// Accrued preferred owed just before this event was allocated
    pub accrued_preferred_before: Money,
    /// Catch-up owed once this event's preferred was paid
    pub catch_up_target: Money,
    /// Always four entries, in tier order
    pub tiers: Vec<TierAllocation>,
    pub to_lp: Money,
    pub to_gp: Money,
    pub state_after: AccrualState,
}

/// Per-tier and per-party totals over the schedule.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WaterfallTotals {
    pub contributed: Money,
    pub gross_distributed: Money,
    pub management_fees: Money,
    /// Management fee accrued but not yet covered by a distribution
    pub unpaid_management_fees: Money,
    pub distributable: Money,
    pub return_of_capital: Money,
    pub preferred_return: Money,
    pub gp_catch_up: Money,
    pub carried_interest_lp: Money,
    pub carried_interest_gp: Money,
    pub to_lp: Money,
    pub to_gp: Money,
}

/// Tier allocations and realised series, before any return metrics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleAllocation {
    pub events: Vec<EventAllocation>,
    /// Contributions (negative) and LP receipts
    pub lp_cash_flows: Vec<CashFlowPoint>,
    /// GP receipts from catch-up and carried interest
    pub gp_cash_flows: Vec<CashFlowPoint>,
    /// Contributions and distributable (fee-net) cash
    pub fund_net_cash_flows: Vec<CashFlowPoint>,
    pub totals: WaterfallTotals,
    pub closing_state: AccrualState,
}

/// Full waterfall over a schedule, with return metrics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WaterfallResult {
    pub events: Vec<EventAllocation>,
    pub lp_cash_flows: Vec<CashFlowPoint>,
    pub gp_cash_flows: Vec<CashFlowPoint>,
    pub fund_net_cash_flows: Vec<CashFlowPoint>,
    /// IRR of the LP series
    pub net_irr_lp: Rate,
    /// IRR of the input schedule (gross of fees and carry)
    pub gross_irr_fund: Rate,
    /// LP receipts over contributions
    pub moic_lp: Multiple,
    /// Gross distributions over contributions
    pub moic_fund: Multiple,
    /// GP catch-up plus GP carried interest
    pub gp_carry_total: Money,
    pub totals: WaterfallTotals,
    pub closing_state: AccrualState,
}

impl WaterfallResult {
    /// Every tier allocation across the schedule, in order.
    pub fn tier_allocations(&self) -> impl Iterator<Item = &TierAllocation> {
        self.events.iter().flat_map(|e| e.tiers.iter())
    }
}

// ---------------------------------------------------------------------------
// Calculation
// ---------------------------------------------------------------------------

/// Walk the schedule: accrue, deduct fees, allocate each distribution.
pub fn allocate_schedule(
    terms: &TermSet,
    schedule: &CashFlowSchedule,
) -> FundWaterfallResult<ScheduleAllocation> {
    let mut accrual = PreferredReturnAccrual::new(terms.preferred_return_rate());
    let mut fees = ManagementFeeAccrual::new(terms.management_fee_rate());
    let mut allocator = WaterfallAllocator::new(terms);

    let mut events = Vec::new();
    let mut lp = SeriesBuilder::default();
    let mut gp = SeriesBuilder::default();
    let mut fund_net = SeriesBuilder::default();
    let mut totals = WaterfallTotals::default();

    for (index, event) in schedule.events().iter().enumerate() {
        // Fee base is the capital at work before this event changes it
        fees.advance_to(event.date, accrual.unreturned_capital())?;
        accrual.advance_to(event.date)?;

        if event.is_contribution() {
            let called = -event.amount;
            accrual.contribute(called)?;
            add_into(&mut totals.contributed, called)?;
            lp.push(event.date, event.amount)?;
            fund_net.push(event.date, event.amount)?;
            continue;
        }

        if totals.contributed.is_zero() && event.amount > Decimal::ZERO {
            return Err(FundWaterfallError::validation(
                ValidationKind::NoContributions,
                format!("cashflows[{index}]"),
                format!("Distribution dated {} precedes the first capital call", event.date),
            ));
        }

        let accrued_preferred_before = accrual.accrued_unpaid_preferred();
        let deduction = fees.deduct(event.amount)?;
        let tiers = allocator.allocate(deduction.distributable, &mut accrual)?;

        let mut to_lp = Decimal::ZERO;
        let mut to_gp = Decimal::ZERO;
        for tier in &tiers {
            add_into(&mut to_lp, tier.to_lp())?;
            add_into(&mut to_gp, tier.to_gp())?;
        }

        add_into(&mut totals.gross_distributed, deduction.gross)?;
        add_into(&mut totals.management_fees, deduction.fee_paid)?;
        add_into(&mut totals.distributable, deduction.distributable)?;
        add_into(&mut totals.to_lp, to_lp)?;
        add_into(&mut totals.to_gp, to_gp)?;

        lp.push(event.date, to_lp)?;
        gp.push(event.date, to_gp)?;
        fund_net.push(event.date, deduction.distributable)?;

        events.push(EventAllocation {
            index,
            date: event.date,
            gross_amount: deduction.gross,
            management_fee: deduction.fee_paid,
            distributable: deduction.distributable,
            accrued_preferred_before,
            catch_up_target: allocator.catch_up_due(),
            tiers,
            to_lp,
            to_gp,
            state_after: accrual.state().clone(),
        });
    }

    totals.unpaid_management_fees = fees.accrued_unpaid();
    totals.preferred_return = allocator.preferred_paid();
    totals.gp_catch_up = allocator.catch_up_paid();
    totals.carried_interest_lp = allocator.carried_interest_lp();
    totals.carried_interest_gp = allocator.carried_interest_gp();
    for tier in events.iter().flat_map(|e| e.tiers.iter()) {
        if let TierAllocation::ReturnOfCapital { amount } = tier {
            add_into(&mut totals.return_of_capital, *amount)?;
        }
    }

    Ok(ScheduleAllocation {
        events,
        lp_cash_flows: lp.finish(),
        gp_cash_flows: gp.finish(),
        fund_net_cash_flows: fund_net.finish(),
        totals,
        closing_state: accrual.state().clone(),
    })
}

/// Run the whole waterfall and derive IRR, MOIC and GP carry.
///
/// All-or-nothing: any validation or solver failure aborts the run.
pub fn run_waterfall(
    terms: &TermSet,
    schedule: &CashFlowSchedule,
) -> FundWaterfallResult<WaterfallResult> {
    // Sign checks on the raw schedule come before any allocation
    let gross_irr_fund = xirr(&schedule.dated_amounts())?;
    let allocation = allocate_schedule(terms, schedule)?;

    let net_irr_lp = xirr(&dated(&allocation.lp_cash_flows))?;

    let lp_amounts: Vec<Money> = allocation.lp_cash_flows.iter().map(|p| p.amount).collect();
    let moic_lp = moic(&lp_amounts)?;
    let fund_amounts: Vec<Money> = schedule.events().iter().map(|e| e.amount).collect();
    let moic_fund = moic(&fund_amounts)?;

    let gp_carry_total = checked_add(
        allocation.totals.gp_catch_up,
        allocation.totals.carried_interest_gp,
        "waterfall totals",
    )?;

    tracing::debug!(
        events = allocation.events.len(),
        %gross_irr_fund,
        %net_irr_lp,
        %moic_lp,
        %gp_carry_total,
        "waterfall complete"
    );

    Ok(WaterfallResult {
        events: allocation.events,
        lp_cash_flows: allocation.lp_cash_flows,
        gp_cash_flows: allocation.gp_cash_flows,
        fund_net_cash_flows: allocation.fund_net_cash_flows,
        net_irr_lp,
        gross_irr_fund,
        moic_lp,
        moic_fund,
        gp_carry_total,
        totals: allocation.totals,
        closing_state: allocation.closing_state,
    })
}

fn add_into(total: &mut Money, amount: Money) -> FundWaterfallResult<()> {
    *total = checked_add(*total, amount, "waterfall totals")?;
    Ok(())
}

pub(crate) fn dated(points: &[CashFlowPoint]) -> Vec<(NaiveDate, Money)> {
    points.iter().map(|p| (p.date, p.amount)).collect()
}

/// Share of total fund profit taken by the GP, as a fraction.
///
/// Zero when the fund made no profit after fees.
pub fn gp_profit_share(result: &WaterfallResult) -> Rate {
    let profit = result.totals.distributable - result.totals.contributed;
    if profit <= Decimal::ZERO {
        Decimal::ZERO
    } else {
        result.gp_carry_total / profit
    }
}

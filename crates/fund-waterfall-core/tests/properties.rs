use chrono::{Days, NaiveDate};
use fund_waterfall_core::waterfall::{allocate_schedule, TierAllocation};
use fund_waterfall_core::{CashFlowEvent, CashFlowSchedule, TermSet};
use proptest::prelude::{prop, prop_assert, prop_assert_eq, proptest};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

fn bp(value: u32) -> Decimal {
    Decimal::new(i64::from(value), 4)
}

fn build_schedule(first_call_cents: i64, rest: &[(u64, i64)]) -> CashFlowSchedule {
    let mut date = NaiveDate::from_ymd_opt(2018, 3, 31).unwrap();
    let mut events = vec![CashFlowEvent::new(date, Decimal::new(-first_call_cents, 2))];
    for (gap, cents) in rest {
        date = date.checked_add_days(Days::new(*gap)).unwrap();
        events.push(CashFlowEvent::new(date, Decimal::new(*cents, 2)));
    }
    CashFlowSchedule::new(events).unwrap()
}

/// Calls followed by partial paybacks that never run ahead of capital
/// called, closing with whatever is still outstanding.
fn break_even_schedule(steps: &[(u64, i64, u64, u32)], final_gap: u64) -> CashFlowSchedule {
    let mut date = NaiveDate::from_ymd_opt(2018, 3, 31).unwrap();
    let mut outstanding = 0i64;
    let mut events = Vec::new();
    for (call_gap, call_cents, payback_gap, payback_bp) in steps {
        date = date.checked_add_days(Days::new(*call_gap)).unwrap();
        events.push(CashFlowEvent::new(date, Decimal::new(-call_cents, 2)));
        outstanding += call_cents;

        date = date.checked_add_days(Days::new(*payback_gap)).unwrap();
        let payback = outstanding * i64::from(*payback_bp) / 10_000;
        events.push(CashFlowEvent::new(date, Decimal::new(payback, 2)));
        outstanding -= payback;
    }
    date = date.checked_add_days(Days::new(final_gap)).unwrap();
    events.push(CashFlowEvent::new(date, Decimal::new(outstanding, 2)));
    CashFlowSchedule::new(events).unwrap()
}

proptest! {
    #![proptest_config(proptest::test_runner::Config::with_cases(64))]

    #[test]
    fn prop_every_distribution_is_fully_allocated(
        fee_bp in 0u32..300,
        pref_bp in 0u32..1500,
        catch_up_bp in 0u32..9000,
        gp_split_bp in 0u32..5000,
        first_call in 1i64..50_000_000_000,
        rest in prop::collection::vec((0u64..900, -20_000_000_000i64..60_000_000_000), 1..12)
    ) {
        let terms = TermSet::new(
            bp(fee_bp),
            bp(pref_bp),
            bp(catch_up_bp),
            Decimal::ONE - bp(gp_split_bp),
            bp(gp_split_bp),
        )
        .unwrap();
        let schedule = build_schedule(first_call, &rest);
        let allocation = allocate_schedule(&terms, &schedule).unwrap();

        for ev in &allocation.events {
            let tiers: Decimal = ev.tiers.iter().map(TierAllocation::total).sum();
            prop_assert_eq!(tiers, ev.distributable);
            prop_assert_eq!(ev.management_fee + ev.distributable, ev.gross_amount);
            prop_assert_eq!(ev.to_lp + ev.to_gp, ev.distributable);
            prop_assert!(ev.tiers.iter().all(|t| t.to_lp() >= Decimal::ZERO && t.to_gp() >= Decimal::ZERO));
            prop_assert!(ev.state_after.unreturned_capital >= Decimal::ZERO);
            prop_assert!(ev.state_after.accrued_unpaid_preferred >= Decimal::ZERO);
        }

        let totals = &allocation.totals;
        prop_assert_eq!(totals.to_lp + totals.to_gp, totals.distributable);
        prop_assert_eq!(totals.distributable + totals.management_fees, totals.gross_distributed);
    }

    #[test]
    fn prop_later_tiers_wait_for_earlier_ones(
        pref_bp in 0u32..1500,
        catch_up_bp in 0u32..9000,
        gp_split_bp in 0u32..5000,
        first_call in 1i64..50_000_000_000,
        rest in prop::collection::vec((0u64..900, -20_000_000_000i64..60_000_000_000), 1..12)
    ) {
        let terms = TermSet::new(
            Decimal::ZERO,
            bp(pref_bp),
            bp(catch_up_bp),
            Decimal::ONE - bp(gp_split_bp),
            bp(gp_split_bp),
        )
        .unwrap();
        let schedule = build_schedule(first_call, &rest);
        let allocation = allocate_schedule(&terms, &schedule).unwrap();

        for ev in &allocation.events {
            let past_preferred = ev.tiers.iter().any(|t| match t {
                TierAllocation::GpCatchUp { amount } => *amount > Decimal::ZERO,
                TierAllocation::CarriedInterest { lp_amount, gp_amount } => {
                    *lp_amount + *gp_amount > Decimal::ZERO
                }
                _ => false,
            });
            if past_preferred {
                prop_assert_eq!(ev.state_after.unreturned_capital, Decimal::ZERO);
                prop_assert_eq!(ev.state_after.accrued_unpaid_preferred, Decimal::ZERO);
            }

            // Carry is only reached once this event has met the catch-up in full
            let carry = match ev.tiers[3] {
                TierAllocation::CarriedInterest { lp_amount, gp_amount } => lp_amount + gp_amount,
                _ => Decimal::ZERO,
            };
            if carry > Decimal::ZERO {
                prop_assert_eq!(
                    &ev.tiers[2],
                    &TierAllocation::GpCatchUp { amount: ev.catch_up_target }
                );
            }
        }

        // Catch-up never overshoots its share of profit distributed so far
        let totals = &allocation.totals;
        let cap = terms.catch_up_ratio() * totals.preferred_return;
        prop_assert!(totals.gp_catch_up <= cap + dec!(0.000001));
    }

    #[test]
    fn prop_break_even_schedule_pays_no_carry(
        pref_bp in 0u32..1500,
        catch_up_bp in 0u32..9000,
        gp_split_bp in 0u32..5000,
        steps in prop::collection::vec(
            (0u64..400, 1i64..20_000_000_000, 0u64..900, 0u32..=10_000),
            1..6
        ),
        final_gap in 0u64..900
    ) {
        let terms = TermSet::new(
            Decimal::ZERO,
            bp(pref_bp),
            bp(catch_up_bp),
            Decimal::ONE - bp(gp_split_bp),
            bp(gp_split_bp),
        )
        .unwrap();
        let schedule = break_even_schedule(&steps, final_gap);
        prop_assert_eq!(schedule.total_distributions().unwrap(), schedule.total_contributions().unwrap());

        let allocation = allocate_schedule(&terms, &schedule).unwrap();
        let totals = &allocation.totals;
        prop_assert_eq!(totals.return_of_capital, totals.contributed);
        prop_assert_eq!(totals.preferred_return, Decimal::ZERO);
        prop_assert_eq!(totals.gp_catch_up, Decimal::ZERO);
        prop_assert_eq!(totals.carried_interest_lp, Decimal::ZERO);
        prop_assert_eq!(totals.carried_interest_gp, Decimal::ZERO);
        prop_assert_eq!(totals.to_gp, Decimal::ZERO);
        prop_assert_eq!(allocation.closing_state.unreturned_capital, Decimal::ZERO);
    }
}

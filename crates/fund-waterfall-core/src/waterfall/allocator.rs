use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{FundWaterfallError, ValidationKind};
use crate::terms::TermSet;
use crate::types::{checked_add, Money};
use crate::waterfall::accrual::PreferredReturnAccrual;
use crate::FundWaterfallResult;

// ---------------------------------------------------------------------------
// Tier allocations
// ---------------------------------------------------------------------------

/// Cash paid out by one tier of the waterfall for one distribution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "tier", rename_all = "snake_case")]
pub enum TierAllocation {
    /// Tier 1: contributed capital back to LPs
    ReturnOfCapital { amount: Money },
    /// Tier 2: accrued preferred return to LPs
    PreferredReturn { amount: Money },
    /// Tier 3: GP catch-up
    GpCatchUp { amount: Money },
    /// Tier 4: residual split
    CarriedInterest { lp_amount: Money, gp_amount: Money },
}

impl TierAllocation {
    pub fn name(&self) -> &'static str {
        match self {
            TierAllocation::ReturnOfCapital { .. } => "Return of Capital",
            TierAllocation::PreferredReturn { .. } => "Preferred Return",
            TierAllocation::GpCatchUp { .. } => "GP Catch-Up",
            TierAllocation::CarriedInterest { .. } => "Carried Interest",
        }
    }

    pub fn to_lp(&self) -> Money {
        match self {
            TierAllocation::ReturnOfCapital { amount }
            | TierAllocation::PreferredReturn { amount } => *amount,
            TierAllocation::GpCatchUp { .. } => Decimal::ZERO,
            TierAllocation::CarriedInterest { lp_amount, .. } => *lp_amount,
        }
    }

    pub fn to_gp(&self) -> Money {
        match self {
            TierAllocation::ReturnOfCapital { .. } | TierAllocation::PreferredReturn { .. } => {
                Decimal::ZERO
            }
            TierAllocation::GpCatchUp { amount } => *amount,
            TierAllocation::CarriedInterest { gp_amount, .. } => *gp_amount,
        }
    }

    pub fn total(&self) -> Money {
        self.to_lp() + self.to_gp()
    }
}

// ---------------------------------------------------------------------------
// Allocator
// ---------------------------------------------------------------------------

/// Whole-fund (European) waterfall allocator.
///
/// Keeps the cumulative preferred and catch-up paid across the schedule,
/// which the catch-up tier needs; capital and preferred balances live in the
/// [`PreferredReturnAccrual`] passed to [`allocate`](Self::allocate).
#[derive(Debug, Clone)]
pub struct WaterfallAllocator<'a> {
    terms: &'a TermSet,
    preferred_paid: Money,
    catch_up_paid: Money,
    carried_lp: Money,
    carried_gp: Money,
    /// Catch-up owed once the latest distribution had filled tier 2
    catch_up_due: Money,
}

impl<'a> WaterfallAllocator<'a> {
    pub fn new(terms: &'a TermSet) -> Self {
        Self {
            terms,
            preferred_paid: Decimal::ZERO,
            catch_up_paid: Decimal::ZERO,
            carried_lp: Decimal::ZERO,
            carried_gp: Decimal::ZERO,
            catch_up_due: Decimal::ZERO,
        }
    }

    /// Catch-up still owed to the GP given the preferred paid so far.
    ///
    /// A target past decimal range exceeds any cash on hand, so it saturates.
    pub fn catch_up_target(&self) -> Money {
        let owed = self
            .terms
            .catch_up_ratio()
            .checked_mul(self.preferred_paid)
            .unwrap_or(Decimal::MAX);
        (owed - self.catch_up_paid).max(Decimal::ZERO)
    }

    /// Catch-up target as it stood when the latest distribution reached tier 3.
    pub fn catch_up_due(&self) -> Money {
        self.catch_up_due
    }

    pub fn preferred_paid(&self) -> Money {
        self.preferred_paid
    }

    pub fn catch_up_paid(&self) -> Money {
        self.catch_up_paid
    }

    pub fn carried_interest_lp(&self) -> Money {
        self.carried_lp
    }

    pub fn carried_interest_gp(&self) -> Money {
        self.carried_gp
    }

    /// Run `cash` through the four tiers in order.
    ///
    /// Always returns four allocations; tiers the cash never reaches carry a
    /// zero amount. Pays down `accrual` as tiers 1 and 2 are filled.
    pub fn allocate(
        &mut self,
        cash: Money,
        accrual: &mut PreferredReturnAccrual,
    ) -> FundWaterfallResult<Vec<TierAllocation>> {
        if cash < Decimal::ZERO {
            return Err(FundWaterfallError::validation(
                ValidationKind::NegativeDistribution,
                "distributable_cash",
                format!("Distributable cash cannot be negative, got {cash}"),
            ));
        }

        let mut remaining = cash;

        // Tier 1: return of capital
        let roc = remaining.min(accrual.unreturned_capital());
        accrual.return_capital(roc)?;
        remaining -= roc;

        // Tier 2: preferred return
        let pref = remaining.min(accrual.accrued_unpaid_preferred());
        accrual.pay_preferred(pref)?;
        self.preferred_paid = checked_add(self.preferred_paid, pref, "waterfall allocation")?;
        remaining -= pref;

        // Tier 3: GP catch-up, sized on preferred paid including this event
        self.catch_up_due = self.catch_up_target();
        let catch_up = remaining.min(self.catch_up_due);
        self.catch_up_paid = checked_add(self.catch_up_paid, catch_up, "waterfall allocation")?;
        remaining -= catch_up;

        // Tier 4: residual split
        let gp_amount = remaining * self.terms.gp_residual_split();
        let lp_amount = remaining - gp_amount;
        self.carried_lp = checked_add(self.carried_lp, lp_amount, "waterfall allocation")?;
        self.carried_gp = checked_add(self.carried_gp, gp_amount, "waterfall allocation")?;

        tracing::debug!(
            %cash,
            %roc,
            %pref,
            %catch_up,
            %lp_amount,
            %gp_amount,
            "allocated distribution"
        );

        Ok(vec![
            TierAllocation::ReturnOfCapital { amount: roc },
            TierAllocation::PreferredReturn { amount: pref },
            TierAllocation::GpCatchUp { amount: catch_up },
            TierAllocation::CarriedInterest {
                lp_amount,
                gp_amount,
            },
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Days, NaiveDate};
    use rust_decimal_macros::dec;

    fn terms() -> TermSet {
        TermSet::new(dec!(0), dec!(0.08), dec!(0.20), dec!(0.80), dec!(0.20)).unwrap()
    }

    fn funded_accrual(capital: Money, days: u64) -> PreferredReturnAccrual {
        let t0 = NaiveDate::from_ymd_opt(2021, 1, 1).unwrap();
        let mut acc = PreferredReturnAccrual::new(dec!(0.08));
        acc.advance_to(t0).unwrap();
        acc.contribute(capital).unwrap();
        acc.advance_to(t0.checked_add_days(Days::new(days)).unwrap())
            .unwrap();
        acc
    }

    #[test]
    fn test_full_four_tier_allocation() {
        let terms = terms();
        let mut alloc = WaterfallAllocator::new(&terms);
        let mut acc = funded_accrual(dec!(100_000_000), 1095);

        let tiers = alloc.allocate(dec!(150_000_000), &mut acc).unwrap();
        assert_eq!(
            tiers,
            vec![
                TierAllocation::ReturnOfCapital {
                    amount: dec!(100_000_000)
                },
                TierAllocation::PreferredReturn {
                    amount: dec!(25_971_200)
                },
                TierAllocation::GpCatchUp {
                    amount: dec!(6_492_800)
                },
                TierAllocation::CarriedInterest {
                    lp_amount: dec!(14_028_800),
                    gp_amount: dec!(3_507_200),
                },
            ]
        );
        assert_eq!(alloc.catch_up_paid() + alloc.carried_interest_gp(), dec!(10_000_000));
        assert_eq!(acc.unreturned_capital(), Decimal::ZERO);
        assert_eq!(acc.accrued_unpaid_preferred(), Decimal::ZERO);
    }

    #[test]
    fn test_partial_return_of_capital_zeroes_later_tiers() {
        let terms = terms();
        let mut alloc = WaterfallAllocator::new(&terms);
        let mut acc = funded_accrual(dec!(100), 365);

        let tiers = alloc.allocate(dec!(60), &mut acc).unwrap();
        assert_eq!(tiers.len(), 4);
        assert_eq!(tiers[0].total(), dec!(60));
        for t in &tiers[1..] {
            assert_eq!(t.total(), Decimal::ZERO);
        }
        assert_eq!(acc.unreturned_capital(), dec!(40));
        assert_eq!(acc.accrued_unpaid_preferred(), dec!(8));
    }

    #[test]
    fn test_catch_up_is_cumulative_across_events() {
        let terms = terms();
        let mut alloc = WaterfallAllocator::new(&terms);
        let mut acc = funded_accrual(dec!(100), 365);

        // First event covers capital and pref (8) and 1 of the 2 catch-up
        let first = alloc.allocate(dec!(109), &mut acc).unwrap();
        assert_eq!(first[2], TierAllocation::GpCatchUp { amount: dec!(1) });
        assert_eq!(alloc.catch_up_due(), dec!(2));
        assert_eq!(alloc.catch_up_target(), dec!(1));

        // Second event finishes the catch-up before any residual split
        let second = alloc.allocate(dec!(11), &mut acc).unwrap();
        assert_eq!(second[0].total(), Decimal::ZERO);
        assert_eq!(second[1].total(), Decimal::ZERO);
        assert_eq!(second[2], TierAllocation::GpCatchUp { amount: dec!(1) });
        assert_eq!(alloc.catch_up_due(), dec!(1));
        assert_eq!(
            second[3],
            TierAllocation::CarriedInterest {
                lp_amount: dec!(8),
                gp_amount: dec!(2),
            }
        );
        assert_eq!(alloc.catch_up_target(), Decimal::ZERO);
    }

    #[test]
    fn test_zero_cash_emits_four_zero_tiers() {
        let terms = terms();
        let mut alloc = WaterfallAllocator::new(&terms);
        let mut acc = funded_accrual(dec!(100), 365);
        let tiers = alloc.allocate(Decimal::ZERO, &mut acc).unwrap();
        assert_eq!(tiers.len(), 4);
        assert!(tiers.iter().all(|t| t.total().is_zero()));
    }

    #[test]
    fn test_negative_cash_rejected() {
        let terms = terms();
        let mut alloc = WaterfallAllocator::new(&terms);
        let mut acc = funded_accrual(dec!(100), 365);
        let err = alloc.allocate(dec!(-1), &mut acc).unwrap_err();
        assert_eq!(err.validation_kind(), Some(ValidationKind::NegativeDistribution));
    }

    #[test]
    fn test_zero_catch_up_share_skips_to_split() {
        let terms = TermSet::new(dec!(0), dec!(0.08), dec!(0), dec!(0.8), dec!(0.2)).unwrap();
        let mut alloc = WaterfallAllocator::new(&terms);
        let mut acc = funded_accrual(dec!(100), 365);
        let tiers = alloc.allocate(dec!(118), &mut acc).unwrap();
        assert_eq!(tiers[2].total(), Decimal::ZERO);
        assert_eq!(
            tiers[3],
            TierAllocation::CarriedInterest {
                lp_amount: dec!(8),
                gp_amount: dec!(2),
            }
        );
    }

    #[test]
    fn test_tier_serialization_tag() {
        let json = serde_json::to_value(TierAllocation::GpCatchUp { amount: dec!(5) }).unwrap();
        assert_eq!(json["tier"], "gp_catch_up");
        assert_eq!(json["amount"], "5");
    }
}

use chrono::{Days, NaiveDate};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{FundWaterfallError, ValidationKind};
use crate::types::{checked_add, Money, DAYS_PER_YEAR};
use crate::FundWaterfallResult;

/// A dated, signed cash movement between the LPs and the fund.
///
/// Negative amounts are capital calls; positive amounts are gross cash
/// available for distribution on that date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CashFlowEvent {
    pub date: NaiveDate,
    pub amount: Money,
}

impl CashFlowEvent {
    pub fn new(date: NaiveDate, amount: Money) -> Self {
        Self { date, amount }
    }

    pub fn is_contribution(&self) -> bool {
        self.amount < Decimal::ZERO
    }
}

/// Validated, date-ordered cash-flow schedule for one fund.
///
/// Events sharing a date are kept in input order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CashFlowSchedule {
    events: Vec<CashFlowEvent>,
}

impl CashFlowSchedule {
    pub fn new(events: Vec<CashFlowEvent>) -> FundWaterfallResult<Self> {
        if events.is_empty() {
            return Err(FundWaterfallError::validation(
                ValidationKind::EmptySchedule,
                "cashflows",
                "At least one cash flow is required",
            ));
        }

        for (i, pair) in events.windows(2).enumerate() {
            if pair[1].date < pair[0].date {
                return Err(FundWaterfallError::validation(
                    ValidationKind::UnorderedCashFlows,
                    format!("cashflows[{}]", i + 1),
                    format!(
                        "Cash flow dated {} precedes the previous event dated {}",
                        pair[1].date, pair[0].date
                    ),
                ));
            }
        }

        Ok(Self { events })
    }

    /// Build a schedule from equal annual periods: `amounts[i]` falls
    /// `365 * i` days after `start`.
    pub fn from_periodic(start: NaiveDate, amounts: &[Money]) -> FundWaterfallResult<Self> {
        let events = amounts
            .iter()
            .enumerate()
            .map(|(i, amount)| {
                let offset = DAYS_PER_YEAR as u64 * i as u64;
                start
                    .checked_add_days(Days::new(offset))
                    .map(|date| CashFlowEvent::new(date, *amount))
                    .ok_or_else(|| {
                        FundWaterfallError::validation(
                            ValidationKind::UnorderedCashFlows,
                            format!("cashflows[{i}]"),
                            "Period date is out of the supported calendar range",
                        )
                    })
            })
            .collect::<FundWaterfallResult<Vec<_>>>()?;
        Self::new(events)
    }

    pub fn events(&self) -> &[CashFlowEvent] {
        &self.events
    }

    pub fn first_date(&self) -> NaiveDate {
        self.events[0].date
    }

    /// Sum of capital calls as a positive amount.
    pub fn total_contributions(&self) -> FundWaterfallResult<Money> {
        self.events
            .iter()
            .filter(|e| e.is_contribution())
            .try_fold(Decimal::ZERO, |acc, e| checked_add(acc, -e.amount, "schedule totals"))
    }

    /// Sum of gross distributions (before fees).
    pub fn total_distributions(&self) -> FundWaterfallResult<Money> {
        self.events
            .iter()
            .filter(|e| !e.is_contribution())
            .try_fold(Decimal::ZERO, |acc, e| checked_add(acc, e.amount, "schedule totals"))
    }

    /// `(date, amount)` pairs for the solver.
    pub fn dated_amounts(&self) -> Vec<(NaiveDate, Money)> {
        self.events.iter().map(|e| (e.date, e.amount)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn test_schedule_totals() {
        let s = CashFlowSchedule::new(vec![
            CashFlowEvent::new(d(2021, 1, 1), dec!(-60)),
            CashFlowEvent::new(d(2021, 6, 1), dec!(-40)),
            CashFlowEvent::new(d(2023, 1, 1), dec!(150)),
        ])
        .unwrap();
        assert_eq!(s.total_contributions().unwrap(), dec!(100));
        assert_eq!(s.total_distributions().unwrap(), dec!(150));
        assert_eq!(s.first_date(), d(2021, 1, 1));
    }

    #[test]
    fn test_same_date_events_allowed() {
        let s = CashFlowSchedule::new(vec![
            CashFlowEvent::new(d(2021, 1, 1), dec!(-100)),
            CashFlowEvent::new(d(2021, 1, 1), dec!(-50)),
        ]);
        assert!(s.is_ok());
    }

    #[test]
    fn test_unordered_rejected() {
        let err = CashFlowSchedule::new(vec![
            CashFlowEvent::new(d(2022, 1, 1), dec!(-100)),
            CashFlowEvent::new(d(2021, 1, 1), dec!(120)),
        ])
        .unwrap_err();
        assert_eq!(err.validation_kind(), Some(ValidationKind::UnorderedCashFlows));
    }

    #[test]
    fn test_empty_rejected() {
        let err = CashFlowSchedule::new(vec![]).unwrap_err();
        assert_eq!(err.validation_kind(), Some(ValidationKind::EmptySchedule));
    }

    #[test]
    fn test_distributions_only_accepted() {
        // Sign checks belong to the solver and the waterfall runner
        let s = CashFlowSchedule::new(vec![
            CashFlowEvent::new(d(2022, 1, 1), dec!(10)),
            CashFlowEvent::new(d(2023, 1, 1), dec!(5)),
        ])
        .unwrap();
        assert_eq!(s.total_contributions().unwrap(), Decimal::ZERO);
        assert_eq!(s.total_distributions().unwrap(), dec!(15));
    }

    #[test]
    fn test_periodic_spacing() {
        let s = CashFlowSchedule::from_periodic(
            d(2021, 1, 1),
            &[dec!(-1000), dec!(100), dec!(1200)],
        )
        .unwrap();
        let days: Vec<i64> = s
            .events()
            .iter()
            .map(|e| (e.date - s.first_date()).num_days())
            .collect();
        assert_eq!(days, vec![0, 365, 730]);
    }
}

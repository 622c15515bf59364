//! Preferred-return accrual.
//!
//! The preferred return compounds annually on an actual/365 basis and is
//! accrued piecewise between every balance-changing event:
//!
//! ```text
//! increment = (unreturned_capital + accrued_unpaid_preferred)
//!             * ((1 + pref)^(days / 365) - 1)
//! ```
//!
//! Unpaid preferred is part of the compounding base, so splitting a period
//! at an intervening event never changes the compounded amount (beyond
//! rounding each increment to `MONEY_DP` places).

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{FundWaterfallError, ValidationKind};
use crate::time_value::compound_factor;
use crate::types::{checked_add, checked_mul, Money, Rate, MONEY_DP};
use crate::FundWaterfallResult;

/// Capital and preferred-return balances owed to LPs as of a date.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccrualState {
    /// Last accrual checkpoint; `None` before the first event
    pub as_of: Option<NaiveDate>,
    /// Contributed capital not yet returned to LPs
    pub unreturned_capital: Money,
    /// Preferred return compounded but not yet paid
    pub accrued_unpaid_preferred: Money,
}

/// Forward-only accrual of the preferred return over a schedule.
#[derive(Debug, Clone)]
pub struct PreferredReturnAccrual {
    rate: Rate,
    state: AccrualState,
}

impl PreferredReturnAccrual {
    pub fn new(rate: Rate) -> Self {
        Self {
            rate,
            state: AccrualState::default(),
        }
    }

    pub fn state(&self) -> &AccrualState {
        &self.state
    }

    pub fn unreturned_capital(&self) -> Money {
        self.state.unreturned_capital
    }

    pub fn accrued_unpaid_preferred(&self) -> Money {
        self.state.accrued_unpaid_preferred
    }

    /// Accrue up to `date` and move the checkpoint there.
    ///
    /// Returns the preferred return accrued over the period. A date before
    /// the current checkpoint is rejected; the same date accrues nothing.
    pub fn advance_to(&mut self, date: NaiveDate) -> FundWaterfallResult<Money> {
        let Some(prev) = self.state.as_of else {
            self.state.as_of = Some(date);
            return Ok(Decimal::ZERO);
        };

        let days = (date - prev).num_days();
        if days < 0 {
            return Err(FundWaterfallError::validation(
                ValidationKind::UnorderedCashFlows,
                "date",
                format!("Cannot accrue backwards from {prev} to {date}"),
            ));
        }

        self.state.as_of = Some(date);

        let base = checked_add(
            self.state.unreturned_capital,
            self.state.accrued_unpaid_preferred,
            "preferred accrual",
        )?;
        if days == 0 || base.is_zero() || self.rate.is_zero() {
            return Ok(Decimal::ZERO);
        }

        let growth = compound_factor(self.rate, days)? - Decimal::ONE;
        let increment = checked_mul(base, growth, "preferred accrual")?.round_dp(MONEY_DP);
        self.state.accrued_unpaid_preferred =
            checked_add(self.state.accrued_unpaid_preferred, increment, "preferred accrual")?;
        Ok(increment)
    }

    /// Record a capital call of `amount` (positive) at the current checkpoint.
    pub fn contribute(&mut self, amount: Money) -> FundWaterfallResult<()> {
        if amount < Decimal::ZERO {
            return Err(FundWaterfallError::validation(
                ValidationKind::NegativeDistribution,
                "contribution",
                format!("Capital call amount must be positive, got {amount}"),
            ));
        }
        self.state.unreturned_capital =
            checked_add(self.state.unreturned_capital, amount, "capital call")?;
        Ok(())
    }

    /// Pay down unreturned capital by a return-of-capital allocation.
    pub fn return_capital(&mut self, amount: Money) -> FundWaterfallResult<()> {
        if amount < Decimal::ZERO {
            return Err(FundWaterfallError::validation(
                ValidationKind::NegativeDistribution,
                "return_of_capital",
                format!("Return of capital cannot be negative, got {amount}"),
            ));
        }
        if amount > self.state.unreturned_capital {
            return Err(FundWaterfallError::validation(
                ValidationKind::CapitalOverreturn,
                "return_of_capital",
                format!(
                    "Returning {amount} exceeds unreturned capital {}",
                    self.state.unreturned_capital
                ),
            ));
        }
        self.state.unreturned_capital -= amount;
        Ok(())
    }

    /// Pay down accrued preferred return.
    pub fn pay_preferred(&mut self, amount: Money) -> FundWaterfallResult<()> {
        if amount < Decimal::ZERO {
            return Err(FundWaterfallError::validation(
                ValidationKind::NegativeDistribution,
                "preferred_return",
                format!("Preferred payment cannot be negative, got {amount}"),
            ));
        }
        if amount > self.state.accrued_unpaid_preferred {
            return Err(FundWaterfallError::validation(
                ValidationKind::PreferredOverpayment,
                "preferred_return",
                format!(
                    "Paying {amount} exceeds accrued preferred {}",
                    self.state.accrued_unpaid_preferred
                ),
            ));
        }
        self.state.accrued_unpaid_preferred -= amount;
        Ok(())
    }
}

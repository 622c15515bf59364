use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{FundWaterfallError, ValidationKind};
use crate::types::{checked_add, checked_mul, Money, Rate, DAYS_PER_YEAR, MONEY_DP};
use crate::FundWaterfallResult;

/// Outcome of taking the management fee out of one gross distribution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeDeduction {
    pub gross: Money,
    pub fee_paid: Money,
    /// Cash left for the waterfall
    pub distributable: Money,
}

/// Simple-interest management fee on invested capital.
///
/// The fee accrues at `rate * days / 365` on the capital still at work and
/// is settled out of gross distributions before tier 1. Any fee a
/// distribution cannot cover carries forward to the next one.
#[derive(Debug, Clone)]
pub struct ManagementFeeAccrual {
    rate: Rate,
    as_of: Option<NaiveDate>,
    accrued_unpaid: Money,
    total_paid: Money,
}

impl ManagementFeeAccrual {
    pub fn new(rate: Rate) -> Self {
        Self {
            rate,
            as_of: None,
            accrued_unpaid: Decimal::ZERO,
            total_paid: Decimal::ZERO,
        }
    }

    /// Accrue the fee on `invested_capital` up to `date`.
    pub fn advance_to(
        &mut self,
        date: NaiveDate,
        invested_capital: Money,
    ) -> FundWaterfallResult<Money> {
        let Some(prev) = self.as_of else {
            self.as_of = Some(date);
            return Ok(Decimal::ZERO);
        };

        let days = (date - prev).num_days();
        if days < 0 {
            return Err(FundWaterfallError::validation(
                ValidationKind::UnorderedCashFlows,
                "date",
                format!("Cannot accrue fees backwards from {prev} to {date}"),
            ));
        }
        self.as_of = Some(date);

        let annual = checked_mul(invested_capital, self.rate, "management fee")?;
        let fee = (checked_mul(annual, Decimal::from(days), "management fee")?
            / Decimal::from(DAYS_PER_YEAR))
        .round_dp(MONEY_DP);
        self.accrued_unpaid = checked_add(self.accrued_unpaid, fee, "management fee")?;
        Ok(fee)
    }

    /// Settle as much accrued fee as `gross` covers.
    pub fn deduct(&mut self, gross: Money) -> FundWaterfallResult<FeeDeduction> {
        if gross < Decimal::ZERO {
            return Err(FundWaterfallError::validation(
                ValidationKind::NegativeDistribution,
                "gross_distribution",
                format!("Gross distribution cannot be negative, got {gross}"),
            ));
        }
        let fee_paid = gross.min(self.accrued_unpaid);
        self.accrued_unpaid -= fee_paid;
        self.total_paid = checked_add(self.total_paid, fee_paid, "management fee")?;
        Ok(FeeDeduction {
            gross,
            fee_paid,
            distributable: gross - fee_paid,
        })
    }

    pub fn accrued_unpaid(&self) -> Money {
        self.accrued_unpaid
    }

    pub fn total_paid(&self) -> Money {
        self.total_paid
    }
}

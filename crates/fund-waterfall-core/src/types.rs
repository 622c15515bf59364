use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::FundWaterfallError;
use crate::FundWaterfallResult;

/// All monetary values. Wraps Decimal to prevent accidental f64 usage.
pub type Money = Decimal;

/// Rates expressed as decimals (0.08 = 8%). Never as percentages.
pub type Rate = Decimal;

/// Multiples (e.g., 1.4x MOIC)
pub type Multiple = Decimal;

/// Year fractions or counts
pub type Years = Decimal;

/// Day-count basis for accrual and discounting (actual/365).
pub const DAYS_PER_YEAR: i64 = 365;

/// Scale that accrued fee and preferred-return amounts are rounded to, so
/// tier sums stay exact in 96-bit decimal arithmetic.
pub const MONEY_DP: u32 = 10;

/// `a + b`, or an `Overflow` error naming `function`.
pub(crate) fn checked_add(a: Decimal, b: Decimal, function: &str) -> FundWaterfallResult<Decimal> {
    a.checked_add(b).ok_or_else(|| {
        FundWaterfallError::overflow(function, format!("{a} + {b} is out of decimal range"))
    })
}

/// `a * b`, or an `Overflow` error naming `function`.
pub(crate) fn checked_mul(a: Decimal, b: Decimal, function: &str) -> FundWaterfallResult<Decimal> {
    a.checked_mul(b).ok_or_else(|| {
        FundWaterfallError::overflow(function, format!("{a} * {b} is out of decimal range"))
    })
}

/// One point of a party's realised cash-flow series.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CashFlowPoint {
    pub date: NaiveDate,
    /// Signed flow from the party's perspective (negative = paid in)
    pub amount: Money,
    /// Running total of `amount` up to and including this point
    pub cumulative: Money,
}

/// Append-only builder for a cumulative cash-flow series.
#[derive(Debug, Clone, Default)]
pub(crate) struct SeriesBuilder {
    points: Vec<CashFlowPoint>,
    running: Money,
}

impl SeriesBuilder {
    pub(crate) fn push(&mut self, date: NaiveDate, amount: Money) -> FundWaterfallResult<()> {
        self.running = checked_add(self.running, amount, "cash-flow series")?;
        self.points.push(CashFlowPoint {
            date,
            amount,
            cumulative: self.running,
        });
        Ok(())
    }

    pub(crate) fn finish(self) -> Vec<CashFlowPoint> {
        self.points
    }
}

/// Standard computation output envelope
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComputationOutput<T: Serialize> {
    pub result: T,
    pub methodology: String,
    pub assumptions: serde_json::Value,
    pub warnings: Vec<String>,
    pub metadata: ComputationMetadata,
}

/// Metadata for every computation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComputationMetadata {
    pub version: String,
    pub computation_time_us: u64,
    pub precision: String,
}

/// Helper to wrap computation results with metadata
pub fn with_metadata<T: Serialize>(
    methodology: &str,
    assumptions: &impl Serialize,
    warnings: Vec<String>,
    elapsed_us: u64,
    result: T,
) -> ComputationOutput<T> {
    ComputationOutput {
        result,
        methodology: methodology.to_string(),
        assumptions: serde_json::to_value(assumptions).unwrap_or_default(),
        warnings,
        metadata: ComputationMetadata {
            version: env!("CARGO_PKG_VERSION").to_string(),
            computation_time_us: elapsed_us,
            precision: "rust_decimal_128bit".to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_series_builder_cumulates() {
        let d = NaiveDate::from_ymd_opt(2021, 1, 1).unwrap();
        let mut b = SeriesBuilder::default();
        b.push(d, dec!(-100)).unwrap();
        b.push(d, dec!(30)).unwrap();
        b.push(d, dec!(90)).unwrap();
        let pts = b.finish();
        assert_eq!(pts.len(), 3);
        assert_eq!(pts[0].cumulative, dec!(-100));
        assert_eq!(pts[1].cumulative, dec!(-70));
        assert_eq!(pts[2].cumulative, dec!(20));
    }

    #[test]
    fn test_checked_helpers_report_overflow() {
        let err = checked_mul(Decimal::MAX, dec!(2), "test").unwrap_err();
        assert_eq!(err.numerical_kind(), Some(crate::error::NumericalKind::Overflow));
        let err = checked_add(Decimal::MAX, Decimal::ONE, "test").unwrap_err();
        assert_eq!(err.numerical_kind(), Some(crate::error::NumericalKind::Overflow));
        assert_eq!(checked_add(dec!(1.5), dec!(2), "test").unwrap(), dec!(3.5));
    }

    #[test]
    fn test_with_metadata_envelope() {
        let out = with_metadata(
            "test",
            &serde_json::json!({ "k": "v" }),
            vec!["w".into()],
            7,
            dec!(1.5),
        );
        assert_eq!(out.methodology, "test");
        assert_eq!(out.warnings, vec!["w".to_string()]);
        assert_eq!(out.metadata.computation_time_us, 7);
        assert_eq!(out.assumptions["k"], "v");
    }
}

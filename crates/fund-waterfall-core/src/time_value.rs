use chrono::NaiveDate;
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;
use rust_decimal::MathematicalOps;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::error::{FundWaterfallError, NumericalKind, ValidationKind};
use crate::types::{checked_add, Money, Multiple, Rate, DAYS_PER_YEAR};
use crate::FundWaterfallResult;

/// Tunables for the XIRR root finder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverConfig {
    /// Lowest rate in the initial bracket (rates at or below -100% are meaningless)
    pub lower_bound: f64,
    /// Highest rate in the initial bracket
    pub upper_bound: f64,
    /// Bisection stops once the bracket is narrower than this
    pub bracket_tolerance: f64,
    pub max_bisection_iterations: u32,
    pub max_newton_iterations: u32,
    /// Converged once |NPV| falls below this, in currency units
    pub npv_tolerance: f64,
    /// Decimal re-check: |XNPV(r)| / sum(|CF|) must not exceed this
    pub revalidation_tolerance: Decimal,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            lower_bound: -0.999,
            upper_bound: 10.0,
            bracket_tolerance: 1e-7,
            max_bisection_iterations: 100,
            max_newton_iterations: 50,
            npv_tolerance: 1e-8,
            revalidation_tolerance: dec!(0.000001),
        }
    }
}

/// A converged XIRR root.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IrrSolution {
    /// Annualised rate (0.12 = 12%)
    pub rate: Rate,
    /// Bisection plus Newton iterations spent
    pub iterations: u32,
    /// Decimal XNPV at `rate`
    pub npv_residual: Money,
}

/// `(1 + rate)^(days / 365)`.
pub fn compound_factor(rate: Rate, days: i64) -> FundWaterfallResult<Decimal> {
    let base = Decimal::ONE + rate;
    if base <= Decimal::ZERO {
        return Err(FundWaterfallError::validation(
            ValidationKind::InvalidTermRange,
            "rate",
            "Rate must be greater than -100%",
        ));
    }
    if days == 0 || rate.is_zero() {
        return Ok(Decimal::ONE);
    }
    let exponent = Decimal::from(days) / Decimal::from(DAYS_PER_YEAR);
    base.checked_powd(exponent).ok_or_else(|| {
        FundWaterfallError::numerical(
            NumericalKind::Overflow,
            "compound_factor",
            0,
            format!("(1 + {rate})^({days}/365) is out of decimal range"),
        )
    })
}

/// Net present value of dated flows, discounted to the first flow's date.
pub fn xnpv(rate: Rate, dated_flows: &[(NaiveDate, Money)]) -> FundWaterfallResult<Money> {
    let Some((base_date, _)) = dated_flows.first() else {
        return Ok(Decimal::ZERO);
    };

    let mut total = Decimal::ZERO;
    for (date, amount) in dated_flows {
        let days = (*date - *base_date).num_days();
        let discount = compound_factor(rate, days)?;
        let pv = amount.checked_div(discount).ok_or_else(|| {
            FundWaterfallError::numerical(
                NumericalKind::Overflow,
                "XNPV",
                0,
                format!("Discount factor at day {days} is out of decimal range"),
            )
        })?;
        total = checked_add(total, pv, "XNPV")?;
    }
    Ok(total)
}

/// Annualised IRR of dated flows using the default solver settings.
pub fn xirr(dated_flows: &[(NaiveDate, Money)]) -> FundWaterfallResult<Rate> {
    xirr_with(dated_flows, &SolverConfig::default()).map(|s| s.rate)
}

/// Annualised IRR of dated flows: bisection on a fixed bracket, then Newton
/// refinement guarded by that bracket.
pub fn xirr_with(
    dated_flows: &[(NaiveDate, Money)],
    config: &SolverConfig,
) -> FundWaterfallResult<IrrSolution> {
    let has_inflow = dated_flows.iter().any(|(_, a)| *a > Decimal::ZERO);
    let has_outflow = dated_flows.iter().any(|(_, a)| *a < Decimal::ZERO);
    if !(has_inflow && has_outflow) {
        return Err(FundWaterfallError::numerical(
            NumericalKind::NoSignChange,
            "XIRR",
            0,
            "Cash flows need at least one positive and one negative amount",
        ));
    }

    let points = to_year_points(dated_flows)?;
    let npv_at = |r: f64| npv_and_derivative(r, &points).0;

    let mut lo = config.lower_bound;
    let mut hi = config.upper_bound;
    let mut f_lo = npv_at(lo);
    let f_hi = npv_at(hi);

    if !f_lo.is_finite() || !f_hi.is_finite() {
        return Err(FundWaterfallError::numerical(
            NumericalKind::NotConverged,
            "XIRR",
            0,
            "NPV is not finite at the bracket ends",
        ));
    }
    if f_lo.abs() < config.npv_tolerance {
        return finish(lo, 0, dated_flows, config);
    }
    if f_hi.abs() < config.npv_tolerance {
        return finish(hi, 0, dated_flows, config);
    }
    if f_lo.signum() == f_hi.signum() {
        return Err(FundWaterfallError::numerical(
            NumericalKind::NoSignChange,
            "XIRR",
            0,
            format!("NPV does not change sign on [{lo}, {hi}]"),
        ));
    }

    let mut iterations: u32 = 0;

    // Phase 1: bisection
    for _ in 0..config.max_bisection_iterations {
        if hi - lo < config.bracket_tolerance {
            break;
        }
        let mid = 0.5 * (lo + hi);
        let f_mid = npv_at(mid);
        iterations += 1;
        if f_mid.abs() < config.npv_tolerance {
            return finish(mid, iterations, dated_flows, config);
        }
        if f_mid.signum() == f_lo.signum() {
            lo = mid;
            f_lo = f_mid;
        } else {
            hi = mid;
        }
    }
    tracing::debug!(lo, hi, iterations, "XIRR bisection phase done");

    // Phase 2: Newton inside the bracket
    let mut r = 0.5 * (lo + hi);
    for _ in 0..config.max_newton_iterations {
        let (f, df) = npv_and_derivative(r, &points);
        iterations += 1;
        if f.abs() < config.npv_tolerance {
            return finish(r, iterations, dated_flows, config);
        }
        if f.signum() == f_lo.signum() {
            lo = r;
            f_lo = f;
        } else {
            hi = r;
        }

        let newton = r - f / df;
        let next = if df == 0.0 || !newton.is_finite() || newton <= lo || newton >= hi {
            0.5 * (lo + hi)
        } else {
            newton
        };

        // Step below f64 resolution: the bracket has collapsed on the root
        if (next - r).abs() <= 4.0 * f64::EPSILON * r.abs().max(1.0) {
            return finish(next, iterations, dated_flows, config);
        }
        r = next;
    }

    Err(FundWaterfallError::numerical(
        NumericalKind::NotConverged,
        "XIRR",
        iterations,
        format!("Last estimate {r} left NPV at {}", npv_at(r)),
    ))
}

/// Convert the f64 root back to decimal and re-check it against the
/// decimal cash-flow series.
fn finish(
    rate: f64,
    iterations: u32,
    dated_flows: &[(NaiveDate, Money)],
    config: &SolverConfig,
) -> FundWaterfallResult<IrrSolution> {
    let rate_dec = Decimal::from_f64(rate)
        .map(|r| r.round_dp(12))
        .ok_or_else(|| {
            FundWaterfallError::numerical(
                NumericalKind::NotConverged,
                "XIRR",
                iterations,
                format!("Root {rate} is not representable as a decimal"),
            )
        })?;

    let residual = xnpv(rate_dec, dated_flows)?;
    let scale = dated_flows
        .iter()
        .try_fold(Decimal::ZERO, |acc, (_, a)| checked_add(acc, a.abs(), "XIRR"))?;
    // A ratio past decimal range is as far from converged as it gets
    let relative = residual.abs().checked_div(scale).unwrap_or(Decimal::MAX);
    if scale > Decimal::ZERO && relative > config.revalidation_tolerance {
        return Err(FundWaterfallError::numerical(
            NumericalKind::NotConverged,
            "XIRR",
            iterations,
            format!("Decimal XNPV at {rate_dec} is {residual}"),
        ));
    }

    tracing::debug!(%rate_dec, iterations, %residual, "XIRR converged");
    Ok(IrrSolution {
        rate: rate_dec,
        iterations,
        npv_residual: residual,
    })
}

fn to_year_points(dated_flows: &[(NaiveDate, Money)]) -> FundWaterfallResult<Vec<(f64, f64)>> {
    let base_date = dated_flows[0].0;
    dated_flows
        .iter()
        .map(|(date, amount)| {
            let years = (*date - base_date).num_days() as f64 / DAYS_PER_YEAR as f64;
            let cf = amount.to_f64().ok_or_else(|| {
                FundWaterfallError::numerical(
                    NumericalKind::Overflow,
                    "XIRR",
                    0,
                    format!("Amount {amount} does not fit in f64"),
                )
            })?;
            Ok((years, cf))
        })
        .collect()
}

/// NPV and its analytic derivative with respect to the rate.
fn npv_and_derivative(rate: f64, points: &[(f64, f64)]) -> (f64, f64) {
    let base = 1.0 + rate;
    let mut npv = 0.0;
    let mut dnpv = 0.0;
    for &(t, cf) in points {
        let discounted = cf * base.powf(-t);
        npv += discounted;
        dnpv -= t * discounted / base;
    }
    (npv, dnpv)
}

/// Multiple on invested capital: total inflows over total outflows.
pub fn moic(cash_flows: &[Money]) -> FundWaterfallResult<Multiple> {
    let mut contributed = Decimal::ZERO;
    let mut distributed = Decimal::ZERO;
    for cf in cash_flows {
        if cf.is_sign_negative() {
            contributed = checked_add(contributed, cf.abs(), "MOIC")?;
        } else {
            distributed = checked_add(distributed, *cf, "MOIC")?;
        }
    }

    if contributed.is_zero() {
        return Err(FundWaterfallError::validation(
            ValidationKind::NoContributions,
            "cash_flows",
            "MOIC requires at least one contribution",
        ));
    }
    distributed.checked_div(contributed).ok_or_else(|| {
        FundWaterfallError::overflow(
            "MOIC",
            format!("{distributed} / {contributed} is out of decimal range"),
        )
    })
}

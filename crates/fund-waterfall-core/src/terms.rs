//! Fund economic terms.
//!
//! `TermsInput` is the loosely-typed shape posted by callers (every field
//! optional, UI field names). It becomes a `TermSet` only through
//! [`TermSet::try_from`], which rejects missing and out-of-range values
//! before any calculation starts.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{FundWaterfallError, ValidationKind};
use crate::types::Rate;
use crate::FundWaterfallResult;

// ---------------------------------------------------------------------------
// Validated term set
// ---------------------------------------------------------------------------

/// Validated, immutable economic terms of one fund.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TermSet {
    management_fee_rate: Rate,
    preferred_return_rate: Rate,
    gp_catch_up_target_share: Rate,
    lp_residual_split: Rate,
    gp_residual_split: Rate,
}

impl TermSet {
    /// Build a term set, validating every field.
    pub fn new(
        management_fee_rate: Rate,
        preferred_return_rate: Rate,
        gp_catch_up_target_share: Rate,
        lp_residual_split: Rate,
        gp_residual_split: Rate,
    ) -> FundWaterfallResult<Self> {
        check_annual_rate("management_fee_rate", management_fee_rate)?;
        check_annual_rate("preferred_return_rate", preferred_return_rate)?;

        if gp_catch_up_target_share < Decimal::ZERO || gp_catch_up_target_share >= Decimal::ONE {
            return Err(FundWaterfallError::validation(
                ValidationKind::InvalidCatchUpShare,
                "gp_catch_up_target_share",
                format!(
                    "Catch-up target share must be in [0, 1), got {gp_catch_up_target_share}"
                ),
            ));
        }

        for (field, split) in [
            ("lp_residual_split", lp_residual_split),
            ("gp_residual_split", gp_residual_split),
        ] {
            if split < Decimal::ZERO || split > Decimal::ONE {
                return Err(FundWaterfallError::validation(
                    ValidationKind::InvalidTermRange,
                    field,
                    format!("Residual split must be in [0, 1], got {split}"),
                ));
            }
        }

        if lp_residual_split + gp_residual_split != Decimal::ONE {
            return Err(FundWaterfallError::validation(
                ValidationKind::SplitsDoNotSumToOne,
                "lp_residual_split",
                format!(
                    "LP and GP residual splits must sum to 1, got {lp_residual_split} + {gp_residual_split}"
                ),
            ));
        }

        Ok(Self {
            management_fee_rate,
            preferred_return_rate,
            gp_catch_up_target_share,
            lp_residual_split,
            gp_residual_split,
        })
    }

    pub fn management_fee_rate(&self) -> Rate {
        self.management_fee_rate
    }

    pub fn preferred_return_rate(&self) -> Rate {
        self.preferred_return_rate
    }

    pub fn gp_catch_up_target_share(&self) -> Rate {
        self.gp_catch_up_target_share
    }

    pub fn lp_residual_split(&self) -> Rate {
        self.lp_residual_split
    }

    pub fn gp_residual_split(&self) -> Rate {
        self.gp_residual_split
    }

    /// `s / (1 - s)`: GP catch-up owed per unit of preferred return paid.
    ///
    /// Construction guarantees `s < 1`.
    pub fn catch_up_ratio(&self) -> Rate {
        self.gp_catch_up_target_share / (Decimal::ONE - self.gp_catch_up_target_share)
    }
}

fn check_annual_rate(field: &str, rate: Rate) -> FundWaterfallResult<()> {
    if rate < Decimal::ZERO || rate >= Decimal::ONE {
        return Err(FundWaterfallError::validation(
            ValidationKind::InvalidTermRange,
            field,
            format!("Annual rate must be in [0, 1), got {rate}"),
        ));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Raw input
// ---------------------------------------------------------------------------

/// Terms as posted by a caller. Field names follow the portal's `terms`
/// object; the long-form names are accepted as aliases.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TermsInput {
    #[serde(
        default,
        rename = "mgmtFee",
        alias = "managementFee",
        alias = "managementFeeRate",
        skip_serializing_if = "Option::is_none"
    )]
    pub mgmt_fee: Option<Rate>,
    #[serde(
        default,
        alias = "preferredReturnRate",
        skip_serializing_if = "Option::is_none"
    )]
    pub pref: Option<Rate>,
    #[serde(
        default,
        rename = "splitLP",
        alias = "lpResidualSplit",
        skip_serializing_if = "Option::is_none"
    )]
    pub split_lp: Option<Rate>,
    #[serde(
        default,
        rename = "splitGP",
        alias = "gpResidualSplit",
        skip_serializing_if = "Option::is_none"
    )]
    pub split_gp: Option<Rate>,
    /// Defaults to `splitGP` (full catch-up to the carry share).
    #[serde(
        default,
        rename = "catchUp",
        alias = "gpCatchUpTargetShare",
        skip_serializing_if = "Option::is_none"
    )]
    pub catch_up: Option<Rate>,
    /// Target gross IRR for the single-period mode.
    #[serde(
        default,
        rename = "grossIRR",
        alias = "grossIrr",
        skip_serializing_if = "Option::is_none"
    )]
    pub gross_irr: Option<Rate>,
}

fn required(field: &str, value: Option<Rate>) -> FundWaterfallResult<Rate> {
    value.ok_or_else(|| {
        FundWaterfallError::validation(
            ValidationKind::MissingField,
            field,
            "Required term is missing",
        )
    })
}

impl TryFrom<&TermsInput> for TermSet {
    type Error = FundWaterfallError;

    fn try_from(input: &TermsInput) -> FundWaterfallResult<Self> {
        let mgmt_fee = required("mgmtFee", input.mgmt_fee)?;
        let pref = required("pref", input.pref)?;
        let split_lp = required("splitLP", input.split_lp)?;
        let split_gp = required("splitGP", input.split_gp)?;
        let catch_up = input.catch_up.unwrap_or(split_gp);
        TermSet::new(mgmt_fee, pref, catch_up, split_lp, split_gp)
    }
}

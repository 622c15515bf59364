use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Machine-readable reason for rejecting an input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Error)]
pub enum ValidationKind {
    #[error("InvalidTermRange")]
    InvalidTermRange,
    #[error("SplitsDoNotSumToOne")]
    SplitsDoNotSumToOne,
    #[error("InvalidCatchUpShare")]
    InvalidCatchUpShare,
    #[error("MissingField")]
    MissingField,
    #[error("UnorderedCashFlows")]
    UnorderedCashFlows,
    #[error("NegativeDistribution")]
    NegativeDistribution,
    #[error("EmptySchedule")]
    EmptySchedule,
    #[error("NoContributions")]
    NoContributions,
    #[error("PreferredOverpayment")]
    PreferredOverpayment,
    #[error("CapitalOverreturn")]
    CapitalOverreturn,
    #[error("InvalidTargetIrr")]
    InvalidTargetIrr,
}

/// Machine-readable reason the numerical layer gave up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Error)]
pub enum NumericalKind {
    #[error("NoSignChange")]
    NoSignChange,
    #[error("NotConverged")]
    NotConverged,
    #[error("Overflow")]
    Overflow,
}

#[derive(Debug, Error)]
pub enum FundWaterfallError {
    #[error("Validation error [{kind}]: {field}: {reason}")]
    Validation {
        kind: ValidationKind,
        field: String,
        reason: String,
    },

    #[error("Numerical error [{kind}]: {function} after {iterations} iterations: {reason}")]
    Numerical {
        kind: NumericalKind,
        function: String,
        iterations: u32,
        reason: String,
    },

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl FundWaterfallError {
    pub(crate) fn validation(
        kind: ValidationKind,
        field: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        FundWaterfallError::Validation {
            kind,
            field: field.into(),
            reason: reason.into(),
        }
    }

    pub(crate) fn numerical(
        kind: NumericalKind,
        function: impl Into<String>,
        iterations: u32,
        reason: impl Into<String>,
    ) -> Self {
        FundWaterfallError::Numerical {
            kind,
            function: function.into(),
            iterations,
            reason: reason.into(),
        }
    }

    /// Decimal arithmetic left the representable range.
    pub(crate) fn overflow(function: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::numerical(NumericalKind::Overflow, function, 0, reason)
    }

    /// The validation kind, if this is a validation failure.
    pub fn validation_kind(&self) -> Option<ValidationKind> {
        match self {
            FundWaterfallError::Validation { kind, .. } => Some(*kind),
            _ => None,
        }
    }

    /// The numerical kind, if this is a solver failure.
    pub fn numerical_kind(&self) -> Option<NumericalKind> {
        match self {
            FundWaterfallError::Numerical { kind, .. } => Some(*kind),
            _ => None,
        }
    }

    /// Flatten into a serializable report for transport layers.
    ///
    /// Validation failures are the caller's fault (4xx); numerical and
    /// serialization failures mean the data admits no answer (5xx or
    /// "insufficient data").
    pub fn report(&self) -> ErrorReport {
        let (category, kind) = match self {
            FundWaterfallError::Validation { kind, .. } => {
                (ErrorCategory::Validation, kind.to_string())
            }
            FundWaterfallError::Numerical { kind, .. } => {
                (ErrorCategory::Numerical, kind.to_string())
            }
            FundWaterfallError::SerializationError(_) => {
                (ErrorCategory::Validation, "Serialization".to_string())
            }
        };
        ErrorReport {
            category,
            kind,
            message: self.to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    Validation,
    Numerical,
}

/// Serializable error payload handed to callers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorReport {
    pub category: ErrorCategory,
    pub kind: String,
    pub message: String,
}

impl From<serde_json::Error> for FundWaterfallError {
    fn from(e: serde_json::Error) -> Self {
        FundWaterfallError::SerializationError(e.to_string())
    }
}

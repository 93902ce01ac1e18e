//! Ledger error types.

use thiserror::Error;

use super::types::TransactionKind;
use crate::points::PointsError;

/// Errors that can occur while planning or applying a points movement.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum LedgerError {
    // ========== Validation Errors ==========
    /// A movement must change the balance.
    #[error("Points movement cannot be zero")]
    ZeroDelta,

    /// The delta's sign is not allowed for the transaction kind.
    #[error("A {kind} movement cannot carry {delta} points")]
    WrongSign {
        /// Kind of the movement.
        kind: TransactionKind,
        /// Offending delta.
        delta: i64,
    },

    /// Redemption or negative adjustment would overdraw the wallet.
    #[error("Insufficient points: balance {balance}, requested {requested}")]
    InsufficientPoints {
        /// Current balance.
        balance: i64,
        /// Points requested.
        requested: i64,
    },

    /// Adjustments must say why.
    #[error("Adjustments require a reason")]
    MissingReason,

    /// Points calculation failed.
    #[error(transparent)]
    Points(#[from] PointsError),

    /// Arithmetic left the `i64` range.
    #[error("Points balance overflowed")]
    Overflow,

    // ========== Consistency Errors ==========
    /// A ledger line's stored running balance does not follow from its predecessor.
    #[error("Running balance mismatch: expected {expected}, recorded {recorded}")]
    RunningBalanceMismatch {
        /// Balance derived from the previous line.
        expected: i64,
        /// Balance stored on the line.
        recorded: i64,
    },

    // ========== Concurrency Errors ==========
    /// The wallet changed between read and write.
    #[error("Concurrent modification detected, please retry")]
    ConcurrentModification,
}

impl LedgerError {
    /// Returns the error code for API responses.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::ZeroDelta => "ZERO_DELTA",
            Self::WrongSign { .. } => "WRONG_SIGN",
            Self::InsufficientPoints { .. } => "INSUFFICIENT_POINTS",
            Self::MissingReason => "MISSING_REASON",
            Self::Points(_) => "INVALID_POINTS",
            Self::Overflow => "POINTS_OVERFLOW",
            Self::RunningBalanceMismatch { .. } => "RUNNING_BALANCE_MISMATCH",
            Self::ConcurrentModification => "CONCURRENT_MODIFICATION",
        }
    }

    /// Returns the HTTP status code for this error.
    #[must_use]
    pub fn http_status_code(&self) -> u16 {
        match self {
            // 400 Bad Request - malformed movements
            Self::ZeroDelta
            | Self::WrongSign { .. }
            | Self::MissingReason
            | Self::Points(_)
            | Self::Overflow => 400,

            // 422 - well-formed but not allowed by the wallet state
            Self::InsufficientPoints { .. } => 422,

            // 409 Conflict - concurrency errors
            Self::ConcurrentModification => 409,

            // 500 - stored data is inconsistent
            Self::RunningBalanceMismatch { .. } => 500,
        }
    }

    /// Returns true if this error is retryable.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::ConcurrentModification)
    }
}

//! What a retried movement must repeat to be treated as the same request.
//!
//! A purchase is identified by its amount rather than its points: the
//! multiplier is read from the customer's profile at posting time and may
//! have changed since.

use rust_decimal::Decimal;

use super::error::LedgerError;
use super::service::clean_note;
use super::types::{PointsMovement, TransactionKind};
use crate::points::{PointsError, amount_to_cents};

/// The caller-visible parts of a movement request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestFingerprint {
    kind: TransactionKind,
    purchase_amount_cents: Option<i64>,
    points: Option<i64>,
    note: Option<String>,
}

impl RequestFingerprint {
    /// Fingerprint of a purchase request.
    ///
    /// # Errors
    ///
    /// `Points` for amounts that could never be posted.
    pub fn purchase(amount: Decimal, note: Option<String>) -> Result<Self, LedgerError> {
        if amount.is_sign_negative() && !amount.is_zero() {
            return Err(PointsError::NegativeAmount.into());
        }
        Ok(Self {
            kind: TransactionKind::Purchase,
            purchase_amount_cents: Some(amount_to_cents(amount)?),
            points: None,
            note: clean_note(note),
        })
    }

    /// Fingerprint of an already planned movement.
    #[must_use]
    pub fn of(movement: &PointsMovement) -> Self {
        Self {
            kind: movement.kind,
            purchase_amount_cents: movement.purchase_amount_cents,
            points: (movement.kind != TransactionKind::Purchase).then_some(movement.delta),
            note: movement.note.clone(),
        }
    }

    /// Movement kind of the request.
    #[must_use]
    pub const fn kind(&self) -> TransactionKind {
        self.kind
    }

    /// Returns true if a stored line was produced by this same request.
    #[must_use]
    pub fn matches(&self, line: &PointsMovement) -> bool {
        self.kind == line.kind
            && self.purchase_amount_cents == line.purchase_amount_cents
            && self.points.is_none_or(|points| points == line.delta)
            && self.note == line.note
    }
}

//! Loyalty service for planning and applying points movements.
//!
//! Handlers and repositories never build a `PointsMovement` by hand: they ask
//! the service, which validates the request against the earning rules, then
//! apply it to a `WalletState` inside the same database transaction.

use rust_decimal::Decimal;

use super::error::LedgerError;
use super::types::{PointsMovement, TransactionKind};
use super::wallet::WalletState;
use crate::points::{Multiplier, amount_to_cents, calculate_points};

/// Maximum length of an adjustment reason or note.
pub const MAX_NOTE_LEN: usize = 500;

/// Pure loyalty rules with no database dependencies.
pub struct LoyaltyService;

impl LoyaltyService {
    /// Plans the credit for a purchase.
    ///
    /// # Errors
    ///
    /// - `Points` for negative amounts or overflow
    /// - `ZeroDelta` when the purchase earns nothing (amount below 1)
    pub fn plan_purchase(
        amount: Decimal,
        multiplier: Multiplier,
        note: Option<String>,
    ) -> Result<PointsMovement, LedgerError> {
        let award = calculate_points(amount, multiplier)?;
        if award.points == 0 {
            return Err(LedgerError::ZeroDelta);
        }

        Ok(PointsMovement {
            kind: TransactionKind::Purchase,
            delta: award.points,
            purchase_amount_cents: Some(amount_to_cents(amount)?),
            base_points: Some(award.base_points),
            multiplier_bp: Some(multiplier.basis_points()),
            note: clean_note(note),
        })
    }

    /// Plans a welcome or referral bonus. A zero bonus plans nothing.
    ///
    /// # Errors
    ///
    /// `WrongSign` for negative amounts or non-bonus kinds.
    pub fn plan_bonus(
        kind: TransactionKind,
        points: i64,
    ) -> Result<Option<PointsMovement>, LedgerError> {
        if !matches!(kind, TransactionKind::WelcomeBonus | TransactionKind::ReferralBonus)
            || points < 0
        {
            return Err(LedgerError::WrongSign {
                kind,
                delta: points,
            });
        }
        if points == 0 {
            return Ok(None);
        }
        Ok(Some(PointsMovement::simple(kind, points, None)))
    }

    /// Plans spending `points` from a wallet.
    ///
    /// # Errors
    ///
    /// `ZeroDelta` or `WrongSign` unless `points` is positive.
    pub fn plan_redemption(
        points: i64,
        note: Option<String>,
    ) -> Result<PointsMovement, LedgerError> {
        if points == 0 {
            return Err(LedgerError::ZeroDelta);
        }
        if points < 0 {
            return Err(LedgerError::WrongSign {
                kind: TransactionKind::Redemption,
                delta: points,
            });
        }
        Ok(PointsMovement::simple(
            TransactionKind::Redemption,
            -points,
            clean_note(note),
        ))
    }

    /// Plans a manual correction in either direction.
    ///
    /// # Errors
    ///
    /// `ZeroDelta` for a zero delta, `MissingReason` without a reason.
    pub fn plan_adjustment(delta: i64, reason: &str) -> Result<PointsMovement, LedgerError> {
        if delta == 0 {
            return Err(LedgerError::ZeroDelta);
        }
        let reason = clean_note(Some(reason.to_string())).ok_or(LedgerError::MissingReason)?;
        Ok(PointsMovement::simple(
            TransactionKind::Adjustment,
            delta,
            Some(reason),
        ))
    }

    /// Applies a planned movement to a wallet.
    ///
    /// # Errors
    ///
    /// `WrongSign` if the movement violates its kind's sign rule, otherwise
    /// whatever [`WalletState::apply`] rejects.
    pub fn apply(
        state: &WalletState,
        movement: &PointsMovement,
    ) -> Result<WalletState, LedgerError> {
        if movement.delta == 0 {
            return Err(LedgerError::ZeroDelta);
        }
        if !movement.kind.allows(movement.delta) {
            return Err(LedgerError::WrongSign {
                kind: movement.kind,
                delta: movement.delta,
            });
        }
        state.apply(movement.delta)
    }
}

pub(crate) fn clean_note(note: Option<String>) -> Option<String> {
    note.map(|n| n.trim().chars().take(MAX_NOTE_LEN).collect::<String>())
        .filter(|n| !n.is_empty())
}

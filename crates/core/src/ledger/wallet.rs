//! Wallet state transitions.

use serde::{Deserialize, Serialize};

use super::error::LedgerError;

/// Balance counters of one wallet, with its optimistic-lock version.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalletState {
    /// Spendable points.
    pub balance: i64,
    /// Sum of all credits.
    pub lifetime_earned: i64,
    /// Sum of all debits, as a positive number.
    pub lifetime_redeemed: i64,
    /// Bumped on every applied movement.
    pub version: i64,
}

impl WalletState {
    /// An empty wallet at version 0.
    #[must_use]
    pub const fn empty() -> Self {
        Self {
            balance: 0,
            lifetime_earned: 0,
            lifetime_redeemed: 0,
            version: 0,
        }
    }

    /// Returns the state after applying `delta`.
    ///
    /// # Errors
    ///
    /// - `ZeroDelta` for a zero delta
    /// - `InsufficientPoints` if the balance would go negative
    /// - `Overflow` if a counter leaves the `i64` range
    pub fn apply(&self, delta: i64) -> Result<Self, LedgerError> {
        if delta == 0 {
            return Err(LedgerError::ZeroDelta);
        }

        let balance = self.balance.checked_add(delta).ok_or(LedgerError::Overflow)?;
        if balance < 0 {
            return Err(LedgerError::InsufficientPoints {
                balance: self.balance,
                requested: delta.checked_neg().ok_or(LedgerError::Overflow)?,
            });
        }

        let (lifetime_earned, lifetime_redeemed) = if delta > 0 {
            (
                self.lifetime_earned
                    .checked_add(delta)
                    .ok_or(LedgerError::Overflow)?,
                self.lifetime_redeemed,
            )
        } else {
            (
                self.lifetime_earned,
                self.lifetime_redeemed
                    .checked_sub(delta)
                    .ok_or(LedgerError::Overflow)?,
            )
        };

        Ok(Self {
            balance,
            lifetime_earned,
            lifetime_redeemed,
            version: self.version.checked_add(1).ok_or(LedgerError::Overflow)?,
        })
    }
}

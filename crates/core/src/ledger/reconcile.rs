//! Wallet reconciliation against the ledger.

use serde::{Deserialize, Serialize};

use super::balance::RunningBalance;
use super::wallet::WalletState;

/// The parts of a ledger line reconciliation needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LedgerLine {
    /// Signed delta.
    pub points: i64,
    /// Stored running balance.
    pub balance_after: i64,
}

/// Outcome of comparing a wallet row with its ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reconciliation {
    /// Balance on the wallet row.
    pub stored_balance: i64,
    /// Sum of all ledger deltas.
    pub derived_balance: i64,
    /// Lifetime earned on the wallet row.
    pub stored_lifetime_earned: i64,
    /// Sum of positive deltas.
    pub derived_lifetime_earned: i64,
    /// Lifetime redeemed on the wallet row.
    pub stored_lifetime_redeemed: i64,
    /// Sum of negative deltas, as a positive number.
    pub derived_lifetime_redeemed: i64,
    /// Number of ledger lines examined.
    pub entry_count: usize,
    /// Index of the first line whose running balance is wrong.
    pub first_broken_entry: Option<usize>,
    /// True when every check passed.
    pub is_consistent: bool,
}

/// Recomputes a wallet from its ledger lines (oldest first).
///
/// Sums saturate so corrupt data is reported rather than panicking.
#[must_use]
pub fn reconcile(stored: &WalletState, lines: &[LedgerLine]) -> Reconciliation {
    let mut running = RunningBalance::opening();
    let mut first_broken_entry = None;
    let mut derived_balance = 0i64;
    let mut earned = 0i64;
    let mut redeemed = 0i64;

    for (index, line) in lines.iter().enumerate() {
        derived_balance = derived_balance.saturating_add(line.points);
        if line.points > 0 {
            earned = earned.saturating_add(line.points);
        } else {
            redeemed = redeemed.saturating_sub(line.points);
        }
        if first_broken_entry.is_none() && running.verify(line.points, line.balance_after).is_err() {
            first_broken_entry = Some(index);
        }
    }

    let is_consistent = first_broken_entry.is_none()
        && derived_balance == stored.balance
        && earned == stored.lifetime_earned
        && redeemed == stored.lifetime_redeemed;

    Reconciliation {
        stored_balance: stored.balance,
        derived_balance,
        stored_lifetime_earned: stored.lifetime_earned,
        derived_lifetime_earned: earned,
        stored_lifetime_redeemed: stored.lifetime_redeemed,
        derived_lifetime_redeemed: redeemed,
        entry_count: lines.len(),
        first_broken_entry,
        is_consistent,
    }
}

//! Points ledger rules.
//!
//! Every change to a wallet is an append-only ledger line carrying a signed
//! delta and the balance after it. This module holds the pure rules:
//! - Transaction kinds and their sign rules
//! - Wallet state transitions
//! - Running balance checks
//! - Idempotent retry detection
//! - Wallet reconciliation against the ledger
//! - The service that plans purchases, bonuses, redemptions and adjustments

pub mod balance;
pub mod error;
pub mod fingerprint;
pub mod reconcile;
pub mod service;
pub mod types;
pub mod wallet;

#[cfg(test)]
mod service_props;

pub use balance::RunningBalance;
pub use error::LedgerError;
pub use fingerprint::RequestFingerprint;
pub use reconcile::{LedgerLine, Reconciliation, reconcile};
pub use service::LoyaltyService;
pub use types::{PointsMovement, TransactionKind};
pub use wallet::WalletState;

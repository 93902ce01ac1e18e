//! Domain types for points movements.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// What caused a ledger line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionKind {
    /// Points earned from a purchase.
    Purchase,
    /// One-time grant on enrollment.
    WelcomeBonus,
    /// Grant to a referrer when a referred customer enrolls.
    ReferralBonus,
    /// Points spent by the customer.
    Redemption,
    /// Manual correction by the business or an admin.
    Adjustment,
}

impl TransactionKind {
    /// All kinds, in storage order.
    pub const ALL: [Self; 5] = [
        Self::Purchase,
        Self::WelcomeBonus,
        Self::ReferralBonus,
        Self::Redemption,
        Self::Adjustment,
    ];

    /// Storage and wire name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Purchase => "purchase",
            Self::WelcomeBonus => "welcome_bonus",
            Self::ReferralBonus => "referral_bonus",
            Self::Redemption => "redemption",
            Self::Adjustment => "adjustment",
        }
    }

    /// Returns true if `delta` has an allowed sign for this kind.
    ///
    /// Earning kinds only credit, redemptions only debit, and adjustments go
    /// either way. Zero is never allowed.
    #[must_use]
    pub const fn allows(&self, delta: i64) -> bool {
        match self {
            Self::Purchase | Self::WelcomeBonus | Self::ReferralBonus => delta > 0,
            Self::Redemption => delta < 0,
            Self::Adjustment => delta != 0,
        }
    }

    /// Returns true for kinds that add points.
    #[must_use]
    pub const fn is_earning(&self) -> bool {
        matches!(self, Self::Purchase | Self::WelcomeBonus | Self::ReferralBonus)
    }
}

impl fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_str().replace('_', " "))
    }
}

impl FromStr for TransactionKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| format!("Unknown transaction kind: {s}"))
    }
}

/// A validated movement ready to be persisted against a wallet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PointsMovement {
    /// Movement kind.
    pub kind: TransactionKind,
    /// Signed points delta.
    pub delta: i64,
    /// Purchase amount in cents (purchases only).
    pub purchase_amount_cents: Option<i64>,
    /// `floor(amount)` (purchases only).
    pub base_points: Option<i64>,
    /// Multiplier in basis points (purchases only).
    pub multiplier_bp: Option<i32>,
    /// Free-form note or adjustment reason.
    pub note: Option<String>,
}

impl PointsMovement {
    /// A movement without purchase details.
    #[must_use]
    pub fn simple(kind: TransactionKind, delta: i64, note: Option<String>) -> Self {
        Self {
            kind,
            delta,
            purchase_amount_cents: None,
            base_points: None,
            multiplier_bp: None,
            note,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_roundtrip() {
        for kind in TransactionKind::ALL {
            assert_eq!(kind.as_str().parse::<TransactionKind>().unwrap(), kind);
        }
        assert!("refund".parse::<TransactionKind>().is_err());
    }

    #[test]
    fn test_sign_rules() {
        assert!(TransactionKind::Purchase.allows(10));
        assert!(!TransactionKind::Purchase.allows(-10));
        assert!(!TransactionKind::WelcomeBonus.allows(0));
        assert!(TransactionKind::Redemption.allows(-1));
        assert!(!TransactionKind::Redemption.allows(1));
        assert!(TransactionKind::Adjustment.allows(-5));
        assert!(TransactionKind::Adjustment.allows(5));
        assert!(!TransactionKind::Adjustment.allows(0));
    }

    #[test]
    fn test_display_and_serde() {
        assert_eq!(TransactionKind::ReferralBonus.to_string(), "referral bonus");
        assert_eq!(
            serde_json::to_string(&TransactionKind::WelcomeBonus).unwrap(),
            "\"welcome_bonus\""
        );
    }
}

//! Property-based tests for LoyaltyService.
//!
//! - Property 1: wallet balance always equals the sum of applied deltas
//! - Property 2: the balance never goes negative
//! - Property 3: lifetime counters split credits and debits
//! - Property 4: reconciliation of a ledger built by the service is consistent

use proptest::prelude::*;

use super::error::LedgerError;
use super::reconcile::{LedgerLine, reconcile};
use super::service::LoyaltyService;
use super::types::{PointsMovement, TransactionKind};
use super::wallet::WalletState;

/// Strategy to generate a planned movement (earn, redeem, or adjust).
fn movement() -> impl Strategy<Value = PointsMovement> {
    prop_oneof![
        (1i64..5_000).prop_map(|p| {
            PointsMovement::simple(TransactionKind::Purchase, p, None)
        }),
        (1i64..5_000).prop_map(|p| LoyaltyService::plan_redemption(p, None).unwrap()),
        (-2_000i64..2_000)
            .prop_filter("non-zero", |d| *d != 0)
            .prop_map(|d| LoyaltyService::plan_adjustment(d, "correction").unwrap()),
    ]
}

/// Applies movements, skipping rejected ones, and records the ledger lines.
fn run(movements: &[PointsMovement]) -> (WalletState, Vec<LedgerLine>, Vec<i64>) {
    let mut state = WalletState::empty();
    let mut lines = Vec::new();
    let mut accepted = Vec::new();
    for movement in movements {
        match LoyaltyService::apply(&state, movement) {
            Ok(next) => {
                lines.push(LedgerLine {
                    points: movement.delta,
                    balance_after: next.balance,
                });
                accepted.push(movement.delta);
                state = next;
            }
            Err(LedgerError::InsufficientPoints { balance, .. }) => {
                assert_eq!(balance, state.balance);
            }
            Err(other) => panic!("unexpected error: {other}"),
        }
    }
    (state, lines, accepted)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    #[test]
    fn prop_balance_equals_sum_of_deltas(movements in prop::collection::vec(movement(), 0..40)) {
        let (state, _, accepted) = run(&movements);
        prop_assert_eq!(state.balance, accepted.iter().sum::<i64>());
        prop_assert_eq!(state.version, i64::try_from(accepted.len()).unwrap());
    }

    #[test]
    fn prop_balance_never_negative(movements in prop::collection::vec(movement(), 0..40)) {
        let (_, lines, _) = run(&movements);
        for line in lines {
            prop_assert!(line.balance_after >= 0);
        }
    }

    #[test]
    fn prop_lifetime_counters_split(movements in prop::collection::vec(movement(), 0..40)) {
        let (state, _, accepted) = run(&movements);
        let earned: i64 = accepted.iter().filter(|d| **d > 0).sum();
        let redeemed: i64 = accepted.iter().filter(|d| **d < 0).map(|d| -d).sum();
        prop_assert_eq!(state.lifetime_earned, earned);
        prop_assert_eq!(state.lifetime_redeemed, redeemed);
        prop_assert_eq!(state.balance, earned - redeemed);
    }

    #[test]
    fn prop_service_ledger_reconciles(movements in prop::collection::vec(movement(), 0..40)) {
        let (state, lines, _) = run(&movements);
        let result = reconcile(&state, &lines);
        prop_assert!(result.is_consistent);
    }
}

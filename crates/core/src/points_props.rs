//! Property-based tests for points calculation.
//!
//! - Property 1: `points == floor(floor(amount) * multiplier)` for amount >= 0, multiplier >= 1
//! - Property 2: a multiplier never reduces the award below the base points
//! - Property 3: the award is monotonic in the amount

use proptest::prelude::*;
use rust_decimal::Decimal;

use super::points::{BASIS_POINTS_PER_UNIT, Multiplier, amount_to_cents, calculate_points};

/// Amounts from 0.00 to 10,000,000.00 expressed in cents.
fn amount_cents() -> impl Strategy<Value = i64> {
    0i64..1_000_000_000i64
}

/// Multipliers from 1.0000x to 100.0000x expressed in basis points.
fn multiplier_bp() -> impl Strategy<Value = i32> {
    BASIS_POINTS_PER_UNIT..=1_000_000i32
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    #[test]
    fn prop_points_match_integer_formula(cents in amount_cents(), bp in multiplier_bp()) {
        let amount = Decimal::new(cents, 2);
        let multiplier = Multiplier::from_basis_points(bp).unwrap();

        let award = calculate_points(amount, multiplier).unwrap();

        // Integer-only oracle: floor(amount) = cents / 100, floor(base * bp / 10_000).
        let base = cents / 100;
        let expected = base * i64::from(bp) / i64::from(BASIS_POINTS_PER_UNIT);
        prop_assert_eq!(award.base_points, base);
        prop_assert_eq!(award.points, expected);
    }

    #[test]
    fn prop_multiplier_never_reduces_award(cents in amount_cents(), bp in multiplier_bp()) {
        let multiplier = Multiplier::from_basis_points(bp).unwrap();
        let award = calculate_points(Decimal::new(cents, 2), multiplier).unwrap();
        prop_assert!(award.points >= award.base_points);
    }

    #[test]
    fn prop_award_monotonic_in_amount(
        a in amount_cents(),
        b in amount_cents(),
        bp in multiplier_bp(),
    ) {
        let multiplier = Multiplier::from_basis_points(bp).unwrap();
        let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
        let lo_award = calculate_points(Decimal::new(lo, 2), multiplier).unwrap();
        let hi_award = calculate_points(Decimal::new(hi, 2), multiplier).unwrap();
        prop_assert!(lo_award.points <= hi_award.points);
    }

    #[test]
    fn prop_cents_roundtrip(cents in amount_cents()) {
        prop_assert_eq!(amount_to_cents(Decimal::new(cents, 2)).unwrap(), cents);
    }
}

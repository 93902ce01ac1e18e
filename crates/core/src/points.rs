//! Points earning calculation.
//!
//! A purchase earns `floor(floor(amount) * multiplier)` points. Amounts are
//! handled as `Decimal` and persisted in cents; multipliers are persisted in
//! basis points (10 000 = 1.0x). No floating point is involved anywhere.

use std::str::FromStr;

use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Basis points representing a 1.0x multiplier.
pub const BASIS_POINTS_PER_UNIT: i32 = 10_000;

/// Upper bound for a profile multiplier.
pub const MAX_MULTIPLIER: Decimal = Decimal::from_parts(100, 0, 0, false, 0);

/// Errors raised by points calculations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PointsError {
    /// Purchase amount was negative.
    #[error("Purchase amount cannot be negative")]
    NegativeAmount,

    /// Purchase amount could not be parsed.
    #[error("Invalid purchase amount: {0}")]
    InvalidAmount(String),

    /// Purchase amount has sub-cent precision.
    #[error("Purchase amount has more than 2 decimal places")]
    AmountTooPrecise,

    /// Multiplier is below 1.0.
    #[error("Earning multiplier must be at least 1, got {0}")]
    MultiplierBelowOne(Decimal),

    /// Multiplier is above the allowed maximum.
    #[error("Earning multiplier cannot exceed {MAX_MULTIPLIER}, got {0}")]
    MultiplierTooLarge(Decimal),

    /// Multiplier has more precision than basis points can hold.
    #[error("Earning multiplier has more than 4 decimal places")]
    MultiplierTooPrecise,

    /// Result does not fit in the points range.
    #[error("Points calculation overflowed")]
    Overflow,
}

/// A profile's earning multiplier (>= 1.0).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "Decimal", into = "Decimal")]
pub struct Multiplier(Decimal);

impl Multiplier {
    /// The neutral multiplier.
    pub const ONE: Self = Self(Decimal::ONE);

    /// Creates a multiplier, enforcing `1 <= value <= MAX_MULTIPLIER` and at most 4 decimals.
    ///
    /// # Errors
    ///
    /// Returns a `PointsError` describing the violated bound.
    pub fn new(value: Decimal) -> Result<Self, PointsError> {
        let value = value.normalize();
        if value < Decimal::ONE {
            return Err(PointsError::MultiplierBelowOne(value));
        }
        if value > MAX_MULTIPLIER {
            return Err(PointsError::MultiplierTooLarge(value));
        }
        if value.scale() > 4 {
            return Err(PointsError::MultiplierTooPrecise);
        }
        Ok(Self(value))
    }

    /// Creates a multiplier from its stored basis-point form.
    ///
    /// # Errors
    ///
    /// Same bounds as [`Multiplier::new`].
    pub fn from_basis_points(basis_points: i32) -> Result<Self, PointsError> {
        Self::new(Decimal::new(i64::from(basis_points), 4))
    }

    /// Returns the multiplier in basis points.
    #[must_use]
    pub fn basis_points(&self) -> i32 {
        // Bounded by MAX_MULTIPLIER and scale <= 4, so this always fits.
        (self.0 * Decimal::from(BASIS_POINTS_PER_UNIT))
            .trunc()
            .to_i32()
            .unwrap_or(i32::MAX)
    }

    /// Returns the decimal value.
    #[must_use]
    pub const fn value(&self) -> Decimal {
        self.0
    }
}

impl Default for Multiplier {
    fn default() -> Self {
        Self::ONE
    }
}

impl TryFrom<Decimal> for Multiplier {
    type Error = PointsError;

    fn try_from(value: Decimal) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Multiplier> for Decimal {
    fn from(m: Multiplier) -> Self {
        m.0
    }
}

impl std::fmt::Display for Multiplier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x", self.0)
    }
}

/// Outcome of a purchase points calculation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PointsAward {
    /// `floor(amount)`.
    pub base_points: i64,
    /// The multiplier that was applied.
    pub multiplier: Multiplier,
    /// `floor(base_points * multiplier)`.
    pub points: i64,
}

/// Calculates the points earned for a purchase.
///
/// # Errors
///
/// Returns `PointsError::NegativeAmount` for negative amounts and
/// `PointsError::Overflow` if the result does not fit in an `i64`.
///
/// # Example
///
/// ```
/// use loyalty_core::points::{Multiplier, calculate_points};
/// use rust_decimal::Decimal;
///
/// let award = calculate_points(Decimal::new(1999, 2), Multiplier::new(Decimal::new(15, 1)).unwrap()).unwrap();
/// assert_eq!(award.base_points, 19);
/// assert_eq!(award.points, 28);
/// ```
pub fn calculate_points(amount: Decimal, multiplier: Multiplier) -> Result<PointsAward, PointsError> {
    if amount.is_sign_negative() && !amount.is_zero() {
        return Err(PointsError::NegativeAmount);
    }

    let base = amount.floor();
    let base_points = base.to_i64().ok_or(PointsError::Overflow)?;
    let points = base
        .checked_mul(multiplier.value())
        .ok_or(PointsError::Overflow)?
        .floor()
        .to_i64()
        .ok_or(PointsError::Overflow)?;

    Ok(PointsAward {
        base_points,
        multiplier,
        points,
    })
}

/// Parses a client-supplied purchase amount such as `"19.99"`.
///
/// # Errors
///
/// Rejects unparsable, negative, or sub-cent amounts.
pub fn parse_purchase_amount(raw: &str) -> Result<Decimal, PointsError> {
    let amount =
        Decimal::from_str(raw.trim()).map_err(|_| PointsError::InvalidAmount(raw.to_string()))?;
    validate_purchase_amount(amount)
}

/// Checks a purchase amount is non-negative with at most two decimals.
///
/// # Errors
///
/// Rejects negative or sub-cent amounts.
pub fn validate_purchase_amount(amount: Decimal) -> Result<Decimal, PointsError> {
    if amount.is_sign_negative() && !amount.is_zero() {
        return Err(PointsError::NegativeAmount);
    }
    if amount.normalize().scale() > 2 {
        return Err(PointsError::AmountTooPrecise);
    }
    Ok(amount)
}

/// Converts a purchase amount to integer cents for storage.
///
/// # Errors
///
/// Returns `PointsError::Overflow` if the amount does not fit.
pub fn amount_to_cents(amount: Decimal) -> Result<i64, PointsError> {
    amount
        .checked_mul(Decimal::ONE_HUNDRED)
        .and_then(|cents| cents.trunc().to_i64())
        .ok_or(PointsError::Overflow)
}

/// Converts stored cents back to a decimal amount.
#[must_use]
pub fn cents_to_amount(cents: i64) -> Decimal {
    Decimal::new(cents, 2)
}

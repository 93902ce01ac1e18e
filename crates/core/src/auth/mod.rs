//! Authentication and password hashing.
//!
//! This module provides:
//! - Password hashing with Argon2id
//! - Password verification
//! - Platform role definitions

mod password;

pub use password::{PasswordError, hash_password, verify_against_decoy, verify_password};

use serde::{Deserialize, Serialize};
use std::str::FromStr;
use thiserror::Error;

/// Platform-wide user roles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    /// Operates the platform: approves businesses, manages categories.
    Admin,
    /// Owns and runs one or more businesses.
    Business,
    /// Collects and redeems points.
    Customer,
}

/// Returned when a role string is not recognised.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown role: {0}")]
pub struct UnknownRole(pub String);

impl UserRole {
    /// Returns the role's wire name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::Business => "business",
            Self::Customer => "customer",
        }
    }

    /// Returns true if an account with this role may be created via public sign-up.
    #[must_use]
    pub const fn can_self_register(&self) -> bool {
        matches!(self, Self::Business | Self::Customer)
    }

    /// Returns true if this role can manage categories, users and approvals.
    #[must_use]
    pub const fn is_admin(&self) -> bool {
        matches!(self, Self::Admin)
    }

    /// Returns true if this role can create businesses.
    #[must_use]
    pub const fn can_create_business(&self) -> bool {
        matches!(self, Self::Business)
    }

    /// Returns true if this role holds wallets and a customer code.
    #[must_use]
    pub const fn holds_wallets(&self) -> bool {
        matches!(self, Self::Customer)
    }
}

impl std::fmt::Display for UserRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for UserRole {
    type Err = UnknownRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "admin" => Ok(Self::Admin),
            "business" => Ok(Self::Business),
            "customer" => Ok(Self::Customer),
            other => Err(UnknownRole(other.to_string())),
        }
    }
}

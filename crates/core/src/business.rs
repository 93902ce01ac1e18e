//! Business lifecycle and branding rules.

use serde::{Deserialize, Serialize};
use std::str::FromStr;
use thiserror::Error;

/// Upper bound for business names.
pub const MAX_BUSINESS_NAME_LEN: usize = 120;

/// Errors raised by business rules.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum BusinessError {
    /// Requested status change is not allowed.
    #[error("Cannot change business status from {from} to {to}")]
    InvalidTransition {
        /// Current status.
        from: BusinessStatus,
        /// Requested status.
        to: BusinessStatus,
    },

    /// Business is not active.
    #[error("Business is {0}, only active businesses accept members and transactions")]
    NotActive(BusinessStatus),

    /// Name is blank or too long.
    #[error("Business name must be 1-{MAX_BUSINESS_NAME_LEN} characters")]
    InvalidName,

    /// A branding color is not `#RRGGBB`.
    #[error("{0} must be a #RRGGBB hex color")]
    InvalidColor(&'static str),

    /// Unknown status string.
    #[error("Unknown business status: {0}")]
    UnknownStatus(String),
}

/// Approval status of a business.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BusinessStatus {
    /// Awaiting admin review.
    Pending,
    /// Approved and operating.
    Active,
    /// Rejected or suspended by an admin.
    Rejected,
}

impl BusinessStatus {
    /// Returns the wire/storage name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Active => "active",
            Self::Rejected => "rejected",
        }
    }

    /// Returns true if moving to `next` is a legal admin decision.
    ///
    /// `pending -> active | rejected`, `active -> rejected` (suspension),
    /// `rejected -> active` (reinstatement).
    #[must_use]
    pub const fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Active | Self::Rejected)
                | (Self::Active, Self::Rejected)
                | (Self::Rejected, Self::Active)
        )
    }

    /// Validates and performs a status change.
    ///
    /// # Errors
    ///
    /// Returns `BusinessError::InvalidTransition` for illegal changes.
    pub fn transition(self, next: Self) -> Result<Self, BusinessError> {
        if self.can_transition_to(next) {
            Ok(next)
        } else {
            Err(BusinessError::InvalidTransition {
                from: self,
                to: next,
            })
        }
    }

    /// Only active businesses enroll customers and move points.
    ///
    /// # Errors
    ///
    /// Returns `BusinessError::NotActive` otherwise.
    pub fn ensure_active(self) -> Result<(), BusinessError> {
        match self {
            Self::Active => Ok(()),
            other => Err(BusinessError::NotActive(other)),
        }
    }
}

impl std::fmt::Display for BusinessStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BusinessStatus {
    type Err = BusinessError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "active" => Ok(Self::Active),
            "rejected" => Ok(Self::Rejected),
            other => Err(BusinessError::UnknownStatus(other.to_string())),
        }
    }
}

/// Returns true for `#RRGGBB` colors.
#[must_use]
pub fn is_valid_hex_color(color: &str) -> bool {
    color.len() == 7
        && color.starts_with('#')
        && color[1..].bytes().all(|b| b.is_ascii_hexdigit())
}

/// Branding of a business.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Branding {
    /// Main brand color.
    pub primary_color: String,
    /// Accent color.
    pub secondary_color: String,
    /// Externally hosted logo.
    pub logo_url: Option<String>,
}

impl Default for Branding {
    fn default() -> Self {
        Self {
            primary_color: "#1F2937".to_string(),
            secondary_color: "#F59E0B".to_string(),
            logo_url: None,
        }
    }
}

impl Branding {
    /// Validates both colors.
    ///
    /// # Errors
    ///
    /// Returns `BusinessError::InvalidColor` naming the bad field.
    pub fn validate(&self) -> Result<(), BusinessError> {
        if !is_valid_hex_color(&self.primary_color) {
            return Err(BusinessError::InvalidColor("primary_color"));
        }
        if !is_valid_hex_color(&self.secondary_color) {
            return Err(BusinessError::InvalidColor("secondary_color"));
        }
        Ok(())
    }
}

/// Per-business program settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BusinessSettings {
    /// Whether referral codes grant bonuses at this business.
    pub referrals_enabled: bool,
    /// Message shown to customers after enrolling.
    pub welcome_message: Option<String>,
}

impl Default for BusinessSettings {
    fn default() -> Self {
        Self {
            referrals_enabled: true,
            welcome_message: None,
        }
    }
}

/// Validates a business name.
///
/// # Errors
///
/// Returns `BusinessError::InvalidName` for blank or overlong names.
pub fn validate_business_name(name: &str) -> Result<(), BusinessError> {
    let len = name.trim().chars().count();
    if len == 0 || len > MAX_BUSINESS_NAME_LEN {
        return Err(BusinessError::InvalidName);
    }
    Ok(())
}

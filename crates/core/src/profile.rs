//! Membership profiles (tiers).
//!
//! Every business is created with two preset profiles that cannot be deleted:
//! `General Members`, assigned to customers who enroll on their own, and
//! `Referred Customers`, assigned to customers who enroll with a referral code.

use serde::{Deserialize, Serialize};
use std::str::FromStr;
use thiserror::Error;

use crate::business::is_valid_hex_color;
use crate::points::Multiplier;

/// Name of the preset profile for customers who enroll on their own.
pub const GENERAL_PROFILE_NAME: &str = "General Members";
/// Name of the preset profile for customers who enroll with a referral code.
pub const REFERRED_PROFILE_NAME: &str = "Referred Customers";
/// Upper bound for welcome and referral bonuses.
pub const MAX_BONUS_POINTS: i64 = 1_000_000;
/// Upper bound for profile names.
pub const MAX_PROFILE_NAME_LEN: usize = 60;

/// Errors raised by profile rules.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ProfileError {
    /// Name is blank.
    #[error("Profile name is required")]
    EmptyName,

    /// Name is too long.
    #[error("Profile name cannot exceed {MAX_PROFILE_NAME_LEN} characters")]
    NameTooLong,

    /// Bonus points are out of range.
    #[error("{field} must be between 0 and {MAX_BONUS_POINTS}")]
    BonusOutOfRange {
        /// Which bonus was invalid.
        field: &'static str,
    },

    /// Badge color is not `#RRGGBB`.
    #[error("Badge color must be a #RRGGBB hex color")]
    InvalidBadgeColor,

    /// Attempted to delete a preset profile.
    #[error("Profile '{0}' is a preset and cannot be deleted")]
    NotDeletable(String),

    /// Attempted to rename a preset profile.
    #[error("Preset profile '{0}' cannot be renamed")]
    PresetRename(String),
}

/// Marks the two seeded profiles every business has.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProfilePreset {
    /// `General Members`.
    General,
    /// `Referred Customers`.
    Referred,
}

impl ProfilePreset {
    /// Returns the preset's storage name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::General => "general",
            Self::Referred => "referred",
        }
    }
}

impl FromStr for ProfilePreset {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "general" => Ok(Self::General),
            "referred" => Ok(Self::Referred),
            other => Err(format!("unknown profile preset: {other}")),
        }
    }
}

/// Visual badge shown on a member's card.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BadgeStyle {
    /// `#RRGGBB` color.
    pub color: String,
    /// Optional icon name understood by clients.
    pub icon: Option<String>,
}

impl Default for BadgeStyle {
    fn default() -> Self {
        Self {
            color: "#6B7280".to_string(),
            icon: None,
        }
    }
}

/// Earning rules attached to a profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileBenefits {
    /// Multiplier applied to purchase points.
    pub earning_multiplier: Multiplier,
    /// Points granted once when a customer is enrolled with this profile.
    pub welcome_bonus_points: i64,
    /// Points granted to a member of this profile for each customer they refer.
    pub referral_bonus_points: i64,
}

impl Default for ProfileBenefits {
    fn default() -> Self {
        Self {
            earning_multiplier: Multiplier::ONE,
            welcome_bonus_points: 0,
            referral_bonus_points: 0,
        }
    }
}

/// A profile about to be created or updated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileDraft {
    /// Display name, unique within a business.
    pub name: String,
    /// Optional description.
    pub description: Option<String>,
    /// Badge styling.
    pub badge: BadgeStyle,
    /// Earning rules.
    pub benefits: ProfileBenefits,
    /// Set for the two seeded profiles.
    pub preset: Option<ProfilePreset>,
}

impl ProfileDraft {
    /// Creates a custom (non-preset) profile draft.
    #[must_use]
    pub fn custom(name: impl Into<String>, benefits: ProfileBenefits) -> Self {
        Self {
            name: name.into(),
            description: None,
            badge: BadgeStyle::default(),
            benefits,
            preset: None,
        }
    }

    /// Preset profiles cannot be deleted.
    #[must_use]
    pub const fn is_deletable(&self) -> bool {
        self.preset.is_none()
    }

    /// Validates the draft.
    ///
    /// # Errors
    ///
    /// Returns the first violated rule.
    pub fn validate(&self) -> Result<(), ProfileError> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err(ProfileError::EmptyName);
        }
        if name.chars().count() > MAX_PROFILE_NAME_LEN {
            return Err(ProfileError::NameTooLong);
        }
        if !(0..=MAX_BONUS_POINTS).contains(&self.benefits.welcome_bonus_points) {
            return Err(ProfileError::BonusOutOfRange {
                field: "welcome_bonus_points",
            });
        }
        if !(0..=MAX_BONUS_POINTS).contains(&self.benefits.referral_bonus_points) {
            return Err(ProfileError::BonusOutOfRange {
                field: "referral_bonus_points",
            });
        }
        if !is_valid_hex_color(&self.badge.color) {
            return Err(ProfileError::InvalidBadgeColor);
        }
        Ok(())
    }
}

/// Returns the two profiles seeded for every new business.
#[must_use]
pub fn default_profiles() -> [ProfileDraft; 2] {
    [
        ProfileDraft {
            name: GENERAL_PROFILE_NAME.to_string(),
            description: Some("Default tier for every new member".to_string()),
            badge: BadgeStyle {
                color: "#6B7280".to_string(),
                icon: Some("star".to_string()),
            },
            benefits: ProfileBenefits::default(),
            preset: Some(ProfilePreset::General),
        },
        ProfileDraft {
            name: REFERRED_PROFILE_NAME.to_string(),
            description: Some("Members who joined through a referral".to_string()),
            badge: BadgeStyle {
                color: "#10B981".to_string(),
                icon: Some("users".to_string()),
            },
            benefits: ProfileBenefits::default(),
            preset: Some(ProfilePreset::Referred),
        },
    ]
}

/// Guards profile deletion.
///
/// # Errors
///
/// Returns `ProfileError::NotDeletable` for preset profiles.
pub fn ensure_deletable(name: &str, is_deletable: bool) -> Result<(), ProfileError> {
    if is_deletable {
        Ok(())
    } else {
        Err(ProfileError::NotDeletable(name.to_string()))
    }
}

/// Guards profile renames: preset names are fixed.
///
/// # Errors
///
/// Returns `ProfileError::PresetRename` when a preset would change name.
pub fn ensure_rename_allowed(
    preset: Option<ProfilePreset>,
    current_name: &str,
    new_name: &str,
) -> Result<(), ProfileError> {
    if preset.is_some() && current_name != new_name.trim() {
        return Err(ProfileError::PresetRename(current_name.to_string()));
    }
    Ok(())
}

/// Picks the preset a new member should land in when the scanned profile is a preset.
///
/// A referred customer who scanned the general profile is moved to the referred
/// preset; custom profiles are always honoured.
#[must_use]
pub fn enrollment_preset(scanned: Option<ProfilePreset>, referred: bool) -> Option<ProfilePreset> {
    match (scanned, referred) {
        (Some(ProfilePreset::General), true) => Some(ProfilePreset::Referred),
        (preset, _) => preset,
    }
}

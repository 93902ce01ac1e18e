//! Enums stored as strings, with conversions to the core domain enums.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use loyalty_core::auth::UserRole as CoreUserRole;
use loyalty_core::business::BusinessStatus as CoreBusinessStatus;
use loyalty_core::ledger::TransactionKind as CoreTransactionKind;
use loyalty_core::profile::ProfilePreset as CoreProfilePreset;

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    #[sea_orm(string_value = "admin")]
    Admin,
    #[sea_orm(string_value = "business")]
    Business,
    #[sea_orm(string_value = "customer")]
    Customer,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "snake_case")]
pub enum BusinessStatus {
    #[sea_orm(string_value = "pending")]
    Pending,
    #[sea_orm(string_value = "active")]
    Active,
    #[sea_orm(string_value = "rejected")]
    Rejected,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "snake_case")]
pub enum ProfilePreset {
    #[sea_orm(string_value = "general")]
    General,
    #[sea_orm(string_value = "referred")]
    Referred,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(20))")]
#[serde(rename_all = "snake_case")]
pub enum TransactionKind {
    #[sea_orm(string_value = "purchase")]
    Purchase,
    #[sea_orm(string_value = "welcome_bonus")]
    WelcomeBonus,
    #[sea_orm(string_value = "referral_bonus")]
    ReferralBonus,
    #[sea_orm(string_value = "redemption")]
    Redemption,
    #[sea_orm(string_value = "adjustment")]
    Adjustment,
}

impl From<CoreUserRole> for UserRole {
    fn from(role: CoreUserRole) -> Self {
        match role {
            CoreUserRole::Admin => Self::Admin,
            CoreUserRole::Business => Self::Business,
            CoreUserRole::Customer => Self::Customer,
        }
    }
}

impl From<UserRole> for CoreUserRole {
    fn from(role: UserRole) -> Self {
        match role {
            UserRole::Admin => Self::Admin,
            UserRole::Business => Self::Business,
            UserRole::Customer => Self::Customer,
        }
    }
}

impl From<CoreBusinessStatus> for BusinessStatus {
    fn from(status: CoreBusinessStatus) -> Self {
        match status {
            CoreBusinessStatus::Pending => Self::Pending,
            CoreBusinessStatus::Active => Self::Active,
            CoreBusinessStatus::Rejected => Self::Rejected,
        }
    }
}

impl From<BusinessStatus> for CoreBusinessStatus {
    fn from(status: BusinessStatus) -> Self {
        match status {
            BusinessStatus::Pending => Self::Pending,
            BusinessStatus::Active => Self::Active,
            BusinessStatus::Rejected => Self::Rejected,
        }
    }
}

impl From<CoreProfilePreset> for ProfilePreset {
    fn from(preset: CoreProfilePreset) -> Self {
        match preset {
            CoreProfilePreset::General => Self::General,
            CoreProfilePreset::Referred => Self::Referred,
        }
    }
}

impl From<ProfilePreset> for CoreProfilePreset {
    fn from(preset: ProfilePreset) -> Self {
        match preset {
            ProfilePreset::General => Self::General,
            ProfilePreset::Referred => Self::Referred,
        }
    }
}

impl From<CoreTransactionKind> for TransactionKind {
    fn from(kind: CoreTransactionKind) -> Self {
        match kind {
            CoreTransactionKind::Purchase => Self::Purchase,
            CoreTransactionKind::WelcomeBonus => Self::WelcomeBonus,
            CoreTransactionKind::ReferralBonus => Self::ReferralBonus,
            CoreTransactionKind::Redemption => Self::Redemption,
            CoreTransactionKind::Adjustment => Self::Adjustment,
        }
    }
}

impl From<TransactionKind> for CoreTransactionKind {
    fn from(kind: TransactionKind) -> Self {
        match kind {
            TransactionKind::Purchase => Self::Purchase,
            TransactionKind::WelcomeBonus => Self::WelcomeBonus,
            TransactionKind::ReferralBonus => Self::ReferralBonus,
            TransactionKind::Redemption => Self::Redemption,
            TransactionKind::Adjustment => Self::Adjustment,
        }
    }
}

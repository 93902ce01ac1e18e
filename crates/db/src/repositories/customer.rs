//! Customer repository: business memberships and enrollment.

use std::collections::HashMap;

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DbErr, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};
use tracing::info;
use uuid::Uuid;

use loyalty_core::auth::UserRole;
use loyalty_core::business::{BusinessError, BusinessStatus};
use loyalty_core::customer_code::normalize_customer_code;
use loyalty_core::ledger::{LoyaltyService, TransactionKind};
use loyalty_core::profile::{ProfilePreset, enrollment_preset};
use loyalty_shared::AppError;
use loyalty_shared::types::PageRequest;

use super::profile::{ProfileRepoError, find_preset};
use super::wallet::{WalletRepoError, open_wallet, post_movement};
use crate::entities::{
    businesses, customers, point_transactions, profiles, users, wallets,
};
use crate::is_unique_violation;

/// Error types for membership operations.
#[derive(Debug, thiserror::Error)]
pub enum CustomerRepoError {
    /// User not found or not an active customer.
    #[error("User {0} is not an active customer")]
    NotACustomer(Uuid),

    /// Business not found.
    #[error("Business not found: {0}")]
    BusinessNotFound(Uuid),

    /// Profile not found in the business.
    #[error("Profile not found: {0}")]
    ProfileNotFound(Uuid),

    /// Customer is already a member.
    #[error("Customer is already enrolled at this business")]
    AlreadyEnrolled,

    /// Customer is not a member.
    #[error("Customer {0} is not a member of this business")]
    NotMember(Uuid),

    /// Referral code does not match a customer.
    #[error("Unknown referral code: {0}")]
    UnknownReferralCode(String),

    /// Customers cannot refer themselves.
    #[error("Customers cannot refer themselves")]
    SelfReferral,

    /// Referrer is not a member of the business.
    #[error("Referrer is not a member of this business")]
    ReferrerNotMember,

    /// Business cannot enroll in its current status.
    #[error(transparent)]
    Business(#[from] BusinessError),

    /// Profile lookup failed.
    #[error(transparent)]
    Profile(#[from] ProfileRepoError),

    /// Bonus posting failed.
    #[error(transparent)]
    Wallet(#[from] WalletRepoError),

    /// Database error.
    #[error("Database error: {0}")]
    Database(#[from] DbErr),
}

impl From<CustomerRepoError> for AppError {
    fn from(err: CustomerRepoError) -> Self {
        match err {
            CustomerRepoError::BusinessNotFound(_)
            | CustomerRepoError::ProfileNotFound(_)
            | CustomerRepoError::NotMember(_) => Self::NotFound(err.to_string()),
            CustomerRepoError::NotACustomer(_) => Self::Forbidden(err.to_string()),
            CustomerRepoError::AlreadyEnrolled => Self::Conflict(err.to_string()),
            CustomerRepoError::UnknownReferralCode(_)
            | CustomerRepoError::SelfReferral
            | CustomerRepoError::ReferrerNotMember => Self::Validation(err.to_string()),
            CustomerRepoError::Business(_) => Self::BusinessRule(err.to_string()),
            CustomerRepoError::Profile(e) => e.into(),
            CustomerRepoError::Wallet(e) => e.into(),
            CustomerRepoError::Database(e) => Self::Database(e.to_string()),
        }
    }
}

/// Input for enrolling a customer.
#[derive(Debug, Clone)]
pub struct EnrollInput {
    /// Customer to enroll.
    pub user_id: Uuid,
    /// Business from the scanned code.
    pub business_id: Uuid,
    /// Profile from the scanned code.
    pub profile_id: Uuid,
    /// Referrer's customer code.
    pub referral_code: Option<String>,
}

/// Result of an enrollment.
#[derive(Debug, Clone)]
pub struct Enrollment {
    /// The new membership.
    pub membership: customers::Model,
    /// Profile actually assigned.
    pub profile: profiles::Model,
    /// The customer's wallet after any welcome bonus.
    pub wallet: wallets::Model,
    /// Welcome bonus line, if the profile grants one.
    pub welcome_bonus: Option<point_transactions::Model>,
    /// Referral bonus line in the referrer's wallet.
    pub referral_bonus: Option<point_transactions::Model>,
}

/// A member row for business dashboards.
#[derive(Debug, Clone)]
pub struct MemberSummary {
    /// Membership.
    pub membership: customers::Model,
    /// Customer account.
    pub user: users::Model,
    /// Current profile.
    pub profile: Option<profiles::Model>,
    /// Wallet at this business.
    pub wallet: Option<wallets::Model>,
}

/// Customer membership repository.
#[derive(Debug, Clone)]
pub struct CustomerRepository {
    db: DatabaseConnection,
}

impl CustomerRepository {
    /// Creates a new customer repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Enrolls a customer at a business in one database transaction.
    ///
    /// Creates the membership and wallet, grants the profile's welcome bonus
    /// and, for referred customers, credits the referrer with their profile's
    /// referral bonus. A referred customer who scanned the general profile
    /// lands in the referred profile instead.
    ///
    /// # Errors
    ///
    /// Returns `AlreadyEnrolled` for existing members, `Business(NotActive)`
    /// for inactive businesses, and referral errors for bad codes.
    pub async fn enroll(&self, input: EnrollInput) -> Result<Enrollment, CustomerRepoError> {
        let txn = self.db.begin().await?;

        let user = users::Entity::find_by_id(input.user_id)
            .one(&txn)
            .await?
            .filter(|u| u.is_active && UserRole::from(u.role).holds_wallets())
            .ok_or(CustomerRepoError::NotACustomer(input.user_id))?;

        let business = businesses::Entity::find_by_id(input.business_id)
            .one(&txn)
            .await?
            .ok_or(CustomerRepoError::BusinessNotFound(input.business_id))?;
        BusinessStatus::from(business.status).ensure_active()?;

        let scanned = profiles::Entity::find_by_id(input.profile_id)
            .filter(profiles::Column::BusinessId.eq(business.id))
            .one(&txn)
            .await?
            .ok_or(CustomerRepoError::ProfileNotFound(input.profile_id))?;

        let existing = customers::Entity::find()
            .filter(customers::Column::BusinessId.eq(business.id))
            .filter(customers::Column::UserId.eq(user.id))
            .count(&txn)
            .await?;
        if existing > 0 {
            return Err(CustomerRepoError::AlreadyEnrolled);
        }

        let referrer = match input.referral_code.as_deref().map(str::trim) {
            Some(code) if !code.is_empty() && business.referrals_enabled => {
                Some(resolve_referrer(&txn, code, &user, business.id).await?)
            }
            Some(code) if !code.is_empty() => {
                info!(business_id = %business.id, "Referrals disabled, ignoring referral code");
                None
            }
            _ => None,
        };

        let scanned_preset: Option<ProfilePreset> = scanned.preset.map(Into::into);
        let profile = match enrollment_preset(scanned_preset, referrer.is_some()) {
            Some(preset) if scanned_preset != Some(preset) => {
                find_preset(&txn, business.id, preset).await?
            }
            _ => scanned,
        };

        let membership = customers::ActiveModel {
            id: Set(Uuid::now_v7()),
            business_id: Set(business.id),
            user_id: Set(user.id),
            profile_id: Set(profile.id),
            referred_by_user_id: Set(referrer.as_ref().map(|(r, _)| r.user_id)),
            joined_at: Set(Utc::now().into()),
        }
        .insert(&txn)
        .await
        .map_err(|err| {
            if is_unique_violation(&err) {
                CustomerRepoError::AlreadyEnrolled
            } else {
                CustomerRepoError::Database(err)
            }
        })?;

        let mut wallet = open_wallet(&txn, user.id, business.id).await?;
        let mut welcome_bonus = None;
        if let Some(movement) =
            LoyaltyService::plan_bonus(TransactionKind::WelcomeBonus, profile.welcome_bonus_points)
                .map_err(WalletRepoError::from)?
        {
            let (updated, line) = post_movement(&txn, &wallet, &movement, None, None).await?;
            wallet = updated;
            welcome_bonus = Some(line);
        }

        let mut referral_bonus = None;
        if let Some((referrer_membership, referrer_wallet)) = &referrer {
            let referrer_profile = profiles::Entity::find_by_id(referrer_membership.profile_id)
                .one(&txn)
                .await?
                .ok_or(CustomerRepoError::ProfileNotFound(referrer_membership.profile_id))?;
            if let Some(movement) = LoyaltyService::plan_bonus(
                TransactionKind::ReferralBonus,
                referrer_profile.referral_bonus_points,
            )
            .map_err(WalletRepoError::from)?
            {
                let (_, line) =
                    post_movement(&txn, referrer_wallet, &movement, None, None).await?;
                referral_bonus = Some(line);
            }
        }

        txn.commit().await?;

        info!(
            business_id = %business.id,
            user_id = %user.id,
            profile = %profile.name,
            referred = referrer.is_some(),
            welcome_bonus = welcome_bonus.as_ref().map_or(0, |l| l.points),
            referral_bonus = referral_bonus.as_ref().map_or(0, |l| l.points),
            "Customer enrolled"
        );
        Ok(Enrollment {
            membership,
            profile,
            wallet,
            welcome_bonus,
            referral_bonus,
        })
    }

    /// Finds a membership.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn find_membership(
        &self,
        business_id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<customers::Model>, DbErr> {
        customers::Entity::find()
            .filter(customers::Column::BusinessId.eq(business_id))
            .filter(customers::Column::UserId.eq(user_id))
            .one(&self.db)
            .await
    }

    /// Lists a business's members, newest first, with profile and wallet.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn list_by_business(
        &self,
        business_id: Uuid,
        page: &PageRequest,
    ) -> Result<(Vec<MemberSummary>, u64), DbErr> {
        let query = customers::Entity::find()
            .filter(customers::Column::BusinessId.eq(business_id));
        let total = query.clone().count(&self.db).await?;

        let rows = query
            .order_by_desc(customers::Column::JoinedAt)
            .offset(page.offset())
            .limit(page.limit())
            .find_also_related(users::Entity)
            .all(&self.db)
            .await?;

        let profiles: HashMap<Uuid, profiles::Model> = profiles::Entity::find()
            .filter(profiles::Column::BusinessId.eq(business_id))
            .all(&self.db)
            .await?
            .into_iter()
            .map(|p| (p.id, p))
            .collect();

        let user_ids: Vec<Uuid> = rows.iter().map(|(m, _)| m.user_id).collect();
        let mut wallets: HashMap<Uuid, wallets::Model> = wallets::Entity::find()
            .filter(wallets::Column::BusinessId.eq(business_id))
            .filter(wallets::Column::UserId.is_in(user_ids))
            .all(&self.db)
            .await?
            .into_iter()
            .map(|w| (w.user_id, w))
            .collect();

        let members = rows
            .into_iter()
            .filter_map(|(membership, user)| {
                let user = user?;
                Some(MemberSummary {
                    profile: profiles.get(&membership.profile_id).cloned(),
                    wallet: wallets.remove(&membership.user_id),
                    membership,
                    user,
                })
            })
            .collect();

        Ok((members, total))
    }

    /// Moves a member to another profile of the same business.
    ///
    /// No welcome bonus is granted on a profile change.
    ///
    /// # Errors
    ///
    /// Returns `NotMember` or `ProfileNotFound`.
    pub async fn change_profile(
        &self,
        business_id: Uuid,
        user_id: Uuid,
        profile_id: Uuid,
    ) -> Result<customers::Model, CustomerRepoError> {
        let membership = self
            .find_membership(business_id, user_id)
            .await?
            .ok_or(CustomerRepoError::NotMember(user_id))?;

        let profile = profiles::Entity::find_by_id(profile_id)
            .filter(profiles::Column::BusinessId.eq(business_id))
            .one(&self.db)
            .await?
            .ok_or(CustomerRepoError::ProfileNotFound(profile_id))?;

        let mut active: customers::ActiveModel = membership.into();
        active.profile_id = Set(profile.id);
        let membership = active.update(&self.db).await?;

        info!(business_id = %business_id, user_id = %user_id, profile = %profile.name, "Member profile changed");
        Ok(membership)
    }
}

/// Finds the referrer's membership and wallet at the business.
async fn resolve_referrer<C: ConnectionTrait>(
    conn: &C,
    code: &str,
    user: &users::Model,
    business_id: Uuid,
) -> Result<(customers::Model, wallets::Model), CustomerRepoError> {
    let normalized = normalize_customer_code(code)
        .ok_or_else(|| CustomerRepoError::UnknownReferralCode(code.to_string()))?;
    if user.customer_code.as_deref() == Some(normalized.as_str()) {
        return Err(CustomerRepoError::SelfReferral);
    }

    let referrer = users::Entity::find()
        .filter(users::Column::CustomerCode.eq(normalized.as_str()))
        .one(conn)
        .await?
        .ok_or(CustomerRepoError::UnknownReferralCode(normalized))?;

    let membership = customers::Entity::find()
        .filter(customers::Column::BusinessId.eq(business_id))
        .filter(customers::Column::UserId.eq(referrer.id))
        .one(conn)
        .await?
        .ok_or(CustomerRepoError::ReferrerNotMember)?;

    let wallet = wallets::Entity::find()
        .filter(wallets::Column::BusinessId.eq(business_id))
        .filter(wallets::Column::UserId.eq(referrer.id))
        .one(conn)
        .await?
        .ok_or(CustomerRepoError::ReferrerNotMember)?;

    Ok((membership, wallet))
}

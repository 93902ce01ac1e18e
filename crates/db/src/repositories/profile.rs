//! Profile repository: membership tiers of a business.

use chrono::Utc;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DbErr, EntityTrait,
    QueryFilter, QueryOrder, Set, TransactionTrait,
};
use tracing::info;
use uuid::Uuid;

use loyalty_core::points::Multiplier;
use loyalty_core::profile::{
    BadgeStyle, ProfileBenefits, ProfileDraft, ProfileError, ProfilePreset, ensure_deletable,
    ensure_rename_allowed,
};
use loyalty_shared::AppError;

use crate::entities::{customers, profiles, sea_orm_active_enums};
use crate::is_unique_violation;

/// Error types for profile operations.
#[derive(Debug, thiserror::Error)]
pub enum ProfileRepoError {
    /// Profile not found in the business.
    #[error("Profile not found: {0}")]
    NotFound(Uuid),

    /// Name already used in the business.
    #[error("A profile named '{0}' already exists")]
    NameTaken(String),

    /// Business is missing its preset profile.
    #[error("Business {0} has no {1} profile")]
    PresetMissing(Uuid, &'static str),

    /// A profile rule was violated.
    #[error(transparent)]
    Rule(#[from] ProfileError),

    /// Stored multiplier is invalid.
    #[error("Stored multiplier is invalid for profile {0}")]
    CorruptMultiplier(Uuid),

    /// Database error.
    #[error("Database error: {0}")]
    Database(#[from] DbErr),
}

impl From<ProfileRepoError> for AppError {
    fn from(err: ProfileRepoError) -> Self {
        match err {
            ProfileRepoError::NotFound(_) => Self::NotFound(err.to_string()),
            ProfileRepoError::NameTaken(_) => Self::Conflict(err.to_string()),
            ProfileRepoError::Rule(
                ProfileError::NotDeletable(_) | ProfileError::PresetRename(_),
            ) => Self::BusinessRule(err.to_string()),
            ProfileRepoError::Rule(_) => Self::Validation(err.to_string()),
            ProfileRepoError::PresetMissing(..) | ProfileRepoError::CorruptMultiplier(_) => {
                Self::Internal(err.to_string())
            }
            ProfileRepoError::Database(e) => Self::Database(e.to_string()),
        }
    }
}

/// Partial update for a profile.
#[derive(Debug, Clone, Default)]
pub struct UpdateProfileInput {
    /// New name (presets keep theirs).
    pub name: Option<String>,
    /// New description.
    pub description: Option<String>,
    /// New badge styling.
    pub badge: Option<BadgeStyle>,
    /// New multiplier.
    pub earning_multiplier: Option<Multiplier>,
    /// New welcome bonus.
    pub welcome_bonus_points: Option<i64>,
    /// New referral bonus.
    pub referral_bonus_points: Option<i64>,
}

/// Rebuilds the domain draft from a stored profile.
///
/// # Errors
///
/// Returns `CorruptMultiplier` if the stored basis points are out of range.
pub fn to_draft(model: &profiles::Model) -> Result<ProfileDraft, ProfileRepoError> {
    let earning_multiplier = Multiplier::from_basis_points(model.earning_multiplier_bp)
        .map_err(|_| ProfileRepoError::CorruptMultiplier(model.id))?;
    Ok(ProfileDraft {
        name: model.name.clone(),
        description: model.description.clone(),
        badge: BadgeStyle {
            color: model.badge_color.clone(),
            icon: model.badge_icon.clone(),
        },
        benefits: ProfileBenefits {
            earning_multiplier,
            welcome_bonus_points: model.welcome_bonus_points,
            referral_bonus_points: model.referral_bonus_points,
        },
        preset: model.preset.map(Into::into),
    })
}

/// Builds the insert model for a validated draft.
pub(crate) fn new_profile(
    business_id: Uuid,
    draft: &ProfileDraft,
    is_default: bool,
) -> profiles::ActiveModel {
    let now = Utc::now().into();
    profiles::ActiveModel {
        id: Set(Uuid::now_v7()),
        business_id: Set(business_id),
        name: Set(draft.name.trim().to_string()),
        description: Set(draft.description.clone()),
        badge_color: Set(draft.badge.color.clone()),
        badge_icon: Set(draft.badge.icon.clone()),
        earning_multiplier_bp: Set(draft.benefits.earning_multiplier.basis_points()),
        welcome_bonus_points: Set(draft.benefits.welcome_bonus_points),
        referral_bonus_points: Set(draft.benefits.referral_bonus_points),
        preset: Set(draft.preset.map(Into::into)),
        is_default: Set(is_default),
        is_deletable: Set(draft.is_deletable()),
        created_at: Set(now),
        updated_at: Set(now),
    }
}

/// Finds a business's preset profile on any connection.
pub(crate) async fn find_preset<C: ConnectionTrait>(
    conn: &C,
    business_id: Uuid,
    preset: ProfilePreset,
) -> Result<profiles::Model, ProfileRepoError> {
    profiles::Entity::find()
        .filter(profiles::Column::BusinessId.eq(business_id))
        .filter(profiles::Column::Preset.eq(sea_orm_active_enums::ProfilePreset::from(preset)))
        .one(conn)
        .await?
        .ok_or(ProfileRepoError::PresetMissing(business_id, preset.as_str()))
}

/// Profile repository.
#[derive(Debug, Clone)]
pub struct ProfileRepository {
    db: DatabaseConnection,
}

impl ProfileRepository {
    /// Creates a new profile repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Lists a business's profiles, presets first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn list_by_business(&self, business_id: Uuid) -> Result<Vec<profiles::Model>, DbErr> {
        profiles::Entity::find()
            .filter(profiles::Column::BusinessId.eq(business_id))
            .order_by_asc(profiles::Column::IsDeletable)
            .order_by_desc(profiles::Column::IsDefault)
            .order_by_asc(profiles::Column::Name)
            .all(&self.db)
            .await
    }

    /// Finds a profile that belongs to the business.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn find(
        &self,
        business_id: Uuid,
        profile_id: Uuid,
    ) -> Result<Option<profiles::Model>, DbErr> {
        find_profile(&self.db, business_id, profile_id).await
    }

    /// Creates a custom profile.
    ///
    /// # Errors
    ///
    /// Returns `Rule` for invalid drafts and `NameTaken` for duplicates.
    pub async fn create(
        &self,
        business_id: Uuid,
        draft: &ProfileDraft,
    ) -> Result<profiles::Model, ProfileRepoError> {
        let draft = ProfileDraft {
            preset: None,
            ..draft.clone()
        };
        draft.validate()?;

        let profile = new_profile(business_id, &draft, false)
            .insert(&self.db)
            .await
            .map_err(|e| name_conflict(e, &draft.name))?;

        info!(business_id = %business_id, profile_id = %profile.id, name = %profile.name, "Profile created");
        Ok(profile)
    }

    /// Updates a profile. Preset profiles keep their names.
    ///
    /// # Errors
    ///
    /// Returns `NotFound`, `Rule` or `NameTaken`.
    pub async fn update(
        &self,
        business_id: Uuid,
        profile_id: Uuid,
        input: UpdateProfileInput,
    ) -> Result<profiles::Model, ProfileRepoError> {
        let profile = self
            .find(business_id, profile_id)
            .await?
            .ok_or(ProfileRepoError::NotFound(profile_id))?;

        let mut draft = to_draft(&profile)?;
        if let Some(name) = input.name {
            ensure_rename_allowed(draft.preset, &profile.name, &name)?;
            draft.name = name.trim().to_string();
        }
        if let Some(description) = input.description {
            draft.description = Some(description).filter(|d| !d.trim().is_empty());
        }
        if let Some(badge) = input.badge {
            draft.badge = badge;
        }
        if let Some(multiplier) = input.earning_multiplier {
            draft.benefits.earning_multiplier = multiplier;
        }
        if let Some(points) = input.welcome_bonus_points {
            draft.benefits.welcome_bonus_points = points;
        }
        if let Some(points) = input.referral_bonus_points {
            draft.benefits.referral_bonus_points = points;
        }
        draft.validate()?;

        let mut active: profiles::ActiveModel = profile.into();
        active.name = Set(draft.name.clone());
        active.description = Set(draft.description.clone());
        active.badge_color = Set(draft.badge.color.clone());
        active.badge_icon = Set(draft.badge.icon.clone());
        active.earning_multiplier_bp = Set(draft.benefits.earning_multiplier.basis_points());
        active.welcome_bonus_points = Set(draft.benefits.welcome_bonus_points);
        active.referral_bonus_points = Set(draft.benefits.referral_bonus_points);
        active.updated_at = Set(Utc::now().into());

        let profile = active
            .update(&self.db)
            .await
            .map_err(|e| name_conflict(e, &draft.name))?;
        info!(business_id = %business_id, profile_id = %profile_id, "Profile updated");
        Ok(profile)
    }

    /// Deletes a custom profile, moving its members to the general profile.
    ///
    /// Returns the number of members moved.
    ///
    /// # Errors
    ///
    /// Returns `NotFound`, or `Rule(NotDeletable)` for presets.
    pub async fn delete(&self, business_id: Uuid, profile_id: Uuid) -> Result<u64, ProfileRepoError> {
        let txn = self.db.begin().await?;
        let profile = find_profile(&txn, business_id, profile_id)
            .await?
            .ok_or(ProfileRepoError::NotFound(profile_id))?;
        ensure_deletable(&profile.name, profile.is_deletable)?;
        let general = find_preset(&txn, business_id, ProfilePreset::General).await?;

        let moved = customers::Entity::update_many()
            .col_expr(customers::Column::ProfileId, Expr::value(general.id))
            .filter(customers::Column::ProfileId.eq(profile_id))
            .exec(&txn)
            .await?
            .rows_affected;

        // Gone since the read: roll back the member moves.
        let deleted = profiles::Entity::delete_many()
            .filter(profiles::Column::Id.eq(profile_id))
            .filter(profiles::Column::BusinessId.eq(business_id))
            .filter(profiles::Column::IsDeletable.eq(true))
            .exec(&txn)
            .await?
            .rows_affected;
        if deleted != 1 {
            txn.rollback().await?;
            return Err(ProfileRepoError::NotFound(profile_id));
        }
        txn.commit().await?;

        info!(business_id = %business_id, profile_id = %profile_id, moved, "Profile deleted");
        Ok(moved)
    }
}

async fn find_profile<C: ConnectionTrait>(
    conn: &C,
    business_id: Uuid,
    profile_id: Uuid,
) -> Result<Option<profiles::Model>, DbErr> {
    profiles::Entity::find_by_id(profile_id)
        .filter(profiles::Column::BusinessId.eq(business_id))
        .one(conn)
        .await
}

fn name_conflict(err: DbErr, name: &str) -> ProfileRepoError {
    if is_unique_violation(&err) {
        ProfileRepoError::NameTaken(name.trim().to_string())
    } else {
        ProfileRepoError::Database(err)
    }
}

//! Business repository: enrollment, approval and branding of businesses.

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};
use tracing::info;
use uuid::Uuid;

use loyalty_core::business::{
    BusinessError, BusinessSettings, BusinessStatus, Branding, validate_business_name,
};
use loyalty_core::profile::{ProfilePreset, default_profiles};
use loyalty_shared::AppError;
use loyalty_shared::types::PageRequest;

use super::profile::new_profile;
use crate::entities::{businesses, categories, profiles, sea_orm_active_enums, sub_categories};

/// Error types for business operations.
#[derive(Debug, thiserror::Error)]
pub enum BusinessRepoError {
    /// Business not found.
    #[error("Business not found: {0}")]
    NotFound(Uuid),

    /// Category not found or inactive.
    #[error("Category not found: {0}")]
    CategoryNotFound(Uuid),

    /// Sub-category does not belong to the category.
    #[error("Sub-category {0} does not belong to the selected category")]
    SubCategoryMismatch(Uuid),

    /// A business rule was violated.
    #[error(transparent)]
    Rule(#[from] BusinessError),

    /// Database error.
    #[error("Database error: {0}")]
    Database(#[from] DbErr),
}

impl From<BusinessRepoError> for AppError {
    fn from(err: BusinessRepoError) -> Self {
        match err {
            BusinessRepoError::NotFound(_) => Self::NotFound(err.to_string()),
            BusinessRepoError::CategoryNotFound(_)
            | BusinessRepoError::SubCategoryMismatch(_)
            | BusinessRepoError::Rule(
                BusinessError::InvalidName
                | BusinessError::InvalidColor(_)
                | BusinessError::UnknownStatus(_),
            ) => Self::Validation(err.to_string()),
            BusinessRepoError::Rule(_) => Self::BusinessRule(err.to_string()),
            BusinessRepoError::Database(e) => Self::Database(e.to_string()),
        }
    }
}

/// Input for enrolling a business.
#[derive(Debug, Clone)]
pub struct CreateBusinessInput {
    /// Owning business-role user.
    pub owner_user_id: Uuid,
    /// Display name.
    pub name: String,
    /// Optional description.
    pub description: Option<String>,
    /// Category.
    pub category_id: Uuid,
    /// Optional sub-category of `category_id`.
    pub sub_category_id: Option<Uuid>,
    /// Colors and logo.
    pub branding: Branding,
    /// Program settings.
    pub settings: BusinessSettings,
}

/// Partial update for a business.
#[derive(Debug, Clone, Default)]
pub struct UpdateBusinessInput {
    /// New name.
    pub name: Option<String>,
    /// New description.
    pub description: Option<String>,
    /// New category; clears the sub-category unless one is given.
    pub category_id: Option<Uuid>,
    /// New sub-category.
    pub sub_category_id: Option<Uuid>,
    /// New branding.
    pub branding: Option<Branding>,
    /// New settings.
    pub settings: Option<BusinessSettings>,
}

/// Filter options for listing businesses.
#[derive(Debug, Clone, Default)]
pub struct BusinessFilter {
    /// Only businesses in this status.
    pub status: Option<BusinessStatus>,
    /// Only businesses owned by this user.
    pub owner_user_id: Option<Uuid>,
}

/// Business repository.
#[derive(Debug, Clone)]
pub struct BusinessRepository {
    db: DatabaseConnection,
}

impl BusinessRepository {
    /// Creates a new business repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Creates a pending business together with its two preset profiles.
    ///
    /// # Errors
    ///
    /// Returns `Rule` for invalid names or colors, `CategoryNotFound` or
    /// `SubCategoryMismatch` for a bad classification.
    pub async fn create_with_default_profiles(
        &self,
        input: CreateBusinessInput,
    ) -> Result<(businesses::Model, Vec<profiles::Model>), BusinessRepoError> {
        validate_business_name(&input.name)?;
        input.branding.validate()?;
        self.check_classification(input.category_id, input.sub_category_id)
            .await?;

        let txn = self.db.begin().await?;
        let now = Utc::now().into();
        let business = businesses::ActiveModel {
            id: Set(Uuid::now_v7()),
            owner_user_id: Set(input.owner_user_id),
            name: Set(input.name.trim().to_string()),
            description: Set(input.description),
            category_id: Set(input.category_id),
            sub_category_id: Set(input.sub_category_id),
            primary_color: Set(input.branding.primary_color),
            secondary_color: Set(input.branding.secondary_color),
            logo_url: Set(input.branding.logo_url),
            status: Set(BusinessStatus::Pending.into()),
            referrals_enabled: Set(input.settings.referrals_enabled),
            welcome_message: Set(input.settings.welcome_message),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&txn)
        .await?;

        let mut profiles = Vec::with_capacity(2);
        for draft in default_profiles() {
            let is_default = draft.preset == Some(ProfilePreset::General);
            profiles.push(new_profile(business.id, &draft, is_default).insert(&txn).await?);
        }
        txn.commit().await?;

        info!(
            business_id = %business.id,
            owner = %business.owner_user_id,
            name = %business.name,
            "Business created with preset profiles"
        );
        Ok((business, profiles))
    }

    /// Finds a business by ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<businesses::Model>, DbErr> {
        businesses::Entity::find_by_id(id).one(&self.db).await
    }

    /// Lists businesses, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn list(
        &self,
        filter: &BusinessFilter,
        page: &PageRequest,
    ) -> Result<(Vec<businesses::Model>, u64), DbErr> {
        let mut query = businesses::Entity::find();
        if let Some(status) = filter.status {
            query = query.filter(
                businesses::Column::Status.eq(sea_orm_active_enums::BusinessStatus::from(status)),
            );
        }
        if let Some(owner) = filter.owner_user_id {
            query = query.filter(businesses::Column::OwnerUserId.eq(owner));
        }

        let total = query.clone().count(&self.db).await?;
        let items = query
            .order_by_desc(businesses::Column::CreatedAt)
            .order_by_asc(businesses::Column::Name)
            .offset(page.offset())
            .limit(page.limit())
            .all(&self.db)
            .await?;

        Ok((items, total))
    }

    /// Updates profile data, branding and settings of a business.
    ///
    /// # Errors
    ///
    /// Returns `NotFound`, `Rule`, `CategoryNotFound` or `SubCategoryMismatch`.
    pub async fn update(
        &self,
        id: Uuid,
        input: UpdateBusinessInput,
    ) -> Result<businesses::Model, BusinessRepoError> {
        let business = self
            .find_by_id(id)
            .await?
            .ok_or(BusinessRepoError::NotFound(id))?;

        if let Some(name) = &input.name {
            validate_business_name(name)?;
        }
        if let Some(branding) = &input.branding {
            branding.validate()?;
        }

        let category_id = input.category_id.unwrap_or(business.category_id);
        let sub_category_id = match (input.category_id, input.sub_category_id) {
            (_, Some(sub)) => Some(sub),
            (Some(_), None) => None,
            (None, None) => business.sub_category_id,
        };
        if input.category_id.is_some() || input.sub_category_id.is_some() {
            self.check_classification(category_id, sub_category_id).await?;
        }

        let mut active: businesses::ActiveModel = business.into();
        if let Some(name) = input.name {
            active.name = Set(name.trim().to_string());
        }
        if let Some(description) = input.description {
            active.description = Set(Some(description).filter(|d| !d.trim().is_empty()));
        }
        active.category_id = Set(category_id);
        active.sub_category_id = Set(sub_category_id);
        if let Some(branding) = input.branding {
            active.primary_color = Set(branding.primary_color);
            active.secondary_color = Set(branding.secondary_color);
            active.logo_url = Set(branding.logo_url);
        }
        if let Some(settings) = input.settings {
            active.referrals_enabled = Set(settings.referrals_enabled);
            active.welcome_message = Set(settings.welcome_message);
        }
        active.updated_at = Set(Utc::now().into());

        let business = active.update(&self.db).await?;
        info!(business_id = %id, "Business updated");
        Ok(business)
    }

    /// Moves a business to `target` status (approve, reject, suspend).
    ///
    /// # Errors
    ///
    /// Returns `NotFound` or `Rule(InvalidTransition)`.
    pub async fn set_status(
        &self,
        id: Uuid,
        target: BusinessStatus,
    ) -> Result<businesses::Model, BusinessRepoError> {
        let business = self
            .find_by_id(id)
            .await?
            .ok_or(BusinessRepoError::NotFound(id))?;

        let current: BusinessStatus = business.status.into();
        let next = current.transition(target)?;

        let mut active: businesses::ActiveModel = business.into();
        active.status = Set(next.into());
        active.updated_at = Set(Utc::now().into());
        let business = active.update(&self.db).await?;

        info!(business_id = %id, from = %current, to = %next, "Business status changed");
        Ok(business)
    }

    /// Deletes a business with its profiles, members, wallets and ledger.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for an unknown ID.
    pub async fn delete(&self, id: Uuid) -> Result<(), BusinessRepoError> {
        let result = businesses::Entity::delete_by_id(id).exec(&self.db).await?;
        if result.rows_affected == 0 {
            return Err(BusinessRepoError::NotFound(id));
        }
        info!(business_id = %id, "Business deleted");
        Ok(())
    }

    async fn check_classification(
        &self,
        category_id: Uuid,
        sub_category_id: Option<Uuid>,
    ) -> Result<(), BusinessRepoError> {
        let category = categories::Entity::find_by_id(category_id)
            .one(&self.db)
            .await?
            .filter(|c| c.is_active)
            .ok_or(BusinessRepoError::CategoryNotFound(category_id))?;

        if let Some(sub_id) = sub_category_id {
            let belongs = sub_categories::Entity::find_by_id(sub_id)
                .one(&self.db)
                .await?
                .is_some_and(|sub| sub.category_id == category.id);
            if !belongs {
                return Err(BusinessRepoError::SubCategoryMismatch(sub_id));
            }
        }
        Ok(())
    }
}

//! Category repository: the business catalog managed by admins.

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, ModelTrait,
    PaginatorTrait, QueryFilter, QueryOrder, Set,
};
use tracing::info;
use uuid::Uuid;

use loyalty_shared::AppError;

use crate::entities::{businesses, categories, sub_categories};
use crate::is_unique_violation;

/// Error types for category operations.
#[derive(Debug, thiserror::Error)]
pub enum CategoryRepoError {
    /// Category not found.
    #[error("Category not found: {0}")]
    NotFound(Uuid),

    /// Sub-category not found.
    #[error("Sub-category not found: {0}")]
    SubCategoryNotFound(Uuid),

    /// Name already used.
    #[error("Name already exists: {0}")]
    NameTaken(String),

    /// Name is blank.
    #[error("Name is required")]
    EmptyName,

    /// Businesses still reference the category.
    #[error("Category {0} is used by businesses and cannot be deleted")]
    InUse(Uuid),

    /// Database error.
    #[error("Database error: {0}")]
    Database(#[from] DbErr),
}

impl From<CategoryRepoError> for AppError {
    fn from(err: CategoryRepoError) -> Self {
        match err {
            CategoryRepoError::NotFound(_) | CategoryRepoError::SubCategoryNotFound(_) => {
                Self::NotFound(err.to_string())
            }
            CategoryRepoError::NameTaken(_) | CategoryRepoError::InUse(_) => {
                Self::Conflict(err.to_string())
            }
            CategoryRepoError::EmptyName => Self::Validation(err.to_string()),
            CategoryRepoError::Database(e) => Self::Database(e.to_string()),
        }
    }
}

/// Partial update for a category.
#[derive(Debug, Clone, Default)]
pub struct UpdateCategoryInput {
    /// New name.
    pub name: Option<String>,
    /// New description.
    pub description: Option<String>,
    /// Hide or show the category.
    pub is_active: Option<bool>,
}

/// A category with its sub-categories.
#[derive(Debug, Clone)]
pub struct CategoryWithSubCategories {
    /// The category.
    pub category: categories::Model,
    /// Its sub-categories, by name.
    pub sub_categories: Vec<sub_categories::Model>,
}

/// Category repository.
#[derive(Debug, Clone)]
pub struct CategoryRepository {
    db: DatabaseConnection,
}

impl CategoryRepository {
    /// Creates a new category repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Creates a category.
    ///
    /// # Errors
    ///
    /// Returns `NameTaken` for duplicate names.
    pub async fn create(
        &self,
        name: &str,
        description: Option<String>,
    ) -> Result<categories::Model, CategoryRepoError> {
        let name = clean_name(name)?;
        let now = Utc::now().into();
        let category = categories::ActiveModel {
            id: Set(Uuid::now_v7()),
            name: Set(name.clone()),
            description: Set(description),
            is_active: Set(true),
            created_at: Set(now),
            updated_at: Set(now),
        };

        let category = category
            .insert(&self.db)
            .await
            .map_err(|e| name_conflict(e, &name))?;
        info!(category_id = %category.id, name = %category.name, "Category created");
        Ok(category)
    }

    /// Lists categories with their sub-categories, by name.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn list(
        &self,
        include_inactive: bool,
    ) -> Result<Vec<CategoryWithSubCategories>, DbErr> {
        let mut query = categories::Entity::find();
        if !include_inactive {
            query = query.filter(categories::Column::IsActive.eq(true));
        }

        let rows = query
            .order_by_asc(categories::Column::Name)
            .find_with_related(sub_categories::Entity)
            .all(&self.db)
            .await?;

        Ok(rows
            .into_iter()
            .map(|(category, mut subs)| {
                subs.sort_by(|a, b| a.name.cmp(&b.name));
                CategoryWithSubCategories {
                    category,
                    sub_categories: subs,
                }
            })
            .collect())
    }

    /// Finds a category by ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<categories::Model>, DbErr> {
        categories::Entity::find_by_id(id).one(&self.db).await
    }

    /// Finds a sub-category by ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn find_sub_category(&self, id: Uuid) -> Result<Option<sub_categories::Model>, DbErr> {
        sub_categories::Entity::find_by_id(id).one(&self.db).await
    }

    /// Updates a category.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` or `NameTaken`.
    pub async fn update(
        &self,
        id: Uuid,
        input: UpdateCategoryInput,
    ) -> Result<categories::Model, CategoryRepoError> {
        let category = self
            .find_by_id(id)
            .await?
            .ok_or(CategoryRepoError::NotFound(id))?;

        let mut active: categories::ActiveModel = category.into();
        let mut new_name = None;
        if let Some(name) = input.name {
            let name = clean_name(&name)?;
            active.name = Set(name.clone());
            new_name = Some(name);
        }
        if let Some(description) = input.description {
            active.description = Set(Some(description).filter(|d| !d.trim().is_empty()));
        }
        if let Some(is_active) = input.is_active {
            active.is_active = Set(is_active);
        }
        active.updated_at = Set(Utc::now().into());

        active.update(&self.db).await.map_err(|e| match new_name {
            Some(name) => name_conflict(e, &name),
            None => e.into(),
        })
    }

    /// Deletes a category and its sub-categories.
    ///
    /// # Errors
    ///
    /// Returns `InUse` while businesses reference the category.
    pub async fn delete(&self, id: Uuid) -> Result<(), CategoryRepoError> {
        let category = self
            .find_by_id(id)
            .await?
            .ok_or(CategoryRepoError::NotFound(id))?;

        let in_use = businesses::Entity::find()
            .filter(businesses::Column::CategoryId.eq(id))
            .count(&self.db)
            .await?;
        if in_use > 0 {
            return Err(CategoryRepoError::InUse(id));
        }

        category.delete(&self.db).await?;
        info!(category_id = %id, "Category deleted");
        Ok(())
    }

    /// Adds a sub-category.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for an unknown category, `NameTaken` for duplicates
    /// within the category.
    pub async fn create_sub_category(
        &self,
        category_id: Uuid,
        name: &str,
    ) -> Result<sub_categories::Model, CategoryRepoError> {
        let name = clean_name(name)?;
        if self.find_by_id(category_id).await?.is_none() {
            return Err(CategoryRepoError::NotFound(category_id));
        }

        let sub = sub_categories::ActiveModel {
            id: Set(Uuid::now_v7()),
            category_id: Set(category_id),
            name: Set(name.clone()),
            created_at: Set(Utc::now().into()),
        };
        sub.insert(&self.db).await.map_err(|e| name_conflict(e, &name))
    }

    /// Deletes a sub-category. Businesses using it lose their sub-category.
    ///
    /// # Errors
    ///
    /// Returns `SubCategoryNotFound` for an unknown ID.
    pub async fn delete_sub_category(&self, id: Uuid) -> Result<(), CategoryRepoError> {
        let result = sub_categories::Entity::delete_by_id(id).exec(&self.db).await?;
        if result.rows_affected == 0 {
            return Err(CategoryRepoError::SubCategoryNotFound(id));
        }
        Ok(())
    }
}

fn clean_name(name: &str) -> Result<String, CategoryRepoError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(CategoryRepoError::EmptyName);
    }
    Ok(name.to_string())
}

fn name_conflict(err: DbErr, name: &str) -> CategoryRepoError {
    if is_unique_violation(&err) {
        CategoryRepoError::NameTaken(name.to_string())
    } else {
        CategoryRepoError::Database(err)
    }
}

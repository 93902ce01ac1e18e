//! Business category routes. Reading is open to any signed-in user; changes
//! are admin-only.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{delete, get, patch, post},
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::error::ApiResult;
use crate::extractors::ValidatedJson;
use crate::{AppState, middleware::AuthUser};
use loyalty_db::entities::{categories, sub_categories};
use loyalty_db::repositories::{
    CategoryRepository, CategoryWithSubCategories, UpdateCategoryInput,
};

/// Creates the category routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/categories", get(list_categories).post(create_category))
        .route("/categories/{id}", patch(update_category).delete(delete_category))
        .route("/categories/{id}/sub-categories", post(create_sub_category))
        .route("/sub-categories/{id}", delete(delete_sub_category))
}

/// Query parameters for listing categories.
#[derive(Debug, Deserialize)]
pub struct ListCategoriesQuery {
    /// Include deactivated categories (admins only).
    #[serde(default)]
    pub include_inactive: bool,
}

/// Request body for creating a category.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateCategoryRequest {
    /// Category name.
    #[validate(length(min = 1, max = 80))]
    pub name: String,
    /// Optional description.
    #[validate(length(max = 500))]
    pub description: Option<String>,
}

/// Request body for updating a category.
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateCategoryRequest {
    /// New name.
    #[validate(length(min = 1, max = 80))]
    pub name: Option<String>,
    /// New description.
    #[validate(length(max = 500))]
    pub description: Option<String>,
    /// Activate or deactivate.
    pub is_active: Option<bool>,
}

/// Request body for creating a sub-category.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateSubCategoryRequest {
    /// Sub-category name.
    #[validate(length(min = 1, max = 80))]
    pub name: String,
}

/// A category with its sub-categories.
#[derive(Debug, Serialize)]
pub struct CategoryResponse {
    /// The category.
    #[serde(flatten)]
    pub category: categories::Model,
    /// Its sub-categories, by name.
    pub sub_categories: Vec<sub_categories::Model>,
}

impl From<CategoryWithSubCategories> for CategoryResponse {
    fn from(value: CategoryWithSubCategories) -> Self {
        Self {
            category: value.category,
            sub_categories: value.sub_categories,
        }
    }
}

/// GET /categories
async fn list_categories(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(query): Query<ListCategoriesQuery>,
) -> ApiResult<Json<Vec<CategoryResponse>>> {
    let include_inactive = query.include_inactive && auth.role.is_admin();
    let items = CategoryRepository::new((*state.db).clone())
        .list(include_inactive)
        .await?;
    Ok(Json(items.into_iter().map(Into::into).collect()))
}

/// POST /categories
async fn create_category(
    State(state): State<AppState>,
    auth: AuthUser,
    ValidatedJson(payload): ValidatedJson<CreateCategoryRequest>,
) -> ApiResult<(StatusCode, Json<categories::Model>)> {
    auth.require_admin()?;
    let category = CategoryRepository::new((*state.db).clone())
        .create(&payload.name, payload.description)
        .await?;
    Ok((StatusCode::CREATED, Json(category)))
}

/// PATCH /categories/{id}
async fn update_category(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
    ValidatedJson(payload): ValidatedJson<UpdateCategoryRequest>,
) -> ApiResult<Json<categories::Model>> {
    auth.require_admin()?;
    let category = CategoryRepository::new((*state.db).clone())
        .update(
            id,
            UpdateCategoryInput {
                name: payload.name,
                description: payload.description,
                is_active: payload.is_active,
            },
        )
        .await?;
    Ok(Json(category))
}

/// DELETE /categories/{id}
async fn delete_category(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    auth.require_admin()?;
    CategoryRepository::new((*state.db).clone())
        .delete(id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /categories/{id}/sub-categories
async fn create_sub_category(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
    ValidatedJson(payload): ValidatedJson<CreateSubCategoryRequest>,
) -> ApiResult<(StatusCode, Json<sub_categories::Model>)> {
    auth.require_admin()?;
    let sub = CategoryRepository::new((*state.db).clone())
        .create_sub_category(id, &payload.name)
        .await?;
    Ok((StatusCode::CREATED, Json(sub)))
}

/// DELETE /sub-categories/{id}
async fn delete_sub_category(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    auth.require_admin()?;
    CategoryRepository::new((*state.db).clone())
        .delete_sub_category(id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

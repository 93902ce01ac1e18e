//! User administration routes.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::{get, patch},
};
use serde::Deserialize;
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};
use crate::routes::PageQuery;
use crate::{AppState, middleware::AuthUser};
use loyalty_core::auth::{UnknownRole, UserRole};
use loyalty_db::entities::users;
use loyalty_db::repositories::UserRepository;
use loyalty_shared::types::PageResponse;

/// Creates the user routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/users", get(list_users))
        .route("/users/{id}", patch(set_user_active))
}

/// Query parameters for listing users.
#[derive(Debug, Deserialize)]
pub struct ListUsersQuery {
    /// Filter by role.
    pub role: Option<String>,
    /// Page number (1-indexed).
    pub page: Option<u32>,
    /// Items per page.
    pub per_page: Option<u32>,
}

/// Request body for activating or deactivating a user.
#[derive(Debug, Deserialize)]
pub struct SetActiveRequest {
    /// New activation state.
    pub is_active: bool,
}

/// GET /users - All accounts, newest first.
async fn list_users(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(query): Query<ListUsersQuery>,
) -> ApiResult<Json<PageResponse<users::Model>>> {
    auth.require_admin()?;
    let role = query
        .role
        .as_deref()
        .map(str::parse::<UserRole>)
        .transpose()
        .map_err(|e: UnknownRole| ApiError::validation(e.to_string()))?;

    let page = PageQuery {
        page: query.page,
        per_page: query.per_page,
    }
    .to_request();
    let (items, total) = UserRepository::new((*state.db).clone())
        .list(role, &page)
        .await?;
    Ok(Json(PageResponse::new(items, page.page, page.per_page, total)))
}

/// PATCH /users/{id} - Activate or deactivate an account.
async fn set_user_active(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<SetActiveRequest>,
) -> ApiResult<Json<users::Model>> {
    auth.require_admin()?;
    if id == auth.user_id && !payload.is_active {
        return Err(ApiError::business_rule("Administrators cannot deactivate themselves"));
    }
    let user = UserRepository::new((*state.db).clone())
        .set_active(id, payload.is_active)
        .await?;
    Ok(Json(user))
}

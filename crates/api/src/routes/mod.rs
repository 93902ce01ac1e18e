//! API route definitions.

use axum::{Router, middleware};
use uuid::Uuid;

use crate::{AppState, error::ApiError, middleware::AuthUser, middleware::auth_middleware};
use loyalty_db::BusinessRepository;
use loyalty_shared::types::PageRequest;

pub mod auth;
pub mod businesses;
pub mod categories;
pub mod customers;
pub mod enrollments;
pub mod health;
pub mod profiles;
pub mod transactions;
pub mod users;
pub mod wallets;

/// Creates the API router with protected routes that need state for middleware.
#[allow(clippy::needless_pass_by_value)]
pub fn api_routes_with_state(state: AppState) -> Router<AppState> {
    // Protected routes that require authentication
    let protected_routes = Router::new()
        .merge(auth::protected_routes())
        .merge(categories::routes())
        .merge(users::routes())
        .merge(businesses::routes())
        .merge(profiles::routes())
        .merge(enrollments::routes())
        .merge(customers::routes())
        .merge(transactions::routes())
        .merge(wallets::routes())
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    // Combine public and protected routes
    Router::new()
        .merge(health::routes())
        .merge(auth::routes())
        .merge(protected_routes)
}

/// Loads a business the caller may manage: its owner or an admin.
///
/// Other callers get 404 rather than 403 so business ids do not leak.
pub(crate) async fn managed_business(
    state: &AppState,
    auth: &AuthUser,
    business_id: Uuid,
) -> Result<loyalty_db::entities::businesses::Model, ApiError> {
    let business = BusinessRepository::new((*state.db).clone())
        .find_by_id(business_id)
        .await?
        .filter(|b| auth.role.is_admin() || b.owner_user_id == auth.user_id)
        .ok_or_else(|| ApiError::not_found(format!("Business not found: {business_id}")))?;
    Ok(business)
}

/// Pagination query parameters shared by list endpoints.
#[derive(Debug, Clone, Copy, serde::Deserialize)]
pub struct PageQuery {
    /// Page number (1-indexed).
    pub page: Option<u32>,
    /// Items per page.
    pub per_page: Option<u32>,
}

impl PageQuery {
    /// Converts to a clamped [`PageRequest`].
    #[must_use]
    pub fn to_request(self) -> PageRequest {
        let defaults = PageRequest::default();
        PageRequest {
            page: self.page.unwrap_or(defaults.page),
            per_page: self.per_page.unwrap_or(defaults.per_page),
        }
        .normalized()
    }
}

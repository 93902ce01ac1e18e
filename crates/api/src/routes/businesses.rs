//! Business routes: registration by business accounts, admin review, and
//! owner management.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;
use validator::{Validate, ValidateUrl, ValidationError};

use crate::error::{ApiError, ApiResult};
use crate::extractors::ValidatedJson;
use crate::routes::{PageQuery, managed_business};
use crate::{AppState, middleware::AuthUser};
use loyalty_core::business::{Branding, BusinessSettings, BusinessStatus};
use loyalty_db::entities::{businesses, profiles};
use loyalty_db::repositories::{
    BusinessFilter, BusinessRepository, CreateBusinessInput, UpdateBusinessInput,
};
use loyalty_shared::types::PageResponse;

/// Creates the business routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/businesses", get(list_businesses).post(create_business))
        .route(
            "/businesses/{id}",
            get(get_business)
                .patch(update_business)
                .delete(delete_business),
        )
        .route("/businesses/{id}/approve", post(approve_business))
        .route("/businesses/{id}/reject", post(reject_business))
}

// ============================================================================
// Request/Response Types
// ============================================================================

/// Query parameters for listing businesses.
#[derive(Debug, Deserialize)]
pub struct ListBusinessesQuery {
    /// Filter by status (`pending`, `active`, `rejected`).
    pub status: Option<String>,
    /// Page number (1-indexed).
    pub page: Option<u32>,
    /// Items per page.
    pub per_page: Option<u32>,
}

/// Request body for registering a business.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateBusinessRequest {
    /// Display name.
    #[validate(length(min = 1, max = 120))]
    pub name: String,
    /// Optional description.
    #[validate(length(max = 1000))]
    pub description: Option<String>,
    /// Category.
    pub category_id: Uuid,
    /// Optional sub-category of `category_id`.
    pub sub_category_id: Option<Uuid>,
    /// Main brand color (`#RRGGBB`).
    pub primary_color: Option<String>,
    /// Accent color (`#RRGGBB`).
    pub secondary_color: Option<String>,
    /// Externally hosted logo.
    #[validate(url)]
    pub logo_url: Option<String>,
    /// Whether referral codes grant bonuses (default true).
    pub referrals_enabled: Option<bool>,
    /// Message shown to customers after enrolling.
    #[validate(length(max = 500))]
    pub welcome_message: Option<String>,
}

/// Request body for updating a business. Absent fields are unchanged; an
/// empty `logo_url` or `welcome_message` clears it.
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateBusinessRequest {
    /// Display name.
    #[validate(length(min = 1, max = 120))]
    pub name: Option<String>,
    /// Description.
    #[validate(length(max = 1000))]
    pub description: Option<String>,
    /// Category.
    pub category_id: Option<Uuid>,
    /// Sub-category.
    pub sub_category_id: Option<Uuid>,
    /// Main brand color.
    pub primary_color: Option<String>,
    /// Accent color.
    pub secondary_color: Option<String>,
    /// Logo URL.
    #[validate(custom(function = "url_or_empty"))]
    pub logo_url: Option<String>,
    /// Referral switch.
    pub referrals_enabled: Option<bool>,
    /// Welcome message.
    #[validate(length(max = 500))]
    pub welcome_message: Option<String>,
}

fn url_or_empty(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() || value.validate_url() {
        Ok(())
    } else {
        Err(ValidationError::new("url"))
    }
}

/// `None` keeps `current`; a blank value clears it.
fn merge_clearable(update: Option<&str>, current: Option<&str>) -> Option<String> {
    match update.map(str::trim) {
        Some("") => None,
        Some(value) => Some(value.to_string()),
        None => current.map(str::to_string),
    }
}

impl UpdateBusinessRequest {
    fn touches_branding(&self) -> bool {
        self.primary_color.is_some() || self.secondary_color.is_some() || self.logo_url.is_some()
    }

    fn touches_settings(&self) -> bool {
        self.referrals_enabled.is_some() || self.welcome_message.is_some()
    }
}

/// A newly registered business with its seeded profiles.
#[derive(Debug, Serialize)]
pub struct CreatedBusinessResponse {
    /// The business.
    pub business: businesses::Model,
    /// `General Members` and `Referred Customers`.
    pub profiles: Vec<profiles::Model>,
}

// ============================================================================
// Handlers
// ============================================================================

/// GET /businesses - Admins see all businesses, owners see their own.
async fn list_businesses(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(query): Query<ListBusinessesQuery>,
) -> ApiResult<Json<PageResponse<businesses::Model>>> {
    if !auth.role.is_admin() && !auth.role.can_create_business() {
        return Err(ApiError::forbidden("Only business accounts can list businesses"));
    }
    let status = query
        .status
        .as_deref()
        .map(str::parse::<BusinessStatus>)
        .transpose()
        .map_err(|e| ApiError::validation(e.to_string()))?;

    let filter = BusinessFilter {
        status,
        owner_user_id: (!auth.role.is_admin()).then_some(auth.user_id),
    };
    let page = PageQuery {
        page: query.page,
        per_page: query.per_page,
    }
    .to_request();

    let (items, total) = BusinessRepository::new((*state.db).clone())
        .list(&filter, &page)
        .await?;
    Ok(Json(PageResponse::new(items, page.page, page.per_page, total)))
}

/// POST /businesses - Register a business (starts `pending`).
async fn create_business(
    State(state): State<AppState>,
    auth: AuthUser,
    ValidatedJson(payload): ValidatedJson<CreateBusinessRequest>,
) -> ApiResult<(StatusCode, Json<CreatedBusinessResponse>)> {
    if !auth.role.can_create_business() {
        return Err(ApiError::forbidden("Only business accounts can register businesses"));
    }

    let defaults = Branding::default();
    let settings = BusinessSettings::default();
    let (business, profiles) = BusinessRepository::new((*state.db).clone())
        .create_with_default_profiles(CreateBusinessInput {
            owner_user_id: auth.user_id,
            name: payload.name,
            description: payload.description,
            category_id: payload.category_id,
            sub_category_id: payload.sub_category_id,
            branding: Branding {
                primary_color: payload.primary_color.unwrap_or(defaults.primary_color),
                secondary_color: payload.secondary_color.unwrap_or(defaults.secondary_color),
                logo_url: payload.logo_url,
            },
            settings: BusinessSettings {
                referrals_enabled: payload.referrals_enabled.unwrap_or(settings.referrals_enabled),
                welcome_message: payload.welcome_message,
            },
        })
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(CreatedBusinessResponse { business, profiles }),
    ))
}

/// GET /businesses/{id}
async fn get_business(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<businesses::Model>> {
    Ok(Json(managed_business(&state, &auth, id).await?))
}

/// PATCH /businesses/{id}
async fn update_business(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
    ValidatedJson(payload): ValidatedJson<UpdateBusinessRequest>,
) -> ApiResult<Json<businesses::Model>> {
    let current = managed_business(&state, &auth, id).await?;

    let branding = payload.touches_branding().then(|| Branding {
        primary_color: payload
            .primary_color
            .clone()
            .unwrap_or_else(|| current.primary_color.clone()),
        secondary_color: payload
            .secondary_color
            .clone()
            .unwrap_or_else(|| current.secondary_color.clone()),
        logo_url: merge_clearable(payload.logo_url.as_deref(), current.logo_url.as_deref()),
    });
    let settings = payload.touches_settings().then(|| BusinessSettings {
        referrals_enabled: payload
            .referrals_enabled
            .unwrap_or(current.referrals_enabled),
        welcome_message: merge_clearable(
            payload.welcome_message.as_deref(),
            current.welcome_message.as_deref(),
        ),
    });

    let business = BusinessRepository::new((*state.db).clone())
        .update(
            id,
            UpdateBusinessInput {
                name: payload.name,
                description: payload.description,
                category_id: payload.category_id,
                sub_category_id: payload.sub_category_id,
                branding,
                settings,
            },
        )
        .await?;
    Ok(Json(business))
}

/// DELETE /businesses/{id} - Removes the business with its profiles,
/// memberships, wallets and ledger.
async fn delete_business(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    managed_business(&state, &auth, id).await?;
    BusinessRepository::new((*state.db).clone())
        .delete(id)
        .await?;
    info!(business_id = %id, deleted_by = %auth.user_id, "Business removed");
    Ok(StatusCode::NO_CONTENT)
}

/// POST /businesses/{id}/approve
async fn approve_business(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<businesses::Model>> {
    review(&state, &auth, id, BusinessStatus::Active).await
}

/// POST /businesses/{id}/reject - Rejects a pending business or suspends an active one.
async fn reject_business(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<businesses::Model>> {
    review(&state, &auth, id, BusinessStatus::Rejected).await
}

async fn review(
    state: &AppState,
    auth: &AuthUser,
    id: Uuid,
    target: BusinessStatus,
) -> ApiResult<Json<businesses::Model>> {
    auth.require_admin()?;
    let business = BusinessRepository::new((*state.db).clone())
        .set_status(id, target)
        .await?;
    info!(business_id = %id, status = %target, reviewed_by = %auth.user_id, "Business reviewed");
    Ok(Json(business))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(None, Some("kept"), Some("kept"))]
    #[case(Some("new"), Some("old"), Some("new"))]
    #[case(Some(""), Some("old"), None)]
    #[case(Some("   "), Some("old"), None)]
    #[case(None, None, None)]
    fn test_merge_clearable(
        #[case] update: Option<&str>,
        #[case] current: Option<&str>,
        #[case] expected: Option<&str>,
    ) {
        assert_eq!(merge_clearable(update, current).as_deref(), expected);
    }

    #[test]
    fn test_update_accepts_empty_logo_url() {
        let request: UpdateBusinessRequest =
            serde_json::from_value(serde_json::json!({ "logo_url": "" })).unwrap();
        assert!(request.validate().is_ok());

        let request: UpdateBusinessRequest =
            serde_json::from_value(serde_json::json!({ "logo_url": "not a url" })).unwrap();
        assert!(request.validate().is_err());
    }
}

//! Membership profile routes and registration QR codes.

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::get,
};
use chrono::{DateTime, FixedOffset};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::error::{ApiError, ApiResult};
use crate::extractors::ValidatedJson;
use crate::routes::managed_business;
use crate::{AppState, middleware::AuthUser};
use loyalty_core::points::Multiplier;
use loyalty_core::profile::{BadgeStyle, ProfileBenefits, ProfileDraft, ProfilePreset};
use loyalty_core::qr::QrPayload;
use loyalty_db::entities::profiles;
use loyalty_db::repositories::{ProfileRepository, UpdateProfileInput};
use loyalty_shared::AppError;
use loyalty_shared::types::{BusinessId, ProfileId};

/// Creates the profile routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route(
            "/businesses/{id}/profiles",
            get(list_profiles).post(create_profile),
        )
        .route(
            "/businesses/{id}/profiles/{profile_id}",
            get(get_profile)
                .patch(update_profile)
                .delete(delete_profile),
        )
        .route("/businesses/{id}/profiles/{profile_id}/qr", get(profile_qr))
}

// ============================================================================
// Request/Response Types
// ============================================================================

/// Badge styling in requests and responses.
#[derive(Debug, Clone, Deserialize, Serialize, Validate)]
pub struct BadgeBody {
    /// `#RRGGBB` color.
    #[validate(length(equal = 7))]
    pub color: String,
    /// Optional icon name.
    #[validate(length(max = 40))]
    pub icon: Option<String>,
}

/// Request body for creating a profile.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateProfileRequest {
    /// Unique name within the business.
    #[validate(length(min = 1, max = 60))]
    pub name: String,
    /// Optional description.
    #[validate(length(max = 500))]
    pub description: Option<String>,
    /// Badge styling; defaults to grey without an icon.
    #[validate(nested)]
    pub badge: Option<BadgeBody>,
    /// Earning multiplier, at least 1.
    pub earning_multiplier: Option<Multiplier>,
    /// One-time points on enrollment.
    #[serde(default)]
    pub welcome_bonus_points: i64,
    /// Points for the referrer per referred customer.
    #[serde(default)]
    pub referral_bonus_points: i64,
}

/// Request body for updating a profile. Absent fields are unchanged.
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateProfileRequest {
    /// New name (not allowed for the seeded profiles).
    #[validate(length(min = 1, max = 60))]
    pub name: Option<String>,
    /// New description.
    #[validate(length(max = 500))]
    pub description: Option<String>,
    /// New badge styling.
    #[validate(nested)]
    pub badge: Option<BadgeBody>,
    /// New multiplier.
    pub earning_multiplier: Option<Multiplier>,
    /// New welcome bonus.
    pub welcome_bonus_points: Option<i64>,
    /// New referral bonus.
    pub referral_bonus_points: Option<i64>,
}

/// A profile as clients see it.
#[derive(Debug, Serialize)]
pub struct ProfileResponse {
    /// Profile ID.
    pub id: Uuid,
    /// Owning business.
    pub business_id: Uuid,
    /// Name.
    pub name: String,
    /// Description.
    pub description: Option<String>,
    /// Badge styling.
    pub badge: BadgeBody,
    /// Earning multiplier, e.g. `"1.5"`.
    pub earning_multiplier: Decimal,
    /// Welcome bonus.
    pub welcome_bonus_points: i64,
    /// Referral bonus.
    pub referral_bonus_points: i64,
    /// Seeded preset, if any.
    pub preset: Option<ProfilePreset>,
    /// Whether new scans without a profile land here.
    pub is_default: bool,
    /// Seeded profiles cannot be deleted.
    pub is_deletable: bool,
    /// Created at.
    pub created_at: DateTime<FixedOffset>,
    /// Updated at.
    pub updated_at: DateTime<FixedOffset>,
}

impl TryFrom<profiles::Model> for ProfileResponse {
    type Error = ApiError;

    fn try_from(model: profiles::Model) -> Result<Self, Self::Error> {
        let multiplier = Multiplier::from_basis_points(model.earning_multiplier_bp).map_err(|e| {
            ApiError(AppError::Internal(format!(
                "profile {} has an invalid multiplier: {e}",
                model.id
            )))
        })?;
        Ok(Self {
            id: model.id,
            business_id: model.business_id,
            name: model.name,
            description: model.description,
            badge: BadgeBody {
                color: model.badge_color,
                icon: model.badge_icon,
            },
            earning_multiplier: multiplier.value(),
            welcome_bonus_points: model.welcome_bonus_points,
            referral_bonus_points: model.referral_bonus_points,
            preset: model.preset.map(Into::into),
            is_default: model.is_default,
            is_deletable: model.is_deletable,
            created_at: model.created_at,
            updated_at: model.updated_at,
        })
    }
}

/// Registration QR for a profile.
#[derive(Debug, Serialize)]
pub struct ProfileQrResponse {
    /// The string to render as a QR code.
    pub content: String,
    /// The same payload, decoded.
    pub payload: QrPayload,
    /// Deep link for sharing without a QR code.
    pub url: String,
}

/// Deletion outcome.
#[derive(Debug, Serialize)]
pub struct DeleteProfileResponse {
    /// Members moved to `General Members`.
    pub members_moved: u64,
}

// ============================================================================
// Handlers
// ============================================================================

/// GET /businesses/{id}/profiles - Presets first.
async fn list_profiles(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(business_id): Path<Uuid>,
) -> ApiResult<Json<Vec<ProfileResponse>>> {
    managed_business(&state, &auth, business_id).await?;
    let items = ProfileRepository::new((*state.db).clone())
        .list_by_business(business_id)
        .await?;
    let items = items
        .into_iter()
        .map(ProfileResponse::try_from)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Json(items))
}

/// POST /businesses/{id}/profiles
async fn create_profile(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(business_id): Path<Uuid>,
    ValidatedJson(payload): ValidatedJson<CreateProfileRequest>,
) -> ApiResult<(StatusCode, Json<ProfileResponse>)> {
    managed_business(&state, &auth, business_id).await?;

    let mut draft = ProfileDraft::custom(
        payload.name,
        ProfileBenefits {
            earning_multiplier: payload.earning_multiplier.unwrap_or_default(),
            welcome_bonus_points: payload.welcome_bonus_points,
            referral_bonus_points: payload.referral_bonus_points,
        },
    );
    draft.description = payload.description;
    if let Some(badge) = payload.badge {
        draft.badge = BadgeStyle {
            color: badge.color,
            icon: badge.icon,
        };
    }

    let profile = ProfileRepository::new((*state.db).clone())
        .create(business_id, &draft)
        .await?;
    Ok((StatusCode::CREATED, Json(ProfileResponse::try_from(profile)?)))
}

/// GET /businesses/{id}/profiles/{profile_id}
async fn get_profile(
    State(state): State<AppState>,
    auth: AuthUser,
    Path((business_id, profile_id)): Path<(Uuid, Uuid)>,
) -> ApiResult<Json<ProfileResponse>> {
    managed_business(&state, &auth, business_id).await?;
    let profile = find_profile(&state, business_id, profile_id).await?;
    Ok(Json(ProfileResponse::try_from(profile)?))
}

/// PATCH /businesses/{id}/profiles/{profile_id}
async fn update_profile(
    State(state): State<AppState>,
    auth: AuthUser,
    Path((business_id, profile_id)): Path<(Uuid, Uuid)>,
    ValidatedJson(payload): ValidatedJson<UpdateProfileRequest>,
) -> ApiResult<Json<ProfileResponse>> {
    managed_business(&state, &auth, business_id).await?;
    let profile = ProfileRepository::new((*state.db).clone())
        .update(
            business_id,
            profile_id,
            UpdateProfileInput {
                name: payload.name,
                description: payload.description,
                badge: payload.badge.map(|b| BadgeStyle {
                    color: b.color,
                    icon: b.icon,
                }),
                earning_multiplier: payload.earning_multiplier,
                welcome_bonus_points: payload.welcome_bonus_points,
                referral_bonus_points: payload.referral_bonus_points,
            },
        )
        .await?;
    Ok(Json(ProfileResponse::try_from(profile)?))
}

/// DELETE /businesses/{id}/profiles/{profile_id} - Members fall back to
/// `General Members`.
async fn delete_profile(
    State(state): State<AppState>,
    auth: AuthUser,
    Path((business_id, profile_id)): Path<(Uuid, Uuid)>,
) -> ApiResult<Json<DeleteProfileResponse>> {
    managed_business(&state, &auth, business_id).await?;
    let members_moved = ProfileRepository::new((*state.db).clone())
        .delete(business_id, profile_id)
        .await?;
    Ok(Json(DeleteProfileResponse { members_moved }))
}

/// GET /businesses/{id}/profiles/{profile_id}/qr
async fn profile_qr(
    State(state): State<AppState>,
    auth: AuthUser,
    Path((business_id, profile_id)): Path<(Uuid, Uuid)>,
) -> ApiResult<Json<ProfileQrResponse>> {
    let business = managed_business(&state, &auth, business_id).await?;
    let profile = find_profile(&state, business_id, profile_id).await?;

    let payload = QrPayload::new(
        BusinessId::from_uuid(business.id),
        ProfileId::from_uuid(profile.id),
        business.name,
        profile.name,
        &state.loyalty.public_base_url,
    );
    let content = payload
        .encode()
        .map_err(|e| ApiError(AppError::Internal(e.to_string())))?;

    Ok(Json(ProfileQrResponse {
        content,
        url: payload.url.clone(),
        payload,
    }))
}

async fn find_profile(
    state: &AppState,
    business_id: Uuid,
    profile_id: Uuid,
) -> ApiResult<profiles::Model> {
    ProfileRepository::new((*state.db).clone())
        .find(business_id, profile_id)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("Profile not found: {profile_id}")))
}

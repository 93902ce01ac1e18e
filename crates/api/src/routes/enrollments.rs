//! Customer self-enrollment by scanning a business's registration QR code.

use axum::{Json, Router, extract::State, http::StatusCode, routing::post};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::error::{ApiError, ApiResult};
use crate::extractors::ValidatedJson;
use crate::routes::profiles::ProfileResponse;
use crate::routes::wallets::WalletResponse;
use crate::{AppState, middleware::AuthUser};
use loyalty_core::qr::QrPayload;
use loyalty_db::repositories::{BusinessRepository, CustomerRepository, EnrollInput};

/// Creates the enrollment routes.
pub fn routes() -> Router<AppState> {
    Router::new().route("/enrollments", post(enroll))
}

/// Request body for enrolling.
#[derive(Debug, Deserialize, Validate)]
pub struct EnrollRequest {
    /// Scanned QR content: the JSON payload or a registration link.
    #[validate(length(min = 1, max = 4096))]
    pub qr: String,
    /// Referral code of the customer who invited the caller. Overrides a
    /// `ref` parameter carried by the link.
    #[validate(length(min = 1, max = 16))]
    pub referral_code: Option<String>,
}

/// Outcome of an enrollment.
#[derive(Debug, Serialize)]
pub struct EnrollmentResponse {
    /// Business joined.
    pub business_id: Uuid,
    /// Business display name.
    pub business_name: String,
    /// Message configured by the business.
    pub welcome_message: Option<String>,
    /// Profile the customer landed in.
    pub profile: ProfileResponse,
    /// The new wallet, including any welcome bonus.
    pub wallet: WalletResponse,
    /// Welcome bonus credited to the caller.
    pub welcome_bonus_points: i64,
    /// Whether the referrer was credited.
    pub referrer_rewarded: bool,
}

/// POST /enrollments
async fn enroll(
    State(state): State<AppState>,
    auth: AuthUser,
    ValidatedJson(payload): ValidatedJson<EnrollRequest>,
) -> ApiResult<(StatusCode, Json<EnrollmentResponse>)> {
    auth.require_customer()?;
    let link = QrPayload::parse(&payload.qr)?;

    let enrollment = CustomerRepository::new((*state.db).clone())
        .enroll(EnrollInput {
            user_id: auth.user_id,
            business_id: link.business_id.into_inner(),
            profile_id: link.profile_id.into_inner(),
            referral_code: payload.referral_code.or(link.referral_code),
        })
        .await?;

    let business = BusinessRepository::new((*state.db).clone())
        .find_by_id(enrollment.membership.business_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Business not found"))?;

    Ok((
        StatusCode::CREATED,
        Json(EnrollmentResponse {
            business_id: business.id,
            welcome_message: business.welcome_message.clone(),
            profile: ProfileResponse::try_from(enrollment.profile)?,
            wallet: WalletResponse::new(enrollment.wallet, Some(&business)),
            welcome_bonus_points: enrollment.welcome_bonus.map_or(0, |l| l.points),
            referrer_rewarded: enrollment.referral_bonus.is_some(),
            business_name: business.name,
        }),
    ))
}

//! Business-side member management.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::{get, patch},
};
use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};
use crate::routes::transactions::find_customer;
use crate::routes::{PageQuery, managed_business};
use crate::{AppState, middleware::AuthUser};
use loyalty_db::entities::customers;
use loyalty_db::repositories::{
    CustomerRepository, MemberSummary, ProfileRepository, WalletRepository,
};
use loyalty_shared::types::PageResponse;

/// Creates the customer routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/businesses/{id}/customers", get(list_customers))
        .route("/businesses/{id}/customers/by-code/{code}", get(find_by_code))
        .route("/businesses/{id}/customers/{user_id}", patch(change_profile))
}

/// A member of a business.
#[derive(Debug, Serialize)]
pub struct CustomerResponse {
    /// Customer's user ID.
    pub user_id: Uuid,
    /// Display name.
    pub full_name: String,
    /// Login email.
    pub email: String,
    /// Customer code.
    pub customer_code: Option<String>,
    /// Current profile.
    pub profile_id: Uuid,
    /// Current profile name.
    pub profile_name: Option<String>,
    /// Spendable points at this business.
    pub points_balance: i64,
    /// Points ever earned at this business.
    pub lifetime_earned: i64,
    /// Who referred this customer.
    pub referred_by_user_id: Option<Uuid>,
    /// Enrollment time.
    pub joined_at: DateTime<FixedOffset>,
}

impl From<MemberSummary> for CustomerResponse {
    fn from(member: MemberSummary) -> Self {
        let (points_balance, lifetime_earned) = member
            .wallet
            .as_ref()
            .map_or((0, 0), |w| (w.points_balance, w.lifetime_earned));
        Self {
            user_id: member.user.id,
            full_name: member.user.full_name,
            email: member.user.email,
            customer_code: member.user.customer_code,
            profile_id: member.membership.profile_id,
            profile_name: member.profile.map(|p| p.name),
            points_balance,
            lifetime_earned,
            referred_by_user_id: member.membership.referred_by_user_id,
            joined_at: member.membership.joined_at,
        }
    }
}

/// Request body for moving a member to another profile.
#[derive(Debug, Deserialize)]
pub struct ChangeProfileRequest {
    /// Target profile of the same business.
    pub profile_id: Uuid,
}

/// GET /businesses/{id}/customers - Newest members first.
async fn list_customers(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(business_id): Path<Uuid>,
    Query(query): Query<PageQuery>,
) -> ApiResult<Json<PageResponse<CustomerResponse>>> {
    managed_business(&state, &auth, business_id).await?;
    let page = query.to_request();
    let (items, total) = CustomerRepository::new((*state.db).clone())
        .list_by_business(business_id, &page)
        .await?;
    Ok(Json(
        PageResponse::new(items, page.page, page.per_page, total).map(CustomerResponse::from),
    ))
}

/// GET /businesses/{id}/customers/by-code/{code} - Looks up a member at the counter.
async fn find_by_code(
    State(state): State<AppState>,
    auth: AuthUser,
    Path((business_id, code)): Path<(Uuid, String)>,
) -> ApiResult<Json<CustomerResponse>> {
    managed_business(&state, &auth, business_id).await?;
    let user = find_customer(&state, &code).await?;

    let membership = CustomerRepository::new((*state.db).clone())
        .find_membership(business_id, user.id)
        .await?
        .ok_or_else(|| ApiError::not_found("Customer is not a member of this business"))?;
    let wallet = WalletRepository::new((*state.db).clone())
        .find_wallet(user.id, business_id)
        .await?;
    let profile = ProfileRepository::new((*state.db).clone())
        .find(business_id, membership.profile_id)
        .await?;

    Ok(Json(
        MemberSummary {
            membership,
            user,
            profile,
            wallet,
        }
        .into(),
    ))
}

/// PATCH /businesses/{id}/customers/{user_id} - No welcome bonus is granted.
async fn change_profile(
    State(state): State<AppState>,
    auth: AuthUser,
    Path((business_id, user_id)): Path<(Uuid, Uuid)>,
    Json(payload): Json<ChangeProfileRequest>,
) -> ApiResult<Json<customers::Model>> {
    managed_business(&state, &auth, business_id).await?;
    let membership = CustomerRepository::new((*state.db).clone())
        .change_profile(business_id, user_id, payload.profile_id)
        .await?;
    Ok(Json(membership))
}

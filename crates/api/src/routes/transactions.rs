//! Point movement routes for business staff.
//!
//! Customers are located by their customer code, the same code printed on
//! their card. Every movement accepts an idempotency key, either in the body
//! or in the `Idempotency-Key` header, so retries never double-post.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
};
use chrono::{DateTime, FixedOffset};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::error::{ApiError, ApiResult};
use crate::extractors::{IdempotencyKey, MAX_IDEMPOTENCY_KEY_LEN, ValidatedJson};
use crate::routes::wallets::{WalletResponse, parse_kind};
use crate::routes::{PageQuery, managed_business};
use crate::{AppState, middleware::AuthUser};
use loyalty_core::auth::UserRole;
use loyalty_core::ledger::TransactionKind;
use loyalty_core::points::{Multiplier, cents_to_amount, validate_purchase_amount};
use loyalty_db::entities::{point_transactions, users};
use loyalty_db::repositories::{
    MovementContext, PostedMovement, TransactionFilter, UserRepository, WalletRepository,
};
use loyalty_shared::types::PageResponse;

/// Creates the transaction routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/businesses/{id}/transactions", get(list_transactions))
        .route("/businesses/{id}/transactions/purchase", post(record_purchase))
        .route("/businesses/{id}/transactions/redeem", post(redeem_points))
        .route("/businesses/{id}/transactions/adjust", post(adjust_points))
}

// ============================================================================
// Request/Response Types
// ============================================================================

/// Request body for crediting a purchase.
#[derive(Debug, Deserialize, Validate)]
pub struct PurchaseRequest {
    /// Customer code, e.g. `AB1234`.
    #[validate(length(min = 1, max = 16))]
    pub customer_code: String,
    /// Purchase amount in currency units, at most two decimals.
    pub amount: Decimal,
    /// Optional note shown in the history.
    #[validate(length(max = 500))]
    pub note: Option<String>,
    /// Retry key (the header takes precedence).
    #[validate(length(min = 1, max = 128))]
    pub idempotency_key: Option<String>,
}

/// Request body for redeeming points.
#[derive(Debug, Deserialize, Validate)]
pub struct RedeemRequest {
    /// Customer code.
    #[validate(length(min = 1, max = 16))]
    pub customer_code: String,
    /// Points to debit.
    #[validate(range(min = 1))]
    pub points: i64,
    /// Optional note, e.g. the reward.
    #[validate(length(max = 500))]
    pub note: Option<String>,
    /// Retry key.
    #[validate(length(min = 1, max = 128))]
    pub idempotency_key: Option<String>,
}

/// Request body for a manual correction.
#[derive(Debug, Deserialize, Validate)]
pub struct AdjustRequest {
    /// Customer code.
    #[validate(length(min = 1, max = 16))]
    pub customer_code: String,
    /// Signed correction.
    pub points: i64,
    /// Why the correction was made.
    #[validate(length(min = 1, max = 500))]
    pub reason: String,
    /// Retry key.
    #[validate(length(min = 1, max = 128))]
    pub idempotency_key: Option<String>,
}

/// Query parameters for listing a business's ledger.
#[derive(Debug, Deserialize)]
pub struct ListTransactionsQuery {
    /// Filter by kind.
    pub kind: Option<String>,
    /// Filter by customer code.
    pub customer_code: Option<String>,
    /// Page number (1-indexed).
    pub page: Option<u32>,
    /// Items per page.
    pub per_page: Option<u32>,
}

/// A ledger line.
#[derive(Debug, Serialize)]
pub struct TransactionResponse {
    /// Line ID.
    pub id: Uuid,
    /// Business.
    pub business_id: Uuid,
    /// Customer.
    pub user_id: Uuid,
    /// Position in the wallet's history, starting at 1.
    pub sequence: i64,
    /// Movement kind.
    pub kind: &'static str,
    /// Purchase amount, for purchases.
    pub purchase_amount: Option<Decimal>,
    /// Points before the multiplier, for purchases.
    pub base_points: Option<i64>,
    /// Multiplier applied, for purchases.
    pub multiplier: Option<Decimal>,
    /// Signed points.
    pub points: i64,
    /// Balance after this line.
    pub balance_after: i64,
    /// Note or adjustment reason.
    pub note: Option<String>,
    /// Staff member who posted it.
    pub created_by: Option<Uuid>,
    /// Posted at.
    pub created_at: DateTime<FixedOffset>,
}

impl From<point_transactions::Model> for TransactionResponse {
    fn from(line: point_transactions::Model) -> Self {
        Self {
            id: line.id,
            business_id: line.business_id,
            user_id: line.user_id,
            sequence: line.sequence,
            kind: TransactionKind::from(line.kind).as_str(),
            purchase_amount: line.purchase_amount_cents.map(cents_to_amount),
            base_points: line.base_points,
            multiplier: line
                .multiplier_bp
                .and_then(|bp| Multiplier::from_basis_points(bp).ok())
                .map(|m| m.value()),
            points: line.points,
            balance_after: line.balance_after,
            note: line.note,
            created_by: line.created_by,
            created_at: line.created_at,
        }
    }
}

/// Result of a movement.
#[derive(Debug, Serialize)]
pub struct MovementResponse {
    /// The ledger line.
    pub transaction: TransactionResponse,
    /// The wallet after the movement.
    pub wallet: WalletResponse,
    /// True when an earlier request with the same key was returned.
    pub replayed: bool,
}

impl MovementResponse {
    fn into_reply(posted: PostedMovement) -> (StatusCode, Json<Self>) {
        let status = if posted.replayed {
            StatusCode::OK
        } else {
            StatusCode::CREATED
        };
        (
            status,
            Json(Self {
                transaction: posted.transaction.into(),
                wallet: WalletResponse::new(posted.wallet, None),
                replayed: posted.replayed,
            }),
        )
    }
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /businesses/{id}/transactions/purchase
async fn record_purchase(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(business_id): Path<Uuid>,
    header_key: IdempotencyKey,
    ValidatedJson(payload): ValidatedJson<PurchaseRequest>,
) -> ApiResult<(StatusCode, Json<MovementResponse>)> {
    let amount = validate_purchase_amount(payload.amount)?;
    let ctx = movement_context(
        &state,
        &auth,
        business_id,
        &payload.customer_code,
        header_key.0.or(payload.idempotency_key),
    )
    .await?;

    let posted = WalletRepository::new((*state.db).clone())
        .record_purchase(ctx, amount, payload.note)
        .await?;
    Ok(MovementResponse::into_reply(posted))
}

/// POST /businesses/{id}/transactions/redeem
async fn redeem_points(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(business_id): Path<Uuid>,
    header_key: IdempotencyKey,
    ValidatedJson(payload): ValidatedJson<RedeemRequest>,
) -> ApiResult<(StatusCode, Json<MovementResponse>)> {
    let ctx = movement_context(
        &state,
        &auth,
        business_id,
        &payload.customer_code,
        header_key.0.or(payload.idempotency_key),
    )
    .await?;

    let posted = WalletRepository::new((*state.db).clone())
        .redeem(ctx, payload.points, payload.note)
        .await?;
    Ok(MovementResponse::into_reply(posted))
}

/// POST /businesses/{id}/transactions/adjust
async fn adjust_points(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(business_id): Path<Uuid>,
    header_key: IdempotencyKey,
    ValidatedJson(payload): ValidatedJson<AdjustRequest>,
) -> ApiResult<(StatusCode, Json<MovementResponse>)> {
    let ctx = movement_context(
        &state,
        &auth,
        business_id,
        &payload.customer_code,
        header_key.0.or(payload.idempotency_key),
    )
    .await?;

    let posted = WalletRepository::new((*state.db).clone())
        .adjust(ctx, payload.points, &payload.reason)
        .await?;
    Ok(MovementResponse::into_reply(posted))
}

/// GET /businesses/{id}/transactions - Newest first.
async fn list_transactions(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(business_id): Path<Uuid>,
    Query(query): Query<ListTransactionsQuery>,
) -> ApiResult<Json<PageResponse<TransactionResponse>>> {
    managed_business(&state, &auth, business_id).await?;

    let user_id = match query.customer_code.as_deref() {
        Some(code) => Some(find_customer(&state, code).await?.id),
        None => None,
    };
    let filter = TransactionFilter {
        business_id: Some(business_id),
        user_id,
        kind: parse_kind(query.kind.as_deref())?,
    };
    let page = PageQuery {
        page: query.page,
        per_page: query.per_page,
    }
    .to_request();

    let (items, total) = WalletRepository::new((*state.db).clone())
        .list_transactions(&filter, &page)
        .await?;
    Ok(Json(
        PageResponse::new(items, page.page, page.per_page, total).map(TransactionResponse::from),
    ))
}

/// Resolves the caller's right to move points and the target customer.
async fn movement_context(
    state: &AppState,
    auth: &AuthUser,
    business_id: Uuid,
    customer_code: &str,
    idempotency_key: Option<String>,
) -> ApiResult<MovementContext> {
    managed_business(state, auth, business_id).await?;
    let customer = find_customer(state, customer_code).await?;
    let idempotency_key = idempotency_key
        .map(|k| k.trim().to_string())
        .filter(|k| !k.is_empty());
    if idempotency_key
        .as_ref()
        .is_some_and(|k| k.len() > MAX_IDEMPOTENCY_KEY_LEN)
    {
        return Err(ApiError::validation("Idempotency key is too long"));
    }

    Ok(MovementContext {
        business_id,
        user_id: customer.id,
        idempotency_key,
        created_by: Some(auth.user_id),
    })
}

/// Finds an active customer by customer code.
pub(crate) async fn find_customer(state: &AppState, code: &str) -> ApiResult<users::Model> {
    UserRepository::new((*state.db).clone())
        .find_by_customer_code(code)
        .await?
        .filter(|u| u.is_active && UserRole::from(u.role).holds_wallets())
        .ok_or_else(|| ApiError::not_found(format!("No customer with code '{}'", code.trim())))
}

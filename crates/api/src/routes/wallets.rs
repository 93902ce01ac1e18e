//! Customer wallet routes and the owner-facing reconcile check.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::get,
};
use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};
use crate::routes::transactions::TransactionResponse;
use crate::routes::{PageQuery, managed_business};
use crate::{AppState, middleware::AuthUser};
use loyalty_core::ledger::{Reconciliation, TransactionKind};
use loyalty_db::entities::{businesses, wallets};
use loyalty_db::repositories::{TransactionFilter, WalletRepository};
use loyalty_shared::types::PageResponse;

/// Creates the wallet routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/wallets", get(list_wallets))
        .route("/wallets/{business_id}", get(get_wallet))
        .route("/wallets/{business_id}/transactions", get(list_wallet_transactions))
        .route(
            "/businesses/{id}/wallets/{user_id}/reconcile",
            get(reconcile_wallet),
        )
}

/// A wallet as its owner sees it.
#[derive(Debug, Serialize)]
pub struct WalletResponse {
    /// Wallet ID.
    pub id: Uuid,
    /// Business the points belong to.
    pub business_id: Uuid,
    /// Business display name, when loaded.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub business_name: Option<String>,
    /// Spendable points.
    pub points_balance: i64,
    /// Points ever credited.
    pub lifetime_earned: i64,
    /// Points ever debited.
    pub lifetime_redeemed: i64,
    /// Last change.
    pub updated_at: DateTime<FixedOffset>,
}

impl WalletResponse {
    /// Builds the response, optionally naming the business.
    #[must_use]
    pub fn new(wallet: wallets::Model, business: Option<&businesses::Model>) -> Self {
        Self {
            id: wallet.id,
            business_id: wallet.business_id,
            business_name: business.map(|b| b.name.clone()),
            points_balance: wallet.points_balance,
            lifetime_earned: wallet.lifetime_earned,
            lifetime_redeemed: wallet.lifetime_redeemed,
            updated_at: wallet.updated_at,
        }
    }
}

/// Query parameters for listing ledger lines.
#[derive(Debug, Deserialize)]
pub struct WalletTransactionsQuery {
    /// Filter by kind (`purchase`, `redemption`, ...).
    pub kind: Option<String>,
    /// Page number (1-indexed).
    pub page: Option<u32>,
    /// Items per page.
    pub per_page: Option<u32>,
}

/// Parses an optional `kind` query parameter.
pub(crate) fn parse_kind(raw: Option<&str>) -> ApiResult<Option<TransactionKind>> {
    raw.map(str::parse::<TransactionKind>)
        .transpose()
        .map_err(ApiError::validation)
}

/// GET /wallets - The caller's wallets, largest balance first.
async fn list_wallets(
    State(state): State<AppState>,
    auth: AuthUser,
) -> ApiResult<Json<Vec<WalletResponse>>> {
    auth.require_customer()?;
    let rows = WalletRepository::new((*state.db).clone())
        .list_wallets_for_user(auth.user_id)
        .await?;
    Ok(Json(
        rows.into_iter()
            .map(|(wallet, business)| WalletResponse::new(wallet, Some(&business)))
            .collect(),
    ))
}

/// GET /wallets/{business_id}
async fn get_wallet(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(business_id): Path<Uuid>,
) -> ApiResult<Json<WalletResponse>> {
    auth.require_customer()?;
    let wallet = WalletRepository::new((*state.db).clone())
        .find_wallet(auth.user_id, business_id)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("No wallet at business {business_id}")))?;
    Ok(Json(WalletResponse::new(wallet, None)))
}

/// GET /wallets/{business_id}/transactions - The caller's history at one business.
async fn list_wallet_transactions(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(business_id): Path<Uuid>,
    Query(query): Query<WalletTransactionsQuery>,
) -> ApiResult<Json<PageResponse<TransactionResponse>>> {
    auth.require_customer()?;
    let filter = TransactionFilter {
        business_id: Some(business_id),
        user_id: Some(auth.user_id),
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

/// GET /businesses/{id}/wallets/{user_id}/reconcile - Replays the ledger
/// against the stored wallet.
async fn reconcile_wallet(
    State(state): State<AppState>,
    auth: AuthUser,
    Path((business_id, user_id)): Path<(Uuid, Uuid)>,
) -> ApiResult<Json<Reconciliation>> {
    managed_business(&state, &auth, business_id).await?;
    let result = WalletRepository::new((*state.db).clone())
        .reconcile(user_id, business_id)
        .await?;
    Ok(Json(result))
}

//! Wallet repository: atomic points movements over the append-only ledger.
//!
//! Each movement runs in one database transaction:
//! 1. Idempotency key lookup (a replay returns the original line)
//! 2. Business, membership and profile checks
//! 3. Wallet update guarded by `version = <read version>`
//! 4. Ledger append with the new running balance
//!
//! A concurrent writer that bumped the version first makes step 3 touch no
//! rows; the whole transaction then rolls back with `ConcurrentModification`.

use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::prelude::DateTimeWithTimeZone;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DatabaseTransaction, DbErr,
    EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};
use tracing::{info, warn};
use uuid::Uuid;

use loyalty_core::business::{BusinessError, BusinessStatus};
use loyalty_core::ledger::{
    LedgerError, LedgerLine, LoyaltyService, PointsMovement, Reconciliation, RequestFingerprint,
    TransactionKind, reconcile,
};
use loyalty_core::points::Multiplier;
use loyalty_shared::AppError;
use loyalty_shared::types::PageRequest;

use crate::entities::{
    businesses, customers, point_transactions, profiles, sea_orm_active_enums, wallets,
};
use crate::is_unique_violation;

/// Error types for wallet operations.
#[derive(Debug, thiserror::Error)]
pub enum WalletRepoError {
    /// Business not found.
    #[error("Business not found: {0}")]
    BusinessNotFound(Uuid),

    /// Customer is not a member of the business.
    #[error("Customer {user_id} is not a member of business {business_id}")]
    NotMember {
        /// Customer.
        user_id: Uuid,
        /// Business.
        business_id: Uuid,
    },

    /// Wallet row is missing.
    #[error("Wallet not found for customer {user_id} at business {business_id}")]
    WalletNotFound {
        /// Customer.
        user_id: Uuid,
        /// Business.
        business_id: Uuid,
    },

    /// Business cannot move points in its current status.
    #[error(transparent)]
    Business(#[from] BusinessError),

    /// The movement violates a ledger rule.
    #[error(transparent)]
    Ledger(#[from] LedgerError),

    /// Idempotency key was already used for a different request.
    #[error("Idempotency key '{0}' was already used for a different request")]
    IdempotencyConflict(String),

    /// Stored profile multiplier is invalid.
    #[error("Stored multiplier is invalid for profile {0}")]
    CorruptMultiplier(Uuid),

    /// Database error.
    #[error("Database error: {0}")]
    Database(#[from] DbErr),
}

impl From<WalletRepoError> for AppError {
    fn from(err: WalletRepoError) -> Self {
        match err {
            WalletRepoError::BusinessNotFound(_)
            | WalletRepoError::NotMember { .. }
            | WalletRepoError::WalletNotFound { .. } => Self::NotFound(err.to_string()),
            WalletRepoError::Business(_) => Self::BusinessRule(err.to_string()),
            WalletRepoError::Ledger(ref ledger) => match ledger.http_status_code() {
                409 => Self::Conflict(err.to_string()),
                422 => Self::BusinessRule(err.to_string()),
                500 => Self::Internal(err.to_string()),
                _ => Self::Validation(err.to_string()),
            },
            WalletRepoError::IdempotencyConflict(_) => Self::Conflict(err.to_string()),
            WalletRepoError::CorruptMultiplier(_) => Self::Internal(err.to_string()),
            WalletRepoError::Database(e) => Self::Database(e.to_string()),
        }
    }
}

/// Who is moving points where.
#[derive(Debug, Clone)]
pub struct MovementContext {
    /// Business the wallet belongs to.
    pub business_id: Uuid,
    /// Customer owning the wallet.
    pub user_id: Uuid,
    /// Client-supplied key that makes the request safe to retry.
    pub idempotency_key: Option<String>,
    /// Staff user performing the movement.
    pub created_by: Option<Uuid>,
}

/// Result of a movement.
#[derive(Debug, Clone)]
pub struct PostedMovement {
    /// Wallet after the movement.
    pub wallet: wallets::Model,
    /// The ledger line.
    pub transaction: point_transactions::Model,
    /// True when an earlier identical request was returned instead.
    pub replayed: bool,
}

/// Filter options for listing ledger lines.
#[derive(Debug, Clone, Default)]
pub struct TransactionFilter {
    /// Only lines of this business.
    pub business_id: Option<Uuid>,
    /// Only lines of this customer.
    pub user_id: Option<Uuid>,
    /// Only lines of this kind.
    pub kind: Option<TransactionKind>,
}

/// Creates an empty wallet.
pub(crate) async fn open_wallet<C: ConnectionTrait>(
    conn: &C,
    user_id: Uuid,
    business_id: Uuid,
) -> Result<wallets::Model, DbErr> {
    let now = Utc::now().into();
    wallets::ActiveModel {
        id: Set(Uuid::now_v7()),
        user_id: Set(user_id),
        business_id: Set(business_id),
        points_balance: Set(0),
        lifetime_earned: Set(0),
        lifetime_redeemed: Set(0),
        version: Set(0),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(conn)
    .await
}

/// Applies a planned movement to `wallet` and appends its ledger line.
///
/// Must run inside the caller's database transaction.
pub(crate) async fn post_movement<C: ConnectionTrait>(
    conn: &C,
    wallet: &wallets::Model,
    movement: &PointsMovement,
    idempotency_key: Option<String>,
    created_by: Option<Uuid>,
) -> Result<(wallets::Model, point_transactions::Model), WalletRepoError> {
    let next = LoyaltyService::apply(&wallet.state(), movement)?;
    let now: DateTimeWithTimeZone = Utc::now().into();

    let updated = wallets::Entity::update_many()
        .col_expr(wallets::Column::PointsBalance, Expr::value(next.balance))
        .col_expr(wallets::Column::LifetimeEarned, Expr::value(next.lifetime_earned))
        .col_expr(wallets::Column::LifetimeRedeemed, Expr::value(next.lifetime_redeemed))
        .col_expr(wallets::Column::Version, Expr::value(next.version))
        .col_expr(wallets::Column::UpdatedAt, Expr::value(now))
        .filter(wallets::Column::Id.eq(wallet.id))
        .filter(wallets::Column::Version.eq(wallet.version))
        .exec(conn)
        .await?;
    if updated.rows_affected != 1 {
        warn!(wallet_id = %wallet.id, version = wallet.version, "Wallet changed concurrently");
        return Err(LedgerError::ConcurrentModification.into());
    }

    let line = point_transactions::ActiveModel {
        id: Set(Uuid::now_v7()),
        business_id: Set(wallet.business_id),
        user_id: Set(wallet.user_id),
        wallet_id: Set(wallet.id),
        sequence: Set(next.version),
        kind: Set(movement.kind.into()),
        purchase_amount_cents: Set(movement.purchase_amount_cents),
        base_points: Set(movement.base_points),
        multiplier_bp: Set(movement.multiplier_bp),
        points: Set(movement.delta),
        balance_after: Set(next.balance),
        idempotency_key: Set(idempotency_key),
        note: Set(movement.note.clone()),
        created_by: Set(created_by),
        created_at: Set(now),
    }
    .insert(conn)
    .await
    .map_err(|err| {
        // Same key or same sequence committed first.
        if is_unique_violation(&err) {
            WalletRepoError::Ledger(LedgerError::ConcurrentModification)
        } else {
            WalletRepoError::Database(err)
        }
    })?;

    let wallet = wallets::Model {
        points_balance: next.balance,
        lifetime_earned: next.lifetime_earned,
        lifetime_redeemed: next.lifetime_redeemed,
        version: next.version,
        updated_at: now,
        ..wallet.clone()
    };

    Ok((wallet, line))
}

/// Wallet repository.
#[derive(Debug, Clone)]
pub struct WalletRepository {
    db: DatabaseConnection,
}

impl WalletRepository {
    /// Creates a new wallet repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Credits a purchase using the customer's profile multiplier.
    ///
    /// # Errors
    ///
    /// Returns an error if the business is not active, the customer is not a
    /// member, the amount earns nothing, or the wallet changed concurrently.
    pub async fn record_purchase(
        &self,
        ctx: MovementContext,
        amount: Decimal,
        note: Option<String>,
    ) -> Result<PostedMovement, WalletRepoError> {
        let fingerprint = RequestFingerprint::purchase(amount, note.clone())?;
        let txn = self.db.begin().await?;
        if let Some(posted) = replay(&txn, &ctx, &fingerprint).await? {
            return Ok(posted);
        }

        let (membership, wallet) = load_member_wallet(&txn, &ctx).await?;
        let profile = profiles::Entity::find_by_id(membership.profile_id)
            .one(&txn)
            .await?
            .ok_or(WalletRepoError::CorruptMultiplier(membership.profile_id))?;
        let multiplier = Multiplier::from_basis_points(profile.earning_multiplier_bp)
            .map_err(|_| WalletRepoError::CorruptMultiplier(profile.id))?;

        let movement = LoyaltyService::plan_purchase(amount, multiplier, note)?;
        let (wallet, transaction) =
            post_movement(&txn, &wallet, &movement, ctx.idempotency_key, ctx.created_by).await?;
        txn.commit().await?;

        info!(
            business_id = %ctx.business_id,
            user_id = %ctx.user_id,
            amount = %amount,
            multiplier = %multiplier.value(),
            points = transaction.points,
            balance = wallet.points_balance,
            "Purchase recorded"
        );
        Ok(PostedMovement {
            wallet,
            transaction,
            replayed: false,
        })
    }

    /// Debits `points` from the customer's wallet.
    ///
    /// # Errors
    ///
    /// Returns `Ledger(InsufficientPoints)` when the balance is too low, plus
    /// the errors of [`Self::record_purchase`].
    pub async fn redeem(
        &self,
        ctx: MovementContext,
        points: i64,
        note: Option<String>,
    ) -> Result<PostedMovement, WalletRepoError> {
        let movement = LoyaltyService::plan_redemption(points, note)?;
        self.post(ctx, movement, "Points redeemed").await
    }

    /// Applies a manual correction.
    ///
    /// # Errors
    ///
    /// Returns `Ledger(MissingReason)` without a reason, plus the errors of
    /// [`Self::redeem`].
    pub async fn adjust(
        &self,
        ctx: MovementContext,
        delta: i64,
        reason: &str,
    ) -> Result<PostedMovement, WalletRepoError> {
        let movement = LoyaltyService::plan_adjustment(delta, reason)?;
        self.post(ctx, movement, "Points adjusted").await
    }

    async fn post(
        &self,
        ctx: MovementContext,
        movement: PointsMovement,
        message: &'static str,
    ) -> Result<PostedMovement, WalletRepoError> {
        let txn = self.db.begin().await?;
        if let Some(posted) = replay(&txn, &ctx, &RequestFingerprint::of(&movement)).await? {
            return Ok(posted);
        }

        let (_, wallet) = load_member_wallet(&txn, &ctx).await?;
        let (wallet, transaction) =
            post_movement(&txn, &wallet, &movement, ctx.idempotency_key, ctx.created_by).await?;
        txn.commit().await?;

        info!(
            business_id = %ctx.business_id,
            user_id = %ctx.user_id,
            kind = %movement.kind,
            points = transaction.points,
            balance = wallet.points_balance,
            "{message}"
        );
        Ok(PostedMovement {
            wallet,
            transaction,
            replayed: false,
        })
    }

    /// Finds a customer's wallet at a business.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn find_wallet(
        &self,
        user_id: Uuid,
        business_id: Uuid,
    ) -> Result<Option<wallets::Model>, DbErr> {
        find_wallet(&self.db, user_id, business_id).await
    }

    /// Lists a customer's wallets with their businesses.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn list_wallets_for_user(
        &self,
        user_id: Uuid,
    ) -> Result<Vec<(wallets::Model, businesses::Model)>, DbErr> {
        let rows = wallets::Entity::find()
            .filter(wallets::Column::UserId.eq(user_id))
            .order_by_desc(wallets::Column::PointsBalance)
            .find_also_related(businesses::Entity)
            .all(&self.db)
            .await?;

        Ok(rows
            .into_iter()
            .filter_map(|(wallet, business)| business.map(|b| (wallet, b)))
            .collect())
    }

    /// Lists ledger lines, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn list_transactions(
        &self,
        filter: &TransactionFilter,
        page: &PageRequest,
    ) -> Result<(Vec<point_transactions::Model>, u64), DbErr> {
        let mut query = point_transactions::Entity::find();
        if let Some(business_id) = filter.business_id {
            query = query.filter(point_transactions::Column::BusinessId.eq(business_id));
        }
        if let Some(user_id) = filter.user_id {
            query = query.filter(point_transactions::Column::UserId.eq(user_id));
        }
        if let Some(kind) = filter.kind {
            query = query.filter(
                point_transactions::Column::Kind.eq(sea_orm_active_enums::TransactionKind::from(kind)),
            );
        }

        let total = query.clone().count(&self.db).await?;
        let items = query
            .order_by_desc(point_transactions::Column::CreatedAt)
            .order_by_desc(point_transactions::Column::Sequence)
            .offset(page.offset())
            .limit(page.limit())
            .all(&self.db)
            .await?;

        Ok((items, total))
    }

    /// Recomputes a wallet from its ledger and compares.
    ///
    /// # Errors
    ///
    /// Returns `WalletNotFound` if the customer has no wallet at the business.
    pub async fn reconcile(
        &self,
        user_id: Uuid,
        business_id: Uuid,
    ) -> Result<Reconciliation, WalletRepoError> {
        let wallet = self
            .find_wallet(user_id, business_id)
            .await?
            .ok_or(WalletRepoError::WalletNotFound {
                user_id,
                business_id,
            })?;

        let lines: Vec<LedgerLine> = point_transactions::Entity::find()
            .filter(point_transactions::Column::WalletId.eq(wallet.id))
            .order_by_asc(point_transactions::Column::Sequence)
            .all(&self.db)
            .await?
            .into_iter()
            .map(|t| LedgerLine {
                points: t.points,
                balance_after: t.balance_after,
            })
            .collect();

        let result = reconcile(&wallet.state(), &lines);
        if result.is_consistent {
            info!(wallet_id = %wallet.id, entries = result.entry_count, "Wallet reconciled");
        } else {
            warn!(
                wallet_id = %wallet.id,
                stored = result.stored_balance,
                derived = result.derived_balance,
                first_broken_entry = ?result.first_broken_entry,
                "Wallet does not match its ledger"
            );
        }
        Ok(result)
    }
}

async fn find_wallet<C: ConnectionTrait>(
    conn: &C,
    user_id: Uuid,
    business_id: Uuid,
) -> Result<Option<wallets::Model>, DbErr> {
    wallets::Entity::find()
        .filter(wallets::Column::UserId.eq(user_id))
        .filter(wallets::Column::BusinessId.eq(business_id))
        .one(conn)
        .await
}

/// Returns the earlier result for a reused idempotency key.
///
/// The key must come back with the same customer and the same request;
/// anything else is an `IdempotencyConflict`.
async fn replay(
    txn: &DatabaseTransaction,
    ctx: &MovementContext,
    fingerprint: &RequestFingerprint,
) -> Result<Option<PostedMovement>, WalletRepoError> {
    let Some(key) = &ctx.idempotency_key else {
        return Ok(None);
    };
    let Some(existing) = point_transactions::Entity::find()
        .filter(point_transactions::Column::BusinessId.eq(ctx.business_id))
        .filter(point_transactions::Column::IdempotencyKey.eq(key.as_str()))
        .one(txn)
        .await?
    else {
        return Ok(None);
    };

    if existing.user_id != ctx.user_id || !fingerprint.matches(&stored_movement(&existing)) {
        warn!(
            idempotency_key = %key,
            transaction_id = %existing.id,
            "Idempotency key reused for a different request"
        );
        return Err(WalletRepoError::IdempotencyConflict(key.clone()));
    }

    let wallet = wallets::Entity::find_by_id(existing.wallet_id)
        .one(txn)
        .await?
        .ok_or(WalletRepoError::WalletNotFound {
            user_id: ctx.user_id,
            business_id: ctx.business_id,
        })?;

    info!(idempotency_key = %key, transaction_id = %existing.id, "Replayed points movement");
    Ok(Some(PostedMovement {
        wallet,
        transaction: existing,
        replayed: true,
    }))
}

fn stored_movement(line: &point_transactions::Model) -> PointsMovement {
    PointsMovement {
        kind: line.kind.into(),
        delta: line.points,
        purchase_amount_cents: line.purchase_amount_cents,
        base_points: line.base_points,
        multiplier_bp: line.multiplier_bp,
        note: line.note.clone(),
    }
}

/// Checks the business is active and the customer is a member, and loads the wallet.
async fn load_member_wallet(
    txn: &DatabaseTransaction,
    ctx: &MovementContext,
) -> Result<(customers::Model, wallets::Model), WalletRepoError> {
    let business = businesses::Entity::find_by_id(ctx.business_id)
        .one(txn)
        .await?
        .ok_or(WalletRepoError::BusinessNotFound(ctx.business_id))?;
    BusinessStatus::from(business.status).ensure_active()?;

    let membership = customers::Entity::find()
        .filter(customers::Column::BusinessId.eq(ctx.business_id))
        .filter(customers::Column::UserId.eq(ctx.user_id))
        .one(txn)
        .await?
        .ok_or(WalletRepoError::NotMember {
            user_id: ctx.user_id,
            business_id: ctx.business_id,
        })?;

    let wallet = find_wallet(txn, ctx.user_id, ctx.business_id)
        .await?
        .ok_or(WalletRepoError::WalletNotFound {
            user_id: ctx.user_id,
            business_id: ctx.business_id,
        })?;

    Ok((membership, wallet))
}

#[cfg(test)]
mod tests {
    use sea_orm::{ConnectOptions, Database};
    use sea_orm_migration::MigratorTrait;

    use super::*;
    use crate::entities::{categories, users};
    use crate::migration::Migrator;

    async fn wallet_fixture() -> (DatabaseConnection, wallets::Model) {
        let mut options = ConnectOptions::new("sqlite::memory:");
        options.max_connections(1).sqlx_logging(false);
        let db = Database::connect(options).await.unwrap();
        Migrator::up(&db, None).await.unwrap();

        let now: DateTimeWithTimeZone = Utc::now().into();
        let owner = users::ActiveModel {
            id: Set(Uuid::now_v7()),
            email: Set("owner@example.com".to_string()),
            password_hash: Set("hash".to_string()),
            full_name: Set("Owner".to_string()),
            role: Set(sea_orm_active_enums::UserRole::Business),
            customer_code: Set(None),
            is_active: Set(true),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&db)
        .await
        .unwrap();
        let customer = users::ActiveModel {
            id: Set(Uuid::now_v7()),
            email: Set("customer@example.com".to_string()),
            password_hash: Set("hash".to_string()),
            full_name: Set("Customer".to_string()),
            role: Set(sea_orm_active_enums::UserRole::Customer),
            customer_code: Set(Some("AB1234".to_string())),
            is_active: Set(true),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&db)
        .await
        .unwrap();
        let category = categories::ActiveModel {
            id: Set(Uuid::now_v7()),
            name: Set("Food".to_string()),
            description: Set(None),
            is_active: Set(true),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&db)
        .await
        .unwrap();
        let business = businesses::ActiveModel {
            id: Set(Uuid::now_v7()),
            owner_user_id: Set(owner.id),
            name: Set("Cafe".to_string()),
            description: Set(None),
            category_id: Set(category.id),
            sub_category_id: Set(None),
            primary_color: Set("#112233".to_string()),
            secondary_color: Set("#445566".to_string()),
            logo_url: Set(None),
            status: Set(sea_orm_active_enums::BusinessStatus::Active),
            referrals_enabled: Set(true),
            welcome_message: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&db)
        .await
        .unwrap();

        let wallet = open_wallet(&db, customer.id, business.id).await.unwrap();
        (db, wallet)
    }

    #[tokio::test]
    async fn test_stale_wallet_version_is_rejected() {
        let (db, stale) = wallet_fixture().await;
        let movement = PointsMovement::simple(TransactionKind::Adjustment, 10, None);

        let (fresh, line) = post_movement(&db, &stale, &movement, None, None)
            .await
            .unwrap();
        assert_eq!(fresh.version, 1);
        assert_eq!(line.sequence, 1);
        assert_eq!(line.balance_after, 10);

        let result = post_movement(&db, &stale, &movement, None, None).await;
        assert!(matches!(
            result,
            Err(WalletRepoError::Ledger(LedgerError::ConcurrentModification))
        ));

        let (latest, line) = post_movement(&db, &fresh, &movement, None, None)
            .await
            .unwrap();
        assert_eq!(latest.points_balance, 20);
        assert_eq!(line.sequence, 2);
    }
}

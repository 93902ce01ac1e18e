//! Concurrent access tests for wallet movements.
//!
//! These tests verify that:
//! - Many concurrent purchases on the same wallet produce the correct final balance
//! - The ledger's running balance matches the wallet after the burst
//! - Concurrent redemptions never overdraw a wallet

mod common;

use futures::future::join_all;
use rust_decimal::Decimal;
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter, QueryOrder};

use loyalty_core::auth::UserRole;
use loyalty_core::ledger::LedgerError;
use loyalty_db::entities::point_transactions;
use loyalty_db::repositories::{
    CustomerRepository, EnrollInput, MovementContext, WalletRepoError, WalletRepository,
};

use common::{create_active_business, create_user, general_profile, setup_db};

const PURCHASES: i64 = 50;

#[tokio::test]
async fn test_concurrent_purchases_keep_balance_consistent() {
    let db = setup_db().await;
    let (business, profiles) = create_active_business(&db).await;
    let customer = create_user(&db, UserRole::Customer).await;
    CustomerRepository::new(db.clone())
        .enroll(EnrollInput {
            user_id: customer.id,
            business_id: business.id,
            profile_id: general_profile(&profiles).id,
            referral_code: None,
        })
        .await
        .unwrap();

    let repo = WalletRepository::new(db.clone());
    let tasks = (1..=PURCHASES).map(|i| {
        let repo = repo.clone();
        let ctx = MovementContext {
            business_id: business.id,
            user_id: customer.id,
            idempotency_key: Some(format!("purchase-{i}")),
            created_by: None,
        };
        tokio::spawn(async move { repo.record_purchase(ctx, Decimal::from(i), None).await })
    });

    let mut conflicts = 0;
    for result in join_all(tasks).await {
        match result.expect("task panicked") {
            Ok(_) => {}
            Err(WalletRepoError::Ledger(LedgerError::ConcurrentModification)) => conflicts += 1,
            Err(other) => panic!("unexpected error: {other}"),
        }
    }

    let lines = point_transactions::Entity::find()
        .filter(point_transactions::Column::UserId.eq(customer.id))
        .order_by_asc(point_transactions::Column::Sequence)
        .all(&db)
        .await
        .unwrap();
    let wallet = repo
        .find_wallet(customer.id, business.id)
        .await
        .unwrap()
        .unwrap();

    assert_eq!(lines.len() + conflicts, usize::try_from(PURCHASES).unwrap());
    assert_eq!(wallet.points_balance, lines.iter().map(|l| l.points).sum::<i64>());
    assert_eq!(wallet.version, i64::try_from(lines.len()).unwrap());
    let mut running = 0;
    for (index, line) in lines.iter().enumerate() {
        running += line.points;
        assert_eq!(line.balance_after, running);
        assert_eq!(line.sequence, i64::try_from(index + 1).unwrap());
    }

    let result = repo.reconcile(customer.id, business.id).await.unwrap();
    assert!(result.is_consistent);
}

#[tokio::test]
async fn test_concurrent_redemptions_never_overdraw() {
    let db = setup_db().await;
    let (business, profiles) = create_active_business(&db).await;
    let customer = create_user(&db, UserRole::Customer).await;
    CustomerRepository::new(db.clone())
        .enroll(EnrollInput {
            user_id: customer.id,
            business_id: business.id,
            profile_id: general_profile(&profiles).id,
            referral_code: None,
        })
        .await
        .unwrap();

    let repo = WalletRepository::new(db.clone());
    let ctx = || MovementContext {
        business_id: business.id,
        user_id: customer.id,
        idempotency_key: None,
        created_by: None,
    };
    repo.record_purchase(ctx(), Decimal::from(100), None)
        .await
        .unwrap();

    let tasks = (0..10).map(|_| {
        let repo = repo.clone();
        let ctx = ctx();
        tokio::spawn(async move { repo.redeem(ctx, 30, None).await })
    });
    let succeeded = join_all(tasks)
        .await
        .into_iter()
        .filter(|r| matches!(r, Ok(Ok(_))))
        .count();

    let wallet = repo
        .find_wallet(customer.id, business.id)
        .await
        .unwrap()
        .unwrap();
    assert!(succeeded <= 3);
    assert!(wallet.points_balance >= 0);
    assert_eq!(
        wallet.points_balance,
        100 - 30 * i64::try_from(succeeded).unwrap()
    );
}

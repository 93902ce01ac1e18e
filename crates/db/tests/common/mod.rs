//! Shared fixtures for repository integration tests.
//!
//! Every test gets its own in-memory `SQLite` database with the real
//! migrations applied. The pool is capped at one connection so the whole test
//! sees the same in-memory database.

#![allow(dead_code)]

use fake::Fake;
use fake::faker::name::en::Name;
use sea_orm::{ConnectOptions, Database, DatabaseConnection};
use uuid::Uuid;

use loyalty_core::auth::UserRole;
use loyalty_core::business::{BusinessSettings, BusinessStatus, Branding};
use loyalty_db::entities::{businesses, categories, profiles, users};
use loyalty_db::migration::{Migrator, MigratorTrait};
use loyalty_db::repositories::{
    BusinessRepository, CategoryRepository, CreateBusinessInput, CreateUserInput, UserRepository,
};

pub async fn setup_db() -> DatabaseConnection {
    let mut options = ConnectOptions::new("sqlite::memory:");
    options
        .max_connections(1)
        .min_connections(1)
        .sqlx_logging(false);
    let db = Database::connect(options)
        .await
        .expect("Failed to open SQLite database");
    Migrator::up(&db, None)
        .await
        .expect("Failed to run migrations");
    db
}

pub async fn create_user(db: &DatabaseConnection, role: UserRole) -> users::Model {
    UserRepository::new(db.clone())
        .create(CreateUserInput {
            email: format!("{}-{}@example.com", role.as_str(), Uuid::new_v4()),
            password_hash: "$argon2id$test_hash".to_string(),
            full_name: Name().fake(),
            role,
        })
        .await
        .expect("Failed to create user")
}

pub async fn create_category(db: &DatabaseConnection) -> categories::Model {
    CategoryRepository::new(db.clone())
        .create(&format!("Food {}", Uuid::new_v4()), None)
        .await
        .expect("Failed to create category")
}

pub fn business_input(owner_user_id: Uuid, category_id: Uuid) -> CreateBusinessInput {
    CreateBusinessInput {
        owner_user_id,
        name: "Corner Cafe".to_string(),
        description: Some("Coffee and pastries".to_string()),
        category_id,
        sub_category_id: None,
        branding: Branding::default(),
        settings: BusinessSettings::default(),
    }
}

/// A business in `pending` status with its preset profiles.
pub async fn create_pending_business(
    db: &DatabaseConnection,
) -> (businesses::Model, Vec<profiles::Model>) {
    let owner = create_user(db, UserRole::Business).await;
    let category = create_category(db).await;
    BusinessRepository::new(db.clone())
        .create_with_default_profiles(business_input(owner.id, category.id))
        .await
        .expect("Failed to create business")
}

/// An approved business with its preset profiles.
pub async fn create_active_business(
    db: &DatabaseConnection,
) -> (businesses::Model, Vec<profiles::Model>) {
    let (business, profiles) = create_pending_business(db).await;
    let business = BusinessRepository::new(db.clone())
        .set_status(business.id, BusinessStatus::Active)
        .await
        .expect("Failed to approve business");
    (business, profiles)
}

pub fn general_profile(profiles: &[profiles::Model]) -> &profiles::Model {
    profiles
        .iter()
        .find(|p| p.is_default)
        .expect("General profile missing")
}

pub fn referred_profile(profiles: &[profiles::Model]) -> &profiles::Model {
    profiles
        .iter()
        .find(|p| !p.is_default && !p.is_deletable)
        .expect("Referred profile missing")
}

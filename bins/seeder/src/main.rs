//! Database seeder for loyalty platform development and testing.
//!
//! Seeds an administrator, the category catalogue, and a demo business with
//! an enrolled customer. Running it twice is a no-op.
//!
//! Usage: cargo run --bin seeder
//!
//! Reads `DATABASE_URL` and, optionally, `SEED_PASSWORD` for every seeded
//! account (default `loyalty-dev-password`).

use anyhow::{Context, bail};
use rust_decimal::Decimal;

use loyalty_core::auth::{UserRole, hash_password};
use loyalty_core::business::{Branding, BusinessSettings, BusinessStatus};
use loyalty_core::points::Multiplier;
use loyalty_core::profile::{BadgeStyle, ProfileBenefits, ProfileDraft};
use loyalty_db::entities::{categories, users};
use loyalty_db::repositories::{
    BusinessRepository, CategoryRepository, CreateBusinessInput, CreateUserInput,
    CustomerRepository, EnrollInput, MovementContext, ProfileRepository, UserRepository,
    WalletRepository,
};
use sea_orm::DatabaseConnection;
use uuid::Uuid;

const ADMIN_EMAIL: &str = "admin@loyalty.local";
const OWNER_EMAIL: &str = "owner@loyalty.local";
const CUSTOMER_EMAIL: &str = "customer@loyalty.local";

/// Category name and its sub-categories.
const CATEGORIES: &[(&str, &[&str])] = &[
    ("Food & Drink", &["Coffee", "Bakery", "Restaurant"]),
    ("Retail", &["Clothing", "Books", "Electronics"]),
    ("Health & Beauty", &["Salon", "Pharmacy"]),
    ("Services", &["Car Wash", "Laundry"]),
];

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let database_url = std::env::var("DATABASE_URL").context("DATABASE_URL must be set")?;
    let password =
        std::env::var("SEED_PASSWORD").unwrap_or_else(|_| "loyalty-dev-password".to_string());

    println!("Connecting to database...");
    let db = loyalty_db::connect(&database_url)
        .await
        .context("Failed to connect to database")?;

    let user_repo = UserRepository::new(db.clone());
    if user_repo.email_exists(ADMIN_EMAIL).await? {
        println!("Database already seeded, skipping.");
        return Ok(());
    }
    let password_hash = hash_password(&password)?;

    println!("Seeding users...");
    seed_user(&user_repo, ADMIN_EMAIL, "Platform Admin", UserRole::Admin, &password_hash).await?;
    let owner = seed_user(
        &user_repo,
        OWNER_EMAIL,
        "Demo Owner",
        UserRole::Business,
        &password_hash,
    )
    .await?;
    let customer = seed_user(
        &user_repo,
        CUSTOMER_EMAIL,
        "Demo Customer",
        UserRole::Customer,
        &password_hash,
    )
    .await?;

    println!("Seeding categories...");
    let coffee = seed_categories(&db).await?;

    println!("Seeding demo business...");
    seed_demo_business(&db, &owner, &customer, coffee).await?;

    println!(
        "Seeding complete! Customer code: {}",
        customer.customer_code.as_deref().unwrap_or("-")
    );
    Ok(())
}

async fn seed_user(
    repo: &UserRepository,
    email: &str,
    full_name: &str,
    role: UserRole,
    password_hash: &str,
) -> anyhow::Result<users::Model> {
    let user = repo
        .create(CreateUserInput {
            email: email.to_string(),
            password_hash: password_hash.to_string(),
            full_name: full_name.to_string(),
            role,
        })
        .await?;
    println!("  {role}: {email}");
    Ok(user)
}

/// Returns the `Food & Drink` category and its `Coffee` sub-category id.
async fn seed_categories(
    db: &DatabaseConnection,
) -> anyhow::Result<(categories::Model, Uuid)> {
    let repo = CategoryRepository::new(db.clone());
    let mut coffee = None;

    for (name, subs) in CATEGORIES {
        let category = repo.create(name, None).await?;
        for sub in *subs {
            let created = repo.create_sub_category(category.id, sub).await?;
            if *sub == "Coffee" {
                coffee = Some((category.clone(), created.id));
            }
        }
        println!("  {name} ({} sub-categories)", subs.len());
    }

    match coffee {
        Some(found) => Ok(found),
        None => bail!("Coffee sub-category missing from the catalogue"),
    }
}

async fn seed_demo_business(
    db: &DatabaseConnection,
    owner: &users::Model,
    customer: &users::Model,
    (category, sub_category_id): (categories::Model, Uuid),
) -> anyhow::Result<()> {
    let businesses = BusinessRepository::new(db.clone());
    let (business, _) = businesses
        .create_with_default_profiles(CreateBusinessInput {
            owner_user_id: owner.id,
            name: "Demo Coffee".to_string(),
            description: Some("Espresso bar used for local testing".to_string()),
            category_id: category.id,
            sub_category_id: Some(sub_category_id),
            branding: Branding {
                primary_color: "#4B2E2B".to_string(),
                secondary_color: "#C08552".to_string(),
                logo_url: None,
            },
            settings: BusinessSettings {
                referrals_enabled: true,
                welcome_message: Some("Welcome! Every coffee earns points.".to_string()),
            },
        })
        .await?;
    businesses.set_status(business.id, BusinessStatus::Active).await?;
    println!("  Demo Coffee ({})", business.id);

    let mut gold = ProfileDraft::custom(
        "Gold",
        ProfileBenefits {
            earning_multiplier: Multiplier::new(Decimal::new(15, 1))?,
            welcome_bonus_points: 50,
            referral_bonus_points: 25,
        },
    );
    gold.description = Some("Regulars earn half again on every purchase".to_string());
    gold.badge = BadgeStyle {
        color: "#D4AF37".to_string(),
        icon: Some("star".to_string()),
    };
    let gold = ProfileRepository::new(db.clone())
        .create(business.id, &gold)
        .await?;
    println!("  Profile Gold ({})", gold.id);

    CustomerRepository::new(db.clone())
        .enroll(EnrollInput {
            user_id: customer.id,
            business_id: business.id,
            profile_id: gold.id,
            referral_code: None,
        })
        .await?;
    let posted = WalletRepository::new(db.clone())
        .record_purchase(
            MovementContext {
                business_id: business.id,
                user_id: customer.id,
                idempotency_key: Some("seed-purchase-1".to_string()),
                created_by: Some(owner.id),
            },
            Decimal::new(1250, 2),
            Some("Flat white and croissant".to_string()),
        )
        .await?;
    println!(
        "  Enrolled demo customer, balance {}",
        posted.wallet.points_balance
    );
    Ok(())
}

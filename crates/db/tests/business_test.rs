//! Integration tests for Business, Category and Profile repositories.

mod common;

use rust_decimal_macros::dec;
use sea_orm::{EntityTrait, PaginatorTrait};
use uuid::Uuid;

use loyalty_core::auth::UserRole;
use loyalty_core::business::{BusinessError, BusinessStatus, Branding};
use loyalty_core::points::Multiplier;
use loyalty_core::profile::{ProfileBenefits, ProfileDraft, ProfileError};
use loyalty_db::entities::{profiles, sea_orm_active_enums};
use loyalty_db::repositories::{
    BusinessFilter, BusinessRepoError, BusinessRepository, CategoryRepoError, CategoryRepository,
    CustomerRepository, EnrollInput, ProfileRepoError, ProfileRepository, UpdateBusinessInput,
    UpdateProfileInput,
};
use loyalty_shared::types::PageRequest;

use common::{
    business_input, create_active_business, create_category, create_pending_business,
    create_user, general_profile, setup_db,
};

#[tokio::test]
async fn test_business_created_pending_with_two_presets() {
    let db = setup_db().await;

    let (business, profiles) = create_pending_business(&db).await;

    assert_eq!(business.status, sea_orm_active_enums::BusinessStatus::Pending);
    assert_eq!(profiles.len(), 2);
    let names: Vec<&str> = profiles.iter().map(|p| p.name.as_str()).collect();
    assert_eq!(names, ["General Members", "Referred Customers"]);
    assert!(profiles.iter().all(|p| !p.is_deletable));
    assert!(profiles.iter().all(|p| p.earning_multiplier_bp == 10_000));
    assert_eq!(profiles.iter().filter(|p| p.is_default).count(), 1);
}

#[tokio::test]
async fn test_create_rejects_bad_branding_and_category() {
    let db = setup_db().await;
    let repo = BusinessRepository::new(db.clone());
    let owner = create_user(&db, UserRole::Business).await;
    let category = create_category(&db).await;

    let mut input = business_input(owner.id, category.id);
    input.branding = Branding {
        primary_color: "red".to_string(),
        ..Branding::default()
    };
    let result = repo.create_with_default_profiles(input).await;
    assert!(matches!(
        result,
        Err(BusinessRepoError::Rule(BusinessError::InvalidColor("primary_color")))
    ));

    let result = repo
        .create_with_default_profiles(business_input(owner.id, Uuid::new_v4()))
        .await;
    assert!(matches!(result, Err(BusinessRepoError::CategoryNotFound(_))));

    let other = create_category(&db).await;
    let sub = CategoryRepository::new(db.clone())
        .create_sub_category(other.id, "Bakery")
        .await
        .unwrap();
    let mut input = business_input(owner.id, category.id);
    input.sub_category_id = Some(sub.id);
    let result = repo.create_with_default_profiles(input).await;
    assert!(matches!(result, Err(BusinessRepoError::SubCategoryMismatch(_))));

    // Nothing half-created.
    assert_eq!(profiles::Entity::find().count(&db).await.unwrap(), 0);
}

#[tokio::test]
async fn test_status_transitions() {
    let db = setup_db().await;
    let repo = BusinessRepository::new(db.clone());
    let (business, _) = create_pending_business(&db).await;

    let business = repo.set_status(business.id, BusinessStatus::Active).await.unwrap();
    assert_eq!(business.status, sea_orm_active_enums::BusinessStatus::Active);

    let again = repo.set_status(business.id, BusinessStatus::Active).await;
    assert!(matches!(
        again,
        Err(BusinessRepoError::Rule(BusinessError::InvalidTransition { .. }))
    ));

    let business = repo.set_status(business.id, BusinessStatus::Rejected).await.unwrap();
    assert_eq!(business.status, sea_orm_active_enums::BusinessStatus::Rejected);

    let back_to_pending = repo.set_status(business.id, BusinessStatus::Pending).await;
    assert!(back_to_pending.is_err());
}

#[tokio::test]
async fn test_list_by_status_and_owner() {
    let db = setup_db().await;
    let repo = BusinessRepository::new(db.clone());
    let (active, _) = create_active_business(&db).await;
    let (pending, _) = create_pending_business(&db).await;

    let filter = BusinessFilter {
        status: Some(BusinessStatus::Pending),
        ..BusinessFilter::default()
    };
    let (items, total) = repo.list(&filter, &PageRequest::default()).await.unwrap();
    assert_eq!(total, 1);
    assert_eq!(items[0].id, pending.id);

    let filter = BusinessFilter {
        owner_user_id: Some(active.owner_user_id),
        ..BusinessFilter::default()
    };
    let (items, _) = repo.list(&filter, &PageRequest::default()).await.unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].id, active.id);
}

#[tokio::test]
async fn test_update_business() {
    let db = setup_db().await;
    let repo = BusinessRepository::new(db.clone());
    let (business, _) = create_pending_business(&db).await;

    let updated = repo
        .update(
            business.id,
            UpdateBusinessInput {
                name: Some("  Corner Cafe & Bakery ".to_string()),
                branding: Some(Branding {
                    primary_color: "#112233".to_string(),
                    secondary_color: "#445566".to_string(),
                    logo_url: Some("https://cdn.example.com/logo.png".to_string()),
                }),
                ..UpdateBusinessInput::default()
            },
        )
        .await
        .unwrap();

    assert_eq!(updated.name, "Corner Cafe & Bakery");
    assert_eq!(updated.primary_color, "#112233");
    assert_eq!(updated.logo_url.as_deref(), Some("https://cdn.example.com/logo.png"));

    let bad = repo
        .update(
            business.id,
            UpdateBusinessInput {
                name: Some("   ".to_string()),
                ..UpdateBusinessInput::default()
            },
        )
        .await;
    assert!(matches!(bad, Err(BusinessRepoError::Rule(BusinessError::InvalidName))));
}

#[tokio::test]
async fn test_delete_business_cascades() {
    let db = setup_db().await;
    let repo = BusinessRepository::new(db.clone());
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

    repo.delete(business.id).await.unwrap();

    assert!(repo.find_by_id(business.id).await.unwrap().is_none());
    assert_eq!(profiles::Entity::find().count(&db).await.unwrap(), 0);
    assert_eq!(
        loyalty_db::entities::wallets::Entity::find().count(&db).await.unwrap(),
        0
    );
    assert!(matches!(
        repo.delete(business.id).await,
        Err(BusinessRepoError::NotFound(_))
    ));
}

#[tokio::test]
async fn test_category_lifecycle() {
    let db = setup_db().await;
    let repo = CategoryRepository::new(db.clone());

    let category = repo.create("Retail", Some("Shops".to_string())).await.unwrap();
    let duplicate = repo.create(" Retail ", None).await;
    assert!(matches!(duplicate, Err(CategoryRepoError::NameTaken(_))));

    repo.create_sub_category(category.id, "Books").await.unwrap();
    repo.create_sub_category(category.id, "Apparel").await.unwrap();
    let listed = repo.list(false).await.unwrap();
    assert_eq!(listed.len(), 1);
    let subs: Vec<&str> = listed[0].sub_categories.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(subs, ["Apparel", "Books"]);

    let owner = create_user(&db, UserRole::Business).await;
    BusinessRepository::new(db.clone())
        .create_with_default_profiles(business_input(owner.id, category.id))
        .await
        .unwrap();
    assert!(matches!(
        repo.delete(category.id).await,
        Err(CategoryRepoError::InUse(_))
    ));

    let unused = repo.create("Services", None).await.unwrap();
    repo.delete(unused.id).await.unwrap();
    assert!(repo.find_by_id(unused.id).await.unwrap().is_none());
}

#[tokio::test]
async fn test_profile_crud_and_preset_guards() {
    let db = setup_db().await;
    let repo = ProfileRepository::new(db.clone());
    let (business, presets) = create_active_business(&db).await;

    let gold = repo
        .create(
            business.id,
            &ProfileDraft::custom(
                "Gold",
                ProfileBenefits {
                    earning_multiplier: Multiplier::new(dec!(1.5)).unwrap(),
                    welcome_bonus_points: 100,
                    referral_bonus_points: 50,
                },
            ),
        )
        .await
        .unwrap();
    assert_eq!(gold.earning_multiplier_bp, 15_000);
    assert!(gold.is_deletable);

    let duplicate = repo
        .create(business.id, &ProfileDraft::custom("Gold", ProfileBenefits::default()))
        .await;
    assert!(matches!(duplicate, Err(ProfileRepoError::NameTaken(_))));

    let general = general_profile(&presets);
    let rename = repo
        .update(
            business.id,
            general.id,
            UpdateProfileInput {
                name: Some("Everyone".to_string()),
                ..UpdateProfileInput::default()
            },
        )
        .await;
    assert!(matches!(
        rename,
        Err(ProfileRepoError::Rule(ProfileError::PresetRename(_)))
    ));

    let general = repo
        .update(
            business.id,
            general.id,
            UpdateProfileInput {
                welcome_bonus_points: Some(25),
                ..UpdateProfileInput::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(general.welcome_bonus_points, 25);

    let delete_preset = repo.delete(business.id, general.id).await;
    assert!(matches!(
        delete_preset,
        Err(ProfileRepoError::Rule(ProfileError::NotDeletable(_)))
    ));

    let listed = repo.list_by_business(business.id).await.unwrap();
    assert_eq!(listed.len(), 3);
    assert_eq!(listed[0].id, general.id);
}

#[tokio::test]
async fn test_deleting_profile_moves_members_to_general() {
    let db = setup_db().await;
    let repo = ProfileRepository::new(db.clone());
    let (business, presets) = create_active_business(&db).await;
    let vip = repo
        .create(business.id, &ProfileDraft::custom("VIP", ProfileBenefits::default()))
        .await
        .unwrap();
    let customer = create_user(&db, UserRole::Customer).await;
    let customers = CustomerRepository::new(db.clone());
    customers
        .enroll(EnrollInput {
            user_id: customer.id,
            business_id: business.id,
            profile_id: vip.id,
            referral_code: None,
        })
        .await
        .unwrap();

    let moved = repo.delete(business.id, vip.id).await.unwrap();

    assert_eq!(moved, 1);
    let membership = customers
        .find_membership(business.id, customer.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(membership.profile_id, general_profile(&presets).id);
}

#[tokio::test]
async fn test_profile_delete_is_checked_and_applied_once() {
    let db = setup_db().await;
    let repo = ProfileRepository::new(db.clone());
    let (business, presets) = create_active_business(&db).await;
    let (other_business, _) = create_active_business(&db).await;
    let vip = repo
        .create(business.id, &ProfileDraft::custom("VIP", ProfileBenefits::default()))
        .await
        .unwrap();
    let customer = create_user(&db, UserRole::Customer).await;
    CustomerRepository::new(db.clone())
        .enroll(EnrollInput {
            user_id: customer.id,
            business_id: business.id,
            profile_id: vip.id,
            referral_code: None,
        })
        .await
        .unwrap();

    let foreign = repo.delete(other_business.id, vip.id).await;
    assert!(matches!(foreign, Err(ProfileRepoError::NotFound(_))));

    let (first, second) = tokio::join!(
        repo.delete(business.id, vip.id),
        repo.delete(business.id, vip.id)
    );
    let mut moved = Vec::new();
    let mut not_found = 0;
    for result in [first, second] {
        match result {
            Ok(count) => moved.push(count),
            Err(ProfileRepoError::NotFound(_)) => not_found += 1,
            Err(other) => panic!("unexpected error: {other}"),
        }
    }
    assert_eq!(moved, vec![1]);
    assert_eq!(not_found, 1);

    let remaining = repo.list_by_business(business.id).await.unwrap();
    assert_eq!(remaining.len(), 2);
    assert!(remaining.iter().all(|p| !p.is_deletable));
    let membership = CustomerRepository::new(db.clone())
        .find_membership(business.id, customer.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(membership.profile_id, general_profile(&presets).id);
}

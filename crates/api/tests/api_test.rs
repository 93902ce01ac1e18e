//! End-to-end API tests against an in-memory `SQLite` database.

use axum::{
    Router,
    body::Body,
    http::{Method, Request, StatusCode, header},
};
use http_body_util::BodyExt;
use sea_orm::{ConnectOptions, Database};
use serde_json::{Value, json};
use tower::ServiceExt;

use loyalty_api::{AppState, create_router};
use loyalty_core::auth::{UserRole, hash_password};
use loyalty_db::migration::{Migrator, MigratorTrait};
use loyalty_db::repositories::{CreateUserInput, UserRepository};
use loyalty_shared::config::LoyaltySettings;
use loyalty_shared::{JwtConfig, JwtService};

const PASSWORD: &str = "correct-horse-battery";

struct TestApp {
    router: Router,
    db: sea_orm::DatabaseConnection,
}

impl TestApp {
    async fn new() -> Self {
        let mut options = ConnectOptions::new("sqlite::memory:");
        options
            .max_connections(1)
            .min_connections(1)
            .sqlx_logging(false);
        let db = Database::connect(options).await.unwrap();
        Migrator::up(&db, None).await.unwrap();

        let state = AppState::new(
            db.clone(),
            JwtService::new(JwtConfig::default()),
            LoyaltySettings {
                public_base_url: "https://loyal.example".to_string(),
                ..LoyaltySettings::default()
            },
        );
        Self {
            router: create_router(state),
            db,
        }
    }

    async fn send(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        self.send_with_headers(method, uri, token, body, &[]).await
    }

    async fn send_with_headers(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
        headers: &[(&str, &str)],
    ) -> (StatusCode, Value) {
        let mut request = Request::builder()
            .method(method)
            .uri(format!("/api/v1{uri}"))
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(token) = token {
            request = request.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        for (name, value) in headers {
            request = request.header(*name, *value);
        }
        let body = body.map_or_else(Body::empty, |b| Body::from(b.to_string()));

        let response = self
            .router
            .clone()
            .oneshot(request.body(body).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    /// Registers through the API and returns `(access_token, body)`.
    async fn register(&self, email: &str, role: &str) -> (String, Value) {
        let (status, body) = self
            .send(
                Method::POST,
                "/auth/register",
                None,
                Some(json!({
                    "email": email,
                    "password": PASSWORD,
                    "full_name": "Test User",
                    "role": role,
                })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        (body["access_token"].as_str().unwrap().to_string(), body)
    }

    /// Admins cannot self-register; they are created directly.
    async fn admin_token(&self) -> String {
        UserRepository::new(self.db.clone())
            .create(CreateUserInput {
                email: "admin@example.com".to_string(),
                password_hash: hash_password(PASSWORD).unwrap(),
                full_name: "Admin".to_string(),
                role: UserRole::Admin,
            })
            .await
            .unwrap();
        let (status, body) = self
            .send(
                Method::POST,
                "/auth/login",
                None,
                Some(json!({ "email": "admin@example.com", "password": PASSWORD })),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "{body}");
        body["access_token"].as_str().unwrap().to_string()
    }
}

#[tokio::test]
async fn test_health() {
    let app = TestApp::new().await;
    let (status, body) = app.send(Method::GET, "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["database"], "up");
}

#[tokio::test]
async fn test_protected_routes_require_token() {
    let app = TestApp::new().await;
    let (status, body) = app.send(Method::GET, "/auth/me", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "missing_token");

    let (status, body) = app
        .send(Method::GET, "/wallets", Some("not-a-jwt"), None)
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "invalid_token");
}

#[tokio::test]
async fn test_register_login_refresh_me() {
    let app = TestApp::new().await;
    let (token, body) = app.register("Ana@Example.com", "customer").await;
    let code = body["user"]["customer_code"].as_str().unwrap().to_string();
    assert_eq!(code.len(), 6);
    assert_eq!(body["user"]["email"], "ana@example.com");

    let (status, me) = app.send(Method::GET, "/auth/me", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["role"], "customer");
    assert_eq!(me["customer_code"], code.as_str());

    let (status, _) = app
        .send(
            Method::POST,
            "/auth/login",
            None,
            Some(json!({ "email": "ana@example.com", "password": "wrong-password" })),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let refresh = body["refresh_token"].as_str().unwrap();
    let (status, refreshed) = app
        .send(
            Method::POST,
            "/auth/refresh",
            None,
            Some(json!({ "refresh_token": refresh })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(refreshed["access_token"].is_string());

    // Refresh tokens are not access tokens, and vice versa.
    let (status, _) = app.send(Method::GET, "/auth/me", Some(refresh), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    let (status, _) = app
        .send(
            Method::POST,
            "/auth/refresh",
            None,
            Some(json!({ "refresh_token": token })),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_register_validation() {
    let app = TestApp::new().await;
    let (status, body) = app
        .send(
            Method::POST,
            "/auth/register",
            None,
            Some(json!({ "email": "x@example.com", "password": PASSWORD, "full_name": "X", "role": "admin" })),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "FORBIDDEN");

    let (status, body) = app
        .send(
            Method::POST,
            "/auth/register",
            None,
            Some(json!({ "email": "not-an-email", "password": "short", "full_name": "X" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "VALIDATION_ERROR");

    app.register("dup@example.com", "customer").await;
    let (status, _) = app
        .send(
            Method::POST,
            "/auth/register",
            None,
            Some(json!({ "email": "dup@example.com", "password": PASSWORD, "full_name": "X" })),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
#[allow(clippy::too_many_lines)]
async fn test_business_lifecycle_and_points_flow() {
    let app = TestApp::new().await;
    let admin = app.admin_token().await;
    let (owner, _) = app.register("owner@example.com", "business").await;
    let (customer, customer_body) = app.register("customer@example.com", "customer").await;
    let code = customer_body["user"]["customer_code"].as_str().unwrap();

    // Admin sets up a category.
    let (status, category) = app
        .send(
            Method::POST,
            "/categories",
            Some(&admin),
            Some(json!({ "name": "Coffee" })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{category}");
    let (status, _) = app
        .send(
            Method::POST,
            "/categories",
            Some(&owner),
            Some(json!({ "name": "Nope" })),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // Owner registers a business with its two preset profiles.
    let (status, created) = app
        .send(
            Method::POST,
            "/businesses",
            Some(&owner),
            Some(json!({ "name": "Corner Cafe", "category_id": category["id"] })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{created}");
    assert_eq!(created["business"]["status"], "pending");
    assert_eq!(created["profiles"].as_array().unwrap().len(), 2);
    let business_id = created["business"]["id"].as_str().unwrap().to_string();

    let (status, _) = app
        .send(
            Method::POST,
            "/businesses",
            Some(&customer),
            Some(json!({ "name": "Nope", "category_id": category["id"] })),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // A gold tier with a multiplier and a welcome bonus.
    let (status, gold) = app
        .send(
            Method::POST,
            &format!("/businesses/{business_id}/profiles"),
            Some(&owner),
            Some(json!({
                "name": "Gold",
                "earning_multiplier": "1.5",
                "welcome_bonus_points": 100,
            })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{gold}");
    assert_eq!(gold["earning_multiplier"], "1.5");
    let gold_id = gold["id"].as_str().unwrap();

    let (status, qr) = app
        .send(
            Method::GET,
            &format!("/businesses/{business_id}/profiles/{gold_id}/qr"),
            Some(&owner),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{qr}");
    assert_eq!(qr["payload"]["type"], "customer_registration");
    assert!(
        qr["url"]
            .as_str()
            .unwrap()
            .starts_with("https://loyal.example/register?businessId=")
    );
    let content = qr["content"].as_str().unwrap().to_string();

    // Pending businesses do not enroll customers.
    let (status, _) = app
        .send(
            Method::POST,
            "/enrollments",
            Some(&customer),
            Some(json!({ "qr": content })),
        )
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let (status, approved) = app
        .send(
            Method::POST,
            &format!("/businesses/{business_id}/approve"),
            Some(&admin),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(approved["status"], "active");

    let (status, enrolled) = app
        .send(
            Method::POST,
            "/enrollments",
            Some(&customer),
            Some(json!({ "qr": content })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{enrolled}");
    assert_eq!(enrolled["profile"]["name"], "Gold");
    assert_eq!(enrolled["welcome_bonus_points"], 100);
    assert_eq!(enrolled["wallet"]["points_balance"], 100);
    assert_eq!(enrolled["business_name"], "Corner Cafe");

    let (status, _) = app
        .send(
            Method::POST,
            "/enrollments",
            Some(&customer),
            Some(json!({ "qr": content })),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    // Purchase with a retry key, then the retry.
    let purchase_uri = format!("/businesses/{business_id}/transactions/purchase");
    let purchase = json!({ "customer_code": code.to_lowercase(), "amount": "25.75" });
    let (status, posted) = app
        .send_with_headers(
            Method::POST,
            &purchase_uri,
            Some(&owner),
            Some(purchase.clone()),
            &[("Idempotency-Key", "receipt-1")],
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{posted}");
    assert_eq!(posted["transaction"]["points"], 37);
    assert_eq!(posted["transaction"]["base_points"], 25);
    assert_eq!(posted["transaction"]["purchase_amount"], "25.75");
    assert_eq!(posted["wallet"]["points_balance"], 137);

    let (status, replay) = app
        .send_with_headers(
            Method::POST,
            &purchase_uri,
            Some(&owner),
            Some(purchase),
            &[("Idempotency-Key", "receipt-1")],
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(replay["replayed"], true);
    assert_eq!(replay["wallet"]["points_balance"], 137);

    let (status, body) = app
        .send(
            Method::POST,
            &format!("/businesses/{business_id}/transactions/redeem"),
            Some(&owner),
            Some(json!({ "customer_code": code, "points": 500 })),
        )
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"], "BUSINESS_RULE_VIOLATION");

    let (status, _) = app
        .send(
            Method::POST,
            &format!("/businesses/{business_id}/transactions/redeem"),
            Some(&owner),
            Some(json!({ "customer_code": code, "points": 37 })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);

    // Customers cannot move points, even their own.
    let (status, _) = app
        .send(
            Method::POST,
            &purchase_uri,
            Some(&customer),
            Some(json!({ "customer_code": code, "amount": "10" })),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, wallets) = app.send(Method::GET, "/wallets", Some(&customer), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(wallets[0]["points_balance"], 100);
    assert_eq!(wallets[0]["business_name"], "Corner Cafe");

    let (status, history) = app
        .send(
            Method::GET,
            &format!("/wallets/{business_id}/transactions"),
            Some(&customer),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(history["meta"]["total"], 3);
    let kinds: Vec<&str> = history["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["kind"].as_str().unwrap())
        .collect();
    assert_eq!(kinds, ["redemption", "purchase", "welcome_bonus"]);

    let (status, members) = app
        .send(
            Method::GET,
            &format!("/businesses/{business_id}/customers"),
            Some(&owner),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(members["data"][0]["customer_code"], code);
    let customer_id = members["data"][0]["user_id"].as_str().unwrap();

    let (status, check) = app
        .send(
            Method::GET,
            &format!("/businesses/{business_id}/wallets/{customer_id}/reconcile"),
            Some(&owner),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(check["is_consistent"], true);
    assert_eq!(check["derived_balance"], 100);
}

#[tokio::test]
async fn test_other_owners_cannot_see_business() {
    let app = TestApp::new().await;
    let admin = app.admin_token().await;
    let (owner, _) = app.register("owner@example.com", "business").await;
    let (rival, _) = app.register("rival@example.com", "business").await;

    let (_, category) = app
        .send(
            Method::POST,
            "/categories",
            Some(&admin),
            Some(json!({ "name": "Bakery" })),
        )
        .await;
    let (_, created) = app
        .send(
            Method::POST,
            "/businesses",
            Some(&owner),
            Some(json!({ "name": "Bread Co", "category_id": category["id"] })),
        )
        .await;
    let business_id = created["business"]["id"].as_str().unwrap();

    let (status, _) = app
        .send(Method::GET, &format!("/businesses/{business_id}"), Some(&rival), None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, listed) = app.send(Method::GET, "/businesses", Some(&rival), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(listed["meta"]["total"], 0);

    let (status, listed) = app
        .send(Method::GET, "/businesses?status=pending", Some(&admin), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(listed["meta"]["total"], 1);

    // Categories in use cannot be deleted.
    let (status, _) = app
        .send(
            Method::DELETE,
            &format!("/categories/{}", category["id"].as_str().unwrap()),
            Some(&admin),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

/// An approved business with one customer enrolled through its default profile.
struct Storefront {
    admin: String,
    owner: String,
    business_id: String,
    customer_id: String,
    customer_code: String,
    referred_profile_id: String,
}

impl TestApp {
    async fn storefront(&self) -> Storefront {
        let admin = self.admin_token().await;
        let (owner, _) = self.register("owner@example.com", "business").await;
        let (customer, customer_body) = self.register("customer@example.com", "customer").await;

        let (_, category) = self
            .send(
                Method::POST,
                "/categories",
                Some(&admin),
                Some(json!({ "name": "Coffee" })),
            )
            .await;
        let (status, created) = self
            .send(
                Method::POST,
                "/businesses",
                Some(&owner),
                Some(json!({ "name": "Corner Cafe", "category_id": category["id"] })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{created}");
        let business_id = created["business"]["id"].as_str().unwrap().to_string();
        let profiles = created["profiles"].as_array().unwrap();
        let profile_id = |is_default: bool| {
            profiles
                .iter()
                .find(|p| p["is_default"] == is_default)
                .and_then(|p| p["id"].as_str())
                .unwrap()
                .to_string()
        };
        let general_id = profile_id(true);
        let referred_profile_id = profile_id(false);

        let (status, _) = self
            .send(
                Method::POST,
                &format!("/businesses/{business_id}/approve"),
                Some(&admin),
                None,
            )
            .await;
        assert_eq!(status, StatusCode::OK);

        let (_, qr) = self
            .send(
                Method::GET,
                &format!("/businesses/{business_id}/profiles/{general_id}/qr"),
                Some(&owner),
                None,
            )
            .await;
        let (status, enrolled) = self
            .send(
                Method::POST,
                "/enrollments",
                Some(&customer),
                Some(json!({ "qr": qr["content"] })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{enrolled}");

        Storefront {
            admin,
            owner,
            business_id,
            customer_id: customer_body["user"]["id"].as_str().unwrap().to_string(),
            customer_code: customer_body["user"]["customer_code"]
                .as_str()
                .unwrap()
                .to_string(),
            referred_profile_id,
        }
    }
}

#[tokio::test]
async fn test_admin_cannot_deactivate_self() {
    let app = TestApp::new().await;
    let admin = app.admin_token().await;
    let (_, me) = app.send(Method::GET, "/auth/me", Some(&admin), None).await;
    let admin_id = me["id"].as_str().unwrap();

    let (status, body) = app
        .send(
            Method::PATCH,
            &format!("/users/{admin_id}"),
            Some(&admin),
            Some(json!({ "is_active": false })),
        )
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"], "BUSINESS_RULE_VIOLATION");

    // Deactivating someone else works and locks them out.
    let (customer, body) = app.register("customer@example.com", "customer").await;
    let customer_id = body["user"]["id"].as_str().unwrap();
    let (status, _) = app
        .send(
            Method::PATCH,
            &format!("/users/{customer_id}"),
            Some(&customer),
            Some(json!({ "is_active": false })),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, user) = app
        .send(
            Method::PATCH,
            &format!("/users/{customer_id}"),
            Some(&admin),
            Some(json!({ "is_active": false })),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{user}");
    assert_eq!(user["is_active"], false);
    assert!(user.get("password_hash").is_none());

    let (status, body) = app
        .send(
            Method::POST,
            "/auth/login",
            None,
            Some(json!({ "email": "customer@example.com", "password": PASSWORD })),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "This account has been disabled");
}

#[tokio::test]
async fn test_reject_business() {
    let app = TestApp::new().await;
    let admin = app.admin_token().await;
    let (owner, _) = app.register("owner@example.com", "business").await;
    let (_, category) = app
        .send(
            Method::POST,
            "/categories",
            Some(&admin),
            Some(json!({ "name": "Books" })),
        )
        .await;
    let (_, created) = app
        .send(
            Method::POST,
            "/businesses",
            Some(&owner),
            Some(json!({ "name": "Page Turners", "category_id": category["id"] })),
        )
        .await;
    let business_id = created["business"]["id"].as_str().unwrap();
    let reject_uri = format!("/businesses/{business_id}/reject");

    let (status, _) = app.send(Method::POST, &reject_uri, Some(&owner), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, rejected) = app.send(Method::POST, &reject_uri, Some(&admin), None).await;
    assert_eq!(status, StatusCode::OK, "{rejected}");
    assert_eq!(rejected["status"], "rejected");

    let (status, listed) = app
        .send(Method::GET, "/businesses?status=rejected", Some(&admin), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(listed["meta"]["total"], 1);
}

#[tokio::test]
async fn test_adjust_points() {
    let app = TestApp::new().await;
    let shop = app.storefront().await;
    let uri = format!("/businesses/{}/transactions/adjust", shop.business_id);

    let (status, posted) = app
        .send(
            Method::POST,
            &uri,
            Some(&shop.owner),
            Some(json!({
                "customer_code": shop.customer_code,
                "points": 40,
                "reason": "Missed stamp card",
            })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{posted}");
    assert_eq!(posted["transaction"]["kind"], "adjustment");
    assert_eq!(posted["transaction"]["points"], 40);
    assert_eq!(posted["transaction"]["note"], "Missed stamp card");
    assert_eq!(posted["wallet"]["points_balance"], 40);

    let (status, body) = app
        .send(
            Method::POST,
            &uri,
            Some(&shop.owner),
            Some(json!({ "customer_code": shop.customer_code, "points": -5, "reason": "" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "VALIDATION_ERROR");

    let (status, posted) = app
        .send(
            Method::POST,
            &uri,
            Some(&shop.owner),
            Some(json!({
                "customer_code": shop.customer_code,
                "points": -15,
                "reason": "Duplicate stamp",
            })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{posted}");
    assert_eq!(posted["wallet"]["points_balance"], 25);
}

#[tokio::test]
async fn test_find_customer_by_code() {
    let app = TestApp::new().await;
    let shop = app.storefront().await;
    let base = format!("/businesses/{}/customers/by-code", shop.business_id);

    let (status, found) = app
        .send(
            Method::GET,
            &format!("{base}/{}", shop.customer_code.to_lowercase()),
            Some(&shop.owner),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{found}");
    assert_eq!(found["user_id"], shop.customer_id.as_str());
    assert_eq!(found["customer_code"], shop.customer_code.as_str());
    assert_eq!(found["profile_name"], "General Members");
    assert_eq!(found["points_balance"], 0);

    let (status, _) = app
        .send(Method::GET, &format!("{base}/ZZZZZZZZ"), Some(&shop.owner), None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    // Registered but not a member of this business.
    let (_, outsider) = app.register("outsider@example.com", "customer").await;
    let outsider_code = outsider["user"]["customer_code"].as_str().unwrap();
    let (status, _) = app
        .send(
            Method::GET,
            &format!("{base}/{outsider_code}"),
            Some(&shop.owner),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_change_customer_profile() {
    let app = TestApp::new().await;
    let shop = app.storefront().await;
    let uri = format!("/businesses/{}/customers/{}", shop.business_id, shop.customer_id);

    let (status, moved) = app
        .send(
            Method::PATCH,
            &uri,
            Some(&shop.owner),
            Some(json!({ "profile_id": shop.referred_profile_id })),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{moved}");
    assert_eq!(moved["profile_id"], shop.referred_profile_id.as_str());

    // Moving tiers does not pay out a welcome bonus.
    let (status, found) = app
        .send(
            Method::GET,
            &format!(
                "/businesses/{}/customers/by-code/{}",
                shop.business_id, shop.customer_code
            ),
            Some(&shop.owner),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(found["profile_name"], "Referred Customers");
    assert_eq!(found["points_balance"], 0);

    // A profile belonging to a different business.
    let (other_owner, _) = app.register("other@example.com", "business").await;
    let (_, categories) = app.send(Method::GET, "/categories", Some(&shop.admin), None).await;
    let (_, other) = app
        .send(
            Method::POST,
            "/businesses",
            Some(&other_owner),
            Some(json!({ "name": "Other Cafe", "category_id": categories[0]["id"] })),
        )
        .await;
    let (status, _) = app
        .send(
            Method::PATCH,
            &uri,
            Some(&shop.owner),
            Some(json!({ "profile_id": other["profiles"][0]["id"] })),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_sub_category_routes() {
    let app = TestApp::new().await;
    let admin = app.admin_token().await;
    let (owner, _) = app.register("owner@example.com", "business").await;
    let (_, category) = app
        .send(
            Method::POST,
            "/categories",
            Some(&admin),
            Some(json!({ "name": "Food" })),
        )
        .await;
    let category_id = category["id"].as_str().unwrap();
    let create_uri = format!("/categories/{category_id}/sub-categories");

    let (status, _) = app
        .send(
            Method::POST,
            &create_uri,
            Some(&owner),
            Some(json!({ "name": "Bakery" })),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, sub) = app
        .send(
            Method::POST,
            &create_uri,
            Some(&admin),
            Some(json!({ "name": "Bakery" })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{sub}");
    assert_eq!(sub["category_id"], category_id);
    assert_eq!(sub["name"], "Bakery");
    let sub_id = sub["id"].as_str().unwrap();

    let (status, listed) = app.send(Method::GET, "/categories", Some(&owner), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(listed[0]["sub_categories"][0]["name"], "Bakery");

    let delete_uri = format!("/sub-categories/{sub_id}");
    let (status, _) = app.send(Method::DELETE, &delete_uri, Some(&admin), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = app.send(Method::DELETE, &delete_uri, Some(&admin), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, listed) = app.send(Method::GET, "/categories", Some(&owner), None).await;
    assert_eq!(listed[0]["sub_categories"].as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn test_idempotency_header_wins_over_body() {
    let app = TestApp::new().await;
    let shop = app.storefront().await;
    let uri = format!("/businesses/{}/transactions/purchase", shop.business_id);
    let purchase = json!({
        "customer_code": shop.customer_code,
        "amount": "10",
        "idempotency_key": "body-key",
    });

    let (status, _) = app
        .send_with_headers(
            Method::POST,
            &uri,
            Some(&shop.owner),
            Some(purchase.clone()),
            &[("Idempotency-Key", "header-key")],
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);

    // The body key was ignored, so it is still unused.
    let (status, posted) = app
        .send(Method::POST, &uri, Some(&shop.owner), Some(purchase))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(posted["replayed"], false);
    assert_eq!(posted["wallet"]["points_balance"], 20);

    // The header key was stored and replays from the body too.
    let (status, replay) = app
        .send(
            Method::POST,
            &uri,
            Some(&shop.owner),
            Some(json!({
                "customer_code": shop.customer_code,
                "amount": "10",
                "idempotency_key": "header-key",
            })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(replay["replayed"], true);
    assert_eq!(replay["wallet"]["points_balance"], 20);

    // Same key, different amount.
    let (status, body) = app
        .send_with_headers(
            Method::POST,
            &uri,
            Some(&shop.owner),
            Some(json!({ "customer_code": shop.customer_code, "amount": "99" })),
            &[("Idempotency-Key", "header-key")],
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "CONFLICT");
}

#[tokio::test]
async fn test_idempotency_key_length_limit() {
    let app = TestApp::new().await;
    let shop = app.storefront().await;
    let uri = format!("/businesses/{}/transactions/purchase", shop.business_id);
    let purchase = json!({ "customer_code": shop.customer_code, "amount": "10" });
    let too_long = "k".repeat(129);
    let longest = "k".repeat(128);

    let (status, body) = app
        .send_with_headers(
            Method::POST,
            &uri,
            Some(&shop.owner),
            Some(purchase.clone()),
            &[("Idempotency-Key", too_long.as_str())],
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "VALIDATION_ERROR");

    let (status, _) = app
        .send(
            Method::POST,
            &uri,
            Some(&shop.owner),
            Some(json!({
                "customer_code": shop.customer_code,
                "amount": "10",
                "idempotency_key": too_long,
            })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, posted) = app
        .send_with_headers(
            Method::POST,
            &uri,
            Some(&shop.owner),
            Some(purchase),
            &[("Idempotency-Key", longest.as_str())],
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{posted}");
    assert_eq!(posted["wallet"]["points_balance"], 10);
}

#[tokio::test]
async fn test_update_business_clears_optional_fields() {
    let app = TestApp::new().await;
    let shop = app.storefront().await;
    let uri = format!("/businesses/{}", shop.business_id);

    let (status, updated) = app
        .send(
            Method::PATCH,
            &uri,
            Some(&shop.owner),
            Some(json!({
                "logo_url": "https://cdn.example.com/logo.png",
                "welcome_message": "Welcome in!",
            })),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{updated}");
    assert_eq!(updated["welcome_message"], "Welcome in!");

    let (status, updated) = app
        .send(
            Method::PATCH,
            &uri,
            Some(&shop.owner),
            Some(json!({ "logo_url": "", "welcome_message": "" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{updated}");
    assert!(updated["logo_url"].is_null());
    assert!(updated["welcome_message"].is_null());
}

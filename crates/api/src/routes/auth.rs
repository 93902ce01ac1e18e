//! Authentication routes for register, login, token refresh and the current user.

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    routing::{get, post},
};
use tracing::info;

use crate::error::{ApiError, ApiResult};
use crate::extractors::ValidatedJson;
use crate::{AppState, middleware::AuthUser};
use loyalty_core::auth::{UserRole, hash_password, verify_against_decoy, verify_password};
use loyalty_db::entities::users;
use loyalty_db::repositories::{CreateUserInput, UserRepository};
use loyalty_shared::TokenKind;
use loyalty_shared::auth::{
    LoginRequest, LoginResponse, RefreshRequest, RegisterRequest, UserInfo,
};

/// Creates the public auth router.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/auth/login", post(login))
        .route("/auth/register", post(register))
        .route("/auth/refresh", post(refresh))
}

/// Auth routes that need a valid access token.
pub fn protected_routes() -> Router<AppState> {
    Router::new().route("/auth/me", get(me))
}

/// Builds the user block of auth responses.
pub(crate) fn user_info(user: &users::Model) -> UserInfo {
    UserInfo {
        id: user.id,
        email: user.email.clone(),
        full_name: user.full_name.clone(),
        role: UserRole::from(user.role).as_str().to_string(),
        customer_code: user.customer_code.clone(),
    }
}

fn issue_tokens(state: &AppState, user: &users::Model) -> ApiResult<LoginResponse> {
    let role = UserRole::from(user.role);
    let access_token = state
        .jwt_service
        .generate_access_token(user.id, role.as_str())?;
    let refresh_token = state
        .jwt_service
        .generate_refresh_token(user.id, role.as_str())?;

    Ok(LoginResponse {
        user: user_info(user),
        access_token,
        refresh_token,
        expires_in: state.jwt_service.access_token_expires_in(),
    })
}

/// POST /auth/register - Create a customer or business account.
async fn register(
    State(state): State<AppState>,
    ValidatedJson(payload): ValidatedJson<RegisterRequest>,
) -> ApiResult<(StatusCode, Json<LoginResponse>)> {
    let role: UserRole = payload
        .role
        .parse()
        .map_err(|e: loyalty_core::auth::UnknownRole| ApiError::validation(e.to_string()))?;
    if !role.can_self_register() {
        return Err(ApiError::forbidden(format!(
            "Accounts with role '{role}' cannot self-register"
        )));
    }

    let password_hash = hash_password(&payload.password)?;
    let user = UserRepository::new((*state.db).clone())
        .with_code_attempts(state.loyalty.max_customer_code_attempts)
        .create(CreateUserInput {
            email: payload.email,
            password_hash,
            full_name: payload.full_name,
            role,
        })
        .await?;

    info!(user_id = %user.id, role = %role, "New user registered");
    Ok((StatusCode::CREATED, Json(issue_tokens(&state, &user)?)))
}

/// POST /auth/login - Authenticate user and return tokens.
async fn login(
    State(state): State<AppState>,
    ValidatedJson(payload): ValidatedJson<LoginRequest>,
) -> ApiResult<Json<LoginResponse>> {
    let invalid = || ApiError::unauthorized("Invalid email or password");

    let Some(user) = UserRepository::new((*state.db).clone())
        .find_by_email(&payload.email)
        .await?
    else {
        verify_against_decoy(&payload.password);
        info!("Login attempt for non-existent user");
        return Err(invalid());
    };

    if !verify_password(&payload.password, &user.password_hash)? {
        info!(user_id = %user.id, "Failed login attempt - invalid password");
        return Err(invalid());
    }

    if !user.is_active {
        return Err(ApiError::unauthorized("This account has been disabled"));
    }

    info!(user_id = %user.id, "User logged in successfully");
    Ok(Json(issue_tokens(&state, &user)?))
}

/// POST /auth/refresh - Exchange a refresh token for a new access token.
async fn refresh(
    State(state): State<AppState>,
    Json(payload): Json<RefreshRequest>,
) -> ApiResult<Json<serde_json::Value>> {
    let claims = state
        .jwt_service
        .validate_kind(&payload.refresh_token, TokenKind::Refresh)?;

    // Deactivated accounts cannot mint new access tokens.
    let user = UserRepository::new((*state.db).clone())
        .find_by_id(claims.user_id())
        .await?
        .filter(|u| u.is_active)
        .ok_or_else(|| ApiError::unauthorized("Invalid refresh token"))?;

    let role = UserRole::from(user.role);
    let access_token = state
        .jwt_service
        .generate_access_token(user.id, role.as_str())?;

    Ok(Json(serde_json::json!({
        "access_token": access_token,
        "expires_in": state.jwt_service.access_token_expires_in()
    })))
}

/// GET /auth/me - The authenticated user.
async fn me(State(state): State<AppState>, auth: AuthUser) -> ApiResult<Json<UserInfo>> {
    let user = UserRepository::new((*state.db).clone())
        .find_by_id(auth.user_id)
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))?;
    Ok(Json(user_info(&user)))
}

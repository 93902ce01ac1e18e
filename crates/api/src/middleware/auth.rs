//! Authentication middleware for protected routes.

use axum::{
    Json,
    extract::{FromRequestParts, Request, State},
    http::{StatusCode, header::AUTHORIZATION, request::Parts},
    middleware::Next,
    response::{IntoResponse, Response},
};
use serde_json::json;
use uuid::Uuid;

use crate::AppState;
use crate::error::ApiError;
use loyalty_core::auth::UserRole;
use loyalty_shared::{JwtError, TokenKind};

/// Extracts the bearer token from the Authorization header.
fn extract_bearer_token(header: &str) -> Option<&str> {
    header
        .strip_prefix("Bearer ")
        .or_else(|| header.strip_prefix("bearer "))
}

fn reject(error: &str, message: &str) -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({ "error": error, "message": message })),
    )
        .into_response()
}

/// Authentication middleware that validates JWT access tokens.
///
/// This middleware:
/// 1. Extracts the Bearer token from the Authorization header
/// 2. Validates it as an access token (refresh tokens are refused)
/// 3. Stores the caller as an [`AuthUser`] in request extensions
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let auth_header = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok());

    let Some(token) = auth_header.and_then(extract_bearer_token) else {
        return reject(
            "missing_token",
            "Authorization header with Bearer token is required",
        );
    };

    let claims = match state.jwt_service.validate_kind(token, TokenKind::Access) {
        Ok(claims) => claims,
        Err(JwtError::Expired) => return reject("token_expired", "Token has expired"),
        Err(_) => return reject("invalid_token", "Invalid or malformed token"),
    };

    let Ok(role) = claims.role.parse::<UserRole>() else {
        return reject("invalid_token", "Token carries an unknown role");
    };

    request.extensions_mut().insert(AuthUser {
        user_id: claims.user_id(),
        role,
    });
    next.run(request).await
}

/// The authenticated caller.
///
/// Use this in handlers behind [`auth_middleware`]:
///
/// ```ignore
/// async fn handler(auth: AuthUser) -> impl IntoResponse {
///     let user_id = auth.user_id;
///     // ...
/// }
/// ```
#[derive(Debug, Clone, Copy)]
pub struct AuthUser {
    /// Caller's user ID.
    pub user_id: Uuid,
    /// Caller's platform role.
    pub role: UserRole,
}

impl AuthUser {
    /// Fails unless the caller is an administrator.
    ///
    /// # Errors
    ///
    /// Returns 403 for every other role.
    pub fn require_admin(&self) -> Result<(), ApiError> {
        if self.role.is_admin() {
            Ok(())
        } else {
            Err(ApiError::forbidden("Administrator role required"))
        }
    }

    /// Fails unless the caller holds wallets.
    ///
    /// # Errors
    ///
    /// Returns 403 for admins and business accounts.
    pub fn require_customer(&self) -> Result<(), ApiError> {
        if self.role.holds_wallets() {
            Ok(())
        } else {
            Err(ApiError::forbidden("Customer role required"))
        }
    }
}

impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = (StatusCode, Json<serde_json::Value>);

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts.extensions.get::<Self>().copied().ok_or_else(|| {
            (
                StatusCode::UNAUTHORIZED,
                Json(json!({
                    "error": "unauthorized",
                    "message": "Authentication required"
                })),
            )
        })
    }
}

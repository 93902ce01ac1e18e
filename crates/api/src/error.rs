//! Maps application errors to JSON responses.
//!
//! Every failure leaves the API as `{ "error": CODE, "message": text }` with
//! the status from [`AppError::status_code`].

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use sea_orm::DbErr;
use serde_json::json;
use tracing::{error, warn};
use validator::ValidationErrors;

use loyalty_core::auth::PasswordError;
use loyalty_core::points::PointsError;
use loyalty_core::qr::QrError;
use loyalty_db::repositories::{
    BusinessRepoError, CategoryRepoError, CustomerRepoError, ProfileRepoError, UserRepoError,
    WalletRepoError,
};
use loyalty_shared::{AppError, JwtError};

/// Handler error wrapping the shared [`AppError`] taxonomy.
#[derive(Debug)]
pub struct ApiError(pub AppError);

/// Result type for handlers.
pub type ApiResult<T> = Result<T, ApiError>;

impl ApiError {
    /// 401 with a message.
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self(AppError::Unauthorized(message.into()))
    }

    /// 403 with a message.
    pub fn forbidden(message: impl Into<String>) -> Self {
        Self(AppError::Forbidden(message.into()))
    }

    /// 404 with a message.
    pub fn not_found(message: impl Into<String>) -> Self {
        Self(AppError::NotFound(message.into()))
    }

    /// 400 with a message.
    pub fn validation(message: impl Into<String>) -> Self {
        Self(AppError::Validation(message.into()))
    }

    /// 422 with a message.
    pub fn business_rule(message: impl Into<String>) -> Self {
        Self(AppError::BusinessRule(message.into()))
    }

    /// HTTP status of this error.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        StatusCode::from_u16(self.0.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if self.0.is_client_error() {
            warn!(status = status.as_u16(), error = %self.0, "Request rejected");
        } else {
            error!(status = status.as_u16(), error = %self.0, "Request failed");
        }

        (
            status,
            Json(json!({
                "error": self.0.error_code(),
                "message": self.0.public_message(),
            })),
        )
            .into_response()
    }
}

impl From<AppError> for ApiError {
    fn from(err: AppError) -> Self {
        Self(err)
    }
}

impl From<DbErr> for ApiError {
    fn from(err: DbErr) -> Self {
        Self(AppError::Database(err.to_string()))
    }
}

impl From<ValidationErrors> for ApiError {
    fn from(errors: ValidationErrors) -> Self {
        Self(errors.into())
    }
}

impl From<QrError> for ApiError {
    fn from(err: QrError) -> Self {
        Self(AppError::Validation(err.to_string()))
    }
}

impl From<PointsError> for ApiError {
    fn from(err: PointsError) -> Self {
        Self(AppError::Validation(err.to_string()))
    }
}

impl From<PasswordError> for ApiError {
    fn from(err: PasswordError) -> Self {
        Self(AppError::Internal(err.to_string()))
    }
}

impl From<JwtError> for ApiError {
    fn from(err: JwtError) -> Self {
        match err {
            JwtError::EncodingError(_) => Self(AppError::Internal(err.to_string())),
            JwtError::Expired => Self::unauthorized("Token has expired"),
            JwtError::DecodingError(_) | JwtError::WrongKind { .. } => {
                Self::unauthorized("Invalid or malformed token")
            }
        }
    }
}

macro_rules! from_repo_error {
    ($($err:ty),+ $(,)?) => {
        $(
            impl From<$err> for ApiError {
                fn from(err: $err) -> Self {
                    Self(err.into())
                }
            }
        )+
    };
}

from_repo_error!(
    UserRepoError,
    CategoryRepoError,
    BusinessRepoError,
    ProfileRepoError,
    CustomerRepoError,
    WalletRepoError,
);

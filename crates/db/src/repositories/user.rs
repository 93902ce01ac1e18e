//! User repository for database operations.

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, Set,
};
use tracing::{info, warn};
use uuid::Uuid;

use loyalty_core::auth::UserRole;
use loyalty_core::customer_code::{generate_customer_code, normalize_customer_code};
use loyalty_shared::AppError;
use loyalty_shared::types::PageRequest;

use crate::entities::{sea_orm_active_enums, users};
use crate::is_unique_violation;

/// Default number of tries to find a free customer code.
pub const DEFAULT_CODE_ATTEMPTS: u32 = 10;

/// Error types for user operations.
#[derive(Debug, thiserror::Error)]
pub enum UserRepoError {
    /// Email is already registered.
    #[error("Email is already registered")]
    EmailTaken,

    /// User not found.
    #[error("User not found: {0}")]
    NotFound(Uuid),

    /// No free customer code was found.
    #[error("Could not allocate a unique customer code after {0} attempts")]
    CustomerCodeExhausted(u32),

    /// Database error.
    #[error("Database error: {0}")]
    Database(#[from] DbErr),
}

impl From<UserRepoError> for AppError {
    fn from(err: UserRepoError) -> Self {
        match err {
            UserRepoError::EmailTaken => Self::Conflict(err.to_string()),
            UserRepoError::NotFound(_) => Self::NotFound(err.to_string()),
            UserRepoError::CustomerCodeExhausted(_) => Self::Internal(err.to_string()),
            UserRepoError::Database(e) => Self::Database(e.to_string()),
        }
    }
}

/// Input for creating a user.
#[derive(Debug, Clone)]
pub struct CreateUserInput {
    /// Login email; stored lowercased.
    pub email: String,
    /// Argon2 PHC string.
    pub password_hash: String,
    /// Display name.
    pub full_name: String,
    /// Platform role.
    pub role: UserRole,
}

/// User repository for CRUD operations.
#[derive(Debug, Clone)]
pub struct UserRepository {
    db: DatabaseConnection,
    max_code_attempts: u32,
}

impl UserRepository {
    /// Creates a new user repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self {
            db,
            max_code_attempts: DEFAULT_CODE_ATTEMPTS,
        }
    }

    /// Overrides how many customer codes are tried before giving up.
    #[must_use]
    pub const fn with_code_attempts(mut self, attempts: u32) -> Self {
        self.max_code_attempts = attempts;
        self
    }

    /// Finds a user by email.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn find_by_email(&self, email: &str) -> Result<Option<users::Model>, DbErr> {
        users::Entity::find()
            .filter(users::Column::Email.eq(email.trim().to_lowercase()))
            .one(&self.db)
            .await
    }

    /// Finds a user by ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<users::Model>, DbErr> {
        users::Entity::find_by_id(id).one(&self.db).await
    }

    /// Finds a customer by their customer code, in any letter case.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn find_by_customer_code(&self, code: &str) -> Result<Option<users::Model>, DbErr> {
        let Some(code) = normalize_customer_code(code) else {
            return Ok(None);
        };
        users::Entity::find()
            .filter(users::Column::CustomerCode.eq(code))
            .one(&self.db)
            .await
    }

    /// Checks if an email is already registered.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn email_exists(&self, email: &str) -> Result<bool, DbErr> {
        let count = users::Entity::find()
            .filter(users::Column::Email.eq(email.trim().to_lowercase()))
            .count(&self.db)
            .await?;

        Ok(count > 0)
    }

    /// Creates a new user. Customers get a unique customer code.
    ///
    /// # Errors
    ///
    /// - `EmailTaken` if the email is registered
    /// - `CustomerCodeExhausted` if no free code was found
    pub async fn create(&self, input: CreateUserInput) -> Result<users::Model, UserRepoError> {
        let email = input.email.trim().to_lowercase();
        if self.email_exists(&email).await? {
            return Err(UserRepoError::EmailTaken);
        }

        let attempts = if input.role.holds_wallets() {
            self.max_code_attempts.max(1)
        } else {
            1
        };

        for attempt in 1..=attempts {
            let customer_code = if input.role.holds_wallets() {
                let code = generate_customer_code(&mut rand::rng());
                if self.code_exists(&code).await? {
                    warn!(attempt, "Customer code collision, retrying");
                    continue;
                }
                Some(code)
            } else {
                None
            };

            let now = Utc::now().into();
            let user = users::ActiveModel {
                id: Set(Uuid::now_v7()),
                email: Set(email.clone()),
                password_hash: Set(input.password_hash.clone()),
                full_name: Set(input.full_name.trim().to_string()),
                role: Set(input.role.into()),
                customer_code: Set(customer_code),
                is_active: Set(true),
                created_at: Set(now),
                updated_at: Set(now),
            };

            match user.insert(&self.db).await {
                Ok(user) => {
                    info!(user_id = %user.id, role = %input.role, "User created");
                    return Ok(user);
                }
                // Lost a race on the code index; the email was checked above.
                Err(err) if is_unique_violation(&err) && input.role.holds_wallets() => {
                    if self.email_exists(&email).await? {
                        return Err(UserRepoError::EmailTaken);
                    }
                    warn!(attempt, "Customer code taken concurrently, retrying");
                }
                Err(err) if is_unique_violation(&err) => return Err(UserRepoError::EmailTaken),
                Err(err) => return Err(err.into()),
            }
        }

        Err(UserRepoError::CustomerCodeExhausted(attempts))
    }

    /// Lists users, newest first, optionally filtered by role.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn list(
        &self,
        role: Option<UserRole>,
        page: &PageRequest,
    ) -> Result<(Vec<users::Model>, u64), DbErr> {
        let mut query = users::Entity::find();
        if let Some(role) = role {
            query = query.filter(
                users::Column::Role.eq(sea_orm_active_enums::UserRole::from(role)),
            );
        }

        let total = query.clone().count(&self.db).await?;
        let items = query
            .order_by_desc(users::Column::CreatedAt)
            .order_by_asc(users::Column::Email)
            .offset(page.offset())
            .limit(page.limit())
            .all(&self.db)
            .await?;

        Ok((items, total))
    }

    /// Activates or deactivates a user.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the user does not exist.
    pub async fn set_active(&self, id: Uuid, is_active: bool) -> Result<users::Model, UserRepoError> {
        let user = self
            .find_by_id(id)
            .await?
            .ok_or(UserRepoError::NotFound(id))?;

        let mut active: users::ActiveModel = user.into();
        active.is_active = Set(is_active);
        active.updated_at = Set(Utc::now().into());
        let user = active.update(&self.db).await?;

        info!(user_id = %id, is_active, "User activation changed");
        Ok(user)
    }

    async fn code_exists(&self, code: &str) -> Result<bool, DbErr> {
        let count = users::Entity::find()
            .filter(users::Column::CustomerCode.eq(code))
            .count(&self.db)
            .await?;
        Ok(count > 0)
    }
}

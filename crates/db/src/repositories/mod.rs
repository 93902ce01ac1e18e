//! Repository abstractions for data access.
//!
//! Repositories provide a clean interface for database operations,
//! hiding the `SeaORM` implementation details from the rest of the application.

pub mod business;
pub mod category;
pub mod customer;
pub mod profile;
pub mod user;
pub mod wallet;

pub use business::{
    BusinessFilter, BusinessRepoError, BusinessRepository, CreateBusinessInput, UpdateBusinessInput,
};
pub use category::{
    CategoryRepoError, CategoryRepository, CategoryWithSubCategories, UpdateCategoryInput,
};
pub use customer::{CustomerRepoError, CustomerRepository, EnrollInput, Enrollment, MemberSummary};
pub use profile::{ProfileRepoError, ProfileRepository, UpdateProfileInput, to_draft};
pub use user::{CreateUserInput, UserRepoError, UserRepository};
pub use wallet::{
    MovementContext, PostedMovement, TransactionFilter, WalletRepoError, WalletRepository,
};

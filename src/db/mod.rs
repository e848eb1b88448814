//! User record storage.
//!
//! The auth core only needs lookups by email, user name and id plus a create
//! operation that hashes the password before anything is persisted.

pub mod memory;
pub mod models;
pub mod operations;

use async_trait::async_trait;
use uuid::Uuid;

use crate::auth::password::PasswordHasher;
use crate::Result;

pub use memory::MemoryUserRepository;
pub use models::{NewUser, User, UserProfile};
pub use operations::DbOperations;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn find_by_email(&self, email_address: &str) -> Result<Option<User>>;

    async fn find_by_username(&self, user_name: &str) -> Result<Option<User>>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>>;

    async fn find_by_account_number(&self, account_number: &str) -> Result<Option<User>>;

    async fn find_by_identity_number(&self, identity_number: &str) -> Result<Option<User>>;

    /// Hashes `new_user.password` and persists the user. Uniqueness
    /// violations surface as `AuthError::Conflict`.
    async fn create(&self, new_user: NewUser) -> Result<User>;
}

/// Runs the password KDF on the blocking pool and builds the record to insert.
pub(crate) async fn prepare_user(hasher: &PasswordHasher, new_user: NewUser) -> Result<User> {
    let hasher = hasher.clone();
    let user = tokio::task::spawn_blocking(move || new_user.into_user(&hasher)).await??;
    Ok(user)
}

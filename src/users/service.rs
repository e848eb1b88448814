use std::sync::Arc;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::db::{User, UserProfile, UserRepository};
use crate::error::AuthError;
use crate::session::SessionStore;
use crate::Result;

pub struct UsersService {
    users: Arc<dyn UserRepository>,
    sessions: SessionStore,
    cache_ttl: u64,
}

fn not_found() -> AuthError {
    AuthError::NotFound("User not found".to_string())
}

fn required<'a>(value: &'a str, field: &str) -> Result<&'a str> {
    match value.trim() {
        "" => Err(AuthError::BadRequest(format!("{} is required", field)).into()),
        v => Ok(v),
    }
}

impl UsersService {
    pub fn new(users: Arc<dyn UserRepository>, sessions: SessionStore, cache_ttl: u64) -> Self {
        Self {
            users,
            sessions,
            cache_ttl,
        }
    }

    /// Cache-aside read of the profile snapshot. Cache failures fall through
    /// to the repository.
    pub async fn get_by_id(&self, user_id: Uuid) -> Result<UserProfile> {
        match self.sessions.cached_user(user_id).await {
            Ok(Some(profile)) => {
                debug!(%user_id, "User profile served from cache");
                return Ok(profile);
            }
            Ok(None) => {}
            Err(e) => warn!(%user_id, "User cache read failed: {}", e),
        }

        let user = self.users.find_by_id(user_id).await?.ok_or_else(not_found)?;
        let profile = UserProfile::from(&user);
        if let Err(e) = self.sessions.cache_user(&profile, self.cache_ttl).await {
            warn!(%user_id, "User cache write failed: {}", e);
        }
        Ok(profile)
    }

    pub async fn get_by_account_number(&self, account_number: &str) -> Result<UserProfile> {
        let account_number = required(account_number, "accountNumber")?;
        let user = self.users.find_by_account_number(account_number).await?;
        Self::profile_or_not_found(user)
    }

    pub async fn get_by_identity_number(&self, identity_number: &str) -> Result<UserProfile> {
        let identity_number = required(identity_number, "identityNumber")?;
        let user = self.users.find_by_identity_number(identity_number).await?;
        Self::profile_or_not_found(user)
    }

    fn profile_or_not_found(user: Option<User>) -> Result<UserProfile> {
        user.as_ref()
            .map(UserProfile::from)
            .ok_or_else(|| not_found().into())
    }
}

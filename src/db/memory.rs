use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{prepare_user, NewUser, User, UserRepository};
use crate::auth::password::PasswordHasher;
use crate::error::AuthError;
use crate::Result;

/// In-process user store with the same uniqueness rules as the `users` table.
#[derive(Clone)]
pub struct MemoryUserRepository {
    users: Arc<RwLock<HashMap<Uuid, User>>>,
    hasher: PasswordHasher,
}

impl MemoryUserRepository {
    pub fn new(hasher: PasswordHasher) -> Self {
        Self {
            users: Arc::new(RwLock::new(HashMap::new())),
            hasher,
        }
    }

    pub async fn count(&self) -> usize {
        self.users.read().await.len()
    }

    async fn find_where<F>(&self, predicate: F) -> Option<User>
    where
        F: Fn(&User) -> bool,
    {
        self.users.read().await.values().find(|u| predicate(u)).cloned()
    }
}

#[async_trait]
impl UserRepository for MemoryUserRepository {
    async fn find_by_email(&self, email_address: &str) -> Result<Option<User>> {
        let email_address = email_address.to_lowercase();
        Ok(self.find_where(|u| u.email_address == email_address).await)
    }

    async fn find_by_username(&self, user_name: &str) -> Result<Option<User>> {
        Ok(self.find_where(|u| u.user_name == user_name).await)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>> {
        Ok(self.users.read().await.get(&id).cloned())
    }

    async fn find_by_account_number(&self, account_number: &str) -> Result<Option<User>> {
        Ok(self.find_where(|u| u.account_number == account_number).await)
    }

    async fn find_by_identity_number(&self, identity_number: &str) -> Result<Option<User>> {
        Ok(self.find_where(|u| u.identity_number == identity_number).await)
    }

    async fn create(&self, new_user: NewUser) -> Result<User> {
        let user = prepare_user(&self.hasher, new_user).await?;

        let mut users = self.users.write().await;
        let duplicate = users.values().any(|u| {
            u.email_address == user.email_address
                || u.user_name == user.user_name
                || u.identity_number == user.identity_number
        });
        if duplicate {
            return Err(AuthError::Conflict("User already exists".to_string()).into());
        }

        users.insert(user.id, user.clone());
        Ok(user)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Settings;
    use crate::error::AppError;

    fn repository() -> MemoryUserRepository {
        let settings = Settings::new_for_test().unwrap();
        MemoryUserRepository::new(PasswordHasher::new(&settings.auth.password).unwrap())
    }

    fn new_user(email: &str, name: &str, identity: &str) -> NewUser {
        NewUser {
            email_address: email.to_string(),
            user_name: name.to_string(),
            password: "secret1".to_string(),
            account_number: "ACC-1".to_string(),
            identity_number: identity.to_string(),
        }
    }

    #[tokio::test]
    async fn test_create_and_lookup() {
        let repo = repository();
        let user = repo.create(new_user("A@x.com", "alice", "ID-1")).await.unwrap();

        assert_eq!(repo.find_by_email("a@X.COM").await.unwrap().unwrap().id, user.id);
        assert_eq!(repo.find_by_username("alice").await.unwrap().unwrap().id, user.id);
        assert_eq!(repo.find_by_id(user.id).await.unwrap().unwrap().id, user.id);
        assert_eq!(repo.find_by_account_number("ACC-1").await.unwrap().unwrap().id, user.id);
        assert_eq!(repo.find_by_identity_number("ID-1").await.unwrap().unwrap().id, user.id);
        assert!(repo.find_by_username("bob").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicates_conflict() {
        let repo = repository();
        repo.create(new_user("a@x.com", "alice", "ID-1")).await.unwrap();

        let result = repo.create(new_user("a@x.com", "other", "ID-2")).await;
        assert!(matches!(result, Err(AppError::AuthError(AuthError::Conflict(_)))));

        let result = repo.create(new_user("b@x.com", "alice", "ID-3")).await;
        assert!(matches!(result, Err(AppError::AuthError(AuthError::Conflict(_)))));

        assert_eq!(repo.count().await, 1);
    }
}

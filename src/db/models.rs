use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::auth::password::{PasswordError, PasswordHasher};

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: Uuid,
    pub email_address: String,
    pub user_name: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub account_number: String,
    pub identity_number: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields accepted at sign-up. `password` is plaintext and only lives until
/// [`NewUser::into_user`] replaces it with a hash record.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email_address: String,
    pub user_name: String,
    pub password: String,
    pub account_number: String,
    pub identity_number: String,
}

impl NewUser {
    pub fn into_user(self, hasher: &PasswordHasher) -> Result<User, PasswordError> {
        let password_hash = hasher.hash(&self.password)?;
        let now = Utc::now();
        Ok(User {
            id: Uuid::new_v4(),
            email_address: self.email_address.to_lowercase(),
            user_name: self.user_name,
            password_hash,
            account_number: self.account_number,
            identity_number: self.identity_number,
            created_at: now,
            updated_at: now,
        })
    }
}

/// What leaves the service about a user: everything except the password hash.
/// Also the shape of the cached snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: Uuid,
    pub email_address: String,
    pub user_name: String,
    pub account_number: String,
    pub identity_number: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&User> for UserProfile {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            email_address: user.email_address.clone(),
            user_name: user.user_name.clone(),
            account_number: user.account_number.clone(),
            identity_number: user.identity_number.clone(),
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Settings;

    #[test]
    fn test_new_user_is_hashed_and_normalised() {
        let hasher = PasswordHasher::new(&Settings::new_for_test().unwrap().auth.password).unwrap();
        let user = NewUser {
            email_address: "A@X.com".to_string(),
            user_name: "alice".to_string(),
            password: "secret1".to_string(),
            account_number: "ACC-1".to_string(),
            identity_number: "ID-1".to_string(),
        }
        .into_user(&hasher)
        .unwrap();

        assert_eq!(user.email_address, "a@x.com");
        assert_ne!(user.password_hash, "secret1");
        assert!(hasher.compare("secret1", &user.password_hash).unwrap());
    }

    #[test]
    fn test_profile_omits_password_hash() {
        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4(),
            email_address: "a@x.com".to_string(),
            user_name: "alice".to_string(),
            password_hash: "deadbeef.cafebabe".to_string(),
            account_number: "ACC-1".to_string(),
            identity_number: "ID-1".to_string(),
            created_at: now,
            updated_at: now,
        };

        let profile = serde_json::to_value(UserProfile::from(&user)).unwrap();
        assert_eq!(profile["emailAddress"], "a@x.com");
        assert!(profile.get("passwordHash").is_none());

        let raw = serde_json::to_value(&user).unwrap();
        assert!(raw.get("password_hash").is_none());
    }
}

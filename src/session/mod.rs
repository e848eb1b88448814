//! Server-side session state.
//!
//! A session's only persisted state is the refresh token currently valid for
//! it, kept under `"{prefix}{userId}:{sessionId}"` with a TTL equal to the
//! refresh-token lifetime. The same store also holds short-lived user
//! snapshots under `"{prefix}user:{userId}"`.

mod memory;
mod redis_store;

use async_trait::async_trait;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use uuid::Uuid;

use crate::config::SessionConfig;
use crate::db::UserProfile;

pub use self::memory::MemoryStore;
pub use self::redis_store::RedisStore;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("store operation timed out after {0}ms")]
    Timeout(u64),

    #[error("store backend error: {0}")]
    Backend(String),

    #[error("stored value could not be decoded: {0}")]
    Decode(String),
}

/// Minimal key-value contract with per-key atomicity and expiry.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Upserts `value`, replacing any previous value and resetting expiry.
    async fn set_ex(&self, key: &str, value: &str, ttl_seconds: u64) -> Result<(), StoreError>;

    /// Returns `None` once the entry expired or was deleted.
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Idempotent.
    async fn delete(&self, key: &str) -> Result<(), StoreError>;
}

#[derive(Clone)]
pub struct SessionStore {
    backend: Arc<dyn KeyValueStore>,
    key_prefix: String,
    op_timeout: Duration,
}

impl SessionStore {
    pub fn new(backend: Arc<dyn KeyValueStore>, config: &SessionConfig) -> Self {
        Self {
            backend,
            key_prefix: config.key_prefix.clone(),
            op_timeout: Duration::from_millis(config.op_timeout_ms),
        }
    }

    fn session_key(&self, user_id: Uuid, session_id: Uuid) -> String {
        format!("{}{}:{}", self.key_prefix, user_id, session_id)
    }

    fn user_key(&self, user_id: Uuid) -> String {
        format!("{}user:{}", self.key_prefix, user_id)
    }

    async fn bounded<T, F>(&self, op: F) -> Result<T, StoreError>
    where
        F: Future<Output = Result<T, StoreError>>,
    {
        tokio::time::timeout(self.op_timeout, op)
            .await
            .map_err(|_| StoreError::Timeout(self.op_timeout.as_millis() as u64))?
    }

    pub async fn put(
        &self,
        user_id: Uuid,
        session_id: Uuid,
        refresh_token: &str,
        ttl_seconds: u64,
    ) -> Result<(), StoreError> {
        let key = self.session_key(user_id, session_id);
        self.bounded(self.backend.set_ex(&key, refresh_token, ttl_seconds)).await
    }

    pub async fn get(&self, user_id: Uuid, session_id: Uuid) -> Result<Option<String>, StoreError> {
        let key = self.session_key(user_id, session_id);
        self.bounded(self.backend.get(&key)).await
    }

    pub async fn delete(&self, user_id: Uuid, session_id: Uuid) -> Result<(), StoreError> {
        let key = self.session_key(user_id, session_id);
        self.bounded(self.backend.delete(&key)).await
    }

    pub async fn cache_user(&self, user: &UserProfile, ttl_seconds: u64) -> Result<(), StoreError> {
        let payload =
            serde_json::to_string(user).map_err(|e| StoreError::Decode(e.to_string()))?;
        let key = self.user_key(user.id);
        self.bounded(self.backend.set_ex(&key, &payload, ttl_seconds)).await
    }

    pub async fn cached_user(&self, user_id: Uuid) -> Result<Option<UserProfile>, StoreError> {
        let key = self.user_key(user_id);
        match self.bounded(self.backend.get(&key)).await? {
            Some(payload) => serde_json::from_str(&payload)
                .map(Some)
                .map_err(|e| StoreError::Decode(e.to_string())),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Settings;
    use mockall::predicate::{always, eq};

    fn config(prefix: &str, op_timeout_ms: u64) -> SessionConfig {
        let mut config = Settings::new_for_test().unwrap().session;
        config.key_prefix = prefix.to_string();
        config.op_timeout_ms = op_timeout_ms;
        config
    }

    #[tokio::test]
    async fn test_session_key_layout() {
        let user_id = Uuid::new_v4();
        let session_id = Uuid::new_v4();

        let mut backend = MockKeyValueStore::new();
        backend
            .expect_set_ex()
            .with(eq(format!("auth:{}:{}", user_id, session_id)), eq("token"), eq(60))
            .times(1)
            .returning(|_, _, _| Ok(()));
        backend
            .expect_get()
            .with(eq(format!("auth:user:{}", user_id)))
            .times(1)
            .returning(|_| Ok(None));

        let store = SessionStore::new(Arc::new(backend), &config("auth:", 1000));
        store.put(user_id, session_id, "token", 60).await.unwrap();
        assert_eq!(store.cached_user(user_id).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_round_trip_with_memory_backend() {
        let store = SessionStore::new(Arc::new(MemoryStore::new()), &config("", 1000));
        let user_id = Uuid::new_v4();
        let session_id = Uuid::new_v4();

        assert_eq!(store.get(user_id, session_id).await.unwrap(), None);
        store.put(user_id, session_id, "first", 60).await.unwrap();
        store.put(user_id, session_id, "second", 60).await.unwrap();
        assert_eq!(
            store.get(user_id, session_id).await.unwrap().as_deref(),
            Some("second")
        );

        store.delete(user_id, session_id).await.unwrap();
        store.delete(user_id, session_id).await.unwrap();
        assert_eq!(store.get(user_id, session_id).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_corrupt_user_snapshot() {
        let mut backend = MockKeyValueStore::new();
        backend
            .expect_get()
            .with(always())
            .returning(|_| Ok(Some("{not json".to_string())));

        let store = SessionStore::new(Arc::new(backend), &config("", 1000));
        let result = store.cached_user(Uuid::new_v4()).await;
        assert!(matches!(result, Err(StoreError::Decode(_))));
    }

    struct StalledStore;

    #[async_trait]
    impl KeyValueStore for StalledStore {
        async fn set_ex(&self, _: &str, _: &str, _: u64) -> Result<(), StoreError> {
            std::future::pending().await
        }

        async fn get(&self, _: &str) -> Result<Option<String>, StoreError> {
            std::future::pending().await
        }

        async fn delete(&self, _: &str) -> Result<(), StoreError> {
            std::future::pending().await
        }
    }

    #[tokio::test]
    async fn test_slow_backend_times_out() {
        let store = SessionStore::new(Arc::new(StalledStore), &config("", 20));
        let result = store.get(Uuid::new_v4(), Uuid::new_v4()).await;
        assert!(matches!(result, Err(StoreError::Timeout(20))));
    }
}

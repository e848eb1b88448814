use async_trait::async_trait;
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Postgres, Transaction};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use uuid::Uuid;

use super::{prepare_user, NewUser, User, UserRepository};
use crate::auth::password::PasswordHasher;
use crate::error::{AppError, DatabaseError};
use crate::Result;

const USER_COLUMNS: &str = "id, email_address, user_name, password_hash, account_number, \
                            identity_number, created_at, updated_at";

/// Postgres-backed [`UserRepository`].
pub struct DbOperations {
    pool: Arc<PgPool>,
    hasher: PasswordHasher,
}

impl DbOperations {
    pub fn new(pool: Arc<PgPool>, hasher: PasswordHasher) -> Self {
        Self { pool, hasher }
    }

    pub async fn new_with_options(
        url: &str,
        max_connections: u32,
        acquire_timeout: Duration,
        hasher: PasswordHasher,
    ) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(acquire_timeout)
            .connect(url)
            .await
            .map_err(|e| AppError::DatabaseError(DatabaseError::ConnectionError(e.to_string())))?;

        Ok(Self::new(Arc::new(pool), hasher))
    }

    pub fn pool(&self) -> Arc<PgPool> {
        self.pool.clone()
    }

    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations").run(self.pool.as_ref()).await?;
        info!("Database migrations applied");
        Ok(())
    }

    pub async fn begin_transaction(&self) -> Result<Transaction<'_, Postgres>> {
        Ok(self.pool.as_ref().begin().await?)
    }

    pub async fn create_user_with_transaction(
        &self,
        user: &User,
        transaction: &mut Transaction<'_, Postgres>,
    ) -> Result<User> {
        let query = format!(
            "INSERT INTO users ({USER_COLUMNS}) VALUES ($1, $2, $3, $4, $5, $6, $7, $8) \
             RETURNING {USER_COLUMNS}"
        );
        let user = sqlx::query_as::<_, User>(&query)
            .bind(user.id)
            .bind(&user.email_address)
            .bind(&user.user_name)
            .bind(&user.password_hash)
            .bind(&user.account_number)
            .bind(&user.identity_number)
            .bind(user.created_at)
            .bind(user.updated_at)
            .fetch_one(&mut **transaction)
            .await?;

        Ok(user)
    }

    async fn find_one(&self, column: &str, value: &str) -> Result<Option<User>> {
        let query = format!("SELECT {USER_COLUMNS} FROM users WHERE {column} = $1");
        let user = sqlx::query_as::<_, User>(&query)
            .bind(value)
            .fetch_optional(self.pool.as_ref())
            .await?;

        Ok(user)
    }
}

#[async_trait]
impl UserRepository for DbOperations {
    async fn find_by_email(&self, email_address: &str) -> Result<Option<User>> {
        self.find_one("email_address", &email_address.to_lowercase()).await
    }

    async fn find_by_username(&self, user_name: &str) -> Result<Option<User>> {
        self.find_one("user_name", user_name).await
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>> {
        let query = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
        let user = sqlx::query_as::<_, User>(&query)
            .bind(id)
            .fetch_optional(self.pool.as_ref())
            .await?;

        Ok(user)
    }

    async fn find_by_account_number(&self, account_number: &str) -> Result<Option<User>> {
        self.find_one("account_number", account_number).await
    }

    async fn find_by_identity_number(&self, identity_number: &str) -> Result<Option<User>> {
        self.find_one("identity_number", identity_number).await
    }

    async fn create(&self, new_user: NewUser) -> Result<User> {
        let user = prepare_user(&self.hasher, new_user).await?;

        let mut transaction = self.begin_transaction().await?;
        match self.create_user_with_transaction(&user, &mut transaction).await {
            Ok(user) => {
                transaction.commit().await?;
                info!(user_id = %user.id, "Created user");
                Ok(user)
            }
            Err(e) => {
                transaction.rollback().await?;
                Err(e)
            }
        }
    }
}

use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::auth::password::{constant_time_eq, PasswordHasher};
use crate::auth::token::{SessionClaims, TokenCodec, TokenError, TokenKind};
use crate::db::{NewUser, UserProfile, UserRepository};
use crate::error::AuthError;
use crate::session::SessionStore;
use crate::Result;

#[derive(Debug, Clone)]
pub struct Credentials {
    pub email_address: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

pub struct AuthService {
    users: Arc<dyn UserRepository>,
    sessions: SessionStore,
    tokens: TokenCodec,
    hasher: PasswordHasher,
    user_cache_ttl: u64,
}

impl AuthService {
    pub fn new(
        users: Arc<dyn UserRepository>,
        sessions: SessionStore,
        tokens: TokenCodec,
        hasher: PasswordHasher,
        user_cache_ttl: u64,
    ) -> Self {
        Self {
            users,
            sessions,
            tokens,
            hasher,
            user_cache_ttl,
        }
    }

    /// Lifetime of refresh tokens and of the session entries tracking them.
    pub fn refresh_ttl(&self) -> u64 {
        self.tokens.ttl_seconds(TokenKind::Refresh)
    }

    pub async fn sign_in(&self, credentials: Credentials) -> Result<TokenPair> {
        let email_address = credentials.email_address.to_lowercase();

        let user = self
            .users
            .find_by_email(&email_address)
            .await?
            .ok_or_else(|| AuthError::NotFound("User not found".to_string()))?;

        if !self.verify_password(credentials.password, user.password_hash.clone()).await? {
            warn!(user_id = %user.id, "Sign-in rejected: invalid password");
            return Err(AuthError::Unauthorized("Invalid password".to_string()).into());
        }

        let session = SessionClaims {
            user_id: user.id,
            session_id: Uuid::new_v4(),
        };
        let pair = self.issue_pair(&session)?;

        let profile = UserProfile::from(&user);
        let (stored, cached) = tokio::join!(
            self.sessions.put(
                session.user_id,
                session.session_id,
                &pair.refresh_token,
                self.refresh_ttl(),
            ),
            self.sessions.cache_user(&profile, self.user_cache_ttl),
        );
        // The pair is useless unless its refresh token is on record.
        stored?;
        if let Err(e) = cached {
            warn!(user_id = %user.id, error = %e, "Failed to cache user snapshot");
        }

        info!(user_id = %session.user_id, session_id = %session.session_id, "Session started");
        Ok(pair)
    }

    /// Registers a user. Does not sign them in.
    pub async fn sign_up(&self, new_user: NewUser) -> Result<()> {
        let new_user = NewUser {
            email_address: new_user.email_address.to_lowercase(),
            ..new_user
        };

        let (email_taken, user_name_taken) = tokio::try_join!(
            self.users.find_by_email(&new_user.email_address),
            self.users.find_by_username(&new_user.user_name),
        )?;
        if email_taken.is_some() || user_name_taken.is_some() {
            return Err(AuthError::Conflict("User already exists".to_string()).into());
        }

        let user = self.users.create(new_user).await?;
        info!(user_id = %user.id, "User signed up");
        Ok(())
    }

    /// Rotates a refresh token. Each refresh token is accepted once; presenting
    /// a superseded one revokes the whole session.
    pub async fn refresh(&self, refresh_token: Option<&str>) -> Result<TokenPair> {
        let presented = require_token(refresh_token)?;
        let session = self.verify_refresh_token(presented)?;

        let current = self.sessions.get(session.user_id, session.session_id).await?;
        let matches = current
            .as_deref()
            .map(|stored| constant_time_eq(stored.as_bytes(), presented.as_bytes()))
            .unwrap_or(false);

        if !matches {
            warn!(
                user_id = %session.user_id,
                session_id = %session.session_id,
                "Stale or replayed refresh token; revoking session"
            );
            self.sessions.delete(session.user_id, session.session_id).await?;
            return Err(AuthError::invalid_refresh_token().into());
        }

        let pair = self.issue_pair(&session)?;
        self.sessions
            .put(
                session.user_id,
                session.session_id,
                &pair.refresh_token,
                self.refresh_ttl(),
            )
            .await?;

        debug!(user_id = %session.user_id, session_id = %session.session_id, "Session rotated");
        Ok(pair)
    }

    pub async fn sign_out(&self, refresh_token: Option<&str>) -> Result<()> {
        let presented = require_token(refresh_token)?;
        let session = self.verify_refresh_token(presented)?;

        self.sessions.delete(session.user_id, session.session_id).await?;
        info!(user_id = %session.user_id, session_id = %session.session_id, "Session ended");
        Ok(())
    }

    /// Access tokens are stateless: only signature, issuer and expiry count.
    pub fn verify_access_token(&self, token: &str) -> std::result::Result<SessionClaims, TokenError> {
        self.tokens.verify(TokenKind::Access, token)
    }

    // Any codec failure collapses into one generic rejection.
    fn verify_refresh_token(&self, token: &str) -> Result<SessionClaims> {
        match self.tokens.verify(TokenKind::Refresh, token) {
            Ok(session) => Ok(session),
            Err(reason) => {
                debug!(%reason, "Refresh token failed verification");
                Err(AuthError::invalid_refresh_token().into())
            }
        }
    }

    fn issue_pair(&self, session: &SessionClaims) -> Result<TokenPair> {
        let sign = |kind| {
            self.tokens
                .sign(kind, session)
                .map_err(|e| crate::AppError::InternalError(e.to_string()))
        };
        Ok(TokenPair {
            access_token: sign(TokenKind::Access)?,
            refresh_token: sign(TokenKind::Refresh)?,
        })
    }

    async fn verify_password(&self, password: String, record: String) -> Result<bool> {
        let hasher = self.hasher.clone();
        let valid = tokio::task::spawn_blocking(move || hasher.compare(&password, &record)).await??;
        Ok(valid)
    }
}

fn require_token(token: Option<&str>) -> Result<&str> {
    match token {
        Some(token) if !token.is_empty() => Ok(token),
        _ => Err(AuthError::missing_refresh_token().into()),
    }
}

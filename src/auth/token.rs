use chrono::Utc;
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use rand::{rngs::OsRng, RngCore};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use uuid::Uuid;

use crate::config::AuthConfig;

const JWT_ALGORITHM: Algorithm = Algorithm::HS256;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Access,
    Refresh,
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenKind::Access => write!(f, "access"),
            TokenKind::Refresh => write!(f, "refresh"),
        }
    }
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum TokenError {
    #[error("Token signature is invalid")]
    SignatureInvalid,

    #[error("Token has expired")]
    Expired,

    #[error("Token issuer does not match")]
    IssuerMismatch,

    #[error("Token is malformed")]
    Malformed,

    #[error("Token signing failed: {0}")]
    Signing(String),
}

/// Claims carried by both token kinds. Nothing else goes in the payload.
///
/// `nonce` makes every signed token unique: a rotation inside the same second
/// would otherwise reproduce its predecessor byte for byte.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String, // User ID
    pub jti: String, // Session ID
    pub iss: String,
    pub iat: i64,
    pub exp: i64,
    #[serde(default)]
    pub nonce: String,
}

fn nonce() -> String {
    let mut bytes = [0u8; 8];
    OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// The identity a verified token binds to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionClaims {
    pub user_id: Uuid,
    pub session_id: Uuid,
}

struct TokenKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl_seconds: i64,
}

impl TokenKeys {
    fn new(secret: &str, ttl_seconds: u64) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            ttl_seconds: i64::try_from(ttl_seconds).unwrap_or(i64::MAX),
        }
    }
}

/// Signs and verifies HS256 JWTs. Access and refresh tokens use separate
/// secrets, so one kind can never pass verification as the other.
pub struct TokenCodec {
    access: TokenKeys,
    refresh: TokenKeys,
    issuer: String,
}

impl TokenCodec {
    pub fn new(config: &AuthConfig) -> Self {
        Self {
            access: TokenKeys::new(&config.access_token_secret, config.access_token_ttl),
            refresh: TokenKeys::new(&config.refresh_token_secret, config.refresh_token_ttl),
            issuer: config.jwt_issuer.clone(),
        }
    }

    fn keys(&self, kind: TokenKind) -> &TokenKeys {
        match kind {
            TokenKind::Access => &self.access,
            TokenKind::Refresh => &self.refresh,
        }
    }

    pub fn ttl_seconds(&self, kind: TokenKind) -> u64 {
        self.keys(kind).ttl_seconds as u64
    }

    pub fn sign(&self, kind: TokenKind, session: &SessionClaims) -> Result<String, TokenError> {
        let now = Utc::now().timestamp();
        let claims = Claims {
            sub: session.user_id.to_string(),
            jti: session.session_id.to_string(),
            iss: self.issuer.clone(),
            iat: now,
            exp: now.saturating_add(self.keys(kind).ttl_seconds),
            nonce: nonce(),
        };
        self.encode(kind, &claims)
    }

    fn encode(&self, kind: TokenKind, claims: &Claims) -> Result<String, TokenError> {
        encode(&Header::new(JWT_ALGORITHM), claims, &self.keys(kind).encoding)
            .map_err(|e| TokenError::Signing(e.to_string()))
    }

    pub fn verify(&self, kind: TokenKind, token: &str) -> Result<SessionClaims, TokenError> {
        let mut validation = Validation::new(JWT_ALGORITHM);
        validation.set_issuer(&[&self.issuer]);
        validation.set_required_spec_claims(&["exp", "iss", "sub"]);
        validation.leeway = 0;

        let data = decode::<Claims>(token, &self.keys(kind).decoding, &validation).map_err(|e| {
            match e.kind() {
                ErrorKind::InvalidSignature => TokenError::SignatureInvalid,
                ErrorKind::ExpiredSignature => TokenError::Expired,
                ErrorKind::InvalidIssuer => TokenError::IssuerMismatch,
                ErrorKind::MissingRequiredClaim(claim) if claim == "iss" => {
                    TokenError::IssuerMismatch
                }
                _ => TokenError::Malformed,
            }
        })?;

        let user_id = Uuid::parse_str(&data.claims.sub).map_err(|_| TokenError::Malformed)?;
        let session_id = Uuid::parse_str(&data.claims.jti).map_err(|_| TokenError::Malformed)?;
        Ok(SessionClaims { user_id, session_id })
    }
}

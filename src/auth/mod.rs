//! Authentication: password hashing, token signing, and the session
//! lifecycle built on top of them.

pub mod extractor;
pub mod handlers;
pub mod password;
pub mod token;
mod service;

pub use extractor::AuthenticatedSession;
pub use password::PasswordHasher;
pub use service::{AuthService, Credentials, TokenPair};
pub use token::{SessionClaims, TokenCodec, TokenKind};

use actix_web::{dev::Payload, http::header, web, FromRequest, HttpRequest};
use futures::future::{ready, Ready};

use crate::auth::token::{SessionClaims, TokenError};
use crate::error::{AppError, AuthError};
use crate::AppState;

/// The session behind a valid `Authorization: Bearer <access token>` header.
#[derive(Debug, Clone, Copy)]
pub struct AuthenticatedSession(pub SessionClaims);

impl FromRequest for AuthenticatedSession {
    type Error = AppError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        ready(authenticate(req))
    }
}

fn unauthorized(message: &str) -> AppError {
    AuthError::Unauthorized(message.to_string()).into()
}

fn authenticate(req: &HttpRequest) -> Result<AuthenticatedSession, AppError> {
    let value = req
        .headers()
        .get(header::AUTHORIZATION)
        .ok_or_else(|| AuthError::BadRequest("Missing authorization header".to_string()))?;
    let value = value.to_str().map_err(|_| unauthorized("Unauthorized"))?;

    let mut parts = value.split(' ');
    let (scheme, token) = match (parts.next(), parts.next()) {
        (Some(scheme), Some(token)) if !scheme.is_empty() && !token.is_empty() => (scheme, token),
        _ => return Err(unauthorized("Unauthorized")),
    };
    if scheme != "Bearer" {
        return Err(AuthError::BadRequest("Unsupported authorization type".to_string()).into());
    }

    let state = req
        .app_data::<web::Data<AppState>>()
        .ok_or_else(|| AppError::InternalError("Application state is not configured".to_string()))?;

    match state.auth_service.verify_access_token(token) {
        Ok(session) => Ok(AuthenticatedSession(session)),
        Err(TokenError::Expired) => Err(unauthorized("JWT expired")),
        Err(_) => Err(unauthorized("Unauthorized")),
    }
}

use actix_web::{web, HttpResponse};

use crate::auth::AuthenticatedSession;
use crate::error::AppError;
use crate::response::ApiResponse;
use crate::AppState;

/// Profile of the user behind the bearer token.
pub async fn me(
    session: AuthenticatedSession,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let profile = state.users_service.get_by_id(session.0.user_id).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(profile)))
}

pub async fn by_identity_number(
    _session: AuthenticatedSession,
    path: web::Path<String>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let profile = state
        .users_service
        .get_by_identity_number(path.as_str())
        .await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(profile)))
}

pub async fn by_account_number(
    _session: AuthenticatedSession,
    path: web::Path<String>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let profile = state
        .users_service
        .get_by_account_number(path.as_str())
        .await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(profile)))
}

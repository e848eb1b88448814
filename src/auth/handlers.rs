use actix_web::cookie::{time::Duration as CookieDuration, Cookie, SameSite};
use actix_web::{web, HttpRequest, HttpResponse, ResponseError};
use serde::{Deserialize, Serialize};
use tracing::{error, info};
use validator::Validate;

use crate::auth::service::Credentials;
use crate::db::NewUser;
use crate::error::AppError;
use crate::response::ApiResponse;
use crate::AppState;

pub const REFRESH_COOKIE: &str = "X-JWT-REFRESH";

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SignInRequest {
    #[validate(email(message = "Email must be valid"))]
    pub email_address: String,
    #[validate(length(min = 6, max = 48))]
    pub password: String,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SignUpRequest {
    #[validate(email(message = "Email must be valid"))]
    pub email_address: String,
    #[validate(length(min = 6, max = 48))]
    pub password: String,
    #[validate(length(min = 1, message = "Username is required"))]
    pub user_name: String,
    #[validate(length(min = 1, message = "Account number is required"))]
    pub account_number: String,
    #[validate(length(min = 1, message = "Identity number is required"))]
    pub identity_number: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessTokenResponse {
    pub access_token: String,
}

fn refresh_cookie(token: String, max_age_seconds: u64) -> Cookie<'static> {
    Cookie::build(REFRESH_COOKIE, token)
        .path("/")
        .secure(true)
        .http_only(true)
        .same_site(SameSite::Strict)
        .max_age(CookieDuration::seconds(max_age_seconds as i64))
        .finish()
}

fn removal_cookie() -> Cookie<'static> {
    let mut cookie = Cookie::build(REFRESH_COOKIE, "")
        .path("/")
        .secure(true)
        .http_only(true)
        .same_site(SameSite::Strict)
        .finish();
    cookie.make_removal();
    cookie
}

/// Renders `err` and tells the client to drop its refresh cookie.
fn error_clearing_cookie(err: AppError) -> Result<HttpResponse, AppError> {
    let mut response = err.error_response();
    response
        .add_cookie(&removal_cookie())
        .map_err(|e| AppError::InternalError(e.to_string()))?;
    Ok(response)
}

fn refresh_token_from(req: &HttpRequest) -> Option<String> {
    req.cookie(REFRESH_COOKIE).map(|c| c.value().to_string())
}

pub async fn sign_in(
    req: web::Json<SignInRequest>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    req.validate()?;
    let req = req.into_inner();

    let pair = state
        .auth_service
        .sign_in(Credentials {
            email_address: req.email_address,
            password: req.password,
        })
        .await?;

    Ok(HttpResponse::Ok()
        .cookie(refresh_cookie(pair.refresh_token, state.auth_service.refresh_ttl()))
        .json(ApiResponse::success(AccessTokenResponse {
            access_token: pair.access_token,
        })))
}

pub async fn sign_up(
    req: web::Json<SignUpRequest>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    req.validate()?;
    let req = req.into_inner();

    state
        .auth_service
        .sign_up(NewUser {
            email_address: req.email_address,
            user_name: req.user_name,
            password: req.password,
            account_number: req.account_number,
            identity_number: req.identity_number,
        })
        .await?;

    Ok(HttpResponse::Created().json(ApiResponse::empty()))
}

pub async fn refresh(req: HttpRequest, state: web::Data<AppState>) -> Result<HttpResponse, AppError> {
    let token = refresh_token_from(&req);

    match state.auth_service.refresh(token.as_deref()).await {
        Ok(pair) => Ok(HttpResponse::Ok()
            .cookie(refresh_cookie(pair.refresh_token, state.auth_service.refresh_ttl()))
            .json(ApiResponse::success(AccessTokenResponse {
                access_token: pair.access_token,
            }))),
        Err(e) => {
            info!("Refresh rejected: {}", e);
            error_clearing_cookie(e)
        }
    }
}

pub async fn sign_out(req: HttpRequest, state: web::Data<AppState>) -> Result<HttpResponse, AppError> {
    let token = refresh_token_from(&req);

    match state.auth_service.sign_out(token.as_deref()).await {
        Ok(()) => Ok(HttpResponse::Ok()
            .cookie(removal_cookie())
            .json(ApiResponse::empty())),
        Err(e) => {
            error!("Sign-out failed: {}", e);
            error_clearing_cookie(e)
        }
    }
}

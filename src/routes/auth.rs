/// Authentication Routes
///
/// Register, login, refresh-token rotation and logout. The access token is
/// returned in the body; the refresh token only ever travels in an
/// HTTP-only cookie.

use actix_web::cookie::{time::Duration, Cookie, SameSite};
use actix_web::{web, HttpRequest, HttpResponse};
use serde::{Deserialize, Serialize};

use crate::auth::{Claims, SessionService};
use crate::configuration::{Environment, Settings};
use crate::error::{AppError, ValidationError};
use crate::models::User;

pub const REFRESH_COOKIE: &str = "refreshToken";

#[derive(Deserialize)]
pub struct RegisterRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    pub role: Option<String>,
}

#[derive(Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    pub user: User,
    pub access_token: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshResponse {
    pub access_token: String,
}

/// HTTP-only cookie carrying the refresh token
pub fn refresh_cookie(token: String, settings: &Settings) -> Cookie<'static> {
    Cookie::build(REFRESH_COOKIE, token)
        .http_only(true)
        .secure(settings.application.environment == Environment::Production)
        .same_site(SameSite::Strict)
        .path("/")
        .max_age(Duration::seconds(settings.jwt.refresh_token_expiry))
        .finish()
}

/// Expired cookie that makes the browser drop the refresh token
pub fn clear_refresh_cookie(settings: &Settings) -> Cookie<'static> {
    let mut cookie = refresh_cookie(String::new(), settings);
    cookie.make_removal();
    cookie
}

fn refresh_token_from(req: &HttpRequest) -> Option<String> {
    req.cookie(REFRESH_COOKIE)
        .map(|c| c.value().to_string())
        .filter(|v| !v.is_empty())
}

/// POST /auth/register
///
/// # Errors
/// - 400: invalid input, email already in use, or admin role not permitted
/// - 500: internal server error
pub async fn register(
    form: web::Json<RegisterRequest>,
    sessions: web::Data<SessionService>,
    settings: web::Data<Settings>,
) -> Result<HttpResponse, AppError> {
    let session = sessions
        .register(&form.email, &form.password, form.role.as_deref())
        .await?;

    Ok(HttpResponse::Created()
        .cookie(refresh_cookie(session.refresh_token, &settings))
        .json(AuthResponse {
            user: session.user,
            access_token: session.access_token,
        }))
}

/// POST /auth/login
///
/// Unknown email and wrong password both produce the same 400
/// `AuthenticationError`, so callers cannot enumerate accounts.
pub async fn login(
    form: web::Json<LoginRequest>,
    sessions: web::Data<SessionService>,
    settings: web::Data<Settings>,
) -> Result<HttpResponse, AppError> {
    let session = sessions.login(&form.email, &form.password).await?;

    Ok(HttpResponse::Ok()
        .cookie(refresh_cookie(session.refresh_token, &settings))
        .json(AuthResponse {
            user: session.user,
            access_token: session.access_token,
        }))
}

/// POST /auth/refresh-token
///
/// Rotates the cookie's refresh token. A token can be exchanged once; a
/// replayed token is rejected with 401.
pub async fn refresh_token(
    req: HttpRequest,
    sessions: web::Data<SessionService>,
    settings: web::Data<Settings>,
) -> Result<HttpResponse, AppError> {
    let token = refresh_token_from(&req)
        .ok_or_else(|| ValidationError::field(REFRESH_COOKIE, "Refresh token required"))?;

    let rotated = sessions.refresh(&token).await?;

    Ok(HttpResponse::Ok()
        .cookie(refresh_cookie(rotated.refresh_token, &settings))
        .json(RefreshResponse {
            access_token: rotated.access_token,
        }))
}

/// POST /auth/logout
///
/// Requires a valid access token. Always clears the cookie; a missing or
/// already-revoked refresh token is not an error.
pub async fn logout(
    req: HttpRequest,
    claims: web::ReqData<Claims>,
    sessions: web::Data<SessionService>,
    settings: web::Data<Settings>,
) -> Result<HttpResponse, AppError> {
    sessions.logout(refresh_token_from(&req).as_deref()).await?;

    tracing::info!(user_id = %claims.sub, "User logged out");

    Ok(HttpResponse::NoContent()
        .cookie(clear_refresh_cookie(&settings))
        .finish())
}

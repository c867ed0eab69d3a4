/// User Routes
///
/// `/users/current` is open to every authenticated role; listing, fetching
/// and deleting arbitrary users is admin-only (enforced by the route's
/// middleware allow-list).

use actix_web::{web, HttpResponse};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::{hash_password, Claims};
use crate::configuration::Settings;
use crate::error::{AppError, StoreError, ValidationError};
use crate::models::User;
use crate::routes::auth::clear_refresh_cookie;
use crate::store::Stores;
use crate::validators::{
    is_valid_email, is_valid_name, is_valid_pagination, is_valid_password, is_valid_url,
    is_valid_username, FieldErrors,
};

#[derive(Deserialize)]
pub struct PageQuery {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// Partial profile update; absent fields are left untouched
#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct UpdateUserRequest {
    pub username: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub website: Option<String>,
    pub facebook: Option<String>,
    pub instagram: Option<String>,
    pub linkedin: Option<String>,
    pub x: Option<String>,
    pub youtube: Option<String>,
}

#[derive(Serialize)]
pub struct UserResponse {
    pub user: User,
}

#[derive(Serialize)]
pub struct UserListResponse {
    pub users: Vec<User>,
    pub total: i64,
    pub limit: i64,
    pub offset: i64,
}

async fn load_user(stores: &Stores, user_id: Uuid) -> Result<User, AppError> {
    stores
        .users
        .find_by_id(user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))
}

/// GET /users/current
pub async fn get_current_user(
    claims: web::ReqData<Claims>,
    stores: web::Data<Stores>,
) -> Result<HttpResponse, AppError> {
    let user = load_user(&stores, claims.user_id()?).await?;
    Ok(HttpResponse::Ok().json(UserResponse { user }))
}

/// PUT /users/current
///
/// # Errors
/// - 400: a field is invalid, or the new username/email belongs to someone else
/// - 404: the account was deleted after the token was issued
pub async fn update_current_user(
    claims: web::ReqData<Claims>,
    form: web::Json<UpdateUserRequest>,
    stores: web::Data<Stores>,
    settings: web::Data<Settings>,
) -> Result<HttpResponse, AppError> {
    let mut user = load_user(&stores, claims.user_id()?).await?;
    let form = form.into_inner();
    let mut errors = FieldErrors::new();

    if let Some(username) = form.username.as_deref() {
        if let Some(username) = errors.check(is_valid_username(username)) {
            if username != user.username {
                match stores.users.find_by_username(&username).await? {
                    Some(other) if other.id != user.id => {
                        errors.check::<()>(Err(ValidationError::field(
                            "username",
                            "Username already in use",
                        )));
                    }
                    _ => user.username = username,
                }
            }
        }
    }

    if let Some(email) = form.email.as_deref() {
        if let Some(email) = errors.check(is_valid_email(email)) {
            if email != user.email {
                match stores.users.find_by_email(&email).await? {
                    Some(other) if other.id != user.id => {
                        errors.check::<()>(Err(ValidationError::field(
                            "email",
                            "Email already in use",
                        )));
                    }
                    _ => user.email = email,
                }
            }
        }
    }

    let new_password = form
        .password
        .as_deref()
        .and_then(|p| errors.check(is_valid_password(p)));

    if let Some(name) = form.first_name.as_deref() {
        if let Some(name) = errors.check(is_valid_name("firstName", name)) {
            user.first_name = name;
        }
    }
    if let Some(name) = form.last_name.as_deref() {
        if let Some(name) = errors.check(is_valid_name("lastName", name)) {
            user.last_name = name;
        }
    }

    let links = &mut user.social_links;
    for (field, input, slot) in [
        ("website", &form.website, &mut links.website),
        ("facebook", &form.facebook, &mut links.facebook),
        ("instagram", &form.instagram, &mut links.instagram),
        ("linkedin", &form.linkedin, &mut links.linkedin),
        ("x", &form.x, &mut links.x),
        ("youtube", &form.youtube, &mut links.youtube),
    ] {
        if let Some(url) = input.as_deref() {
            if let Some(url) = errors.check(is_valid_url(field, url)) {
                *slot = url;
            }
        }
    }

    errors.into_result()?;

    if let Some(password) = new_password {
        user.password_hash = hash_password(&password, settings.auth.hash_cost)?;
    }
    user.updated_at = chrono::Utc::now();

    match stores.users.update(&user).await {
        Ok(true) => {}
        Ok(false) => return Err(AppError::NotFound("User not found".to_string())),
        // Lost a race with another account claiming the same value
        Err(StoreError::Duplicate(constraint)) => {
            let field = if constraint.contains("email") { "email" } else { "username" };
            return Err(ValidationError::field(field, "Already in use").into());
        }
        Err(e) => return Err(e.into()),
    }

    tracing::info!(user_id = %user.id, "User profile updated");
    Ok(HttpResponse::Ok().json(UserResponse { user }))
}

/// DELETE /users/current
///
/// Removes the account along with its sessions, blogs, comments and likes.
pub async fn delete_current_user(
    claims: web::ReqData<Claims>,
    stores: web::Data<Stores>,
    settings: web::Data<Settings>,
) -> Result<HttpResponse, AppError> {
    let user_id = claims.user_id()?;

    if !stores.delete_user(user_id).await? {
        return Err(AppError::NotFound("User not found".to_string()));
    }

    Ok(HttpResponse::NoContent()
        .cookie(clear_refresh_cookie(&settings))
        .finish())
}

/// GET /users (admin)
pub async fn get_all_users(
    query: web::Query<PageQuery>,
    stores: web::Data<Stores>,
) -> Result<HttpResponse, AppError> {
    let (limit, offset) = is_valid_pagination(query.limit, query.offset)?;
    let page = stores.users.list(limit, offset).await?;

    Ok(HttpResponse::Ok().json(UserListResponse {
        users: page.items,
        total: page.total,
        limit,
        offset,
    }))
}

/// GET /users/{user_id} (admin)
pub async fn get_user(
    path: web::Path<Uuid>,
    stores: web::Data<Stores>,
) -> Result<HttpResponse, AppError> {
    let user = load_user(&stores, path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(UserResponse { user }))
}

/// DELETE /users/{user_id} (admin)
pub async fn delete_user(
    path: web::Path<Uuid>,
    claims: web::ReqData<Claims>,
    stores: web::Data<Stores>,
) -> Result<HttpResponse, AppError> {
    let user_id = path.into_inner();

    if !stores.delete_user(user_id).await? {
        return Err(AppError::NotFound("User not found".to_string()));
    }

    tracing::info!(admin_id = %claims.sub, user_id = %user_id, "User deleted by admin");
    Ok(HttpResponse::NoContent().finish())
}

use actix_web::{web, HttpResponse};
use serde::Serialize;
use uuid::Uuid;

use crate::auth::Claims;
use crate::error::{AppError, StoreError, ValidationError};
use crate::models::{BlogCounter, Like};
use crate::routes::blogs::visible_blog;
use crate::store::Stores;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LikeResponse {
    pub likes_count: i64,
}

/// POST /likes/blog/{blog_id}
///
/// One like per user per blog; a repeat is a 400.
pub async fn like_blog(
    claims: web::ReqData<Claims>,
    path: web::Path<Uuid>,
    stores: web::Data<Stores>,
) -> Result<HttpResponse, AppError> {
    let blog = visible_blog(&stores, path.into_inner(), &claims).await?;

    match stores.likes.create(&Like::new(blog.id, claims.user_id()?)).await {
        Ok(()) => {}
        Err(StoreError::Duplicate(_)) => {
            return Err(ValidationError::Rejected("You already liked this blog".to_string()).into())
        }
        Err(e) => return Err(e.into()),
    }

    stores
        .blogs
        .adjust_counter(blog.id, BlogCounter::Likes, 1)
        .await?;

    let likes_count = match stores.blogs.find_by_id(blog.id).await? {
        Some(blog) => blog.likes_count,
        None => blog.likes_count + 1,
    };

    Ok(HttpResponse::Created().json(LikeResponse { likes_count }))
}

/// DELETE /likes/blog/{blog_id}
pub async fn unlike_blog(
    claims: web::ReqData<Claims>,
    path: web::Path<Uuid>,
    stores: web::Data<Stores>,
) -> Result<HttpResponse, AppError> {
    let blog_id = path.into_inner();

    if !stores.likes.delete(blog_id, claims.user_id()?).await? {
        return Err(ValidationError::Rejected("Like not found".to_string()).into());
    }

    stores
        .blogs
        .adjust_counter(blog_id, BlogCounter::Likes, -1)
        .await?;

    Ok(HttpResponse::NoContent().finish())
}

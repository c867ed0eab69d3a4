use actix_web::{web, HttpResponse};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::{authorize_owner_or_admin, Claims};
use crate::content::sanitize_html;
use crate::error::{AppError, ValidationError};
use crate::models::{BlogCounter, Comment};
use crate::routes::blogs::visible_blog;
use crate::store::Stores;
use crate::validators::{is_valid_content, MAX_COMMENT_LENGTH};

#[derive(Deserialize)]
pub struct CommentRequest {
    #[serde(default)]
    pub content: String,
}

#[derive(Serialize)]
pub struct CommentResponse {
    pub comment: Comment,
}

#[derive(Serialize)]
pub struct CommentListResponse {
    pub comments: Vec<Comment>,
}

/// POST /comments/blog/{blog_id}
pub async fn comment_blog(
    claims: web::ReqData<Claims>,
    path: web::Path<Uuid>,
    form: web::Json<CommentRequest>,
    stores: web::Data<Stores>,
) -> Result<HttpResponse, AppError> {
    let blog = visible_blog(&stores, path.into_inner(), &claims).await?;

    let content = sanitize_html(&is_valid_content(&form.content, Some(MAX_COMMENT_LENGTH))?);
    if content.trim().is_empty() {
        return Err(ValidationError::field("content", "Content is required").into());
    }

    let comment = Comment::new(blog.id, claims.user_id()?, content);
    stores.comments.create(&comment).await?;
    stores
        .blogs
        .adjust_counter(blog.id, BlogCounter::Comments, 1)
        .await?;

    Ok(HttpResponse::Created().json(CommentResponse { comment }))
}

/// GET /comments/blog/{blog_id}
pub async fn get_comments_by_blog(
    claims: web::ReqData<Claims>,
    path: web::Path<Uuid>,
    stores: web::Data<Stores>,
) -> Result<HttpResponse, AppError> {
    let blog = visible_blog(&stores, path.into_inner(), &claims).await?;
    let comments = stores.comments.list_by_blog(blog.id).await?;

    Ok(HttpResponse::Ok().json(CommentListResponse { comments }))
}

/// DELETE /comments/{comment_id}
///
/// The comment's author or any admin may delete it.
pub async fn delete_comment(
    claims: web::ReqData<Claims>,
    path: web::Path<Uuid>,
    stores: web::Data<Stores>,
) -> Result<HttpResponse, AppError> {
    let comment = stores
        .comments
        .find_by_id(path.into_inner())
        .await?
        .ok_or_else(|| AppError::NotFound("Comment not found".to_string()))?;

    authorize_owner_or_admin(&claims, &comment.user_id)?;

    if stores.comments.delete(comment.id).await? {
        stores
            .blogs
            .adjust_counter(comment.blog_id, BlogCounter::Comments, -1)
            .await?;
    }

    Ok(HttpResponse::NoContent().finish())
}

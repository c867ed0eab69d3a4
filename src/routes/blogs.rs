/// Blog Routes
///
/// Every route needs an authenticated user. Reading is open to all roles;
/// writing is admin-only and restricted to the blog's author.

use actix_web::{web, HttpResponse};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::{authorize, Claims, Role, ADMIN_ONLY};
use crate::content::{generate_slug, sanitize_html};
use crate::error::{AppError, ValidationError};
use crate::models::{Blog, BlogCounter, BlogStatus};
use crate::routes::users::PageQuery;
use crate::store::Stores;
use crate::validators::{is_valid_content, is_valid_pagination, is_valid_title, FieldErrors};

#[derive(Deserialize)]
pub struct CreateBlogRequest {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub content: String,
    pub status: Option<String>,
}

#[derive(Deserialize)]
pub struct UpdateBlogRequest {
    pub title: Option<String>,
    pub content: Option<String>,
    pub status: Option<String>,
}

#[derive(Serialize)]
pub struct BlogResponse {
    pub blog: Blog,
}

#[derive(Serialize)]
pub struct BlogListResponse {
    pub blogs: Vec<Blog>,
    pub total: i64,
    pub limit: i64,
    pub offset: i64,
}

fn parse_status(status: &str) -> Result<BlogStatus, ValidationError> {
    status
        .parse()
        .map_err(|_| ValidationError::field("status", "Status must be either draft or published"))
}

/// Fetch a blog the caller is allowed to see; drafts are visible to admins only
pub(crate) async fn visible_blog(
    stores: &Stores,
    blog_id: Uuid,
    claims: &Claims,
) -> Result<Blog, AppError> {
    match stores.blogs.find_by_id(blog_id).await? {
        Some(blog) if blog.status == BlogStatus::Published || claims.role == Role::Admin => Ok(blog),
        _ => Err(AppError::NotFound("Blog not found".to_string())),
    }
}

async fn authored_blog(stores: &Stores, blog_id: Uuid, claims: &Claims) -> Result<Blog, AppError> {
    let blog = stores
        .blogs
        .find_by_id(blog_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Blog not found".to_string()))?;

    if blog.author_id != claims.user_id()? {
        return Err(AppError::Forbidden(
            "Only the author can modify this blog".to_string(),
        ));
    }
    Ok(blog)
}

/// POST /blogs (admin)
pub async fn create_blog(
    claims: web::ReqData<Claims>,
    form: web::Json<CreateBlogRequest>,
    stores: web::Data<Stores>,
) -> Result<HttpResponse, AppError> {
    authorize(&claims, ADMIN_ONLY)?;

    let mut errors = FieldErrors::new();
    let title = errors.check(is_valid_title(&form.title));
    let content = errors.check(is_valid_content(&form.content, None));
    let status = match form.status.as_deref() {
        Some(s) => errors.check(parse_status(s)),
        None => Some(BlogStatus::default()),
    };
    errors.into_result()?;

    let title = title.unwrap_or_default();
    let content = sanitize_html(&content.unwrap_or_default());
    if content.trim().is_empty() {
        return Err(ValidationError::field("content", "Content is required").into());
    }

    let blog = Blog::new(
        title.clone(),
        generate_slug(&title),
        content,
        claims.user_id()?,
        status.unwrap_or_default(),
    );
    stores.blogs.create(&blog).await?;

    tracing::info!(blog_id = %blog.id, author_id = %blog.author_id, "Blog created");
    Ok(HttpResponse::Created().json(BlogResponse { blog }))
}

/// GET /blogs
///
/// Newest first. Non-admins only ever see published blogs.
pub async fn get_all_blogs(
    claims: web::ReqData<Claims>,
    query: web::Query<PageQuery>,
    stores: web::Data<Stores>,
) -> Result<HttpResponse, AppError> {
    let (limit, offset) = is_valid_pagination(query.limit, query.offset)?;
    let page = stores
        .blogs
        .list(claims.role == Role::Admin, limit, offset)
        .await?;

    Ok(HttpResponse::Ok().json(BlogListResponse {
        blogs: page.items,
        total: page.total,
        limit,
        offset,
    }))
}

/// GET /blogs/{slug}
///
/// Each read of a published blog bumps its view counter.
pub async fn get_blog_by_slug(
    claims: web::ReqData<Claims>,
    path: web::Path<String>,
    stores: web::Data<Stores>,
) -> Result<HttpResponse, AppError> {
    let mut blog = match stores.blogs.find_by_slug(&path).await? {
        Some(blog) if blog.status == BlogStatus::Published || claims.role == Role::Admin => blog,
        _ => return Err(AppError::NotFound("Blog not found".to_string())),
    };

    if blog.status == BlogStatus::Published {
        stores
            .blogs
            .adjust_counter(blog.id, BlogCounter::Views, 1)
            .await?;
        blog.views_count += 1;
    }

    Ok(HttpResponse::Ok().json(BlogResponse { blog }))
}

/// PUT /blogs/{blog_id} (admin, author only)
pub async fn update_blog(
    claims: web::ReqData<Claims>,
    path: web::Path<Uuid>,
    form: web::Json<UpdateBlogRequest>,
    stores: web::Data<Stores>,
) -> Result<HttpResponse, AppError> {
    authorize(&claims, ADMIN_ONLY)?;
    let mut blog = authored_blog(&stores, path.into_inner(), &claims).await?;

    let mut errors = FieldErrors::new();
    if let Some(title) = form.title.as_deref() {
        if let Some(title) = errors.check(is_valid_title(title)) {
            blog.title = title;
        }
    }
    if let Some(content) = form.content.as_deref() {
        if let Some(content) = errors.check(is_valid_content(content, None)) {
            blog.content = sanitize_html(&content);
        }
    }
    if let Some(status) = form.status.as_deref() {
        if let Some(status) = errors.check(parse_status(status)) {
            blog.status = status;
        }
    }
    errors.into_result()?;

    let now = chrono::Utc::now();
    if blog.status == BlogStatus::Published && blog.published_at.is_none() {
        blog.published_at = Some(now);
    }
    blog.updated_at = now;

    if !stores.blogs.update(&blog).await? {
        return Err(AppError::NotFound("Blog not found".to_string()));
    }

    // Counters may have moved while we were editing
    let blog = stores.blogs.find_by_id(blog.id).await?.unwrap_or(blog);

    tracing::info!(blog_id = %blog.id, "Blog updated");
    Ok(HttpResponse::Ok().json(BlogResponse { blog }))
}

/// DELETE /blogs/{blog_id} (admin, author only)
///
/// Comments and likes on the blog go with it.
pub async fn delete_blog(
    claims: web::ReqData<Claims>,
    path: web::Path<Uuid>,
    stores: web::Data<Stores>,
) -> Result<HttpResponse, AppError> {
    authorize(&claims, ADMIN_ONLY)?;
    let blog = authored_blog(&stores, path.into_inner(), &claims).await?;

    stores.delete_blog(blog.id).await?;
    Ok(HttpResponse::NoContent().finish())
}

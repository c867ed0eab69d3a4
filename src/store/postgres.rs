use async_trait::async_trait;
use chrono::Utc;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use tracing::{debug, instrument, warn};
use uuid::Uuid;

use super::{BlogStore, CommentStore, LikeStore, TokenStore, UserStore};
use crate::auth::hash_token;
use crate::error::StoreError;
use crate::models::{
    Blog, BlogCounter, BlogStatus, Comment, Like, Page, RefreshTokenRecord, SocialLinks, User,
};

/// PostgreSQL implementation of every store trait
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

const USER_COLUMNS: &str = "id, username, email, password_hash, role, first_name, last_name, \
     website, facebook, instagram, linkedin, x, youtube, created_at, updated_at";

const BLOG_COLUMNS: &str = "id, title, slug, content, author_id, views_count, likes_count, \
     comments_count, status, published_at, created_at, updated_at";

fn user_from_row(row: &PgRow) -> Result<User, StoreError> {
    let role: String = row.try_get("role")?;
    Ok(User {
        id: row.try_get("id")?,
        username: row.try_get("username")?,
        email: row.try_get("email")?,
        password_hash: row.try_get("password_hash")?,
        role: role
            .parse()
            .map_err(|_| StoreError::Unexpected(format!("unknown role '{}' in users table", role)))?,
        first_name: row.try_get("first_name")?,
        last_name: row.try_get("last_name")?,
        social_links: SocialLinks {
            website: row.try_get("website")?,
            facebook: row.try_get("facebook")?,
            instagram: row.try_get("instagram")?,
            linkedin: row.try_get("linkedin")?,
            x: row.try_get("x")?,
            youtube: row.try_get("youtube")?,
        },
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn token_from_row(row: &PgRow) -> Result<RefreshTokenRecord, StoreError> {
    Ok(RefreshTokenRecord {
        id: row.try_get("id")?,
        user_id: row.try_get("user_id")?,
        token_hash: row.try_get("token_hash")?,
        expires_at: row.try_get("expires_at")?,
        created_at: row.try_get("created_at")?,
    })
}

fn blog_from_row(row: &PgRow) -> Result<Blog, StoreError> {
    let status: String = row.try_get("status")?;
    Ok(Blog {
        id: row.try_get("id")?,
        title: row.try_get("title")?,
        slug: row.try_get("slug")?,
        content: row.try_get("content")?,
        author_id: row.try_get("author_id")?,
        views_count: row.try_get("views_count")?,
        likes_count: row.try_get("likes_count")?,
        comments_count: row.try_get("comments_count")?,
        status: status.parse::<BlogStatus>().map_err(StoreError::Unexpected)?,
        published_at: row.try_get("published_at")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn comment_from_row(row: &PgRow) -> Result<Comment, StoreError> {
    Ok(Comment {
        id: row.try_get("id")?,
        blog_id: row.try_get("blog_id")?,
        user_id: row.try_get("user_id")?,
        content: row.try_get("content")?,
        created_at: row.try_get("created_at")?,
    })
}

fn like_from_row(row: &PgRow) -> Result<Like, StoreError> {
    Ok(Like {
        id: row.try_get("id")?,
        blog_id: row.try_get("blog_id")?,
        user_id: row.try_get("user_id")?,
        created_at: row.try_get("created_at")?,
    })
}

#[async_trait]
impl UserStore for PgStore {
    #[instrument(skip(self, user), fields(user_id = %user.id))]
    async fn create(&self, user: &User) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO users (id, username, email, password_hash, role, first_name, last_name,
                               website, facebook, instagram, linkedin, x, youtube, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)
            "#,
        )
        .bind(user.id)
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(user.role.as_str())
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(&user.social_links.website)
        .bind(&user.social_links.facebook)
        .bind(&user.social_links.instagram)
        .bind(&user.social_links.linkedin)
        .bind(&user.social_links.x)
        .bind(&user.social_links.youtube)
        .bind(user.created_at)
        .bind(user.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            warn!(error = %e, "Failed to create user");
            StoreError::from(e)
        })?;

        debug!("User created in database");
        Ok(())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        let row = sqlx::query(&format!("SELECT {} FROM users WHERE id = $1", USER_COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(user_from_row).transpose()
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let row = sqlx::query(&format!("SELECT {} FROM users WHERE email = $1", USER_COLUMNS))
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(user_from_row).transpose()
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<User>, StoreError> {
        let row = sqlx::query(&format!("SELECT {} FROM users WHERE username = $1", USER_COLUMNS))
            .bind(username)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(user_from_row).transpose()
    }

    #[instrument(skip(self, user), fields(user_id = %user.id))]
    async fn update(&self, user: &User) -> Result<bool, StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE users
            SET username = $2, email = $3, password_hash = $4, role = $5,
                first_name = $6, last_name = $7, website = $8, facebook = $9,
                instagram = $10, linkedin = $11, x = $12, youtube = $13, updated_at = $14
            WHERE id = $1
            "#,
        )
        .bind(user.id)
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(user.role.as_str())
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(&user.social_links.website)
        .bind(&user.social_links.facebook)
        .bind(&user.social_links.instagram)
        .bind(&user.social_links.linkedin)
        .bind(&user.social_links.x)
        .bind(&user.social_links.youtube)
        .bind(user.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn delete(&self, id: Uuid) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn list(&self, limit: i64, offset: i64) -> Result<Page<User>, StoreError> {
        let total = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .await?;
        let rows = sqlx::query(&format!(
            "SELECT {} FROM users ORDER BY created_at DESC LIMIT $1 OFFSET $2",
            USER_COLUMNS
        ))
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        Ok(Page {
            items: rows.iter().map(user_from_row).collect::<Result<_, _>>()?,
            total,
        })
    }
}

#[async_trait]
impl TokenStore for PgStore {
    #[instrument(skip(self, record), fields(user_id = %record.user_id))]
    async fn create(&self, record: &RefreshTokenRecord) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO refresh_tokens (id, user_id, token_hash, expires_at, created_at)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(record.id)
        .bind(record.user_id)
        .bind(&record.token_hash)
        .bind(record.expires_at)
        .bind(record.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn find_by_token(&self, token: &str) -> Result<Option<RefreshTokenRecord>, StoreError> {
        let row = sqlx::query(
            "SELECT id, user_id, token_hash, expires_at, created_at FROM refresh_tokens WHERE token_hash = $1",
        )
        .bind(hash_token(token))
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(token_from_row).transpose()
    }

    async fn delete_by_token(&self, token: &str) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM refresh_tokens WHERE token_hash = $1")
            .bind(hash_token(token))
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_by_user(&self, user_id: Uuid) -> Result<u64, StoreError> {
        let result = sqlx::query("DELETE FROM refresh_tokens WHERE user_id = $1")
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    #[instrument(skip(self, old_token, replacement), fields(user_id = %replacement.user_id))]
    async fn rotate(
        &self,
        old_token: &str,
        replacement: &RefreshTokenRecord,
    ) -> Result<bool, StoreError> {
        let mut tx = self.pool.begin().await?;

        // A concurrent rotation of the same row blocks here until the other
        // transaction commits, then sees zero affected rows.
        let deleted = sqlx::query("DELETE FROM refresh_tokens WHERE token_hash = $1")
            .bind(hash_token(old_token))
            .execute(&mut tx)
            .await?;

        if deleted.rows_affected() == 0 {
            tx.rollback().await?;
            debug!("Refresh token already rotated or revoked");
            return Ok(false);
        }

        sqlx::query(
            r#"
            INSERT INTO refresh_tokens (id, user_id, token_hash, expires_at, created_at)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(replacement.id)
        .bind(replacement.user_id)
        .bind(&replacement.token_hash)
        .bind(replacement.expires_at)
        .bind(replacement.created_at)
        .execute(&mut tx)
        .await?;

        tx.commit().await?;
        Ok(true)
    }

    async fn purge_expired(&self) -> Result<u64, StoreError> {
        let result = sqlx::query("DELETE FROM refresh_tokens WHERE expires_at < $1")
            .bind(Utc::now())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}

#[async_trait]
impl BlogStore for PgStore {
    async fn create(&self, blog: &Blog) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO blogs (id, title, slug, content, author_id, views_count, likes_count,
                               comments_count, status, published_at, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            "#,
        )
        .bind(blog.id)
        .bind(&blog.title)
        .bind(&blog.slug)
        .bind(&blog.content)
        .bind(blog.author_id)
        .bind(blog.views_count)
        .bind(blog.likes_count)
        .bind(blog.comments_count)
        .bind(blog.status.as_str())
        .bind(blog.published_at)
        .bind(blog.created_at)
        .bind(blog.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Blog>, StoreError> {
        let row = sqlx::query(&format!("SELECT {} FROM blogs WHERE id = $1", BLOG_COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(blog_from_row).transpose()
    }

    async fn find_by_slug(&self, slug: &str) -> Result<Option<Blog>, StoreError> {
        let row = sqlx::query(&format!("SELECT {} FROM blogs WHERE slug = $1", BLOG_COLUMNS))
            .bind(slug)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(blog_from_row).transpose()
    }

    async fn update(&self, blog: &Blog) -> Result<bool, StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE blogs
            SET title = $2, slug = $3, content = $4, status = $5, published_at = $6, updated_at = $7
            WHERE id = $1
            "#,
        )
        .bind(blog.id)
        .bind(&blog.title)
        .bind(&blog.slug)
        .bind(&blog.content)
        .bind(blog.status.as_str())
        .bind(blog.published_at)
        .bind(blog.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn delete(&self, id: Uuid) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM blogs WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_by_author(&self, author_id: Uuid) -> Result<Vec<Uuid>, StoreError> {
        let ids = sqlx::query_scalar::<_, Uuid>("DELETE FROM blogs WHERE author_id = $1 RETURNING id")
            .bind(author_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(ids)
    }

    async fn list(&self, include_drafts: bool, limit: i64, offset: i64) -> Result<Page<Blog>, StoreError> {
        let total = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM blogs WHERE $1 OR status = 'published'",
        )
        .bind(include_drafts)
        .fetch_one(&self.pool)
        .await?;

        let rows = sqlx::query(&format!(
            "SELECT {} FROM blogs WHERE $1 OR status = 'published' \
             ORDER BY created_at DESC LIMIT $2 OFFSET $3",
            BLOG_COLUMNS
        ))
        .bind(include_drafts)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        Ok(Page {
            items: rows.iter().map(blog_from_row).collect::<Result<_, _>>()?,
            total,
        })
    }

    async fn adjust_counter(&self, id: Uuid, counter: BlogCounter, delta: i64) -> Result<(), StoreError> {
        let query = match counter {
            BlogCounter::Views => {
                "UPDATE blogs SET views_count = GREATEST(views_count + $2, 0) WHERE id = $1"
            }
            BlogCounter::Likes => {
                "UPDATE blogs SET likes_count = GREATEST(likes_count + $2, 0) WHERE id = $1"
            }
            BlogCounter::Comments => {
                "UPDATE blogs SET comments_count = GREATEST(comments_count + $2, 0) WHERE id = $1"
            }
        };

        sqlx::query(query)
            .bind(id)
            .bind(delta)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

#[async_trait]
impl CommentStore for PgStore {
    async fn create(&self, comment: &Comment) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO comments (id, blog_id, user_id, content, created_at) VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(comment.id)
        .bind(comment.blog_id)
        .bind(comment.user_id)
        .bind(&comment.content)
        .bind(comment.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Comment>, StoreError> {
        let row = sqlx::query("SELECT id, blog_id, user_id, content, created_at FROM comments WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(comment_from_row).transpose()
    }

    async fn list_by_blog(&self, blog_id: Uuid) -> Result<Vec<Comment>, StoreError> {
        let rows = sqlx::query(
            "SELECT id, blog_id, user_id, content, created_at FROM comments \
             WHERE blog_id = $1 ORDER BY created_at ASC",
        )
        .bind(blog_id)
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(comment_from_row).collect()
    }

    async fn delete(&self, id: Uuid) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM comments WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_by_blog(&self, blog_id: Uuid) -> Result<u64, StoreError> {
        let result = sqlx::query("DELETE FROM comments WHERE blog_id = $1")
            .bind(blog_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    async fn delete_by_user(&self, user_id: Uuid) -> Result<Vec<Comment>, StoreError> {
        let rows = sqlx::query(
            "DELETE FROM comments WHERE user_id = $1 RETURNING id, blog_id, user_id, content, created_at",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(comment_from_row).collect()
    }
}

#[async_trait]
impl LikeStore for PgStore {
    async fn create(&self, like: &Like) -> Result<(), StoreError> {
        sqlx::query("INSERT INTO likes (id, blog_id, user_id, created_at) VALUES ($1, $2, $3, $4)")
            .bind(like.id)
            .bind(like.blog_id)
            .bind(like.user_id)
            .bind(like.created_at)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn delete(&self, blog_id: Uuid, user_id: Uuid) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM likes WHERE blog_id = $1 AND user_id = $2")
            .bind(blog_id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_by_blog(&self, blog_id: Uuid) -> Result<u64, StoreError> {
        let result = sqlx::query("DELETE FROM likes WHERE blog_id = $1")
            .bind(blog_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    async fn delete_by_user(&self, user_id: Uuid) -> Result<Vec<Like>, StoreError> {
        let rows = sqlx::query(
            "DELETE FROM likes WHERE user_id = $1 RETURNING id, blog_id, user_id, created_at",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(like_from_row).collect()
    }
}

/// Persistence layer
///
/// Each record type has a store trait so the services never depend on the
/// backing engine. `PgStore` is used in production; `MemoryStore` backs the
/// test-suite and `use_memory_store = true` local runs.

mod memory;
mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

use async_trait::async_trait;
use sqlx::PgPool;
use std::sync::Arc;
use uuid::Uuid;

use crate::error::StoreError;
use crate::models::{Blog, BlogCounter, Comment, Like, Page, RefreshTokenRecord, User};

#[async_trait]
pub trait UserStore: Send + Sync {
    /// Fails with `StoreError::Duplicate` when email or username is taken
    async fn create(&self, user: &User) -> Result<(), StoreError>;
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError>;
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;
    async fn find_by_username(&self, username: &str) -> Result<Option<User>, StoreError>;
    /// Returns false when the user no longer exists
    async fn update(&self, user: &User) -> Result<bool, StoreError>;
    async fn delete(&self, id: Uuid) -> Result<bool, StoreError>;
    async fn list(&self, limit: i64, offset: i64) -> Result<Page<User>, StoreError>;
}

/// Persisted refresh-token records, looked up by the plaintext token
#[async_trait]
pub trait TokenStore: Send + Sync {
    async fn create(&self, record: &RefreshTokenRecord) -> Result<(), StoreError>;
    async fn find_by_token(&self, token: &str) -> Result<Option<RefreshTokenRecord>, StoreError>;
    async fn delete_by_token(&self, token: &str) -> Result<bool, StoreError>;
    async fn delete_by_user(&self, user_id: Uuid) -> Result<u64, StoreError>;
    /// Atomically replace `old_token`'s record with `replacement`.
    ///
    /// Returns false (and stores nothing) when no record for `old_token`
    /// exists, so a token can be rotated at most once.
    async fn rotate(
        &self,
        old_token: &str,
        replacement: &RefreshTokenRecord,
    ) -> Result<bool, StoreError>;
    async fn purge_expired(&self) -> Result<u64, StoreError>;
}

#[async_trait]
pub trait BlogStore: Send + Sync {
    async fn create(&self, blog: &Blog) -> Result<(), StoreError>;
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Blog>, StoreError>;
    async fn find_by_slug(&self, slug: &str) -> Result<Option<Blog>, StoreError>;
    async fn update(&self, blog: &Blog) -> Result<bool, StoreError>;
    async fn delete(&self, id: Uuid) -> Result<bool, StoreError>;
    /// Deletes every blog by `author_id` and returns their ids
    async fn delete_by_author(&self, author_id: Uuid) -> Result<Vec<Uuid>, StoreError>;
    /// Newest first; drafts only when `include_drafts`
    async fn list(&self, include_drafts: bool, limit: i64, offset: i64) -> Result<Page<Blog>, StoreError>;
    async fn adjust_counter(&self, id: Uuid, counter: BlogCounter, delta: i64) -> Result<(), StoreError>;
}

#[async_trait]
pub trait CommentStore: Send + Sync {
    async fn create(&self, comment: &Comment) -> Result<(), StoreError>;
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Comment>, StoreError>;
    /// Oldest first
    async fn list_by_blog(&self, blog_id: Uuid) -> Result<Vec<Comment>, StoreError>;
    async fn delete(&self, id: Uuid) -> Result<bool, StoreError>;
    async fn delete_by_blog(&self, blog_id: Uuid) -> Result<u64, StoreError>;
    /// Returns the removed comments so blog counters can be corrected
    async fn delete_by_user(&self, user_id: Uuid) -> Result<Vec<Comment>, StoreError>;
}

#[async_trait]
pub trait LikeStore: Send + Sync {
    /// Fails with `StoreError::Duplicate` when the user already liked the blog
    async fn create(&self, like: &Like) -> Result<(), StoreError>;
    async fn delete(&self, blog_id: Uuid, user_id: Uuid) -> Result<bool, StoreError>;
    async fn delete_by_blog(&self, blog_id: Uuid) -> Result<u64, StoreError>;
    async fn delete_by_user(&self, user_id: Uuid) -> Result<Vec<Like>, StoreError>;
}

/// Handles to every store, shared across workers
#[derive(Clone)]
pub struct Stores {
    pub users: Arc<dyn UserStore>,
    pub tokens: Arc<dyn TokenStore>,
    pub blogs: Arc<dyn BlogStore>,
    pub comments: Arc<dyn CommentStore>,
    pub likes: Arc<dyn LikeStore>,
}

impl Stores {
    pub fn postgres(pool: PgPool) -> Self {
        let store = Arc::new(PgStore::new(pool));
        Self::from_shared(store)
    }

    pub fn in_memory() -> Self {
        Self::from_shared(Arc::new(MemoryStore::new()))
    }

    fn from_shared<S>(store: Arc<S>) -> Self
    where
        S: UserStore + TokenStore + BlogStore + CommentStore + LikeStore + 'static,
    {
        Self {
            users: store.clone(),
            tokens: store.clone(),
            blogs: store.clone(),
            comments: store.clone(),
            likes: store,
        }
    }

    /// Delete a blog together with its comments and likes
    pub async fn delete_blog(&self, blog_id: Uuid) -> Result<bool, StoreError> {
        let comments = self.comments.delete_by_blog(blog_id).await?;
        let likes = self.likes.delete_by_blog(blog_id).await?;
        let deleted = self.blogs.delete(blog_id).await?;

        tracing::info!(
            blog_id = %blog_id,
            comments_removed = comments,
            likes_removed = likes,
            "Blog deleted"
        );
        Ok(deleted)
    }

    /// Delete a user and everything they own.
    ///
    /// Refresh tokens go first so every session is revoked even if a later
    /// step fails.
    pub async fn delete_user(&self, user_id: Uuid) -> Result<bool, StoreError> {
        let sessions = self.tokens.delete_by_user(user_id).await?;

        for like in self.likes.delete_by_user(user_id).await? {
            self.blogs.adjust_counter(like.blog_id, BlogCounter::Likes, -1).await?;
        }

        for comment in self.comments.delete_by_user(user_id).await? {
            self.blogs
                .adjust_counter(comment.blog_id, BlogCounter::Comments, -1)
                .await?;
        }

        for blog_id in self.blogs.delete_by_author(user_id).await? {
            self.comments.delete_by_blog(blog_id).await?;
            self.likes.delete_by_blog(blog_id).await?;
        }

        let deleted = self.users.delete(user_id).await?;

        tracing::info!(user_id = %user_id, sessions_revoked = sessions, "User deleted");
        Ok(deleted)
    }
}

use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, instrument, warn};
use uuid::Uuid;

use super::{BlogStore, CommentStore, LikeStore, TokenStore, UserStore};
use crate::auth::hash_token;
use crate::error::StoreError;
use crate::models::{Blog, BlogCounter, Comment, Like, Page, RefreshTokenRecord, User};

#[derive(Default)]
struct Inner {
    users: HashMap<Uuid, User>,
    tokens: HashMap<String, RefreshTokenRecord>,
    blogs: HashMap<Uuid, Blog>,
    comments: HashMap<Uuid, Comment>,
    likes: HashMap<(Uuid, Uuid), Like>,
}

/// In-memory implementation of every store trait
///
/// All collections sit behind a single mutex, so each trait method (token
/// rotation in particular) is atomic with respect to every other call.
/// Data is lost when the process exits.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> Result<MutexGuard<'_, Inner>, StoreError> {
        self.inner
            .lock()
            .map_err(|_| StoreError::Unexpected("memory store lock poisoned".to_string()))
    }
}

fn page<T: Clone>(mut items: Vec<T>, limit: i64, offset: i64) -> Page<T> {
    let total = items.len() as i64;
    let start = (offset.max(0) as usize).min(items.len());
    let end = start.saturating_add(limit.max(0) as usize).min(items.len());
    Page {
        items: items.drain(start..end).collect(),
        total,
    }
}

fn ensure_unique_user(inner: &Inner, user: &User) -> Result<(), StoreError> {
    for other in inner.users.values().filter(|u| u.id != user.id) {
        if other.email == user.email {
            return Err(StoreError::Duplicate("users_email_key".to_string()));
        }
        if other.username == user.username {
            return Err(StoreError::Duplicate("users_username_key".to_string()));
        }
    }
    Ok(())
}

#[async_trait]
impl UserStore for MemoryStore {
    #[instrument(skip(self, user), fields(user_id = %user.id))]
    async fn create(&self, user: &User) -> Result<(), StoreError> {
        let mut inner = self.state()?;
        ensure_unique_user(&inner, user)?;
        inner.users.insert(user.id, user.clone());
        debug!("User created in memory");
        Ok(())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        Ok(self.state()?.users.get(&id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        Ok(self.state()?.users.values().find(|u| u.email == email).cloned())
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<User>, StoreError> {
        Ok(self
            .state()?
            .users
            .values()
            .find(|u| u.username == username)
            .cloned())
    }

    #[instrument(skip(self, user), fields(user_id = %user.id))]
    async fn update(&self, user: &User) -> Result<bool, StoreError> {
        let mut inner = self.state()?;
        if !inner.users.contains_key(&user.id) {
            warn!("User not found for update in memory");
            return Ok(false);
        }
        ensure_unique_user(&inner, user)?;
        inner.users.insert(user.id, user.clone());
        Ok(true)
    }

    async fn delete(&self, id: Uuid) -> Result<bool, StoreError> {
        Ok(self.state()?.users.remove(&id).is_some())
    }

    async fn list(&self, limit: i64, offset: i64) -> Result<Page<User>, StoreError> {
        let mut users: Vec<User> = self.state()?.users.values().cloned().collect();
        users.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(page(users, limit, offset))
    }
}

#[async_trait]
impl TokenStore for MemoryStore {
    #[instrument(skip(self, record), fields(user_id = %record.user_id))]
    async fn create(&self, record: &RefreshTokenRecord) -> Result<(), StoreError> {
        let mut inner = self.state()?;
        if inner.tokens.contains_key(&record.token_hash) {
            return Err(StoreError::Duplicate("refresh_tokens_token_hash_key".to_string()));
        }
        inner.tokens.insert(record.token_hash.clone(), record.clone());
        Ok(())
    }

    async fn find_by_token(&self, token: &str) -> Result<Option<RefreshTokenRecord>, StoreError> {
        Ok(self.state()?.tokens.get(&hash_token(token)).cloned())
    }

    async fn delete_by_token(&self, token: &str) -> Result<bool, StoreError> {
        Ok(self.state()?.tokens.remove(&hash_token(token)).is_some())
    }

    async fn delete_by_user(&self, user_id: Uuid) -> Result<u64, StoreError> {
        let mut inner = self.state()?;
        let before = inner.tokens.len();
        inner.tokens.retain(|_, record| record.user_id != user_id);
        Ok((before - inner.tokens.len()) as u64)
    }

    #[instrument(skip(self, old_token, replacement), fields(user_id = %replacement.user_id))]
    async fn rotate(
        &self,
        old_token: &str,
        replacement: &RefreshTokenRecord,
    ) -> Result<bool, StoreError> {
        let mut inner = self.state()?;
        if inner.tokens.remove(&hash_token(old_token)).is_none() {
            debug!("Refresh token already rotated or revoked");
            return Ok(false);
        }
        inner
            .tokens
            .insert(replacement.token_hash.clone(), replacement.clone());
        Ok(true)
    }

    async fn purge_expired(&self) -> Result<u64, StoreError> {
        let mut inner = self.state()?;
        let now = Utc::now();
        let before = inner.tokens.len();
        inner.tokens.retain(|_, record| record.expires_at > now);
        Ok((before - inner.tokens.len()) as u64)
    }
}

#[async_trait]
impl BlogStore for MemoryStore {
    async fn create(&self, blog: &Blog) -> Result<(), StoreError> {
        let mut inner = self.state()?;
        if inner.blogs.values().any(|b| b.slug == blog.slug) {
            return Err(StoreError::Duplicate("blogs_slug_key".to_string()));
        }
        inner.blogs.insert(blog.id, blog.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Blog>, StoreError> {
        Ok(self.state()?.blogs.get(&id).cloned())
    }

    async fn find_by_slug(&self, slug: &str) -> Result<Option<Blog>, StoreError> {
        Ok(self.state()?.blogs.values().find(|b| b.slug == slug).cloned())
    }

    async fn update(&self, blog: &Blog) -> Result<bool, StoreError> {
        let mut inner = self.state()?;
        match inner.blogs.get_mut(&blog.id) {
            Some(existing) => {
                // Counters are owned by adjust_counter
                let (views, likes, comments) =
                    (existing.views_count, existing.likes_count, existing.comments_count);
                *existing = blog.clone();
                existing.views_count = views;
                existing.likes_count = likes;
                existing.comments_count = comments;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete(&self, id: Uuid) -> Result<bool, StoreError> {
        Ok(self.state()?.blogs.remove(&id).is_some())
    }

    async fn delete_by_author(&self, author_id: Uuid) -> Result<Vec<Uuid>, StoreError> {
        let mut inner = self.state()?;
        let ids: Vec<Uuid> = inner
            .blogs
            .values()
            .filter(|b| b.author_id == author_id)
            .map(|b| b.id)
            .collect();
        for id in &ids {
            inner.blogs.remove(id);
        }
        Ok(ids)
    }

    async fn list(&self, include_drafts: bool, limit: i64, offset: i64) -> Result<Page<Blog>, StoreError> {
        let mut blogs: Vec<Blog> = self
            .state()?
            .blogs
            .values()
            .filter(|b| include_drafts || b.status == crate::models::BlogStatus::Published)
            .cloned()
            .collect();
        blogs.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(page(blogs, limit, offset))
    }

    async fn adjust_counter(&self, id: Uuid, counter: BlogCounter, delta: i64) -> Result<(), StoreError> {
        let mut inner = self.state()?;
        if let Some(blog) = inner.blogs.get_mut(&id) {
            let field = match counter {
                BlogCounter::Views => &mut blog.views_count,
                BlogCounter::Likes => &mut blog.likes_count,
                BlogCounter::Comments => &mut blog.comments_count,
            };
            *field = (*field + delta).max(0);
        }
        Ok(())
    }
}

#[async_trait]
impl CommentStore for MemoryStore {
    async fn create(&self, comment: &Comment) -> Result<(), StoreError> {
        self.state()?.comments.insert(comment.id, comment.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Comment>, StoreError> {
        Ok(self.state()?.comments.get(&id).cloned())
    }

    async fn list_by_blog(&self, blog_id: Uuid) -> Result<Vec<Comment>, StoreError> {
        let mut comments: Vec<Comment> = self
            .state()?
            .comments
            .values()
            .filter(|c| c.blog_id == blog_id)
            .cloned()
            .collect();
        comments.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(comments)
    }

    async fn delete(&self, id: Uuid) -> Result<bool, StoreError> {
        Ok(self.state()?.comments.remove(&id).is_some())
    }

    async fn delete_by_blog(&self, blog_id: Uuid) -> Result<u64, StoreError> {
        let mut inner = self.state()?;
        let before = inner.comments.len();
        inner.comments.retain(|_, c| c.blog_id != blog_id);
        Ok((before - inner.comments.len()) as u64)
    }

    async fn delete_by_user(&self, user_id: Uuid) -> Result<Vec<Comment>, StoreError> {
        let mut inner = self.state()?;
        let ids: Vec<Uuid> = inner
            .comments
            .values()
            .filter(|c| c.user_id == user_id)
            .map(|c| c.id)
            .collect();
        Ok(ids
            .iter()
            .filter_map(|id| inner.comments.remove(id))
            .collect())
    }
}

#[async_trait]
impl LikeStore for MemoryStore {
    async fn create(&self, like: &Like) -> Result<(), StoreError> {
        let mut inner = self.state()?;
        let key = (like.blog_id, like.user_id);
        if inner.likes.contains_key(&key) {
            return Err(StoreError::Duplicate("likes_blog_id_user_id_key".to_string()));
        }
        inner.likes.insert(key, like.clone());
        Ok(())
    }

    async fn delete(&self, blog_id: Uuid, user_id: Uuid) -> Result<bool, StoreError> {
        Ok(self.state()?.likes.remove(&(blog_id, user_id)).is_some())
    }

    async fn delete_by_blog(&self, blog_id: Uuid) -> Result<u64, StoreError> {
        let mut inner = self.state()?;
        let before = inner.likes.len();
        inner.likes.retain(|(blog, _), _| *blog != blog_id);
        Ok((before - inner.likes.len()) as u64)
    }

    async fn delete_by_user(&self, user_id: Uuid) -> Result<Vec<Like>, StoreError> {
        let mut inner = self.state()?;
        let keys: Vec<(Uuid, Uuid)> = inner
            .likes
            .keys()
            .filter(|(_, user)| *user == user_id)
            .copied()
            .collect();
        Ok(keys
            .iter()
            .filter_map(|key| inner.likes.remove(key))
            .collect())
    }
}

// Persistence seam for users, sessions, profiles and submission history

use crate::redis as keys;
use crate::types::{SubmissionRecord, User};
use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::RedisResult;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use uuid::Uuid;

#[async_trait]
pub trait Store: Send + Sync {
    async fn session_user(&self, token: &str) -> RedisResult<Option<User>>;

    async fn profile_language(&self, user_id: &Uuid) -> RedisResult<Option<String>>;

    async fn latest_submission(&self, user_id: &Uuid) -> RedisResult<Option<SubmissionRecord>>;

    /// Insert or overwrite the single record kept for `record.user_id`
    async fn upsert_submission(&self, record: &SubmissionRecord) -> RedisResult<()>;
}

/// Redis-backed store. The connection manager is cheap to clone and
/// reconnects on its own.
#[derive(Clone)]
pub struct RedisStore {
    conn: ConnectionManager,
}

impl RedisStore {
    pub fn new(conn: ConnectionManager) -> Self {
        Self { conn }
    }

    pub async fn connect(redis_url: &str) -> RedisResult<Self> {
        let client = redis::Client::open(redis_url)?;
        let conn = ConnectionManager::new(client).await?;
        Ok(Self { conn })
    }
}

#[async_trait]
impl Store for RedisStore {
    async fn session_user(&self, token: &str) -> RedisResult<Option<User>> {
        let mut conn = self.conn.clone();
        keys::session_user(&mut conn, token).await
    }

    async fn profile_language(&self, user_id: &Uuid) -> RedisResult<Option<String>> {
        let mut conn = self.conn.clone();
        keys::get_profile_language(&mut conn, user_id).await
    }

    async fn latest_submission(&self, user_id: &Uuid) -> RedisResult<Option<SubmissionRecord>> {
        let mut conn = self.conn.clone();
        keys::get_history(&mut conn, user_id).await
    }

    async fn upsert_submission(&self, record: &SubmissionRecord) -> RedisResult<()> {
        let mut conn = self.conn.clone();
        keys::upsert_history(&mut conn, record).await
    }
}

#[derive(Default)]
struct MemoryInner {
    users: HashMap<Uuid, User>,
    sessions: HashMap<String, Uuid>,
    profiles: HashMap<Uuid, String>,
    history: HashMap<Uuid, SubmissionRecord>,
}

/// In-process store for local development and tests
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<MemoryInner>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_user(&self, user: User, token: &str) {
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        inner.sessions.insert(token.to_string(), user.id);
        inner.users.insert(user.id, user);
    }

    pub fn set_profile_language(&self, user_id: Uuid, language: &str) {
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        inner.profiles.insert(user_id, language.to_string());
    }

    pub fn history_len(&self) -> usize {
        let inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        inner.history.len()
    }

    pub fn history(&self, user_id: &Uuid) -> Option<SubmissionRecord> {
        let inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        inner.history.get(user_id).cloned()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn session_user(&self, token: &str) -> RedisResult<Option<User>> {
        let inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        Ok(inner
            .sessions
            .get(token)
            .and_then(|id| inner.users.get(id))
            .cloned())
    }

    async fn profile_language(&self, user_id: &Uuid) -> RedisResult<Option<String>> {
        let inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        Ok(inner.profiles.get(user_id).cloned())
    }

    async fn latest_submission(&self, user_id: &Uuid) -> RedisResult<Option<SubmissionRecord>> {
        Ok(self.history(user_id))
    }

    async fn upsert_submission(&self, record: &SubmissionRecord) -> RedisResult<()> {
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        inner.history.insert(record.user_id, record.clone());
        Ok(())
    }
}

//! Sliding idle sessions.
//!
//! A session record `session:<token>` maps the literal bearer token to its
//! owner's user id. Every successful touch resets the time-to-live to the
//! full idle timeout from now; concurrent touches are last-write-wins, which
//! only ever extends the session.

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use bb8_redis::RedisConnectionManager;
use bb8_redis::bb8::Pool;
use bb8_redis::redis;
use dashmap::DashMap;
use thiserror::Error;

use crate::core_types::UserId;

/// Redis key of a session record
pub fn session_key(token: &str) -> String {
    format!("session:{token}")
}

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Session store error: {0}")]
    Backend(String),
}

#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Create or overwrite the record with a fresh time-to-live.
    async fn create(&self, token: &str, user_id: UserId) -> Result<(), SessionError>;

    /// Owner of a live session, extending its expiry. `None` when absent
    /// or expired.
    async fn touch(&self, token: &str) -> Result<Option<UserId>, SessionError>;

    async fn revoke(&self, token: &str) -> Result<(), SessionError>;
}

// ============================================================================
// In-process
// ============================================================================

/// DashMap-backed sessions for single-node deployments and tests.
pub struct MemorySessionStore {
    sessions: DashMap<String, (UserId, Instant)>,
    idle_timeout: Duration,
}

impl MemorySessionStore {
    pub fn new(idle_timeout: Duration) -> Self {
        Self {
            sessions: DashMap::new(),
            idle_timeout,
        }
    }

    /// Drop every expired record. Returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let before = self.sessions.len();
        self.sessions.retain(|_, (_, expires_at)| *expires_at > now);
        before.saturating_sub(self.sessions.len())
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn create(&self, token: &str, user_id: UserId) -> Result<(), SessionError> {
        self.sessions.insert(
            session_key(token),
            (user_id, Instant::now() + self.idle_timeout),
        );
        Ok(())
    }

    async fn touch(&self, token: &str) -> Result<Option<UserId>, SessionError> {
        let key = session_key(token);
        let now = Instant::now();

        let live = match self.sessions.get_mut(&key) {
            Some(mut record) if record.1 > now => {
                record.1 = now + self.idle_timeout;
                Some(record.0)
            }
            Some(_) => None,
            None => return Ok(None),
        };

        if live.is_none() {
            self.sessions.remove_if(&key, |_, (_, expires_at)| *expires_at <= now);
        }
        Ok(live)
    }

    async fn revoke(&self, token: &str) -> Result<(), SessionError> {
        self.sessions.remove(&session_key(token));
        Ok(())
    }
}

// ============================================================================
// Redis
// ============================================================================

pub type RedisPool = Pool<RedisConnectionManager>;

/// Sessions in Redis with native key expiry.
pub struct RedisSessionStore {
    pool: RedisPool,
    idle_timeout: Duration,
}

impl RedisSessionStore {
    pub fn new(pool: RedisPool, idle_timeout: Duration) -> Self {
        Self { pool, idle_timeout }
    }

    pub async fn connect(url: &str, idle_timeout: Duration) -> Result<Self, SessionError> {
        let manager = RedisConnectionManager::new(url).map_err(backend)?;
        let pool = Pool::builder().build(manager).await.map_err(backend)?;
        Ok(Self::new(pool, idle_timeout))
    }

    fn ttl_secs(&self) -> u64 {
        self.idle_timeout.as_secs().max(1)
    }
}

fn backend(e: impl std::fmt::Display) -> SessionError {
    SessionError::Backend(e.to_string())
}

#[async_trait]
impl SessionStore for RedisSessionStore {
    async fn create(&self, token: &str, user_id: UserId) -> Result<(), SessionError> {
        let mut conn = self.pool.get().await.map_err(backend)?;
        let _: () = redis::cmd("SET")
            .arg(session_key(token))
            .arg(user_id)
            .arg("EX")
            .arg(self.ttl_secs())
            .query_async(&mut *conn)
            .await
            .map_err(backend)?;
        Ok(())
    }

    async fn touch(&self, token: &str) -> Result<Option<UserId>, SessionError> {
        let mut conn = self.pool.get().await.map_err(backend)?;
        // GETEX reads and re-arms the expiry in one round trip
        let owner: Option<UserId> = redis::cmd("GETEX")
            .arg(session_key(token))
            .arg("EX")
            .arg(self.ttl_secs())
            .query_async(&mut *conn)
            .await
            .map_err(backend)?;
        Ok(owner)
    }

    async fn revoke(&self, token: &str) -> Result<(), SessionError> {
        let mut conn = self.pool.get().await.map_err(backend)?;
        let _: () = redis::cmd("DEL")
            .arg(session_key(token))
            .query_async(&mut *conn)
            .await
            .map_err(backend)?;
        Ok(())
    }
}

/// Shared handle used by the gate and the auth service
pub type SharedSessions = Arc<dyn SessionStore>;

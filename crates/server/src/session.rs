// In-memory MCP session tracking for the HTTP transport

use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

pub const DEFAULT_IDLE_TIMEOUT_SECS: u64 = 1800;
pub const DEFAULT_MAX_SESSIONS: usize = 1024;

#[derive(Debug, Clone)]
pub struct Session {
    pub id: String,
    pub client_name: Option<String>,
    pub created_at: DateTime<Utc>,
    pub last_seen: DateTime<Utc>,
}

impl Session {
    fn is_expired(&self, now: DateTime<Utc>, idle_timeout: Duration) -> bool {
        now - self.last_seen >= idle_timeout
    }
}

/// Sessions created by `initialize`.
///
/// Besides DELETE, idle sessions expire and a full store evicts its least
/// recently used entry.
#[derive(Debug, Clone)]
pub struct SessionStore {
    sessions: Arc<RwLock<HashMap<String, Session>>>,
    idle_timeout: Duration,
    max_sessions: usize,
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::with_limits(DEFAULT_IDLE_TIMEOUT_SECS, DEFAULT_MAX_SESSIONS)
    }
}

impl SessionStore {
    pub fn with_limits(idle_timeout_secs: u64, max_sessions: usize) -> Self {
        let idle_timeout = i64::try_from(idle_timeout_secs)
            .ok()
            .and_then(Duration::try_seconds)
            .unwrap_or(Duration::MAX);

        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
            idle_timeout,
            max_sessions: max_sessions.max(1),
        }
    }

    /// Start a session and return its id
    pub async fn create(&self, client_name: Option<String>) -> String {
        let now = Utc::now();
        let id = Uuid::new_v4().to_string();
        let session = Session {
            id: id.clone(),
            client_name,
            created_at: now,
            last_seen: now,
        };

        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, s| !s.is_expired(now, self.idle_timeout));
        if before > sessions.len() {
            tracing::debug!(expired = before - sessions.len(), "expired sessions dropped");
        }

        if sessions.len() >= self.max_sessions {
            let oldest = sessions
                .values()
                .min_by_key(|s| s.last_seen)
                .map(|s| s.id.clone());
            if let Some(oldest) = oldest {
                tracing::warn!(session = %oldest, "session store full, evicting least recently used");
                sessions.remove(&oldest);
            }
        }

        tracing::info!(session = %id, client = ?session.client_name, "session started");
        sessions.insert(id.clone(), session);
        id
    }

    /// Look up a live session and mark it as used; expired sessions are dropped
    pub async fn get(&self, id: &str) -> Option<Session> {
        let now = Utc::now();
        let mut sessions = self.sessions.write().await;

        let expired = sessions.get(id)?.is_expired(now, self.idle_timeout);
        if expired {
            sessions.remove(id);
            tracing::info!(session = %id, "session expired");
            return None;
        }

        let session = sessions.get_mut(id)?;
        session.last_seen = now;
        Some(session.clone())
    }

    /// End a session; `false` if it was unknown
    pub async fn remove(&self, id: &str) -> bool {
        let removed = self.sessions.write().await.remove(id);
        if let Some(session) = &removed {
            tracing::info!(
                session = %session.id,
                age_secs = (Utc::now() - session.created_at).num_seconds(),
                "session ended"
            );
        }
        removed.is_some()
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_session_lifecycle() {
        let store = SessionStore::default();
        let id = store.create(Some("vitest".to_string())).await;

        assert!(store.get(&id).await.is_some());
        assert_eq!(store.len().await, 1);
        assert_eq!(
            store.get(&id).await.unwrap().client_name.as_deref(),
            Some("vitest")
        );

        assert!(store.remove(&id).await);
        assert!(!store.remove(&id).await);
        assert!(store.get(&id).await.is_none());
    }

    #[tokio::test]
    async fn test_ids_are_unique() {
        let store = SessionStore::default();
        let a = store.create(None).await;
        let b = store.create(None).await;
        assert_ne!(a, b);
        assert_eq!(store.len().await, 2);
    }

    #[tokio::test]
    async fn test_idle_session_expires() {
        let store = SessionStore::with_limits(0, DEFAULT_MAX_SESSIONS);
        let id = store.create(None).await;

        assert!(store.get(&id).await.is_none());
        assert_eq!(store.len().await, 0);
    }

    #[tokio::test]
    async fn test_expired_sessions_are_pruned_on_create() {
        let store = SessionStore::with_limits(0, DEFAULT_MAX_SESSIONS);
        store.create(None).await;
        store.create(None).await;

        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_full_store_evicts_least_recently_used() {
        let store = SessionStore::with_limits(DEFAULT_IDLE_TIMEOUT_SECS, 2);
        let first = store.create(None).await;
        let second = store.create(None).await;

        // Touch the first one so the second becomes the eviction candidate
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        assert!(store.get(&first).await.is_some());

        let third = store.create(None).await;

        assert_eq!(store.len().await, 2);
        assert!(store.get(&first).await.is_some());
        assert!(store.get(&second).await.is_none());
        assert!(store.get(&third).await.is_some());
    }
}

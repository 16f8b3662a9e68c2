//! Per-session selection state.
//!
//! Each browser session gets its own [`SessionContext`], keyed by a random
//! id carried in the `rm_session` cookie. Contexts idle for longer than the
//! configured TTL are evicted whenever the store is touched.

pub mod context;

use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::debug;
use uuid::Uuid;

use crate::migration::WorkflowMode;

pub use context::{PersonSelection, SessionContext};

pub const SESSION_COOKIE: &str = "rm_session";

pub type SessionHandle = Arc<Mutex<SessionContext>>;

/// One year.
const MAX_TTL_MINUTES: u64 = 60 * 24 * 365;

struct SessionEntry {
    context: SessionHandle,
    last_seen: DateTime<Utc>,
}

#[derive(Clone)]
pub struct SessionStore {
    sessions: Arc<Mutex<HashMap<String, SessionEntry>>>,
    ttl: Duration,
}

impl SessionStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            sessions: Arc::new(Mutex::new(HashMap::new())),
            ttl,
        }
    }

    pub fn with_ttl_minutes(minutes: u64) -> Self {
        Self::new(Duration::minutes(minutes.min(MAX_TTL_MINUTES) as i64))
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Starts a new session and returns its id.
    pub async fn create(&self, mode: WorkflowMode) -> (String, SessionHandle) {
        let id = Uuid::new_v4().to_string();
        let context = Arc::new(Mutex::new(SessionContext::new(mode)));

        let mut sessions = self.sessions.lock().await;
        Self::evict(&mut sessions, Utc::now(), self.ttl);
        sessions.insert(
            id.clone(),
            SessionEntry {
                context: context.clone(),
                last_seen: Utc::now(),
            },
        );
        debug!("Created {} session {}", mode.as_str(), id);
        (id, context)
    }

    pub async fn get(&self, id: &str) -> Option<SessionHandle> {
        self.get_at(id, Utc::now()).await
    }

    /// Looks up a live session and refreshes its idle timer.
    pub async fn get_at(&self, id: &str, now: DateTime<Utc>) -> Option<SessionHandle> {
        let mut sessions = self.sessions.lock().await;
        Self::evict(&mut sessions, now, self.ttl);
        let entry = sessions.get_mut(id)?;
        entry.last_seen = now;
        Some(entry.context.clone())
    }

    pub async fn len(&self) -> usize {
        self.sessions.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    fn evict(sessions: &mut HashMap<String, SessionEntry>, now: DateTime<Utc>, ttl: Duration) {
        let before = sessions.len();
        sessions.retain(|_, entry| now - entry.last_seen <= ttl);
        let evicted = before - sessions.len();
        if evicted > 0 {
            debug!("Evicted {} idle session(s)", evicted);
        }
    }
}

//! In-memory session map.

use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;

use crate::config::SessionConfig;
use crate::db::UserRecord;
use crate::observability::metrics;
use crate::session::cookie::CookieSettings;

/// Issue a new opaque session id.
///
/// A v4 uuid in simple form followed by 64 more random bits, hex encoded:
/// 48 lowercase hex characters in total.
pub fn generate_session_id() -> String {
    format!("{}{:016x}", uuid::Uuid::new_v4().simple(), rand::random::<u64>())
}

/// True when `id` has the shape produced by [`generate_session_id`].
pub fn is_well_formed_session_id(id: &str) -> bool {
    id.len() == 48 && id.bytes().all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b))
}

struct SessionEntry {
    user: UserRecord,
    last_seen: Instant,
}

/// Thread-safe map from session id to the signed-in user.
///
/// Entries idle for longer than the configured timeout are treated as absent
/// and removed on access or by [`SessionStore::purge_expired`].
#[derive(Clone)]
pub struct SessionStore {
    inner: Arc<DashMap<String, SessionEntry>>,
    idle_timeout: Duration,
    cookie: CookieSettings,
}

impl SessionStore {
    pub fn new(config: &SessionConfig) -> Self {
        Self {
            inner: Arc::new(DashMap::new()),
            idle_timeout: Duration::from_secs(config.idle_timeout_secs),
            cookie: CookieSettings::from_config(config),
        }
    }

    pub fn with_idle_timeout(mut self, idle_timeout: Duration) -> Self {
        self.idle_timeout = idle_timeout;
        self
    }

    pub fn cookie(&self) -> &CookieSettings {
        &self.cookie
    }

    /// Start a session for `user` under a fresh id.
    pub fn create(&self, user: UserRecord) -> String {
        let id = generate_session_id();
        self.inner.insert(
            id.clone(),
            SessionEntry {
                user,
                last_seen: Instant::now(),
            },
        );
        metrics::record_sessions_active(self.inner.len());
        id
    }

    /// Replace any previous session with a new one.
    ///
    /// The id a client presented before signing in is never reused.
    pub fn rotate(&self, previous: Option<&str>, user: UserRecord) -> String {
        if let Some(previous) = previous {
            self.remove(previous);
        }
        self.create(user)
    }

    /// The user behind `id`, refreshing its idle timer.
    pub fn get(&self, id: &str) -> Option<UserRecord> {
        if let Some(mut entry) = self.inner.get_mut(id) {
            if entry.last_seen.elapsed() <= self.idle_timeout {
                entry.last_seen = Instant::now();
                return Some(entry.user.clone());
            }
        }

        let timeout = self.idle_timeout;
        if self
            .inner
            .remove_if(id, |_, entry| entry.last_seen.elapsed() > timeout)
            .is_some()
        {
            tracing::debug!("Expired session dropped on access");
            metrics::record_sessions_active(self.inner.len());
        }
        None
    }

    pub fn remove(&self, id: &str) -> bool {
        let removed = self.inner.remove(id).is_some();
        if removed {
            metrics::record_sessions_active(self.inner.len());
        }
        removed
    }

    /// Drop every idle session. Returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        let before = self.inner.len();
        let timeout = self.idle_timeout;
        self.inner.retain(|_, entry| entry.last_seen.elapsed() <= timeout);
        let after = self.inner.len();
        metrics::record_sessions_active(after);
        before.saturating_sub(after)
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

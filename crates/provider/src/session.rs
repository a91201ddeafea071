//! Server-side session storage for LTI-authenticated visitors.

use dashmap::DashMap;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// Session key holding the LTI-authenticated flag.
pub const LTI_SESSION_KEY: &str = "lti_authenticated";

/// Per-visitor key/value data, loaded at the start of a request and saved
/// back by the handler.
#[derive(Clone, Debug, PartialEq)]
pub struct Session {
    id: String,
    data: BTreeMap<String, Value>,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    /// A fresh, empty session with a random id.
    pub fn new() -> Self {
        Self::with_id(uuid::Uuid::new_v4().simple().to_string())
    }

    pub fn with_id(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            data: BTreeMap::new(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.data.get(key)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.data.insert(key.into(), value.into());
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.data.remove(key)
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// True only when the flag is present and set to boolean `true`.
    pub fn is_lti_authenticated(&self) -> bool {
        matches!(self.data.get(LTI_SESSION_KEY), Some(Value::Bool(true)))
    }

    pub fn set_lti_authenticated(&mut self, authenticated: bool) {
        self.insert(LTI_SESSION_KEY, authenticated);
    }

    /// `Set-Cookie` value binding this session to the browser.
    ///
    /// LMS launches arrive in cross-site iframes, hence `SameSite=None`.
    pub fn cookie(&self, name: &str) -> String {
        format!(
            "{name}={}; Path=/; HttpOnly; Secure; SameSite=None",
            self.id
        )
    }
}

#[derive(Clone, Debug)]
struct StoredSession {
    session: Session,
    last_seen: Instant,
}

const CLEANUP_INTERVAL: Duration = Duration::from_secs(60);

/// In-memory session store with idle expiry.
///
/// Expired sessions are swept lazily from `save` and `load`, at most once
/// per cleanup interval (the TTL when shorter than a minute).
#[derive(Clone, Debug)]
pub struct SessionStore {
    sessions: Arc<DashMap<String, StoredSession>>,
    ttl: Duration,
    last_cleanup: Arc<Mutex<Instant>>,
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new(Duration::from_secs(60 * 60 * 8))
    }
}

impl SessionStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            sessions: Arc::new(DashMap::new()),
            ttl,
            last_cleanup: Arc::new(Mutex::new(Instant::now())),
        }
    }

    fn maybe_cleanup(&self) {
        let Ok(mut last_cleanup) = self.last_cleanup.try_lock() else {
            return;
        };
        if last_cleanup.elapsed() < self.ttl.min(CLEANUP_INTERVAL) {
            return;
        }
        *last_cleanup = Instant::now();
        drop(last_cleanup);
        self.purge_expired();
    }

    /// Returns the stored session unless it is unknown or idle for longer
    /// than the TTL. Loading refreshes the idle timer.
    pub fn load(&self, id: &str) -> Option<Session> {
        self.maybe_cleanup();
        let mut entry = self.sessions.get_mut(id)?;
        if entry.last_seen.elapsed() > self.ttl {
            drop(entry);
            self.sessions.remove(id);
            tracing::debug!(session = %id, "Session expired");
            return None;
        }
        entry.last_seen = Instant::now();
        Some(entry.session.clone())
    }

    /// Loads `id` if given and still live, otherwise starts a new session.
    pub fn load_or_new(&self, id: Option<&str>) -> Session {
        id.and_then(|id| self.load(id)).unwrap_or_else(Session::new)
    }

    pub fn save(&self, session: &Session) {
        self.maybe_cleanup();
        self.sessions.insert(
            session.id.clone(),
            StoredSession {
                session: session.clone(),
                last_seen: Instant::now(),
            },
        );
    }

    pub fn remove(&self, id: &str) -> Option<Session> {
        self.sessions.remove(id).map(|(_, stored)| stored.session)
    }

    /// Drops every session idle for longer than the TTL.
    pub fn purge_expired(&self) {
        let ttl = self.ttl;
        self.sessions
            .retain(|_, stored| stored.last_seen.elapsed() <= ttl);
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

//! Cookie-keyed session state.
//!
//! The pipeline only needs a handful of atomic single-key operations from a
//! session backend ([`SessionStore`]); nothing here relies on several keys
//! changing together. [`MemorySessionStore`] is the in-process backend used
//! by the binary and the tests.
//!
//! The `session` middleware resolves the cookie to a [`Session`] handle and
//! attaches it to the request; handlers read and write through that handle.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use tracing::debug;
use uuid::Uuid;

/// Cookie carrying the session token.
pub const COOKIE_NAME: &str = "session";

/// One-time notice shown on the next rendered page.
pub const FLASH: &str = "flash";
/// Present (holding the user id) once the user has logged in.
pub const AUTH_USER_ID: &str = "authenticated_user_id";
/// Per-session anti-forgery secret.
pub const CSRF_TOKEN: &str = "csrf_token";

/// Snapshot of one session.
#[derive(Clone, Debug)]
pub struct SessionData {
    pub values: HashMap<String, String>,
    pub expires_at: Instant,
}

impl SessionData {
    fn new(lifetime: Duration) -> Self {
        Self { values: HashMap::new(), expires_at: Instant::now() + lifetime }
    }

    fn is_expired(&self) -> bool {
        Instant::now() >= self.expires_at
    }
}

/// Backend holding session state keyed by token. Each call is atomic on its
/// own.
pub trait SessionStore: Send + Sync {
    /// Starts an empty session and returns its token.
    fn create(&self) -> String;

    /// Current state of `token`; `None` when unknown or expired.
    fn load(&self, token: &str) -> Option<SessionData>;

    fn put(&self, token: &str, key: &str, value: &str);

    fn get(&self, token: &str, key: &str) -> Option<String>;

    /// Removes `key` and returns what it held.
    fn remove(&self, token: &str, key: &str) -> Option<String>;

    fn destroy(&self, token: &str);
}

// ── In-memory backend ─────────────────────────────────────────────────────────

/// Every this many [`create`](SessionStore::create) calls the store sweeps
/// out expired sessions.
pub const PURGE_EVERY: usize = 256;

/// Sessions in a concurrent map, expiring `lifetime` after creation.
///
/// Expired sessions are dropped when their token is loaded again and, for
/// abandoned ones, by a sweep every [`PURGE_EVERY`] new sessions. The map
/// therefore holds at most the sessions created within one lifetime plus one
/// sweep interval.
pub struct MemorySessionStore {
    sessions: DashMap<String, SessionData>,
    lifetime: Duration,
    created: AtomicUsize,
}

impl MemorySessionStore {
    pub fn new(lifetime: Duration) -> Self {
        Self { sessions: DashMap::new(), lifetime, created: AtomicUsize::new(0) }
    }

    /// Sessions currently held, expired or not.
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Drops every expired session. Returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        let before = self.sessions.len();
        self.sessions.retain(|_, data| !data.is_expired());
        before - self.sessions.len()
    }
}

impl SessionStore for MemorySessionStore {
    fn create(&self) -> String {
        if (self.created.fetch_add(1, Ordering::Relaxed) + 1) % PURGE_EVERY == 0 {
            let purged = self.purge_expired();
            if purged > 0 {
                debug!(purged, "dropped expired sessions");
            }
        }
        let token = Uuid::new_v4().simple().to_string();
        self.sessions.insert(token.clone(), SessionData::new(self.lifetime));
        token
    }

    fn load(&self, token: &str) -> Option<SessionData> {
        let data = self.sessions.get(token)?.value().clone();
        if data.is_expired() {
            self.sessions.remove(token);
            return None;
        }
        Some(data)
    }

    fn put(&self, token: &str, key: &str, value: &str) {
        if let Some(mut data) = self.sessions.get_mut(token) {
            data.values.insert(key.to_owned(), value.to_owned());
        }
    }

    fn get(&self, token: &str, key: &str) -> Option<String> {
        let data = self.sessions.get(token)?;
        if data.is_expired() {
            return None;
        }
        data.values.get(key).cloned()
    }

    fn remove(&self, token: &str, key: &str) -> Option<String> {
        self.sessions.get_mut(token)?.values.remove(key)
    }

    fn destroy(&self, token: &str) {
        self.sessions.remove(token);
    }
}

// ── Per-request handle ────────────────────────────────────────────────────────

/// The current request's session: its token plus the store it lives in.
#[derive(Clone)]
pub struct Session {
    token: String,
    store: Arc<dyn SessionStore>,
    fresh: bool,
}

impl Session {
    pub(crate) fn new(token: String, store: Arc<dyn SessionStore>, fresh: bool) -> Self {
        Self { token, store, fresh }
    }

    pub fn token(&self) -> &str { &self.token }

    /// `true` when the session was created for this request, i.e. the
    /// client has not been sent its cookie yet.
    pub fn is_fresh(&self) -> bool { self.fresh }

    pub fn put(&self, key: &str, value: &str) {
        self.store.put(&self.token, key, value);
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.store.get(&self.token, key)
    }

    pub fn remove(&self, key: &str) -> Option<String> {
        self.store.remove(&self.token, key)
    }

    /// Reads `key` and removes it in one step (flash messages).
    pub fn pop(&self, key: &str) -> Option<String> {
        self.remove(key)
    }

    pub fn is_authenticated(&self) -> bool {
        self.get(AUTH_USER_ID).is_some()
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("token", &"<redacted>")
            .field("fresh", &self.fresh)
            .finish()
    }
}

/// `Set-Cookie` value for `token`.
pub fn cookie_header(token: &str, lifetime: Duration, secure: bool) -> String {
    let mut cookie = format!(
        "{COOKIE_NAME}={token}; Path=/; Max-Age={}; HttpOnly; SameSite=Lax",
        lifetime.as_secs()
    );
    if secure {
        cookie.push_str("; Secure");
    }
    cookie
}

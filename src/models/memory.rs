//! In-process stores.

use std::collections::BTreeMap;
use std::sync::RwLock;

use chrono::{Duration, Utc};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use super::{Snippet, SnippetStore, StoreError, User, UserStore, LATEST_LIMIT};

fn poisoned<T>(_: T) -> StoreError {
    StoreError::internal("store lock poisoned")
}

// ── Snippets ─────────────────────────────────────────────────────────────────

#[derive(Default)]
struct Snippets {
    rows: BTreeMap<u64, Snippet>,
    next_id: u64,
}

/// Snippets in a map keyed by id. Ids start at 1 and are never reused.
#[derive(Default)]
pub struct MemorySnippetStore {
    inner: RwLock<Snippets>,
}

impl MemorySnippetStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `snippet` as-is, keeping its id, timestamps included. Lets
    /// callers load fixtures, already expired ones too.
    pub fn seed(&self, snippet: Snippet) -> Result<(), StoreError> {
        let mut inner = self.inner.write().map_err(poisoned)?;
        inner.next_id = inner.next_id.max(snippet.id);
        inner.rows.insert(snippet.id, snippet);
        Ok(())
    }
}

impl SnippetStore for MemorySnippetStore {
    fn insert(&self, title: &str, content: &str, expires_days: u32) -> Result<u64, StoreError> {
        let mut inner = self.inner.write().map_err(poisoned)?;
        inner.next_id += 1;
        let id = inner.next_id;
        let created = Utc::now();
        inner.rows.insert(id, Snippet {
            id,
            title: title.to_owned(),
            content: content.to_owned(),
            created,
            expires: created + Duration::days(i64::from(expires_days)),
        });
        Ok(id)
    }

    fn get(&self, id: u64) -> Result<Snippet, StoreError> {
        let inner = self.inner.read().map_err(poisoned)?;
        inner.rows
            .get(&id)
            .filter(|s| s.expires > Utc::now())
            .cloned()
            .ok_or(StoreError::NoRecord)
    }

    fn latest(&self) -> Result<Vec<Snippet>, StoreError> {
        let inner = self.inner.read().map_err(poisoned)?;
        let now = Utc::now();
        let mut live: Vec<Snippet> = inner.rows.values().filter(|s| s.expires > now).cloned().collect();
        live.sort_by(|a, b| b.created.cmp(&a.created).then(b.id.cmp(&a.id)));
        live.truncate(LATEST_LIMIT);
        Ok(live)
    }
}

// ── Users ────────────────────────────────────────────────────────────────────

#[derive(Default)]
struct Users {
    rows: BTreeMap<u64, User>,
    next_id: u64,
}

/// Users in memory. Passwords are kept as salted SHA-256 digests in the
/// form `salt$hex`; a persistent store should use a slow KDF instead.
#[derive(Default)]
pub struct MemoryUserStore {
    inner: RwLock<Users>,
}

impl MemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn digest(salt: &str, password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    hasher.update(password.as_bytes());
    format!("{salt}${:x}", hasher.finalize())
}

fn verify(stored: &str, password: &str) -> bool {
    stored
        .split_once('$')
        .is_some_and(|(salt, _)| digest(salt, password) == stored)
}

impl UserStore for MemoryUserStore {
    fn insert(&self, name: &str, email: &str, password: &str) -> Result<(), StoreError> {
        let mut inner = self.inner.write().map_err(poisoned)?;
        if inner.rows.values().any(|u| u.email.eq_ignore_ascii_case(email)) {
            return Err(StoreError::DuplicateEmail);
        }
        inner.next_id += 1;
        let id = inner.next_id;
        let salt = Uuid::new_v4().simple().to_string();
        inner.rows.insert(id, User {
            id,
            name: name.to_owned(),
            email: email.to_owned(),
            hashed_password: digest(&salt, password),
            created: Utc::now(),
        });
        Ok(())
    }

    fn authenticate(&self, email: &str, password: &str) -> Result<u64, StoreError> {
        let inner = self.inner.read().map_err(poisoned)?;
        inner.rows
            .values()
            .find(|u| u.email.eq_ignore_ascii_case(email))
            .filter(|u| verify(&u.hashed_password, password))
            .map(|u| u.id)
            .ok_or(StoreError::InvalidCredentials)
    }

    fn get(&self, id: u64) -> Result<User, StoreError> {
        let inner = self.inner.read().map_err(poisoned)?;
        inner.rows.get(&id).cloned().ok_or(StoreError::NoRecord)
    }
}

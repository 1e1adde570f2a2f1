//! Domain records and the storage capabilities handlers depend on.
//!
//! Handlers only ever see the [`SnippetStore`] and [`UserStore`] traits,
//! injected through [`App`](crate::App). [`memory`] holds the in-process
//! implementations used by the binary and the tests; a database-backed store
//! implements the same traits.
//!
//! The traits are synchronous on purpose: a call returns before the handler
//! reaches its next `.await`, so no store handle is ever held across one.

pub mod memory;

use chrono::{DateTime, Utc};
use serde::Serialize;

pub use memory::{MemorySnippetStore, MemoryUserStore};

/// How many snippets [`SnippetStore::latest`] returns.
pub const LATEST_LIMIT: usize = 10;

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Snippet {
    pub id: u64,
    pub title: String,
    pub content: String,
    pub created: DateTime<Utc>,
    pub expires: DateTime<Utc>,
}

#[derive(Clone, Debug, Serialize)]
pub struct User {
    pub id: u64,
    pub name: String,
    pub email: String,
    #[serde(skip)]
    pub hashed_password: String,
    pub created: DateTime<Utc>,
}

/// Failures a store reports. Only [`StoreError::Internal`] is a server
/// error; the rest are expected outcomes handlers turn into responses.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// No such row, or its expiry has passed.
    #[error("no matching record found")]
    NoRecord,

    #[error("duplicate email")]
    DuplicateEmail,

    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("storage failure: {0}")]
    Internal(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl StoreError {
    pub fn internal(msg: impl Into<String>) -> Self {
        let msg: String = msg.into();
        Self::Internal(msg.into())
    }
}

pub trait SnippetStore: Send + Sync {
    /// Stores a snippet expiring `expires_days` from now; returns its id.
    fn insert(&self, title: &str, content: &str, expires_days: u32) -> Result<u64, StoreError>;

    /// The snippet with `id`, unless it does not exist or has expired.
    fn get(&self, id: u64) -> Result<Snippet, StoreError>;

    /// Up to [`LATEST_LIMIT`] unexpired snippets, newest first.
    fn latest(&self) -> Result<Vec<Snippet>, StoreError>;
}

pub trait UserStore: Send + Sync {
    /// Creates a user. Fails with [`StoreError::DuplicateEmail`] when the
    /// address is taken.
    fn insert(&self, name: &str, email: &str, password: &str) -> Result<(), StoreError>;

    /// The id of the user with these credentials, or
    /// [`StoreError::InvalidCredentials`].
    fn authenticate(&self, email: &str, password: &str) -> Result<u64, StoreError>;

    fn get(&self, id: u64) -> Result<User, StoreError>;
}

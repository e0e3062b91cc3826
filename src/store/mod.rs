//! User directory, file catalog and session storage.
//!
//! The token core never touches storage directly; flows and handlers go
//! through these traits. `MemoryStore` backs tests and local runs without a
//! database, `PgStore` is the Postgres implementation.

mod memory;
mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

use async_trait::async_trait;
use thiserror::Error;

use crate::model::{FileId, FileRecord, Role, User, UserId};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{0} already exists")]
    Conflict(&'static str),
    #[error("corrupt record: {0}")]
    Corrupt(String),
    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Clone, Debug)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub role: Role,
    pub email_verified: bool,
}

/// User plus the stored password hash, only used by login.
#[derive(Clone, Debug)]
pub struct StoredCredentials {
    pub user: User,
    pub password_hash: String,
}

#[async_trait]
pub trait UserDirectory: Send + Sync {
    /// # Errors
    /// `Conflict` when the username or email is taken.
    async fn create_user(&self, new_user: NewUser) -> StoreResult<User>;

    async fn find_user(&self, id: UserId) -> StoreResult<Option<User>>;

    async fn find_credentials(&self, username: &str) -> StoreResult<Option<StoredCredentials>>;

    /// Set `email_verified`. Returns `true` if the flag changed.
    async fn mark_email_verified(&self, id: UserId) -> StoreResult<bool>;
}

#[async_trait]
pub trait FileCatalog: Send + Sync {
    async fn insert_file(&self, record: FileRecord) -> StoreResult<()>;

    async fn find_file(&self, id: &FileId) -> StoreResult<Option<FileRecord>>;

    async fn list_files(&self) -> StoreResult<Vec<FileRecord>>;
}

#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Store a new session and drop sessions that expired at or before `now`.
    async fn create_session(
        &self,
        token_hash: Vec<u8>,
        user_id: UserId,
        expires_at: i64,
        now: i64,
    ) -> StoreResult<()>;

    /// Resolve a live session; expired sessions resolve to `None`.
    async fn session_user(&self, token_hash: &[u8], now: i64) -> StoreResult<Option<UserId>>;
}

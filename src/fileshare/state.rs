//! Shared server state and configuration.

use std::sync::Arc;

use crate::blob::{BlobStore, MemoryBlobStore};
use crate::email::{EmailSender, LogEmailSender};
use crate::flows::{DownloadFlow, Tokens, UploadFlow, VerificationFlow};
use crate::store::{FileCatalog, MemoryStore, SessionStore, UserDirectory};
use crate::token::Clock;

pub const DEFAULT_SESSION_TTL_SECONDS: i64 = 12 * 60 * 60;
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

#[derive(Clone, Debug)]
pub struct AppConfig {
    public_base_url: String,
    session_ttl_seconds: i64,
    max_upload_bytes: usize,
}

impl AppConfig {
    #[must_use]
    pub fn new(public_base_url: String) -> Self {
        Self {
            public_base_url: public_base_url.trim_end_matches('/').to_string(),
            session_ttl_seconds: DEFAULT_SESSION_TTL_SECONDS,
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
        }
    }

    #[must_use]
    pub fn with_session_ttl_seconds(mut self, seconds: i64) -> Self {
        self.session_ttl_seconds = seconds;
        self
    }

    #[must_use]
    pub fn with_max_upload_bytes(mut self, bytes: usize) -> Self {
        self.max_upload_bytes = bytes;
        self
    }

    #[must_use]
    pub fn public_base_url(&self) -> &str {
        &self.public_base_url
    }

    #[must_use]
    pub fn session_ttl_seconds(&self) -> i64 {
        self.session_ttl_seconds
    }

    #[must_use]
    pub fn max_upload_bytes(&self) -> usize {
        self.max_upload_bytes
    }
}

/// External collaborators the server is wired against.
#[derive(Clone)]
pub struct Backends {
    pub users: Arc<dyn UserDirectory>,
    pub files: Arc<dyn FileCatalog>,
    pub sessions: Arc<dyn SessionStore>,
    pub blobs: Arc<dyn BlobStore>,
    pub mailer: Arc<dyn EmailSender>,
}

impl Backends {
    /// Use one store for users, files and sessions.
    #[must_use]
    pub fn from_store<S>(store: Arc<S>, blobs: Arc<dyn BlobStore>, mailer: Arc<dyn EmailSender>) -> Self
    where
        S: UserDirectory + FileCatalog + SessionStore + 'static,
    {
        Self {
            users: store.clone(),
            files: store.clone(),
            sessions: store,
            blobs,
            mailer,
        }
    }

    /// Everything in process memory; mail goes to the log.
    #[must_use]
    pub fn in_memory() -> Self {
        Self::from_store(
            Arc::new(MemoryStore::new()),
            Arc::new(MemoryBlobStore::new()),
            Arc::new(LogEmailSender),
        )
    }
}

pub struct AppState {
    config: AppConfig,
    users: Arc<dyn UserDirectory>,
    files: Arc<dyn FileCatalog>,
    sessions: Arc<dyn SessionStore>,
    clock: Arc<dyn Clock>,
    verification: VerificationFlow,
    downloads: DownloadFlow,
    uploads: UploadFlow,
}

impl AppState {
    #[must_use]
    pub fn new(config: AppConfig, tokens: Tokens, backends: Backends) -> Self {
        let clock = tokens.signer().clock().clone();
        let verification = VerificationFlow::new(
            tokens.clone(),
            backends.users.clone(),
            backends.mailer,
            config.public_base_url(),
        );
        let downloads = DownloadFlow::new(
            tokens,
            backends.files.clone(),
            backends.blobs.clone(),
            config.public_base_url(),
        );
        let uploads = UploadFlow::new(
            backends.files.clone(),
            backends.blobs,
            clock.clone(),
            config.max_upload_bytes(),
        );
        Self {
            config,
            users: backends.users,
            files: backends.files,
            sessions: backends.sessions,
            clock,
            verification,
            downloads,
            uploads,
        }
    }

    #[must_use]
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub(crate) fn users(&self) -> &dyn UserDirectory {
        self.users.as_ref()
    }

    pub(crate) fn files(&self) -> &dyn FileCatalog {
        self.files.as_ref()
    }

    pub(crate) fn sessions(&self) -> &dyn SessionStore {
        self.sessions.as_ref()
    }

    pub(crate) fn now(&self) -> i64 {
        self.clock.now()
    }

    pub(crate) fn verification(&self) -> &VerificationFlow {
        &self.verification
    }

    pub(crate) fn downloads(&self) -> &DownloadFlow {
        &self.downloads
    }

    pub(crate) fn uploads(&self) -> &UploadFlow {
        &self.uploads
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_defaults_and_overrides() {
        let config = AppConfig::new("https://files.example.com/".to_string());
        assert_eq!(config.public_base_url(), "https://files.example.com");
        assert_eq!(config.session_ttl_seconds(), 43_200);
        assert_eq!(config.max_upload_bytes(), 10 * 1024 * 1024);

        let config = config
            .with_session_ttl_seconds(60)
            .with_max_upload_bytes(1024);
        assert_eq!(config.session_ttl_seconds(), 60);
        assert_eq!(config.max_upload_bytes(), 1024);
    }
}

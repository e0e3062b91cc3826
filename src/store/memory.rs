use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

use super::{
    FileCatalog, NewUser, SessionStore, StoreError, StoreResult, StoredCredentials, UserDirectory,
};
use crate::model::{FileId, FileRecord, User, UserId};

#[derive(Debug, Default)]
struct Inner {
    next_user_id: i64,
    users: HashMap<UserId, StoredCredentials>,
    files: HashMap<FileId, FileRecord>,
    sessions: HashMap<Vec<u8>, (UserId, i64)>,
}

/// In-process store; contents are lost on restart.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserDirectory for MemoryStore {
    async fn create_user(&self, new_user: NewUser) -> StoreResult<User> {
        let mut inner = self.inner.write().await;
        let username_taken = inner
            .users
            .values()
            .any(|stored| stored.user.username == new_user.username);
        if username_taken {
            return Err(StoreError::Conflict("username"));
        }
        let email_taken = inner
            .users
            .values()
            .any(|stored| stored.user.email == new_user.email);
        if email_taken {
            return Err(StoreError::Conflict("email"));
        }

        inner.next_user_id += 1;
        let user = User {
            id: UserId(inner.next_user_id),
            username: new_user.username,
            email: new_user.email,
            role: new_user.role,
            email_verified: new_user.email_verified,
        };
        inner.users.insert(
            user.id,
            StoredCredentials {
                user: user.clone(),
                password_hash: new_user.password_hash,
            },
        );
        Ok(user)
    }

    async fn find_user(&self, id: UserId) -> StoreResult<Option<User>> {
        let inner = self.inner.read().await;
        Ok(inner.users.get(&id).map(|stored| stored.user.clone()))
    }

    async fn find_credentials(&self, username: &str) -> StoreResult<Option<StoredCredentials>> {
        let inner = self.inner.read().await;
        Ok(inner
            .users
            .values()
            .find(|stored| stored.user.username == username)
            .cloned())
    }

    async fn mark_email_verified(&self, id: UserId) -> StoreResult<bool> {
        let mut inner = self.inner.write().await;
        Ok(match inner.users.get_mut(&id) {
            Some(stored) if !stored.user.email_verified => {
                stored.user.email_verified = true;
                true
            }
            _ => false,
        })
    }
}

#[async_trait]
impl FileCatalog for MemoryStore {
    async fn insert_file(&self, record: FileRecord) -> StoreResult<()> {
        let mut inner = self.inner.write().await;
        if inner.files.contains_key(&record.id) {
            return Err(StoreError::Conflict("file"));
        }
        inner.files.insert(record.id.clone(), record);
        Ok(())
    }

    async fn find_file(&self, id: &FileId) -> StoreResult<Option<FileRecord>> {
        let inner = self.inner.read().await;
        Ok(inner.files.get(id).cloned())
    }

    async fn list_files(&self) -> StoreResult<Vec<FileRecord>> {
        let inner = self.inner.read().await;
        let mut files: Vec<FileRecord> = inner.files.values().cloned().collect();
        files.sort_by(|a, b| {
            b.uploaded_at
                .cmp(&a.uploaded_at)
                .then_with(|| a.id.as_str().cmp(b.id.as_str()))
        });
        Ok(files)
    }
}

#[async_trait]
impl SessionStore for MemoryStore {
    async fn create_session(
        &self,
        token_hash: Vec<u8>,
        user_id: UserId,
        expires_at: i64,
        now: i64,
    ) -> StoreResult<()> {
        let mut inner = self.inner.write().await;
        inner.sessions.retain(|_, (_, expires_at)| *expires_at > now);
        inner.sessions.insert(token_hash, (user_id, expires_at));
        Ok(())
    }

    async fn session_user(&self, token_hash: &[u8], now: i64) -> StoreResult<Option<UserId>> {
        let inner = self.inner.read().await;
        Ok(inner
            .sessions
            .get(token_hash)
            .filter(|(_, expires_at)| *expires_at > now)
            .map(|(user_id, _)| *user_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Role;
    use anyhow::{Context, Result};

    fn new_user(username: &str) -> NewUser {
        NewUser {
            username: username.to_string(),
            email: format!("{username}@example.com"),
            password_hash: "hash".to_string(),
            role: Role::Client,
            email_verified: false,
        }
    }

    #[tokio::test]
    async fn create_assigns_ids_and_rejects_duplicates() -> Result<()> {
        let store = MemoryStore::new();
        let alice = store.create_user(new_user("alice")).await?;
        let bob = store.create_user(new_user("bob")).await?;
        assert_ne!(alice.id, bob.id);

        let duplicate = store.create_user(new_user("alice")).await;
        assert!(matches!(duplicate, Err(StoreError::Conflict("username"))));

        let mut same_email = new_user("carol");
        same_email.email = "bob@example.com".to_string();
        let duplicate = store.create_user(same_email).await;
        assert!(matches!(duplicate, Err(StoreError::Conflict("email"))));
        Ok(())
    }

    #[tokio::test]
    async fn mark_verified_reports_change_once() -> Result<()> {
        let store = MemoryStore::new();
        let user = store.create_user(new_user("alice")).await?;
        assert!(store.mark_email_verified(user.id).await?);
        assert!(!store.mark_email_verified(user.id).await?);
        let reloaded = store.find_user(user.id).await?.context("missing user")?;
        assert!(reloaded.email_verified);
        assert!(!store.mark_email_verified(UserId(999)).await?);
        Ok(())
    }

    #[tokio::test]
    async fn credentials_lookup_by_username() -> Result<()> {
        let store = MemoryStore::new();
        store.create_user(new_user("alice")).await?;
        let found = store.find_credentials("alice").await?.context("missing")?;
        assert_eq!(found.password_hash, "hash");
        assert!(store.find_credentials("nobody").await?.is_none());
        Ok(())
    }

    #[tokio::test]
    async fn files_list_newest_first() -> Result<()> {
        let store = MemoryStore::new();
        for (id, uploaded_at) in [("a", 10), ("b", 30), ("c", 20)] {
            let id = FileId::parse(id).context("id")?;
            store
                .insert_file(FileRecord {
                    blob_key: format!("{id}.docx"),
                    id,
                    uploader: UserId(1),
                    original_filename: "x.docx".to_string(),
                    size_bytes: 1,
                    uploaded_at,
                })
                .await?;
        }
        let ids: Vec<String> = store
            .list_files()
            .await?
            .into_iter()
            .map(|record| record.id.to_string())
            .collect();
        assert_eq!(ids, ["b", "c", "a"]);
        Ok(())
    }

    #[tokio::test]
    async fn sessions_expire() -> Result<()> {
        let store = MemoryStore::new();
        store.create_session(vec![1, 2, 3], UserId(5), 100, 0).await?;
        assert_eq!(store.session_user(&[1, 2, 3], 99).await?, Some(UserId(5)));
        assert_eq!(store.session_user(&[1, 2, 3], 100).await?, None);
        assert_eq!(store.session_user(&[9], 0).await?, None);
        Ok(())
    }

    #[tokio::test]
    async fn expired_sessions_are_pruned_on_create() -> Result<()> {
        let store = MemoryStore::new();
        for n in 0..1000u32 {
            store
                .create_session(n.to_be_bytes().to_vec(), UserId(1), 10, 0)
                .await?;
        }
        assert_eq!(store.inner.read().await.sessions.len(), 1000);

        store.create_session(vec![0xff], UserId(2), 500, 10).await?;
        let inner = store.inner.read().await;
        assert_eq!(inner.sessions.len(), 1);
        assert!(inner.sessions.contains_key([0xff_u8].as_slice()));
        Ok(())
    }
}

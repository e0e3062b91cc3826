//! Postgres-backed store.

use async_trait::async_trait;
use sqlx::{postgres::PgRow, PgPool, Row};
use tracing::Instrument;

use super::{
    FileCatalog, NewUser, SessionStore, StoreError, StoreResult, StoredCredentials, UserDirectory,
};
use crate::model::{FileId, FileRecord, User, UserId};

const SCHEMA_SQL: &str = include_str!("../../db/sql/01_fileshare.sql");

#[derive(Clone, Debug)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Apply the bundled schema. Statements are idempotent.
    ///
    /// # Errors
    /// Returns an error if any statement fails.
    pub async fn migrate(&self) -> StoreResult<()> {
        sqlx::raw_sql(SCHEMA_SQL).execute(&self.pool).await?;
        Ok(())
    }
}

fn db_span(operation: &'static str, statement: &'static str) -> tracing::Span {
    tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = operation,
        db.statement = statement
    )
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => db_err.code().is_some_and(|code| code.as_ref() == "23505"),
        _ => false,
    }
}

fn conflict_target(err: &sqlx::Error) -> &'static str {
    match err {
        sqlx::Error::Database(db_err) => match db_err.constraint() {
            Some(name) if name.contains("email") => "email",
            Some(name) if name.contains("username") => "username",
            _ => "record",
        },
        _ => "record",
    }
}

fn user_from_row(row: &PgRow) -> StoreResult<User> {
    let role: String = row.try_get("role")?;
    Ok(User {
        id: UserId(row.try_get("id")?),
        username: row.try_get("username")?,
        email: row.try_get("email")?,
        role: role.parse().map_err(StoreError::Corrupt)?,
        email_verified: row.try_get("email_verified")?,
    })
}

fn file_from_row(row: &PgRow) -> StoreResult<FileRecord> {
    let id: String = row.try_get("id")?;
    Ok(FileRecord {
        id: FileId::parse(&id).ok_or_else(|| StoreError::Corrupt(format!("file id {id}")))?,
        uploader: UserId(row.try_get("uploader_id")?),
        original_filename: row.try_get("original_filename")?,
        blob_key: row.try_get("blob_key")?,
        size_bytes: row.try_get("size_bytes")?,
        uploaded_at: row.try_get("uploaded_at")?,
    })
}

#[async_trait]
impl UserDirectory for PgStore {
    async fn create_user(&self, new_user: NewUser) -> StoreResult<User> {
        let query = r"
            INSERT INTO users (username, email, password_hash, role, email_verified)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, username, email, role, email_verified
        ";
        let row = sqlx::query(query)
            .bind(&new_user.username)
            .bind(&new_user.email)
            .bind(&new_user.password_hash)
            .bind(new_user.role.as_str())
            .bind(new_user.email_verified)
            .fetch_one(&self.pool)
            .instrument(db_span("INSERT", query))
            .await;

        match row {
            Ok(row) => user_from_row(&row),
            Err(err) if is_unique_violation(&err) => Err(StoreError::Conflict(conflict_target(&err))),
            Err(err) => Err(err.into()),
        }
    }

    async fn find_user(&self, id: UserId) -> StoreResult<Option<User>> {
        let query = "SELECT id, username, email, role, email_verified FROM users WHERE id = $1";
        let row = sqlx::query(query)
            .bind(id.0)
            .fetch_optional(&self.pool)
            .instrument(db_span("SELECT", query))
            .await?;
        row.as_ref().map(user_from_row).transpose()
    }

    async fn find_credentials(&self, username: &str) -> StoreResult<Option<StoredCredentials>> {
        let query = r"
            SELECT id, username, email, role, email_verified, password_hash
            FROM users WHERE username = $1
        ";
        let row = sqlx::query(query)
            .bind(username)
            .fetch_optional(&self.pool)
            .instrument(db_span("SELECT", query))
            .await?;
        match row {
            Some(row) => Ok(Some(StoredCredentials {
                user: user_from_row(&row)?,
                password_hash: row.try_get("password_hash")?,
            })),
            None => Ok(None),
        }
    }

    async fn mark_email_verified(&self, id: UserId) -> StoreResult<bool> {
        let query = "UPDATE users SET email_verified = TRUE WHERE id = $1 AND email_verified = FALSE";
        let result = sqlx::query(query)
            .bind(id.0)
            .execute(&self.pool)
            .instrument(db_span("UPDATE", query))
            .await?;
        Ok(result.rows_affected() == 1)
    }
}

#[async_trait]
impl FileCatalog for PgStore {
    async fn insert_file(&self, record: FileRecord) -> StoreResult<()> {
        let query = r"
            INSERT INTO files (id, uploader_id, original_filename, blob_key, size_bytes, uploaded_at)
            VALUES ($1, $2, $3, $4, $5, $6)
        ";
        let result = sqlx::query(query)
            .bind(record.id.as_str())
            .bind(record.uploader.0)
            .bind(&record.original_filename)
            .bind(&record.blob_key)
            .bind(record.size_bytes)
            .bind(record.uploaded_at)
            .execute(&self.pool)
            .instrument(db_span("INSERT", query))
            .await;

        match result {
            Ok(_) => Ok(()),
            Err(err) if is_unique_violation(&err) => Err(StoreError::Conflict("file")),
            Err(err) => Err(err.into()),
        }
    }

    async fn find_file(&self, id: &FileId) -> StoreResult<Option<FileRecord>> {
        let query = r"
            SELECT id, uploader_id, original_filename, blob_key, size_bytes, uploaded_at
            FROM files WHERE id = $1
        ";
        let row = sqlx::query(query)
            .bind(id.as_str())
            .fetch_optional(&self.pool)
            .instrument(db_span("SELECT", query))
            .await?;
        row.as_ref().map(file_from_row).transpose()
    }

    async fn list_files(&self) -> StoreResult<Vec<FileRecord>> {
        let query = r"
            SELECT id, uploader_id, original_filename, blob_key, size_bytes, uploaded_at
            FROM files ORDER BY uploaded_at DESC, id ASC
        ";
        let rows = sqlx::query(query)
            .fetch_all(&self.pool)
            .instrument(db_span("SELECT", query))
            .await?;
        rows.iter().map(file_from_row).collect()
    }
}

#[async_trait]
impl SessionStore for PgStore {
    async fn create_session(
        &self,
        token_hash: Vec<u8>,
        user_id: UserId,
        expires_at: i64,
        now: i64,
    ) -> StoreResult<()> {
        let prune = "DELETE FROM user_sessions WHERE expires_at <= $1";
        sqlx::query(prune)
            .bind(now)
            .execute(&self.pool)
            .instrument(db_span("DELETE", prune))
            .await?;

        let query = r"
            INSERT INTO user_sessions (session_hash, user_id, expires_at)
            VALUES ($1, $2, $3)
        ";
        sqlx::query(query)
            .bind(token_hash)
            .bind(user_id.0)
            .bind(expires_at)
            .execute(&self.pool)
            .instrument(db_span("INSERT", query))
            .await?;
        Ok(())
    }

    async fn session_user(&self, token_hash: &[u8], now: i64) -> StoreResult<Option<UserId>> {
        let query = "SELECT user_id FROM user_sessions WHERE session_hash = $1 AND expires_at > $2";
        let row = sqlx::query(query)
            .bind(token_hash)
            .bind(now)
            .fetch_optional(&self.pool)
            .instrument(db_span("SELECT", query))
            .await?;
        match row {
            Some(row) => Ok(Some(UserId(row.try_get("user_id")?))),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schema_declares_all_tables() {
        for table in ["users", "files", "user_sessions"] {
            assert!(
                SCHEMA_SQL.contains(&format!("CREATE TABLE IF NOT EXISTS {table}")),
                "missing table {table}"
            );
        }
    }

    #[test]
    fn non_database_errors_are_not_unique_violations() {
        let err = sqlx::Error::RowNotFound;
        assert!(!is_unique_violation(&err));
        assert_eq!(conflict_target(&err), "record");
    }
}

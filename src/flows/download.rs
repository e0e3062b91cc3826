//! Two-step download: request a short-lived link, then fetch with it.

use std::sync::Arc;
use tracing::{error, info, instrument};

use super::{content_type_for, link_url, FlowError, Tokens};
use crate::blob::BlobStore;
use crate::model::{FileId, User};
use crate::store::FileCatalog;
use crate::token::{Denied, MemoryLedger, Purpose, RedemptionLedger, TokenError};

const DOWNLOAD_PATH: &str = "v1/download";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DownloadLink {
    pub download_url: String,
    pub expires_in: i64,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Download {
    pub filename: String,
    pub content_type: &'static str,
    pub bytes: Vec<u8>,
}

pub struct DownloadFlow {
    tokens: Tokens,
    files: Arc<dyn FileCatalog>,
    blobs: Arc<dyn BlobStore>,
    ledger: Option<Arc<dyn RedemptionLedger>>,
    public_base_url: String,
}

impl DownloadFlow {
    /// When the policy marks downloads single-use, a process-local
    /// [`MemoryLedger`] is installed; see [`Self::with_ledger`] to share one.
    #[must_use]
    pub fn new(
        tokens: Tokens,
        files: Arc<dyn FileCatalog>,
        blobs: Arc<dyn BlobStore>,
        public_base_url: impl Into<String>,
    ) -> Self {
        let ledger = tokens
            .policy()
            .rule(Purpose::FileDownload)
            .single_use
            .then(|| Arc::new(MemoryLedger::new()) as Arc<dyn RedemptionLedger>);
        Self {
            tokens,
            files,
            blobs,
            ledger,
            public_base_url: public_base_url.into(),
        }
    }

    #[must_use]
    pub fn with_ledger(mut self, ledger: Arc<dyn RedemptionLedger>) -> Self {
        self.ledger = Some(ledger);
        self
    }

    /// Issue a download link for `file_id` to `requester`.
    ///
    /// # Errors
    /// `Denied(RoleMismatch)` for non-clients, `FileNotFound` for unknown files.
    #[instrument(skip(self, requester), fields(user_id = %requester.id, file_id = %file_id))]
    pub async fn request_link(
        &self,
        file_id: &FileId,
        requester: &User,
    ) -> Result<DownloadLink, FlowError> {
        let file = self.files.find_file(file_id).await?;
        self.tokens
            .guard()
            .authorize_link_request(requester, file.as_ref())
            .map_err(|denied| match denied {
                Denied::ResourceNotFound => FlowError::FileNotFound,
                other => other.into(),
            })?;

        let token = self
            .tokens
            .issue(Purpose::FileDownload, requester.id, Some(file_id))?;
        Ok(DownloadLink {
            download_url: link_url(&self.public_base_url, DOWNLOAD_PATH, &token),
            expires_in: self.tokens.policy().rule(Purpose::FileDownload).ttl_seconds,
        })
    }

    /// Redeem a download token and read the file.
    ///
    /// # Errors
    /// `Token` or `Denied` for any rejection (callers collapse these into one
    /// message), `Store`/`Internal` for storage failures.
    #[instrument(skip_all, fields(user_id = %requester.id))]
    pub async fn fetch(&self, token: &str, requester: &User) -> Result<Download, FlowError> {
        let claims = self.tokens.verify(token, Purpose::FileDownload)?;
        let file = match claims.resource.as_ref() {
            Some(file_id) => self.files.find_file(file_id).await?,
            None => None,
        };
        self.tokens
            .guard()
            .authorize(&claims, requester, file.as_ref())?;
        let file = file.ok_or(Denied::ResourceNotFound)?;

        let Some(bytes) = self.blobs.get(&file.blob_key).await? else {
            error!(file_id = %file.id, blob_key = %file.blob_key, "blob missing for catalogued file");
            return Err(FlowError::Internal(anyhow::anyhow!(
                "blob {} missing",
                file.blob_key
            )));
        };

        // Recorded only once the bytes are in hand so a failed read does not burn the token.
        if let Some(ledger) = &self.ledger {
            if !ledger.first_use(token.trim(), claims.expires_at, self.tokens.signer().now()) {
                return Err(TokenError::AlreadyRedeemed.into());
            }
        }

        info!(file_id = %file.id, "file downloaded");
        Ok(Download {
            content_type: content_type_for(&file.original_filename),
            filename: file.original_filename,
            bytes,
        })
    }
}

use crate::{
    blob::FsBlobStore,
    cli::{commands::vault::Options as VaultOptions, globals::GlobalArgs},
    email::LogEmailSender,
    fileshare::{self, AppConfig, AppState, Backends},
    flows::Tokens,
    store::PgStore,
    token::{Signer, SigningKey, SystemClock, TokenPolicy},
    vault,
};
use anyhow::{anyhow, Context, Result};
use secrecy::{ExposeSecret, SecretString};
use sqlx::postgres::PgPoolOptions;
use std::{sync::Arc, time::Duration};
use tracing::{debug, info, warn};

/// Where the token signing secret comes from.
#[derive(Debug)]
pub enum KeySource {
    Secret(SecretString),
    Vault(VaultOptions),
}

#[derive(Debug)]
pub struct Args {
    pub port: u16,
    pub dsn: Option<String>,
    pub upload_dir: String,
    pub public_base_url: String,
    pub max_upload_bytes: usize,
    pub key_source: KeySource,
    pub email_verify_ttl_seconds: i64,
    pub download_ttl_seconds: i64,
    pub session_ttl_seconds: i64,
    pub single_use_downloads: bool,
}

/// Execute the server action.
/// # Errors
/// Returns an error if the signing key cannot be resolved, the database is
/// unreachable, or the server fails to start.
pub async fn execute(args: Args) -> Result<()> {
    let key = resolve_signing_key(&args.key_source).await?;
    let signer = Signer::new(&key, Arc::new(SystemClock))?;

    let policy = TokenPolicy::new()
        .with_email_verify_ttl_seconds(args.email_verify_ttl_seconds)
        .with_download_ttl_seconds(args.download_ttl_seconds)
        .with_single_use_downloads(args.single_use_downloads);
    let tokens = Tokens::new(Arc::new(signer), policy);

    let backends = match &args.dsn {
        Some(dsn) => {
            let pool = PgPoolOptions::new()
                .min_connections(1)
                .max_connections(5)
                .max_lifetime(Duration::from_secs(60 * 2))
                .test_before_acquire(true)
                .connect(dsn)
                .await
                .context("Failed to connect to database")?;

            let store = PgStore::new(pool);
            store
                .migrate()
                .await
                .context("Failed to apply database schema")?;

            let blobs = FsBlobStore::new(&args.upload_dir)
                .await
                .with_context(|| format!("Failed to prepare upload dir {}", args.upload_dir))?;
            info!("Storing uploads in {}", blobs.root().display());

            Backends::from_store(Arc::new(store), Arc::new(blobs), Arc::new(LogEmailSender))
        }
        None => {
            warn!("No --dsn given: users, files and uploads are kept in memory");
            Backends::in_memory()
        }
    };

    let config = AppConfig::new(args.public_base_url)
        .with_session_ttl_seconds(args.session_ttl_seconds)
        .with_max_upload_bytes(args.max_upload_bytes);

    let state = Arc::new(AppState::new(config, tokens, backends));

    fileshare::new(args.port, state).await
}

async fn resolve_signing_key(source: &KeySource) -> Result<SigningKey> {
    match source {
        KeySource::Secret(secret) => SigningKey::from_secret_string(secret),
        KeySource::Vault(opts) => {
            let mut globals = GlobalArgs::new(opts.url.clone());

            // If vault wrapped token try to unwrap, otherwise use secret-id.
            let secret_id = match (&opts.wrapped_token, &opts.secret_id) {
                (Some(wrapped), _) => vault::unwrap(&globals.vault_url, wrapped).await?,
                (None, Some(secret_id)) => secret_id.clone(),
                (None, None) => return Err(anyhow!("Vault secret-id is required")),
            };

            let (token, lease_duration) =
                vault::approle_login(&globals.vault_url, &secret_id, &opts.role_id).await?;
            debug!("Vault login ok, lease duration {lease_duration}s");
            globals.set_token(SecretString::from(token));

            let secret = vault::kv::read_signing_secret(&globals, &opts.kv_mount, &opts.kv_path)
                .await
                .context("Could not read signing secret from Vault")?;

            SigningKey::from_bytes(secret.expose_secret().clone())
        }
    }
}

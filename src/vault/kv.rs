use crate::{cli::globals::GlobalArgs, fileshare::APP_USER_AGENT, token::MIN_SECRET_LEN, vault};
use anyhow::{anyhow, Context, Result};
use base64ct::{Base64, Encoding};
use reqwest::Client;
use secrecy::{ExposeSecret, SecretBox};
use serde_json::Value;
use tracing::{info_span, instrument, Instrument};

const SIGNING_SECRET_FIELD: &str = "signing_secret_b64";

/// Read the token signing secret from a KV v2 mount.
///
/// # Errors
/// Returns an error if the Vault request fails, the field is missing, or the
/// decoded secret is too short.
#[instrument(skip(globals))]
pub async fn read_signing_secret(
    globals: &GlobalArgs,
    kv_mount: &str,
    kv_path: &str,
) -> Result<SecretBox<Vec<u8>>> {
    let client = Client::builder().user_agent(APP_USER_AGENT).build()?;
    let path = format!("/v1/{kv_mount}/data/{kv_path}");
    let url = vault::endpoint_url(&globals.vault_url, &path)?;

    let span = info_span!(
        "vault.kv.read",
        http.method = "GET",
        url = %url
    );
    let response = client
        .get(&url)
        .header("X-Vault-Token", globals.vault_token.expose_secret())
        .send()
        .instrument(span)
        .await?;

    if !response.status().is_success() {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        return Err(anyhow!("vault kv read failed: {status} {body}"));
    }

    let json: Value = response.json().await?;
    let secret_b64 = json
        .get("data")
        .and_then(|data| data.get("data"))
        .and_then(|data| data.get(SIGNING_SECRET_FIELD))
        .and_then(Value::as_str)
        .context("signing secret missing from vault response")?;

    let decoded = Base64::decode_vec(secret_b64.trim())
        .map_err(|_| anyhow!("signing secret is not valid base64"))?;
    if decoded.len() < MIN_SECRET_LEN {
        return Err(anyhow!(
            "signing secret length is {}, expected at least {}",
            decoded.len(),
            MIN_SECRET_LEN
        ));
    }

    Ok(SecretBox::new(Box::new(decoded)))
}

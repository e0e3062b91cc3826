//! Map parsed arguments to the action the binary runs.

use crate::cli::actions::{create_ops, server, Action};
use crate::cli::commands::{ops_user, server as server_cmd, tokens, vault};
use anyhow::{anyhow, Context, Result};
use secrecy::SecretString;

/// Map validated CLI matches to an action.
///
/// # Errors
/// Returns an error if required arguments are missing or inconsistent.
pub fn handler(matches: &clap::ArgMatches) -> Result<Action> {
    match matches.subcommand() {
        Some((server_cmd::NAME, sub)) => server_action(sub),
        Some((ops_user::NAME, sub)) => ops_user_action(sub),
        Some((other, _)) => Err(anyhow!("unknown subcommand: {other}")),
        None => Err(anyhow!("missing subcommand")),
    }
}

fn server_action(matches: &clap::ArgMatches) -> Result<Action> {
    let port = matches
        .get_one::<u16>(server_cmd::ARG_PORT)
        .copied()
        .unwrap_or(8080);
    let dsn = matches.get_one::<String>(server_cmd::ARG_DSN).cloned();
    let upload_dir = matches
        .get_one::<String>(server_cmd::ARG_UPLOAD_DIR)
        .cloned()
        .context("missing required argument: --upload-dir")?;
    let public_base_url = matches
        .get_one::<String>(server_cmd::ARG_PUBLIC_BASE_URL)
        .cloned()
        .context("missing required argument: --public-base-url")?;
    let max_upload_bytes = matches
        .get_one::<u64>(server_cmd::ARG_MAX_UPLOAD_BYTES)
        .copied()
        .context("missing required argument: --max-upload-bytes")?;
    let max_upload_bytes =
        usize::try_from(max_upload_bytes).context("--max-upload-bytes does not fit in memory")?;

    let token_opts = tokens::Options::parse(matches)?;
    let vault_opts = vault::Options::parse(matches)?;

    let key_source = match (token_opts.signing_secret, vault_opts) {
        (Some(secret), None) => server::KeySource::Secret(secret),
        (None, Some(vault)) => server::KeySource::Vault(vault),
        (Some(_), Some(_)) => {
            return Err(anyhow!(
                "--{} and --{} are mutually exclusive",
                tokens::ARG_SIGNING_SECRET,
                vault::ARG_VAULT_URL
            ))
        }
        (None, None) => {
            return Err(anyhow!(
                "missing required argument: --{} or --{}",
                tokens::ARG_SIGNING_SECRET,
                vault::ARG_VAULT_URL
            ))
        }
    };

    Ok(Action::Server(server::Args {
        port,
        dsn,
        upload_dir,
        public_base_url,
        max_upload_bytes,
        key_source,
        email_verify_ttl_seconds: token_opts.email_verify_ttl_seconds,
        download_ttl_seconds: token_opts.download_ttl_seconds,
        session_ttl_seconds: token_opts.session_ttl_seconds,
        single_use_downloads: token_opts.single_use_downloads,
    }))
}

fn ops_user_action(matches: &clap::ArgMatches) -> Result<Action> {
    let required = |name: &str| -> Result<String> {
        matches
            .get_one::<String>(name)
            .cloned()
            .ok_or_else(|| anyhow!("missing required argument: --{name}"))
    };

    Ok(Action::CreateOpsUser(create_ops::Args {
        dsn: required(ops_user::ARG_DSN)?,
        username: required(ops_user::ARG_USERNAME)?,
        email: required(ops_user::ARG_EMAIL)?,
        password: SecretString::from(required(ops_user::ARG_PASSWORD)?),
    }))
}

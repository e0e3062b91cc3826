use clap::{Arg, ArgAction, ArgMatches, Command};
use secrecy::SecretString;

pub const ARG_SIGNING_SECRET: &str = "signing-secret";
pub const ARG_EMAIL_VERIFY_TTL_SECONDS: &str = "email-verify-ttl-seconds";
pub const ARG_DOWNLOAD_TTL_SECONDS: &str = "download-ttl-seconds";
pub const ARG_SESSION_TTL_SECONDS: &str = "session-ttl-seconds";
pub const ARG_SINGLE_USE_DOWNLOADS: &str = "single-use-downloads";

pub struct Options {
    pub signing_secret: Option<SecretString>,
    pub email_verify_ttl_seconds: i64,
    pub download_ttl_seconds: i64,
    pub session_ttl_seconds: i64,
    pub single_use_downloads: bool,
}

impl Options {
    /// Parse token options from CLI matches.
    ///
    /// # Errors
    /// Returns an error if required arguments are missing.
    pub fn parse(matches: &ArgMatches) -> anyhow::Result<Self> {
        let signing_secret = matches
            .get_one::<String>(ARG_SIGNING_SECRET)
            .map(|secret| SecretString::from(secret.clone()));

        let email_verify_ttl_seconds = matches
            .get_one::<i64>(ARG_EMAIL_VERIFY_TTL_SECONDS)
            .copied()
            .ok_or_else(|| {
                anyhow::anyhow!("missing required argument: --{ARG_EMAIL_VERIFY_TTL_SECONDS}")
            })?;
        let download_ttl_seconds = matches
            .get_one::<i64>(ARG_DOWNLOAD_TTL_SECONDS)
            .copied()
            .ok_or_else(|| anyhow::anyhow!("missing required argument: --{ARG_DOWNLOAD_TTL_SECONDS}"))?;
        let session_ttl_seconds = matches
            .get_one::<i64>(ARG_SESSION_TTL_SECONDS)
            .copied()
            .ok_or_else(|| anyhow::anyhow!("missing required argument: --{ARG_SESSION_TTL_SECONDS}"))?;

        Ok(Self {
            signing_secret,
            email_verify_ttl_seconds,
            download_ttl_seconds,
            session_ttl_seconds,
            single_use_downloads: matches.get_flag(ARG_SINGLE_USE_DOWNLOADS),
        })
    }
}

#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_SIGNING_SECRET)
                .long(ARG_SIGNING_SECRET)
                .help("HMAC secret for verification and download links (at least 32 bytes)")
                .long_help(
                    "HMAC secret for verification and download links (at least 32 bytes). Mutually exclusive with --vault-url, which reads the secret from Vault KV instead.",
                )
                .env("FILESHARE_SIGNING_SECRET")
                .hide_env_values(true),
        )
        .arg(
            Arg::new(ARG_EMAIL_VERIFY_TTL_SECONDS)
                .long(ARG_EMAIL_VERIFY_TTL_SECONDS)
                .help("Lifetime of email verification links in seconds")
                .env("FILESHARE_EMAIL_VERIFY_TTL_SECONDS")
                .default_value("86400")
                .value_parser(clap::value_parser!(i64).range(300..=604_800)),
        )
        .arg(
            Arg::new(ARG_DOWNLOAD_TTL_SECONDS)
                .long(ARG_DOWNLOAD_TTL_SECONDS)
                .help("Lifetime of download links in seconds")
                .env("FILESHARE_DOWNLOAD_TTL_SECONDS")
                .default_value("600")
                .value_parser(clap::value_parser!(i64).range(60..=1_800)),
        )
        .arg(
            Arg::new(ARG_SESSION_TTL_SECONDS)
                .long(ARG_SESSION_TTL_SECONDS)
                .help("Lifetime of login sessions in seconds")
                .env("FILESHARE_SESSION_TTL_SECONDS")
                .default_value("43200")
                .value_parser(clap::value_parser!(i64).range(300..=2_592_000)),
        )
        .arg(
            Arg::new(ARG_SINGLE_USE_DOWNLOADS)
                .long(ARG_SINGLE_USE_DOWNLOADS)
                .help("Reject a download link after its first successful use")
                .env("FILESHARE_SINGLE_USE_DOWNLOADS")
                .action(ArgAction::SetTrue),
        )
}

use clap::{Arg, ArgGroup, Command};

use super::{tokens, vault};

pub const NAME: &str = "server";
pub const ARG_PORT: &str = "port";
pub const ARG_DSN: &str = "dsn";
pub const ARG_UPLOAD_DIR: &str = "upload-dir";
pub const ARG_PUBLIC_BASE_URL: &str = "public-base-url";
pub const ARG_MAX_UPLOAD_BYTES: &str = "max-upload-bytes";

#[must_use]
pub fn command() -> Command {
    let command = Command::new(NAME)
        .about("Run the file sharing API")
        .arg(
            Arg::new(ARG_PORT)
                .short('p')
                .long(ARG_PORT)
                .help("Port to listen on")
                .default_value("8080")
                .env("FILESHARE_PORT")
                .value_parser(clap::value_parser!(u16)),
        )
        .arg(
            Arg::new(ARG_DSN)
                .short('d')
                .long(ARG_DSN)
                .help("Database connection string")
                .long_help(
                    "Database connection string. When absent, users, files, sessions and uploads are kept in memory.",
                )
                .env("FILESHARE_DSN"),
        )
        .arg(
            Arg::new(ARG_UPLOAD_DIR)
                .long(ARG_UPLOAD_DIR)
                .help("Directory where uploaded files are stored")
                .env("FILESHARE_UPLOAD_DIR")
                .default_value("uploads"),
        )
        .arg(
            Arg::new(ARG_PUBLIC_BASE_URL)
                .long(ARG_PUBLIC_BASE_URL)
                .help("Externally reachable base URL used to build verification and download links")
                .env("FILESHARE_PUBLIC_BASE_URL")
                .default_value("http://localhost:8080"),
        )
        .arg(
            Arg::new(ARG_MAX_UPLOAD_BYTES)
                .long(ARG_MAX_UPLOAD_BYTES)
                .help("Largest accepted upload in bytes")
                .env("FILESHARE_MAX_UPLOAD_BYTES")
                .default_value("10485760")
                .value_parser(clap::value_parser!(u64).range(1..=1_073_741_824)),
        );

    let command = tokens::with_args(command);
    vault::with_args(command).group(
        ArgGroup::new("signing-key")
            .args([tokens::ARG_SIGNING_SECRET, vault::ARG_VAULT_URL])
            .required(true)
            .multiple(false),
    )
}

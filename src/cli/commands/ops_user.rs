use clap::{Arg, Command};

pub const NAME: &str = "create-ops-user";
pub const ARG_DSN: &str = "dsn";
pub const ARG_USERNAME: &str = "username";
pub const ARG_EMAIL: &str = "email";
pub const ARG_PASSWORD: &str = "password";

#[must_use]
pub fn command() -> Command {
    Command::new(NAME)
        .about("Create a verified ops user allowed to upload files")
        .arg(
            Arg::new(ARG_DSN)
                .short('d')
                .long(ARG_DSN)
                .help("Database connection string")
                .env("FILESHARE_DSN")
                .required(true),
        )
        .arg(
            Arg::new(ARG_USERNAME)
                .long(ARG_USERNAME)
                .help("Login name of the new ops user")
                .required(true),
        )
        .arg(
            Arg::new(ARG_EMAIL)
                .long(ARG_EMAIL)
                .help("Email address of the new ops user")
                .required(true),
        )
        .arg(
            Arg::new(ARG_PASSWORD)
                .long(ARG_PASSWORD)
                .help("Password of the new ops user")
                .env("FILESHARE_OPS_PASSWORD")
                .hide_env_values(true)
                .required(true),
        )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn requires_all_fields() {
        temp_env::with_vars(
            [
                ("FILESHARE_DSN", None::<&str>),
                ("FILESHARE_OPS_PASSWORD", None),
            ],
            || {
                assert!(command()
                    .try_get_matches_from(vec![NAME, "--username", "ops"])
                    .is_err());
            },
        );
    }

    #[test]
    fn password_from_env() -> anyhow::Result<()> {
        temp_env::with_vars(
            [
                ("FILESHARE_DSN", Some("postgres://localhost/fileshare")),
                ("FILESHARE_OPS_PASSWORD", Some("s3cret-pass")),
            ],
            || {
                let matches = command().try_get_matches_from(vec![
                    NAME,
                    "--username",
                    "ops",
                    "--email",
                    "ops@example.com",
                ])?;
                assert_eq!(
                    matches.get_one::<String>(ARG_PASSWORD).map(String::as_str),
                    Some("s3cret-pass")
                );
                Ok(())
            },
        )
    }
}

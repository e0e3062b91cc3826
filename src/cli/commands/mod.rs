pub mod logging;
pub mod ops_user;
pub mod server;
pub mod tokens;
pub mod vault;

use clap::{
    builder::styling::{AnsiColor, Effects, Styles},
    ColorChoice, Command,
};

#[must_use]
pub fn new() -> Command {
    let styles = Styles::styled()
        .header(AnsiColor::Yellow.on_default() | Effects::BOLD)
        .usage(AnsiColor::Green.on_default() | Effects::BOLD)
        .literal(AnsiColor::Blue.on_default() | Effects::BOLD)
        .placeholder(AnsiColor::Green.on_default());

    let long_version: &'static str = Box::leak(
        format!("{} - {}", env!("CARGO_PKG_VERSION"), crate::GIT_COMMIT_HASH).into_boxed_str(),
    );

    let command = Command::new("fileshare")
        .about("Secure file sharing with signed links")
        .version(env!("CARGO_PKG_VERSION"))
        .long_version(long_version)
        .color(ColorChoice::Auto)
        .styles(styles)
        .subcommand_required(true)
        .arg_required_else_help(true)
        .subcommand(server::command())
        .subcommand(ops_user::command());

    logging::with_args(command)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new() {
        let command = new();

        assert_eq!(command.get_name(), "fileshare");
        assert_eq!(
            command.get_about().map(ToString::to_string),
            Some("Secure file sharing with signed links".to_string())
        );
        assert_eq!(
            command.get_version().map(ToString::to_string),
            Some(env!("CARGO_PKG_VERSION").to_string())
        );
        assert!(command
            .get_subcommands()
            .any(|sub| sub.get_name() == server::NAME));
        assert!(command
            .get_subcommands()
            .any(|sub| sub.get_name() == ops_user::NAME));
    }

    #[test]
    fn test_check_log_level_env() -> anyhow::Result<()> {
        let levels = ["error", "warn", "info", "debug", "trace"];
        for (index, &level) in levels.iter().enumerate() {
            temp_env::with_vars(
                [
                    ("FILESHARE_LOG_LEVEL", Some(level)),
                    (
                        "FILESHARE_SIGNING_SECRET",
                        Some("0123456789abcdef0123456789abcdef"),
                    ),
                    ("FILESHARE_VAULT_URL", None),
                ],
                || -> anyhow::Result<()> {
                    let matches = new().try_get_matches_from(vec!["fileshare", "server"])?;
                    assert_eq!(
                        matches.get_one::<u8>(logging::ARG_VERBOSITY).copied(),
                        Some(u8::try_from(index)?)
                    );
                    Ok(())
                },
            )?;
        }
        Ok(())
    }

    #[test]
    fn test_check_log_level_verbosity() -> anyhow::Result<()> {
        for index in 0..5_usize {
            temp_env::with_vars(
                [
                    ("FILESHARE_LOG_LEVEL", None::<&str>),
                    ("FILESHARE_VAULT_URL", None),
                ],
                || -> anyhow::Result<()> {
                    let mut args = vec![
                        "fileshare".to_string(),
                        "server".to_string(),
                        "--signing-secret".to_string(),
                        "0123456789abcdef0123456789abcdef".to_string(),
                    ];
                    if index > 0 {
                        args.push(format!("-{}", "v".repeat(index)));
                    }

                    let matches = new().try_get_matches_from(args)?;
                    assert_eq!(
                        matches.get_one::<u8>(logging::ARG_VERBOSITY).copied(),
                        Some(u8::try_from(index)?)
                    );
                    Ok(())
                },
            )?;
        }
        Ok(())
    }
}

use crate::api::email::{SmtpConfig, DEFAULT_MAIL_FROM};
use anyhow::{Context, Result};
use clap::{Arg, ArgAction, ArgMatches, Command};
use secrecy::SecretString;

pub const ARG_SMTP_HOST: &str = "smtp-host";
pub const ARG_SMTP_PORT: &str = "smtp-port";
pub const ARG_SMTP_USERNAME: &str = "smtp-username";
pub const ARG_SMTP_PASSWORD: &str = "smtp-password";
pub const ARG_MAIL_FROM: &str = "mail-from";
pub const ARG_MAIL_LOG_ONLY: &str = "mail-log-only";

pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_SMTP_HOST)
                .long(ARG_SMTP_HOST)
                .help("SMTP relay host (STARTTLS)")
                .env("ENERGIA_SMTP_HOST")
                .required_unless_present(ARG_MAIL_LOG_ONLY),
        )
        .arg(
            Arg::new(ARG_SMTP_PORT)
                .long(ARG_SMTP_PORT)
                .help("SMTP relay port")
                .env("ENERGIA_SMTP_PORT")
                .default_value("587")
                .value_parser(clap::value_parser!(u16)),
        )
        .arg(
            Arg::new(ARG_SMTP_USERNAME)
                .long(ARG_SMTP_USERNAME)
                .help("SMTP username")
                .env("ENERGIA_SMTP_USERNAME")
                .required_unless_present(ARG_MAIL_LOG_ONLY),
        )
        .arg(
            Arg::new(ARG_SMTP_PASSWORD)
                .long(ARG_SMTP_PASSWORD)
                .help("SMTP password")
                .env("ENERGIA_SMTP_PASSWORD")
                .hide_env_values(true)
                .required_unless_present(ARG_MAIL_LOG_ONLY),
        )
        .arg(
            Arg::new(ARG_MAIL_FROM)
                .long(ARG_MAIL_FROM)
                .help("Sender mailbox for verification emails")
                .env("ENERGIA_MAIL_FROM")
                .default_value(DEFAULT_MAIL_FROM),
        )
        .arg(
            Arg::new(ARG_MAIL_LOG_ONLY)
                .long(ARG_MAIL_LOG_ONLY)
                .help("Log outgoing mail instead of sending it (local development)")
                .env("ENERGIA_MAIL_LOG_ONLY")
                .action(ArgAction::SetTrue),
        )
}

/// SMTP settings, `None` when mail is only logged.
///
/// # Errors
/// Returns an error if an SMTP argument is missing while delivery is enabled.
pub fn parse(matches: &ArgMatches) -> Result<Option<SmtpConfig>> {
    if matches.get_flag(ARG_MAIL_LOG_ONLY) {
        return Ok(None);
    }

    let host = matches
        .get_one::<String>(ARG_SMTP_HOST)
        .cloned()
        .context("missing required argument: --smtp-host")?;
    let username = matches
        .get_one::<String>(ARG_SMTP_USERNAME)
        .cloned()
        .context("missing required argument: --smtp-username")?;
    let password = matches
        .get_one::<String>(ARG_SMTP_PASSWORD)
        .cloned()
        .map(SecretString::from)
        .context("missing required argument: --smtp-password")?;

    let mut config = SmtpConfig::new(host, username, password);
    if let Some(port) = matches.get_one::<u16>(ARG_SMTP_PORT) {
        config = config.with_port(*port);
    }
    if let Some(from) = matches.get_one::<String>(ARG_MAIL_FROM) {
        config = config.with_from(from.clone());
    }

    Ok(Some(config))
}

//! Map parsed CLI arguments to the action the binary runs.

use crate::cli::actions::{server::Args, Action};
use crate::cli::commands::{self, auth, mail};
use anyhow::{Context, Result};
use secrecy::SecretString;

/// Map validated CLI matches to a server action.
///
/// # Errors
/// Returns an error if required arguments are missing.
pub fn handler(matches: &clap::ArgMatches) -> Result<Action> {
    let port = matches
        .get_one::<u16>(commands::ARG_PORT)
        .copied()
        .unwrap_or(3000);
    let dsn = matches
        .get_one::<String>(commands::ARG_DSN)
        .cloned()
        .map(SecretString::from)
        .context("missing required argument: --dsn")?;

    let auth_opts = auth::Options::parse(matches)?;
    let smtp = mail::parse(matches)?;

    Ok(Action::Server(Args {
        port,
        dsn,
        request_timeout_seconds: commands::request_timeout_seconds(matches),
        base_url: auth_opts.base_url,
        jwt_secret: auth_opts.jwt_secret,
        token_ttl_seconds: auth_opts.token_ttl_seconds,
        bcrypt_cost: auth_opts.bcrypt_cost,
        smtp,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::commands::tests::env_with;
    use secrecy::ExposeSecret;

    #[test]
    fn server_action_from_env() -> Result<()> {
        let vars = env_with(&[
            ("ENERGIA_DSN", "postgres://energia@localhost:5432/energia"),
            ("ENERGIA_BASE_URL", "https://energia.dev"),
            ("ENERGIA_JWT_SECRET", "0123456789abcdef0123456789abcdef"),
            ("ENERGIA_TOKEN_TTL_SECONDS", "900"),
            ("ENERGIA_SMTP_HOST", "smtp.gmail.com"),
            ("ENERGIA_SMTP_USERNAME", "mailer"),
            ("ENERGIA_SMTP_PASSWORD", "hunter2"),
        ]);
        temp_env::with_vars(vars, || -> Result<()> {
            let matches = commands::new().try_get_matches_from(vec!["energia"])?;
            let Action::Server(args) = handler(&matches)?;

            assert_eq!(args.port, 3000);
            assert_eq!(
                args.dsn.expose_secret(),
                "postgres://energia@localhost:5432/energia"
            );
            assert_eq!(args.base_url, "https://energia.dev");
            assert_eq!(args.token_ttl_seconds, 900);
            assert_eq!(args.request_timeout_seconds, 30);
            let smtp = args.smtp.context("smtp config expected")?;
            assert_eq!(smtp.host(), "smtp.gmail.com");
            assert_eq!(smtp.port(), 587);
            Ok(())
        })
    }

    #[test]
    fn log_only_mail_has_no_smtp() -> Result<()> {
        let vars = env_with(&[
            ("ENERGIA_DSN", "postgres://energia@localhost:5432/energia"),
            ("ENERGIA_BASE_URL", "http://localhost:3000"),
            ("ENERGIA_JWT_SECRET", "0123456789abcdef0123456789abcdef"),
            ("ENERGIA_MAIL_LOG_ONLY", "true"),
        ]);
        temp_env::with_vars(vars, || -> Result<()> {
            let matches = commands::new().try_get_matches_from(vec!["energia", "-p", "9000"])?;
            let Action::Server(args) = handler(&matches)?;
            assert_eq!(args.port, 9000);
            assert!(args.smtp.is_none());
            Ok(())
        })
    }
}

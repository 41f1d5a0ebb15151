use crate::api::{
    self,
    email::{LogMailer, Mailer, SmtpConfig, SmtpMailer},
    handlers::auth::{AuthConfig, AuthState, CredentialSigner},
    Services,
};
use crate::cli::telemetry;
use crate::store::PgStore;
use anyhow::{Context, Result};
use secrecy::{ExposeSecret, SecretString};
use std::{fmt, sync::Arc, time::Duration};
use tracing::{debug, info, warn};

pub struct Args {
    pub port: u16,
    pub dsn: SecretString,
    pub request_timeout_seconds: u64,
    pub base_url: String,
    pub jwt_secret: SecretString,
    pub token_ttl_seconds: i64,
    pub bcrypt_cost: u32,
    pub smtp: Option<SmtpConfig>,
}

impl fmt::Debug for Args {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Args")
            .field("port", &self.port)
            .field("dsn", &"[REDACTED]")
            .field("request_timeout_seconds", &self.request_timeout_seconds)
            .field("base_url", &self.base_url)
            .field("jwt_secret", &"[REDACTED]")
            .field("token_ttl_seconds", &self.token_ttl_seconds)
            .field("bcrypt_cost", &self.bcrypt_cost)
            .field("smtp", &self.smtp)
            .finish()
    }
}

/// Execute the server action.
/// # Errors
/// Returns an error if configuration is invalid, the database is unreachable, or the server fails to start.
pub async fn execute(args: Args) -> Result<()> {
    debug!("Server args: {:?}", args);

    let signer = CredentialSigner::new(args.jwt_secret, args.token_ttl_seconds)
        .context("Invalid --jwt-secret")?;
    info!("Credentials expire after {}s", signer.ttl_seconds());
    let auth_config = AuthConfig::new(&args.base_url)
        .context("Invalid --base-url")?
        .with_bcrypt_cost(args.bcrypt_cost);

    let mailer: Arc<dyn Mailer> = match &args.smtp {
        Some(config) => Arc::new(SmtpMailer::new(config).context("Invalid SMTP settings")?),
        None => {
            warn!("Mail delivery disabled, verification links are only logged");
            Arc::new(LogMailer)
        }
    };

    let store = PgStore::connect(args.dsn.expose_secret()).await?;
    store.migrate().await?;
    let store = Arc::new(store);

    let services = Services {
        accounts: store.clone(),
        tokens: store,
        mailer,
        auth: Arc::new(AuthState::new(auth_config, signer)),
    };

    let result = api::new(
        args.port,
        services,
        Duration::from_secs(args.request_timeout_seconds),
    )
    .await;

    telemetry::shutdown_tracer();

    result
}

use crate::api;
use crate::api::handlers::auth::{
    AccessTokenSigner, AuthConfig, AuthState, Environment, FixedWindowThrottle, TracingEventSink,
};
use anyhow::{Context, Result};
use secrecy::{ExposeSecret, SecretString};
use std::{fs, sync::Arc, time::Duration};
use tracing::info;

#[derive(Debug)]
pub struct Args {
    pub port: u16,
    pub dsn: String,
    pub signing_key_path: String,
    pub signing_key_id: String,
    pub token_issuer: String,
    pub token_audience: String,
    pub environment: Environment,
    pub frontend_base_url: String,
    pub login_max_attempts: u32,
    pub login_window_seconds: u64,
}

/// Execute the server action.
///
/// # Errors
/// Returns an error if the signing key cannot be loaded or the server
/// fails to start. A missing or unparseable key fails the process; access
/// token signing never falls back to an insecure default.
pub async fn execute(args: Args) -> Result<()> {
    let pem = SecretString::from(
        fs::read_to_string(&args.signing_key_path).with_context(|| {
            format!("Failed to read signing key: {}", args.signing_key_path)
        })?,
    );
    let signer = AccessTokenSigner::from_pem(pem.expose_secret(), args.signing_key_id)
        .context("Failed to parse signing key")?;

    let throttle = Arc::new(FixedWindowThrottle::new(
        args.login_max_attempts,
        Duration::from_secs(args.login_window_seconds),
    ));

    let auth_config = AuthConfig::new(args.environment)
        .with_token_issuer(args.token_issuer)
        .with_token_audience(args.token_audience)
        .with_frontend_base_url(args.frontend_base_url);

    let auth_state = Arc::new(AuthState::new(
        auth_config,
        signer,
        throttle,
        Arc::new(TracingEventSink),
    ));

    info!("Starting custos in {:?} mode", args.environment);

    api::new(args.port, args.dsn, auth_state).await
}

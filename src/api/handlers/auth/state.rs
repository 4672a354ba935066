//! Auth state and configuration shared across handlers.

use std::str::FromStr;
use std::sync::Arc;

use super::events::EventSink;
use super::jwt::AccessTokenSigner;
use super::throttle::LoginThrottle;

const DEFAULT_TOKEN_ISSUER: &str = "custos";
const DEFAULT_TOKEN_AUDIENCE: &str = "custos-api";
const DEFAULT_FRONTEND_BASE_URL: &str = "https://custos.dev";

/// Deployment environment; drives cookie hardening.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Environment {
    Production,
    Development,
}

impl FromStr for Environment {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_lowercase().as_str() {
            "production" | "prod" => Ok(Self::Production),
            "development" | "dev" => Ok(Self::Development),
            other => Err(format!("unknown environment: {other}")),
        }
    }
}

#[derive(Clone, Debug)]
pub struct AuthConfig {
    environment: Environment,
    token_issuer: String,
    token_audience: String,
    frontend_base_url: String,
}

impl AuthConfig {
    #[must_use]
    pub fn new(environment: Environment) -> Self {
        Self {
            environment,
            token_issuer: DEFAULT_TOKEN_ISSUER.to_string(),
            token_audience: DEFAULT_TOKEN_AUDIENCE.to_string(),
            frontend_base_url: DEFAULT_FRONTEND_BASE_URL.to_string(),
        }
    }

    #[must_use]
    pub fn with_token_issuer(mut self, issuer: String) -> Self {
        self.token_issuer = issuer;
        self
    }

    #[must_use]
    pub fn with_token_audience(mut self, audience: String) -> Self {
        self.token_audience = audience;
        self
    }

    #[must_use]
    pub fn with_frontend_base_url(mut self, url: String) -> Self {
        self.frontend_base_url = url;
        self
    }

    #[must_use]
    pub fn environment(&self) -> Environment {
        self.environment
    }

    #[must_use]
    pub fn token_issuer(&self) -> &str {
        &self.token_issuer
    }

    #[must_use]
    pub fn token_audience(&self) -> &str {
        &self.token_audience
    }

    #[must_use]
    pub fn frontend_base_url(&self) -> &str {
        &self.frontend_base_url
    }

    /// Cookies are marked `Secure` everywhere except local development.
    pub(super) fn cookie_secure(&self) -> bool {
        self.environment == Environment::Production
    }
}

/// Process-wide auth dependencies, injected at construction so tests can
/// swap the throttle and event sink.
pub struct AuthState {
    config: AuthConfig,
    signer: AccessTokenSigner,
    throttle: Arc<dyn LoginThrottle>,
    events: Arc<dyn EventSink>,
}

impl AuthState {
    pub fn new(
        config: AuthConfig,
        signer: AccessTokenSigner,
        throttle: Arc<dyn LoginThrottle>,
        events: Arc<dyn EventSink>,
    ) -> Self {
        Self {
            config,
            signer,
            throttle,
            events,
        }
    }

    #[must_use]
    pub fn config(&self) -> &AuthConfig {
        &self.config
    }

    pub(super) fn signer(&self) -> &AccessTokenSigner {
        &self.signer
    }

    pub(super) fn throttle(&self) -> &dyn LoginThrottle {
        self.throttle.as_ref()
    }

    pub(super) fn events(&self) -> &dyn EventSink {
        self.events.as_ref()
    }
}

#[cfg(test)]
pub(crate) fn test_state() -> Arc<AuthState> {
    use super::events::TracingEventSink;
    use super::jwt::test_key::PRIVATE_KEY_PEM;
    use super::throttle::NoopThrottle;

    let signer = AccessTokenSigner::from_pem(PRIVATE_KEY_PEM, "custos-test").expect("test key");
    Arc::new(AuthState::new(
        AuthConfig::new(Environment::Development),
        signer,
        Arc::new(NoopThrottle),
        Arc::new(TracingEventSink),
    ))
}

//! Session hardening and throttle arguments.

use anyhow::{Context, Result};
use clap::{Arg, Command};

use crate::api::handlers::auth::Environment;

pub const ARG_ENVIRONMENT: &str = "environment";
pub const ARG_FRONTEND_BASE_URL: &str = "frontend-base-url";
pub const ARG_LOGIN_MAX_ATTEMPTS: &str = "login-max-attempts";
pub const ARG_LOGIN_WINDOW_SECONDS: &str = "login-window-seconds";

#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_ENVIRONMENT)
                .long(ARG_ENVIRONMENT)
                .help("Deployment environment, drives cookie hardening (production|development)")
                .env("CUSTOS_ENVIRONMENT")
                .default_value("development"),
        )
        .arg(
            Arg::new(ARG_FRONTEND_BASE_URL)
                .long(ARG_FRONTEND_BASE_URL)
                .help("Frontend origin allowed by CORS")
                .env("CUSTOS_FRONTEND_BASE_URL")
                .default_value("https://custos.dev"),
        )
        .arg(
            Arg::new(ARG_LOGIN_MAX_ATTEMPTS)
                .long(ARG_LOGIN_MAX_ATTEMPTS)
                .help("Failed login attempts per IP before throttling")
                .env("CUSTOS_LOGIN_MAX_ATTEMPTS")
                .default_value("5")
                .value_parser(clap::value_parser!(u32)),
        )
        .arg(
            Arg::new(ARG_LOGIN_WINDOW_SECONDS)
                .long(ARG_LOGIN_WINDOW_SECONDS)
                .help("Throttle window in seconds")
                .env("CUSTOS_LOGIN_WINDOW_SECONDS")
                .default_value("60")
                .value_parser(clap::value_parser!(u64)),
        )
}

#[derive(Debug)]
pub struct Options {
    pub environment: Environment,
    pub frontend_base_url: String,
    pub login_max_attempts: u32,
    pub login_window_seconds: u64,
}

impl Options {
    /// # Errors
    /// Returns an error if the environment name is unknown.
    pub fn parse(matches: &clap::ArgMatches) -> Result<Self> {
        let environment = matches
            .get_one::<String>(ARG_ENVIRONMENT)
            .context("missing argument: --environment")?
            .parse::<Environment>()
            .map_err(|err| anyhow::anyhow!(err))?;
        Ok(Self {
            environment,
            frontend_base_url: matches
                .get_one::<String>(ARG_FRONTEND_BASE_URL)
                .cloned()
                .unwrap_or_else(|| "https://custos.dev".to_string()),
            login_max_attempts: matches
                .get_one::<u32>(ARG_LOGIN_MAX_ATTEMPTS)
                .copied()
                .unwrap_or(5),
            login_window_seconds: matches
                .get_one::<u64>(ARG_LOGIN_WINDOW_SECONDS)
                .copied()
                .unwrap_or(60),
        })
    }
}

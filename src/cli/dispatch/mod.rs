//! Command-line argument dispatch and server initialization.
//!
//! Maps validated CLI arguments to the action to execute, currently only
//! the API server with its full configuration.

use crate::cli::actions::{Action, server::Args};
use crate::cli::commands::{auth, signing};
use anyhow::{Context, Result};

/// Map validated CLI matches to a server action.
///
/// # Errors
/// Returns an error if required arguments are missing or inconsistent.
pub fn handler(matches: &clap::ArgMatches) -> Result<Action> {
    let port = matches.get_one::<u16>("port").copied().unwrap_or(8080);
    let dsn = matches
        .get_one::<String>("dsn")
        .cloned()
        .context("missing required argument: --dsn")?;

    let signing_opts = signing::Options::parse(matches)?;
    let auth_opts = auth::Options::parse(matches)?;

    Ok(Action::Server(Args {
        port,
        dsn,
        signing_key_path: signing_opts.key_path,
        signing_key_id: signing_opts.key_id,
        token_issuer: signing_opts.issuer,
        token_audience: signing_opts.audience,
        environment: auth_opts.environment,
        frontend_base_url: auth_opts.frontend_base_url,
        login_max_attempts: auth_opts.login_max_attempts,
        login_window_seconds: auth_opts.login_window_seconds,
    }))
}

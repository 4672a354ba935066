//! Signing key and token claim arguments.

use anyhow::{Context, Result};
use clap::{Arg, Command};

pub const ARG_SIGNING_KEY_PATH: &str = "signing-key-path";
pub const ARG_SIGNING_KEY_ID: &str = "signing-key-id";
pub const ARG_TOKEN_ISSUER: &str = "token-issuer";
pub const ARG_TOKEN_AUDIENCE: &str = "token-audience";

#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_SIGNING_KEY_PATH)
                .long(ARG_SIGNING_KEY_PATH)
                .help("Path to the RSA private key (PEM) used to sign access tokens")
                .env("CUSTOS_SIGNING_KEY_PATH")
                .required(true),
        )
        .arg(
            Arg::new(ARG_SIGNING_KEY_ID)
                .long(ARG_SIGNING_KEY_ID)
                .help("Key id (kid) placed in access token headers")
                .env("CUSTOS_SIGNING_KEY_ID")
                .default_value("custos-1"),
        )
        .arg(
            Arg::new(ARG_TOKEN_ISSUER)
                .long(ARG_TOKEN_ISSUER)
                .help("Issuer (iss) claim for access tokens")
                .env("CUSTOS_TOKEN_ISSUER")
                .default_value("custos"),
        )
        .arg(
            Arg::new(ARG_TOKEN_AUDIENCE)
                .long(ARG_TOKEN_AUDIENCE)
                .help("Audience (aud) claim for access tokens")
                .env("CUSTOS_TOKEN_AUDIENCE")
                .default_value("custos-api"),
        )
}

#[derive(Debug)]
pub struct Options {
    pub key_path: String,
    pub key_id: String,
    pub issuer: String,
    pub audience: String,
}

impl Options {
    /// # Errors
    /// Returns an error if a required argument is missing.
    pub fn parse(matches: &clap::ArgMatches) -> Result<Self> {
        Ok(Self {
            key_path: matches
                .get_one::<String>(ARG_SIGNING_KEY_PATH)
                .cloned()
                .context("missing required argument: --signing-key-path")?,
            key_id: matches
                .get_one::<String>(ARG_SIGNING_KEY_ID)
                .cloned()
                .unwrap_or_else(|| "custos-1".to_string()),
            issuer: matches
                .get_one::<String>(ARG_TOKEN_ISSUER)
                .cloned()
                .unwrap_or_else(|| "custos".to_string()),
            audience: matches
                .get_one::<String>(ARG_TOKEN_AUDIENCE)
                .cloned()
                .unwrap_or_else(|| "custos-api".to_string()),
        })
    }
}

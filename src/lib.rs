//! # Custos (Session & Token Lifecycle)
//!
//! `custos` is the session and token lifecycle core of a layered admin
//! backend: login with per-IP brute-force throttling, RS256 access token
//! issuance, opaque refresh tokens delivered as hardened cookies, rotation
//! with single-use enforcement, and per-user token cap eviction.
//!
//! ## Token Model
//!
//! - **Access tokens** are short-lived RS256 JWTs, never persisted and never
//!   individually revocable; the short lifetime is the revocation mechanism.
//! - **Refresh tokens** are opaque `cst_`-prefixed secrets; the database
//!   stores only a SHA-256 hash. Presenting one rotates it: the row is
//!   revoked by the same conditional update that validates it, so a secret
//!   can never produce two successor pairs.
//! - **Eviction** keeps each user at the configured cap by revoking the
//!   oldest active tokens at issuance time.
//!
//! ## Device Binding
//!
//! Refresh tokens may be soft-bound to a hashed device fingerprint. A
//! mismatch rejects the rotation and is logged distinctly, but the binding
//! is a risk signal rather than a trust boundary.
//!
//! Token lifetimes and the per-user cap come from the settings store and
//! are fatal when absent; custos never substitutes insecure defaults.

pub mod api;
pub mod cli;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};

pub const APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"),);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_git_commit_hash_format() {
        if GIT_COMMIT_HASH == "unknown" {
            // Acceptable in non-git build environments
            return;
        }
        assert!(
            GIT_COMMIT_HASH.chars().all(|c| c.is_ascii_hexdigit()),
            "GIT_COMMIT_HASH should be a hex string, got: {GIT_COMMIT_HASH}"
        );
        assert!(
            GIT_COMMIT_HASH.len() >= 7,
            "GIT_COMMIT_HASH should be at least 7 characters long, got: {GIT_COMMIT_HASH}"
        );
    }

    #[test]
    fn test_app_user_agent_format() {
        assert!(APP_USER_AGENT.starts_with(env!("CARGO_PKG_NAME")));
        assert!(APP_USER_AGENT.contains(env!("CARGO_PKG_VERSION")));
    }
}

//! Session and token lifecycle.
//!
//! This module coordinates login, refresh token rotation, and logout:
//!
//! - **Login** checks the per-IP throttle, validates credentials against the
//!   identity store, and issues an access/refresh pair.
//! - **Refresh** atomically claims the presented refresh token (revoking it
//!   in the same conditional update that validates it) and issues the
//!   successor pair, enforcing single use under concurrency.
//! - **Eviction** keeps each user at the configured cap by revoking the
//!   oldest active tokens at issuance time; revocation, never deletion,
//!   so the audit trail survives.
//!
//! Refresh secrets and device fingerprints are only ever stored as SHA-256
//! hashes. Token lifetimes come from the settings provider and are fatal
//! when absent; there are no insecure defaults.

mod cookie;
mod credentials;
pub(crate) mod error;
pub(crate) mod events;
pub(crate) mod fingerprint;
mod issuer;
mod jwt;
pub(crate) mod login;
mod rotation;
pub(crate) mod session;
mod state;
mod storage;
pub(crate) mod throttle;
pub(crate) mod types;
mod utils;

pub use events::{AuthEvent, EventSink, TracingEventSink};
pub use jwt::{AccessTokenClaims, AccessTokenSigner, JwtError};
pub use state::{AuthConfig, AuthState, Environment};
pub use throttle::{FixedWindowThrottle, LoginThrottle, NoopThrottle};

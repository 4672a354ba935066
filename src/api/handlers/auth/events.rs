//! Structured events emitted by the session/token lifecycle.
//!
//! Core flows accumulate events alongside their result; handlers drain them
//! into an [`EventSink`] after the response is decided. Payloads carry
//! identifiers, short hashes, and reasons; never passwords or raw secrets.

use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use super::error::{AuthFailure, TokenFailure};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum AuthEvent {
    LoginAttempt {
        username: String,
    },
    LoginFailed {
        username: String,
        reason: AuthFailure,
    },
    LoginRateLimited {
        ip: String,
    },
    LoginSucceeded {
        user_id: Uuid,
    },
    TokensEvicted {
        user_id: Uuid,
        revoked: u64,
    },
    TokenIssued {
        user_id: Uuid,
        jti: String,
        fingerprint: Option<String>,
    },
    RefreshFailed {
        reason: TokenFailure,
    },
    FingerprintMismatch {
        token_id: Uuid,
        presented: String,
    },
    RefreshSucceeded {
        user_id: Uuid,
    },
    LoggedOut {
        token_revoked: bool,
    },
}

impl AuthEvent {
    /// Mismatches and rejections are warnings; the rest is informational.
    const fn is_warning(&self) -> bool {
        matches!(
            self,
            Self::LoginFailed { .. }
                | Self::LoginRateLimited { .. }
                | Self::RefreshFailed { .. }
                | Self::FingerprintMismatch { .. }
        )
    }
}

/// Fire-and-forget sink for [`AuthEvent`]s. Implementations must never block
/// or fail the calling flow.
pub trait EventSink: Send + Sync {
    fn publish(&self, event: &AuthEvent);

    fn publish_all(&self, events: &[AuthEvent]) {
        for event in events {
            self.publish(event);
        }
    }
}

/// Default sink: structured log lines via `tracing`.
#[derive(Clone, Debug)]
pub struct TracingEventSink;

impl EventSink for TracingEventSink {
    fn publish(&self, event: &AuthEvent) {
        // Serialization of a closed enum of plain fields cannot fail; fall
        // back to Debug just in case rather than dropping the event.
        let payload = serde_json::to_string(event).unwrap_or_else(|_| format!("{event:?}"));
        if event.is_warning() {
            warn!(target: "custos::auth_event", "{payload}");
        } else {
            info!(target: "custos::auth_event", "{payload}");
        }
    }
}

#[cfg(test)]
#[derive(Debug, Default)]
pub(crate) struct CollectingSink(std::sync::Mutex<Vec<AuthEvent>>);

#[cfg(test)]
impl CollectingSink {
    pub(crate) fn drained(&self) -> Vec<AuthEvent> {
        self.0.lock().map(|events| events.clone()).unwrap_or_default()
    }
}

#[cfg(test)]
impl EventSink for CollectingSink {
    fn publish(&self, event: &AuthEvent) {
        if let Ok(mut events) = self.0.lock() {
            events.push(event.clone());
        }
    }
}

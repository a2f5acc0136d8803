//! Slack adapter errors.

use smug_transport::TransportError;
use thiserror::Error;

/// Errors returned by the Slack Web API client.
#[derive(Debug, Clone, Error)]
pub enum SlackError {
    /// Slack answered with `"ok": false`.
    #[error("slack method {method} failed: {error}")]
    Api { method: String, error: String },

    /// The HTTP exchange itself failed.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// Slack answered with a payload we could not understand.
    #[error("unexpected response from {method}: {reason}")]
    Decode { method: String, reason: String },
}

impl SlackError {
    /// Returns `true` if Slack rejected the token.
    pub fn is_auth_failure(&self) -> bool {
        matches!(
            self,
            Self::Api { error, .. }
                if matches!(error.as_str(), "invalid_auth" | "not_authed" | "account_inactive" | "token_revoked")
        )
    }
}

/// Result type for Slack operations.
pub type SlackResult<T> = Result<T, SlackError>;

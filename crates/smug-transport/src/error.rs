//! Errors raised by the HTTP transport.

use thiserror::Error;

/// Errors that can occur while talking HTTP.
#[derive(Debug, Clone, Error)]
pub enum TransportError {
    /// The underlying client could not be constructed.
    #[error("failed to build HTTP client: {0}")]
    Build(String),

    /// The request never produced a response (connect failure, timeout...).
    #[error("request to {url} failed: {reason}")]
    Request {
        /// Target URL.
        url: String,
        /// Reason for failure.
        reason: String,
    },

    /// The server answered with a non-2xx status.
    #[error("HTTP {status} from {url}: {body}")]
    Status {
        /// Target URL.
        url: String,
        /// Response status code.
        status: u16,
        /// Response body, possibly empty.
        body: String,
    },

    /// The response body could not be decoded.
    #[error("failed to decode response from {url}: {reason}")]
    Decode {
        /// Target URL.
        url: String,
        /// Reason for failure.
        reason: String,
    },

    /// A configured header name or value is not valid HTTP.
    #[error("invalid header '{name}': {reason}")]
    InvalidHeader {
        /// Header name as configured.
        name: String,
        /// Reason for failure.
        reason: String,
    },

    /// An HTTP method other than GET or POST was requested.
    #[error("unsupported HTTP method '{0}'")]
    InvalidMethod(String),
}

impl TransportError {
    pub(crate) fn request(url: &str, err: impl ToString) -> Self {
        Self::Request {
            url: url.to_string(),
            reason: err.to_string(),
        }
    }

    pub(crate) fn decode(url: &str, err: impl ToString) -> Self {
        Self::Decode {
            url: url.to_string(),
            reason: err.to_string(),
        }
    }

    /// Returns `true` if the request timed out or could not connect.
    pub fn is_unreachable(&self) -> bool {
        matches!(self, Self::Request { .. })
    }
}

/// Result type for transport operations.
pub type TransportResult<T> = Result<T, TransportError>;

//! Unified error types for the smug core.
//!
//! Broker-level failures are described by [`BrokerError`]; dispatcher
//! bookkeeping failures by [`DispatchError`].

use thiserror::Error;

// =============================================================================
// Broker Errors
// =============================================================================

/// Errors a broker can report from its lifecycle methods.
#[derive(Debug, Clone, Error)]
pub enum BrokerError {
    /// The network rejected the broker's credentials.
    ///
    /// This is the only error that escalates to process termination.
    #[error("authentication failed for broker '{broker}': {reason}")]
    Authentication {
        /// The broker that failed to authenticate.
        broker: String,
        /// Reason reported by the network.
        reason: String,
    },

    /// Activate was called on a broker whose setup never completed.
    #[error("broker '{0}' was activated before setup")]
    NotSetUp(String),

    /// The broker's configuration is unusable.
    #[error("invalid configuration for broker '{broker}': {reason}")]
    InvalidConfig {
        /// The broker being configured.
        broker: String,
        /// What is wrong with it.
        reason: String,
    },

    /// Any other broker failure.
    #[error("broker error: {0}")]
    Internal(String),
}

impl BrokerError {
    /// Creates an authentication error.
    pub fn authentication(broker: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Authentication {
            broker: broker.into(),
            reason: reason.into(),
        }
    }

    /// Creates an invalid configuration error.
    pub fn invalid_config(broker: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidConfig {
            broker: broker.into(),
            reason: reason.into(),
        }
    }

    /// Returns `true` for errors that must terminate the process.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Authentication { .. })
    }
}

// =============================================================================
// Dispatch Errors
// =============================================================================

/// Errors raised by [`Dispatcher`](crate::Dispatcher) registry operations.
#[derive(Debug, Clone, Error)]
pub enum DispatchError {
    /// No broker with this name is registered.
    #[error("broker '{0}' not found")]
    BrokerNotFound(String),

    /// A broker with this name is already registered.
    #[error("broker '{0}' is already registered")]
    BrokerExists(String),
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Result type for broker operations.
pub type BrokerResult<T> = Result<T, BrokerError>;

/// Result type for dispatcher operations.
pub type DispatchResult<T> = Result<T, DispatchError>;

//! Pattern construction errors.

use thiserror::Error;

/// Reasons a configured pattern is rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PatternError {
    /// The target URL is not an http(s) URL.
    #[error("pattern '{pattern}': url '{url}' must begin with http:// or https://")]
    InvalidUrl { pattern: String, url: String },

    /// The method is neither GET nor POST.
    #[error("pattern '{pattern}': method '{method}' must be either GET or POST")]
    InvalidMethod { pattern: String, method: String },

    /// The regex does not compile.
    #[error("pattern '{pattern}': error compiling regex: {reason}")]
    InvalidRegex { pattern: String, reason: String },

    /// A static header is not valid HTTP.
    #[error("pattern '{pattern}': {reason}")]
    InvalidHeader { pattern: String, reason: String },
}

/// Result type for pattern construction.
pub type PatternResult<T> = Result<T, PatternError>;

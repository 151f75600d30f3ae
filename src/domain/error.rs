//! Domain-level errors (no external dependencies)

use std::num::{ParseFloatError, ParseIntError};

use num_bigint::ParseBigIntError;
use thiserror::Error;

/// Domain errors represent structural violations in keys and paths.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error("invalid key '{key}': {reason}")]
    InvalidKey { key: String, reason: String },
}

impl DomainError {
    pub fn invalid_key(key: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidKey {
            key: key.into(),
            reason: reason.into(),
        }
    }
}

/// Errors raised while converting between native values and store text.
///
/// Converters never swallow these: malformed text reaches the caller.
#[derive(Error, Debug)]
pub enum ConvertError {
    #[error("invalid integer '{text}': {source}")]
    ParseInt {
        text: String,
        #[source]
        source: ParseIntError,
    },

    #[error("invalid float '{text}': {source}")]
    ParseFloat {
        text: String,
        #[source]
        source: ParseFloatError,
    },

    #[error("invalid long integer '{text}': {source}")]
    ParseBigInt {
        text: String,
        #[source]
        source: ParseBigIntError,
    },

    #[error("invalid mac address '{text}': {reason}")]
    Mac { text: String, reason: String },

    #[error("invalid s-expression '{text}': {message}")]
    Sxp { text: String, message: String },

    #[error("value {text} is out of range for '{tag}'")]
    OutOfRange { tag: String, text: String },

    #[error("converter '{tag}' cannot encode a {found} value")]
    TypeMismatch { tag: String, found: &'static str },
}

/// Result type for value conversions.
pub type ConvertResult<T> = Result<T, ConvertError>;

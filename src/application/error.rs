//! Application-level errors (wraps domain and store errors)

use generational_arena::Index;
use thiserror::Error;

use crate::domain::{ConvertError, DomainError};
use crate::infrastructure::StoreError;

/// Errors raised by the tree engine, converter registry and field bindings.
#[derive(Error, Debug)]
pub enum ApplicationError {
    #[error("{0}")]
    Domain(#[from] DomainError),

    #[error("{0}")]
    Convert(#[from] ConvertError),

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("not found: '{path}'")]
    NotFound { path: String },

    #[error("configuration error: {message}")]
    Configuration { message: String },

    #[error("cannot assign through attribute '{attr}': {reason}")]
    InvalidTarget { attr: String, reason: String },

    #[error("node is not bound to a store: '{path}'")]
    Unbound { path: String },

    #[error("node no longer exists in tree: {0:?}")]
    StaleNode(Index),
}

impl ApplicationError {
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

/// Result type for application layer operations.
pub type ApplicationResult<T> = Result<T, ApplicationError>;

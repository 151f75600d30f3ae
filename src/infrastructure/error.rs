//! Store-level errors

use thiserror::Error;

/// Failures surfaced by a backing store.
///
/// The tree engine never retries these; they propagate to the caller.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("I/O error: {context}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{backend} store does not support {operation}")]
    Unsupported {
        backend: &'static str,
        operation: &'static str,
    },

    #[error("domain {domid}: {message}")]
    Domain { domid: u32, message: String },
}

impl StoreError {
    /// Create an I/O error with context.
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }
}

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

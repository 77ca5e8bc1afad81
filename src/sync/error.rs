//! Error type shared by all sync adapter implementations.

use std::error::Error;
use thiserror::Error;

/// Result alias for sync adapter operations.
pub type SyncResult<T> = Result<T, SyncError>;

/// Error raised by sync adapters regardless of the hosted backend.
#[derive(Debug, Error)]
pub enum SyncError {
    /// A record with this identity already exists.
    #[error("record `{id}` already exists")]
    Duplicate {
        /// Identity of the conflicting record.
        id: String,
    },
    /// The targeted record does not exist.
    #[error("record `{id}` not found")]
    NotFound {
        /// Identity of the missing record.
        id: String,
    },
    /// The backend rejected or could not complete a write.
    #[error("sync backend unavailable: {message}")]
    Unavailable {
        /// Human-readable context for the failure.
        message: String,
        /// Underlying backend error.
        #[source]
        source: Box<dyn Error + Send + Sync>,
    },
}

impl SyncError {
    /// Construct an unavailable error from any backend failure.
    pub fn unavailable(message: String, source: impl Error + Send + Sync + 'static) -> Self {
        SyncError::Unavailable {
            message,
            source: Box::new(source),
        }
    }
}

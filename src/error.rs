//! Service-level error taxonomy.

use thiserror::Error;
use validator::ValidationErrors;

use crate::sync::error::SyncError;

/// Errors surfaced by service layer operations.
///
/// Core-logic guards (turn check, ready check, already-picked check) are
/// *not* represented here: they fail closed as silent no-ops because the
/// authoritative truth is always the next snapshot. Only input validation,
/// missing rooms, and adapter I/O failures become user-visible errors.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// The sync backend rejected or could not complete an operation.
    ///
    /// The local state machine does not assume the mutation applied and
    /// waits for the next authoritative snapshot; the action is retryable.
    #[error("sync backend unavailable")]
    Unavailable(#[source] SyncError),
    /// Invalid input provided before any network interaction.
    #[error("invalid input: {0}")]
    InvalidInput(String),
    /// Operation cannot be performed in the current state.
    #[error("invalid state: {0}")]
    InvalidState(String),
    /// Requested room was not found.
    #[error("not found: {0}")]
    NotFound(String),
}

impl From<SyncError> for ServiceError {
    fn from(err: SyncError) -> Self {
        match err {
            SyncError::NotFound { id } => ServiceError::NotFound(format!("room `{id}` not found")),
            SyncError::Duplicate { id } => {
                ServiceError::InvalidState(format!("record `{id}` already exists"))
            }
            err @ SyncError::Unavailable { .. } => ServiceError::Unavailable(err),
        }
    }
}

impl From<ValidationErrors> for ServiceError {
    fn from(err: ValidationErrors) -> Self {
        ServiceError::InvalidInput(format!("validation failed: {err}"))
    }
}

use thiserror::Error;

use super::{
    models::{ContactId, EntryKey, TaskKey},
    validation::ValidationErrors,
};

/// Errors that can occur during board operations.
#[derive(Debug, Error)]
pub enum BoardError {
    #[error("store request failed: {0}")]
    Store(String),
    #[error("store rejected the credentials")]
    Unauthorized,
    /// The node changed between the versioned read and the conditional write.
    #[error("stored data changed since it was read")]
    VersionMismatch,
    #[error("validation failed: {0}")]
    Validation(ValidationErrors),
    #[error("task not found: {0}")]
    TaskNotFound(TaskKey),
    #[error("contact not found: {0}")]
    ContactNotFound(ContactId),
    #[error("subtask not found: {0}")]
    SubtaskNotFound(EntryKey),
    #[error("corrupt {kind} record {key}: {reason}")]
    CorruptRecord {
        kind: &'static str,
        key: String,
        reason: String,
    },
    #[error("gave up rewriting {path} after {attempts} conflicting writes")]
    Conflict { path: String, attempts: u32 },
}

impl BoardError {
    pub fn store(msg: impl Into<String>) -> Self {
        Self::Store(msg.into())
    }

    pub fn corrupt(kind: &'static str, key: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::CorruptRecord {
            kind,
            key: key.into(),
            reason: reason.into(),
        }
    }
}

impl From<ValidationErrors> for BoardError {
    fn from(errors: ValidationErrors) -> Self {
        Self::Validation(errors)
    }
}

/// Login failures of the user directory.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("no user registered with that email")]
    UnknownEmail,
    #[error("wrong password")]
    InvalidCredentials,
    #[error(transparent)]
    Board(#[from] BoardError),
}

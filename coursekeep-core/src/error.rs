//! Error types for coursekeep operations

use crate::ResourceKind;
use thiserror::Error;

/// PostgreSQL `unique_violation` SQLSTATE, surfaced by the remote store on a
/// duplicate insert.
pub const UNIQUE_VIOLATION_CODE: &str = "23505";

/// Structural classification of a remote-store failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RemoteErrorKind {
    /// The remote uniqueness constraint rejected an insert.
    Duplicate,
    /// Any other failure, including timeouts and transport errors.
    Other,
}

/// Error returned by the remote-store collaborator.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{kind:?} remote error{}: {message}", code_suffix(.code))]
pub struct RemoteError {
    pub kind: RemoteErrorKind,
    pub code: Option<String>,
    pub message: String,
}

fn code_suffix(code: &Option<String>) -> String {
    code.as_deref()
        .map(|c| format!(" [{c}]"))
        .unwrap_or_default()
}

impl RemoteError {
    /// Classify an error by its stable code.
    pub fn classify(code: Option<&str>, message: impl Into<String>) -> Self {
        let kind = match code {
            Some(UNIQUE_VIOLATION_CODE) => RemoteErrorKind::Duplicate,
            _ => RemoteErrorKind::Other,
        };
        Self {
            kind,
            code: code.map(str::to_string),
            message: message.into(),
        }
    }

    /// A uniqueness violation on `kind`'s table.
    pub fn duplicate(kind: ResourceKind) -> Self {
        Self {
            kind: RemoteErrorKind::Duplicate,
            code: Some(UNIQUE_VIOLATION_CODE.to_string()),
            message: format!(
                "duplicate key value violates unique constraint on {}",
                kind.table()
            ),
        }
    }

    /// A failure that is not a uniqueness violation.
    pub fn other(message: impl Into<String>) -> Self {
        Self {
            kind: RemoteErrorKind::Other,
            code: None,
            message: message.into(),
        }
    }

    pub fn is_duplicate(&self) -> bool {
        self.kind == RemoteErrorKind::Duplicate
    }
}

/// Failure taxonomy of the synchronization layer.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SyncError {
    #[error("Operation requires an identified session")]
    Unauthenticated,

    #[error("Record already exists")]
    DuplicateConflict,

    #[error("Remote store failure: {0}")]
    Remote(RemoteError),

    #[error("Response arrived after the cache moved on and was discarded")]
    StaleReadRace,
}

impl From<RemoteError> for SyncError {
    fn from(err: RemoteError) -> Self {
        if err.is_duplicate() {
            SyncError::DuplicateConflict
        } else {
            SyncError::Remote(err)
        }
    }
}

/// Result type alias for coursekeep operations.
pub type SyncResult<T> = Result<T, SyncError>;

// =============================================================================
// TESTS
// =============================================================================

//! Classified result of a mutation.

use crate::SyncError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// What a `create` or `remove` call achieved.
///
/// `Success` and `AlreadyDone` both mean the desired end-state holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Outcome {
    Success,
    AlreadyDone,
    BlockedUnauthenticated,
    Failed,
}

impl Outcome {
    /// Resolve a mutation error into its outcome.
    ///
    /// `Unauthenticated` and `DuplicateConflict` never escalate to `Failed`.
    pub fn from_sync_error(err: &SyncError) -> Self {
        match err {
            SyncError::Unauthenticated => Outcome::BlockedUnauthenticated,
            SyncError::DuplicateConflict => Outcome::AlreadyDone,
            SyncError::Remote(_) | SyncError::StaleReadRace => Outcome::Failed,
        }
    }

    /// Whether the desired end-state now holds.
    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success | Outcome::AlreadyDone)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Outcome::Success => "success",
            Outcome::AlreadyDone => "already-done",
            Outcome::BlockedUnauthenticated => "blocked-unauthenticated",
            Outcome::Failed => "failed",
        }
    }
}

impl<T> From<&Result<T, SyncError>> for Outcome {
    fn from(result: &Result<T, SyncError>) -> Self {
        match result {
            Ok(_) => Outcome::Success,
            Err(err) => Outcome::from_sync_error(err),
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::RemoteError;

    #[test]
    fn test_error_mapping() {
        assert_eq!(
            Outcome::from_sync_error(&SyncError::Unauthenticated),
            Outcome::BlockedUnauthenticated
        );
        assert_eq!(
            Outcome::from_sync_error(&SyncError::DuplicateConflict),
            Outcome::AlreadyDone
        );
        assert_eq!(
            Outcome::from_sync_error(&SyncError::Remote(RemoteError::other("boom"))),
            Outcome::Failed
        );
    }

    #[test]
    fn test_success_categories() {
        assert!(Outcome::Success.is_success());
        assert!(Outcome::AlreadyDone.is_success());
        assert!(!Outcome::Failed.is_success());
        assert!(!Outcome::BlockedUnauthenticated.is_success());
    }

    #[test]
    fn test_from_result() {
        let ok: Result<(), SyncError> = Ok(());
        assert_eq!(Outcome::from(&ok), Outcome::Success);
        let dup: Result<(), SyncError> = Err(SyncError::DuplicateConflict);
        assert_eq!(Outcome::from(&dup), Outcome::AlreadyDone);
    }

    #[test]
    fn test_serializes_kebab_case() {
        let json = serde_json::to_string(&Outcome::BlockedUnauthenticated).unwrap();
        assert_eq!(json, "\"blocked-unauthenticated\"");
    }
}

//! Coursekeep Core - Record Types
//!
//! Pure data structures and pure functions. All other crates depend on this.
//! Nothing in this crate performs I/O.

pub mod enums;
pub mod error;
pub mod identity;
pub mod outcome;
pub mod record;
pub mod view;

// ============================================================================
// RE-EXPORTS
// ============================================================================

pub use enums::{AppRole, FetchOrder, ResourceKind, UnknownRole};
pub use error::{RemoteError, RemoteErrorKind, SyncError, SyncResult, UNIQUE_VIOLATION_CODE};
pub use identity::{
    CourseId, EntityIdType, InstructorId, LessonId, PostId, RecordId, Timestamp, UserId,
};
pub use outcome::Outcome;
pub use record::{
    Enrollment, InstructorFollow, KeyType, LessonProgress, NewRecord, NoSubKey, Record,
    RecordKey, Resource, RoleAssignment, SavedPost,
};

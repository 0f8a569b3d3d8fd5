//! Record structures shared by every synchronized resource.
//!
//! A record is one user-owned relational fact: "user U is enrolled in course
//! C", "user U completed lesson L of course C", and so on. The five concrete
//! resources only differ in the types of their keys and in a few remote-store
//! properties, so they are expressed as marker types implementing
//! [`Resource`] and share the generic [`Record`] shape.

use crate::{
    AppRole, CourseId, FetchOrder, InstructorId, LessonId, PostId, RecordId, ResourceKind,
    Timestamp, UserId,
};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::Hash;

/// Bounds shared by resource and secondary keys.
pub trait KeyType:
    Copy + Eq + Hash + fmt::Debug + fmt::Display + Serialize + DeserializeOwned + Send + Sync + 'static
{
}

impl<T> KeyType for T where
    T: Copy
        + Eq
        + Hash
        + fmt::Debug
        + fmt::Display
        + Serialize
        + DeserializeOwned
        + Send
        + Sync
        + 'static
{
}

/// Placeholder secondary key for resources keyed by a single identifier.
///
/// The type has no values, so `Option<NoSubKey>` is always `None`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NoSubKey {}

impl fmt::Display for NoSubKey {
    fn fmt(&self, _f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {}
    }
}

/// A user-scoped resource type synchronized between cache and remote store.
pub trait Resource:
    fmt::Debug + Clone + Copy + PartialEq + Eq + Hash + Default + Send + Sync + 'static
{
    /// Primary key within the owner's records (course id, post id, role...).
    type Key: KeyType;
    /// Secondary key, or [`NoSubKey`].
    type SubKey: KeyType;

    const KIND: ResourceKind;
    /// Whether the remote store enforces one record per key.
    const UNIQUE: bool = true;
    const ORDER: FetchOrder = FetchOrder::Unordered;
}

/// Enrollment of a user in a course.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Enrollment;

impl Resource for Enrollment {
    type Key = CourseId;
    type SubKey = NoSubKey;
    const KIND: ResourceKind = ResourceKind::Enrollment;
    const ORDER: FetchOrder = FetchOrder::CreatedAtDesc;
}

/// Completion of one lesson within a course.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct LessonProgress;

impl Resource for LessonProgress {
    type Key = CourseId;
    type SubKey = LessonId;
    const KIND: ResourceKind = ResourceKind::LessonProgress;
}

/// A user following an instructor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct InstructorFollow;

impl Resource for InstructorFollow {
    type Key = InstructorId;
    type SubKey = NoSubKey;
    const KIND: ResourceKind = ResourceKind::InstructorFollow;
}

/// A post bookmarked by a user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct SavedPost;

impl Resource for SavedPost {
    type Key = PostId;
    type SubKey = NoSubKey;
    const KIND: ResourceKind = ResourceKind::SavedPost;
}

/// A role granted to a user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct RoleAssignment;

impl Resource for RoleAssignment {
    type Key = AppRole;
    type SubKey = NoSubKey;
    const KIND: ResourceKind = ResourceKind::RoleAssignment;
    const UNIQUE: bool = false;
}

// ============================================================================
// RECORDS
// ============================================================================

/// A stored record as returned by the remote store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(bound = "")]
pub struct Record<R: Resource> {
    pub id: RecordId,
    pub owner_user_id: UserId,
    pub resource_key: R::Key,
    pub secondary_key: Option<R::SubKey>,
    pub created_at: Timestamp,
}

impl<R: Resource> Record<R> {
    /// The key this record occupies.
    pub fn key(&self) -> RecordKey<R> {
        RecordKey {
            resource_key: self.resource_key,
            secondary_key: self.secondary_key,
        }
    }

    /// Whether `key` selects this record.
    pub fn matches(&self, key: &RecordKey<R>) -> bool {
        key.matches(self)
    }
}

/// A record about to be inserted; the remote store assigns id and timestamp.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(bound = "")]
pub struct NewRecord<R: Resource> {
    pub owner_user_id: UserId,
    pub resource_key: R::Key,
    pub secondary_key: Option<R::SubKey>,
}

impl<R: Resource> NewRecord<R> {
    pub fn new(owner_user_id: UserId, key: RecordKey<R>) -> Self {
        Self {
            owner_user_id,
            resource_key: key.resource_key,
            secondary_key: key.secondary_key,
        }
    }

    pub fn key(&self) -> RecordKey<R> {
        RecordKey {
            resource_key: self.resource_key,
            secondary_key: self.secondary_key,
        }
    }

    /// Materialize with server-assigned fields.
    pub fn into_record(self, id: RecordId, created_at: Timestamp) -> Record<R> {
        Record {
            id,
            owner_user_id: self.owner_user_id,
            resource_key: self.resource_key,
            secondary_key: self.secondary_key,
            created_at,
        }
    }
}

/// Selects records by resource key and, optionally, secondary key.
///
/// A key without a secondary part selects every record with that resource
/// key; with a secondary part it selects only the exact pair.
#[derive(Debug, PartialEq, Eq, Hash)]
pub struct RecordKey<R: Resource> {
    pub resource_key: R::Key,
    pub secondary_key: Option<R::SubKey>,
}

impl<R: Resource> Clone for RecordKey<R> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<R: Resource> Copy for RecordKey<R> {}

impl<R: Resource> RecordKey<R> {
    pub fn new(resource_key: R::Key) -> Self {
        Self {
            resource_key,
            secondary_key: None,
        }
    }

    pub fn with_sub(resource_key: R::Key, secondary_key: R::SubKey) -> Self {
        Self {
            resource_key,
            secondary_key: Some(secondary_key),
        }
    }

    pub fn matches(&self, record: &Record<R>) -> bool {
        record.resource_key == self.resource_key
            && match self.secondary_key {
                Some(sub) => record.secondary_key == Some(sub),
                None => true,
            }
    }

    /// Exact slot equality, used for the uniqueness rule.
    pub fn same_slot(&self, record: &Record<R>) -> bool {
        record.resource_key == self.resource_key && record.secondary_key == self.secondary_key
    }
}

impl<R: Resource> fmt::Display for RecordKey<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.secondary_key {
            Some(sub) => write!(f, "{}/{}", self.resource_key, sub),
            None => write!(f, "{}", self.resource_key),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::EntityIdType;
    use chrono::Utc;

    fn progress(course: CourseId, lesson: LessonId) -> Record<LessonProgress> {
        NewRecord::new(UserId::now_v7(), RecordKey::with_sub(course, lesson))
            .into_record(RecordId::now_v7(), Utc::now())
    }

    #[test]
    fn test_partial_key_matches_every_lesson_of_course() {
        let course = CourseId::now_v7();
        let a = progress(course, LessonId::now_v7());
        let b = progress(course, LessonId::now_v7());
        let other = progress(CourseId::now_v7(), LessonId::now_v7());

        let key = RecordKey::<LessonProgress>::new(course);
        assert!(key.matches(&a));
        assert!(key.matches(&b));
        assert!(!key.matches(&other));
        assert!(!key.same_slot(&a));
    }

    #[test]
    fn test_full_key_matches_exact_lesson() {
        let course = CourseId::now_v7();
        let lesson = LessonId::now_v7();
        let a = progress(course, lesson);
        let b = progress(course, LessonId::now_v7());

        let key = RecordKey::<LessonProgress>::with_sub(course, lesson);
        assert!(key.matches(&a));
        assert!(key.same_slot(&a));
        assert!(!key.matches(&b));
    }

    #[test]
    fn test_record_serializes_without_sub_key() {
        let record = NewRecord::<SavedPost>::new(UserId::nil(), RecordKey::new(PostId::nil()))
            .into_record(RecordId::nil(), Utc::now());
        let json = serde_json::to_value(&record).unwrap();
        assert!(json["secondary_key"].is_null());
        let back: Record<SavedPost> = serde_json::from_value(json).unwrap();
        assert_eq!(back, record);
    }

    #[test]
    fn test_key_display() {
        let course = CourseId::nil();
        let key = RecordKey::<Enrollment>::new(course);
        assert_eq!(key.to_string(), course.to_string());
        let role_key = RecordKey::<RoleAssignment>::new(AppRole::Admin);
        assert_eq!(role_key.to_string(), "admin");
    }
}

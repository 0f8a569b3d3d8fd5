//! Coursekeep Test Utilities
//!
//! Centralized test infrastructure for the coursekeep workspace:
//! - Proptest generators for ids, roles and record keys
//! - In-memory store fixtures and pre-wired hooks
//! - Assertions for outcomes and cache contents

// Re-export the in-memory store from its source crate
pub use coursekeep_store::{InMemoryRemoteStore, Primitive};

// Re-export core types for convenience
pub use coursekeep_core::{
    AppRole, CourseId, EntityIdType, Enrollment, InstructorFollow, InstructorId, LessonId,
    LessonProgress, Outcome, PostId, Record, RecordKey, Resource, RoleAssignment, SavedPost,
    SyncError, UserId,
};

use std::sync::Arc;
use uuid::Uuid;

// ============================================================================
// GENERATORS
// ============================================================================

pub mod generators {
    //! Proptest strategies for generating coursekeep values.

    use super::*;
    use proptest::prelude::*;

    /// Generate a random UUID.
    pub fn arb_uuid() -> impl Strategy<Value = Uuid> {
        any::<[u8; 16]>().prop_map(Uuid::from_bytes)
    }

    pub fn arb_user_id() -> impl Strategy<Value = UserId> {
        arb_uuid().prop_map(UserId::new)
    }

    pub fn arb_course_id() -> impl Strategy<Value = CourseId> {
        arb_uuid().prop_map(CourseId::new)
    }

    pub fn arb_lesson_id() -> impl Strategy<Value = LessonId> {
        arb_uuid().prop_map(LessonId::new)
    }

    pub fn arb_instructor_id() -> impl Strategy<Value = InstructorId> {
        arb_uuid().prop_map(InstructorId::new)
    }

    pub fn arb_post_id() -> impl Strategy<Value = PostId> {
        arb_uuid().prop_map(PostId::new)
    }

    pub fn arb_role() -> impl Strategy<Value = AppRole> {
        prop_oneof![
            Just(AppRole::Admin),
            Just(AppRole::Instructor),
            Just(AppRole::Student),
        ]
    }

    /// A lesson-progress key with both course and lesson set.
    pub fn arb_lesson_key() -> impl Strategy<Value = RecordKey<LessonProgress>> {
        (arb_course_id(), arb_lesson_id()).prop_map(|(c, l)| RecordKey::with_sub(c, l))
    }

    pub fn arb_post_key() -> impl Strategy<Value = RecordKey<SavedPost>> {
        arb_post_id().prop_map(RecordKey::new)
    }

    /// `(completed, total)` with `completed <= total`.
    pub fn arb_progress() -> impl Strategy<Value = (usize, usize)> {
        (1usize..64).prop_flat_map(|total| (0..=total, Just(total)))
    }
}

// ============================================================================
// FIXTURES
// ============================================================================

pub mod fixtures {
    //! Pre-built stores and hooks for common testing scenarios.

    use super::*;
    use coursekeep_store::RemoteStore;
    use coursekeep_sync::{RecordingNotifier, RemoteStores, ResourceSync, SessionState, UserData};

    /// One in-memory store per resource, kept so tests can inspect them.
    #[derive(Debug, Clone, Default)]
    pub struct InMemoryStores {
        pub enrollments: Arc<InMemoryRemoteStore<Enrollment>>,
        pub lesson_progress: Arc<InMemoryRemoteStore<LessonProgress>>,
        pub instructor_follows: Arc<InMemoryRemoteStore<InstructorFollow>>,
        pub saved_posts: Arc<InMemoryRemoteStore<SavedPost>>,
        pub user_roles: Arc<InMemoryRemoteStore<RoleAssignment>>,
    }

    impl InMemoryStores {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn remote_stores(&self) -> RemoteStores {
            RemoteStores {
                enrollments: self.enrollments.clone(),
                lesson_progress: self.lesson_progress.clone(),
                instructor_follows: self.instructor_follows.clone(),
                saved_posts: self.saved_posts.clone(),
                user_roles: self.user_roles.clone(),
            }
        }

        /// Calls of every primitive across every store.
        pub fn total_calls(&self) -> u64 {
            self.enrollments.statistics().total()
                + self.lesson_progress.statistics().total()
                + self.instructor_follows.statistics().total()
                + self.saved_posts.statistics().total()
                + self.user_roles.statistics().total()
        }
    }

    /// A bundle over fresh in-memory stores with a recording notifier.
    pub fn user_data() -> (UserData, InMemoryStores, Arc<RecordingNotifier>) {
        let stores = InMemoryStores::new();
        let notifier = Arc::new(RecordingNotifier::new());
        let data = UserData::new(stores.remote_stores(), notifier.clone());
        (data, stores, notifier)
    }

    /// A single hook over a fresh in-memory store, still unresolved.
    pub fn hook<R: Resource>() -> (Arc<InMemoryRemoteStore<R>>, ResourceSync<R>) {
        let store = Arc::new(InMemoryRemoteStore::<R>::new());
        let remote: Arc<dyn RemoteStore<R>> = store.clone();
        (store, ResourceSync::new(remote))
    }

    /// A single hook already identified as `user` (not yet fetched).
    pub fn identified_hook<R: Resource>(
        user: UserId,
    ) -> (Arc<InMemoryRemoteStore<R>>, ResourceSync<R>) {
        let (store, hook) = hook::<R>();
        hook.apply_session(SessionState::Identified(user));
        (store, hook)
    }
}

// ============================================================================
// ASSERTIONS
// ============================================================================

pub mod assertions {
    //! Assertions for coursekeep-specific validation.

    use super::*;

    /// Assert that an outcome leaves the desired end-state in place.
    #[track_caller]
    pub fn assert_succeeded(outcome: Outcome) {
        assert!(outcome.is_success(), "Expected success, got {outcome}");
    }

    /// Assert that exactly one cached record occupies `key`'s slot.
    #[track_caller]
    pub fn assert_single_slot<R: Resource>(records: &[Record<R>], key: &RecordKey<R>) {
        let n = records.iter().filter(|r| key.same_slot(r)).count();
        assert_eq!(n, 1, "Expected exactly one record for {key}, found {n}");
    }

    /// Assert that every cached record belongs to `owner`.
    #[track_caller]
    pub fn assert_owned_by<R: Resource>(records: &[Record<R>], owner: UserId) {
        for record in records {
            assert_eq!(
                record.owner_user_id, owner,
                "Record {} belongs to {}, expected {owner}",
                record.id, record.owner_user_id
            );
        }
    }
}

//! Typed hooks, one per synchronized resource.
//!
//! Each facade wraps a [`ResourceSync`] with domain verbs. Mutations resolve
//! into an [`Outcome`] first; the matching [`Notice`] is dispatched after.

mod enrollments;
mod follows;
mod lesson_progress;
mod roles;
mod saved_posts;

pub use enrollments::Enrollments;
pub use follows::InstructorFollows;
pub use lesson_progress::LessonProgressTracker;
pub use roles::UserRoles;
pub use saved_posts::SavedPosts;

use crate::hook::ResourceSync;
use crate::notifier::{Mutation, Notice, Notifier};
use coursekeep_core::{Outcome, RecordKey, Resource};
use std::sync::Arc;

/// A hook plus the notifier its mutations report to.
#[derive(Clone)]
struct NotifyingSync<R: Resource> {
    sync: ResourceSync<R>,
    notifier: Arc<dyn Notifier>,
}

impl<R: Resource> NotifyingSync<R> {
    fn new(sync: ResourceSync<R>, notifier: Arc<dyn Notifier>) -> Self {
        Self { sync, notifier }
    }

    async fn create(&self, key: RecordKey<R>) -> Outcome {
        let outcome = Outcome::from(&self.sync.create(key).await);
        self.dispatch(Mutation::Create, outcome);
        outcome
    }

    async fn remove(&self, key: RecordKey<R>) -> Outcome {
        let outcome = Outcome::from(&self.sync.remove(key).await);
        self.dispatch(Mutation::Remove, outcome);
        outcome
    }

    /// Remove when cached as a member, otherwise create.
    async fn toggle(&self, key: RecordKey<R>) -> Outcome {
        if self.sync.is_member(&key) {
            self.remove(key).await
        } else {
            self.create(key).await
        }
    }

    fn dispatch(&self, mutation: Mutation, outcome: Outcome) {
        tracing::debug!(resource = %R::KIND, ?mutation, outcome = %outcome, "Mutation resolved");
        self.notifier
            .notify(Notice::for_outcome(R::KIND, mutation, outcome));
    }
}

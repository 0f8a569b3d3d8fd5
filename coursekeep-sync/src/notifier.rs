//! Notification of mutation outcomes.
//!
//! Turning an [`Outcome`] into a user-facing [`Notice`] is pure. Delivering
//! it goes through the [`Notifier`] trait and happens after the cache has
//! already been updated.

use chrono::{DateTime, Utc};
use coursekeep_core::{Outcome, ResourceKind};
use serde::{Deserialize, Serialize};
use std::sync::{Mutex, PoisonError};

/// Which mutation produced the outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mutation {
    Create,
    Remove,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoticeLevel {
    Info,
    Success,
    Warning,
    Error,
}

/// Follow-up the user should be offered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoticeAction {
    SignIn,
    Retry,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notice {
    pub resource: ResourceKind,
    pub mutation: Mutation,
    pub category: Outcome,
    pub level: NoticeLevel,
    pub message: String,
    pub action: Option<NoticeAction>,
    pub created_at: DateTime<Utc>,
}

impl Notice {
    /// Build the notice for a mutation outcome.
    pub fn for_outcome(resource: ResourceKind, mutation: Mutation, outcome: Outcome) -> Self {
        let (level, action) = match outcome {
            Outcome::Success => (NoticeLevel::Success, None),
            Outcome::AlreadyDone => (NoticeLevel::Info, None),
            Outcome::BlockedUnauthenticated => (NoticeLevel::Warning, Some(NoticeAction::SignIn)),
            Outcome::Failed => (NoticeLevel::Error, Some(NoticeAction::Retry)),
        };
        Self {
            resource,
            mutation,
            category: outcome,
            level,
            message: message_for(resource, mutation, outcome).to_string(),
            action,
            created_at: Utc::now(),
        }
    }

    pub fn is_problem(&self) -> bool {
        !self.category.is_success()
    }
}

fn message_for(resource: ResourceKind, mutation: Mutation, outcome: Outcome) -> &'static str {
    use Mutation::{Create, Remove};
    use Outcome::{AlreadyDone, BlockedUnauthenticated, Failed, Success};
    use ResourceKind::*;

    match (resource, mutation, outcome) {
        (Enrollment, Create, Success) => "Enrolled in course",
        (Enrollment, Create, AlreadyDone) => "Already enrolled in this course",
        (Enrollment, Create, Failed) => "Could not enroll in course",
        (Enrollment, Remove, Success | AlreadyDone) => "Unenrolled from course",
        (Enrollment, Remove, Failed) => "Could not unenroll from course",
        (Enrollment, _, BlockedUnauthenticated) => "Sign in to enroll in courses",

        (LessonProgress, Create, Success) => "Lesson marked complete",
        (LessonProgress, Create, AlreadyDone) => "Lesson already completed",
        (LessonProgress, Remove, Success | AlreadyDone) => "Lesson progress cleared",
        (LessonProgress, _, Failed) => "Could not update lesson progress",
        (LessonProgress, _, BlockedUnauthenticated) => "Sign in to track your progress",

        (InstructorFollow, Create, Success) => "Following instructor",
        (InstructorFollow, Create, AlreadyDone) => "Already following this instructor",
        (InstructorFollow, Create, Failed) => "Could not follow instructor",
        (InstructorFollow, Remove, Success | AlreadyDone) => "Unfollowed instructor",
        (InstructorFollow, Remove, Failed) => "Could not unfollow instructor",
        (InstructorFollow, _, BlockedUnauthenticated) => "Sign in to follow instructors",

        (SavedPost, Create, Success) => "Post saved",
        (SavedPost, Create, AlreadyDone) => "Post already saved",
        (SavedPost, Create, Failed) => "Could not save post",
        (SavedPost, Remove, Success | AlreadyDone) => "Post removed from saved",
        (SavedPost, Remove, Failed) => "Could not remove saved post",
        (SavedPost, _, BlockedUnauthenticated) => "Sign in to save posts",

        (RoleAssignment, Create, Success) => "Role granted",
        (RoleAssignment, Create, AlreadyDone) => "Role already granted",
        (RoleAssignment, Remove, Success | AlreadyDone) => "Role revoked",
        (RoleAssignment, _, Failed) => "Could not update roles",
        (RoleAssignment, _, BlockedUnauthenticated) => "Sign in to manage roles",
    }
}

/// Delivers notices to whatever presents them.
pub trait Notifier: Send + Sync {
    fn notify(&self, notice: Notice);
}

/// Writes notices to the tracing subscriber.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, notice: Notice) {
        let resource = notice.resource.label();
        let outcome = notice.category.as_str();
        match notice.level {
            NoticeLevel::Error => {
                tracing::error!(resource, outcome, action = ?notice.action, "{}", notice.message)
            }
            NoticeLevel::Warning => {
                tracing::warn!(resource, outcome, action = ?notice.action, "{}", notice.message)
            }
            NoticeLevel::Info | NoticeLevel::Success => {
                tracing::info!(resource, outcome, "{}", notice.message)
            }
        }
    }
}

/// Keeps every notice in memory.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    notices: Mutex<Vec<Notice>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn notices(&self) -> Vec<Notice> {
        self.notices
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Outcome categories in delivery order.
    pub fn categories(&self) -> Vec<Outcome> {
        self.notices
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|n| n.category)
            .collect()
    }

    /// Drain and return everything recorded so far.
    pub fn take(&self) -> Vec<Notice> {
        std::mem::take(&mut *self.notices.lock().unwrap_or_else(PoisonError::into_inner))
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, notice: Notice) {
        self.notices
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(notice);
    }
}

impl<N: Notifier + ?Sized> Notifier for std::sync::Arc<N> {
    fn notify(&self, notice: Notice) {
        (**self).notify(notice)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_levels_and_actions() {
        let n = Notice::for_outcome(ResourceKind::Enrollment, Mutation::Create, Outcome::Failed);
        assert_eq!(n.level, NoticeLevel::Error);
        assert_eq!(n.action, Some(NoticeAction::Retry));
        assert!(n.is_problem());

        let n = Notice::for_outcome(
            ResourceKind::SavedPost,
            Mutation::Create,
            Outcome::BlockedUnauthenticated,
        );
        assert_eq!(n.action, Some(NoticeAction::SignIn));
        assert_eq!(n.message, "Sign in to save posts");

        let n = Notice::for_outcome(ResourceKind::Enrollment, Mutation::Create, Outcome::AlreadyDone);
        assert_eq!(n.message, "Already enrolled in this course");
        assert_eq!(n.action, None);
        assert!(!n.is_problem());
    }

    #[test]
    fn test_every_combination_has_a_message() {
        for kind in ResourceKind::ALL {
            for mutation in [Mutation::Create, Mutation::Remove] {
                for outcome in [
                    Outcome::Success,
                    Outcome::AlreadyDone,
                    Outcome::BlockedUnauthenticated,
                    Outcome::Failed,
                ] {
                    assert!(!message_for(kind, mutation, outcome).is_empty());
                }
            }
        }
    }

    #[test]
    fn test_recording_notifier() {
        let notifier = RecordingNotifier::new();
        notifier.notify(Notice::for_outcome(
            ResourceKind::SavedPost,
            Mutation::Create,
            Outcome::Success,
        ));
        notifier.notify(Notice::for_outcome(
            ResourceKind::SavedPost,
            Mutation::Create,
            Outcome::AlreadyDone,
        ));
        assert_eq!(
            notifier.categories(),
            vec![Outcome::Success, Outcome::AlreadyDone]
        );
        assert_eq!(notifier.take().len(), 2);
        assert!(notifier.notices().is_empty());
    }
}

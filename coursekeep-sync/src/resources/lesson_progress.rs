use super::NotifyingSync;
use crate::hook::ResourceSync;
use crate::notifier::Notifier;
use coursekeep_core::{
    view, CourseId, LessonId, LessonProgress, Outcome, Record, RecordKey, SyncResult,
};
use std::sync::Arc;

/// Completed lessons of the current user, keyed by course then lesson.
#[derive(Clone)]
pub struct LessonProgressTracker {
    inner: NotifyingSync<LessonProgress>,
}

impl LessonProgressTracker {
    pub fn new(sync: ResourceSync<LessonProgress>, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            inner: NotifyingSync::new(sync, notifier),
        }
    }

    pub async fn mark_complete(&self, course: CourseId, lesson: LessonId) -> Outcome {
        self.inner.create(RecordKey::with_sub(course, lesson)).await
    }

    pub async fn mark_incomplete(&self, course: CourseId, lesson: LessonId) -> Outcome {
        self.inner.remove(RecordKey::with_sub(course, lesson)).await
    }

    /// Clear every completion recorded for `course`.
    pub async fn reset_course(&self, course: CourseId) -> Outcome {
        self.inner.remove(RecordKey::new(course)).await
    }

    pub fn is_completed(&self, course: CourseId, lesson: LessonId) -> bool {
        self.inner.sync.is_member(&RecordKey::with_sub(course, lesson))
    }

    pub fn completed_count(&self, course: CourseId) -> usize {
        self.inner.sync.count(Some(&RecordKey::new(course)))
    }

    /// Share of `total_lessons` completed in `course`, rounded half up.
    pub fn progress_percentage(&self, course: CourseId, total_lessons: usize) -> u8 {
        view::progress_percentage(self.completed_count(course), total_lessons)
    }

    pub fn completed_lesson_ids(&self, course: CourseId) -> Vec<LessonId> {
        let key = RecordKey::<LessonProgress>::new(course);
        self.inner.sync.with_records(|records| {
            records
                .iter()
                .filter(|r| key.matches(r))
                .filter_map(|r| r.secondary_key)
                .collect()
        })
    }

    pub async fn refetch(&self) -> SyncResult<usize> {
        self.inner.sync.refetch().await
    }

    pub fn records(&self) -> Vec<Record<LessonProgress>> {
        self.inner.sync.records()
    }

    pub fn loading(&self) -> bool {
        self.inner.sync.loading()
    }

    pub fn hook(&self) -> &ResourceSync<LessonProgress> {
        &self.inner.sync
    }
}

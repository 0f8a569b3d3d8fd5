use super::NotifyingSync;
use crate::hook::ResourceSync;
use crate::notifier::Notifier;
use coursekeep_core::{CourseId, Enrollment, Outcome, Record, RecordKey, SyncResult};
use std::sync::Arc;

/// Course enrollments of the current user, newest first.
#[derive(Clone)]
pub struct Enrollments {
    inner: NotifyingSync<Enrollment>,
}

impl Enrollments {
    pub fn new(sync: ResourceSync<Enrollment>, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            inner: NotifyingSync::new(sync, notifier),
        }
    }

    pub async fn enroll(&self, course: CourseId) -> Outcome {
        self.inner.create(RecordKey::new(course)).await
    }

    pub async fn unenroll(&self, course: CourseId) -> Outcome {
        self.inner.remove(RecordKey::new(course)).await
    }

    pub fn is_enrolled(&self, course: CourseId) -> bool {
        self.inner.sync.is_member(&RecordKey::new(course))
    }

    pub fn enrolled_course_ids(&self) -> Vec<CourseId> {
        self.inner
            .sync
            .with_records(|records| records.iter().map(|r| r.resource_key).collect())
    }

    pub fn enrollment_count(&self) -> usize {
        self.inner.sync.count(None)
    }

    pub async fn refetch(&self) -> SyncResult<usize> {
        self.inner.sync.refetch().await
    }

    pub fn records(&self) -> Vec<Record<Enrollment>> {
        self.inner.sync.records()
    }

    pub fn loading(&self) -> bool {
        self.inner.sync.loading()
    }

    pub fn hook(&self) -> &ResourceSync<Enrollment> {
        &self.inner.sync
    }
}

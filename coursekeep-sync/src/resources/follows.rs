use super::NotifyingSync;
use crate::hook::ResourceSync;
use crate::notifier::Notifier;
use coursekeep_core::{InstructorFollow, InstructorId, Outcome, Record, RecordKey, SyncResult};
use std::sync::Arc;

/// Instructors the current user follows.
#[derive(Clone)]
pub struct InstructorFollows {
    inner: NotifyingSync<InstructorFollow>,
}

impl InstructorFollows {
    pub fn new(sync: ResourceSync<InstructorFollow>, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            inner: NotifyingSync::new(sync, notifier),
        }
    }

    pub async fn follow(&self, instructor: InstructorId) -> Outcome {
        self.inner.create(RecordKey::new(instructor)).await
    }

    pub async fn unfollow(&self, instructor: InstructorId) -> Outcome {
        self.inner.remove(RecordKey::new(instructor)).await
    }

    pub async fn toggle(&self, instructor: InstructorId) -> Outcome {
        self.inner.toggle(RecordKey::new(instructor)).await
    }

    pub fn is_following(&self, instructor: InstructorId) -> bool {
        self.inner.sync.is_member(&RecordKey::new(instructor))
    }

    pub fn following_count(&self) -> usize {
        self.inner.sync.count(None)
    }

    pub fn followed_instructor_ids(&self) -> Vec<InstructorId> {
        self.inner
            .sync
            .with_records(|records| records.iter().map(|r| r.resource_key).collect())
    }

    pub async fn refetch(&self) -> SyncResult<usize> {
        self.inner.sync.refetch().await
    }

    /// Cached follow records, exactly as the remote store returned them.
    pub fn records(&self) -> Vec<Record<InstructorFollow>> {
        self.inner.sync.records()
    }

    pub fn loading(&self) -> bool {
        self.inner.sync.loading()
    }

    pub fn hook(&self) -> &ResourceSync<InstructorFollow> {
        &self.inner.sync
    }
}

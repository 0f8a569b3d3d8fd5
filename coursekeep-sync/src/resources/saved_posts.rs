use super::NotifyingSync;
use crate::hook::ResourceSync;
use crate::notifier::Notifier;
use coursekeep_core::{Outcome, PostId, Record, RecordKey, SavedPost, SyncResult};
use std::sync::Arc;

/// Posts bookmarked by the current user.
#[derive(Clone)]
pub struct SavedPosts {
    inner: NotifyingSync<SavedPost>,
}

impl SavedPosts {
    pub fn new(sync: ResourceSync<SavedPost>, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            inner: NotifyingSync::new(sync, notifier),
        }
    }

    pub async fn save(&self, post: PostId) -> Outcome {
        self.inner.create(RecordKey::new(post)).await
    }

    pub async fn unsave(&self, post: PostId) -> Outcome {
        self.inner.remove(RecordKey::new(post)).await
    }

    pub async fn toggle(&self, post: PostId) -> Outcome {
        self.inner.toggle(RecordKey::new(post)).await
    }

    pub fn is_saved(&self, post: PostId) -> bool {
        self.inner.sync.is_member(&RecordKey::new(post))
    }

    pub fn saved_count(&self) -> usize {
        self.inner.sync.count(None)
    }

    pub fn saved_post_ids(&self) -> Vec<PostId> {
        self.inner
            .sync
            .with_records(|records| records.iter().map(|r| r.resource_key).collect())
    }

    pub async fn refetch(&self) -> SyncResult<usize> {
        self.inner.sync.refetch().await
    }

    pub fn records(&self) -> Vec<Record<SavedPost>> {
        self.inner.sync.records()
    }

    pub fn loading(&self) -> bool {
        self.inner.sync.loading()
    }

    pub fn hook(&self) -> &ResourceSync<SavedPost> {
        &self.inner.sync
    }
}

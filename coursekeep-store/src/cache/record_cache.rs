//! Owner-scoped record cache.
//!
//! Holds the records of at most one owner. Every write is conditional on a
//! [`Watermark`] captured before the network call that produced it, so a
//! response belonging to a previous owner or overtaken by a newer mutation
//! never lands in the cache.

use super::watermark::Watermark;
use coursekeep_core::{FetchOrder, Record, RecordKey, Resource, SyncError, SyncResult, UserId};

/// In-memory set of one owner's records for resource `R`.
#[derive(Debug, Clone)]
pub struct RecordCache<R: Resource> {
    owner: Option<UserId>,
    records: Vec<Record<R>>,
    watermark: Watermark,
}

impl<R: Resource> Default for RecordCache<R> {
    fn default() -> Self {
        Self {
            owner: None,
            records: Vec::new(),
            watermark: Watermark::zero(),
        }
    }
}

impl<R: Resource> RecordCache<R> {
    pub fn new() -> Self {
        Self::default()
    }

    // ========================================================================
    // READS
    // ========================================================================

    pub fn records(&self) -> &[Record<R>] {
        &self.records
    }

    pub fn owner(&self) -> Option<UserId> {
        self.owner
    }

    pub fn watermark(&self) -> Watermark {
        self.watermark
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    // ========================================================================
    // OWNERSHIP
    // ========================================================================

    /// Empty the cache and hand it to `owner`. Always starts a new epoch,
    /// even when the owner is unchanged.
    pub fn scope_to(&mut self, owner: Option<UserId>) -> Watermark {
        self.owner = owner;
        self.records.clear();
        self.watermark = self.watermark.next_epoch();
        self.watermark
    }

    /// Empty the cache and drop ownership.
    pub fn clear(&mut self) -> Watermark {
        self.scope_to(None)
    }

    // ========================================================================
    // CONDITIONAL WRITES
    // ========================================================================

    /// Replace the whole set with a fetch result taken at `expected`.
    ///
    /// Rows of other owners are dropped. For unique resources only the first
    /// row of each slot is kept. Returns the number of records now cached.
    pub fn replace_if_current(
        &mut self,
        expected: Watermark,
        records: Vec<Record<R>>,
    ) -> SyncResult<usize> {
        if self.watermark != expected {
            return Err(SyncError::StaleReadRace);
        }
        let Some(owner) = self.owner else {
            return Err(SyncError::StaleReadRace);
        };

        let mut kept: Vec<Record<R>> = Vec::with_capacity(records.len());
        for record in records {
            if record.owner_user_id != owner {
                tracing::warn!(
                    resource = %R::KIND,
                    owner = %owner,
                    record_owner = %record.owner_user_id,
                    "dropping fetched record of another owner"
                );
                continue;
            }
            if R::UNIQUE && kept.iter().any(|k| record.key().same_slot(k)) {
                continue;
            }
            kept.push(record);
        }

        self.records = kept;
        Ok(self.records.len())
    }

    /// Add a record confirmed by the remote store during `epoch`.
    ///
    /// Returns `Ok(false)` when a unique slot is already occupied and the
    /// cache is left unchanged.
    pub fn insert_if_epoch(&mut self, epoch: u64, record: Record<R>) -> SyncResult<bool> {
        if self.watermark.epoch != epoch || self.owner != Some(record.owner_user_id) {
            return Err(SyncError::StaleReadRace);
        }
        if R::UNIQUE && self.records.iter().any(|r| record.key().same_slot(r)) {
            return Ok(false);
        }
        match R::ORDER {
            FetchOrder::CreatedAtDesc => self.records.insert(0, record),
            FetchOrder::Unordered => self.records.push(record),
        }
        self.watermark = self.watermark.next_mutation();
        Ok(true)
    }

    /// Drop every record matching `key` after a remote delete during `epoch`.
    /// Returns how many cached records were removed.
    pub fn remove_matching_if_epoch(
        &mut self,
        epoch: u64,
        key: &RecordKey<R>,
    ) -> SyncResult<usize> {
        if self.watermark.epoch != epoch {
            return Err(SyncError::StaleReadRace);
        }
        let before = self.records.len();
        self.records.retain(|r| !key.matches(r));
        self.watermark = self.watermark.next_mutation();
        Ok(before - self.records.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use proptest::prelude::*;
    use std::collections::HashSet;
    use coursekeep_core::{
        AppRole, CourseId, EntityIdType, Enrollment, LessonId, LessonProgress, NewRecord, PostId,
        RecordId, RoleAssignment, SavedPost,
    };

    fn record<R: Resource>(owner: UserId, key: RecordKey<R>) -> Record<R> {
        NewRecord::new(owner, key).into_record(RecordId::now_v7(), Utc::now())
    }

    #[test]
    fn test_replace_requires_current_watermark() {
        let user = UserId::now_v7();
        let mut cache = RecordCache::<SavedPost>::new();
        let mark = cache.scope_to(Some(user));

        let rows = vec![record(user, RecordKey::new(PostId::now_v7()))];
        assert_eq!(cache.replace_if_current(mark, rows.clone()).unwrap(), 1);

        cache.clear();
        assert_eq!(
            cache.replace_if_current(mark, rows),
            Err(SyncError::StaleReadRace)
        );
        assert!(cache.is_empty());
    }

    #[test]
    fn test_replace_after_mutation_is_stale() {
        let user = UserId::now_v7();
        let mut cache = RecordCache::<SavedPost>::new();
        let mark = cache.scope_to(Some(user));

        cache
            .insert_if_epoch(mark.epoch, record(user, RecordKey::new(PostId::now_v7())))
            .unwrap();
        let result = cache.replace_if_current(mark, Vec::new());
        assert_eq!(result, Err(SyncError::StaleReadRace));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_replace_filters_foreign_owner_and_duplicates() {
        let user = UserId::now_v7();
        let mut cache = RecordCache::<Enrollment>::new();
        let mark = cache.scope_to(Some(user));
        let course = CourseId::now_v7();

        let rows = vec![
            record(user, RecordKey::new(course)),
            record(user, RecordKey::new(course)),
            record(UserId::now_v7(), RecordKey::new(CourseId::now_v7())),
        ];
        assert_eq!(cache.replace_if_current(mark, rows).unwrap(), 1);
    }

    #[test]
    fn test_roles_keep_repeats() {
        let user = UserId::now_v7();
        let mut cache = RecordCache::<RoleAssignment>::new();
        let mark = cache.scope_to(Some(user));
        let rows = vec![
            record(user, RecordKey::new(AppRole::Admin)),
            record(user, RecordKey::new(AppRole::Admin)),
        ];
        assert_eq!(cache.replace_if_current(mark, rows).unwrap(), 2);
    }

    #[test]
    fn test_insert_rejected_after_epoch_change() {
        let user = UserId::now_v7();
        let mut cache = RecordCache::<SavedPost>::new();
        let mark = cache.scope_to(Some(user));
        cache.clear();

        let stale = record(user, RecordKey::new(PostId::now_v7()));
        let result = cache.insert_if_epoch(mark.epoch, stale);
        assert_eq!(result, Err(SyncError::StaleReadRace));
        assert!(cache.is_empty());
    }

    #[test]
    fn test_insert_keeps_slot_unique() {
        let user = UserId::now_v7();
        let mut cache = RecordCache::<SavedPost>::new();
        let mark = cache.scope_to(Some(user));
        let key = RecordKey::new(PostId::now_v7());

        assert!(cache.insert_if_epoch(mark.epoch, record(user, key)).unwrap());
        assert!(!cache.insert_if_epoch(mark.epoch, record(user, key)).unwrap());
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_enrollment_insert_goes_first() {
        let user = UserId::now_v7();
        let mut cache = RecordCache::<Enrollment>::new();
        let mark = cache.scope_to(Some(user));
        let older = record(user, RecordKey::new(CourseId::now_v7()));
        let newer = record(user, RecordKey::new(CourseId::now_v7()));

        cache.insert_if_epoch(mark.epoch, older).unwrap();
        cache.insert_if_epoch(mark.epoch, newer.clone()).unwrap();
        assert_eq!(cache.records()[0].id, newer.id);
    }

    #[test]
    fn test_remove_by_course_clears_all_lessons() {
        let user = UserId::now_v7();
        let mut cache = RecordCache::<LessonProgress>::new();
        let mark = cache.scope_to(Some(user));
        let course = CourseId::now_v7();
        let other = CourseId::now_v7();

        let rows = vec![
            record(user, RecordKey::with_sub(course, LessonId::now_v7())),
            record(user, RecordKey::with_sub(course, LessonId::now_v7())),
            record(user, RecordKey::with_sub(other, LessonId::now_v7())),
        ];
        cache.replace_if_current(mark, rows).unwrap();

        let removed = cache
            .remove_matching_if_epoch(mark.epoch, &RecordKey::new(course))
            .unwrap();
        assert_eq!(removed, 2);
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.records()[0].resource_key, other);
    }

    #[test]
    fn test_scope_to_same_owner_starts_new_epoch() {
        let user = UserId::now_v7();
        let mut cache = RecordCache::<SavedPost>::new();
        let a = cache.scope_to(Some(user));
        let b = cache.scope_to(Some(user));
        assert!(!a.same_epoch(&b));
        assert_eq!(cache.owner(), Some(user));
    }

    proptest! {
        #[test]
        fn prop_replace_keeps_one_owned_record_per_slot(
            rows in prop::collection::vec((any::<bool>(), 0usize..4), 0..24)
        ) {
            let user = UserId::now_v7();
            let stranger = UserId::now_v7();
            let posts: Vec<PostId> = (0..4).map(|_| PostId::now_v7()).collect();
            let fetched: Vec<Record<SavedPost>> = rows
                .iter()
                .map(|&(own, i)| {
                    let owner = if own { user } else { stranger };
                    record(owner, RecordKey::new(posts[i]))
                })
                .collect();
            let expected: HashSet<usize> =
                rows.iter().filter(|(own, _)| *own).map(|&(_, i)| i).collect();

            let mut cache = RecordCache::<SavedPost>::new();
            let mark = cache.scope_to(Some(user));
            let kept = cache.replace_if_current(mark, fetched).unwrap();

            prop_assert_eq!(kept, expected.len());
            prop_assert!(cache.records().iter().all(|r| r.owner_user_id == user));
            let slots: HashSet<PostId> = cache.records().iter().map(|r| r.resource_key).collect();
            prop_assert_eq!(slots.len(), cache.len());
        }
    }
}

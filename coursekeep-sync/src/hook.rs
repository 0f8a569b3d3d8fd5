//! Generic synchronization hook: Fetcher, Mutator and Derived View for one
//! resource.
//!
//! A [`ResourceSync`] owns the cache of one resource for the current session.
//! Cache writes happen only after the remote store has answered, and only if
//! the cache still belongs to the session that issued the request. The state
//! lock is never held across an `.await`.

use crate::session::SessionState;
use coursekeep_core::{
    view, NewRecord, Record, RecordKey, RemoteError, Resource, SyncError, SyncResult, UserId,
};
use coursekeep_store::{RecordCache, RemoteStore, Watermark};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

#[derive(Debug)]
struct HookState<R: Resource> {
    session: SessionState,
    cache: RecordCache<R>,
    loading: bool,
}

impl<R: Resource> HookState<R> {
    fn new() -> Self {
        Self {
            session: SessionState::Unresolved,
            cache: RecordCache::new(),
            loading: true,
        }
    }
}

/// Session-gated cache of one user's records of resource `R`.
///
/// Cheap to clone; clones share state.
pub struct ResourceSync<R: Resource> {
    store: Arc<dyn RemoteStore<R>>,
    state: Arc<RwLock<HookState<R>>>,
}

impl<R: Resource> Clone for ResourceSync<R> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            state: Arc::clone(&self.state),
        }
    }
}

impl<R: Resource> std::fmt::Debug for ResourceSync<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.read();
        f.debug_struct("ResourceSync")
            .field("resource", &R::KIND)
            .field("session", &state.session)
            .field("loading", &state.loading)
            .field("records", &state.cache.len())
            .finish()
    }
}

impl<R: Resource> ResourceSync<R> {
    /// A hook in the `Unresolved` state: empty cache, `loading` set.
    pub fn new(store: Arc<dyn RemoteStore<R>>) -> Self {
        Self {
            store,
            state: Arc::new(RwLock::new(HookState::new())),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, HookState<R>> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, HookState<R>> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    // ========================================================================
    // SESSION
    // ========================================================================

    /// Align the hook with a Session Gate state.
    ///
    /// Moving to `Anonymous` empties the cache and clears `loading`. Moving
    /// to `Identified(u)` empties the cache, scopes it to `u` and sets
    /// `loading` until the next [`refetch`](Self::refetch) lands. Either way
    /// any in-flight response is orphaned. Returns `false` if the hook was
    /// already in `state`, or if `state` is `Unresolved` after resolution.
    pub fn apply_session(&self, state: SessionState) -> bool {
        let mut guard = self.write();
        if guard.session == state {
            return false;
        }
        match state {
            SessionState::Unresolved => {
                tracing::warn!(
                    resource = %R::KIND,
                    current = %guard.session,
                    "Ignoring transition back to unresolved"
                );
                return false;
            }
            SessionState::Anonymous => {
                guard.cache.clear();
                guard.loading = false;
            }
            SessionState::Identified(user) => {
                guard.cache.scope_to(Some(user));
                guard.loading = true;
            }
        }
        tracing::debug!(resource = %R::KIND, from = %guard.session, to = %state, "Hook reset");
        guard.session = state;
        true
    }

    /// Identified user, or `Unauthenticated` with the current epoch untouched.
    fn identified(&self) -> SyncResult<(UserId, Watermark)> {
        let guard = self.read();
        match guard.session {
            SessionState::Identified(user) => Ok((user, guard.cache.watermark())),
            SessionState::Unresolved | SessionState::Anonymous => Err(SyncError::Unauthenticated),
        }
    }

    // ========================================================================
    // FETCHER
    // ========================================================================

    /// Replace the cache with the owner's records from the remote store.
    ///
    /// Returns the number of cached records. A response overtaken by a
    /// session change or a mutation is dropped with `StaleReadRace`. A
    /// remote failure leaves the previous contents in place.
    ///
    /// When the first fetch after a session change is dropped this way,
    /// `loading` is cleared but the cache holds only what the mutation added.
    /// Call `refetch` again to load the full set.
    pub async fn refetch(&self) -> SyncResult<usize> {
        let (owner, mark) = self.identified()?;
        tracing::debug!(resource = %R::KIND, owner = %owner, "Fetching records");

        let response = self.store.select(owner).await;

        let mut guard = self.write();
        let in_epoch = guard.cache.watermark().same_epoch(&mark);
        match response {
            Ok(rows) => match guard.cache.replace_if_current(mark, rows) {
                Ok(count) => {
                    guard.loading = false;
                    tracing::info!(resource = %R::KIND, owner = %owner, count, "Fetched records");
                    Ok(count)
                }
                Err(err) => {
                    if in_epoch {
                        guard.loading = false;
                    }
                    tracing::debug!(
                        resource = %R::KIND,
                        owner = %owner,
                        "Discarding stale fetch response"
                    );
                    Err(err)
                }
            },
            Err(err) => {
                if !in_epoch {
                    tracing::debug!(resource = %R::KIND, error = %err, "Discarding stale fetch failure");
                    return Err(SyncError::StaleReadRace);
                }
                guard.loading = false;
                tracing::warn!(
                    resource = %R::KIND,
                    owner = %owner,
                    error = %err,
                    "Fetch failed; keeping cached records"
                );
                Err(SyncError::Remote(err))
            }
        }
    }

    // ========================================================================
    // MUTATOR
    // ========================================================================

    /// Insert a record for `key` remotely, then cache the stored record.
    ///
    /// A remote uniqueness violation is `DuplicateConflict` and leaves the
    /// cache untouched. If the session changed while the insert was in
    /// flight the remote result is still returned but not cached.
    pub async fn create(&self, key: RecordKey<R>) -> SyncResult<Record<R>> {
        let (owner, mark) = self.identified().inspect_err(|_| {
            tracing::debug!(resource = %R::KIND, key = %key, "Create blocked: no identified session");
        })?;

        let response = self.store.insert(&NewRecord::new(owner, key)).await;

        match response {
            Ok(record) => {
                let mut guard = self.write();
                match guard.cache.insert_if_epoch(mark.epoch, record.clone()) {
                    Ok(true) => {}
                    Ok(false) => {
                        tracing::debug!(resource = %R::KIND, key = %key, "Slot already cached");
                    }
                    Err(_) => {
                        tracing::debug!(
                            resource = %R::KIND,
                            key = %key,
                            "Session changed during create; cache left alone"
                        );
                    }
                }
                Ok(record)
            }
            Err(err) => Err(self.classify_mutation_error("create", &key, err)),
        }
    }

    /// Delete every record matching `key` remotely, then drop them from the
    /// cache. Returns the number of remote rows removed; zero is success.
    pub async fn remove(&self, key: RecordKey<R>) -> SyncResult<u64> {
        let (owner, mark) = self.identified().inspect_err(|_| {
            tracing::debug!(resource = %R::KIND, key = %key, "Remove blocked: no identified session");
        })?;

        let response = self.store.delete(owner, &key).await;

        match response {
            Ok(removed) => {
                let mut guard = self.write();
                if guard.cache.remove_matching_if_epoch(mark.epoch, &key).is_err() {
                    tracing::debug!(
                        resource = %R::KIND,
                        key = %key,
                        "Session changed during remove; cache left alone"
                    );
                }
                Ok(removed)
            }
            Err(err) => Err(self.classify_mutation_error("remove", &key, err)),
        }
    }

    fn classify_mutation_error(
        &self,
        operation: &'static str,
        key: &RecordKey<R>,
        err: RemoteError,
    ) -> SyncError {
        let err = SyncError::from(err);
        match &err {
            SyncError::DuplicateConflict => {
                tracing::debug!(resource = %R::KIND, key = %key, operation, "Record already exists");
            }
            _ => {
                tracing::warn!(resource = %R::KIND, key = %key, operation, error = %err, "Mutation failed");
            }
        }
        err
    }

    // ========================================================================
    // DERIVED VIEW
    // ========================================================================

    pub fn is_member(&self, key: &RecordKey<R>) -> bool {
        view::is_member(self.read().cache.records(), key)
    }

    pub fn count(&self, key: Option<&RecordKey<R>>) -> usize {
        view::count(self.read().cache.records(), key)
    }

    /// Run `f` over the cached records without cloning them.
    pub fn with_records<T>(&self, f: impl FnOnce(&[Record<R>]) -> T) -> T {
        f(self.read().cache.records())
    }

    // ========================================================================
    // ACCESSORS
    // ========================================================================

    /// Snapshot of the cached records.
    pub fn records(&self) -> Vec<Record<R>> {
        self.read().cache.records().to_vec()
    }

    pub fn loading(&self) -> bool {
        self.read().loading
    }

    pub fn owner(&self) -> Option<UserId> {
        self.read().cache.owner()
    }

    pub fn session(&self) -> SessionState {
        self.read().session
    }

    pub fn watermark(&self) -> Watermark {
        self.read().cache.watermark()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use coursekeep_core::{EntityIdType, PostId, SavedPost};
    use coursekeep_store::{InMemoryRemoteStore, Primitive};

    fn hook() -> (Arc<InMemoryRemoteStore<SavedPost>>, ResourceSync<SavedPost>) {
        let store = Arc::new(InMemoryRemoteStore::new());
        let hook = ResourceSync::new(store.clone() as Arc<dyn RemoteStore<SavedPost>>);
        (store, hook)
    }

    #[test]
    fn test_initial_state_is_loading() {
        let (_, hook) = hook();
        assert!(hook.loading());
        assert_eq!(hook.session(), SessionState::Unresolved);
        assert!(hook.records().is_empty());
    }

    #[tokio::test]
    async fn test_refetch_requires_identity() {
        let (store, hook) = hook();
        assert_eq!(hook.refetch().await, Err(SyncError::Unauthenticated));
        hook.apply_session(SessionState::Anonymous);
        assert_eq!(hook.refetch().await, Err(SyncError::Unauthenticated));
        assert_eq!(store.statistics().total(), 0);
        assert!(!hook.loading());
    }

    #[tokio::test]
    async fn test_fetch_failure_keeps_cache() {
        let (store, hook) = hook();
        let user = UserId::now_v7();
        store.seed(user, RecordKey::new(PostId::now_v7()));
        hook.apply_session(SessionState::Identified(user));
        hook.refetch().await.unwrap();
        assert_eq!(hook.count(None), 1);

        store.fail_next(Primitive::Select, RemoteError::other("timeout"));
        let result = hook.refetch().await;
        assert!(matches!(result, Err(SyncError::Remote(_))));
        assert_eq!(hook.count(None), 1);
        assert!(!hook.loading());
    }

    #[tokio::test]
    async fn test_create_failure_leaves_cache() {
        let (store, hook) = hook();
        let user = UserId::now_v7();
        hook.apply_session(SessionState::Identified(user));
        hook.refetch().await.unwrap();

        store.fail_next(Primitive::Insert, RemoteError::other("503"));
        let key = RecordKey::new(PostId::now_v7());
        assert!(matches!(hook.create(key).await, Err(SyncError::Remote(_))));
        assert!(!hook.is_member(&key));
    }

    #[tokio::test]
    async fn test_reapplying_same_session_is_noop() {
        let (_, hook) = hook();
        let user = UserId::now_v7();
        assert!(hook.apply_session(SessionState::Identified(user)));
        let mark = hook.watermark();
        assert!(!hook.apply_session(SessionState::Identified(user)));
        assert_eq!(hook.watermark(), mark);
        assert!(!hook.apply_session(SessionState::Unresolved));
        assert_eq!(hook.session(), SessionState::Identified(user));
    }
}

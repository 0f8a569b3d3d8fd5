//! In-memory remote store.
//!
//! Behaves like the relational store for a single table: owner-scoped
//! selects, unique slots where the resource demands them, server-assigned ids
//! and timestamps. On top of that it counts calls, can fail the next call of
//! a primitive on demand, and can hold responses back so tests can interleave
//! session changes with in-flight requests.

use crate::remote::{Primitive, RemoteStore, StoreStatistics};
use ::async_trait::async_trait;
use chrono::{Duration, Utc};
use coursekeep_core::{
    EntityIdType, FetchOrder, NewRecord, Record, RecordId, RecordKey, RemoteError, Resource,
    Timestamp, UserId,
};
use std::collections::{HashMap, VecDeque};
use std::marker::PhantomData;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError, RwLock};
use tokio::sync::watch;

/// Holds responses of one primitive until released.
#[derive(Debug)]
struct Gate {
    paused: watch::Sender<bool>,
    pending: AtomicUsize,
}

impl Gate {
    fn new() -> Self {
        let (paused, _) = watch::channel(false);
        Self {
            paused,
            pending: AtomicUsize::new(0),
        }
    }

    fn set_paused(&self, paused: bool) {
        self.paused.send_replace(paused);
    }

    async fn pass(&self) {
        let mut rx = self.paused.subscribe();
        if !*rx.borrow_and_update() {
            return;
        }
        self.pending.fetch_add(1, Ordering::SeqCst);
        // The sender lives as long as `self`, so the channel cannot close here.
        let _ = rx.wait_for(|paused| !*paused).await;
        self.pending.fetch_sub(1, Ordering::SeqCst);
    }

    fn pending(&self) -> usize {
        self.pending.load(Ordering::SeqCst)
    }
}

/// Table-in-a-Vec implementation of [`RemoteStore`].
#[derive(Debug)]
pub struct InMemoryRemoteStore<R: Resource> {
    rows: RwLock<Vec<Record<R>>>,
    last_created_at: Mutex<Option<Timestamp>>,
    failures: Mutex<HashMap<Primitive, VecDeque<RemoteError>>>,
    selects: AtomicU64,
    inserts: AtomicU64,
    deletes: AtomicU64,
    select_gate: Gate,
    insert_gate: Gate,
    delete_gate: Gate,
    _resource: PhantomData<R>,
}

impl<R: Resource> Default for InMemoryRemoteStore<R> {
    fn default() -> Self {
        Self {
            rows: RwLock::new(Vec::new()),
            last_created_at: Mutex::new(None),
            failures: Mutex::new(HashMap::new()),
            selects: AtomicU64::new(0),
            inserts: AtomicU64::new(0),
            deletes: AtomicU64::new(0),
            select_gate: Gate::new(),
            insert_gate: Gate::new(),
            delete_gate: Gate::new(),
            _resource: PhantomData,
        }
    }
}

impl<R: Resource> InMemoryRemoteStore<R> {
    pub fn new() -> Self {
        Self::default()
    }

    // ========================================================================
    // TEST CONTROLS
    // ========================================================================

    /// Make the next call of `primitive` fail with `err`. Queued failures are
    /// consumed in order.
    pub fn fail_next(&self, primitive: Primitive, err: RemoteError) {
        self.failures
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(primitive)
            .or_default()
            .push_back(err);
    }

    /// Hold back responses of `primitive` until [`resume`](Self::resume).
    ///
    /// A held select has already read its rows; a held insert or delete has
    /// already been applied. Only the response is delayed.
    pub fn pause(&self, primitive: Primitive) {
        self.gate(primitive).set_paused(true);
    }

    /// Release held responses of `primitive`.
    pub fn resume(&self, primitive: Primitive) {
        self.gate(primitive).set_paused(false);
    }

    /// Number of responses of `primitive` currently held back.
    pub fn pending(&self, primitive: Primitive) -> usize {
        self.gate(primitive).pending()
    }

    pub fn pause_selects(&self) {
        self.pause(Primitive::Select);
    }

    pub fn resume_selects(&self) {
        self.resume(Primitive::Select);
    }

    pub fn pending_selects(&self) -> usize {
        self.pending(Primitive::Select)
    }

    /// Call counts so far.
    pub fn statistics(&self) -> StoreStatistics {
        StoreStatistics {
            selects: self.selects.load(Ordering::SeqCst),
            inserts: self.inserts.load(Ordering::SeqCst),
            deletes: self.deletes.load(Ordering::SeqCst),
        }
    }

    // ========================================================================
    // DIRECT TABLE ACCESS
    // ========================================================================

    /// Insert a row without going through the counted primitives.
    pub fn seed(&self, owner: UserId, key: RecordKey<R>) -> Record<R> {
        let record =
            NewRecord::new(owner, key).into_record(RecordId::now_v7(), self.next_timestamp());
        self.rows
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(record.clone());
        record
    }

    /// Rows currently stored for `owner`, in fetch order.
    pub fn rows_for(&self, owner: UserId) -> Vec<Record<R>> {
        let rows = self.rows.read().unwrap_or_else(PoisonError::into_inner);
        let mut owned: Vec<Record<R>> = rows
            .iter()
            .filter(|r| r.owner_user_id == owner)
            .cloned()
            .collect();
        if R::ORDER == FetchOrder::CreatedAtDesc {
            owned.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        }
        owned
    }

    /// Total rows across all owners.
    pub fn row_count(&self) -> usize {
        self.rows.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Drop every row.
    pub fn clear(&self) {
        self.rows.write().unwrap_or_else(PoisonError::into_inner).clear();
    }

    // ========================================================================
    // INTERNALS
    // ========================================================================

    fn gate(&self, primitive: Primitive) -> &Gate {
        match primitive {
            Primitive::Select => &self.select_gate,
            Primitive::Insert => &self.insert_gate,
            Primitive::Delete => &self.delete_gate,
        }
    }

    fn take_failure(&self, primitive: Primitive) -> Option<RemoteError> {
        self.failures
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get_mut(&primitive)
            .and_then(VecDeque::pop_front)
    }

    /// Strictly increasing creation timestamps, so desc ordering is stable
    /// even when inserts land within the same clock tick.
    fn next_timestamp(&self) -> Timestamp {
        let mut last = self
            .last_created_at
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let now = Utc::now();
        let ts = match *last {
            Some(prev) if now <= prev => prev + Duration::microseconds(1),
            _ => now,
        };
        *last = Some(ts);
        ts
    }
}

#[async_trait]
impl<R: Resource> RemoteStore<R> for InMemoryRemoteStore<R> {
    async fn select(&self, owner: UserId) -> Result<Vec<Record<R>>, RemoteError> {
        self.selects.fetch_add(1, Ordering::SeqCst);
        if let Some(err) = self.take_failure(Primitive::Select) {
            self.select_gate.pass().await;
            return Err(err);
        }
        let rows = self.rows_for(owner);
        tracing::debug!(table = R::KIND.table(), owner = %owner, rows = rows.len(), "select");
        self.select_gate.pass().await;
        Ok(rows)
    }

    async fn insert(&self, record: &NewRecord<R>) -> Result<Record<R>, RemoteError> {
        self.inserts.fetch_add(1, Ordering::SeqCst);
        let result = match self.take_failure(Primitive::Insert) {
            Some(err) => Err(err),
            None => {
                let key = record.key();
                let mut rows = self.rows.write().unwrap_or_else(PoisonError::into_inner);
                let taken = R::UNIQUE
                    && rows
                        .iter()
                        .any(|r| r.owner_user_id == record.owner_user_id && key.same_slot(r));
                if taken {
                    Err(RemoteError::duplicate(R::KIND))
                } else {
                    let stored = record
                        .clone()
                        .into_record(RecordId::now_v7(), self.next_timestamp());
                    rows.push(stored.clone());
                    tracing::debug!(table = R::KIND.table(), key = %key, "insert");
                    Ok(stored)
                }
            }
        };
        self.insert_gate.pass().await;
        result
    }

    async fn delete(&self, owner: UserId, key: &RecordKey<R>) -> Result<u64, RemoteError> {
        self.deletes.fetch_add(1, Ordering::SeqCst);
        let result = match self.take_failure(Primitive::Delete) {
            Some(err) => Err(err),
            None => {
                let mut rows = self.rows.write().unwrap_or_else(PoisonError::into_inner);
                let before = rows.len();
                rows.retain(|r| !(r.owner_user_id == owner && key.matches(r)));
                let removed = (before - rows.len()) as u64;
                tracing::debug!(table = R::KIND.table(), key = %key, removed, "delete");
                Ok(removed)
            }
        };
        self.delete_gate.pass().await;
        result
    }
}

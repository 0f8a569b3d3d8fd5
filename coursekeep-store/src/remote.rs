//! Remote-store boundary.
//!
//! The synchronization layer never talks to a database directly. Every
//! resource goes through a [`RemoteStore`] that offers three primitives:
//! select the owner's records, insert one, delete by key. Implementations
//! are expected to enforce owner scoping and, where `R::UNIQUE` holds, the
//! one-record-per-slot constraint.

use ::async_trait::async_trait;
use coursekeep_core::{NewRecord, Record, RecordKey, RemoteError, Resource, UserId};
use std::fmt;
use std::sync::Arc;

/// The three primitives the remote store offers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Primitive {
    Select,
    Insert,
    Delete,
}

impl Primitive {
    pub fn as_str(&self) -> &'static str {
        match self {
            Primitive::Select => "select",
            Primitive::Insert => "insert",
            Primitive::Delete => "delete",
        }
    }
}

impl fmt::Display for Primitive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Async boundary to the remote relational store for one resource type.
#[async_trait]
pub trait RemoteStore<R: Resource>: Send + Sync {
    /// All records owned by `owner`.
    async fn select(&self, owner: UserId) -> Result<Vec<Record<R>>, RemoteError>;

    /// Insert a record, returning it with server-assigned id and timestamp.
    ///
    /// Fails with a duplicate [`RemoteError`] when the slot is already taken
    /// and the resource is unique.
    async fn insert(&self, record: &NewRecord<R>) -> Result<Record<R>, RemoteError>;

    /// Delete every record of `owner` matching `key`. Returns the number of
    /// rows removed; zero is not an error.
    async fn delete(&self, owner: UserId, key: &RecordKey<R>) -> Result<u64, RemoteError>;
}

#[async_trait]
impl<R, S> RemoteStore<R> for Arc<S>
where
    R: Resource,
    S: RemoteStore<R> + ?Sized,
{
    async fn select(&self, owner: UserId) -> Result<Vec<Record<R>>, RemoteError> {
        (**self).select(owner).await
    }

    async fn insert(&self, record: &NewRecord<R>) -> Result<Record<R>, RemoteError> {
        (**self).insert(record).await
    }

    async fn delete(&self, owner: UserId, key: &RecordKey<R>) -> Result<u64, RemoteError> {
        (**self).delete(owner, key).await
    }
}

/// Per-primitive call counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StoreStatistics {
    pub selects: u64,
    pub inserts: u64,
    pub deletes: u64,
}

impl StoreStatistics {
    /// Total calls across all primitives.
    pub fn total(&self) -> u64 {
        self.selects + self.inserts + self.deletes
    }
}

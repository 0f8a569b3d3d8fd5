//! Coursekeep Store - Remote Boundary and Record Cache
//!
//! The async [`RemoteStore`] trait the synchronization layer talks to, an
//! in-memory implementation of it, and the owner-scoped [`RecordCache`].

pub mod cache;
pub mod memory;
pub mod remote;

pub use cache::{RecordCache, Watermark};
pub use memory::InMemoryRemoteStore;
pub use remote::{Primitive, RemoteStore, StoreStatistics};

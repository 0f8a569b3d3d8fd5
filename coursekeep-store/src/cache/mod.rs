//! Owner-scoped record cache with stale-response protection.
//!
//! The cache holds one owner's records for one resource. Writes carry the
//! [`Watermark`] (or its epoch) observed before the network call that
//! produced them, and are refused once the cache has moved on.
//!
//! # Example
//!
//! ```ignore
//! let mark = cache.scope_to(Some(user));
//! let rows = store.select(user).await?;
//! // Refused if the user logged out or a mutation landed meanwhile.
//! cache.replace_if_current(mark, rows)?;
//! ```

pub mod record_cache;
pub mod watermark;

pub use record_cache::RecordCache;
pub use watermark::Watermark;

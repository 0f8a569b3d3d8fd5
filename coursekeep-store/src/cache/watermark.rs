//! Watermark for discarding responses that raced a session change or a
//! newer mutation.
//!
//! A fetch or mutation captures the cache's watermark before it suspends on
//! the network and compares it on resumption. The epoch moves whenever the
//! cache changes owner (identify, logout, user switch); the mutation counter
//! moves whenever a confirmed mutation changes the cached set.

/// A point in a cache's history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Watermark {
    /// Ownership generation. Bumped on every scope change.
    pub epoch: u64,
    /// Confirmed mutations applied, monotonically increasing.
    pub mutations: u64,
}

impl Watermark {
    /// The watermark of a freshly created cache.
    pub fn zero() -> Self {
        Self::default()
    }

    /// Watermark after an ownership change.
    pub fn next_epoch(self) -> Self {
        Self {
            epoch: self.epoch + 1,
            mutations: self.mutations,
        }
    }

    /// Watermark after a confirmed mutation.
    pub fn next_mutation(self) -> Self {
        Self {
            epoch: self.epoch,
            mutations: self.mutations + 1,
        }
    }

    /// Whether both watermarks belong to the same ownership generation.
    pub fn same_epoch(&self, other: &Watermark) -> bool {
        self.epoch == other.epoch
    }
}

//! Derived views: pure, synchronous queries over a cached record set.
//!
//! Nothing here touches the network. Callers pass whatever is currently
//! cached, stale or not.

use crate::{AppRole, Record, RecordKey, Resource, RoleAssignment};

/// True iff some record matches `key`.
pub fn is_member<R: Resource>(records: &[Record<R>], key: &RecordKey<R>) -> bool {
    records.iter().any(|r| key.matches(r))
}

/// Number of records, or of records matching a (partial) key.
pub fn count<R: Resource>(records: &[Record<R>], key: Option<&RecordKey<R>>) -> usize {
    match key {
        Some(key) => records.iter().filter(|r| key.matches(r)).count(),
        None => records.len(),
    }
}

/// `round(100 * completed / total)` with round-half-up, clamped to `0..=100`.
///
/// Returns 0 when `total_units` is 0.
pub fn progress_percentage(completed: usize, total_units: usize) -> u8 {
    if total_units == 0 {
        return 0;
    }
    // Widened so any usize inputs fit.
    let completed = completed.min(total_units) as u128;
    let total = total_units as u128;
    // (2 * 100 * c + t) / (2 * t) == floor(100 * c / t + 0.5)
    ((200 * completed + total) / (2 * total)) as u8
}

/// True iff a role assignment for `role` is cached.
pub fn has_role(records: &[Record<RoleAssignment>], role: AppRole) -> bool {
    is_member(records, &RecordKey::new(role))
}

use super::NotifyingSync;
use crate::hook::ResourceSync;
use crate::notifier::Notifier;
use coursekeep_core::{view, AppRole, Outcome, Record, RecordKey, RoleAssignment, SyncResult};
use std::sync::Arc;

/// Roles granted to the current user.
///
/// The remote table does not enforce one row per role, so the same role may
/// be cached more than once; [`roles`](Self::roles) collapses repeats.
#[derive(Clone)]
pub struct UserRoles {
    inner: NotifyingSync<RoleAssignment>,
}

impl UserRoles {
    pub fn new(sync: ResourceSync<RoleAssignment>, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            inner: NotifyingSync::new(sync, notifier),
        }
    }

    pub fn has_role(&self, role: AppRole) -> bool {
        self.inner
            .sync
            .with_records(|records| view::has_role(records, role))
    }

    pub fn is_admin(&self) -> bool {
        self.has_role(AppRole::Admin)
    }

    pub fn is_instructor(&self) -> bool {
        self.has_role(AppRole::Instructor)
    }

    pub fn is_student(&self) -> bool {
        self.has_role(AppRole::Student)
    }

    /// Distinct cached roles, in [`AppRole::ALL`] order.
    pub fn roles(&self) -> Vec<AppRole> {
        AppRole::ALL
            .into_iter()
            .filter(|role| self.has_role(*role))
            .collect()
    }

    pub async fn grant(&self, role: AppRole) -> Outcome {
        self.inner.create(RecordKey::new(role)).await
    }

    /// Drop every assignment of `role`.
    pub async fn revoke(&self, role: AppRole) -> Outcome {
        self.inner.remove(RecordKey::new(role)).await
    }

    pub async fn refetch(&self) -> SyncResult<usize> {
        self.inner.sync.refetch().await
    }

    pub fn records(&self) -> Vec<Record<RoleAssignment>> {
        self.inner.sync.records()
    }

    pub fn loading(&self) -> bool {
        self.inner.sync.loading()
    }

    pub fn hook(&self) -> &ResourceSync<RoleAssignment> {
        &self.inner.sync
    }
}

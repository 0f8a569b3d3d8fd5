//! Bundle of every per-user hook, driven by one Session Gate.

use crate::config::RemoteConfig;
use crate::hook::ResourceSync;
use crate::notifier::Notifier;
use crate::resources::{Enrollments, InstructorFollows, LessonProgressTracker, SavedPosts, UserRoles};
use crate::rest::{RestClientError, RestRemoteStore};
use crate::session::{AuthSnapshot, SessionGate, SessionState, SessionTransition};
use coursekeep_core::{
    Enrollment, InstructorFollow, LessonProgress, ResourceKind, RoleAssignment, SavedPost,
    SyncError, SyncResult,
};
use coursekeep_store::RemoteStore;
use futures_util::future::{join_all, BoxFuture, FutureExt};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;

// ============================================================================
// REMOTE STORES
// ============================================================================

/// One remote store per resource.
#[derive(Clone)]
pub struct RemoteStores {
    pub enrollments: Arc<dyn RemoteStore<Enrollment>>,
    pub lesson_progress: Arc<dyn RemoteStore<LessonProgress>>,
    pub instructor_follows: Arc<dyn RemoteStore<InstructorFollow>>,
    pub saved_posts: Arc<dyn RemoteStore<SavedPost>>,
    pub user_roles: Arc<dyn RemoteStore<RoleAssignment>>,
}

impl RemoteStores {
    /// REST stores sharing one HTTP client.
    pub fn rest(
        config: &RemoteConfig,
        access_token: Option<&str>,
    ) -> Result<Self, RestClientError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.request_timeout_ms))
            .build()?;

        fn build<R: coursekeep_core::Resource>(
            client: &reqwest::Client,
            config: &RemoteConfig,
            token: Option<&str>,
        ) -> Result<Arc<dyn RemoteStore<R>>, RestClientError> {
            let store = RestRemoteStore::<R>::with_client(client.clone(), config)?;
            let store = match token {
                Some(token) => store.with_access_token(token)?,
                None => store,
            };
            Ok(Arc::new(store))
        }

        Ok(Self {
            enrollments: build(&client, config, access_token)?,
            lesson_progress: build(&client, config, access_token)?,
            instructor_follows: build(&client, config, access_token)?,
            saved_posts: build(&client, config, access_token)?,
            user_roles: build(&client, config, access_token)?,
        })
    }
}

// ============================================================================
// REFRESH REPORT
// ============================================================================

/// Per-resource result of a fan-out refetch.
#[derive(Debug, Clone, Default)]
pub struct RefreshReport {
    pub results: Vec<(ResourceKind, SyncResult<usize>)>,
}

impl RefreshReport {
    /// Resources whose fetch failed remotely. Stale and blocked fetches are
    /// not failures.
    pub fn failures(&self) -> Vec<ResourceKind> {
        self.results
            .iter()
            .filter(|(_, r)| matches!(r, Err(SyncError::Remote(_))))
            .map(|(kind, _)| *kind)
            .collect()
    }

    /// Total records cached by the fetches that landed.
    pub fn fetched(&self) -> usize {
        self.results
            .iter()
            .filter_map(|(_, r)| r.as_ref().ok())
            .sum()
    }
}

/// What [`UserData::observe`] did.
#[derive(Debug, Clone)]
pub struct SessionUpdate {
    pub transition: SessionTransition,
    /// Present when the transition identified a user and hooks were refetched.
    pub refresh: Option<RefreshReport>,
}

// ============================================================================
// USER DATA
// ============================================================================

/// The Session Gate together with every resource hook it drives.
#[derive(Clone)]
pub struct UserData {
    gate: Arc<SessionGate>,
    pub enrollments: Enrollments,
    pub lesson_progress: LessonProgressTracker,
    pub instructor_follows: InstructorFollows,
    pub saved_posts: SavedPosts,
    pub user_roles: UserRoles,
}

impl UserData {
    pub fn new(stores: RemoteStores, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            gate: Arc::new(SessionGate::new()),
            enrollments: Enrollments::new(ResourceSync::new(stores.enrollments), notifier.clone()),
            lesson_progress: LessonProgressTracker::new(
                ResourceSync::new(stores.lesson_progress),
                notifier.clone(),
            ),
            instructor_follows: InstructorFollows::new(
                ResourceSync::new(stores.instructor_follows),
                notifier.clone(),
            ),
            saved_posts: SavedPosts::new(ResourceSync::new(stores.saved_posts), notifier.clone()),
            user_roles: UserRoles::new(ResourceSync::new(stores.user_roles), notifier),
        }
    }

    pub fn gate(&self) -> &SessionGate {
        &self.gate
    }

    pub fn session(&self) -> SessionState {
        self.gate.current()
    }

    /// Feed provider signals through the gate.
    ///
    /// A real transition resets every hook before this returns control to
    /// the executor, then refetches all of them concurrently.
    pub async fn observe(&self, snapshot: AuthSnapshot) -> SessionUpdate {
        let transition = self.gate.observe(snapshot);
        let mut refresh = None;
        if let Some(state) = transition.target() {
            if self.apply(state) && state.user().is_some() {
                refresh = Some(self.refetch_all().await);
            }
        }
        SessionUpdate {
            transition,
            refresh,
        }
    }

    /// Align every hook with `state`. Returns whether any hook changed.
    fn apply(&self, state: SessionState) -> bool {
        let changed = [
            self.enrollments.hook().apply_session(state),
            self.lesson_progress.hook().apply_session(state),
            self.instructor_follows.hook().apply_session(state),
            self.saved_posts.hook().apply_session(state),
            self.user_roles.hook().apply_session(state),
        ];
        changed.into_iter().any(|c| c)
    }

    /// Refetch every resource concurrently.
    pub async fn refetch_all(&self) -> RefreshReport {
        type Tagged<'a> = BoxFuture<'a, (ResourceKind, SyncResult<usize>)>;

        fn tagged<'a, F>(kind: ResourceKind, fut: F) -> Tagged<'a>
        where
            F: std::future::Future<Output = SyncResult<usize>> + Send + 'a,
        {
            fut.map(move |r| (kind, r)).boxed()
        }

        let fetches = vec![
            tagged(ResourceKind::Enrollment, self.enrollments.refetch()),
            tagged(ResourceKind::LessonProgress, self.lesson_progress.refetch()),
            tagged(ResourceKind::InstructorFollow, self.instructor_follows.refetch()),
            tagged(ResourceKind::SavedPost, self.saved_posts.refetch()),
            tagged(ResourceKind::RoleAssignment, self.user_roles.refetch()),
        ];
        let report = RefreshReport {
            results: join_all(fetches).await,
        };
        let failures = report.failures();
        if !failures.is_empty() {
            tracing::warn!(?failures, "Some resources failed to refresh");
        }
        report
    }

    /// Follow the gate from a background task until `shutdown_rx` flips.
    ///
    /// Use this when something other than [`observe`](Self::observe) feeds
    /// the gate. Each change resets the hooks at once; refetches run in
    /// their own tasks so a later change is never queued behind them.
    pub fn spawn_session_listener(&self, mut shutdown_rx: watch::Receiver<bool>) -> JoinHandle<()> {
        let data = self.clone();
        let mut session_rx = self.gate.subscribe();

        tokio::spawn(async move {
            tracing::info!("Session listener started");
            loop {
                let state = *session_rx.borrow_and_update();
                if state.is_resolved() && data.apply(state) && state.user().is_some() {
                    let refresher = data.clone();
                    tokio::spawn(async move {
                        refresher.refetch_all().await;
                    });
                }

                tokio::select! {
                    changed = session_rx.changed() => {
                        if changed.is_err() {
                            break;
                        }
                    }
                    changed = shutdown_rx.changed() => {
                        if changed.is_err() || *shutdown_rx.borrow() {
                            break;
                        }
                    }
                }
            }
            tracing::info!("Session listener shutting down");
        })
    }
}

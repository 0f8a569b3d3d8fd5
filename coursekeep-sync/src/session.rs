//! Session Gate: the three-state authentication lifecycle every hook keys off.
//!
//! The authentication provider is external. It reports two signals, a
//! loading flag and the current user, which the gate folds into a
//! [`SessionState`] and publishes on a `watch` channel. Dependents either
//! subscribe to the channel or receive transitions from [`crate::UserData`].

use coursekeep_core::UserId;
use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::sync::watch;

/// Raw signals from the authentication provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AuthSnapshot {
    pub session_loading: bool,
    pub current_user: Option<UserId>,
}

impl AuthSnapshot {
    /// The provider is still restoring the session.
    pub fn loading() -> Self {
        Self {
            session_loading: true,
            current_user: None,
        }
    }

    pub fn anonymous() -> Self {
        Self {
            session_loading: false,
            current_user: None,
        }
    }

    pub fn identified(user: UserId) -> Self {
        Self {
            session_loading: false,
            current_user: Some(user),
        }
    }
}

/// Lifecycle state derived from an [`AuthSnapshot`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(tag = "state", content = "user", rename_all = "snake_case")]
pub enum SessionState {
    /// Session not yet restored; every dependent defers.
    #[default]
    Unresolved,
    Anonymous,
    Identified(UserId),
}

impl SessionState {
    pub fn from_snapshot(snapshot: AuthSnapshot) -> Self {
        match (snapshot.session_loading, snapshot.current_user) {
            (true, _) => SessionState::Unresolved,
            (false, None) => SessionState::Anonymous,
            (false, Some(user)) => SessionState::Identified(user),
        }
    }

    pub fn is_resolved(&self) -> bool {
        !matches!(self, SessionState::Unresolved)
    }

    /// The identified user, if any.
    pub fn user(&self) -> Option<UserId> {
        match self {
            SessionState::Identified(user) => Some(*user),
            _ => None,
        }
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionState::Unresolved => f.write_str("unresolved"),
            SessionState::Anonymous => f.write_str("anonymous"),
            SessionState::Identified(user) => write!(f, "identified({user})"),
        }
    }
}

/// What feeding a snapshot into the gate did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionTransition {
    /// Derived state equals the current one.
    Unchanged,
    Changed {
        from: SessionState,
        to: SessionState,
    },
    /// The snapshot asked to go back to `Unresolved` after resolution and
    /// was ignored.
    Rejected { current: SessionState },
}

impl SessionTransition {
    /// The new state, if the transition changed anything.
    pub fn target(&self) -> Option<SessionState> {
        match self {
            SessionTransition::Changed { to, .. } => Some(*to),
            _ => None,
        }
    }

    /// Whether dependents must reset their caches and refetch.
    pub fn requires_reset(&self) -> bool {
        matches!(self, SessionTransition::Changed { .. })
    }
}

/// Observable holder of the current [`SessionState`].
#[derive(Debug)]
pub struct SessionGate {
    state: watch::Sender<SessionState>,
}

impl Default for SessionGate {
    fn default() -> Self {
        let (state, _) = watch::channel(SessionState::Unresolved);
        Self { state }
    }
}

impl SessionGate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> SessionState {
        *self.state.borrow()
    }

    /// Receiver that sees every published state change.
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    /// Re-evaluate the lifecycle from fresh provider signals.
    pub fn observe(&self, snapshot: AuthSnapshot) -> SessionTransition {
        let next = SessionState::from_snapshot(snapshot);
        let mut transition = SessionTransition::Unchanged;

        // Compare and publish under the channel's lock.
        self.state.send_if_modified(|current| {
            if *current == next {
                return false;
            }
            if current.is_resolved() && !next.is_resolved() {
                transition = SessionTransition::Rejected { current: *current };
                return false;
            }
            transition = SessionTransition::Changed {
                from: *current,
                to: next,
            };
            *current = next;
            true
        });

        match transition {
            SessionTransition::Rejected { current } => tracing::warn!(
                current = %current,
                "Session gate asked to re-enter unresolved after resolution; ignoring"
            ),
            SessionTransition::Changed { from, to } => {
                tracing::info!(from = %from, to = %to, "Session transition")
            }
            SessionTransition::Unchanged => {}
        }
        transition
    }
}

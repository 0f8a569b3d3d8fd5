//! Coursekeep Sync - Session-Gated Record Synchronization
//!
//! Keeps a signed-in user's enrollments, lesson completions, instructor
//! follows, saved posts and roles consistent between an in-memory cache and
//! the remote store.

pub mod config;
pub mod error;
pub mod hook;
pub mod notifier;
pub mod resources;
pub mod rest;
pub mod session;
pub mod telemetry;
pub mod user_data;

pub use config::{ConfigError, LoggingConfig, RemoteConfig, SyncConfig};
pub use error::{ClientError, ClientResult};
pub use hook::ResourceSync;
pub use notifier::{
    Mutation, Notice, NoticeAction, NoticeLevel, Notifier, RecordingNotifier, TracingNotifier,
};
pub use resources::{Enrollments, InstructorFollows, LessonProgressTracker, SavedPosts, UserRoles};
pub use rest::{RestClientError, RestRemoteStore};
pub use session::{AuthSnapshot, SessionGate, SessionState, SessionTransition};
pub use telemetry::{init_tracing, TelemetryError};
pub use user_data::{RefreshReport, RemoteStores, SessionUpdate, UserData};

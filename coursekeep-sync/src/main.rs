//! Coursekeep entry point: load one user's records and print a summary.
//!
//! Usage: `coursekeep --config <path> --user <uuid> [--access-token <jwt>]`

use coursekeep_core::{EntityIdType, UserId};
use coursekeep_sync::{
    init_tracing, AuthSnapshot, ClientError, ClientResult, RemoteStores, SyncConfig,
    TracingNotifier, UserData,
};
use std::sync::Arc;

#[tokio::main(flavor = "current_thread")]
async fn main() -> ClientResult<()> {
    let config = SyncConfig::load()?;
    init_tracing(&config.logging)?;

    let user = parse_user(arg_value("--user"))?;
    let token = arg_value("--access-token");

    let stores = RemoteStores::rest(&config.remote, token.as_deref())?;
    let data = UserData::new(stores, Arc::new(TracingNotifier));

    let update = data.observe(AuthSnapshot::identified(user)).await;
    let report = update.refresh.unwrap_or_default();

    let summary = serde_json::json!({
        "user": user,
        "enrolled_courses": data.enrollments.enrolled_course_ids(),
        "completed_lessons": data.lesson_progress.records().len(),
        "following": data.instructor_follows.followed_instructor_ids(),
        "saved_posts": data.saved_posts.saved_post_ids(),
        "roles": data.user_roles.roles(),
        "failed_resources": report.failures(),
    });
    println!("{summary:#}");
    Ok(())
}

fn arg_value(flag: &str) -> Option<String> {
    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        if arg == flag {
            return args.next();
        }
    }
    None
}

fn parse_user(raw: Option<String>) -> ClientResult<UserId> {
    let raw = raw.ok_or(ClientError::InvalidArgument {
        name: "--user",
        reason: "required".to_string(),
    })?;
    let uuid = raw.parse().map_err(|e: uuid::Error| ClientError::InvalidArgument {
        name: "--user",
        reason: e.to_string(),
    })?;
    Ok(UserId::new(uuid))
}

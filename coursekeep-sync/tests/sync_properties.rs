use coursekeep_core::{
    CourseId, EntityIdType, InstructorId, LessonId, LessonProgress, Outcome, PostId, RecordKey,
    RemoteError, ResourceKind, SavedPost, SyncError, UserId,
};
use coursekeep_sync::{AuthSnapshot, Mutation, NoticeAction, SessionState};
use coursekeep_test_utils::assertions::{assert_owned_by, assert_single_slot, assert_succeeded};
use coursekeep_test_utils::fixtures::{self, identified_hook};
use coursekeep_test_utils::generators::{arb_lesson_key, arb_post_key, arb_progress};
use coursekeep_test_utils::Primitive;
use proptest::prelude::*;
use std::future::Future;

fn block_on<F: Future>(fut: F) -> F::Output {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap()
        .block_on(fut)
}

// ============================================================================
// IDEMPOTENCE
// ============================================================================

proptest! {
    #[test]
    fn prop_create_twice_keeps_one_record(key in arb_post_key()) {
        let user = UserId::now_v7();
        let (store, hook) = identified_hook::<SavedPost>(user);
        let (first, second) = block_on(async {
            hook.refetch().await.unwrap();
            let first = Outcome::from(&hook.create(key).await);
            let second = Outcome::from(&hook.create(key).await);
            (first, second)
        });

        prop_assert_eq!(first, Outcome::Success);
        prop_assert_eq!(second, Outcome::AlreadyDone);
        prop_assert_eq!(hook.count(None), 1);
        prop_assert_eq!(store.rows_for(user).len(), 1);
    }

    #[test]
    fn prop_lesson_create_twice_keeps_one_record(key in arb_lesson_key()) {
        let user = UserId::now_v7();
        let (_, hook) = identified_hook::<LessonProgress>(user);
        let outcomes = block_on(async {
            hook.refetch().await.unwrap();
            let a = Outcome::from(&hook.create(key).await);
            let b = Outcome::from(&hook.create(key).await);
            [a, b]
        });

        prop_assert_eq!(outcomes, [Outcome::Success, Outcome::AlreadyDone]);
        assert_single_slot(&hook.records(), &key);
    }

    #[test]
    fn prop_remove_absent_key_is_noop_success(present in arb_post_key(), absent in arb_post_key()) {
        prop_assume!(present != absent);
        let user = UserId::now_v7();
        let (store, hook) = identified_hook::<SavedPost>(user);
        store.seed(user, present);

        let result = block_on(async {
            hook.refetch().await.unwrap();
            hook.remove(absent).await
        });

        prop_assert_eq!(result, Ok(0));
        prop_assert_eq!(hook.records().len(), 1);
        prop_assert!(hook.is_member(&present));
    }

    #[test]
    fn prop_progress_matches_completed_lessons((completed, total) in arb_progress()) {
        let (data, _, _) = fixtures::user_data();
        let user = UserId::now_v7();
        let course = CourseId::now_v7();

        block_on(async {
            data.observe(AuthSnapshot::identified(user)).await;
            for _ in 0..completed {
                data.lesson_progress.mark_complete(course, LessonId::now_v7()).await;
            }
        });

        let expected = ((200 * completed + total) / (2 * total)) as u8;
        prop_assert_eq!(data.lesson_progress.completed_count(course), completed);
        prop_assert_eq!(data.lesson_progress.progress_percentage(course, total), expected);
    }
}

#[tokio::test]
async fn concurrent_duplicate_creates_resolve_to_success_and_already_done() {
    let (data, stores, _) = fixtures::user_data();
    let user = UserId::now_v7();
    data.observe(AuthSnapshot::identified(user)).await;

    let course = CourseId::now_v7();
    let (a, b) = tokio::join!(data.enrollments.enroll(course), data.enrollments.enroll(course));

    let mut outcomes = vec![a, b];
    outcomes.sort_by_key(|o| o.as_str());
    assert_eq!(outcomes, vec![Outcome::AlreadyDone, Outcome::Success]);
    assert_eq!(data.enrollments.records().len(), 1);
    assert_eq!(stores.enrollments.rows_for(user).len(), 1);
}

// ============================================================================
// SESSION GATING
// ============================================================================

#[tokio::test]
async fn anonymous_mutations_are_blocked_without_network() {
    let (data, stores, notifier) = fixtures::user_data();
    data.observe(AuthSnapshot::anonymous()).await;

    let course = CourseId::now_v7();
    assert_eq!(data.enrollments.enroll(course).await, Outcome::BlockedUnauthenticated);
    assert_eq!(data.enrollments.unenroll(course).await, Outcome::BlockedUnauthenticated);
    assert_eq!(
        data.saved_posts.toggle(PostId::now_v7()).await,
        Outcome::BlockedUnauthenticated
    );
    assert_eq!(
        data.lesson_progress.mark_complete(course, LessonId::now_v7()).await,
        Outcome::BlockedUnauthenticated
    );

    assert_eq!(stores.total_calls(), 0);
    assert!(data.enrollments.records().is_empty());
    assert!(!data.enrollments.loading());

    let notices = notifier.notices();
    assert_eq!(notices.len(), 4);
    assert!(notices
        .iter()
        .all(|n| n.action == Some(NoticeAction::SignIn)));
}

#[tokio::test]
async fn unresolved_session_defers_everything() {
    let (data, stores, _) = fixtures::user_data();

    assert!(data.enrollments.loading());
    assert_eq!(data.enrollments.refetch().await, Err(SyncError::Unauthenticated));
    assert_eq!(
        data.instructor_follows.follow(InstructorId::now_v7()).await,
        Outcome::BlockedUnauthenticated
    );
    assert_eq!(stores.total_calls(), 0);
    assert!(data.enrollments.loading());
}

#[tokio::test]
async fn logout_empties_every_cache() {
    let (data, stores, _) = fixtures::user_data();
    let user = UserId::now_v7();
    stores.enrollments.seed(user, RecordKey::new(CourseId::now_v7()));
    stores.saved_posts.seed(user, RecordKey::new(PostId::now_v7()));
    stores
        .lesson_progress
        .seed(user, RecordKey::with_sub(CourseId::now_v7(), LessonId::now_v7()));

    let update = data.observe(AuthSnapshot::identified(user)).await;
    let report = update.refresh.unwrap();
    assert_eq!(report.fetched(), 3);
    assert!(report.failures().is_empty());
    assert!(!data.enrollments.loading());

    let calls_before = stores.total_calls();
    let update = data.observe(AuthSnapshot::anonymous()).await;
    assert!(update.refresh.is_none());
    assert_eq!(stores.total_calls(), calls_before);

    assert!(data.enrollments.records().is_empty());
    assert!(data.saved_posts.records().is_empty());
    assert!(data.lesson_progress.records().is_empty());
    assert!(!data.enrollments.loading());
    assert!(!data.saved_posts.loading());
    assert_eq!(data.saved_posts.hook().session(), SessionState::Anonymous);
}

#[tokio::test]
async fn switching_users_replaces_cached_records() {
    let (data, stores, _) = fixtures::user_data();
    let alice = UserId::now_v7();
    let bob = UserId::now_v7();
    stores.saved_posts.seed(alice, RecordKey::new(PostId::now_v7()));
    stores.saved_posts.seed(alice, RecordKey::new(PostId::now_v7()));
    stores.saved_posts.seed(bob, RecordKey::new(PostId::now_v7()));

    data.observe(AuthSnapshot::identified(alice)).await;
    assert_eq!(data.saved_posts.saved_count(), 2);

    data.observe(AuthSnapshot::identified(bob)).await;
    assert_eq!(data.saved_posts.saved_count(), 1);
    assert_owned_by(&data.saved_posts.records(), bob);
    assert_eq!(data.saved_posts.hook().owner(), Some(bob));
}

#[tokio::test]
async fn reentering_unresolved_keeps_state() {
    let (data, stores, _) = fixtures::user_data();
    let user = UserId::now_v7();
    stores.saved_posts.seed(user, RecordKey::new(PostId::now_v7()));
    data.observe(AuthSnapshot::identified(user)).await;

    let update = data.observe(AuthSnapshot::loading()).await;
    assert!(!update.transition.requires_reset());
    assert_eq!(data.session(), SessionState::Identified(user));
    assert_eq!(data.saved_posts.saved_count(), 1);
}

// ============================================================================
// FETCH AND MUTATION FAILURES
// ============================================================================

#[tokio::test]
async fn fetch_failure_leaves_stale_data_and_clears_loading() {
    let (data, stores, _) = fixtures::user_data();
    let user = UserId::now_v7();
    stores.saved_posts.seed(user, RecordKey::new(PostId::now_v7()));
    data.observe(AuthSnapshot::identified(user)).await;

    stores.saved_posts.seed(user, RecordKey::new(PostId::now_v7()));
    stores
        .saved_posts
        .fail_next(Primitive::Select, RemoteError::other("connection reset"));

    let report = data.refetch_all().await;
    assert_eq!(report.failures(), vec![ResourceKind::SavedPost]);
    assert_eq!(data.saved_posts.saved_count(), 1);
    assert!(!data.saved_posts.loading());
}

#[tokio::test]
async fn failed_mutation_reports_retry_and_keeps_cache() {
    let (data, stores, notifier) = fixtures::user_data();
    let user = UserId::now_v7();
    data.observe(AuthSnapshot::identified(user)).await;

    stores
        .instructor_follows
        .fail_next(Primitive::Insert, RemoteError::classify(Some("42501"), "permission denied"));
    let instructor = InstructorId::now_v7();
    assert_eq!(data.instructor_follows.follow(instructor).await, Outcome::Failed);
    assert!(!data.instructor_follows.is_following(instructor));

    let notices = notifier.take();
    assert_eq!(notices.len(), 1);
    assert_eq!(notices[0].mutation, Mutation::Create);
    assert_eq!(notices[0].action, Some(NoticeAction::Retry));
}

#[tokio::test]
async fn failed_remove_reports_retry_and_keeps_cache() {
    let (data, stores, notifier) = fixtures::user_data();
    let user = UserId::now_v7();
    let post = PostId::now_v7();
    stores.saved_posts.seed(user, RecordKey::new(post));
    data.observe(AuthSnapshot::identified(user)).await;
    assert!(data.saved_posts.is_saved(post));

    stores
        .saved_posts
        .fail_next(Primitive::Delete, RemoteError::other("connection reset"));
    assert_eq!(data.saved_posts.unsave(post).await, Outcome::Failed);
    assert!(data.saved_posts.is_saved(post));
    assert_eq!(data.saved_posts.saved_count(), 1);
    assert_eq!(stores.saved_posts.rows_for(user).len(), 1);

    let notices = notifier.take();
    assert_eq!(notices.len(), 1);
    assert_eq!(notices[0].mutation, Mutation::Remove);
    assert_eq!(notices[0].action, Some(NoticeAction::Retry));
}

#[tokio::test]
async fn follow_caches_the_remote_record_verbatim() {
    let (data, stores, _) = fixtures::user_data();
    let user = UserId::now_v7();
    data.observe(AuthSnapshot::identified(user)).await;

    let instructor = InstructorId::now_v7();
    assert_succeeded(data.instructor_follows.follow(instructor).await);

    let remote = stores.instructor_follows.rows_for(user);
    assert_eq!(data.instructor_follows.records(), remote);
    assert_eq!(data.instructor_follows.following_count(), 1);

    assert_eq!(data.instructor_follows.toggle(instructor).await, Outcome::Success);
    assert!(!data.instructor_follows.is_following(instructor));
    assert!(stores.instructor_follows.rows_for(user).is_empty());
}

#[tokio::test]
async fn new_enrollments_are_listed_first() {
    let (data, stores, _) = fixtures::user_data();
    let user = UserId::now_v7();
    let older = CourseId::now_v7();
    stores.enrollments.seed(user, RecordKey::new(older));
    data.observe(AuthSnapshot::identified(user)).await;

    let newer = CourseId::now_v7();
    data.enrollments.enroll(newer).await;
    assert_eq!(data.enrollments.enrolled_course_ids(), vec![newer, older]);
}

// ============================================================================
// SCENARIO
// ============================================================================

#[tokio::test]
async fn enroll_then_complete_half_the_course() {
    let (data, _, notifier) = fixtures::user_data();
    let user = UserId::now_v7();
    data.observe(AuthSnapshot::identified(user)).await;

    let c1 = CourseId::now_v7();
    assert_eq!(data.enrollments.enroll(c1).await, Outcome::Success);
    assert_eq!(data.enrollments.enroll(c1).await, Outcome::AlreadyDone);
    assert_single_slot(&data.enrollments.records(), &RecordKey::new(c1));
    assert!(data.enrollments.is_enrolled(c1));

    let l1 = LessonId::now_v7();
    let l2 = LessonId::now_v7();
    assert_eq!(data.lesson_progress.mark_complete(c1, l1).await, Outcome::Success);
    assert_eq!(data.lesson_progress.mark_complete(c1, l2).await, Outcome::Success);
    assert_eq!(data.lesson_progress.progress_percentage(c1, 4), 50);
    assert_eq!(data.lesson_progress.progress_percentage(c1, 0), 0);
    assert!(data.lesson_progress.is_completed(c1, l1));

    assert_eq!(
        notifier.categories(),
        vec![
            Outcome::Success,
            Outcome::AlreadyDone,
            Outcome::Success,
            Outcome::Success
        ]
    );
    let already = &notifier.notices()[1];
    assert_eq!(already.message, "Already enrolled in this course");
}

#[tokio::test]
async fn percentage_boundaries() {
    let (data, _, _) = fixtures::user_data();
    data.observe(AuthSnapshot::identified(UserId::now_v7())).await;
    let course = CourseId::now_v7();

    for _ in 0..3 {
        data.lesson_progress.mark_complete(course, LessonId::now_v7()).await;
    }
    assert_eq!(data.lesson_progress.progress_percentage(course, 10), 30);

    let other = CourseId::now_v7();
    data.lesson_progress.mark_complete(other, LessonId::now_v7()).await;
    assert_eq!(data.lesson_progress.progress_percentage(other, 3), 33);
}

#[tokio::test]
async fn reset_course_clears_all_completions_of_that_course() {
    let (data, _, _) = fixtures::user_data();
    data.observe(AuthSnapshot::identified(UserId::now_v7())).await;
    let course = CourseId::now_v7();
    let other = CourseId::now_v7();
    let kept = LessonId::now_v7();

    data.lesson_progress.mark_complete(course, LessonId::now_v7()).await;
    data.lesson_progress.mark_complete(course, LessonId::now_v7()).await;
    data.lesson_progress.mark_complete(other, kept).await;

    assert_eq!(data.lesson_progress.reset_course(course).await, Outcome::Success);
    assert_eq!(data.lesson_progress.completed_count(course), 0);
    assert_eq!(data.lesson_progress.completed_lesson_ids(other), vec![kept]);
}

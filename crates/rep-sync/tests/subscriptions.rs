mod common;

use std::sync::atomic::Ordering;
use std::time::Duration;

use common::{counting_context, memory_context};
use rep_model::{NewWorkout, WorkoutId};
use rep_sync::{KeyPattern, MutationState, QueryState, SyncError, WorkoutBackend};

fn names(state: &QueryState<Vec<rep_model::Workout>>) -> Vec<String> {
    state
        .value()
        .map(|list| list.iter().map(|w| w.name.clone()).collect())
        .unwrap_or_default()
}

#[tokio::test]
async fn new_workout_is_listed_first_once_the_mutation_resolves() {
    let context = memory_context();
    context.create_workout("Push Day").wait().await.unwrap();

    let mut list = context.list_workouts();
    list.ready().await.unwrap();
    assert_eq!(names(&list.state()), ["Push Day"]);

    let created = context.create_workout("Leg Day").wait().await.unwrap();

    let state = list.state();
    assert_eq!(names(&state), ["Leg Day", "Push Day"]);
    assert_eq!(state.value().unwrap()[0].id, created.id);
}

#[tokio::test]
async fn each_signal_refetches_watched_keys_once() {
    let (context, counting) = counting_context(Duration::ZERO);
    let workout = context.create_workout("Push Day").wait().await.unwrap();

    let mut list = context.list_workouts();
    let mut detail = context.get_workout(workout.id);
    list.ready().await.unwrap();
    detail.ready().await.unwrap();
    assert_eq!((counting.lists(), counting.gets()), (1, 1));

    // Exercise changes touch the workout and the list.
    context
        .create_exercise(workout.id, "Bench Press")
        .wait()
        .await
        .unwrap();
    assert_eq!((counting.lists(), counting.gets()), (2, 2));
    assert_eq!(detail.state().value().unwrap().exercises.len(), 1);

    // New workouts only touch the list.
    context.create_workout("Leg Day").wait().await.unwrap();
    assert_eq!((counting.lists(), counting.gets()), (3, 2));
}

#[tokio::test]
async fn unwatched_keys_are_not_refetched() {
    let (context, counting) = counting_context(Duration::ZERO);
    let mut list = context.list_workouts();
    list.ready().await.unwrap();
    drop(list);

    context.create_workout("Push Day").wait().await.unwrap();
    assert_eq!(counting.lists(), 1);
}

#[tokio::test]
async fn missing_workout_is_not_found_rather_than_loading() {
    let context = memory_context();
    let mut query = context.get_workout(WorkoutId::new(999_999));
    assert!(query.state().is_loading());

    let state = query.ready().await.unwrap();
    assert!(matches!(state, QueryState::NotFound));
    assert!(state.value().is_none());
    assert!(state.error().is_none());
}

#[tokio::test]
async fn deleted_workout_turns_not_found_and_leaves_the_list() {
    let context = memory_context();
    let workout = context.create_workout("Temp").wait().await.unwrap();
    let mut list = context.list_workouts();
    let mut detail = context.get_workout(workout.id);
    list.ready().await.unwrap();
    detail.ready().await.unwrap();

    context.delete_workout(workout.id).wait().await.unwrap();

    assert!(matches!(detail.state(), QueryState::NotFound));
    assert!(names(&list.state()).is_empty());
}

#[tokio::test]
async fn retargeting_follows_the_new_id() {
    let context = memory_context();
    let a = context.create_workout("A").wait().await.unwrap();
    let b = context.create_workout("B").wait().await.unwrap();

    let mut query = context.get_workout(a.id);
    assert_eq!(query.ready().await.unwrap().value().unwrap().name, "A");

    query.retarget(b.id);
    assert_eq!(query.workout_id(), b.id);
    assert_eq!(query.ready().await.unwrap().value().unwrap().name, "B");

    // Changes to the old target no longer reach this query.
    context.create_exercise(a.id, "Squat").wait().await.unwrap();
    assert_eq!(query.state().value().unwrap().id, b.id);
}

#[tokio::test]
async fn concurrent_mounts_share_one_fetch() {
    let (context, counting) = counting_context(Duration::from_millis(20));
    let workout = context.create_workout("Push Day").wait().await.unwrap();

    let mut first = context.get_workout(workout.id);
    let mut second = context.get_workout(workout.id);
    let (a, b) = tokio::join!(first.ready(), second.ready());

    assert_eq!(counting.gets(), 1);
    assert_eq!(a.unwrap().value().unwrap().id, workout.id);
    assert_eq!(b.unwrap().value().unwrap().id, workout.id);
}

#[tokio::test]
async fn remount_serves_the_cached_value_while_refetching() {
    let (context, counting) = counting_context(Duration::ZERO);
    let mut list = context.list_workouts();
    list.ready().await.unwrap();
    drop(list);

    // Written behind the cache's back: the list is marked stale, not refetched.
    context
        .backend()
        .create_workout(&NewWorkout::new("Offscreen").unwrap())
        .await
        .unwrap();
    assert_eq!(counting.lists(), 1);

    let mut list = context.list_workouts();
    assert!(matches!(list.state(), QueryState::Ready(_)));
    assert!(names(&list.state()).is_empty());

    let state = list.changed().await.unwrap();
    assert_eq!(names(&state), ["Offscreen"]);
    assert_eq!(counting.lists(), 2);
}

#[tokio::test]
async fn remount_of_a_fresh_key_does_not_refetch() {
    let (context, counting) = counting_context(Duration::ZERO);
    let mut list = context.list_workouts();
    list.ready().await.unwrap();
    drop(list);

    let list = context.list_workouts();
    assert!(matches!(list.state(), QueryState::Ready(_)));
    context.cache().settle().await;
    assert_eq!(counting.lists(), 1);
}

#[tokio::test]
async fn failed_reads_keep_the_last_value_and_recover_on_the_next_signal() {
    let (context, counting) = counting_context(Duration::ZERO);
    context.create_workout("Push Day").wait().await.unwrap();
    let mut list = context.list_workouts();
    list.ready().await.unwrap();

    counting.fail_reads.store(true, Ordering::SeqCst);
    assert_eq!(context.cache().invalidate(&KeyPattern::everything()), 1);
    context.cache().settle().await;

    let state = list.state();
    assert!(matches!(state.error(), Some(SyncError::Network(_))));
    assert_eq!(names(&state), ["Push Day"]);

    counting.fail_reads.store(false, Ordering::SeqCst);
    context.create_workout("Leg Day").wait().await.unwrap();
    let state = list.state();
    assert!(state.error().is_none());
    assert_eq!(names(&state), ["Leg Day", "Push Day"]);
}

#[tokio::test]
async fn first_read_failing_has_no_last_value() {
    let (context, counting) = counting_context(Duration::ZERO);
    counting.fail_reads.store(true, Ordering::SeqCst);

    let mut list = context.list_workouts();
    let state = list.ready().await.unwrap();
    assert!(state.error().is_some());
    assert!(state.value().is_none());
}

#[tokio::test]
async fn invalid_input_fails_without_touching_the_store() {
    let context = memory_context();
    let workout = context.create_workout("Push Day").wait().await.unwrap();
    let exercise = context
        .create_exercise(workout.id, "Bench Press")
        .wait()
        .await
        .unwrap();

    let mutation = context.create_set(workout.id, exercise.id, 0, 60.0);
    assert!(matches!(mutation.state(), MutationState::Failed(_)));
    let err = mutation.wait().await.unwrap_err();
    assert_eq!(err.field(), Some("reps"));

    let err = context.create_workout("   ").wait().await.unwrap_err();
    assert_eq!(err.field(), Some("name"));

    let stored = context.backend().get_workout(workout.id).await.unwrap().unwrap();
    assert!(stored.exercises[0].sets.is_empty());
    assert_eq!(context.backend().list_workouts().await.unwrap().len(), 1);
}

#[tokio::test]
async fn on_success_receives_the_created_entity() {
    let context = memory_context();
    let (tx, rx) = tokio::sync::oneshot::channel();

    let mutation = context.create_workout("Push Day").on_success(move |workout| {
        let _ = tx.send(workout.id);
    });
    let created = mutation.wait().await.unwrap();

    assert_eq!(rx.await.unwrap(), created.id);
}

#[tokio::test]
async fn on_settled_reports_failures() {
    let context = memory_context();
    let (tx, rx) = tokio::sync::oneshot::channel();

    context
        .create_exercise(WorkoutId::new(999_999), "Squat")
        .on_settled(move |state| {
            let _ = tx.send(matches!(state, MutationState::Failed(SyncError::NotFound(_))));
        });

    assert!(rx.await.unwrap());
}

#[tokio::test]
async fn mutations_finish_even_when_the_handle_is_dropped() {
    let context = memory_context();
    drop(context.create_workout("Fire and forget"));

    let mut list = context.list_workouts();
    let state = tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            let state = list.ready().await.unwrap();
            if !names(&state).is_empty() {
                return state;
            }
            list.changed().await.unwrap();
        }
    })
    .await
    .unwrap();
    assert_eq!(names(&state), ["Fire and forget"]);
}

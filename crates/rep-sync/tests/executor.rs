mod common;

use std::sync::Arc;
use std::sync::atomic::Ordering;

use common::{ContendedStore, FlakyMedium, SignalCounter, SlowMedium, memory_backend};
use rep_model::{NewExercise, NewSet, NewWorkout, PlanLevel, STARTER_WORKOUT, WorkoutId};
use rep_persistence::{InvalidationBus, LocalStore, MemoryMedium, SnapshotStore};
use rep_sync::{LocalBackend, SyncError, WorkoutBackend};

#[tokio::test]
async fn push_day_scenario() {
    let backend = memory_backend();

    let workout = backend
        .create_workout(&NewWorkout::new("Push Day").unwrap())
        .await
        .unwrap();
    let exercise = backend
        .create_exercise(&NewExercise::new(workout.id, "Bench Press").unwrap())
        .await
        .unwrap();
    backend
        .create_set(&NewSet::new(workout.id, exercise.id, 10, 60.0).unwrap())
        .await
        .unwrap();

    let snapshot = backend.store().load().await.unwrap();
    assert_eq!(snapshot.workouts.len(), 1);
    let stored = &snapshot.workouts[0];
    assert_eq!(stored.name, "Push Day");
    assert_eq!(stored.exercises.len(), 1);
    assert_eq!(stored.exercises[0].name, "Bench Press");
    assert_eq!(stored.exercises[0].sets.len(), 1);
    assert_eq!(stored.exercises[0].sets[0].reps, 10);
    assert_eq!(stored.exercises[0].sets[0].weight, 60.0);
    assert_eq!(snapshot.revision, 3);
}

#[tokio::test]
async fn deleting_a_workout_cascades_to_exercises_and_sets() {
    let backend = memory_backend();
    let w = backend
        .create_workout(&NewWorkout::new("Leg Day").unwrap())
        .await
        .unwrap();
    let e = backend
        .create_exercise(&NewExercise::new(w.id, "Squat").unwrap())
        .await
        .unwrap();
    backend
        .create_set(&NewSet::new(w.id, e.id, 5, 100.0).unwrap())
        .await
        .unwrap();

    backend.delete_workout(w.id).await.unwrap();

    let snapshot = backend.store().load().await.unwrap();
    let dangling = snapshot
        .workouts
        .iter()
        .flat_map(|w| &w.exercises)
        .filter(|x| x.workout_id == w.id || x.id == e.id)
        .count();
    assert_eq!(dangling, 0);
    assert!(backend.get_workout(w.id).await.unwrap().is_none());
}

#[tokio::test]
async fn deletes_are_idempotent_and_silent_when_nothing_changes() {
    let backend = memory_backend();
    let w = backend
        .create_workout(&NewWorkout::new("Temp").unwrap())
        .await
        .unwrap();

    backend.delete_workout(w.id).await.unwrap();
    let after_first = backend.store().load().await.unwrap();

    let signals = SignalCounter::on(backend.bus());
    backend.delete_workout(w.id).await.unwrap();
    backend
        .delete_exercise(rep_model::ExerciseId::new(42), w.id)
        .await
        .unwrap();
    backend
        .delete_set(rep_model::SetId::new(43), w.id)
        .await
        .unwrap();

    assert_eq!(backend.store().load().await.unwrap(), after_first);
    assert_eq!(signals.count(), 0);
}

#[tokio::test]
async fn each_mutation_signals_exactly_once() {
    let backend = memory_backend();
    let signals = SignalCounter::on(backend.bus());

    let w = backend
        .create_workout(&NewWorkout::new("Pull Day").unwrap())
        .await
        .unwrap();
    let e = backend
        .create_exercise(&NewExercise::new(w.id, "Row").unwrap())
        .await
        .unwrap();
    let s = backend
        .create_set(&NewSet::new(w.id, e.id, 8, 50.0).unwrap())
        .await
        .unwrap();
    backend.delete_set(s.id, w.id).await.unwrap();
    backend.delete_exercise(e.id, w.id).await.unwrap();
    backend.delete_workout(w.id).await.unwrap();

    assert_eq!(signals.count(), 6);
}

#[tokio::test]
async fn missing_parents_fail_with_not_found_and_change_nothing() {
    let backend = memory_backend();
    let w = backend
        .create_workout(&NewWorkout::new("Push Day").unwrap())
        .await
        .unwrap();
    let before = backend.store().load().await.unwrap();
    let signals = SignalCounter::on(backend.bus());

    let err = backend
        .create_exercise(&NewExercise::new(WorkoutId::new(999_999), "X").unwrap())
        .await
        .unwrap_err();
    assert!(matches!(err, SyncError::NotFound(_)));

    let err = backend
        .create_set(&NewSet::new(w.id, rep_model::ExerciseId::new(999), 5, 5.0).unwrap())
        .await
        .unwrap_err();
    assert!(matches!(err, SyncError::NotFound(_)));

    assert_eq!(backend.store().load().await.unwrap(), before);
    assert_eq!(signals.count(), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_sets_on_different_exercises_are_both_kept() {
    let store = LocalStore::new(SlowMedium::default(), InvalidationBus::new());
    let backend = Arc::new(LocalBackend::new(Arc::new(store)));
    let w = backend
        .create_workout(&NewWorkout::new("Push Day").unwrap())
        .await
        .unwrap();
    let a = backend
        .create_exercise(&NewExercise::new(w.id, "Bench Press").unwrap())
        .await
        .unwrap();
    let b = backend
        .create_exercise(&NewExercise::new(w.id, "Dips").unwrap())
        .await
        .unwrap();

    let first = {
        let backend = Arc::clone(&backend);
        let input = NewSet::new(w.id, a.id, 10, 60.0).unwrap();
        tokio::spawn(async move { backend.create_set(&input).await })
    };
    let second = {
        let backend = Arc::clone(&backend);
        let input = NewSet::new(w.id, b.id, 12, 0.0).unwrap();
        tokio::spawn(async move { backend.create_set(&input).await })
    };
    let first = first.await.unwrap().unwrap();
    let second = second.await.unwrap().unwrap();
    assert_ne!(first.id, second.id);

    let workout = backend.get_workout(w.id).await.unwrap().unwrap();
    assert_eq!(workout.exercise(a.id).unwrap().sets, vec![first]);
    assert_eq!(workout.exercise(b.id).unwrap().sets, vec![second]);
}

#[tokio::test]
async fn conflicting_writer_is_retried_without_losing_either_change() {
    let store = Arc::new(ContendedStore::new(1));
    let backend = LocalBackend::new(store.clone());

    backend
        .create_workout(&NewWorkout::new("Mine").unwrap())
        .await
        .unwrap();

    let names: Vec<String> = store
        .load()
        .await
        .unwrap()
        .listed()
        .into_iter()
        .map(|w| w.name)
        .collect();
    assert!(names.contains(&"Mine".to_string()));
    assert!(names.contains(&"From another tab".to_string()));
}

#[tokio::test]
async fn persistent_conflicts_give_up_after_the_retry_budget() {
    let store = Arc::new(ContendedStore::new(u32::MAX));
    let backend = LocalBackend::new(store.clone()).with_conflict_retries(2);
    let signals = SignalCounter::on(store.bus());

    let err = backend
        .create_workout(&NewWorkout::new("Never").unwrap())
        .await
        .unwrap_err();

    assert!(matches!(err, SyncError::Conflict { attempts: 3 }));
    assert!(err.is_retryable());
    assert_eq!(signals.count(), 0);
    assert!(
        store
            .load()
            .await
            .unwrap()
            .workouts
            .iter()
            .all(|w| w.name != "Never")
    );
}

#[tokio::test]
async fn failed_write_keeps_last_good_snapshot_and_publishes_nothing() {
    let medium = FlakyMedium::default();
    let failing = Arc::clone(&medium.failing);
    let store = LocalStore::new(medium, InvalidationBus::new());
    let backend = LocalBackend::new(Arc::new(store));
    backend
        .create_workout(&NewWorkout::new("Kept").unwrap())
        .await
        .unwrap();
    let before = backend.store().load().await.unwrap();

    failing.store(true, Ordering::SeqCst);
    let signals = SignalCounter::on(backend.bus());
    let err = backend
        .create_workout(&NewWorkout::new("Lost").unwrap())
        .await
        .unwrap_err();

    assert!(matches!(err, SyncError::Io { .. }));
    assert_eq!(signals.count(), 0);
    assert_eq!(backend.store().load().await.unwrap(), before);

    failing.store(false, Ordering::SeqCst);
    backend
        .create_workout(&NewWorkout::new("Recovered").unwrap())
        .await
        .unwrap();
}

#[tokio::test]
async fn corrupt_medium_is_kept_aside_and_replaced_by_the_next_write() {
    use rep_persistence::{KeyValueMedium, SNAPSHOT_KEY};

    let medium = MemoryMedium::new();
    medium.set(SNAPSHOT_KEY, "not json").unwrap();
    let backend = LocalBackend::new(Arc::new(LocalStore::new(
        medium.clone(),
        InvalidationBus::new(),
    )));

    assert!(backend.list_workouts().await.unwrap().is_empty());
    let w = backend
        .create_workout(&NewWorkout::new("Fresh").unwrap())
        .await
        .unwrap();
    assert_eq!(backend.list_workouts().await.unwrap()[0].id, w.id);
    assert_eq!(
        medium
            .get(&format!("{SNAPSHOT_KEY}.corrupt"))
            .unwrap()
            .as_deref(),
        Some("not json")
    );
}

#[tokio::test]
async fn browser_era_history_survives_the_first_write() {
    use rep_persistence::{KeyValueMedium, SNAPSHOT_KEY};

    let medium = MemoryMedium::new();
    medium
        .set(
            SNAPSHOT_KEY,
            r#"[{"id":1736180000000,"name":"Old","date":"2025-01-06T16:13:20.000Z","exercises":[
                {"id":1736180000000,"name":"Row","workoutId":1736180000000,"sets":[
                    {"id":1736180000005,"reps":8,"weight":40}
                ]}
            ]}]"#,
        )
        .unwrap();
    let backend = LocalBackend::new(Arc::new(LocalStore::new(
        medium.clone(),
        InvalidationBus::new(),
    )));

    let before = backend.list_workouts().await.unwrap();
    assert_eq!(before.len(), 1);
    assert_eq!(before[0].exercises[0].sets.len(), 1);

    let row = before[0].exercises[0].id;
    backend
        .create_set(&NewSet::new(before[0].id, row, 6, 45.0).unwrap())
        .await
        .unwrap();
    let new = backend
        .create_workout(&NewWorkout::new("New").unwrap())
        .await
        .unwrap();
    assert!(new.id.get() > 1_736_180_000_005);

    let names: Vec<String> = backend
        .list_workouts()
        .await
        .unwrap()
        .into_iter()
        .map(|w| w.name)
        .collect();
    assert_eq!(names, ["New", "Old"]);
    let old = backend.get_workout(before[0].id).await.unwrap().unwrap();
    assert_eq!(old.exercises[0].sets.len(), 2);
    assert!(medium.get(&format!("{SNAPSHOT_KEY}.corrupt")).unwrap().is_none());
}

#[tokio::test]
async fn starting_a_plan_is_one_write_with_all_exercises() {
    let backend = memory_backend();
    let signals = SignalCounter::on(backend.bus());

    let workout = backend.start_plan(PlanLevel::Intermediate).await.unwrap();

    assert_eq!(signals.count(), 1);
    assert_eq!(workout.name, "Intermediate Plan");
    let names: Vec<&str> = workout.exercises.iter().map(|e| e.name.as_str()).collect();
    assert_eq!(names, ["Bench Press", "Pull Ups", "Deadlift", "Shoulder Press"]);
    assert_eq!(backend.get_workout(workout.id).await.unwrap(), Some(workout));
}

#[tokio::test]
async fn seeding_only_happens_once() {
    let backend = memory_backend();
    let seeded = backend.seed_if_empty().await.unwrap().unwrap();
    assert_eq!(seeded.name, STARTER_WORKOUT);
    assert_eq!(seeded.set_count(), 3);

    assert!(backend.seed_if_empty().await.unwrap().is_none());
    assert_eq!(backend.list_workouts().await.unwrap().len(), 1);
}

#[tokio::test]
async fn list_is_newest_first() {
    let backend = memory_backend();
    for name in ["Mon", "Tue", "Wed"] {
        backend
            .create_workout(&NewWorkout::new(name).unwrap())
            .await
            .unwrap();
    }
    let names: Vec<String> = backend
        .list_workouts()
        .await
        .unwrap()
        .into_iter()
        .map(|w| w.name)
        .collect();
    assert_eq!(names, ["Wed", "Tue", "Mon"]);
}

//! The Mutation Executor over a local snapshot store.
//!
//! Each mutation is one read-modify-write of the whole snapshot:
//!
//! 1. Wait for the write queue, so mutations from this executor never
//!    interleave.
//! 2. Load the freshest snapshot.
//! 3. Apply the change. Missing parents abort here with nothing written.
//! 4. Commit with compare-and-swap on the revision read in step 2. If another
//!    writer sharing the medium got in first, go back to step 2, up to the
//!    configured retry count.
//!
//! Rewriting the full snapshot per mutation keeps this suited to a personal
//! log of hundreds of entities, not millions.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use rep_model::{
    Exercise, ExerciseId, ExerciseSet, NewExercise, NewSet, NewWorkout, PlanLevel, SetId, Snapshot,
    Workout, WorkoutId,
};
use rep_persistence::{InvalidationBus, PersistenceError, Scope, SnapshotStore};
use tokio::sync::Mutex;

use crate::backend::WorkoutBackend;
use crate::error::{Result, SyncError};

const DEFAULT_CONFLICT_RETRIES: u32 = 3;

pub struct LocalBackend {
    store: Arc<dyn SnapshotStore>,
    write_queue: Mutex<()>,
    conflict_retries: u32,
}

impl LocalBackend {
    pub fn new(store: Arc<dyn SnapshotStore>) -> Self {
        Self {
            store,
            write_queue: Mutex::new(()),
            conflict_retries: DEFAULT_CONFLICT_RETRIES,
        }
    }

    pub fn with_conflict_retries(mut self, retries: u32) -> Self {
        self.conflict_retries = retries;
        self
    }

    pub fn store(&self) -> &Arc<dyn SnapshotStore> {
        &self.store
    }

    /// Corrupt data is replaced by the next write once the store has copied it
    /// aside; unreachable data is not.
    async fn read_for_write(&self) -> Result<Snapshot> {
        match self.store.load().await {
            Ok(snapshot) => Ok(snapshot),
            Err(e) if e.is_corrupt() => {
                tracing::warn!(error = %e, "Starting from an empty snapshot");
                Ok(Snapshot::empty())
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Runs one read-modify-write cycle. `apply` returns the value to hand
    /// back and the scope to signal, or `None` when nothing changed.
    async fn mutate<T, F>(&self, op: &'static str, apply: F) -> Result<T>
    where
        F: Fn(&mut Snapshot) -> Result<(T, Option<Scope>)> + Send + Sync,
        T: Send,
    {
        let _queue = self.write_queue.lock().await;
        let mut attempts = 0;
        loop {
            attempts += 1;
            let mut snapshot = self.read_for_write().await?;
            let expected = snapshot.revision;
            let (value, scope) = apply(&mut snapshot)?;
            let Some(scope) = scope else {
                tracing::debug!(op, "Nothing to change");
                return Ok(value);
            };
            snapshot.revision = snapshot.next_revision();

            match self.store.compare_and_save(expected, &snapshot, scope).await {
                Ok(()) => {
                    tracing::info!(op, revision = snapshot.revision, "Committed mutation");
                    return Ok(value);
                }
                Err(PersistenceError::Conflict { found, .. }) if attempts <= self.conflict_retries => {
                    tracing::warn!(op, attempts, expected, found, "Revision conflict; retrying");
                }
                Err(PersistenceError::Conflict { .. }) => {
                    tracing::warn!(op, attempts, "Giving up after repeated conflicts");
                    return Err(SyncError::Conflict { attempts });
                }
                Err(e) => return Err(e.into()),
            }
        }
    }
}

#[async_trait]
impl WorkoutBackend for LocalBackend {
    async fn list_workouts(&self) -> Result<Vec<Workout>> {
        Ok(self.store.load_or_empty().await.listed())
    }

    async fn get_workout(&self, id: WorkoutId) -> Result<Option<Workout>> {
        Ok(self.store.load_or_empty().await.workout(id).cloned())
    }

    async fn create_workout(&self, input: &NewWorkout) -> Result<Workout> {
        self.mutate("create_workout", |snapshot| {
            Ok((snapshot.add_workout(input), Some(Scope::List)))
        })
        .await
    }

    async fn delete_workout(&self, id: WorkoutId) -> Result<()> {
        self.mutate("delete_workout", |snapshot| {
            Ok(((), snapshot.remove_workout(id).then_some(Scope::Workout(id))))
        })
        .await
    }

    async fn create_exercise(&self, input: &NewExercise) -> Result<Exercise> {
        self.mutate("create_exercise", |snapshot| {
            let exercise = snapshot.add_exercise(input)?;
            Ok((exercise, Some(Scope::Workout(input.workout_id()))))
        })
        .await
    }

    async fn delete_exercise(&self, id: ExerciseId, workout_id: WorkoutId) -> Result<()> {
        self.mutate("delete_exercise", |snapshot| {
            let removed = snapshot.remove_exercise(id, workout_id);
            Ok(((), removed.then_some(Scope::Workout(workout_id))))
        })
        .await
    }

    async fn create_set(&self, input: &NewSet) -> Result<ExerciseSet> {
        self.mutate("create_set", |snapshot| {
            let set = snapshot.add_set(input)?;
            Ok((set, Some(Scope::Workout(input.workout_id()))))
        })
        .await
    }

    async fn delete_set(&self, id: SetId, workout_id: WorkoutId) -> Result<()> {
        self.mutate("delete_set", |snapshot| {
            let removed = snapshot.remove_set(id, workout_id);
            Ok(((), removed.then_some(Scope::Workout(workout_id))))
        })
        .await
    }

    fn bus(&self) -> &InvalidationBus {
        self.store.bus()
    }

    fn describe(&self) -> String {
        format!("local store at {}", self.store.describe())
    }

    /// One cycle for the workout and all its exercises, so readers never see
    /// a half-seeded plan.
    async fn start_plan(&self, level: PlanLevel) -> Result<Workout> {
        let plan = level.plan();
        let input = NewWorkout::new(plan.title)?;
        self.mutate("start_plan", |snapshot| {
            let workout = snapshot.add_workout_with_exercises(&input, plan.exercises);
            Ok((workout, Some(Scope::List)))
        })
        .await
    }

    async fn seed_if_empty(&self) -> Result<Option<Workout>> {
        let now = Utc::now();
        self.mutate("seed_if_empty", |snapshot| {
            let seeded = snapshot.seed_starter(now);
            let scope = seeded.is_some().then_some(Scope::List);
            Ok((seeded, scope))
        })
        .await
    }

    async fn poll_external_change(&self) -> Result<bool> {
        Ok(self.store.poll_external_change().await?)
    }
}

//! The hook facade views talk to.
//!
//! A [`SyncContext`] is built once, handed to every view, and torn down with
//! [`SyncContext::shutdown`]. Reads return live [`Query`] handles; mutations
//! return [`Mutation`] handles that resolve only after every watched query
//! affected by the change has been refreshed.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use rep_model::{
    Exercise, ExerciseId, ExerciseSet, NewExercise, NewSet, NewWorkout, PlanLevel, SetId,
    ValidationError, Workout, WorkoutId,
};
use rep_persistence::{FileMedium, InvalidationBus, LocalStore, MemoryMedium, SnapshotStore};
use tokio::runtime::Handle;

use crate::backend::WorkoutBackend;
use crate::bridge::ExternalChangeBridge;
use crate::cache::QueryCache;
use crate::config::{BackendConfig, SyncConfig};
use crate::error::Result;
use crate::executor::LocalBackend;
use crate::mutation::Mutation;
use crate::query::Query;
use crate::remote::RemoteBackend;

pub struct SyncContext {
    backend: Arc<dyn WorkoutBackend>,
    cache: QueryCache,
    runtime: Handle,
    bridge: Option<ExternalChangeBridge>,
}

impl SyncContext {
    /// Builds the backend described by `config` and wires the cache to it.
    pub async fn open(config: &SyncConfig) -> Result<Self> {
        let bus = InvalidationBus::new();
        let backend: Arc<dyn WorkoutBackend> = match &config.backend {
            BackendConfig::Local { data_dir } => {
                let store: Arc<dyn SnapshotStore> = match data_dir {
                    Some(dir) => Arc::new(LocalStore::new(FileMedium::new(dir), bus)),
                    None => Arc::new(LocalStore::new(MemoryMedium::new(), bus)),
                };
                Arc::new(LocalBackend::new(store).with_conflict_retries(config.conflict_retries))
            }
            BackendConfig::Remote {
                base_url,
                timeout_secs,
            } => Arc::new(RemoteBackend::new(
                base_url,
                Duration::from_secs(*timeout_secs),
                bus,
            )?),
        };

        let mut context = Self::with_backend(backend, Handle::current());
        if config.seed_on_empty
            && let Some(workout) = context.backend.seed_if_empty().await?
        {
            tracing::info!(id = %workout.id, "Seeded starter workout");
        }
        if let Some(every) = config.external_poll_interval() {
            context.bridge = Some(ExternalChangeBridge::spawn(
                Arc::clone(&context.backend),
                every,
                &context.runtime,
            ));
        }
        tracing::info!("Sync context ready on {}", context.backend.describe());
        Ok(context)
    }

    /// Context over an existing backend, without external change polling.
    pub fn with_backend(backend: Arc<dyn WorkoutBackend>, runtime: Handle) -> Self {
        let cache = QueryCache::new(Arc::clone(&backend), runtime.clone());
        Self {
            backend,
            cache,
            runtime,
            bridge: None,
        }
    }

    pub fn backend(&self) -> &Arc<dyn WorkoutBackend> {
        &self.backend
    }

    pub fn cache(&self) -> &QueryCache {
        &self.cache
    }

    pub fn list_workouts(&self) -> Query<Vec<Workout>> {
        self.cache.watch_workouts()
    }

    pub fn get_workout(&self, id: WorkoutId) -> Query<Workout> {
        self.cache.watch_workout(id)
    }

    pub fn create_workout(&self, name: &str) -> Mutation<Workout> {
        self.create_workout_on(name, Utc::now())
    }

    /// Logs a workout with an explicit date, for back-dated entries.
    pub fn create_workout_on(&self, name: &str, date: DateTime<Utc>) -> Mutation<Workout> {
        self.issue(NewWorkout::dated(name, date), |backend, input| async move {
            backend.create_workout(&input).await
        })
    }

    pub fn delete_workout(&self, id: WorkoutId) -> Mutation<()> {
        self.issue(Ok(id), |backend, id| async move {
            backend.delete_workout(id).await
        })
    }

    pub fn create_exercise(&self, workout_id: WorkoutId, name: &str) -> Mutation<Exercise> {
        self.issue(NewExercise::new(workout_id, name), |backend, input| async move {
            backend.create_exercise(&input).await
        })
    }

    pub fn delete_exercise(&self, id: ExerciseId, workout_id: WorkoutId) -> Mutation<()> {
        self.issue(Ok((id, workout_id)), |backend, (id, workout_id)| async move {
            backend.delete_exercise(id, workout_id).await
        })
    }

    pub fn create_set(
        &self,
        workout_id: WorkoutId,
        exercise_id: ExerciseId,
        reps: i64,
        weight: f64,
    ) -> Mutation<ExerciseSet> {
        self.issue(
            NewSet::new(workout_id, exercise_id, reps, weight),
            |backend, input| async move { backend.create_set(&input).await },
        )
    }

    pub fn delete_set(&self, id: SetId, workout_id: WorkoutId) -> Mutation<()> {
        self.issue(Ok((id, workout_id)), |backend, (id, workout_id)| async move {
            backend.delete_set(id, workout_id).await
        })
    }

    pub fn start_plan(&self, level: PlanLevel) -> Mutation<Workout> {
        self.issue(Ok(level), |backend, level| async move {
            backend.start_plan(level).await
        })
    }

    pub fn seed_if_empty(&self) -> Mutation<Option<Workout>> {
        self.issue(Ok(()), |backend, ()| async move { backend.seed_if_empty().await })
    }

    /// Validates `input`, then runs `work` on its own task followed by a cache
    /// settle. Invalid input fails the mutation without touching the backend.
    fn issue<I, T, F, Fut>(&self, input: std::result::Result<I, ValidationError>, work: F) -> Mutation<T>
    where
        I: Send + 'static,
        T: Clone + Send + Sync + 'static,
        F: FnOnce(Arc<dyn WorkoutBackend>, I) -> Fut,
        Fut: Future<Output = Result<T>> + Send + 'static,
    {
        let input = match input {
            Ok(input) => input,
            Err(e) => {
                tracing::debug!(field = e.field, "Rejected invalid input");
                return Mutation::failed(&self.runtime, e.into());
            }
        };
        let operation = work(Arc::clone(&self.backend), input);
        let cache = self.cache.clone();
        Mutation::spawn(&self.runtime, async move {
            let result = operation.await;
            cache.settle().await;
            result
        })
    }

    /// Stops external change polling and waits for in-flight reads.
    pub async fn shutdown(mut self) {
        if let Some(bridge) = self.bridge.take() {
            bridge.stop();
        }
        self.cache.settle().await;
        tracing::debug!("Sync context shut down");
    }
}

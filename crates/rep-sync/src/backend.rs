//! The data-access seam shared by the local executor and the remote binding.

use async_trait::async_trait;
use chrono::Utc;
use rep_model::{
    Exercise, ExerciseId, ExerciseSet, NewExercise, NewSet, NewWorkout, PlanLevel, STARTER_EXERCISES,
    STARTER_WORKOUT, SetId, Workout, WorkoutId,
};
use rep_persistence::InvalidationBus;

use crate::error::Result;

/// Reads and mutations against the canonical workout data.
///
/// Every successful mutation that changed something publishes exactly one
/// signal on [`bus`](Self::bus) after the change is durable. Failed
/// mutations publish nothing. Deletes of missing ids succeed without
/// publishing.
#[async_trait]
pub trait WorkoutBackend: Send + Sync {
    /// All workouts, newest first.
    async fn list_workouts(&self) -> Result<Vec<Workout>>;

    async fn get_workout(&self, id: WorkoutId) -> Result<Option<Workout>>;

    async fn create_workout(&self, input: &NewWorkout) -> Result<Workout>;

    async fn delete_workout(&self, id: WorkoutId) -> Result<()>;

    async fn create_exercise(&self, input: &NewExercise) -> Result<Exercise>;

    async fn delete_exercise(&self, id: ExerciseId, workout_id: WorkoutId) -> Result<()>;

    async fn create_set(&self, input: &NewSet) -> Result<ExerciseSet>;

    async fn delete_set(&self, id: SetId, workout_id: WorkoutId) -> Result<()>;

    fn bus(&self) -> &InvalidationBus;

    fn describe(&self) -> String;

    /// Creates a workout named after the plan, seeded with its exercises.
    async fn start_plan(&self, level: PlanLevel) -> Result<Workout> {
        let plan = level.plan();
        let mut workout = self.create_workout(&NewWorkout::new(plan.title)?).await?;
        for name in plan.exercises {
            let exercise = self
                .create_exercise(&NewExercise::new(workout.id, name)?)
                .await?;
            workout.exercises.push(exercise);
        }
        Ok(workout)
    }

    /// Creates the starter workout when there are no workouts at all.
    async fn seed_if_empty(&self) -> Result<Option<Workout>> {
        if !self.list_workouts().await?.is_empty() {
            return Ok(None);
        }
        let mut workout = self
            .create_workout(&NewWorkout::dated(STARTER_WORKOUT, Utc::now())?)
            .await?;
        for template in STARTER_EXERCISES {
            let mut exercise = self
                .create_exercise(&NewExercise::new(workout.id, template.name)?)
                .await?;
            for &(reps, weight) in template.sets {
                let set = NewSet::new(workout.id, exercise.id, i64::from(reps), weight)?;
                exercise.sets.push(self.create_set(&set).await?);
            }
            workout.exercises.push(exercise);
        }
        Ok(Some(workout))
    }

    /// Reports whether another writer changed the data since the last poll.
    async fn poll_external_change(&self) -> Result<bool> {
        Ok(false)
    }
}

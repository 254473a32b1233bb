//! HTTP binding to a remote workout service.
//!
//! The service owns the data; this client validates inputs before sending,
//! maps status codes onto [`SyncError`] and publishes the same scoped signals
//! as the local executor once a write is acknowledged.

use std::time::Duration;

use async_trait::async_trait;
use rep_model::{
    Exercise, ExerciseId, ExerciseSet, NewExercise, NewSet, NewWorkout, SetId, ValidationError,
    Workout, WorkoutId, sort_for_listing,
};
use rep_persistence::{InvalidationBus, Scope};
use reqwest::{Client, Response, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::backend::WorkoutBackend;
use crate::error::{Result, SyncError};

#[derive(Serialize)]
struct CreateWorkoutBody<'a> {
    name: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CreateExerciseBody<'a> {
    workout_id: WorkoutId,
    name: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CreateSetBody {
    exercise_id: ExerciseId,
    reps: u32,
    weight: f64,
}

/// Body of a 400 response.
#[derive(Deserialize)]
struct ApiValidation {
    message: String,
    #[serde(default)]
    field: Option<String>,
}

/// Maps a server-reported field onto the names used by local validation.
fn known_field(field: Option<&str>) -> &'static str {
    match field {
        Some("name") => "name",
        Some("reps") => "reps",
        Some("weight") => "weight",
        Some("workoutId") => "workoutId",
        Some("exerciseId") => "exerciseId",
        _ => "request",
    }
}

pub struct RemoteBackend {
    client: Client,
    base_url: String,
    bus: InvalidationBus,
}

impl RemoteBackend {
    /// `base_url` is the API root, for example `http://localhost:5000/api`.
    pub fn new(base_url: &str, timeout: Duration, bus: InvalidationBus) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            bus,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    /// Turns non-success statuses into errors. `what` names the resource
    /// for 404s.
    async fn check(response: Response, what: impl FnOnce() -> String) -> Result<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        match status {
            StatusCode::NOT_FOUND => Err(SyncError::NotFound(what())),
            StatusCode::BAD_REQUEST => {
                let text = response.text().await?;
                let body: ApiValidation =
                    serde_json::from_str(&text).map_err(|_| SyncError::Api {
                        status: status.as_u16(),
                        message: text.clone(),
                    })?;
                Err(ValidationError::new(known_field(body.field.as_deref()), body.message).into())
            }
            _ => {
                let message = response
                    .text()
                    .await
                    .unwrap_or_else(|_| "Unknown error".to_string());
                Err(SyncError::Api {
                    status: status.as_u16(),
                    message,
                })
            }
        }
    }

    /// The parent lookup the server does not do for us.
    async fn require_workout(&self, id: WorkoutId) -> Result<Workout> {
        self.get_workout(id)
            .await?
            .ok_or_else(|| SyncError::NotFound(format!("workout {id} not found")))
    }

    /// DELETE where 404 means the entity is already gone.
    async fn delete(&self, path: String) -> Result<bool> {
        let response = self.client.delete(self.url(&path)).send().await?;
        if response.status() == StatusCode::NOT_FOUND {
            debug!(path = %path, "Already deleted");
            return Ok(false);
        }
        Self::check(response, || path.clone()).await?;
        Ok(true)
    }
}

#[async_trait]
impl WorkoutBackend for RemoteBackend {
    async fn list_workouts(&self) -> Result<Vec<Workout>> {
        let response = self.client.get(self.url("/workouts")).send().await?;
        let mut workouts: Vec<Workout> = Self::check(response, || "workout list".to_string())
            .await?
            .json()
            .await?;
        sort_for_listing(&mut workouts);
        Ok(workouts)
    }

    async fn get_workout(&self, id: WorkoutId) -> Result<Option<Workout>> {
        let response = self
            .client
            .get(self.url(&format!("/workouts/{id}")))
            .send()
            .await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let workout = Self::check(response, || format!("workout {id} not found"))
            .await?
            .json()
            .await?;
        Ok(Some(workout))
    }

    /// The service stamps the date itself; an explicit date on `input` is
    /// not sent.
    async fn create_workout(&self, input: &NewWorkout) -> Result<Workout> {
        let response = self
            .client
            .post(self.url("/workouts"))
            .json(&CreateWorkoutBody { name: input.name() })
            .send()
            .await?;
        let workout: Workout = Self::check(response, || "workouts endpoint".to_string())
            .await?
            .json()
            .await?;
        tracing::info!(id = %workout.id, "Created workout");
        self.bus.publish(Scope::List);
        Ok(workout)
    }

    async fn delete_workout(&self, id: WorkoutId) -> Result<()> {
        if self.delete(format!("/workouts/{id}")).await? {
            self.bus.publish(Scope::Workout(id));
        }
        Ok(())
    }

    async fn create_exercise(&self, input: &NewExercise) -> Result<Exercise> {
        self.require_workout(input.workout_id()).await?;
        let response = self
            .client
            .post(self.url("/exercises"))
            .json(&CreateExerciseBody {
                workout_id: input.workout_id(),
                name: input.name(),
            })
            .send()
            .await?;
        let exercise: Exercise = Self::check(response, || {
            format!("workout {} not found", input.workout_id())
        })
        .await?
        .json()
        .await?;
        self.bus.publish(Scope::Workout(input.workout_id()));
        Ok(exercise)
    }

    async fn delete_exercise(&self, id: ExerciseId, workout_id: WorkoutId) -> Result<()> {
        if self.delete(format!("/exercises/{id}")).await? {
            self.bus.publish(Scope::Workout(workout_id));
        }
        Ok(())
    }

    async fn create_set(&self, input: &NewSet) -> Result<ExerciseSet> {
        let workout = self.require_workout(input.workout_id()).await?;
        if workout.exercise(input.exercise_id()).is_none() {
            return Err(SyncError::NotFound(format!(
                "exercise {} not found in workout {}",
                input.exercise_id(),
                input.workout_id()
            )));
        }
        let response = self
            .client
            .post(self.url("/sets"))
            .json(&CreateSetBody {
                exercise_id: input.exercise_id(),
                reps: input.reps(),
                weight: input.weight(),
            })
            .send()
            .await?;
        let set: ExerciseSet = Self::check(response, || {
            format!("exercise {} not found", input.exercise_id())
        })
        .await?
        .json()
        .await?;
        self.bus.publish(Scope::Workout(input.workout_id()));
        Ok(set)
    }

    async fn delete_set(&self, id: SetId, workout_id: WorkoutId) -> Result<()> {
        if self.delete(format!("/sets/{id}")).await? {
            self.bus.publish(Scope::Workout(workout_id));
        }
        Ok(())
    }

    fn bus(&self) -> &InvalidationBus {
        &self.bus
    }

    fn describe(&self) -> String {
        format!("remote API at {}", self.base_url)
    }
}

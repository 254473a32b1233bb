//! Typed, validated mutation inputs.
//!
//! Every create operation takes one of these instead of raw fields. Holding a
//! `NewSet` proves `reps >= 1` and a finite `weight >= 0`; holding a
//! `NewWorkout` proves a non-blank name.

use chrono::{DateTime, Utc};

use crate::error::ValidationError;
use crate::ids::{ExerciseId, WorkoutId};

/// Longest accepted workout or exercise name, in characters.
pub const MAX_NAME_LEN: usize = 120;

fn clean_name(field: &'static str, raw: &str) -> Result<String, ValidationError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::new(field, "must not be empty"));
    }
    if trimmed.chars().count() > MAX_NAME_LEN {
        return Err(ValidationError::new(
            field,
            format!("must be at most {MAX_NAME_LEN} characters"),
        ));
    }
    Ok(trimmed.to_string())
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewWorkout {
    name: String,
    date: DateTime<Utc>,
}

impl NewWorkout {
    /// A workout dated now.
    pub fn new(name: &str) -> Result<Self, ValidationError> {
        Self::dated(name, Utc::now())
    }

    pub fn dated(name: &str, date: DateTime<Utc>) -> Result<Self, ValidationError> {
        Ok(Self {
            name: clean_name("name", name)?,
            date,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn date(&self) -> DateTime<Utc> {
        self.date
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewExercise {
    workout_id: WorkoutId,
    name: String,
}

impl NewExercise {
    pub fn new(workout_id: WorkoutId, name: &str) -> Result<Self, ValidationError> {
        Ok(Self {
            workout_id,
            name: clean_name("name", name)?,
        })
    }

    pub fn workout_id(&self) -> WorkoutId {
        self.workout_id
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewSet {
    workout_id: WorkoutId,
    exercise_id: ExerciseId,
    reps: u32,
    weight: f64,
}

impl NewSet {
    /// `reps` is signed so that zero and negative counts coming from a form
    /// are reported as validation failures rather than parse failures.
    pub fn new(
        workout_id: WorkoutId,
        exercise_id: ExerciseId,
        reps: i64,
        weight: f64,
    ) -> Result<Self, ValidationError> {
        if reps < 1 {
            return Err(ValidationError::new("reps", "must be at least 1"));
        }
        let reps = u32::try_from(reps)
            .map_err(|_| ValidationError::new("reps", "is too large"))?;
        if !weight.is_finite() {
            return Err(ValidationError::new("weight", "must be a number"));
        }
        if weight < 0.0 {
            return Err(ValidationError::new("weight", "must not be negative"));
        }
        Ok(Self {
            workout_id,
            exercise_id,
            reps,
            weight,
        })
    }

    pub fn workout_id(&self) -> WorkoutId {
        self.workout_id
    }

    pub fn exercise_id(&self) -> ExerciseId {
        self.exercise_id
    }

    pub fn reps(&self) -> u32 {
        self.reps
    }

    pub fn weight(&self) -> f64 {
        self.weight
    }
}

//! Workout, exercise and set entities.
//!
//! Exercises are embedded in their workout and sets in their exercise; the
//! back-references (`workout_id`, `exercise_id`) mirror the nesting and are
//! kept consistent by [`Snapshot`](crate::Snapshot).

use std::cmp::Ordering;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::{ExerciseId, SetId, WorkoutId};

/// A logged training session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Workout {
    pub id: WorkoutId,
    pub name: String,
    pub date: DateTime<Utc>,
    /// Display order is insertion order.
    #[serde(default)]
    pub exercises: Vec<Exercise>,
}

impl Workout {
    pub fn exercise(&self, id: ExerciseId) -> Option<&Exercise> {
        self.exercises.iter().find(|e| e.id == id)
    }

    pub fn exercise_mut(&mut self, id: ExerciseId) -> Option<&mut Exercise> {
        self.exercises.iter_mut().find(|e| e.id == id)
    }

    /// Total number of sets across all exercises.
    pub fn set_count(&self) -> usize {
        self.exercises.iter().map(|e| e.sets.len()).sum()
    }

    /// Newest-first listing order: later date first, higher id on ties.
    pub fn listing_order(a: &Workout, b: &Workout) -> Ordering {
        b.date.cmp(&a.date).then_with(|| b.id.cmp(&a.id))
    }
}

/// An exercise performed within a workout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Exercise {
    pub id: ExerciseId,
    pub workout_id: WorkoutId,
    pub name: String,
    #[serde(default)]
    pub sets: Vec<ExerciseSet>,
}

impl Exercise {
    /// Sum of `reps * weight` over all sets.
    pub fn volume(&self) -> f64 {
        self.sets.iter().map(ExerciseSet::volume).sum()
    }
}

/// One set of an exercise.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExerciseSet {
    pub id: SetId,
    pub exercise_id: ExerciseId,
    pub reps: u32,
    pub weight: f64,
}

impl ExerciseSet {
    pub fn volume(&self) -> f64 {
        f64::from(self.reps) * self.weight
    }
}

/// Sort workouts into listing order in place.
pub fn sort_for_listing(workouts: &mut [Workout]) {
    workouts.sort_by(Workout::listing_order);
}

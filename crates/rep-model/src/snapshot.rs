//! The complete store state at a point in time.
//!
//! A [`Snapshot`] is what gets persisted and what every mutation rewrites as a
//! whole. All structural changes go through the methods here so the nesting
//! invariants hold by construction:
//!
//! - every exercise's `workout_id` names the workout it is nested in, and
//!   every set's `exercise_id` names its exercise;
//! - ids come from one counter and are unique across all three entity kinds;
//! - removing a parent removes its children in the same step.
//!
//! Every mutation rewrites the full snapshot, which keeps the design suited to
//! hundreds of entities rather than millions.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::entity::{Exercise, ExerciseSet, Workout, sort_for_listing};
use crate::error::{IntegrityError, MissingParent};
use crate::ids::{ExerciseId, SetId, WorkoutId};
use crate::plan::{STARTER_EXERCISES, STARTER_WORKOUT};
use crate::validate::{NewExercise, NewSet, NewWorkout};

/// Revision token of a snapshot; increases by one per committed mutation.
pub type Revision = u64;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub revision: Revision,
    /// Next id to hand out. Persisted so ids are never reused.
    pub next_id: u64,
    /// Newest-created first.
    pub workouts: Vec<Workout>,
}

impl Default for Snapshot {
    fn default() -> Self {
        Self::empty()
    }
}

impl Snapshot {
    pub fn empty() -> Self {
        Self {
            revision: 0,
            next_id: 1,
            workouts: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.workouts.is_empty()
    }

    /// Workouts in listing order (newest first).
    pub fn listed(&self) -> Vec<Workout> {
        let mut workouts = self.workouts.clone();
        sort_for_listing(&mut workouts);
        workouts
    }

    pub fn workout(&self, id: WorkoutId) -> Option<&Workout> {
        self.workouts.iter().find(|w| w.id == id)
    }

    fn workout_mut(&mut self, id: WorkoutId) -> Option<&mut Workout> {
        self.workouts.iter_mut().find(|w| w.id == id)
    }

    fn allocate(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    /// Successor of this snapshot's revision, for committing a change.
    pub fn next_revision(&self) -> Revision {
        self.revision + 1
    }

    /// Prepends a new workout with no exercises.
    pub fn add_workout(&mut self, input: &NewWorkout) -> Workout {
        self.insert_workout(input.name(), input.date(), &[])
    }

    /// Prepends a new workout seeded with exercises, each with no sets.
    pub fn add_workout_with_exercises(&mut self, input: &NewWorkout, exercises: &[&str]) -> Workout {
        self.insert_workout(input.name(), input.date(), exercises)
    }

    fn insert_workout(&mut self, name: &str, date: DateTime<Utc>, exercises: &[&str]) -> Workout {
        let id = WorkoutId::new(self.allocate());
        let exercises = exercises
            .iter()
            .map(|name| Exercise {
                id: ExerciseId::new(self.allocate()),
                workout_id: id,
                name: (*name).to_string(),
                sets: Vec::new(),
            })
            .collect();
        let workout = Workout {
            id,
            name: name.to_string(),
            date,
            exercises,
        };
        self.workouts.insert(0, workout.clone());
        workout
    }

    /// Adds the starter workout with its sets. Returns `None` when the
    /// snapshot already holds workouts.
    pub fn seed_starter(&mut self, date: DateTime<Utc>) -> Option<Workout> {
        if !self.is_empty() {
            return None;
        }
        let names: Vec<&str> = STARTER_EXERCISES.iter().map(|e| e.name).collect();
        let mut workout = self.insert_workout(STARTER_WORKOUT, date, &names);
        for (exercise, template) in workout.exercises.iter_mut().zip(STARTER_EXERCISES) {
            for &(reps, weight) in template.sets {
                exercise.sets.push(ExerciseSet {
                    id: SetId::new(self.allocate()),
                    exercise_id: exercise.id,
                    reps,
                    weight,
                });
            }
        }
        self.workouts[0] = workout.clone();
        Some(workout)
    }

    /// Removes a workout and everything nested in it. Returns whether
    /// anything was removed.
    pub fn remove_workout(&mut self, id: WorkoutId) -> bool {
        let before = self.workouts.len();
        self.workouts.retain(|w| w.id != id);
        self.workouts.len() != before
    }

    /// Appends an exercise to its workout.
    pub fn add_exercise(&mut self, input: &NewExercise) -> Result<Exercise, MissingParent> {
        let id = ExerciseId::new(self.next_id);
        let workout = self
            .workout_mut(input.workout_id())
            .ok_or(MissingParent::Workout(input.workout_id()))?;
        let exercise = Exercise {
            id,
            workout_id: workout.id,
            name: input.name().to_string(),
            sets: Vec::new(),
        };
        workout.exercises.push(exercise.clone());
        self.next_id += 1;
        Ok(exercise)
    }

    /// Removes an exercise and its sets from the given workout.
    pub fn remove_exercise(&mut self, id: ExerciseId, workout_id: WorkoutId) -> bool {
        let Some(workout) = self.workout_mut(workout_id) else {
            return false;
        };
        let before = workout.exercises.len();
        workout.exercises.retain(|e| e.id != id);
        workout.exercises.len() != before
    }

    /// Appends a set to an exercise of the given workout.
    pub fn add_set(&mut self, input: &NewSet) -> Result<ExerciseSet, MissingParent> {
        let id = SetId::new(self.next_id);
        let workout = self
            .workout_mut(input.workout_id())
            .ok_or(MissingParent::Workout(input.workout_id()))?;
        let exercise =
            workout
                .exercise_mut(input.exercise_id())
                .ok_or(MissingParent::Exercise {
                    workout_id: input.workout_id(),
                    exercise_id: input.exercise_id(),
                })?;
        let set = ExerciseSet {
            id,
            exercise_id: exercise.id,
            reps: input.reps(),
            weight: input.weight(),
        };
        exercise.sets.push(set.clone());
        self.next_id += 1;
        Ok(set)
    }

    /// Removes a set from whichever exercise of the given workout holds it.
    pub fn remove_set(&mut self, id: SetId, workout_id: WorkoutId) -> bool {
        let Some(workout) = self.workout_mut(workout_id) else {
            return false;
        };
        let mut removed = false;
        for exercise in &mut workout.exercises {
            let before = exercise.sets.len();
            exercise.sets.retain(|s| s.id != id);
            removed |= exercise.sets.len() != before;
        }
        removed
    }

    /// Checks the nesting and id invariants of a snapshot that did not come
    /// from this module, such as one read back from storage.
    pub fn check_integrity(&self) -> Result<(), IntegrityError> {
        let mut seen = HashSet::new();
        let mut claim = |id: u64| {
            if id >= self.next_id {
                return Err(IntegrityError::IdBeyondCounter {
                    id,
                    next_id: self.next_id,
                });
            }
            if !seen.insert(id) {
                return Err(IntegrityError::DuplicateId(id));
            }
            Ok(())
        };
        for workout in &self.workouts {
            claim(workout.id.get())?;
            for exercise in &workout.exercises {
                claim(exercise.id.get())?;
                if exercise.workout_id != workout.id {
                    return Err(IntegrityError::ExerciseParent {
                        exercise: exercise.id.get(),
                        claimed: exercise.workout_id.get(),
                        actual: workout.id.get(),
                    });
                }
                for set in &exercise.sets {
                    claim(set.id.get())?;
                    if set.exercise_id != exercise.id {
                        return Err(IntegrityError::SetParent {
                            set: set.id.get(),
                            claimed: set.exercise_id.get(),
                            actual: exercise.id.get(),
                        });
                    }
                }
            }
        }
        Ok(())
    }
}

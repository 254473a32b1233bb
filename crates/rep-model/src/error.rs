//! Model error types.

use thiserror::Error;

use crate::ids::{ExerciseId, WorkoutId};

/// Input that fails a domain constraint.
///
/// `field` names the offending input so a form can attach the message to it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{field}: {message}")]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    pub fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

/// A referenced parent entity is absent from the snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MissingParent {
    #[error("workout {0} not found")]
    Workout(WorkoutId),

    #[error("exercise {exercise_id} not found in workout {workout_id}")]
    Exercise {
        workout_id: WorkoutId,
        exercise_id: ExerciseId,
    },
}

/// A structural invariant of a snapshot does not hold.
///
/// Raised when a persisted snapshot is decoded; a snapshot built only through
/// [`Snapshot`](crate::Snapshot) operations never violates these.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IntegrityError {
    #[error("id {0} is used by more than one entity")]
    DuplicateId(u64),

    #[error("id {id} is not below the id counter {next_id}")]
    IdBeyondCounter { id: u64, next_id: u64 },

    #[error("exercise {exercise} points at workout {claimed} but is nested under {actual}")]
    ExerciseParent {
        exercise: u64,
        claimed: u64,
        actual: u64,
    },

    #[error("set {set} points at exercise {claimed} but is nested under {actual}")]
    SetParent { set: u64, claimed: u64, actual: u64 },
}

//! Domain model for the rep workout tracker.
//!
//! A user's data is one [`Snapshot`]: workouts, each holding its exercises,
//! each holding its sets. Mutation inputs are validated up front into
//! [`NewWorkout`], [`NewExercise`] and [`NewSet`], and applied to a snapshot
//! through methods that keep the nesting consistent.
//!
//! # Architecture
//!
//! - `ids.rs` - Newtype identifiers drawn from one counter
//! - `entity.rs` - Workout, exercise and set records
//! - `validate.rs` - Validated mutation inputs
//! - `snapshot.rs` - Whole-store state and structural operations
//! - `plan.rs` - Plan presets and the starter workout
//! - `summary.rs` - Per-workout aggregates
//! - `error.rs` - Validation and integrity errors

mod entity;
mod error;
mod ids;
mod plan;
mod snapshot;
mod summary;
mod validate;

pub use entity::{Exercise, ExerciseSet, Workout, sort_for_listing};
pub use error::{IntegrityError, MissingParent, ValidationError};
pub use ids::{ExerciseId, SetId, WorkoutId};
pub use plan::{PlanLevel, Plan, STARTER_EXERCISES, STARTER_WORKOUT, ScheduleDay, StarterExercise};
pub use snapshot::{Revision, Snapshot};
pub use summary::WorkoutSummary;
pub use validate::{MAX_NAME_LEN, NewExercise, NewSet, NewWorkout};

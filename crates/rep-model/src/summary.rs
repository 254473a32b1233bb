//! Aggregate figures shown next to a workout.

use serde::Serialize;

use crate::entity::Workout;

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkoutSummary {
    pub exercise_count: usize,
    pub set_count: usize,
    pub total_reps: u64,
    /// Sum of `reps * weight` over every set.
    pub total_volume: f64,
}

impl WorkoutSummary {
    pub fn of(workout: &Workout) -> Self {
        workout
            .exercises
            .iter()
            .flat_map(|e| e.sets.iter())
            .fold(
                Self {
                    exercise_count: workout.exercises.len(),
                    ..Self::default()
                },
                |mut acc, set| {
                    acc.set_count += 1;
                    acc.total_reps += u64::from(set.reps);
                    acc.total_volume += set.volume();
                    acc
                },
            )
    }
}

impl From<&Workout> for WorkoutSummary {
    fn from(workout: &Workout) -> Self {
        Self::of(workout)
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::snapshot::Snapshot;

    #[test]
    fn summarizes_the_starter_workout() {
        let mut snapshot = Snapshot::empty();
        let starter = snapshot.seed_starter(Utc::now()).unwrap();
        let summary = WorkoutSummary::of(&starter);
        assert_eq!(summary.exercise_count, 2);
        assert_eq!(summary.set_count, 3);
        assert_eq!(summary.total_reps, 28);
        assert_eq!(summary.total_volume, 10.0 * 135.0 + 8.0 * 145.0 + 10.0 * 95.0);
    }

    #[test]
    fn empty_workout_has_zero_totals() {
        let mut snapshot = Snapshot::empty();
        let w = snapshot.add_workout(&crate::NewWorkout::new("Rest").unwrap());
        assert_eq!(WorkoutSummary::of(&w), WorkoutSummary::default());
    }
}

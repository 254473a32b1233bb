//! JSON encoding of persisted snapshots.
//!
//! ```text
//! {
//!   "schemaVersion": 1,
//!   "revision": 7,
//!   "nextId": 12,
//!   "workouts": [ { "id": 1, "name": "...", "date": "...", "exercises": [...] } ]
//! }
//! ```
//!
//! A bare JSON array of workouts is also accepted: that is how earlier
//! versions stored the list. Those sets carry no `exerciseId`, and ids were
//! millisecond timestamps that can repeat. Back-references are rebuilt from
//! the nesting, repeated ids get fresh ones past the largest id found, and
//! the result decodes at revision 0.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use rep_model::{Exercise, ExerciseId, ExerciseSet, SetId, Snapshot, Workout, WorkoutId};
use serde::{Deserialize, Serialize};

use crate::error::{PersistenceError, Result};

/// Current snapshot schema version.
pub const CURRENT_SCHEMA_VERSION: u32 = 1;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Envelope<'a> {
    schema_version: u32,
    #[serde(flatten)]
    snapshot: &'a Snapshot,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Header {
    #[serde(default)]
    schema_version: u32,
}

pub fn encode(snapshot: &Snapshot) -> Result<String> {
    serde_json::to_string(&Envelope {
        schema_version: CURRENT_SCHEMA_VERSION,
        snapshot,
    })
    .map_err(|source| PersistenceError::Serialization { source })
}

/// Decodes and integrity-checks a stored snapshot. `target` names the medium
/// in errors.
pub fn decode(text: &str, target: &str) -> Result<Snapshot> {
    let corrupt = |reason: String| PersistenceError::Corrupt {
        target: target.to_string(),
        reason,
    };

    let snapshot = if text.trim_start().starts_with('[') {
        let workouts: Vec<LegacyWorkout> =
            serde_json::from_str(text).map_err(|e| corrupt(e.to_string()))?;
        legacy_snapshot(workouts)
    } else {
        let header: Header = serde_json::from_str(text).map_err(|e| corrupt(e.to_string()))?;
        if header.schema_version > CURRENT_SCHEMA_VERSION {
            return Err(PersistenceError::UnsupportedVersion {
                found: header.schema_version,
                max_supported: CURRENT_SCHEMA_VERSION,
            });
        }
        serde_json::from_str::<Snapshot>(text).map_err(|e| corrupt(e.to_string()))?
    };

    snapshot
        .check_integrity()
        .map_err(|e| corrupt(e.to_string()))?;
    Ok(snapshot)
}

#[derive(Deserialize)]
struct LegacyWorkout {
    id: u64,
    name: String,
    date: DateTime<Utc>,
    #[serde(default)]
    exercises: Vec<LegacyExercise>,
}

#[derive(Deserialize)]
struct LegacyExercise {
    id: u64,
    name: String,
    #[serde(default)]
    sets: Vec<LegacySet>,
}

/// Reps were coerced from a form field, so they may be fractional.
#[derive(Deserialize)]
struct LegacySet {
    id: u64,
    reps: f64,
    weight: f64,
}

impl LegacySet {
    fn reps(&self) -> Option<u32> {
        let reps = self.reps.round();
        (reps >= 1.0 && reps <= f64::from(u32::MAX)).then_some(reps as u32)
    }
}

/// Hands out legacy ids, replacing any already taken.
struct IdAllocator {
    taken: HashSet<u64>,
    next: u64,
    renumbered: usize,
}

impl IdAllocator {
    fn claim(&mut self, id: u64) -> u64 {
        if self.taken.insert(id) {
            return id;
        }
        let fresh = self.next;
        self.next += 1;
        self.taken.insert(fresh);
        self.renumbered += 1;
        fresh
    }
}

fn legacy_snapshot(legacy: Vec<LegacyWorkout>) -> Snapshot {
    let max_id = legacy
        .iter()
        .flat_map(|w| {
            std::iter::once(w.id).chain(w.exercises.iter().flat_map(|e| {
                std::iter::once(e.id).chain(e.sets.iter().map(|s| s.id))
            }))
        })
        .max()
        .unwrap_or(0);
    let mut ids = IdAllocator {
        taken: HashSet::new(),
        next: max_id.saturating_add(1),
        renumbered: 0,
    };
    let mut dropped_sets = 0;

    let workouts = legacy
        .into_iter()
        .map(|w| {
            let workout_id = WorkoutId::new(ids.claim(w.id));
            let exercises = w
                .exercises
                .into_iter()
                .map(|e| {
                    let exercise_id = ExerciseId::new(ids.claim(e.id));
                    let sets = e
                        .sets
                        .into_iter()
                        .filter_map(|set| {
                            let reps = set.reps();
                            let valid_weight = set.weight.is_finite() && set.weight >= 0.0;
                            let Some(reps) = reps.filter(|_| valid_weight) else {
                                dropped_sets += 1;
                                return None;
                            };
                            Some(ExerciseSet {
                                id: SetId::new(ids.claim(set.id)),
                                exercise_id,
                                reps,
                                weight: set.weight,
                            })
                        })
                        .collect();
                    Exercise {
                        id: exercise_id,
                        workout_id,
                        name: e.name,
                        sets,
                    }
                })
                .collect();
            Workout {
                id: workout_id,
                name: w.name,
                date: w.date,
                exercises,
            }
        })
        .collect();

    if ids.renumbered > 0 || dropped_sets > 0 {
        tracing::warn!(
            renumbered = ids.renumbered,
            dropped_sets,
            "Repaired legacy workout list"
        );
    }
    Snapshot {
        revision: 0,
        next_id: ids.next,
        workouts,
    }
}

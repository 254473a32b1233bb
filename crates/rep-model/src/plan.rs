//! Training plan presets and the starter workout.
//!
//! Starting a plan creates one workout named after the plan and seeds it with
//! the plan's exercises, in order.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Difficulty level of a preset plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlanLevel {
    #[default]
    Beginner,
    Intermediate,
    Advanced,
}

impl PlanLevel {
    pub const ALL: [Self; 3] = [Self::Beginner, Self::Intermediate, Self::Advanced];

    pub const fn label(&self) -> &'static str {
        match self {
            Self::Beginner => "beginner",
            Self::Intermediate => "intermediate",
            Self::Advanced => "advanced",
        }
    }

    pub fn plan(&self) -> &'static Plan {
        match self {
            Self::Beginner => &BEGINNER,
            Self::Intermediate => &INTERMEDIATE,
            Self::Advanced => &ADVANCED,
        }
    }
}

impl fmt::Display for PlanLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for PlanLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|level| level.label().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown plan level '{s}'"))
    }
}

/// One day of a plan's weekly schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScheduleDay {
    pub day: &'static str,
    pub focus: &'static str,
    pub minutes: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Plan {
    pub title: &'static str,
    pub intensity: &'static str,
    pub exercises: &'static [&'static str],
    pub schedule: &'static [ScheduleDay],
}

static BEGINNER: Plan = Plan {
    title: "Beginner Plan",
    intensity: "Low",
    exercises: &["Push Ups", "Squats", "Plank"],
    schedule: &[
        ScheduleDay {
            day: "Mon",
            focus: "Full Body",
            minutes: 30,
        },
        ScheduleDay {
            day: "Wed",
            focus: "Core",
            minutes: 20,
        },
        ScheduleDay {
            day: "Fri",
            focus: "Upper Body",
            minutes: 30,
        },
    ],
};

static INTERMEDIATE: Plan = Plan {
    title: "Intermediate Plan",
    intensity: "Medium",
    exercises: &["Bench Press", "Pull Ups", "Deadlift", "Shoulder Press"],
    schedule: &[
        ScheduleDay {
            day: "Mon",
            focus: "Upper Body",
            minutes: 45,
        },
        ScheduleDay {
            day: "Tue",
            focus: "Lower Body",
            minutes: 45,
        },
        ScheduleDay {
            day: "Thu",
            focus: "Push",
            minutes: 45,
        },
        ScheduleDay {
            day: "Fri",
            focus: "Pull",
            minutes: 45,
        },
    ],
};

static ADVANCED: Plan = Plan {
    title: "Advanced Plan",
    intensity: "High",
    exercises: &[
        "Bench Press",
        "Deadlift",
        "Squats",
        "Pull Ups",
        "Shoulder Press",
    ],
    schedule: &[
        ScheduleDay {
            day: "Mon",
            focus: "Chest & Triceps",
            minutes: 60,
        },
        ScheduleDay {
            day: "Tue",
            focus: "Back & Biceps",
            minutes: 60,
        },
        ScheduleDay {
            day: "Wed",
            focus: "Legs",
            minutes: 75,
        },
        ScheduleDay {
            day: "Fri",
            focus: "Full Body",
            minutes: 60,
        },
    ],
};

/// An exercise of the starter workout with its `(reps, weight)` sets.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StarterExercise {
    pub name: &'static str,
    pub sets: &'static [(u32, f64)],
}

/// Name of the workout created when seeding an empty store.
pub const STARTER_WORKOUT: &str = "Full Body Starter";

pub const STARTER_EXERCISES: &[StarterExercise] = &[
    StarterExercise {
        name: "Barbell Squat",
        sets: &[(10, 135.0), (8, 145.0)],
    },
    StarterExercise {
        name: "Bench Press",
        sets: &[(10, 95.0)],
    },
];

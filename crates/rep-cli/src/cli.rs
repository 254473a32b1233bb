//! CLI argument definitions for `rep`.

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand, ValueEnum};
use clap_verbosity_flag::{Verbosity, WarnLevel};
use colorchoice_clap::Color;
use rep_cli::logging::LogFormat;
use rep_model::{ExerciseId, PlanLevel, SetId, WorkoutId};
use tracing::level_filters::LevelFilter;

#[derive(Parser)]
#[command(
    name = "rep",
    version,
    about = "Rep - log workouts, exercises and sets",
    long_about = "Log workouts, exercises and sets.\n\n\
                  Data is kept in a local JSON snapshot, or on a remote Rep API\n\
                  when --remote is given."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Settings file (default: settings.toml in the platform config directory).
    #[arg(long = "config", value_name = "PATH", global = true)]
    pub config: Option<PathBuf>,

    #[command(flatten)]
    pub backend: BackendArgs,

    /// Adjust log verbosity (-v for info, -vv for debug, -q for errors only).
    #[command(flatten)]
    pub verbosity: Verbosity<WarnLevel>,

    /// Control ANSI color output (auto, always, never).
    #[command(flatten)]
    pub color: Color,

    /// Explicit log level (overrides -v/-q flags).
    #[arg(long = "log-level", value_enum, global = true)]
    pub log_level: Option<LogLevelArg>,

    /// Log output format (pretty for human, json for machine parsing).
    #[arg(
        long = "log-format",
        value_enum,
        default_value = "pretty",
        global = true
    )]
    pub log_format: LogFormatArg,

    /// Write logs to a file instead of stderr.
    #[arg(long = "log-file", value_name = "PATH", global = true)]
    pub log_file: Option<PathBuf>,
}

#[derive(Args)]
#[group(multiple = false)]
pub struct BackendArgs {
    /// Keep the workout log in this directory.
    #[arg(long = "data-dir", value_name = "DIR")]
    pub data_dir: Option<PathBuf>,

    /// Use a remote Rep API instead of local storage.
    #[arg(long = "remote", value_name = "URL")]
    pub remote: Option<String>,
}

#[derive(Subcommand)]
pub enum Command {
    #[command(flatten)]
    Log(LogCommand),

    /// Print the effective settings as TOML.
    Config {
        /// Also save them, including --data-dir or --remote, to the settings
        /// file.
        #[arg(long = "write")]
        write: bool,
    },
}

/// Commands that open the workout log.
#[derive(Subcommand)]
pub enum LogCommand {
    /// List workouts, newest first.
    List,

    /// Show one workout with its exercises and sets.
    Show {
        #[arg(value_name = "WORKOUT_ID")]
        workout: WorkoutId,
    },

    /// Log a new workout.
    AddWorkout(AddWorkoutArgs),

    /// Delete a workout with all its exercises and sets.
    RmWorkout {
        #[arg(value_name = "WORKOUT_ID")]
        workout: WorkoutId,
    },

    /// Add an exercise to a workout.
    AddExercise {
        #[arg(value_name = "WORKOUT_ID")]
        workout: WorkoutId,
        name: String,
    },

    /// Delete an exercise with all its sets.
    RmExercise {
        #[arg(value_name = "WORKOUT_ID")]
        workout: WorkoutId,
        #[arg(value_name = "EXERCISE_ID")]
        exercise: ExerciseId,
    },

    /// Record a set of an exercise.
    AddSet {
        #[arg(value_name = "WORKOUT_ID")]
        workout: WorkoutId,
        #[arg(value_name = "EXERCISE_ID")]
        exercise: ExerciseId,
        #[arg(allow_negative_numbers = true)]
        reps: i64,
        #[arg(allow_negative_numbers = true)]
        weight: f64,
    },

    /// Delete a set.
    RmSet {
        #[arg(value_name = "WORKOUT_ID")]
        workout: WorkoutId,
        #[arg(value_name = "SET_ID")]
        set: SetId,
    },

    /// Start a preset training plan as a new workout.
    Plan {
        #[arg(value_name = "LEVEL")]
        level: PlanLevel,
    },

    /// Create the starter workout if the log is empty.
    Seed,

    /// Print the workout list every time it changes.
    ///
    /// Picks up changes made by other `rep` processes sharing the same data
    /// directory.
    Watch {
        /// Exit after this many updates (default: run until interrupted).
        #[arg(long = "updates", value_name = "N")]
        updates: Option<usize>,
    },
}

#[derive(Args)]
pub struct AddWorkoutArgs {
    pub name: String,

    /// Back-date the workout (YYYY-MM-DD). Ignored by remote backends.
    #[arg(long = "date", value_name = "DATE")]
    pub date: Option<NaiveDate>,
}

#[derive(Clone, Copy, ValueEnum)]
pub enum LogLevelArg {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<LogLevelArg> for LevelFilter {
    fn from(level: LogLevelArg) -> Self {
        match level {
            LogLevelArg::Error => Self::ERROR,
            LogLevelArg::Warn => Self::WARN,
            LogLevelArg::Info => Self::INFO,
            LogLevelArg::Debug => Self::DEBUG,
            LogLevelArg::Trace => Self::TRACE,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
pub enum LogFormatArg {
    Pretty,
    Compact,
    Json,
}

impl From<LogFormatArg> for LogFormat {
    fn from(format: LogFormatArg) -> Self {
        match format {
            LogFormatArg::Pretty => Self::Pretty,
            LogFormatArg::Compact => Self::Compact,
            LogFormatArg::Json => Self::Json,
        }
    }
}

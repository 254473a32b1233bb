use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, bail};
use chrono::{NaiveDate, NaiveTime};
use rep_model::{PlanLevel, Workout, WorkoutId};
use rep_sync::{Mutation, Query, QueryState, SyncContext, SyncError};

use rep_cli::Settings;
use rep_cli::summary::{
    format_weight, plan_table, workout_detail_table, workout_heading, workout_table,
};

use crate::cli::{AddWorkoutArgs, Command, LogCommand};

/// Runs one command against the configured backend. `settings_path` is
/// where `config --write` saves to.
pub async fn run(
    command: Command,
    settings: &Settings,
    settings_path: Option<&Path>,
) -> anyhow::Result<()> {
    let command = match command {
        Command::Config { write } => return show_config(settings, settings_path, write),
        Command::Log(command) => command,
    };
    let mut config = settings.resolved_sync();
    if !matches!(command, LogCommand::Watch { .. }) {
        config.external_poll_ms = 0;
    }
    let context = SyncContext::open(&config)
        .await
        .context("failed to open the workout log")?;

    let outcome = dispatch(&context, command, settings).await;
    context.shutdown().await;
    outcome
}

async fn dispatch(
    context: &SyncContext,
    command: LogCommand,
    settings: &Settings,
) -> anyhow::Result<()> {
    let display = &settings.display;
    match command {
        LogCommand::List => {
            let workouts = read(context.list_workouts()).await?;
            println!("{}", workout_table(&workouts, display));
        }
        LogCommand::Show { workout } => {
            let workout = read_workout(context, workout).await?;
            println!("{}", workout_heading(&workout, display));
            println!("{}", workout_detail_table(&workout, display));
        }
        LogCommand::AddWorkout(args) => {
            let workout = finish(add_workout(context, &args)).await?;
            println!("Created workout {}: {}", workout.id, workout.name);
        }
        LogCommand::RmWorkout { workout } => {
            finish(context.delete_workout(workout)).await?;
            println!("Deleted workout {workout}");
        }
        LogCommand::AddExercise { workout, name } => {
            let exercise = finish(context.create_exercise(workout, &name)).await?;
            println!(
                "Added exercise {}: {} to workout {workout}",
                exercise.id, exercise.name
            );
        }
        LogCommand::RmExercise { workout, exercise } => {
            finish(context.delete_exercise(exercise, workout)).await?;
            println!("Deleted exercise {exercise}");
        }
        LogCommand::AddSet {
            workout,
            exercise,
            reps,
            weight,
        } => {
            let set = finish(context.create_set(workout, exercise, reps, weight)).await?;
            println!(
                "Recorded set {}: {} x {} {}",
                set.id,
                set.reps,
                format_weight(set.weight),
                display.weight_unit.label()
            );
        }
        LogCommand::RmSet { workout, set } => {
            finish(context.delete_set(set, workout)).await?;
            println!("Deleted set {set}");
        }
        LogCommand::Plan { level } => start_plan(context, level, settings).await?,
        LogCommand::Seed => match finish(context.seed_if_empty()).await? {
            Some(workout) => println!("Created starter workout {}: {}", workout.id, workout.name),
            None => println!("Workout log is not empty; nothing seeded"),
        },
        LogCommand::Watch { updates } => watch(context, updates, settings).await?,
    }
    Ok(())
}

fn show_config(settings: &Settings, path: Option<&Path>, write: bool) -> anyhow::Result<()> {
    print!(
        "{}",
        toml::to_string_pretty(settings).context("failed to serialize settings")?
    );
    if write {
        let path = path.context("no settings location on this platform; pass --config")?;
        settings.save_to(path)?;
        println!("Saved settings to {}", path.display());
    }
    Ok(())
}

fn add_workout(context: &SyncContext, args: &AddWorkoutArgs) -> Mutation<Workout> {
    match args.date {
        Some(date) => context.create_workout_on(&args.name, start_of_day(date)),
        None => context.create_workout(&args.name),
    }
}

fn start_of_day(date: NaiveDate) -> chrono::DateTime<chrono::Utc> {
    date.and_time(NaiveTime::MIN).and_utc()
}

async fn start_plan(
    context: &SyncContext,
    level: PlanLevel,
    settings: &Settings,
) -> anyhow::Result<()> {
    let plan = level.plan();
    let workout = finish(context.start_plan(level)).await?;
    println!(
        "Started {} ({} intensity) as workout {}",
        plan.title, plan.intensity, workout.id
    );
    println!("{}", plan_table(plan));
    println!("{}", workout_detail_table(&workout, &settings.display));
    Ok(())
}

async fn watch(
    context: &SyncContext,
    updates: Option<usize>,
    settings: &Settings,
) -> anyhow::Result<()> {
    let mut query = context.list_workouts();
    let mut state = query.ready().await?;
    let mut printed = 0;
    loop {
        match &state {
            QueryState::Ready(workouts) => {
                println!("{}", workout_table(workouts, &settings.display));
                printed += 1;
            }
            QueryState::Failed { error, .. } => {
                tracing::warn!(%error, "Workout list could not be refreshed");
            }
            QueryState::Loading | QueryState::NotFound => {}
        }
        if updates.is_some_and(|limit| printed >= limit) {
            return Ok(());
        }
        state = query.changed().await?;
    }
}

/// Waits for a mutation, keeping the validation field in the message.
async fn finish<T>(mutation: Mutation<T>) -> anyhow::Result<T>
where
    T: Clone + Send + Sync + 'static,
{
    mutation.wait().await.map_err(|error| match error.field() {
        Some(field) => anyhow::anyhow!("invalid {field}: {}", error.user_message()),
        None => anyhow::Error::new(error),
    })
}

/// Advice for a failed command, when the sync layer has any.
pub fn suggestion(error: &anyhow::Error) -> Option<String> {
    error
        .chain()
        .find_map(|cause| cause.downcast_ref::<SyncError>())
        .and_then(SyncError::suggestion)
}

/// Waits for the first settled state of a list read.
async fn read(mut query: Query<Vec<Workout>>) -> anyhow::Result<Arc<Vec<Workout>>> {
    match query.ready().await? {
        QueryState::Ready(value) => Ok(value),
        QueryState::Failed { error, .. } => Err(error.into()),
        QueryState::Loading | QueryState::NotFound => Ok(Arc::new(Vec::new())),
    }
}

async fn read_workout(context: &SyncContext, id: WorkoutId) -> anyhow::Result<Arc<Workout>> {
    let mut query = context.get_workout(id);
    match query.ready().await? {
        QueryState::Ready(workout) => Ok(workout),
        QueryState::NotFound => bail!("workout {id} not found"),
        QueryState::Failed { error, .. } => Err(error.into()),
        QueryState::Loading => bail!("workout {id} is still loading"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn suggestions_come_through_context() {
        let error = anyhow::Error::new(SyncError::Network("refused".into()))
            .context("failed to open the workout log");
        assert_eq!(
            suggestion(&error).as_deref(),
            Some("Check the server address and that it is running.")
        );
        assert_eq!(suggestion(&anyhow::anyhow!("workout 3 not found")), None);
    }

    #[test]
    fn config_write_saves_overrides() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.toml");
        let mut settings = Settings::default();
        settings.override_backend(None, Some("http://localhost:5000/api".into()));

        show_config(&settings, Some(&path), true).unwrap();

        assert_eq!(Settings::load_from(&path), settings);
    }
}

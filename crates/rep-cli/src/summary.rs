//! Terminal tables for workouts, workout details and plans.

use std::fmt::Write;

use chrono::{DateTime, Utc};
use comfy_table::modifiers::{UTF8_ROUND_CORNERS, UTF8_SOLID_INNER_BORDERS};
use comfy_table::presets::{UTF8_FULL, UTF8_FULL_CONDENSED};
use comfy_table::{Attribute, Cell, CellAlignment, Color, ContentArrangement, Table};
use rep_model::{Plan, Workout, WorkoutSummary};

use crate::settings::DisplaySettings;

/// One row per workout, newest first, with a totals row.
pub fn workout_table(workouts: &[Workout], display: &DisplaySettings) -> Table {
    let mut table = Table::new();
    table.set_header(vec![
        header_cell("Id"),
        header_cell("Date"),
        header_cell("Workout"),
        header_cell("Exercises"),
        header_cell("Sets"),
        header_cell("Reps"),
        header_cell(&format!("Volume ({})", display.weight_unit.label())),
    ]);
    apply_table_style(&mut table, display);
    for index in [0, 3, 4, 5, 6] {
        align_column(&mut table, index, CellAlignment::Right);
    }

    let mut totals = WorkoutSummary::default();
    for workout in workouts {
        let summary = WorkoutSummary::of(workout);
        totals.exercise_count += summary.exercise_count;
        totals.set_count += summary.set_count;
        totals.total_reps += summary.total_reps;
        totals.total_volume += summary.total_volume;
        table.add_row(vec![
            dim_cell(workout.id),
            Cell::new(format_date(workout.date, &display.date_format)),
            Cell::new(&workout.name).add_attribute(Attribute::Bold),
            count_cell(summary.exercise_count),
            count_cell(summary.set_count),
            count_cell(summary.total_reps),
            Cell::new(format_weight(summary.total_volume)),
        ]);
    }
    table.add_row(vec![
        dim_cell("-"),
        dim_cell("-"),
        Cell::new(format!("TOTAL ({})", workouts.len()))
            .fg(Color::Cyan)
            .add_attribute(Attribute::Bold),
        Cell::new(totals.exercise_count).add_attribute(Attribute::Bold),
        Cell::new(totals.set_count).add_attribute(Attribute::Bold),
        Cell::new(totals.total_reps).add_attribute(Attribute::Bold),
        Cell::new(format_weight(totals.total_volume)).add_attribute(Attribute::Bold),
    ]);
    table
}

/// Every set of every exercise in one workout.
pub fn workout_detail_table(workout: &Workout, display: &DisplaySettings) -> Table {
    let unit = display.weight_unit.label();
    let mut table = Table::new();
    table.set_header(vec![
        header_cell("Exercise"),
        header_cell("Exercise Id"),
        header_cell("Set"),
        header_cell("Set Id"),
        header_cell("Reps"),
        header_cell(&format!("Weight ({unit})")),
        header_cell(&format!("Volume ({unit})")),
    ]);
    apply_table_style(&mut table, display);
    for index in 1..=6 {
        align_column(&mut table, index, CellAlignment::Right);
    }

    for exercise in &workout.exercises {
        if exercise.sets.is_empty() {
            table.add_row(vec![
                Cell::new(&exercise.name).add_attribute(Attribute::Bold),
                dim_cell(exercise.id),
                dim_cell("-"),
                dim_cell("-"),
                dim_cell("-"),
                dim_cell("-"),
                dim_cell("-"),
            ]);
            continue;
        }
        for (position, set) in exercise.sets.iter().enumerate() {
            let name = if position == 0 {
                Cell::new(&exercise.name).add_attribute(Attribute::Bold)
            } else {
                Cell::new("")
            };
            table.add_row(vec![
                name,
                dim_cell(exercise.id),
                Cell::new(position + 1),
                dim_cell(set.id),
                Cell::new(set.reps),
                Cell::new(format_weight(set.weight)),
                Cell::new(format_weight(set.volume())),
            ]);
        }
    }
    table
}

/// Header lines printed above a workout's detail table.
pub fn workout_heading(workout: &Workout, display: &DisplaySettings) -> String {
    let summary = WorkoutSummary::of(workout);
    format!(
        "{} (#{}) on {}\n{} exercises, {} sets, {} reps, {} {} total volume",
        workout.name,
        workout.id,
        format_date(workout.date, &display.date_format),
        summary.exercise_count,
        summary.set_count,
        summary.total_reps,
        format_weight(summary.total_volume),
        display.weight_unit.label(),
    )
}

/// A plan's weekly schedule.
pub fn plan_table(plan: &Plan) -> Table {
    let mut table = Table::new();
    table.set_header(vec![
        header_cell("Day"),
        header_cell("Focus"),
        header_cell("Minutes"),
    ]);
    apply_condensed_style(&mut table);
    align_column(&mut table, 2, CellAlignment::Right);
    for day in plan.schedule {
        table.add_row(vec![
            Cell::new(day.day).add_attribute(Attribute::Bold),
            Cell::new(day.focus),
            Cell::new(day.minutes),
        ]);
    }
    table
}

/// Formats `date` with a user-supplied pattern, falling back to RFC 3339
/// when the pattern is invalid.
pub fn format_date(date: DateTime<Utc>, pattern: &str) -> String {
    let mut out = String::new();
    if write!(out, "{}", date.format(pattern)).is_err() {
        return date.to_rfc3339();
    }
    out
}

/// Whole numbers print without a fraction; everything else with one decimal.
pub fn format_weight(weight: f64) -> String {
    if weight.fract() == 0.0 {
        format!("{weight:.0}")
    } else {
        format!("{weight:.1}")
    }
}

fn apply_table_style(table: &mut Table, display: &DisplaySettings) {
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .apply_modifier(UTF8_SOLID_INNER_BORDERS)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_width(display.table_width);
}

fn apply_condensed_style(table: &mut Table) {
    table
        .load_preset(UTF8_FULL_CONDENSED)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic);
}

fn align_column(table: &mut Table, index: usize, alignment: CellAlignment) {
    if let Some(column) = table.column_mut(index) {
        column.set_cell_alignment(alignment);
    }
}

fn header_cell(label: &str) -> Cell {
    Cell::new(label)
        .fg(Color::Cyan)
        .add_attribute(Attribute::Bold)
}

fn count_cell<T: std::fmt::Display + Default + PartialEq>(value: T) -> Cell {
    if value == T::default() {
        dim_cell(value)
    } else {
        Cell::new(value)
    }
}

fn dim_cell<T: std::fmt::Display>(value: T) -> Cell {
    Cell::new(value).fg(Color::DarkGrey)
}

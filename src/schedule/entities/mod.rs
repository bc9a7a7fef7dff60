//! The GTFS entity types and the contract every one of them follows.
//!
//! Loading an entity is split in three steps: [`Entity::from_row`] parses a
//! row, [`Entity::validate_before_add`] checks the entity on its own and may
//! veto the insertion, [`Entity::add_to_schedule`] inserts it and runs the
//! checks that need the rest of the schedule.

mod agency;
mod fare;
mod feed_info;
mod frequency;
mod route;
mod service_period;
mod shape;
mod stop;
mod stop_time;
mod transfer;
mod trip;

pub use agency::*;
pub use fare::*;
pub use feed_info::*;
pub use frequency::*;
pub use route::*;
pub use service_period::*;
pub use shape::*;
pub use stop::*;
pub use stop_time::*;
pub use transfer::*;
pub use trip::*;

use crate::{
    gtfs::{Columns, Row},
    problems::{Reporter, Severity},
    schedule::Schedule,
    shared::values::{is_empty, parse_float, parse_non_negative_int},
};

/// What became of a row.
#[derive(Debug, Clone, PartialEq)]
pub enum RowOutcome<T> {
    Accepted(T),
    /// The row was reported and must not be inserted.
    Skip,
}

impl<T> RowOutcome<T> {
    pub fn accepted(self) -> Option<T> {
        match self {
            Self::Accepted(entity) => Some(entity),
            Self::Skip => None,
        }
    }
}

pub trait Entity: Sized {
    /// Class name the registry knows the type by.
    const NAME: &'static str;
    const COLUMNS: Columns;

    fn from_row(row: &Row, reporter: &mut Reporter) -> RowOutcome<Self>;

    /// Checks that need nothing but the entity itself. Returning `false`
    /// keeps the entity out of the schedule.
    fn validate_before_add(&self, _reporter: &mut Reporter) -> bool {
        true
    }

    /// Checks against the rest of the schedule. Never blocks an insertion.
    fn validate_after_add(&self, _schedule: &Schedule, _reporter: &mut Reporter) {}

    /// Inserts the entity, reporting duplicate ids and broken references,
    /// then runs [`Entity::validate_after_add`].
    fn add_to_schedule(self, schedule: &mut Schedule, reporter: &mut Reporter);

    /// Runs both validation phases for an entity built outside a load.
    fn validate(&self, schedule: Option<&Schedule>, reporter: &mut Reporter) -> bool {
        let valid = self.validate_before_add(reporter);
        if let Some(schedule) = schedule {
            self.validate_after_add(schedule, reporter);
        }
        valid
    }

    /// Text of a known column, `None` for columns the type does not know.
    fn value(&self, column: &str) -> Option<String>;

    /// Columns the type does not know, in file order.
    fn extras(&self) -> &[(String, String)] {
        &[]
    }

    /// Row values in the order of `columns`, extras included.
    fn to_record(&self, columns: &[String]) -> Vec<String> {
        columns
            .iter()
            .map(|column| {
                self.value(column)
                    .or_else(|| {
                        self.extras()
                            .iter()
                            .find(|(name, _)| name == column)
                            .map(|(_, value)| value.clone())
                    })
                    .unwrap_or_default()
            })
            .collect()
    }
}

/// Result of parsing an optional numeric cell.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum Parsed<T> {
    Empty,
    Value(T),
    Invalid,
}

impl<T> Parsed<T> {
    pub(crate) fn value(self) -> Option<T> {
        match self {
            Self::Value(value) => Some(value),
            _ => None,
        }
    }

    pub(crate) fn is_invalid(&self) -> bool {
        matches!(self, Self::Invalid)
    }
}

pub(crate) fn text(row: &Row, column: &str) -> String {
    row.get(column).to_string()
}

/// Parses a float cell, reporting values that do not parse.
pub(crate) fn float_cell(row: &Row, column: &str, reporter: &mut Reporter) -> Parsed<f64> {
    let value = row.get(column);
    if is_empty(value) {
        return Parsed::Empty;
    }
    match parse_float(value, reporter) {
        Some(parsed) => Parsed::Value(parsed),
        None => {
            reporter.invalid_value(column, value);
            Parsed::Invalid
        }
    }
}

/// Parses a non-negative integer cell, reporting values that do not parse.
pub(crate) fn non_negative_cell(
    row: &Row,
    column: &str,
    reason: Option<&str>,
    reporter: &mut Reporter,
) -> Parsed<u32> {
    let value = row.get(column);
    if is_empty(value) {
        return Parsed::Empty;
    }
    match parse_non_negative_int(value, reporter) {
        Some(parsed) => Parsed::Value(parsed),
        None => {
            reporter.invalid_value_as(column, value, reason.map(str::to_string), Severity::Error);
            Parsed::Invalid
        }
    }
}

pub(crate) fn format_float(value: Option<f64>) -> String {
    value.map(|value| value.to_string()).unwrap_or_default()
}

pub(crate) fn format_int<T: ToString>(value: Option<T>) -> String {
    value.map(|value| value.to_string()).unwrap_or_default()
}

/// Reports every listed column whose value is blank.
pub(crate) fn check_required(fields: &[(&str, &str)], reporter: &mut Reporter) -> bool {
    let mut complete = true;
    for (column, value) in fields {
        if is_empty(value) {
            reporter.missing_value(column);
            complete = false;
        }
    }
    complete
}

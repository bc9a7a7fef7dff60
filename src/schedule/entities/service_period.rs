use std::collections::BTreeMap;

use chrono::{Datelike, NaiveDate};

use crate::{
    gtfs::{Columns, Row},
    problems::{Reporter, Severity},
    schedule::{
        Schedule,
        entities::{Entity, RowOutcome, text},
    },
    shared::{
        date::{
            YEAR_RANGE_MAX, YEAR_RANGE_MIN, check_date_range, format_date, parse_date,
            validate_date,
        },
        values::is_empty,
    },
};

pub const DAYS_OF_WEEK: [&str; 7] = [
    "monday",
    "tuesday",
    "wednesday",
    "thursday",
    "friday",
    "saturday",
    "sunday",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExceptionType {
    Added,
    Removed,
}

impl ExceptionType {
    pub fn code(&self) -> &'static str {
        match self {
            Self::Added => "1",
            Self::Removed => "2",
        }
    }
}

/// Values of a calendar.txt row as they were read.
#[derive(Debug, Clone, Default, PartialEq)]
struct CalendarRow {
    start_date: String,
    end_date: String,
    days: [String; 7],
}

/// A set of dates on which trips run: a weekly pattern between two dates
/// plus dates that are explicitly added or removed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ServicePeriod {
    pub service_id: String,
    /// Monday first.
    pub days: [bool; 7],
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub exceptions: BTreeMap<NaiveDate, ExceptionType>,
    pub extras: Vec<(String, String)>,
    calendar_row: Option<CalendarRow>,
}

impl ServicePeriod {
    pub fn new(service_id: &str) -> Self {
        Self {
            service_id: service_id.into(),
            ..Default::default()
        }
    }

    pub fn with_dates(mut self, start_date: NaiveDate, end_date: NaiveDate) -> Self {
        self.start_date = Some(start_date);
        self.end_date = Some(end_date);
        self
    }

    /// Sets service on a day of the week, 0 being Monday.
    pub fn set_day_of_week_has_service(&mut self, day: usize, has_service: bool) {
        if let Some(slot) = self.days.get_mut(day) {
            *slot = has_service;
        }
    }

    pub fn set_weekday_service(&mut self, has_service: bool) {
        self.days[..5].fill(has_service);
    }

    pub fn set_weekend_service(&mut self, has_service: bool) {
        self.days[5..].fill(has_service);
    }

    /// Adds an exception for `date`. A second exception for the same date
    /// replaces the first and is reported as a duplicate.
    pub fn set_date_has_service(
        &mut self,
        date: NaiveDate,
        has_service: bool,
        reporter: Option<&mut Reporter>,
    ) {
        if self.exceptions.contains_key(&date)
            && let Some(reporter) = reporter
        {
            reporter.duplicate_ids(
                &["service_id", "date"],
                &[&self.service_id, &format_date(date)],
                Severity::Warning,
            );
        }
        let exception = if has_service {
            ExceptionType::Added
        } else {
            ExceptionType::Removed
        };
        self.exceptions.insert(date, exception);
    }

    pub fn reset_date_to_normal_service(&mut self, date: NaiveDate) {
        self.exceptions.remove(&date);
    }

    pub fn has_exceptions(&self) -> bool {
        !self.exceptions.is_empty()
    }

    pub fn has_date_exception_on(&self, date: NaiveDate, exception: ExceptionType) -> bool {
        self.exceptions.get(&date) == Some(&exception)
    }

    fn has_added_dates(&self) -> bool {
        self.exceptions
            .values()
            .any(|exception| *exception == ExceptionType::Added)
    }

    /// First and last date the period may be active on. Added dates extend
    /// the range, removed dates never shrink it.
    pub fn date_range(&self) -> Option<(NaiveDate, NaiveDate)> {
        let mut start = self.start_date;
        let mut end = self.end_date;
        for (date, _) in self
            .exceptions
            .iter()
            .filter(|(_, exception)| **exception == ExceptionType::Added)
        {
            start = Some(start.map_or(*date, |start| start.min(*date)));
            end = Some(end.map_or(*date, |end| end.max(*date)));
        }
        match (start, end) {
            (Some(start), Some(end)) => Some((start, end)),
            (Some(date), None) | (None, Some(date)) => Some((date, date)),
            (None, None) => None,
        }
    }

    /// An exception for the date always wins over the weekly pattern.
    pub fn is_active_on(&self, date: NaiveDate) -> bool {
        if let Some(exception) = self.exceptions.get(&date) {
            return *exception == ExceptionType::Added;
        }
        match (self.start_date, self.end_date) {
            (Some(start), Some(end)) if start <= date && date <= end => {
                self.days[date.weekday().num_days_from_monday() as usize]
            }
            _ => false,
        }
    }

    pub fn active_dates(&self) -> Vec<NaiveDate> {
        let Some((start, end)) = self.date_range() else {
            return Vec::new();
        };
        start
            .iter_days()
            .take_while(|date| *date <= end)
            .filter(|date| self.is_active_on(*date))
            .collect()
    }

    /// Returns `true` when both periods are active on a common date.
    pub fn shares_date_with(&self, other: &Self) -> bool {
        let (Some((start, end)), Some((other_start, other_end))) =
            (self.date_range(), other.date_range())
        else {
            return false;
        };
        let (start, end) = (start.max(other_start), end.min(other_end));
        start
            .iter_days()
            .take_while(|date| *date <= end)
            .any(|date| self.is_active_on(date) && other.is_active_on(date))
    }

    /// Whether the period belongs in calendar.txt.
    pub fn has_calendar_dates(&self) -> bool {
        self.start_date.is_some() && self.end_date.is_some()
    }

    fn check(&self, reporter: &mut Reporter) {
        if is_empty(&self.service_id) {
            reporter.missing_value("service_id");
        }
        if let Some(row) = &self.calendar_row {
            check_calendar_date(&row.start_date, "start_date", reporter);
            check_calendar_date(&row.end_date, "end_date", reporter);
        }
        if let (Some(start), Some(end)) = (self.start_date, self.end_date)
            && end < start
        {
            reporter.invalid_value_because(
                "end_date",
                format_date(end),
                format!(
                    "end_date of {} is earlier than start_date of \"{}\"",
                    format_date(end),
                    format_date(start)
                ),
            );
        }
        if let Some(row) = &self.calendar_row {
            for (column, value) in DAYS_OF_WEEK.iter().zip(&row.days) {
                if is_empty(value) {
                    reporter.missing_value(column);
                } else if value != "0" && value != "1" {
                    reporter.invalid_value(column, value);
                }
            }
        }
        if !self.days.contains(&true) && !self.has_added_dates() {
            reporter.other(
                format!(
                    "Service period with service_id \"{}\" doesn't have service on any days \
                     of the week.",
                    self.service_id
                ),
                Severity::Warning,
            );
        }
    }
}

fn check_calendar_date(value: &str, column: &str, reporter: &mut Reporter) {
    if is_empty(value) {
        reporter.missing_value(column);
    } else if let Some(date) = parse_date(value) {
        check_date_range(date, value, column, reporter);
    } else {
        reporter.invalid_value(column, value);
    }
}

/// Parses a calendar date, dropping values that are malformed or outside the
/// supported years.
fn calendar_date(value: &str) -> Option<NaiveDate> {
    parse_date(value).filter(|date| (YEAR_RANGE_MIN..=YEAR_RANGE_MAX).contains(&date.year()))
}

impl Entity for ServicePeriod {
    const NAME: &'static str = "ServicePeriod";
    const COLUMNS: Columns = Columns {
        required: &[
            "service_id",
            "start_date",
            "end_date",
            "monday",
            "tuesday",
            "wednesday",
            "thursday",
            "friday",
            "saturday",
            "sunday",
        ],
        optional: &[],
        deprecated: &[],
    };

    /// Dates and days are checked once calendar_dates.txt has been merged in.
    fn from_row(row: &Row, _reporter: &mut Reporter) -> RowOutcome<Self> {
        let days = DAYS_OF_WEEK.map(|day| text(row, day));
        let calendar_row = CalendarRow {
            start_date: text(row, "start_date"),
            end_date: text(row, "end_date"),
            days: days.clone(),
        };
        RowOutcome::Accepted(Self {
            service_id: text(row, "service_id"),
            days: days.map(|value| value == "1"),
            start_date: calendar_date(&calendar_row.start_date),
            end_date: calendar_date(&calendar_row.end_date),
            exceptions: BTreeMap::new(),
            extras: row.extras(&Self::COLUMNS),
            calendar_row: Some(calendar_row),
        })
    }

    fn validate_after_add(&self, _schedule: &Schedule, reporter: &mut Reporter) {
        self.check(reporter);
    }

    fn validate(&self, _schedule: Option<&Schedule>, reporter: &mut Reporter) -> bool {
        self.check(reporter);
        true
    }

    fn add_to_schedule(self, schedule: &mut Schedule, reporter: &mut Reporter) {
        if schedule.service_periods.contains(&self.service_id) {
            reporter.duplicate_id("service_id", &self.service_id);
            return;
        }
        self.validate_after_add(schedule, reporter);
        let id = self.service_id.clone();
        schedule.service_periods.insert(&id, self);
    }

    fn value(&self, column: &str) -> Option<String> {
        let value = match column {
            "service_id" => self.service_id.clone(),
            "start_date" => self.start_date.map(format_date).unwrap_or_default(),
            "end_date" => self.end_date.map(format_date).unwrap_or_default(),
            day => {
                let index = DAYS_OF_WEEK.iter().position(|name| *name == day)?;
                if self.days[index] { "1" } else { "0" }.to_string()
            }
        };
        Some(value)
    }

    fn extras(&self) -> &[(String, String)] {
        &self.extras
    }
}

/// A calendar_dates.txt row: service added or removed on a single date.
#[derive(Debug, Clone, PartialEq)]
pub struct ServiceDate {
    pub service_id: String,
    pub date: NaiveDate,
    pub exception_type: ExceptionType,
}

impl ServiceDate {
    /// Applies the exception to `period`.
    pub fn apply(&self, period: &mut ServicePeriod, reporter: &mut Reporter) {
        period.set_date_has_service(
            self.date,
            self.exception_type == ExceptionType::Added,
            Some(reporter),
        );
    }
}

impl Entity for ServiceDate {
    const NAME: &'static str = "ServiceDate";
    const COLUMNS: Columns = Columns {
        required: &["service_id", "date", "exception_type"],
        optional: &[],
        deprecated: &[],
    };

    fn from_row(row: &Row, reporter: &mut Reporter) -> RowOutcome<Self> {
        let value = row.get("date");
        if is_empty(value) {
            reporter.missing_value("date");
            return RowOutcome::Skip;
        }
        let Some(date) = validate_date(value, "date", reporter) else {
            return RowOutcome::Skip;
        };
        let exception_type = match row.get("exception_type") {
            "1" => ExceptionType::Added,
            "2" => ExceptionType::Removed,
            other => {
                reporter.invalid_value("exception_type", other);
                return RowOutcome::Skip;
            }
        };
        RowOutcome::Accepted(Self {
            service_id: text(row, "service_id"),
            date,
            exception_type,
        })
    }

    fn add_to_schedule(self, schedule: &mut Schedule, reporter: &mut Reporter) {
        match schedule.service_periods.get_mut(&self.service_id) {
            Some(period) => self.apply(period, reporter),
            None => {
                let mut period = ServicePeriod::new(&self.service_id);
                self.apply(&mut period, reporter);
                schedule.service_periods.insert(&self.service_id, period);
            }
        }
    }

    fn value(&self, column: &str) -> Option<String> {
        let value = match column {
            "service_id" => self.service_id.clone(),
            "date" => format_date(self.date),
            "exception_type" => self.exception_type.code().to_string(),
            _ => return None,
        };
        Some(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::problems::Collector;

    fn date(value: &str) -> NaiveDate {
        parse_date(value).unwrap()
    }

    fn weekdays() -> ServicePeriod {
        let mut period = ServicePeriod::new("WEEK").with_dates(date("20240101"), date("20240131"));
        period.set_weekday_service(true);
        period
    }

    #[test]
    fn exceptions_override_weekdays() {
        let mut period = weekdays();
        // Monday and Saturday inside the range, Monday after it
        period.set_date_has_service(date("20240108"), false, None);
        period.set_date_has_service(date("20240113"), true, None);
        period.set_date_has_service(date("20240205"), true, None);

        assert!(!period.is_active_on(date("20240108")));
        assert!(period.is_active_on(date("20240109")));
        assert!(period.is_active_on(date("20240113")));
        assert!(!period.is_active_on(date("20240114")));
        assert!(period.is_active_on(date("20240205")));
        assert!(!period.is_active_on(date("20240206")));
        assert_eq!(period.date_range(), Some((date("20240101"), date("20240205"))));
    }

    #[test]
    fn duplicate_exception_warns() {
        let mut collector = Collector::new();
        let mut reporter = Reporter::new(&mut collector);
        let mut period = weekdays();
        period.set_date_has_service(date("20240108"), false, Some(&mut reporter));
        period.set_date_has_service(date("20240108"), true, Some(&mut reporter));
        assert_eq!(collector.warning_count(), 1);
        assert!(period.is_active_on(date("20240108")));
    }

    #[test]
    fn no_service_days_warns() {
        let mut collector = Collector::new();
        let mut reporter = Reporter::new(&mut collector);
        ServicePeriod::new("NONE")
            .with_dates(date("20240101"), date("20240131"))
            .validate(None, &mut reporter);
        assert_eq!(collector.warning_count(), 1);
        assert!(collector.problems()[0].message().contains("doesn't have service"));
    }

    #[test]
    fn shared_dates() {
        let mut weekend =
            ServicePeriod::new("WEEKEND").with_dates(date("20240101"), date("20240131"));
        weekend.set_weekend_service(true);
        assert!(!weekdays().shares_date_with(&weekend));
        weekend.set_date_has_service(date("20240110"), true, None);
        assert!(weekdays().shares_date_with(&weekend));
    }
}

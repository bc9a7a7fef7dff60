use crate::{
    gtfs::{Columns, Row},
    problems::Reporter,
    schedule::{
        Schedule,
        entities::{Entity, RowOutcome, text},
    },
    shared::{Time, values::is_empty},
};

/// A period in which a trip repeats every `headway_secs`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Frequency {
    pub trip_id: String,
    pub start_time: Time,
    pub end_time: Time,
    pub headway_secs: u32,
    pub exact_times: u8,
    pub extras: Vec<(String, String)>,
}

impl Frequency {
    pub fn new(trip_id: &str, start_time: Time, end_time: Time, headway_secs: u32) -> Self {
        Self {
            trip_id: trip_id.into(),
            start_time,
            end_time,
            headway_secs,
            ..Default::default()
        }
    }

    /// Departure time of every run.
    pub fn start_times(&self) -> impl Iterator<Item = Time> + '_ {
        let step = self.headway_secs.max(1) as usize;
        (self.start_time.as_seconds()..self.end_time.as_seconds())
            .step_by(step)
            .map(Time::from_seconds)
    }

    pub fn overlaps(&self, other: &Self) -> bool {
        other.start_time < self.end_time && other.end_time > self.start_time
    }
}

impl std::fmt::Display for Frequency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "('{}', '{}', '{}', '{}', '{}')",
            self.trip_id, self.start_time, self.end_time, self.headway_secs, self.exact_times
        )
    }
}

fn parse_time(row: &Row, column: &str, reporter: &mut Reporter) -> Option<Time> {
    let value = row.get(column);
    if is_empty(value) {
        reporter.missing_value(column);
        return None;
    }
    let time = Time::from_hms(value);
    if time.is_none() {
        reporter.invalid_value(column, value);
    }
    time
}

impl Entity for Frequency {
    const NAME: &'static str = "Frequency";
    const COLUMNS: Columns = Columns {
        required: &["trip_id", "start_time", "end_time", "headway_secs"],
        optional: &["exact_times"],
        deprecated: &[],
    };

    fn from_row(row: &Row, reporter: &mut Reporter) -> RowOutcome<Self> {
        let Some(start_time) = parse_time(row, "start_time", reporter) else {
            return RowOutcome::Skip;
        };
        let Some(end_time) = parse_time(row, "end_time", reporter) else {
            return RowOutcome::Skip;
        };

        let headway = row.get("headway_secs");
        if is_empty(headway) {
            reporter.missing_value("headway_secs");
            return RowOutcome::Skip;
        }
        let headway_secs = match headway.parse::<u32>() {
            Ok(secs) if secs > 0 => secs,
            _ => {
                reporter.invalid_value("headway_secs", headway);
                return RowOutcome::Skip;
            }
        };
        if end_time <= start_time {
            reporter.invalid_value_because(
                "end_time",
                row.get("end_time"),
                "should be greater than start_time",
            );
        }

        let exact_times = match row.get("exact_times") {
            "" | "0" => 0,
            "1" => 1,
            other => {
                reporter.invalid_value_because(
                    "exact_times",
                    other,
                    "Should be 0 (no fixed schedule) or 1 (fixed and regular schedule, \
                     shortcut for a repetitive stop_times file).",
                );
                0
            }
        };

        RowOutcome::Accepted(Self {
            trip_id: text(row, "trip_id"),
            start_time,
            end_time,
            headway_secs,
            exact_times,
            extras: row.extras(&Self::COLUMNS),
        })
    }

    fn add_to_schedule(self, schedule: &mut Schedule, reporter: &mut Reporter) {
        let Some(trip) = schedule.trips.get_mut(&self.trip_id) else {
            reporter.invalid_value("trip_id", &self.trip_id);
            return;
        };
        trip.frequencies.push(self);
    }

    fn value(&self, column: &str) -> Option<String> {
        let value = match column {
            "trip_id" => self.trip_id.clone(),
            "start_time" => self.start_time.to_hms_string(),
            "end_time" => self.end_time.to_hms_string(),
            "headway_secs" => self.headway_secs.to_string(),
            "exact_times" => self.exact_times.to_string(),
            _ => return None,
        };
        Some(value)
    }

    fn extras(&self) -> &[(String, String)] {
        &self.extras
    }
}

#[test]
fn runs_every_headway() {
    let frequency = Frequency::new(
        "T1",
        Time::from_hms("06:00:00").unwrap(),
        Time::from_hms("07:00:00").unwrap(),
        1200,
    );
    let starts: Vec<String> = frequency.start_times().map(|t| t.to_hms_string()).collect();
    assert_eq!(starts, ["06:00:00", "06:20:00", "06:40:00"]);
}

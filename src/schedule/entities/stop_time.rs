use crate::{
    gtfs::{Columns, Row},
    problems::{Reporter, Severity},
    schedule::{
        Schedule,
        entities::{Entity, Parsed, RowOutcome, float_cell, format_float, format_int, text},
    },
    shared::{
        Time,
        values::{is_empty, parse_int_in},
    },
};

const PICKUP_DROP_OFF_TYPES: [i64; 4] = [0, 1, 2, 3];
const TIMEPOINTS: [i64; 2] = [0, 1];

const BOTH_TIMES: &str = "arrival_time and departure_time should either both be provided or \
                          both be left blank.  It's OK to set them both to the same value.";

/// One visit of a trip to a stop.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StopTime {
    pub trip_id: String,
    pub stop_id: String,
    pub stop_sequence: i64,
    pub arrival_time: Option<Time>,
    pub departure_time: Option<Time>,
    pub stop_headsign: String,
    pub pickup_type: Option<i64>,
    pub drop_off_type: Option<i64>,
    pub shape_dist_traveled: Option<f64>,
    pub timepoint: Option<i64>,
    pub extras: Vec<(String, String)>,
    /// Time columns whose value did not parse.
    unparsed: Vec<&'static str>,
}

impl StopTime {
    pub fn new(trip_id: &str, stop_id: &str, stop_sequence: i64) -> Self {
        Self {
            trip_id: trip_id.into(),
            stop_id: stop_id.into(),
            stop_sequence,
            ..Default::default()
        }
    }

    /// Sets both times to `time`.
    pub fn at(mut self, time: Time) -> Self {
        self.arrival_time = Some(time);
        self.departure_time = Some(time);
        self
    }

    pub fn is_timed(&self) -> bool {
        self.arrival_time.is_some() || self.departure_time.is_some()
    }

    /// Arrival time, falling back to the departure time.
    pub fn time(&self) -> Option<Time> {
        self.arrival_time.or(self.departure_time)
    }

    /// Departure time, falling back to the arrival time.
    pub fn end_time(&self) -> Option<Time> {
        self.departure_time.or(self.arrival_time)
    }

    fn check(&self, reporter: &mut Reporter) {
        if self.pickup_type == Some(1) && self.drop_off_type == Some(1) && !self.is_timed() {
            reporter.other(
                "This stop time has a pickup_type and drop_off_type of 1, indicating that \
                 riders can't get on or off here.  Since it doesn't define a timepoint \
                 either, this entry serves no purpose and should be excluded from the trip.",
                Severity::Warning,
            );
        }
        if let (Some(arrival), Some(departure)) = (self.arrival_time, self.departure_time)
            && departure < arrival
        {
            reporter.invalid_value_because(
                "departure_time",
                departure,
                format!(
                    "The departure time at this stop ({departure}) is before the arrival time \
                     ({arrival}).  This is often caused by problems in the feed exporter's \
                     time conversion"
                ),
            );
        }
        if self.arrival_time.is_some()
            && self.departure_time.is_none()
            && !self.unparsed.contains(&"departure_time")
        {
            reporter.missing_value_because("departure_time", BOTH_TIMES);
        }
        if self.departure_time.is_some()
            && self.arrival_time.is_none()
            && !self.unparsed.contains(&"arrival_time")
        {
            reporter.missing_value_because("arrival_time", BOTH_TIMES);
        }
    }
}

fn time_cell(row: &Row, column: &str, reporter: &mut Reporter) -> Parsed<Time> {
    let value = row.get(column);
    if is_empty(value) {
        return Parsed::Empty;
    }
    match Time::from_hms(value) {
        Some(time) => Parsed::Value(time),
        None => {
            reporter.invalid_value(column, value);
            Parsed::Invalid
        }
    }
}

impl Entity for StopTime {
    const NAME: &'static str = "StopTime";
    const COLUMNS: Columns = Columns {
        required: &[
            "trip_id",
            "arrival_time",
            "departure_time",
            "stop_id",
            "stop_sequence",
        ],
        optional: &[
            "stop_headsign",
            "pickup_type",
            "drop_off_type",
            "shape_dist_traveled",
            "timepoint",
        ],
        deprecated: &[],
    };

    fn from_row(row: &Row, reporter: &mut Reporter) -> RowOutcome<Self> {
        let sequence = row.get("stop_sequence");
        let Ok(stop_sequence) = sequence.trim().parse::<i64>() else {
            reporter.invalid_value_because("stop_sequence", sequence, "This should be a number.");
            return RowOutcome::Skip;
        };
        if stop_sequence < 0 {
            reporter.invalid_value_because(
                "stop_sequence",
                stop_sequence,
                "Sequence numbers should be 0 or higher.",
            );
        }

        let arrival_time = time_cell(row, "arrival_time", reporter);
        let departure_time = time_cell(row, "departure_time", reporter);
        let mut unparsed = Vec::new();
        if arrival_time.is_invalid() {
            unparsed.push("arrival_time");
        }
        if departure_time.is_invalid() {
            unparsed.push("departure_time");
        }
        let timepoint = parse_int_in(
            row.get("timepoint"),
            &TIMEPOINTS,
            None,
            true,
            "timepoint",
            reporter,
        );
        let pickup_type = parse_int_in(
            row.get("pickup_type"),
            &PICKUP_DROP_OFF_TYPES,
            None,
            true,
            "pickup_type",
            reporter,
        );
        let drop_off_type = parse_int_in(
            row.get("drop_off_type"),
            &PICKUP_DROP_OFF_TYPES,
            None,
            true,
            "drop_off_type",
            reporter,
        );
        let shape_dist_traveled = float_cell(row, "shape_dist_traveled", reporter).value();

        RowOutcome::Accepted(Self {
            trip_id: text(row, "trip_id"),
            stop_id: text(row, "stop_id"),
            stop_sequence,
            arrival_time: arrival_time.value(),
            departure_time: departure_time.value(),
            stop_headsign: text(row, "stop_headsign"),
            pickup_type,
            drop_off_type,
            shape_dist_traveled,
            timepoint,
            extras: row.extras(&Self::COLUMNS),
            unparsed,
        })
    }

    fn validate_before_add(&self, reporter: &mut Reporter) -> bool {
        self.check(reporter);
        true
    }

    fn add_to_schedule(self, schedule: &mut Schedule, reporter: &mut Reporter) {
        if !schedule.stops.contains(&self.stop_id) {
            reporter.invalid_value_because(
                "stop_id",
                &self.stop_id,
                "This value wasn't defined in stops.txt",
            );
            return;
        }
        if !schedule.trips.contains(&self.trip_id) {
            reporter.invalid_value_because(
                "trip_id",
                &self.trip_id,
                "This value wasn't defined in trips.txt",
            );
            return;
        }
        schedule.stop_times.insert(self);
    }

    fn value(&self, column: &str) -> Option<String> {
        let value = match column {
            "trip_id" => self.trip_id.clone(),
            "arrival_time" => format_int(self.arrival_time),
            "departure_time" => format_int(self.departure_time),
            "stop_id" => self.stop_id.clone(),
            "stop_sequence" => self.stop_sequence.to_string(),
            "stop_headsign" => self.stop_headsign.clone(),
            "pickup_type" => format_int(self.pickup_type),
            "drop_off_type" => format_int(self.drop_off_type),
            "shape_dist_traveled" => format_float(self.shape_dist_traveled),
            "timepoint" => format_int(self.timepoint),
            _ => return None,
        };
        Some(value)
    }

    fn extras(&self) -> &[(String, String)] {
        &self.extras
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::problems::Collector;

    fn parse(values: &[&str]) -> (Option<StopTime>, Collector) {
        let row = Row::new(
            &[
                "trip_id",
                "arrival_time",
                "departure_time",
                "stop_id",
                "stop_sequence",
            ],
            values,
        );
        let mut collector = Collector::new();
        let mut reporter = Reporter::new(&mut collector);
        let stop_time = StopTime::from_row(&row, &mut reporter).accepted();
        if let Some(stop_time) = &stop_time {
            stop_time.validate_before_add(&mut reporter);
        }
        (stop_time, collector)
    }

    #[test]
    fn departure_before_arrival() {
        let (stop_time, collector) = parse(&["T1", "06:10:00", "06:05:00", "S1", "1"]);
        assert!(stop_time.is_some());
        assert_eq!(collector.problems().len(), 1);
        assert_eq!(collector.problems()[0].kind.column_name(), Some("departure_time"));
    }

    #[test]
    fn one_time_missing() {
        let (_, collector) = parse(&["T1", "06:10:00", "", "S1", "1"]);
        let problem = &collector.problems()[0];
        assert_eq!(problem.name(), "MissingValue");
        assert_eq!(problem.kind.column_name(), Some("departure_time"));
    }

    #[test]
    fn invalid_time_is_not_also_missing() {
        let (stop_time, collector) = parse(&["T1", "06:10:00", "6h10", "S1", "1"]);
        assert_eq!(stop_time.and_then(|s| s.departure_time), None);
        let names: Vec<&str> = collector.problems().iter().map(|p| p.name()).collect();
        assert_eq!(names, ["InvalidValue"]);
    }

    #[test]
    fn sequence_must_be_a_number() {
        let (stop_time, collector) = parse(&["T1", "06:10:00", "06:10:00", "S1", "first"]);
        assert!(stop_time.is_none());
        assert!(collector.problems()[0].message().contains("This should be a number."));
    }
}

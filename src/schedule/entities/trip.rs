use crate::{
    gtfs::{Columns, Row},
    problems::{ProblemKind, Reporter, Severity},
    schedule::{
        Schedule,
        entities::{Entity, Frequency, RowOutcome, Stop, StopTime, max_speed, text},
    },
    shared::values::{is_empty, validate_yes_no_unknown},
};

/// Farthest a stop may be from the point of its shape at the same
/// `shape_dist_traveled`, in meters.
pub const MAX_DISTANCE_FROM_STOP_TO_SHAPE: f64 = 1000.0;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Trip {
    pub route_id: String,
    pub service_id: String,
    pub trip_id: String,
    pub trip_headsign: String,
    pub trip_short_name: String,
    pub direction_id: String,
    pub block_id: String,
    pub shape_id: String,
    pub bikes_allowed: String,
    pub wheelchair_accessible: String,
    pub original_trip_id: String,
    pub extras: Vec<(String, String)>,
    /// Headway periods from frequencies.txt, in file order.
    pub frequencies: Vec<Frequency>,
}

impl Trip {
    pub fn new(trip_id: &str, route_id: &str, service_id: &str) -> Self {
        Self {
            trip_id: trip_id.into(),
            route_id: route_id.into(),
            service_id: service_id.into(),
            ..Default::default()
        }
    }

    /// Start time of every run of a frequency based trip.
    pub fn frequency_start_times(&self) -> Vec<u32> {
        self.frequencies
            .iter()
            .flat_map(|frequency| frequency.start_times().map(|time| time.as_seconds()))
            .collect()
    }

    /// Number of times the trip runs on a day it is active.
    pub fn runs(&self) -> usize {
        if self.frequencies.is_empty() {
            1
        } else {
            self.frequencies
                .iter()
                .map(|frequency| frequency.start_times().count())
                .sum()
        }
    }

    /// Checks the fields and the references into the rest of the schedule.
    pub fn check(&self, schedule: Option<&Schedule>, reporter: &mut Reporter) {
        if is_empty(&self.route_id) {
            reporter.missing_value("route_id");
        }
        if is_empty(&self.service_id) {
            reporter.missing_value("service_id");
        }
        if !is_empty(&self.direction_id) && self.direction_id != "0" && self.direction_id != "1" {
            reporter.invalid_value_because(
                "direction_id",
                &self.direction_id,
                "direction_id must be \"0\" or \"1\"",
            );
        }
        if is_empty(&self.trip_id) {
            reporter.missing_value("trip_id");
        }
        if let Some(schedule) = schedule {
            if !self.shape_id.is_empty() && !schedule.shapes.contains(&self.shape_id) {
                reporter.invalid_value("shape_id", &self.shape_id);
            }
            if !self.route_id.is_empty() && !schedule.routes.contains(&self.route_id) {
                reporter.invalid_value("route_id", &self.route_id);
            }
            if !self.service_id.is_empty()
                && !schedule.service_periods.contains(&self.service_id)
            {
                reporter.invalid_value("service_id", &self.service_id);
            }
        }
        validate_yes_no_unknown(&self.bikes_allowed, "bikes_allowed", reporter);
        validate_yes_no_unknown(&self.wheelchair_accessible, "wheelchair_accessible", reporter);
    }

    /// Checks the stop times and headway periods of the trip.
    pub fn validate_children(&self, schedule: &Schedule, reporter: &mut Reporter) {
        for sequence in schedule.stop_times.duplicate_sequences(&self.trip_id) {
            reporter.invalid_value_because(
                "stop_sequence",
                sequence,
                format!("Duplicate stop_sequence in trip_id {}", self.trip_id),
            );
        }
        let stop_times = schedule.stop_times.trip_stop_times(&self.trip_id);
        self.check_start_and_end_times(stop_times, reporter);
        self.check_increasing_time_and_distance(schedule, stop_times, reporter);
        self.check_shape_distances(schedule, stop_times, reporter);
        self.check_frequencies(reporter);
    }

    fn check_start_and_end_times(&self, stop_times: &[StopTime], reporter: &mut Reporter) {
        let (Some(first), Some(last)) = (stop_times.first(), stop_times.last()) else {
            return;
        };
        if !first.is_timed() {
            reporter.other(
                format!("No time for start of trip_id \"{}\"\"", self.trip_id),
                Severity::Error,
            );
        }
        if !last.is_timed() {
            reporter.other(
                format!("No time for end of trip_id \"{}\"\"", self.trip_id),
                Severity::Error,
            );
        }
    }

    fn check_increasing_time_and_distance(
        &self,
        schedule: &Schedule,
        stop_times: &[StopTime],
        reporter: &mut Reporter,
    ) {
        let route_type = schedule
            .routes
            .get(&self.route_id)
            .and_then(|route| route.route_type);
        let max_speed = max_speed(route_type);

        let mut prev_departure: i64 = 0;
        let mut prev_stop: Option<&Stop> = None;
        let mut prev_distance: Option<f64> = None;
        for stop_time in stop_times {
            if let Some(distance) = stop_time.shape_dist_traveled {
                if prev_distance.is_none_or(|prev| distance > prev) && distance >= 0.0 {
                    prev_distance = Some(distance);
                } else {
                    let severity = if prev_distance == Some(distance) {
                        Severity::Warning
                    } else {
                        Severity::Error
                    };
                    let previous = prev_distance.map_or("None".to_string(), |d| d.to_string());
                    reporter.invalid_value_as(
                        "stoptimes.shape_dist_traveled",
                        distance,
                        Some(format!(
                            "For the trip {} the stop {} has shape_dist_traveled={}, which \
                             should be larger than the previous ones. In this case, the \
                             previous distance was {}.",
                            self.trip_id, stop_time.stop_id, distance, previous
                        )),
                        severity,
                    );
                }
            }

            let Some(arrival) = stop_time.arrival_time else {
                continue;
            };
            let arrival = i64::from(arrival.as_seconds());
            let stop = schedule.stops.get(&stop_time.stop_id);
            if let (Some(prev_stop), Some(stop)) = (prev_stop, stop) {
                self.check_speed(prev_stop, stop, prev_departure, arrival, max_speed, reporter);
            }
            if arrival >= prev_departure {
                prev_departure = stop_time
                    .departure_time
                    .map_or(arrival, |time| i64::from(time.as_seconds()));
                prev_stop = stop;
            } else {
                reporter.other(
                    format!(
                        "Timetravel detected! Arrival time is before previous departure at \
                         sequence number {} in trip {}",
                        stop_time.stop_sequence, self.trip_id
                    ),
                    Severity::Error,
                );
            }
        }
    }

    fn check_speed(
        &self,
        prev_stop: &Stop,
        next_stop: &Stop,
        depart: i64,
        arrive: i64,
        max_speed: f64,
        reporter: &mut Reporter,
    ) {
        let (Some(from), Some(to)) = (prev_stop.coordinate(), next_stop.coordinate()) else {
            return;
        };
        let distance = to.approximate_distance(&from).as_meters();
        let elapsed = arrive - depart;
        let too_fast = |speed: Option<f64>, seconds: u32| ProblemKind::TooFastTravel {
            trip_id: self.trip_id.clone(),
            prev_stop: prev_stop.stop_name.clone(),
            next_stop: next_stop.stop_name.clone(),
            distance,
            seconds,
            speed,
        };
        if elapsed == 0 {
            // Exporters that round to whole minutes produce equal times for
            // nearby stops.
            if depart % 60 != 0 || distance / 1000.0 * 60.0 > max_speed {
                reporter.report_as(too_fast(None, 0), Severity::Warning);
            }
            return;
        }
        let Ok(seconds) = u32::try_from(elapsed) else {
            return;
        };
        let speed = (distance / 1000.0) / (f64::from(seconds) / 3600.0);
        if speed > max_speed {
            reporter.report_as(too_fast(Some(speed), seconds), Severity::Warning);
        }
    }

    fn check_shape_distances(
        &self,
        schedule: &Schedule,
        stop_times: &[StopTime],
        reporter: &mut Reporter,
    ) {
        if self.shape_id.is_empty() {
            return;
        }
        let (Some(shape), Some(last)) = (schedule.shapes.get(&self.shape_id), stop_times.last())
        else {
            return;
        };
        let max_distance = shape.max_distance;
        if let Some(distance) = last.shape_dist_traveled
            && distance != 0.0
            && distance > max_distance
        {
            reporter.other(
                format!(
                    "In stop_times.txt, the stop with trip_id={} and stop_sequence={} has \
                     shape_dist_traveled={:.6}, which is larger than the max \
                     shape_dist_traveled={:.6} of the corresponding shape (shape_id={})",
                    self.trip_id, last.stop_sequence, distance, max_distance, self.shape_id
                ),
                Severity::Warning,
            );
        }

        if max_distance <= 0.0 {
            return;
        }
        for stop_time in stop_times {
            let Some(traveled) = stop_time.shape_dist_traveled else {
                continue;
            };
            let Some((point, point_distance)) = shape.point_with_distance_traveled(traveled)
            else {
                continue;
            };
            let Some(stop) = schedule.stops.get(&stop_time.stop_id) else {
                continue;
            };
            let Some(coordinate) = stop.coordinate() else {
                continue;
            };
            let distance = coordinate.approximate_distance(&point).as_meters();
            if distance > MAX_DISTANCE_FROM_STOP_TO_SHAPE {
                reporter.report(ProblemKind::StopTooFarFromShapeWithDistTraveled {
                    trip_id: self.trip_id.clone(),
                    stop_name: stop.stop_name.clone(),
                    stop_id: stop.stop_id.clone(),
                    shape_dist_traveled: point_distance,
                    shape_id: self.shape_id.clone(),
                    distance,
                    max_distance: MAX_DISTANCE_FROM_STOP_TO_SHAPE,
                });
            }
        }
    }

    fn check_frequencies(&self, reporter: &mut Reporter) {
        for (index, frequency) in self.frequencies.iter().enumerate() {
            for other in &self.frequencies[index + 1..] {
                if frequency.overlaps(other) {
                    reporter.other(
                        format!(
                            "Trip contains overlapping headway periods {frequency} and {other}"
                        ),
                        Severity::Error,
                    );
                }
            }
        }
    }
}

impl Entity for Trip {
    const NAME: &'static str = "Trip";
    const COLUMNS: Columns = Columns {
        required: &["route_id", "service_id", "trip_id"],
        optional: &[
            "trip_headsign",
            "trip_short_name",
            "direction_id",
            "block_id",
            "shape_id",
            "bikes_allowed",
            "wheelchair_accessible",
            "original_trip_id",
        ],
        deprecated: &[],
    };

    fn from_row(row: &Row, _reporter: &mut Reporter) -> RowOutcome<Self> {
        RowOutcome::Accepted(Self {
            route_id: text(row, "route_id"),
            service_id: text(row, "service_id"),
            trip_id: text(row, "trip_id"),
            trip_headsign: text(row, "trip_headsign"),
            trip_short_name: text(row, "trip_short_name"),
            direction_id: text(row, "direction_id"),
            block_id: text(row, "block_id"),
            shape_id: text(row, "shape_id"),
            bikes_allowed: text(row, "bikes_allowed"),
            wheelchair_accessible: text(row, "wheelchair_accessible"),
            original_trip_id: text(row, "original_trip_id"),
            extras: row.extras(&Self::COLUMNS),
            frequencies: Vec::new(),
        })
    }

    /// Stop times and frequencies are loaded after trips, so the children are
    /// checked by the schedule validation instead.
    fn validate_after_add(&self, schedule: &Schedule, reporter: &mut Reporter) {
        self.check(Some(schedule), reporter);
    }

    fn validate(&self, schedule: Option<&Schedule>, reporter: &mut Reporter) -> bool {
        self.check(schedule, reporter);
        if let Some(schedule) = schedule {
            self.validate_children(schedule, reporter);
        }
        true
    }

    fn add_to_schedule(self, schedule: &mut Schedule, reporter: &mut Reporter) {
        if schedule.trips.contains(&self.trip_id) {
            reporter.duplicate_id("trip_id", &self.trip_id);
            return;
        }
        self.validate_after_add(schedule, reporter);
        if let Some(route) = schedule.routes.get_mut(&self.route_id) {
            route.trip_ids.push(self.trip_id.clone());
        }
        let id = self.trip_id.clone();
        schedule.trips.insert(&id, self);
    }

    fn value(&self, column: &str) -> Option<String> {
        let value = match column {
            "route_id" => &self.route_id,
            "service_id" => &self.service_id,
            "trip_id" => &self.trip_id,
            "trip_headsign" => &self.trip_headsign,
            "trip_short_name" => &self.trip_short_name,
            "direction_id" => &self.direction_id,
            "block_id" => &self.block_id,
            "shape_id" => &self.shape_id,
            "bikes_allowed" => &self.bikes_allowed,
            "wheelchair_accessible" => &self.wheelchair_accessible,
            "original_trip_id" => &self.original_trip_id,
            _ => return None,
        };
        Some(value.clone())
    }

    fn extras(&self) -> &[(String, String)] {
        &self.extras
    }
}

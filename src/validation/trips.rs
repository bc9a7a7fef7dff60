use std::collections::{BTreeMap, HashMap, hash_map::Entry};

use crate::{
    gtfs::ValidateOptions,
    problems::{ProblemKind, Reporter, Severity},
    schedule::{
        Schedule,
        entities::{ROUTE_TYPE_BUS, ROUTE_TYPE_SUBWAY, StopTime, Trip},
    },
    shared::Time,
    validation::blocks::{TripInterval, check_blocks},
};

/// More consecutive stop times than this at the same time are suspicious.
const MAX_CONSECUTIVE_SAME_TIME: usize = 5;

/// First route and route type seen at a stop, and whether the stop has been
/// reported.
type RouteTypeAtStop<'a> = (&'a str, i64, bool);

type TripKey<'a> = (&'a str, Option<u32>, Vec<&'a str>);

/// Walks the trips in id order: same-time runs, stops served by both subway
/// and bus, likely duplicates and finally the blocks.
pub(super) fn trips(schedule: &Schedule, reporter: &mut Reporter, options: &ValidateOptions) {
    let mut route_types: HashMap<&str, RouteTypeAtStop> = HashMap::new();
    let mut first_trips: HashMap<TripKey, &Trip> = HashMap::new();
    let mut blocks: BTreeMap<&str, Vec<TripInterval>> = BTreeMap::new();

    let mut trips: Vec<&Trip> = schedule.trips.values().collect();
    trips.sort_by(|a, b| a.trip_id.cmp(&b.trip_id));

    for trip in trips {
        let Some(route) = schedule.routes.get(&trip.route_id) else {
            continue;
        };
        let stop_times = schedule.trip_stop_times(&trip.trip_id);
        check_same_time_runs(trip, stop_times, reporter);

        if let Some(route_type @ (ROUTE_TYPE_SUBWAY | ROUTE_TYPE_BUS)) = route.route_type {
            for stop_time in stop_times {
                let entry = match route_types.entry(stop_time.stop_id.as_str()) {
                    Entry::Vacant(entry) => {
                        entry.insert((trip.route_id.as_str(), route_type, false));
                        continue;
                    }
                    Entry::Occupied(entry) => entry.into_mut(),
                };
                let (first_route, first_type, reported) = entry;
                if *first_type == route_type || *reported {
                    continue;
                }
                *reported = true;
                let (subway, bus) = if *first_type == ROUTE_TYPE_SUBWAY {
                    (*first_route, trip.route_id.as_str())
                } else {
                    (trip.route_id.as_str(), *first_route)
                };
                let stop_name = schedule
                    .stops
                    .get(&stop_time.stop_id)
                    .map(|stop| stop.stop_name.clone())
                    .unwrap_or_default();
                reporter.report(ProblemKind::StopWithMultipleRouteTypes {
                    stop_name,
                    stop_id: stop_time.stop_id.clone(),
                    route_id1: subway.to_string(),
                    route_id2: bus.to_string(),
                });
            }
        }

        if !trip.block_id.is_empty()
            && let (Some(first), Some(last)) = (stop_times.first(), stop_times.last())
            && let (Some(arrival), Some(departure)) = (first.arrival_time, last.departure_time)
        {
            blocks
                .entry(trip.block_id.as_str())
                .or_default()
                .push(TripInterval {
                    trip,
                    first_arrival: arrival.as_seconds(),
                    last_departure: departure.as_seconds(),
                });
        }

        if options.check_duplicate_trips
            && let Some(first) = stop_times.first()
        {
            let stop_ids = stop_times.iter().map(|st| st.stop_id.as_str()).collect();
            let key = (
                trip.service_id.as_str(),
                first.arrival_time.map(|time| time.as_seconds()),
                stop_ids,
            );
            match first_trips.entry(key) {
                Entry::Vacant(entry) => {
                    entry.insert(trip);
                }
                Entry::Occupied(entry) => {
                    let original = entry.get();
                    reporter.report(ProblemKind::DuplicateTrip {
                        trip_id1: original.trip_id.clone(),
                        route_id1: original.route_id.clone(),
                        trip_id2: trip.trip_id.clone(),
                        route_id2: trip.route_id.clone(),
                    });
                }
            }
        }
    }

    check_blocks(schedule, blocks, reporter);
}

/// Warns about more than [`MAX_CONSECUTIVE_SAME_TIME`] consecutive stop times
/// sharing one time. Untimed stop times in between extend the run.
fn check_same_time_runs(trip: &Trip, stop_times: &[StopTime], reporter: &mut Reporter) {
    let mut prev_departure: Option<u32> = None;
    let mut potential = 0;
    let mut confirmed = 0;

    for stop_time in stop_times {
        let (Some(arrival), Some(departure)) = (stop_time.arrival_time, stop_time.departure_time)
        else {
            potential += 1;
            continue;
        };
        let (arrival, departure) = (arrival.as_seconds(), departure.as_seconds());
        if prev_departure == Some(arrival) && arrival == departure {
            potential += 1;
            confirmed = potential;
        } else {
            report_same_time_run(trip, prev_departure, confirmed, reporter);
            potential = 1;
            confirmed = 1;
        }
        prev_departure = Some(departure);
    }
    report_same_time_run(trip, prev_departure, confirmed, reporter);
}

fn report_same_time_run(trip: &Trip, time: Option<u32>, count: usize, reporter: &mut Reporter) {
    if let Some(time) = time
        && count > MAX_CONSECUTIVE_SAME_TIME
    {
        reporter.report(ProblemKind::TooManyConsecutiveStopTimesWithSameTime {
            trip_id: trip.trip_id.clone(),
            number_of_stop_times: count,
            stop_time: Time::from_seconds(time).to_hms_string(),
        });
    }
}

/// Runs the stop time checks of every trip and flags trips with fewer than
/// two stop times.
pub(super) fn trip_stop_times(schedule: &Schedule, reporter: &mut Reporter, _: &ValidateOptions) {
    for trip in schedule.trips.values() {
        trip.validate_children(schedule, reporter);
        match schedule.stop_times.count_for_trip(&trip.trip_id) {
            0 => {
                reporter.other(
                    format!(
                        "The trip with the trip_id \"{}\" doesn't have any stop times defined.",
                        trip.trip_id
                    ),
                    Severity::Warning,
                );
                if !trip.frequencies.is_empty() {
                    reporter.other(
                        format!(
                            "Frequencies defined, but no stop times given in trip {}",
                            trip.trip_id
                        ),
                        Severity::Error,
                    );
                }
            }
            1 => reporter.other(
                format!(
                    "The trip with the trip_id \"{}\" only has one stop on it; it should have \
                     at least one more stop so that the riders can leave!",
                    trip.trip_id
                ),
                Severity::Warning,
            ),
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        problems::Collector,
        schedule::entities::{Route, Stop},
    };

    fn timed(trip_id: &str, stop_id: &str, sequence: i64, time: &str) -> StopTime {
        StopTime::new(trip_id, stop_id, sequence).at(Time::from_hms(time).unwrap())
    }

    #[test]
    fn six_stop_times_at_once() {
        let trip = Trip::new("T1", "R1", "WEEK");
        let mut stop_times: Vec<StopTime> = (1..=6)
            .map(|sequence| timed("T1", &format!("S{sequence}"), sequence, "08:00:00"))
            .collect();

        let mut collector = Collector::new();
        let mut reporter = Reporter::new(&mut collector);
        check_same_time_runs(&trip, &stop_times, &mut reporter);
        stop_times.pop();
        check_same_time_runs(&trip, &stop_times, &mut reporter);
        drop(reporter);

        assert_eq!(
            collector
                .into_problems()
                .into_iter()
                .map(|problem| problem.kind)
                .collect::<Vec<_>>(),
            [ProblemKind::TooManyConsecutiveStopTimesWithSameTime {
                trip_id: "T1".into(),
                number_of_stop_times: 6,
                stop_time: "08:00:00".into(),
            }]
        );
    }

    #[test]
    fn stop_served_by_subway_and_bus() {
        let mut schedule = Schedule::new();
        schedule.stops.insert("S1", Stop::new("S1", "Central", 48.2, 16.3));
        schedule.routes.insert("U1", Route::new("U1", "U1", "Subway", ROUTE_TYPE_SUBWAY));
        schedule.routes.insert("B1", Route::new("B1", "13A", "Bus", ROUTE_TYPE_BUS));
        for (trip_id, route_id) in [("T1", "B1"), ("T2", "U1"), ("T3", "B1")] {
            schedule.trips.insert(trip_id, Trip::new(trip_id, route_id, "WEEK"));
            schedule.stop_times.insert(timed(trip_id, "S1", 1, "08:00:00"));
        }

        let mut collector = Collector::new();
        let mut reporter = Reporter::new(&mut collector);
        trips(&schedule, &mut reporter, &ValidateOptions::default());
        drop(reporter);

        let kinds: Vec<ProblemKind> = collector
            .of_kind("StopWithMultipleRouteTypes")
            .map(|problem| problem.kind.clone())
            .collect();
        assert_eq!(
            kinds,
            [ProblemKind::StopWithMultipleRouteTypes {
                stop_name: "Central".into(),
                stop_id: "S1".into(),
                route_id1: "U1".into(),
                route_id2: "B1".into(),
            }]
        );
    }

    #[test]
    fn duplicate_trips_only_when_asked() {
        let mut schedule = Schedule::new();
        schedule.routes.insert("R1", Route::new("R1", "1", "Ring", 3));
        for trip_id in ["T1", "T2"] {
            schedule.trips.insert(trip_id, Trip::new(trip_id, "R1", "WEEK"));
            schedule.stop_times.insert(timed(trip_id, "S1", 1, "08:00:00"));
            schedule.stop_times.insert(timed(trip_id, "S2", 2, "08:05:00"));
        }

        let mut collector = Collector::new();
        let mut reporter = Reporter::new(&mut collector);
        trips(&schedule, &mut reporter, &ValidateOptions::default());
        let options = ValidateOptions {
            check_duplicate_trips: true,
            ..Default::default()
        };
        trips(&schedule, &mut reporter, &options);
        drop(reporter);

        let duplicates: Vec<_> = collector.of_kind("DuplicateTrip").collect();
        assert_eq!(duplicates.len(), 1);
        assert!(duplicates[0].message().starts_with("Trip T1 of route R1"));
    }
}

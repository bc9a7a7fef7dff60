use rayon::prelude::*;

use crate::{
    gtfs::ValidateOptions,
    problems::{ProblemKind, Reporter, Severity},
    schedule::{
        Schedule,
        entities::{Entity, LOCATION_STATION, LOCATION_STOP, Stop},
    },
    shared::Coordinate,
};

/// Stops closer than this many meters probably are the same place.
pub const MIN_STOP_DISTANCE: f64 = 2.0;
/// Latitude difference of about [`MIN_STOP_DISTANCE`] meters.
const TWO_METERS_LAT: f64 = 0.000018;

const PARENT_DISTANCE_WARNING: f64 = 100.0;
const PARENT_DISTANCE_ERROR: f64 = 1000.0;

/// Two stops less than [`MIN_STOP_DISTANCE`] apart, `a` sorting before `b`.
#[derive(Debug, Clone, Copy)]
pub struct ClosePair<'a> {
    pub a: &'a Stop,
    pub b: &'a Stop,
    pub distance: f64,
}

/// Finds every pair of located stops closer than [`MIN_STOP_DISTANCE`].
///
/// Stops are sorted by latitude, longitude and id, and each one is only
/// compared with the following stops whose latitude is within about two
/// meters of its own.
pub fn close_stop_pairs<'a>(stops: impl IntoIterator<Item = &'a Stop>) -> Vec<ClosePair<'a>> {
    let mut located: Vec<(Coordinate, &Stop)> = stops
        .into_iter()
        .filter_map(|stop| {
            let coordinate = stop.coordinate()?;
            (coordinate.latitude != 0.0 && coordinate.longitude != 0.0)
                .then_some((coordinate, stop))
        })
        .collect();
    located.par_sort_by(|(a, stop_a), (b, stop_b)| {
        a.latitude
            .total_cmp(&b.latitude)
            .then(a.longitude.total_cmp(&b.longitude))
            .then_with(|| stop_a.stop_id.cmp(&stop_b.stop_id))
    });

    let mut pairs = Vec::new();
    for (index, &(coordinate, stop)) in located.iter().enumerate() {
        for &(other_coordinate, other) in &located[index + 1..] {
            if other_coordinate.latitude - coordinate.latitude >= TWO_METERS_LAT {
                break;
            }
            let distance = coordinate.approximate_distance(&other_coordinate).as_meters();
            if distance < MIN_STOP_DISTANCE {
                pairs.push(ClosePair {
                    a: stop,
                    b: other,
                    distance,
                });
            }
        }
    }
    pairs
}

/// Unused stops, used stations and broken or distant parent stations.
pub(super) fn stops(schedule: &Schedule, reporter: &mut Reporter, options: &ValidateOptions) {
    for stop in schedule.stops.values() {
        if options.validate_children {
            stop.validate(Some(schedule), reporter);
        }
        let visits = schedule.stop_times.visit_count(&stop.stop_id);
        if stop.location_type == LOCATION_STOP && visits == 0 {
            reporter.report(ProblemKind::UnusedStop {
                stop_id: stop.stop_id.clone(),
                stop_name: stop.stop_name.clone(),
            });
        } else if stop.location_type == LOCATION_STATION && visits != 0 {
            reporter.report(ProblemKind::UsedStation {
                stop_id: stop.stop_id.clone(),
                stop_name: stop.stop_name.clone(),
            });
        }

        if stop.location_type != LOCATION_STATION && !stop.parent_station.is_empty() {
            check_parent_station(schedule, stop, reporter);
        }
    }
}

fn check_parent_station(schedule: &Schedule, stop: &Stop, reporter: &mut Reporter) {
    let Some(parent) = schedule.stops.get(&stop.parent_station) else {
        reporter.invalid_value_because(
            "parent_station",
            &stop.parent_station,
            format!(
                "parent_station '{}' not found for stop_id '{}' in stops.txt",
                stop.parent_station, stop.stop_id
            ),
        );
        return;
    };
    if parent.location_type != LOCATION_STATION {
        reporter.invalid_value_because(
            "parent_station",
            &stop.parent_station,
            format!(
                "parent_station '{}' of stop_id '{}' must have location_type=1 in stops.txt",
                stop.parent_station, stop.stop_id
            ),
        );
        return;
    }

    let (Some(from), Some(to)) = (stop.coordinate(), parent.coordinate()) else {
        return;
    };
    let distance = from.approximate_distance(&to).as_meters();
    let severity = if distance > PARENT_DISTANCE_ERROR {
        Severity::Error
    } else if distance > PARENT_DISTANCE_WARNING {
        Severity::Warning
    } else {
        return;
    };
    reporter.report_as(
        ProblemKind::StopTooFarFromParentStation {
            stop_id: stop.stop_id.clone(),
            stop_name: stop.stop_name.clone(),
            parent_stop_id: parent.stop_id.clone(),
            parent_stop_name: parent.stop_name.clone(),
            distance,
        },
        severity,
    );
}

/// Stop pairs, station pairs and stops next to a station they do not
/// belong to.
pub(super) fn nearby_stops(schedule: &Schedule, reporter: &mut Reporter, _: &ValidateOptions) {
    for ClosePair { a, b, distance } in close_stop_pairs(schedule.stops.values()) {
        match (a.location_type, b.location_type) {
            (LOCATION_STOP, LOCATION_STOP) => reporter.report(ProblemKind::StopsTooClose {
                stop_name_a: a.stop_name.clone(),
                stop_id_a: a.stop_id.clone(),
                stop_name_b: b.stop_name.clone(),
                stop_id_b: b.stop_id.clone(),
                distance,
            }),
            (LOCATION_STATION, LOCATION_STATION) => {
                reporter.report(ProblemKind::StationsTooClose {
                    stop_name_a: a.stop_name.clone(),
                    stop_id_a: a.stop_id.clone(),
                    stop_name_b: b.stop_name.clone(),
                    stop_id_b: b.stop_id.clone(),
                    distance,
                })
            }
            (LOCATION_STOP, LOCATION_STATION) | (LOCATION_STATION, LOCATION_STOP) => {
                let (stop, station) = if a.location_type == LOCATION_STOP {
                    (a, b)
                } else {
                    (b, a)
                };
                if stop.parent_station != station.stop_id {
                    reporter.report(ProblemKind::DifferentStationTooClose {
                        stop_name: stop.stop_name.clone(),
                        stop_id: stop.stop_id.clone(),
                        station_stop_name: station.stop_name.clone(),
                        station_stop_id: station.stop_id.clone(),
                        distance,
                    });
                }
            }
            _ => {}
        }
    }
}

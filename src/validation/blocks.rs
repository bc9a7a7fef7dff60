use std::collections::{BTreeMap, HashMap};

use crate::{
    problems::{ProblemKind, Reporter},
    schedule::{Schedule, entities::Trip},
};

/// The time a block's vehicle is busy with one trip.
#[derive(Debug, Clone, Copy)]
pub(super) struct TripInterval<'a> {
    pub trip: &'a Trip,
    pub first_arrival: u32,
    pub last_departure: u32,
}

/// Reports trips of the same block whose intervals overlap on a shared
/// service date.
///
/// Whether two different service periods share a date is computed once per
/// pair of service ids. When a trip names an unknown service the pass stops,
/// that reference has been reported already.
pub(super) fn check_blocks<'a>(
    schedule: &'a Schedule,
    blocks: BTreeMap<&'a str, Vec<TripInterval<'a>>>,
    reporter: &mut Reporter,
) {
    let mut shares_date: HashMap<(&'a str, &'a str), bool> = HashMap::new();

    for (block_id, mut intervals) in blocks {
        intervals.sort_by_key(|interval| interval.first_arrival);
        for (index, a) in intervals.iter().enumerate() {
            for b in &intervals[index + 1..] {
                if a.last_departure <= b.first_arrival {
                    break;
                }
                let (trip_a, trip_b) = (a.trip, b.trip);
                let overlapping = if trip_a.service_id == trip_b.service_id {
                    true
                } else {
                    let key = if trip_a.service_id <= trip_b.service_id {
                        (trip_a.service_id.as_str(), trip_b.service_id.as_str())
                    } else {
                        (trip_b.service_id.as_str(), trip_a.service_id.as_str())
                    };
                    match shares_date.get(&key) {
                        Some(shared) => *shared,
                        None => {
                            let (Some(period_a), Some(period_b)) = (
                                schedule.service_periods.get(key.0),
                                schedule.service_periods.get(key.1),
                            ) else {
                                return;
                            };
                            let shared = period_a.shares_date_with(period_b);
                            shares_date.insert(key, shared);
                            shared
                        }
                    }
                };
                if overlapping {
                    reporter.report(ProblemKind::OverlappingTripsInSameBlock {
                        trip_id1: trip_a.trip_id.clone(),
                        trip_id2: trip_b.trip_id.clone(),
                        block_id: block_id.to_string(),
                    });
                }
            }
        }
    }
}

use std::{
    collections::{BTreeMap, HashMap},
    sync::Arc,
};

use crate::schedule::entities::StopTime;

/// Stop times keyed by trip and ordered by `stop_sequence`, with a secondary
/// index counting the visits of every trip to every stop.
///
/// Rows sharing a sequence number within one trip are all kept, so the trip
/// validation can report them.
#[derive(Debug, Clone, Default)]
pub struct StopTimeTable {
    by_trip: HashMap<Arc<str>, Vec<StopTime>>,
    by_stop: HashMap<Arc<str>, BTreeMap<Arc<str>, usize>>,
    len: usize,
}

impl StopTimeTable {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Inserts after every stop time of the trip with a lower or equal
    /// sequence number.
    pub fn insert(&mut self, stop_time: StopTime) {
        self.index_stop(&stop_time);
        let stop_times = self
            .by_trip
            .entry(stop_time.trip_id.as_str().into())
            .or_default();
        let at = stop_times
            .partition_point(|other| other.stop_sequence <= stop_time.stop_sequence);
        stop_times.insert(at, stop_time);
        self.len += 1;
    }

    /// Swaps the stop time with the same trip and sequence, inserting when
    /// there is none. Returns the replaced row.
    pub fn replace(&mut self, stop_time: StopTime) -> Option<StopTime> {
        let removed = self.remove(&stop_time.trip_id, stop_time.stop_sequence);
        self.insert(stop_time);
        removed
    }

    pub fn remove(&mut self, trip_id: &str, stop_sequence: i64) -> Option<StopTime> {
        let stop_times = self.by_trip.get_mut(trip_id)?;
        let at = stop_times
            .iter()
            .position(|stop_time| stop_time.stop_sequence == stop_sequence)?;
        let removed = stop_times.remove(at);
        if stop_times.is_empty() {
            self.by_trip.remove(trip_id);
        }
        self.unindex_stop(&removed);
        self.len -= 1;
        Some(removed)
    }

    /// Drops every stop time of the trip.
    pub fn remove_trip(&mut self, trip_id: &str) -> Vec<StopTime> {
        let removed = self.by_trip.remove(trip_id).unwrap_or_default();
        for stop_time in &removed {
            self.unindex_stop(stop_time);
        }
        self.len -= removed.len();
        removed
    }

    pub fn trip_stop_times(&self, trip_id: &str) -> &[StopTime] {
        self.by_trip
            .get(trip_id)
            .map_or(&[][..], |stop_times| stop_times.as_slice())
    }

    pub fn count_for_trip(&self, trip_id: &str) -> usize {
        self.trip_stop_times(trip_id).len()
    }

    /// Ids of the trips visiting the stop, sorted.
    pub fn trips_at_stop(&self, stop_id: &str) -> Vec<&str> {
        self.by_stop
            .get(stop_id)
            .map(|trips| trips.keys().map(|trip_id| trip_id.as_ref()).collect())
            .unwrap_or_default()
    }

    pub fn visit_count(&self, stop_id: &str) -> usize {
        self.by_stop
            .get(stop_id)
            .map_or(0, |trips| trips.values().sum())
    }

    /// Sequence numbers appearing more than once in the trip.
    pub fn duplicate_sequences(&self, trip_id: &str) -> Vec<i64> {
        self.trip_stop_times(trip_id)
            .windows(2)
            .filter(|pair| pair[0].stop_sequence == pair[1].stop_sequence)
            .map(|pair| pair[1].stop_sequence)
            .collect()
    }

    fn index_stop(&mut self, stop_time: &StopTime) {
        *self
            .by_stop
            .entry(stop_time.stop_id.as_str().into())
            .or_default()
            .entry(stop_time.trip_id.as_str().into())
            .or_default() += 1;
    }

    fn unindex_stop(&mut self, stop_time: &StopTime) {
        let Some(trips) = self.by_stop.get_mut(stop_time.stop_id.as_str()) else {
            return;
        };
        if let Some(count) = trips.get_mut(stop_time.trip_id.as_str()) {
            *count -= 1;
            if *count == 0 {
                trips.remove(stop_time.trip_id.as_str());
            }
        }
        if trips.is_empty() {
            self.by_stop.remove(stop_time.stop_id.as_str());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> StopTimeTable {
        let mut table = StopTimeTable::new();
        table.insert(StopTime::new("T1", "B", 2));
        table.insert(StopTime::new("T1", "A", 1));
        table.insert(StopTime::new("T2", "A", 5));
        table.insert(StopTime::new("T1", "C", 3));
        table
    }

    #[test]
    fn ordered_by_sequence() {
        let table = table();
        let stops: Vec<&str> = table
            .trip_stop_times("T1")
            .iter()
            .map(|stop_time| stop_time.stop_id.as_str())
            .collect();
        assert_eq!(stops, ["A", "B", "C"]);
        assert_eq!(table.len(), 4);
    }

    #[test]
    fn stop_index_follows_removals() {
        let mut table = table();
        assert_eq!(table.trips_at_stop("A"), ["T1", "T2"]);
        assert_eq!(table.visit_count("A"), 2);
        table.remove("T2", 5);
        assert_eq!(table.trips_at_stop("A"), ["T1"]);
        table.remove_trip("T1");
        assert_eq!(table.visit_count("A"), 0);
        assert!(table.is_empty());
    }

    #[test]
    fn replace_and_duplicates() {
        let mut table = table();
        table.insert(StopTime::new("T1", "D", 2));
        assert_eq!(table.duplicate_sequences("T1"), [2]);
        let replaced = table.replace(StopTime::new("T1", "E", 3));
        assert_eq!(replaced.map(|stop_time| stop_time.stop_id), Some("C".to_string()));
        assert_eq!(table.visit_count("C"), 0);
        assert_eq!(table.visit_count("E"), 1);
    }
}

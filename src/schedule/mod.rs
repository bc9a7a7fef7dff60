//! The in-memory feed: every entity owned by id, plus the indexed stop time
//! table.

use std::{
    collections::{BTreeSet, HashMap, HashSet},
    path::Path,
    sync::Arc,
};

pub mod calendar;
pub mod entities;
mod stop_times;
mod table;

pub use calendar::*;
pub use stop_times::*;
pub use table::*;

use crate::{
    gtfs::{self, ValidateOptions},
    problems::{Halted, Reporter},
    schedule::entities::{
        Agency, Entity, FareAttribute, FeedInfo, Route, ServicePeriod, Shape, Stop, Transfer,
        Trip,
    },
    shared::{LanguageParser, PrimarySubtagParser},
    validation,
};

pub struct Schedule {
    pub agencies: EntityTable<Agency>,
    pub stops: EntityTable<Stop>,
    pub routes: EntityTable<Route>,
    pub trips: EntityTable<Trip>,
    pub service_periods: EntityTable<ServicePeriod>,
    pub shapes: EntityTable<Shape>,
    pub fares: EntityTable<FareAttribute>,
    pub transfers: Vec<Transfer>,
    pub transfer_keys: HashSet<(String, String)>,
    pub feed_info: Option<FeedInfo>,
    /// Every `zone_id` used by a stop.
    pub fare_zones: BTreeSet<String>,
    pub stop_times: StopTimeTable,
    table_columns: HashMap<String, Vec<String>>,
    language_parser: Arc<dyn LanguageParser>,
}

impl Default for Schedule {
    fn default() -> Self {
        Self {
            agencies: EntityTable::new(),
            stops: EntityTable::new(),
            routes: EntityTable::new(),
            trips: EntityTable::new(),
            service_periods: EntityTable::new(),
            shapes: EntityTable::new(),
            fares: EntityTable::new(),
            transfers: Vec::new(),
            transfer_keys: HashSet::new(),
            feed_info: None,
            fare_zones: BTreeSet::new(),
            stop_times: StopTimeTable::new(),
            table_columns: HashMap::new(),
            language_parser: Arc::new(PrimarySubtagParser),
        }
    }
}

impl Schedule {
    pub fn new() -> Self {
        Default::default()
    }

    /// Replaces the parser `agency_lang` and `feed_lang` are checked with.
    pub fn with_language_parser(mut self, parser: Arc<dyn LanguageParser>) -> Self {
        self.language_parser = parser;
        self
    }

    pub fn language_parser(&self) -> &dyn LanguageParser {
        self.language_parser.as_ref()
    }

    /// Validates `entity` and inserts it unless the checks veto it. Returns
    /// whether the entity got past [`Entity::validate_before_add`].
    pub fn add<E: Entity>(&mut self, entity: E, reporter: &mut Reporter) -> bool {
        if !entity.validate_before_add(reporter) {
            return false;
        }
        entity.add_to_schedule(self, reporter);
        true
    }

    /// Remembers the header a file was read with so it is written back the
    /// same way.
    pub fn record_columns(&mut self, file_name: &str, columns: &[String]) {
        let recorded = self.table_columns.entry(file_name.to_string()).or_default();
        for column in columns {
            if !recorded.contains(column) {
                recorded.push(column.clone());
            }
        }
    }

    pub fn table_columns(&self, file_name: &str) -> Option<&[String]> {
        self.table_columns.get(file_name).map(Vec::as_slice)
    }

    /// The agency routes without an `agency_id` belong to, when there is
    /// exactly one.
    pub fn default_agency(&self) -> Option<&Agency> {
        match self.agencies.len() {
            1 => self.agencies.values().next(),
            _ => None,
        }
    }

    /// Stop times of `trip_id`, ordered by `stop_sequence`.
    pub fn trip_stop_times(&self, trip_id: &str) -> &[entities::StopTime] {
        self.stop_times.trip_stop_times(trip_id)
    }

    /// Removes a trip together with its stop times and its entry in the
    /// route's trip list.
    pub fn remove_trip(&mut self, trip_id: &str) -> Option<Trip> {
        let trip = self.trips.remove(trip_id)?;
        self.stop_times.remove_trip(trip_id);
        if let Some(route) = self.routes.get_mut(&trip.route_id) {
            route.trip_ids.retain(|id| id != trip_id);
        }
        Some(trip)
    }

    /// Runs the cross-entity checks over the loaded schedule.
    pub fn validate(
        &self,
        reporter: &mut Reporter,
        options: &ValidateOptions,
    ) -> Result<(), Halted> {
        validation::validate(self, reporter, options)
    }

    /// Writes the feed as a zip archive when `path` ends in `.zip`, as a
    /// directory of files otherwise.
    pub fn write(&self, path: &Path) -> Result<(), gtfs::Error> {
        gtfs::write(self, path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{problems::Collector, schedule::entities::StopTime, shared::Time};

    #[test]
    fn builder_links_trips_to_routes() {
        let mut collector = Collector::new();
        let mut reporter = Reporter::new(&mut collector);
        let mut schedule = Schedule::new();
        schedule.add(
            Agency::new("Metro", "https://metro.example", "Europe/Vienna", "M"),
            &mut reporter,
        );
        schedule.add(Stop::new("S1", "Main", 48.2, 16.3), &mut reporter);
        schedule.add(Route::new("R1", "1", "Ring", 0), &mut reporter);
        let mut period = ServicePeriod::new("WEEK");
        period.set_weekday_service(true);
        schedule.add(period, &mut reporter);
        schedule.add(Trip::new("T1", "R1", "WEEK"), &mut reporter);
        let time = Time::from_hms("06:00:00").unwrap();
        schedule.add(StopTime::new("T1", "S1", 1).at(time), &mut reporter);

        assert_eq!(schedule.routes.get("R1").unwrap().trip_ids, ["T1"]);
        assert_eq!(schedule.trip_stop_times("T1").len(), 1);

        schedule.remove_trip("T1");
        assert!(schedule.routes.get("R1").unwrap().trip_ids.is_empty());
        assert_eq!(schedule.stop_times.visit_count("S1"), 0);
        drop(reporter);
        assert!(collector.is_empty(), "{:?}", collector.problems());
    }
}

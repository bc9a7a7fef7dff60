mod common;

use std::sync::{Arc, Mutex};

use common::{Feed, date, load, validating};
use feedguard::{
    gtfs::{self, Columns, EntityClass, FileMapping, LoadOptions, Loader, Registry, Row},
    problems::{Collector, ProblemKind, Reporter, Severity, StrictAccumulator},
    schedule::Schedule,
};

#[test]
fn loads_clean_directory_feed() {
    let dir = Feed::minimal().write_dir();
    let (schedule, collector) = load(dir.path(), validating());
    let schedule = schedule.unwrap();

    assert_eq!(schedule.agencies.len(), 1);
    assert_eq!(schedule.stops.len(), 2);
    assert_eq!(schedule.routes.len(), 1);
    assert_eq!(schedule.trips.len(), 1);
    assert_eq!(schedule.stop_times.len(), 2);
    assert!(!collector.has_issues(), "{:?}", collector.problems());
}

#[test]
fn loads_zip_feed() {
    let (_dir, path) = Feed::minimal().write_zip();
    let (schedule, collector) = load(&path, validating());
    let schedule = schedule.unwrap();

    assert_eq!(schedule.stops.len(), 2);
    assert_eq!(schedule.trip_stop_times("T1").len(), 2);
    assert_eq!(collector.error_count(), 0);
}

#[test]
fn missing_feed_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let (result, _) = load(&dir.path().join("nowhere.zip"), LoadOptions::default());
    assert!(matches!(result, Err(gtfs::Error::FeedNotFound(_))));
}

#[test]
fn unknown_file_is_a_warning() {
    let dir = Feed::minimal()
        .with("notes.txt", "note\nhello\n")
        .write_dir();
    let (schedule, collector) = load(dir.path(), LoadOptions::default());
    assert!(schedule.is_ok());

    let unknown: Vec<_> = collector.of_kind("UnknownFile").collect();
    assert_eq!(unknown.len(), 1);
    assert!(unknown[0].is_warning());
    assert_eq!(
        unknown[0].kind,
        ProblemKind::UnknownFile {
            file_name: "notes.txt".into()
        }
    );
}

#[test]
fn missing_required_file_is_reported_and_loading_continues() {
    let dir = Feed::minimal().without("routes.txt").write_dir();
    let (schedule, collector) = load(dir.path(), LoadOptions::default());
    let schedule = schedule.unwrap();

    assert!(collector.problems().iter().any(|problem| problem.kind
        == ProblemKind::MissingFile {
            file_name: "routes.txt".into()
        }));
    assert_eq!(schedule.stops.len(), 2);
    assert_eq!(schedule.trips.len(), 1);
    // The trip points at a route that was never loaded.
    assert!(collector.problems().iter().any(|problem| {
        problem.kind.column_name() == Some("route_id")
            && problem.context.file_name.as_deref() == Some("trips.txt")
    }));
}

#[test]
fn strict_accumulator_halts_on_first_error() {
    let stops = format!("{}S3,Broken,123,16.3\nS4,Later,48.21,16.38\n", common::STOPS);
    let dir = Feed::minimal().with("stops.txt", stops).write_dir();

    let mut strict = StrictAccumulator::new();
    let mut reporter = Reporter::new(&mut strict);
    let result = gtfs::load(dir.path(), &mut reporter, LoadOptions::default());
    drop(reporter);

    let problem = match result {
        Err(gtfs::Error::Halted(problem)) => problem,
        Err(err) => panic!("unexpected error {err}"),
        Ok(_) => panic!("loading should have halted"),
    };
    assert_eq!(problem.severity, Severity::Error);
    assert_eq!(problem.kind.column_name(), Some("stop_lat"));
    assert_eq!(problem.context.file_name.as_deref(), Some("stops.txt"));
    assert_eq!(problem.context.row_num, Some(4));
    assert!(strict.into_failure().is_some());
}

#[test]
fn blank_lines_count_towards_row_numbers() {
    let stops = "stop_id,stop_name,stop_lat,stop_lon
S1,Karlsplatz,48.2,16.37


S2,Stephansplatz,abc,16.372
";
    let dir = Feed::minimal().with("stops.txt", stops).write_dir();
    let (_, collector) = load(dir.path(), LoadOptions::default());

    let lat: Vec<_> = collector
        .problems()
        .iter()
        .filter(|problem| problem.kind.column_name() == Some("stop_lat"))
        .collect();
    assert_eq!(lat.len(), 1);
    assert_eq!(lat[0].context.file_name.as_deref(), Some("stops.txt"));
    assert_eq!(lat[0].context.row_num, Some(5));
}

#[test]
fn exceptions_win_over_the_weekly_pattern() {
    let calendar = "service_id,monday,tuesday,wednesday,thursday,friday,saturday,sunday,start_date,end_date
WEEK,1,1,1,1,1,0,0,20240101,20240131
";
    let calendar_dates = "service_id,date,exception_type
WEEK,20240101,2
WEEK,20240106,1
HOLIDAY,20240215,1
";
    let dir = Feed::minimal()
        .with("calendar.txt", calendar)
        .with("calendar_dates.txt", calendar_dates)
        .write_dir();
    let (schedule, _) = load(dir.path(), LoadOptions::default());
    let schedule = schedule.unwrap();

    let week = schedule.service_periods.get("WEEK").unwrap();
    assert!(!week.is_active_on(date(2024, 1, 1)));
    assert!(week.is_active_on(date(2024, 1, 2)));
    assert!(week.is_active_on(date(2024, 1, 6)));
    assert!(!week.is_active_on(date(2024, 1, 7)));
    assert!(!week.is_active_on(date(2024, 2, 1)));

    let holiday = schedule.service_periods.get("HOLIDAY").unwrap();
    assert!(!holiday.has_calendar_dates());
    assert_eq!(holiday.active_dates(), [date(2024, 2, 15)]);
}

#[test]
fn duplicate_ids_are_errors() {
    let routes = format!("{}R1,A1,2,Other,3\n", common::ROUTES);
    let dir = Feed::minimal().with("routes.txt", routes).write_dir();
    let (schedule, collector) = load(dir.path(), LoadOptions::default());

    assert_eq!(schedule.unwrap().routes.len(), 1);
    let duplicates: Vec<_> = collector.of_kind("DuplicateID").collect();
    assert_eq!(duplicates.len(), 1);
    assert_eq!(duplicates[0].context.file_name.as_deref(), Some("routes.txt"));
}

/// Collects the ids of levels.txt.
#[derive(Default)]
struct Levels {
    ids: Mutex<Vec<String>>,
}

impl EntityClass for Levels {
    fn name(&self) -> &str {
        "Level"
    }

    fn columns(&self) -> Columns {
        Columns {
            required: &["level_id"],
            optional: &["level_index", "level_name"],
            deprecated: &[],
        }
    }

    fn load_row(&self, row: &Row, _schedule: &mut Schedule, _reporter: &mut Reporter) {
        self.ids.lock().unwrap().push(row.get("level_id").to_string());
    }
}

#[test]
fn registry_loads_custom_files() {
    let dir = Feed::minimal()
        .with("levels.txt", "level_id,level_index\nL0,0\nL1,1\n")
        .with("fare_rules.txt", "fare_id,route_id\nF1,R1\n")
        .write_dir();

    let levels = Arc::new(Levels::default());
    let mut registry = Registry::standard();
    registry.add_class("Level", levels.clone()).unwrap();
    registry
        .add_mapping(
            "levels.txt",
            FileMapping {
                classes: vec!["Level".into()],
                required: false,
                loading_order: Some(15),
            },
        )
        .unwrap();
    registry.remove_mapping("fare_rules.txt");
    assert!(registry.add_class("Level", levels.clone()).is_err());

    let mut collector = Collector::new();
    let mut reporter = Reporter::new(&mut collector);
    let schedule = Loader::new(&registry).load(dir.path(), &mut reporter);
    drop(reporter);

    assert!(schedule.is_ok());
    assert_eq!(*levels.ids.lock().unwrap(), ["L0", "L1"]);
    let unknown: Vec<_> = collector
        .of_kind("UnknownFile")
        .map(|problem| problem.kind.clone())
        .collect();
    assert_eq!(
        unknown,
        [ProblemKind::UnknownFile {
            file_name: "fare_rules.txt".into()
        }]
    );
}

/// Counts shape points instead of building shapes.
#[derive(Default)]
struct PointCounter {
    points: Mutex<usize>,
}

impl EntityClass for PointCounter {
    fn name(&self) -> &str {
        "ShapePoint"
    }

    fn columns(&self) -> Columns {
        Columns {
            required: &["shape_id", "shape_pt_lat", "shape_pt_lon", "shape_pt_sequence"],
            optional: &["shape_dist_traveled"],
            deprecated: &[],
        }
    }

    fn load_row(&self, _row: &Row, _schedule: &mut Schedule, _reporter: &mut Reporter) {
        *self.points.lock().unwrap() += 1;
    }
}

#[test]
fn replaced_shape_class_receives_every_point() {
    let shapes = "shape_id,shape_pt_lat,shape_pt_lon,shape_pt_sequence
SH1,48.2,16.37,1
SH1,48.208,16.372,2
SH2,48.2,16.37,1
";
    let dir = Feed::minimal().with("shapes.txt", shapes).write_dir();

    let counter = Arc::new(PointCounter::default());
    let mut registry = Registry::standard();
    registry.update_class("ShapePoint", counter.clone()).unwrap();

    let mut collector = Collector::new();
    let mut reporter = Reporter::new(&mut collector);
    let schedule = Loader::new(&registry).load(dir.path(), &mut reporter);
    drop(reporter);

    assert!(schedule.unwrap().shapes.is_empty());
    assert_eq!(*counter.points.lock().unwrap(), 3);
}

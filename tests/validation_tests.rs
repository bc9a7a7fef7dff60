mod common;

use common::{Feed, date, load, today, validating};
use feedguard::{
    gtfs::{LoadOptions, ValidateOptions},
    problems::{Collector, ProblemKind, Reporter, Severity},
    schedule::{Schedule, entities::Stop},
    validation,
};

fn close_stop_messages(offset: f64) -> Vec<String> {
    let mut schedule = Schedule::new();
    for stop in [
        Stop::new("A", "Alpha", 48.2, 16.37),
        Stop::new("B", "Beta", 48.2 + offset, 16.37),
    ] {
        let id = stop.stop_id.clone();
        schedule.stops.insert(&id, stop);
    }

    let mut collector = Collector::new();
    let mut reporter = Reporter::new(&mut collector);
    let options = ValidateOptions {
        today: Some(today()),
        ..Default::default()
    };
    validation::validate(&schedule, &mut reporter, &options).unwrap();
    drop(reporter);

    collector
        .of_kind("StopsTooClose")
        .map(|problem| problem.message())
        .collect()
}

#[test]
fn stops_closer_than_two_meters() {
    let same_place = close_stop_messages(0.0);
    assert_eq!(same_place.len(), 1);
    assert!(same_place[0].contains("0.00m apart"), "{}", same_place[0]);

    let one_meter = close_stop_messages(0.00001);
    assert_eq!(one_meter.len(), 1);
    assert!(one_meter[0].contains("1.11m apart"), "{}", one_meter[0]);

    assert!(close_stop_messages(0.00002).is_empty());
}

fn block_feed(second_trip: [&str; 2]) -> Feed {
    let trips = "route_id,service_id,trip_id,block_id
R1,WEEK,T1,B1
R1,WEEK,T2,B1
";
    let stop_times = format!(
        "trip_id,arrival_time,departure_time,stop_id,stop_sequence
T1,06:00:00,06:00:00,S1,1
T1,06:30:00,06:30:00,S2,2
T2,{first},{first},S2,1
T2,{last},{last},S1,2
",
        first = second_trip[0],
        last = second_trip[1],
    );
    Feed::minimal()
        .with("trips.txt", trips)
        .with("stop_times.txt", stop_times)
}

#[test]
fn overlapping_trips_in_a_block() {
    let dir = block_feed(["06:20:00", "06:50:00"]).write_dir();
    let (schedule, collector) = load(dir.path(), validating());
    assert!(schedule.is_ok());

    let overlaps: Vec<ProblemKind> = collector
        .of_kind("OverlappingTripsInSameBlock")
        .map(|problem| problem.kind.clone())
        .collect();
    assert_eq!(
        overlaps,
        [ProblemKind::OverlappingTripsInSameBlock {
            trip_id1: "T1".into(),
            trip_id2: "T2".into(),
            block_id: "B1".into(),
        }]
    );
}

#[test]
fn consecutive_trips_in_a_block() {
    let dir = block_feed(["06:30:00", "07:00:00"]).write_dir();
    let (_, collector) = load(dir.path(), validating());
    assert_eq!(collector.of_kind("OverlappingTripsInSameBlock").count(), 0);
}

#[test]
fn gap_in_service_against_the_threshold() {
    let mut calendar_dates = String::from("service_id,date,exception_type\n");
    for day in 10..=21 {
        calendar_dates.push_str(&format!("WEEK,202401{day},2\n"));
    }
    let dir = Feed::minimal()
        .with("calendar_dates.txt", calendar_dates)
        .write_dir();

    let gaps = |interval: u32| -> Vec<ProblemKind> {
        let options = LoadOptions {
            service_gap_interval: Some(interval),
            ..validating()
        };
        let (_, collector) = load(dir.path(), options);
        collector
            .of_kind("TooManyDaysWithoutService")
            .map(|problem| problem.kind.clone())
            .collect()
    };

    assert!(gaps(13).is_empty());
    assert_eq!(
        gaps(12),
        [ProblemKind::TooManyDaysWithoutService {
            first_day: date(2024, 1, 10),
            last_day: date(2024, 1, 21),
            consecutive_days: 12,
        }]
    );
}

#[test]
fn shape_distances_must_grow() {
    let shapes = "shape_id,shape_pt_lat,shape_pt_lon,shape_pt_sequence,shape_dist_traveled
SH1,48.2,16.37,1,0
SH1,48.204,16.371,2,100
SH1,48.208,16.372,3,50
SH2,48.2,16.37,1,0
SH2,48.208,16.372,2,0
";
    let dir = Feed::minimal().with("shapes.txt", shapes).write_dir();
    let (schedule, collector) = load(dir.path(), LoadOptions::default());
    assert_eq!(schedule.unwrap().shapes.len(), 2);

    let severities: Vec<(Option<usize>, Severity)> = collector
        .problems()
        .iter()
        .filter(|problem| problem.kind.column_name() == Some("shape_dist_traveled"))
        .map(|problem| (problem.context.row_num, problem.severity))
        .collect();
    assert_eq!(
        severities,
        [(Some(4), Severity::Error), (Some(6), Severity::Warning)]
    );
}

#[test]
fn entrance_needs_a_parent_station() {
    let stops = "stop_id,stop_name,stop_lat,stop_lon,location_type,parent_station
S1,Karlsplatz,48.2,16.37,0,
S2,Stephansplatz,48.208,16.372,0,
E1,Entrance,48.2005,16.3705,2,
";
    let dir = Feed::minimal().with("stops.txt", stops).write_dir();
    let (_, collector) = load(dir.path(), LoadOptions::default());

    let problems: Vec<_> = collector
        .problems()
        .iter()
        .filter(|problem| problem.kind.column_name() == Some("parent_station"))
        .collect();
    assert_eq!(problems.len(), 1);
    assert_eq!(problems[0].name(), "InvalidValue");
    assert_eq!(problems[0].severity, Severity::Error);
    assert_eq!(problems[0].context.row_num, Some(4));
}

#[test]
fn expired_feed_is_a_warning() {
    let dir = Feed::minimal().write_dir();
    let options = LoadOptions {
        today: Some(date(2024, 6, 1)),
        ..validating()
    };
    let (_, collector) = load(dir.path(), options);

    let expirations: Vec<_> = collector.of_kind("ExpirationDate").collect();
    assert_eq!(expirations.len(), 1);
    assert!(expirations[0].is_warning());
    assert_eq!(
        expirations[0].kind,
        ProblemKind::ExpirationDate {
            expiration: date(2024, 3, 31),
            origin_file: "last service date in calendar.txt".into(),
            expired: true,
        }
    );
}

#[test]
fn validating_a_loaded_schedule_again_is_stable() {
    let dir = Feed::minimal().write_dir();
    let (schedule, first) = load(dir.path(), validating());
    let schedule = schedule.unwrap();

    let mut second = Collector::new();
    let mut reporter = Reporter::new(&mut second);
    let options = LoadOptions {
        today: Some(today()),
        ..Default::default()
    }
    .validate_options();
    schedule.validate(&mut reporter, &options).unwrap();
    drop(reporter);

    assert_eq!(first.error_count(), second.error_count());
    assert_eq!(first.warning_count(), second.warning_count());
}

mod common;

use std::fs;

use common::{Feed, load, validating};
use feedguard::{gtfs::LoadOptions, schedule::Schedule};

const STOPS_WITH_NOTES: &str = "stop_id,stop_name,stop_lat,stop_lon,platform_note
S1,Karlsplatz,48.2,16.37,North
S2,Stephansplatz,48.208,16.372,
";

#[test]
fn written_feed_loads_the_same() {
    let calendar_dates = "service_id,date,exception_type
WEEK,20240101,2
";
    let source = Feed::minimal()
        .with("stops.txt", STOPS_WITH_NOTES)
        .with("calendar_dates.txt", calendar_dates)
        .write_dir();
    let (schedule, first) = load(source.path(), validating());
    let schedule = schedule.unwrap();
    assert_eq!(first.error_count(), 0);

    let out = tempfile::tempdir().unwrap();
    let path = out.path().join("feed");
    schedule.write(&path).unwrap();

    let stops = fs::read_to_string(path.join("stops.txt")).unwrap();
    assert!(stops.lines().next().unwrap().ends_with(",platform_note"));

    let (reloaded, second) = load(&path, validating());
    let reloaded = reloaded.unwrap();
    assert_eq!(second.error_count(), 0);
    assert_eq!(reloaded.stops.len(), schedule.stops.len());
    assert_eq!(reloaded.trips.len(), schedule.trips.len());
    assert_eq!(reloaded.stop_times.len(), schedule.stop_times.len());

    let karlsplatz = reloaded.stops.get("S1").unwrap();
    assert_eq!(
        karlsplatz.extras,
        [("platform_note".to_string(), "North".to_string())]
    );
    let (week, original) = (
        reloaded.service_periods.get("WEEK").unwrap(),
        schedule.service_periods.get("WEEK").unwrap(),
    );
    assert_eq!(week.days, original.days);
    assert_eq!(
        (week.start_date, week.end_date),
        (original.start_date, original.end_date)
    );
    assert_eq!(week.exceptions, original.exceptions);
}

#[test]
fn writes_zip_archives() {
    let source = Feed::minimal().write_dir();
    let (schedule, _) = load(source.path(), LoadOptions::default());
    let schedule = schedule.unwrap();

    let out = tempfile::tempdir().unwrap();
    let path = out.path().join("copy.zip");
    schedule.write(&path).unwrap();
    assert!(path.is_file());

    let (reloaded, collector) = load(&path, validating());
    let reloaded = reloaded.unwrap();
    assert!(!collector.has_issues(), "{:?}", collector.problems());
    assert_eq!(reloaded.trip_stop_times("T1").len(), 2);
    assert_eq!(reloaded.agencies.len(), 1);
}

fn full_feed() -> Feed {
    Feed::minimal()
        .with(
            "agency.txt",
            "agency_id,agency_name,agency_url,agency_timezone,agency_lang,ticket_office
A1,Wiener Linien,https://www.wienerlinien.at,Europe/Vienna,de,Karlsplatz
",
        )
        .with(
            "stops.txt",
            "stop_id,stop_name,stop_lat,stop_lon,zone_id,platform_note
S1,Karlsplatz,48.2,16.37,Z1,North
S2,Stephansplatz,48.208,16.372,Z2,
",
        )
        .with(
            "routes.txt",
            "route_id,agency_id,route_short_name,route_long_name,route_type,route_color,line_group
R1,A1,1,Ring,3,FF0000,inner
",
        )
        .with(
            "trips.txt",
            "route_id,service_id,trip_id,shape_id,trip_headsign,vehicle
R1,WEEK,T1,SH1,Stephansplatz,tram
R1,WEEK,T2,,Stephansplatz,
",
        )
        .with(
            "stop_times.txt",
            "trip_id,arrival_time,departure_time,stop_id,stop_sequence,shape_dist_traveled,stop_note
T1,08:00:00,08:00:00,S1,1,0,first
T1,08:05:00,08:06:00,S2,2,890,
T2,09:00:00,09:00:00,S1,1,,
T2,09:05:00,09:05:00,S2,2,,
",
        )
        .with(
            "calendar_dates.txt",
            "service_id,date,exception_type
WEEK,20240101,2
EXTRA,20240406,1
",
        )
        .with(
            "shapes.txt",
            "shape_id,shape_pt_lat,shape_pt_lon,shape_pt_sequence,shape_dist_traveled
SH1,48.2,16.37,10,0
SH1,48.204,16.371,20,445
SH1,48.208,16.372,30,890
",
        )
        .with(
            "frequencies.txt",
            "trip_id,start_time,end_time,headway_secs,exact_times,crowding
T2,09:00:00,12:00:00,600,0,high
",
        )
        .with(
            "fare_attributes.txt",
            "fare_id,price,currency_type,payment_method,transfers,transfer_duration
F1,2.40,EUR,1,,5400
",
        )
        .with(
            "fare_rules.txt",
            "fare_id,route_id,origin_id,destination_id
F1,R1,Z1,Z2
F1,,Z2,Z1
",
        )
        .with(
            "transfers.txt",
            "from_stop_id,to_stop_id,transfer_type,min_transfer_time
S1,S2,2,180
",
        )
        .with(
            "feed_info.txt",
            "feed_publisher_name,feed_publisher_url,feed_lang,feed_version,contact
Wiener Linien,https://www.wienerlinien.at,de,2024.1,info@example.com
",
        )
}

fn assert_same_schedule(left: &Schedule, right: &Schedule) {
    let agencies: Vec<_> = left.agencies.values().collect();
    assert_eq!(agencies, right.agencies.values().collect::<Vec<_>>());
    let stops: Vec<_> = left.stops.values().collect();
    assert_eq!(stops, right.stops.values().collect::<Vec<_>>());
    let routes: Vec<_> = left.routes.values().collect();
    assert_eq!(routes, right.routes.values().collect::<Vec<_>>());
    let trips: Vec<_> = left.trips.values().collect();
    assert_eq!(trips, right.trips.values().collect::<Vec<_>>());
    for trip_id in left.trips.ids() {
        assert_eq!(
            left.trip_stop_times(trip_id),
            right.trip_stop_times(trip_id),
            "stop times of {trip_id}"
        );
    }
    let periods: Vec<_> = left.service_periods.values().collect();
    assert_eq!(periods, right.service_periods.values().collect::<Vec<_>>());
    let shapes: Vec<_> = left.shapes.values().collect();
    assert_eq!(shapes, right.shapes.values().collect::<Vec<_>>());
    let fares: Vec<_> = left.fares.values().collect();
    assert_eq!(fares, right.fares.values().collect::<Vec<_>>());
    assert_eq!(left.transfers, right.transfers);
    assert_eq!(left.feed_info, right.feed_info);
}

#[test]
fn every_table_survives_a_write() {
    let source = full_feed().write_dir();
    let (schedule, _) = load(source.path(), LoadOptions::default());
    let schedule = schedule.unwrap();
    assert_eq!(schedule.fares.get("F1").unwrap().rules.len(), 2);
    assert_eq!(schedule.trips.get("T2").unwrap().frequencies.len(), 1);

    let out = tempfile::tempdir().unwrap();
    let path = out.path().join("feed");
    schedule.write(&path).unwrap();
    let (reloaded, _) = load(&path, LoadOptions::default());
    let reloaded = reloaded.unwrap();

    assert_same_schedule(&schedule, &reloaded);
    let sequences: Vec<u32> = reloaded
        .shapes
        .get("SH1")
        .unwrap()
        .points
        .iter()
        .map(|point| point.shape_pt_sequence)
        .collect();
    assert_eq!(sequences, [10, 20, 30]);
}

#![allow(dead_code)]

use std::{
    collections::BTreeMap,
    fs::{self, File},
    io::Write,
    path::{Path, PathBuf},
};

use chrono::NaiveDate;
use feedguard::{
    gtfs::{self, LoadOptions},
    problems::{Collector, Reporter},
    schedule::Schedule,
};
use tempfile::TempDir;
use zip::{ZipWriter, write::SimpleFileOptions};

pub const AGENCY: &str = "agency_id,agency_name,agency_url,agency_timezone
A1,Metro,http://example.com,Europe/Vienna
";

pub const STOPS: &str = "stop_id,stop_name,stop_lat,stop_lon
S1,Karlsplatz,48.2,16.37
S2,Stephansplatz,48.208,16.372
";

pub const ROUTES: &str = "route_id,agency_id,route_short_name,route_long_name,route_type
R1,A1,1,Ring,3
";

pub const TRIPS: &str = "route_id,service_id,trip_id
R1,WEEK,T1
";

pub const STOP_TIMES: &str = "trip_id,arrival_time,departure_time,stop_id,stop_sequence
T1,08:00:00,08:00:00,S1,1
T1,08:05:00,08:05:00,S2,2
";

pub const CALENDAR: &str =
    "service_id,monday,tuesday,wednesday,thursday,friday,saturday,sunday,start_date,end_date
WEEK,1,1,1,1,1,1,1,20240101,20240331
";

/// The date every fixture is validated on.
pub fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, 5).unwrap()
}

pub fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).unwrap()
}

/// The files of a feed, written to a temporary directory or zip on demand.
#[derive(Debug, Clone)]
pub struct Feed {
    files: BTreeMap<String, String>,
}

impl Feed {
    /// One agency, two stops, one route and one trip running daily in the
    /// first quarter of 2024.
    pub fn minimal() -> Self {
        let files = [
            ("agency.txt", AGENCY),
            ("stops.txt", STOPS),
            ("routes.txt", ROUTES),
            ("trips.txt", TRIPS),
            ("stop_times.txt", STOP_TIMES),
            ("calendar.txt", CALENDAR),
        ];
        Self {
            files: files
                .into_iter()
                .map(|(name, contents)| (name.to_string(), contents.to_string()))
                .collect(),
        }
    }

    pub fn with(mut self, file_name: &str, contents: impl Into<String>) -> Self {
        self.files.insert(file_name.to_string(), contents.into());
        self
    }

    pub fn without(mut self, file_name: &str) -> Self {
        self.files.remove(file_name);
        self
    }

    pub fn write_dir(&self) -> TempDir {
        let dir = tempfile::tempdir().unwrap();
        for (name, contents) in &self.files {
            fs::write(dir.path().join(name), contents).unwrap();
        }
        dir
    }

    /// Writes `feed.zip` into a new temporary directory.
    pub fn write_zip(&self) -> (TempDir, PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("feed.zip");
        let mut zip = ZipWriter::new(File::create(&path).unwrap());
        for (name, contents) in &self.files {
            zip.start_file(name.as_str(), SimpleFileOptions::default())
                .unwrap();
            zip.write_all(contents.as_bytes()).unwrap();
        }
        zip.finish().unwrap();
        (dir, path)
    }
}

/// Options with the extra validation on and a fixed date.
pub fn validating() -> LoadOptions {
    LoadOptions {
        extra_validation: true,
        today: Some(today()),
        ..Default::default()
    }
}

pub fn load(path: &Path, options: LoadOptions) -> (Result<Schedule, gtfs::Error>, Collector) {
    let mut collector = Collector::new();
    let mut reporter = Reporter::new(&mut collector);
    let result = gtfs::load(path, &mut reporter, options);
    drop(reporter);
    (result, collector)
}

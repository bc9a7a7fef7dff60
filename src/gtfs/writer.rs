use std::{
    fs::{self, File},
    io::Write,
    path::Path,
    time::Instant,
};

use tracing::{debug, info};
use zip::{ZipWriter, write::SimpleFileOptions};

use crate::{
    gtfs,
    schedule::{
        Schedule,
        entities::{Entity, ServiceDate, ShapePoint, StopTime},
    },
};

/// Writes `schedule` as a zip archive when `path` ends in `.zip`, as a
/// directory of files otherwise.
///
/// Files keep the columns they were read with, unknown ones included.
/// Optional files are only written when they have rows.
pub fn write(schedule: &Schedule, path: &Path) -> Result<(), gtfs::Error> {
    info!("Writing feed {}", path.display());
    let now = Instant::now();
    let files = render(schedule)?;

    let is_zip = path
        .extension()
        .is_some_and(|extension| extension.eq_ignore_ascii_case("zip"));
    if is_zip {
        let mut archive = ZipWriter::new(File::create(path)?);
        for (file_name, contents) in &files {
            archive.start_file(file_name.as_str(), SimpleFileOptions::default())?;
            archive.write_all(contents)?;
        }
        archive.finish()?;
    } else {
        fs::create_dir_all(path)?;
        for (file_name, contents) in &files {
            fs::write(path.join(file_name), contents)?;
        }
    }
    info!("Wrote {} files in {:?}", files.len(), now.elapsed());
    Ok(())
}

/// Every file of the feed as CSV bytes, in writing order.
fn render(schedule: &Schedule) -> Result<Vec<(String, Vec<u8>)>, gtfs::Error> {
    let mut files = Vec::new();
    let mut push = |file_name: &str, contents: Option<Vec<u8>>| {
        if let Some(contents) = contents {
            debug!("Rendered {file_name} ({} bytes)", contents.len());
            files.push((file_name.to_string(), contents));
        }
    };

    push(
        "agency.txt",
        table(schedule, "agency.txt", schedule.agencies.values(), true)?,
    );
    push(
        "stops.txt",
        table(schedule, "stops.txt", schedule.stops.values(), true)?,
    );
    push(
        "routes.txt",
        table(schedule, "routes.txt", schedule.routes.values(), true)?,
    );
    push(
        "trips.txt",
        table(schedule, "trips.txt", schedule.trips.values(), true)?,
    );

    let stop_times = schedule
        .trips
        .ids()
        .flat_map(|trip_id| schedule.trip_stop_times(trip_id));
    push(
        "stop_times.txt",
        table::<StopTime>(schedule, "stop_times.txt", stop_times, true)?,
    );

    let exceptions: Vec<ServiceDate> = schedule
        .service_periods
        .values()
        .flat_map(|period| {
            period
                .exceptions
                .iter()
                .map(|(date, exception_type)| ServiceDate {
                    service_id: period.service_id.clone(),
                    date: *date,
                    exception_type: *exception_type,
                })
        })
        .collect();
    let calendars: Vec<_> = schedule
        .service_periods
        .values()
        .filter(|period| period.has_calendar_dates())
        .collect();
    // A feed needs at least one of the two calendar files.
    let write_calendar = !calendars.is_empty() || exceptions.is_empty();
    push(
        "calendar.txt",
        table(schedule, "calendar.txt", calendars, write_calendar)?,
    );
    push(
        "calendar_dates.txt",
        table(schedule, "calendar_dates.txt", &exceptions, false)?,
    );

    let points: Vec<ShapePoint> = schedule
        .shapes
        .values()
        .flat_map(|shape| {
            // Points are kept sorted, so a repeated sequence sits next to its twin.
            let renumber = shape
                .points
                .windows(2)
                .any(|pair| pair[0].shape_pt_sequence == pair[1].shape_pt_sequence);
            shape.points.iter().zip(1..).map(move |(point, sequence)| ShapePoint {
                shape_pt_sequence: if renumber {
                    sequence
                } else {
                    point.shape_pt_sequence
                },
                ..point.clone()
            })
        })
        .collect();
    push(
        "shapes.txt",
        table(schedule, "shapes.txt", &points, false)?,
    );

    let frequencies = schedule.trips.values().flat_map(|trip| &trip.frequencies);
    push(
        "frequencies.txt",
        table(schedule, "frequencies.txt", frequencies, false)?,
    );
    push(
        "fare_attributes.txt",
        table(schedule, "fare_attributes.txt", schedule.fares.values(), false)?,
    );
    let fare_rules = schedule.fares.values().flat_map(|fare| &fare.rules);
    push(
        "fare_rules.txt",
        table(schedule, "fare_rules.txt", fare_rules, false)?,
    );
    push(
        "transfers.txt",
        table(schedule, "transfers.txt", &schedule.transfers, false)?,
    );
    push(
        "feed_info.txt",
        table(schedule, "feed_info.txt", &schedule.feed_info, false)?,
    );

    Ok(files)
}

/// Renders the rows of one file. `None` when there are no rows and the file
/// is not `always` written.
fn table<'a, E: Entity + 'a>(
    schedule: &Schedule,
    file_name: &str,
    rows: impl IntoIterator<Item = &'a E>,
    always: bool,
) -> Result<Option<Vec<u8>>, gtfs::Error> {
    let rows: Vec<&E> = rows.into_iter().collect();
    if rows.is_empty() && !always {
        return Ok(None);
    }

    let mut columns: Vec<String> = match schedule.table_columns(file_name) {
        Some(recorded) => recorded.to_vec(),
        None => E::COLUMNS.fields().map(str::to_string).collect(),
    };
    for row in &rows {
        for (name, _) in row.extras() {
            if !columns.contains(name) {
                columns.push(name.clone());
            }
        }
    }

    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(&columns)?;
    for row in rows {
        writer.write_record(row.to_record(&columns))?;
    }
    let contents = writer.into_inner().map_err(|err| err.into_error())?;
    Ok(Some(contents))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        problems::{Collector, Reporter},
        schedule::entities::{Agency, Route, ServicePeriod, Stop, Trip},
        shared::{Time, parse_date},
    };

    #[test]
    fn writes_directory_with_extras_and_exceptions() {
        let mut collector = Collector::new();
        let mut reporter = Reporter::new(&mut collector);
        let mut schedule = Schedule::new();
        schedule.add(
            Agency::new("Metro", "https://metro.example", "Europe/Vienna", "M"),
            &mut reporter,
        );
        let mut stop = Stop::new("S1", "Main", 48.2, 16.3);
        stop.extras.push(("platform_note".into(), "north side".into()));
        schedule.add(stop, &mut reporter);
        schedule.add(Route::new("R1", "1", "Ring", 3), &mut reporter);
        let mut period = ServicePeriod::new("HOLIDAY");
        period.set_date_has_service(parse_date("20240101").unwrap(), true, None);
        schedule.add(period, &mut reporter);
        schedule.add(Trip::new("T1", "R1", "HOLIDAY"), &mut reporter);
        let time = Time::from_hms("06:00:00").unwrap();
        schedule.add(StopTime::new("T1", "S1", 1).at(time), &mut reporter);
        drop(reporter);

        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("feed");
        write(&schedule, &out).unwrap();

        let stops = fs::read_to_string(out.join("stops.txt")).unwrap();
        let header = stops.lines().next().unwrap();
        assert!(header.ends_with(",platform_note"), "{header}");
        assert!(stops.contains("north side"));

        let dates = fs::read_to_string(out.join("calendar_dates.txt")).unwrap();
        assert_eq!(dates.lines().nth(1), Some("HOLIDAY,20240101,1"));
        assert!(!out.join("calendar.txt").exists());
        assert!(!out.join("shapes.txt").exists());
        assert!(out.join("stop_times.txt").exists());
    }
}

use std::{cmp::Ordering, fmt};

use chrono::NaiveDate;
use serde::Serialize;

use crate::problems::Severity;

/// Every problem the loader and the validation passes can raise.
///
/// Each variant carries the values its message is rendered from. The
/// severity is not part of the kind; [`ProblemKind::default_severity`] gives
/// the usual one and reporters may override it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum ProblemKind {
    FeedNotFound {
        feed_name: String,
    },
    UnknownFormat {
        feed_name: String,
    },
    FileFormat {
        file_name: String,
        problem: String,
    },
    MissingFile {
        file_name: String,
    },
    EmptyFile {
        file_name: String,
    },
    UnknownFile {
        file_name: String,
    },
    MissingColumn {
        file_name: String,
        column_name: String,
    },
    UnrecognizedColumn {
        file_name: String,
        column_name: String,
    },
    DeprecatedColumn {
        file_name: String,
        column_name: String,
        new_name: Option<String>,
    },
    CsvSyntax {
        description: String,
    },
    DuplicateColumn {
        file_name: String,
        header: String,
        count: usize,
    },
    MissingValue {
        column_name: String,
        reason: Option<String>,
    },
    InvalidValue {
        column_name: String,
        value: String,
        reason: Option<String>,
    },
    InvalidFloatValue {
        value: String,
    },
    InvalidNonNegativeIntegerValue {
        value: String,
    },
    DuplicateId {
        column_name: String,
        value: String,
    },
    InvalidAgencyId {
        column_name: String,
        value: String,
        relating_type: String,
        relating_id: String,
    },
    UnusedStop {
        stop_id: String,
        stop_name: String,
    },
    UsedStation {
        stop_id: String,
        stop_name: String,
    },
    StopTooFarFromParentStation {
        stop_id: String,
        stop_name: String,
        parent_stop_id: String,
        parent_stop_name: String,
        distance: f64,
    },
    StopsTooClose {
        stop_name_a: String,
        stop_id_a: String,
        stop_name_b: String,
        stop_id_b: String,
        distance: f64,
    },
    StationsTooClose {
        stop_name_a: String,
        stop_id_a: String,
        stop_name_b: String,
        stop_id_b: String,
        distance: f64,
    },
    DifferentStationTooClose {
        stop_name: String,
        stop_id: String,
        station_stop_name: String,
        station_stop_id: String,
        distance: f64,
    },
    StopTooFarFromShapeWithDistTraveled {
        trip_id: String,
        stop_name: String,
        stop_id: String,
        shape_dist_traveled: f64,
        shape_id: String,
        distance: f64,
        max_distance: f64,
    },
    ExpirationDate {
        expiration: NaiveDate,
        origin_file: String,
        expired: bool,
    },
    FutureService {
        start_date: NaiveDate,
        origin_file: String,
    },
    DateOutsideValidRange {
        column_name: String,
        value: String,
        range_start_year: i32,
        range_end_year: i32,
    },
    NoServiceExceptions {
        start: String,
        end: String,
    },
    InvalidLineEnd {
        bad_line_end: String,
    },
    TooFastTravel {
        trip_id: String,
        prev_stop: String,
        next_stop: String,
        distance: f64,
        seconds: u32,
        speed: Option<f64>,
    },
    StopWithMultipleRouteTypes {
        stop_name: String,
        stop_id: String,
        route_id1: String,
        route_id2: String,
    },
    DuplicateTrip {
        trip_id1: String,
        route_id1: String,
        trip_id2: String,
        route_id2: String,
    },
    OverlappingTripsInSameBlock {
        trip_id1: String,
        trip_id2: String,
        block_id: String,
    },
    TransferDistanceTooBig {
        from_stop_id: String,
        to_stop_id: String,
        distance: f64,
    },
    TransferWalkingSpeedTooFast {
        from_stop_id: String,
        to_stop_id: String,
        distance: f64,
        transfer_time: i64,
    },
    TooManyDaysWithoutService {
        first_day: NaiveDate,
        last_day: NaiveDate,
        consecutive_days: i64,
    },
    MinimumTransferTimeSetWithInvalidTransferType {
        transfer_type: String,
    },
    TooManyConsecutiveStopTimesWithSameTime {
        trip_id: String,
        number_of_stop_times: usize,
        stop_time: String,
    },
    OtherProblem {
        description: String,
    },
}

impl ProblemKind {
    /// Stable name of the kind, used for grouping and ignore lists.
    pub fn name(&self) -> &'static str {
        match self {
            Self::FeedNotFound { .. } => "FeedNotFound",
            Self::UnknownFormat { .. } => "UnknownFormat",
            Self::FileFormat { .. } => "FileFormat",
            Self::MissingFile { .. } => "MissingFile",
            Self::EmptyFile { .. } => "EmptyFile",
            Self::UnknownFile { .. } => "UnknownFile",
            Self::MissingColumn { .. } => "MissingColumn",
            Self::UnrecognizedColumn { .. } => "UnrecognizedColumn",
            Self::DeprecatedColumn { .. } => "DeprecatedColumn",
            Self::CsvSyntax { .. } => "CsvSyntax",
            Self::DuplicateColumn { .. } => "DuplicateColumn",
            Self::MissingValue { .. } => "MissingValue",
            Self::InvalidValue { .. } => "InvalidValue",
            Self::InvalidFloatValue { .. } => "InvalidFloatValue",
            Self::InvalidNonNegativeIntegerValue { .. } => "InvalidNonNegativeIntegerValue",
            Self::DuplicateId { .. } => "DuplicateID",
            Self::InvalidAgencyId { .. } => "InvalidAgencyID",
            Self::UnusedStop { .. } => "UnusedStop",
            Self::UsedStation { .. } => "UsedStation",
            Self::StopTooFarFromParentStation { .. } => "StopTooFarFromParentStation",
            Self::StopsTooClose { .. } => "StopsTooClose",
            Self::StationsTooClose { .. } => "StationsTooClose",
            Self::DifferentStationTooClose { .. } => "DifferentStationTooClose",
            Self::StopTooFarFromShapeWithDistTraveled { .. } => {
                "StopTooFarFromShapeWithDistTraveled"
            }
            Self::ExpirationDate { .. } => "ExpirationDate",
            Self::FutureService { .. } => "FutureService",
            Self::DateOutsideValidRange { .. } => "DateOutsideValidRange",
            Self::NoServiceExceptions { .. } => "NoServiceExceptions",
            Self::InvalidLineEnd { .. } => "InvalidLineEnd",
            Self::TooFastTravel { .. } => "TooFastTravel",
            Self::StopWithMultipleRouteTypes { .. } => "StopWithMultipleRouteTypes",
            Self::DuplicateTrip { .. } => "DuplicateTrip",
            Self::OverlappingTripsInSameBlock { .. } => "OverlappingTripsInSameBlock",
            Self::TransferDistanceTooBig { .. } => "TransferDistanceTooBig",
            Self::TransferWalkingSpeedTooFast { .. } => "TransferWalkingSpeedTooFast",
            Self::TooManyDaysWithoutService { .. } => "TooManyDaysWithoutService",
            Self::MinimumTransferTimeSetWithInvalidTransferType { .. } => {
                "MinimumTransferTimeSetWithInvalidTransferType"
            }
            Self::TooManyConsecutiveStopTimesWithSameTime { .. } => {
                "TooManyConsecutiveStopTimesWithSameTime"
            }
            Self::OtherProblem { .. } => "OtherProblem",
        }
    }

    pub fn default_severity(&self) -> Severity {
        match self {
            Self::UnknownFile { .. }
            | Self::UnrecognizedColumn { .. }
            | Self::DeprecatedColumn { .. }
            | Self::InvalidFloatValue { .. }
            | Self::InvalidNonNegativeIntegerValue { .. }
            | Self::UnusedStop { .. }
            | Self::StopTooFarFromParentStation { .. }
            | Self::StopsTooClose { .. }
            | Self::StationsTooClose { .. }
            | Self::DifferentStationTooClose { .. }
            | Self::StopTooFarFromShapeWithDistTraveled { .. }
            | Self::ExpirationDate { .. }
            | Self::FutureService { .. }
            | Self::NoServiceExceptions { .. }
            | Self::InvalidLineEnd { .. }
            | Self::StopWithMultipleRouteTypes { .. }
            | Self::DuplicateTrip { .. }
            | Self::OverlappingTripsInSameBlock { .. }
            | Self::TransferWalkingSpeedTooFast { .. }
            | Self::TooManyDaysWithoutService { .. }
            | Self::TooManyConsecutiveStopTimesWithSameTime { .. } => Severity::Warning,
            _ => Severity::Error,
        }
    }

    /// The column the problem is about, when it names one.
    pub fn column_name(&self) -> Option<&str> {
        match self {
            Self::MissingColumn { column_name, .. }
            | Self::UnrecognizedColumn { column_name, .. }
            | Self::DeprecatedColumn { column_name, .. }
            | Self::MissingValue { column_name, .. }
            | Self::InvalidValue { column_name, .. }
            | Self::DuplicateId { column_name, .. }
            | Self::InvalidAgencyId { column_name, .. }
            | Self::DateOutsideValidRange { column_name, .. } => Some(column_name),
            _ => None,
        }
    }

    /// Kind specific values appended to the presentation order key.
    pub(crate) fn extra_order_tokens(&self) -> Vec<String> {
        match self {
            Self::DuplicateColumn { header, .. } => vec![header.clone()],
            Self::InvalidValue { column_name, .. } => vec![column_name.clone()],
            Self::DateOutsideValidRange { value, .. } => vec![value.clone()],
            _ => Vec::new(),
        }
    }

    /// Compares how significant two problems of the same kind are.
    ///
    /// `Less` means `self` is more significant. `None` is returned for kinds
    /// without a significance order, in which case the first reported wins.
    pub fn compare_significance(&self, other: &Self) -> Option<Ordering> {
        match (self, other) {
            (
                Self::StopTooFarFromParentStation { distance: a, .. },
                Self::StopTooFarFromParentStation { distance: b, .. },
            )
            | (
                Self::StopTooFarFromShapeWithDistTraveled { distance: a, .. },
                Self::StopTooFarFromShapeWithDistTraveled { distance: b, .. },
            )
            | (
                Self::TooFastTravel { distance: a, .. },
                Self::TooFastTravel { distance: b, .. },
            ) => b.partial_cmp(a),
            (Self::StopsTooClose { distance: a, .. }, Self::StopsTooClose { distance: b, .. })
            | (
                Self::StationsTooClose { distance: a, .. },
                Self::StationsTooClose { distance: b, .. },
            )
            | (
                Self::DifferentStationTooClose { distance: a, .. },
                Self::DifferentStationTooClose { distance: b, .. },
            ) => a.partial_cmp(b),
            _ => None,
        }
    }

    fn reason(&self) -> Option<String> {
        match self {
            Self::MissingValue { reason, .. } | Self::InvalidValue { reason, .. } => reason.clone(),
            Self::DeprecatedColumn {
                new_name: Some(new_name),
                ..
            } if !new_name.trim().is_empty() => {
                Some(format!("Please use the new column \"{new_name}\" instead."))
            }
            _ => None,
        }
    }
}

impl fmt::Display for ProblemKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::FeedNotFound { feed_name } => {
                write!(f, "Couldn't find a feed named {feed_name}")?
            }
            Self::UnknownFormat { feed_name } => write!(
                f,
                "The feed named {feed_name} had an unknown format:\n\
                 feeds should be either .zip files or directories."
            )?,
            Self::FileFormat { file_name, problem } => write!(
                f,
                "Files must be encoded in utf-8 and may not contain any null bytes (0x00). \
                 {file_name} {problem}."
            )?,
            Self::MissingFile { file_name } => write!(f, "File {file_name} is not found")?,
            Self::EmptyFile { file_name } => write!(f, "File {file_name} is empty")?,
            Self::UnknownFile { file_name } => write!(
                f,
                "The file named {file_name} was not expected.\n\
                 This may be a misspelled file name or the file may be included in a \
                 subdirectory. Please check spellings and make sure that there are no \
                 subdirectories within the feed"
            )?,
            Self::MissingColumn {
                file_name,
                column_name,
            } => write!(f, "Missing column {column_name} in file {file_name}")?,
            Self::UnrecognizedColumn {
                file_name,
                column_name,
            } => write!(
                f,
                "Unrecognized column {column_name} in file {file_name}. This might be a \
                 misspelled column name (capitalization matters!). Or it could be extra \
                 information (such as a proposed feed extension) that the validator doesn't \
                 know about yet. Extra information is fine; this warning is here to catch \
                 misspelled optional column names."
            )?,
            Self::DeprecatedColumn {
                file_name,
                column_name,
                ..
            } => write!(
                f,
                "Column {column_name} in file {file_name} is deprecated and support for it \
                 will eventually be removed. As such, it should not be used in new feeds."
            )?,
            Self::CsvSyntax { description } => f.write_str(description)?,
            Self::DuplicateColumn {
                file_name,
                header,
                count,
            } => write!(f, "Column {header} appears {count} times in file {file_name}")?,
            Self::MissingValue { column_name, .. } => {
                write!(f, "Missing value for column {column_name}")?
            }
            Self::InvalidValue {
                column_name, value, ..
            } => write!(f, "Invalid value {value} in field {column_name}")?,
            Self::InvalidFloatValue { value } => write!(
                f,
                "Invalid numeric value {value}. Please ensure that the number includes an \
                 explicit whole number portion (ie. use 0.5 instead of .5), that you do not \
                 use the exponential notation (ie. use 0.001 instead of 1E-3), and that it is \
                 a properly formated decimal value."
            )?,
            Self::InvalidNonNegativeIntegerValue { value } => write!(
                f,
                "Invalid numeric value {value}. Please ensure that the number does not have a \
                 leading zero (ie. use 3 instead of 03), and that it is a properly formated \
                 integer value."
            )?,
            Self::DuplicateId { column_name, value } => {
                write!(f, "Duplicate ID {value} in column {column_name}")?
            }
            Self::InvalidAgencyId {
                column_name,
                value,
                relating_type,
                relating_id,
            } => write!(
                f,
                "The {relating_type} with ID {relating_id} specifies {column_name} {value} \
                 which does not exist."
            )?,
            Self::UnusedStop { stop_id, stop_name } => {
                write!(f, "{stop_name} (ID {stop_id}) isn't used in any trips")?
            }
            Self::UsedStation { stop_id, stop_name } => write!(
                f,
                "{stop_name} (ID {stop_id}) has location_type=1 (station) so it should not \
                 appear in stop_times"
            )?,
            Self::StopTooFarFromParentStation {
                stop_id,
                stop_name,
                parent_stop_id,
                parent_stop_name,
                distance,
            } => write!(
                f,
                "{stop_name} (ID {stop_id}) is too far from its parent station \
                 {parent_stop_name} (ID {parent_stop_id}) : {distance:.2} meters."
            )?,
            Self::StopsTooClose {
                stop_name_a,
                stop_id_a,
                stop_name_b,
                stop_id_b,
                distance,
            } => write!(
                f,
                "The stops \"{stop_name_a}\" (ID {stop_id_a}) and \"{stop_name_b}\" \
                 (ID {stop_id_b}) are {distance:.2}m apart and probably represent the same \
                 location."
            )?,
            Self::StationsTooClose {
                stop_name_a,
                stop_id_a,
                stop_name_b,
                stop_id_b,
                distance,
            } => write!(
                f,
                "The stations \"{stop_name_a}\" (ID {stop_id_a}) and \"{stop_name_b}\" \
                 (ID {stop_id_b}) are {distance:.2}m apart and probably represent the same \
                 location."
            )?,
            Self::DifferentStationTooClose {
                stop_name,
                stop_id,
                station_stop_name,
                station_stop_id,
                distance,
            } => write!(
                f,
                "The parent_station of stop \"{stop_name}\" (ID {stop_id}) is not station \
                 \"{station_stop_name}\" (ID {station_stop_id}) but they are only \
                 {distance:.2}m apart."
            )?,
            Self::StopTooFarFromShapeWithDistTraveled {
                trip_id,
                stop_name,
                stop_id,
                shape_dist_traveled,
                shape_id,
                distance,
                max_distance,
            } => write!(
                f,
                "For trip {trip_id} the stop \"{stop_name}\" (ID {stop_id}) is {distance:.0} \
                 meters away from the corresponding point (shape_dist_traveled: \
                 {shape_dist_traveled:.6}) on shape {shape_id}. It should be closer than \
                 {max_distance:.0} meters."
            )?,
            Self::ExpirationDate {
                expiration,
                origin_file,
                expired,
            } => {
                let formatted = expiration.format("%B %d, %Y");
                if *expired {
                    write!(f, "This feed expired on {formatted} ({origin_file})")?
                } else {
                    write!(f, "This feed will soon expire, on {formatted} ({origin_file})")?
                }
            }
            Self::FutureService {
                start_date,
                origin_file,
            } => write!(
                f,
                "The {origin_file} in this feed is in the future, on {}. Published feeds must \
                 always include the current date.",
                start_date.format("%B %d, %Y")
            )?,
            Self::DateOutsideValidRange {
                column_name,
                value,
                range_start_year,
                range_end_year,
            } => write!(
                f,
                "The date {value} in field {column_name} is not between the years \
                 {range_start_year} and {range_end_year}. It is advisable to create feeds with \
                 shorter validity periods to give feed consumers more confidence in their \
                 correctness."
            )?,
            Self::NoServiceExceptions { start, end } => write!(
                f,
                "All services are defined on a weekly basis from {start} to {end} with no \
                 single day variations. If there are exceptions such as holiday service dates \
                 please ensure they are listed in calendar_dates.txt"
            )?,
            Self::InvalidLineEnd { bad_line_end } => write!(
                f,
                "Each line must end with CR LF or LF except for the last line of the file. \
                 This line ends with \"{bad_line_end}\"."
            )?,
            Self::TooFastTravel {
                trip_id,
                prev_stop,
                next_stop,
                distance,
                seconds,
                speed,
            } => {
                write!(
                    f,
                    "High speed travel detected in trip {trip_id}: {prev_stop} to {next_stop}. \
                     {distance:.0} meters in {seconds} seconds."
                )?;
                if let Some(speed) = speed {
                    write!(f, " ({speed:.0} km/h).")?;
                }
            }
            Self::StopWithMultipleRouteTypes {
                stop_name,
                stop_id,
                route_id1,
                route_id2,
            } => write!(
                f,
                "Stop {stop_name} (ID={stop_id}) belongs to both subway (ID={route_id1}) and \
                 bus line (ID={route_id2})."
            )?,
            Self::DuplicateTrip {
                trip_id1,
                route_id1,
                trip_id2,
                route_id2,
            } => write!(
                f,
                "Trip {trip_id1} of route {route_id1} might be duplicated with trip {trip_id2} \
                 of route {route_id2}. They go through the same stops with same service."
            )?,
            Self::OverlappingTripsInSameBlock {
                trip_id1,
                trip_id2,
                block_id,
            } => write!(
                f,
                "Trip {trip_id1} and trip {trip_id2} both are in the same block {block_id} \
                 and have overlapping arrival times."
            )?,
            Self::TransferDistanceTooBig {
                from_stop_id,
                to_stop_id,
                distance,
            } => write!(
                f,
                "Transfer from stop {from_stop_id} to stop {to_stop_id} has a distance of \
                 {distance:.0} meters."
            )?,
            Self::TransferWalkingSpeedTooFast {
                from_stop_id,
                to_stop_id,
                distance,
                transfer_time,
            } => write!(
                f,
                "Riders transfering from stop {from_stop_id} to stop {to_stop_id} would need \
                 to walk {distance:.0} meters in {transfer_time} seconds."
            )?,
            Self::TooManyDaysWithoutService {
                first_day,
                last_day,
                consecutive_days,
            } => write!(
                f,
                "There are {consecutive_days} consecutive days, from {first_day} to \
                 {last_day}, without any scheduled service. Please ensure this is \
                 intentional."
            )?,
            Self::MinimumTransferTimeSetWithInvalidTransferType { transfer_type } => write!(
                f,
                "The field min_transfer_time should only be set when transfer_type is set to \
                 2, but it is set to {transfer_type}."
            )?,
            Self::TooManyConsecutiveStopTimesWithSameTime {
                trip_id,
                number_of_stop_times,
                stop_time,
            } => write!(
                f,
                "Trip {trip_id} has {number_of_stop_times} consecutive stop times all with \
                 the same arrival/departure time: {stop_time}."
            )?,
            Self::OtherProblem { description } => f.write_str(description)?,
        }
        if let Some(reason) = self.reason() {
            write!(f, "\n{reason}")?;
        }
        Ok(())
    }
}

use crate::{
    gtfs::{Columns, Row},
    problems::{Reporter, Severity},
    schedule::{
        Schedule,
        entities::{Entity, RowOutcome, float_cell, format_float, text},
    },
    shared::{
        Coordinate,
        values::{
            is_empty, parse_int_in, validate_timezone, validate_url, validate_yes_no_unknown,
        },
    },
};

pub const LOCATION_STOP: i64 = 0;
pub const LOCATION_STATION: i64 = 1;
pub const LOCATION_ENTRANCE: i64 = 2;
const LOCATION_TYPES: [i64; 5] = [0, 1, 2, 3, 4];

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Stop {
    pub stop_id: String,
    pub stop_name: String,
    pub stop_lat: Option<f64>,
    pub stop_lon: Option<f64>,
    pub stop_desc: String,
    pub zone_id: String,
    pub stop_url: String,
    pub stop_code: String,
    pub location_type: i64,
    pub parent_station: String,
    pub stop_timezone: String,
    pub wheelchair_boarding: String,
    pub extras: Vec<(String, String)>,
    /// Coordinate columns whose value did not parse.
    unparsed: Vec<&'static str>,
}

impl Stop {
    pub fn new(stop_id: &str, name: &str, latitude: f64, longitude: f64) -> Self {
        Self {
            stop_id: stop_id.into(),
            stop_name: name.into(),
            stop_lat: Some(latitude),
            stop_lon: Some(longitude),
            ..Default::default()
        }
    }

    /// `None` unless both components are present.
    pub fn coordinate(&self) -> Option<Coordinate> {
        Some(Coordinate::new(self.stop_lat?, self.stop_lon?))
    }

    pub fn is_station(&self) -> bool {
        self.location_type == LOCATION_STATION
    }

    fn check_required(&self, reporter: &mut Reporter) {
        let entrance_with_parent =
            self.location_type == LOCATION_ENTRANCE && !is_empty(&self.parent_station);
        if is_empty(&self.stop_id) {
            reporter.missing_value("stop_id");
        }
        if is_empty(&self.stop_name) && !entrance_with_parent {
            reporter.missing_value("stop_name");
        }
        for (column, value) in [("stop_lat", self.stop_lat), ("stop_lon", self.stop_lon)] {
            if value.is_none() && !self.unparsed.contains(&column) {
                reporter.missing_value(column);
            }
        }
    }
}

impl Entity for Stop {
    const NAME: &'static str = "Stop";
    const COLUMNS: Columns = Columns {
        required: &["stop_id", "stop_name", "stop_lat", "stop_lon"],
        optional: &[
            "stop_desc",
            "zone_id",
            "stop_url",
            "stop_code",
            "location_type",
            "parent_station",
            "stop_timezone",
            "wheelchair_boarding",
        ],
        deprecated: &[],
    };

    fn from_row(row: &Row, reporter: &mut Reporter) -> RowOutcome<Self> {
        let mut unparsed = Vec::new();
        let latitude = float_cell(row, "stop_lat", reporter);
        if latitude.is_invalid() {
            unparsed.push("stop_lat");
        }
        let longitude = float_cell(row, "stop_lon", reporter);
        if longitude.is_invalid() {
            unparsed.push("stop_lon");
        }
        let location_type = parse_int_in(
            row.get("location_type"),
            &LOCATION_TYPES,
            Some(LOCATION_STOP),
            true,
            "location_type",
            reporter,
        )
        .unwrap_or(LOCATION_STOP);

        RowOutcome::Accepted(Self {
            stop_id: text(row, "stop_id"),
            stop_name: text(row, "stop_name"),
            stop_lat: latitude.value(),
            stop_lon: longitude.value(),
            stop_desc: text(row, "stop_desc"),
            zone_id: text(row, "zone_id"),
            stop_url: text(row, "stop_url"),
            stop_code: text(row, "stop_code"),
            location_type,
            parent_station: text(row, "parent_station"),
            stop_timezone: text(row, "stop_timezone"),
            wheelchair_boarding: text(row, "wheelchair_boarding"),
            extras: row.extras(&Self::COLUMNS),
            unparsed,
        })
    }

    fn validate_before_add(&self, reporter: &mut Reporter) -> bool {
        self.check_required(reporter);

        if let Some(latitude) = self.stop_lat
            && !(-90.0..=90.0).contains(&latitude)
        {
            reporter.invalid_value("stop_lat", latitude);
        }
        if let Some(longitude) = self.stop_lon
            && !(-180.0..=180.0).contains(&longitude)
        {
            reporter.invalid_value("stop_lon", longitude);
        }
        validate_url(&self.stop_url, "stop_url", reporter);

        validate_timezone(&self.stop_timezone, "stop_timezone", reporter);
        if !is_empty(&self.parent_station) && !is_empty(&self.stop_timezone) {
            reporter.invalid_value_as(
                "stop_timezone",
                &self.stop_timezone,
                Some("a stop having a parent stop must not have a stop_timezone".into()),
                Severity::Warning,
            );
        }
        validate_yes_no_unknown(&self.wheelchair_boarding, "wheelchair_boarding", reporter);

        if let Some(coordinate) = self.coordinate()
            && coordinate.is_near_origin()
        {
            reporter.invalid_value_as(
                "stop_lat",
                coordinate.latitude,
                Some("Stop location too close to 0, 0".into()),
                Severity::Warning,
            );
        }
        if !is_empty(&self.stop_desc)
            && !is_empty(&self.stop_name)
            && self.stop_desc.trim().to_lowercase() == self.stop_name.trim().to_lowercase()
        {
            reporter.invalid_value_as(
                "stop_desc",
                &self.stop_desc,
                Some("stop_desc should not be the same as stop_name".into()),
                Severity::Warning,
            );
        }
        if self.is_station() && !is_empty(&self.parent_station) {
            reporter.invalid_value_because(
                "parent_station",
                &self.parent_station,
                "Stop row with location_type=1 (a station) must not have a parent_station",
            );
        }
        if self.location_type == LOCATION_ENTRANCE && is_empty(&self.parent_station) {
            reporter.invalid_value_because(
                "parent_station",
                &self.parent_station,
                "Stop row with location_type=2 (an entrance) must have a parent_station",
            );
        }
        true
    }

    fn add_to_schedule(self, schedule: &mut Schedule, reporter: &mut Reporter) {
        if is_empty(&self.stop_id) {
            return;
        }
        if schedule.stops.contains(&self.stop_id) {
            reporter.duplicate_id("stop_id", &self.stop_id);
            return;
        }
        self.validate_after_add(schedule, reporter);
        if !is_empty(&self.zone_id) {
            schedule.fare_zones.insert(self.zone_id.clone());
        }
        let id = self.stop_id.clone();
        schedule.stops.insert(&id, self);
    }

    fn value(&self, column: &str) -> Option<String> {
        let value = match column {
            "stop_id" => self.stop_id.clone(),
            "stop_name" => self.stop_name.clone(),
            "stop_lat" => format_float(self.stop_lat),
            "stop_lon" => format_float(self.stop_lon),
            "stop_desc" => self.stop_desc.clone(),
            "zone_id" => self.zone_id.clone(),
            "stop_url" => self.stop_url.clone(),
            "stop_code" => self.stop_code.clone(),
            "location_type" => self.location_type.to_string(),
            "parent_station" => self.parent_station.clone(),
            "stop_timezone" => self.stop_timezone.clone(),
            "wheelchair_boarding" => self.wheelchair_boarding.clone(),
            _ => return None,
        };
        Some(value)
    }

    fn extras(&self) -> &[(String, String)] {
        &self.extras
    }
}

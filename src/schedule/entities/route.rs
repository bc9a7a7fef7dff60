use crate::{
    gtfs::{Columns, Row},
    problems::{Reporter, Severity},
    schedule::{
        Schedule,
        entities::{Entity, RowOutcome, format_int, non_negative_cell, text},
    },
    shared::values::{
        MIN_COLOR_CONTRAST, color_luminance, is_empty, is_valid_hex_color, validate_url,
        validate_yes_no_unknown,
    },
};

pub const ROUTE_TYPE_SUBWAY: i64 = 1;
pub const ROUTE_TYPE_BUS: i64 = 3;

/// Route types with their name and the fastest plausible speed in km/h.
pub const ROUTE_TYPES: [(i64, &str, f64); 8] = [
    (0, "Tram", 100.0),
    (1, "Subway", 150.0),
    (2, "Rail", 300.0),
    (3, "Bus", 100.0),
    (4, "Ferry", 80.0),
    (5, "Cable Car", 50.0),
    (6, "Gondola", 50.0),
    (7, "Funicular", 50.0),
];

/// Maximum speed for `route_type`, unknown types are treated as trams.
pub fn max_speed(route_type: Option<i64>) -> f64 {
    route_type
        .and_then(|route_type| ROUTE_TYPES.iter().find(|(id, _, _)| *id == route_type))
        .map_or(ROUTE_TYPES[0].2, |(_, _, speed)| *speed)
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Route {
    pub route_id: String,
    pub agency_id: String,
    pub route_short_name: String,
    pub route_long_name: String,
    pub route_desc: String,
    pub route_type: Option<i64>,
    pub route_url: String,
    pub route_color: String,
    pub route_text_color: String,
    pub bikes_allowed: String,
    pub extras: Vec<(String, String)>,
    /// Trips running on this route, in insertion order.
    pub trip_ids: Vec<String>,
    route_type_unparsed: bool,
}

impl Route {
    pub fn new(route_id: &str, short_name: &str, long_name: &str, route_type: i64) -> Self {
        Self {
            route_id: route_id.into(),
            route_short_name: short_name.into(),
            route_long_name: long_name.into(),
            route_type: Some(route_type),
            ..Default::default()
        }
    }

    fn check_names(&self, reporter: &mut Reporter) {
        if is_empty(&self.route_short_name) && is_empty(&self.route_long_name) {
            reporter.invalid_value_because(
                "route_short_name",
                &self.route_short_name,
                "Both route_short_name and route_long name are blank.",
            );
        }
        if self.route_short_name.chars().count() > 6 {
            reporter.invalid_value_as(
                "route_short_name",
                &self.route_short_name,
                Some(
                    "This route_short_name is relatively long, which probably means that it \
                     contains a place name.  You should only use this field to hold a short \
                     code that riders use to identify a route.  If this route doesn't have \
                     such a code, it's OK to leave this field empty."
                        .into(),
                ),
                Severity::Warning,
            );
        }
        if !is_empty(&self.route_short_name) && !is_empty(&self.route_long_name) {
            let short_name = self.route_short_name.trim().to_lowercase();
            let long_name = self.route_long_name.trim().to_lowercase();
            let contains_short_name = [' ', '(', '-']
                .iter()
                .any(|separator| long_name.starts_with(&format!("{short_name}{separator}")));
            if contains_short_name {
                reporter.invalid_value_as(
                    "route_long_name",
                    &self.route_long_name,
                    Some(
                        "route_long_name shouldn't contain the route_short_name value, as \
                         both fields are often displayed side-by-side."
                            .into(),
                    ),
                    Severity::Warning,
                );
            }
            if long_name == short_name {
                reporter.invalid_value_as(
                    "route_long_name",
                    &self.route_long_name,
                    Some(
                        "route_long_name shouldn't be the same the route_short_name value, \
                         as both fields are often displayed side-by-side.  It's OK to omit \
                         either the short or long name (but not both)."
                            .into(),
                    ),
                    Severity::Warning,
                );
            }
        }
        if !is_empty(&self.route_desc)
            && (self.route_desc == self.route_short_name
                || self.route_desc == self.route_long_name)
        {
            reporter.invalid_value_because(
                "route_desc",
                &self.route_desc,
                "route_desc shouldn't be the same as route_short_name or route_long_name",
            );
        }
    }

    fn check_colors(&self, reporter: &mut Reporter) {
        let mut color = self.route_color.as_str();
        if !color.is_empty() && !is_valid_hex_color(color) {
            reporter.invalid_value_because(
                "route_color",
                color,
                "route_color should be a valid color description which consists of 6 \
                 hexadecimal characters representing the RGB values. Example: 44AA06",
            );
            color = "";
        }
        let mut text_color = self.route_text_color.as_str();
        if !text_color.is_empty() && !is_valid_hex_color(text_color) {
            reporter.invalid_value_because(
                "route_text_color",
                text_color,
                "route_text_color should be a valid color description, which consists of 6 \
                 hexadecimal characters representing the RGB values. Example: 44AA06",
            );
            text_color = "";
        }
        let background = color_luminance(if color.is_empty() { "FFFFFF" } else { color });
        let foreground = color_luminance(if text_color.is_empty() { "000000" } else { text_color });
        if let (Some(background), Some(foreground)) = (background, foreground)
            && (foreground - background).abs() < MIN_COLOR_CONTRAST
        {
            reporter.invalid_value_as(
                "route_color",
                color,
                Some(
                    "The route_text_color and route_color should be set to contrasting \
                     colors, as they are used as the text and background color \
                     (respectively) for displaying route names.  When left blank, \
                     route_text_color defaults to 000000 (black) and route_color defaults to \
                     FFFFFF (white).  A common source of issues here is setting route_color \
                     to a dark color, while leaving route_text_color set to black.  In this \
                     case, route_text_color should be set to a lighter color like FFFFFF to \
                     ensure a legible contrast between the two."
                        .into(),
                ),
                Severity::Warning,
            );
        }
    }
}

impl Entity for Route {
    const NAME: &'static str = "Route";
    const COLUMNS: Columns = Columns {
        required: &["route_id", "route_short_name", "route_long_name", "route_type"],
        optional: &[
            "agency_id",
            "route_desc",
            "route_url",
            "route_color",
            "route_text_color",
            "bikes_allowed",
        ],
        deprecated: &[],
    };

    fn from_row(row: &Row, reporter: &mut Reporter) -> RowOutcome<Self> {
        let route_type = non_negative_cell(row, "route_type", None, reporter);
        RowOutcome::Accepted(Self {
            route_id: text(row, "route_id"),
            agency_id: text(row, "agency_id"),
            route_short_name: text(row, "route_short_name"),
            route_long_name: text(row, "route_long_name"),
            route_desc: text(row, "route_desc"),
            route_type: route_type.value().map(i64::from),
            route_url: text(row, "route_url"),
            route_color: text(row, "route_color"),
            route_text_color: text(row, "route_text_color"),
            bikes_allowed: text(row, "bikes_allowed"),
            extras: row.extras(&Self::COLUMNS),
            trip_ids: Vec::new(),
            route_type_unparsed: route_type.is_invalid(),
        })
    }

    fn validate_before_add(&self, reporter: &mut Reporter) -> bool {
        if is_empty(&self.route_id) {
            reporter.missing_value("route_id");
        }
        if self.route_type.is_none() && !self.route_type_unparsed {
            reporter.missing_value("route_type");
        }
        self.check_names(reporter);
        if let Some(route_type) = self.route_type
            && !ROUTE_TYPES.iter().any(|(id, _, _)| *id == route_type)
        {
            reporter.invalid_value_as("route_type", route_type, None, Severity::Warning);
        }
        validate_url(&self.route_url, "route_url", reporter);
        self.check_colors(reporter);
        validate_yes_no_unknown(&self.bikes_allowed, "bikes_allowed", reporter);
        true
    }

    fn add_to_schedule(self, schedule: &mut Schedule, reporter: &mut Reporter) {
        if schedule.routes.contains(&self.route_id) {
            reporter.duplicate_id("route_id", &self.route_id);
            return;
        }
        let single_agency = schedule.agencies.len() == 1;
        if !schedule.agencies.contains(&self.agency_id)
            && !(is_empty(&self.agency_id) && single_agency)
        {
            reporter.invalid_value_because(
                "agency_id",
                &self.agency_id,
                "Route uses an unknown agency_id.",
            );
            return;
        }
        self.validate_after_add(schedule, reporter);
        let id = self.route_id.clone();
        schedule.routes.insert(&id, self);
    }

    fn value(&self, column: &str) -> Option<String> {
        let value = match column {
            "route_id" => self.route_id.clone(),
            "agency_id" => self.agency_id.clone(),
            "route_short_name" => self.route_short_name.clone(),
            "route_long_name" => self.route_long_name.clone(),
            "route_desc" => self.route_desc.clone(),
            "route_type" => format_int(self.route_type),
            "route_url" => self.route_url.clone(),
            "route_color" => self.route_color.clone(),
            "route_text_color" => self.route_text_color.clone(),
            "bikes_allowed" => self.bikes_allowed.clone(),
            _ => return None,
        };
        Some(value)
    }

    fn extras(&self) -> &[(String, String)] {
        &self.extras
    }
}

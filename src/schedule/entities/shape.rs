use crate::{
    gtfs::{Columns, Row},
    problems::{Reporter, Severity},
    schedule::{
        Schedule,
        entities::{Entity, Parsed, RowOutcome, float_cell, format_float},
    },
    shared::{
        Coordinate,
        values::{is_empty, parse_non_negative_int},
    },
};

const POSITIVE_NUMBER: &str = "This value should be a positive number.";

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ShapePoint {
    pub shape_id: String,
    pub shape_pt_lat: f64,
    pub shape_pt_lon: f64,
    pub shape_pt_sequence: u32,
    pub shape_dist_traveled: Option<f64>,
    pub extras: Vec<(String, String)>,
}

impl ShapePoint {
    pub fn new(shape_id: &str, latitude: f64, longitude: f64, sequence: u32) -> Self {
        Self {
            shape_id: shape_id.into(),
            shape_pt_lat: latitude,
            shape_pt_lon: longitude,
            shape_pt_sequence: sequence,
            ..Default::default()
        }
    }

    pub fn coordinate(&self) -> Coordinate {
        Coordinate::new(self.shape_pt_lat, self.shape_pt_lon)
    }
}

impl Entity for ShapePoint {
    const NAME: &'static str = "ShapePoint";
    const COLUMNS: Columns = Columns {
        required: &["shape_id", "shape_pt_lat", "shape_pt_lon", "shape_pt_sequence"],
        optional: &["shape_dist_traveled"],
        deprecated: &[],
    };

    /// Rows are checked in file order and the first problem rejects the
    /// point.
    fn from_row(row: &Row, reporter: &mut Reporter) -> RowOutcome<Self> {
        let shape_id = row.get("shape_id");
        if is_empty(shape_id) {
            reporter.missing_value("shape_id");
            return RowOutcome::Skip;
        }

        let sequence = row.get("shape_pt_sequence");
        let Some(shape_pt_sequence) = parse_non_negative_int(sequence, reporter) else {
            reporter.invalid_value_because(
                "shape_pt_sequence",
                sequence,
                "Value should be a number (0 or higher)",
            );
            return RowOutcome::Skip;
        };

        let mut coordinate = [0.0; 2];
        for (slot, (column, limit)) in [("shape_pt_lat", 90.0), ("shape_pt_lon", 180.0)]
            .into_iter()
            .enumerate()
        {
            match float_cell(row, column, reporter) {
                Parsed::Value(value) if value.abs() <= limit => coordinate[slot] = value,
                Parsed::Value(value) => {
                    reporter.invalid_value(column, value);
                    return RowOutcome::Skip;
                }
                Parsed::Empty => {
                    reporter.invalid_value(column, "");
                    return RowOutcome::Skip;
                }
                Parsed::Invalid => return RowOutcome::Skip,
            }
        }
        let [shape_pt_lat, shape_pt_lon] = coordinate;
        if shape_pt_lat.abs() < 1.0 && shape_pt_lon.abs() < 1.0 {
            reporter.invalid_value_as(
                "shape_pt_lat",
                shape_pt_lat,
                Some(
                    "Point location too close to 0, 0, which means that it's probably an \
                     incorrect location."
                        .into(),
                ),
                Severity::Warning,
            );
            return RowOutcome::Skip;
        }

        let distance = row.get("shape_dist_traveled");
        let shape_dist_traveled = if is_empty(distance) {
            None
        } else {
            match distance.trim().parse::<f64>() {
                Ok(value) if value >= 0.0 => Some(value),
                _ => {
                    reporter.invalid_value_because(
                        "shape_dist_traveled",
                        distance,
                        POSITIVE_NUMBER,
                    );
                    return RowOutcome::Skip;
                }
            }
        };

        RowOutcome::Accepted(Self {
            shape_id: shape_id.to_string(),
            shape_pt_lat,
            shape_pt_lon,
            shape_pt_sequence,
            shape_dist_traveled,
            extras: row.extras(&Self::COLUMNS),
        })
    }

    fn add_to_schedule(self, schedule: &mut Schedule, reporter: &mut Reporter) {
        match schedule.shapes.get_mut(&self.shape_id) {
            Some(shape) => shape.add_point(self, reporter),
            None => {
                let mut shape = Shape::new(&self.shape_id);
                shape.add_point(self, reporter);
                let id = shape.shape_id.clone();
                schedule.shapes.insert(&id, shape);
            }
        }
    }

    fn value(&self, column: &str) -> Option<String> {
        let value = match column {
            "shape_id" => self.shape_id.clone(),
            "shape_pt_lat" => self.shape_pt_lat.to_string(),
            "shape_pt_lon" => self.shape_pt_lon.to_string(),
            "shape_pt_sequence" => self.shape_pt_sequence.to_string(),
            "shape_dist_traveled" => format_float(self.shape_dist_traveled),
            _ => return None,
        };
        Some(value)
    }

    fn extras(&self) -> &[(String, String)] {
        &self.extras
    }
}

/// The path of one or more trips, its points kept in sequence order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Shape {
    pub shape_id: String,
    pub points: Vec<ShapePoint>,
    /// Largest `shape_dist_traveled` of any point, 0 when no point has one.
    pub max_distance: f64,
}

impl Shape {
    pub fn new(shape_id: &str) -> Self {
        Self {
            shape_id: shape_id.into(),
            ..Default::default()
        }
    }

    /// Appends a point after the current last one.
    pub fn add_coordinate(
        &mut self,
        latitude: f64,
        longitude: f64,
        distance: Option<f64>,
        reporter: &mut Reporter,
    ) {
        let sequence = self
            .points
            .last()
            .map_or(0, |point| point.shape_pt_sequence + 1);
        let mut point = ShapePoint::new(&self.shape_id, latitude, longitude, sequence);
        point.shape_dist_traveled = distance;
        self.add_point(point, reporter);
    }

    /// Inserts a point at the position its sequence number calls for,
    /// checking that distances keep increasing along the shape.
    pub fn add_point(&mut self, point: ShapePoint, reporter: &mut Reporter) {
        let sequence = point.shape_pt_sequence;
        let index = self
            .points
            .partition_point(|other| other.shape_pt_sequence <= sequence);

        if self
            .points
            .iter()
            .any(|other| other.shape_pt_sequence == sequence)
        {
            reporter.invalid_value_because(
                "shape_pt_sequence",
                sequence,
                format!(
                    "The sequence number {sequence} occurs more than once in shape {}.",
                    self.shape_id
                ),
            );
        }

        if let Some(distance) = point.shape_dist_traveled {
            let next = self.points.get(index).and_then(|next| next.shape_dist_traveled);
            if let Some(next) = next
                && distance >= next
            {
                reporter.invalid_value_as(
                    "shape_dist_traveled",
                    distance,
                    Some(format!(
                        "Each subsequent point in a shape should have a distance value that \
                         shouldn't be larger than the next ones. In this case, the next \
                         distance was {next:.6}."
                    )),
                    if distance > next {
                        Severity::Error
                    } else {
                        Severity::Warning
                    },
                );
            }
            let previous = index
                .checked_sub(1)
                .and_then(|previous| self.points[previous].shape_dist_traveled);
            if let Some(previous) = previous
                && distance <= previous
            {
                reporter.invalid_value_as(
                    "shape_dist_traveled",
                    distance,
                    Some(format!(
                        "Each subsequent point in a shape should have a distance value that's \
                         at least as large as the previous ones. In this case, the previous \
                         distance was {previous:.6}."
                    )),
                    if distance < previous {
                        Severity::Error
                    } else {
                        Severity::Warning
                    },
                );
            }
            if distance > self.max_distance {
                self.max_distance = distance;
            }
        }

        self.points.insert(index, point);
    }

    pub fn clear_points(&mut self) {
        self.points.clear();
        self.max_distance = 0.0;
    }

    /// Position on the shape at `distance` traveled, interpolated between
    /// the surrounding points. Returns the position with the distance it was
    /// clamped to, or `None` when the points carry no usable distances.
    pub fn point_with_distance_traveled(&self, distance: f64) -> Option<(Coordinate, f64)> {
        let distances: Vec<f64> = self
            .points
            .iter()
            .map(|point| point.shape_dist_traveled)
            .collect::<Option<_>>()?;
        let (first, last) = (self.points.first()?, self.points.last()?);
        if distance <= distances[0] {
            return Some((first.coordinate(), distances[0]));
        }
        if distance >= distances[distances.len() - 1] {
            return Some((last.coordinate(), distances[distances.len() - 1]));
        }

        let index = distances.partition_point(|value| *value <= distance);
        let (before, after) = (&self.points[index - 1], &self.points[index]);
        let (start, end) = (distances[index - 1], distances[index]);
        let length = end - start;
        if length == 0.0 {
            return None;
        }
        let fraction = (distance - start) / length;
        Some((before.coordinate().lerp(&after.coordinate(), fraction), distance))
    }

    fn check(&self, reporter: &mut Reporter) {
        if is_empty(&self.shape_id) {
            reporter.missing_value("shape_id");
        }
        if self.points.is_empty() {
            reporter.other(
                format!("The shape with shape_id \"{}\" contains no points.", self.shape_id),
                Severity::Warning,
            );
        }
    }
}

impl Entity for Shape {
    const NAME: &'static str = "Shape";
    const COLUMNS: Columns = ShapePoint::COLUMNS;

    /// A row on its own makes a shape of a single point.
    fn from_row(row: &Row, reporter: &mut Reporter) -> RowOutcome<Self> {
        match ShapePoint::from_row(row, reporter) {
            RowOutcome::Accepted(point) => RowOutcome::Accepted(Self {
                shape_id: point.shape_id.clone(),
                max_distance: point.shape_dist_traveled.unwrap_or_default(),
                points: vec![point],
            }),
            RowOutcome::Skip => RowOutcome::Skip,
        }
    }

    fn validate_after_add(&self, _schedule: &Schedule, reporter: &mut Reporter) {
        self.check(reporter);
    }

    fn validate(&self, _schedule: Option<&Schedule>, reporter: &mut Reporter) -> bool {
        self.check(reporter);
        true
    }

    fn add_to_schedule(self, schedule: &mut Schedule, reporter: &mut Reporter) {
        if schedule.shapes.contains(&self.shape_id) {
            reporter.duplicate_id("shape_id", &self.shape_id);
            return;
        }
        self.validate_after_add(schedule, reporter);
        let id = self.shape_id.clone();
        schedule.shapes.insert(&id, self);
    }

    fn value(&self, column: &str) -> Option<String> {
        match column {
            "shape_id" => Some(self.shape_id.clone()),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::problems::Collector;

    fn point(sequence: u32, distance: f64) -> ShapePoint {
        let mut point = ShapePoint::new("SH1", 48.2 + f64::from(sequence) * 0.001, 16.3, sequence);
        point.shape_dist_traveled = Some(distance);
        point
    }

    #[test]
    fn points_are_kept_in_sequence_order() {
        let mut collector = Collector::new();
        let mut reporter = Reporter::new(&mut collector);
        let mut shape = Shape::new("SH1");
        shape.add_point(point(3, 30.0), &mut reporter);
        shape.add_point(point(1, 10.0), &mut reporter);
        shape.add_point(point(2, 20.0), &mut reporter);

        let sequences: Vec<u32> = shape.points.iter().map(|p| p.shape_pt_sequence).collect();
        assert_eq!(sequences, [1, 2, 3]);
        assert_eq!(shape.max_distance, 30.0);
        assert!(collector.is_empty());
    }

    #[test]
    fn decreasing_distance_is_an_error() {
        let mut collector = Collector::new();
        let mut reporter = Reporter::new(&mut collector);
        let mut shape = Shape::new("SH1");
        shape.add_point(point(1, 10.0), &mut reporter);
        shape.add_point(point(2, 5.0), &mut reporter);
        assert_eq!(collector.error_count(), 1);
        assert_eq!(collector.problems()[0].name(), "InvalidValue");
    }

    #[test]
    fn equal_distance_is_a_warning() {
        let mut collector = Collector::new();
        let mut reporter = Reporter::new(&mut collector);
        let mut shape = Shape::new("SH1");
        shape.add_point(point(1, 10.0), &mut reporter);
        shape.add_point(point(2, 10.0), &mut reporter);
        assert_eq!(collector.error_count(), 0);
        assert_eq!(collector.warning_count(), 1);
        assert_eq!(collector.problems()[0].name(), "InvalidValue");
    }

    #[test]
    fn interpolates_between_points() {
        let mut collector = Collector::new();
        let mut reporter = Reporter::new(&mut collector);
        let mut shape = Shape::new("SH1");
        shape.add_coordinate(48.0, 16.0, Some(0.0), &mut reporter);
        shape.add_coordinate(49.0, 17.0, Some(100.0), &mut reporter);

        let (middle, distance) = shape.point_with_distance_traveled(25.0).unwrap();
        assert!((middle.latitude - 48.25).abs() < 1e-9);
        assert!((middle.longitude - 16.25).abs() < 1e-9);
        assert_eq!(distance, 25.0);

        let (end, distance) = shape.point_with_distance_traveled(500.0).unwrap();
        assert_eq!(end, Coordinate::new(49.0, 17.0));
        assert_eq!(distance, 100.0);
    }
}

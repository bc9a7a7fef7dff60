use crate::{
    gtfs::{Columns, Row},
    problems::{ProblemKind, Reporter, Severity},
    schedule::{
        Schedule,
        entities::{Entity, RowOutcome, text},
    },
    shared::values::{is_empty, parse_non_negative_int},
};

/// Meters per second of someone walking very fast.
const FAST_WALKING_SPEED: f64 = 2.0;
const TRANSFER_DISTANCE_WARNING: f64 = 2000.0;
const TRANSFER_DISTANCE_ERROR: f64 = 10000.0;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Transfer {
    pub from_stop_id: String,
    pub to_stop_id: String,
    pub transfer_type: String,
    pub min_transfer_time: String,
    pub extras: Vec<(String, String)>,
}

impl Transfer {
    pub fn new(from_stop_id: &str, to_stop_id: &str, transfer_type: u8) -> Self {
        Self {
            from_stop_id: from_stop_id.into(),
            to_stop_id: to_stop_id.into(),
            transfer_type: transfer_type.to_string(),
            ..Default::default()
        }
    }

    pub fn key(&self) -> (String, String) {
        (self.from_stop_id.clone(), self.to_stop_id.clone())
    }

    /// Parsed `transfer_type`, blank meaning a recommended transfer (0).
    pub fn transfer_type_value(&self) -> Option<i64> {
        if is_empty(&self.transfer_type) {
            return Some(0);
        }
        self.transfer_type.trim().parse().ok()
    }

    pub fn min_transfer_time_value(&self) -> Option<i64> {
        self.min_transfer_time.trim().parse().ok()
    }

    /// Distance between the two stops, `None` unless both are known and
    /// located.
    pub fn distance(&self, schedule: &Schedule) -> Option<f64> {
        let from = schedule.stops.get(&self.from_stop_id)?.coordinate()?;
        let to = schedule.stops.get(&self.to_stop_id)?.coordinate()?;
        Some(from.approximate_distance(&to).as_meters())
    }

    fn check_transfer_type(&self, reporter: &mut Reporter) -> bool {
        if is_empty(&self.transfer_type) {
            return true;
        }
        match parse_non_negative_int(&self.transfer_type, reporter) {
            Some(0..=3) => true,
            _ => {
                reporter.invalid_value("transfer_type", &self.transfer_type);
                false
            }
        }
    }

    fn check_min_transfer_time(&self, reporter: &mut Reporter) -> bool {
        if is_empty(&self.min_transfer_time) {
            return true;
        }
        if self.transfer_type_value() != Some(2) {
            let transfer_type = self
                .transfer_type_value()
                .map_or(self.transfer_type.clone(), |value| value.to_string());
            reporter.report(ProblemKind::MinimumTransferTimeSetWithInvalidTransferType {
                transfer_type,
            });
        }
        let Some(seconds) = self.min_transfer_time_value() else {
            reporter.invalid_value_because(
                "min_transfer_time",
                &self.min_transfer_time,
                "If present, this field should contain an integer value.",
            );
            return false;
        };
        if seconds < 0 {
            reporter.invalid_value_because(
                "min_transfer_time",
                seconds,
                "This field cannot contain a negative value.",
            );
        } else if seconds >= 24 * 3600 {
            reporter.invalid_value_because(
                "min_transfer_time",
                seconds,
                "The value is very large for a transfer time and most likely indicates an \
                 error.",
            );
        } else if seconds >= 3 * 3600 {
            reporter.invalid_value_as(
                "min_transfer_time",
                seconds,
                Some(
                    "The value is large for a transfer time and most likely indicates an error."
                        .into(),
                ),
                Severity::Warning,
            );
        }
        true
    }

    fn check_distance(&self, distance: f64, reporter: &mut Reporter) {
        let severity = if distance > TRANSFER_DISTANCE_ERROR {
            Severity::Error
        } else if distance > TRANSFER_DISTANCE_WARNING {
            Severity::Warning
        } else {
            return;
        };
        reporter.report_as(
            ProblemKind::TransferDistanceTooBig {
                from_stop_id: self.from_stop_id.clone(),
                to_stop_id: self.to_stop_id.clone(),
                distance,
            },
            severity,
        );
    }

    /// Stops less than 240m apart never trigger this.
    fn check_walking_time(&self, distance: f64, reporter: &mut Reporter) {
        let Some(seconds) = self.min_transfer_time_value() else {
            return;
        };
        if seconds < 0 {
            return;
        }
        if ((seconds + 120) as f64) < distance / FAST_WALKING_SPEED {
            reporter.report(ProblemKind::TransferWalkingSpeedTooFast {
                from_stop_id: self.from_stop_id.clone(),
                to_stop_id: self.to_stop_id.clone(),
                distance,
                transfer_time: seconds,
            });
        }
    }
}

impl Entity for Transfer {
    const NAME: &'static str = "Transfer";
    const COLUMNS: Columns = Columns {
        required: &["from_stop_id", "to_stop_id", "transfer_type"],
        optional: &["min_transfer_time"],
        deprecated: &[],
    };

    fn from_row(row: &Row, _reporter: &mut Reporter) -> RowOutcome<Self> {
        RowOutcome::Accepted(Self {
            from_stop_id: text(row, "from_stop_id"),
            to_stop_id: text(row, "to_stop_id"),
            transfer_type: text(row, "transfer_type"),
            min_transfer_time: text(row, "min_transfer_time"),
            extras: row.extras(&Self::COLUMNS),
        })
    }

    /// Blocks transfers without both stop ids or with an unusable type or
    /// time.
    fn validate_before_add(&self, reporter: &mut Reporter) -> bool {
        let mut valid = true;
        if is_empty(&self.from_stop_id) {
            reporter.missing_value("from_stop_id");
            valid = false;
        }
        if is_empty(&self.to_stop_id) {
            reporter.missing_value("to_stop_id");
            valid = false;
        }
        valid &= self.check_transfer_type(reporter);
        valid &= self.check_min_transfer_time(reporter);
        valid
    }

    fn validate_after_add(&self, schedule: &Schedule, reporter: &mut Reporter) {
        let mut known = true;
        for (column, stop_id) in [
            ("from_stop_id", &self.from_stop_id),
            ("to_stop_id", &self.to_stop_id),
        ] {
            if !schedule.stops.contains(stop_id) {
                reporter.invalid_value(column, stop_id);
                known = false;
            }
        }
        if !known {
            return;
        }
        if let Some(distance) = self.distance(schedule) {
            self.check_distance(distance, reporter);
            self.check_walking_time(distance, reporter);
        }
    }

    fn validate(&self, schedule: Option<&Schedule>, reporter: &mut Reporter) -> bool {
        let valid = self.validate_before_add(reporter);
        if valid && let Some(schedule) = schedule {
            self.validate_after_add(schedule, reporter);
        }
        valid
    }

    /// Duplicate stop pairs are reported but still kept.
    fn add_to_schedule(self, schedule: &mut Schedule, reporter: &mut Reporter) {
        let key = self.key();
        if schedule.transfer_keys.contains(&key) {
            reporter.duplicate_ids(
                &["from_stop_id", "to_stop_id"],
                &[&self.from_stop_id, &self.to_stop_id],
                Severity::Warning,
            );
        }
        self.validate_after_add(schedule, reporter);
        schedule.transfer_keys.insert(key);
        schedule.transfers.push(self);
    }

    fn value(&self, column: &str) -> Option<String> {
        let value = match column {
            "from_stop_id" => &self.from_stop_id,
            "to_stop_id" => &self.to_stop_id,
            "transfer_type" => &self.transfer_type,
            "min_transfer_time" => &self.min_transfer_time,
            _ => return None,
        };
        Some(value.clone())
    }

    fn extras(&self) -> &[(String, String)] {
        &self.extras
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::problems::Collector;

    #[test]
    fn min_transfer_time_needs_type_two() {
        let mut collector = Collector::new();
        let mut reporter = Reporter::new(&mut collector);
        let mut transfer = Transfer::new("S1", "S2", 0);
        transfer.min_transfer_time = "300".into();
        assert!(transfer.validate(None, &mut reporter));
        assert_eq!(
            collector.problems()[0].name(),
            "MinimumTransferTimeSetWithInvalidTransferType"
        );
    }

    #[test]
    fn very_long_transfer_time() {
        let mut collector = Collector::new();
        let mut reporter = Reporter::new(&mut collector);
        let mut transfer = Transfer::new("S1", "S2", 2);
        transfer.min_transfer_time = "14400".into();
        transfer.validate(None, &mut reporter);
        assert_eq!(collector.warning_count(), 1);
        assert_eq!(collector.error_count(), 0);
    }

    #[test]
    fn missing_stop_blocks() {
        let mut collector = Collector::new();
        let mut reporter = Reporter::new(&mut collector);
        let transfer = Transfer::new("", "S2", 1);
        assert!(!transfer.validate(None, &mut reporter));
    }
}

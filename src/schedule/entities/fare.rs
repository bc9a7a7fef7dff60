use crate::{
    gtfs::{Columns, Row},
    problems::Reporter,
    schedule::{
        Schedule,
        entities::{Entity, RowOutcome, text},
    },
    shared::values::{is_empty, is_iso_4217},
};

/// A fare from fare_attributes.txt together with the rules that select it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FareAttribute {
    pub fare_id: String,
    pub price: String,
    pub currency_type: String,
    pub payment_method: String,
    pub transfers: String,
    pub transfer_duration: String,
    pub extras: Vec<(String, String)>,
    /// Rules from fare_rules.txt naming this fare, in file order.
    pub rules: Vec<FareRule>,
}

impl FareAttribute {
    pub fn new(fare_id: &str, price: f64, currency_type: &str, payment_method: u8) -> Self {
        Self {
            fare_id: fare_id.into(),
            price: price.to_string(),
            currency_type: currency_type.into(),
            payment_method: payment_method.to_string(),
            ..Default::default()
        }
    }

    pub fn price_value(&self) -> Option<f64> {
        self.price.trim().parse().ok()
    }

    fn check(&self, reporter: &mut Reporter) {
        if is_empty(&self.fare_id) {
            reporter.missing_value("fare_id");
        }

        if is_empty(&self.price) {
            reporter.missing_value("price");
        } else if self.price_value().is_none_or(|price| price < 0.0) {
            reporter.invalid_value("price", &self.price);
        }

        if is_empty(&self.currency_type) {
            reporter.missing_value("currency_type");
        } else if !is_iso_4217(&self.currency_type) {
            reporter.invalid_value("currency_type", &self.currency_type);
        }

        if is_empty(&self.payment_method) {
            reporter.missing_value("payment_method");
        } else if !matches!(self.payment_method.trim().parse::<i64>(), Ok(0 | 1)) {
            reporter.invalid_value("payment_method", &self.payment_method);
        }

        if !is_empty(&self.transfers)
            && !matches!(self.transfers.trim().parse::<i64>(), Ok(0..=2))
        {
            reporter.invalid_value("transfers", &self.transfers);
        }

        let duration = self.transfer_duration.trim().parse::<i64>();
        if !is_empty(&self.transfer_duration) && !matches!(duration, Ok(duration) if duration >= 0) {
            reporter.invalid_value("transfer_duration", &self.transfer_duration);
        }
    }
}

impl Entity for FareAttribute {
    const NAME: &'static str = "FareAttribute";
    const COLUMNS: Columns = Columns {
        required: &[
            "fare_id",
            "price",
            "currency_type",
            "payment_method",
            "transfers",
        ],
        optional: &["transfer_duration"],
        deprecated: &[],
    };

    fn from_row(row: &Row, _reporter: &mut Reporter) -> RowOutcome<Self> {
        RowOutcome::Accepted(Self {
            fare_id: text(row, "fare_id"),
            price: text(row, "price"),
            currency_type: text(row, "currency_type"),
            payment_method: text(row, "payment_method"),
            transfers: text(row, "transfers"),
            transfer_duration: text(row, "transfer_duration"),
            extras: row.extras(&Self::COLUMNS),
            rules: Vec::new(),
        })
    }

    fn validate_before_add(&self, reporter: &mut Reporter) -> bool {
        self.check(reporter);
        true
    }

    fn add_to_schedule(self, schedule: &mut Schedule, reporter: &mut Reporter) {
        if schedule.fares.contains(&self.fare_id) {
            reporter.duplicate_id("fare_id", &self.fare_id);
            return;
        }
        let id = self.fare_id.clone();
        schedule.fares.insert(&id, self);
    }

    fn value(&self, column: &str) -> Option<String> {
        let value = match column {
            "fare_id" => &self.fare_id,
            "price" => &self.price,
            "currency_type" => &self.currency_type,
            "payment_method" => &self.payment_method,
            "transfers" => &self.transfers,
            "transfer_duration" => &self.transfer_duration,
            _ => return None,
        };
        Some(value.clone())
    }

    fn extras(&self) -> &[(String, String)] {
        &self.extras
    }
}

/// Selects the fare for itineraries on a route or between fare zones.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FareRule {
    pub fare_id: String,
    pub route_id: String,
    pub origin_id: String,
    pub destination_id: String,
    pub contains_id: String,
    pub extras: Vec<(String, String)>,
}

impl FareRule {
    pub fn new(fare_id: &str) -> Self {
        Self {
            fare_id: fare_id.into(),
            ..Default::default()
        }
    }
}

impl Entity for FareRule {
    const NAME: &'static str = "FareRule";
    const COLUMNS: Columns = Columns {
        required: &["fare_id"],
        optional: &["route_id", "origin_id", "destination_id", "contains_id"],
        deprecated: &[],
    };

    fn from_row(row: &Row, _reporter: &mut Reporter) -> RowOutcome<Self> {
        RowOutcome::Accepted(Self {
            fare_id: text(row, "fare_id"),
            route_id: text(row, "route_id"),
            origin_id: text(row, "origin_id"),
            destination_id: text(row, "destination_id"),
            contains_id: text(row, "contains_id"),
            extras: row.extras(&Self::COLUMNS),
        })
    }

    fn add_to_schedule(self, schedule: &mut Schedule, reporter: &mut Reporter) {
        if is_empty(&self.fare_id) {
            reporter.missing_value("fare_id");
            return;
        }
        if !self.route_id.is_empty() && !schedule.routes.contains(&self.route_id) {
            reporter.invalid_value("route_id", &self.route_id);
        }
        for (column, zone) in [
            ("origin_id", &self.origin_id),
            ("destination_id", &self.destination_id),
            ("contains_id", &self.contains_id),
        ] {
            if !zone.is_empty() && !schedule.fare_zones.contains(zone.as_str()) {
                reporter.invalid_value(column, zone);
            }
        }
        match schedule.fares.get_mut(&self.fare_id) {
            Some(fare) => fare.rules.push(self),
            None => reporter.invalid_value_because(
                "fare_id",
                &self.fare_id,
                "(This fare_id doesn't correspond to any of the IDs defined in the fare \
                 attributes.)",
            ),
        }
    }

    fn value(&self, column: &str) -> Option<String> {
        let value = match column {
            "fare_id" => &self.fare_id,
            "route_id" => &self.route_id,
            "origin_id" => &self.origin_id,
            "destination_id" => &self.destination_id,
            "contains_id" => &self.contains_id,
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

    fn names(fare: &FareAttribute) -> Vec<(String, Option<String>)> {
        let mut collector = Collector::new();
        let mut reporter = Reporter::new(&mut collector);
        fare.validate(None, &mut reporter);
        collector
            .problems()
            .iter()
            .map(|p| (p.name().to_string(), p.kind.column_name().map(str::to_string)))
            .collect()
    }

    #[test]
    fn valid_fare() {
        let fare = FareAttribute::new("F1", 1.5, "EUR", 0);
        assert!(names(&fare).is_empty());
    }

    #[test]
    fn bad_values() {
        let mut fare = FareAttribute::new("F1", -1.0, "EURO", 3);
        fare.transfers = "5".into();
        fare.transfer_duration = "-60".into();
        let columns: Vec<String> = names(&fare).into_iter().filter_map(|(_, c)| c).collect();
        assert_eq!(
            columns,
            ["price", "currency_type", "payment_method", "transfers", "transfer_duration"]
        );
    }
}

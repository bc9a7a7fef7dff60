use chrono::NaiveDate;

use crate::{
    gtfs::{Columns, Row},
    problems::Reporter,
    schedule::{
        Schedule,
        entities::{Entity, RowOutcome, check_required, text},
    },
    shared::{
        PrimarySubtagParser, parse_date, validate_date, validate_language,
        values::validate_url,
    },
};

/// Publisher details and validity window from feed_info.txt.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeedInfo {
    pub feed_publisher_name: String,
    pub feed_publisher_url: String,
    pub feed_lang: String,
    pub feed_start_date: String,
    pub feed_end_date: String,
    pub feed_version: String,
    pub extras: Vec<(String, String)>,
}

impl FeedInfo {
    pub fn new(publisher_name: &str, publisher_url: &str, lang: &str) -> Self {
        Self {
            feed_publisher_name: publisher_name.into(),
            feed_publisher_url: publisher_url.into(),
            feed_lang: lang.into(),
            ..Default::default()
        }
    }

    pub fn start_date(&self) -> Option<NaiveDate> {
        parse_date(self.feed_start_date.trim())
    }

    pub fn end_date(&self) -> Option<NaiveDate> {
        parse_date(self.feed_end_date.trim())
    }

    fn check_dates(&self, reporter: &mut Reporter) {
        let start = validate_date(&self.feed_start_date, "feed_start_date", reporter);
        let end = validate_date(&self.feed_end_date, "feed_end_date", reporter);
        if let (Some(start), Some(end)) = (start, end)
            && end < start
        {
            reporter.invalid_value_because(
                "feed_end_date",
                &self.feed_end_date,
                format!(
                    "feed_end_date {} is earlier than feed_start_date \"{}\"",
                    self.feed_end_date, self.feed_start_date
                ),
            );
        }
    }
}

impl Entity for FeedInfo {
    const NAME: &'static str = "FeedInfo";
    const COLUMNS: Columns = Columns {
        required: &["feed_publisher_name", "feed_publisher_url", "feed_lang"],
        optional: &["feed_start_date", "feed_end_date", "feed_version"],
        deprecated: &[
            ("feed_valid_from", Some("feed_start_date")),
            ("feed_valid_until", Some("feed_end_date")),
            ("feed_timezone", None),
        ],
    };

    fn from_row(row: &Row, _reporter: &mut Reporter) -> RowOutcome<Self> {
        RowOutcome::Accepted(Self {
            feed_publisher_name: text(row, "feed_publisher_name"),
            feed_publisher_url: text(row, "feed_publisher_url"),
            feed_lang: text(row, "feed_lang"),
            feed_start_date: text(row, "feed_start_date"),
            feed_end_date: text(row, "feed_end_date"),
            feed_version: text(row, "feed_version"),
            extras: row.extras(&Self::COLUMNS),
        })
    }

    /// None of these checks block the insertion.
    fn validate_before_add(&self, reporter: &mut Reporter) -> bool {
        check_required(
            &[
                ("feed_publisher_name", &self.feed_publisher_name),
                ("feed_publisher_url", &self.feed_publisher_url),
                ("feed_lang", &self.feed_lang),
            ],
            reporter,
        );
        validate_url(&self.feed_publisher_url, "feed_publisher_url", reporter);
        self.check_dates(reporter);
        true
    }

    fn validate_after_add(&self, schedule: &Schedule, reporter: &mut Reporter) {
        validate_language(schedule.language_parser(), &self.feed_lang, "feed_lang", reporter);
    }

    fn validate(&self, schedule: Option<&Schedule>, reporter: &mut Reporter) -> bool {
        let valid = self.validate_before_add(reporter);
        match schedule {
            Some(schedule) => self.validate_after_add(schedule, reporter),
            None => {
                validate_language(&PrimarySubtagParser, &self.feed_lang, "feed_lang", reporter);
            }
        }
        valid
    }

    fn add_to_schedule(self, schedule: &mut Schedule, reporter: &mut Reporter) {
        self.validate_after_add(schedule, reporter);
        schedule.feed_info = Some(self);
    }

    fn value(&self, column: &str) -> Option<String> {
        let value = match column {
            "feed_publisher_name" => &self.feed_publisher_name,
            "feed_publisher_url" => &self.feed_publisher_url,
            "feed_lang" => &self.feed_lang,
            "feed_start_date" => &self.feed_start_date,
            "feed_end_date" => &self.feed_end_date,
            "feed_version" => &self.feed_version,
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
    fn end_before_start() {
        let mut collector = Collector::new();
        let mut reporter = Reporter::new(&mut collector);
        let mut info = FeedInfo::new("Metro", "https://metro.example", "en");
        info.feed_start_date = "20240601".into();
        info.feed_end_date = "20240101".into();
        assert!(info.validate(None, &mut reporter));
        assert_eq!(collector.problems().len(), 1);
        assert!(collector.problems()[0].message().contains("is earlier than"));
    }

    #[test]
    fn bad_language_and_url() {
        let mut collector = Collector::new();
        let mut reporter = Reporter::new(&mut collector);
        let info = FeedInfo::new("Metro", "metro.example", "en_GB");
        info.validate(None, &mut reporter);
        let columns: Vec<_> = collector
            .problems()
            .iter()
            .filter_map(|p| p.kind.column_name())
            .collect();
        assert_eq!(columns, ["feed_publisher_url", "feed_lang"]);
    }
}

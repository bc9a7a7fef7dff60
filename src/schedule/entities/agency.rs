use crate::{
    gtfs::{Columns, Row},
    problems::Reporter,
    schedule::{
        Schedule,
        entities::{Entity, RowOutcome, check_required, text},
    },
    shared::{
        LanguageParser, PrimarySubtagParser, validate_language,
        values::{validate_email, validate_timezone, validate_url},
    },
};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Agency {
    pub agency_id: String,
    pub agency_name: String,
    pub agency_url: String,
    pub agency_timezone: String,
    pub agency_lang: String,
    pub agency_phone: String,
    pub agency_fare_url: String,
    pub agency_email: String,
    pub extras: Vec<(String, String)>,
}

impl Agency {
    pub fn new(name: &str, url: &str, timezone: &str, id: &str) -> Self {
        Self {
            agency_id: id.into(),
            agency_name: name.into(),
            agency_url: url.into(),
            agency_timezone: timezone.into(),
            ..Default::default()
        }
    }

    /// Checks every field, returns `true` when nothing was reported.
    pub fn check(&self, parser: &dyn LanguageParser, reporter: &mut Reporter) -> bool {
        let mut valid = check_required(
            &[
                ("agency_name", &self.agency_name),
                ("agency_url", &self.agency_url),
                ("agency_timezone", &self.agency_timezone),
            ],
            reporter,
        );
        valid &= validate_url(&self.agency_url, "agency_url", reporter);
        valid &= validate_language(parser, &self.agency_lang, "agency_lang", reporter);
        valid &= validate_timezone(&self.agency_timezone, "agency_timezone", reporter);
        valid &= validate_url(&self.agency_fare_url, "agency_fare_url", reporter);
        valid &= validate_email(&self.agency_email, "agency_email", reporter);
        valid
    }
}

impl Entity for Agency {
    const NAME: &'static str = "Agency";
    const COLUMNS: Columns = Columns {
        required: &["agency_name", "agency_url", "agency_timezone"],
        optional: &[
            "agency_id",
            "agency_lang",
            "agency_phone",
            "agency_fare_url",
            "agency_email",
        ],
        deprecated: &[("agency_ticket_url", Some("agency_fare_url"))],
    };

    fn from_row(row: &Row, _reporter: &mut Reporter) -> RowOutcome<Self> {
        RowOutcome::Accepted(Self {
            agency_id: text(row, "agency_id"),
            agency_name: text(row, "agency_name"),
            agency_url: text(row, "agency_url"),
            agency_timezone: text(row, "agency_timezone"),
            agency_lang: text(row, "agency_lang"),
            agency_phone: text(row, "agency_phone"),
            agency_fare_url: text(row, "agency_fare_url"),
            agency_email: text(row, "agency_email"),
            extras: row.extras(&Self::COLUMNS),
        })
    }

    fn validate_after_add(&self, schedule: &Schedule, reporter: &mut Reporter) {
        self.check(schedule.language_parser(), reporter);
    }

    fn validate(&self, schedule: Option<&Schedule>, reporter: &mut Reporter) -> bool {
        match schedule {
            Some(schedule) => self.check(schedule.language_parser(), reporter),
            None => self.check(&PrimarySubtagParser, reporter),
        }
    }

    fn add_to_schedule(self, schedule: &mut Schedule, reporter: &mut Reporter) {
        if schedule.agencies.contains(&self.agency_id) {
            reporter.duplicate_id("agency_id", &self.agency_id);
            return;
        }
        self.validate_after_add(schedule, reporter);
        let id = self.agency_id.clone();
        schedule.agencies.insert(&id, self);
    }

    fn value(&self, column: &str) -> Option<String> {
        let value = match column {
            "agency_id" => &self.agency_id,
            "agency_name" => &self.agency_name,
            "agency_url" => &self.agency_url,
            "agency_timezone" => &self.agency_timezone,
            "agency_lang" => &self.agency_lang,
            "agency_phone" => &self.agency_phone,
            "agency_fare_url" => &self.agency_fare_url,
            "agency_email" => &self.agency_email,
            _ => return None,
        };
        Some(value.clone())
    }

    fn extras(&self) -> &[(String, String)] {
        &self.extras
    }
}

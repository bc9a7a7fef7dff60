use chrono::NaiveDate;

/// How a feed is loaded.
#[derive(Debug, Clone)]
pub struct LoadOptions {
    /// Runs the schedule validation once everything is loaded.
    pub extra_validation: bool,
    /// stop_times.txt is by far the largest file; skip it when only the
    /// other tables are needed.
    pub load_stop_times: bool,
    pub check_duplicate_trips: bool,
    /// Date the expiration checks compare against, the local date when unset.
    pub today: Option<NaiveDate>,
    /// Smallest run of days without service that is reported.
    pub service_gap_interval: Option<u32>,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            extra_validation: false,
            load_stop_times: true,
            check_duplicate_trips: false,
            today: None,
            service_gap_interval: None,
        }
    }
}

impl LoadOptions {
    /// The options the extra validation runs with.
    pub fn validate_options(&self) -> ValidateOptions {
        ValidateOptions {
            today: self.today,
            service_gap_interval: self.service_gap_interval,
            check_duplicate_trips: self.check_duplicate_trips,
            validate_children: false,
        }
    }
}

/// How a loaded schedule is validated.
#[derive(Debug, Clone)]
pub struct ValidateOptions {
    pub today: Option<NaiveDate>,
    pub service_gap_interval: Option<u32>,
    pub check_duplicate_trips: bool,
    /// Checks every stop and route on its own again. The loader already did
    /// when the schedule was read from a feed.
    pub validate_children: bool,
}

impl Default for ValidateOptions {
    fn default() -> Self {
        Self {
            today: None,
            service_gap_interval: None,
            check_duplicate_trips: false,
            validate_children: true,
        }
    }
}

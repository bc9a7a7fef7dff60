use std::collections::{BTreeSet, HashMap, HashSet};

use crate::{
    gtfs::ValidateOptions,
    problems::{ProblemKind, Reporter, Severity},
    schedule::{
        Schedule,
        entities::{Entity, Route},
    },
    shared::values::is_empty,
};

pub(super) fn agency_timezones(schedule: &Schedule, reporter: &mut Reporter, _: &ValidateOptions) {
    let timezones: BTreeSet<&str> = schedule
        .agencies
        .values()
        .map(|agency| agency.agency_timezone.as_str())
        .collect();
    if timezones.len() > 1 {
        let joined = timezones.into_iter().collect::<Vec<_>>().join("\", \"");
        reporter.invalid_value_because(
            "agency_timezone",
            format!("\"{joined}\""),
            "All agencies should have the same time zone. Please review agency.txt.",
        );
    }
}

/// `feed_lang` has to match every `agency_lang`, unless the feed is
/// multilingual.
pub(super) fn feed_language(schedule: &Schedule, reporter: &mut Reporter, _: &ValidateOptions) {
    let Some(feed_info) = &schedule.feed_info else {
        return;
    };
    let feed_lang = feed_info.feed_lang.trim();
    if feed_lang.is_empty() || feed_lang.eq_ignore_ascii_case("mul") {
        return;
    }
    for agency in schedule.agencies.values() {
        let agency_lang = agency.agency_lang.trim();
        if !agency_lang.is_empty() && !agency_lang.eq_ignore_ascii_case(feed_lang) {
            reporter.invalid_value_because(
                "feed_lang",
                feed_lang,
                format!(
                    "The languages specified in feedinfo.txt and in agency.txt for agency with \
                     ID {} differ.",
                    agency.agency_id
                ),
            );
        }
    }
}

/// Routes sharing the same short and long name, compared case-insensitively.
pub(super) fn route_names(schedule: &Schedule, reporter: &mut Reporter, options: &ValidateOptions) {
    let mut seen: HashMap<(String, String), &Route> = HashMap::new();
    for route in schedule.routes.values() {
        if options.validate_children {
            route.validate(Some(schedule), reporter);
        }
        let short_name = route.route_short_name.trim().to_lowercase();
        let long_name = route.route_long_name.trim().to_lowercase();
        match seen.get(&(short_name.clone(), long_name.clone())) {
            Some(first) => reporter.invalid_value_as(
                "route_long_name",
                &long_name,
                Some(format!(
                    "The same combination of route_short_name and route_long_name shouldn't be \
                     used for more than one route, as it is for the for the two routes with IDs \
                     \"{}\" and \"{}\".",
                    route.route_id, first.route_id
                )),
                Severity::Warning,
            ),
            None => {
                seen.insert((short_name, long_name), route);
            }
        }
    }
}

pub(super) fn route_agency_ids(schedule: &Schedule, reporter: &mut Reporter, _: &ValidateOptions) {
    for route in schedule.routes.values() {
        if !is_empty(&route.agency_id) && !schedule.agencies.contains(&route.agency_id) {
            reporter.report(ProblemKind::InvalidAgencyId {
                column_name: "agency_id".to_string(),
                value: route.agency_id.clone(),
                relating_type: "route".to_string(),
                relating_id: route.route_id.clone(),
            });
        }
    }
}

pub(super) fn unused_shapes(schedule: &Schedule, reporter: &mut Reporter, _: &ValidateOptions) {
    let used: HashSet<&str> = schedule
        .trips
        .values()
        .map(|trip| trip.shape_id.as_str())
        .collect();
    let unused: Vec<&str> = schedule
        .shapes
        .ids()
        .filter(|shape_id| !used.contains(shape_id))
        .collect();
    if !unused.is_empty() {
        reporter.other(
            format!(
                "The shapes with the following shape_ids aren't used by any trips: {}",
                unused.join(", ")
            ),
            Severity::Warning,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        problems::Collector,
        schedule::entities::{Agency, FeedInfo, Shape, Trip},
    };

    #[test]
    fn duplicate_route_names_ignore_case() {
        let mut schedule = Schedule::new();
        schedule.routes.insert("R1", Route::new("R1", "10", "Harbour Line", 3));
        schedule.routes.insert("R2", Route::new("R2", "10 ", "harbour line", 3));
        schedule.routes.insert("R3", Route::new("R3", "11", "Harbour Line", 3));

        let mut collector = Collector::new();
        let mut reporter = Reporter::new(&mut collector);
        let options = ValidateOptions {
            validate_children: false,
            ..Default::default()
        };
        route_names(&schedule, &mut reporter, &options);
        drop(reporter);
        assert_eq!(collector.problems().len(), 1);
        let problem = &collector.problems()[0];
        assert!(problem.is_warning());
        assert!(problem.message().contains("\"R2\" and \"R1\""), "{}", problem.message());
    }

    #[test]
    fn feed_language_must_match_agencies() {
        let mut schedule = Schedule::new();
        let mut agency = Agency::new("Metro", "https://metro.example", "Europe/Vienna", "M");
        agency.agency_lang = "de".into();
        schedule.agencies.insert("M", agency);
        schedule.feed_info = Some(FeedInfo::new("Metro", "https://metro.example", "en"));

        let mut collector = Collector::new();
        let mut reporter = Reporter::new(&mut collector);
        feed_language(&schedule, &mut reporter, &ValidateOptions::default());
        if let Some(feed_info) = schedule.feed_info.as_mut() {
            feed_info.feed_lang = "mul".into();
        }
        feed_language(&schedule, &mut reporter, &ValidateOptions::default());
        drop(reporter);
        assert_eq!(collector.problems().len(), 1);
        assert_eq!(collector.problems()[0].kind.column_name(), Some("feed_lang"));
    }

    #[test]
    fn reports_unused_shapes_in_order() {
        let mut schedule = Schedule::new();
        for id in ["SH1", "SH2", "SH3"] {
            schedule.shapes.insert(id, Shape::new(id));
        }
        let mut trip = Trip::new("T1", "R1", "WEEK");
        trip.shape_id = "SH2".into();
        schedule.trips.insert("T1", trip);

        let mut collector = Collector::new();
        let mut reporter = Reporter::new(&mut collector);
        unused_shapes(&schedule, &mut reporter, &ValidateOptions::default());
        drop(reporter);
        assert_eq!(
            collector.problems()[0].message(),
            "The shapes with the following shape_ids aren't used by any trips: SH1, SH3"
        );
    }
}

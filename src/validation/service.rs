use chrono::{Days, Local, NaiveDate};

use crate::{
    gtfs::ValidateOptions,
    problems::{ProblemKind, Reporter, Severity},
    schedule::{DateRange, Schedule},
};

/// Feeds active at least this long are expected to list some exception.
const SIX_MONTHS: i64 = 182;
const EXPIRATION_WARNING_DAYS: u64 = 60;
/// Gaps are only looked for up to a year after today.
const GAP_HORIZON_DAYS: u64 = 365;

pub(super) fn service_range(
    schedule: &Schedule,
    reporter: &mut Reporter,
    options: &ValidateOptions,
) {
    let today = options.today.unwrap_or_else(|| Local::now().date_naive());
    let Some(range) = schedule.date_range() else {
        reporter.other("This feed has no effective service dates!", Severity::Warning);
        return;
    };

    check_exceptions(schedule, range.start, range.end, reporter);
    check_start_and_expiration(&range, today, reporter);

    if let Some(interval) = options.service_gap_interval {
        // Start a little in the past so that a gap ending today is found,
        // but not one that today already breaks.
        let lookback = Days::new(u64::from(interval.saturating_sub(1)));
        let start = today
            .checked_sub_days(lookback)
            .map_or(range.start, |date| range.start.max(date));
        let end = today
            .checked_add_days(Days::new(GAP_HORIZON_DAYS))
            .map_or(range.end, |date| range.end.min(date));
        check_gaps(schedule, start, end, interval, reporter);
    }
}

fn check_exceptions(
    schedule: &Schedule,
    first: NaiveDate,
    last: NaiveDate,
    reporter: &mut Reporter,
) {
    if (last - first).num_days() < SIX_MONTHS {
        return;
    }
    if schedule
        .service_periods
        .values()
        .any(|period| period.has_exceptions())
    {
        return;
    }
    reporter.report(ProblemKind::NoServiceExceptions {
        start: first.to_string(),
        end: last.to_string(),
    });
}

fn check_start_and_expiration(range: &DateRange, today: NaiveDate, reporter: &mut Reporter) {
    let cutoff = today
        .checked_add_days(Days::new(EXPIRATION_WARNING_DAYS))
        .unwrap_or(today);
    if range.end < cutoff {
        reporter.report(ProblemKind::ExpirationDate {
            expiration: range.end,
            origin_file: range.end_origin.to_string(),
            expired: range.end < today,
        });
    }
    if range.start > today {
        reporter.report(ProblemKind::FutureService {
            start_date: range.start,
            origin_file: range.start_origin.to_string(),
        });
    }
}

/// Reports every run of at least `interval` consecutive days without trips
/// in `[start, end)`, including a run reaching the end of the window.
fn check_gaps(
    schedule: &Schedule,
    start: NaiveDate,
    end: NaiveDate,
    interval: u32,
    reporter: &mut Reporter,
) {
    let mut first_day = start;
    let mut last_day = start;
    let mut run: i64 = 0;
    for day in schedule.date_trips_departures(start, end) {
        if day.trips == 0 {
            if run == 0 {
                first_day = day.date;
            }
            run += 1;
            last_day = day.date;
        } else {
            report_gap(first_day, last_day, run, interval, reporter);
            run = 0;
        }
    }
    report_gap(first_day, last_day, run, interval, reporter);
}

fn report_gap(
    first_day: NaiveDate,
    last_day: NaiveDate,
    run: i64,
    interval: u32,
    reporter: &mut Reporter,
) {
    if run >= i64::from(interval) {
        reporter.report(ProblemKind::TooManyDaysWithoutService {
            first_day,
            last_day,
            consecutive_days: run,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        problems::Collector,
        schedule::entities::{ServicePeriod, StopTime, Trip},
        shared::parse_date,
    };

    fn date(value: &str) -> NaiveDate {
        parse_date(value).unwrap()
    }

    fn options(today: &str, gap: Option<u32>) -> ValidateOptions {
        ValidateOptions {
            today: Some(date(today)),
            service_gap_interval: gap,
            ..Default::default()
        }
    }

    #[test]
    fn expired_feed() {
        let mut schedule = Schedule::new();
        let mut period =
            ServicePeriod::new("WEEK").with_dates(date("20240101"), date("20240131"));
        period.set_weekday_service(true);
        schedule.service_periods.insert("WEEK", period);

        let mut collector = Collector::new();
        let mut reporter = Reporter::new(&mut collector);
        service_range(&schedule, &mut reporter, &options("20240301", None));
        drop(reporter);
        let problems = collector.problems();
        assert_eq!(problems.len(), 1);
        assert!(matches!(
            problems[0].kind,
            ProblemKind::ExpirationDate { expired: true, .. }
        ));
    }

    #[test]
    fn gap_in_the_middle() {
        let mut schedule = Schedule::new();
        let mut period =
            ServicePeriod::new("DAILY").with_dates(date("20240101"), date("20240131"));
        period.set_weekday_service(true);
        period.set_weekend_service(true);
        for day in 10..=14 {
            period.set_date_has_service(date(&format!("202401{day}")), false, None);
        }
        schedule.service_periods.insert("DAILY", period);
        schedule.trips.insert("T1", Trip::new("T1", "R1", "DAILY"));
        schedule.stop_times.insert(StopTime::new("T1", "S1", 1));

        let mut collector = Collector::new();
        let mut reporter = Reporter::new(&mut collector);
        service_range(&schedule, &mut reporter, &options("20240101", Some(5)));
        drop(reporter);
        let gaps: Vec<_> = collector.of_kind("TooManyDaysWithoutService").collect();
        assert_eq!(gaps.len(), 1);
        assert_eq!(
            gaps[0].kind,
            ProblemKind::TooManyDaysWithoutService {
                first_day: date("20240110"),
                last_day: date("20240114"),
                consecutive_days: 5,
            }
        );
    }
}

use std::collections::HashMap;

use chrono::NaiveDate;

use crate::schedule::{
    Schedule,
    entities::{ExceptionType, ServicePeriod},
};

/// First and last service date of a feed and where each of them comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub start_origin: &'static str,
    pub end_origin: &'static str,
}

/// Trips and departures scheduled on one date.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DayCount {
    pub date: NaiveDate,
    pub trips: usize,
    pub departures: usize,
}

impl Schedule {
    /// Service range over every period, narrowed or widened by the dates of
    /// feed_info.txt when it sets them. `None` when no period has a date.
    pub fn date_range(&self) -> Option<DateRange> {
        let mut start: Option<(NaiveDate, &ServicePeriod)> = None;
        let mut end: Option<(NaiveDate, &ServicePeriod)> = None;
        for period in self.service_periods.values() {
            let Some((period_start, period_end)) = period.date_range() else {
                continue;
            };
            if start.is_none_or(|(date, _)| period_start < date) {
                start = Some((period_start, period));
            }
            if end.is_none_or(|(date, _)| period_end > date) {
                end = Some((period_end, period));
            }
        }
        let ((start, first), (end, last)) = (start?, end?);

        let mut range = DateRange {
            start,
            end,
            start_origin: if first.has_date_exception_on(start, ExceptionType::Added) {
                "earliest service exception date in calendar_dates.txt"
            } else {
                "earliest service date in calendar.txt"
            },
            end_origin: if last.has_date_exception_on(end, ExceptionType::Added) {
                "last service exception date in calendar_dates.txt"
            } else {
                "last service date in calendar.txt"
            },
        };
        if let Some(feed_info) = &self.feed_info {
            if let Some(date) = feed_info.start_date() {
                range.start = date;
                range.start_origin = "feed_start_date in feed_info.txt";
            }
            if let Some(date) = feed_info.end_date() {
                range.end = date;
                range.end_origin = "feed_end_date in feed_info.txt";
            }
        }
        Some(range)
    }

    /// For every date in `[start, end)`, the periods active on it.
    pub fn service_periods_active_each_date(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Vec<(NaiveDate, Vec<&ServicePeriod>)> {
        start
            .iter_days()
            .take_while(|date| *date < end)
            .map(|date| {
                let active: Vec<&ServicePeriod> = self
                    .service_periods
                    .values()
                    .filter(|period| period.is_active_on(date))
                    .collect();
                (date, active)
            })
            .collect()
    }

    /// Trips and departures for every date in `[start, end)`. A frequency
    /// based trip counts once per run, and every run departs from all but
    /// its last stop.
    pub fn date_trips_departures(&self, start: NaiveDate, end: NaiveDate) -> Vec<DayCount> {
        let mut per_service: HashMap<&str, (usize, usize)> = HashMap::new();
        for trip in self.trips.values() {
            let runs = trip.runs();
            let stop_times = self.stop_times.count_for_trip(&trip.trip_id);
            let counts = per_service.entry(trip.service_id.as_str()).or_default();
            counts.0 += runs;
            counts.1 += stop_times.saturating_sub(1) * runs;
        }

        self.service_periods_active_each_date(start, end)
            .into_iter()
            .map(|(date, periods)| {
                let (trips, departures) = periods
                    .iter()
                    .filter_map(|period| per_service.get(period.service_id.as_str()))
                    .fold((0, 0), |(trips, departures), (t, d)| (trips + t, departures + d));
                DayCount {
                    date,
                    trips,
                    departures,
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        schedule::entities::{FeedInfo, StopTime, Trip},
        shared::parse_date,
    };

    fn date(value: &str) -> NaiveDate {
        parse_date(value).unwrap()
    }

    fn schedule() -> Schedule {
        let mut schedule = Schedule::new();
        let mut week = ServicePeriod::new("WEEK").with_dates(date("20240101"), date("20240107"));
        week.set_weekday_service(true);
        schedule.service_periods.insert("WEEK", week);
        let mut extra = ServicePeriod::new("EXTRA");
        extra.set_date_has_service(date("20240110"), true, None);
        schedule.service_periods.insert("EXTRA", extra);
        schedule
    }

    #[test]
    fn range_origins() {
        let mut schedule = schedule();
        let range = schedule.date_range().unwrap();
        assert_eq!(range.start, date("20240101"));
        assert_eq!(range.start_origin, "earliest service date in calendar.txt");
        assert_eq!(range.end, date("20240110"));
        assert_eq!(range.end_origin, "last service exception date in calendar_dates.txt");

        let mut feed_info = FeedInfo::new("Metro", "https://metro.example", "en");
        feed_info.feed_end_date = "20241231".into();
        schedule.feed_info = Some(feed_info);
        let range = schedule.date_range().unwrap();
        assert_eq!(range.end, date("20241231"));
        assert_eq!(range.end_origin, "feed_end_date in feed_info.txt");
    }

    #[test]
    fn trips_and_departures_per_day() {
        let mut schedule = schedule();
        schedule.trips.insert("T1", Trip::new("T1", "R1", "WEEK"));
        for sequence in 1..=3 {
            schedule
                .stop_times
                .insert(StopTime::new("T1", &format!("S{sequence}"), sequence));
        }
        schedule.trips.insert("T2", Trip::new("T2", "R1", "EXTRA"));

        let days = schedule.date_trips_departures(date("20240105"), date("20240111"));
        let counts: Vec<(usize, usize)> =
            days.iter().map(|day| (day.trips, day.departures)).collect();
        // Friday, the weekend, a gap and the added date
        assert_eq!(counts, [(1, 2), (0, 0), (0, 0), (0, 0), (0, 0), (1, 0)]);
    }
}

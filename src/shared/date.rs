use chrono::NaiveDate;

use crate::problems::{ProblemKind, Reporter};

pub const YEAR_RANGE_MIN: i32 = 1900;
pub const YEAR_RANGE_MAX: i32 = 2100;

/// Parses a `YYYYMMDD` date.
pub fn parse_date(value: &str) -> Option<NaiveDate> {
    if value.len() != 8 || !value.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    NaiveDate::parse_from_str(value, "%Y%m%d").ok()
}

pub fn format_date(date: NaiveDate) -> String {
    date.format("%Y%m%d").to_string()
}

/// Parses an optional date column, reporting malformed values and dates
/// outside the supported year range.
pub fn validate_date(value: &str, column: &str, reporter: &mut Reporter) -> Option<NaiveDate> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }
    let Some(date) = parse_date(value) else {
        reporter.invalid_value(column, value);
        return None;
    };
    check_date_range(date, value, column, reporter);
    Some(date)
}

pub fn check_date_range(date: NaiveDate, value: &str, column: &str, reporter: &mut Reporter) {
    use chrono::Datelike;
    if !(YEAR_RANGE_MIN..=YEAR_RANGE_MAX).contains(&date.year()) {
        reporter.report(ProblemKind::DateOutsideValidRange {
            column_name: column.to_string(),
            value: value.to_string(),
            range_start_year: YEAR_RANGE_MIN,
            range_end_year: YEAR_RANGE_MAX,
        });
    }
}

#[test]
fn parse_dates() {
    assert_eq!(parse_date("20240229"), NaiveDate::from_ymd_opt(2024, 2, 29));
    assert_eq!(parse_date("20230229"), None);
    assert_eq!(parse_date("2024-01-01"), None);
    assert_eq!(parse_date("2024011"), None);
}

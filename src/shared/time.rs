use std::{
    fmt,
    ops::{Add, Sub},
    sync::LazyLock,
};

use regex::Regex;

static HMS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d{1,3}):([0-5]\d):([0-5]\d)$").expect("static time pattern")
});

/// Seconds since midnight of a service day.
///
/// Service days run past midnight, so values of 24:00:00 and beyond are
/// allowed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Time(u32);

impl From<u32> for Time {
    fn from(value: u32) -> Self {
        Self(value)
    }
}

impl Sub<Time> for Time {
    type Output = Duration;

    /// Saturates at zero when `rhs` is later.
    fn sub(self, rhs: Self) -> Self::Output {
        Duration(self.0.saturating_sub(rhs.0))
    }
}

impl Add<Duration> for Time {
    type Output = Self;

    fn add(self, rhs: Duration) -> Self::Output {
        Self(self.0 + rhs.0)
    }
}

impl fmt::Display for Time {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hms_string())
    }
}

impl Time {
    pub const fn from_seconds(secs: u32) -> Self {
        Self(secs)
    }

    pub const fn as_seconds(&self) -> u32 {
        self.0
    }

    pub fn to_hms_string(&self) -> String {
        let h = self.0 / 3600;
        let m = (self.0 % 3600) / 60;
        let s = self.0 % 60;
        format!("{:02}:{:02}:{:02}", h, m, s)
    }

    /// Parses `H:MM:SS`, `HH:MM:SS` or `HHH:MM:SS`.
    pub fn from_hms(time: &str) -> Option<Self> {
        let captures = HMS.captures(time)?;
        let hours: u32 = captures[1].parse().ok()?;
        let minutes: u32 = captures[2].parse().ok()?;
        let seconds: u32 = captures[3].parse().ok()?;
        Some(Self(hours * 3600 + minutes * 60 + seconds))
    }
}

#[test]
fn parse_unparse() {
    for time in ["00:00:00", "00:00:30", "00:30:00", "12:30:30", "25:10:00"] {
        let parsed = Time::from_hms(time).unwrap();
        assert_eq!(time, parsed.to_hms_string())
    }
}

#[test]
fn short_hours_test() {
    assert_eq!(Time::from_hms("1:01:30").unwrap().as_seconds(), 3690);
}

#[test]
fn invalid_time_test() {
    assert!(Time::from_hms("00:00:0a").is_none());
    assert!(Time::from_hms("00:00").is_none());
    assert!(Time::from_hms("00:60:00").is_none());
    assert!(Time::from_hms(" 08:00:00").is_none());
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Duration(u32);

impl From<u32> for Duration {
    fn from(value: u32) -> Self {
        Self(value)
    }
}

impl Duration {
    pub const fn from_seconds(secs: u32) -> Self {
        Self(secs)
    }

    pub const fn from_minutes(minutes: u32) -> Self {
        Self(minutes * 60)
    }

    pub const fn from_hours(hours: u32) -> Self {
        Self(hours * 60 * 60)
    }

    pub const fn as_seconds(&self) -> u32 {
        self.0
    }
}

impl Add for Duration {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self(self.0 + rhs.0)
    }
}

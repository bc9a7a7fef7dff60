use std::{
    cmp,
    fmt::Display,
    ops::{Add, Sub},
};

/// Radius of the sphere used to approximate the earth, in meters.
pub const EARTH_RADIUS: Distance = Distance::from_meters(6_378_135.0);

#[derive(Debug, Clone, Copy, Default)]
pub struct Distance(f64);

impl PartialEq for Distance {
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}

impl PartialOrd for Distance {
    fn partial_cmp(&self, other: &Self) -> Option<cmp::Ordering> {
        self.0.partial_cmp(&other.0)
    }
}

impl Add for Distance {
    type Output = Self;
    fn add(self, rhs: Self) -> Self::Output {
        Self(self.0 + rhs.0)
    }
}

impl Sub for Distance {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self::Output {
        Self(self.0 - rhs.0)
    }
}

impl Distance {
    pub const fn from_meters(distance: f64) -> Self {
        Self(distance)
    }

    pub const fn from_kilometers(distance: f64) -> Self {
        Self(distance * 1000.0)
    }

    pub const fn as_meters(&self) -> f64 {
        self.0
    }

    pub const fn as_kilometers(&self) -> f64 {
        self.0 / 1000.0
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
}

impl Display for Coordinate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_fmt(format_args!("{}, {}", self.latitude, self.longitude))
    }
}

impl From<(f64, f64)> for Coordinate {
    fn from((latitude, longitude): (f64, f64)) -> Self {
        Self {
            latitude,
            longitude,
        }
    }
}

impl From<Coordinate> for (f64, f64) {
    fn from(value: Coordinate) -> Self {
        (value.latitude, value.longitude)
    }
}

impl Coordinate {
    pub const fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Great circle distance assuming a spherical earth.
    pub fn approximate_distance(&self, coord: &Self) -> Distance {
        let lat1 = self.latitude.to_radians();
        let lon1 = self.longitude.to_radians();
        let lat2 = coord.latitude.to_radians();
        let lon2 = coord.longitude.to_radians();
        let dlat = f64::sin(0.5 * (lat2 - lat1));
        let dlon = f64::sin(0.5 * (lon2 - lon1));
        let x = dlat * dlat + dlon * dlon * lat1.cos() * lat2.cos();
        let c = 2.0 * f64::atan2(x.sqrt(), f64::max(0.0, 1.0 - x).sqrt());
        Distance::from_meters(EARTH_RADIUS.as_meters() * c)
    }

    pub fn is_in_range(&self) -> bool {
        (-90.0..=90.0).contains(&self.latitude) && (-180.0..=180.0).contains(&self.longitude)
    }

    /// Both components within a degree of zero, which almost always means
    /// the coordinate was never filled in.
    pub fn is_near_origin(&self) -> bool {
        self.latitude.abs() < 1.0 && self.longitude.abs() < 1.0
    }

    /// Point at `fraction` of the way from `self` to `coord`, interpolated
    /// linearly in degrees.
    pub fn lerp(&self, coord: &Self, fraction: f64) -> Self {
        Self {
            latitude: self.latitude + (coord.latitude - self.latitude) * fraction,
            longitude: self.longitude + (coord.longitude - self.longitude) * fraction,
        }
    }
}

#[test]
fn distance_test() {
    let paris = Coordinate::new(48.85800943005911, 2.3514350059357927);
    let london = Coordinate::new(51.5052389927712, -0.12495407345099824);
    let d = paris.approximate_distance(&london);
    assert!((d.as_kilometers() - 343.0).abs() < 5.0);
}

#[test]
fn small_distance_test() {
    let a = Coordinate::new(48.2, 140.0);
    let b = Coordinate::new(48.20001, 140.0);
    assert_eq!(format!("{:.2}", a.approximate_distance(&b).as_meters()), "1.11");
}

#[test]
fn distance_eq_test() {
    let dist_a = Distance::from_meters(1000.0);
    let dist_b = Distance::from_kilometers(1.0);
    assert_eq!(dist_a, dist_b)
}

#[test]
fn near_origin_test() {
    assert!(Coordinate::new(0.5, -0.2).is_near_origin());
    assert!(!Coordinate::new(0.5, 12.0).is_near_origin());
}

use std::{
    cmp,
    fmt::Display,
    ops::{Add, Mul, Sub},
};

use serde::{Deserialize, Serialize};

pub(crate) const EARTH_RADIUS: Distance = Distance::from_kilometers(6371.0);
pub(crate) const LONGITUDE_DISTANCE: Distance = Distance::from_meters(111_320.0);
pub(crate) const LATITUDE_DISTANCE: Distance = Distance::from_meters(110_540.0);

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
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

impl Mul<f64> for Distance {
    type Output = Self;
    fn mul(self, rhs: f64) -> Self::Output {
        Self(self.0 * rhs)
    }
}

impl From<f64> for Distance {
    fn from(value: f64) -> Self {
        Self::from_meters(value)
    }
}

impl Display for Distance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.1}m", self.0)
    }
}

impl Distance {
    pub const ZERO: Self = Self(0.0);

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

    /// The absolute difference between two distances.
    pub fn abs_diff(&self, other: Self) -> Self {
        Self((self.0 - other.0).abs())
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Serialize, Deserialize)]
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

/// Where a coordinate lands when projected onto a line segment.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SegmentProjection {
    /// Position along the segment, `0.0` at the start and `1.0` at the end.
    pub ratio: f64,
    /// Closest point on the segment.
    pub point: Coordinate,
    /// Distance between the projected coordinate and `point`.
    pub distance: Distance,
}

impl Coordinate {
    pub const fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Great circle distance using the haversine formula.
    pub fn distance(&self, coord: &Self) -> Distance {
        let dist_lat = f64::to_radians(coord.latitude - self.latitude);
        let dist_lon = f64::to_radians(coord.longitude - self.longitude);
        let a = f64::powi(f64::sin(dist_lat / 2.0), 2)
            + f64::cos(f64::to_radians(self.latitude))
                * f64::cos(f64::to_radians(coord.latitude))
                * f64::sin(dist_lon / 2.0)
                * f64::sin(dist_lon / 2.0);
        let c = 2.0 * f64::atan2(f64::sqrt(a), f64::sqrt(1.0 - a));
        EARTH_RADIUS * c
    }

    /// Projects `self` onto the segment `start..end`.
    ///
    /// Uses a planar approximation around the segment's mean latitude, which
    /// holds up for the stop-to-stop spans of a transit trip. The ratio is
    /// clamped so the projection never leaves the segment.
    pub fn project_onto(&self, start: &Self, end: &Self) -> SegmentProjection {
        let cos_lat = f64::to_radians((start.latitude + end.latitude) / 2.0).cos();
        let to_x = |coord: &Self| {
            (coord.longitude - start.longitude) * cos_lat * LONGITUDE_DISTANCE.as_meters()
        };
        let to_y =
            |coord: &Self| (coord.latitude - start.latitude) * LATITUDE_DISTANCE.as_meters();

        let (dx, dy) = (to_x(end), to_y(end));
        let (px, py) = (to_x(self), to_y(self));
        let length_sq = dx * dx + dy * dy;

        // Two stops sharing a position
        let ratio = if length_sq < 1e-9 {
            0.0
        } else {
            ((px * dx + py * dy) / length_sq).clamp(0.0, 1.0)
        };

        let (cx, cy) = (ratio * dx, ratio * dy);
        let distance = Distance::from_meters(f64::hypot(px - cx, py - cy));
        let point = Coordinate {
            latitude: start.latitude + ratio * (end.latitude - start.latitude),
            longitude: start.longitude + ratio * (end.longitude - start.longitude),
        };

        SegmentProjection {
            ratio,
            point,
            distance,
        }
    }
}

#[test]
fn project_midpoint_test() {
    let start = Coordinate::new(59.0, 18.0);
    let end = Coordinate::new(59.0, 18.01);
    let target = Coordinate::new(59.001, 18.005);
    let projection = target.project_onto(&start, &end);
    assert!((projection.ratio - 0.5).abs() < 1e-6);
    // 0.001 degrees of latitude
    assert!((projection.distance.as_meters() - 110.54).abs() < 0.5);
}

#[test]
fn project_clamps_test() {
    let start = Coordinate::new(59.0, 18.0);
    let end = Coordinate::new(59.0, 18.01);
    let before = Coordinate::new(59.0, 17.99).project_onto(&start, &end);
    let after = Coordinate::new(59.0, 18.02).project_onto(&start, &end);
    assert_eq!(before.ratio, 0.0);
    assert_eq!(after.ratio, 1.0);
    assert_eq!(after.point, end);
}

#[test]
fn project_degenerate_segment_test() {
    let start = Coordinate::new(59.0, 18.0);
    let projection = Coordinate::new(59.0, 18.001).project_onto(&start, &start);
    assert_eq!(projection.ratio, 0.0);
    assert!(projection.distance.as_meters() > 50.0);
}

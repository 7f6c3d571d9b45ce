use std::{
    fmt::Display,
    ops::{Add, Sub},
};

use serde::{Deserialize, Serialize};

/// Seconds since midnight of the service day.
///
/// Service days can run past midnight, so values of 24 hours and above are
/// valid (`25:10:00` is ten past one the next morning).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Time(u32);

impl From<u32> for Time {
    fn from(value: u32) -> Self {
        Self(value)
    }
}

impl Sub<Time> for Time {
    type Output = i64;

    /// Signed difference in seconds.
    fn sub(self, rhs: Self) -> Self::Output {
        self.0 as i64 - rhs.0 as i64
    }
}

impl Add<u32> for Time {
    type Output = Self;

    fn add(self, rhs: u32) -> Self::Output {
        Self(self.0 + rhs)
    }
}

impl Display for Time {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
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

    /// Absolute time in epoch seconds given the epoch millis of the service
    /// day's midnight.
    pub const fn on_service_date(&self, service_date_millis: i64) -> i64 {
        service_date_millis / 1000 + self.0 as i64
    }

    pub fn to_hms_string(&self) -> String {
        let h = self.0 / 3600;
        let m = (self.0 % 3600) / 60;
        let s = self.0 % 60;
        format!("{:02}:{:02}:{:02}", h, m, s)
    }

    /// Parses `HH:MM:SS`. Hours may run past 24; values that overflow are
    /// rejected.
    pub fn from_hms(time: &str) -> Option<Self> {
        const HOUR_TO_SEC: u32 = 60 * 60;
        const MINUTE_TO_SEC: u32 = 60;
        let mut split = time.trim().split(':');
        let hours: u32 = split.next()?.parse().ok()?;
        let hours = hours.checked_mul(HOUR_TO_SEC)?;
        let minutes: u32 = split.next()?.parse().ok()?;
        let minutes = minutes.checked_mul(MINUTE_TO_SEC)?;
        let seconds: u32 = split.next()?.parse().ok()?;
        if split.next().is_some() {
            return None;
        }
        let seconds = hours.checked_add(minutes)?.checked_add(seconds)?;
        Some(Self(seconds))
    }
}

#[test]
fn parse_unparse_1() {
    let time = "00:00:00";
    let stime = Time::from_hms(time).unwrap();
    assert_eq!(time, stime.to_hms_string())
}

#[test]
fn parse_unparse_2() {
    let time = "12:30:30";
    let stime = Time::from_hms(time).unwrap();
    assert_eq!(time, stime.to_hms_string())
}

#[test]
fn parse_past_midnight() {
    let time = Time::from_hms("25:10:00").unwrap();
    assert_eq!(time.as_seconds(), 25 * 3600 + 600);
    assert_eq!(time.to_hms_string(), "25:10:00");
}

#[test]
fn parse_padded() {
    assert_eq!(Time::from_hms(" 8:05:00").unwrap().as_seconds(), 8 * 3600 + 300);
}

#[test]
fn on_service_date() {
    let time = Time::from_seconds(3600);
    assert_eq!(time.on_service_date(1_700_000_000_000), 1_700_003_600);
}

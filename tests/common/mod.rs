#![allow(dead_code)]

use ontime::prelude::*;

/// Meters per degree of longitude along the 59th parallel.
const METERS_PER_DEGREE: f64 = 57_270.0;

pub const SERVICE_DATE: i64 = 1_700_000_000_000;

/// A point `meters` east of the first stop.
pub fn east(meters: f64) -> Coordinate {
    Coordinate::new(59.0, 18.0 + meters / METERS_PER_DEGREE)
}

/// A trip with stops every 300 m heading east, one minute apart starting at
/// 08:00.
pub fn straight_trip(stop_count: usize) -> TripDetails {
    let stops: Vec<Stop> = (0..stop_count)
        .map(|i| Stop::new(&format!("s{i}"), &format!("Stop {i}"), east(i as f64 * 300.0)))
        .collect();
    let stop_times = stops
        .iter()
        .enumerate()
        .map(|(i, stop)| {
            StopTime::new(
                &stop.id,
                Time::from_seconds(8 * 3600 + i as u32 * 60),
                Distance::from_meters(i as f64 * 300.0),
            )
        })
        .collect();
    TripDetails::new("trip", SERVICE_DATE)
        .with_stops(stops)
        .with_schedule(TripSchedule::new(stop_times))
}

pub fn stop(details: &TripDetails, index: usize) -> Stop {
    details
        .stop_by_id(&format!("s{index}"))
        .cloned()
        .expect("stop in fixture")
}

/// Epoch millis of `seconds` after the service day's midnight.
pub fn at(seconds: i64) -> i64 {
    SERVICE_DATE + seconds * 1000
}

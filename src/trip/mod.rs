use std::{collections::HashMap, sync::Arc};

use serde::{Deserialize, Serialize};

use crate::shared::{
    geo::{Coordinate, Distance},
    time::Time,
};

mod source;

/// A physical point where the vehicle calls.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Stop {
    /// Unique external identifier for the stop.
    pub id: Arc<str>,
    /// Human-readable name (e.g., "Main St & 4th Ave").
    pub name: Arc<str>,
    /// Compass direction of travel served by the stop, when published.
    pub direction: Option<Arc<str>>,
    pub coordinate: Coordinate,
}

impl Stop {
    pub fn new(id: &str, name: &str, coordinate: Coordinate) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            direction: None,
            coordinate,
        }
    }
}

/// A scheduled call of the trip at one stop.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct StopTime {
    pub stop_id: Arc<str>,
    /// Scheduled arrival, relative to the service day's midnight.
    pub arrival_time: Time,
    pub departure_time: Time,
    /// Cumulative distance from the first stop of the trip.
    pub distance_along_trip: Distance,
}

impl StopTime {
    pub fn new(stop_id: &str, arrival_time: Time, distance_along_trip: Distance) -> Self {
        Self {
            stop_id: stop_id.into(),
            arrival_time,
            departure_time: arrival_time,
            distance_along_trip,
        }
    }
}

#[derive(Debug, Default, Clone)]
pub struct TripSchedule {
    /// `None` when the schedule was published without its stop times.
    pub stop_times: Option<Vec<StopTime>>,
}

impl TripSchedule {
    pub fn new(stop_times: Vec<StopTime>) -> Self {
        Self {
            stop_times: Some(stop_times),
        }
    }
}

/// Live status of the trip as last reported or predicted.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct TripStatus {
    /// Epoch milliseconds of midnight on the service day.
    pub service_date: i64,
    pub active_trip_id: Option<String>,
    pub vehicle_id: Option<String>,
    /// True once the values below come from local prediction.
    pub predicted: bool,
    /// Seconds, negative when running early.
    pub schedule_deviation: i64,
    pub next_stop: Option<String>,
    pub closest_stop: Option<String>,
    pub last_known_location: Option<Coordinate>,
    pub distance_along_trip: Option<Distance>,
    pub total_distance_along_trip: Option<Distance>,
    /// Epoch seconds.
    pub last_update_time: Option<i64>,
    /// Epoch milliseconds of the fix behind `last_known_location`.
    pub last_location_update_time: Option<i64>,
    /// Degrees clockwise from north.
    pub bearing: Option<f32>,
    /// Meters per second.
    pub speed: f32,
}

/// Everything known about a single trip: its schedule, the stops it
/// references and its live status.
#[derive(Debug, Default, Clone)]
pub struct TripDetails {
    pub trip_id: Arc<str>,
    pub status: TripStatus,
    pub schedule: Option<TripSchedule>,
    stops: HashMap<Arc<str>, Stop>,
}

impl TripDetails {
    pub fn new(trip_id: &str, service_date: i64) -> Self {
        Self {
            trip_id: trip_id.into(),
            status: TripStatus {
                service_date,
                active_trip_id: Some(trip_id.to_string()),
                ..Default::default()
            },
            schedule: None,
            stops: HashMap::new(),
        }
    }

    pub fn with_schedule(mut self, schedule: TripSchedule) -> Self {
        self.schedule = Some(schedule);
        self
    }

    pub fn with_stop(mut self, stop: Stop) -> Self {
        self.stops.insert(stop.id.clone(), stop);
        self
    }

    pub fn with_stops<I: IntoIterator<Item = Stop>>(mut self, stops: I) -> Self {
        self.stops
            .extend(stops.into_iter().map(|stop| (stop.id.clone(), stop)));
        self
    }

    pub fn stop_by_id(&self, id: &str) -> Option<&Stop> {
        self.stops.get(id)
    }

    /// Stop times in schedule order, empty when the schedule is missing.
    pub fn stop_times(&self) -> &[StopTime] {
        self.schedule
            .as_ref()
            .and_then(|schedule| schedule.stop_times.as_deref())
            .unwrap_or_default()
    }
}

use serde::{Deserialize, Serialize};

use crate::{shared::Coordinate, trip::Stop};

/// A single position report from the vehicle.
#[derive(Debug, Default, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LocationFix {
    pub coordinate: Coordinate,
    /// Epoch milliseconds at which the fix was taken.
    pub time: i64,
    /// Degrees clockwise from north, when the device reports one.
    pub bearing: Option<f32>,
    /// Meters per second, when the device reports one.
    pub speed: Option<f32>,
}

impl LocationFix {
    pub fn new(coordinate: Coordinate, time: i64) -> Self {
        Self {
            coordinate,
            time,
            bearing: None,
            speed: None,
        }
    }

    /// A synthetic fix placed on a stop.
    pub fn at_stop(stop: &Stop, time: i64) -> Self {
        Self::new(stop.coordinate, time)
    }

    pub fn with_speed(mut self, speed: f32) -> Self {
        self.speed = Some(speed);
        self
    }

    pub fn with_bearing(mut self, bearing: f32) -> Self {
        self.bearing = Some(bearing);
        self
    }
}

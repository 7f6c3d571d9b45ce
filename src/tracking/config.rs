use serde::{Deserialize, Serialize};

use crate::shared::Distance;

/// Thresholds steering the estimator.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    /// Distance to the final stop at which the trip counts as ended.
    pub end_of_trip_distance: Distance,
    /// Distance to the next stop at which the close-to-stop listener fires.
    pub close_to_stop_distance: Distance,
    /// Smallest change in distance to the next stop that counts as motion.
    pub motion_distance_threshold: Distance,
    /// Smallest speed, in meters per second, that counts as motion.
    pub motion_speed_threshold: f64,
    /// Assumed speed, in meters per second, of a vehicle that moves but stays
    /// under `motion_speed_threshold`.
    pub crawl_speed: f64,
    /// Fixes further than this from every segment of the trip are ignored.
    pub max_distance_from_shape: Distance,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            end_of_trip_distance: Distance::from_meters(10.0),
            close_to_stop_distance: Distance::from_meters(20.0),
            motion_distance_threshold: Distance::from_meters(0.5),
            motion_speed_threshold: 0.278,
            crawl_speed: 0.0167,
            max_distance_from_shape: Distance::from_meters(500.0),
        }
    }
}

impl TrackerConfig {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn end_of_trip_at(mut self, distance: Distance) -> Self {
        self.end_of_trip_distance = distance;
        self
    }

    pub fn close_to_stop_at(mut self, distance: Distance) -> Self {
        self.close_to_stop_distance = distance;
        self
    }

    pub fn max_distance_from_shape(mut self, distance: Distance) -> Self {
        self.max_distance_from_shape = distance;
        self
    }
}

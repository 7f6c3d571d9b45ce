use tracing::{debug, trace, warn};

use crate::{
    shared::Distance,
    tracking::{
        LocationFix, ShapeIndex, TrackerConfig,
        matcher::{self, ShapeMatch},
    },
    trip::{Stop, StopTime, TripDetails, TripStatus},
};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TrackingPhase {
    /// No fix has been matched yet.
    #[default]
    Initializing,
    /// The vehicle is moving towards the next stop.
    Tracking,
    /// The vehicle is standing still or barely moving.
    Idle,
    /// The final stop was reached, or the trip could not be tracked at all.
    Ended,
}

/// What a single update did.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Outcome {
    /// The trip has ended, nothing was computed.
    Ended,
    /// The fix could not be placed on the trip, nothing changed.
    Unmatched,
    Matched {
        shape_match: ShapeMatch,
        /// Set when the vehicle just came close to this stop index.
        close_to_stop: Option<usize>,
    },
}

/// Follows a vehicle along one trip.
///
/// Feed it fixes with [`Estimator::update`]; it keeps track of the current
/// and next stop, the vehicle's speed and the predicted schedule deviation,
/// which is written into the trip's [`TripStatus`].
#[derive(Debug)]
pub struct Estimator {
    details: TripDetails,
    index: Option<ShapeIndex>,
    config: TrackerConfig,
    phase: TrackingPhase,

    current_stop_index: usize,
    next_stop_index: usize,
    distance_to_next_stop: Distance,
    trip_ended: bool,
    // Epoch millis, zero when unset
    last_distance_sample_time: i64,
    last_idle_timestamp: i64,
    speed_kmh: f64,
    close_notification_sent_for: Option<usize>,
    total_trip_length: Distance,
    trip_distance_travelled: Distance,
}

impl Estimator {
    /// Builds the estimator for `details`, starting at `starting_stop`.
    ///
    /// A trip that cannot be tracked (no schedule, fewer than two known
    /// stops, a starting stop outside the trip) yields an estimator that has
    /// already ended.
    pub fn new(starting_stop: Option<&Stop>, details: TripDetails, config: TrackerConfig) -> Self {
        let mut estimator = Self {
            details,
            index: None,
            config,
            phase: TrackingPhase::Initializing,
            current_stop_index: 0,
            next_stop_index: 0,
            distance_to_next_stop: Distance::ZERO,
            trip_ended: false,
            last_distance_sample_time: 0,
            last_idle_timestamp: 0,
            speed_kmh: 0.0,
            close_notification_sent_for: None,
            total_trip_length: Distance::ZERO,
            trip_distance_travelled: Distance::ZERO,
        };

        match ShapeIndex::build(&estimator.details, starting_stop) {
            Ok((index, start)) => {
                estimator.total_trip_length = index.total_length();
                estimator.current_stop_index = start;
                estimator.next_stop_index = start;
                estimator.index = Some(index);
            }
            Err(err) => {
                warn!("Trip {} can not be tracked: {err}", estimator.details.trip_id);
                estimator.trip_ended = true;
                estimator.phase = TrackingPhase::Ended;
            }
        }
        estimator
    }

    /// Matches `fix` against the trip and updates every derived value.
    ///
    /// `now` is the wall-clock time in epoch milliseconds.
    pub fn update(&mut self, fix: &LocationFix, now: i64) -> Outcome {
        if self.trip_ended {
            return Outcome::Ended;
        }
        let Some(index) = &self.index else {
            return Outcome::Ended;
        };

        let Some(shape_match) = matcher::compute_assignment(
            &index.points,
            &index.shape_distances,
            &fix.coordinate,
            self.current_stop_index,
            index.len(),
            self.config.max_distance_from_shape,
        ) else {
            trace!("No match for fix at {}", fix.coordinate);
            return Outcome::Unmatched;
        };

        let last = index.last_index();
        let next = (shape_match.index + 1).min(last);
        let distance = fix.coordinate.distance(&index.points[next]);

        // A new next stop makes the previous samples meaningless
        if next != self.next_stop_index {
            self.next_stop_index = next;
            self.distance_to_next_stop = distance;
            self.last_distance_sample_time = 0;
            self.last_idle_timestamp = 0;
        }
        self.current_stop_index = self.current_stop_index.max(shape_match.index).min(last);

        let status = &mut self.details.status;
        status.predicted = true;
        status.next_stop = Some(index.stops[next].name.to_string());
        status.closest_stop = Some(index.stops[shape_match.index].name.to_string());
        status.last_known_location = Some(fix.coordinate);
        status.distance_along_trip = Some(shape_match.distance_along_shape);
        status.total_distance_along_trip = Some(self.total_trip_length);
        status.last_update_time = Some(now / 1000);
        status.last_location_update_time = Some(fix.time);
        if let Some(bearing) = fix.bearing {
            status.bearing = Some(bearing);
        }

        let distance_delta = self.distance_to_next_stop.abs_diff(distance);
        let time_delta = if self.last_distance_sample_time > 0 {
            now - self.last_distance_sample_time
        } else {
            0
        };
        self.last_distance_sample_time = now;
        self.trip_distance_travelled = shape_match.distance_along_shape;

        let moved = distance_delta >= self.config.motion_distance_threshold;
        let speed = match fix.speed {
            Some(speed) => speed as f64,
            None if moved && time_delta > 0 => {
                distance_delta.as_meters() / (time_delta as f64 / 1000.0)
            }
            None => 0.0,
        };
        self.speed_kmh = speed * 3.6;
        status.speed = speed as f32;

        self.distance_to_next_stop = distance;
        let scheduled = index.stop_times[next]
            .arrival_time
            .on_service_date(status.service_date);
        let now_secs = now / 1000;

        if moved && speed >= self.config.motion_speed_threshold {
            let eta = (distance.as_meters() / speed) as i64;
            status.schedule_deviation = now_secs + eta - scheduled;
            self.last_idle_timestamp = 0;
            self.phase = TrackingPhase::Tracking;
            debug!(
                "Moving: {distance} to stop {next} at {speed:.2} m/s, eta {eta}s, deviation {}s",
                status.schedule_deviation
            );
        } else {
            // The seeding computation at the starting stop never moves
            self.phase = match self.phase {
                TrackingPhase::Initializing => TrackingPhase::Tracking,
                _ => TrackingPhase::Idle,
            };
            if self.last_idle_timestamp == 0 {
                self.last_idle_timestamp = now;
            }
            if moved {
                let eta = (distance.as_meters() / self.config.crawl_speed) as i64;
                status.schedule_deviation = now_secs + eta - scheduled;
                debug!(
                    "Crawling: {distance} to stop {next}, eta {eta}s, deviation {}s",
                    status.schedule_deviation
                );
            } else {
                // Standing still loses one second on the schedule per second
                let idle_secs = (now - self.last_idle_timestamp) / 1000;
                if idle_secs > 0 {
                    status.schedule_deviation += idle_secs;
                    self.last_idle_timestamp += idle_secs * 1000;
                    debug!(
                        "Idle for {idle_secs}s, deviation {}s",
                        status.schedule_deviation
                    );
                }
            }
        }

        if next == last && self.distance_to_next_stop <= self.config.end_of_trip_distance {
            debug!("Trip {} reached its final stop", self.details.trip_id);
            self.trip_ended = true;
            self.phase = TrackingPhase::Ended;
        }

        let mut close_to_stop = None;
        if self.distance_to_next_stop <= self.config.close_to_stop_distance
            && self.close_notification_sent_for != Some(next)
        {
            self.close_notification_sent_for = Some(next);
            close_to_stop = Some(next);
        }

        Outcome::Matched {
            shape_match,
            close_to_stop,
        }
    }

    fn stop_at(&self, index: usize) -> Option<&Stop> {
        let stops = &self.index.as_ref()?.stops;
        if self.trip_ended {
            stops.last()
        } else {
            stops.get(index)
        }
    }

    fn stop_time_at(&self, index: usize) -> Option<&StopTime> {
        let stop_times = &self.index.as_ref()?.stop_times;
        if self.trip_ended {
            stop_times.last()
        } else {
            stop_times.get(index)
        }
    }

    /// The stop the vehicle last passed, or the final stop once ended.
    pub fn current_stop(&self) -> Option<&Stop> {
        self.stop_at(self.current_stop_index)
    }

    /// The stop the vehicle is heading to, or the final stop once ended.
    pub fn next_stop(&self) -> Option<&Stop> {
        self.stop_at(self.next_stop_index)
    }

    pub fn current_stop_time(&self) -> Option<&StopTime> {
        self.stop_time_at(self.current_stop_index)
    }

    pub fn next_stop_time(&self) -> Option<&StopTime> {
        self.stop_time_at(self.next_stop_index)
    }

    pub fn current_stop_index(&self) -> usize {
        self.current_stop_index
    }

    pub fn next_stop_index(&self) -> usize {
        self.next_stop_index
    }

    /// Straight line distance to the next stop, rounded to the meter.
    pub fn distance_to_next_stop(&self) -> u32 {
        self.distance_to_next_stop.as_meters().round() as u32
    }

    /// Straight line distance to the next stop, unrounded.
    pub fn raw_distance_to_next_stop(&self) -> Distance {
        self.distance_to_next_stop
    }

    /// Estimated speed in km/h.
    pub fn speed(&self) -> f64 {
        self.speed_kmh
    }

    pub fn trip_status(&self) -> &TripStatus {
        &self.details.status
    }

    pub fn details(&self) -> &TripDetails {
        &self.details
    }

    pub fn has_trip_ended(&self) -> bool {
        self.trip_ended
    }

    pub fn phase(&self) -> TrackingPhase {
        self.phase
    }

    pub fn total_trip_length(&self) -> Distance {
        self.total_trip_length
    }

    pub fn distance_travelled(&self) -> Distance {
        self.trip_distance_travelled
    }
}

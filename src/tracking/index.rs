use crate::{
    shared::{Coordinate, Distance},
    tracking::Error,
    trip::{Stop, StopTime, TripDetails},
};

/// The trip's stops laid out as parallel arrays, built once per trip.
#[derive(Debug, Clone)]
pub struct ShapeIndex {
    pub stops: Box<[Stop]>,
    pub stop_times: Box<[StopTime]>,
    /// Coordinate of `stops[i]`.
    pub points: Box<[Coordinate]>,
    /// `stop_times[i].distance_along_trip`.
    pub shape_distances: Box<[Distance]>,
}

impl ShapeIndex {
    /// Resolves the schedule against the trip's stops.
    ///
    /// Stop times whose stop is unknown are dropped. Returns the index and
    /// the position of `starting_stop` in it.
    pub fn build(
        details: &TripDetails,
        starting_stop: Option<&Stop>,
    ) -> Result<(Self, usize), Error> {
        let starting_stop = starting_stop.ok_or(Error::MissingStartingStop)?;
        let schedule = details.schedule.as_ref().ok_or(Error::MissingSchedule)?;
        let stop_times = schedule
            .stop_times
            .as_ref()
            .ok_or(Error::MissingStopTimes)?;

        let (stops, stop_times): (Vec<Stop>, Vec<StopTime>) = stop_times
            .iter()
            .filter_map(|stop_time| {
                details
                    .stop_by_id(&stop_time.stop_id)
                    .map(|stop| (stop.clone(), stop_time.clone()))
            })
            .unzip();

        if stops.len() < 2 {
            return Err(Error::TooFewStops(stops.len()));
        }

        let start = stops
            .iter()
            .position(|stop| stop.id == starting_stop.id)
            .ok_or_else(|| Error::StartingStopNotFound(starting_stop.id.to_string()))?;

        let points = stops.iter().map(|stop| stop.coordinate).collect();
        let shape_distances = stop_times
            .iter()
            .map(|stop_time| stop_time.distance_along_trip)
            .collect();

        Ok((
            Self {
                stops: stops.into(),
                stop_times: stop_times.into(),
                points,
                shape_distances,
            },
            start,
        ))
    }

    pub fn len(&self) -> usize {
        self.stops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stops.is_empty()
    }

    pub fn last_index(&self) -> usize {
        self.len() - 1
    }

    pub fn total_length(&self) -> Distance {
        self.shape_distances.last().copied().unwrap_or_default()
    }
}

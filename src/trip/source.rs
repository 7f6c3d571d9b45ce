use std::{
    collections::{HashMap, HashSet},
    sync::Arc,
    time::Instant,
};

use rayon::prelude::*;
use tracing::debug;

use crate::{
    gtfs::{self, GtfsReader, GtfsStopTime},
    shared::{Distance, Time},
    trip::{Stop, StopTime, TripDetails, TripSchedule},
};

impl TripDetails {
    /// Reads one trip out of a GTFS feed.
    ///
    /// Stop times are ordered by `stop_sequence`. When every stop time
    /// carries `shape_dist_traveled` it is taken as meters along the trip,
    /// otherwise the distance is accumulated stop to stop.
    pub fn from_gtfs(
        gtfs: &GtfsReader,
        trip_id: &str,
        service_date: i64,
    ) -> Result<Self, gtfs::Error> {
        debug!("Loading trip {trip_id}...");
        let now = Instant::now();

        let mut found = false;
        gtfs.stream_trips(|(_, trip)| {
            if trip.trip_id == trip_id {
                found = true;
            }
        })?;
        if !found {
            return Err(gtfs::Error::TripNotFound(trip_id.to_string()));
        }

        let mut rows: Vec<GtfsStopTime> = Vec::new();
        gtfs.stream_stop_times(|(_, stop_time)| {
            if stop_time.trip_id == trip_id {
                rows.push(stop_time);
            }
        })?;
        rows.par_sort_by_key(|row| row.stop_sequence);

        let wanted: HashSet<&str> = rows.iter().map(|row| row.stop_id.as_str()).collect();
        let mut stops: HashMap<Arc<str>, Stop> = HashMap::new();
        gtfs.stream_stops(|(_, stop)| {
            if wanted.contains(stop.stop_id.as_str()) {
                let value: Stop = stop.into();
                stops.insert(value.id.clone(), value);
            }
        })?;

        let stop_times = build_stop_times(&rows, &stops)?;
        let total = stop_times.last().map(|st| st.distance_along_trip);

        let mut details = TripDetails::new(trip_id, service_date)
            .with_schedule(TripSchedule::new(stop_times))
            .with_stops(stops.into_values());
        details.status.total_distance_along_trip = total;

        debug!("Loading trip {trip_id} took {:?}", now.elapsed());
        Ok(details)
    }
}

fn build_stop_times(
    rows: &[GtfsStopTime],
    stops: &HashMap<Arc<str>, Stop>,
) -> Result<Vec<StopTime>, gtfs::Error> {
    let use_shape_distance = rows.iter().all(|row| row.shape_dist_traveled.is_some());
    let mut travelled = Distance::ZERO;
    let mut previous: Option<&Stop> = None;

    rows.iter()
        .map(|row| -> Result<StopTime, gtfs::Error> {
            let arrival = parse_time(row, &row.arrival_time)
                .or_else(|_| parse_time(row, &row.departure_time))?;
            let departure = parse_time(row, &row.departure_time).unwrap_or(arrival);

            let stop = stops.get(row.stop_id.as_str());
            let distance_along_trip = match row.shape_dist_traveled {
                Some(distance) if use_shape_distance => Distance::from_meters(distance),
                _ => {
                    if let (Some(from), Some(to)) = (previous, stop) {
                        travelled = travelled + from.coordinate.distance(&to.coordinate);
                    }
                    travelled
                }
            };
            if stop.is_some() {
                previous = stop;
            }

            Ok(StopTime {
                stop_id: row.stop_id.as_str().into(),
                arrival_time: arrival,
                departure_time: departure,
                distance_along_trip,
            })
        })
        .collect()
}

fn parse_time(row: &GtfsStopTime, time: &str) -> Result<Time, gtfs::Error> {
    Time::from_hms(time).ok_or_else(|| gtfs::Error::InvalidTime {
        stop_id: row.stop_id.clone(),
        time: time.to_string(),
    })
}

impl From<gtfs::GtfsStop> for Stop {
    fn from(value: gtfs::GtfsStop) -> Self {
        Self {
            id: value.stop_id.into(),
            name: value.stop_name.into(),
            direction: value.stop_direction.map(|val| val.into()),
            coordinate: (value.stop_lat, value.stop_lon).into(),
        }
    }
}

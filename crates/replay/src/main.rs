use chrono::NaiveDate;
use ontime::prelude::*;
use serde::Deserialize;
use std::{fs::File, path::Path, process, time::Instant};
use tracing::{error, info, warn};

/// One recorded position, as exported by the operator app's buffer.
#[derive(Debug, Deserialize)]
struct FixRecord {
    /// Epoch milliseconds.
    time: i64,
    lat: f64,
    lon: f64,
    #[serde(default)]
    speed: Option<f32>,
    #[serde(default)]
    bearing: Option<f32>,
}

impl From<FixRecord> for LocationFix {
    fn from(value: FixRecord) -> Self {
        Self {
            coordinate: Coordinate::new(value.lat, value.lon),
            time: value.time,
            bearing: value.bearing,
            speed: value.speed,
        }
    }
}

fn main() {
    tracing_subscriber::fmt().init();

    let args: Vec<_> = std::env::args().collect();
    if args.len() < 6 {
        error!("Usage: ontime-replay <gtfs zip or dir> <trip id> <start stop id> <service date YYYY-MM-DD> <fixes csv>");
        process::exit(1);
    }
    let (gtfs_path, trip_id, stop_id, service_date, fixes_path) =
        (&args[1], &args[2], &args[3], &args[4], &args[5]);

    let Some(service_date) = NaiveDate::parse_from_str(service_date, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|midnight| midnight.and_utc().timestamp_millis())
    else {
        error!("Invalid service date {service_date}");
        process::exit(1);
    };

    info!("Loading trip {trip_id}...");
    let now = Instant::now();
    let path = Path::new(gtfs_path);
    let reader = if path.is_dir() {
        GtfsReader::new(Config::default()).from_directory(path)
    } else {
        GtfsReader::new(Config::default()).from_zip(path)
    };
    let details = match TripDetails::from_gtfs(&reader, trip_id, service_date) {
        Ok(details) => details,
        Err(err) => {
            error!("Failed to load trip: {err}");
            process::exit(1);
        }
    };
    info!("Loading trip took {:?}", now.elapsed());

    let starting_stop = details.stop_by_id(stop_id).cloned();
    if starting_stop.is_none() {
        warn!("Stop {stop_id} is not served by trip {trip_id}");
    }

    let file = match File::open(fixes_path) {
        Ok(file) => file,
        Err(err) => {
            error!("Failed to open {fixes_path}: {err}");
            process::exit(1);
        }
    };

    let mut estimator = Estimator::new(starting_stop.as_ref(), details, TrackerConfig::default());
    let mut seeded = false;

    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(file);
    for record in reader.deserialize::<FixRecord>() {
        let fix: LocationFix = match record {
            Ok(record) => record.into(),
            Err(err) => {
                warn!("Skipping fix: {err}");
                continue;
            }
        };

        // The trip starts out placed on the starting stop
        if !seeded {
            seeded = true;
            if let Some(stop) = &starting_stop {
                estimator.update(&LocationFix::at_stop(stop, fix.time), fix.time);
            }
        }

        match estimator.update(&fix, fix.time) {
            Outcome::Ended => break,
            Outcome::Unmatched => warn!("Fix at {} is off the trip", fix.coordinate),
            Outcome::Matched { close_to_stop, .. } => {
                let status = estimator.trip_status();
                info!(
                    "{} next {} in {}m, {:.1} km/h, deviation {}s, {:?}",
                    fix.time,
                    status.next_stop.as_deref().unwrap_or("-"),
                    estimator.distance_to_next_stop(),
                    estimator.speed(),
                    status.schedule_deviation,
                    estimator.phase(),
                );
                if close_to_stop.is_some()
                    && let Some(stop) = estimator.next_stop()
                {
                    info!("Close to stop {}", stop.name);
                }
            }
        }
    }

    if estimator.has_trip_ended() {
        info!(
            "Trip ended after {} of {}",
            estimator.distance_travelled(),
            estimator.total_trip_length()
        );
    } else {
        info!(
            "Replay stopped at {} of {}",
            estimator.distance_travelled(),
            estimator.total_trip_length()
        );
    }
}

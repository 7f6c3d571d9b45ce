//! Live trip-progress estimation.
//!
//! A [`tracking::TripTracker`] follows one vehicle along one trip: it places
//! every position fix on the trip's stops, keeps track of the current and
//! next stop, estimates speed and schedule deviation and tells the caller
//! when the vehicle closes in on a stop or finishes the trip.

pub mod gtfs;
pub mod shared;
pub mod tracking;
pub mod trip;

pub mod prelude {
    pub use crate::gtfs::{Config, GtfsReader};
    pub use crate::shared::{Clock, Coordinate, Distance, ManualClock, SystemClock, Time};
    pub use crate::tracking::{
        CloseToStopListener, Estimator, Listeners, LocationFix, Outcome, ShapeMatch,
        TrackerConfig, TrackingPhase, TripStatusComputedListener, TripTracker,
    };
    pub use crate::trip::{Stop, StopTime, TripDetails, TripSchedule, TripStatus};
}

use thiserror::Error;

mod config;
mod estimator;
mod fix;
mod index;
pub mod matcher;
mod tracker;

pub use config::*;
pub use estimator::*;
pub use fix::*;
pub use index::*;
pub use matcher::ShapeMatch;
pub use tracker::*;

/// Reasons a trip can not be tracked.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("No starting stop was given")]
    MissingStartingStop,
    #[error("Trip has no schedule")]
    MissingSchedule,
    #[error("Trip schedule has no stop times")]
    MissingStopTimes,
    #[error("Trip resolves to {0} stops, at least 2 are needed")]
    TooFewStops(usize),
    #[error("Starting stop {0} is not part of the trip")]
    StartingStopNotFound(String),
}

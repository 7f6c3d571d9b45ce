pub mod clock;
pub mod geo;
pub mod time;

pub use clock::*;
pub use geo::*;
pub use time::*;

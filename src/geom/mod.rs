use geo::{Distance, HaversineMeasure, Point};

mod bbox;
mod grid;

pub(crate) use bbox::{envelope, BoundingBox};
pub(crate) use grid::{cell_key, Grid};

/// Mean earth radius used for great-circle distances, in meters.
pub const EARTH_RADIUS_M: f64 = 6_373_000.0;

/// Meters of latitude per degree (earth circumference / 360).
pub const METERS_PER_DEGREE: f64 = 40_074_000.0 / 360.0;

/// Great-circle distance in meters between two lon/lat points.
pub fn haversine_distance(x0: f64, y0: f64, x1: f64, y1: f64) -> f64 {
    HaversineMeasure::new(EARTH_RADIUS_M).distance(Point::new(x0, y0), Point::new(x1, y1))
}

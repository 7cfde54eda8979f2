//! Distances and travel times on the sphere.

use chrono::Duration;
use geo::{Distance, Haversine, Point};

/// Great-circle distance in metres between two WGS84 coordinates.
pub fn haversine(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    Haversine.distance(Point::new(lon1, lat1), Point::new(lon2, lat2))
}

/// Time to cover `distance` metres at `speed_kmh`, rounded to milliseconds.
pub fn travel_duration(distance: f64, speed_kmh: f64) -> Duration {
    let metres_per_second = speed_kmh * 1000.0 / 3600.0;
    Duration::milliseconds((distance / metres_per_second * 1000.0).round() as i64)
}

/// Position on the unit sphere.
///
/// Euclidean distance between these points grows monotonically with the
/// great-circle distance, so an R-tree over them yields true nearest
/// neighbours.
pub fn unit_sphere(latitude: f64, longitude: f64) -> [f64; 3] {
    let (lat, lon) = (latitude.to_radians(), longitude.to_radians());
    [lat.cos() * lon.cos(), lat.cos() * lon.sin(), lat.sin()]
}

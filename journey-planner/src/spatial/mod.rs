//! Geographic primitives: great-circle distances and slippy-map tiles.

mod distance;
mod tile;

pub use distance::{haversine, travel_duration, unit_sphere};
pub use tile::{BoundingBox, MAX_ZOOM, TileCoordinate, tiles_in_bbox};

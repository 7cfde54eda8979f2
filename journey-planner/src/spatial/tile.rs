//! Slippy-map tile arithmetic.

use std::f64::consts::PI;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::domain::DomainError;

/// Deepest zoom level accepted.
pub const MAX_ZOOM: u8 = 24;

/// Web-Mercator latitude limit.
const MAX_LATITUDE: f64 = 85.051_128_78;

/// A slippy-map tile `zoom/x/y`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TileCoordinate {
    pub zoom: u8,
    pub x: u32,
    pub y: u32,
}

impl TileCoordinate {
    /// Create a coordinate, checking it lies on the grid for its zoom.
    pub fn new(zoom: u8, x: u32, y: u32) -> Result<Self, DomainError> {
        let invalid = || DomainError::InvalidTile(format!("{zoom}/{x}/{y}"));
        if zoom > MAX_ZOOM {
            return Err(invalid());
        }
        let n = 1u32 << zoom;
        if x >= n || y >= n {
            return Err(invalid());
        }
        Ok(Self { zoom, x, y })
    }

    /// The tile containing a point. Latitudes are clamped to the Mercator
    /// range and zoom to [`MAX_ZOOM`].
    pub fn from_lat_lon(latitude: f64, longitude: f64, zoom: u8) -> Self {
        let zoom = zoom.min(MAX_ZOOM);
        let n = f64::from(1u32 << zoom);
        let lat = latitude.clamp(-MAX_LATITUDE, MAX_LATITUDE).to_radians();
        let x = ((longitude + 180.0) / 360.0 * n).floor();
        let y = ((1.0 - (lat.tan() + 1.0 / lat.cos()).ln() / PI) / 2.0 * n).floor();
        let max = n - 1.0;
        Self {
            zoom,
            x: x.clamp(0.0, max) as u32,
            y: y.clamp(0.0, max) as u32,
        }
    }

    /// Whether `other` is this tile or lies inside it at a deeper zoom.
    pub fn contains(&self, other: &TileCoordinate) -> bool {
        if other.zoom < self.zoom {
            return false;
        }
        let shift = other.zoom - self.zoom;
        other.x >> shift == self.x && other.y >> shift == self.y
    }

    /// Whether the point falls in this tile.
    pub fn contains_point(&self, latitude: f64, longitude: f64) -> bool {
        Self::from_lat_lon(latitude, longitude, self.zoom) == *self
    }

    /// Geographic extent of the tile.
    pub fn bounds(&self) -> BoundingBox {
        let n = f64::from(1u32 << self.zoom);
        let lon = |x: f64| x / n * 360.0 - 180.0;
        let lat = |y: f64| (PI * (1.0 - 2.0 * y / n)).sinh().atan().to_degrees();
        BoundingBox {
            min_latitude: lat(f64::from(self.y) + 1.0),
            max_latitude: lat(f64::from(self.y)),
            min_longitude: lon(f64::from(self.x)),
            max_longitude: lon(f64::from(self.x) + 1.0),
        }
    }
}

impl fmt::Display for TileCoordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.zoom, self.x, self.y)
    }
}

/// Axis-aligned box in degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub min_latitude: f64,
    pub max_latitude: f64,
    pub min_longitude: f64,
    pub max_longitude: f64,
}

impl BoundingBox {
    /// Box extending `padding` degrees around a point in every direction.
    pub fn around(latitude: f64, longitude: f64, padding: f64) -> Self {
        Self {
            min_latitude: latitude - padding,
            max_latitude: latitude + padding,
            min_longitude: longitude - padding,
            max_longitude: longitude + padding,
        }
    }

    pub fn contains(&self, latitude: f64, longitude: f64) -> bool {
        (self.min_latitude..=self.max_latitude).contains(&latitude)
            && (self.min_longitude..=self.max_longitude).contains(&longitude)
    }
}

/// Every tile at `zoom` intersecting the box.
pub fn tiles_in_bbox(bbox: &BoundingBox, zoom: u8) -> Vec<TileCoordinate> {
    let top_left = TileCoordinate::from_lat_lon(bbox.max_latitude, bbox.min_longitude, zoom);
    let bottom_right = TileCoordinate::from_lat_lon(bbox.min_latitude, bbox.max_longitude, zoom);

    let mut tiles = Vec::new();
    for x in top_left.x..=bottom_right.x {
        for y in top_left.y..=bottom_right.y {
            tiles.push(TileCoordinate {
                zoom: top_left.zoom,
                x,
                y,
            });
        }
    }
    tiles
}

//! Road planner configuration: tile selection, embedding and search bounds.

use crate::spatial::TileCoordinate;
use crate::tiles::RoutableTileNode;

/// Tile provider a tile is fetched from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TileLayer {
    /// Detailed tiles around the endpoints.
    Base,
    /// Coarser tiles for the stretch in between.
    Transit,
}

/// A tile to fetch for a breakpoint node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileChoice {
    pub coordinate: TileCoordinate,
    pub layer: TileLayer,
}

/// How the tile behind a breakpoint is chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TileSelection {
    /// The node's tile at a fixed zoom, from the base layer.
    Unified { zoom: u8 },

    /// The node's tile at the coarsest zoom in `min_zoom..max_zoom` that
    /// holds no endpoint tile; the last zoom tried when every one does.
    /// Endpoint tiles come from the base layer, everything else from the
    /// transit layer.
    TwoLayer { min_zoom: u8, max_zoom: u8 },
}

impl TileSelection {
    pub fn pick(&self, node: &RoutableTileNode, local_tiles: &[TileCoordinate]) -> TileChoice {
        match *self {
            TileSelection::Unified { zoom } => TileChoice {
                coordinate: TileCoordinate::from_lat_lon(node.latitude, node.longitude, zoom),
                layer: TileLayer::Base,
            },
            TileSelection::TwoLayer { min_zoom, max_zoom } => {
                let mut coordinate =
                    TileCoordinate::from_lat_lon(node.latitude, node.longitude, min_zoom);
                for zoom in min_zoom..max_zoom {
                    coordinate = TileCoordinate::from_lat_lon(node.latitude, node.longitude, zoom);
                    if !local_tiles.iter().any(|local| coordinate.contains(local)) {
                        break;
                    }
                }
                let layer = if local_tiles.contains(&coordinate) {
                    TileLayer::Base
                } else {
                    TileLayer::Transit
                };
                TileChoice { coordinate, layer }
            }
        }
    }
}

/// Search radius derived from the straight-line distance between the
/// endpoints: `distance * factor + offset` metres.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MaxDistanceHeuristic {
    pub factor: f64,
    pub offset: f64,
}

impl MaxDistanceHeuristic {
    pub fn bound(&self, distance: f64) -> f64 {
        distance * self.factor + self.offset
    }
}

/// Configuration for the road planner.
#[derive(Debug, Clone)]
pub struct RoadPlannerConfig {
    pub tile_selection: TileSelection,

    /// Zoom of the tiles fetched around an endpoint before embedding it.
    pub embedding_zoom: u8,

    /// Half-size in degrees of the box searched for embedding neighbours.
    pub embedding_padding: f64,

    /// Graph nodes an embedded endpoint is joined to.
    pub embedding_neighbours: usize,

    pub max_distance: MaxDistanceHeuristic,
}

impl RoadPlannerConfig {
    /// One tile layer at zoom 14.
    pub fn unified() -> Self {
        Self {
            tile_selection: TileSelection::Unified { zoom: 14 },
            embedding_zoom: 14,
            embedding_padding: 0.005,
            embedding_neighbours: 3,
            max_distance: MaxDistanceHeuristic {
                factor: 10.0,
                offset: 1000.0,
            },
        }
    }

    /// Detailed base tiles at the endpoints, coarse transit tiles between.
    pub fn two_layer() -> Self {
        Self {
            tile_selection: TileSelection::TwoLayer {
                min_zoom: 8,
                max_zoom: 15,
            },
            max_distance: MaxDistanceHeuristic {
                factor: 5.0,
                offset: 0.0,
            },
            ..Self::unified()
        }
    }

    /// Tiles at the embedding zoom holding the given points.
    pub fn local_tiles(&self, points: &[(f64, f64)]) -> Vec<TileCoordinate> {
        points
            .iter()
            .map(|&(lat, lon)| TileCoordinate::from_lat_lon(lat, lon, self.embedding_zoom))
            .collect()
    }
}

impl Default for RoadPlannerConfig {
    fn default() -> Self {
        Self::unified()
    }
}

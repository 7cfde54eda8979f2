use serde::{Deserialize, Serialize};

use crate::domain::{Location, LocationId, RoadClass};
use crate::spatial::TileCoordinate;

/// A road-graph node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoutableTileNode {
    pub id: LocationId,
    pub latitude: f64,
    pub longitude: f64,
}

impl RoutableTileNode {
    pub fn new(id: impl Into<LocationId>, latitude: f64, longitude: f64) -> Self {
        Self {
            id: id.into(),
            latitude,
            longitude,
        }
    }

    pub fn location(&self) -> Location {
        Location {
            id: Some(self.id.clone()),
            name: None,
            latitude: self.latitude,
            longitude: self.longitude,
        }
    }
}

/// A road segment between two nodes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoutableEdge {
    pub from: LocationId,
    pub to: LocationId,

    /// Length in metres.
    pub distance: f64,

    pub road_class: RoadClass,

    /// Only traversable from `from` to `to`.
    #[serde(default)]
    pub one_way: bool,
}

/// The road data of one tile.
///
/// `nodes` includes the far ends of edges that leave the tile; those lie
/// outside the tile's bounds and are its boundary nodes.
#[derive(Debug, Clone, PartialEq)]
pub struct RoutableTile {
    pub coordinate: TileCoordinate,
    pub nodes: Vec<RoutableTileNode>,
    pub edges: Vec<RoutableEdge>,
}

impl RoutableTile {
    pub fn new(
        coordinate: TileCoordinate,
        nodes: Vec<RoutableTileNode>,
        edges: Vec<RoutableEdge>,
    ) -> Self {
        Self {
            coordinate,
            nodes,
            edges,
        }
    }

    /// A tile without roads.
    pub fn empty(coordinate: TileCoordinate) -> Self {
        Self::new(coordinate, Vec::new(), Vec::new())
    }

    /// Whether the node lies within this tile's bounds.
    pub fn contains(&self, node: &RoutableTileNode) -> bool {
        self.coordinate.contains_point(node.latitude, node.longitude)
    }

    /// Referenced nodes outside this tile's bounds.
    pub fn boundary_nodes(&self) -> impl Iterator<Item = &RoutableTileNode> {
        self.nodes.iter().filter(|node| !self.contains(node))
    }
}

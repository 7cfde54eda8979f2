//! The road graph assembled from fetched tiles.

use std::collections::{HashMap, HashSet};

use crate::domain::{LocationId, RoadClass};
use crate::spatial::BoundingBox;

use super::{RoutableTile, RoutableTileNode};

/// Outgoing edge in the adjacency list.
#[derive(Debug, Clone, PartialEq)]
pub struct GraphEdge {
    pub to: LocationId,
    pub distance: f64,
    pub road_class: RoadClass,
}

/// Directed road graph grown tile by tile.
///
/// Nodes shared by adjacent tiles carry the same id and are stored once;
/// merging the same tile twice adds nothing.
#[derive(Debug, Default)]
pub struct RoutableTileGraph {
    nodes: HashMap<LocationId, RoutableTileNode>,
    adjacency: HashMap<LocationId, Vec<GraphEdge>>,
    edge_keys: HashSet<(LocationId, LocationId)>,
}

impl RoutableTileGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge a tile's nodes and edges. Returns the number of new edges.
    pub fn merge_tile(&mut self, tile: &RoutableTile) -> usize {
        for node in &tile.nodes {
            self.add_node(node.clone());
        }
        let mut added = 0;
        for edge in &tile.edges {
            if self.add_edge(&edge.from, &edge.to, edge.distance, edge.road_class) {
                added += 1;
            }
            if !edge.one_way && self.add_edge(&edge.to, &edge.from, edge.distance, edge.road_class)
            {
                added += 1;
            }
        }
        added
    }

    /// Insert a node unless one with the same id exists.
    pub fn add_node(&mut self, node: RoutableTileNode) -> bool {
        if self.nodes.contains_key(&node.id) {
            return false;
        }
        self.nodes.insert(node.id.clone(), node);
        true
    }

    /// Insert a directed edge unless it exists.
    pub fn add_edge(
        &mut self,
        from: &LocationId,
        to: &LocationId,
        distance: f64,
        road_class: RoadClass,
    ) -> bool {
        if !self.edge_keys.insert((from.clone(), to.clone())) {
            return false;
        }
        self.adjacency
            .entry(from.clone())
            .or_default()
            .push(GraphEdge {
                to: to.clone(),
                distance,
                road_class,
            });
        true
    }

    pub fn node(&self, id: &LocationId) -> Option<&RoutableTileNode> {
        self.nodes.get(id)
    }

    pub fn contains_node(&self, id: &LocationId) -> bool {
        self.nodes.contains_key(id)
    }

    pub fn neighbours(&self, id: &LocationId) -> &[GraphEdge] {
        self.adjacency.get(id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Nodes whose coordinates fall in the box.
    pub fn nodes_within<'a>(
        &'a self,
        bbox: &'a BoundingBox,
    ) -> impl Iterator<Item = &'a RoutableTileNode> + 'a {
        self.nodes
            .values()
            .filter(move |node| bbox.contains(node.latitude, node.longitude))
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edge_keys.len()
    }
}

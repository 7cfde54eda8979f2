//! Per-query pathfinding state.
//!
//! A [`PathfindingSession`] owns everything one query learns about the road
//! network for one profile: the merged graph, which tiles were claimed,
//! which nodes are breakpoints and which locations were embedded. Sessions
//! live in a [`SessionArena`] keyed by query and profile, so the long-lived
//! planner itself stays immutable.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use crate::domain::{Location, LocationId, Profile, ProfileId, QueryId, RoadClass};
use crate::spatial::{BoundingBox, TileCoordinate};
use crate::tiles::{RoutableTile, RoutableTileGraph, RoutableTileNode};

/// Which way connector edges point when a location is embedded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EmbedDirection {
    /// Edges run from the location into the graph.
    Source,
    /// Edges run from the graph to the location.
    Sink,
}

impl EmbedDirection {
    fn prefix(self) -> &'static str {
        match self {
            EmbedDirection::Source => "source",
            EmbedDirection::Sink => "sink",
        }
    }
}

#[derive(Debug)]
pub struct PathfindingSession {
    profile: Arc<Profile>,
    graph: RoutableTileGraph,
    reached_tiles: HashSet<(ProfileId, String)>,
    breakpoints: HashSet<LocationId>,

    /// Nodes lying inside a merged tile; these are never breakpoints.
    covered: HashSet<LocationId>,

    local_tiles: Vec<TileCoordinate>,
    embedded: HashMap<LocationId, Location>,
}

impl PathfindingSession {
    pub fn new(profile: Arc<Profile>) -> Self {
        Self {
            profile,
            graph: RoutableTileGraph::new(),
            reached_tiles: HashSet::new(),
            breakpoints: HashSet::new(),
            covered: HashSet::new(),
            local_tiles: Vec::new(),
            embedded: HashMap::new(),
        }
    }

    pub fn profile(&self) -> &Arc<Profile> {
        &self.profile
    }

    pub fn graph(&self) -> &RoutableTileGraph {
        &self.graph
    }

    /// Mark a tile as reached. Returns `false` when it already was, in which
    /// case the caller must not fetch it.
    pub fn claim_tile(&mut self, tile_id: &str) -> bool {
        self.reached_tiles
            .insert((self.profile.id.clone(), tile_id.to_string()))
    }

    pub fn is_reached(&self, tile_id: &str) -> bool {
        self.reached_tiles
            .contains(&(self.profile.id.clone(), tile_id.to_string()))
    }

    pub fn reached_tile_count(&self) -> usize {
        self.reached_tiles.len()
    }

    /// Merge a fetched tile and update breakpoints: nodes inside the tile
    /// stop being breakpoints, referenced nodes outside any merged tile
    /// become breakpoints.
    pub fn merge_tile(&mut self, tile: &RoutableTile) {
        self.graph.merge_tile(tile);
        for node in &tile.nodes {
            if tile.contains(node) {
                self.covered.insert(node.id.clone());
                self.breakpoints.remove(&node.id);
            } else if !self.covered.contains(&node.id) {
                self.breakpoints.insert(node.id.clone());
            }
        }
    }

    pub fn breakpoints(&self) -> &HashSet<LocationId> {
        &self.breakpoints
    }

    /// Forget breakpoints whose tiles have been dealt with.
    pub fn clear_breakpoints(&mut self, nodes: &[LocationId]) {
        for node in nodes {
            self.breakpoints.remove(node);
        }
    }

    pub fn set_local_tiles(&mut self, tiles: Vec<TileCoordinate>) {
        self.local_tiles = tiles;
    }

    pub fn local_tiles(&self) -> &[TileCoordinate] {
        &self.local_tiles
    }

    /// Splice `location` into the graph, joined to its `neighbours` nearest
    /// graph nodes inside `bbox`. Returns the node id to search from or to.
    ///
    /// A location whose id already names a graph node is used as is.
    pub fn embed(
        &mut self,
        location: &Location,
        direction: EmbedDirection,
        neighbours: usize,
        bbox: &BoundingBox,
    ) -> LocationId {
        if let Some(id) = &location.id {
            if self.graph.contains_node(id) && !self.embedded.contains_key(id) {
                return id.clone();
            }
        }

        let key = match &location.id {
            Some(id) => id.to_string(),
            None => format!("{:.7},{:.7}", location.latitude, location.longitude),
        };
        let node_id = LocationId::new(format!("{}:{}", direction.prefix(), key));
        if self.embedded.contains_key(&node_id) {
            return node_id;
        }

        let mut nearest: Vec<(f64, LocationId)> = self
            .graph
            .nodes_within(bbox)
            .filter(|node| !self.embedded.contains_key(&node.id))
            .map(|node| (location.distance_to(&node.location()), node.id.clone()))
            .collect();
        nearest.sort_by(|a, b| a.0.total_cmp(&b.0).then_with(|| a.1.cmp(&b.1)));
        nearest.truncate(neighbours);

        self.graph.add_node(RoutableTileNode::new(
            node_id.clone(),
            location.latitude,
            location.longitude,
        ));
        for (distance, neighbour) in nearest {
            let (from, to) = match direction {
                EmbedDirection::Source => (&node_id, &neighbour),
                EmbedDirection::Sink => (&neighbour, &node_id),
            };
            self.graph.add_edge(from, to, distance, RoadClass::Connector);
        }
        self.covered.insert(node_id.clone());
        self.embedded.insert(node_id.clone(), location.clone());
        node_id
    }

    /// The location a node id stands for: an embedded location resolves to
    /// the location itself, a road node to its coordinates.
    pub fn resolve(&self, id: &LocationId) -> Option<Location> {
        self.embedded
            .get(id)
            .cloned()
            .or_else(|| self.graph.node(id).map(RoutableTileNode::location))
    }
}

/// Sessions of all live queries.
#[derive(Debug, Default)]
pub struct SessionArena {
    sessions: HashMap<(QueryId, ProfileId), PathfindingSession>,
}

impl SessionArena {
    pub fn new() -> Self {
        Self::default()
    }

    /// The session for a query and profile, created on first use.
    pub fn session(&mut self, query: QueryId, profile: &Arc<Profile>) -> &mut PathfindingSession {
        self.sessions
            .entry((query, profile.id.clone()))
            .or_insert_with(|| PathfindingSession::new(profile.clone()))
    }

    /// Drop every session of a query.
    pub fn release(&mut self, query: QueryId) {
        self.sessions.retain(|(id, _), _| *id != query);
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

//! In-memory network serving every provider trait.
//!
//! Loads stops, connections and a road graph from JSON and serves them as if
//! they were fetched. Road tiles are cut from the graph on request, at any
//! zoom, so tile-selection policies can be exercised without tile files.
//! Counters record how much was read, which tests use to check laziness and
//! fetch idempotence.

use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use either::Either;
use futures::{Stream, StreamExt, stream};
use serde::{Deserialize, Serialize};

use crate::domain::{Connection, LocationId, Stop, Timestamp};
use crate::error::ProviderError;
use crate::spatial::TileCoordinate;
use crate::tiles::{RoutableEdge, RoutableTile, RoutableTileNode};

use super::{ConnectionsProvider, RoutableTileProvider, ScanDirection, StopsProvider};

/// Road graph as stored on disk.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RoadData {
    #[serde(default)]
    pub nodes: Vec<RoutableTileNode>,
    #[serde(default)]
    pub edges: Vec<RoutableEdge>,
}

/// Serialized form of a network.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NetworkData {
    #[serde(default)]
    pub stops: Vec<Stop>,
    #[serde(default)]
    pub connections: Vec<Connection>,
    #[serde(default)]
    pub road: RoadData,
}

/// Network held entirely in memory.
#[derive(Debug)]
pub struct MemoryNetwork {
    stops: Vec<Stop>,
    stop_index: HashMap<LocationId, usize>,

    /// Sorted by departure time.
    connections: Vec<Connection>,

    road_nodes: HashMap<LocationId, RoutableTileNode>,
    road_edges: Vec<RoutableEdge>,

    /// Prefix of tile ids, so two networks can act as distinct tile layers.
    layer: String,

    failing: AtomicBool,
    failing_tiles: AtomicBool,
    connection_reads: AtomicUsize,
    tile_fetches: AtomicUsize,
    stop_lookups: AtomicUsize,
}

impl MemoryNetwork {
    pub fn new(data: NetworkData) -> Self {
        let mut connections = data.connections;
        connections.sort_by(|a, b| {
            a.departure_time
                .cmp(&b.departure_time)
                .then_with(|| a.id.cmp(&b.id))
        });

        let stop_index = data
            .stops
            .iter()
            .enumerate()
            .map(|(i, stop)| (stop.id.clone(), i))
            .collect();

        let road_nodes = data
            .road
            .nodes
            .into_iter()
            .map(|node| (node.id.clone(), node))
            .collect();

        Self {
            stops: data.stops,
            stop_index,
            connections,
            road_nodes,
            road_edges: data.road.edges,
            layer: "base".to_string(),
            failing: AtomicBool::new(false),
            failing_tiles: AtomicBool::new(false),
            connection_reads: AtomicUsize::new(0),
            tile_fetches: AtomicUsize::new(0),
            stop_lookups: AtomicUsize::new(0),
        }
    }

    /// Parse a network from JSON text.
    pub fn from_json_str(json: &str) -> Result<Self, ProviderError> {
        serde_json::from_str::<NetworkData>(json)
            .map(Self::new)
            .map_err(|e| ProviderError::Load(format!("failed to parse network: {e}")))
    }

    /// Load a network from a JSON file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ProviderError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .map_err(|e| ProviderError::Load(format!("failed to read {path:?}: {e}")))?;
        Self::from_json_str(&json)
    }

    /// Name the tile layer this network serves.
    pub fn with_layer(mut self, layer: impl Into<String>) -> Self {
        self.layer = layer.into();
        self
    }

    /// Make every connection read fail from now on (or stop failing).
    pub fn fail_connections(&self, failing: bool) {
        self.failing.store(failing, Ordering::Relaxed);
    }

    /// Make every tile fetch fail from now on (or stop failing).
    pub fn fail_tiles(&self, failing: bool) {
        self.failing_tiles.store(failing, Ordering::Relaxed);
    }

    pub fn stop_count(&self) -> usize {
        self.stops.len()
    }

    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    /// Connections handed out so far, across all streams.
    pub fn connection_reads(&self) -> usize {
        self.connection_reads.load(Ordering::Relaxed)
    }

    pub fn tile_fetches(&self) -> usize {
        self.tile_fetches.load(Ordering::Relaxed)
    }

    pub fn stop_lookups(&self) -> usize {
        self.stop_lookups.load(Ordering::Relaxed)
    }

    /// Cut the tile at `coordinate` out of the road graph.
    fn cut_tile(&self, coordinate: TileCoordinate) -> RoutableTile {
        let inside = |id: &LocationId| {
            self.road_nodes
                .get(id)
                .is_some_and(|node| coordinate.contains_point(node.latitude, node.longitude))
        };

        let edges: Vec<RoutableEdge> = self
            .road_edges
            .iter()
            .filter(|edge| inside(&edge.from) || inside(&edge.to))
            .cloned()
            .collect();

        let mut seen = HashSet::new();
        let mut nodes = Vec::new();
        let mut keep = |id: &LocationId| {
            if let Some(node) = self.road_nodes.get(id) {
                if seen.insert(id.clone()) {
                    nodes.push(node.clone());
                }
            }
        };
        for node in self.road_nodes.values() {
            if coordinate.contains_point(node.latitude, node.longitude) {
                keep(&node.id);
            }
        }
        for edge in &edges {
            keep(&edge.from);
            keep(&edge.to);
        }

        RoutableTile::new(coordinate, nodes, edges)
    }
}

impl ConnectionsProvider for MemoryNetwork {
    fn connections(
        &self,
        from: Timestamp,
        direction: ScanDirection,
    ) -> impl Stream<Item = Result<Connection, ProviderError>> + '_ {
        let failing = self.failing.load(Ordering::Relaxed);
        let reads = &self.connection_reads;

        let selected = match direction {
            ScanDirection::Forward => {
                let start = self
                    .connections
                    .partition_point(|c| c.departure_time < from);
                Either::Left(self.connections[start..].iter())
            }
            ScanDirection::Backward => {
                let end = self
                    .connections
                    .partition_point(|c| c.departure_time <= from);
                Either::Right(self.connections[..end].iter().rev())
            }
        };

        stream::iter(selected).map(move |connection| {
            reads.fetch_add(1, Ordering::Relaxed);
            if failing {
                Err(ProviderError::Fetch {
                    resource: format!("connection {}", connection.id),
                    message: "connection feed unavailable".to_string(),
                })
            } else {
                Ok(connection.clone())
            }
        })
    }
}

impl StopsProvider for MemoryNetwork {
    async fn stop_by_id(&self, id: &LocationId) -> Result<Option<Stop>, ProviderError> {
        self.stop_lookups.fetch_add(1, Ordering::Relaxed);
        Ok(self.stop_index.get(id).map(|&i| self.stops[i].clone()))
    }

    async fn all_stops(&self) -> Result<Vec<Stop>, ProviderError> {
        Ok(self.stops.clone())
    }
}

impl RoutableTileProvider for MemoryNetwork {
    async fn tile_by_coordinate(
        &self,
        coordinate: TileCoordinate,
    ) -> Result<Arc<RoutableTile>, ProviderError> {
        self.tile_fetches.fetch_add(1, Ordering::Relaxed);
        if self.failing_tiles.load(Ordering::Relaxed) {
            return Err(ProviderError::Fetch {
                resource: format!("tile {}", self.tile_id(coordinate)),
                message: "tile server unavailable".to_string(),
            });
        }
        Ok(Arc::new(self.cut_tile(coordinate)))
    }

    async fn node_by_id(&self, id: &LocationId) -> Result<Option<RoutableTileNode>, ProviderError> {
        Ok(self.road_nodes.get(id).cloned())
    }

    fn tile_id(&self, coordinate: TileCoordinate) -> String {
        format!("{}/{}", self.layer, coordinate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const NETWORK: &str = r#"{
        "stops": [
            {"id": "a", "name": "A", "latitude": 51.05, "longitude": 3.72},
            {"id": "b", "name": "B", "latitude": 51.06, "longitude": 3.74}
        ],
        "connections": [
            {"id": "c2", "departure_stop": "b", "arrival_stop": "a",
             "departure_time": "2024-03-15T10:30:00Z", "arrival_time": "2024-03-15T10:40:00Z",
             "trip_id": "t2"},
            {"id": "c1", "departure_stop": "a", "arrival_stop": "b",
             "departure_time": "2024-03-15T10:00:00Z", "arrival_time": "2024-03-15T10:10:00Z",
             "trip_id": "t1"},
            {"id": "c3", "departure_stop": "a", "arrival_stop": "b",
             "departure_time": "2024-03-15T11:00:00Z", "arrival_time": "2024-03-15T11:10:00Z",
             "trip_id": "t3", "travel_mode": "bus"}
        ],
        "road": {
            "nodes": [
                {"id": "n1", "latitude": 51.0500, "longitude": 3.7200},
                {"id": "n2", "latitude": 51.0500, "longitude": 3.7600}
            ],
            "edges": [
                {"from": "n1", "to": "n2", "distance": 2800.0, "road_class": "primary"}
            ]
        }
    }"#;

    fn at(h: u32, m: u32) -> Timestamp {
        use chrono::TimeZone;
        chrono::Utc.with_ymd_and_hms(2024, 3, 15, h, m, 0).unwrap()
    }

    async fn ids(network: &MemoryNetwork, from: Timestamp, direction: ScanDirection) -> Vec<String> {
        network
            .connections(from, direction)
            .map(|c| c.unwrap().id.to_string())
            .collect()
            .await
    }

    #[tokio::test]
    async fn forward_and_backward_seek() {
        let network = MemoryNetwork::from_json_str(NETWORK).unwrap();

        assert_eq!(ids(&network, at(10, 0), ScanDirection::Forward).await, ["c1", "c2", "c3"]);
        assert_eq!(ids(&network, at(10, 1), ScanDirection::Forward).await, ["c2", "c3"]);
        assert_eq!(ids(&network, at(10, 30), ScanDirection::Backward).await, ["c2", "c1"]);
        assert!(ids(&network, at(9, 0), ScanDirection::Backward).await.is_empty());
    }

    #[tokio::test]
    async fn streams_are_lazy() {
        let network = MemoryNetwork::from_json_str(NETWORK).unwrap();
        let first: Vec<_> = network
            .connections(at(9, 0), ScanDirection::Forward)
            .take(1)
            .collect()
            .await;

        assert_eq!(first.len(), 1);
        assert_eq!(network.connection_reads(), 1);
    }

    #[tokio::test]
    async fn failing_feed_reports_fetch_errors() {
        let network = MemoryNetwork::from_json_str(NETWORK).unwrap();
        network.fail_connections(true);
        let mut stream = Box::pin(network.connections(at(9, 0), ScanDirection::Forward));

        assert!(matches!(
            stream.next().await,
            Some(Err(ProviderError::Fetch { .. }))
        ));
    }

    #[tokio::test]
    async fn stops_by_id() {
        let network = MemoryNetwork::from_json_str(NETWORK).unwrap();
        let stop = network.stop_by_id(&LocationId::new("b")).await.unwrap();

        assert_eq!(stop.map(|s| s.name), Some("B".to_string()));
        assert!(network.stop_by_id(&LocationId::new("z")).await.unwrap().is_none());
        assert_eq!(network.all_stops().await.unwrap().len(), 2);
        assert_eq!(network.stop_lookups(), 2);
    }

    #[tokio::test]
    async fn tiles_include_edges_leaving_them() {
        let network = MemoryNetwork::from_json_str(NETWORK).unwrap().with_layer("transit");
        let coordinate = TileCoordinate::from_lat_lon(51.05, 3.72, 14);
        let tile = network.tile_by_coordinate(coordinate).await.unwrap();

        assert_eq!(tile.edges.len(), 1);
        assert_eq!(tile.nodes.len(), 2);
        let boundary: Vec<_> = tile.boundary_nodes().map(|n| n.id.as_str()).collect();
        assert_eq!(boundary, ["n2"]);
        assert_eq!(network.tile_id(coordinate), "transit/14/8361/5481");
        assert_eq!(network.tile_fetches(), 1);
    }

    #[test]
    fn load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(NETWORK.as_bytes()).unwrap();

        let network = MemoryNetwork::from_file(file.path()).unwrap();
        assert_eq!(network.connections.len(), 3);
        assert_eq!(network.connections[0].id.as_str(), "c1");
    }

    #[tokio::test]
    async fn road_nodes_by_id() {
        let network = MemoryNetwork::from_json_str(include_str!("../../data/demo.json")).unwrap();

        let node = network.node_by_id(&LocationId::new("gsp-1-2")).await.unwrap();
        assert_eq!(node.map(|n| (n.latitude, n.longitude)), Some((51.0355, 3.711)));
        assert!(network.node_by_id(&LocationId::new("lokeren")).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn failing_tiles_report_fetch_errors() {
        let network = MemoryNetwork::from_json_str(include_str!("../../data/demo.json")).unwrap();
        let coordinate = TileCoordinate::from_lat_lon(51.0355, 3.711, 14);
        network.fail_tiles(true);

        let err = network.tile_by_coordinate(coordinate).await.unwrap_err();
        assert!(matches!(err, ProviderError::Fetch { .. }));

        network.fail_tiles(false);
        assert!(network.tile_by_coordinate(coordinate).await.is_ok());
    }

    #[test]
    fn bundled_demo_network_loads() {
        let network =
            MemoryNetwork::from_json_str(include_str!("../../data/demo.json")).unwrap();
        assert_eq!(network.stop_count(), 7);
        assert_eq!(network.connection_count(), 18);
        assert!(
            network
                .connections
                .windows(2)
                .all(|pair| pair[0].departure_time <= pair[1].departure_time)
        );
    }

    #[test]
    fn invalid_json_is_a_load_error() {
        let err = MemoryNetwork::from_json_str("{\"stops\": 3}").unwrap_err();
        assert!(matches!(err, ProviderError::Load(_)));
    }
}

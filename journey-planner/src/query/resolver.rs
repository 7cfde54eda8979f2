//! Turning endpoint ids into locations.
//!
//! Stops and road nodes share one id space: an id is looked up as a stop
//! first, then as a road node. Stops never move, so a resolved stop is
//! cached for the life of the resolver.

use std::sync::Arc;

use moka::future::Cache as MokaCache;
use tracing::trace;

use crate::domain::{Location, LocationId, Stop};
use crate::error::PlannerError;
use crate::provider::{RoutableTileProvider, StopsProvider};

use super::Endpoint;

/// Resolves location ids to coordinates.
pub trait LocationResolver {
    async fn resolve_id(&self, id: &LocationId) -> Result<Location, PlannerError>;

    async fn resolve(&self, endpoint: &Endpoint) -> Result<Location, PlannerError> {
        match endpoint {
            Endpoint::Id(id) => self.resolve_id(id).await,
            Endpoint::Location(location) => Ok(location.clone()),
        }
    }
}

/// Resolver backed by a stops provider.
pub struct StopLocationResolver<S> {
    stops: Arc<S>,
    cache: MokaCache<LocationId, Stop>,
}

impl<S: StopsProvider> StopLocationResolver<S> {
    pub fn new(stops: Arc<S>, max_capacity: u64) -> Self {
        Self {
            stops,
            cache: MokaCache::builder().max_capacity(max_capacity).build(),
        }
    }

    /// The stop with this id, if the provider knows it.
    pub async fn stop(&self, id: &LocationId) -> Result<Option<Stop>, PlannerError> {
        if let Some(stop) = self.cache.get(id).await {
            trace!(stop = %id, "Stop cache hit");
            return Ok(Some(stop));
        }
        let Some(stop) = self.stops.stop_by_id(id).await? else {
            return Ok(None);
        };
        self.cache.insert(id.clone(), stop.clone()).await;
        Ok(Some(stop))
    }
}

impl<S: StopsProvider> LocationResolver for StopLocationResolver<S> {
    async fn resolve_id(&self, id: &LocationId) -> Result<Location, PlannerError> {
        match self.stop(id).await? {
            Some(stop) => Ok(stop.location()),
            None => Err(PlannerError::InvalidQuery(format!("unknown location {id}"))),
        }
    }
}

/// Resolver over stops and road nodes.
pub struct NetworkLocationResolver<S, T> {
    stops: StopLocationResolver<S>,
    nodes: Arc<T>,
}

impl<S: StopsProvider, T: RoutableTileProvider> NetworkLocationResolver<S, T> {
    pub fn new(stops: StopLocationResolver<S>, nodes: Arc<T>) -> Self {
        Self { stops, nodes }
    }

    pub async fn stop(&self, id: &LocationId) -> Result<Option<Stop>, PlannerError> {
        self.stops.stop(id).await
    }
}

impl<S: StopsProvider, T: RoutableTileProvider> LocationResolver for NetworkLocationResolver<S, T> {
    async fn resolve_id(&self, id: &LocationId) -> Result<Location, PlannerError> {
        if let Some(stop) = self.stops.stop(id).await? {
            return Ok(stop.location());
        }
        match self.nodes.node_by_id(id).await? {
            Some(node) => Ok(node.location()),
            None => Err(PlannerError::InvalidQuery(format!("unknown location {id}"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::{MemoryNetwork, NetworkData, RoadData};
    use crate::tiles::RoutableTileNode;

    fn network() -> Arc<MemoryNetwork> {
        Arc::new(MemoryNetwork::new(NetworkData {
            road: RoadData {
                nodes: vec![RoutableTileNode::new("n1", 51.0360, 3.7105)],
                edges: vec![],
            },
            stops: vec![Stop {
                id: LocationId::new("gsp"),
                name: "Gent-Sint-Pieters".into(),
                latitude: 51.0357,
                longitude: 3.7101,
                avg_stop_times: 0.0,
            }],
            ..NetworkData::default()
        }))
    }

    #[tokio::test]
    async fn resolves_and_caches_stops() {
        let network = network();
        let resolver = StopLocationResolver::new(network.clone(), 100);

        let location = resolver.resolve_id(&LocationId::new("gsp")).await.unwrap();
        assert_eq!(location.name.as_deref(), Some("Gent-Sint-Pieters"));
        resolver.resolve_id(&LocationId::new("gsp")).await.unwrap();

        assert_eq!(network.stop_lookups(), 1);
    }

    #[tokio::test]
    async fn explicit_locations_pass_through() {
        let network = network();
        let resolver = StopLocationResolver::new(network.clone(), 100);
        let here = Location::new(51.05, 3.72);

        let resolved = resolver.resolve(&Endpoint::Location(here.clone())).await.unwrap();
        assert_eq!(resolved, here);
        assert_eq!(network.stop_lookups(), 0);
    }

    #[tokio::test]
    async fn unknown_ids_are_invalid() {
        let resolver = StopLocationResolver::new(network(), 100);

        let err = resolver
            .resolve(&Endpoint::Id(LocationId::new("nowhere")))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "invalid query: unknown location nowhere");
    }

    #[tokio::test]
    async fn road_nodes_resolve_after_stops() {
        let network = network();
        let resolver =
            NetworkLocationResolver::new(StopLocationResolver::new(network.clone(), 100), network);

        let stop = resolver.resolve_id(&LocationId::new("gsp")).await.unwrap();
        assert_eq!(stop.name.as_deref(), Some("Gent-Sint-Pieters"));

        let node = resolver.resolve(&Endpoint::from("n1")).await.unwrap();
        assert_eq!(node, Location::new(51.0360, 3.7105).with_id("n1"));
        assert!(resolver.stop(&LocationId::new("n1")).await.unwrap().is_none());

        let err = resolver.resolve_id(&LocationId::new("nowhere")).await.unwrap_err();
        assert_eq!(err.to_string(), "invalid query: unknown location nowhere");
    }
}

//! Road planner over lazily fetched tiles.
//!
//! Searches start on a graph holding only the tiles around the endpoints.
//! Whenever the search suspends at breakpoints, the planner picks the tiles
//! behind them, claims each tile once per session, fetches the claimed tiles
//! together and resumes.

use std::collections::HashMap;
use std::sync::Arc;

use futures::future::join_all;
use tracing::{debug, trace};

use crate::domain::{Leg, Location, LocationId, Path, Profiles, Step, TravelMode};
use crate::error::PlannerError;
use crate::events::{Event, EventSink};
use crate::provider::RoutableTileProvider;
use crate::query::ResolvedQuery;
use crate::spatial::{BoundingBox, tiles_in_bbox};

use super::policy::{RoadPlannerConfig, TileChoice, TileLayer};
use super::search::{DijkstraSearch, GraphStep, Label, SearchStatus};
use super::session::{EmbedDirection, PathfindingSession, SessionArena};

/// Plans single-leg road paths between locations.
pub struct RoadPlanner<T> {
    base: Arc<T>,
    transit: Option<Arc<T>>,
    profiles: Arc<Profiles>,
    config: RoadPlannerConfig,
    events: Arc<dyn EventSink>,
}

impl<T: RoutableTileProvider> RoadPlanner<T> {
    pub fn new(
        base: Arc<T>,
        profiles: Arc<Profiles>,
        config: RoadPlannerConfig,
        events: Arc<dyn EventSink>,
    ) -> Self {
        Self {
            base,
            transit: None,
            profiles,
            config,
            events,
        }
    }

    /// Serve tiles away from the endpoints from a second provider.
    pub fn with_transit_layer(mut self, transit: Arc<T>) -> Self {
        self.transit = Some(transit);
        self
    }

    pub fn profiles(&self) -> &Profiles {
        &self.profiles
    }

    pub fn config(&self) -> &RoadPlannerConfig {
        &self.config
    }

    /// The provider of detailed tiles.
    pub fn base(&self) -> &Arc<T> {
        &self.base
    }

    /// One road path per origin and destination pair that are connected.
    pub async fn plan(
        &self,
        query: &ResolvedQuery,
        arena: &mut SessionArena,
    ) -> Result<Vec<Path>, PlannerError> {
        let profile = self
            .profiles
            .get(&query.profile_id)
            .ok_or_else(|| PlannerError::UnknownProfile(query.profile_id.to_string()))?;
        let session = arena.session(query.id, &profile);

        let mut paths = Vec::new();
        for from in &query.from {
            for to in &query.to {
                if let Some(path) = self.path_between(session, from, to).await? {
                    paths.push(path);
                }
            }
        }
        Ok(paths)
    }

    /// Road path from `from` to `to`, or `None` when no route exists within
    /// the search bound.
    pub async fn path_between(
        &self,
        session: &mut PathfindingSession,
        from: &Location,
        to: &Location,
    ) -> Result<Option<Path>, PlannerError> {
        session.set_local_tiles(self.config.local_tiles(&[
            (from.latitude, from.longitude),
            (to.latitude, to.longitude),
        ]));

        let source = self.embed(session, from, EmbedDirection::Source).await?;
        let sink = self.embed(session, to, EmbedDirection::Sink).await?;
        let max_distance = self.config.max_distance.bound(from.distance_to(to));

        let Some(route) = self
            .shortest_path(session, &source, &sink, max_distance)
            .await?
        else {
            return Ok(None);
        };
        if route.is_empty() {
            return Ok(None);
        }

        let mut steps = Vec::with_capacity(route.len());
        for hop in route {
            let (Some(start), Some(stop)) = (session.resolve(&hop.from), session.resolve(&hop.to))
            else {
                return Err(PlannerError::InvalidQuery(format!(
                    "road node {} or {} is not in the graph",
                    hop.from, hop.to
                )));
            };
            steps.push(Step::new(start, stop, hop.distance, hop.duration));
        }

        let leg = Leg::new(TravelMode::Road, steps)?;
        Ok(Some(Path::new(vec![leg])?))
    }

    /// Cheapest route between two graph nodes, fetching tiles as the search
    /// reaches them.
    pub async fn shortest_path(
        &self,
        session: &mut PathfindingSession,
        from: &LocationId,
        to: &LocationId,
        max_distance: f64,
    ) -> Result<Option<Vec<GraphStep>>, PlannerError> {
        let mut search = DijkstraSearch::new(
            from.clone(),
            Some(to.clone()),
            max_distance,
            session.profile().clone(),
        );
        loop {
            match search.resume(session.graph(), session.breakpoints()) {
                SearchStatus::Reached => return Ok(Some(search.steps_to(to))),
                SearchStatus::Exhausted => {
                    trace!(from = %from, to = %to, max_distance, "No road route");
                    return Ok(None);
                }
                SearchStatus::Suspended(nodes) => self.expand(session, &nodes).await?,
            }
        }
    }

    /// Every node reachable from `from` within `max_distance` metres.
    pub async fn shortest_path_tree(
        &self,
        session: &mut PathfindingSession,
        from: &LocationId,
        max_distance: f64,
    ) -> Result<HashMap<LocationId, Label>, PlannerError> {
        let mut search =
            DijkstraSearch::new(from.clone(), None, max_distance, session.profile().clone());
        loop {
            match search.resume(session.graph(), session.breakpoints()) {
                SearchStatus::Reached | SearchStatus::Exhausted => return Ok(search.into_tree()),
                SearchStatus::Suspended(nodes) => self.expand(session, &nodes).await?,
            }
        }
    }

    /// Fetch the tiles behind a round of breakpoints.
    async fn expand(
        &self,
        session: &mut PathfindingSession,
        nodes: &[LocationId],
    ) -> Result<(), PlannerError> {
        let mut claimed = Vec::new();
        for id in nodes {
            let Some(node) = session.graph().node(id).cloned() else {
                continue;
            };
            let choice = self
                .config
                .tile_selection
                .pick(&node, session.local_tiles());
            if self.claim(session, choice) {
                claimed.push(choice);
            }
        }
        session.clear_breakpoints(nodes);
        debug!(
            breakpoints = nodes.len(),
            tiles = claimed.len(),
            "Expanding road graph"
        );
        self.fetch_all(session, claimed).await
    }

    /// Reserve a tile in the session. Returns `false` when it (or, for an
    /// endpoint tile, its twin in the other layer) was already reached.
    fn claim(&self, session: &mut PathfindingSession, choice: TileChoice) -> bool {
        let base_id = self.base.tile_id(choice.coordinate);
        let Some(transit) = &self.transit else {
            return session.claim_tile(&base_id);
        };
        let transit_id = transit.tile_id(choice.coordinate);
        if session.is_reached(&base_id) || session.is_reached(&transit_id) {
            return false;
        }
        if choice.layer == TileLayer::Base {
            session.claim_tile(&base_id);
        }
        session.claim_tile(&transit_id)
    }

    fn provider(&self, layer: TileLayer) -> &T {
        match layer {
            TileLayer::Transit => self.transit.as_deref().unwrap_or(&self.base),
            TileLayer::Base => &self.base,
        }
    }

    async fn fetch_all(
        &self,
        session: &mut PathfindingSession,
        choices: Vec<TileChoice>,
    ) -> Result<(), PlannerError> {
        if choices.is_empty() {
            return Ok(());
        }
        for choice in &choices {
            self.events.emit(Event::FetchTile {
                coordinate: choice.coordinate,
                tile_id: self.provider(choice.layer).tile_id(choice.coordinate),
            });
        }

        let fetches = choices
            .iter()
            .map(|choice| self.provider(choice.layer).tile_by_coordinate(choice.coordinate));
        let tiles = join_all(fetches).await;

        for tile in tiles {
            let tile = tile?;
            session.merge_tile(&tile);
        }
        Ok(())
    }

    /// Fetch the base tiles around a location and splice it into the graph.
    async fn embed(
        &self,
        session: &mut PathfindingSession,
        location: &Location,
        direction: EmbedDirection,
    ) -> Result<LocationId, PlannerError> {
        if let Some(id) = &location.id {
            if session.graph().contains_node(id) {
                return Ok(id.clone());
            }
        }

        let bbox = BoundingBox::around(
            location.latitude,
            location.longitude,
            self.config.embedding_padding,
        );
        let mut claimed = Vec::new();
        for coordinate in tiles_in_bbox(&bbox, self.config.embedding_zoom) {
            let choice = TileChoice {
                coordinate,
                layer: TileLayer::Base,
            };
            if self.claim(session, choice) {
                claimed.push(choice);
            }
        }
        self.fetch_all(session, claimed).await?;

        Ok(session.embed(
            location,
            direction,
            self.config.embedding_neighbours,
            &bbox,
        ))
    }
}

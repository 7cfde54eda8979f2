//! Exponentially widening query execution.
//!
//! A query is planned over a short window first. Each time more paths are
//! wanted and the window might still hold some, the window is widened by
//! [`RunnerConfig::growth_factor`] and planned again; paths already handed
//! out are never repeated. [`PathStream`] is pull based: nothing is planned
//! until a caller asks for paths.

use std::collections::{HashSet, VecDeque};
use std::pin::pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::Duration;
use futures::{Stream, StreamExt, stream};
use tracing::{debug, info};

use crate::domain::{Leg, Location, Path, PathSignature, QueryId, Timestamp, TravelMode};
use crate::error::PlannerError;
use crate::events::{Event, EventSink};
use crate::pathfinding::{RoadPlanner, SessionArena};
use crate::provider::{ConnectionsProvider, RoutableTileProvider, ScanDirection, StopsProvider};
use crate::stops::{Footpath, ReachableStop, ReachableStopsFinder, SearchPhase};
use crate::transit::{TransitRequest, deduplicate, rank_paths};

use super::config::RunnerConfig;
use super::request::{Query, ResolvedQuery, TimeBound};
use super::resolver::{LocationResolver, NetworkLocationResolver, StopLocationResolver};

/// Runs queries against one network.
pub struct QueryRunner<C, S, T> {
    connections: Arc<C>,
    resolver: NetworkLocationResolver<S, T>,
    spatial: ReachableStopsFinder<S>,
    only_self: ReachableStopsFinder<S>,
    road: RoadPlanner<T>,
    config: RunnerConfig,
    events: Arc<dyn EventSink>,
    next_id: AtomicU64,
}

impl<C, S, T> QueryRunner<C, S, T>
where
    C: ConnectionsProvider,
    S: StopsProvider,
    T: RoutableTileProvider,
{
    pub fn new(
        connections: Arc<C>,
        stops: Arc<S>,
        road: RoadPlanner<T>,
        config: RunnerConfig,
        events: Arc<dyn EventSink>,
    ) -> Self {
        let stop_resolver = StopLocationResolver::new(stops.clone(), config.resolver_capacity);
        Self {
            connections,
            resolver: NetworkLocationResolver::new(stop_resolver, road.base().clone()),
            spatial: ReachableStopsFinder::spatial(stops.clone()),
            only_self: ReachableStopsFinder::only_self(stops),
            road,
            config,
            events,
            next_id: AtomicU64::new(1),
        }
    }

    pub fn config(&self) -> &RunnerConfig {
        &self.config
    }

    /// Validate and resolve `query`. Planning starts when paths are pulled
    /// from the returned stream.
    pub async fn run(&self, query: Query) -> Result<PathStream<'_, C, S, T>, PlannerError> {
        let (anchor, time) = query.validate()?;
        if self.road.profiles().get(&query.profile_id).is_none() {
            return Err(PlannerError::UnknownProfile(query.profile_id.to_string()));
        }

        let mut from = Vec::with_capacity(query.from.len());
        for endpoint in &query.from {
            from.push(self.resolver.resolve(endpoint).await?);
        }
        let mut to = Vec::with_capacity(query.to.len());
        for endpoint in &query.to {
            to.push(self.resolver.resolve(endpoint).await?);
        }

        let span = self.config.initial_window();
        let (start, end) = match anchor {
            TimeBound::DepartAfter => (time, time + span),
            TimeBound::ArriveBefore => (time - span, time),
        };
        let id = QueryId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let resolved = ResolvedQuery::new(id, &query, from, to, anchor, start, end);

        info!(query = %id, %start, %end, "Query accepted");
        self.events.emit(Event::Query {
            query_id: id,
            minimum_departure_time: start,
            maximum_arrival_time: end,
        });
        Ok(PathStream::new(self, resolved, time, span))
    }

    /// Reachable stops around `location`. An endpoint that is itself a stop
    /// only reaches that stop.
    async fn reachable_stops(
        &self,
        location: &Location,
        query: &ResolvedQuery,
        phase: SearchPhase,
    ) -> Result<Vec<ReachableStop>, PlannerError> {
        let is_stop = match &location.id {
            Some(id) => self.resolver.stop(id).await?.is_some(),
            None => false,
        };
        let finder = if is_stop { &self.only_self } else { &self.spatial };
        let stops = finder
            .find_reachable_stops(
                location,
                query.maximum_walking_duration(),
                query.minimum_walking_speed,
                phase,
            )
            .await?
            .collect();
        Ok(stops)
    }
}

/// Lifecycle of a [`PathStream`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamState {
    /// Waiting for demand.
    Idle,
    /// Planning a window.
    Widening,
    /// Buffered paths are waiting to be pulled.
    Emitting,
    /// No further windows will be planned.
    Done,
    /// Planning failed; already emitted paths stay valid.
    Failed,
}

/// Reachable stops per origin and per destination, found once per query.
#[derive(Debug)]
struct Endpoints {
    initial: Vec<Vec<ReachableStop>>,
    finals: Vec<Vec<ReachableStop>>,
}

impl Endpoints {
    fn transit_possible(&self) -> bool {
        self.initial.iter().any(|stops| !stops.is_empty())
            && self.finals.iter().any(|stops| !stops.is_empty())
    }
}

/// Paths of one query, planned on demand.
pub struct PathStream<'r, C, S, T> {
    runner: &'r QueryRunner<C, S, T>,
    query: ResolvedQuery,

    /// The time the query is anchored on.
    anchor_time: Timestamp,

    state: StreamState,
    span: Duration,
    iteration: usize,
    stale: usize,
    found: usize,
    buffer: VecDeque<Path>,
    seen: HashSet<PathSignature>,
    endpoints: Option<Arc<Endpoints>>,
    arena: SessionArena,
}

impl<'r, C, S, T> PathStream<'r, C, S, T>
where
    C: ConnectionsProvider,
    S: StopsProvider,
    T: RoutableTileProvider,
{
    fn new(
        runner: &'r QueryRunner<C, S, T>,
        query: ResolvedQuery,
        anchor_time: Timestamp,
        span: Duration,
    ) -> Self {
        Self {
            runner,
            query,
            anchor_time,
            state: StreamState::Idle,
            span,
            iteration: 0,
            stale: 0,
            found: 0,
            buffer: VecDeque::new(),
            seen: HashSet::new(),
            endpoints: None,
            arena: SessionArena::new(),
        }
    }

    pub fn state(&self) -> StreamState {
        self.state
    }

    /// The query over the window planned next.
    pub fn query(&self) -> &ResolvedQuery {
        &self.query
    }

    /// Windows planned so far.
    pub fn iterations(&self) -> usize {
        self.iteration
    }

    /// Distinct paths found so far.
    pub fn found(&self) -> usize {
        self.found
    }

    /// The next path, widening the window as often as needed. `None` once
    /// the stream is done.
    pub async fn next(&mut self) -> Option<Result<Path, PlannerError>> {
        loop {
            if let Some(path) = self.buffer.pop_front() {
                if self.state == StreamState::Emitting && self.buffer.is_empty() {
                    self.state = StreamState::Idle;
                }
                return Some(Ok(path));
            }
            if matches!(self.state, StreamState::Done | StreamState::Failed) {
                return None;
            }
            if let Err(e) = self.widen().await {
                debug!(query = %self.query.id, error = %e, "Query failed");
                self.state = StreamState::Failed;
                self.arena.release(self.query.id);
                return Some(Err(e));
            }
        }
    }

    /// Up to `n` further paths; fewer once the stream is done.
    pub async fn request(&mut self, n: usize) -> Result<Vec<Path>, PlannerError> {
        let mut paths = Vec::with_capacity(n);
        while paths.len() < n {
            match self.next().await {
                Some(path) => paths.push(path?),
                None => break,
            }
        }
        Ok(paths)
    }

    /// Stop planning. Buffered paths are dropped.
    pub fn cancel(&mut self) {
        if !matches!(self.state, StreamState::Done | StreamState::Failed) {
            self.state = StreamState::Done;
        }
        self.buffer.clear();
        self.arena.release(self.query.id);
    }

    /// The paths as a [`Stream`]. Dropping it cancels the query.
    pub fn into_stream(self) -> impl Stream<Item = Result<Path, PlannerError>> + 'r
    where
        C: 'r,
        S: 'r,
        T: 'r,
    {
        stream::unfold(self, |mut paths| async move {
            let item = paths.next().await?;
            Some((item, paths))
        })
    }

    /// Plan the current window, then widen it or finish.
    async fn widen(&mut self) -> Result<(), PlannerError> {
        let runner = self.runner;
        self.state = StreamState::Widening;
        self.iteration += 1;
        let query = self.query.clone();

        runner.events.emit(Event::SubQuery {
            query_id: query.id,
            minimum_departure_time: query.minimum_departure_time,
            maximum_arrival_time: query.maximum_arrival_time,
            maximum_travel_duration: query.maximum_travel_duration(),
        });

        let endpoints = match &self.endpoints {
            Some(endpoints) => endpoints.clone(),
            None => {
                let endpoints = Arc::new(self.find_endpoints(&query).await?);
                self.endpoints = Some(endpoints.clone());
                endpoints
            }
        };

        let mut paths = Vec::new();
        if self.iteration == 1 && !query.public_transport_only {
            paths.extend(self.direct_paths(&query).await?);
        }

        let mut truncated = false;
        for (origin, initial) in query.from.iter().zip(&endpoints.initial) {
            for (destination, finals) in query.to.iter().zip(&endpoints.finals) {
                let request = TransitRequest::new(&query, origin, destination, initial, finals);
                let outcome = runner
                    .config
                    .planner
                    .plan(
                        &request,
                        runner.connections.as_ref(),
                        &runner.resolver,
                        runner.events.as_ref(),
                    )
                    .await?;
                truncated |= outcome.truncated;
                for path in outcome.paths {
                    let path = if runner.config.road_legs {
                        self.with_road_legs(&query, path).await?
                    } else {
                        path
                    };
                    paths.push(path);
                }
            }
        }

        let fresh = deduplicate(rank_paths(paths), &mut self.seen);
        if fresh.is_empty() {
            if self.found > 0 {
                self.stale += 1;
            }
        } else {
            self.stale = 0;
        }
        self.found += fresh.len();
        let new_paths = fresh.len();
        self.buffer.extend(fresh);

        let next_span = runner.config.widen(self.span);
        let finished = !endpoints.transit_possible()
            || (!truncated && self.horizon_reached(&query).await?)
            || self.iteration >= runner.config.max_iterations
            || next_span > runner.config.max_window()
            || (self.found > 0 && self.stale >= runner.config.stale_widenings_limit);

        debug!(
            query = %query.id,
            iteration = self.iteration,
            span_mins = self.span.num_minutes(),
            new_paths,
            found = self.found,
            stale = self.stale,
            finished,
            "Window planned"
        );

        if finished {
            self.state = StreamState::Done;
            self.arena.release(query.id);
            return Ok(());
        }

        self.span = next_span;
        let (start, end) = match query.anchor {
            TimeBound::DepartAfter => (self.anchor_time, self.anchor_time + next_span),
            TimeBound::ArriveBefore => (self.anchor_time - next_span, self.anchor_time),
        };
        self.query = query.with_window(start, end);
        self.state = if self.buffer.is_empty() {
            StreamState::Idle
        } else {
            StreamState::Emitting
        };
        Ok(())
    }

    async fn find_endpoints(&self, query: &ResolvedQuery) -> Result<Endpoints, PlannerError> {
        let runner = self.runner;
        let mut initial = Vec::with_capacity(query.from.len());
        for origin in &query.from {
            initial.push(
                runner
                    .reachable_stops(origin, query, SearchPhase::Initial)
                    .await?,
            );
        }
        let mut finals = Vec::with_capacity(query.to.len());
        for destination in &query.to {
            finals.push(
                runner
                    .reachable_stops(destination, query, SearchPhase::Final)
                    .await?,
            );
        }

        runner.events.emit(Event::InitialReachableStops {
            query_id: query.id,
            stops: initial.iter().flatten().cloned().collect(),
        });
        runner.events.emit(Event::FinalReachableStops {
            query_id: query.id,
            stops: finals.iter().flatten().cloned().collect(),
        });
        Ok(Endpoints { initial, finals })
    }

    /// Road paths straight from each origin to each destination, or a
    /// straight walk where no road path exists but the distance is walkable.
    async fn direct_paths(&mut self, query: &ResolvedQuery) -> Result<Vec<Path>, PlannerError> {
        let runner = self.runner;
        let road = runner.road.plan(query, &mut self.arena).await?;
        let walking = self.is_walking(query);

        let mut paths = Vec::new();
        for from in &query.from {
            for to in &query.to {
                if from.same_place(to) {
                    continue;
                }
                let routed = road
                    .iter()
                    .find(|path| path.origin().same_place(from) && path.destination().same_place(to));
                let path = match routed {
                    Some(path) => {
                        let distance: f64 = path.legs().iter().map(Leg::distance).sum();
                        if walking && distance > query.maximum_walking_distance {
                            continue;
                        }
                        path.clone()
                    }
                    None => {
                        if from.distance_to(to) > query.maximum_walking_distance {
                            continue;
                        }
                        let walk = Footpath::straight(from.clone(), to.clone(), query.minimum_walking_speed);
                        Path::new(vec![walk.into_leg(self.anchor_time)?])?
                    }
                };
                let start = match query.anchor {
                    TimeBound::DepartAfter => self.anchor_time,
                    TimeBound::ArriveBefore => self.anchor_time - path.total_duration(),
                };
                paths.push(path.departing_at(start));
            }
        }
        Ok(paths)
    }

    fn is_walking(&self, query: &ResolvedQuery) -> bool {
        self.runner
            .road
            .profiles()
            .get(&query.profile_id)
            .is_some_and(|profile| profile.travel_mode == TravelMode::Walking)
    }

    /// Replace the first and last walks of a transit path by road legs.
    async fn with_road_legs(&mut self, query: &ResolvedQuery, path: Path) -> Result<Path, PlannerError> {
        let runner = self.runner;
        let Some(profile) = runner.road.profiles().get(&query.profile_id) else {
            return Err(PlannerError::UnknownProfile(query.profile_id.to_string()));
        };
        let walking = profile.travel_mode == TravelMode::Walking;
        let mut legs = path.into_legs();
        let last = legs.len() - 1;

        for index in [0, last] {
            if legs.len() < 2 || legs[index].travel_mode() != TravelMode::Walking {
                continue;
            }
            let (from, to) = (legs[index].start().clone(), legs[index].stop().clone());
            let session = self.arena.session(query.id, &profile);
            let Some(road) = runner.road.path_between(session, &from, &to).await? else {
                continue;
            };
            let Some(leg) = road.into_legs().into_iter().next() else {
                continue;
            };
            if walking && leg.distance() > query.maximum_walking_distance {
                continue;
            }
            let start = if index == 0 {
                legs[1].departure_time().map(|departure| departure - leg.duration())
            } else {
                legs[index - 1].arrival_time()
            };
            legs[index] = match start {
                Some(start) => leg.departing_at(start),
                None => leg,
            };
        }
        Ok(Path::new(legs)?)
    }

    /// Whether widening cannot bring further connections into the window.
    async fn horizon_reached(&self, query: &ResolvedQuery) -> Result<bool, PlannerError> {
        let connections = self.runner.connections.as_ref();
        let (start, end) = query.window();
        let (from, direction) = match query.anchor {
            TimeBound::DepartAfter => (end, ScanDirection::Forward),
            TimeBound::ArriveBefore => (start, ScanDirection::Backward),
        };
        let mut beyond = pin!(connections.connections(from, direction));
        while let Some(connection) = beyond.next().await {
            let connection = connection?;
            let outside = match query.anchor {
                TimeBound::DepartAfter => connection.departure_time > end,
                TimeBound::ArriveBefore => connection.departure_time < start,
            };
            if outside {
                return Ok(false);
            }
        }
        Ok(true)
    }
}

//! Public transport planning with the Connection Scan Algorithm.
//!
//! Both planners read a time-ordered stream of connections and stop reading
//! as soon as the rest of the stream cannot change the answer:
//!
//! - [`PublicTransportPlanner::EarliestArrival`] scans forward from the start
//!   of the window and returns the journey arriving first.
//! - [`PublicTransportPlanner::Profile`] scans backward from the end of the
//!   window and returns every journey not beaten on both departure and
//!   arrival time.

mod earliest_arrival;
mod extract;
mod profile;
mod rank;
mod scan;
#[cfg(test)]
mod test_network;

use std::collections::HashMap;

use crate::domain::{Location, LocationId, Path, Timestamp};
use crate::error::PlannerError;
use crate::events::EventSink;
use crate::provider::ConnectionsProvider;
use crate::query::{LocationResolver, ResolvedQuery};
use crate::stops::ReachableStop;

pub use profile::{ParetoProfile, ProfileEntry};
pub use rank::{deduplicate, rank_paths};

/// One origin and destination pair to plan between.
#[derive(Debug, Clone, Copy)]
pub struct TransitRequest<'a> {
    pub query: &'a ResolvedQuery,
    pub origin: &'a Location,
    pub destination: &'a Location,

    /// Stops reachable on foot from the origin.
    pub initial_stops: &'a [ReachableStop],

    /// Stops from which the destination is reachable on foot.
    pub final_stops: &'a [ReachableStop],
}

impl<'a> TransitRequest<'a> {
    pub fn new(
        query: &'a ResolvedQuery,
        origin: &'a Location,
        destination: &'a Location,
        initial_stops: &'a [ReachableStop],
        final_stops: &'a [ReachableStop],
    ) -> Self {
        Self {
            query,
            origin,
            destination,
            initial_stops,
            final_stops,
        }
    }

    fn start(&self) -> Timestamp {
        self.query.minimum_departure_time
    }

    fn end(&self) -> Timestamp {
        self.query.maximum_arrival_time
    }

    /// Reachable stops by id; the shortest walk wins when a stop is listed
    /// twice.
    fn by_stop(stops: &[ReachableStop]) -> HashMap<LocationId, &ReachableStop> {
        let mut map: HashMap<LocationId, &ReachableStop> = HashMap::new();
        for reachable in stops {
            map.entry(reachable.stop.id.clone())
                .and_modify(|best| {
                    if reachable.duration < best.duration {
                        *best = reachable;
                    }
                })
                .or_insert(reachable);
        }
        map
    }

    fn walk_to_destination(&self) -> HashMap<LocationId, &'a ReachableStop> {
        Self::by_stop(self.final_stops)
    }

    fn walk_from_origin(&self) -> HashMap<LocationId, &'a ReachableStop> {
        Self::by_stop(self.initial_stops)
    }
}

/// Result of one planner run over one window.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlanOutcome {
    pub paths: Vec<Path>,

    /// Every connection of the window was considered.
    pub exhausted: bool,

    /// Some connection departed inside the window but arrived after it, so
    /// a wider window may find more.
    pub truncated: bool,
}

impl PlanOutcome {
    /// No journey exists within the window.
    pub fn is_no_journey_found(&self) -> bool {
        self.paths.is_empty() && self.exhausted
    }
}

/// Connection scan variant.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PublicTransportPlanner {
    EarliestArrival,
    #[default]
    Profile,
}

impl PublicTransportPlanner {
    pub async fn plan<C, R>(
        &self,
        request: &TransitRequest<'_>,
        connections: &C,
        resolver: &R,
        events: &dyn EventSink,
    ) -> Result<PlanOutcome, PlannerError>
    where
        C: ConnectionsProvider,
        R: LocationResolver,
    {
        if request.initial_stops.is_empty() || request.final_stops.is_empty() {
            return Ok(PlanOutcome {
                exhausted: true,
                ..PlanOutcome::default()
            });
        }
        match self {
            Self::EarliestArrival => {
                earliest_arrival::plan(request, connections, resolver, events).await
            }
            Self::Profile => profile::plan(request, connections, resolver, events).await,
        }
    }
}

/// The transfer window a change of vehicles at `arrival` must fit in.
fn transfer_window(query: &ResolvedQuery, arrival: Timestamp) -> (Timestamp, Timestamp) {
    (
        arrival + query.minimum_transfer_duration,
        arrival + query.maximum_transfer_duration,
    )
}

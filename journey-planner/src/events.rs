//! Planner events.
//!
//! Planners report progress through an injected [`EventSink`] instead of a
//! global bus. [`TracingSink`] forwards events to `tracing`, [`NullSink`]
//! discards them and [`RecordingSink`] keeps them for inspection.

use std::sync::Mutex;

use chrono::Duration;
use tracing::{debug, info, trace, warn};

use crate::domain::{LocationId, QueryId, Timestamp};
use crate::spatial::TileCoordinate;
use crate::stops::ReachableStop;

/// Something a planner wants observers to know about.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    /// A query was accepted.
    Query {
        query_id: QueryId,
        minimum_departure_time: Timestamp,
        maximum_arrival_time: Timestamp,
    },

    /// A widening iteration started planning over a new window.
    SubQuery {
        query_id: QueryId,
        minimum_departure_time: Timestamp,
        maximum_arrival_time: Timestamp,
        maximum_travel_duration: Duration,
    },

    InitialReachableStops {
        query_id: QueryId,
        stops: Vec<ReachableStop>,
    },

    FinalReachableStops {
        query_id: QueryId,
        stops: Vec<ReachableStop>,
    },

    /// The profile scan found a new non-dominated journey from a stop.
    AddedNewTransferProfile {
        departure_stop: LocationId,
        arrival_stop: LocationId,
        amount_of_transfers: usize,
    },

    FetchTile {
        coordinate: TileCoordinate,
        tile_id: String,
    },

    /// Recoverable data problem; planning continues.
    Warning(String),
}

impl Event {
    /// Short name of the event kind.
    pub fn name(&self) -> &'static str {
        match self {
            Event::Query { .. } => "query",
            Event::SubQuery { .. } => "sub-query",
            Event::InitialReachableStops { .. } => "initial-reachable-stops",
            Event::FinalReachableStops { .. } => "final-reachable-stops",
            Event::AddedNewTransferProfile { .. } => "added-new-transfer-profile",
            Event::FetchTile { .. } => "fetch-tile",
            Event::Warning(_) => "warning",
        }
    }
}

/// Receiver of planner events.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: Event);
}

/// Logs every event through `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn emit(&self, event: Event) {
        match event {
            Event::Query {
                query_id,
                minimum_departure_time,
                maximum_arrival_time,
            } => info!(
                %query_id,
                departure = %minimum_departure_time,
                arrival = %maximum_arrival_time,
                "Query"
            ),
            Event::SubQuery {
                query_id,
                minimum_departure_time,
                maximum_arrival_time,
                maximum_travel_duration,
            } => debug!(
                %query_id,
                departure = %minimum_departure_time,
                arrival = %maximum_arrival_time,
                span_mins = maximum_travel_duration.num_minutes(),
                "Sub-query"
            ),
            Event::InitialReachableStops { query_id, stops } => {
                debug!(%query_id, stops = stops.len(), "Initial reachable stops")
            }
            Event::FinalReachableStops { query_id, stops } => {
                debug!(%query_id, stops = stops.len(), "Final reachable stops")
            }
            Event::AddedNewTransferProfile {
                departure_stop,
                arrival_stop,
                amount_of_transfers,
            } => trace!(
                departure = %departure_stop,
                arrival = %arrival_stop,
                transfers = amount_of_transfers,
                "Added transfer profile"
            ),
            Event::FetchTile {
                coordinate,
                tile_id,
            } => debug!(tile = %coordinate, id = %tile_id, "Fetch tile"),
            Event::Warning(message) => warn!(warning = %message, "Planner warning"),
        }
    }
}

/// Discards every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl EventSink for NullSink {
    fn emit(&self, _event: Event) {}
}

/// Keeps every event in memory.
#[derive(Debug, Default)]
pub struct RecordingSink {
    events: Mutex<Vec<Event>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the events emitted so far.
    pub fn events(&self) -> Vec<Event> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }

    /// Number of events with the given [`Event::name`].
    pub fn count(&self, name: &str) -> usize {
        self.events
            .lock()
            .map(|events| events.iter().filter(|e| e.name() == name).count())
            .unwrap_or(0)
    }
}

impl EventSink for RecordingSink {
    fn emit(&self, event: Event) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event);
        }
    }
}

//! A small line network shared by the scan tests.

use std::sync::Arc;

use chrono::{Duration, TimeZone, Utc};

use crate::domain::{Connection, ConnectionId, Location, LocationId, QueryId, Stop, Timestamp, TravelMode, TripId};
use crate::events::RecordingSink;
use crate::provider::{MemoryNetwork, NetworkData};
use crate::query::{Query, ResolvedQuery, StopLocationResolver, TimeBound};
use crate::stops::{ReachableStop, SearchPhase};

use super::TransitRequest;

pub fn at(h: u32, m: u32) -> Timestamp {
    Utc.with_ymd_and_hms(2024, 3, 15, h, m, 0).unwrap()
}

/// Stops `a` to `f`, about 1.4 km apart from west to east.
pub fn stop(id: &str) -> Stop {
    let offset = id.bytes().next().map_or(0, |b| b.saturating_sub(b'a'));
    Stop {
        id: LocationId::new(id),
        name: id.to_uppercase(),
        latitude: 51.05,
        longitude: 3.72 + 0.02 * f64::from(offset),
        avg_stop_times: 0.0,
    }
}

pub fn connection(
    id: &str,
    trip: &str,
    from: &str,
    to: &str,
    departure: Timestamp,
    arrival: Timestamp,
) -> Connection {
    Connection {
        id: ConnectionId::new(id),
        departure_stop: LocationId::new(from),
        arrival_stop: LocationId::new(to),
        departure_time: departure,
        arrival_time: arrival,
        trip_id: TripId::new(trip),
        travel_mode: TravelMode::Train,
        pickup_allowed: true,
        drop_off_allowed: true,
    }
}

pub fn reachable(id: &str, minutes: i64, phase: SearchPhase) -> ReachableStop {
    ReachableStop {
        stop: stop(id),
        duration: Duration::minutes(minutes),
        distance: 80.0 * minutes as f64,
        phase,
    }
}

pub struct Fixture {
    pub network: Arc<MemoryNetwork>,
    pub resolver: StopLocationResolver<MemoryNetwork>,
    pub query: ResolvedQuery,
    pub origin: Location,
    pub destination: Location,
    pub initial: Vec<ReachableStop>,
    pub finals: Vec<ReachableStop>,
    pub events: RecordingSink,
}

impl Fixture {
    /// Plan from stop `from` to stop `to` over `start..=end`.
    pub fn new(
        connections: Vec<Connection>,
        from: &str,
        to: &str,
        start: Timestamp,
        end: Timestamp,
    ) -> Self {
        let network = Arc::new(MemoryNetwork::new(NetworkData {
            stops: ["a", "b", "c", "d", "e", "f"].into_iter().map(stop).collect(),
            connections,
            ..NetworkData::default()
        }));
        let origin = stop(from).location();
        let destination = stop(to).location();
        let query = ResolvedQuery::new(
            QueryId(1),
            &Query::new(from, to).departing_after(start),
            vec![origin.clone()],
            vec![destination.clone()],
            TimeBound::DepartAfter,
            start,
            end,
        );
        Self {
            resolver: StopLocationResolver::new(network.clone(), 100),
            network,
            query,
            origin,
            destination,
            initial: vec![reachable(from, 0, SearchPhase::Initial)],
            finals: vec![reachable(to, 0, SearchPhase::Final)],
            events: RecordingSink::new(),
        }
    }

    pub fn request(&self) -> TransitRequest<'_> {
        TransitRequest::new(
            &self.query,
            &self.origin,
            &self.destination,
            &self.initial,
            &self.finals,
        )
    }
}

//! Backward connection scan for every Pareto-optimal journey.
//!
//! Connections are read from the end of the window towards its start. For
//! each stop the scan keeps a profile: journeys to the destination sorted by
//! departure, none of which leaves earlier and arrives later than another.

use std::collections::{HashMap, HashSet};

use tracing::{debug, trace};

use crate::domain::{Connection, ConnectionId, LocationId, Timestamp, TripId};
use crate::error::PlannerError;
use crate::events::{Event, EventSink};
use crate::provider::{ConnectionsProvider, ScanDirection};
use crate::query::LocationResolver;

use super::extract::{Ride, assemble};
use super::scan::OrderedConnections;
use super::{PlanOutcome, TransitRequest, transfer_window};

/// One journey in a profile.
#[derive(Debug, Clone, PartialEq)]
pub struct ProfileEntry<T> {
    pub departure: Timestamp,
    pub arrival: Timestamp,
    pub journey: T,
}

impl<T> ProfileEntry<T> {
    /// Leaves no earlier and arrives no later than `other`.
    pub fn dominates(&self, other: &ProfileEntry<T>) -> bool {
        self.departure >= other.departure && self.arrival <= other.arrival
    }
}

/// Non-dominated entries sorted by departure. Arrivals increase with
/// departures, so the first entry leaving after a time arrives first.
#[derive(Debug, Clone, PartialEq)]
pub struct ParetoProfile<T> {
    entries: Vec<ProfileEntry<T>>,
}

impl<T> Default for ParetoProfile<T> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
        }
    }
}

impl<T> ParetoProfile<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an entry unless an existing one dominates it; entries it
    /// dominates are dropped. Returns whether it was added.
    pub fn insert(&mut self, entry: ProfileEntry<T>) -> bool {
        if self.entries.iter().any(|existing| existing.dominates(&entry)) {
            return false;
        }
        self.entries.retain(|existing| !entry.dominates(existing));
        let at = self
            .entries
            .partition_point(|existing| existing.departure < entry.departure);
        self.entries.insert(at, entry);
        true
    }

    /// The entry with the earliest arrival among those leaving at or after
    /// `time`.
    pub fn earliest_from(&self, time: Timestamp) -> Option<&ProfileEntry<T>> {
        let at = self
            .entries
            .partition_point(|entry| entry.departure < time);
        self.entries.get(at)
    }

    pub fn entries(&self) -> &[ProfileEntry<T>] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// How a profile entry continues: board `enter`, stay on until `exit`, then
/// either walk to the destination or change to `next`.
#[derive(Debug, Clone, PartialEq)]
struct JourneyLink {
    enter: Connection,
    exit: Connection,
    next: Option<Connection>,
    transfers: usize,
}

/// Best way to reach the destination after riding a trip to some point.
#[derive(Debug, Clone)]
struct Continuation {
    arrival: Timestamp,
    exit: Connection,
    next: Option<Connection>,
    transfers: usize,
}

impl Continuation {
    fn key(&self) -> (Timestamp, usize) {
        (self.arrival, self.transfers)
    }
}

pub(super) async fn plan<C, R>(
    request: &TransitRequest<'_>,
    connections: &C,
    resolver: &R,
    events: &dyn EventSink,
) -> Result<PlanOutcome, PlannerError>
where
    C: ConnectionsProvider,
    R: LocationResolver,
{
    let query = request.query;
    let (start, end) = (request.start(), request.end());
    let initial = request.walk_from_origin();
    let finals = request.walk_to_destination();

    let mut profiles: HashMap<LocationId, ParetoProfile<JourneyLink>> = HashMap::new();
    let mut trips: HashMap<TripId, Continuation> = HashMap::new();
    let mut outcome = PlanOutcome::default();
    let mut scanned = 0usize;

    let mut scan = OrderedConnections::new(connections, end, ScanDirection::Backward);
    loop {
        let Some(connection) = scan.next_valid(events).await? else {
            outcome.exhausted = true;
            break;
        };
        if connection.departure_time < start {
            outcome.exhausted = true;
            break;
        }
        scanned += 1;
        if connection.arrival_time > end {
            outcome.truncated = true;
            continue;
        }

        let mut candidates: Vec<Continuation> = Vec::with_capacity(3);
        if connection.drop_off_allowed {
            if let Some(walk) = finals.get(&connection.arrival_stop) {
                candidates.push(Continuation {
                    arrival: connection.arrival_time + walk.duration,
                    exit: connection.clone(),
                    next: None,
                    transfers: 0,
                });
            }
            let (earliest, latest) = transfer_window(query, connection.arrival_time);
            let change = profiles
                .get(&connection.arrival_stop)
                .and_then(|profile| profile.earliest_from(earliest))
                .filter(|entry| entry.departure <= latest);
            if let Some(entry) = change {
                candidates.push(Continuation {
                    arrival: entry.arrival,
                    exit: connection.clone(),
                    next: Some(entry.journey.enter.clone()),
                    transfers: entry.journey.transfers + 1,
                });
            }
        }
        if let Some(seated) = trips.get(&connection.trip_id) {
            candidates.push(seated.clone());
        }

        let Some(best) = candidates
            .into_iter()
            .filter(|candidate| candidate.transfers <= query.maximum_transfers)
            .min_by_key(Continuation::key)
        else {
            continue;
        };
        trips.insert(connection.trip_id.clone(), best.clone());

        if !connection.pickup_allowed {
            continue;
        }
        let entry = ProfileEntry {
            departure: connection.departure_time,
            arrival: best.arrival,
            journey: JourneyLink {
                enter: connection.clone(),
                exit: best.exit.clone(),
                next: best.next,
                transfers: best.transfers,
            },
        };
        let added = profiles
            .entry(connection.departure_stop.clone())
            .or_default()
            .insert(entry);
        if added {
            trace!(stop = %connection.departure_stop, arrival = %best.arrival, "New profile entry");
            events.emit(Event::AddedNewTransferProfile {
                departure_stop: connection.departure_stop.clone(),
                arrival_stop: best.exit.arrival_stop.clone(),
                amount_of_transfers: best.transfers,
            });
        }
    }

    debug!(
        scanned,
        stops = profiles.len(),
        trips = trips.len(),
        exhausted = outcome.exhausted,
        "Profile scan finished"
    );

    let mut seen: HashSet<Vec<ConnectionId>> = HashSet::new();
    for (stop, walk) in &initial {
        let Some(profile) = profiles.get(stop) else {
            continue;
        };
        for entry in profile.entries() {
            if entry.departure - walk.duration < start {
                continue;
            }
            let Some(rides) = follow(&profiles, &entry.journey) else {
                events.emit(Event::Warning(format!(
                    "broken journey from {stop} at {}",
                    entry.departure
                )));
                continue;
            };
            let key: Vec<ConnectionId> = rides
                .iter()
                .flat_map(|ride| [ride.enter.id.clone(), ride.exit.id.clone()])
                .collect();
            if !seen.insert(key) {
                continue;
            }
            let Some(last) = rides.last().and_then(|ride| finals.get(&ride.exit.arrival_stop)) else {
                continue;
            };
            let path = assemble(resolver, request, walk, &rides, last).await?;
            outcome.paths.push(path);
        }
    }
    Ok(outcome)
}

/// The rides of a journey, following changes through the profiles.
fn follow(
    profiles: &HashMap<LocationId, ParetoProfile<JourneyLink>>,
    first: &JourneyLink,
) -> Option<Vec<Ride>> {
    let mut rides = vec![Ride {
        enter: first.enter.clone(),
        exit: first.exit.clone(),
    }];
    let mut next = first.next.as_ref();
    while let Some(enter) = next {
        if rides.len() > first.transfers + 1 {
            return None;
        }
        let link = profiles
            .get(&enter.departure_stop)?
            .entries()
            .iter()
            .map(|entry| &entry.journey)
            .find(|link| link.enter.id == enter.id)?;
        rides.push(Ride {
            enter: link.enter.clone(),
            exit: link.exit.clone(),
        });
        next = link.next.as_ref();
    }
    Some(rides)
}

//! Forward connection scan for the earliest arrival at the destination.

use std::collections::HashMap;

use tracing::{debug, warn};

use crate::domain::{Connection, LocationId, Timestamp, TripId};
use crate::error::PlannerError;
use crate::events::{Event, EventSink};
use crate::provider::{ConnectionsProvider, ScanDirection};
use crate::query::{LocationResolver, ResolvedQuery};

use super::extract::{Ride, assemble};
use super::scan::OrderedConnections;
use super::{PlanOutcome, TransitRequest};

/// Earliest known arrival at a stop.
#[derive(Debug, Clone)]
struct StopLabel {
    arrival: Timestamp,

    /// The ride that arrived here; `None` when the stop was walked to.
    ride: Option<Ride>,

    /// Vehicles used to get here.
    rides: usize,
}

impl StopLabel {
    /// Whether `connection` can be boarded after arriving here. Only the
    /// minimum transfer time applies.
    fn can_board(&self, query: &ResolvedQuery, connection: &Connection) -> bool {
        let ready = match self.ride {
            Some(_) => self.arrival + query.minimum_transfer_duration,
            None => self.arrival,
        };
        ready <= connection.departure_time
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

    let mut labels: HashMap<LocationId, StopLabel> = initial
        .iter()
        .map(|(id, walk)| {
            let label = StopLabel {
                arrival: start + walk.duration,
                ride: None,
                rides: 0,
            };
            (id.clone(), label)
        })
        .collect();
    // Boarding connection and vehicle count of every boarded trip; a trip
    // boarded again with fewer vehicles keeps the later boarding.
    let mut trips: HashMap<TripId, (Connection, usize)> = HashMap::new();
    let mut best: Option<(Timestamp, LocationId)> = None;
    let mut outcome = PlanOutcome::default();
    let mut scanned = 0usize;

    let mut scan = OrderedConnections::new(connections, start, ScanDirection::Forward);
    loop {
        let Some(connection) = scan.next_valid(events).await? else {
            outcome.exhausted = true;
            break;
        };
        if connection.departure_time > end {
            outcome.exhausted = true;
            break;
        }
        if best
            .as_ref()
            .is_some_and(|(arrival, _)| connection.departure_time >= *arrival)
        {
            break;
        }
        scanned += 1;
        if connection.arrival_time > end {
            outcome.truncated = true;
            continue;
        }

        let boarding = labels
            .get(&connection.departure_stop)
            .filter(|label| {
                connection.pickup_allowed
                    && label.rides <= query.maximum_transfers
                    && label.can_board(query, &connection)
            })
            .map(|label| label.rides + 1);
        let boarded = trips.get(&connection.trip_id).map(|(_, rides)| *rides);
        if let Some(rides) = boarding.filter(|rides| boarded.is_none_or(|boarded| *rides < boarded)) {
            trips.insert(connection.trip_id.clone(), (connection.clone(), rides));
        }
        let Some((enter, rides)) = trips.get(&connection.trip_id) else {
            continue;
        };
        if !connection.drop_off_allowed {
            continue;
        }

        let improves = labels
            .get(&connection.arrival_stop)
            .is_none_or(|label| connection.arrival_time < label.arrival);
        if !improves {
            continue;
        }
        labels.insert(
            connection.arrival_stop.clone(),
            StopLabel {
                arrival: connection.arrival_time,
                ride: Some(Ride {
                    enter: enter.clone(),
                    exit: connection.clone(),
                }),
                rides: *rides,
            },
        );

        if let Some(walk) = finals.get(&connection.arrival_stop) {
            let at_destination = connection.arrival_time + walk.duration;
            if best
                .as_ref()
                .is_none_or(|(arrival, _)| at_destination < *arrival)
            {
                best = Some((at_destination, connection.arrival_stop.clone()));
            }
        }
    }

    debug!(
        scanned,
        stops = labels.len(),
        trips = trips.len(),
        exhausted = outcome.exhausted,
        "Earliest arrival scan finished"
    );

    let Some((arrival, last_stop)) = best else {
        return Ok(outcome);
    };

    let mut rides = Vec::new();
    let mut current = last_stop.clone();
    for _ in 0..=labels.len() {
        let Some(ride) = labels.get(&current).and_then(|label| label.ride.clone()) else {
            break;
        };
        current = ride.enter.departure_stop.clone();
        rides.push(ride);
    }
    rides.reverse();

    let walked_from = labels.get(&current).is_some_and(|label| label.ride.is_none());
    let (Some(first), Some(last), true) = (initial.get(&current), finals.get(&last_stop), walked_from)
    else {
        warn!(stop = %current, "Journey does not lead back to the origin");
        events.emit(Event::Warning(format!(
            "journey arriving at {arrival} does not lead back to the origin"
        )));
        return Ok(outcome);
    };

    let path = assemble(resolver, request, first, &rides, last).await?;
    outcome.paths.push(path);
    Ok(outcome)
}

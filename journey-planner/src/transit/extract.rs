//! Turning scanned rides into paths.

use crate::domain::{Connection, Leg, Path, Step};
use crate::error::PlannerError;
use crate::query::LocationResolver;
use crate::stops::{Footpath, ReachableStop};

use super::TransitRequest;

/// One trip ridden from `enter` to `exit`.
#[derive(Debug, Clone, PartialEq)]
pub(super) struct Ride {
    pub enter: Connection,
    pub exit: Connection,
}

/// Walk to `initial`, ride every ride in turn, walk from `last` to the
/// destination. Walks that go nowhere are left out.
pub(super) async fn assemble<R: LocationResolver>(
    resolver: &R,
    request: &TransitRequest<'_>,
    initial: &ReachableStop,
    rides: &[Ride],
    last: &ReachableStop,
) -> Result<Path, PlannerError> {
    let (Some(first), Some(final_ride)) = (rides.first(), rides.last()) else {
        return Err(PlannerError::InvalidQuery("journey without rides".into()));
    };
    let mut legs = Vec::with_capacity(rides.len() + 2);

    let walk = Footpath::new(
        request.origin.clone(),
        initial.stop.location(),
        initial.distance,
        initial.duration,
    );
    if !walk.is_trivial() {
        let start = first.enter.departure_time - walk.duration;
        legs.push(walk.into_leg(start)?);
    }

    for ride in rides {
        let start = resolver.resolve_id(&ride.enter.departure_stop).await?;
        let stop = resolver.resolve_id(&ride.exit.arrival_stop).await?;
        let step = Step {
            start,
            stop,
            start_time: Some(ride.enter.departure_time),
            stop_time: Some(ride.exit.arrival_time),
            duration: ride.exit.arrival_time - ride.enter.departure_time,
            distance: None,
            enter_connection_id: Some(ride.enter.id.clone()),
            exit_connection_id: Some(ride.exit.id.clone()),
        };
        legs.push(Leg::new(ride.enter.travel_mode, vec![step])?);
    }

    let walk = Footpath::new(
        last.stop.location(),
        request.destination.clone(),
        last.distance,
        last.duration,
    );
    if !walk.is_trivial() {
        legs.push(walk.into_leg(final_ride.exit.arrival_time)?);
    }

    Ok(Path::new(legs)?)
}

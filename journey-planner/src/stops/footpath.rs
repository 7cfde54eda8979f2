//! Walking between a location and a stop.
//!
//! First and last miles default to a straight-line walk at the query's
//! minimum walking speed; the road planner can replace them with routed legs.

use chrono::Duration;

use crate::domain::{DomainError, Leg, Location, Step, Timestamp, TravelMode};
use crate::spatial::travel_duration;

/// A walk between two locations.
#[derive(Debug, Clone, PartialEq)]
pub struct Footpath {
    pub from: Location,
    pub to: Location,

    /// Metres.
    pub distance: f64,

    pub duration: Duration,
}

impl Footpath {
    pub fn new(from: Location, to: Location, distance: f64, duration: Duration) -> Self {
        Self {
            from,
            to,
            distance,
            duration,
        }
    }

    /// The great-circle walk at `speed_kmh`.
    pub fn straight(from: Location, to: Location, speed_kmh: f64) -> Self {
        let distance = from.distance_to(&to);
        let duration = travel_duration(distance, speed_kmh);
        Self::new(from, to, distance, duration)
    }

    /// Whether the walk goes nowhere.
    pub fn is_trivial(&self) -> bool {
        self.from.same_place(&self.to)
    }

    /// A walking leg of one step leaving at `start`.
    pub fn into_leg(self, start: Timestamp) -> Result<Leg, DomainError> {
        let step = Step::new(self.from, self.to, self.distance, self.duration).starting_at(start);
        Leg::new(TravelMode::Walking, vec![step])
    }
}

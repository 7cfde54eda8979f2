//! Query input and its resolved form.

use chrono::Duration;

use crate::domain::{Location, LocationId, ProfileId, QueryId, Timestamp};
use crate::error::PlannerError;
use crate::spatial::travel_duration;

/// Where a journey starts or ends.
#[derive(Debug, Clone, PartialEq)]
pub enum Endpoint {
    /// A stop or road node, resolved before planning.
    Id(LocationId),
    Location(Location),
}

impl From<LocationId> for Endpoint {
    fn from(id: LocationId) -> Self {
        Endpoint::Id(id)
    }
}

impl From<&str> for Endpoint {
    fn from(id: &str) -> Self {
        Endpoint::Id(LocationId::new(id))
    }
}

impl From<Location> for Endpoint {
    fn from(location: Location) -> Self {
        Endpoint::Location(location)
    }
}

/// Which end of the time window the query pins down.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeBound {
    /// Leave no earlier than the given time; later windows extend the end.
    DepartAfter,
    /// Arrive no later than the given time; later windows move the start
    /// earlier.
    ArriveBefore,
}

/// A journey request.
///
/// Exactly one of `minimum_departure_time` and `maximum_arrival_time` must
/// be set.
#[derive(Debug, Clone)]
pub struct Query {
    pub from: Vec<Endpoint>,
    pub to: Vec<Endpoint>,
    pub minimum_departure_time: Option<Timestamp>,
    pub maximum_arrival_time: Option<Timestamp>,

    /// Longest wait allowed when changing vehicles.
    pub maximum_transfer_duration: Duration,

    /// Shortest time needed to change vehicles.
    pub minimum_transfer_duration: Duration,

    /// Metres.
    pub maximum_walking_distance: f64,

    /// km/h; walking times are computed at this speed.
    pub minimum_walking_speed: f64,

    pub maximum_transfers: usize,

    /// Skip direct road paths.
    pub public_transport_only: bool,

    /// Road profile for first/last miles and direct paths.
    pub profile_id: ProfileId,
}

impl Query {
    pub fn new(from: impl Into<Endpoint>, to: impl Into<Endpoint>) -> Self {
        Self {
            from: vec![from.into()],
            to: vec![to.into()],
            minimum_departure_time: None,
            maximum_arrival_time: None,
            maximum_transfer_duration: Duration::minutes(30),
            minimum_transfer_duration: Duration::minutes(2),
            maximum_walking_distance: 1000.0,
            minimum_walking_speed: 4.0,
            maximum_transfers: 4,
            public_transport_only: false,
            profile_id: ProfileId::new("walking"),
        }
    }

    pub fn departing_after(mut self, time: Timestamp) -> Self {
        self.minimum_departure_time = Some(time);
        self
    }

    pub fn arriving_before(mut self, time: Timestamp) -> Self {
        self.maximum_arrival_time = Some(time);
        self
    }

    /// Add another acceptable origin.
    pub fn with_origin(mut self, from: impl Into<Endpoint>) -> Self {
        self.from.push(from.into());
        self
    }

    /// Add another acceptable destination.
    pub fn with_destination(mut self, to: impl Into<Endpoint>) -> Self {
        self.to.push(to.into());
        self
    }

    pub fn with_transfer_durations(mut self, minimum: Duration, maximum: Duration) -> Self {
        self.minimum_transfer_duration = minimum;
        self.maximum_transfer_duration = maximum;
        self
    }

    pub fn with_maximum_walking_distance(mut self, metres: f64) -> Self {
        self.maximum_walking_distance = metres;
        self
    }

    pub fn with_minimum_walking_speed(mut self, kmh: f64) -> Self {
        self.minimum_walking_speed = kmh;
        self
    }

    pub fn with_maximum_transfers(mut self, transfers: usize) -> Self {
        self.maximum_transfers = transfers;
        self
    }

    pub fn public_transport_only(mut self, only: bool) -> Self {
        self.public_transport_only = only;
        self
    }

    pub fn with_profile(mut self, profile_id: impl Into<ProfileId>) -> Self {
        self.profile_id = profile_id.into();
        self
    }

    /// Check the query and return which time it is anchored on.
    pub fn validate(&self) -> Result<(TimeBound, Timestamp), PlannerError> {
        if self.from.is_empty() {
            return Err(PlannerError::InvalidQuery("no origin".into()));
        }
        if self.to.is_empty() {
            return Err(PlannerError::InvalidQuery("no destination".into()));
        }
        if !(self.minimum_walking_speed.is_finite() && self.minimum_walking_speed > 0.0) {
            return Err(PlannerError::InvalidQuery(format!(
                "walking speed must be positive, got {}",
                self.minimum_walking_speed
            )));
        }
        if self.maximum_walking_distance < 0.0 {
            return Err(PlannerError::InvalidQuery(
                "maximum walking distance is negative".into(),
            ));
        }
        if self.minimum_transfer_duration < Duration::zero()
            || self.maximum_transfer_duration < self.minimum_transfer_duration
        {
            return Err(PlannerError::InvalidQuery(
                "transfer durations must satisfy 0 <= minimum <= maximum".into(),
            ));
        }
        match (self.minimum_departure_time, self.maximum_arrival_time) {
            (Some(departure), None) => Ok((TimeBound::DepartAfter, departure)),
            (None, Some(arrival)) => Ok((TimeBound::ArriveBefore, arrival)),
            (Some(_), Some(_)) => Err(PlannerError::InvalidQuery(
                "both a departure and an arrival time were given".into(),
            )),
            (None, None) => Err(PlannerError::InvalidQuery(
                "either a departure or an arrival time is required".into(),
            )),
        }
    }
}

/// A validated query with resolved endpoints and a concrete time window.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedQuery {
    pub id: QueryId,
    pub from: Vec<Location>,
    pub to: Vec<Location>,
    pub anchor: TimeBound,
    pub minimum_departure_time: Timestamp,
    pub maximum_arrival_time: Timestamp,
    pub maximum_transfer_duration: Duration,
    pub minimum_transfer_duration: Duration,
    pub maximum_walking_distance: f64,
    pub minimum_walking_speed: f64,
    pub maximum_transfers: usize,
    pub public_transport_only: bool,
    pub profile_id: ProfileId,
}

impl ResolvedQuery {
    /// Resolve `query` over the window `start..=end`.
    pub fn new(
        id: QueryId,
        query: &Query,
        from: Vec<Location>,
        to: Vec<Location>,
        anchor: TimeBound,
        start: Timestamp,
        end: Timestamp,
    ) -> Self {
        Self {
            id,
            from,
            to,
            anchor,
            minimum_departure_time: start,
            maximum_arrival_time: end,
            maximum_transfer_duration: query.maximum_transfer_duration,
            minimum_transfer_duration: query.minimum_transfer_duration,
            maximum_walking_distance: query.maximum_walking_distance,
            minimum_walking_speed: query.minimum_walking_speed,
            maximum_transfers: query.maximum_transfers,
            public_transport_only: query.public_transport_only,
            profile_id: query.profile_id.clone(),
        }
    }

    pub fn window(&self) -> (Timestamp, Timestamp) {
        (self.minimum_departure_time, self.maximum_arrival_time)
    }

    pub fn maximum_travel_duration(&self) -> Duration {
        self.maximum_arrival_time - self.minimum_departure_time
    }

    /// Time to walk the maximum walking distance at the minimum speed.
    pub fn maximum_walking_duration(&self) -> Duration {
        travel_duration(self.maximum_walking_distance, self.minimum_walking_speed)
    }

    /// The same query over another window.
    pub fn with_window(&self, start: Timestamp, end: Timestamp) -> Self {
        Self {
            minimum_departure_time: start,
            maximum_arrival_time: end,
            ..self.clone()
        }
    }
}

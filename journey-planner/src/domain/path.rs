//! Paths, legs and steps.
//!
//! A [`Path`] is an ordered list of [`Leg`]s, each travelled with one
//! [`TravelMode`] and made of [`Step`]s. Construction enforces that the steps
//! form one contiguous chain: every step starts where the previous one
//! stopped, across leg boundaries too.

use std::fmt::Write as _;

use chrono::Duration;

use super::{ConnectionId, DomainError, Location, Timestamp, TravelMode};

/// One movement between two locations.
#[derive(Debug, Clone, PartialEq)]
pub struct Step {
    pub start: Location,
    pub stop: Location,
    pub start_time: Option<Timestamp>,
    pub stop_time: Option<Timestamp>,
    pub duration: Duration,

    /// Distance in metres, when known.
    pub distance: Option<f64>,

    /// Connection boarded at `start` (transit steps only).
    pub enter_connection_id: Option<ConnectionId>,

    /// Connection alighted at `stop` (transit steps only).
    pub exit_connection_id: Option<ConnectionId>,
}

impl Step {
    /// An untimed movement with a known distance and duration.
    pub fn new(start: Location, stop: Location, distance: f64, duration: Duration) -> Self {
        Self {
            start,
            stop,
            start_time: None,
            stop_time: None,
            duration,
            distance: Some(distance),
            enter_connection_id: None,
            exit_connection_id: None,
        }
    }

    /// Set the start time; the stop time follows from the duration.
    pub fn starting_at(mut self, time: Timestamp) -> Self {
        self.start_time = Some(time);
        self.stop_time = Some(time + self.duration);
        self
    }
}

fn check_contiguous(previous: &Step, next: &Step) -> Result<(), DomainError> {
    if previous.stop.same_place(&next.start) {
        Ok(())
    } else {
        Err(DomainError::NotContiguous(
            previous.stop.to_string(),
            next.start.to_string(),
        ))
    }
}

/// A sequence of steps travelled with one mode.
#[derive(Debug, Clone, PartialEq)]
pub struct Leg {
    travel_mode: TravelMode,
    steps: Vec<Step>,
}

impl Leg {
    /// Create a leg, validating that it is non-empty and contiguous.
    pub fn new(travel_mode: TravelMode, steps: Vec<Step>) -> Result<Self, DomainError> {
        if steps.is_empty() {
            return Err(DomainError::EmptyLeg);
        }
        for pair in steps.windows(2) {
            check_contiguous(&pair[0], &pair[1])?;
        }
        Ok(Self { travel_mode, steps })
    }

    pub fn travel_mode(&self) -> TravelMode {
        self.travel_mode
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    pub fn start(&self) -> &Location {
        &self.steps[0].start
    }

    pub fn stop(&self) -> &Location {
        &self.steps[self.steps.len() - 1].stop
    }

    pub fn departure_time(&self) -> Option<Timestamp> {
        self.steps[0].start_time
    }

    pub fn arrival_time(&self) -> Option<Timestamp> {
        self.steps[self.steps.len() - 1].stop_time
    }

    /// Sum of step durations.
    pub fn duration(&self) -> Duration {
        self.steps
            .iter()
            .fold(Duration::zero(), |total, step| total + step.duration)
    }

    /// Sum of known step distances in metres.
    pub fn distance(&self) -> f64 {
        self.steps.iter().filter_map(|step| step.distance).sum()
    }

    /// Schedule every step back to back from `start`.
    pub fn departing_at(mut self, start: Timestamp) -> Self {
        let mut time = start;
        for step in &mut self.steps {
            step.start_time = Some(time);
            time += step.duration;
            step.stop_time = Some(time);
        }
        self
    }
}

/// Identity of a path for deduplication: modes, places, times and
/// connections of every step.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PathSignature(String);

/// A complete journey from origin to destination.
#[derive(Debug, Clone, PartialEq)]
pub struct Path {
    legs: Vec<Leg>,
}

impl Path {
    /// Create a path, validating that legs connect end to start.
    pub fn new(legs: Vec<Leg>) -> Result<Self, DomainError> {
        if legs.is_empty() {
            return Err(DomainError::EmptyPath);
        }
        for pair in legs.windows(2) {
            let last = &pair[0].steps[pair[0].steps.len() - 1];
            check_contiguous(last, &pair[1].steps[0])?;
        }
        Ok(Self { legs })
    }

    pub fn legs(&self) -> &[Leg] {
        &self.legs
    }

    pub fn into_legs(self) -> Vec<Leg> {
        self.legs
    }

    /// All steps in travel order.
    pub fn steps(&self) -> impl Iterator<Item = &Step> {
        self.legs.iter().flat_map(|leg| leg.steps.iter())
    }

    pub fn origin(&self) -> &Location {
        self.legs[0].start()
    }

    pub fn destination(&self) -> &Location {
        self.legs[self.legs.len() - 1].stop()
    }

    pub fn departure_time(&self) -> Option<Timestamp> {
        self.legs[0].departure_time()
    }

    pub fn arrival_time(&self) -> Option<Timestamp> {
        self.legs[self.legs.len() - 1].arrival_time()
    }

    /// Number of vehicle changes.
    pub fn transfer_count(&self) -> usize {
        self.legs
            .iter()
            .filter(|leg| leg.travel_mode.is_transit())
            .count()
            .saturating_sub(1)
    }

    /// Door-to-door duration, or the summed step durations for untimed paths.
    pub fn total_duration(&self) -> Duration {
        match (self.departure_time(), self.arrival_time()) {
            (Some(departure), Some(arrival)) => arrival - departure,
            _ => self
                .legs
                .iter()
                .fold(Duration::zero(), |total, leg| total + leg.duration()),
        }
    }

    /// Schedule an untimed path back to back from `start`.
    pub fn departing_at(self, start: Timestamp) -> Self {
        let mut time = start;
        let legs = self
            .legs
            .into_iter()
            .map(|leg| {
                let leg = leg.departing_at(time);
                time += leg.duration();
                leg
            })
            .collect();
        Self { legs }
    }

    pub fn signature(&self) -> PathSignature {
        let mut key = String::new();
        for leg in &self.legs {
            let _ = write!(key, "{:?}[", leg.travel_mode);
            for step in &leg.steps {
                let _ = write!(
                    key,
                    "{}>{}@{:?}-{:?}/{:?}-{:?};",
                    place_key(&step.start),
                    place_key(&step.stop),
                    step.start_time.map(|t| t.timestamp()),
                    step.stop_time.map(|t| t.timestamp()),
                    step.enter_connection_id,
                    step.exit_connection_id,
                );
            }
            key.push(']');
        }
        PathSignature(key)
    }
}

fn place_key(location: &Location) -> String {
    match &location.id {
        Some(id) => id.to_string(),
        None => format!("{:.6},{:.6}", location.latitude, location.longitude),
    }
}

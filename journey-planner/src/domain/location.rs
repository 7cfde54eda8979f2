//! Geographic locations and stops.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::LocationId;
use crate::spatial::haversine;

/// A point on the map, optionally naming a stop or road node.
///
/// Locations are immutable values. Two locations denote the same place when
/// both carry an id and the ids match, or otherwise when their coordinates
/// are identical.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    /// Stop or node id, when the location is backed by one.
    #[serde(default)]
    pub id: Option<LocationId>,

    /// Human-readable name.
    #[serde(default)]
    pub name: Option<String>,

    pub latitude: f64,
    pub longitude: f64,
}

impl Location {
    /// Create an anonymous location at the given coordinates.
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            id: None,
            name: None,
            latitude,
            longitude,
        }
    }

    /// Attach an id.
    pub fn with_id(mut self, id: impl Into<LocationId>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Attach a name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Whether both locations denote the same place.
    pub fn same_place(&self, other: &Location) -> bool {
        match (&self.id, &other.id) {
            (Some(a), Some(b)) if a == b => true,
            _ => self.latitude == other.latitude && self.longitude == other.longitude,
        }
    }

    /// Great-circle distance in metres.
    pub fn distance_to(&self, other: &Location) -> f64 {
        haversine(
            self.latitude,
            self.longitude,
            other.latitude,
            other.longitude,
        )
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.name, &self.id) {
            (Some(name), _) => f.write_str(name),
            (None, Some(id)) => write!(f, "{id}"),
            (None, None) => write!(f, "({:.6}, {:.6})", self.latitude, self.longitude),
        }
    }
}

/// A public-transport stop.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stop {
    pub id: LocationId,
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,

    /// Average number of departures per day; a usage statistic only.
    #[serde(default)]
    pub avg_stop_times: f64,
}

impl Stop {
    /// The stop as a routable location.
    pub fn location(&self) -> Location {
        Location {
            id: Some(self.id.clone()),
            name: Some(self.name.clone()),
            latitude: self.latitude,
            longitude: self.longitude,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_place_prefers_ids() {
        let a = Location::new(51.0, 3.7).with_id("x");
        let b = Location::new(51.1, 3.8).with_id("x");
        let c = Location::new(51.0, 3.7).with_id("y");

        assert!(a.same_place(&b));
        // Different ids, identical coordinates.
        assert!(a.same_place(&c));
        assert!(!b.same_place(&c));
    }

    #[test]
    fn same_place_falls_back_to_coordinates() {
        let a = Location::new(51.0, 3.7);
        let b = Location::new(51.0, 3.7).with_id("stop");
        let c = Location::new(51.0, 3.70001);

        assert!(a.same_place(&b));
        assert!(!a.same_place(&c));
    }

    #[test]
    fn display() {
        assert_eq!(Location::new(51.0, 3.7).with_name("Gent").to_string(), "Gent");
        assert_eq!(Location::new(51.0, 3.7).with_id("s1").to_string(), "s1");
        assert_eq!(
            Location::new(51.0, 3.7).to_string(),
            "(51.000000, 3.700000)"
        );
    }

    #[test]
    fn stop_location_keeps_identity() {
        let stop = Stop {
            id: LocationId::new("s1"),
            name: "Gent-Sint-Pieters".into(),
            latitude: 51.0357,
            longitude: 3.7101,
            avg_stop_times: 120.0,
        };
        let location = stop.location();
        assert_eq!(location.id, Some(LocationId::new("s1")));
        assert_eq!(location.latitude, 51.0357);
    }
}

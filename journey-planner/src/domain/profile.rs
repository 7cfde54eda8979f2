//! Routing profiles for the road graph.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Duration;
use serde::{Deserialize, Serialize};

use super::{ProfileId, TravelMode};
use crate::spatial::travel_duration;

/// Classification of a road edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoadClass {
    Motorway,
    Primary,
    Secondary,
    Residential,
    Service,
    Footway,
    Cycleway,
    /// Synthetic edge joining an embedded location to the graph.
    Connector,
}

/// Speed and per-road-class costs for one way of moving over the road graph.
///
/// A road class without a cost factor is not traversable. Connector edges are
/// always traversable at factor 1.0 unless the profile overrides them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub id: ProfileId,
    pub travel_mode: TravelMode,

    /// Travel speed in km/h.
    pub speed_kmh: f64,

    /// Cost multiplier per road class.
    pub cost_factors: HashMap<RoadClass, f64>,
}

impl Profile {
    /// Pedestrian profile at 5 km/h that avoids motorways.
    pub fn walking() -> Self {
        Self {
            id: ProfileId::new("walking"),
            travel_mode: TravelMode::Walking,
            speed_kmh: 5.0,
            cost_factors: HashMap::from([
                (RoadClass::Primary, 1.2),
                (RoadClass::Secondary, 1.1),
                (RoadClass::Residential, 1.0),
                (RoadClass::Service, 1.0),
                (RoadClass::Footway, 0.9),
                (RoadClass::Cycleway, 1.1),
            ]),
        }
    }

    /// Car profile at 50 km/h that prefers major roads.
    pub fn car() -> Self {
        Self {
            id: ProfileId::new("car"),
            travel_mode: TravelMode::Road,
            speed_kmh: 50.0,
            cost_factors: HashMap::from([
                (RoadClass::Motorway, 0.6),
                (RoadClass::Primary, 0.8),
                (RoadClass::Secondary, 0.9),
                (RoadClass::Residential, 1.0),
                (RoadClass::Service, 1.5),
            ]),
        }
    }

    /// Cost of traversing `distance` metres of `class`, or `None` when the
    /// class is closed to this profile.
    pub fn edge_cost(&self, class: RoadClass, distance: f64) -> Option<f64> {
        match self.cost_factors.get(&class) {
            Some(factor) => Some(distance * factor),
            None if class == RoadClass::Connector => Some(distance),
            None => None,
        }
    }

    /// Time needed to cover `distance` metres.
    pub fn duration_for(&self, distance: f64) -> Duration {
        travel_duration(distance, self.speed_kmh)
    }
}

/// Registry of the profiles a planner knows about.
#[derive(Debug, Clone, Default)]
pub struct Profiles {
    by_id: HashMap<ProfileId, Arc<Profile>>,
}

impl Profiles {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding [`Profile::walking`] and [`Profile::car`].
    pub fn with_defaults() -> Self {
        let mut profiles = Self::new();
        profiles.insert(Profile::walking());
        profiles.insert(Profile::car());
        profiles
    }

    /// Add or replace a profile.
    pub fn insert(&mut self, profile: Profile) {
        self.by_id.insert(profile.id.clone(), Arc::new(profile));
    }

    pub fn get(&self, id: &ProfileId) -> Option<Arc<Profile>> {
        self.by_id.get(id).cloned()
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }
}

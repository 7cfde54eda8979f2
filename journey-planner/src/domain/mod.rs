//! Domain types for the journey planner.
//!
//! This module contains the core domain model: locations and stops,
//! timetabled connections, routing profiles and the paths the planners
//! produce. Types that carry invariants enforce them at construction time,
//! so code that receives them can trust their validity.

mod connection;
mod error;
mod ids;
mod location;
mod mode;
mod path;
mod profile;

pub use connection::Connection;
pub use error::DomainError;
pub use ids::{ConnectionId, LocationId, ProfileId, QueryId, TripId};
pub use location::{Location, Stop};
pub use mode::TravelMode;
pub use path::{Leg, Path, PathSignature, Step};
pub use profile::{Profile, Profiles, RoadClass};

/// Instant on the timetable.
pub type Timestamp = chrono::DateTime<chrono::Utc>;

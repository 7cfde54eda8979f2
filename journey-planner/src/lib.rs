//! Multimodal journey planner.
//!
//! Answers "how do I get from here to there?" by combining road paths for
//! walking and driving with connection scans over public-transport
//! timetables. Queries widen their time window until enough paths are found
//! and hand results back through a pull-based [`query::PathStream`].

pub mod domain;
pub mod error;
pub mod events;
pub mod pathfinding;
pub mod provider;
pub mod query;
pub mod spatial;
pub mod stops;
pub mod tiles;
pub mod transit;

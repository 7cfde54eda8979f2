//! Tiled road pathfinding.
//!
//! The road network is never loaded whole. Each query grows its own graph
//! from tiles: first those around the endpoints, then whichever tiles the
//! search frontier runs into. The search itself is a Dijkstra that suspends
//! at tile boundaries and resumes once the missing tiles are merged.

mod policy;
mod road;
mod search;
mod session;

pub use policy::{MaxDistanceHeuristic, RoadPlannerConfig, TileChoice, TileLayer, TileSelection};
pub use road::RoadPlanner;
pub use search::{DijkstraSearch, GraphStep, Label, SearchStatus};
pub use session::{EmbedDirection, PathfindingSession, SessionArena};

//! Routable tiles and the road graph built from them.

mod graph;
mod tile;

pub use graph::{GraphEdge, RoutableTileGraph};
pub use tile::{RoutableEdge, RoutableTile, RoutableTileNode};

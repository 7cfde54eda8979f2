//! Data provider contracts.
//!
//! Planners never fetch anything themselves: connections, stops and road
//! tiles come from implementations of these traits. This abstraction allows
//! the planners to be tested with the in-memory [`MemoryNetwork`].

mod memory;

use std::sync::Arc;

use futures::Stream;

use crate::domain::{Connection, LocationId, Stop, Timestamp};
use crate::error::ProviderError;
use crate::spatial::TileCoordinate;
use crate::tiles::{RoutableTile, RoutableTileNode};

pub use memory::{MemoryNetwork, NetworkData, RoadData};

/// Order in which connections are read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanDirection {
    /// Non-decreasing departure time, starting at the given instant.
    Forward,
    /// Non-increasing departure time, starting at the given instant.
    Backward,
}

/// Source of timetabled connections.
pub trait ConnectionsProvider {
    /// Connections departing at or after (forward) or at or before (backward)
    /// `from`, in scan order.
    ///
    /// The stream is lazy: nothing beyond what the caller polls is read.
    /// Calling again with another instant re-seeks.
    fn connections(
        &self,
        from: Timestamp,
        direction: ScanDirection,
    ) -> impl Stream<Item = Result<Connection, ProviderError>> + '_;
}

/// Source of stop data.
pub trait StopsProvider {
    async fn stop_by_id(&self, id: &LocationId) -> Result<Option<Stop>, ProviderError>;

    async fn all_stops(&self) -> Result<Vec<Stop>, ProviderError>;
}

/// Source of routable road tiles.
pub trait RoutableTileProvider {
    async fn tile_by_coordinate(
        &self,
        coordinate: TileCoordinate,
    ) -> Result<Arc<RoutableTile>, ProviderError>;

    /// Stable id of the tile at `coordinate` within this provider.
    fn tile_id(&self, coordinate: TileCoordinate) -> String;

    /// The road node with this id, wherever its tile is.
    async fn node_by_id(&self, id: &LocationId) -> Result<Option<RoutableTileNode>, ProviderError>;
}

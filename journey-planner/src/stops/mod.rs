//! Stops reachable on foot from a location.
//!
//! The spatial finder walks an R-tree of every stop outward from the
//! location and stops at the first stop that is too far to walk to in the
//! allowed time. The only-self finder is used where a location is already a
//! stop and no walking is wanted.

mod footpath;
mod index;

use std::sync::Arc;

use chrono::Duration;
use either::Either;
use tokio::sync::OnceCell;
use tracing::debug;

use crate::domain::{Location, Stop};
use crate::error::PlannerError;
use crate::provider::StopsProvider;
use crate::spatial::travel_duration;

pub use footpath::Footpath;
pub use index::StopIndex;

/// Why reachable stops are being looked up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SearchPhase {
    /// Around the origin.
    Initial,
    /// Around a stop where a journey changes vehicle. The query runner only
    /// looks up `Initial` and `Final` stops; callers planning changes on foot
    /// between nearby stops pass this phase themselves.
    Transfer,
    /// Around the destination.
    Final,
}

/// A stop and the walk needed to reach it.
#[derive(Debug, Clone, PartialEq)]
pub struct ReachableStop {
    pub stop: Stop,
    pub duration: Duration,

    /// Metres.
    pub distance: f64,

    pub phase: SearchPhase,
}

/// Strategy for finding reachable stops.
pub enum ReachableStopsFinder<S> {
    /// Nearest stops by great-circle distance. The index is built from
    /// [`StopsProvider::all_stops`] on first use and shared afterwards.
    Spatial {
        stops: Arc<S>,
        index: OnceCell<StopIndex>,
    },

    /// The location itself, when it is a stop.
    OnlySelf { stops: Arc<S> },
}

impl<S> ReachableStopsFinder<S>
where
    S: StopsProvider,
{
    pub fn spatial(stops: Arc<S>) -> Self {
        Self::Spatial {
            stops,
            index: OnceCell::new(),
        }
    }

    pub fn only_self(stops: Arc<S>) -> Self {
        Self::OnlySelf { stops }
    }

    /// Stops reachable from `location` within `max_duration` walking at
    /// `min_speed_kmh`, nearest first.
    pub async fn find_reachable_stops(
        &self,
        location: &Location,
        max_duration: Duration,
        min_speed_kmh: f64,
        phase: SearchPhase,
    ) -> Result<impl Iterator<Item = ReachableStop> + '_, PlannerError> {
        match self {
            Self::Spatial { stops, index } => {
                let index = index
                    .get_or_try_init(|| async {
                        let all = stops.all_stops().await?;
                        debug!(stops = all.len(), "Built stop index");
                        Ok::<_, PlannerError>(StopIndex::new(all))
                    })
                    .await?;
                let reachable = index
                    .nearest(location.latitude, location.longitude)
                    .map(move |(stop, distance)| ReachableStop {
                        stop: stop.clone(),
                        duration: travel_duration(distance, min_speed_kmh),
                        distance,
                        phase,
                    })
                    .take_while(move |reachable| reachable.duration <= max_duration);
                Ok(Either::Left(reachable))
            }
            Self::OnlySelf { stops } => {
                let stop = match &location.id {
                    Some(id) => stops.stop_by_id(id).await?,
                    None => None,
                };
                let reachable = stop.into_iter().map(move |stop| ReachableStop {
                    stop,
                    duration: Duration::zero(),
                    distance: 0.0,
                    phase,
                });
                Ok(Either::Right(reachable))
            }
        }
    }
}

impl<S> std::fmt::Debug for ReachableStopsFinder<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Spatial { index, .. } => f
                .debug_struct("Spatial")
                .field("indexed", &index.get().map(StopIndex::len))
                .finish(),
            Self::OnlySelf { .. } => f.write_str("OnlySelf"),
        }
    }
}

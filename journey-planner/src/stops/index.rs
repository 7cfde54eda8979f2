//! Nearest-neighbour index over stops.

use rstar::{AABB, Envelope, RTree};

use crate::domain::Stop;
use crate::spatial::{haversine, unit_sphere};

/// A stop's position on the unit sphere and its slot in [`StopIndex::stops`].
#[derive(Debug, Clone, Copy, PartialEq)]
struct IndexedStop {
    position: [f64; 3],
    slot: usize,
}

impl rstar::RTreeObject for IndexedStop {
    type Envelope = AABB<[f64; 3]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_point(self.position)
    }
}

impl rstar::PointDistance for IndexedStop {
    fn distance_2(
        &self,
        point: &<Self::Envelope as Envelope>::Point,
    ) -> <<Self::Envelope as Envelope>::Point as rstar::Point>::Scalar {
        self.position
            .iter()
            .zip(point)
            .map(|(a, b)| (a - b).powi(2))
            .sum()
    }
}

/// All stops of the network, bulk loaded into an R-tree.
#[derive(Debug)]
pub struct StopIndex {
    stops: Vec<Stop>,
    tree: RTree<IndexedStop>,
}

impl StopIndex {
    pub fn new(stops: Vec<Stop>) -> Self {
        let entries = stops
            .iter()
            .enumerate()
            .map(|(slot, stop)| IndexedStop {
                position: unit_sphere(stop.latitude, stop.longitude),
                slot,
            })
            .collect();
        Self {
            stops,
            tree: RTree::bulk_load(entries),
        }
    }

    /// Stops by increasing great-circle distance from the point, paired with
    /// that distance in metres.
    pub fn nearest(&self, latitude: f64, longitude: f64) -> impl Iterator<Item = (&Stop, f64)> + '_ {
        let query = unit_sphere(latitude, longitude);
        self.tree.nearest_neighbor_iter(&query).map(move |entry| {
            let stop = &self.stops[entry.slot];
            let distance = haversine(latitude, longitude, stop.latitude, stop.longitude);
            (stop, distance)
        })
    }

    pub fn len(&self) -> usize {
        self.stops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stops.is_empty()
    }
}

//! Dijkstra search that suspends at unexplored tile boundaries.
//!
//! The graph only holds the tiles fetched so far. When the search is about to
//! settle a breakpoint node (a node whose own tile has not been merged yet)
//! it puts the node back on the frontier and returns
//! [`SearchStatus::Suspended`]. The driver merges the missing tiles and calls
//! [`DijkstraSearch::resume`] again; no work is lost between rounds.

use std::cmp::Ordering;
use std::collections::{BTreeSet, BinaryHeap, HashMap, HashSet};
use std::sync::Arc;

use chrono::Duration;

use crate::domain::{LocationId, Profile};
use crate::tiles::RoutableTileGraph;

/// Best known way to reach a node.
#[derive(Debug, Clone, PartialEq)]
pub struct Label {
    pub cost: f64,

    /// Physical distance in metres.
    pub distance: f64,

    pub duration: Duration,
    pub previous: Option<LocationId>,
}

/// Outcome of one search round.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchStatus {
    /// The target was settled.
    Reached,

    /// The frontier emptied: everything within the bound was explored.
    Exhausted,

    /// Breakpoint nodes on the frontier need their tiles first.
    Suspended(Vec<LocationId>),
}

/// One hop of a found route.
#[derive(Debug, Clone, PartialEq)]
pub struct GraphStep {
    pub from: LocationId,
    pub to: LocationId,
    pub distance: f64,
    pub duration: Duration,
}

/// Heap entry; ordered so the `BinaryHeap` pops the cheapest first and, on
/// equal cost, the earliest inserted.
#[derive(Debug)]
struct SmallestHolder {
    cost: f64,
    sequence: u64,
    node: LocationId,
}

impl PartialEq for SmallestHolder {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for SmallestHolder {}

impl PartialOrd for SmallestHolder {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for SmallestHolder {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .cost
            .total_cmp(&self.cost)
            .then_with(|| other.sequence.cmp(&self.sequence))
    }
}

/// Resumable single-source search for one profile.
#[derive(Debug)]
pub struct DijkstraSearch {
    source: LocationId,
    target: Option<LocationId>,
    max_distance: f64,
    profile: Arc<Profile>,
    labels: HashMap<LocationId, Label>,
    settled: HashSet<LocationId>,
    heap: BinaryHeap<SmallestHolder>,
    sequence: u64,
}

impl DijkstraSearch {
    /// Start a search from `source`. Without a target the search explores
    /// everything within `max_distance` metres.
    pub fn new(
        source: LocationId,
        target: Option<LocationId>,
        max_distance: f64,
        profile: Arc<Profile>,
    ) -> Self {
        let mut search = Self {
            source: source.clone(),
            target,
            max_distance,
            profile,
            labels: HashMap::new(),
            settled: HashSet::new(),
            heap: BinaryHeap::new(),
            sequence: 0,
        };
        search.labels.insert(
            source.clone(),
            Label {
                cost: 0.0,
                distance: 0.0,
                duration: Duration::zero(),
                previous: None,
            },
        );
        search.push(source, 0.0);
        search
    }

    fn push(&mut self, node: LocationId, cost: f64) {
        self.heap.push(SmallestHolder {
            cost,
            sequence: self.sequence,
            node,
        });
        self.sequence += 1;
    }

    /// Run until the target is settled, the frontier empties or a
    /// breakpoint is reached.
    pub fn resume(
        &mut self,
        graph: &RoutableTileGraph,
        breakpoints: &HashSet<LocationId>,
    ) -> SearchStatus {
        while let Some(entry) = self.heap.pop() {
            if self.settled.contains(&entry.node) {
                continue;
            }
            let Some(label) = self.labels.get(&entry.node).cloned() else {
                continue;
            };
            if entry.cost > label.cost {
                // Superseded by a cheaper push.
                continue;
            }

            if breakpoints.contains(&entry.node) {
                self.heap.push(entry);
                return SearchStatus::Suspended(self.pending_breakpoints(breakpoints));
            }

            self.settled.insert(entry.node.clone());
            if self.target.as_ref() == Some(&entry.node) {
                return SearchStatus::Reached;
            }

            for edge in graph.neighbours(&entry.node) {
                if self.settled.contains(&edge.to) {
                    continue;
                }
                let Some(edge_cost) = self.profile.edge_cost(edge.road_class, edge.distance) else {
                    continue;
                };
                let distance = label.distance + edge.distance;
                if distance > self.max_distance {
                    continue;
                }
                let cost = label.cost + edge_cost;
                let improves = self
                    .labels
                    .get(&edge.to)
                    .is_none_or(|existing| cost < existing.cost);
                if improves {
                    self.labels.insert(
                        edge.to.clone(),
                        Label {
                            cost,
                            distance,
                            duration: label.duration + self.profile.duration_for(edge.distance),
                            previous: Some(entry.node.clone()),
                        },
                    );
                    self.push(edge.to.clone(), cost);
                }
            }
        }
        SearchStatus::Exhausted
    }

    /// Breakpoint nodes with a live frontier entry, in a stable order.
    fn pending_breakpoints(&self, breakpoints: &HashSet<LocationId>) -> Vec<LocationId> {
        let pending: BTreeSet<&LocationId> = self
            .heap
            .iter()
            .filter(|entry| breakpoints.contains(&entry.node) && !self.settled.contains(&entry.node))
            .map(|entry| &entry.node)
            .collect();
        pending.into_iter().cloned().collect()
    }

    pub fn label(&self, node: &LocationId) -> Option<&Label> {
        self.labels.get(node)
    }

    pub fn is_settled(&self, node: &LocationId) -> bool {
        self.settled.contains(node)
    }

    /// Hops from the source to a settled node.
    pub fn steps_to(&self, node: &LocationId) -> Vec<GraphStep> {
        if !self.settled.contains(node) {
            return Vec::new();
        }
        let mut steps = Vec::new();
        let mut current = node.clone();
        while let Some(label) = self.labels.get(&current) {
            let Some(previous) = label.previous.clone() else {
                break;
            };
            let before = self.labels.get(&previous);
            let (distance, duration) = match before {
                Some(before) => (label.distance - before.distance, label.duration - before.duration),
                None => (label.distance, label.duration),
            };
            steps.push(GraphStep {
                from: previous.clone(),
                to: current,
                distance,
                duration,
            });
            current = previous;
            if current == self.source {
                break;
            }
        }
        steps.reverse();
        steps
    }

    /// Labels of every settled node.
    pub fn into_tree(mut self) -> HashMap<LocationId, Label> {
        let settled = self.settled;
        self.labels.retain(|node, _| settled.contains(node));
        self.labels
    }
}

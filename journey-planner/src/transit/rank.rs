//! Ordering and deduplication of found paths.

use std::cmp::Ordering;
use std::collections::HashSet;

use crate::domain::{Path, PathSignature, Timestamp};

fn compare(a: &Path, b: &Path) -> Ordering {
    let arrival = |path: &Path| path.arrival_time().unwrap_or(Timestamp::MAX_UTC);
    arrival(a)
        .cmp(&arrival(b))
        .then_with(|| a.transfer_count().cmp(&b.transfer_count()))
        .then_with(|| a.total_duration().cmp(&b.total_duration()))
}

/// Sort paths best first: earliest arrival, then fewest transfers, then
/// shortest door-to-door time. Untimed paths come last.
pub fn rank_paths(mut paths: Vec<Path>) -> Vec<Path> {
    paths.sort_by(compare);
    paths
}

/// Drop paths whose signature is in `seen` or repeats an earlier path, and
/// record the signatures of the ones kept.
pub fn deduplicate(paths: Vec<Path>, seen: &mut HashSet<PathSignature>) -> Vec<Path> {
    paths
        .into_iter()
        .filter(|path| seen.insert(path.signature()))
        .collect()
}

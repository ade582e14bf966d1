use std::collections::HashMap;
use std::hash::Hash;

use crate::graph::{Graph, NodeIndex};

/// A shortest path: total weight plus the node sequence, both endpoints
/// included.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Path<K> {
    pub distance: f64,
    pub nodes: Vec<K>,
}

impl<K> Path<K> {
    /// Number of edges on the path.
    pub fn hops(&self) -> usize {
        self.nodes.len().saturating_sub(1)
    }
}

/// Outcome of a single-source search on non-negative weights.
#[derive(Debug, Clone, PartialEq)]
pub enum PathResult<K> {
    Found(Path<K>),
    Unreachable,
}

impl<K> PathResult<K> {
    pub fn distance(&self) -> Option<f64> {
        match self {
            PathResult::Found(p) => Some(p.distance),
            PathResult::Unreachable => None,
        }
    }

    pub fn path(&self) -> Option<&[K]> {
        match self {
            PathResult::Found(p) => Some(&p.nodes),
            PathResult::Unreachable => None,
        }
    }

    pub fn is_found(&self) -> bool {
        matches!(self, PathResult::Found(_))
    }

    pub fn into_path(self) -> Option<Path<K>> {
        match self {
            PathResult::Found(p) => Some(p),
            PathResult::Unreachable => None,
        }
    }
}

/// Anything that can turn a (source, target) pair back into a node
/// sequence: predecessor maps and next-hop tables.
///
/// `None` means there is no path. `Some(vec![])` means the links are
/// inconsistent (a predecessor chain that never reaches the source).
pub trait HopTable<K> {
    fn reconstruct(&self, source: &K, target: &K) -> Option<Vec<K>>;
}

/// Reconstruct the path from `source` to `target` out of a predecessor map
/// or next-hop table.
pub fn reconstruct_path<K, T>(table: &T, source: &K, target: &K) -> Option<Vec<K>>
where
    T: HopTable<K> + ?Sized,
{
    table.reconstruct(source, target)
}

/// Raw predecessor map: `None` marks the source and unreached nodes alike,
/// so an unreached target comes back as an empty path.
impl<K: Eq + Hash + Clone> HopTable<K> for HashMap<K, Option<K>> {
    fn reconstruct(&self, source: &K, target: &K) -> Option<Vec<K>> {
        if !self.contains_key(target) {
            return None;
        }

        let mut path = vec![target.clone()];
        let mut current = target;
        while current != source {
            match self.get(current) {
                Some(Some(prev)) if path.len() <= self.len() => {
                    path.push(prev.clone());
                    current = prev;
                }
                _ => return Some(Vec::new()),
            }
        }

        path.reverse();
        Some(path)
    }
}

/// Walk predecessor links from `target` back to `source`.
///
/// Returns an empty vec if the chain stops short of `source` or runs
/// longer than the node count (a cycle).
pub(crate) fn walk_predecessors(
    pred: &[Option<NodeIndex>],
    source: NodeIndex,
    target: NodeIndex,
) -> Vec<NodeIndex> {
    let mut path = vec![target];
    let mut current = target;

    while current != source {
        match pred[current] {
            Some(prev) if path.len() <= pred.len() => {
                path.push(prev);
                current = prev;
            }
            _ => return Vec::new(),
        }
    }

    path.reverse();
    path
}

/// Follow next-hop links of an `n x n` row-major table from `start` to `end`.
///
/// `start == end` is trivially reachable. Returns None if a hop is missing
/// before `end` is reached.
pub(crate) fn walk_next_hops(
    next: &[Option<NodeIndex>],
    n: usize,
    start: NodeIndex,
    end: NodeIndex,
) -> Option<Vec<NodeIndex>> {
    if start == end {
        return Some(vec![start]);
    }
    next[start * n + end]?;

    let mut path = vec![start];
    let mut current = start;
    while current != end {
        current = next[current * n + end]?;
        path.push(current);
        if path.len() > n {
            return None;
        }
    }
    Some(path)
}

/// Build the found path for `target` out of a finished distance and
/// predecessor array.
pub(crate) fn found_path<K: Eq + Hash + Clone>(
    graph: &Graph<K>,
    dist: &[f64],
    pred: &[Option<NodeIndex>],
    source: NodeIndex,
    target: NodeIndex,
) -> Path<K> {
    let indices = walk_predecessors(pred, source, target);
    if indices.is_empty() {
        tracing::warn!(
            source,
            target,
            "predecessor chain does not reach the source, returning empty path"
        );
    }
    Path {
        distance: dist[target],
        nodes: indices.into_iter().map(|i| graph.key_of(i).clone()).collect(),
    }
}

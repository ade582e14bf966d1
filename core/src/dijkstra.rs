use std::borrow::Borrow;
use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap};
use std::fmt;
use std::hash::Hash;

use tracing::debug;

use crate::error::{Endpoint, Result};
use crate::graph::{Graph, NodeIndex};
use crate::path::{found_path, walk_predecessors, HopTable, PathResult};

/// Min-heap entry ordered by distance.
///
/// f64 has no total order, so `total_cmp` is used and the comparison is
/// flipped to turn `BinaryHeap` into a min-heap. The node index only
/// breaks ties to keep `Ord` consistent with `Eq`.
#[derive(Debug, Clone, Copy)]
struct HeapEntry {
    distance: f64,
    node: NodeIndex,
}

impl Ord for HeapEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .distance
            .total_cmp(&self.distance)
            .then_with(|| other.node.cmp(&self.node))
    }
}

impl PartialOrd for HeapEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for HeapEntry {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for HeapEntry {}

/// Label-setting search from `source`. Stops as soon as `target` is
/// settled, or runs to exhaustion when `target` is None.
///
/// Uses lazy deletion: improved distances are pushed as new entries and
/// stale ones are dropped when popped.
fn settle<K: Eq + Hash + Clone>(
    graph: &Graph<K>,
    source: NodeIndex,
    target: Option<NodeIndex>,
) -> (Vec<f64>, Vec<Option<NodeIndex>>) {
    let n = graph.node_count();
    let mut dist = vec![f64::INFINITY; n];
    let mut pred: Vec<Option<NodeIndex>> = vec![None; n];
    let mut settled = vec![false; n];
    let mut heap = BinaryHeap::new();

    dist[source] = 0.0;
    heap.push(HeapEntry {
        distance: 0.0,
        node: source,
    });
    let mut pushes = 1usize;
    let mut settled_count = 0usize;

    while let Some(HeapEntry { distance, node }) = heap.pop() {
        if settled[node] || distance > dist[node] {
            continue;
        }
        settled[node] = true;
        settled_count += 1;

        // Non-negative weights: nothing popped later can improve the target
        if Some(node) == target {
            break;
        }

        for edge in graph.out_edges(node) {
            let candidate = distance + edge.weight;
            if candidate < dist[edge.target] {
                dist[edge.target] = candidate;
                pred[edge.target] = Some(node);
                heap.push(HeapEntry {
                    distance: candidate,
                    node: edge.target,
                });
                pushes += 1;
            }
        }
    }

    debug!(
        nodes = n,
        settled = settled_count,
        pushes,
        stale = heap.len(),
        "priority search finished"
    );

    (dist, pred)
}

/// Shortest path from `source` to `target` on non-negative weights
/// (Dijkstra, binary heap, early exit).
///
/// Fails with `UnknownNode` if either endpoint is missing. An unreachable
/// target is `PathResult::Unreachable`. Negative weights are not checked;
/// the result is then unspecified.
///
/// Complexity: O((V + E) log V).
pub fn shortest_path_priority<K, Q>(
    graph: &Graph<K>,
    source: &Q,
    target: &Q,
) -> Result<PathResult<K>>
where
    K: Eq + Hash + Clone + Borrow<Q>,
    Q: Hash + Eq + fmt::Debug + ?Sized,
{
    let start = graph.require(source, Endpoint::Source)?;
    let goal = graph.require(target, Endpoint::Target)?;

    let (dist, pred) = settle(graph, start, Some(goal));

    if dist[goal] == f64::INFINITY {
        return Ok(PathResult::Unreachable);
    }
    Ok(PathResult::Found(found_path(graph, &dist, &pred, start, goal)))
}

/// Distances and predecessors from `source` to every node (no early exit).
///
/// Use this when several targets will be queried against one source.
pub fn shortest_path_priority_all<'g, K, Q>(
    graph: &'g Graph<K>,
    source: &Q,
) -> Result<ShortestPathTree<'g, K>>
where
    K: Eq + Hash + Clone + Borrow<Q>,
    Q: Hash + Eq + fmt::Debug + ?Sized,
{
    let start = graph.require(source, Endpoint::Source)?;
    let (dist, pred) = settle(graph, start, None);

    Ok(ShortestPathTree {
        graph,
        source: start,
        dist,
        pred,
    })
}

/// Single-source distances and predecessor links over a borrowed graph.
#[derive(Debug, Clone)]
pub struct ShortestPathTree<'g, K> {
    graph: &'g Graph<K>,
    source: NodeIndex,
    dist: Vec<f64>,
    pred: Vec<Option<NodeIndex>>,
}

impl<'g, K: Eq + Hash + Clone> ShortestPathTree<'g, K> {
    pub fn source(&self) -> &'g K {
        self.graph.key_of(self.source)
    }

    /// Distance to `node`, or None if it is unknown or unreached.
    pub fn distance_to<Q>(&self, node: &Q) -> Option<f64>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let idx = self.graph.index_of(node)?;
        let d = self.dist[idx];
        (d != f64::INFINITY).then_some(d)
    }

    pub fn predecessor_of<Q>(&self, node: &Q) -> Option<&'g K>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let idx = self.graph.index_of(node)?;
        self.pred[idx].map(|p| self.graph.key_of(p))
    }

    /// Path from the tree's source to `node`, or None if unreached.
    pub fn path_to<Q>(&self, node: &Q) -> Option<Vec<K>>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let idx = self.graph.index_of(node)?;
        self.path_between(self.source, idx)
    }

    fn path_between(&self, from: NodeIndex, to: NodeIndex) -> Option<Vec<K>> {
        if self.dist[to] == f64::INFINITY {
            return None;
        }
        Some(
            walk_predecessors(&self.pred, from, to)
                .into_iter()
                .map(|i| self.graph.key_of(i).clone())
                .collect(),
        )
    }

    /// Reached nodes and their distances, in node insertion order.
    pub fn reachable(&self) -> impl Iterator<Item = (&'g K, f64)> + '_ {
        self.dist
            .iter()
            .enumerate()
            .filter(|(_, d)| **d != f64::INFINITY)
            .map(|(i, d)| (self.graph.key_of(i), *d))
    }

    /// Every node's distance; unreached nodes map to +infinity.
    pub fn distance_map(&self) -> HashMap<K, f64> {
        self.graph
            .all_node_keys()
            .cloned()
            .zip(self.dist.iter().copied())
            .collect()
    }

    /// Every node's predecessor; the source and unreached nodes map to None.
    pub fn predecessor_map(&self) -> HashMap<K, Option<K>> {
        self.graph
            .all_node_keys()
            .cloned()
            .zip(
                self.pred
                    .iter()
                    .map(|p| p.map(|i| self.graph.key_of(i).clone())),
            )
            .collect()
    }
}

/// Only paths from the tree's own source are known; any other source
/// gives None.
impl<K: Eq + Hash + Clone> HopTable<K> for ShortestPathTree<'_, K> {
    fn reconstruct(&self, source: &K, target: &K) -> Option<Vec<K>> {
        if self.graph.index_of(source)? != self.source {
            return None;
        }
        let to = self.graph.index_of(target)?;
        self.path_between(self.source, to)
    }
}

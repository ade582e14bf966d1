use std::borrow::Borrow;
use std::fmt;
use std::hash::Hash;

use tracing::{debug, warn};

use crate::error::{Endpoint, Result};
use crate::graph::{Graph, NodeIndex};
use crate::path::{found_path, Path};

/// Outcome of the negative-weight tolerant search.
#[derive(Debug, Clone, PartialEq)]
pub enum RelaxationResult<K> {
    Found(Path<K>),
    Unreachable,
    /// A negative-weight cycle is reachable from the source; no distance
    /// or path is meaningful.
    NegativeCycle,
}

impl<K> RelaxationResult<K> {
    pub fn distance(&self) -> Option<f64> {
        match self {
            RelaxationResult::Found(p) => Some(p.distance),
            _ => None,
        }
    }

    pub fn path(&self) -> Option<&[K]> {
        match self {
            RelaxationResult::Found(p) => Some(&p.nodes),
            _ => None,
        }
    }

    pub fn has_negative_cycle(&self) -> bool {
        matches!(self, RelaxationResult::NegativeCycle)
    }

    pub fn into_path(self) -> Option<Path<K>> {
        match self {
            RelaxationResult::Found(p) => Some(p),
            _ => None,
        }
    }
}

/// Shortest path from `source` to `target` allowing negative weights
/// (Bellman-Ford).
///
/// Relaxes every edge out of every reached node V-1 times, then runs one
/// more pass: any edge that still relaxes means a negative cycle is
/// reachable from `source`, and the result is `NegativeCycle` whatever the
/// target. Negative cycles that `source` cannot reach do not matter.
///
/// Relaxation stops early once a full pass changes nothing.
///
/// Complexity: O(V * E).
pub fn shortest_path_relaxation<K, Q>(
    graph: &Graph<K>,
    source: &Q,
    target: &Q,
) -> Result<RelaxationResult<K>>
where
    K: Eq + Hash + Clone + Borrow<Q>,
    Q: Hash + Eq + fmt::Debug + ?Sized,
{
    let start = graph.require(source, Endpoint::Source)?;
    let goal = graph.require(target, Endpoint::Target)?;

    let n = graph.node_count();
    let mut dist = vec![f64::INFINITY; n];
    let mut pred: Vec<Option<NodeIndex>> = vec![None; n];
    dist[start] = 0.0;

    let mut passes = 0usize;
    for _ in 0..n.saturating_sub(1) {
        passes += 1;
        if !relax_pass(graph, &mut dist, &mut pred) {
            break;
        }
    }

    if has_relaxable_edge(graph, &dist) {
        warn!(
            source = ?source,
            passes,
            "negative cycle reachable from source"
        );
        return Ok(RelaxationResult::NegativeCycle);
    }

    debug!(nodes = n, edges = graph.edge_count(), passes, "relaxation search finished");

    if dist[goal] == f64::INFINITY {
        return Ok(RelaxationResult::Unreachable);
    }
    Ok(RelaxationResult::Found(found_path(
        graph, &dist, &pred, start, goal,
    )))
}

/// One pass over every edge out of a reached node. Returns whether any
/// distance improved.
fn relax_pass<K: Eq + Hash + Clone>(
    graph: &Graph<K>,
    dist: &mut [f64],
    pred: &mut [Option<NodeIndex>],
) -> bool {
    let mut changed = false;
    for node in 0..dist.len() {
        if !dist[node].is_finite() {
            continue;
        }
        for edge in graph.out_edges(node) {
            let candidate = dist[node] + edge.weight;
            if candidate < dist[edge.target] {
                dist[edge.target] = candidate;
                pred[edge.target] = Some(node);
                changed = true;
            }
        }
    }
    changed
}

fn has_relaxable_edge<K: Eq + Hash + Clone>(graph: &Graph<K>, dist: &[f64]) -> bool {
    (0..dist.len()).any(|node| {
        dist[node].is_finite()
            && graph
                .out_edges(node)
                .iter()
                .any(|edge| dist[node] + edge.weight < dist[edge.target])
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dijkstra::shortest_path_priority;
    use crate::error::GraphError;

    fn graph_from(edges: &[(&str, &str, f64)]) -> Graph<String> {
        let mut g = Graph::new();
        g.load_edges(
            edges
                .iter()
                .map(|&(s, t, w)| (s.to_string(), t.to_string(), w)),
        );
        g
    }

    /// Deterministic LCG so the random graphs are reproducible.
    struct FastRng(u64);

    impl FastRng {
        fn next(&mut self, max: u64) -> u64 {
            self.0 = self.0.wrapping_mul(6364136223846793005).wrapping_add(1);
            (self.0 >> 33) % max
        }
    }

    fn random_graph(seed: u64, nodes: u64, edges: u64) -> Graph<u64> {
        let mut rng = FastRng(seed);
        let mut g = Graph::with_capacity(nodes as usize);
        for i in 0..nodes {
            g.add_node(i, Default::default());
        }
        for _ in 0..edges {
            let from = rng.next(nodes);
            let to = rng.next(nodes);
            let weight = rng.next(100) as f64 / 4.0;
            g.add_edge(from, to, weight);
        }
        g
    }

    #[test]
    fn test_relaxation_basic() {
        let g = graph_from(&[
            ("A", "B", 5.0),
            ("A", "C", 3.0),
            ("B", "D", 2.0),
            ("C", "D", 6.0),
            ("C", "B", 1.0),
        ]);
        let result = shortest_path_relaxation(&g, "A", "D").unwrap();
        assert_eq!(result.distance(), Some(6.0));
        assert_eq!(result.path().unwrap(), &["A", "C", "B", "D"]);
        assert!(!result.has_negative_cycle());
    }

    #[test]
    fn test_relaxation_negative_edge() {
        // Dijkstra would settle C at 2 before seeing B -> C
        let g = graph_from(&[("A", "B", 4.0), ("A", "C", 2.0), ("B", "C", -3.0), ("C", "D", 1.0)]);
        let result = shortest_path_relaxation(&g, "A", "D").unwrap();
        assert_eq!(result.distance(), Some(2.0));
        assert_eq!(result.path().unwrap(), &["A", "B", "C", "D"]);
    }

    #[test]
    fn test_relaxation_negative_cycle() {
        let g = graph_from(&[("A", "B", 1.0), ("B", "A", -3.0)]);
        let result = shortest_path_relaxation(&g, "A", "B").unwrap();
        assert_eq!(result, RelaxationResult::NegativeCycle);
        assert!(result.has_negative_cycle());
        assert_eq!(result.distance(), None);
        assert_eq!(result.path(), None);
    }

    #[test]
    fn test_relaxation_negative_cycle_off_path() {
        // Cycle is reachable from A even though the target is not on it
        let g = graph_from(&[
            ("A", "T", 1.0),
            ("A", "X", 1.0),
            ("X", "Y", -2.0),
            ("Y", "X", 1.0),
        ]);
        let result = shortest_path_relaxation(&g, "A", "T").unwrap();
        assert!(result.has_negative_cycle());
    }

    #[test]
    fn test_relaxation_negative_self_loop() {
        let g = graph_from(&[("A", "A", -1.0), ("A", "B", 1.0)]);
        let result = shortest_path_relaxation(&g, "A", "B").unwrap();
        assert!(result.has_negative_cycle());
    }

    #[test]
    fn test_relaxation_unreachable_negative_cycle_ignored() {
        let g = graph_from(&[("A", "B", 2.0), ("X", "Y", -5.0), ("Y", "X", 1.0)]);
        let result = shortest_path_relaxation(&g, "A", "B").unwrap();
        assert_eq!(result.distance(), Some(2.0));
        assert_eq!(result.path().unwrap(), &["A", "B"]);
    }

    #[test]
    fn test_relaxation_unreachable() {
        let g = graph_from(&[("A", "B", 5.0), ("C", "D", 3.0)]);
        let result = shortest_path_relaxation(&g, "A", "D").unwrap();
        assert_eq!(result, RelaxationResult::Unreachable);
        assert!(!result.has_negative_cycle());
        assert_eq!(result.path(), None);
    }

    #[test]
    fn test_relaxation_self() {
        let mut g: Graph<String> = Graph::new();
        g.add_node("A".into(), Default::default());
        let result = shortest_path_relaxation(&g, "A", "A").unwrap();
        assert_eq!(result.distance(), Some(0.0));
        assert_eq!(result.path().unwrap(), &["A"]);
    }

    #[test]
    fn test_relaxation_unknown_nodes() {
        let g = graph_from(&[("A", "B", 1.0)]);
        assert!(matches!(
            shortest_path_relaxation(&g, "Z", "B"),
            Err(GraphError::UnknownNode {
                role: Endpoint::Source,
                ..
            })
        ));
        assert!(matches!(
            shortest_path_relaxation(&g, "A", "Z"),
            Err(GraphError::UnknownNode {
                role: Endpoint::Target,
                ..
            })
        ));
    }

    #[test]
    fn test_relaxation_zero_weight_cycle_is_not_negative() {
        let g = graph_from(&[("A", "B", 1.0), ("B", "C", 0.0), ("C", "B", 0.0), ("C", "D", 1.0)]);
        let result = shortest_path_relaxation(&g, "A", "D").unwrap();
        assert_eq!(result.distance(), Some(2.0));
        assert_eq!(result.path().unwrap(), &["A", "B", "C", "D"]);
    }

    #[test]
    fn test_relaxation_path_weights_sum_to_distance() {
        let g = graph_from(&[
            ("S", "A", 2.0),
            ("S", "B", 6.0),
            ("A", "B", -1.0),
            ("B", "C", 2.0),
            ("A", "C", 4.0),
            ("C", "T", -2.0),
        ]);
        let result = shortest_path_relaxation(&g, "S", "T").unwrap();
        let path = result.into_path().unwrap();
        let total: f64 = path
            .nodes
            .windows(2)
            .map(|w| g.edge_weight(w[0].as_str(), w[1].as_str()).unwrap())
            .sum();
        assert_eq!(path.distance, 1.0);
        assert_eq!(total, path.distance);
    }

    #[test]
    fn test_relaxation_agrees_with_priority_on_random_graphs() {
        for seed in 1..=20u64 {
            let g = random_graph(seed, 40, 160);
            for (s, t) in [(0u64, 39u64), (5, 17), (12, 3), (30, 30)] {
                let priority = shortest_path_priority(&g, &s, &t).unwrap();
                let relaxed = shortest_path_relaxation(&g, &s, &t).unwrap();
                assert!(!relaxed.has_negative_cycle());
                match (priority.distance(), relaxed.distance()) {
                    (Some(a), Some(b)) => assert!((a - b).abs() < 1e-9, "seed {seed}: {a} vs {b}"),
                    (None, None) => {}
                    other => panic!("seed {seed} {s}->{t}: reachability differs: {other:?}"),
                }
            }
        }
    }
}

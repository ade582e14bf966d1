use std::borrow::Borrow;
use std::collections::HashMap;
use std::hash::Hash;

use tracing::debug;

use crate::graph::{Graph, NodeIndex};
use crate::path::{walk_next_hops, HopTable};

/// All-pairs distance and next-hop tables (Floyd-Warshall output).
///
/// Owns a snapshot of the node keys, so it stays valid after the graph
/// borrow ends and can be shared read-only between threads. It reflects
/// the graph as it was when computed.
#[derive(Debug, Clone)]
pub struct AllPairs<K> {
    keys: Vec<K>,
    index: HashMap<K, NodeIndex>,
    /// Row-major `n x n`, +inf where unreachable.
    dist: Vec<f64>,
    next: Vec<Option<NodeIndex>>,
    /// A self-loop with negative weight; kept off the diagonal, so
    /// recorded here.
    negative_self_loop: bool,
}

/// Shortest distances and first hops between every ordered node pair.
///
/// Initialises `dist[i][i] = 0` and `dist[i][j]` to the direct edge weight,
/// with `next[i][j] = j` for direct edges. Self-loop edges are not written
/// onto the diagonal, and an edge of weight +inf (or NaN) is no edge at all. For each intermediate `k`, an improvement through `k`
/// takes `next[i][j] = next[i][k]`: the first hop toward `k`.
///
/// Negative weights are fine; negative cycles are not handled and leave
/// the tables unspecified (see [`AllPairs::has_negative_cycle`]).
///
/// Complexity: O(V³) time, O(V²) space. Compute once, query many times.
pub fn all_pairs_shortest_paths<K: Eq + Hash + Clone>(graph: &Graph<K>) -> AllPairs<K> {
    let n = graph.node_count();
    let mut dist = vec![f64::INFINITY; n * n];
    let mut next: Vec<Option<NodeIndex>> = vec![None; n * n];
    let mut negative_self_loop = false;

    for i in 0..n {
        dist[i * n + i] = 0.0;
        for edge in graph.out_edges(i) {
            if edge.target == i {
                negative_self_loop |= edge.weight < 0.0;
                continue;
            }
            // Unusable weight: leave the pair unreachable so dist and next agree
            if edge.weight.is_nan() || edge.weight == f64::INFINITY {
                continue;
            }
            dist[i * n + edge.target] = edge.weight;
            next[i * n + edge.target] = Some(edge.target);
        }
    }

    for k in 0..n {
        for i in 0..n {
            let through_k = dist[i * n + k];
            // Nothing routes from i through k
            if through_k == f64::INFINITY {
                continue;
            }
            for j in 0..n {
                let candidate = through_k + dist[k * n + j];
                if candidate < dist[i * n + j] {
                    dist[i * n + j] = candidate;
                    next[i * n + j] = next[i * n + k];
                }
            }
        }
    }

    debug!(nodes = n, cells = n * n, "all-pairs tables computed");

    AllPairs {
        keys: graph.key_snapshot(),
        index: graph.index_snapshot(),
        dist,
        next,
        negative_self_loop,
    }
}

impl<K: Eq + Hash + Clone> AllPairs<K> {
    pub fn node_count(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    fn cell<Q>(&self, from: &Q, to: &Q) -> Option<usize>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let i = *self.index.get(from)?;
        let j = *self.index.get(to)?;
        Some(i * self.keys.len() + j)
    }

    /// Shortest distance `from -> to`; None if unreachable or unknown.
    pub fn distance<Q>(&self, from: &Q, to: &Q) -> Option<f64>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let d = self.dist[self.cell(from, to)?];
        (d != f64::INFINITY).then_some(d)
    }

    /// First node after `from` on a shortest path to `to`.
    pub fn next_hop<Q>(&self, from: &Q, to: &Q) -> Option<&K>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.next[self.cell(from, to)?].map(|i| &self.keys[i])
    }

    /// Node sequence of a shortest path, both endpoints included.
    ///
    /// `from == to` is the single-node path. None if unreachable or unknown.
    pub fn path<Q>(&self, from: &Q, to: &Q) -> Option<Vec<K>>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let i = *self.index.get(from)?;
        let j = *self.index.get(to)?;
        self.path_between(i, j)
    }

    fn path_between(&self, i: NodeIndex, j: NodeIndex) -> Option<Vec<K>> {
        let hops = walk_next_hops(&self.next, self.keys.len(), i, j)?;
        Some(hops.into_iter().map(|h| self.keys[h].clone()).collect())
    }

    /// Reachable ordered pairs `(from, to, distance)`, diagonal excluded,
    /// row by row in node insertion order.
    pub fn pairs(&self) -> impl Iterator<Item = (&K, &K, f64)> + '_ {
        let n = self.keys.len();
        self.dist
            .iter()
            .enumerate()
            .filter(move |&(cell, d)| *d != f64::INFINITY && cell / n != cell % n)
            .map(move |(cell, d)| (&self.keys[cell / n], &self.keys[cell % n], *d))
    }

    /// Full distance table keyed by `(from, to)`; unreachable pairs are +inf.
    pub fn distance_table(&self) -> HashMap<(K, K), f64> {
        let n = self.keys.len();
        self.dist
            .iter()
            .enumerate()
            .map(|(cell, d)| ((self.keys[cell / n].clone(), self.keys[cell % n].clone()), *d))
            .collect()
    }

    /// Full next-hop table keyed by `(from, to)`.
    pub fn next_hop_table(&self) -> HashMap<(K, K), Option<K>> {
        let n = self.keys.len();
        self.next
            .iter()
            .enumerate()
            .map(|(cell, hop)| {
                (
                    (self.keys[cell / n].clone(), self.keys[cell % n].clone()),
                    hop.map(|h| self.keys[h].clone()),
                )
            })
            .collect()
    }

    /// Whether the graph has a negative cycle (a node reaching itself at
    /// negative cost, or a negative self-loop), in which case the tables
    /// are not meaningful.
    pub fn has_negative_cycle(&self) -> bool {
        let n = self.keys.len();
        self.negative_self_loop || (0..n).any(|i| self.dist[i * n + i] < 0.0)
    }
}

impl<K: Eq + Hash + Clone> HopTable<K> for AllPairs<K> {
    fn reconstruct(&self, source: &K, target: &K) -> Option<Vec<K>> {
        let i = *self.index.get(source)?;
        let j = *self.index.get(target)?;
        self.path_between(i, j)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bellman_ford::shortest_path_relaxation;
    use crate::dijkstra::shortest_path_priority;
    use crate::path::reconstruct_path;

    fn graph_from(edges: &[(&str, &str, f64)]) -> Graph<String> {
        let mut g = Graph::new();
        g.load_edges(
            edges
                .iter()
                .map(|&(s, t, w)| (s.to_string(), t.to_string(), w)),
        );
        g
    }

    fn city() -> Graph<String> {
        graph_from(&[
            ("A", "B", 5.0),
            ("A", "C", 3.0),
            ("B", "D", 2.0),
            ("C", "D", 6.0),
            ("C", "B", 1.0),
        ])
    }

    struct FastRng(u64);

    impl FastRng {
        fn next(&mut self, max: u64) -> u64 {
            self.0 = self.0.wrapping_mul(6364136223846793005).wrapping_add(1);
            (self.0 >> 33) % max
        }
    }

    #[test]
    fn test_all_pairs_city() {
        let g = city();
        let ap = all_pairs_shortest_paths(&g);
        assert_eq!(ap.distance("A", "D"), Some(6.0));
        assert_eq!(ap.distance("A", "B"), Some(4.0));
        assert_eq!(ap.next_hop("A", "D").map(String::as_str), Some("C"));
        assert_eq!(ap.path("A", "D").unwrap(), vec!["A", "C", "B", "D"]);
    }

    #[test]
    fn test_all_pairs_tables() {
        let g = city();
        let ap = all_pairs_shortest_paths(&g);
        let dist = ap.distance_table();
        let next = ap.next_hop_table();
        assert_eq!(dist.len(), 16);
        assert_eq!(next.len(), 16);
        assert_eq!(dist[&("A".to_string(), "D".to_string())], 6.0);
        assert_eq!(dist[&("D".to_string(), "A".to_string())], f64::INFINITY);
        assert_eq!(dist[&("B".to_string(), "B".to_string())], 0.0);
        assert_eq!(next[&("B".to_string(), "B".to_string())], None);
        assert_eq!(
            next[&("A".to_string(), "B".to_string())].as_deref(),
            Some("C")
        );
    }

    #[test]
    fn test_all_pairs_empty_graph() {
        let g: Graph<String> = Graph::new();
        let ap = all_pairs_shortest_paths(&g);
        assert!(ap.is_empty());
        assert!(ap.distance_table().is_empty());
        assert!(ap.next_hop_table().is_empty());
        assert_eq!(ap.pairs().count(), 0);
    }

    #[test]
    fn test_all_pairs_diagonal_and_self_path() {
        let g = graph_from(&[("A", "A", 3.0), ("A", "B", 1.0)]);
        let ap = all_pairs_shortest_paths(&g);
        assert_eq!(ap.distance("A", "A"), Some(0.0));
        assert_eq!(ap.next_hop("A", "A"), None);
        assert_eq!(ap.path("A", "A").unwrap(), vec!["A"]);
        assert!(!ap.has_negative_cycle());
    }

    #[test]
    fn test_all_pairs_unreachable_and_unknown() {
        let g = graph_from(&[("A", "B", 5.0), ("C", "D", 3.0)]);
        let ap = all_pairs_shortest_paths(&g);
        assert_eq!(ap.distance("A", "D"), None);
        assert_eq!(ap.path("A", "D"), None);
        assert_eq!(ap.next_hop("A", "D"), None);
        assert_eq!(ap.distance("A", "missing"), None);
        assert_eq!(ap.path("missing", "A"), None);
    }

    #[test]
    fn test_all_pairs_next_hop_is_first_hop() {
        // Improvement through k must keep i's first hop, not k's
        let g = graph_from(&[("A", "B", 1.0), ("B", "C", 1.0), ("C", "D", 1.0), ("A", "D", 10.0)]);
        let ap = all_pairs_shortest_paths(&g);
        assert_eq!(ap.next_hop("A", "D").map(String::as_str), Some("B"));
        assert_eq!(ap.path("A", "D").unwrap(), vec!["A", "B", "C", "D"]);
        assert_eq!(ap.distance("A", "D"), Some(3.0));
    }

    #[test]
    fn test_all_pairs_negative_edges() {
        let g = graph_from(&[("A", "B", 4.0), ("A", "C", 2.0), ("B", "C", -3.0), ("C", "D", 1.0)]);
        let ap = all_pairs_shortest_paths(&g);
        assert_eq!(ap.distance("A", "D"), Some(2.0));
        assert_eq!(ap.path("A", "D").unwrap(), vec!["A", "B", "C", "D"]);
        assert!(!ap.has_negative_cycle());
    }

    #[test]
    fn test_all_pairs_reports_negative_cycle() {
        let g = graph_from(&[("A", "B", 1.0), ("B", "A", -3.0)]);
        let ap = all_pairs_shortest_paths(&g);
        assert!(ap.has_negative_cycle());
    }

    #[test]
    fn test_all_pairs_reports_negative_self_loop() {
        let g = graph_from(&[("A", "A", -1.0), ("A", "B", 1.0)]);
        let ap = all_pairs_shortest_paths(&g);
        assert!(ap.has_negative_cycle());
        let relaxed = shortest_path_relaxation(&g, "A", "B").unwrap();
        assert!(relaxed.has_negative_cycle());

        // A non-negative self-loop is not a cycle worth reporting
        let g = graph_from(&[("A", "A", 0.0), ("A", "B", 1.0)]);
        assert!(!all_pairs_shortest_paths(&g).has_negative_cycle());
    }

    #[test]
    fn test_all_pairs_infinite_weight_is_no_edge() {
        let g = graph_from(&[("A", "B", f64::INFINITY), ("B", "C", 1.0)]);
        let ap = all_pairs_shortest_paths(&g);
        assert_eq!(ap.distance("A", "B"), None);
        assert_eq!(ap.next_hop("A", "B"), None);
        assert_eq!(ap.path("A", "B"), None);
        assert_eq!(ap.path("A", "C"), None);
        assert!(ap.pairs().all(|(from, _, _)| from != "A"));

        // Same answer from the single-source searches
        assert!(!shortest_path_priority(&g, "A", "B").unwrap().is_found());
        assert_eq!(shortest_path_relaxation(&g, "A", "B").unwrap().distance(), None);
    }

    #[test]
    fn test_all_pairs_pairs_iterator() {
        let g = city();
        let ap = all_pairs_shortest_paths(&g);
        let pairs: Vec<(&str, &str, f64)> = ap
            .pairs()
            .map(|(a, b, d)| (a.as_str(), b.as_str(), d))
            .collect();
        // A reaches B, C, D; B reaches D; C reaches B, D
        assert_eq!(pairs.len(), 6);
        assert_eq!(pairs[0], ("A", "B", 4.0));
        assert!(pairs.iter().all(|(a, b, _)| a != b));
    }

    #[test]
    fn test_reconstruct_from_next_hops() {
        let g = city();
        let ap = all_pairs_shortest_paths(&g);
        let a = "A".to_string();
        let d = "D".to_string();
        assert_eq!(
            reconstruct_path(&ap, &a, &d).unwrap(),
            vec!["A", "C", "B", "D"]
        );
        assert_eq!(reconstruct_path(&ap, &d, &a), None);
    }

    #[test]
    fn test_concurrent_read_only_queries() {
        let g = city();
        let ap = all_pairs_shortest_paths(&g);
        let targets = ["B", "C", "D"];

        let results: Vec<Option<f64>> = std::thread::scope(|s| {
            let handles: Vec<_> = targets
                .iter()
                .map(|t| {
                    let (g, ap) = (&g, &ap);
                    s.spawn(move || {
                        let single = shortest_path_priority(g, "A", *t).unwrap();
                        assert_eq!(single.distance(), ap.distance("A", *t));
                        single.distance()
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        assert_eq!(results, vec![Some(4.0), Some(3.0), Some(6.0)]);
    }

    #[test]
    fn test_all_pairs_agrees_with_priority() {
        for seed in 1..=10u64 {
            let mut rng = FastRng(seed * 7919);
            let mut g: Graph<u64> = Graph::new();
            for i in 0..25u64 {
                g.add_node(i, Default::default());
            }
            for _ in 0..90 {
                let from = rng.next(25);
                let to = rng.next(25);
                g.add_edge(from, to, rng.next(50) as f64 + 0.5);
            }

            let ap = all_pairs_shortest_paths(&g);
            for s in 0..25u64 {
                for t in 0..25u64 {
                    let single = shortest_path_priority(&g, &s, &t).unwrap();
                    let all = ap.distance(&s, &t);
                    match (single.distance(), all) {
                        (Some(a), Some(b)) => assert!((a - b).abs() < 1e-9),
                        (None, None) => {}
                        other => panic!("seed {seed} {s}->{t}: {other:?}"),
                    }

                    // Next-hop path must walk real edges summing to the distance
                    if let Some(path) = ap.path(&s, &t) {
                        assert_eq!(path.first(), Some(&s));
                        assert_eq!(path.last(), Some(&t));
                        let total: f64 = path
                            .windows(2)
                            .map(|w| g.edge_weight(&w[0], &w[1]).unwrap())
                            .sum();
                        assert!((total - all.unwrap()).abs() < 1e-9);
                    }
                }
            }
        }
    }
}

use std::borrow::{Borrow, Cow};
use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;

use crate::error::{Endpoint, GraphError, Result};

/// Dense node index, assigned in insertion order.
pub type NodeIndex = usize;

/// 2D coordinates of a node. Display only, never read by the algorithms.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

/// Optional display attributes of a node.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(default)
)]
pub struct NodeAttrs {
    pub name: Option<String>,
    pub position: Option<Position>,
}

impl NodeAttrs {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            position: None,
        }
    }

    pub fn at(mut self, x: f64, y: f64) -> Self {
        self.position = Some(Position { x, y });
        self
    }
}

/// A node record owned by the graph.
#[derive(Debug, Clone)]
pub struct Node<K> {
    key: K,
    attrs: NodeAttrs,
}

impl<K> Node<K> {
    pub fn key(&self) -> &K {
        &self.key
    }

    pub fn attrs(&self) -> &NodeAttrs {
        &self.attrs
    }

    pub fn name(&self) -> Option<&str> {
        self.attrs.name.as_deref()
    }

    pub fn position(&self) -> Option<Position> {
        self.attrs.position
    }
}

impl<K: fmt::Display> Node<K> {
    /// The node's name, or its key when no name was given.
    pub fn display_name(&self) -> Cow<'_, str> {
        match &self.attrs.name {
            Some(name) => Cow::Borrowed(name.as_str()),
            None => Cow::Owned(self.key.to_string()),
        }
    }
}

/// A directed, weighted edge in the adjacency list.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Edge {
    pub target: NodeIndex,
    pub weight: f64,
}

/// Summary counts of a graph.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GraphStats {
    pub node_count: usize,
    pub edge_count: usize,
    pub average_out_degree: f64,
}

/// Outcome of a bulk edge load.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadSummary {
    pub inserted: usize,
    /// Edges ignored because the ordered pair already had an edge.
    pub duplicates: usize,
}

/// In-memory directed graph: node arena + per-node outgoing adjacency lists.
///
/// Nodes get a dense [`NodeIndex`] on first reference, so the algorithms
/// work on plain vectors and only translate keys at the boundary. Nodes
/// and edges are never removed.
///
/// At most one edge exists per ordered pair. Re-inserting a pair keeps the
/// first weight and is otherwise ignored.
#[derive(Debug, Clone)]
pub struct Graph<K> {
    nodes: Vec<Node<K>>,
    index: HashMap<K, NodeIndex>,
    outgoing: Vec<Vec<Edge>>,
    edge_count: usize,
}

impl<K: Eq + Hash + Clone> Graph<K> {
    pub fn new() -> Self {
        Self {
            nodes: Vec::new(),
            index: HashMap::new(),
            outgoing: Vec::new(),
            edge_count: 0,
        }
    }

    /// Pre-allocate for a known node count.
    pub fn with_capacity(node_count: usize) -> Self {
        Self {
            nodes: Vec::with_capacity(node_count),
            index: HashMap::with_capacity(node_count),
            outgoing: Vec::with_capacity(node_count),
            edge_count: 0,
        }
    }

    fn ensure_node(&mut self, key: K, attrs: NodeAttrs) -> NodeIndex {
        if let Some(&idx) = self.index.get(&key) {
            return idx;
        }
        let idx = self.nodes.len();
        self.index.insert(key.clone(), idx);
        self.nodes.push(Node { key, attrs });
        self.outgoing.push(Vec::new());
        idx
    }

    /// Register a node. Idempotent: an existing node keeps its attributes
    /// and is returned as is.
    pub fn add_node(&mut self, key: K, attrs: NodeAttrs) -> &Node<K> {
        let idx = self.ensure_node(key, attrs);
        &self.nodes[idx]
    }

    /// Add a directed edge, creating missing endpoints.
    ///
    /// Returns false (and changes nothing) if `source` already has an edge
    /// to `target`.
    pub fn add_edge(&mut self, source: K, target: K, weight: f64) -> bool {
        let from = self.ensure_node(source, NodeAttrs::default());
        let to = self.ensure_node(target, NodeAttrs::default());

        let edges = &mut self.outgoing[from];
        if edges.iter().any(|e| e.target == to) {
            return false;
        }
        edges.push(Edge { target: to, weight });
        self.edge_count += 1;
        true
    }

    /// Bulk load from an iterator of (source, target, weight) triples.
    /// This is the primary load path for collaborators.
    pub fn load_edges<I>(&mut self, edges: I) -> LoadSummary
    where
        I: IntoIterator<Item = (K, K, f64)>,
    {
        let mut summary = LoadSummary::default();
        for (source, target, weight) in edges {
            if self.add_edge(source, target, weight) {
                summary.inserted += 1;
            } else {
                summary.duplicates += 1;
            }
        }
        summary
    }

    pub fn index_of<Q>(&self, key: &Q) -> Option<NodeIndex>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.index.get(key).copied()
    }

    /// Key of the node at `index`.
    ///
    /// # Panics
    /// If `index` was not handed out by this graph.
    pub fn key_of(&self, index: NodeIndex) -> &K {
        &self.nodes[index].key
    }

    pub fn node<Q>(&self, key: &Q) -> Option<&Node<K>>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.index_of(key).map(|idx| &self.nodes[idx])
    }

    pub fn node_at(&self, index: NodeIndex) -> Option<&Node<K>> {
        self.nodes.get(index)
    }

    pub fn node_exists<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.index.contains_key(key)
    }

    /// Outgoing edges of the node at `index`, in insertion order.
    pub fn out_edges(&self, index: NodeIndex) -> &[Edge] {
        self.outgoing.get(index).map(|v| v.as_slice()).unwrap_or(&[])
    }

    /// Outgoing (neighbor, weight) pairs in insertion order. Empty for an
    /// unknown node.
    pub fn neighbors<'a, Q>(&'a self, key: &Q) -> impl Iterator<Item = (&'a K, f64)> + 'a
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let edges = match self.index_of(key) {
            Some(idx) => self.out_edges(idx),
            None => &[],
        };
        self.keyed(edges)
    }

    fn keyed<'a>(&'a self, edges: &'a [Edge]) -> impl Iterator<Item = (&'a K, f64)> + 'a {
        edges.iter().map(move |e| (&self.nodes[e.target].key, e.weight))
    }

    /// All node keys in insertion order.
    pub fn all_node_keys(&self) -> impl Iterator<Item = &K> + '_ {
        self.nodes.iter().map(|n| &n.key)
    }

    pub fn nodes(&self) -> impl Iterator<Item = &Node<K>> + '_ {
        self.nodes.iter()
    }

    /// Weight of the edge `source -> target`, if there is one.
    pub fn edge_weight<Q>(&self, source: &Q, target: &Q) -> Option<f64>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let from = self.index_of(source)?;
        let to = self.index_of(target)?;
        self.out_edges(from)
            .iter()
            .find(|e| e.target == to)
            .map(|e| e.weight)
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edge_count
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn stats(&self) -> GraphStats {
        let average_out_degree = if self.nodes.is_empty() {
            0.0
        } else {
            self.edge_count as f64 / self.nodes.len() as f64
        };
        GraphStats {
            node_count: self.nodes.len(),
            edge_count: self.edge_count,
            average_out_degree,
        }
    }

    /// Approximate memory usage in bytes.
    pub fn memory_usage(&self) -> usize {
        use std::mem::size_of;

        let nodes_mem = self.nodes.len() * (size_of::<Node<K>>() + size_of::<Vec<Edge>>());
        let names: usize = self
            .nodes
            .iter()
            .filter_map(|n| n.attrs.name.as_ref())
            .map(|s| s.capacity())
            .sum();
        let index_mem = self.index.len() * (size_of::<K>() + size_of::<NodeIndex>() + 16);
        let edges_mem: usize = self
            .outgoing
            .iter()
            .map(|v| v.capacity() * size_of::<Edge>())
            .sum();

        nodes_mem + names + index_mem + edges_mem
    }

    /// Resolve a query endpoint, failing with `UnknownNode` if it is missing.
    pub(crate) fn require<Q>(&self, key: &Q, role: Endpoint) -> Result<NodeIndex>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + fmt::Debug + ?Sized,
    {
        self.index_of(key)
            .ok_or_else(|| GraphError::unknown(role, key))
    }

    /// Node keys in index order, for results that outlive the borrow.
    pub(crate) fn key_snapshot(&self) -> Vec<K> {
        self.nodes.iter().map(|n| n.key.clone()).collect()
    }

    pub(crate) fn index_snapshot(&self) -> HashMap<K, NodeIndex> {
        self.index.clone()
    }
}

impl<K: Eq + Hash + Clone + fmt::Display> Graph<K> {
    /// Case-insensitive substring search over node keys and names.
    ///
    /// Returns matches in insertion order, at most `limit` of them
    /// (0 = no limit).
    pub fn search_nodes(&self, query: &str, limit: usize) -> Vec<&K> {
        let needle = query.to_lowercase();
        let mut results = Vec::new();

        for node in &self.nodes {
            if limit > 0 && results.len() >= limit {
                break;
            }
            let key_match = node.key.to_string().to_lowercase().contains(&needle);
            let name_match = node
                .attrs
                .name
                .as_ref()
                .is_some_and(|n| n.to_lowercase().contains(&needle));
            if key_match || name_match {
                results.push(&node.key);
            }
        }

        results
    }
}

impl<K: Eq + Hash + Clone> Default for Graph<K> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Graph<String> {
        let mut g = Graph::new();
        g.load_edges(
            [("A", "B", 5.0), ("A", "C", 3.0), ("B", "D", 2.0), ("C", "D", 6.0), ("C", "B", 1.0)]
                .into_iter()
                .map(|(s, t, w)| (s.to_string(), t.to_string(), w)),
        );
        g
    }

    #[test]
    fn test_add_edge_creates_endpoints() {
        let mut g: Graph<String> = Graph::new();
        assert!(g.add_edge("A".into(), "B".into(), 1.5));
        assert!(g.node_exists("A"));
        assert!(g.node_exists("B"));
        assert!(!g.node_exists("C"));
        assert_eq!(g.node_count(), 2);
        assert_eq!(g.edge_count(), 1);
    }

    #[test]
    fn test_duplicate_edge_keeps_first_weight() {
        let mut g: Graph<String> = Graph::new();
        assert!(g.add_edge("A".into(), "B".into(), 4.0));
        assert!(!g.add_edge("A".into(), "B".into(), 1.0));
        assert!(!g.add_edge("A".into(), "B".into(), 4.0));
        assert_eq!(g.edge_count(), 1);
        assert_eq!(g.edge_weight("A", "B"), Some(4.0));
        // Reverse direction is a different pair
        assert!(g.add_edge("B".into(), "A".into(), 9.0));
        assert_eq!(g.edge_count(), 2);
    }

    #[test]
    fn test_load_edges_counts_duplicates() {
        let mut g: Graph<&str> = Graph::new();
        let summary = g.load_edges(vec![("A", "B", 1.0), ("A", "B", 2.0), ("B", "C", 3.0)]);
        assert_eq!(summary, LoadSummary { inserted: 2, duplicates: 1 });
        assert_eq!(g.edge_count(), 2);
    }

    #[test]
    fn test_add_node_idempotent() {
        let mut g: Graph<String> = Graph::new();
        g.add_node("A".into(), NodeAttrs::named("Alpha").at(1.0, 2.0));
        let again = g.add_node("A".into(), NodeAttrs::named("Other"));
        assert_eq!(again.name(), Some("Alpha"));
        assert_eq!(again.position(), Some(Position { x: 1.0, y: 2.0 }));
        assert_eq!(g.node_count(), 1);
    }

    #[test]
    fn test_edge_does_not_overwrite_attrs() {
        let mut g: Graph<String> = Graph::new();
        g.add_node("A".into(), NodeAttrs::named("Alpha"));
        g.add_edge("A".into(), "B".into(), 1.0);
        assert_eq!(g.node("A").unwrap().name(), Some("Alpha"));
        assert_eq!(g.node("B").unwrap().name(), None);
        assert_eq!(g.node("B").unwrap().display_name(), "B");
    }

    #[test]
    fn test_neighbors_in_insertion_order() {
        let g = sample();
        let n: Vec<(&String, f64)> = g.neighbors("A").collect();
        assert_eq!(n, vec![(&"B".to_string(), 5.0), (&"C".to_string(), 3.0)]);
        let n: Vec<_> = g.neighbors("C").map(|(k, w)| (k.as_str(), w)).collect();
        assert_eq!(n, vec![("D", 6.0), ("B", 1.0)]);
    }

    #[test]
    fn test_neighbors_empty_cases() {
        let g = sample();
        assert_eq!(g.neighbors("D").count(), 0);
        assert_eq!(g.neighbors("missing").count(), 0);
    }

    #[test]
    fn test_all_node_keys_insertion_order() {
        let g = sample();
        let keys: Vec<&str> = g.all_node_keys().map(|k| k.as_str()).collect();
        assert_eq!(keys, vec!["A", "B", "C", "D"]);
    }

    #[test]
    fn test_edge_weight_absent() {
        let g = sample();
        assert_eq!(g.edge_weight("C", "B"), Some(1.0));
        assert_eq!(g.edge_weight("B", "C"), None);
        assert_eq!(g.edge_weight("A", "missing"), None);
    }

    #[test]
    fn test_stats() {
        let g = sample();
        let stats = g.stats();
        assert_eq!(stats.node_count, 4);
        assert_eq!(stats.edge_count, 5);
        assert!((stats.average_out_degree - 1.25).abs() < 1e-12);
    }

    #[test]
    fn test_stats_empty() {
        let g: Graph<u64> = Graph::new();
        let stats = g.stats();
        assert_eq!(stats.node_count, 0);
        assert_eq!(stats.edge_count, 0);
        assert_eq!(stats.average_out_degree, 0.0);
    }

    #[test]
    fn test_negative_weight_and_self_loop_allowed() {
        let mut g: Graph<u64> = Graph::new();
        assert!(g.add_edge(1, 1, -2.0));
        assert!(g.add_edge(1, 2, -0.5));
        assert_eq!(g.edge_weight(&1u64, &1u64), Some(-2.0));
        assert_eq!(g.edge_count(), 2);
    }

    #[test]
    fn test_index_round_trip() {
        let g = sample();
        for key in g.all_node_keys() {
            let idx = g.index_of(key.as_str()).unwrap();
            assert_eq!(g.key_of(idx), key);
        }
        assert!(g.node_at(99).is_none());
        assert!(g.out_edges(99).is_empty());
    }

    #[test]
    fn test_search_nodes() {
        let mut g: Graph<String> = Graph::new();
        g.add_node("N1".into(), NodeAttrs::named("Plaza Mayor"));
        g.add_node("N2".into(), NodeAttrs::named("Central Station"));
        g.add_node("plaza_2".into(), NodeAttrs::default());
        g.add_edge("N2".into(), "N3".into(), 1.0);

        let hits: Vec<&str> = g.search_nodes("PLAZA", 0).iter().map(|k| k.as_str()).collect();
        assert_eq!(hits, vec!["N1", "plaza_2"]);

        let limited = g.search_nodes("n", 2);
        assert_eq!(limited.len(), 2);

        assert!(g.search_nodes("airport", 10).is_empty());
    }

    #[test]
    fn test_memory_usage_nonzero() {
        let g = sample();
        assert!(g.memory_usage() > 0);
    }
}

//! graph-route-core: weighted directed graph and shortest path engine.
//!
//! A pure Rust library that maintains an adjacency list with `f64` edge
//! weights and answers shortest path queries three ways:
//!
//! - [`shortest_path_priority`]: Dijkstra with a binary heap, non-negative
//!   weights, O((V + E) log V).
//! - [`shortest_path_relaxation`]: Bellman-Ford, tolerates negative weights
//!   and reports reachable negative cycles, O(V * E).
//! - [`all_pairs_shortest_paths`]: Floyd-Warshall, O(V³) precompute for
//!   cheap repeated queries on a static graph.
//!
//! No I/O: collaborators feed `(source, target, weight)` triples in
//! through [`Graph::add_edge`] or [`Graph::load_edges`].

mod bellman_ford;
mod dijkstra;
mod error;
mod floyd_warshall;
mod graph;
mod path;

pub use bellman_ford::{shortest_path_relaxation, RelaxationResult};
pub use dijkstra::{shortest_path_priority, shortest_path_priority_all, ShortestPathTree};
pub use error::{Endpoint, GraphError, Result};
pub use floyd_warshall::{all_pairs_shortest_paths, AllPairs};
pub use graph::{Edge, Graph, GraphStats, LoadSummary, Node, NodeAttrs, NodeIndex, Position};
pub use path::{reconstruct_path, HopTable, Path, PathResult};

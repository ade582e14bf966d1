use pgrx::prelude::*;

/// Shortest path algorithm selectable from SQL.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Algorithm {
    Dijkstra,
    BellmanFord,
    FloydWarshall,
}

/// Parse an algorithm name.
///
/// Accepts: "dijkstra", "bellman_ford", "floyd_warshall" (case-insensitive,
/// '-' accepted for '_'). Raises a PostgreSQL ERROR for unrecognized values.
pub fn parse_algorithm(s: &str) -> Algorithm {
    match s.to_lowercase().replace('-', "_").as_str() {
        "dijkstra" => Algorithm::Dijkstra,
        "bellman_ford" => Algorithm::BellmanFord,
        "floyd_warshall" => Algorithm::FloydWarshall,
        other => {
            error!(
                "graph_route: invalid algorithm '{}', use 'dijkstra', 'bellman_ford' or 'floyd_warshall'",
                other
            );
        }
    }
}

/// Validate that a limit parameter is non-negative.
/// Raises a PostgreSQL ERROR if negative.
pub fn check_non_negative(value: i32, param_name: &str) -> usize {
    if value < 0 {
        error!(
            "graph_route: {} must be non-negative, got {}",
            param_name, value
        );
    }
    value as usize
}

use std::fmt;

use thiserror::Error;

/// Which end of a query referenced a missing node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    Source,
    Target,
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Endpoint::Source => f.write_str("source"),
            Endpoint::Target => f.write_str("target"),
        }
    }
}

/// Errors raised by the single-source shortest path searches.
///
/// Unreachable targets and negative cycles are not errors; they are
/// variants of the result types.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GraphError {
    /// A source or target key does not exist in the graph.
    #[error("{role} node {node} does not exist in the graph")]
    UnknownNode { role: Endpoint, node: String },
}

impl GraphError {
    pub(crate) fn unknown<K: fmt::Debug + ?Sized>(role: Endpoint, key: &K) -> Self {
        GraphError::UnknownNode {
            role,
            node: format!("{:?}", key),
        }
    }
}

/// Result type alias for graph queries.
pub type Result<T> = std::result::Result<T, GraphError>;

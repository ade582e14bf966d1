use std::cell::RefCell;
use std::time::Instant;

use graph_route_core::{AllPairs, Graph};

/// Metadata about the loaded graph state.
pub struct GraphState {
    pub graph: Graph<String>,
    pub source_table: String,
    /// Node attribute table read at load time, if any.
    pub node_table: Option<String>,
    pub load_time_ms: f64,
    pub loaded_at: Instant,
    /// Generation counter at time of load. 0 = loaded before any invalidation.
    pub loaded_generation: i64,
    /// Floyd-Warshall tables, computed on first use and dropped on reload.
    pub all_pairs: Option<AllPairs<String>>,
}

thread_local! {
    /// Per-backend graph state.
    ///
    /// PostgreSQL backends are single-threaded, so thread_local! + RefCell
    /// is safe. Each connection loads its own graph copy.
    static GRAPH_STATE: RefCell<Option<GraphState>> = const { RefCell::new(None) };
}

/// Execute a closure with a read reference to the loaded graph.
/// Returns None if no graph is loaded.
pub fn with_graph<R, F: FnOnce(&GraphState) -> R>(f: F) -> Option<R> {
    GRAPH_STATE.with(|cell| {
        let borrow = cell.borrow();
        borrow.as_ref().map(f)
    })
}

/// Execute a closure with a mutable reference to the loaded graph state.
pub fn with_graph_mut<R, F: FnOnce(&mut GraphState) -> R>(f: F) -> Option<R> {
    GRAPH_STATE.with(|cell| {
        let mut borrow = cell.borrow_mut();
        borrow.as_mut().map(f)
    })
}

/// Replace the per-backend graph state.
pub fn set_graph(state: GraphState) {
    GRAPH_STATE.with(|cell| {
        *cell.borrow_mut() = Some(state);
    });
}

/// Raise the standard error for query functions called before a load.
pub fn not_loaded() -> ! {
    pgrx::error!("graph_route: no graph loaded, call graph_route_load() first");
}

/// Ensure a node id exists, raising a PostgreSQL ERROR otherwise.
pub fn resolve_node(graph: &Graph<String>, id: &str) {
    if !graph.node_exists(id) {
        pgrx::error!("graph_route: node '{}' not found", id);
    }
}

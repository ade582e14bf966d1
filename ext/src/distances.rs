use graph_route_core::shortest_path_priority_all;
use pgrx::prelude::*;

use crate::state;

/// Distances from one node to every node it can reach (priority-based),
/// with the predecessor on each shortest path.
#[pg_extern]
fn graph_route_distances(
    from_id: String,
) -> TableIterator<
    'static,
    (
        name!(node_id, String),
        name!(distance, f64),
        name!(predecessor, Option<String>),
    ),
> {
    crate::generation::ensure_fresh();

    let rows = state::with_graph(|gs| {
        state::resolve_node(&gs.graph, &from_id);
        let tree = shortest_path_priority_all(&gs.graph, &from_id)
            .unwrap_or_else(|e| error!("graph_route: {}", e));
        tree.reachable()
            .map(|(node, d)| (node.clone(), d, tree.predecessor_of(node).cloned()))
            .collect::<Vec<_>>()
    })
    .unwrap_or_else(|| state::not_loaded());

    TableIterator::new(rows)
}

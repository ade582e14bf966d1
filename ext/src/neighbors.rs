use pgrx::prelude::*;

use crate::state;

#[pg_extern]
fn graph_route_neighbors(
    node_id: String,
) -> TableIterator<'static, (name!(node_id, String), name!(weight, f64))> {
    crate::generation::ensure_fresh();

    let rows = state::with_graph(|gs| {
        state::resolve_node(&gs.graph, &node_id);
        gs.graph
            .neighbors(&node_id)
            .map(|(target, w)| (target.clone(), w))
            .collect::<Vec<_>>()
    })
    .unwrap_or_else(|| state::not_loaded());

    TableIterator::new(rows)
}

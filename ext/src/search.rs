use pgrx::prelude::*;

use crate::state;
use crate::util::check_non_negative;

/// Case-insensitive substring search over node ids and names.
/// `max_results = 0` returns every match.
#[pg_extern]
fn graph_route_search(
    query: String,
    max_results: default!(i32, 50),
) -> TableIterator<'static, (name!(node_id, String), name!(name, String))> {
    crate::generation::ensure_fresh();
    let limit = check_non_negative(max_results, "max_results");

    let rows = state::with_graph(|gs| {
        gs.graph
            .search_nodes(&query, limit)
            .into_iter()
            .map(|id| {
                let name = gs
                    .graph
                    .node(id)
                    .map(|n| n.display_name().into_owned())
                    .unwrap_or_else(|| id.clone());
                (id.clone(), name)
            })
            .collect::<Vec<_>>()
    })
    .unwrap_or_else(|| state::not_loaded());

    TableIterator::new(rows)
}

use graph_route_core::all_pairs_shortest_paths;
use pgrx::prelude::*;

use crate::guc;
use crate::state::{self, GraphState};

/// Compute the all-pairs tables for the loaded graph if they are not
/// cached yet. Errors above `graph_route.max_all_pairs_nodes`.
pub fn ensure_all_pairs() {
    state::with_graph_mut(fill_cache).unwrap_or_else(|| state::not_loaded());
}

fn fill_cache(gs: &mut GraphState) {
    if gs.all_pairs.is_some() {
        return;
    }

    let n = gs.graph.node_count();
    let limit = guc::MAX_ALL_PAIRS_NODES.get().max(0) as usize;
    if n > limit {
        error!(
            "graph_route: all-pairs needs {} nodes <= graph_route.max_all_pairs_nodes={}",
            n, limit
        );
    }

    let tables = all_pairs_shortest_paths(&gs.graph);
    if tables.has_negative_cycle() {
        warning!("graph_route: graph has a negative cycle, all-pairs distances are not meaningful");
    }
    gs.all_pairs = Some(tables);
}

#[pg_extern]
fn graph_route_all_pairs() -> TableIterator<
    'static,
    (
        name!(from_id, String),
        name!(to_id, String),
        name!(distance, f64),
        name!(next_hop, Option<String>),
    ),
> {
    crate::generation::ensure_fresh();
    ensure_all_pairs();

    let rows = state::with_graph(|gs| match &gs.all_pairs {
        Some(ap) => ap
            .pairs()
            .map(|(from, to, d)| {
                let hop = ap.next_hop(from, to).cloned();
                (from.clone(), to.clone(), d, hop)
            })
            .collect::<Vec<_>>(),
        None => Vec::new(),
    })
    .unwrap_or_else(|| state::not_loaded());

    TableIterator::new(rows)
}

use graph_route_core::{shortest_path_priority, shortest_path_relaxation, Graph, RelaxationResult};
use pgrx::prelude::*;

use crate::state;
use crate::util::Algorithm;

type PathRow = (i32, String, String, Option<f64>, f64);

#[pg_extern]
fn graph_route_path(
    from_id: String,
    to_id: String,
    algorithm: default!(String, "'dijkstra'"),
) -> TableIterator<
    'static,
    (
        name!(step, i32),
        name!(node_id, String),
        name!(name, String),
        name!(weight, Option<f64>),
        name!(cumulative, f64),
    ),
> {
    crate::generation::ensure_fresh();
    let algorithm = crate::util::parse_algorithm(&algorithm);

    if algorithm == Algorithm::FloydWarshall {
        crate::all_pairs::ensure_all_pairs();
    }

    let rows = state::with_graph(|gs| {
        state::resolve_node(&gs.graph, &from_id);
        state::resolve_node(&gs.graph, &to_id);

        let nodes = match algorithm {
            Algorithm::Dijkstra => shortest_path_priority(&gs.graph, &from_id, &to_id)
                .unwrap_or_else(|e| error!("graph_route: {}", e))
                .into_path()
                .map(|p| p.nodes),
            Algorithm::BellmanFord => {
                match shortest_path_relaxation(&gs.graph, &from_id, &to_id)
                    .unwrap_or_else(|e| error!("graph_route: {}", e))
                {
                    RelaxationResult::Found(p) => Some(p.nodes),
                    RelaxationResult::Unreachable => None,
                    RelaxationResult::NegativeCycle => {
                        warning!(
                            "graph_route: negative cycle reachable from '{}', no shortest path exists",
                            from_id
                        );
                        None
                    }
                }
            }
            Algorithm::FloydWarshall => match &gs.all_pairs {
                Some(ap) if ap.has_negative_cycle() => {
                    warning!("graph_route: graph has a negative cycle, no shortest path exists");
                    None
                }
                Some(ap) => ap.path(&from_id, &to_id),
                None => None,
            },
        };

        nodes.map(|n| path_rows(&gs.graph, &n)).unwrap_or_default()
    })
    .unwrap_or_else(|| state::not_loaded());

    TableIterator::new(rows)
}

/// One row per node; `weight` is the edge into the node, NULL at the start.
fn path_rows(graph: &Graph<String>, nodes: &[String]) -> Vec<PathRow> {
    let mut cumulative = 0.0;
    nodes
        .iter()
        .enumerate()
        .map(|(i, id)| {
            let weight = i
                .checked_sub(1)
                .and_then(|prev| graph.edge_weight(&nodes[prev], id));
            cumulative += weight.unwrap_or(0.0);
            let name = graph
                .node(id)
                .map(|n| n.display_name().into_owned())
                .unwrap_or_else(|| id.clone());
            (i as i32, id.clone(), name, weight, cumulative)
        })
        .collect()
}

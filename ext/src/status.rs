use graph_route_core::GraphStats;
use pgrx::prelude::*;

use crate::generation::{self, Sources};
use crate::guc;
use crate::state::{self, GraphState};

type StatusRow = (
    Option<String>,
    Option<String>,
    String,
    i64,
    i64,
    f64,
    i64,
    f64,
    bool,
    i64,
    i64,
    bool,
);

/// What status reports about a loaded graph, copied out of the state so
/// no borrow is held across SPI.
struct Loaded {
    edge_table: String,
    node_table: Option<String>,
    stats: GraphStats,
    memory_bytes: usize,
    load_time_ms: f64,
    all_pairs_cached: bool,
    generation: i64,
}

impl Loaded {
    fn capture(gs: &GraphState) -> Self {
        Loaded {
            edge_table: gs.source_table.clone(),
            node_table: gs.node_table.clone(),
            stats: gs.graph.stats(),
            memory_bytes: gs.graph.memory_usage(),
            load_time_ms: gs.load_time_ms,
            all_pairs_cached: gs.all_pairs.is_some(),
            generation: gs.loaded_generation,
        }
    }

    fn into_row(self) -> StatusRow {
        let current = generation::current_generation(&Sources {
            edge_table: &self.edge_table,
            node_table: self.node_table.as_deref(),
        })
        .unwrap_or(self.generation);
        let is_stale = current != self.generation;

        (
            Some(self.edge_table),
            self.node_table,
            if is_stale { "stale" } else { "loaded" }.to_string(),
            self.stats.node_count as i64,
            self.stats.edge_count as i64,
            self.stats.average_out_degree,
            self.memory_bytes as i64,
            self.load_time_ms,
            self.all_pairs_cached,
            self.generation,
            current,
            is_stale,
        )
    }
}

/// Nothing loaded: report the configured tables and their generation.
fn unloaded_row() -> StatusRow {
    let edge_table = guc::get_string(&guc::EDGE_TABLE);
    let node_table = guc::get_string(&guc::NODE_TABLE);
    let current = edge_table
        .as_deref()
        .and_then(|edge_table| {
            generation::current_generation(&Sources {
                edge_table,
                node_table: node_table.as_deref(),
            })
        })
        .unwrap_or(0);

    (
        edge_table,
        node_table,
        "not_loaded".to_string(),
        0,
        0,
        0.0,
        0,
        0.0,
        false,
        0,
        current,
        false,
    )
}

#[pg_extern]
fn graph_route_status() -> TableIterator<
    'static,
    (
        name!(source_table, Option<String>),
        name!(node_table, Option<String>),
        name!(status, String),
        name!(node_count, i64),
        name!(edge_count, i64),
        name!(avg_out_degree, f64),
        name!(memory_bytes, i64),
        name!(load_time_ms, f64),
        name!(all_pairs_cached, bool),
        name!(loaded_generation, i64),
        name!(current_generation, i64),
        name!(is_stale, bool),
    ),
> {
    let row = match state::with_graph(Loaded::capture) {
        Some(loaded) => loaded.into_row(),
        None => unloaded_row(),
    };
    TableIterator::once(row)
}

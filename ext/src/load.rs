use std::time::Instant;

use graph_route_core::{Graph, NodeAttrs};
use pgrx::prelude::*;

use crate::generation::{combined_generation, Sources};
use crate::guc;
use crate::state::{self, GraphState};

/// Counts reported by a completed load.
pub struct LoadOutcome {
    pub node_count: i64,
    pub edge_count: i64,
    pub duplicate_edges: i64,
    pub load_time_ms: f64,
}

#[pg_extern]
fn graph_route_load(
    edge_table: default!(Option<String>, "NULL"),
) -> TableIterator<
    'static,
    (
        name!(node_count, i64),
        name!(edge_count, i64),
        name!(duplicate_edges, i64),
        name!(load_time_ms, f64),
    ),
> {
    // Resolve table: explicit argument > GUC > error
    let table = edge_table
        .or_else(|| guc::get_string(&guc::EDGE_TABLE))
        .unwrap_or_else(|| {
            error!("graph_route: edge_table not set and no edge_table argument provided");
        });

    let node_table = guc::get_string(&guc::NODE_TABLE);
    let outcome = do_load(&table, node_table.as_deref());
    TableIterator::once((
        outcome.node_count,
        outcome.edge_count,
        outcome.duplicate_edges,
        outcome.load_time_ms,
    ))
}

/// Read the edge table (and the optional node table) into a fresh graph
/// and install it as this backend's state. Also used by auto-reload,
/// which passes the tables of the previous load.
pub fn do_load(edge_table: &str, node_table: Option<&str>) -> LoadOutcome {
    validate_name(edge_table);
    if let Some(node_table) = node_table {
        validate_name(node_table);
    }
    let start = Instant::now();

    let source_col = guc::column(&guc::SOURCE_COLUMN, "source");
    let target_col = guc::column(&guc::TARGET_COLUMN, "target");
    let weight_col = guc::column(&guc::WEIGHT_COLUMN, "weight");
    let sources = Sources {
        edge_table,
        node_table,
    };

    let (graph, duplicates, generation) = Spi::connect(|client| {
        // Read generation before the data so a concurrent invalidate is
        // seen as stale on the next query rather than lost.
        let generation = combined_generation(&client, &sources).unwrap_or(0);

        let mut graph = Graph::new();

        if let Some(node_table) = node_table {
            load_nodes(&client, node_table, &mut graph)?;
        }

        let duplicates = load_edges(
            &client,
            edge_table,
            &source_col,
            &target_col,
            &weight_col,
            &mut graph,
        )?;

        Ok::<_, pgrx::spi::SpiError>((graph, duplicates, generation))
    })
    .unwrap_or_else(|e| {
        error!("graph_route_load: SPI error: {}", e);
    });

    // Check memory limit
    let memory_mb = graph.memory_usage() / (1024 * 1024);
    let max_mb = guc::MAX_MEMORY_MB.get() as usize;
    if memory_mb > max_mb {
        error!(
            "graph_route: loaded graph uses {}MB, exceeds graph_route.max_memory_mb={}MB",
            memory_mb, max_mb
        );
    }

    if duplicates > 0 {
        notice!(
            "graph_route: ignored {} duplicate edge(s) in '{}', first occurrence kept",
            duplicates,
            edge_table
        );
    }

    let load_time_ms = start.elapsed().as_secs_f64() * 1000.0;
    let outcome = LoadOutcome {
        node_count: graph.node_count() as i64,
        edge_count: graph.edge_count() as i64,
        duplicate_edges: duplicates as i64,
        load_time_ms,
    };

    state::set_graph(GraphState {
        graph,
        source_table: edge_table.to_string(),
        node_table: node_table.map(str::to_string),
        load_time_ms,
        loaded_at: Instant::now(),
        loaded_generation: generation,
        all_pairs: None,
    });

    outcome
}

// ---------------------------------------------------------------------------
// Node attributes
// ---------------------------------------------------------------------------

fn load_nodes(
    client: &pgrx::spi::SpiClient<'_>,
    node_table: &str,
    graph: &mut Graph<String>,
) -> Result<(), pgrx::spi::SpiError> {
    let query = format!(
        "SELECT id::text AS id, properties::text AS properties FROM {}",
        node_table
    );

    let table = client.select(&query, None, &[])?;
    for row in table {
        let id: Option<String> = row.get_by_name("id")?;
        let props: Option<String> = row.get_by_name("properties")?;

        let Some(id) = id else { continue };
        let attrs = props
            .as_deref()
            .map(|json| decode_attrs(&id, json))
            .unwrap_or_default();

        graph.add_node(id, attrs);
    }

    Ok(())
}

/// Decode a node's properties JSON. Unknown keys are ignored; malformed
/// JSON loads the node without attributes.
fn decode_attrs(id: &str, json: &str) -> NodeAttrs {
    match serde_json::from_str::<NodeAttrs>(json) {
        Ok(attrs) => attrs,
        Err(e) => {
            warning!("graph_route: node '{}' has unreadable properties: {}", id, e);
            NodeAttrs::default()
        }
    }
}

// ---------------------------------------------------------------------------
// Edge loading
// ---------------------------------------------------------------------------

fn load_edges(
    client: &pgrx::spi::SpiClient<'_>,
    edge_table: &str,
    source_col: &str,
    target_col: &str,
    weight_col: &str,
    graph: &mut Graph<String>,
) -> Result<usize, pgrx::spi::SpiError> {
    let query = format!(
        "SELECT \"{}\"::text AS source, \"{}\"::text AS target, \"{}\"::float8 AS weight FROM {}",
        sanitize_ident(source_col),
        sanitize_ident(target_col),
        sanitize_ident(weight_col),
        edge_table
    );

    let mut duplicates = 0usize;
    let mut skipped = 0usize;

    let table = client.select(&query, None, &[])?;
    for row in table {
        let source: Option<String> = row.get_by_name("source")?;
        let target: Option<String> = row.get_by_name("target")?;
        let weight: Option<f64> = row.get_by_name("weight")?;

        let (Some(source), Some(target), Some(weight)) = (source, target, weight) else {
            skipped += 1;
            continue;
        };
        if !weight.is_finite() {
            skipped += 1;
            continue;
        }

        if !graph.add_edge(source, target, weight) {
            duplicates += 1;
        }
    }

    if skipped > 0 {
        warning!(
            "graph_route: skipped {} edge row(s) with NULL or non-finite values",
            skipped
        );
    }

    Ok(duplicates)
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Validate a table name: one or two dot-separated identifiers.
pub fn validate_name(name: &str) {
    let parts: Vec<&str> = name.split('.').collect();
    if parts.len() > 2 || !parts.iter().all(|p| is_ident(p)) {
        error!("graph_route: invalid table name: '{}'", name);
    }
}

/// Validate a column identifier contains only safe characters.
fn sanitize_ident(name: &str) -> &str {
    if !is_ident(name) {
        error!("graph_route: invalid identifier: '{}'", name);
    }
    name
}

fn is_ident(s: &str) -> bool {
    !s.is_empty() && s.chars().all(|c| c.is_alphanumeric() || c == '_')
}


//! Staleness tracking for the loaded route graph.
//!
//! A route graph is built from the edge table and, optionally, the node
//! attribute table. Each table has its own counter in
//! `graph_route.generation`, bumped by `graph_route_invalidate(table)`.
//! A loaded graph remembers the sum of its tables' counters at load time;
//! any change to that sum means one of its inputs was written since.

use pgrx::prelude::*;
use pgrx::spi::{quote_literal, SpiClient, SpiError};

use crate::guc;
use crate::state;

extension_sql!(
    r#"
CREATE SCHEMA IF NOT EXISTS graph_route;

CREATE TABLE graph_route.generation (
    table_name  text PRIMARY KEY,
    generation  bigint NOT NULL CHECK (generation > 0),
    updated_at  timestamptz NOT NULL DEFAULT now()
);

COMMENT ON TABLE graph_route.generation IS
    'Write counter per edge or node table. Call graph_route_invalidate(table) after changing one.';
"#,
    name = "bootstrap",
    bootstrap
);

/// The tables a route graph is read from.
#[derive(Debug, Clone, Copy)]
pub struct Sources<'a> {
    pub edge_table: &'a str,
    pub node_table: Option<&'a str>,
}

impl Sources<'_> {
    fn sql_list(&self) -> String {
        std::iter::once(self.edge_table)
            .chain(self.node_table)
            .map(quote_literal)
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Combined generation of `sources` inside an open SPI connection.
///
/// 0 when none of the tables was ever invalidated; None when the
/// generation table cannot be read (staleness is then not checked).
pub fn combined_generation(client: &SpiClient<'_>, sources: &Sources<'_>) -> Option<i64> {
    let query = format!(
        "SELECT coalesce(sum(generation), 0)::bigint FROM graph_route.generation \
         WHERE table_name IN ({})",
        sources.sql_list()
    );
    match client
        .select(&query, Some(1), &[])
        .and_then(|table| table.first().get_one::<i64>())
    {
        Ok(generation) => Some(generation.unwrap_or(0)),
        Err(e) => {
            warning!("graph_route: cannot read generation table ({}), staleness not checked", e);
            None
        }
    }
}

pub fn current_generation(sources: &Sources<'_>) -> Option<i64> {
    Spi::connect(|client| Ok::<_, SpiError>(combined_generation(&client, sources)))
        .unwrap_or(None)
}

/// Record a write to an edge or node table. Returns its new counter.
#[pg_extern]
fn graph_route_invalidate(table_name: String) -> i64 {
    crate::load::validate_name(&table_name);

    let bump = format!(
        "INSERT INTO graph_route.generation AS g (table_name, generation) VALUES ({}, 1) \
         ON CONFLICT (table_name) DO UPDATE SET generation = g.generation + 1, updated_at = now() \
         RETURNING generation",
        quote_literal(&table_name)
    );

    Spi::connect_mut(|client| client.update(&bump, None, &[])?.first().get_one::<i64>())
        .unwrap_or_else(|e| error!("graph_route_invalidate: {}", e))
        .unwrap_or(1)
}

/// What a query does with the graph it finds loaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Freshness {
    Current,
    /// Inputs changed but auto_reload is off: serve as is.
    Stale,
    /// Inputs changed; reload held back for this many more seconds.
    Debounced(u64),
    Reload,
}

pub fn assess(
    loaded_generation: i64,
    current_generation: i64,
    auto_reload: bool,
    debounce_secs: u64,
    age_secs: u64,
) -> Freshness {
    if loaded_generation == current_generation {
        Freshness::Current
    } else if !auto_reload {
        Freshness::Stale
    } else if age_secs < debounce_secs {
        Freshness::Debounced(debounce_secs - age_secs)
    } else {
        Freshness::Reload
    }
}

/// Reload the graph inline if its tables changed since load, subject to
/// `graph_route.auto_reload` and `graph_route.reload_debounce_sec`.
/// Called first by every query function; a reload also drops cached
/// all-pairs tables.
pub fn ensure_fresh() {
    let Some((edge_table, node_table, loaded, age)) = state::with_graph(|gs| {
        (
            gs.source_table.clone(),
            gs.node_table.clone(),
            gs.loaded_generation,
            gs.loaded_at.elapsed().as_secs(),
        )
    }) else {
        return;
    };

    let sources = Sources {
        edge_table: &edge_table,
        node_table: node_table.as_deref(),
    };
    let Some(current) = current_generation(&sources) else {
        return;
    };

    let debounce = guc::RELOAD_DEBOUNCE_SEC.get().max(0) as u64;
    match assess(loaded, current, guc::AUTO_RELOAD.get(), debounce, age) {
        Freshness::Current | Freshness::Stale => {}
        Freshness::Debounced(wait) => {
            notice!("graph_route: '{}' changed, reload held for {}s", edge_table, wait);
        }
        Freshness::Reload => {
            notice!(
                "graph_route: reloading '{}' (generation {} -> {})",
                edge_table,
                loaded,
                current
            );
            crate::load::do_load(&edge_table, node_table.as_deref());
        }
    }
}

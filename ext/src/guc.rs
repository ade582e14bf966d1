use std::ffi::CString;

use pgrx::guc::*;

pub static EDGE_TABLE: GucSetting<Option<CString>> = GucSetting::<Option<CString>>::new(None);

pub static SOURCE_COLUMN: GucSetting<Option<CString>> =
    GucSetting::<Option<CString>>::new(Some(c"source"));

pub static TARGET_COLUMN: GucSetting<Option<CString>> =
    GucSetting::<Option<CString>>::new(Some(c"target"));

pub static WEIGHT_COLUMN: GucSetting<Option<CString>> =
    GucSetting::<Option<CString>>::new(Some(c"weight"));

pub static NODE_TABLE: GucSetting<Option<CString>> = GucSetting::<Option<CString>>::new(None);

pub static MAX_MEMORY_MB: GucSetting<i32> = GucSetting::<i32>::new(4096);

pub static MAX_ALL_PAIRS_NODES: GucSetting<i32> = GucSetting::<i32>::new(2000);

pub static AUTO_RELOAD: GucSetting<bool> = GucSetting::<bool>::new(true);

pub static RELOAD_DEBOUNCE_SEC: GucSetting<i32> = GucSetting::<i32>::new(5);

/// Read a string GUC, returning None if unset or empty.
pub fn get_string(setting: &GucSetting<Option<CString>>) -> Option<String> {
    setting
        .get()
        .and_then(|cs| cs.into_string().ok())
        .filter(|s| !s.is_empty())
}

/// Column name GUC with a fallback for when it was explicitly cleared.
pub fn column(setting: &GucSetting<Option<CString>>, fallback: &str) -> String {
    get_string(setting).unwrap_or_else(|| fallback.to_string())
}

pub fn register_gucs() {
    GucRegistry::define_string_guc(
        c"graph_route.edge_table",
        c"Table holding the weighted edge list",
        c"Table (optionally schema-qualified) read by graph_route_load() when no argument is given.",
        &EDGE_TABLE,
        GucContext::Userset,
        GucFlags::default(),
    );

    GucRegistry::define_string_guc(
        c"graph_route.source_column",
        c"Edge table column holding the source node id",
        c"Cast to text on load.",
        &SOURCE_COLUMN,
        GucContext::Userset,
        GucFlags::default(),
    );

    GucRegistry::define_string_guc(
        c"graph_route.target_column",
        c"Edge table column holding the target node id",
        c"Cast to text on load.",
        &TARGET_COLUMN,
        GucContext::Userset,
        GucFlags::default(),
    );

    GucRegistry::define_string_guc(
        c"graph_route.weight_column",
        c"Edge table column holding the edge weight",
        c"Cast to float8 on load. Rows with a NULL weight are skipped.",
        &WEIGHT_COLUMN,
        GucContext::Userset,
        GucFlags::default(),
    );

    GucRegistry::define_string_guc(
        c"graph_route.node_table",
        c"Optional table of node display attributes",
        c"Table with columns id and properties (json: name, position {x, y}). Empty = ids only.",
        &NODE_TABLE,
        GucContext::Userset,
        GucFlags::default(),
    );

    GucRegistry::define_int_guc(
        c"graph_route.max_memory_mb",
        c"Maximum memory for in-memory graph (MB)",
        c"Per-backend memory cap. graph_route_load() will error if the graph exceeds this.",
        &MAX_MEMORY_MB,
        64,
        131072, // 128 GB
        GucContext::Userset,
        GucFlags::default(),
    );

    GucRegistry::define_int_guc(
        c"graph_route.max_all_pairs_nodes",
        c"Largest graph for which all-pairs tables are computed",
        c"Floyd-Warshall is O(V^3) time and O(V^2) memory per backend.",
        &MAX_ALL_PAIRS_NODES,
        1,
        100000,
        GucContext::Userset,
        GucFlags::default(),
    );

    GucRegistry::define_bool_guc(
        c"graph_route.auto_reload",
        c"Automatically reload when generation mismatch detected",
        c"When true, query functions check the generation table and reload inline if stale.",
        &AUTO_RELOAD,
        GucContext::Userset,
        GucFlags::default(),
    );

    GucRegistry::define_int_guc(
        c"graph_route.reload_debounce_sec",
        c"Minimum seconds between auto-reloads",
        c"Prevents reload thrashing during bulk writes. 0 disables debouncing.",
        &RELOAD_DEBOUNCE_SEC,
        0,
        3600, // 1 hour
        GucContext::Userset,
        GucFlags::default(),
    );
}

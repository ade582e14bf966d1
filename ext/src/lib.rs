//! graph_route: PostgreSQL extension for weighted shortest path queries.
//!
//! Wraps graph-route-core to load an edge table into per-backend memory
//! and answer point-to-point, single-source and all-pairs queries with
//! Dijkstra, Bellman-Ford or Floyd-Warshall. Generation-based cache
//! invalidation as edge tables change.

use pgrx::prelude::*;

mod all_pairs;
mod distances;
mod generation;
mod guc;
mod load;
mod neighbors;
mod path;
mod search;
mod state;
mod status;
mod util;

pg_module_magic!();

#[allow(non_snake_case)]
#[pg_guard]
pub extern "C-unwind" fn _PG_init() {
    guc::register_gucs();
}

#[cfg(any(test, feature = "pg_test"))]
#[pg_schema]
mod tests {
    use pgrx::prelude::*;

    fn create_city() {
        Spi::run("CREATE TABLE roads (source text, target text, weight float8)").unwrap();
        Spi::run(
            "INSERT INTO roads VALUES \
             ('A','B',4), ('A','C',2), ('B','C',5), ('B','D',10), \
             ('C','E',3), ('E','D',4), ('D','F',11), ('A','B',9)",
        )
        .unwrap();
    }

    fn create_places() {
        Spi::run("CREATE TABLE places (id text, properties jsonb)").unwrap();
        Spi::run(
            "INSERT INTO places VALUES \
             ('A', '{\"name\": \"Plaza Mayor\", \"position\": {\"x\": 1.0, \"y\": 2.0}}'), \
             ('G', '{\"name\": \"Harbour\"}')",
        )
        .unwrap();
        Spi::run("SET graph_route.node_table = 'places'").unwrap();
    }

    fn route(algorithm: &str) -> Option<String> {
        Spi::get_one::<String>(&format!(
            "SELECT string_agg(node_id, ',' ORDER BY step) \
             FROM graph_route_path('A', 'D', '{}')",
            algorithm
        ))
        .unwrap()
    }

    #[pg_test]
    fn test_status_returns_not_loaded() {
        let result = Spi::get_one::<String>("SELECT status FROM graph_route_status()");
        assert_eq!(result, Ok(Some("not_loaded".to_string())));
    }

    #[pg_test]
    fn test_guc_defaults() {
        let max_mem = Spi::get_one::<String>("SHOW graph_route.max_memory_mb");
        assert_eq!(max_mem, Ok(Some("4096".to_string())));

        let weight = Spi::get_one::<String>("SHOW graph_route.weight_column");
        assert_eq!(weight, Ok(Some("weight".to_string())));

        let limit = Spi::get_one::<String>("SHOW graph_route.max_all_pairs_nodes");
        assert_eq!(limit, Ok(Some("2000".to_string())));
    }

    #[pg_test]
    fn test_invalidate_returns_generation() {
        let gen = Spi::get_one::<i64>("SELECT graph_route_invalidate('roads')");
        assert_eq!(gen, Ok(Some(1)));

        let gen2 = Spi::get_one::<i64>("SELECT graph_route_invalidate('roads')");
        assert_eq!(gen2, Ok(Some(2)));

        let other = Spi::get_one::<i64>("SELECT graph_route_invalidate('public.rails')");
        assert_eq!(other, Ok(Some(1)));
    }

    #[pg_test]
    fn test_load_counts_duplicates() {
        create_city();
        let nodes = Spi::get_one::<i64>("SELECT node_count FROM graph_route_load('roads')");
        assert_eq!(nodes, Ok(Some(6)));

        let status = Spi::get_two::<String, i64>("SELECT status, edge_count FROM graph_route_status()");
        assert_eq!(status, Ok((Some("loaded".to_string()), Some(7))));
    }

    #[pg_test]
    fn test_load_and_path_all_algorithms() {
        create_city();
        Spi::run("SELECT * FROM graph_route_load('roads')").unwrap();

        for algorithm in ["dijkstra", "bellman_ford", "floyd_warshall"] {
            assert_eq!(route(algorithm), Some("A,C,E,D".to_string()), "{algorithm}");
        }

        let total = Spi::get_one::<f64>(
            "SELECT cumulative FROM graph_route_path('A', 'D') ORDER BY step DESC LIMIT 1",
        );
        assert_eq!(total, Ok(Some(9.0)));

        let cached = Spi::get_one::<bool>("SELECT all_pairs_cached FROM graph_route_status()");
        assert_eq!(cached, Ok(Some(true)));
    }

    #[pg_test]
    fn test_unreachable_returns_no_rows() {
        create_city();
        Spi::run("SELECT * FROM graph_route_load('roads')").unwrap();
        let rows = Spi::get_one::<i64>("SELECT count(*) FROM graph_route_path('F', 'A')");
        assert_eq!(rows, Ok(Some(0)));
    }

    #[pg_test]
    fn test_negative_cycle_returns_no_rows() {
        Spi::run("CREATE TABLE loops (source text, target text, weight float8)").unwrap();
        Spi::run("INSERT INTO loops VALUES ('A','B',1), ('B','A',-3)").unwrap();
        Spi::run("SELECT * FROM graph_route_load('loops')").unwrap();

        let rows = Spi::get_one::<i64>(
            "SELECT count(*) FROM graph_route_path('A', 'B', 'bellman_ford')",
        );
        assert_eq!(rows, Ok(Some(0)));
    }

    #[pg_test]
    fn test_distances_and_neighbors() {
        create_city();
        Spi::run("SELECT * FROM graph_route_load('roads')").unwrap();

        let reached = Spi::get_one::<i64>("SELECT count(*) FROM graph_route_distances('A')");
        assert_eq!(reached, Ok(Some(6)));

        let pred = Spi::get_one::<String>(
            "SELECT predecessor FROM graph_route_distances('A') WHERE node_id = 'D'",
        );
        assert_eq!(pred, Ok(Some("E".to_string())));

        let first_wins = Spi::get_one::<f64>(
            "SELECT weight FROM graph_route_neighbors('A') WHERE node_id = 'B'",
        );
        assert_eq!(first_wins, Ok(Some(4.0)));
    }

    #[pg_test(error = "graph_route: node 'Z' not found")]
    fn test_unknown_node_errors() {
        create_city();
        Spi::run("SELECT * FROM graph_route_load('roads')").unwrap();
        let _ = Spi::get_one::<i64>("SELECT count(*) FROM graph_route_path('A', 'Z')");
    }

    #[pg_test(error = "graph_route: invalid algorithm 'astar', use 'dijkstra', 'bellman_ford' or 'floyd_warshall'")]
    fn test_invalid_algorithm_errors() {
        create_city();
        Spi::run("SELECT * FROM graph_route_load('roads')").unwrap();
        let _ = Spi::get_one::<i64>("SELECT count(*) FROM graph_route_path('A', 'D', 'astar')");
    }

    #[pg_test]
    fn test_node_table_names() {
        create_city();
        create_places();

        let nodes = Spi::get_one::<i64>("SELECT node_count FROM graph_route_load('roads')");
        assert_eq!(nodes, Ok(Some(7)));

        let hit = Spi::get_one::<String>("SELECT node_id FROM graph_route_search('plaza')");
        assert_eq!(hit, Ok(Some("A".to_string())));

        let name = Spi::get_one::<String>(
            "SELECT name FROM graph_route_path('A', 'D') WHERE step = 0",
        );
        assert_eq!(name, Ok(Some("Plaza Mayor".to_string())));
    }

    #[pg_test]
    fn test_either_source_table_marks_stale() {
        create_city();
        create_places();
        Spi::run("SELECT * FROM graph_route_load('roads')").unwrap();

        // A table the graph was not built from changes nothing
        Spi::run("SELECT graph_route_invalidate('rails')").unwrap();
        let status = Spi::get_two::<String, String>("SELECT status, node_table FROM graph_route_status()");
        assert_eq!(status, Ok((Some("loaded".to_string()), Some("places".to_string()))));

        Spi::run("SELECT graph_route_invalidate('places')").unwrap();
        let status = Spi::get_two::<String, bool>("SELECT status, is_stale FROM graph_route_status()");
        assert_eq!(status, Ok((Some("stale".to_string()), Some(true))));

        Spi::run("SELECT * FROM graph_route_load('roads')").unwrap();
        Spi::run("SELECT graph_route_invalidate('roads')").unwrap();
        let stale = Spi::get_one::<bool>("SELECT is_stale FROM graph_route_status()");
        assert_eq!(stale, Ok(Some(true)));
    }

    #[pg_test]
    fn test_stale_graph_reloads_on_query() {
        create_city();
        Spi::run("SET graph_route.reload_debounce_sec = 0").unwrap();
        Spi::run("SELECT * FROM graph_route_load('roads')").unwrap();

        Spi::run("INSERT INTO roads VALUES ('A','D',1)").unwrap();
        Spi::run("SELECT graph_route_invalidate('roads')").unwrap();

        assert_eq!(route("dijkstra"), Some("A,D".to_string()));
        let stale = Spi::get_one::<bool>("SELECT is_stale FROM graph_route_status()");
        assert_eq!(stale, Ok(Some(false)));
    }

    #[pg_test]
    fn test_freshness_decision() {
        use crate::generation::{assess, Freshness};

        assert_eq!(assess(3, 3, true, 5, 0), Freshness::Current);
        assert_eq!(assess(3, 4, false, 5, 60), Freshness::Stale);
        assert_eq!(assess(3, 4, true, 5, 2), Freshness::Debounced(3));
        assert_eq!(assess(3, 4, true, 5, 5), Freshness::Reload);
        assert_eq!(assess(3, 4, true, 0, 0), Freshness::Reload);
        // Counter rows removed: the sum went down, still a change
        assert_eq!(assess(3, 0, true, 0, 0), Freshness::Reload);
    }

    #[pg_test]
    fn test_floyd_warshall_rejects_negative_self_loop() {
        Spi::run("CREATE TABLE loops (source text, target text, weight float8)").unwrap();
        Spi::run("INSERT INTO loops VALUES ('A','A',-1), ('A','B',1)").unwrap();
        Spi::run("SELECT * FROM graph_route_load('loops')").unwrap();

        for algorithm in ["bellman_ford", "floyd_warshall"] {
            let rows = Spi::get_one::<i64>(&format!(
                "SELECT count(*) FROM graph_route_path('A', 'B', '{}')",
                algorithm
            ));
            assert_eq!(rows, Ok(Some(0)), "{algorithm}");
        }
    }
}

#[cfg(test)]
pub mod pg_test {
    pub fn setup(_options: Vec<&str>) {}

    pub fn postgresql_conf_options() -> Vec<&'static str> {
        vec![]
    }
}

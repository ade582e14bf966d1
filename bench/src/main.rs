use std::time::Instant;

use clap::{Parser, ValueEnum};
use graph_route_core::{
    all_pairs_shortest_paths, shortest_path_priority, shortest_path_priority_all,
    shortest_path_relaxation, AllPairs, Graph, NodeAttrs,
};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    name = "graph-route-bench",
    about = "Time and cross-check shortest path algorithms on synthetic city graphs"
)]
struct Args {
    /// Which generator to run
    #[arg(value_enum, default_value_t = Mode::All)]
    mode: Mode,

    /// Target node count
    #[arg(long, default_value_t = 1500)]
    nodes: usize,

    /// Seed for the deterministic generators and query sampling
    #[arg(long, default_value_t = 42)]
    seed: u64,

    /// Skip Floyd-Warshall above this many nodes (O(V³))
    #[arg(long, default_value_t = 2000)]
    all_pairs_limit: usize,

    /// Random source/target pairs to cross-check between algorithms
    #[arg(long, default_value_t = 20)]
    queries: usize,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Mode {
    /// Run every generator (default)
    All,
    /// Jittered street grid with avenues and highways
    Grid,
    /// Random points joined to their nearest neighbours
    Random,
    /// Neighbourhood clusters joined by arterial roads
    Clustered,
}

type Generator = fn(usize, u64) -> Graph<String>;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    println!("graph-route-bench");
    println!("=================");
    println!();

    let generators: Vec<(&str, Generator)> = match args.mode {
        Mode::Grid => vec![("Grid city", gen_grid_city as Generator)],
        Mode::Random => vec![("Random city (k-nearest)", gen_random_city as Generator)],
        Mode::Clustered => vec![("Clustered city", gen_clustered_city as Generator)],
        Mode::All => vec![
            ("Grid city", gen_grid_city as Generator),
            ("Random city (k-nearest)", gen_random_city),
            ("Clustered city", gen_clustered_city),
        ],
    };

    for (name, generator) in generators {
        run_benchmark(name, generator, &args);
    }
}

fn ms(t: Instant) -> f64 {
    t.elapsed().as_secs_f64() * 1000.0
}

fn run_benchmark(name: &str, generator: Generator, args: &Args) {
    println!("--- {} ---", name);
    println!("Target: {} nodes", args.nodes);

    info!(generator = name, nodes = args.nodes, seed = args.seed, "generating graph");
    let t = Instant::now();
    let graph = generator(args.nodes, args.seed);
    let stats = graph.stats();
    println!(
        "Generated in {:.1}ms: {} nodes, {} edges, avg out-degree {:.2}, ~{:.1}MB",
        ms(t),
        stats.node_count,
        stats.edge_count,
        stats.average_out_degree,
        graph.memory_usage() as f64 / 1_048_576.0
    );

    if graph.is_empty() {
        println!("(empty graph, nothing to query)");
        println!();
        return;
    }

    let source = graph.key_of(0).clone();
    let target = graph.key_of(graph.node_count() - 1).clone();
    println!();
    println!("{:<14} {:>12} {:>8} {:>10}", "algorithm", "distance", "hops", "time");
    println!("{:-<14} {:->12} {:->8} {:->10}", "", "", "", "");

    let t = Instant::now();
    let priority = shortest_path_priority(&graph, &source, &target);
    let elapsed = ms(t);
    match priority {
        Ok(result) => print_row(
            "dijkstra",
            result.distance(),
            result.path().map(|p| p.len().saturating_sub(1)),
            elapsed,
        ),
        Err(e) => println!("dijkstra: {}", e),
    }

    let t = Instant::now();
    let relaxed = shortest_path_relaxation(&graph, &source, &target);
    let elapsed = ms(t);
    match relaxed {
        Ok(result) if result.has_negative_cycle() => {
            println!("{:<14} {:>12} {:>8} {:>8.2}ms", "bellman-ford", "neg-cycle", "-", elapsed)
        }
        Ok(result) => print_row(
            "bellman-ford",
            result.distance(),
            result.path().map(|p| p.len().saturating_sub(1)),
            elapsed,
        ),
        Err(e) => println!("bellman-ford: {}", e),
    }

    let all_pairs = if graph.node_count() <= args.all_pairs_limit {
        let t = Instant::now();
        let ap = all_pairs_shortest_paths(&graph);
        let elapsed = ms(t);
        print_row(
            "floyd-warshall",
            ap.distance(&source, &target),
            ap.path(&source, &target).map(|p| p.len().saturating_sub(1)),
            elapsed,
        );
        println!("{:>14} {} reachable ordered pairs", "", ap.pairs().count());
        Some(ap)
    } else {
        println!(
            "floyd-warshall skipped ({} nodes > --all-pairs-limit {})",
            graph.node_count(),
            args.all_pairs_limit
        );
        None
    };

    let t = Instant::now();
    if let Ok(tree) = shortest_path_priority_all(&graph, &source) {
        println!(
            "{:<14} {:>12} {:>8} {:>8.2}ms",
            "dijkstra-all",
            format!("{} reached", tree.reachable().count()),
            "-",
            ms(t)
        );
    }

    println!();
    cross_check(&graph, all_pairs.as_ref(), args);
    println!();
}

fn print_row(name: &str, distance: Option<f64>, hops: Option<usize>, elapsed_ms: f64) {
    match (distance, hops) {
        (Some(d), Some(h)) => {
            println!("{:<14} {:>12.2} {:>8} {:>8.2}ms", name, d, h, elapsed_ms)
        }
        _ => println!("{:<14} {:>12} {:>8} {:>8.2}ms", name, "no path", "-", elapsed_ms),
    }
}

/// Sample node pairs and check that every algorithm reports the same
/// distance (all generated weights are non-negative).
fn cross_check(graph: &Graph<String>, all_pairs: Option<&AllPairs<String>>, args: &Args) {
    let mut rng = FastRng::new(args.seed ^ 0x5eed);
    let n = graph.node_count() as u64;
    let mut agreed = 0usize;
    let mut reachable = 0usize;

    for _ in 0..args.queries {
        let s = graph.key_of(rng.next(n) as usize);
        let t = graph.key_of(rng.next(n) as usize);

        let (Ok(priority), Ok(relaxed)) = (
            shortest_path_priority(graph, s, t),
            shortest_path_relaxation(graph, s, t),
        ) else {
            continue;
        };

        let mut distances = vec![priority.distance(), relaxed.distance()];
        if let Some(ap) = all_pairs {
            distances.push(ap.distance(s, t));
        }

        if priority.distance().is_some() {
            reachable += 1;
        }
        let first = distances[0];
        let same = distances.iter().all(|d| match (first, *d) {
            (Some(a), Some(b)) => (a - b).abs() < 1e-6,
            (None, None) => true,
            _ => false,
        });
        if same {
            agreed += 1;
        } else {
            warn!(from = %s, to = %t, ?distances, "algorithms disagree");
            println!("MISMATCH {} -> {}: {:?}", s, t, distances);
        }
    }

    println!(
        "Cross-check: {}/{} queries agree ({} reachable)",
        agreed, args.queries, reachable
    );
}

// ---------------------------------------------------------------------------
// Generators: deterministic, Euclidean weights rounded to 2 decimals
// ---------------------------------------------------------------------------

/// Simple LCG for deterministic, fast pseudo-random numbers.
struct FastRng(u64);

impl FastRng {
    fn new(seed: u64) -> Self {
        Self(seed)
    }
    fn next(&mut self, max: u64) -> u64 {
        self.0 = self.0.wrapping_mul(6364136223846793005).wrapping_add(1);
        (self.0 >> 33) % max
    }
    fn next_f64(&mut self) -> f64 {
        self.0 = self.0.wrapping_mul(6364136223846793005).wrapping_add(1);
        (self.0 >> 11) as f64 / (1u64 << 53) as f64
    }
    fn uniform(&mut self, lo: f64, hi: f64) -> f64 {
        lo + (hi - lo) * self.next_f64()
    }
    /// Inclusive range.
    fn between(&mut self, lo: u64, hi: u64) -> u64 {
        lo + self.next(hi - lo + 1)
    }
}

fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

fn euclid(a: (f64, f64), b: (f64, f64)) -> f64 {
    ((a.0 - b.0).powi(2) + (a.1 - b.1).powi(2)).sqrt()
}

/// Grid city: blocks on a jittered grid.
///
/// Right/down streets, 70% of them two-way (return leg ±10% weight), 30%
/// diagonal avenues, and one long highway per 50 nodes at 0.6x the
/// straight-line distance.
fn gen_grid_city(node_count: usize, seed: u64) -> Graph<String> {
    let mut graph = Graph::with_capacity(node_count);
    let mut rng = FastRng::new(seed);

    let grid = (node_count as f64).sqrt() as usize + 1;
    let mut positions: Vec<Option<(f64, f64)>> = vec![None; grid * grid];
    let mut placed: Vec<(usize, usize)> = Vec::with_capacity(node_count);
    let id = |i: usize, j: usize| format!("N{}_{}", i, j);

    'rows: for i in 0..grid {
        for j in 0..grid {
            if placed.len() >= node_count {
                break 'rows;
            }
            let pos = (
                i as f64 * 100.0 + rng.uniform(-10.0, 10.0),
                j as f64 * 100.0 + rng.uniform(-10.0, 10.0),
            );
            positions[i * grid + j] = Some(pos);
            placed.push((i, j));
            graph.add_node(id(i, j), NodeAttrs::default().at(pos.0, pos.1));
        }
    }

    let at = |i: usize, j: usize| -> Option<(f64, f64)> {
        if i < grid && j < grid {
            positions[i * grid + j]
        } else {
            None
        }
    };

    for &(i, j) in &placed {
        let Some(here) = at(i, j) else { continue };

        for (ni, nj) in [(i, j + 1), (i + 1, j)] {
            if let Some(there) = at(ni, nj) {
                let dist = round2(euclid(here, there));
                graph.add_edge(id(i, j), id(ni, nj), dist);
                if rng.next_f64() > 0.3 {
                    let back = round2(dist * rng.uniform(0.9, 1.1));
                    graph.add_edge(id(ni, nj), id(i, j), back);
                }
            }
        }

        if rng.next_f64() > 0.7 {
            if let Some(there) = at(i + 1, j + 1) {
                graph.add_edge(id(i, j), id(i + 1, j + 1), round2(euclid(here, there)));
            }
        }
    }

    if !placed.is_empty() {
        for _ in 0..node_count / 50 {
            let a = placed[rng.next(placed.len() as u64) as usize];
            let b = placed[rng.next(placed.len() as u64) as usize];
            if a != b {
                if let (Some(pa), Some(pb)) = (at(a.0, a.1), at(b.0, b.1)) {
                    graph.add_edge(id(a.0, a.1), id(b.0, b.1), round2(euclid(pa, pb) * 0.6));
                }
            }
        }
    }

    graph
}

/// Random city: uniform points, each joined to its k nearest neighbours
/// (k drawn from 3..=6), weights jittered ±20%.
///
/// O(n² log n); neighbour search is brute force.
fn gen_random_city(node_count: usize, seed: u64) -> Graph<String> {
    let avg_connections = 4u64;
    let mut graph = Graph::with_capacity(node_count);
    let mut rng = FastRng::new(seed.wrapping_add(12345));

    let points: Vec<(String, (f64, f64))> = (0..node_count)
        .map(|i| {
            let pos = (rng.uniform(0.0, 1000.0), rng.uniform(0.0, 1000.0));
            (format!("N{}", i), pos)
        })
        .collect();

    for (id, pos) in &points {
        graph.add_node(id.clone(), NodeAttrs::default().at(pos.0, pos.1));
    }

    let mut nearest: Vec<(usize, f64)> = Vec::with_capacity(node_count);
    for (i, (id, pos)) in points.iter().enumerate() {
        nearest.clear();
        nearest.extend(
            points
                .iter()
                .enumerate()
                .filter(|(j, _)| *j != i)
                .map(|(j, (_, other))| (j, euclid(*pos, *other))),
        );
        nearest.sort_by(|a, b| a.1.total_cmp(&b.1));

        let k = rng.between(avg_connections - 1, avg_connections + 2) as usize;
        for &(j, dist) in nearest.iter().take(k) {
            let weight = round2(dist * rng.uniform(0.8, 1.2));
            graph.add_edge(id.clone(), points[j].0.clone(), weight);
        }
    }

    graph
}

/// Clustered city: neighbourhoods of points within radius 50 of a centre,
/// 3-5 random local streets per node, and 2-3 arterial roads per cluster
/// to other clusters.
fn gen_clustered_city(node_count: usize, seed: u64) -> Graph<String> {
    let clusters = 10usize;
    let per_cluster = (node_count / clusters).max(1);
    let mut graph = Graph::with_capacity(node_count);
    let mut rng = FastRng::new(seed.wrapping_add(67890));

    let mut members: Vec<Vec<(String, (f64, f64))>> = Vec::with_capacity(clusters);

    for c in 0..clusters {
        let center = (rng.uniform(100.0, 900.0), rng.uniform(100.0, 900.0));
        let nodes: Vec<(String, (f64, f64))> = (0..per_cluster)
            .map(|i| {
                let angle = rng.uniform(0.0, std::f64::consts::TAU);
                let radius = rng.uniform(0.0, 50.0);
                let pos = (
                    center.0 + radius * angle.cos(),
                    center.1 + radius * angle.sin(),
                );
                (format!("C{}_N{}", c, i), pos)
            })
            .collect();

        for (id, pos) in &nodes {
            graph.add_node(id.clone(), NodeAttrs::default().at(pos.0, pos.1));
        }

        for (i, (id, pos)) in nodes.iter().enumerate() {
            for _ in 0..rng.between(3, 5) {
                let j = rng.next(nodes.len() as u64) as usize;
                if i != j {
                    let (other_id, other) = &nodes[j];
                    graph.add_edge(id.clone(), other_id.clone(), round2(euclid(*pos, *other)));
                }
            }
        }

        members.push(nodes);
    }

    for c in 0..clusters {
        for _ in 0..rng.between(2, 3) {
            let other = rng.next(clusters as u64) as usize;
            if other == c {
                continue;
            }
            let (a_id, a) = &members[c][rng.next(members[c].len() as u64) as usize];
            let (b_id, b) = &members[other][rng.next(members[other].len() as u64) as usize];
            graph.add_edge(a_id.clone(), b_id.clone(), round2(euclid(*a, *b)));
        }
    }

    graph
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generators_are_deterministic() {
        for generator in [gen_grid_city as Generator, gen_random_city, gen_clustered_city] {
            let a = generator(200, 7);
            let b = generator(200, 7);
            assert_eq!(a.stats(), b.stats());
            let ka: Vec<&String> = a.all_node_keys().collect();
            let kb: Vec<&String> = b.all_node_keys().collect();
            assert_eq!(ka, kb);
        }
    }

    #[test]
    fn test_generators_non_negative_weights() {
        for generator in [gen_grid_city as Generator, gen_random_city, gen_clustered_city] {
            let g = generator(150, 3);
            for key in g.all_node_keys() {
                assert!(g.neighbors(key).all(|(_, w)| w >= 0.0));
            }
        }
    }

    #[test]
    fn test_grid_city_node_count() {
        let g = gen_grid_city(100, 1);
        assert_eq!(g.node_count(), 100);
        assert!(g.node_exists("N0_0"));
        assert!(g.node("N0_0").unwrap().position().is_some());
    }

    #[test]
    fn test_random_city_out_degree() {
        let g = gen_random_city(60, 9);
        for key in g.all_node_keys() {
            let degree = g.neighbors(key).count();
            assert!((3..=6).contains(&degree), "{key} has degree {degree}");
        }
    }
}

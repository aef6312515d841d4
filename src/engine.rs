//! Entry points: validate, seed, run the evolutionary loop on one or more
//! islands, and report the best clustering.

use crate::coarsen::compact_labels;
use crate::config::EngineConfig;
use crate::csr::CsrArrays;
use crate::error::{Error, Result};
use crate::evolution::{Controller, IslandOutcome};
use crate::graph::Graph;
use crate::modularity;
use crate::rng::SeededRng;
use log::info;
use rayon::prelude::*;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, PartialEq)]
pub struct ClusteringResult {
    pub modularity: f64,
    /// One label per vertex, compacted to `0..num_clusters` in order of
    /// first appearance.
    pub clustering: Vec<u32>,
    pub num_clusters: usize,
    pub generations: u64,
}

impl ClusteringResult {
    fn from_labels(graph: &Graph, mut labels: Vec<u32>, generations: u64) -> Self {
        let num_clusters = compact_labels(&mut labels);
        Self {
            modularity: modularity::full(graph, &labels),
            clustering: labels,
            num_clusters,
            generations,
        }
    }
}

/// Clusters the graph given by raw CSR arrays. `cluster_upperbound` caps the
/// total vertex weight of every cluster.
#[allow(clippy::too_many_arguments)]
pub fn cluster(
    vertex_weights: &[u64],
    offsets: &[usize],
    neighbors: &[u32],
    edge_weights: &[f64],
    suppress_output: bool,
    seed: u64,
    time_limit: f64,
    cluster_upperbound: Option<u64>,
) -> Result<ClusteringResult> {
    let graph = Graph::from_csr(
        vertex_weights.to_vec(),
        offsets.to_vec(),
        neighbors.to_vec(),
        edge_weights.to_vec(),
    )?;
    let config = EngineConfig {
        seed,
        time_limit,
        suppress_output,
        cluster_upperbound,
        ..EngineConfig::default()
    };
    cluster_graph(&graph, &config)
}

pub fn cluster_csr(csr: CsrArrays, config: &EngineConfig) -> Result<ClusteringResult> {
    let graph = csr.into_graph()?;
    cluster_graph(&graph, config)
}

/// Runs the engine on a validated graph. Fails only on invalid parameters,
/// before any clustering work.
pub fn cluster_graph(graph: &Graph, config: &EngineConfig) -> Result<ClusteringResult> {
    config.validate()?;
    let start = Instant::now();
    let budget = Duration::try_from_secs_f64(config.time_limit)
        .map_err(|e| Error::invalid_parameter("time_limit", e.to_string()))?;
    let deadline = start
        .checked_add(budget)
        .ok_or_else(|| Error::invalid_parameter("time_limit", "deadline out of range"))?;

    let n = graph.vertex_count();
    if n == 0 || graph.total_weight() <= 0.0 {
        // Every vertex alone; modularity is defined as 0.
        return Ok(ClusteringResult::from_labels(
            graph,
            (0..n as u32).collect(),
            0,
        ));
    }

    let outcome = if config.threads == 1 {
        Controller::new(graph, config, SeededRng::for_island(config.seed, 0), 0).run(deadline)
    } else {
        run_islands(graph, config, deadline)?
    };

    let result = ClusteringResult::from_labels(graph, outcome.best.labels, outcome.generations);
    if !config.suppress_output {
        info!(
            "best modularity {:.6} with {} clusters after {} generations ({:.3}s)",
            result.modularity,
            result.num_clusters,
            result.generations,
            start.elapsed().as_secs_f64()
        );
    }
    Ok(result)
}

/// Independent controllers on a thread pool, island `i` seeded with
/// `seed ^ i`. Selection ignores scheduling: highest modularity, then the
/// lowest island.
fn run_islands(graph: &Graph, config: &EngineConfig, deadline: Instant) -> Result<IslandOutcome> {
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(config.threads)
        .build()
        .map_err(|e| Error::ThreadPool(e.to_string()))?;

    let mut outcomes: Vec<IslandOutcome> = pool.install(|| {
        (0..config.threads)
            .into_par_iter()
            .map(|island| {
                let rng = SeededRng::for_island(config.seed, island);
                Controller::new(graph, config, rng, island).run(deadline)
            })
            .collect()
    });
    outcomes.sort_unstable_by_key(|o| o.island);

    let generations = outcomes.iter().map(|o| o.generations).sum();
    let mut best: Option<IslandOutcome> = None;
    for o in outcomes {
        let better = match &best {
            Some(b) => o.best.modularity > b.best.modularity,
            None => true,
        };
        if better {
            best = Some(o);
        }
    }
    let mut best = best.ok_or_else(|| Error::ThreadPool("no island finished".to_string()))?;
    best.generations = generations;
    Ok(best)
}

/// Modularity of a given partition, for evaluating clusterings produced elsewhere.
pub fn evaluate(graph: &Graph, labels: &[u32]) -> Result<f64> {
    if labels.len() != graph.vertex_count() {
        return Err(Error::invalid_parameter(
            "partition",
            format!(
                "has {} labels but the graph has {} vertices",
                labels.len(),
                graph.vertex_count()
            ),
        ));
    }
    Ok(modularity::full(graph, labels))
}

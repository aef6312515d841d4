//! The anytime evolutionary loop: a small population of clusterings is
//! grown by fresh multilevel runs, then improved by recombination and
//! mutation until the deadline or the generation budget is reached.

use crate::coarsen::{self, compact_labels, contract_clustering, CoarseningParams};
use crate::config::EngineConfig;
use crate::graph::Graph;
use crate::label_propagation::LabelPropagationParams;
use crate::multilevel::{multilevel_cluster, PipelineParams, Seeding};
use crate::population::{Individual, Insertion, Population};
use crate::refine::{refine, RefineParams};
use crate::rng::RandomStream;
use log::{debug, info};
use rustc_hash::FxHashMap;
use std::collections::VecDeque;
use std::time::Instant;

/// Lower end of the fraction of vertices (or clusters) a mutation touches.
const MIN_MUTATE_FRACTION: f64 = 0.01;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Fresh,
    OverlapFlat,
    OverlapMultilevel,
    NeighborhoodVote,
    Perturb,
    Split,
}

impl Operator {
    /// Operator of a generation once the population is full.
    fn draw(rng: &mut impl RandomStream) -> Self {
        match rng.next_below(100) {
            0..=24 => Operator::OverlapFlat,
            25..=49 => Operator::OverlapMultilevel,
            50..=69 => Operator::NeighborhoodVote,
            70..=84 => Operator::Perturb,
            85..=94 => Operator::Split,
            _ => Operator::Fresh,
        }
    }
}

#[derive(Debug, Clone)]
pub struct IslandOutcome {
    pub island: usize,
    pub best: Individual,
    pub generations: u64,
}

pub struct Controller<'a, R: RandomStream> {
    graph: &'a Graph,
    config: &'a EngineConfig,
    rng: R,
    island: usize,
    params: PipelineParams,
    population: Population,
    generations: u64,
}

impl<'a, R: RandomStream> Controller<'a, R> {
    pub fn new(graph: &'a Graph, config: &'a EngineConfig, rng: R, island: usize) -> Self {
        let params = PipelineParams {
            coarsening: CoarseningParams {
                floor: config.coarsening_floor,
                min_shrink_ratio: config.min_shrink_ratio,
                cluster_upperbound: config.cluster_upperbound,
            },
            refine: RefineParams {
                max_passes: config.max_refine_passes,
                cluster_upperbound: config.cluster_upperbound,
            },
            label_propagation_levels: 0,
            label_propagation: LabelPropagationParams {
                iterations: config.label_propagation_iterations,
                upper_bound: config
                    .cluster_upperbound
                    .unwrap_or_else(|| graph.total_vertex_weight()),
            },
        };
        Self {
            graph,
            config,
            rng,
            island,
            params,
            population: Population::new(config.pool_size, config.eviction),
            generations: 0,
        }
    }

    /// Runs generations until `deadline` passes or the generation budget is
    /// spent. The first generation always completes. Returns the best
    /// clustering ever produced.
    pub fn run(mut self, deadline: Instant) -> IslandOutcome {
        let first = self.breed(Operator::Fresh);
        if !self.config.suppress_output {
            info!(
                "[island {}] initial clustering, modularity {:.6}",
                self.island, first.modularity
            );
        }
        let mut best = first.clone();
        self.offer(first);

        while !self.budget_spent(deadline) {
            let op = if self.population.is_full() {
                Operator::draw(&mut self.rng)
            } else {
                Operator::Fresh
            };
            let child = self.breed(op);
            if child.modularity > best.modularity {
                if !self.config.suppress_output {
                    info!(
                        "[island {}] generation {} ({:?}): new best modularity {:.6}",
                        self.island, self.generations, op, child.modularity
                    );
                }
                best = child.clone();
            }
            self.offer(child);
        }

        if !self.config.suppress_output {
            let scores: Vec<String> = self
                .population
                .members()
                .iter()
                .map(|m| format!("{:.6}", m.modularity))
                .collect();
            info!(
                "[island {}] {} generations, population [{}]",
                self.island,
                self.generations,
                scores.join(", ")
            );
        }

        IslandOutcome {
            island: self.island,
            best,
            generations: self.generations,
        }
    }

    fn budget_spent(&self, deadline: Instant) -> bool {
        if let Some(max) = self.config.max_generations {
            if self.generations >= max {
                return true;
            }
        }
        Instant::now() >= deadline
    }

    fn offer(&mut self, child: Individual) {
        let modularity = child.modularity;
        match self.population.insert(child) {
            Insertion::Rejected => debug!("child {:.6} rejected", modularity),
            Insertion::Replaced(i) => debug!("child {:.6} replaced member {}", modularity, i),
            Insertion::Added => debug!("child {:.6} added", modularity),
        }
    }

    fn breed(&mut self, op: Operator) -> Individual {
        self.generations += 1;
        let labels = match op {
            Operator::Fresh => {
                let params = fresh_params(&self.params, self.graph, &mut self.rng);
                multilevel_cluster(self.graph, &mut self.rng, &params, Seeding::Singletons)
            }
            _ => {
                let (a, b) = self.population.select_parents(&mut self.rng);
                // Members are ordered by modularity.
                let fitter = &self.population.get(a.min(b)).labels;
                let other = &self.population.get(a.max(b)).labels;
                let high = self.config.mutate_fraction.max(MIN_MUTATE_FRACTION);
                let fraction = self.rng.next_f64_in(MIN_MUTATE_FRACTION, high);
                let (graph, rng, params) = (self.graph, &mut self.rng, &self.params);
                match op {
                    Operator::OverlapFlat => combine_overlap_flat(graph, rng, params, fitter, other),
                    Operator::OverlapMultilevel => {
                        let groups = overlap(fitter, other);
                        let seeding = Seeding::Constrained {
                            groups: &groups,
                            start: fitter,
                        };
                        multilevel_cluster(graph, rng, params, seeding)
                    }
                    Operator::NeighborhoodVote => {
                        let child = neighborhood_vote(graph, fitter, other);
                        multilevel_cluster(graph, rng, params, Seeding::Start(&child))
                    }
                    Operator::Perturb => {
                        let bound = self.config.cluster_upperbound;
                        let child = perturb(graph, rng, fitter, fraction, bound);
                        multilevel_cluster(graph, rng, params, Seeding::Start(&child))
                    }
                    _ => {
                        let child = split_clusters(graph, rng, fitter, fraction);
                        multilevel_cluster(graph, rng, params, Seeding::Start(&child))
                    }
                }
            }
        };
        Individual::new(self.graph, labels)
    }
}

/// Fresh runs draw how many label propagation levels precede matching
/// (none most of the time) and how large those clusters may grow.
fn fresh_params(
    base: &PipelineParams,
    graph: &Graph,
    rng: &mut impl RandomStream,
) -> PipelineParams {
    let mut params = *base;
    params.label_propagation_levels = match rng.next_below(11) {
        8 => 1,
        9 => 2,
        10 => 3,
        _ => 0,
    };
    if params.label_propagation_levels > 0 {
        let total = graph.total_vertex_weight();
        let low = (total / 10).max(1);
        let span = total.saturating_sub(low) as f64 + 1.0;
        let drawn = (low + (rng.next_f64() * span) as u64).min(total);
        params.label_propagation.upper_bound = params.label_propagation.upper_bound.min(drawn);
    }
    params
}

/// Vertices share a label iff they share a label in both parents.
pub fn overlap(a: &[u32], b: &[u32]) -> Vec<u32> {
    let mut ids: FxHashMap<(u32, u32), u32> = FxHashMap::default();
    a.iter()
        .zip(b)
        .map(|(&x, &y)| {
            let next = ids.len() as u32;
            *ids.entry((x, y)).or_insert(next)
        })
        .collect()
}

/// Contracts the overlap of both parents, clusters the contracted graph
/// starting from the fitter parent, and refines the projected result.
/// Never worse than `fitter`.
fn combine_overlap_flat(
    graph: &Graph,
    rng: &mut impl RandomStream,
    params: &PipelineParams,
    fitter: &[u32],
    other: &[u32],
) -> Vec<u32> {
    let groups = overlap(fitter, other);
    let level = contract_clustering(graph, &groups);
    let start = coarsen::restrict(&level.mapping, fitter, level.graph.vertex_count());
    let coarse = multilevel_cluster(&level.graph, rng, params, Seeding::Start(&start));
    let mut labels = coarsen::project(&level.mapping, &coarse);
    refine(graph, &mut labels, rng, &params.refine);
    labels
}

/// Each vertex inherits its cluster from the parent in which it shares a
/// cluster with more incident edge weight; ties go to `fitter`.
pub fn neighborhood_vote(graph: &Graph, fitter: &[u32], other: &[u32]) -> Vec<u32> {
    let mut ids: FxHashMap<(bool, u32), u32> = FxHashMap::default();
    let mut child = Vec::with_capacity(graph.vertex_count());
    for v in 0..graph.vertex_count() {
        let (mut inside_fitter, mut inside_other) = (0.0, 0.0);
        for (u, w) in graph.neighbors(v) {
            let u = u as usize;
            if fitter[u] == fitter[v] {
                inside_fitter += w;
            }
            if other[u] == other[v] {
                inside_other += w;
            }
        }
        let key = if inside_other > inside_fitter {
            (true, other[v])
        } else {
            (false, fitter[v])
        };
        let next = ids.len() as u32;
        child.push(*ids.entry(key).or_insert(next));
    }
    child
}

/// Moves about `fraction · n` random vertices into the cluster of a random
/// neighbor, skipping moves that would overfill the target cluster.
pub fn perturb(
    graph: &Graph,
    rng: &mut impl RandomStream,
    labels: &[u32],
    fraction: f64,
    cluster_upperbound: Option<u64>,
) -> Vec<u32> {
    let n = graph.vertex_count();
    let mut child = labels.to_vec();
    if n == 0 {
        return child;
    }
    let k = compact_labels(&mut child);
    let mut weight = vec![0u64; k];
    for (v, &c) in child.iter().enumerate() {
        weight[c as usize] += graph.vertex_weight(v);
    }

    let count = ((fraction * n as f64).ceil() as usize).max(1);
    for _ in 0..count {
        let v = rng.next_below(n);
        let degree = graph.degree(v);
        if degree == 0 {
            continue;
        }
        let e = graph.neighbor_range(v).start + rng.next_below(degree);
        let (from, to) = (child[v], child[graph.neighbor(e) as usize]);
        let vw = graph.vertex_weight(v);
        if from == to || cluster_upperbound.is_some_and(|b| weight[to as usize] + vw > b) {
            continue;
        }
        weight[from as usize] -= vw;
        weight[to as usize] += vw;
        child[v] = to;
    }
    child
}

/// Splits about `fraction · k` random clusters in two. The new half is grown
/// breadth-first inside the cluster from a random member until it holds half
/// of the cluster's vertex weight.
pub fn split_clusters(
    graph: &Graph,
    rng: &mut impl RandomStream,
    labels: &[u32],
    fraction: f64,
) -> Vec<u32> {
    let mut child = labels.to_vec();
    let k = compact_labels(&mut child);
    if k == 0 {
        return child;
    }
    let mut members: Vec<Vec<u32>> = vec![Vec::new(); k];
    for (v, &c) in child.iter().enumerate() {
        members[c as usize].push(v as u32);
    }

    let mut order = vec![0u32; k];
    rng.randomized_index_vector(&mut order);
    let count = ((fraction * k as f64).ceil() as usize).clamp(1, k);

    let mut next_label = k as u32;
    let mut queue: VecDeque<u32> = VecDeque::new();
    for &c in order.iter().take(count) {
        let group = &members[c as usize];
        if group.len() < 2 {
            continue;
        }
        let total: u64 = group.iter().map(|&v| graph.vertex_weight(v as usize)).sum();
        let seed = group[rng.next_below(group.len())];

        queue.clear();
        child[seed as usize] = next_label;
        let mut grown = graph.vertex_weight(seed as usize);
        queue.push_back(seed);
        while let Some(v) = queue.pop_front() {
            for (u, _) in graph.neighbors(v as usize) {
                if grown * 2 >= total {
                    break;
                }
                if child[u as usize] == c {
                    child[u as usize] = next_label;
                    grown += graph.vertex_weight(u as usize);
                    queue.push_back(u);
                }
            }
        }
        next_label += 1;
    }
    child
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::csr::CsrBuilder;
    use crate::rng::SeededRng;

    fn path(n: usize) -> Graph {
        let mut b = CsrBuilder::new(n);
        for v in 1..n {
            b.add_edge(v - 1, v, 1.0).unwrap();
        }
        b.build().into_graph().unwrap()
    }

    #[test]
    fn overlap_refines_both_parents() {
        let a = [0u32, 0, 0, 1, 1, 1];
        let b = [0u32, 0, 1, 1, 2, 2];
        let o = overlap(&a, &b);
        assert_eq!(o, vec![0, 0, 1, 2, 3, 3]);
    }

    #[test]
    fn vote_prefers_the_parent_with_more_internal_weight() {
        let g = path(4);
        let fitter = [0u32, 1, 2, 3];
        let other = [0u32, 0, 0, 0];
        let child = neighborhood_vote(&g, &fitter, &other);
        assert_eq!(child, vec![0, 0, 0, 0]);
        let child = neighborhood_vote(&g, &other, &fitter);
        assert_eq!(child, vec![0, 0, 0, 0]);
    }

    #[test]
    fn split_halves_a_cluster() {
        let g = path(8);
        let labels = [0u32; 8];
        let child = split_clusters(&g, &mut SeededRng::new(6), &labels, 1.0);
        let moved = child.iter().filter(|&&l| l == 1).count();
        assert_eq!(moved, 4);
        assert!(child.iter().all(|&l| l <= 1));
    }

    #[test]
    fn perturb_moves_vertices_into_existing_clusters() {
        let g = path(6);
        let labels = [0u32, 1, 2, 3, 4, 5];
        let child = perturb(&g, &mut SeededRng::new(3), &labels, 1.0, None);
        assert_ne!(child, labels.to_vec());
        assert!(child.iter().all(|&l| l < 6));

        let bounded = perturb(&g, &mut SeededRng::new(3), &labels, 1.0, Some(1));
        assert_eq!(bounded, labels.to_vec());
    }

    #[test]
    fn overlap_flat_is_never_worse_than_fitter() {
        let mut b = CsrBuilder::new(8);
        let edges = [(0, 1), (1, 2), (2, 3), (0, 3), (4, 5), (5, 6), (6, 7), (4, 7), (3, 4)];
        for &(u, v) in &edges {
            b.add_edge(u, v, 1.0).unwrap();
        }
        let g = b.build().into_graph().unwrap();
        let config = EngineConfig::default();
        let controller = Controller::new(&g, &config, SeededRng::new(1), 0);
        let fitter = [0u32, 0, 0, 0, 1, 1, 1, 1];
        let other = [0u32, 0, 1, 1, 1, 1, 2, 2];
        let q_fitter = crate::modularity::full(&g, &fitter);
        let mut rng = SeededRng::new(5);
        let child = combine_overlap_flat(&g, &mut rng, &controller.params, &fitter, &other);
        assert!(crate::modularity::full(&g, &child) >= q_fitter - 1e-12);
    }
}

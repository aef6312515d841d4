//! Modularity of a clustering and its incremental change under single-vertex moves.
//!
//! With `W` the total weight (sum of weighted degrees), `in_c` the weight of
//! directed half-edges with both ends in `c` plus self-loops, and `tot_c` the
//! summed weighted degree of `c`:
//!
//! ```text
//! Q = Σ_c in_c / W − (tot_c / W)²
//! ```
//!
//! which equals `Σ_c internal(c)/m − (tot_c/2m)²` with `internal(c)` counting
//! each edge once.

use crate::graph::Graph;
use rustc_hash::FxHashMap;

/// Whole-graph modularity of `labels`. Labels may be any `u32` values.
/// A graph without edge weight has modularity 0.
pub fn full(graph: &Graph, labels: &[u32]) -> f64 {
    let w = graph.total_weight();
    if w <= 0.0 {
        return 0.0;
    }

    let mut index: FxHashMap<u32, usize> = FxHashMap::default();
    let mut internal: Vec<f64> = Vec::new();
    let mut total: Vec<f64> = Vec::new();

    for v in 0..graph.vertex_count() {
        let next = index.len();
        let c = *index.entry(labels[v]).or_insert(next);
        if c == internal.len() {
            internal.push(0.0);
            total.push(0.0);
        }
        let mut inside = graph.self_loop(v);
        for (u, weight) in graph.neighbors(v) {
            if labels[u as usize] == labels[v] {
                inside += weight;
            }
        }
        internal[c] += inside;
        total[c] += graph.weighted_degree(v);
    }

    internal
        .iter()
        .zip(total.iter())
        .map(|(&i, &t)| i / w - (t / w) * (t / w))
        .sum()
}

/// Running totals for one cluster.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ClusterTotals {
    pub weight: u64,
    /// Edge weight with both endpoints inside, each half-edge counted, plus self-loops.
    pub internal: f64,
    pub total: f64,
}

/// Per-cluster accumulators that make a candidate move cost O(degree).
///
/// Cluster ids are dense indices in `0..vertex_count`.
#[derive(Debug, Clone)]
pub struct ClusterAccumulators {
    clusters: Vec<ClusterTotals>,
    total_weight: f64,
    internal_sum: f64,
    total_sq_sum: f64,
}

impl ClusterAccumulators {
    /// Builds accumulators for `labels`, every label `< graph.vertex_count()`.
    pub fn new(graph: &Graph, labels: &[u32]) -> Self {
        let n = graph.vertex_count();
        let mut clusters = vec![ClusterTotals::default(); n];
        for v in 0..n {
            let c = labels[v] as usize;
            let mut inside = graph.self_loop(v);
            for (u, weight) in graph.neighbors(v) {
                if labels[u as usize] as usize == c {
                    inside += weight;
                }
            }
            let slot = &mut clusters[c];
            slot.weight += graph.vertex_weight(v);
            slot.internal += inside;
            slot.total += graph.weighted_degree(v);
        }

        let internal_sum = clusters.iter().map(|c| c.internal).sum();
        let total_sq_sum = clusters.iter().map(|c| c.total * c.total).sum();
        Self {
            clusters,
            total_weight: graph.total_weight(),
            internal_sum,
            total_sq_sum,
        }
    }

    #[inline]
    pub fn cluster_weight(&self, c: u32) -> u64 {
        self.clusters[c as usize].weight
    }

    pub fn quality(&self) -> f64 {
        let w = self.total_weight;
        if w <= 0.0 {
            return 0.0;
        }
        self.internal_sum / w - self.total_sq_sum / (w * w)
    }

    /// Unnormalized move gain; `delta = 2 · gain / W`. Positive iff the move
    /// raises modularity. `w_from` and `w_to` are the edge weights from `v`
    /// to the other members of `from` and to the members of `to`.
    #[inline]
    pub fn gain(&self, graph: &Graph, v: usize, from: u32, to: u32, w_from: f64, w_to: f64) -> f64 {
        if from == to || self.total_weight <= 0.0 {
            return 0.0;
        }
        let k = graph.weighted_degree(v);
        let tot_from = self.clusters[from as usize].total;
        let tot_to = self.clusters[to as usize].total;
        (w_to - w_from) - k * (tot_to - tot_from + k) / self.total_weight
    }

    /// Exact change of modularity when `v` moves from `from` to `to`, given
    /// the edge weights from `v` into both clusters.
    #[inline]
    pub fn delta_with_weights(
        &self,
        graph: &Graph,
        v: usize,
        from: u32,
        to: u32,
        w_from: f64,
        w_to: f64,
    ) -> f64 {
        if self.total_weight <= 0.0 {
            return 0.0;
        }
        2.0 * self.gain(graph, v, from, to, w_from, w_to) / self.total_weight
    }

    /// Exact change of modularity when `v` (currently labelled `labels[v]`)
    /// moves to `to`. Scans the neighborhood of `v` once.
    pub fn delta(&self, graph: &Graph, labels: &[u32], v: usize, to: u32) -> f64 {
        let from = labels[v];
        let (w_from, w_to) = weights_to(graph, labels, v, from, to);
        self.delta_with_weights(graph, v, from, to, w_from, w_to)
    }

    /// Applies the move to the accumulators. The caller updates the label array.
    pub fn move_vertex(
        &mut self,
        graph: &Graph,
        v: usize,
        from: u32,
        to: u32,
        w_from: f64,
        w_to: f64,
    ) {
        if from == to {
            return;
        }
        let k = graph.weighted_degree(v);
        let s = graph.self_loop(v);
        let vw = graph.vertex_weight(v);

        let (old_from, old_to) = (
            self.clusters[from as usize].total,
            self.clusters[to as usize].total,
        );
        {
            let c = &mut self.clusters[from as usize];
            c.weight -= vw;
            c.internal -= 2.0 * w_from + s;
            c.total -= k;
        }
        {
            let c = &mut self.clusters[to as usize];
            c.weight += vw;
            c.internal += 2.0 * w_to + s;
            c.total += k;
        }
        let (new_from, new_to) = (old_from - k, old_to + k);

        self.internal_sum += 2.0 * (w_to - w_from);
        self.total_sq_sum += new_from * new_from + new_to * new_to
            - old_from * old_from
            - old_to * old_to;
    }

    /// Moves `v` to `to`, updating both the accumulators and `labels`.
    pub fn move_vertex_to(&mut self, graph: &Graph, labels: &mut [u32], v: usize, to: u32) {
        let from = labels[v];
        let (w_from, w_to) = weights_to(graph, labels, v, from, to);
        self.move_vertex(graph, v, from, to, w_from, w_to);
        labels[v] = to;
    }
}

/// Edge weight from `v` to the other members of `from` and to the members of `to`.
pub(crate) fn weights_to(graph: &Graph, labels: &[u32], v: usize, from: u32, to: u32) -> (f64, f64) {
    let mut w_from = 0.0;
    let mut w_to = 0.0;
    for (u, weight) in graph.neighbors(v) {
        let l = labels[u as usize];
        if l == from {
            w_from += weight;
        } else if l == to {
            w_to += weight;
        }
    }
    (w_from, w_to)
}

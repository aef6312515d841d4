//! Size-constrained label propagation, used to contract a graph into
//! clusters before matching-based coarsening.

use crate::graph::Graph;
use crate::refine::NeighborWeights;
use crate::rng::RandomStream;

#[derive(Debug, Clone, Copy)]
pub struct LabelPropagationParams {
    pub iterations: usize,
    /// No cluster may grow beyond this total vertex weight.
    pub upper_bound: u64,
}

/// Starting from singletons, every vertex repeatedly adopts the adjacent
/// label with the largest connecting edge weight, as long as the target
/// cluster stays within the weight bound. Ties are broken by a coin flip.
///
/// With `groups`, a vertex only adopts labels of neighbors in its own group.
/// Stops early once a round moves nothing. Returns labels in `0..n`.
pub fn size_constrained_label_propagation(
    graph: &Graph,
    rng: &mut impl RandomStream,
    params: &LabelPropagationParams,
    groups: Option<&[u32]>,
) -> Vec<u32> {
    let n = graph.vertex_count();
    let mut labels: Vec<u32> = (0..n as u32).collect();
    let mut cluster_weight: Vec<u64> = graph.vertex_weights().to_vec();
    let mut order = vec![0u32; n];
    rng.randomized_index_vector(&mut order);
    let mut around = NeighborWeights::with_capacity(n);

    for _ in 0..params.iterations {
        let mut changed = 0usize;
        for &v32 in order.iter() {
            let v = v32 as usize;
            let own = labels[v];
            let vw = graph.vertex_weight(v);

            match groups {
                Some(g) => around.gather_filtered(graph, &labels, v, |u| g[u] == g[v]),
                None => around.gather(graph, &labels, v),
            }

            let mut best = own;
            let mut best_w = around.entry(0).1;
            for i in 1..around.len() {
                let (c, w) = around.entry(i);
                if cluster_weight[c as usize] + vw > params.upper_bound {
                    continue;
                }
                if w > best_w || (w == best_w && rng.next_bool()) {
                    best = c;
                    best_w = w;
                }
            }

            if best != own {
                cluster_weight[own as usize] -= vw;
                cluster_weight[best as usize] += vw;
                labels[v] = best;
                changed += 1;
            }
        }
        if changed == 0 {
            break;
        }
    }
    labels
}

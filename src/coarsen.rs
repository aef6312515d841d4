//! Multilevel coarsening: normalized heavy-edge matching, contraction of a
//! vertex grouping into a smaller graph, and the level stack used for
//! projection back to the input graph.

use crate::graph::Graph;
use crate::rng::RandomStream;
use log::debug;
use rustc_hash::FxHashMap;

const UNMATCHED: u32 = u32::MAX;

/// How a coarse level was obtained from the level below it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LevelKind {
    Matching,
    Clustering,
}

/// One contracted graph plus `mapping[finer vertex] -> vertex of this level`.
#[derive(Debug, Clone)]
pub struct CoarseLevel {
    pub graph: Graph,
    pub mapping: Vec<u32>,
    pub kind: LevelKind,
}

#[derive(Debug, Clone, Copy)]
pub struct CoarseningParams {
    /// Stop once a level has at most this many vertices.
    pub floor: usize,
    /// Stop when a matching would keep more than this fraction of the vertices.
    pub min_shrink_ratio: f64,
    pub cluster_upperbound: Option<u64>,
}

/// Linear chain of levels above a borrowed input graph.
///
/// Level 0 is the input; level `k > 0` is `levels[k - 1]`, whose mapping
/// points from level `k - 1` vertices into it. Levels are dropped as soon as
/// they are projected.
#[derive(Debug)]
pub struct Hierarchy<'g> {
    base: &'g Graph,
    levels: Vec<CoarseLevel>,
}

impl<'g> Hierarchy<'g> {
    pub fn new(base: &'g Graph) -> Self {
        Self {
            base,
            levels: Vec::new(),
        }
    }

    #[inline]
    pub fn depth(&self) -> usize {
        self.levels.len()
    }

    pub fn graph_at(&self, level: usize) -> &Graph {
        if level == 0 {
            self.base
        } else {
            &self.levels[level - 1].graph
        }
    }

    #[inline]
    pub fn coarsest(&self) -> &Graph {
        self.graph_at(self.depth())
    }

    pub fn push(&mut self, level: CoarseLevel) {
        debug!(
            "level {} ({:?}): {} -> {} vertices",
            self.depth() + 1,
            level.kind,
            level.mapping.len(),
            level.graph.vertex_count()
        );
        self.levels.push(level);
    }

    /// Drops the coarsest level and lifts `coarse_labels` to the level below.
    /// Returns `None` when only the input graph is left.
    pub fn pop_and_project(&mut self, coarse_labels: &[u32]) -> Option<Vec<u32>> {
        let level = self.levels.pop()?;
        Some(project(&level.mapping, coarse_labels))
    }
}

pub fn project(mapping: &[u32], coarse: &[u32]) -> Vec<u32> {
    mapping.iter().map(|&c| coarse[c as usize]).collect()
}

/// Carries a per-vertex value (constant on every group) up one level.
pub fn restrict(mapping: &[u32], fine: &[u32], coarse_n: usize) -> Vec<u32> {
    let mut out = vec![0u32; coarse_n];
    for (v, &c) in mapping.iter().enumerate() {
        out[c as usize] = fine[v];
    }
    out
}

/// Relabels in place to `0..k` in order of first appearance and returns `k`.
pub fn compact_labels(labels: &mut [u32]) -> usize {
    let mut remap: FxHashMap<u32, u32> = FxHashMap::default();
    for l in labels.iter_mut() {
        let next = remap.len() as u32;
        *l = *remap.entry(*l).or_insert(next);
    }
    remap.len()
}

/// Pairs each unmatched vertex, visited in a random order, with the
/// unmatched neighbor of highest rating `w(u, v) / (c(u) · c(v))`.
///
/// A neighbor is eligible only if it lies in the same group (when `groups`
/// is given), the pair respects the cluster upper bound, and merging the
/// pair alone would raise modularity (`w(u, v) > k(u) · k(v) / W`). Rating
/// ties go to the lowest neighbor index. Coarse ids follow vertex order.
pub fn compute_matching(
    graph: &Graph,
    rng: &mut impl RandomStream,
    groups: Option<&[u32]>,
    cluster_upperbound: Option<u64>,
) -> (Vec<u32>, usize) {
    let n = graph.vertex_count();
    let w_total = graph.total_weight();
    let mut partner = vec![UNMATCHED; n];
    let mut order = vec![0u32; n];
    rng.randomized_index_vector(&mut order);

    for &v32 in order.iter() {
        let v = v32 as usize;
        if partner[v] != UNMATCHED {
            continue;
        }
        let kv = graph.weighted_degree(v);
        let cv = graph.vertex_weight(v);

        let mut best = UNMATCHED;
        let mut best_rating = 0.0f64;
        for (nb, w) in graph.neighbors(v) {
            let u = nb as usize;
            if partner[u] != UNMATCHED {
                continue;
            }
            if let Some(g) = groups {
                if g[u] != g[v] {
                    continue;
                }
            }
            let cu = graph.vertex_weight(u);
            if let Some(bound) = cluster_upperbound {
                if cu + cv > bound {
                    continue;
                }
            }
            if w_total <= 0.0 || w <= kv * graph.weighted_degree(u) / w_total {
                continue;
            }
            let rating = w / (cu as f64 * cv as f64);
            if rating > best_rating || (rating == best_rating && best != UNMATCHED && nb < best)
            {
                best = nb;
                best_rating = rating;
            }
        }

        if best != UNMATCHED {
            partner[v] = best;
            partner[best as usize] = v32;
        }
    }

    let mut mapping = vec![UNMATCHED; n];
    let mut next = 0u32;
    for v in 0..n {
        if mapping[v] != UNMATCHED {
            continue;
        }
        mapping[v] = next;
        if partner[v] != UNMATCHED {
            mapping[partner[v] as usize] = next;
        }
        next += 1;
    }
    (mapping, next as usize)
}

/// Builds the graph whose vertices are the groups of `mapping`.
///
/// Vertex weights add up, parallel edges merge by summing, and every
/// half-edge inside a group becomes self-loop weight, so modularity of any
/// clustering constant on groups is the same on both levels.
pub fn contract(graph: &Graph, mapping: &[u32], coarse_n: usize) -> Graph {
    let n = graph.vertex_count();

    let mut member_offsets = vec![0usize; coarse_n + 1];
    for &c in mapping {
        member_offsets[c as usize + 1] += 1;
    }
    for c in 0..coarse_n {
        member_offsets[c + 1] += member_offsets[c];
    }
    let mut fill = member_offsets[..coarse_n].to_vec();
    let mut members = vec![0u32; n];
    for (v, &c) in mapping.iter().enumerate() {
        members[fill[c as usize]] = v as u32;
        fill[c as usize] += 1;
    }

    let mut vertex_weight = vec![0u64; coarse_n];
    let mut self_loop = vec![0.0f64; coarse_n];
    let mut offsets = vec![0usize; coarse_n + 1];
    let mut neighbors: Vec<u32> = Vec::with_capacity(graph.entry_count());
    let mut edge_weight: Vec<f64> = Vec::with_capacity(graph.entry_count());

    // Sparse stamp accumulator over destination groups.
    let mut stamp = vec![UNMATCHED; coarse_n];
    let mut acc = vec![0.0f64; coarse_n];
    let mut touched: Vec<u32> = Vec::new();

    for c in 0..coarse_n {
        touched.clear();
        for &v in &members[member_offsets[c]..member_offsets[c + 1]] {
            let v = v as usize;
            vertex_weight[c] += graph.vertex_weight(v);
            self_loop[c] += graph.self_loop(v);
            for (u, w) in graph.neighbors(v) {
                let d = mapping[u as usize];
                if d as usize == c {
                    self_loop[c] += w;
                    continue;
                }
                if stamp[d as usize] != c as u32 {
                    stamp[d as usize] = c as u32;
                    acc[d as usize] = w;
                    touched.push(d);
                } else {
                    acc[d as usize] += w;
                }
            }
        }
        touched.sort_unstable();
        for &d in touched.iter() {
            neighbors.push(d);
            edge_weight.push(acc[d as usize]);
        }
        offsets[c + 1] = neighbors.len();
    }

    Graph::from_parts(vertex_weight, offsets, neighbors, edge_weight, self_loop)
}

/// Contracts a clustering: one coarse vertex per cluster.
pub fn contract_clustering(graph: &Graph, labels: &[u32]) -> CoarseLevel {
    let mut mapping = labels.to_vec();
    let k = compact_labels(&mut mapping);
    CoarseLevel {
        graph: contract(graph, &mapping, k),
        mapping,
        kind: LevelKind::Clustering,
    }
}

/// Per-vertex labels that travel up the hierarchy with the graph: the
/// contraction constraint and the clustering a run starts from. Both are
/// constant on every contracted group.
#[derive(Debug, Clone, Default)]
pub struct CarriedLabels {
    pub groups: Option<Vec<u32>>,
    pub start: Option<Vec<u32>>,
}

impl CarriedLabels {
    pub fn restrict(&mut self, mapping: &[u32], coarse_n: usize) {
        if let Some(g) = self.groups.as_mut() {
            *g = restrict(mapping, g, coarse_n);
        }
        if let Some(s) = self.start.as_mut() {
            *s = restrict(mapping, s, coarse_n);
        }
    }
}

/// Pushes matching levels onto `hierarchy` until the floor or the shrink
/// guard stops it, keeping `carried` valid on the coarsest level.
pub fn coarsen_by_matching(
    hierarchy: &mut Hierarchy<'_>,
    rng: &mut impl RandomStream,
    params: &CoarseningParams,
    carried: &mut CarriedLabels,
) {
    loop {
        let g = hierarchy.coarsest();
        let n = g.vertex_count();
        if n <= params.floor {
            break;
        }
        let (mapping, coarse_n) =
            compute_matching(g, rng, carried.groups.as_deref(), params.cluster_upperbound);
        if coarse_n as f64 > params.min_shrink_ratio * n as f64 {
            debug!("matching keeps {} of {} vertices, stopping", coarse_n, n);
            break;
        }
        let coarse = contract(g, &mapping, coarse_n);
        carried.restrict(&mapping, coarse_n);
        hierarchy.push(CoarseLevel {
            graph: coarse,
            mapping,
            kind: LevelKind::Matching,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::csr::CsrBuilder;
    use crate::modularity;
    use crate::rng::{SeededRng, SequentialStream};

    fn two_triangles() -> Graph {
        let mut b = CsrBuilder::new(6);
        for &(u, v) in &[(0, 1), (1, 2), (0, 2), (3, 4), (4, 5), (3, 5)] {
            b.add_edge(u, v, 5.0).unwrap();
        }
        b.add_edge(2, 3, 1.0).unwrap();
        b.build().into_graph().unwrap()
    }

    #[test]
    fn matching_never_uses_the_light_bridge() {
        let g = two_triangles();
        for seed in 0..20 {
            let mut rng = SeededRng::new(seed);
            let (mapping, k) = compute_matching(&g, &mut rng, None, None);
            assert!(k < 6);
            assert_ne!(mapping[2], mapping[3]);
        }
    }

    #[test]
    fn matching_ties_prefer_lowest_index() {
        let g = two_triangles();
        let (mapping, k) = compute_matching(&g, &mut SequentialStream, None, None);
        // Vertex 0 sees 1 and 2 with equal rating and takes 1.
        assert_eq!(mapping[0], mapping[1]);
        assert_eq!(k, 4);
    }

    #[test]
    fn matching_respects_groups_and_upper_bound() {
        let g = two_triangles();
        let groups = [0u32, 1, 2, 3, 4, 5];
        let (_, k) = compute_matching(&g, &mut SeededRng::new(1), Some(&groups), None);
        assert_eq!(k, 6);
        let (_, k) = compute_matching(&g, &mut SeededRng::new(1), None, Some(1));
        assert_eq!(k, 6);
    }

    #[test]
    fn contraction_preserves_modularity_and_weight() {
        let g = two_triangles();
        let mapping = vec![0u32, 0, 1, 2, 2, 3];
        let coarse = contract(&g, &mapping, 4);
        assert_eq!(coarse.vertex_count(), 4);
        assert_eq!(coarse.vertex_weight(0), 2);
        assert_eq!(coarse.self_loop(0), 10.0);
        assert!((coarse.total_weight() - g.total_weight()).abs() < 1e-12);

        let coarse_labels = [0u32, 0, 1, 1];
        let fine_labels = project(&mapping, &coarse_labels);
        let qc = modularity::full(&coarse, &coarse_labels);
        let qf = modularity::full(&g, &fine_labels);
        assert!((qc - qf).abs() < 1e-12);
    }

    #[test]
    fn hierarchy_projects_through_levels() {
        let g = two_triangles();
        let mut h = Hierarchy::new(&g);
        let level = contract_clustering(&g, &[5, 5, 5, 9, 9, 9]);
        assert_eq!(level.mapping, vec![0, 0, 0, 1, 1, 1]);
        h.push(level);
        assert_eq!(h.depth(), 1);
        assert_eq!(h.coarsest().vertex_count(), 2);
        let fine = h.pop_and_project(&[3, 4]).unwrap();
        assert_eq!(fine, vec![3, 3, 3, 4, 4, 4]);
        assert!(h.pop_and_project(&fine).is_none());
    }

    #[test]
    fn compact_labels_uses_first_appearance() {
        let mut l = vec![9u32, 4, 9, 7];
        assert_eq!(compact_labels(&mut l), 3);
        assert_eq!(l, vec![0, 1, 0, 2]);
    }
}

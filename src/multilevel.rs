//! One multilevel clustering run: coarsen, cluster the coarsest graph
//! Louvain-style, then project back down with refinement on every level.

use crate::coarsen::{
    self, compact_labels, contract_clustering, CarriedLabels, CoarseningParams, Hierarchy,
};
use crate::graph::Graph;
use crate::label_propagation::{size_constrained_label_propagation, LabelPropagationParams};
use crate::refine::{refine, RefineParams};
use crate::rng::RandomStream;
use log::debug;

#[derive(Debug, Clone, Copy)]
pub struct PipelineParams {
    pub coarsening: CoarseningParams,
    pub refine: RefineParams,
    /// Label propagation contractions applied before matching.
    pub label_propagation_levels: usize,
    pub label_propagation: LabelPropagationParams,
}

/// Where a run starts.
#[derive(Debug, Clone, Copy)]
pub enum Seeding<'a> {
    /// Every vertex alone; coarsening is unconstrained.
    Singletons,
    /// Start from these labels and never contract across them.
    Start(&'a [u32]),
    /// Contract only inside `groups`, start from `start`. Every group must
    /// lie inside one cluster of `start`.
    Constrained { groups: &'a [u32], start: &'a [u32] },
}

/// Clusters `graph` and returns compacted labels.
///
/// When seeded with a start clustering, the result is never worse than the
/// start: contraction keeps modularity of group-respecting clusterings and
/// every refinement move is improving.
pub fn multilevel_cluster(
    graph: &Graph,
    rng: &mut impl RandomStream,
    params: &PipelineParams,
    seeding: Seeding<'_>,
) -> Vec<u32> {
    let n = graph.vertex_count();
    if n == 0 {
        return Vec::new();
    }

    let mut carried = match seeding {
        Seeding::Singletons => CarriedLabels::default(),
        Seeding::Start(labels) => {
            let mut l = labels.to_vec();
            compact_labels(&mut l);
            CarriedLabels {
                groups: Some(l.clone()),
                start: Some(l),
            }
        }
        Seeding::Constrained { groups, start } => CarriedLabels {
            groups: Some(groups.to_vec()),
            start: Some(start.to_vec()),
        },
    };

    let mut hierarchy = Hierarchy::new(graph);

    for _ in 0..params.label_propagation_levels {
        let g = hierarchy.coarsest();
        let mut lp = size_constrained_label_propagation(
            g,
            rng,
            &params.label_propagation,
            carried.groups.as_deref(),
        );
        let k = compact_labels(&mut lp);
        if k == g.vertex_count() {
            break;
        }
        let level = contract_clustering(g, &lp);
        carried.restrict(&level.mapping, k);
        hierarchy.push(level);
    }

    coarsen::coarsen_by_matching(&mut hierarchy, rng, &params.coarsening, &mut carried);
    debug!(
        "coarsest level {} has {} vertices",
        hierarchy.depth(),
        hierarchy.coarsest().vertex_count()
    );

    let mut labels = match carried.start {
        Some(mut s) => {
            compact_labels(&mut s);
            s
        }
        None => (0..hierarchy.coarsest().vertex_count() as u32).collect(),
    };
    loop {
        let g = hierarchy.coarsest();
        refine(g, &mut labels, rng, &params.refine);
        let k = compact_labels(&mut labels);
        if k == g.vertex_count() {
            break;
        }
        let level = contract_clustering(g, &labels);
        hierarchy.push(level);
        labels = (0..k as u32).collect();
    }

    while let Some(projected) = hierarchy.pop_and_project(&labels) {
        labels = projected;
        refine(hierarchy.coarsest(), &mut labels, rng, &params.refine);
    }

    compact_labels(&mut labels);
    labels
}

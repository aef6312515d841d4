use evoclus::coarsen::{contract, project};
use evoclus::modularity::{self, ClusterAccumulators};
use evoclus::multilevel::{multilevel_cluster, PipelineParams, Seeding};
use evoclus::refine::{refine, RefineParams};
use evoclus::rng::SeededRng;
use evoclus::{coarsen, label_propagation, CsrBuilder, Graph};
use proptest::prelude::*;

fn graph_strategy() -> impl Strategy<Value = Graph> {
    (2usize..24).prop_flat_map(|n| {
        let edge = (0..n, 0..n, 1u32..6);
        (Just(n), prop::collection::vec(edge, 0..(3 * n)))
    })
    .prop_map(|(n, edges)| {
        let mut b = CsrBuilder::new(n);
        for (u, v, w) in edges {
            b.add_edge(u, v, w as f64).unwrap();
        }
        b.build().into_graph().unwrap()
    })
}

fn params() -> PipelineParams {
    PipelineParams {
        coarsening: coarsen::CoarseningParams {
            floor: 3,
            min_shrink_ratio: 0.95,
            cluster_upperbound: None,
        },
        refine: RefineParams {
            max_passes: 10,
            cluster_upperbound: None,
        },
        label_propagation_levels: 1,
        label_propagation: label_propagation::LabelPropagationParams {
            iterations: 3,
            upper_bound: u64::MAX,
        },
    }
}

proptest! {
    #[test]
    fn incremental_moves_agree_with_recomputation(
        g in graph_strategy(),
        moves in prop::collection::vec((0usize..64, 0u32..64), 1..40),
    ) {
        let n = g.vertex_count();
        let mut labels: Vec<u32> = (0..n as u32).map(|v| v % 3).collect();
        let mut acc = ClusterAccumulators::new(&g, &labels);
        for (v, to) in moves {
            let v = v % n;
            let to = to % n as u32;
            let before = modularity::full(&g, &labels);
            let delta = acc.delta(&g, &labels, v, to);
            acc.move_vertex_to(&g, &mut labels, v, to);
            let after = modularity::full(&g, &labels);
            prop_assert!((before + delta - after).abs() < 1e-9);
            prop_assert!((acc.quality() - after).abs() < 1e-9);
        }
    }

    #[test]
    fn refinement_never_lowers_modularity(g in graph_strategy(), seed in any::<u64>()) {
        let n = g.vertex_count();
        let mut labels: Vec<u32> = (0..n as u32).map(|v| v / 2).collect();
        let before = modularity::full(&g, &labels);
        let out = refine(&g, &mut labels, &mut SeededRng::new(seed), &params().refine);
        let after = modularity::full(&g, &labels);
        prop_assert!(after >= before - 1e-12);
        prop_assert!((out.modularity - after).abs() < 1e-9);
    }

    #[test]
    fn contraction_keeps_modularity_of_projected_labels(
        g in graph_strategy(),
        groups in prop::collection::vec(0u32..6, 24),
        coarse in prop::collection::vec(0u32..3, 24),
    ) {
        let n = g.vertex_count();
        let mut mapping = groups[..n].to_vec();
        let k = coarsen::compact_labels(&mut mapping);
        let cg = contract(&g, &mapping, k);
        prop_assert!((cg.total_weight() - g.total_weight()).abs() < 1e-9);
        let coarse_labels = &coarse[..k];
        let fine = project(&mapping, coarse_labels);
        let qc = modularity::full(&cg, coarse_labels);
        let qf = modularity::full(&g, &fine);
        prop_assert!((qc - qf).abs() < 1e-9);
    }

    #[test]
    fn pipeline_started_from_a_clustering_keeps_its_quality(
        g in graph_strategy(),
        seed in any::<u64>(),
    ) {
        let n = g.vertex_count();
        let start: Vec<u32> = (0..n as u32).map(|v| v % 4).collect();
        let q0 = modularity::full(&g, &start);
        let labels = multilevel_cluster(&g, &mut SeededRng::new(seed), &params(), Seeding::Start(&start));
        prop_assert_eq!(labels.len(), n);
        prop_assert!(modularity::full(&g, &labels) >= q0 - 1e-9);
    }
}

use evoclus::{modularity, CsrBuilder, EngineConfig, Error, EvictionPolicy, Graph};

fn build(n: usize, edges: &[(usize, usize, f64)]) -> Graph {
    let mut b = CsrBuilder::new(n);
    for &(u, v, w) in edges {
        b.add_edge(u, v, w).unwrap();
    }
    b.build().into_graph().unwrap()
}

fn two_triangles() -> Graph {
    build(
        6,
        &[
            (0, 1, 5.0),
            (1, 2, 5.0),
            (0, 2, 5.0),
            (3, 4, 5.0),
            (4, 5, 5.0),
            (3, 5, 5.0),
            (2, 3, 1.0),
        ],
    )
}

/// `count` cliques of `size` vertices chained into a ring by single edges.
fn ring_of_cliques(count: usize, size: usize) -> Graph {
    let mut edges = Vec::new();
    for c in 0..count {
        let base = c * size;
        for i in 0..size {
            for j in (i + 1)..size {
                edges.push((base + i, base + j, 1.0));
            }
        }
        edges.push((base, ((c + 1) % count) * size + 1, 1.0));
    }
    build(count * size, &edges)
}

fn quick(seed: u64, generations: u64) -> EngineConfig {
    EngineConfig {
        seed,
        time_limit: 60.0,
        suppress_output: true,
        max_generations: Some(generations),
        ..EngineConfig::default()
    }
}

fn assert_valid(graph: &Graph, result: &evoclus::ClusteringResult) {
    assert_eq!(result.clustering.len(), graph.vertex_count());
    assert!(result
        .clustering
        .iter()
        .all(|&l| (l as usize) < result.num_clusters));
    let recomputed = modularity::full(graph, &result.clustering);
    assert!((result.modularity - recomputed).abs() < 1e-9);
}

#[test]
fn two_triangles_are_separated() {
    let g = two_triangles();
    let result = evoclus::cluster_graph(&g, &quick(1, 12)).unwrap();
    assert_valid(&g, &result);
    let c = &result.clustering;
    assert_eq!(c[0], c[1]);
    assert_eq!(c[1], c[2]);
    assert_eq!(c[3], c[4]);
    assert_eq!(c[4], c[5]);
    assert_ne!(c[0], c[3]);
    assert_eq!(result.num_clusters, 2);
    assert!(result.modularity > 0.0);
}

#[test]
fn raw_array_entry_point_matches_the_contract() {
    let vertex_weights = vec![1u64; 6];
    let offsets = vec![0usize, 2, 4, 7, 10, 12, 14];
    let neighbors = vec![1u32, 2, 0, 2, 0, 1, 3, 2, 4, 5, 3, 5, 3, 4];
    let edge_weights = vec![5.0, 5.0, 5.0, 5.0, 5.0, 5.0, 1.0, 1.0, 5.0, 5.0, 5.0, 5.0, 5.0, 5.0];
    let result =
        evoclus::cluster(&vertex_weights, &offsets, &neighbors, &edge_weights, true, 7, 0.2, None)
            .unwrap();
    assert_eq!(result.clustering.len(), 6);
    assert_ne!(result.clustering[0], result.clustering[5]);
    assert!(result.modularity > 0.0);
    assert!(result.generations >= 1);
}

#[test]
fn components_never_share_a_cluster() {
    let g = build(
        6,
        &[
            (0, 1, 1.0),
            (1, 2, 1.0),
            (0, 2, 1.0),
            (3, 4, 1.0),
            (4, 5, 1.0),
            (3, 5, 1.0),
        ],
    );
    let result = evoclus::cluster_graph(&g, &quick(3, 10)).unwrap();
    assert_valid(&g, &result);
    for a in 0..3 {
        for b in 3..6 {
            assert_ne!(result.clustering[a], result.clustering[b]);
        }
    }
}

#[test]
fn edgeless_graph_yields_singletons_and_zero() {
    let g = build(4, &[]);
    let result = evoclus::cluster_graph(&g, &quick(0, 5)).unwrap();
    assert_eq!(result.clustering, vec![0, 1, 2, 3]);
    assert_eq!(result.num_clusters, 4);
    assert_eq!(result.modularity, 0.0);

    let empty = build(0, &[]);
    let result = evoclus::cluster_graph(&empty, &quick(0, 5)).unwrap();
    assert!(result.clustering.is_empty());
    assert_eq!(result.modularity, 0.0);
}

#[test]
fn path_is_valid_and_reproducible() {
    let g = build(5, &[(0, 1, 1.0), (1, 2, 1.0), (2, 3, 1.0), (3, 4, 1.0)]);
    let a = evoclus::cluster_graph(&g, &quick(11, 8)).unwrap();
    let b = evoclus::cluster_graph(&g, &quick(11, 8)).unwrap();
    assert_valid(&g, &a);
    assert!(a.modularity >= 0.0);
    assert_eq!(a, b);
}

#[test]
fn same_seed_gives_bit_identical_results() {
    let g = ring_of_cliques(12, 6);
    let a = evoclus::cluster_graph(&g, &quick(5, 20)).unwrap();
    let b = evoclus::cluster_graph(&g, &quick(5, 20)).unwrap();
    assert_eq!(a.clustering, b.clustering);
    assert_eq!(a.modularity.to_bits(), b.modularity.to_bits());
    assert_eq!(a.generations, 20);
}

#[test]
fn more_generations_never_lose_quality() {
    let g = ring_of_cliques(10, 5);
    let mut previous = f64::NEG_INFINITY;
    for generations in [1, 4, 12, 30] {
        let r = evoclus::cluster_graph(&g, &quick(9, generations)).unwrap();
        assert!(r.modularity >= previous);
        previous = r.modularity;
    }
}

#[test]
fn ring_of_cliques_is_recovered_through_coarsening() {
    let g = ring_of_cliques(16, 5);
    let result = evoclus::cluster_graph(&g, &quick(2, 16)).unwrap();
    assert_valid(&g, &result);
    assert_eq!(result.num_clusters, 16);
    for c in 0..16 {
        for i in 1..5 {
            assert_eq!(result.clustering[c * 5], result.clustering[c * 5 + i]);
        }
    }
}

#[test]
fn cluster_upper_bound_is_respected() {
    let g = ring_of_cliques(6, 6);
    let config = EngineConfig {
        cluster_upperbound: Some(4),
        ..quick(4, 10)
    };
    let result = evoclus::cluster_graph(&g, &config).unwrap();
    assert_valid(&g, &result);
    let mut sizes = vec![0usize; result.num_clusters];
    for &l in &result.clustering {
        sizes[l as usize] += 1;
    }
    assert!(sizes.iter().all(|&s| s <= 4));
}

#[test]
fn raw_array_entry_point_respects_weighted_bound() {
    let g = {
        let mut b = CsrBuilder::new(6);
        for &(u, v) in &[(0, 1), (1, 2), (0, 2), (3, 4), (4, 5), (3, 5)] {
            b.add_edge(u, v, 5.0).unwrap();
        }
        b.add_edge(2, 3, 1.0).unwrap();
        b.set_vertex_weight(0, 3).unwrap();
        b.set_vertex_weight(3, 3).unwrap();
        b.build()
    };
    assert_eq!(g.vertex_weights, vec![3, 1, 1, 3, 1, 1]);

    let result = evoclus::cluster(
        &g.vertex_weights,
        &g.offsets,
        &g.neighbors,
        &g.edge_weights,
        true,
        3,
        0.2,
        Some(4),
    )
    .unwrap();
    let mut weights = vec![0u64; result.num_clusters];
    for (v, &l) in result.clustering.iter().enumerate() {
        weights[l as usize] += g.vertex_weights[v];
    }
    assert!(weights.iter().all(|&w| w <= 4));
    // Triangles weigh 5 each, so neither survives whole.
    assert!(result.num_clusters > 2);
}

#[test]
fn islands_and_diversity_eviction_produce_valid_results() {
    let g = ring_of_cliques(8, 5);
    let config = EngineConfig {
        threads: 3,
        eviction: EvictionPolicy::MostSimilar,
        ..quick(6, 12)
    };
    let a = evoclus::cluster_graph(&g, &config).unwrap();
    let b = evoclus::cluster_graph(&g, &config).unwrap();
    assert_valid(&g, &a);
    assert_eq!(a.clustering, b.clustering);
    assert_eq!(a.generations, 36);
}

#[test]
fn deadline_bounds_the_run() {
    let g = ring_of_cliques(6, 4);
    let config = EngineConfig {
        seed: 1,
        time_limit: 0.05,
        suppress_output: true,
        ..EngineConfig::default()
    };
    let start = std::time::Instant::now();
    let result = evoclus::cluster_graph(&g, &config).unwrap();
    assert!(result.generations >= 1);
    assert!(start.elapsed().as_secs_f64() < 5.0);
    assert_valid(&g, &result);
}

#[test]
fn invalid_time_limits_fail_before_work() {
    let g = two_triangles();
    for t in [0.0, -2.0, f64::NAN] {
        let config = EngineConfig {
            time_limit: t,
            ..EngineConfig::default()
        };
        let err = evoclus::cluster_graph(&g, &config).unwrap_err();
        assert!(matches!(err, Error::InvalidParameter { name: "time_limit", .. }));
    }
}

#[test]
fn malformed_arrays_are_invalid_graphs() {
    // Offsets do not cover the neighbor list.
    let err = evoclus::cluster(&[1, 1], &[0, 1, 1], &[1, 0], &[1.0, 1.0], true, 0, 1.0, None).unwrap_err();
    assert!(matches!(err, Error::InvalidGraph { .. }));
    // Missing mirror entry.
    let err = evoclus::cluster(&[1, 1], &[0, 1, 1], &[1], &[1.0], true, 0, 1.0, None).unwrap_err();
    assert!(matches!(err, Error::InvalidGraph { .. }));
    // Neighbor out of range.
    let err = evoclus::cluster(&[1, 1], &[0, 1, 2], &[5, 0], &[1.0, 1.0], true, 0, 1.0, None).unwrap_err();
    assert!(matches!(err, Error::InvalidGraph { .. }));
}

#[test]
fn evaluate_checks_partition_length() {
    let g = two_triangles();
    let q = evoclus::evaluate(&g, &[0, 0, 0, 1, 1, 1]).unwrap();
    assert!((q - (60.0 / 62.0 - 0.5)).abs() < 1e-12);
    assert!(evoclus::evaluate(&g, &[0, 0]).is_err());
}

use crate::error::{Error, Result};
use crate::graph::Graph;
use rustc_hash::FxHashMap;

/// The raw arrays accepted by the engine entry point.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CsrArrays {
    pub vertex_weights: Vec<u64>,
    pub offsets: Vec<usize>,
    pub neighbors: Vec<u32>,
    pub edge_weights: Vec<f64>,
}

impl CsrArrays {
    pub fn vertex_count(&self) -> usize {
        self.vertex_weights.len()
    }

    pub fn into_graph(self) -> Result<Graph> {
        Graph::from_csr(
            self.vertex_weights,
            self.offsets,
            self.neighbors,
            self.edge_weights,
        )
    }
}

/// What to do when the same undirected edge is added twice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DuplicatePolicy {
    #[default]
    Sum,
    LastWins,
}

/// Collects an undirected edge set and emits symmetric CSR arrays with
/// neighbor lists sorted by index.
#[derive(Debug, Clone)]
pub struct CsrBuilder {
    vertex_weights: Vec<u64>,
    edges: FxHashMap<(u32, u32), f64>,
    policy: DuplicatePolicy,
}

impl CsrBuilder {
    pub fn new(vertex_count: usize) -> Self {
        Self {
            vertex_weights: vec![1; vertex_count],
            edges: FxHashMap::default(),
            policy: DuplicatePolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: DuplicatePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn set_vertex_weight(&mut self, v: usize, weight: u64) -> Result<()> {
        let n = self.vertex_weights.len();
        let slot = self.vertex_weights.get_mut(v).ok_or_else(|| {
            Error::invalid_graph(format!("vertex {} outside 0..{}", v, n))
        })?;
        *slot = weight;
        Ok(())
    }

    pub fn add_edge(&mut self, u: usize, v: usize, weight: f64) -> Result<()> {
        let n = self.vertex_weights.len();
        if u >= n || v >= n {
            return Err(Error::invalid_graph(format!(
                "edge ({}, {}) references a vertex outside 0..{}",
                u, v, n
            )));
        }
        let key = if u <= v {
            (u as u32, v as u32)
        } else {
            (v as u32, u as u32)
        };
        match self.policy {
            DuplicatePolicy::Sum => *self.edges.entry(key).or_insert(0.0) += weight,
            DuplicatePolicy::LastWins => {
                self.edges.insert(key, weight);
            }
        }
        Ok(())
    }

    pub fn build(self) -> CsrArrays {
        let n = self.vertex_weights.len();
        let mut edges: Vec<((u32, u32), f64)> = self.edges.into_iter().collect();
        edges.sort_unstable_by(|a, b| a.0.cmp(&b.0));

        let mut counts = vec![0usize; n];
        for &((u, v), _) in edges.iter() {
            counts[u as usize] += 1;
            if u != v {
                counts[v as usize] += 1;
            }
        }
        let mut offsets = vec![0usize; n + 1];
        for i in 0..n {
            offsets[i + 1] = offsets[i] + counts[i];
        }

        let total = offsets[n];
        let mut neighbors = vec![0u32; total];
        let mut edge_weights = vec![0.0f64; total];
        let mut fill = offsets[..n].to_vec();
        let mut push = |from: u32, to: u32, w: f64| {
            let pos = fill[from as usize];
            neighbors[pos] = to;
            edge_weights[pos] = w;
            fill[from as usize] += 1;
        };
        for &((u, v), w) in edges.iter() {
            push(u, v, w);
            if u != v {
                push(v, u, w);
            }
        }

        // Lists are filled in (min, max) order; sort each one by neighbor.
        for i in 0..n {
            let range = offsets[i]..offsets[i + 1];
            let mut pairs: Vec<(u32, f64)> = neighbors[range.clone()]
                .iter()
                .copied()
                .zip(edge_weights[range.clone()].iter().copied())
                .collect();
            pairs.sort_unstable_by_key(|p| p.0);
            for (k, (nb, w)) in pairs.into_iter().enumerate() {
                neighbors[range.start + k] = nb;
                edge_weights[range.start + k] = w;
            }
        }

        CsrArrays {
            vertex_weights: self.vertex_weights,
            offsets,
            neighbors,
            edge_weights,
        }
    }
}

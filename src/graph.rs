use crate::error::{Error, Result};
use rustc_hash::FxHashMap;

const SYMMETRY_TOLERANCE: f64 = 1e-9;

/// Immutable undirected graph in compressed adjacency form.
///
/// Neighbor lists never contain the vertex itself: self-loop weight is kept
/// per vertex in `self_loop` and counts as the diagonal entry `A_vv`, so it
/// contributes to the weighted degree and to the total weight `W = 2m + Σ A_vv`.
#[derive(Debug, Clone)]
pub struct Graph {
    vertex_weight: Vec<u64>,
    offsets: Vec<usize>,
    neighbors: Vec<u32>,
    edge_weight: Vec<f64>,
    self_loop: Vec<f64>,
    weighted_degree: Vec<f64>,
    total_weight: f64,
    total_vertex_weight: u64,
}

impl Graph {
    /// Validates CSR arrays and builds the graph.
    ///
    /// `offsets` must have length `n + 1`, start at 0 and be non-decreasing;
    /// `neighbors` and `edge_weight` have length `offsets[n]`. Every entry
    /// `(i, j, w)` needs a mirror entry `(j, i, w)`. An entry `(i, i, w)` is a
    /// self-loop of weight `w`.
    pub fn from_csr(
        vertex_weight: Vec<u64>,
        offsets: Vec<usize>,
        neighbors: Vec<u32>,
        edge_weight: Vec<f64>,
    ) -> Result<Self> {
        let n = vertex_weight.len();
        if n > u32::MAX as usize {
            return Err(Error::invalid_graph(format!(
                "{} vertices exceed the supported maximum",
                n
            )));
        }
        if offsets.len() != n + 1 {
            return Err(Error::invalid_graph(format!(
                "offset array has length {}, expected {} (vertex count + 1)",
                offsets.len(),
                n + 1
            )));
        }
        if offsets[0] != 0 {
            return Err(Error::invalid_graph(format!(
                "offset array must start at 0, found {}",
                offsets[0]
            )));
        }
        if let Some(i) = (0..n).find(|&i| offsets[i + 1] < offsets[i]) {
            return Err(Error::invalid_graph(format!(
                "offset array decreases at vertex {} ({} > {})",
                i,
                offsets[i],
                offsets[i + 1]
            )));
        }
        let entries = offsets[n];
        if neighbors.len() != entries || edge_weight.len() != entries {
            return Err(Error::invalid_graph(format!(
                "offsets end at {} but neighbor list has {} and edge weight list {} entries",
                entries,
                neighbors.len(),
                edge_weight.len()
            )));
        }
        if let Some(v) = vertex_weight.iter().position(|&w| w == 0) {
            return Err(Error::invalid_graph(format!(
                "vertex {} has weight 0; vertex weights must be positive",
                v
            )));
        }

        let mut seen_stamp = vec![u32::MAX; n];
        let mut self_loop = vec![0.0f64; n];
        let mut has_self_loops = false;
        let mut upper: FxHashMap<(u32, u32), f64> = FxHashMap::default();

        for i in 0..n {
            for e in offsets[i]..offsets[i + 1] {
                let j = neighbors[e];
                let w = edge_weight[e];
                if j as usize >= n {
                    return Err(Error::invalid_graph(format!(
                        "vertex {} lists neighbor {} outside 0..{}",
                        i, j, n
                    )));
                }
                if !w.is_finite() || w < 0.0 {
                    return Err(Error::invalid_graph(format!(
                        "edge ({}, {}) has weight {}; weights must be finite and non-negative",
                        i, j, w
                    )));
                }
                if seen_stamp[j as usize] == i as u32 {
                    return Err(Error::invalid_graph(format!(
                        "vertex {} lists neighbor {} more than once",
                        i, j
                    )));
                }
                seen_stamp[j as usize] = i as u32;

                let src = i as u32;
                if j == src {
                    self_loop[i] += w;
                    has_self_loops = true;
                } else if src < j {
                    upper.insert((src, j), w);
                }
            }
        }

        for i in 0..n {
            for e in offsets[i]..offsets[i + 1] {
                let j = neighbors[e];
                let src = i as u32;
                if j >= src {
                    continue;
                }
                let w = edge_weight[e];
                match upper.remove(&(j, src)) {
                    Some(mirror) if weights_match(mirror, w) => {}
                    Some(mirror) => {
                        return Err(Error::invalid_graph(format!(
                            "asymmetric weight: ({}, {}) = {} but ({}, {}) = {}",
                            j, i, mirror, i, j, w
                        )));
                    }
                    None => {
                        return Err(Error::invalid_graph(format!(
                            "asymmetric adjacency: {} lists {} but {} does not list {}",
                            i, j, j, i
                        )));
                    }
                }
            }
        }
        if let Some((&(i, j), _)) = upper.iter().min_by_key(|(k, _)| **k) {
            return Err(Error::invalid_graph(format!(
                "asymmetric adjacency: {} lists {} but {} does not list {}",
                i, j, j, i
            )));
        }

        if !has_self_loops {
            return Ok(Self::from_parts(
                vertex_weight,
                offsets,
                neighbors,
                edge_weight,
                self_loop,
            ));
        }

        // Strip diagonal entries out of the neighbor lists.
        let mut new_offsets = vec![0usize; n + 1];
        let mut new_neighbors = Vec::with_capacity(entries);
        let mut new_weights = Vec::with_capacity(entries);
        for i in 0..n {
            for e in offsets[i]..offsets[i + 1] {
                if neighbors[e] as usize != i {
                    new_neighbors.push(neighbors[e]);
                    new_weights.push(edge_weight[e]);
                }
            }
            new_offsets[i + 1] = new_neighbors.len();
        }
        Ok(Self::from_parts(
            vertex_weight,
            new_offsets,
            new_neighbors,
            new_weights,
            self_loop,
        ))
    }

    /// Assembles a graph from arrays already known to be consistent
    /// (symmetric, no diagonal entries). Used by contraction.
    pub(crate) fn from_parts(
        vertex_weight: Vec<u64>,
        offsets: Vec<usize>,
        neighbors: Vec<u32>,
        edge_weight: Vec<f64>,
        self_loop: Vec<f64>,
    ) -> Self {
        let n = vertex_weight.len();
        let mut weighted_degree = vec![0.0f64; n];
        let mut total_weight = 0.0;
        for v in 0..n {
            let mut d = self_loop[v];
            for e in offsets[v]..offsets[v + 1] {
                d += edge_weight[e];
            }
            weighted_degree[v] = d;
            total_weight += d;
        }
        let total_vertex_weight = vertex_weight.iter().sum();

        Self {
            vertex_weight,
            offsets,
            neighbors,
            edge_weight,
            self_loop,
            weighted_degree,
            total_weight,
            total_vertex_weight,
        }
    }

    #[inline]
    pub fn vertex_count(&self) -> usize {
        self.vertex_weight.len()
    }

    #[inline]
    pub fn entry_count(&self) -> usize {
        self.neighbors.len()
    }

    #[inline]
    pub fn vertex_weight(&self, v: usize) -> u64 {
        self.vertex_weight[v]
    }

    #[inline]
    pub fn vertex_weights(&self) -> &[u64] {
        &self.vertex_weight
    }

    #[inline]
    pub fn total_vertex_weight(&self) -> u64 {
        self.total_vertex_weight
    }

    #[inline]
    pub fn degree(&self, v: usize) -> usize {
        self.offsets[v + 1] - self.offsets[v]
    }

    #[inline]
    pub fn weighted_degree(&self, v: usize) -> f64 {
        self.weighted_degree[v]
    }

    #[inline]
    pub fn self_loop(&self, v: usize) -> f64 {
        self.self_loop[v]
    }

    #[inline]
    pub fn neighbor_range(&self, v: usize) -> std::ops::Range<usize> {
        self.offsets[v]..self.offsets[v + 1]
    }

    #[inline]
    pub fn neighbor(&self, e: usize) -> u32 {
        self.neighbors[e]
    }

    #[inline]
    pub fn edge_weight(&self, e: usize) -> f64 {
        self.edge_weight[e]
    }

    #[inline]
    pub fn neighbors(&self, v: usize) -> impl Iterator<Item = (u32, f64)> + '_ {
        let range = self.neighbor_range(v);
        self.neighbors[range.clone()]
            .iter()
            .copied()
            .zip(self.edge_weight[range].iter().copied())
    }

    /// `W`, twice the total edge weight.
    #[inline]
    pub fn total_weight(&self) -> f64 {
        self.total_weight
    }

    #[inline]
    pub fn total_edge_weight(&self) -> f64 {
        self.total_weight / 2.0
    }
}

#[inline]
fn weights_match(a: f64, b: f64) -> bool {
    (a - b).abs() <= SYMMETRY_TOLERANCE * a.abs().max(b.abs())
}

//! Fixed-capacity pool of clusterings ordered by modularity.

use crate::graph::Graph;
use crate::modularity;
use crate::rng::RandomStream;
use std::cmp::Ordering;
use std::str::FromStr;

/// Which member makes room for a new child once the pool is full.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EvictionPolicy {
    /// The member with the lowest modularity.
    #[default]
    Worst,
    /// Among members not better than the child, the one whose cut edges
    /// differ least from the child's.
    MostSimilar,
}

impl FromStr for EvictionPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "worst" => Ok(Self::Worst),
            "most_similar" => Ok(Self::MostSimilar),
            other => Err(format!("unknown eviction policy '{}'", other)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Individual {
    pub labels: Vec<u32>,
    pub modularity: f64,
    /// Sorted adjacency entries whose endpoints lie in different clusters.
    cut_edges: Vec<u32>,
}

impl Individual {
    pub fn new(graph: &Graph, labels: Vec<u32>) -> Self {
        let modularity = modularity::full(graph, &labels);
        let mut cut_edges = Vec::new();
        for v in 0..graph.vertex_count() {
            for e in graph.neighbor_range(v) {
                if labels[v] != labels[graph.neighbor(e) as usize] {
                    cut_edges.push(e as u32);
                }
            }
        }
        Self {
            labels,
            modularity,
            cut_edges,
        }
    }

    /// Size of the symmetric difference of both cut-edge sets.
    pub fn distance(&self, other: &Individual) -> usize {
        let (a, b) = (&self.cut_edges, &other.cut_edges);
        let (mut i, mut j, mut diff) = (0, 0, 0);
        while i < a.len() && j < b.len() {
            match a[i].cmp(&b[j]) {
                Ordering::Less => {
                    diff += 1;
                    i += 1;
                }
                Ordering::Greater => {
                    diff += 1;
                    j += 1;
                }
                Ordering::Equal => {
                    i += 1;
                    j += 1;
                }
            }
        }
        diff + (a.len() - i) + (b.len() - j)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Insertion {
    Added,
    /// Replaced a member; carries its position before the replacement.
    Replaced(usize),
    Rejected,
}

#[derive(Debug)]
pub struct Population {
    /// Descending by modularity; equal scores keep insertion order.
    members: Vec<Individual>,
    capacity: usize,
    policy: EvictionPolicy,
}

impl Population {
    pub fn new(capacity: usize, policy: EvictionPolicy) -> Self {
        Self {
            members: Vec::with_capacity(capacity + 1),
            capacity,
            policy,
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.members.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    #[inline]
    pub fn is_full(&self) -> bool {
        self.members.len() >= self.capacity
    }

    pub fn members(&self) -> &[Individual] {
        &self.members
    }

    /// Highest modularity ever inserted; the best member is never evicted.
    pub fn best(&self) -> Option<&Individual> {
        self.members.first()
    }

    fn insert_sorted(&mut self, child: Individual) -> usize {
        let pos = self
            .members
            .partition_point(|m| m.modularity >= child.modularity);
        self.members.insert(pos, child);
        pos
    }

    pub fn insert(&mut self, child: Individual) -> Insertion {
        if !self.is_full() {
            self.insert_sorted(child);
            return Insertion::Added;
        }
        let worst = match self.members.last() {
            Some(w) => w.modularity,
            None => return Insertion::Rejected,
        };
        if child.modularity < worst {
            return Insertion::Rejected;
        }
        match self.policy {
            EvictionPolicy::Worst => {
                let evicted = self.members.len() - 1;
                let pos = self.insert_sorted(child);
                self.members.pop();
                if pos > evicted {
                    return Insertion::Rejected;
                }
                Insertion::Replaced(evicted)
            }
            EvictionPolicy::MostSimilar => {
                let mut victim = None;
                let mut closest = usize::MAX;
                for (i, m) in self.members.iter().enumerate() {
                    if m.modularity > child.modularity {
                        continue;
                    }
                    let d = m.distance(&child);
                    if d < closest {
                        closest = d;
                        victim = Some(i);
                    }
                }
                match victim {
                    Some(i) => {
                        self.members.remove(i);
                        self.insert_sorted(child);
                        Insertion::Replaced(i)
                    }
                    None => Insertion::Rejected,
                }
            }
        }
    }

    /// Binary tournament: the fitter of two distinct random members.
    pub fn tournament(&self, rng: &mut impl RandomStream) -> usize {
        let n = self.members.len();
        if n < 2 {
            return 0;
        }
        let a = rng.next_below(n);
        let mut b = rng.next_below(n - 1);
        if b >= a {
            b += 1;
        }
        // Members are sorted, so the lower index is at least as fit.
        a.min(b)
    }

    /// Two parents from independent tournaments, distinct when possible.
    pub fn select_parents(&self, rng: &mut impl RandomStream) -> (usize, usize) {
        let first = self.tournament(rng);
        let mut second = self.tournament(rng);
        for _ in 0..4 {
            if second != first {
                break;
            }
            second = self.tournament(rng);
        }
        if second == first && self.members.len() > 1 {
            second = if first == 0 { 1 } else { 0 };
        }
        (first, second)
    }

    #[inline]
    pub fn get(&self, i: usize) -> &Individual {
        &self.members[i]
    }
}

//! Time-bounded modularity clustering of weighted undirected graphs with an
//! evolutionary population of multilevel (coarsen, refine, uncoarsen) runs.

pub mod cli;
pub mod coarsen;
pub mod config;
pub mod csr;
pub mod engine;
pub mod error;
pub mod evolution;
pub mod graph;
pub mod label_propagation;
pub mod modularity;
pub mod multilevel;
pub mod parser;
pub mod population;
pub mod refine;
pub mod rng;

pub use config::EngineConfig;
pub use csr::{CsrArrays, CsrBuilder, DuplicatePolicy};
pub use engine::{cluster, cluster_csr, cluster_graph, evaluate, ClusteringResult};
pub use error::{Error, Result};
pub use graph::Graph;
pub use population::EvictionPolicy;

use crate::error::{Error, Result};
use crate::population::EvictionPolicy;
use std::path::PathBuf;

/// Tuning of one engine invocation.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub seed: u64,
    /// Wall-clock budget in seconds, checked between generations.
    pub time_limit: f64,
    pub suppress_output: bool,
    pub pool_size: usize,
    /// Stop after this many generations even if time is left.
    pub max_generations: Option<u64>,
    /// Independent islands; 1 keeps the run on a single random stream.
    pub threads: usize,
    /// Maximum total vertex weight of a cluster.
    pub cluster_upperbound: Option<u64>,
    pub mutate_fraction: f64,
    pub max_refine_passes: usize,
    pub coarsening_floor: usize,
    pub min_shrink_ratio: f64,
    pub label_propagation_iterations: usize,
    pub eviction: EvictionPolicy,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            seed: 0,
            time_limit: 1.0,
            suppress_output: false,
            pool_size: 8,
            max_generations: None,
            threads: 1,
            cluster_upperbound: None,
            mutate_fraction: 0.1,
            max_refine_passes: 10,
            coarsening_floor: 32,
            min_shrink_ratio: 0.95,
            label_propagation_iterations: 3,
            eviction: EvictionPolicy::Worst,
        }
    }
}

impl EngineConfig {
    pub fn validate(&self) -> Result<()> {
        if !self.time_limit.is_finite() || self.time_limit <= 0.0 {
            return Err(Error::invalid_parameter(
                "time_limit",
                format!("must be a positive number of seconds, got {}", self.time_limit),
            ));
        }
        if self.pool_size < 2 {
            return Err(Error::invalid_parameter(
                "pool_size",
                format!("must be at least 2, got {}", self.pool_size),
            ));
        }
        if self.threads == 0 {
            return Err(Error::invalid_parameter("threads", "must be at least 1"));
        }
        if !(self.mutate_fraction > 0.0 && self.mutate_fraction <= 1.0) {
            return Err(Error::invalid_parameter(
                "mutate_fraction",
                format!("must lie in (0, 1], got {}", self.mutate_fraction),
            ));
        }
        if !(self.min_shrink_ratio > 0.0 && self.min_shrink_ratio <= 1.0) {
            return Err(Error::invalid_parameter(
                "min_shrink_ratio",
                format!("must lie in (0, 1], got {}", self.min_shrink_ratio),
            ));
        }
        if self.max_refine_passes == 0 {
            return Err(Error::invalid_parameter(
                "max_refine_passes",
                "must be at least 1",
            ));
        }
        if self.cluster_upperbound == Some(0) {
            return Err(Error::invalid_parameter(
                "cluster_upperbound",
                "must be positive",
            ));
        }
        Ok(())
    }
}

/// Everything the command line controls.
#[derive(Debug, Clone)]
pub struct Config {
    pub graph_file: PathBuf,
    pub output_filename: PathBuf,
    /// Evaluate this partition instead of clustering.
    pub input_partition: Option<PathBuf>,
    pub print_clustering: bool,
    pub engine: EngineConfig,
}

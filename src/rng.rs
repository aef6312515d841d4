use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

/// Every random decision of the engine is drawn from one of these streams;
/// nothing reads process-wide randomness.
pub trait RandomStream {
    /// Uniform integer in `0..bound`. `bound` must be non-zero.
    fn next_below(&mut self, bound: usize) -> usize;

    /// Uniform float in `[0, 1)`.
    fn next_f64(&mut self) -> f64;

    #[inline]
    fn next_bool(&mut self) -> bool {
        self.next_below(2) == 1
    }

    /// Uniform integer in `low..=high`; returns `low` when the range is empty.
    #[inline]
    fn next_in_range(&mut self, low: usize, high: usize) -> usize {
        if high <= low {
            return low;
        }
        low + self.next_below(high - low + 1)
    }

    /// Uniform float in `[low, high)`.
    #[inline]
    fn next_f64_in(&mut self, low: f64, high: f64) -> f64 {
        low + (high - low) * self.next_f64()
    }

    /// Fills `out` with a uniformly random permutation of `0..out.len()`.
    fn randomized_index_vector(&mut self, out: &mut [u32]) {
        for (i, slot) in out.iter_mut().enumerate() {
            *slot = i as u32;
        }
        let size = out.len();
        for i in 0..size {
            let j = i + self.next_below(size - i);
            out.swap(i, j);
        }
    }
}

#[derive(Debug, Clone)]
pub struct SeededRng {
    rng: SmallRng,
}

impl SeededRng {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: SmallRng::seed_from_u64(seed),
        }
    }

    /// Stream for island `island` of a run seeded with `seed`. Island 0 gets `seed` itself.
    pub fn for_island(seed: u64, island: usize) -> Self {
        Self::new(seed ^ island as u64)
    }
}

impl RandomStream for SeededRng {
    #[inline]
    fn next_below(&mut self, bound: usize) -> usize {
        self.rng.gen_range(0..bound)
    }

    #[inline]
    fn next_f64(&mut self) -> f64 {
        self.rng.gen::<f64>()
    }
}

/// Stream that always returns the lowest value: identity permutations, first
/// choices. Pins traversal orders when a test needs them.
#[derive(Debug, Clone, Copy, Default)]
pub struct SequentialStream;

impl RandomStream for SequentialStream {
    #[inline]
    fn next_below(&mut self, _bound: usize) -> usize {
        0
    }

    #[inline]
    fn next_f64(&mut self) -> f64 {
        0.0
    }
}

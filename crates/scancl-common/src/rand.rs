pub use rand::{Rng, SeedableRng, rngs::StdRng};

use rand::distr::{Distribution, StandardUniform};

/// Returns a random number generator seeded from a fixed value, for reproducible problems.
#[inline(always)]
pub fn get_seeded_rng(seed: u64) -> StdRng {
    StdRng::seed_from_u64(seed)
}

/// Generates `len` random values from a seeded generator.
pub fn random_values<T>(seed: u64, len: usize) -> Vec<T>
where
    StandardUniform: Distribution<T>,
{
    get_seeded_rng(seed)
        .sample_iter(StandardUniform)
        .take(len)
        .collect()
}

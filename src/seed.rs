// Nightshift — Per-prompt seed derivation

use rand::Rng;

/// Distance between the base seeds of neighbouring prompt indices.
pub const SEED_STRIDE: u64 = 100_003;

/// Upper bound (inclusive) of the random jitter added to each seed.
pub const MAX_JITTER: u64 = 999;

/// Seed for the prompt at `index`: `(index + 1) * SEED_STRIDE + jitter`.
///
/// Jitter is clamped to `MAX_JITTER`, which keeps seeds strictly increasing
/// with index.
pub fn derive_seed(index: usize, jitter: u64) -> u64 {
    (index as u64 + 1) * SEED_STRIDE + jitter.min(MAX_JITTER)
}

/// Draw a fresh jitter value in `0..=MAX_JITTER`.
pub fn random_jitter<R: Rng>(rng: &mut R) -> u64 {
    rng.random_range(0..=MAX_JITTER)
}

/// Derive a seed using the thread-local RNG.
pub fn seed_for(index: usize) -> u64 {
    derive_seed(index, random_jitter(&mut rand::rng()))
}

//! Deterministic seeding and digests
//!
//! Everything random or hashed in the campaign core must reproduce
//! bit-for-bit across runs and platforms, so seeds and digests come from
//! a fixed FNV-1a fold instead of the process-randomized default hasher.

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::hash::Hasher;

/// FNV-1a 64-bit hasher with a stable output across runs.
#[derive(Debug)]
pub struct FnvHasher {
    state: u64,
}

impl FnvHasher {
    const OFFSET_BASIS: u64 = 0xcbf29ce484222325;
    const PRIME: u64 = 0x100000001b3;

    pub fn new() -> Self {
        Self {
            state: Self::OFFSET_BASIS,
        }
    }
}

impl Default for FnvHasher {
    fn default() -> Self {
        Self::new()
    }
}

impl Hasher for FnvHasher {
    fn finish(&self) -> u64 {
        self.state
    }

    fn write(&mut self, bytes: &[u8]) {
        for &byte in bytes {
            self.state ^= u64::from(byte);
            self.state = self.state.wrapping_mul(Self::PRIME);
        }
    }
}

/// Folds bytes into a stable 64-bit value.
pub fn fnv64(bytes: &[u8]) -> u64 {
    let mut hasher = FnvHasher::new();
    hasher.write(bytes);
    hasher.finish()
}

/// Derives the turn RNG from a caller-supplied seed string.
pub fn rng_from_seed(seed: &str) -> ChaCha8Rng {
    ChaCha8Rng::seed_from_u64(fnv64(seed.as_bytes()))
}

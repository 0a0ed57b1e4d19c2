//! Deterministic seeded inference double.
//!
//! # Responsibility
//! - Provide stable, artifact-free placements for tests and the
//!   synthetic-atlas generator.
//!
//! # Invariants
//! - Same seed + same text always yields the same coordinate.
//! - Output stays inside the [0, 1] display range on both axes.
//!
//! Not part of the production inference contract; production inserts go
//! through `InferencePipeline`.

use crate::inference::pipeline::CoordinateInference;
use crate::inference::InferenceResult;
use crate::model::node::Coordinate;

const FNV_OFFSET_BASIS: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

/// Hash-of-text placement with a fixed seed.
#[derive(Debug, Clone, Copy)]
pub struct SeededInference {
    seed: u64,
}

impl SeededInference {
    pub fn new(seed: u64) -> Self {
        Self { seed }
    }
}

impl Default for SeededInference {
    fn default() -> Self {
        Self::new(0)
    }
}

impl CoordinateInference for SeededInference {
    fn infer(&self, text: &str) -> InferenceResult<Coordinate> {
        let hash = fnv1a(self.seed, text.as_bytes());
        // Split the hash into two 32-bit lanes, one per axis.
        let x = f64::from((hash >> 32) as u32) / f64::from(u32::MAX);
        let y = f64::from(hash as u32) / f64::from(u32::MAX);
        Ok(Coordinate::new(x, y))
    }
}

fn fnv1a(seed: u64, bytes: &[u8]) -> u64 {
    let mut hash = FNV_OFFSET_BASIS ^ seed;
    for byte in bytes {
        hash ^= u64::from(*byte);
        hash = hash.wrapping_mul(FNV_PRIME);
    }
    hash
}

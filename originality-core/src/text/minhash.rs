//! MinHash sketches for Jaccard estimation over shingle sets.
//!
//! Each of the `n` permutations is the universal hash
//! `((a * h + b) mod (2^61 - 1)) & (2^32 - 1)` applied to a 32-bit token hash
//! `h`. The sketch keeps the minimum per permutation; the share of equal
//! positions between two sketches estimates the Jaccard similarity of the
//! underlying sets. Permutation parameters are derived from a seed, so only
//! sketches built with the same seed and length are comparable.

use serde::{Deserialize, Serialize};
use sha3::{Digest, Sha3_256};

use crate::error::{OriginalityError, Result};
use crate::store::{decode_blob, encode_blob};

/// Number of permutations per sketch.
pub const NUM_PERMUTATIONS: usize = 128;

/// Default permutation seed.
pub const DEFAULT_SEED: u64 = 1;

const MERSENNE_PRIME: u64 = (1 << 61) - 1;
const MAX_HASH: u64 = (1 << 32) - 1;

/// Seeded family of permutations.
#[derive(Debug, Clone)]
pub struct MinHasher {
    seed: u64,
    permutations: Vec<(u64, u64)>,
}

impl MinHasher {
    pub fn new(num_permutations: usize, seed: u64) -> Self {
        let permutations = (0..num_permutations as u64)
            .map(|i| {
                // a must be non-zero for the map to be a permutation.
                let a = derive_parameter(seed, i, b"a") % (MERSENNE_PRIME - 1) + 1;
                let b = derive_parameter(seed, i, b"b") % MERSENNE_PRIME;
                (a, b)
            })
            .collect();
        Self { seed, permutations }
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn num_permutations(&self) -> usize {
        self.permutations.len()
    }

    /// Start an empty sketch.
    pub fn sketch(&self) -> MinHashSignature {
        MinHashSignature {
            seed: self.seed,
            values: vec![MAX_HASH; self.permutations.len()],
        }
    }

    /// Fold one token into `signature`.
    pub fn update(&self, signature: &mut MinHashSignature, token: &[u8]) {
        let h = token_hash(token);
        for (value, &(a, b)) in signature.values.iter_mut().zip(&self.permutations) {
            let permuted = ((mul_mod(a, h) + b) % MERSENNE_PRIME) & MAX_HASH;
            if permuted < *value {
                *value = permuted;
            }
        }
    }

    /// Sketch a whole token set.
    pub fn signature<I, T>(&self, tokens: I) -> MinHashSignature
    where
        I: IntoIterator<Item = T>,
        T: AsRef<[u8]>,
    {
        let mut signature = self.sketch();
        for token in tokens {
            self.update(&mut signature, token.as_ref());
        }
        signature
    }
}

impl Default for MinHasher {
    fn default() -> Self {
        Self::new(NUM_PERMUTATIONS, DEFAULT_SEED)
    }
}

/// Stored MinHash sketch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MinHashSignature {
    pub seed: u64,
    pub values: Vec<u64>,
}

impl MinHashSignature {
    /// Estimated Jaccard similarity in `[0, 1]`.
    ///
    /// Errors when the sketches were built with a different seed or length.
    pub fn jaccard(&self, other: &Self) -> Result<f64> {
        if self.seed != other.seed {
            return Err(OriginalityError::DecodeError(format!(
                "minhash seed mismatch: {} vs {}",
                self.seed, other.seed
            )));
        }
        if self.values.len() != other.values.len() || self.values.is_empty() {
            return Err(OriginalityError::DecodeError(format!(
                "minhash length mismatch: {} vs {}",
                self.values.len(),
                other.values.len()
            )));
        }
        let equal = self
            .values
            .iter()
            .zip(&other.values)
            .filter(|(a, b)| a == b)
            .count();
        Ok(equal as f64 / self.values.len() as f64)
    }

    pub fn to_blob(&self) -> Result<Vec<u8>> {
        encode_blob(self)
    }

    pub fn from_blob(bytes: &[u8]) -> Result<Self> {
        decode_blob(bytes)
    }
}

/// First four bytes of SHA3-256, little-endian.
fn token_hash(token: &[u8]) -> u64 {
    let digest = Sha3_256::digest(token);
    u64::from(u32::from_le_bytes([digest[0], digest[1], digest[2], digest[3]]))
}

fn derive_parameter(seed: u64, index: u64, tag: &[u8]) -> u64 {
    let mut hasher = Sha3_256::new();
    hasher.update(seed.to_le_bytes());
    hasher.update(index.to_le_bytes());
    hasher.update(tag);
    let digest = hasher.finalize();
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&digest[..8]);
    u64::from_le_bytes(bytes)
}

fn mul_mod(a: u64, h: u64) -> u64 {
    ((u128::from(a) * u128::from(h)) % u128::from(MERSENNE_PRIME)) as u64
}

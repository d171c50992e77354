//! Perceptual hashing for images.
//!
//! Produces fixed-length bit signatures that stay close (in Hamming distance)
//! for visually similar images, so re-encoded, resized or lightly edited
//! copies of a registered image still match.
//!
//! # Algorithms
//!
//! - `PHash` (default): DCT over a downscaled grayscale image, bits set by
//!   comparison with the median coefficient. 64 bits.
//! - `Blockhash64`: grid-based mean comparison. 64 bits.
//!
//! ```no_run
//! use originality_core::image::{decode_image, HashAlgorithm, PerceptualHasher};
//!
//! # fn example() -> originality_core::Result<()> {
//! let hasher = PerceptualHasher::new(HashAlgorithm::PHash);
//! let hash1 = hasher.hash_image(&decode_image(&std::fs::read("image.jpg")?)?)?;
//! let hash2 = hasher.hash_image(&decode_image(&std::fs::read("image2.jpg")?)?)?;
//! let similar = hash1.hamming_distance(&hash2)? < 10;
//! # Ok(())
//! # }
//! ```

use blockhash::{blockhash64, Blockhash64};
use image::DynamicImage;
use image_hasher::{HashAlg, HasherConfig};
use serde::{Deserialize, Serialize};

use crate::error::{OriginalityError, Result};
use crate::store::{decode_blob, encode_blob};

/// Fixed hash size in bytes (64 bits).
pub const PERCEPTUAL_HASH_SIZE: usize = 8;

/// Side length of the DCT hash grid (8x8 = 64 bits).
const PHASH_GRID: u32 = 8;

/// Perceptual hash algorithm selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum HashAlgorithm {
    /// DCT + median perceptual hash, 64 bits.
    #[default]
    PHash,
    /// Blockhash64, 64 bits.
    Blockhash64,
}

impl std::str::FromStr for HashAlgorithm {
    type Err = OriginalityError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "phash" => Ok(Self::PHash),
            "blockhash" | "blockhash64" => Ok(Self::Blockhash64),
            other => Err(OriginalityError::InputError(format!(
                "unknown hash algorithm '{other}' (expected phash or blockhash64)"
            ))),
        }
    }
}

/// Computed perceptual hash with metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PerceptualHash {
    /// The hash bytes (8 bytes for both algorithms)
    pub hash: Vec<u8>,
    /// Algorithm used to compute the hash
    pub algorithm: HashAlgorithm,
    /// Hash size in bits
    pub bit_size: u32,
}

impl PerceptualHash {
    /// Create a new perceptual hash from fixed-size bytes.
    pub fn new(hash: [u8; PERCEPTUAL_HASH_SIZE], algorithm: HashAlgorithm) -> Self {
        Self {
            hash: hash.to_vec(),
            algorithm,
            bit_size: (PERCEPTUAL_HASH_SIZE * 8) as u32,
        }
    }

    /// Create from variable-size bytes.
    pub fn from_bytes(hash: Vec<u8>, algorithm: HashAlgorithm) -> Self {
        let bit_size = (hash.len() * 8) as u32;
        Self {
            hash,
            algorithm,
            bit_size,
        }
    }

    /// Compute the Hamming distance between two perceptual hashes.
    ///
    /// Hashes are only comparable when produced by the same algorithm with the
    /// same length; anything else is an error rather than a large distance.
    pub fn hamming_distance(&self, other: &Self) -> Result<u32> {
        if self.algorithm != other.algorithm {
            return Err(OriginalityError::DecodeError(format!(
                "cannot compare {:?} hash with {:?} hash",
                self.algorithm, other.algorithm
            )));
        }
        if self.hash.len() != other.hash.len() {
            return Err(OriginalityError::DecodeError(format!(
                "hash length mismatch: {} vs {} bytes",
                self.hash.len(),
                other.hash.len()
            )));
        }

        if self.hash.is_empty() {
            return Err(OriginalityError::DecodeError("Cannot compare empty hashes".into()));
        }

        Ok(self
            .hash
            .iter()
            .zip(&other.hash)
            .map(|(a, b)| (a ^ b).count_ones())
            .sum())
    }

    /// Encode for storage.
    pub fn to_blob(&self) -> Result<Vec<u8>> {
        encode_blob(self)
    }

    /// Decode a stored hash, rejecting empty signatures.
    pub fn from_blob(bytes: &[u8]) -> Result<Self> {
        let hash: Self = decode_blob(bytes)?;
        if hash.hash.is_empty() {
            return Err(OriginalityError::SerializationError(
                "stored perceptual hash is empty".into(),
            ));
        }
        Ok(hash)
    }
}

/// Perceptual hasher configuration and computation.
#[derive(Debug, Clone, Copy, Default)]
pub struct PerceptualHasher {
    algorithm: HashAlgorithm,
}

impl PerceptualHasher {
    /// Create a new perceptual hasher with the specified algorithm.
    pub fn new(algorithm: HashAlgorithm) -> Self {
        Self { algorithm }
    }

    /// Compute perceptual hash from a DynamicImage.
    ///
    /// Images with a zero-length side cannot be hashed.
    pub fn hash_image(&self, image: &DynamicImage) -> Result<PerceptualHash> {
        if image.width() == 0 || image.height() == 0 {
            return Err(OriginalityError::DecodeError(format!(
                "cannot hash a {}x{} image",
                image.width(),
                image.height()
            )));
        }

        match self.algorithm {
            HashAlgorithm::PHash => {
                let hasher = HasherConfig::new()
                    .hash_size(PHASH_GRID, PHASH_GRID)
                    .hash_alg(HashAlg::Median)
                    .preproc_dct()
                    .to_hasher();
                let hash = hasher.hash_image(image);
                Ok(PerceptualHash::from_bytes(
                    hash.as_bytes().to_vec(),
                    HashAlgorithm::PHash,
                ))
            }
            HashAlgorithm::Blockhash64 => {
                let hash: Blockhash64 = blockhash64(image);
                let hash_bytes: [u8; 8] = hash.into();
                Ok(PerceptualHash::new(hash_bytes, HashAlgorithm::Blockhash64))
            }
        }
    }
}

/// Decode raw bytes into an image.
pub fn decode_image(image_data: &[u8]) -> Result<DynamicImage> {
    image::load_from_memory(image_data)
        .map_err(|e| OriginalityError::DecodeError(format!("Failed to decode image: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageBuffer, Rgb};

    fn gradient(width: u32, height: u32) -> DynamicImage {
        let img = ImageBuffer::from_fn(width, height, |x, y| {
            Rgb([
                (x * 255 / width.max(1)) as u8,
                (y * 255 / height.max(1)) as u8,
                ((x + y) % 256) as u8,
            ])
        });
        DynamicImage::ImageRgb8(img)
    }

    #[test]
    fn test_hash_algorithm_default() {
        assert_eq!(HashAlgorithm::default(), HashAlgorithm::PHash);
    }

    #[test]
    fn test_hash_algorithm_from_str() {
        assert_eq!("phash".parse::<HashAlgorithm>().unwrap(), HashAlgorithm::PHash);
        assert_eq!(
            "Blockhash64".parse::<HashAlgorithm>().unwrap(),
            HashAlgorithm::Blockhash64
        );
        assert!("md5".parse::<HashAlgorithm>().is_err());
    }

    fn phash(bytes: [u8; 8]) -> PerceptualHash {
        PerceptualHash::new(bytes, HashAlgorithm::PHash)
    }

    #[test]
    fn test_hamming_distance_identical() {
        let hash = phash([0x00, 0xFF, 0xAA, 0x55, 0x00, 0xFF, 0xAA, 0x55]);
        assert_eq!(hash.hamming_distance(&hash).unwrap(), 0);
    }

    #[test]
    fn test_hamming_distance_different() {
        assert_eq!(phash([0x00; 8]).hamming_distance(&phash([0xFF; 8])).unwrap(), 64);
    }

    #[test]
    fn test_hamming_distance_partial() {
        let mut bytes = [0x00; 8];
        bytes[0] = 0x01;
        assert_eq!(phash([0x00; 8]).hamming_distance(&phash(bytes)).unwrap(), 1);
    }

    #[test]
    fn test_length_mismatch_and_empty_are_incomparable() {
        let short = PerceptualHash::from_bytes(vec![0x00; 4], HashAlgorithm::PHash);
        assert!(phash([0x00; 8]).hamming_distance(&short).is_err());

        let empty = PerceptualHash::from_bytes(Vec::new(), HashAlgorithm::PHash);
        assert!(empty.hamming_distance(&empty).is_err());
    }

    #[test]
    fn test_mismatched_algorithms_are_incomparable() {
        let a = PerceptualHash::new([0; 8], HashAlgorithm::PHash);
        let b = PerceptualHash::new([0; 8], HashAlgorithm::Blockhash64);
        assert!(a.hamming_distance(&b).is_err());
    }

    #[test]
    fn test_self_distance_is_zero_for_both_algorithms() {
        let image = gradient(64, 48);
        for algorithm in [HashAlgorithm::PHash, HashAlgorithm::Blockhash64] {
            let hasher = PerceptualHasher::new(algorithm);
            let a = hasher.hash_image(&image).unwrap();
            let b = hasher.hash_image(&image).unwrap();
            assert_eq!(a.hamming_distance(&b).unwrap(), 0);
            assert_eq!(a.hash.len(), PERCEPTUAL_HASH_SIZE);
        }
    }

    #[test]
    fn test_zero_area_image_fails() {
        let hasher = PerceptualHasher::default();
        let empty = DynamicImage::new_rgb8(0, 10);
        assert!(hasher.hash_image(&empty).is_err());
    }

    #[test]
    fn test_blob_roundtrip() {
        let original = phash([0xDE, 0xAD, 0xBE, 0xEF, 0xCA, 0xFE, 0xBA, 0xBE]);
        let restored = PerceptualHash::from_blob(&original.to_blob().unwrap()).unwrap();
        assert_eq!(restored, original);
    }

    #[test]
    fn test_from_blob_rejects_garbage() {
        assert!(PerceptualHash::from_blob(b"not cbor at all").is_err());
    }

    #[test]
    fn test_decode_invalid_bytes() {
        assert!(matches!(
            decode_image(&[0x00, 0x01, 0x02]),
            Err(OriginalityError::DecodeError(_))
        ));
    }
}

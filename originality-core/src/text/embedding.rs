//! Dense semantic embeddings.
//!
//! The text engine only needs two things from a semantic model: a fixed-size
//! vector per document and cosine similarity between vectors. Any model can
//! be plugged in through [`Embedder`]; the `semantic` feature provides
//! [`FastEmbedEmbedder`] (all-MiniLM-L6-v2 via fastembed).

use serde::{Deserialize, Serialize};

use crate::error::{OriginalityError, Result};
use crate::store::{decode_blob, encode_blob};

/// Dimensions of all-MiniLM-L6-v2 vectors.
pub const MINILM_DIMENSIONS: usize = 384;

/// Sentence embedding model.
///
/// Truncation of over-long input is the implementation's responsibility.
pub trait Embedder: Send + Sync {
    /// Embed `text` into a vector of [`Embedder::dimensions`] floats.
    fn encode(&self, text: &str) -> Result<Vec<f32>>;

    fn dimensions(&self) -> usize;
}

/// Encode `text` with `embedder`, rejecting vectors whose length differs
/// from the model's declared dimensions.
pub fn embed(embedder: &dyn Embedder, text: &str) -> Result<Embedding> {
    let values = embedder.encode(text)?;
    if values.len() != embedder.dimensions() {
        return Err(OriginalityError::EmbeddingError(format!(
            "model returned {} dimensions, expected {}",
            values.len(),
            embedder.dimensions()
        )));
    }
    Ok(Embedding::new(values))
}

/// Stored embedding vector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Embedding {
    pub values: Vec<f32>,
}

impl Embedding {
    pub fn new(values: Vec<f32>) -> Self {
        Self { values }
    }

    /// Cosine similarity with `other`.
    ///
    /// Errors on a dimension mismatch; a zero-norm vector has similarity 0.
    pub fn cosine(&self, other: &Self) -> Result<f64> {
        if self.values.len() != other.values.len() {
            return Err(OriginalityError::DecodeError(format!(
                "embedding dimension mismatch: {} vs {}",
                self.values.len(),
                other.values.len()
            )));
        }

        let (mut dot, mut norm_a, mut norm_b) = (0.0f64, 0.0f64, 0.0f64);
        for (a, b) in self.values.iter().zip(&other.values) {
            let (a, b) = (f64::from(*a), f64::from(*b));
            dot += a * b;
            norm_a += a * a;
            norm_b += b * b;
        }

        if norm_a == 0.0 || norm_b == 0.0 {
            return Ok(0.0);
        }
        Ok(dot / (norm_a.sqrt() * norm_b.sqrt()))
    }

    pub fn to_blob(&self) -> Result<Vec<u8>> {
        encode_blob(self)
    }

    pub fn from_blob(bytes: &[u8]) -> Result<Self> {
        decode_blob(bytes)
    }
}

#[cfg(feature = "semantic")]
pub use native::FastEmbedEmbedder;

#[cfg(feature = "semantic")]
mod native {
    use std::panic::{catch_unwind, AssertUnwindSafe};
    use std::sync::Mutex;
    use std::time::Instant;

    use fastembed::{EmbeddingModel, InitOptions, TextEmbedding};

    use super::{Embedder, MINILM_DIMENSIONS};
    use crate::error::{OriginalityError, Result};

    /// all-MiniLM-L6-v2 embedder backed by fastembed's ONNX runtime.
    pub struct FastEmbedEmbedder {
        model: Mutex<TextEmbedding>,
    }

    impl FastEmbedEmbedder {
        /// Load the model, downloading it on first use.
        pub fn try_new() -> Result<Self> {
            let start = Instant::now();
            let options = InitOptions::new(EmbeddingModel::AllMiniLML6V2)
                .with_show_download_progress(false);
            let model = TextEmbedding::try_new(options)
                .map_err(|e| OriginalityError::EmbeddingError(format!("model load failed: {e}")))?;

            tracing::info!(
                elapsed_ms = start.elapsed().as_millis() as u64,
                model = "all-MiniLM-L6-v2",
                "Embedding model loaded"
            );

            Ok(Self {
                model: Mutex::new(model),
            })
        }
    }

    impl Embedder for FastEmbedEmbedder {
        fn encode(&self, text: &str) -> Result<Vec<f32>> {
            if text.is_empty() {
                return Err(OriginalityError::InputError("cannot embed empty text".into()));
            }

            let mut model = self
                .model
                .lock()
                .map_err(|_| OriginalityError::EmbeddingError("embedding model lock poisoned".into()))?;

            // ONNX runtime can panic on malformed input.
            let result = catch_unwind(AssertUnwindSafe(|| model.embed(vec![text.to_string()], None)))
                .map_err(|_| OriginalityError::EmbeddingError("ONNX runtime panicked".into()))?
                .map_err(|e| OriginalityError::EmbeddingError(e.to_string()))?;

            result
                .into_iter()
                .next()
                .ok_or_else(|| OriginalityError::EmbeddingError("no embedding returned".into()))
        }

        fn dimensions(&self) -> usize {
            MINILM_DIMENSIONS
        }
    }

    impl std::fmt::Debug for FastEmbedEmbedder {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            f.debug_struct("FastEmbedEmbedder")
                .field("model", &"all-MiniLM-L6-v2")
                .finish()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cosine_identical_is_one() {
        let v = Embedding::new(vec![0.3, -0.2, 0.9]);
        assert!((v.cosine(&v).unwrap() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_cosine_orthogonal_is_zero() {
        let a = Embedding::new(vec![1.0, 0.0]);
        let b = Embedding::new(vec![0.0, 1.0]);
        assert_eq!(a.cosine(&b).unwrap(), 0.0);
    }

    #[test]
    fn test_cosine_zero_norm() {
        let a = Embedding::new(vec![0.0, 0.0]);
        let b = Embedding::new(vec![1.0, 1.0]);
        assert_eq!(a.cosine(&b).unwrap(), 0.0);
    }

    #[test]
    fn test_cosine_dimension_mismatch() {
        let a = Embedding::new(vec![1.0]);
        let b = Embedding::new(vec![1.0, 2.0]);
        assert!(a.cosine(&b).is_err());
    }

    #[test]
    fn test_blob_roundtrip() {
        let v = Embedding::new(vec![0.25, -1.5, 3.0]);
        assert_eq!(Embedding::from_blob(&v.to_blob().unwrap()).unwrap(), v);
    }
}

//! Fingerprint storage.
//!
//! The engines treat the store as an append-only keyed repository: every
//! check scans all rows registered for one medium. Signatures are opaque
//! byte blobs here; decoding (and skipping corrupt rows) is the engines' job.
//!
//! - [`MemoryFingerprintStore`] keeps rows in process memory (tests, ephemeral runs)
//! - [`SqliteFingerprintStore`] persists rows in SQLite (feature `sqlite`)

mod memory;
#[cfg(feature = "sqlite")]
mod sqlite;

pub use memory::MemoryFingerprintStore;
#[cfg(feature = "sqlite")]
pub use sqlite::SqliteFingerprintStore;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::{OriginalityError, Result};

/// Medium a fingerprint row belongs to. Rows are only comparable within a medium.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Medium {
    Image,
    Text,
}

impl std::fmt::Display for Medium {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Image => write!(f, "image"),
            Self::Text => write!(f, "text"),
        }
    }
}

/// A fingerprint row about to be written.
#[derive(Debug, Clone)]
pub struct NewFingerprint {
    pub medium: Medium,
    pub asset_id: String,
    /// Encoded signature (perceptual hash or MinHash sketch).
    pub signature: Vec<u8>,
    /// Segment tag for image rows; unused for text.
    pub variant_tag: Option<String>,
    /// Encoded dense embedding for text rows, when the semantic engine was available.
    pub embedding: Option<Vec<u8>>,
}

impl NewFingerprint {
    pub fn image(asset_id: impl Into<String>, signature: Vec<u8>, segment: &str) -> Self {
        Self {
            medium: Medium::Image,
            asset_id: asset_id.into(),
            signature,
            variant_tag: Some(segment.to_string()),
            embedding: None,
        }
    }

    pub fn text(asset_id: impl Into<String>, signature: Vec<u8>, embedding: Option<Vec<u8>>) -> Self {
        Self {
            medium: Medium::Text,
            asset_id: asset_id.into(),
            signature,
            variant_tag: None,
            embedding,
        }
    }
}

/// A stored fingerprint row as returned by a scan.
#[derive(Debug, Clone)]
pub struct FingerprintRecord {
    pub asset_id: String,
    pub signature: Vec<u8>,
    pub variant_tag: Option<String>,
    pub embedding: Option<Vec<u8>>,
    pub registered_at: DateTime<Utc>,
}

/// Keyed repository of registered fingerprints.
///
/// Implementations must be safe to share across concurrent requests. A scan
/// returns a snapshot taken when it started, so rows inserted concurrently
/// are either wholly visible or absent, never torn.
#[async_trait]
pub trait FingerprintStore: Send + Sync {
    /// Append one fingerprint row.
    async fn put(&self, fingerprint: NewFingerprint) -> Result<()>;

    /// Return every row registered for `medium`, in insertion order.
    ///
    /// Each call is a fresh query; callers may scan as often as they like.
    async fn scan_all(&self, medium: Medium) -> Result<Vec<FingerprintRecord>>;

    /// Number of rows registered for `medium`.
    async fn count(&self, medium: Medium) -> Result<usize> {
        Ok(self.scan_all(medium).await?.len())
    }
}

/// Encode a signature structure into its portable CBOR blob.
pub fn encode_blob<T: Serialize>(value: &T) -> Result<Vec<u8>> {
    let mut bytes = Vec::new();
    ciborium::into_writer(value, &mut bytes)
        .map_err(|e| OriginalityError::SerializationError(e.to_string()))?;
    Ok(bytes)
}

/// Decode a CBOR blob produced by [`encode_blob`].
pub fn decode_blob<T: DeserializeOwned>(bytes: &[u8]) -> Result<T> {
    ciborium::from_reader(bytes).map_err(|e| OriginalityError::SerializationError(e.to_string()))
}

//! In-memory fingerprint store.

use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;

use super::{FingerprintRecord, FingerprintStore, Medium, NewFingerprint};
use crate::error::Result;

/// Append-only fingerprint rows held in process memory.
///
/// Rows are lost when the process exits. Each medium lives in its own shard
/// entry, so a scan clones a consistent snapshot under the shard lock.
#[derive(Default)]
pub struct MemoryFingerprintStore {
    rows: DashMap<Medium, Vec<FingerprintRecord>>,
}

impl MemoryFingerprintStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl FingerprintStore for MemoryFingerprintStore {
    async fn put(&self, fingerprint: NewFingerprint) -> Result<()> {
        let record = FingerprintRecord {
            asset_id: fingerprint.asset_id,
            signature: fingerprint.signature,
            variant_tag: fingerprint.variant_tag,
            embedding: fingerprint.embedding,
            registered_at: Utc::now(),
        };
        self.rows.entry(fingerprint.medium).or_default().push(record);
        Ok(())
    }

    async fn scan_all(&self, medium: Medium) -> Result<Vec<FingerprintRecord>> {
        Ok(self
            .rows
            .get(&medium)
            .map(|rows| rows.value().clone())
            .unwrap_or_default())
    }

    async fn count(&self, medium: Medium) -> Result<usize> {
        Ok(self.rows.get(&medium).map(|rows| rows.len()).unwrap_or(0))
    }
}

impl std::fmt::Debug for MemoryFingerprintStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryFingerprintStore")
            .field("image_rows", &self.rows.get(&Medium::Image).map(|r| r.len()))
            .field("text_rows", &self.rows.get(&Medium::Text).map(|r| r.len()))
            .finish()
    }
}

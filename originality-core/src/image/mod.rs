//! Image matching engine.
//!
//! Registration stores one perceptual hash per geometric [`Segment`]; a check
//! hashes the query in five [`Orientation`]s and looks for the smallest
//! Hamming distance against every stored segment hash.
//!
//! ```no_run
//! use std::sync::Arc;
//! use originality_core::image::ImageEngine;
//! use originality_core::store::MemoryFingerprintStore;
//!
//! # async fn example() -> originality_core::Result<()> {
//! let engine = ImageEngine::new(Arc::new(MemoryFingerprintStore::new()));
//! let bytes = std::fs::read("photo.png")?;
//! engine.register(&bytes, Some("photo-1")).await?;
//! let result = engine.check(&bytes).await?;
//! assert_eq!(result.label(), "DUPLICATE (Exact)");
//! # Ok(())
//! # }
//! ```

pub mod perceptual;
pub mod segment;

pub use perceptual::*;
pub use segment::{Orientation, Segment};

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::{OriginalityError, Result};
use crate::store::{FingerprintStore, Medium, NewFingerprint};

/// Distance below which a stored hash counts as a duplicate.
pub const DEFAULT_DUPLICATE_THRESHOLD: u32 = 10;

/// Image engine settings.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ImageEngineConfig {
    pub algorithm: HashAlgorithm,
    /// Strict upper bound on the Hamming distance of a duplicate.
    pub duplicate_threshold: u32,
}

impl Default for ImageEngineConfig {
    fn default() -> Self {
        Self {
            algorithm: HashAlgorithm::default(),
            duplicate_threshold: DEFAULT_DUPLICATE_THRESHOLD,
        }
    }
}

/// Smallest Hamming distance found by a check.
///
/// `Unbounded` means there was nothing to compare against; it is never a
/// valid finite distance and renders as `-1` on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Distance {
    Finite(u32),
    Unbounded,
}

impl Distance {
    pub fn as_finite(&self) -> Option<u32> {
        match self {
            Self::Finite(d) => Some(*d),
            Self::Unbounded => None,
        }
    }

    /// Integer rendering used by the image service contract.
    pub fn to_wire(&self) -> i64 {
        match self {
            Self::Finite(d) => i64::from(*d),
            Self::Unbounded => -1,
        }
    }
}

impl Serialize for Distance {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_i64(self.to_wire())
    }
}

/// Verdict of an image check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ImageClassification {
    DuplicateExact,
    Duplicate,
    Original,
    Error,
}

/// Outcome of [`ImageEngine::check`].
#[derive(Debug, Clone, Serialize)]
pub struct ImageMatch {
    pub classification: ImageClassification,
    /// Asset that produced the minimum distance; `None` for originals.
    pub closest_asset_id: Option<String>,
    pub distance: Distance,
    /// Stored segment tag of the winning row.
    pub segment: Option<String>,
    /// Reason for an `Error` classification.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ImageMatch {
    fn error(reason: impl Into<String>) -> Self {
        Self {
            classification: ImageClassification::Error,
            closest_asset_id: None,
            distance: Distance::Unbounded,
            segment: None,
            error: Some(reason.into()),
        }
    }

    /// Whether the winning row was a partial segment rather than the full image.
    pub fn is_partial(&self) -> bool {
        self.segment
            .as_deref()
            .is_some_and(|s| s != Segment::Full.as_str())
    }

    pub fn is_duplicate(&self) -> bool {
        matches!(
            self.classification,
            ImageClassification::DuplicateExact | ImageClassification::Duplicate
        )
    }

    /// Human-readable status, e.g. `DUPLICATE - Partial (q1_top_left)`.
    pub fn label(&self) -> String {
        match self.classification {
            ImageClassification::DuplicateExact => "DUPLICATE (Exact)".to_string(),
            ImageClassification::Duplicate if self.is_partial() => format!(
                "DUPLICATE - Partial ({})",
                self.segment.as_deref().unwrap_or_default()
            ),
            ImageClassification::Duplicate => "DUPLICATE".to_string(),
            ImageClassification::Original => "ORIGINAL".to_string(),
            ImageClassification::Error => "ERROR".to_string(),
        }
    }
}

/// Outcome of [`ImageEngine::register`].
#[derive(Debug, Clone, Serialize)]
pub struct ImageRegistration {
    pub asset_id: String,
    pub rows_written: usize,
    /// Segments that could not be hashed or stored.
    pub skipped_segments: Vec<String>,
}

/// Best candidate carried through the check fold.
struct Candidate<'a> {
    distance: u32,
    asset_id: &'a str,
    segment: &'a str,
}

/// A decoded stored row.
struct StoredHash {
    asset_id: String,
    segment: String,
    hash: PerceptualHash,
}

/// Segment/orientation perceptual-hash matcher over a [`FingerprintStore`].
#[derive(Clone)]
pub struct ImageEngine {
    store: Arc<dyn FingerprintStore>,
    config: ImageEngineConfig,
    hasher: PerceptualHasher,
}

impl ImageEngine {
    pub fn new(store: Arc<dyn FingerprintStore>) -> Self {
        Self::with_config(store, ImageEngineConfig::default())
    }

    pub fn with_config(store: Arc<dyn FingerprintStore>, config: ImageEngineConfig) -> Self {
        Self {
            store,
            hasher: PerceptualHasher::new(config.algorithm),
            config,
        }
    }

    pub fn config(&self) -> &ImageEngineConfig {
        &self.config
    }

    /// Hash every segment of `image_data` and store one row per hashed segment.
    ///
    /// Without an `asset_id` a UUID v4 is generated. Succeeds when at least one
    /// row was written; if every write failed, the last storage error is returned.
    pub async fn register(
        &self,
        image_data: &[u8],
        asset_id: Option<&str>,
    ) -> Result<ImageRegistration> {
        let image = decode_image(image_data)?;
        let asset_id = asset_id
            .map(str::to_string)
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

        let mut rows_written = 0;
        let mut skipped_segments = Vec::new();
        let mut last_storage_error = None;

        for segment in Segment::ALL {
            let blob = match self
                .hasher
                .hash_image(&segment.crop(&image))
                .and_then(|hash| hash.to_blob())
            {
                Ok(blob) => blob,
                Err(e) => {
                    tracing::debug!(%asset_id, %segment, error = %e, "Segment not hashed");
                    skipped_segments.push(segment.to_string());
                    continue;
                }
            };

            match self
                .store
                .put(NewFingerprint::image(&asset_id, blob, segment.as_str()))
                .await
            {
                Ok(()) => rows_written += 1,
                Err(e) => {
                    tracing::warn!(%asset_id, %segment, error = %e, "Failed to store segment hash");
                    skipped_segments.push(segment.to_string());
                    last_storage_error = Some(e);
                }
            }
        }

        if rows_written == 0 {
            return Err(last_storage_error.unwrap_or_else(|| {
                OriginalityError::InputError("no image segment could be hashed".into())
            }));
        }

        tracing::info!(%asset_id, rows = rows_written, "Image registered");

        Ok(ImageRegistration {
            asset_id,
            rows_written,
            skipped_segments,
        })
    }

    /// Compare `image_data` against every stored segment hash.
    ///
    /// Undecodable input yields an `Error` classification; only store failures
    /// are returned as `Err`. Ties keep the first pair encountered, scanning
    /// orientations in [`Orientation::ALL`] order and rows in store order.
    pub async fn check(&self, image_data: &[u8]) -> Result<ImageMatch> {
        let image = match decode_image(image_data) {
            Ok(image) => image,
            Err(e) => return Ok(ImageMatch::error(e.to_string())),
        };

        let queries: Vec<PerceptualHash> = Orientation::ALL
            .iter()
            .filter_map(|orientation| {
                self.hasher
                    .hash_image(&orientation.apply(&image))
                    .inspect_err(|e| tracing::debug!(?orientation, error = %e, "Query variant not hashed"))
                    .ok()
            })
            .collect();
        if queries.is_empty() {
            return Ok(ImageMatch::error("query image could not be hashed"));
        }

        let stored = self.load_hashes().await?;

        let best = queries
            .iter()
            .flat_map(|query| stored.iter().map(move |row| (query, row)))
            .filter_map(|(query, row)| {
                query
                    .hamming_distance(&row.hash)
                    .ok()
                    .map(|distance| Candidate {
                        distance,
                        asset_id: &row.asset_id,
                        segment: &row.segment,
                    })
            })
            .fold(None::<Candidate<'_>>, |best, candidate| match best {
                Some(b) if b.distance <= candidate.distance => Some(b),
                _ => Some(candidate),
            });

        let result = self.classify(best);
        tracing::info!(
            status = %result.label(),
            distance = result.distance.to_wire(),
            closest = ?result.closest_asset_id,
            "Image checked"
        );
        Ok(result)
    }

    fn classify(&self, best: Option<Candidate<'_>>) -> ImageMatch {
        let Some(best) = best else {
            return ImageMatch {
                classification: ImageClassification::Original,
                closest_asset_id: None,
                distance: Distance::Unbounded,
                segment: None,
                error: None,
            };
        };

        let classification = if best.distance == 0 && best.segment == Segment::Full.as_str() {
            ImageClassification::DuplicateExact
        } else if best.distance < self.config.duplicate_threshold {
            ImageClassification::Duplicate
        } else {
            ImageClassification::Original
        };

        let closest_asset_id = (classification != ImageClassification::Original)
            .then(|| best.asset_id.to_string());

        ImageMatch {
            classification,
            closest_asset_id,
            distance: Distance::Finite(best.distance),
            segment: Some(best.segment.to_string()),
            error: None,
        }
    }

    /// Decode every stored image row, skipping corrupt or incomparable ones.
    async fn load_hashes(&self) -> Result<Vec<StoredHash>> {
        let records = self.store.scan_all(Medium::Image).await?;
        let total = records.len();

        let stored: Vec<StoredHash> = records
            .into_iter()
            .filter_map(|record| match PerceptualHash::from_blob(&record.signature) {
                Ok(hash) if hash.algorithm == self.config.algorithm => Some(StoredHash {
                    segment: record
                        .variant_tag
                        .unwrap_or_else(|| Segment::Full.as_str().to_string()),
                    asset_id: record.asset_id,
                    hash,
                }),
                Ok(hash) => {
                    tracing::debug!(
                        asset_id = %record.asset_id,
                        algorithm = ?hash.algorithm,
                        "Skipping row hashed with another algorithm"
                    );
                    None
                }
                Err(e) => {
                    tracing::warn!(asset_id = %record.asset_id, error = %e, "Skipping corrupt image row");
                    None
                }
            })
            .collect();

        if stored.len() < total {
            tracing::debug!(total, usable = stored.len(), "Image rows filtered");
        }
        Ok(stored)
    }
}

impl std::fmt::Debug for ImageEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImageEngine")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

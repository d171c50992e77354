//! Originality Core - duplicate and derivative detection for images, text and video
//!
//! Each medium has an engine that fingerprints registered assets into a
//! shared [`FingerprintStore`] and classifies new submissions against every
//! stored fingerprint.
//!
//! # Engines
//!
//! - [`ImageEngine`]: perceptual hashes of nine geometric segments, queried in
//!   five orientations; reports the minimum Hamming distance.
//! - [`TextEngine`]: MinHash sketches of word shingles plus optional sentence
//!   embeddings, fused by an ordered threshold cascade.
//! - [`VideoOrchestrator`]: splits a video into audio and frames and fuses the
//!   verdicts of an audio matcher and an image matcher.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use originality_core::{ImageEngine, MemoryFingerprintStore, TextEngine};
//!
//! # async fn example() -> originality_core::Result<()> {
//! let store = Arc::new(MemoryFingerprintStore::new());
//!
//! let images = ImageEngine::new(store.clone());
//! let photo = std::fs::read("photo.jpg")?;
//! images.register(&photo, Some("photo-1")).await?;
//! println!("{}", images.check(&photo).await?.label());
//!
//! let texts = TextEngine::new(store);
//! texts.register_text("Four score and seven years ago", "speech").await?;
//! println!("{}", texts.check_text("four score and seven years ago").await?.label());
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod image;
pub mod store;
pub mod text;
pub mod video;

pub use error::{OriginalityError, Result};
pub use image::{
    Distance, HashAlgorithm, ImageClassification, ImageEngine, ImageEngineConfig, ImageMatch,
    ImageRegistration, PerceptualHash, PerceptualHasher, Segment,
};
pub use store::{FingerprintRecord, FingerprintStore, Medium, MemoryFingerprintStore, NewFingerprint};
#[cfg(feature = "sqlite")]
pub use store::SqliteFingerprintStore;
pub use text::{
    Embedder, SourceFormat, TextClassification, TextEngine, TextMatch, TextRegistration,
    TextThresholds,
};
pub use video::{
    AudioMatcher, FfmpegDecoder, ImageMatcher, LocalImageMatcher, VideoClassification,
    VideoConfig, VideoDecoder, VideoOrchestrator, VideoRegistration, VideoReport,
};
#[cfg(feature = "network")]
pub use video::{DelegateConfig, HttpAudioMatcher, HttpImageMatcher};

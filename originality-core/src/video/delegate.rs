//! Capabilities the video orchestrator delegates to.
//!
//! Audio fingerprinting lives in a separate service; frame matching can be
//! either a remote image service or the in-process [`ImageEngine`].

use std::path::Path;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::image::ImageEngine;

/// Status the audio service reports for a duplicate track.
pub const AUDIO_DUPLICATE: &str = "DUPLICATE";

/// One fingerprint hit reported by the audio service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AudioMatch {
    pub song_id: u32,
    pub score: f64,
    #[serde(default)]
    pub timestamp: u32,
}

/// Audio service answer to a check.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AudioVerdict {
    #[serde(default = "unknown_status")]
    pub status: String,
    /// Best match score on the service's 0-100 scale.
    #[serde(default)]
    pub top_score: f64,
    #[serde(default)]
    pub matches: Vec<AudioMatch>,
}

fn unknown_status() -> String {
    "UNKNOWN".to_string()
}

impl AudioVerdict {
    pub fn is_duplicate(&self) -> bool {
        self.status == AUDIO_DUPLICATE
    }
}

/// Image service answer to a frame check.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameVerdict {
    #[serde(default = "unknown_status")]
    pub status: String,
    /// Hamming distance of the best match, `-1` when there was none.
    #[serde(default = "no_distance")]
    pub distance: i64,
    #[serde(default)]
    pub match_id: Option<String>,
}

fn no_distance() -> i64 {
    -1
}

/// Audio fingerprint matcher.
#[async_trait]
pub trait AudioMatcher: Send + Sync {
    async fn check(&self, audio: &Path) -> Result<AudioVerdict>;

    /// Register `audio` under a numeric id (see [`audio_id_for`]).
    async fn register(&self, audio: &Path, id: u32) -> Result<()>;
}

/// Still-image matcher for sampled frames.
#[async_trait]
pub trait ImageMatcher: Send + Sync {
    async fn check(&self, frame: &Path) -> Result<FrameVerdict>;

    async fn register(&self, frame: &Path, id: &str) -> Result<()>;
}

/// Numeric audio id for an asset: CRC-32 of its UTF-8 bytes.
///
/// Distinct asset ids can collide.
pub fn audio_id_for(asset_id: &str) -> u32 {
    crc32fast::hash(asset_id.as_bytes())
}

/// [`ImageMatcher`] backed by an in-process [`ImageEngine`].
#[derive(Debug, Clone)]
pub struct LocalImageMatcher {
    engine: ImageEngine,
}

impl LocalImageMatcher {
    pub fn new(engine: ImageEngine) -> Self {
        Self { engine }
    }
}

#[async_trait]
impl ImageMatcher for LocalImageMatcher {
    async fn check(&self, frame: &Path) -> Result<FrameVerdict> {
        let bytes = tokio::fs::read(frame).await?;
        let result = self.engine.check(&bytes).await?;
        Ok(FrameVerdict {
            status: result.label(),
            distance: result.distance.to_wire(),
            match_id: result.closest_asset_id,
        })
    }

    async fn register(&self, frame: &Path, id: &str) -> Result<()> {
        let bytes = tokio::fs::read(frame).await?;
        self.engine.register(&bytes, Some(id)).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_audio_id_is_crc32() {
        // zlib.crc32(b"hello") == 0x3610a686
        assert_eq!(audio_id_for("hello"), 0x3610_a686);
        assert_eq!(audio_id_for("hello"), audio_id_for("hello"));
        assert_ne!(audio_id_for("video-1"), audio_id_for("video-2"));
    }

    #[test]
    fn test_audio_verdict_defaults() {
        let verdict: AudioVerdict = serde_json::from_str(r#"{"top_score": 12.5}"#).unwrap();
        assert_eq!(verdict.status, "UNKNOWN");
        assert!(verdict.matches.is_empty());
        assert!(!verdict.is_duplicate());

        let verdict: AudioVerdict = serde_json::from_str(
            r#"{"status":"DUPLICATE","top_score":80,"matches":[{"song_id":7,"score":80,"timestamp":3}]}"#,
        )
        .unwrap();
        assert!(verdict.is_duplicate());
        assert_eq!(verdict.matches[0].song_id, 7);
    }

    #[test]
    fn test_frame_verdict_defaults() {
        let verdict: FrameVerdict = serde_json::from_str(r#"{"status":"ORIGINAL"}"#).unwrap();
        assert_eq!(verdict.distance, -1);
        assert_eq!(verdict.match_id, None);
    }
}

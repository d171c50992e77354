//! Video orchestration.
//!
//! A video is decomposed into its audio track and a bounded set of sampled
//! frames. The audio goes to an [`AudioMatcher`], each frame to an
//! [`ImageMatcher`], and the two verdicts are fused into one
//! [`VideoReport`].
//!
//! Extracted artifacts live in a temporary directory owned by
//! [`VideoArtifacts`] and disappear when it is dropped, whichever way the
//! operation ends. Delegate failures never fail an operation; they only
//! weaken that modality's contribution.

pub mod decode;
pub mod delegate;
#[cfg(feature = "network")]
pub mod http;

pub use decode::{FfmpegDecoder, VideoDecoder};
pub use delegate::{
    audio_id_for, AudioMatch, AudioMatcher, AudioVerdict, FrameVerdict, ImageMatcher,
    LocalImageMatcher,
};
#[cfg(feature = "network")]
pub use http::{DelegateConfig, HttpAudioMatcher, HttpImageMatcher};

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tempfile::TempDir;

use crate::error::{OriginalityError, Result};

/// Audio status reported when there is no usable audio verdict.
pub const NO_AUDIO: &str = "NO_AUDIO";

/// Accepted video upload extensions.
pub const VIDEO_EXTENSIONS: [&str; 4] = ["mp4", "mkv", "avi", "mov"];

/// Sampling and fusion settings.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct VideoConfig {
    /// Smallest gap between sampled frames, in seconds.
    pub min_stride_secs: u64,
    /// Frame count the stride aims for on long videos.
    pub target_frames: u64,
    /// Largest frame distance still counted as a visual match.
    pub partial_distance: i64,
    /// Distance at which derived frame similarity reaches zero.
    pub similarity_scale: f64,
}

impl Default for VideoConfig {
    fn default() -> Self {
        Self {
            min_stride_secs: 5,
            target_frames: 10,
            partial_distance: 10,
            similarity_scale: 20.0,
        }
    }
}

impl VideoConfig {
    /// Whole-second timestamps to sample from a video of `duration` seconds.
    ///
    /// The stride is `max(min_stride_secs, floor(duration / target_frames))`.
    pub fn frame_timestamps(&self, duration: f64) -> Vec<u64> {
        let whole = if duration.is_finite() && duration > 0.0 {
            duration.floor() as u64
        } else {
            0
        };
        let step = self
            .min_stride_secs
            .max(whole / self.target_frames.max(1))
            .max(1);
        (0..whole).step_by(step as usize).collect()
    }

    /// Similarity in `[0, 1]` for a frame distance, `None` when the distance is
    /// outside `[0, partial_distance]`.
    pub fn frame_similarity(&self, distance: i64) -> Option<f64> {
        (0..=self.partial_distance)
            .contains(&distance)
            .then(|| (1.0 - distance as f64 / self.similarity_scale).max(0.0))
    }
}

/// Scratch files extracted from one video.
#[derive(Debug)]
pub struct VideoArtifacts {
    workspace: TempDir,
    pub audio: Option<PathBuf>,
    pub frames: Vec<PathBuf>,
}

impl VideoArtifacts {
    /// Directory holding the artifacts.
    pub fn workspace(&self) -> &Path {
        self.workspace.path()
    }
}

/// Fused verdict of a video check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VideoClassification {
    #[serde(rename = "Original")]
    Original,
    #[serde(rename = "Duplicate (Visual)")]
    DuplicateVisual,
    #[serde(rename = "Duplicate (Audio)")]
    DuplicateAudio,
    #[serde(rename = "Duplicate (Audio+Visual)")]
    DuplicateAudioVisual,
    /// The video could not be decoded.
    #[serde(rename = "Error")]
    Error,
}

impl VideoClassification {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Original => "Original",
            Self::DuplicateVisual => "Duplicate (Visual)",
            Self::DuplicateAudio => "Duplicate (Audio)",
            Self::DuplicateAudioVisual => "Duplicate (Audio+Visual)",
            Self::Error => "Error",
        }
    }

    fn fuse(visual_match: bool, audio_duplicate: bool) -> Self {
        match (visual_match, audio_duplicate) {
            (true, true) => Self::DuplicateAudioVisual,
            (true, false) => Self::DuplicateVisual,
            (false, true) => Self::DuplicateAudio,
            (false, false) => Self::Original,
        }
    }
}

/// Outcome of [`VideoOrchestrator::check`].
#[derive(Debug, Clone, Serialize)]
pub struct VideoReport {
    pub status: VideoClassification,
    pub visual_score: f64,
    pub audio_result: String,
    /// Audio service score (0-100).
    pub audio_score: f64,
    pub audio_matches: Vec<AudioMatch>,
    pub visual_matches_count: usize,
    pub frames_analyzed: usize,
    /// `max(visual_score, audio_score / 100)`.
    pub combined_score: f64,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl VideoReport {
    fn error(reason: impl Into<String>) -> Self {
        let reason = reason.into();
        Self {
            status: VideoClassification::Error,
            visual_score: 0.0,
            audio_result: NO_AUDIO.to_string(),
            audio_score: 0.0,
            audio_matches: Vec::new(),
            visual_matches_count: 0,
            frames_analyzed: 0,
            combined_score: 0.0,
            description: format!("Video could not be analyzed: {reason}"),
            error: Some(reason),
        }
    }

    pub fn is_duplicate(&self) -> bool {
        !matches!(
            self.status,
            VideoClassification::Original | VideoClassification::Error
        )
    }
}

/// Outcome of [`VideoOrchestrator::register`].
#[derive(Debug, Clone, Serialize)]
pub struct VideoRegistration {
    pub asset_id: String,
    /// At least one audio or frame registration succeeded.
    pub success: bool,
    pub audio_registered: bool,
    pub audio_id: Option<u32>,
    pub visual_frames_registered: usize,
    pub frames_total: usize,
    pub errors: Vec<String>,
}

/// Cross-modal video matcher.
#[derive(Clone)]
pub struct VideoOrchestrator {
    decoder: Arc<dyn VideoDecoder>,
    audio: Arc<dyn AudioMatcher>,
    image: Arc<dyn ImageMatcher>,
    config: VideoConfig,
}

impl VideoOrchestrator {
    pub fn new(
        decoder: Arc<dyn VideoDecoder>,
        audio: Arc<dyn AudioMatcher>,
        image: Arc<dyn ImageMatcher>,
    ) -> Self {
        Self {
            decoder,
            audio,
            image,
            config: VideoConfig::default(),
        }
    }

    pub fn with_config(mut self, config: VideoConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &VideoConfig {
        &self.config
    }

    /// Extract the audio track and sampled frames of `video` into a fresh
    /// scratch directory.
    ///
    /// A failed audio extraction leaves `audio` empty. A failed frame stops
    /// sampling; frames taken before it are kept.
    pub async fn process(&self, video: &Path) -> Result<VideoArtifacts> {
        let workspace = tempfile::Builder::new().prefix("originality-video-").tempdir()?;
        let duration = self.decoder.duration(video).await?;

        let audio_path = workspace.path().join("extracted_audio.wav");
        let audio = match self.decoder.extract_audio(video, &audio_path).await {
            Ok(true) => Some(audio_path),
            Ok(false) => None,
            Err(e) => {
                tracing::warn!(error = %e, "Audio extraction failed");
                None
            }
        };

        let mut frames = Vec::new();
        for at in self.config.frame_timestamps(duration) {
            let frame_path = workspace.path().join(format!("frame_{at}.jpg"));
            if let Err(e) = self.decoder.sample_frame(video, at, &frame_path).await {
                tracing::warn!(at_secs = at, error = %e, "Frame extraction failed, stopping");
                break;
            }
            frames.push(frame_path);
        }

        tracing::debug!(
            duration,
            has_audio = audio.is_some(),
            frames = frames.len(),
            "Video decomposed"
        );

        Ok(VideoArtifacts {
            workspace,
            audio,
            frames,
        })
    }

    /// Check a video file against both delegates.
    ///
    /// An undecodable video yields an `Error` report; only I/O failures are
    /// returned as `Err`.
    pub async fn check(&self, video: &Path) -> Result<VideoReport> {
        let artifacts = match self.process(video).await {
            Ok(artifacts) => artifacts,
            Err(e @ (OriginalityError::DecodeError(_) | OriginalityError::ExtractionError(_))) => {
                tracing::warn!(error = %e, "Video could not be decomposed");
                return Ok(VideoReport::error(e.to_string()));
            }
            Err(e) => return Err(e),
        };

        let audio = match &artifacts.audio {
            Some(path) => match self.audio.check(path).await {
                Ok(verdict) => Some(verdict),
                Err(e) => {
                    tracing::warn!(error = %e, "Audio delegate unavailable");
                    None
                }
            },
            None => None,
        };
        let (audio_result, audio_score, audio_matches) = match audio {
            Some(v) => (v.status, v.top_score, v.matches),
            None => (NO_AUDIO.to_string(), 0.0, Vec::new()),
        };

        let mut visual_matches_count = 0;
        let mut visual_score = 0.0f64;
        for frame in &artifacts.frames {
            match self.image.check(frame).await {
                Ok(verdict) => {
                    if let Some(similarity) = self.config.frame_similarity(verdict.distance) {
                        visual_matches_count += 1;
                        visual_score = visual_score.max(similarity);
                    }
                }
                Err(e) => {
                    tracing::warn!(frame = %frame.display(), error = %e, "Frame check failed");
                }
            }
        }

        let status = VideoClassification::fuse(
            visual_matches_count > 0,
            audio_result == delegate::AUDIO_DUPLICATE,
        );
        let report = VideoReport {
            status,
            visual_score,
            combined_score: visual_score.max(audio_score / 100.0),
            description: format!(
                "Video analyzed. Audio: {audio_result}. Visual Matches: {visual_matches_count}."
            ),
            audio_result,
            audio_score,
            audio_matches,
            visual_matches_count,
            frames_analyzed: artifacts.frames.len(),
            error: None,
        };

        tracing::info!(
            status = report.status.label(),
            visual_score = report.visual_score,
            audio = %report.audio_result,
            frames = report.frames_analyzed,
            "Video checked"
        );
        Ok(report)
    }

    /// Register a video's audio and frames with the delegates.
    ///
    /// Every sub-registration is attempted; failures are collected in
    /// `errors` and `success` is set when at least one of them went through.
    pub async fn register(&self, video: &Path, asset_id: &str) -> Result<VideoRegistration> {
        let artifacts = self.process(video).await?;
        let mut errors = Vec::new();

        let mut audio_id = None;
        let mut audio_registered = false;
        if let Some(path) = &artifacts.audio {
            let id = audio_id_for(asset_id);
            audio_id = Some(id);
            match self.audio.register(path, id).await {
                Ok(()) => audio_registered = true,
                Err(e) => errors.push(format!("audio registration failed: {e}")),
            }
        }

        let mut visual_frames_registered = 0;
        for (index, frame) in artifacts.frames.iter().enumerate() {
            let frame_id = format!("{asset_id}_{index}");
            match self.image.register(frame, &frame_id).await {
                Ok(()) => visual_frames_registered += 1,
                Err(e) => errors.push(format!("frame {index} registration failed: {e}")),
            }
        }

        let registration = VideoRegistration {
            asset_id: asset_id.to_string(),
            success: audio_registered || visual_frames_registered > 0,
            audio_registered,
            audio_id,
            visual_frames_registered,
            frames_total: artifacts.frames.len(),
            errors,
        };

        tracing::info!(
            %asset_id,
            success = registration.success,
            audio = registration.audio_registered,
            frames = registration.visual_frames_registered,
            errors = registration.errors.len(),
            "Video registered"
        );
        Ok(registration)
    }

    /// Check an uploaded video held in memory.
    pub async fn check_bytes(&self, data: &[u8], extension: &str) -> Result<VideoReport> {
        let (_upload, path) = stage_upload(data, extension).await?;
        self.check(&path).await
    }

    /// Register an uploaded video held in memory.
    pub async fn register_bytes(
        &self,
        data: &[u8],
        extension: &str,
        asset_id: &str,
    ) -> Result<VideoRegistration> {
        let (_upload, path) = stage_upload(data, extension).await?;
        self.register(&path, asset_id).await
    }
}

impl std::fmt::Debug for VideoOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VideoOrchestrator")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// Write an upload into its own temporary directory so the decoder can read it.
async fn stage_upload(data: &[u8], extension: &str) -> Result<(TempDir, PathBuf)> {
    let extension = extension.to_ascii_lowercase();
    if !VIDEO_EXTENSIONS.contains(&extension.as_str()) {
        return Err(OriginalityError::UnsupportedFormat(format!(
            "unsupported video extension: .{extension}"
        )));
    }
    let dir = tempfile::Builder::new().prefix("originality-upload-").tempdir()?;
    let path = dir.path().join(format!("input.{extension}"));
    tokio::fs::write(&path, data).await?;
    Ok((dir, path))
}

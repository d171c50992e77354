//! Video handlers
//!
//! `POST /video/check` and `POST /video/register` for mp4, mkv, avi and mov
//! uploads. Audio and frames are matched by the configured delegates.

use axum::{
    extract::{Multipart, State},
    http::StatusCode,
    Json,
};
use originality_core::video::AudioMatch;
use originality_core::{VideoRegistration, VideoReport};
use serde::Serialize;
use utoipa::ToSchema;

use crate::error::ApiError;
use crate::multipart::{FileField, MultipartFields};
use crate::state::AppState;
use crate::validation::UploadKind;

/// One audio fingerprint hit
#[derive(Serialize, ToSchema)]
pub struct AudioMatchBody {
    pub song_id: u32,
    pub score: f64,
    pub timestamp: u32,
}

impl From<AudioMatch> for AudioMatchBody {
    fn from(m: AudioMatch) -> Self {
        Self {
            song_id: m.song_id,
            score: m.score,
            timestamp: m.timestamp,
        }
    }
}

/// Response for a video check
#[derive(Serialize, ToSchema)]
pub struct VideoCheckResponse {
    #[schema(example = "Duplicate (Audio+Visual)")]
    pub status: &'static str,
    /// Best frame similarity, `1 - distance / 20` over frames within distance 10
    #[schema(example = 0.8)]
    pub visual_score: f64,
    /// Audio service status, or NO_AUDIO
    #[schema(example = "DUPLICATE")]
    pub audio_result: String,
    /// Audio service score on its 0-100 scale
    #[schema(example = 72.0)]
    pub audio_score: f64,
    pub audio_matches: Vec<AudioMatchBody>,
    pub visual_matches_count: usize,
    pub frames_analyzed: usize,
    /// max(visual_score, audio_score / 100)
    pub combined_score: f64,
    pub description: String,
    /// Why the video could not be analyzed, set when status is "Error"
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl From<VideoReport> for VideoCheckResponse {
    fn from(r: VideoReport) -> Self {
        Self {
            status: r.status.label(),
            visual_score: r.visual_score,
            audio_result: r.audio_result,
            audio_score: r.audio_score,
            audio_matches: r.audio_matches.into_iter().map(Into::into).collect(),
            visual_matches_count: r.visual_matches_count,
            frames_analyzed: r.frames_analyzed,
            combined_score: r.combined_score,
            description: r.description,
            error: r.error,
        }
    }
}

/// Per-modality registration outcome
#[derive(Serialize, ToSchema)]
pub struct VideoRegisterDetails {
    pub audio_registered: bool,
    /// 32-bit id the audio service stored the track under
    pub audio_id: Option<u32>,
    pub visual_frames_registered: usize,
    pub frames_total: usize,
    pub errors: Vec<String>,
}

/// Response for a video registration
#[derive(Serialize, ToSchema)]
pub struct VideoRegisterResponse {
    /// "success" when audio or at least one frame was registered, else "failed"
    #[schema(example = "success")]
    pub status: &'static str,
    pub id: String,
    pub details: VideoRegisterDetails,
}

impl From<VideoRegistration> for VideoRegisterResponse {
    fn from(r: VideoRegistration) -> Self {
        Self {
            status: if r.success { "success" } else { "failed" },
            id: r.asset_id,
            details: VideoRegisterDetails {
                audio_registered: r.audio_registered,
                audio_id: r.audio_id,
                visual_frames_registered: r.visual_frames_registered,
                frames_total: r.frames_total,
                errors: r.errors,
            },
        }
    }
}

fn extension(file: &FileField) -> Result<&str, ApiError> {
    file.extension
        .as_deref()
        .ok_or_else(|| ApiError::bad_request("File type not allowed"))
}

/// Check a video against registered audio and images
///
/// Accepts multipart/form-data with:
/// - **file** (required): an mp4, mkv, avi or mov video
///
/// The audio track goes to the audio service and up to ten sampled frames
/// to the image matcher. An unreachable audio service degrades the audio
/// result to `NO_AUDIO` instead of failing the request.
#[utoipa::path(
    post,
    path = "/video/check",
    tag = "Video",
    request_body(content_type = "multipart/form-data", description = "Video to check"),
    responses(
        (status = 200, description = "Check completed", body = VideoCheckResponse),
        (status = 400, description = "Missing file or file type not allowed"),
        (status = 413, description = "File too large")
    )
)]
pub async fn video_check_handler(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<VideoCheckResponse>, ApiError> {
    let mut fields =
        MultipartFields::parse(&mut multipart, UploadKind::Video, state.max_file_size).await?;
    let file = fields.take_file()?;

    let report = state.video.check_bytes(&file.data, extension(&file)?).await?;

    Ok(Json(report.into()))
}

/// Register a video as an original asset
///
/// Accepts multipart/form-data with:
/// - **file** (required): an mp4, mkv, avi or mov video
/// - **id** (required): asset id
///
/// Responds 500 with status `failed` when neither the audio track nor any
/// frame could be registered.
#[utoipa::path(
    post,
    path = "/video/register",
    tag = "Video",
    request_body(content_type = "multipart/form-data", description = "Video and id"),
    responses(
        (status = 200, description = "Video registered", body = VideoRegisterResponse),
        (status = 400, description = "Missing id or file, or file type not allowed"),
        (status = 422, description = "Video could not be decoded"),
        (status = 500, description = "Nothing could be registered", body = VideoRegisterResponse)
    )
)]
pub async fn video_register_handler(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<VideoRegisterResponse>), ApiError> {
    let mut fields =
        MultipartFields::parse(&mut multipart, UploadKind::Video, state.max_file_size).await?;
    let asset_id = fields.require_text("id")?.to_string();
    let file = fields.take_file()?;

    let registration = state
        .video
        .register_bytes(&file.data, extension(&file)?, &asset_id)
        .await?;

    let status = if registration.success {
        StatusCode::OK
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    };
    Ok((status, Json(registration.into())))
}

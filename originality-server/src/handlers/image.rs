//! Image handlers
//!
//! `POST /image/check` and `POST /image/register`. The request and response
//! shapes match what the video orchestrator's remote image matcher expects,
//! so one deployment can serve as another's image service.

use axum::{
    extract::{Multipart, State},
    Json,
};
use serde::Serialize;
use utoipa::ToSchema;

use crate::error::ApiError;
use crate::multipart::MultipartFields;
use crate::state::AppState;
use crate::validation::UploadKind;

/// Response for an image check
#[derive(Serialize, ToSchema)]
pub struct ImageCheckResponse {
    /// Display status
    #[schema(example = "DUPLICATE - Partial (q1_top_left)")]
    pub status: String,
    /// Asset id of the closest match; null for originals
    #[schema(example = "asset-42")]
    pub match_id: Option<String>,
    /// Minimum Hamming distance, -1 when nothing is registered
    #[schema(example = 4)]
    pub distance: i64,
    /// Stored segment that produced the minimum
    #[schema(example = "q1_top_left")]
    pub segment: Option<String>,
    /// Reason for an ERROR status
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Response for an image registration
#[derive(Serialize, ToSchema)]
pub struct ImageRegisterResponse {
    #[schema(example = "success")]
    pub status: &'static str,
    #[schema(example = "Registered 9 segments for asset-42")]
    pub message: String,
    /// Asset id the segments were stored under
    pub id: String,
    /// Segment rows written
    #[schema(example = 9)]
    pub rows: usize,
}

/// Check an image against every registered image
///
/// Accepts multipart/form-data with:
/// - **file** (required): the image to check
///
/// The image is compared in five orientations against all nine stored
/// segments of every registered image. Unreadable images report status
/// `ERROR` rather than failing the request.
#[utoipa::path(
    post,
    path = "/image/check",
    tag = "Image",
    request_body(content_type = "multipart/form-data", description = "Image to check"),
    responses(
        (status = 200, description = "Check completed", body = ImageCheckResponse),
        (status = 400, description = "Missing or empty file"),
        (status = 413, description = "File too large")
    )
)]
pub async fn image_check_handler(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<ImageCheckResponse>, ApiError> {
    let mut fields =
        MultipartFields::parse(&mut multipart, UploadKind::Image, state.max_file_size).await?;
    let file = fields.take_file()?;

    let result = state.image.check(&file.data).await?;

    Ok(Json(ImageCheckResponse {
        status: result.label(),
        distance: result.distance.to_wire(),
        match_id: result.closest_asset_id,
        segment: result.segment,
        error: result.error,
    }))
}

/// Register an image as an original asset
///
/// Accepts multipart/form-data with:
/// - **file** (required): the image to register
/// - **id** (optional): asset id; a random UUID is assigned when omitted
///
/// Stores one perceptual hash per segment (full, halves, quadrants).
#[utoipa::path(
    post,
    path = "/image/register",
    tag = "Image",
    request_body(content_type = "multipart/form-data", description = "Image and optional id"),
    responses(
        (status = 200, description = "Image registered", body = ImageRegisterResponse),
        (status = 400, description = "Missing or empty file"),
        (status = 422, description = "Image could not be decoded"),
        (status = 500, description = "Fingerprint store error")
    )
)]
pub async fn image_register_handler(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<ImageRegisterResponse>, ApiError> {
    let mut fields =
        MultipartFields::parse(&mut multipart, UploadKind::Image, state.max_file_size).await?;
    let file = fields.take_file()?;

    let registration = state
        .image
        .register(&file.data, fields.get_text("id"))
        .await?;

    let mut message = format!(
        "Registered {} segments for {}",
        registration.rows_written, registration.asset_id
    );
    if !registration.skipped_segments.is_empty() {
        message.push_str(&format!(
            " (skipped: {})",
            registration.skipped_segments.join(", ")
        ));
    }

    Ok(Json(ImageRegisterResponse {
        status: "success",
        message,
        id: registration.asset_id,
        rows: registration.rows_written,
    }))
}

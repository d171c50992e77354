//! Text handlers
//!
//! `POST /text/check` and `POST /text/register` for .txt, .pdf and .docx uploads.

use axum::{
    extract::{Multipart, State},
    Json,
};
use originality_core::text::SourceFormat;
use originality_core::{TextClassification, TextThresholds};
use serde::Serialize;
use utoipa::ToSchema;

use crate::error::ApiError;
use crate::multipart::{FileField, MultipartFields};
use crate::state::AppState;
use crate::validation::UploadKind;

/// Decision thresholds in effect for a check
#[derive(Serialize, ToSchema)]
pub struct TextCriteria {
    #[schema(example = 0.95)]
    pub duplicate_exact_threshold: f64,
    #[schema(example = 0.85)]
    pub semantic_duplicate_threshold: f64,
    #[schema(example = 0.6)]
    pub near_duplicate_threshold: f64,
    #[schema(example = 0.75)]
    pub potential_match_threshold: f64,
}

impl From<&TextThresholds> for TextCriteria {
    fn from(t: &TextThresholds) -> Self {
        Self {
            duplicate_exact_threshold: t.exact,
            semantic_duplicate_threshold: t.semantic,
            near_duplicate_threshold: t.near,
            potential_match_threshold: t.potential,
        }
    }
}

/// Response for a text check
#[derive(Serialize, ToSchema)]
pub struct TextCheckResponse {
    /// Binary verdict: "Original", "Duplicate" or "Error"
    #[schema(example = "Duplicate")]
    pub status: &'static str,
    #[schema(example = "NEAR DUPLICATE (Edited)")]
    pub detailed_classification: &'static str,
    pub closest_match_id: Option<String>,
    /// Score of the deciding signal, rounded to 4 decimals
    #[schema(example = 0.7812)]
    pub similarity_score: f64,
    #[schema(example = 0.7812)]
    pub lexical_score: f64,
    #[schema(example = 0.0)]
    pub semantic_score: f64,
    pub criteria: TextCriteria,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Response for a text registration
#[derive(Serialize, ToSchema)]
pub struct TextRegisterResponse {
    pub success: bool,
    #[schema(example = "Registered essay-1")]
    pub message: String,
    pub id: String,
    /// Whether a sentence embedding was stored alongside the MinHash signature
    pub has_embedding: bool,
}

fn round4(value: f64) -> f64 {
    (value * 10_000.0).round() / 10_000.0
}

fn binary_status(classification: TextClassification) -> &'static str {
    match classification {
        TextClassification::Original => "Original",
        TextClassification::Error => "Error",
        _ => "Duplicate",
    }
}

fn source_format(file: &FileField) -> Result<SourceFormat, ApiError> {
    let ext = file
        .extension
        .as_deref()
        .ok_or_else(|| ApiError::bad_request("File type not allowed"))?;
    Ok(SourceFormat::from_extension(ext)?)
}

/// Check a document against every registered document
///
/// Accepts multipart/form-data with:
/// - **file** (required): a .txt, .pdf or .docx document
///
/// Combines MinHash lexical similarity with embedding similarity when the
/// server runs with semantic matching. Unreadable documents report status
/// `Error` rather than failing the request.
#[utoipa::path(
    post,
    path = "/text/check",
    tag = "Text",
    request_body(content_type = "multipart/form-data", description = "Document to check"),
    responses(
        (status = 200, description = "Check completed", body = TextCheckResponse),
        (status = 400, description = "Missing file or file type not allowed"),
        (status = 413, description = "File too large")
    )
)]
pub async fn text_check_handler(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<TextCheckResponse>, ApiError> {
    let mut fields =
        MultipartFields::parse(&mut multipart, UploadKind::Text, state.max_file_size).await?;
    let file = fields.take_file()?;
    let format = source_format(&file)?;

    let result = state.text.check(&file.data, format).await?;

    Ok(Json(TextCheckResponse {
        status: binary_status(result.classification),
        detailed_classification: result.label(),
        closest_match_id: result.closest_asset_id,
        similarity_score: round4(result.score),
        lexical_score: round4(result.lexical_score),
        semantic_score: round4(result.semantic_score),
        criteria: TextCriteria::from(state.text.thresholds()),
        error: result.error,
    }))
}

/// Register a document as an original asset
///
/// Accepts multipart/form-data with:
/// - **file** (required): a .txt, .pdf or .docx document
/// - **id** (required): asset id
#[utoipa::path(
    post,
    path = "/text/register",
    tag = "Text",
    request_body(content_type = "multipart/form-data", description = "Document and id"),
    responses(
        (status = 200, description = "Document registered", body = TextRegisterResponse),
        (status = 400, description = "Missing id or file, file type not allowed, or no text"),
        (status = 422, description = "Document could not be read"),
        (status = 500, description = "Fingerprint store error")
    )
)]
pub async fn text_register_handler(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<TextRegisterResponse>, ApiError> {
    let mut fields =
        MultipartFields::parse(&mut multipart, UploadKind::Text, state.max_file_size).await?;
    let asset_id = fields.require_text("id")?.to_string();
    let file = fields.take_file()?;
    let format = source_format(&file)?;

    let registration = state.text.register(&file.data, format, &asset_id).await?;

    Ok(Json(TextRegisterResponse {
        success: true,
        message: format!("Registered {}", registration.asset_id),
        id: registration.asset_id,
        has_embedding: registration.has_embedding,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round4() {
        assert_eq!(round4(0.123456), 0.1235);
        assert_eq!(round4(1.0), 1.0);
        assert_eq!(round4(0.0), 0.0);
    }

    #[test]
    fn test_binary_status() {
        assert_eq!(binary_status(TextClassification::Original), "Original");
        assert_eq!(binary_status(TextClassification::Error), "Error");
        assert_eq!(binary_status(TextClassification::NearDuplicate), "Duplicate");
        assert_eq!(
            binary_status(TextClassification::PotentialSemanticMatch),
            "Duplicate"
        );
    }

    #[test]
    fn test_criteria_from_thresholds() {
        let criteria = TextCriteria::from(&TextThresholds::default());
        assert_eq!(criteria.duplicate_exact_threshold, 0.95);
        assert_eq!(criteria.near_duplicate_threshold, 0.60);
    }
}

//! API integration tests for originality-server.
//!
//! These tests drive the router with hand-built multipart requests against
//! an in-memory fingerprint store.

use std::io::Cursor;
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use image::{DynamicImage, ImageBuffer, ImageFormat, Rgb};
use originality_core::video::{AudioMatcher, AudioVerdict, LocalImageMatcher, VideoDecoder};
use originality_core::{
    FingerprintStore, ImageEngine, MemoryFingerprintStore, OriginalityError, VideoOrchestrator,
};
use originality_server::{create_router, create_router_with_config, AppState, Config};
use serde_json::Value;
use tower::ServiceExt;

const BOUNDARY: &str = "----TestBoundary7MA4YWxkTrZu0gW";

/// One multipart part: a text field when `file_name` is `None`.
struct Part<'a> {
    name: &'a str,
    file_name: Option<&'a str>,
    data: &'a [u8],
}

fn file_part<'a>(file_name: &'a str, data: &'a [u8]) -> Part<'a> {
    Part {
        name: "file",
        file_name: Some(file_name),
        data,
    }
}

fn text_part<'a>(name: &'a str, value: &'a str) -> Part<'a> {
    Part {
        name,
        file_name: None,
        data: value.as_bytes(),
    }
}

/// Helper to create a multipart body
fn create_multipart(parts: &[Part<'_>]) -> (String, Vec<u8>) {
    let mut body = Vec::new();

    for part in parts {
        body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
        match part.file_name {
            Some(file_name) => {
                body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n",
                        part.name, file_name
                    )
                    .as_bytes(),
                );
                body.extend_from_slice(b"Content-Type: application/octet-stream\r\n\r\n");
            }
            None => body.extend_from_slice(
                format!(
                    "Content-Disposition: form-data; name=\"{}\"\r\n\r\n",
                    part.name
                )
                .as_bytes(),
            ),
        }
        body.extend_from_slice(part.data);
        body.extend_from_slice(b"\r\n");
    }

    body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());
    (format!("multipart/form-data; boundary={}", BOUNDARY), body)
}

async fn post(app: Router, uri: &str, parts: &[Part<'_>]) -> (StatusCode, Value) {
    let (content_type, body) = create_multipart(parts);
    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(uri)
                .header("Content-Type", content_type)
                .body(Body::from(body))
                .unwrap(),
        )
        .await
        .unwrap();

    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, serde_json::from_slice(&body).unwrap_or(Value::Null))
}

async fn get(app: Router, uri: &str) -> (StatusCode, Vec<u8>) {
    let response = app
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, body.to_vec())
}

/// 96x64 PNG with distinct content per quadrant.
fn create_test_png(seed: u32) -> Vec<u8> {
    let img = ImageBuffer::from_fn(96, 64, |x, y| match (x < 48, y < 32) {
        (true, true) if ((y + seed) / 4) % 2 == 0 => Rgb([220, 30, 30]),
        (true, true) => Rgb([15, 15, 15]),
        (false, true) if ((x + seed) / 6 + y / 6) % 2 == 0 => Rgb([240, 240, 240]),
        (false, true) => Rgb([20, 50, 210]),
        (true, false) => Rgb([(x * 5) as u8, ((y - 32) * 7) as u8, 80]),
        (false, false) => Rgb([30, ((x - 48) * 5) as u8, 30]),
    });
    let mut bytes = Vec::new();
    DynamicImage::ImageRgb8(img)
        .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
        .unwrap();
    bytes
}

fn document(prefix: &str, words: usize) -> String {
    (0..words)
        .map(|i| format!("{prefix}{i}"))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Decoder that writes the same synthetic frame at every timestamp and has no audio.
#[derive(Default)]
struct StillFrameDecoder {
    fail_frames: bool,
    unreadable: bool,
}

#[async_trait]
impl VideoDecoder for StillFrameDecoder {
    async fn duration(&self, _video: &Path) -> originality_core::Result<f64> {
        if self.unreadable {
            return Err(OriginalityError::DecodeError(
                "invalid data found when processing input".into(),
            ));
        }
        Ok(10.0)
    }

    async fn extract_audio(&self, _video: &Path, _dest: &Path) -> originality_core::Result<bool> {
        Ok(false)
    }

    async fn sample_frame(
        &self,
        _video: &Path,
        _at_secs: u64,
        dest: &Path,
    ) -> originality_core::Result<()> {
        if self.fail_frames {
            return Err(OriginalityError::ExtractionError("no video stream".into()));
        }
        std::fs::write(dest, create_test_png(3))?;
        Ok(())
    }
}

struct OfflineAudio;

#[async_trait]
impl AudioMatcher for OfflineAudio {
    async fn check(&self, _audio: &Path) -> originality_core::Result<AudioVerdict> {
        Err(OriginalityError::DelegateUnavailable {
            service: "audio".into(),
            reason: "offline".into(),
        })
    }

    async fn register(&self, _audio: &Path, _id: u32) -> originality_core::Result<()> {
        Err(OriginalityError::DelegateUnavailable {
            service: "audio".into(),
            reason: "offline".into(),
        })
    }
}

fn test_state_with(config: &Config, decoder: StillFrameDecoder) -> AppState {
    let store: Arc<dyn FingerprintStore> = Arc::new(MemoryFingerprintStore::new());
    let video = VideoOrchestrator::new(
        Arc::new(decoder),
        Arc::new(OfflineAudio),
        Arc::new(LocalImageMatcher::new(ImageEngine::new(store.clone()))),
    );
    AppState::new(store, video, config)
}

/// Build the test router over a fresh in-memory store
fn create_test_app() -> Router {
    create_router(test_state_with(&Config::default(), StillFrameDecoder::default()))
}

// ============================================================================
// Health & Documentation Tests
// ============================================================================

#[tokio::test]
async fn test_health_endpoint_returns_ok() {
    let (status, body) = get(create_test_app(), "/health").await;
    assert_eq!(status, StatusCode::OK);

    let json: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["status"], "healthy");
    assert_eq!(json["service"], "originality-server");
    assert!(json["version"].is_string());
    assert_eq!(json["fingerprints"]["image"], 0);
    assert_eq!(json["fingerprints"]["text"], 0);
}

#[tokio::test]
async fn test_ready_endpoint_returns_ok() {
    let (status, body) = get(create_test_app(), "/ready").await;
    assert_eq!(status, StatusCode::OK);

    let json: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["ready"], true);
}

#[tokio::test]
async fn test_openapi_spec_endpoint() {
    let (status, body) = get(create_test_app(), "/api-docs/openapi.json").await;
    assert_eq!(status, StatusCode::OK);

    let json: Value = serde_json::from_slice(&body).unwrap();
    assert!(json["openapi"].as_str().unwrap().starts_with("3."));
    assert!(json["info"]["title"].is_string());
    for path in [
        "/health",
        "/ready",
        "/image/check",
        "/image/register",
        "/text/check",
        "/text/register",
        "/video/check",
        "/video/register",
    ] {
        assert!(json["paths"][path].is_object(), "{path} should be documented");
    }
}

#[tokio::test]
async fn test_swagger_ui_endpoint() {
    let (status, body) = get(create_test_app(), "/docs/").await;
    assert_eq!(status, StatusCode::OK, "Swagger UI should be accessible at /docs/");

    let html = String::from_utf8_lossy(&body);
    assert!(html.contains("swagger") || html.contains("Swagger") || html.contains("openapi"));
}

// ============================================================================
// Image Endpoint Tests
// ============================================================================

#[tokio::test]
async fn test_image_check_on_empty_store() {
    let png = create_test_png(0);
    let (status, json) = post(
        create_test_app(),
        "/image/check",
        &[file_part("photo.png", &png)],
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "ORIGINAL");
    assert_eq!(json["distance"], -1);
    assert!(json["match_id"].is_null());
}

#[tokio::test]
async fn test_image_register_then_check_roundtrip() {
    let app = create_test_app();
    let png = create_test_png(0);

    let (status, json) = post(
        app.clone(),
        "/image/register",
        &[file_part("photo.png", &png), text_part("id", "photo-1")],
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "success");
    assert_eq!(json["id"], "photo-1");
    assert_eq!(json["rows"], 9);

    let (status, json) = post(app, "/image/check", &[file_part("copy.png", &png)]).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "DUPLICATE (Exact)");
    assert_eq!(json["match_id"], "photo-1");
    assert_eq!(json["distance"], 0);
    assert_eq!(json["segment"], "full");
}

#[tokio::test]
async fn test_image_register_without_id_assigns_one() {
    let png = create_test_png(0);
    let (status, json) = post(
        create_test_app(),
        "/image/register",
        &[file_part("photo.png", &png)],
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["id"].as_str().unwrap().len(), 36);
}

#[tokio::test]
async fn test_image_register_corrupt_file() {
    let (status, json) = post(
        create_test_app(),
        "/image/register",
        &[file_part("photo.png", b"definitely not a png"), text_part("id", "x")],
    )
    .await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(json["code"], "DECODE_ERROR");
}

#[tokio::test]
async fn test_image_check_corrupt_file_reports_error_status() {
    let (status, json) = post(
        create_test_app(),
        "/image/check",
        &[file_part("photo.png", b"definitely not a png")],
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "ERROR");
    assert!(json["error"].is_string());
}

#[tokio::test]
async fn test_missing_file_field() {
    let (status, json) = post(
        create_test_app(),
        "/image/check",
        &[text_part("id", "lonely")],
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["code"], "INVALID_INPUT");
}

#[tokio::test]
async fn test_upload_over_size_limit() {
    let config = Config {
        max_file_size_mb: 0,
        ..Config::default()
    };
    let state = test_state_with(&config, StillFrameDecoder::default());
    let app = create_router_with_config(&config, state);
    let png = create_test_png(0);

    let (status, json) = post(app, "/image/check", &[file_part("photo.png", &png)]).await;
    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(json["code"], "FILE_TOO_LARGE");
}

// ============================================================================
// Text Endpoint Tests
// ============================================================================

#[tokio::test]
async fn test_text_register_then_check_roundtrip() {
    let app = create_test_app();
    let text = document("word", 50);

    let (status, json) = post(
        app.clone(),
        "/text/register",
        &[file_part("essay.txt", text.as_bytes()), text_part("id", "essay-1")],
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["success"], true);
    assert_eq!(json["id"], "essay-1");
    assert_eq!(json["has_embedding"], false);

    let (status, json) = post(app, "/text/check", &[file_part("copy.txt", text.as_bytes())]).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "Duplicate");
    assert_eq!(json["detailed_classification"], "DUPLICATE (Exact)");
    assert_eq!(json["closest_match_id"], "essay-1");
    assert_eq!(json["similarity_score"], 1.0);
    assert_eq!(json["criteria"]["duplicate_exact_threshold"], 0.95);
}

#[tokio::test]
async fn test_text_check_unrelated_is_original() {
    let app = create_test_app();
    let registered = document("alpha", 40);
    let unrelated = document("omega", 40);

    post(
        app.clone(),
        "/text/register",
        &[file_part("a.txt", registered.as_bytes()), text_part("id", "a")],
    )
    .await;
    let (status, json) = post(app, "/text/check", &[file_part("b.txt", unrelated.as_bytes())]).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "Original");
    assert_eq!(json["detailed_classification"], "ORIGINAL");
}

#[tokio::test]
async fn test_text_register_requires_id() {
    let (status, json) = post(
        create_test_app(),
        "/text/register",
        &[file_part("essay.txt", b"some words here")],
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json["error"].as_str().unwrap().contains("'id'"));
}

#[tokio::test]
async fn test_text_rejects_disallowed_extension() {
    let (status, json) = post(
        create_test_app(),
        "/text/check",
        &[file_part("notes.rtf", b"{\\rtf1 hi}")],
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json["error"].as_str().unwrap().contains("File type not allowed"));
}

#[tokio::test]
async fn test_text_register_empty_document() {
    let (status, json) = post(
        create_test_app(),
        "/text/register",
        &[file_part("blank.txt", b"  \n\t "), text_part("id", "blank")],
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["code"], "INVALID_INPUT");
}

#[tokio::test]
async fn test_text_check_unreadable_docx_reports_error_status() {
    let (status, json) = post(
        create_test_app(),
        "/text/check",
        &[file_part("broken.docx", b"not a zip archive")],
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "Error");
    assert_eq!(json["detailed_classification"], "ERROR");
}

// ============================================================================
// Video Endpoint Tests
// ============================================================================

#[tokio::test]
async fn test_video_register_then_check_is_visual_duplicate() {
    let app = create_test_app();

    let (status, json) = post(
        app.clone(),
        "/video/register",
        &[file_part("clip.mp4", b"fake video"), text_part("id", "clip-1")],
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "success");
    assert_eq!(json["details"]["audio_id"], Value::Null);
    assert_eq!(json["details"]["frames_total"], 2);
    assert_eq!(json["details"]["visual_frames_registered"], 2);

    let (status, json) = post(app, "/video/check", &[file_part("copy.MOV", b"fake video")]).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "Duplicate (Visual)");
    assert_eq!(json["audio_result"], "NO_AUDIO");
    assert_eq!(json["frames_analyzed"], 2);
    assert_eq!(json["visual_matches_count"], 2);
    assert_eq!(json["combined_score"], 1.0);
}

#[tokio::test]
async fn test_video_register_with_nothing_extracted_fails() {
    let decoder = StillFrameDecoder {
        fail_frames: true,
        ..Default::default()
    };
    let app = create_router(test_state_with(&Config::default(), decoder));

    let (status, json) = post(
        app,
        "/video/register",
        &[file_part("clip.mkv", b"fake video"), text_part("id", "clip-1")],
    )
    .await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(json["status"], "failed");
    assert_eq!(json["details"]["frames_total"], 0);
}

#[tokio::test]
async fn test_video_rejects_disallowed_extension() {
    let (status, _) = post(
        create_test_app(),
        "/video/check",
        &[file_part("clip.gif", b"GIF89a")],
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_video_check_undecodable_reports_error_status() {
    let decoder = StillFrameDecoder {
        unreadable: true,
        ..Default::default()
    };
    let app = create_router(test_state_with(&Config::default(), decoder));

    let (status, json) = post(app, "/video/check", &[file_part("clip.mp4", b"garbage")]).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "Error");
    assert_eq!(json["frames_analyzed"], 0);
    assert!(json["error"].as_str().unwrap().contains("invalid data"));
}

//! OpenAPI documentation configuration
//!
//! Generates the OpenAPI 3 document for the originality API.

use utoipa::OpenApi;

use crate::handlers::{
    AudioMatchBody, FingerprintCounts, HealthResponse, ImageCheckResponse, ImageRegisterResponse,
    ReadyResponse, TextCheckResponse, TextCriteria, TextRegisterResponse, VideoCheckResponse,
    VideoRegisterDetails, VideoRegisterResponse,
};

/// Originality API - OpenAPI Documentation
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Originality API",
        version = "0.1.0",
        description = r#"
## Duplicate and derivative detection for images, text and video

Register original assets, then check new submissions against everything registered.

- **Images**: perceptual hashes of nine segments (full, halves, quadrants), queried in five
  orientations. Reports the minimum Hamming distance and the segment that produced it.
- **Text**: MinHash over 3-word shingles, optionally fused with sentence-embedding
  similarity. Accepts .txt, .pdf and .docx.
- **Video**: the audio track goes to an audio fingerprint service and sampled frames to the
  image matcher; the two verdicts are fused.

All uploads are `multipart/form-data` with a `file` part; registration also takes an `id`.
"#,
        license(name = "MIT OR Apache-2.0")
    ),
    servers(
        (url = "http://localhost:5000", description = "Local development server")
    ),
    tags(
        (name = "Image", description = "Image registration and checks"),
        (name = "Text", description = "Document registration and checks"),
        (name = "Video", description = "Video registration and checks"),
        (name = "Health", description = "Service health and readiness endpoints")
    ),
    paths(
        crate::handlers::health::health,
        crate::handlers::health::ready,
        crate::handlers::image::image_check_handler,
        crate::handlers::image::image_register_handler,
        crate::handlers::text::text_check_handler,
        crate::handlers::text::text_register_handler,
        crate::handlers::video::video_check_handler,
        crate::handlers::video::video_register_handler,
    ),
    components(
        schemas(
            HealthResponse,
            FingerprintCounts,
            ReadyResponse,
            ImageCheckResponse,
            ImageRegisterResponse,
            TextCheckResponse,
            TextCriteria,
            TextRegisterResponse,
            VideoCheckResponse,
            AudioMatchBody,
            VideoRegisterResponse,
            VideoRegisterDetails,
        )
    )
)]
pub struct ApiDoc;

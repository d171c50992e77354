//! Health check handlers
//!
//! Provides health and readiness endpoints for monitoring and orchestration.

use axum::{extract::State, http::StatusCode, Json};
use originality_core::Medium;
use serde::Serialize;
use utoipa::ToSchema;

use crate::state::AppState;

/// Registered fingerprint rows per medium
#[derive(Serialize, ToSchema)]
pub struct FingerprintCounts {
    #[schema(example = 90)]
    pub image: usize,
    #[schema(example = 4)]
    pub text: usize,
}

/// Health check response
#[derive(Serialize, ToSchema)]
pub struct HealthResponse {
    /// Service status: "healthy" or "degraded"
    #[schema(example = "healthy")]
    pub status: &'static str,
    /// Server version from Cargo.toml
    pub version: &'static str,
    /// Service name
    pub service: &'static str,
    /// Whether text checks include the semantic signal
    pub semantic_enabled: bool,
    /// Stored fingerprint rows, absent when the store cannot be read
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fingerprints: Option<FingerprintCounts>,
}

/// Service health
///
/// Returns JSON with service status, version and fingerprint counts.
/// Used for monitoring and load balancer health checks.
#[utoipa::path(
    get,
    path = "/health",
    tag = "Health",
    responses((status = 200, description = "Service status", body = HealthResponse))
)]
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let counts = async {
        Ok::<_, originality_core::OriginalityError>(FingerprintCounts {
            image: state.store.count(Medium::Image).await?,
            text: state.store.count(Medium::Text).await?,
        })
    }
    .await;

    let fingerprints = match counts {
        Ok(counts) => Some(counts),
        Err(e) => {
            tracing::warn!(error = %e, "Fingerprint store unreadable");
            None
        }
    };

    Json(HealthResponse {
        status: if fingerprints.is_some() {
            "healthy"
        } else {
            "degraded"
        },
        version: env!("CARGO_PKG_VERSION"),
        service: "originality-server",
        semantic_enabled: state.text.has_semantic(),
        fingerprints,
    })
}

/// Readiness response for Kubernetes
#[derive(Serialize, ToSchema)]
pub struct ReadyResponse {
    /// Whether the service is ready to accept traffic
    pub ready: bool,
    /// Optional message explaining status
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<&'static str>,
}

/// Readiness probe
///
/// Returns 200 once the fingerprint store answers, 503 otherwise.
#[utoipa::path(
    get,
    path = "/ready",
    tag = "Health",
    responses(
        (status = 200, description = "Ready to accept traffic", body = ReadyResponse),
        (status = 503, description = "Fingerprint store unavailable", body = ReadyResponse)
    )
)]
pub async fn ready(State(state): State<AppState>) -> (StatusCode, Json<ReadyResponse>) {
    match state.store.count(Medium::Image).await {
        Ok(_) => (
            StatusCode::OK,
            Json(ReadyResponse {
                ready: true,
                message: None,
            }),
        ),
        Err(e) => {
            tracing::warn!(error = %e, "Readiness check failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(ReadyResponse {
                    ready: false,
                    message: Some("fingerprint store unavailable"),
                }),
            )
        }
    }
}

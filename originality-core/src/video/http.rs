//! HTTP clients for the audio and image matching services.
//!
//! Both services take a multipart upload with a `file` part (and an `id`
//! text part on registration). Connection failures, timeouts and 429/502/503/504
//! responses are retried with exponential backoff; anything else fails at once.

use std::path::Path;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use backoff::{future::retry_notify, ExponentialBackoff};
use reqwest::multipart::{Form, Part};
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use super::delegate::{AudioMatcher, AudioVerdict, FrameVerdict, ImageMatcher};
use crate::error::{OriginalityError, Result};

/// Connection settings for one delegate service.
#[derive(Debug, Clone)]
pub struct DelegateConfig {
    /// Service root, e.g. `http://localhost:8080`. `/check` and `/register` are appended.
    pub base_url: String,
    /// Per-request timeout.
    pub timeout: Duration,
    pub max_retries: u32,
    pub initial_interval: Duration,
    pub max_interval: Duration,
}

impl DelegateConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Default::default()
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

impl Default for DelegateConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080".to_string(),
            timeout: Duration::from_secs(10),
            max_retries: 1,
            initial_interval: Duration::from_millis(200),
            max_interval: Duration::from_secs(2),
        }
    }
}

/// Multipart POST client with retry shared by both delegates.
struct DelegateClient {
    client: Client,
    config: DelegateConfig,
    service: &'static str,
}

impl DelegateClient {
    fn new(config: DelegateConfig, service: &'static str) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| unavailable(service, format!("failed to create HTTP client: {e}")))?;
        Ok(Self {
            client,
            config,
            service,
        })
    }

    fn url(&self, endpoint: &str) -> String {
        format!("{}/{endpoint}", self.config.base_url.trim_end_matches('/'))
    }

    /// Upload `file` to `endpoint` and return the response body.
    async fn upload(&self, endpoint: &str, file: &Path, id: Option<String>) -> Result<String> {
        let bytes = tokio::fs::read(file).await?;
        let file_name = file
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload".to_string());
        let url = self.url(endpoint);

        retry_notify(
            self.build_backoff(),
            || {
                let form = build_form(bytes.clone(), file_name.clone(), id.clone());
                let url = url.as_str();
                async move { self.send_once(url, form).await }
            },
            |err: OriginalityError, duration: Duration| {
                warn!(
                    service = self.service,
                    error = %err,
                    retry_after_ms = duration.as_millis() as u64,
                    "Retry scheduled"
                );
            },
        )
        .await
    }

    async fn send_once(
        &self,
        url: &str,
        form: Form,
    ) -> std::result::Result<String, backoff::Error<OriginalityError>> {
        let start = Instant::now();

        let response = self
            .client
            .post(url)
            .multipart(form)
            .send()
            .await
            .map_err(|e| {
                let latency_ms = start.elapsed().as_millis() as u64;
                let err = unavailable(self.service, format!("request failed: {e}"));
                if is_transient_error(&e) {
                    warn!(service = self.service, error = %e, latency_ms, "Transient error, will retry");
                    backoff::Error::transient(err)
                } else {
                    warn!(service = self.service, error = %e, latency_ms, "Permanent error, aborting");
                    backoff::Error::permanent(err)
                }
            })?;

        let status = response.status();
        debug!(service = self.service, status = %status, "Received HTTP response");

        let body = response
            .text()
            .await
            .map_err(|e| backoff::Error::permanent(unavailable(self.service, e.to_string())))?;

        if !status.is_success() {
            let err = unavailable(self.service, format!("returned {status}: {}", body.trim()));
            return if is_transient_status(status) {
                Err(backoff::Error::transient(err))
            } else {
                Err(backoff::Error::permanent(err))
            };
        }

        debug!(
            service = self.service,
            latency_ms = start.elapsed().as_millis() as u64,
            "Request completed"
        );
        Ok(body)
    }

    async fn upload_json<R: DeserializeOwned>(&self, endpoint: &str, file: &Path) -> Result<R> {
        let body = self.upload(endpoint, file, None).await?;
        serde_json::from_str(&body)
            .map_err(|e| unavailable(self.service, format!("unparseable response: {e}")))
    }

    fn build_backoff(&self) -> ExponentialBackoff {
        ExponentialBackoff {
            initial_interval: self.config.initial_interval,
            max_interval: self.config.max_interval,
            max_elapsed_time: Some(self.config.timeout * self.config.max_retries),
            ..Default::default()
        }
    }
}

fn build_form(bytes: Vec<u8>, file_name: String, id: Option<String>) -> Form {
    let form = Form::new().part("file", Part::bytes(bytes).file_name(file_name));
    match id {
        Some(id) => form.text("id", id),
        None => form,
    }
}

fn unavailable(service: &str, reason: impl Into<String>) -> OriginalityError {
    OriginalityError::DelegateUnavailable {
        service: service.to_string(),
        reason: reason.into(),
    }
}

/// Whether a reqwest error is transient and should be retried.
pub fn is_transient_error(error: &reqwest::Error) -> bool {
    error.is_timeout() || error.is_connect() || error.is_request()
}

/// Whether an HTTP status code indicates a transient error.
pub fn is_transient_status(status: StatusCode) -> bool {
    matches!(
        status,
        StatusCode::TOO_MANY_REQUESTS
            | StatusCode::SERVICE_UNAVAILABLE
            | StatusCode::GATEWAY_TIMEOUT
            | StatusCode::BAD_GATEWAY
    )
}

/// [`AudioMatcher`] speaking to the audio fingerprint service.
pub struct HttpAudioMatcher {
    inner: DelegateClient,
}

impl HttpAudioMatcher {
    pub fn new(config: DelegateConfig) -> Result<Self> {
        Ok(Self {
            inner: DelegateClient::new(config, "audio")?,
        })
    }
}

#[async_trait]
impl AudioMatcher for HttpAudioMatcher {
    async fn check(&self, audio: &Path) -> Result<AudioVerdict> {
        self.inner.upload_json("check", audio).await
    }

    async fn register(&self, audio: &Path, id: u32) -> Result<()> {
        self.inner
            .upload("register", audio, Some(id.to_string()))
            .await
            .map(drop)
    }
}

/// [`ImageMatcher`] speaking to a remote image matching service.
pub struct HttpImageMatcher {
    inner: DelegateClient,
}

impl HttpImageMatcher {
    pub fn new(config: DelegateConfig) -> Result<Self> {
        Ok(Self {
            inner: DelegateClient::new(config, "image")?,
        })
    }
}

#[async_trait]
impl ImageMatcher for HttpImageMatcher {
    async fn check(&self, frame: &Path) -> Result<FrameVerdict> {
        self.inner.upload_json("check", frame).await
    }

    async fn register(&self, frame: &Path, id: &str) -> Result<()> {
        self.inner
            .upload("register", frame, Some(id.to_string()))
            .await
            .map(drop)
    }
}

impl std::fmt::Debug for HttpAudioMatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpAudioMatcher")
            .field("base_url", &self.inner.config.base_url)
            .finish()
    }
}

impl std::fmt::Debug for HttpImageMatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpImageMatcher")
            .field("base_url", &self.inner.config.base_url)
            .finish()
    }
}

//! Application state module
//!
//! Defines shared state accessible across all request handlers.

use std::sync::Arc;

use originality_core::video::ImageMatcher;
use originality_core::{
    DelegateConfig, FfmpegDecoder, FingerprintStore, HttpAudioMatcher, HttpImageMatcher,
    ImageEngine, LocalImageMatcher, Result, SqliteFingerprintStore, TextEngine,
    VideoOrchestrator,
};

use crate::config::Config;

/// Application state containing shared resources.
#[derive(Clone)]
pub struct AppState {
    /// Fingerprint store shared by every engine
    pub store: Arc<dyn FingerprintStore>,
    pub image: ImageEngine,
    pub text: TextEngine,
    pub video: VideoOrchestrator,
    /// Maximum accepted upload size in bytes
    pub max_file_size: usize,
}

impl AppState {
    /// Build engines over `store`, with the given video orchestrator.
    pub fn new(store: Arc<dyn FingerprintStore>, video: VideoOrchestrator, config: &Config) -> Self {
        Self {
            image: ImageEngine::new(store.clone()),
            text: build_text_engine(store.clone()),
            video,
            store,
            max_file_size: config.max_file_size(),
        }
    }

    /// Open the SQLite store from `config` and wire up the delegate services.
    pub async fn from_config(config: &Config) -> Result<Self> {
        let store: Arc<dyn FingerprintStore> = Arc::new(
            SqliteFingerprintStore::connect(&config.database_url, config.database_max_connections)
                .await?,
        );
        Self::with_store(store, config)
    }

    /// Wire up the delegate services over an existing store.
    pub fn with_store(store: Arc<dyn FingerprintStore>, config: &Config) -> Result<Self> {
        let video = build_orchestrator(store.clone(), config)?;
        Ok(Self::new(store, video, config))
    }
}

/// Video orchestrator using ffmpeg, the audio service and either the image
/// service or the local image engine.
pub fn build_orchestrator(
    store: Arc<dyn FingerprintStore>,
    config: &Config,
) -> Result<VideoOrchestrator> {
    let audio = HttpAudioMatcher::new(
        DelegateConfig::new(config.audio_service_url.as_str())
            .with_timeout(config.delegate_timeout()),
    )?;

    let image: Arc<dyn ImageMatcher> = match &config.image_service_url {
        Some(url) => {
            tracing::info!(url = %url, "Video frames delegated to remote image service");
            Arc::new(HttpImageMatcher::new(
                DelegateConfig::new(url.as_str()).with_timeout(config.delegate_timeout()),
            )?)
        }
        None => {
            tracing::info!("Video frames matched by the local image engine");
            Arc::new(LocalImageMatcher::new(ImageEngine::new(store)))
        }
    };

    Ok(VideoOrchestrator::new(
        Arc::new(FfmpegDecoder::default()),
        Arc::new(audio),
        image,
    ))
}

#[cfg(feature = "semantic")]
fn build_text_engine(store: Arc<dyn FingerprintStore>) -> TextEngine {
    use originality_core::text::FastEmbedEmbedder;

    let engine = TextEngine::new(store);
    match FastEmbedEmbedder::try_new() {
        Ok(embedder) => {
            tracing::info!("Semantic text matching enabled");
            engine.with_embedder(Arc::new(embedder))
        }
        Err(e) => {
            tracing::warn!(error = %e, "Embedding model unavailable, text matching is lexical only");
            engine
        }
    }
}

#[cfg(not(feature = "semantic"))]
fn build_text_engine(store: Arc<dyn FingerprintStore>) -> TextEngine {
    TextEngine::new(store)
}

//! Video register and check commands.
//!
//! Audio goes to the audio matching service at `--audio-url`. Frames go to
//! the image service at `--image-url` when set, otherwise to the local image
//! engine backed by the fingerprint database.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use colored::{Color, Colorize};
use originality_core::video::{ImageMatcher, VIDEO_EXTENSIONS};
use originality_core::{
    DelegateConfig, FfmpegDecoder, HttpAudioMatcher, HttpImageMatcher, ImageEngine,
    LocalImageMatcher, OriginalityError, VideoClassification, VideoOrchestrator,
};
use tracing::{info, warn};

use super::{banner, field, verdict_color, Outcome, Settings};
use crate::utils::{default_asset_id, ensure_file, extension, open_store, print_json};

fn ensure_video(file: &Path) -> Result<()> {
    let ext = extension(file);
    if !VIDEO_EXTENSIONS.contains(&ext.as_str()) {
        return Err(OriginalityError::UnsupportedFormat(format!(
            "'.{ext}' (expected one of: {})",
            VIDEO_EXTENSIONS.join(", ")
        )))
        .with_context(|| format!("Unsupported video: {}", file.display()));
    }
    ensure_file(file)
}

async fn build_orchestrator(settings: &Settings) -> Result<VideoOrchestrator> {
    let audio = HttpAudioMatcher::new(DelegateConfig::new(settings.audio_url.as_str()))
        .context("Failed to create audio service client")?;

    let image: Arc<dyn ImageMatcher> = match &settings.image_url {
        Some(url) => Arc::new(
            HttpImageMatcher::new(DelegateConfig::new(url.as_str()))
                .context("Failed to create image service client")?,
        ),
        None => {
            let store = open_store(&settings.database).await?;
            Arc::new(LocalImageMatcher::new(ImageEngine::new(store)))
        }
    };

    Ok(VideoOrchestrator::new(
        Arc::new(FfmpegDecoder::default()),
        Arc::new(audio),
        image,
    ))
}

/// Execute `video register`.
pub async fn register(settings: &Settings, file: PathBuf, id: Option<String>) -> Result<Outcome> {
    ensure_video(&file)?;
    let asset_id = id.unwrap_or_else(|| default_asset_id(&file));
    let orchestrator = build_orchestrator(settings).await?;

    let registration = orchestrator
        .register(&file, &asset_id)
        .await
        .with_context(|| format!("Video registration failed for {}", file.display()))?;

    for error in &registration.errors {
        warn!(asset_id = %asset_id, error = %error, "Partial registration failure");
    }

    if settings.json {
        print_json(&registration)?;
    }

    if !registration.success {
        bail!(
            "Video registration failed: nothing was registered ({})",
            registration.errors.join("; ")
        );
    }

    info!(
        asset_id = %registration.asset_id,
        audio = registration.audio_registered,
        frames = registration.visual_frames_registered,
        "Video registered"
    );

    if settings.human() {
        banner("REGISTERED", Color::Green);
        field("Asset ID", &registration.asset_id);
        match registration.audio_id {
            Some(audio_id) if registration.audio_registered => {
                field("Audio", format!("registered as {audio_id}").green())
            }
            Some(_) => field("Audio", "not registered".yellow()),
            None => field("Audio", "no audio track".dimmed()),
        }
        field(
            "Frames",
            format!(
                "{}/{} registered",
                registration.visual_frames_registered, registration.frames_total
            ),
        );
        for error in &registration.errors {
            field("Warning", error.yellow());
        }
    }

    Ok(Outcome::registered())
}

/// Execute `video check`.
pub async fn check(settings: &Settings, file: PathBuf) -> Result<Outcome> {
    ensure_video(&file)?;
    let orchestrator = build_orchestrator(settings).await?;

    let report = orchestrator
        .check(&file)
        .await
        .with_context(|| format!("Video check failed for {}", file.display()))?;

    if report.status == VideoClassification::Error {
        let reason = report.error.unwrap_or_else(|| "unreadable video".to_string());
        return Err(OriginalityError::ExtractionError(reason))
            .with_context(|| format!("Video check failed for {}", file.display()));
    }

    info!(
        status = report.status.label(),
        combined = report.combined_score,
        frames = report.frames_analyzed,
        "Video checked"
    );

    if settings.json {
        print_json(&report)?;
    } else if settings.human() {
        banner(report.status.label(), verdict_color(report.is_duplicate()));
        field(
            "Visual",
            format!(
                "{}/{} frames matched ({:.2})",
                report.visual_matches_count, report.frames_analyzed, report.visual_score
            ),
        );
        field(
            "Audio",
            format!("{} ({:.1})", report.audio_result, report.audio_score),
        );
        field("Combined", format!("{:.2}", report.combined_score));
        field("Summary", report.description.dimmed());
    }

    Ok(Outcome::checked(report.is_duplicate()))
}

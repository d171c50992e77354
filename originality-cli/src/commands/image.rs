//! Image register and check commands.

use std::path::PathBuf;

use anyhow::{Context, Result};
use colored::{Color, Colorize};
use originality_core::{ImageClassification, ImageEngine, OriginalityError};
use tracing::info;

use super::{banner, field, verdict_color, Outcome, Settings};
use crate::utils::{open_store, print_json, read_input};

/// Execute `image register`.
pub async fn register(settings: &Settings, file: PathBuf, id: Option<String>) -> Result<Outcome> {
    let bytes = read_input(&file)?;
    let engine = ImageEngine::new(open_store(&settings.database).await?);

    let registration = engine
        .register(&bytes, id.as_deref())
        .await
        .context("Image registration failed")?;

    info!(
        asset_id = %registration.asset_id,
        rows = registration.rows_written,
        skipped = registration.skipped_segments.len(),
        "Image registered"
    );

    if settings.json {
        print_json(&registration)?;
    } else if settings.human() {
        banner("REGISTERED", Color::Green);
        field("Asset ID", &registration.asset_id);
        field("Segments stored", registration.rows_written);
        if !registration.skipped_segments.is_empty() {
            field(
                "Skipped",
                registration.skipped_segments.join(", ").yellow(),
            );
        }
    }

    Ok(Outcome::registered())
}

/// Execute `image check`.
pub async fn check(settings: &Settings, file: PathBuf) -> Result<Outcome> {
    let bytes = read_input(&file)?;
    let engine = ImageEngine::new(open_store(&settings.database).await?);

    let result = engine.check(&bytes).await.context("Image check failed")?;

    if result.classification == ImageClassification::Error {
        let reason = result.error.unwrap_or_else(|| "unreadable image".to_string());
        return Err(OriginalityError::DecodeError(reason))
            .with_context(|| format!("Image check failed for {}", file.display()));
    }

    info!(
        status = %result.label(),
        distance = result.distance.to_wire(),
        "Image checked"
    );

    if settings.json {
        print_json(&result)?;
    } else if settings.human() {
        banner(&result.label(), verdict_color(result.is_duplicate()));
        match result.distance.as_finite() {
            Some(distance) => field("Distance", distance),
            None => field("Distance", "no registered images".dimmed()),
        }
        if let Some(id) = &result.closest_asset_id {
            field("Match", id);
        }
        if let Some(segment) = &result.segment {
            field("Segment", segment);
        }
    }

    Ok(Outcome::checked(result.is_duplicate()))
}

//! Text register and check commands.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use colored::{Color, Colorize};
use originality_core::{
    FingerprintStore, OriginalityError, SourceFormat, TextClassification, TextEngine,
};
use tracing::info;

use super::{banner, field, verdict_color, Outcome, Settings};
use crate::utils::{default_asset_id, open_store, print_json, read_input};

fn source_format(file: &Path) -> Result<SourceFormat> {
    SourceFormat::from_path(file)
        .with_context(|| format!("Unsupported document: {}", file.display()))
}

#[cfg(feature = "semantic")]
fn build_engine(store: Arc<dyn FingerprintStore>) -> TextEngine {
    use originality_core::text::FastEmbedEmbedder;

    let engine = TextEngine::new(store);
    match FastEmbedEmbedder::try_new() {
        Ok(embedder) => engine.with_embedder(Arc::new(embedder)),
        Err(e) => {
            tracing::warn!(error = %e, "Embedding model unavailable, using lexical matching only");
            engine
        }
    }
}

#[cfg(not(feature = "semantic"))]
fn build_engine(store: Arc<dyn FingerprintStore>) -> TextEngine {
    TextEngine::new(store)
}

/// Execute `text register`.
pub async fn register(settings: &Settings, file: PathBuf, id: Option<String>) -> Result<Outcome> {
    let format = source_format(&file)?;
    let bytes = read_input(&file)?;
    let asset_id = id.unwrap_or_else(|| default_asset_id(&file));
    let engine = build_engine(open_store(&settings.database).await?);

    let registration = engine
        .register(&bytes, format, &asset_id)
        .await
        .with_context(|| format!("Text registration failed for {}", file.display()))?;

    info!(
        asset_id = %registration.asset_id,
        %format,
        embedding = registration.has_embedding,
        "Document registered"
    );

    if settings.json {
        print_json(&registration)?;
    } else if settings.human() {
        banner("REGISTERED", Color::Green);
        field("Asset ID", &registration.asset_id);
        field("Format", format);
        field(
            "Semantic",
            if registration.has_embedding {
                "embedding stored".green()
            } else {
                "lexical only".dimmed()
            },
        );
    }

    Ok(Outcome::registered())
}

/// Execute `text check`.
pub async fn check(settings: &Settings, file: PathBuf) -> Result<Outcome> {
    let format = source_format(&file)?;
    let bytes = read_input(&file)?;
    let engine = build_engine(open_store(&settings.database).await?);

    let result = engine
        .check(&bytes, format)
        .await
        .context("Text check failed")?;

    if result.classification == TextClassification::Error {
        let reason = result.error.unwrap_or_else(|| "unreadable document".to_string());
        return Err(OriginalityError::ExtractionError(reason))
            .with_context(|| format!("Text check failed for {}", file.display()));
    }

    info!(
        status = result.label(),
        score = result.score,
        lexical = result.lexical_score,
        semantic = result.semantic_score,
        "Document checked"
    );

    if settings.json {
        print_json(&result)?;
    } else if settings.human() {
        banner(result.label(), verdict_color(result.is_duplicate()));
        field("Similarity", format!("{:.2}%", result.score * 100.0));
        field("Lexical", format!("{:.4}", result.lexical_score));
        if engine.has_semantic() {
            field("Semantic", format!("{:.4}", result.semantic_score));
        }
        if let Some(id) = &result.closest_asset_id {
            field("Match", id);
        }
    }

    Ok(Outcome::checked(result.is_duplicate()))
}

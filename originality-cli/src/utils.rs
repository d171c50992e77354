//! Common utility functions shared across CLI commands.

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use originality_core::SqliteFingerprintStore;
use serde::Serialize;
use tracing::debug;

/// Connections are cheap for a single CLI invocation; one is enough.
const CLI_MAX_CONNECTIONS: u32 = 1;

/// Open the fingerprint database, applying migrations on first use.
pub async fn open_store(database_url: &str) -> Result<Arc<SqliteFingerprintStore>> {
    let store = SqliteFingerprintStore::connect(database_url, CLI_MAX_CONNECTIONS)
        .await
        .with_context(|| format!("Failed to open fingerprint database: {database_url}"))?;
    Ok(Arc::new(store))
}

/// Read an input file fully into memory.
pub fn read_input(path: &Path) -> Result<Vec<u8>> {
    let bytes =
        std::fs::read(path).with_context(|| format!("Failed to read file: {}", path.display()))?;
    debug!(path = %path.display(), bytes = bytes.len(), "Read file");
    Ok(bytes)
}

/// Fail with the same message as [`read_input`] when `path` is not a readable file.
pub fn ensure_file(path: &Path) -> Result<()> {
    let metadata = std::fs::metadata(path)
        .with_context(|| format!("Failed to read file: {}", path.display()))?;
    anyhow::ensure!(metadata.is_file(), "Failed to read file: {} is not a file", path.display());
    Ok(())
}

/// Asset id used when `--id` is omitted: the file name.
pub fn default_asset_id(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Lower-cased extension of `path`, empty when there is none.
pub fn extension(path: &Path) -> String {
    path.extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default()
}

pub fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value).context("Failed to serialize result")?;
    println!("{json}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_default_asset_id() {
        assert_eq!(default_asset_id(Path::new("/tmp/report.pdf")), "report.pdf");
        assert_eq!(default_asset_id(Path::new("clip.mp4")), "clip.mp4");
        assert_eq!(default_asset_id(&PathBuf::from("/")), "/");
    }

    #[test]
    fn test_extension() {
        assert_eq!(extension(Path::new("movie.MP4")), "mp4");
        assert_eq!(extension(Path::new("notes.txt")), "txt");
        assert_eq!(extension(Path::new("noext")), "");
    }

    #[test]
    fn test_read_missing_file() {
        let err = read_input(Path::new("/nonexistent/file.png")).unwrap_err();
        assert!(err.to_string().contains("Failed to read file"));
    }

    #[test]
    fn test_ensure_file_rejects_directory() {
        let dir = tempfile::tempdir().unwrap();
        let err = ensure_file(dir.path()).unwrap_err();
        assert!(err.to_string().contains("Failed to read file"));
    }
}

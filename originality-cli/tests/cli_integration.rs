//! CLI integration tests for originality-cli.
//!
//! These tests run the actual binary against a throwaway SQLite database
//! and check outputs and exit codes.

use assert_cmd::Command;
use image::{DynamicImage, ImageBuffer, ImageFormat, Rgb};
use predicates::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Get a Command for the originality binary.
fn originality() -> Command {
    let mut cmd = Command::cargo_bin("originality").unwrap();
    cmd.env_remove("ORIGINALITY_DATABASE_URL");
    cmd
}

/// Command bound to a database inside `dir`.
fn with_db(dir: &TempDir) -> Command {
    let mut cmd = originality();
    let url = format!("sqlite://{}?mode=rwc", dir.path().join("fp.db").display());
    cmd.args(["--database", &url]);
    cmd
}

fn write_image(dir: &Path, name: &str) -> PathBuf {
    let img = ImageBuffer::from_fn(128, 96, |x, y| match (x < 64, y < 48) {
        (true, true) if (y / 6) % 2 == 0 => Rgb([230, 40, 40]),
        (true, true) => Rgb([20, 20, 20]),
        (false, true) if (x / 8 + y / 8) % 2 == 0 => Rgb([250, 250, 250]),
        (false, true) => Rgb([10, 60, 200]),
        (true, false) => Rgb([(x * 4) as u8, ((y - 48) * 5) as u8, 90]),
        (false, false) => Rgb([40, (x % 64 * 3) as u8, 40]),
    });
    let path = dir.join(name);
    DynamicImage::ImageRgb8(img)
        .save_with_format(&path, ImageFormat::Png)
        .unwrap();
    path
}

fn write_document(dir: &Path, name: &str) -> PathBuf {
    let words: Vec<String> = (0..60).map(|i| format!("token{i}")).collect();
    let path = dir.join(name);
    fs::write(&path, words.join(" ")).unwrap();
    path
}

// ============================================================================
// Help and Version Tests
// ============================================================================

#[test]
fn test_help_displays_usage() {
    originality()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Duplicate and derivative detection"))
        .stdout(predicate::str::contains("image"))
        .stdout(predicate::str::contains("text"))
        .stdout(predicate::str::contains("video"));
}

#[test]
fn test_version_displays_version() {
    originality()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("originality"));
}

#[test]
fn test_help_shows_exit_codes() {
    originality()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("EXIT CODES:"))
        .stdout(predicate::str::contains("65"))
        .stdout(predicate::str::contains("66"));
}

#[test]
fn test_register_help_shows_options() {
    originality()
        .args(["image", "register", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("FILE"))
        .stdout(predicate::str::contains("--id"))
        .stdout(predicate::str::contains("--database"));
}

// ============================================================================
// Exit Code Tests
// ============================================================================

#[test]
fn test_missing_file_exits_66() {
    let dir = TempDir::new().unwrap();
    with_db(&dir)
        .args(["image", "check", "/nonexistent/photo.png"])
        .assert()
        .code(66)
        .stderr(predicate::str::contains("Failed to read file"));
}

#[test]
fn test_unsupported_document_exits_64() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("notes.rtf");
    fs::write(&path, "{\\rtf1 hello}").unwrap();

    with_db(&dir)
        .args(["text", "register"])
        .arg(&path)
        .assert()
        .code(64);
}

#[test]
fn test_unsupported_video_exits_64() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("clip.gif");
    fs::write(&path, b"GIF89a").unwrap();

    with_db(&dir)
        .args(["video", "check"])
        .arg(&path)
        .assert()
        .code(64)
        .stderr(predicate::str::contains("mp4"));
}

#[test]
fn test_corrupt_image_exits_65() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("broken.png");
    fs::write(&path, b"\x89PNG\r\n\x1a\nnot really").unwrap();

    with_db(&dir)
        .args(["image", "check"])
        .arg(&path)
        .assert()
        .code(65);
}

// ============================================================================
// Image Workflow Tests
// ============================================================================

#[test]
fn test_image_check_on_empty_database_is_original() {
    let dir = TempDir::new().unwrap();
    let image = write_image(dir.path(), "photo.png");

    with_db(&dir)
        .args(["--json", "image", "check"])
        .arg(&image)
        .assert()
        .success()
        .stdout(predicate::str::contains("\"ORIGINAL\""))
        .stdout(predicate::str::contains("\"distance\": -1"));
}

#[test]
fn test_image_register_then_check_is_exact_duplicate() {
    let dir = TempDir::new().unwrap();
    let image = write_image(dir.path(), "photo.png");

    with_db(&dir)
        .args(["--json", "image", "register", "--id", "photo-1"])
        .arg(&image)
        .assert()
        .success()
        .stdout(predicate::str::contains("\"rows_written\": 9"));

    with_db(&dir)
        .args(["--json", "image", "check"])
        .arg(&image)
        .assert()
        .success()
        .stdout(predicate::str::contains("DUPLICATE_EXACT"))
        .stdout(predicate::str::contains("photo-1"));

    with_db(&dir)
        .args(["--fail-on-duplicate", "image", "check"])
        .arg(&image)
        .assert()
        .code(65)
        .stdout(predicate::str::contains("DUPLICATE (Exact)"));
}

#[test]
fn test_quiet_suppresses_output() {
    let dir = TempDir::new().unwrap();
    let image = write_image(dir.path(), "photo.png");

    with_db(&dir)
        .args(["--quiet", "image", "register"])
        .arg(&image)
        .assert()
        .success()
        .stdout(predicate::str::is_empty());
}

// ============================================================================
// Text Workflow Tests
// ============================================================================

#[test]
fn test_text_register_then_check() {
    let dir = TempDir::new().unwrap();
    let document = write_document(dir.path(), "essay.txt");

    with_db(&dir)
        .args(["text", "register"])
        .arg(&document)
        .assert()
        .success()
        .stdout(predicate::str::contains("essay.txt"));

    with_db(&dir)
        .args(["--json", "text", "check"])
        .arg(&document)
        .assert()
        .success()
        .stdout(predicate::str::contains("DUPLICATE_EXACT"))
        .stdout(predicate::str::contains("\"closest_asset_id\": \"essay.txt\""));
}

#[test]
fn test_empty_document_registration_fails() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("blank.txt");
    fs::write(&path, "   \n").unwrap();

    with_db(&dir)
        .args(["text", "register"])
        .arg(&path)
        .assert()
        .code(65)
        .stderr(predicate::str::contains("Text registration failed"));
}

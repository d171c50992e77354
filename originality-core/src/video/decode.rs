//! Video decomposition into an audio track and still frames.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;

use crate::error::{OriginalityError, Result};

/// Media toolkit used to take a video apart.
#[async_trait]
pub trait VideoDecoder: Send + Sync {
    /// Duration of `video` in seconds.
    async fn duration(&self, video: &Path) -> Result<f64>;

    /// Write the audio track of `video` to `dest`.
    ///
    /// Returns `Ok(false)` when the video has no audio track.
    async fn extract_audio(&self, video: &Path, dest: &Path) -> Result<bool>;

    /// Write the frame shown at `at_secs` to `dest` as an image file.
    async fn sample_frame(&self, video: &Path, at_secs: u64, dest: &Path) -> Result<()>;
}

/// [`VideoDecoder`] that shells out to `ffprobe` and `ffmpeg`.
#[derive(Debug, Clone)]
pub struct FfmpegDecoder {
    ffmpeg: PathBuf,
    ffprobe: PathBuf,
}

impl Default for FfmpegDecoder {
    fn default() -> Self {
        Self {
            ffmpeg: PathBuf::from("ffmpeg"),
            ffprobe: PathBuf::from("ffprobe"),
        }
    }
}

impl FfmpegDecoder {
    /// Use binaries at explicit locations instead of looking them up on `PATH`.
    pub fn with_binaries(ffmpeg: impl Into<PathBuf>, ffprobe: impl Into<PathBuf>) -> Self {
        Self {
            ffmpeg: ffmpeg.into(),
            ffprobe: ffprobe.into(),
        }
    }

    async fn run(program: &Path, args: &[&std::ffi::OsStr]) -> Result<String> {
        let output = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| {
                OriginalityError::ExtractionError(format!(
                    "failed to run {}: {e}",
                    program.display()
                ))
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(OriginalityError::ExtractionError(format!(
                "{} exited with {}: {}",
                program.display(),
                output.status,
                stderr.trim()
            )));
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    async fn has_audio(&self, video: &Path) -> Result<bool> {
        let out = Self::run(
            &self.ffprobe,
            &[
                "-v".as_ref(),
                "error".as_ref(),
                "-select_streams".as_ref(),
                "a".as_ref(),
                "-show_entries".as_ref(),
                "stream=index".as_ref(),
                "-of".as_ref(),
                "csv=p=0".as_ref(),
                video.as_os_str(),
            ],
        )
        .await?;
        Ok(!out.trim().is_empty())
    }
}

#[async_trait]
impl VideoDecoder for FfmpegDecoder {
    async fn duration(&self, video: &Path) -> Result<f64> {
        let out = Self::run(
            &self.ffprobe,
            &[
                "-v".as_ref(),
                "error".as_ref(),
                "-show_entries".as_ref(),
                "format=duration".as_ref(),
                "-of".as_ref(),
                "default=noprint_wrappers=1:nokey=1".as_ref(),
                video.as_os_str(),
            ],
        )
        .await?;

        out.trim().parse::<f64>().map_err(|e| {
            OriginalityError::DecodeError(format!("unreadable video duration '{}': {e}", out.trim()))
        })
    }

    async fn extract_audio(&self, video: &Path, dest: &Path) -> Result<bool> {
        if !self.has_audio(video).await? {
            return Ok(false);
        }
        Self::run(
            &self.ffmpeg,
            &[
                "-y".as_ref(),
                "-v".as_ref(),
                "error".as_ref(),
                "-i".as_ref(),
                video.as_os_str(),
                "-vn".as_ref(),
                "-acodec".as_ref(),
                "pcm_s16le".as_ref(),
                "-ar".as_ref(),
                "44100".as_ref(),
                dest.as_os_str(),
            ],
        )
        .await?;
        Ok(true)
    }

    async fn sample_frame(&self, video: &Path, at_secs: u64, dest: &Path) -> Result<()> {
        let at = at_secs.to_string();
        Self::run(
            &self.ffmpeg,
            &[
                "-y".as_ref(),
                "-v".as_ref(),
                "error".as_ref(),
                "-ss".as_ref(),
                at.as_ref(),
                "-i".as_ref(),
                video.as_os_str(),
                "-frames:v".as_ref(),
                "1".as_ref(),
                "-q:v".as_ref(),
                "2".as_ref(),
                dest.as_os_str(),
            ],
        )
        .await?;

        // ffmpeg exits cleanly without output when seeking past the end.
        if !tokio::fs::try_exists(dest).await? {
            return Err(OriginalityError::ExtractionError(format!(
                "no frame at {at_secs}s"
            )));
        }
        Ok(())
    }
}

//! Upload validation module
//!
//! Provides validation utilities for multipart file uploads.

use originality_core::text::SourceFormat;
use originality_core::video::VIDEO_EXTENSIONS;

use crate::error::ApiError;

/// Media routes and the file extensions each accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadKind {
    /// Any file; the image decoder decides.
    Image,
    Text,
    Video,
}

impl UploadKind {
    /// Accepted extensions, or `None` when any extension is accepted.
    pub fn allowed_extensions(&self) -> Option<&'static [&'static str]> {
        match self {
            Self::Image => None,
            Self::Text => Some(&SourceFormat::EXTENSIONS),
            Self::Video => Some(&VIDEO_EXTENSIONS),
        }
    }
}

/// Lower-cased extension of an uploaded file name.
pub fn file_extension(file_name: &str) -> Option<String> {
    let (_, ext) = file_name.rsplit_once('.')?;
    (!ext.is_empty()).then(|| ext.to_ascii_lowercase())
}

/// Validates the uploaded file name against the extensions a route accepts.
///
/// Returns the lower-cased extension when the route restricts extensions.
pub fn validate_extension(
    file_name: Option<&str>,
    kind: UploadKind,
) -> Result<Option<String>, ApiError> {
    let Some(allowed) = kind.allowed_extensions() else {
        return Ok(None);
    };

    let ext = file_name
        .and_then(file_extension)
        .ok_or_else(|| ApiError::bad_request("File type not allowed: missing file extension"))?;

    if allowed.contains(&ext.as_str()) {
        Ok(Some(ext))
    } else {
        Err(ApiError::bad_request(format!(
            "File type not allowed: '.{}'. Allowed types: {}",
            ext,
            allowed.join(", ")
        )))
    }
}

/// Validates the size of an uploaded file
///
/// Returns an error if the file is empty or exceeds the maximum size.
pub fn validate_file_size(size: usize, max_size: usize) -> Result<(), ApiError> {
    if size == 0 {
        return Err(ApiError::bad_request("Uploaded file is empty"));
    }
    if size > max_size {
        let max_mb = max_size / (1024 * 1024);
        let actual_mb = size / (1024 * 1024);
        Err(ApiError::payload_too_large(format!(
            "File too large: {} MB exceeds maximum of {} MB",
            actual_mb, max_mb
        )))
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_extension() {
        assert_eq!(file_extension("essay.TXT").as_deref(), Some("txt"));
        assert_eq!(file_extension("archive.tar.gz").as_deref(), Some("gz"));
        assert_eq!(file_extension("noext"), None);
        assert_eq!(file_extension("trailing."), None);
    }

    #[test]
    fn test_text_extensions() {
        for name in ["a.txt", "b.pdf", "c.DOCX"] {
            assert!(validate_extension(Some(name), UploadKind::Text).is_ok(), "{name}");
        }
        assert!(validate_extension(Some("d.rtf"), UploadKind::Text).is_err());
        assert!(validate_extension(None, UploadKind::Text).is_err());
    }

    #[test]
    fn test_video_extensions() {
        assert_eq!(
            validate_extension(Some("clip.MOV"), UploadKind::Video).unwrap(),
            Some("mov".to_string())
        );
        assert!(validate_extension(Some("clip.webm"), UploadKind::Video).is_err());
    }

    #[test]
    fn test_image_accepts_anything() {
        assert_eq!(validate_extension(None, UploadKind::Image).unwrap(), None);
        assert_eq!(validate_extension(Some("x.heic"), UploadKind::Image).unwrap(), None);
    }

    #[test]
    fn test_validate_file_size_ok() {
        let max = 10 * 1024 * 1024; // 10 MB
        assert!(validate_file_size(1024, max).is_ok());
        assert!(validate_file_size(max, max).is_ok()); // exactly max
    }

    #[test]
    fn test_validate_file_size_rejected() {
        let max = 10 * 1024 * 1024;
        assert!(matches!(
            validate_file_size(max + 1, max),
            Err(ApiError::PayloadTooLarge(_))
        ));
        assert!(matches!(
            validate_file_size(0, max),
            Err(ApiError::BadRequest(_))
        ));
    }
}

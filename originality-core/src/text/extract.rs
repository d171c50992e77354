//! Plain-text extraction from uploaded documents.

use std::io::{Cursor, Read};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{OriginalityError, Result};

/// Supported document formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceFormat {
    Txt,
    Pdf,
    Docx,
}

impl SourceFormat {
    pub const EXTENSIONS: [&'static str; 3] = ["txt", "pdf", "docx"];

    /// Detect the format from a file extension (case-insensitive, without the dot).
    pub fn from_extension(ext: &str) -> Result<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "txt" => Ok(Self::Txt),
            "pdf" => Ok(Self::Pdf),
            "docx" => Ok(Self::Docx),
            other => Err(OriginalityError::UnsupportedFormat(format!(
                "unsupported file extension: .{other}"
            ))),
        }
    }

    /// Detect the format from a path or uploaded file name.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let ext = path
            .as_ref()
            .extension()
            .and_then(|e| e.to_str())
            .ok_or_else(|| {
                OriginalityError::UnsupportedFormat(format!(
                    "file has no extension: {}",
                    path.as_ref().display()
                ))
            })?;
        Self::from_extension(ext)
    }
}

impl std::fmt::Display for SourceFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Txt => write!(f, "txt"),
            Self::Pdf => write!(f, "pdf"),
            Self::Docx => write!(f, "docx"),
        }
    }
}

/// Extract the plain text of a document.
///
/// Text files are decoded as UTF-8, replacing invalid sequences. The result
/// may be empty or whitespace-only; callers decide whether that is an error.
pub fn extract_text(data: &[u8], format: SourceFormat) -> Result<String> {
    match format {
        SourceFormat::Txt => Ok(String::from_utf8_lossy(data).into_owned()),
        SourceFormat::Pdf => extract_pdf(data),
        SourceFormat::Docx => extract_docx(data),
    }
}

fn extract_pdf(data: &[u8]) -> Result<String> {
    // pdf-extract panics on some malformed documents.
    catch_unwind(AssertUnwindSafe(|| pdf_extract::extract_text_from_mem(data)))
        .map_err(|_| OriginalityError::ExtractionError("PDF parser panicked".into()))?
        .map_err(|e| OriginalityError::ExtractionError(format!("error reading PDF: {e}")))
}

#[allow(clippy::expect_used)]
static RUN_TEXT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"<w:t(?:\s[^>]*)?>([^<]*)</w:t>|<w:tab\s*/>").expect("static pattern is valid")
});

fn extract_docx(data: &[u8]) -> Result<String> {
    let mut archive = zip::ZipArchive::new(Cursor::new(data))
        .map_err(|e| OriginalityError::ExtractionError(format!("invalid DOCX archive: {e}")))?;
    let mut xml = String::new();
    archive
        .by_name("word/document.xml")
        .map_err(|e| OriginalityError::ExtractionError(format!("DOCX has no document body: {e}")))?
        .read_to_string(&mut xml)?;

    let mut text = String::new();
    for paragraph in xml.split("</w:p>") {
        let mut line = String::new();
        for capture in RUN_TEXT.captures_iter(paragraph) {
            match capture.get(1) {
                Some(run) => line.push_str(&decode_entities(run.as_str())),
                None => line.push('\t'),
            }
        }
        if paragraph.contains("<w:p") {
            text.push_str(&line);
            text.push('\n');
        }
    }
    Ok(text)
}

fn decode_entities(s: &str) -> String {
    s.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use zip::write::SimpleFileOptions;

    fn docx_with_body(body: &str) -> Vec<u8> {
        let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
        let options =
            SimpleFileOptions::default().compression_method(zip::CompressionMethod::Stored);
        writer.start_file("word/document.xml", options).unwrap();
        writer
            .write_all(
                format!(
                    r#"<?xml version="1.0"?><w:document><w:body>{body}</w:body></w:document>"#
                )
                .as_bytes(),
            )
            .unwrap();
        writer.finish().unwrap().into_inner()
    }

    #[test]
    fn test_format_detection() {
        assert_eq!(SourceFormat::from_path("essay.TXT").unwrap(), SourceFormat::Txt);
        assert_eq!(SourceFormat::from_path("/tmp/a.pdf").unwrap(), SourceFormat::Pdf);
        assert_eq!(SourceFormat::from_path("report.docx").unwrap(), SourceFormat::Docx);
        assert!(matches!(
            SourceFormat::from_path("slides.pptx"),
            Err(OriginalityError::UnsupportedFormat(_))
        ));
        assert!(SourceFormat::from_path("README").is_err());
    }

    #[test]
    fn test_txt_is_lossy_utf8() {
        let text = extract_text(b"caf\xC3\xA9 \xFF ok", SourceFormat::Txt).unwrap();
        assert_eq!(text, "café \u{FFFD} ok");
    }

    #[test]
    fn test_docx_paragraphs_and_entities() {
        let body = r#"<w:p><w:r><w:t>Fish &amp; chips</w:t></w:r><w:r><w:t xml:space="preserve"> today</w:t></w:r></w:p><w:p><w:r><w:t>Second</w:t><w:tab/><w:t>line</w:t></w:r></w:p>"#;
        let text = extract_text(&docx_with_body(body), SourceFormat::Docx).unwrap();
        assert_eq!(text, "Fish & chips today\nSecond\tline\n");
    }

    #[test]
    fn test_docx_garbage_is_extraction_error() {
        assert!(matches!(
            extract_text(b"PK not really", SourceFormat::Docx),
            Err(OriginalityError::ExtractionError(_))
        ));
    }

    #[test]
    fn test_pdf_garbage_is_extraction_error() {
        assert!(matches!(
            extract_text(b"%PDF-1.4 truncated", SourceFormat::Pdf),
            Err(OriginalityError::ExtractionError(_))
        ));
    }
}

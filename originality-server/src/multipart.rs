//! Multipart form parsing helpers
//!
//! Every media route takes a `file` part and, for registration, an `id`
//! text part. This module parses and validates both.

use std::collections::HashMap;

use axum::extract::Multipart;

use crate::error::ApiError;
use crate::validation::{validate_extension, validate_file_size, UploadKind};

/// Represents a file uploaded via multipart form
#[derive(Debug, Clone)]
pub struct FileField {
    /// File data bytes
    pub data: Vec<u8>,
    /// Original filename from the multipart field (if provided)
    pub file_name: Option<String>,
    /// Lower-cased extension, set when the route restricts extensions
    pub extension: Option<String>,
}

/// Parsed multipart form fields
#[derive(Debug)]
pub struct MultipartFields {
    /// File field (named "file")
    file: Option<FileField>,
    /// Text fields indexed by name
    text_fields: HashMap<String, String>,
}

impl MultipartFields {
    /// Parse all fields from a multipart request
    ///
    /// The file's extension is validated for `kind` before its body is read.
    pub async fn parse(
        multipart: &mut Multipart,
        kind: UploadKind,
        max_file_size: usize,
    ) -> Result<Self, ApiError> {
        let mut file: Option<FileField> = None;
        let mut text_fields = HashMap::new();

        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| ApiError::bad_request(format!("Failed to parse multipart: {}", e)))?
        {
            let name = field.name().unwrap_or("").to_string();

            if name == "file" {
                let file_name = field
                    .file_name()
                    .filter(|n| !n.is_empty())
                    .map(|s| s.to_string());
                let extension = validate_extension(file_name.as_deref(), kind)?;

                let data = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::bad_request(format!("Failed to read file: {}", e)))?
                    .to_vec();

                validate_file_size(data.len(), max_file_size)?;

                file = Some(FileField {
                    data,
                    file_name,
                    extension,
                });
            } else {
                let value = field.text().await.map_err(|e| {
                    ApiError::bad_request(format!("Failed to read field '{}': {}", name, e))
                })?;
                text_fields.insert(name, value);
            }
        }

        Ok(Self { file, text_fields })
    }

    /// Take the file field (required)
    ///
    /// Returns an error if no file was uploaded.
    pub fn take_file(&mut self) -> Result<FileField, ApiError> {
        self.file.take().ok_or_else(|| {
            ApiError::bad_request("No file provided. Use 'file' field in multipart form.")
        })
    }

    /// Get a non-blank text field value
    pub fn get_text(&self, name: &str) -> Option<&str> {
        self.text_fields
            .get(name)
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
    }

    /// Get a text field that must be present and non-blank
    pub fn require_text(&self, name: &str) -> Result<&str, ApiError> {
        self.get_text(name)
            .ok_or_else(|| ApiError::bad_request(format!("Missing '{}' parameter", name)))
    }
}

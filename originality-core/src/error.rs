use thiserror::Error;

#[derive(Error, Debug)]
pub enum OriginalityError {
    #[error("Invalid input: {0}")]
    InputError(String),

    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("Decode error: {0}")]
    DecodeError(String),

    #[error("Extraction error: {0}")]
    ExtractionError(String),

    #[error("Storage error: {0}")]
    StorageError(String),

    #[error("Delegate unavailable: {service}: {reason}")]
    DelegateUnavailable { service: String, reason: String },

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Embedding error: {0}")]
    EmbeddingError(String),

    #[cfg(feature = "network")]
    #[error("HTTP request error: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl OriginalityError {
    /// Whether the failure was caused by the caller's input rather than the system.
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            Self::InputError(_)
                | Self::UnsupportedFormat(_)
                | Self::DecodeError(_)
                | Self::ExtractionError(_)
        )
    }

    /// Whether the failure came from an unreachable downstream service.
    pub fn is_delegate_failure(&self) -> bool {
        match self {
            Self::DelegateUnavailable { .. } => true,
            #[cfg(feature = "network")]
            Self::HttpError(_) => true,
            _ => false,
        }
    }
}

#[cfg(feature = "sqlite")]
impl From<sqlx::Error> for OriginalityError {
    fn from(e: sqlx::Error) -> Self {
        Self::StorageError(e.to_string())
    }
}

#[cfg(feature = "sqlite")]
impl From<sqlx::migrate::MigrateError> for OriginalityError {
    fn from(e: sqlx::migrate::MigrateError) -> Self {
        Self::StorageError(format!("migration failed: {e}"))
    }
}

pub type Result<T> = std::result::Result<T, OriginalityError>;

//! Exit codes following sysexits.h conventions.
//!
//! These codes give scripts and CI jobs a way to tell a duplicate verdict
//! apart from bad input or an unavailable service.

use originality_core::OriginalityError;

/// Successful execution.
pub const SUCCESS: i32 = 0;

/// General error (catch-all).
pub const GENERAL_ERROR: i32 = 1;

/// Command line usage error (unsupported file type, bad arguments).
/// Maps to EX_USAGE from sysexits.h.
pub const USAGE_ERROR: i32 = 64;

/// Data error: unreadable content, or a duplicate with `--fail-on-duplicate`.
/// Maps to EX_DATAERR from sysexits.h.
pub const DATA_ERROR: i32 = 65;

/// Cannot open input file.
/// Maps to EX_NOINPUT from sysexits.h.
pub const INPUT_ERROR: i32 = 66;

/// Downstream matching service unavailable.
/// Maps to EX_UNAVAILABLE from sysexits.h.
pub const SERVICE_UNAVAILABLE: i32 = 69;

/// I/O or fingerprint store error.
/// Maps to EX_IOERR from sysexits.h.
pub const IO_ERROR: i32 = 74;

/// Represents an exit code with optional error context.
pub struct ExitCode {
    pub code: i32,
    pub message: Option<String>,
}

impl ExitCode {
    pub const fn success() -> Self {
        Self {
            code: SUCCESS,
            message: None,
        }
    }

    /// Duplicate verdict under `--fail-on-duplicate`; the result was already printed.
    pub const fn duplicate() -> Self {
        Self {
            code: DATA_ERROR,
            message: None,
        }
    }

    pub fn from_anyhow(err: &anyhow::Error) -> Self {
        let message = format!("{err:#}");

        let core_error = err
            .chain()
            .find_map(|cause| cause.downcast_ref::<OriginalityError>());

        let code = match core_error {
            _ if message.contains("Failed to read file") => INPUT_ERROR,
            Some(OriginalityError::UnsupportedFormat(_)) => USAGE_ERROR,
            Some(e) if e.is_input_error() => DATA_ERROR,
            Some(e) if e.is_delegate_failure() => SERVICE_UNAVAILABLE,
            Some(OriginalityError::StorageError(_) | OriginalityError::Io(_)) => IO_ERROR,
            _ => GENERAL_ERROR,
        };

        Self {
            code,
            message: Some(message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Context;

    fn code_for(err: OriginalityError) -> i32 {
        let err = Err::<(), _>(err).context("Operation failed").unwrap_err();
        ExitCode::from_anyhow(&err).code
    }

    #[test]
    fn test_core_errors_map_to_sysexits() {
        assert_eq!(code_for(OriginalityError::UnsupportedFormat("x".into())), USAGE_ERROR);
        assert_eq!(code_for(OriginalityError::DecodeError("x".into())), DATA_ERROR);
        assert_eq!(code_for(OriginalityError::InputError("x".into())), DATA_ERROR);
        assert_eq!(
            code_for(OriginalityError::DelegateUnavailable {
                service: "audio".into(),
                reason: "down".into()
            }),
            SERVICE_UNAVAILABLE
        );
        assert_eq!(code_for(OriginalityError::StorageError("x".into())), IO_ERROR);
    }

    #[test]
    fn test_unreadable_input_file() {
        let err = anyhow::anyhow!("Failed to read file: missing.png");
        assert_eq!(ExitCode::from_anyhow(&err).code, INPUT_ERROR);
    }

    #[test]
    fn test_unknown_error_is_general() {
        let err = anyhow::anyhow!("something odd");
        let exit = ExitCode::from_anyhow(&err);
        assert_eq!(exit.code, GENERAL_ERROR);
        assert_eq!(exit.message.as_deref(), Some("something odd"));
    }
}

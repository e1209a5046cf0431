//! Error types for the office-modernize library.
//!
//! Two error types reflect two layers of failure:
//!
//! * [`ConvertError`]: **Fatal for the request**: returned as
//!   `Err(ConvertError)` from every `Converter::convert*` entry point. Its
//!   [`class`](ConvertError::class) tells a web layer whether the client or
//!   the server is at fault, and [`public_message`](ConvertError::public_message)
//!   gives text that is safe to put in a response body.
//!
//! * [`WorkspaceError`]: the file-system half of the environment class:
//!   the request directory could not be created, written, or read back. It is
//!   wrapped by [`ConvertError::Workspace`].
//!
//! Engine-side failures are not errors in their own right: the executor
//! reports them as a [`ConversionOutcome`], which the converter wraps in
//! [`ConvertError::ConversionFailed`]. The outcome keeps the exit code and the
//! stderr excerpt for logs; `Display` never shows them.

use crate::output::ConversionOutcome;
use std::path::PathBuf;
use thiserror::Error;

/// Message returned for every server-side failure.
pub const GENERIC_FAILURE_MESSAGE: &str = "Conversion failed. Please check if the file is valid.";

/// Who is at fault for a [`ConvertError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorClass {
    /// The request itself is unacceptable (unsupported format). Nothing was launched.
    Client,
    /// The host environment failed: disk, permissions, missing engine binary.
    Environment,
    /// The engine ran but failed, timed out, or produced nothing.
    Engine,
}

/// All fatal errors returned by the office-modernize library.
#[derive(Debug, Error)]
pub enum ConvertError {
    // ── Client errors ─────────────────────────────────────────────────────
    /// The file extension is not one of the supported legacy formats.
    #[error(
        "Unsupported file format{}. Supported formats: {}",
        .extension.as_deref().map(|e| format!(" '{e}'")).unwrap_or_default(),
        .supported.join(", ")
    )]
    UnsupportedFormat {
        file_name: String,
        extension: Option<String>,
        supported: Vec<&'static str>,
    },

    // ── Environment errors ────────────────────────────────────────────────
    /// The request workspace could not be prepared or read.
    #[error(transparent)]
    Workspace(#[from] WorkspaceError),

    /// Could not read a local input file (CLI / `convert_path`).
    #[error("Failed to read input file '{path}': {source}")]
    InputReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Could not create or write the converted output file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Engine errors ─────────────────────────────────────────────────────
    /// The engine did not produce a usable document.
    ///
    /// The wrapped outcome carries the diagnostics; they are logged, never
    /// displayed.
    #[error("Conversion failed. Please check if the file is valid.")]
    ConversionFailed(ConversionOutcome),

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ConvertError {
    /// Classify the error for the inbound boundary.
    pub fn class(&self) -> ErrorClass {
        match self {
            ConvertError::UnsupportedFormat { .. } => ErrorClass::Client,
            ConvertError::ConversionFailed(ConversionOutcome::LaunchFailed { .. }) => {
                ErrorClass::Environment
            }
            ConvertError::ConversionFailed(_) => ErrorClass::Engine,
            ConvertError::Workspace(_)
            | ConvertError::InputReadFailed { .. }
            | ConvertError::OutputWriteFailed { .. }
            | ConvertError::InvalidConfig(_)
            | ConvertError::Internal(_) => ErrorClass::Environment,
        }
    }

    /// `true` when the caller sent something we refuse to process.
    pub fn is_client_error(&self) -> bool {
        self.class() == ErrorClass::Client
    }

    /// HTTP status a web front-end should answer with.
    pub fn status_code(&self) -> u16 {
        match self.class() {
            ErrorClass::Client => 400,
            ErrorClass::Environment | ErrorClass::Engine => 500,
        }
    }

    /// Text safe to return to a remote client.
    ///
    /// Client errors are shown verbatim (they list the supported formats);
    /// everything else collapses to [`GENERIC_FAILURE_MESSAGE`].
    pub fn public_message(&self) -> String {
        match self.class() {
            ErrorClass::Client => self.to_string(),
            ErrorClass::Environment | ErrorClass::Engine => GENERIC_FAILURE_MESSAGE.to_string(),
        }
    }
}

/// Failures of the request-scoped workspace.
#[derive(Debug, Error)]
pub enum WorkspaceError {
    /// The workspace directory could not be created under `root`.
    #[error("Failed to create workspace under '{root}': {source}")]
    Create {
        root: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The isolated engine profile directory could not be created.
    #[error("Failed to create engine profile '{path}': {source}")]
    Profile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The uploaded bytes could not be written.
    #[error("Failed to write input '{path}': {source}")]
    WriteInput {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The converted document could not be read back.
    #[error("Failed to read output '{path}': {source}")]
    ReadOutput {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unsupported(ext: Option<&str>) -> ConvertError {
        ConvertError::UnsupportedFormat {
            file_name: "notes.txt".into(),
            extension: ext.map(str::to_string),
            supported: vec![".doc", ".xls", ".ppt"],
        }
    }

    #[test]
    fn unsupported_format_lists_supported_extensions() {
        let msg = unsupported(Some(".txt")).to_string();
        assert!(msg.contains("Unsupported file format"), "got: {msg}");
        assert!(msg.contains("'.txt'"), "got: {msg}");
        assert!(msg.contains(".doc, .xls, .ppt"), "got: {msg}");
    }

    #[test]
    fn unsupported_format_without_extension() {
        let msg = unsupported(None).to_string();
        assert!(msg.starts_with("Unsupported file format. Supported"), "got: {msg}");
    }

    #[test]
    fn unsupported_format_is_client_error() {
        let e = unsupported(Some(".pdf"));
        assert!(e.is_client_error());
        assert_eq!(e.status_code(), 400);
        assert_eq!(e.public_message(), e.to_string());
    }

    #[test]
    fn engine_failure_does_not_leak_diagnostics() {
        let e = ConvertError::ConversionFailed(ConversionOutcome::EngineFailure {
            exit_code: Some(81),
            stderr_excerpt: "javaldx: secret/path/in/stderr".into(),
        });
        assert_eq!(e.class(), ErrorClass::Engine);
        assert_eq!(e.status_code(), 500);
        assert!(!e.to_string().contains("secret"));
        assert_eq!(e.public_message(), GENERIC_FAILURE_MESSAGE);
    }

    #[test]
    fn launch_failure_is_environment_class() {
        let e = ConvertError::ConversionFailed(ConversionOutcome::LaunchFailed {
            reason: "binary not found".into(),
        });
        assert_eq!(e.class(), ErrorClass::Environment);
    }

    #[test]
    fn workspace_error_public_message_is_generic() {
        let e: ConvertError = WorkspaceError::Create {
            root: "/nope".into(),
            source: std::io::Error::from(std::io::ErrorKind::PermissionDenied),
        }
        .into();
        assert_eq!(e.class(), ErrorClass::Environment);
        assert!(e.to_string().contains("/nope"));
        assert_eq!(e.public_message(), GENERIC_FAILURE_MESSAGE);
    }
}

//! Result types: engine outcomes, liveness, and the converted document.

use crate::format::SupportedFormatMap;
use serde::Serialize;
use std::fmt;
use std::path::PathBuf;
use uuid::Uuid;

/// What happened to one engine invocation.
///
/// Produced by [`crate::engine::execute`] and read exactly once by the
/// converter. Only `Success` yields a document; every other variant becomes
/// [`crate::error::ConvertError::ConversionFailed`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ConversionOutcome {
    /// The engine exited zero and left `<stem><target>` in the workspace.
    Success { output_path: PathBuf },
    /// The deadline elapsed and the engine's process group was killed.
    Timeout,
    /// The engine exited unsuccessfully.
    ///
    /// `exit_code` is `None` when the process was terminated by a signal.
    /// `stderr_excerpt` is truncated to the configured byte limit.
    EngineFailure {
        exit_code: Option<i32>,
        stderr_excerpt: String,
    },
    /// The engine reported success but no non-empty output file exists.
    OutputMissing,
    /// The engine could not be started at all.
    LaunchFailed { reason: String },
}

impl ConversionOutcome {
    /// Short lower-case label for logs and progress output.
    pub fn label(&self) -> &'static str {
        match self {
            ConversionOutcome::Success { .. } => "succeeded",
            ConversionOutcome::Timeout => "timed out",
            ConversionOutcome::EngineFailure { .. } => "engine failed",
            ConversionOutcome::OutputMissing => "output missing",
            ConversionOutcome::LaunchFailed { .. } => "launch failed",
        }
    }
}

impl fmt::Display for ConversionOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConversionOutcome::Success { output_path } => {
                write!(f, "succeeded: {}", output_path.display())
            }
            ConversionOutcome::EngineFailure {
                exit_code: Some(code),
                ..
            } => write!(f, "engine failed with exit code {code}"),
            ConversionOutcome::EngineFailure {
                exit_code: None, ..
            } => f.write_str("engine terminated by signal"),
            ConversionOutcome::LaunchFailed { reason } => write!(f, "launch failed: {reason}"),
            other => f.write_str(other.label()),
        }
    }
}

/// Result of a liveness probe. Recomputed on every call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum LivenessStatus {
    Healthy,
    Unhealthy { reason: String },
}

impl LivenessStatus {
    pub fn is_healthy(&self) -> bool {
        matches!(self, LivenessStatus::Healthy)
    }
}

/// Per-request timings and sizes.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ConversionStats {
    pub request_id: Uuid,
    pub input_bytes: u64,
    pub output_bytes: u64,
    /// Time spent waiting for a concurrency permit.
    pub queue_wait_ms: u64,
    /// Wall-clock time of the engine subprocess.
    pub engine_duration_ms: u64,
    pub total_duration_ms: u64,
}

/// A successfully converted document.
#[derive(Debug, Clone)]
pub struct ConvertedDocument {
    /// `<original stem><target extension>`, e.g. `report.docx`.
    pub file_name: String,
    pub bytes: Vec<u8>,
    pub stats: ConversionStats,
}

/// Service status document: what the original root endpoint reported.
#[derive(Debug, Clone, Serialize)]
pub struct ServiceInfo {
    pub service: &'static str,
    pub version: &'static str,
    #[serde(flatten)]
    pub status: LivenessStatus,
    pub supported_formats: Vec<&'static str>,
}

impl ServiceInfo {
    pub const SERVICE_NAME: &'static str = "Legacy Office Converter";

    pub fn new(status: LivenessStatus, formats: &SupportedFormatMap) -> Self {
        Self {
            service: Self::SERVICE_NAME,
            version: env!("CARGO_PKG_VERSION"),
            status,
            supported_formats: formats.source_extensions(),
        }
    }
}

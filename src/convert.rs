//! The inbound facade: [`Converter`].
//!
//! ## Request lifecycle
//!
//! ```text
//! resolve format ──▶ workspace ──▶ permit ──▶ engine ──▶ read output ──▶ release
//!   (400 on fail)     (tempdir)   (gate)    (execute)
//! ```
//!
//! Unsupported formats are rejected before anything touches the disk. Once a
//! workspace exists it is released on every path, including cancellation:
//! dropping the future drops the workspace handle (directory removed) and the
//! engine handle (process group killed).

use crate::config::ConverterConfig;
use crate::engine;
use crate::error::ConvertError;
use crate::format::base_name;
use crate::output::{
    ConversionOutcome, ConversionStats, ConvertedDocument, LivenessStatus, ServiceInfo,
};
use crate::request::ConversionRequest;
use crate::workspace::Workspace;
use futures::stream::{self, StreamExt};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};

/// Converts legacy Office documents with a bounded number of engine processes.
///
/// Cheap to clone; clones share the configuration and the concurrency gate.
///
/// # Example
/// ```rust,no_run
/// use office_modernize::{Converter, ConverterConfig};
///
/// # async fn run() -> Result<(), Box<dyn std::error::Error>> {
/// let converter = Converter::new(ConverterConfig::from_env());
/// let doc = converter.convert("report.doc", std::fs::read("report.doc")?).await?;
/// std::fs::write(&doc.file_name, &doc.bytes)?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct Converter {
    config: Arc<ConverterConfig>,
    gate: Arc<Semaphore>,
}

impl Converter {
    pub fn new(config: ConverterConfig) -> Self {
        let permits = config.effective_concurrency();
        debug!(
            "converter: engine={} permits={} isolation={:?}",
            config.engine_binary.display(),
            permits,
            config.isolation
        );
        Self {
            gate: Arc::new(Semaphore::new(permits)),
            config: Arc::new(config),
        }
    }

    pub fn config(&self) -> &ConverterConfig {
        &self.config
    }

    /// Permits currently free in the concurrency gate.
    pub fn available_permits(&self) -> usize {
        self.gate.available_permits()
    }

    /// Convert one uploaded document.
    ///
    /// # Arguments
    /// * `file_name`: the client-supplied name; only its final component is
    ///   used and its extension selects the target format
    /// * `bytes`: the document content
    ///
    /// # Errors
    /// * [`ConvertError::UnsupportedFormat`]: nothing was written or launched
    /// * [`ConvertError::Workspace`]: the request directory could not be used
    /// * [`ConvertError::ConversionFailed`]: the engine failed, timed out,
    ///   could not start, or produced no output
    pub async fn convert(
        &self,
        file_name: impl Into<String>,
        bytes: Vec<u8>,
    ) -> Result<ConvertedDocument, ConvertError> {
        let request = ConversionRequest::new(file_name, bytes, &self.config.formats)
            .inspect_err(|e| debug!("rejected upload: {}", e))?;
        self.convert_request(request).await
    }

    /// Convert an already validated request.
    pub async fn convert_request(
        &self,
        request: ConversionRequest,
    ) -> Result<ConvertedDocument, ConvertError> {
        let started = Instant::now();
        let id = request.id();
        let callback = self.config.progress_callback.as_ref();

        info!(
            "[{}] converting '{}' ({} bytes) {} → {}",
            id,
            request.file_name(),
            request.content().len(),
            request.source_extension(),
            request.mapping().target
        );
        if let Some(cb) = callback {
            cb.on_conversion_start(id, request.file_name());
        }

        let result = self.run(&request, started).await;

        match &result {
            Ok(doc) => info!(
                "[{}] converted '{}' → '{}' ({} bytes) in {}ms",
                id,
                request.file_name(),
                doc.file_name,
                doc.bytes.len(),
                doc.stats.total_duration_ms
            ),
            Err(e) => warn!("[{}] conversion of '{}' failed: {}", id, request.file_name(), e),
        }
        if let Some(cb) = callback {
            let message;
            let outcome = match &result {
                Ok(doc) => Ok(doc.file_name.as_str()),
                Err(e) => {
                    message = e.to_string();
                    Err(message.as_str())
                }
            };
            cb.on_conversion_complete(id, request.file_name(), outcome, started.elapsed());
        }
        result
    }

    async fn run(
        &self,
        request: &ConversionRequest,
        started: Instant,
    ) -> Result<ConvertedDocument, ConvertError> {
        let workspace = Workspace::acquire(
            self.config.workspace_root.as_deref(),
            request.id(),
            request.file_name(),
            request.content(),
        )
        .await?;

        let result = self.run_in(&workspace, request, started).await;
        workspace.release().await;
        result
    }

    async fn run_in(
        &self,
        workspace: &Workspace,
        request: &ConversionRequest,
        started: Instant,
    ) -> Result<ConvertedDocument, ConvertError> {
        let id = request.id();

        let queued = Instant::now();
        let permit = self
            .gate
            .acquire()
            .await
            .map_err(|_| ConvertError::Internal("conversion gate closed".into()))?;
        let queue_wait = queued.elapsed();
        if queue_wait > Duration::from_millis(100) {
            debug!("[{}] waited {:?} for an engine slot", id, queue_wait);
        }

        if let Some(cb) = &self.config.progress_callback {
            cb.on_engine_start(id, request.file_name());
        }
        let engine_started = Instant::now();
        let outcome = engine::execute(workspace, request.mapping(), &self.config).await;
        let engine_duration = engine_started.elapsed();
        drop(permit);

        let output_path = match outcome {
            ConversionOutcome::Success { output_path } => output_path,
            other => {
                log_failure(id, &other);
                return Err(ConvertError::ConversionFailed(other));
            }
        };

        let bytes = workspace.read(&output_path).await?;
        let stats = ConversionStats {
            request_id: id,
            input_bytes: request.content().len() as u64,
            output_bytes: bytes.len() as u64,
            queue_wait_ms: queue_wait.as_millis() as u64,
            engine_duration_ms: engine_duration.as_millis() as u64,
            total_duration_ms: started.elapsed().as_millis() as u64,
        };

        Ok(ConvertedDocument {
            file_name: request.output_name(),
            bytes,
            stats,
        })
    }

    /// Convert a local file and write the result into `out_dir`, or next to
    /// the input when `out_dir` is `None`.
    ///
    /// Uses atomic write (temp file + rename) to prevent partial files.
    /// Returns the path of the written document.
    pub async fn convert_path(
        &self,
        input: impl AsRef<Path>,
        out_dir: Option<&Path>,
    ) -> Result<PathBuf, ConvertError> {
        let input = input.as_ref();
        let file_name = input
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        self.config.formats.resolve(&file_name)?;

        let bytes = tokio::fs::read(input)
            .await
            .map_err(|source| ConvertError::InputReadFailed {
                path: input.to_path_buf(),
                source,
            })?;
        let doc = self.convert(file_name, bytes).await?;

        let dir = match out_dir {
            Some(dir) => dir.to_path_buf(),
            None => match input.parent() {
                Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
                _ => PathBuf::from("."),
            },
        };
        let dest = dir.join(base_name(&doc.file_name));
        write_atomic(&dest, &doc.bytes, doc.stats.request_id).await?;
        Ok(dest)
    }

    /// Convert many local files, up to the gate's width at a time.
    ///
    /// Results come back in completion order.
    pub async fn convert_many(
        &self,
        inputs: Vec<PathBuf>,
        out_dir: Option<&Path>,
    ) -> Vec<(PathBuf, Result<PathBuf, ConvertError>)> {
        let width = self.config.effective_concurrency();
        stream::iter(inputs.into_iter().map(|input| async move {
            let result = self.convert_path(&input, out_dir).await;
            (input, result)
        }))
        .buffer_unordered(width)
        .collect()
        .await
    }

    /// Probe the engine. Recomputed on every call.
    pub async fn health(&self) -> LivenessStatus {
        engine::probe(&self.config).await
    }

    /// Service name, version, liveness and supported formats.
    pub async fn service_info(&self) -> ServiceInfo {
        ServiceInfo::new(self.health().await, &self.config.formats)
    }

    /// Synchronous wrapper around [`Converter::convert`].
    ///
    /// Creates a temporary tokio runtime internally; do not call from inside
    /// an async context.
    pub fn convert_sync(
        &self,
        file_name: impl Into<String>,
        bytes: Vec<u8>,
    ) -> Result<ConvertedDocument, ConvertError> {
        tokio::runtime::Runtime::new()
            .map_err(|e| ConvertError::Internal(format!("Failed to create tokio runtime: {}", e)))?
            .block_on(self.convert(file_name, bytes))
    }
}

fn log_failure(id: uuid::Uuid, outcome: &ConversionOutcome) {
    match outcome {
        ConversionOutcome::EngineFailure {
            exit_code,
            stderr_excerpt,
        } => warn!(
            "[{}] engine failure: exit_code={:?} stderr={:?}",
            id, exit_code, stderr_excerpt
        ),
        ConversionOutcome::LaunchFailed { reason } => {
            warn!("[{}] engine launch failed: {}", id, reason)
        }
        other => warn!("[{}] engine {}", id, other.label()),
    }
}

async fn write_atomic(dest: &Path, bytes: &[u8], id: uuid::Uuid) -> Result<(), ConvertError> {
    let write_err = |source| ConvertError::OutputWriteFailed {
        path: dest.to_path_buf(),
        source,
    };

    if let Some(parent) = dest.parent() {
        tokio::fs::create_dir_all(parent).await.map_err(write_err)?;
    }

    let file_name = dest
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let tmp_path = dest.with_file_name(format!(".{file_name}.{id}.tmp"));

    if let Err(e) = tokio::fs::write(&tmp_path, bytes).await {
        let _ = tokio::fs::remove_file(&tmp_path).await;
        return Err(write_err(e));
    }
    if let Err(e) = tokio::fs::rename(&tmp_path, dest).await {
        let _ = tokio::fs::remove_file(&tmp_path).await;
        return Err(write_err(e));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineIsolation;
    use crate::error::ErrorClass;

    fn converter(root: &Path) -> Converter {
        Converter::new(
            ConverterConfig::builder()
                .engine_binary("/nonexistent/soffice")
                .workspace_root(root)
                .max_concurrent_conversions(3)
                .build()
                .unwrap(),
        )
    }

    #[tokio::test]
    async fn unsupported_format_touches_nothing() {
        let root = tempfile::tempdir().unwrap();
        let err = converter(root.path())
            .convert("notes.txt", b"hello".to_vec())
            .await
            .unwrap_err();
        assert!(matches!(err, ConvertError::UnsupportedFormat { .. }));
        assert_eq!(err.class(), ErrorClass::Client);
        assert_eq!(std::fs::read_dir(root.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn missing_engine_is_launch_failure_and_cleans_up() {
        let root = tempfile::tempdir().unwrap();
        let err = converter(root.path())
            .convert("report.doc", b"data".to_vec())
            .await
            .unwrap_err();
        match &err {
            ConvertError::ConversionFailed(ConversionOutcome::LaunchFailed { reason }) => {
                assert!(reason.starts_with("binary not found"), "got: {reason}")
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(err.class(), ErrorClass::Environment);
        assert_eq!(err.to_string(), crate::error::GENERIC_FAILURE_MESSAGE);
        assert_eq!(std::fs::read_dir(root.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn convert_path_rejects_before_reading() {
        let root = tempfile::tempdir().unwrap();
        let err = converter(root.path())
            .convert_path(root.path().join("missing.txt"), None)
            .await
            .unwrap_err();
        assert!(matches!(err, ConvertError::UnsupportedFormat { .. }));
    }

    #[tokio::test]
    async fn convert_path_reports_unreadable_input() {
        let root = tempfile::tempdir().unwrap();
        let err = converter(root.path())
            .convert_path(root.path().join("missing.doc"), None)
            .await
            .unwrap_err();
        assert!(matches!(err, ConvertError::InputReadFailed { .. }));
    }

    #[test]
    fn gate_width_follows_isolation() {
        let root = tempfile::tempdir().unwrap();
        assert_eq!(converter(root.path()).available_permits(), 3);

        let serial = Converter::new(
            ConverterConfig::builder()
                .max_concurrent_conversions(3)
                .isolation(EngineIsolation::Serialized)
                .build()
                .unwrap(),
        );
        assert_eq!(serial.available_permits(), 1);
    }

    #[tokio::test]
    async fn service_info_reports_unhealthy_engine() {
        let root = tempfile::tempdir().unwrap();
        let info = converter(root.path()).service_info().await;
        assert_eq!(info.service, "Legacy Office Converter");
        assert_eq!(
            info.status,
            LivenessStatus::Unhealthy {
                reason: "binary not found".into()
            }
        );
        assert_eq!(info.supported_formats, vec![".doc", ".xls", ".ppt"]);
    }

    #[tokio::test]
    async fn write_atomic_leaves_no_temp_file() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("out").join("a.docx");
        write_atomic(&dest, b"PK", uuid::Uuid::new_v4()).await.unwrap();
        assert_eq!(std::fs::read(&dest).unwrap(), b"PK");
        let names: Vec<_> = std::fs::read_dir(dest.parent().unwrap())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(names, vec![std::ffi::OsString::from("a.docx")]);
    }

    #[test]
    fn convert_sync_rejects_unsupported() {
        let root = tempfile::tempdir().unwrap();
        let err = converter(root.path())
            .convert_sync("deck.key", Vec::new())
            .unwrap_err();
        assert!(err.is_client_error());
    }
}

//! Run one conversion inside a prepared workspace.

use crate::config::ConverterConfig;
use crate::engine::command::conversion_command;
use crate::engine::process::{spawn_failure_reason, EngineProcess, Exit};
use crate::format::FormatMapping;
use crate::output::ConversionOutcome;
use crate::workspace::Workspace;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info, warn};

/// Convert `workspace.input_path()` to `mapping.target` with the engine.
///
/// Never fails: every way the engine can go wrong is a
/// [`ConversionOutcome`] variant. The workspace is left in place for the
/// caller to read and release.
pub async fn execute(
    workspace: &Workspace,
    mapping: &FormatMapping,
    config: &ConverterConfig,
) -> ConversionOutcome {
    let id = workspace.request_id();
    let started = Instant::now();
    let cmd = conversion_command(config, workspace, mapping);

    let mut process = match EngineProcess::spawn(cmd, config.stderr_excerpt_bytes) {
        Ok(p) => p,
        Err(e) => {
            warn!(
                "[{}] could not launch {}: {}",
                id,
                config.engine_binary.display(),
                e
            );
            return ConversionOutcome::LaunchFailed {
                reason: format!("{}: {}", spawn_failure_reason(&e), e),
            };
        }
    };
    debug!(
        "[{}] engine pid {:?} converting to {} ({:?} isolation)",
        id,
        process.pid(),
        mapping.filter,
        config.isolation
    );

    let exit = process
        .wait_with_deadline(config.conversion_timeout, config.kill_grace)
        .await;

    let status = match exit {
        Ok(Exit::Exited(status)) => status,
        Ok(Exit::TimedOut) => {
            warn!(
                "[{}] engine exceeded {:?}; process group killed",
                id, config.conversion_timeout
            );
            return ConversionOutcome::Timeout;
        }
        Err(e) => {
            warn!("[{}] failed waiting for engine: {}", id, e);
            return ConversionOutcome::EngineFailure {
                exit_code: None,
                stderr_excerpt: format!("failed waiting for engine: {e}"),
            };
        }
    };

    let stderr = process.collect_stderr(config.kill_grace).await;
    let elapsed = started.elapsed();

    if !status.success() {
        let stderr_excerpt = String::from_utf8_lossy(&stderr).trim().to_string();
        warn!(
            "[{}] engine exited with {} after {:?}: {}",
            id, status, elapsed, stderr_excerpt
        );
        return ConversionOutcome::EngineFailure {
            exit_code: status.code(),
            stderr_excerpt,
        };
    }

    let expected = expected_output_name(workspace.input_path(), mapping);
    match find_output(workspace.path(), &expected).await {
        Some(output_path) => {
            info!(
                "[{}] engine produced {} in {:?}",
                id,
                output_path.display(),
                elapsed
            );
            ConversionOutcome::Success { output_path }
        }
        None => {
            warn!(
                "[{}] engine exited 0 but {} is missing or empty",
                id, expected
            );
            if !stderr.is_empty() {
                debug!("[{}] engine stderr: {}", id, String::from_utf8_lossy(&stderr).trim());
            }
            ConversionOutcome::OutputMissing
        }
    }
}

/// `<input stem><target>`, the name the engine writes into `--outdir`.
pub fn expected_output_name(input: &Path, mapping: &FormatMapping) -> String {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    format!("{stem}{}", mapping.target)
}

/// Look for a non-empty `expected` in `dir`, exactly first and then
/// ignoring ASCII case.
async fn find_output(dir: &Path, expected: &str) -> Option<PathBuf> {
    let exact = dir.join(expected);
    if is_non_empty_file(&exact).await {
        return Some(exact);
    }

    let mut entries = tokio::fs::read_dir(dir).await.ok()?;
    while let Ok(Some(entry)) = entries.next_entry().await {
        let name = entry.file_name();
        if name.to_string_lossy().eq_ignore_ascii_case(expected) {
            let path = entry.path();
            if is_non_empty_file(&path).await {
                return Some(path);
            }
        }
    }
    None
}

async fn is_non_empty_file(path: &Path) -> bool {
    tokio::fs::metadata(path)
        .await
        .map(|m| m.is_file() && m.len() > 0)
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::STANDARD_MAPPINGS;

    #[test]
    fn expected_name_keeps_stem_case() {
        assert_eq!(
            expected_output_name(Path::new("/ws/REPORT.DOC"), &STANDARD_MAPPINGS[0]),
            "REPORT.docx"
        );
        assert_eq!(
            expected_output_name(Path::new("/ws/q1.sales.xls"), &STANDARD_MAPPINGS[1]),
            "q1.sales.xlsx"
        );
    }

    #[tokio::test]
    async fn find_output_prefers_exact_then_case_insensitive() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("deck.PPTX"), b"PK").unwrap();
        let found = find_output(dir.path(), "deck.pptx").await.unwrap();
        assert_eq!(found.file_name().unwrap(), "deck.PPTX");

        std::fs::write(dir.path().join("deck.pptx"), b"PK").unwrap();
        let found = find_output(dir.path(), "deck.pptx").await.unwrap();
        assert_eq!(found, dir.path().join("deck.pptx"));
    }

    #[tokio::test]
    async fn empty_output_does_not_count() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.docx"), b"").unwrap();
        assert!(find_output(dir.path(), "a.docx").await.is_none());
    }

    #[tokio::test]
    async fn directory_named_like_output_does_not_count() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("a.docx")).unwrap();
        assert!(find_output(dir.path(), "a.docx").await.is_none());
    }
}

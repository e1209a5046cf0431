//! Engine liveness check.

use crate::config::ConverterConfig;
use crate::engine::command::probe_command;
use crate::engine::process::{spawn_failure_reason, EngineProcess, Exit};
use crate::output::LivenessStatus;
use tracing::{debug, warn};

/// Run `<engine> --version` under `config.probe_timeout`.
///
/// Independent of any in-flight conversion and recomputed on every call.
pub async fn probe(config: &ConverterConfig) -> LivenessStatus {
    let status = run_probe(config).await;
    match &status {
        LivenessStatus::Healthy => debug!("engine {} is healthy", config.engine_binary.display()),
        LivenessStatus::Unhealthy { reason } => warn!(
            "engine {} is unhealthy: {}",
            config.engine_binary.display(),
            reason
        ),
    }
    status
}

async fn run_probe(config: &ConverterConfig) -> LivenessStatus {
    let mut process = match EngineProcess::spawn(probe_command(config), 0) {
        Ok(p) => p,
        Err(e) => {
            debug!("probe spawn failed: {}", e);
            return unhealthy(spawn_failure_reason(&e));
        }
    };

    match process
        .wait_with_deadline(config.probe_timeout, config.kill_grace)
        .await
    {
        Ok(Exit::Exited(status)) if status.success() => LivenessStatus::Healthy,
        Ok(Exit::Exited(status)) => match status.code() {
            Some(code) => unhealthy(format!("binary exited with status {code}")),
            None => unhealthy("binary terminated by signal"),
        },
        Ok(Exit::TimedOut) => unhealthy("binary not responding"),
        Err(e) => {
            debug!("probe wait failed: {}", e);
            unhealthy("binary not responding")
        }
    }
}

fn unhealthy(reason: impl Into<String>) -> LivenessStatus {
    LivenessStatus::Unhealthy {
        reason: reason.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_binary_is_not_found() {
        let config = ConverterConfig::builder()
            .engine_binary("/nonexistent/path/to/soffice")
            .build()
            .unwrap();
        assert_eq!(
            probe(&config).await,
            LivenessStatus::Unhealthy {
                reason: "binary not found".into()
            }
        );
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn non_executable_file_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("soffice");
        std::fs::write(&path, "#!/bin/sh\nexit 0\n").unwrap();
        let config = ConverterConfig::builder()
            .engine_binary(&path)
            .build()
            .unwrap();
        assert_eq!(
            probe(&config).await,
            LivenessStatus::Unhealthy {
                reason: "binary not executable".into()
            }
        );
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn true_and_false_binaries() {
        let ok = ConverterConfig::builder().engine_binary("true").build().unwrap();
        assert!(probe(&ok).await.is_healthy());

        let bad = ConverterConfig::builder().engine_binary("false").build().unwrap();
        assert_eq!(
            probe(&bad).await,
            LivenessStatus::Unhealthy {
                reason: "binary exited with status 1".into()
            }
        );
    }
}

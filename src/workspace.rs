//! Request-scoped working directories.
//!
//! ## Lifecycle
//!
//! ```text
//! acquire ──▶ <tmp>/office-modernize-<uuid>-XXXXXX/
//!               ├── <file name>        uploaded bytes
//!               ├── profile/           engine user installation
//!               └── <stem>.<target>    written by the engine
//! release ──▶ directory removed
//! ```
//!
//! The directory is owned by a [`tempfile::TempDir`]. [`Workspace::release`]
//! removes it explicitly and logs failures; any other way of letting go of
//! the handle (an early `?`, a panic, the caller dropping the request future
//! when a client disconnects) removes it in `Drop`. An abrupt kill of the
//! whole process can still leave directories behind; they carry the
//! `office-modernize-` prefix so an operator can sweep them.

use crate::error::WorkspaceError;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tracing::{debug, warn};
use uuid::Uuid;

/// Prefix of every workspace directory name.
pub const WORKSPACE_PREFIX: &str = "office-modernize-";

/// Name of the engine profile directory inside a workspace.
pub const PROFILE_DIR: &str = "profile";

/// A unique directory holding one request's files.
#[derive(Debug)]
pub struct Workspace {
    dir: TempDir,
    request_id: Uuid,
    input_path: PathBuf,
    profile_dir: PathBuf,
}

impl Workspace {
    /// Create a fresh workspace and write `content` to `<workspace>/<file_name>`.
    ///
    /// The directory name comes from the request id plus a random suffix and
    /// never from user input. `file_name` must already be a bare file name.
    ///
    /// # Errors
    /// Any [`WorkspaceError`]; a partially created directory is removed
    /// before returning.
    pub async fn acquire(
        root: Option<&Path>,
        request_id: Uuid,
        file_name: &str,
        content: &[u8],
    ) -> Result<Self, WorkspaceError> {
        let root = root
            .map(Path::to_path_buf)
            .unwrap_or_else(std::env::temp_dir);

        let dir = tempfile::Builder::new()
            .prefix(&format!("{WORKSPACE_PREFIX}{request_id}-"))
            .tempdir_in(&root)
            .map_err(|source| WorkspaceError::Create {
                root: root.clone(),
                source,
            })?;

        let profile_dir = dir.path().join(PROFILE_DIR);
        tokio::fs::create_dir(&profile_dir)
            .await
            .map_err(|source| WorkspaceError::Profile {
                path: profile_dir.clone(),
                source,
            })?;

        let input_path = dir.path().join(file_name);
        tokio::fs::write(&input_path, content)
            .await
            .map_err(|source| WorkspaceError::WriteInput {
                path: input_path.clone(),
                source,
            })?;

        debug!(
            "[{}] workspace {} ({} bytes input)",
            request_id,
            dir.path().display(),
            content.len()
        );

        Ok(Self {
            dir,
            request_id,
            input_path,
            profile_dir,
        })
    }

    /// The workspace directory; also the engine's `--outdir` and working directory.
    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn request_id(&self) -> Uuid {
        self.request_id
    }

    /// Absolute path of the uploaded document.
    pub fn input_path(&self) -> &Path {
        &self.input_path
    }

    /// Private engine user-installation directory.
    pub fn profile_dir(&self) -> &Path {
        &self.profile_dir
    }

    /// Read a file the engine produced.
    pub async fn read(&self, path: &Path) -> Result<Vec<u8>, WorkspaceError> {
        tokio::fs::read(path)
            .await
            .map_err(|source| WorkspaceError::ReadOutput {
                path: path.to_path_buf(),
                source,
            })
    }

    /// Remove the directory and everything in it.
    ///
    /// Never fails: a removal error is logged and the outcome of the request
    /// stands.
    pub async fn release(self) {
        let request_id = self.request_id;
        let path = self.dir.path().to_path_buf();
        let dir = self.dir;

        match tokio::task::spawn_blocking(move || dir.close()).await {
            Ok(Ok(())) => debug!("[{}] workspace removed", request_id),
            Ok(Err(e)) => warn!(
                "[{}] failed to remove workspace {}: {}",
                request_id,
                path.display(),
                e
            ),
            Err(e) => warn!(
                "[{}] workspace cleanup task failed for {}: {}",
                request_id,
                path.display(),
                e
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn acquire_writes_input_and_profile() {
        let root = tempfile::tempdir().unwrap();
        let id = Uuid::new_v4();
        let ws = Workspace::acquire(Some(root.path()), id, "report.doc", b"hello")
            .await
            .unwrap();

        assert!(ws.path().starts_with(root.path()));
        assert!(ws
            .path()
            .file_name()
            .unwrap()
            .to_string_lossy()
            .starts_with(&format!("{WORKSPACE_PREFIX}{id}-")));
        assert_eq!(std::fs::read(ws.input_path()).unwrap(), b"hello");
        assert!(ws.profile_dir().is_dir());
        assert_eq!(ws.input_path().parent(), Some(ws.path()));
    }

    #[tokio::test]
    async fn release_removes_everything() {
        let root = tempfile::tempdir().unwrap();
        let ws = Workspace::acquire(Some(root.path()), Uuid::new_v4(), "a.xls", b"x")
            .await
            .unwrap();
        std::fs::write(ws.path().join("a.xlsx"), b"out").unwrap();
        let path = ws.path().to_path_buf();

        ws.release().await;
        assert!(!path.exists());
        assert_eq!(std::fs::read_dir(root.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn drop_removes_directory() {
        let root = tempfile::tempdir().unwrap();
        let ws = Workspace::acquire(Some(root.path()), Uuid::new_v4(), "a.ppt", b"x")
            .await
            .unwrap();
        let path = ws.path().to_path_buf();
        drop(ws);
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn same_request_name_gets_distinct_directories() {
        let root = tempfile::tempdir().unwrap();
        let id = Uuid::new_v4();
        let a = Workspace::acquire(Some(root.path()), id, "same.doc", b"a")
            .await
            .unwrap();
        let b = Workspace::acquire(Some(root.path()), id, "same.doc", b"b")
            .await
            .unwrap();
        assert_ne!(a.path(), b.path());
        assert_eq!(std::fs::read(a.input_path()).unwrap(), b"a");
        assert_eq!(std::fs::read(b.input_path()).unwrap(), b"b");
    }

    #[tokio::test]
    async fn missing_root_is_a_create_error() {
        let root = tempfile::tempdir().unwrap();
        let missing = root.path().join("does-not-exist");
        let err = Workspace::acquire(Some(&missing), Uuid::new_v4(), "a.doc", b"x")
            .await
            .unwrap_err();
        assert!(matches!(err, WorkspaceError::Create { .. }));
    }

    #[tokio::test]
    async fn read_reports_missing_output() {
        let root = tempfile::tempdir().unwrap();
        let ws = Workspace::acquire(Some(root.path()), Uuid::new_v4(), "a.doc", b"x")
            .await
            .unwrap();
        let err = ws.read(&ws.path().join("a.docx")).await.unwrap_err();
        assert!(matches!(err, WorkspaceError::ReadOutput { .. }));
    }
}

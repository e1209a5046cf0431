//! Command-line contract with the conversion engine.
//!
//! ```text
//! soffice -env:UserInstallation=file:///<ws>/profile
//!         --headless --invisible --nologo --nodefault --norestore --nolockcheck
//!         --convert-to docx --outdir <ws> <ws>/report.doc
//! ```
//!
//! The input is always passed as an absolute path, so a file name that
//! begins with `-` cannot be mistaken for an option.

use crate::config::{ConverterConfig, EngineIsolation};
use crate::format::FormatMapping;
use crate::workspace::Workspace;
use std::ffi::OsString;
use std::path::Path;
use std::process::Stdio;
use tokio::process::Command;

/// Flags that keep the engine from opening windows, dialogs, or recovery UI.
pub const HEADLESS_FLAGS: [&str; 6] = [
    "--headless",
    "--invisible",
    "--nologo",
    "--nodefault",
    "--norestore",
    "--nolockcheck",
];

/// Flag used by the liveness probe.
pub const VERSION_FLAG: &str = "--version";

/// Arguments for converting the workspace input to `mapping.filter`.
pub fn conversion_args(
    workspace: &Workspace,
    mapping: &FormatMapping,
    isolation: EngineIsolation,
) -> Vec<OsString> {
    let mut args: Vec<OsString> = Vec::with_capacity(12);

    if isolation == EngineIsolation::PerRequestProfile {
        args.push(user_installation_arg(workspace.profile_dir()));
    }
    args.extend(HEADLESS_FLAGS.iter().map(OsString::from));
    args.push("--convert-to".into());
    args.push(mapping.filter.into());
    args.push("--outdir".into());
    args.push(workspace.path().as_os_str().to_os_string());
    args.push(workspace.input_path().as_os_str().to_os_string());
    args
}

/// A ready-to-spawn conversion command.
///
/// stdin is closed, stdout/stderr are piped for bounded capture, the working
/// directory is the workspace, and the child is killed if its handle is
/// dropped. On Unix the child leads a new process group so it can be
/// signalled together with any helpers it forks.
pub fn conversion_command(
    config: &ConverterConfig,
    workspace: &Workspace,
    mapping: &FormatMapping,
) -> Command {
    let mut cmd = engine_command(config);
    cmd.args(conversion_args(workspace, mapping, config.isolation))
        .current_dir(workspace.path())
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    cmd
}

/// A ready-to-spawn `--version` command with all output discarded.
pub fn probe_command(config: &ConverterConfig) -> Command {
    let mut cmd = engine_command(config);
    cmd.arg(VERSION_FLAG)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null());
    cmd
}

/// Base command: own process group on Unix, killed when the handle drops.
fn engine_command(config: &ConverterConfig) -> Command {
    let mut std_cmd = std::process::Command::new(&config.engine_binary);
    #[cfg(unix)]
    {
        use std::os::unix::process::CommandExt;
        std_cmd.process_group(0);
    }
    let mut cmd = Command::from(std_cmd);
    cmd.kill_on_drop(true);
    cmd
}

/// `-env:UserInstallation=<file URL>` for an isolated profile directory.
pub fn user_installation_arg(profile_dir: &Path) -> OsString {
    format!("-env:UserInstallation={}", file_url(profile_dir)).into()
}

/// Encode an absolute path as a `file://` URL.
///
/// Bytes outside the RFC 3986 unreserved set (plus `/` and `:`) are
/// percent-encoded; Windows separators become `/`.
pub fn file_url(path: &Path) -> String {
    let raw = path.to_string_lossy().replace('\\', "/");
    let mut url = String::with_capacity(raw.len() + 8);
    url.push_str("file://");
    if !raw.starts_with('/') {
        url.push('/');
    }
    for b in raw.bytes() {
        match b {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'.' | b'_' | b'~' | b'/' | b':' => {
                url.push(b as char)
            }
            _ => url.push_str(&format!("%{b:02X}")),
        }
    }
    url
}

//! # soffice-locate
//!
//! Find the LibreOffice `soffice` launcher so callers never have to hard-code
//! an install path.
//!
//! ## How it works
//!
//! [`locate`] checks, in order:
//!
//! 1. `LIBREOFFICE_BINARY`: an explicit path or bare command name.
//! 2. Every directory on `PATH` for `soffice` (`soffice.exe` on Windows),
//!    then for the `libreoffice` wrapper shipped by some distributions.
//! 3. Well-known install locations for the current platform (see table).
//!
//! A successful lookup from steps 2–3 is cached for the process lifetime.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use soffice_locate::{default_binary, locate};
//!
//! // Strict: error if nothing usable is installed.
//! let soffice = locate().expect("LibreOffice is not installed");
//!
//! // Lenient: fall back to the bare name and let the OS resolve it at spawn time.
//! let program = default_binary();
//! ```
//!
//! ## Platform support
//!
//! | OS      | Well-known locations                                                     |
//! |---------|--------------------------------------------------------------------------|
//! | Linux   | `/usr/bin`, `/usr/lib/libreoffice/program`, `/opt/libreoffice*/program`, snap, flatpak |
//! | macOS   | `/Applications/LibreOffice.app`, `~/Applications/LibreOffice.app`        |
//! | Windows | `%ProgramFiles%\LibreOffice\program`, `%ProgramFiles(x86)%\…`            |
//!
//! ## Environment variable overrides
//!
//! - `LIBREOFFICE_BINARY`: path or command name of the engine to use.

use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use thiserror::Error;

// ── Public constants ─────────────────────────────────────────────────────────

/// Environment variable holding an explicit engine path or command name.
pub const ENGINE_ENV_VAR: &str = "LIBREOFFICE_BINARY";

/// Conventional command name, resolved through `PATH` at spawn time.
pub const DEFAULT_BINARY: &str = "soffice";

// ── Error type ───────────────────────────────────────────────────────────────

/// Errors returned by soffice-locate lookups.
#[derive(Error, Debug)]
pub enum LocateError {
    /// `LIBREOFFICE_BINARY` names a path that does not exist or cannot be run.
    #[error("{var} points to '{path}', which is not an executable file")]
    OverrideUnusable { var: &'static str, path: PathBuf },

    /// Nothing usable on `PATH` or in any well-known location.
    #[error("LibreOffice not found on PATH or in {} well-known locations", searched.len())]
    NotFound { searched: Vec<PathBuf> },
}

// ── Internal: platform metadata ──────────────────────────────────────────────

/// Command names tried on `PATH`, most specific first.
fn candidate_names() -> &'static [&'static str] {
    if cfg!(windows) {
        &["soffice.exe", "soffice.com"]
    } else {
        &["soffice", "libreoffice"]
    }
}

/// Install locations probed after `PATH`, for the current platform.
pub fn well_known_locations() -> Vec<PathBuf> {
    let mut out = Vec::new();

    match std::env::consts::OS {
        "linux" | "freebsd" | "openbsd" | "netbsd" => {
            for p in [
                "/usr/bin/soffice",
                "/usr/local/bin/soffice",
                "/usr/lib/libreoffice/program/soffice",
                "/usr/lib64/libreoffice/program/soffice",
                "/opt/libreoffice/program/soffice",
                "/snap/bin/libreoffice",
                "/var/lib/flatpak/exports/bin/org.libreoffice.LibreOffice",
            ] {
                out.push(PathBuf::from(p));
            }
            // Versioned tarball installs: /opt/libreoffice7.6/program/soffice
            if let Ok(entries) = std::fs::read_dir("/opt") {
                let mut versioned: Vec<PathBuf> = entries
                    .filter_map(|e| e.ok())
                    .filter(|e| e.file_name().to_string_lossy().starts_with("libreoffice"))
                    .map(|e| e.path().join("program").join("soffice"))
                    .collect();
                versioned.sort();
                versioned.reverse();
                out.extend(versioned);
            }
            if let Some(data) = dirs::data_local_dir() {
                out.push(data.join("flatpak/exports/bin/org.libreoffice.LibreOffice"));
            }
        }
        "macos" => {
            out.push(PathBuf::from(
                "/Applications/LibreOffice.app/Contents/MacOS/soffice",
            ));
            if let Some(home) = dirs::home_dir() {
                out.push(home.join("Applications/LibreOffice.app/Contents/MacOS/soffice"));
            }
        }
        "windows" => {
            for var in ["ProgramFiles", "ProgramFiles(x86)", "ProgramW6432"] {
                if let Some(base) = std::env::var_os(var) {
                    out.push(
                        PathBuf::from(base)
                            .join("LibreOffice")
                            .join("program")
                            .join("soffice.exe"),
                    );
                }
            }
        }
        _ => {}
    }

    out
}

// ── Thread-safe singleton path cache ─────────────────────────────────────────

static LOCATED: OnceLock<PathBuf> = OnceLock::new();

// ── Public API ───────────────────────────────────────────────────────────────

/// Returns the value of `LIBREOFFICE_BINARY`, if set and non-empty.
pub fn configured_binary() -> Option<PathBuf> {
    std::env::var_os(ENGINE_ENV_VAR)
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
}

/// Locate a usable `soffice` binary.
///
/// An explicit `LIBREOFFICE_BINARY` always wins: a bare command name is
/// searched on `PATH`, a path must point to an executable file. Otherwise
/// `PATH` and then [`well_known_locations`] are searched.
pub fn locate() -> Result<PathBuf, LocateError> {
    if let Some(explicit) = configured_binary() {
        return resolve_explicit(&explicit);
    }

    if let Some(path) = LOCATED.get() {
        return Ok(path.clone());
    }

    let path = search()?;

    // Best-effort cache (ignore race; both lookups agree).
    let _ = LOCATED.set(path.clone());

    Ok(path)
}

/// The program to launch when no explicit path is configured.
///
/// Unlike [`locate`] this never fails: an explicit `LIBREOFFICE_BINARY` is
/// returned verbatim (so a broken override surfaces as a launch failure
/// rather than being silently replaced), and when nothing is installed the
/// bare [`DEFAULT_BINARY`] name is returned for the OS to resolve.
pub fn default_binary() -> PathBuf {
    if let Some(explicit) = configured_binary() {
        return explicit;
    }
    locate().unwrap_or_else(|_| PathBuf::from(DEFAULT_BINARY))
}

/// Search every directory in the process `PATH` for `name`.
pub fn find_in_path(name: &str) -> Option<PathBuf> {
    let path_var = std::env::var_os("PATH")?;
    find_in_search_path(name, &path_var)
}

/// Search the directories of a `PATH`-style list for an executable `name`.
pub fn find_in_search_path(name: &str, search_path: &OsStr) -> Option<PathBuf> {
    std::env::split_paths(search_path)
        .filter(|dir| !dir.as_os_str().is_empty())
        .map(|dir| dir.join(name))
        .find(|candidate| is_executable(candidate))
}

/// Returns `true` if `path` is a regular file the current user may execute.
pub fn is_executable(path: &Path) -> bool {
    let Ok(meta) = std::fs::metadata(path) else {
        return false;
    };
    if !meta.is_file() {
        return false;
    }

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        meta.permissions().mode() & 0o111 != 0
    }

    #[cfg(not(unix))]
    {
        true
    }
}

// ── Internal helpers ─────────────────────────────────────────────────────────

fn resolve_explicit(explicit: &Path) -> Result<PathBuf, LocateError> {
    let is_bare_name = explicit.components().count() == 1 && !explicit.is_absolute();

    if is_bare_name {
        if let Some(found) = explicit.to_str().and_then(find_in_path) {
            return Ok(found);
        }
    } else if is_executable(explicit) {
        return Ok(explicit.to_path_buf());
    }

    Err(LocateError::OverrideUnusable {
        var: ENGINE_ENV_VAR,
        path: explicit.to_path_buf(),
    })
}

fn search() -> Result<PathBuf, LocateError> {
    for name in candidate_names() {
        if let Some(found) = find_in_path(name) {
            return Ok(found);
        }
    }

    let locations = well_known_locations();
    if let Some(found) = locations.iter().find(|p| is_executable(p)) {
        return Ok(found.clone());
    }

    Err(LocateError::NotFound { searched: locations })
}

// ── Tests ─────────────────────────────────────────────────────────────────────

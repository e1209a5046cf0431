//! # office-modernize
//!
//! Convert legacy binary Office documents (`.doc`, `.xls`, `.ppt`) to their
//! Office Open XML successors (`.docx`, `.xlsx`, `.pptx`) by driving a
//! headless LibreOffice.
//!
//! ## Why this crate?
//!
//! LibreOffice converts old Office files well, but running it as a service is
//! fiddly: it wants a private user profile per instance, it happily hangs on a
//! malformed file, it forks helpers that outlive the parent, and it litters
//! the file system. This crate wraps each conversion in an isolated scratch
//! directory, races the engine against a deadline, kills its whole process
//! group on timeout or cancellation, and bounds how many engines run at once.
//!
//! ## Pipeline Overview
//!
//! ```text
//! (file name, bytes)
//!  │
//!  ├─ 1. Resolve    extension → target format (.doc → .docx, …)
//!  ├─ 2. Workspace  fresh temp dir: input file + private engine profile
//!  ├─ 3. Gate       wait for one of N engine permits
//!  ├─ 4. Engine     soffice --headless --convert-to <fmt>, deadline + killpg
//!  ├─ 5. Collect    read <stem>.<fmt> back from the workspace
//!  └─ 6. Release    remove the workspace on every path
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use office_modernize::{Converter, ConverterConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Engine taken from LIBREOFFICE_BINARY, else located on this machine
//!     let converter = Converter::new(ConverterConfig::from_env());
//!     if !converter.health().await.is_healthy() {
//!         eprintln!("LibreOffice is not usable");
//!     }
//!     let bytes = std::fs::read("budget.xls")?;
//!     let doc = converter.convert("budget.xls", bytes).await?;
//!     std::fs::write(&doc.file_name, &doc.bytes)?;
//!     eprintln!("engine: {}ms", doc.stats.engine_duration_ms);
//!     Ok(())
//! }
//! ```
//!
//! ## Errors at a service boundary
//!
//! [`ConvertError::status_code`] and [`ConvertError::public_message`] give a
//! web layer what it needs: 400 with the supported-format list for
//! unsupported uploads, 500 with a generic message for everything else.
//! Engine diagnostics (exit code, stderr) are logged through `tracing` only.
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `office-modernize` binary (clap + anyhow + indicatif + tracing-subscriber) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! office-modernize = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod convert;
pub mod engine;
pub mod error;
pub mod format;
pub mod output;
pub mod progress;
pub mod request;
pub mod workspace;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{ConverterConfig, ConverterConfigBuilder, EngineIsolation};
pub use convert::Converter;
pub use error::{ConvertError, ErrorClass, WorkspaceError, GENERIC_FAILURE_MESSAGE};
pub use format::{DocumentKind, FormatMapping, SupportedFormatMap, STANDARD_MAPPINGS};
pub use output::{ConversionOutcome, ConversionStats, ConvertedDocument, LivenessStatus, ServiceInfo};
pub use progress::{ConversionProgressCallback, NoopProgressCallback, ProgressCallback};
pub use request::ConversionRequest;
pub use workspace::Workspace;

//! Everything that talks to the conversion engine (LibreOffice `soffice`).
//!
//! ## Data Flow
//!
//! ```text
//! workspace ──▶ command ──▶ process ──▶ executor ──▶ ConversionOutcome
//!   (files)      (argv)     (spawn,     (exit code,
//!                            deadline,   output lookup)
//!                            killpg)
//!
//! config ──▶ command ──▶ process ──▶ probe ──▶ LivenessStatus
//! ```
//!
//! 1. [`command`]: the argv handed to the engine (headless flags, the isolated
//!    `-env:UserInstallation` profile, `--convert-to`, `--outdir`)
//! 2. `process`: spawn in a fresh process group, bounded stderr capture,
//!    SIGTERM → grace → SIGKILL on the whole group
//! 3. [`executor`]: run one conversion and map exit status and workspace contents to
//!    a [`crate::output::ConversionOutcome`]
//! 4. [`probe`]: `--version` liveness check under a short deadline

pub mod command;
pub mod executor;
pub mod probe;
mod process;

pub use executor::execute;
pub use probe::probe;

//! CLI binary for office-modernize.
//!
//! A thin shim over the library crate that maps CLI flags
//! to `ConverterConfig` and prints results.

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use office_modernize::{
    ConversionProgressCallback, ConvertError, Converter, ConverterConfig, EngineIsolation,
    ErrorClass, LivenessStatus, ProgressCallback,
};
use serde::Serialize;
use std::io;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress callback: one bar over all inputs plus a log line per
/// finished file. Files finish out of order when conversions run in parallel.
struct CliProgressCallback {
    bar: ProgressBar,
    running: AtomicUsize,
    errors: AtomicUsize,
}

impl CliProgressCallback {
    fn new(total: usize) -> Arc<Self> {
        let bar = ProgressBar::new(total as u64);
        let style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>3}/{len} files  \
             ⏱ {elapsed_precise}  {msg}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);

        bar.set_style(style);
        bar.set_prefix("Converting");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            running: AtomicUsize::new(0),
            errors: AtomicUsize::new(0),
        })
    }

    fn finish(&self) {
        self.bar.finish_and_clear();
        let total = self.bar.length().unwrap_or(0) as usize;
        let failed = self.errors.load(Ordering::SeqCst);
        if failed == 0 {
            eprintln!(
                "{} {} files converted successfully",
                green("✔"),
                bold(&total.to_string())
            );
        } else {
            eprintln!(
                "{} {}/{} files converted  ({} failed)",
                red("✘"),
                bold(&(total.saturating_sub(failed)).to_string()),
                total,
                red(&failed.to_string()),
            );
        }
    }
}

impl ConversionProgressCallback for CliProgressCallback {
    fn on_engine_start(&self, _request_id: Uuid, file_name: &str) {
        let running = self.running.fetch_add(1, Ordering::SeqCst) + 1;
        self.bar
            .set_message(format!("{file_name} ({running} running)"));
    }

    fn on_conversion_complete(
        &self,
        _request_id: Uuid,
        file_name: &str,
        outcome: Result<&str, &str>,
        elapsed: Duration,
    ) {
        // Workspace failures complete without ever starting the engine.
        let _ = self
            .running
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1));

        match outcome {
            Ok(output) => self.bar.println(format!(
                "  {} {}  →  {}  {}",
                green("✓"),
                file_name,
                output,
                dim(&format!("{:.1}s", elapsed.as_secs_f64())),
            )),
            Err(error) => {
                self.errors.fetch_add(1, Ordering::SeqCst);
                self.bar.println(format!(
                    "  {} {}  {}  {}",
                    red("✗"),
                    file_name,
                    red(error),
                    dim(&format!("{:.1}s", elapsed.as_secs_f64())),
                ));
            }
        }
        self.bar.inc(1);
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Convert next to the input (report.doc → report.docx)
  office-modernize report.doc

  # Convert a batch into another directory, 2 engines at a time
  office-modernize -c 2 --out-dir converted/ archive/*.doc archive/*.xls

  # Check that LibreOffice is usable
  office-modernize --health

  # Machine-readable results
  office-modernize --json slides.ppt > result.json

SUPPORTED FORMATS:
  .doc  →  .docx   (Word 97-2003)
  .xls  →  .xlsx   (Excel 97-2003)
  .ppt  →  .pptx   (PowerPoint 97-2003)

ENVIRONMENT VARIABLES:
  LIBREOFFICE_BINARY              Path or name of the soffice binary
  OFFICE_MODERNIZE_TIMEOUT        Per-file conversion timeout in seconds
  OFFICE_MODERNIZE_CONCURRENCY    Maximum simultaneous engine processes
  OFFICE_MODERNIZE_WORKSPACE_ROOT Parent directory for scratch workspaces
  RUST_LOG                        Log filter (overrides -v / -q)

SETUP:
  Install LibreOffice (e.g. `apt install libreoffice-core`). The binary is
  found through LIBREOFFICE_BINARY, then PATH, then the usual install
  locations for your platform.
"#;

/// Convert legacy Office documents to OOXML with a headless LibreOffice.
#[derive(Parser, Debug)]
#[command(
    name = "office-modernize",
    version,
    about = "Convert .doc/.xls/.ppt files to .docx/.xlsx/.pptx with a headless LibreOffice",
    long_about = "Convert legacy binary Office documents to their Office Open XML successors. \
Every file is converted in its own scratch directory with a private LibreOffice profile, \
under a timeout, with a bounded number of engines running at once.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Legacy Office files to convert.
    #[arg(required_unless_present_any = ["health", "formats"])]
    inputs: Vec<PathBuf>,

    /// Write converted files here instead of next to each input.
    #[arg(short, long, env = "OFFICE_MODERNIZE_OUT_DIR")]
    out_dir: Option<PathBuf>,

    /// LibreOffice binary (path or name on PATH).
    #[arg(long, env = "LIBREOFFICE_BINARY")]
    engine: Option<PathBuf>,

    /// Per-file conversion timeout in seconds.
    #[arg(long, env = "OFFICE_MODERNIZE_TIMEOUT", default_value_t = 60,
          value_parser = clap::value_parser!(u64).range(1..))]
    timeout: u64,

    /// Liveness probe timeout in seconds.
    #[arg(long, env = "OFFICE_MODERNIZE_PROBE_TIMEOUT", default_value_t = 5,
          value_parser = clap::value_parser!(u64).range(1..))]
    probe_timeout: u64,

    /// Seconds between SIGTERM and SIGKILL for a timed-out engine.
    #[arg(long, env = "OFFICE_MODERNIZE_KILL_GRACE", default_value_t = 3,
          value_parser = clap::value_parser!(u64).range(1..))]
    kill_grace: u64,

    /// Maximum simultaneous engine processes (default: CPUs, at most 4).
    #[arg(short, long, env = "OFFICE_MODERNIZE_CONCURRENCY")]
    concurrency: Option<usize>,

    /// Share the default LibreOffice profile and run one engine at a time.
    #[arg(long, env = "OFFICE_MODERNIZE_SERIALIZE")]
    serialize: bool,

    /// Parent directory for per-file scratch workspaces.
    #[arg(long, env = "OFFICE_MODERNIZE_WORKSPACE_ROOT")]
    workspace_root: Option<PathBuf>,

    /// Probe the engine and print service status; exit 1 when unhealthy.
    #[arg(long, conflicts_with = "inputs")]
    health: bool,

    /// List supported conversions and exit.
    #[arg(long, conflicts_with = "inputs")]
    formats: bool,

    /// Output structured JSON instead of text.
    #[arg(long, env = "OFFICE_MODERNIZE_JSON")]
    json: bool,

    /// Disable progress bar.
    #[arg(long, env = "OFFICE_MODERNIZE_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "OFFICE_MODERNIZE_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "OFFICE_MODERNIZE_QUIET")]
    quiet: bool,
}

/// One line of `--json` output for a converted (or failed) file.
#[derive(Serialize)]
struct FileReport {
    input: PathBuf,
    #[serde(skip_serializing_if = "Option::is_none")]
    output: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error_class: Option<ErrorClass>,
}

impl FileReport {
    fn new(input: PathBuf, result: &Result<PathBuf, ConvertError>) -> Self {
        match result {
            Ok(output) => Self {
                input,
                output: Some(output.clone()),
                error: None,
                error_class: None,
            },
            Err(e) => Self {
                input,
                output: None,
                error: Some(e.to_string()),
                error_class: Some(e.class()),
            },
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // Suppress INFO-level library logs when the progress bar is active;
    // the bar provides all the feedback that matters to the user.
    let converting = !cli.health && !cli.formats;
    let show_progress = converting && !cli.quiet && !cli.no_progress && !cli.json;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    // ── Build config ─────────────────────────────────────────────────────
    let progress = show_progress.then(|| CliProgressCallback::new(cli.inputs.len()));
    let config = build_config(
        &cli,
        progress
            .clone()
            .map(|cb| cb as Arc<dyn ConversionProgressCallback>),
    )?;

    // ── Formats ──────────────────────────────────────────────────────────
    if cli.formats {
        let mappings = config.formats.mappings();
        if cli.json {
            println!(
                "{}",
                serde_json::to_string_pretty(mappings).context("Failed to serialise formats")?
            );
        } else {
            for m in mappings {
                println!("{:<5} →  {:<6} ({:?})", m.source, m.target, m.kind);
            }
        }
        return Ok(());
    }

    let converter = Converter::new(config);

    // ── Health ───────────────────────────────────────────────────────────
    if cli.health {
        let info = converter.service_info().await;
        if cli.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&info).context("Failed to serialise status")?
            );
        } else {
            println!("Service:      {} {}", info.service, info.version);
            println!("Engine:       {}", converter.config().engine_binary.display());
            match &info.status {
                LivenessStatus::Healthy => println!("Status:       {}", green("healthy")),
                LivenessStatus::Unhealthy { reason } => {
                    println!("Status:       {} ({})", red("unhealthy"), reason)
                }
            }
            println!("Formats:      {}", info.supported_formats.join(", "));
        }
        if let LivenessStatus::Unhealthy { reason } = info.status {
            anyhow::bail!("LibreOffice is not usable: {reason}");
        }
        return Ok(());
    }

    // ── Run conversions ──────────────────────────────────────────────────
    if let Some(dir) = &cli.out_dir {
        tokio::fs::create_dir_all(dir)
            .await
            .with_context(|| format!("Failed to create output directory {:?}", dir))?;
    }

    let results = converter
        .convert_many(cli.inputs.clone(), cli.out_dir.as_deref())
        .await;
    if let Some(cb) = &progress {
        cb.finish();
    }

    let failed = results.iter().filter(|(_, r)| r.is_err()).count();

    if cli.json {
        let reports: Vec<FileReport> = results
            .iter()
            .map(|(input, result)| FileReport::new(input.clone(), result))
            .collect();
        println!(
            "{}",
            serde_json::to_string_pretty(&reports).context("Failed to serialise results")?
        );
    } else if !cli.quiet && !show_progress {
        for (input, result) in &results {
            match result {
                Ok(output) => eprintln!("{} → {}", input.display(), output.display()),
                Err(e) => eprintln!("{} ✗ {}", input.display(), e),
            }
        }
    } else if cli.quiet {
        for (input, result) in &results {
            if let Err(e) = result {
                eprintln!("{}: {}", input.display(), e);
            }
        }
    }

    if failed > 0 {
        anyhow::bail!("{failed} of {} files failed to convert", results.len());
    }
    Ok(())
}

/// Map CLI args to `ConverterConfig`.
fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<ConverterConfig> {
    let engine = cli
        .engine
        .clone()
        .unwrap_or_else(soffice_locate::default_binary);

    let mut builder = ConverterConfig::builder()
        .engine_binary(engine)
        .conversion_timeout(Duration::from_secs(cli.timeout))
        .probe_timeout(Duration::from_secs(cli.probe_timeout.min(cli.timeout)))
        .kill_grace(Duration::from_secs(cli.kill_grace));

    if let Some(n) = cli.concurrency {
        builder = builder.max_concurrent_conversions(n);
    }
    if cli.serialize {
        builder = builder.isolation(EngineIsolation::Serialized);
    }
    if let Some(root) = &cli.workspace_root {
        builder = builder.workspace_root(root);
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}

//! Configuration types for legacy Office conversion.
//!
//! All behaviour is controlled through [`ConverterConfig`], built via its
//! [`ConverterConfigBuilder`]. The config is immutable once a
//! [`crate::Converter`] owns it: the executor and the prober read from it
//! and never consult the environment themselves.

use crate::error::ConvertError;
use crate::format::SupportedFormatMap;
use crate::progress::ProgressCallback;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

/// How concurrent engine invocations are kept from corrupting each other.
///
/// LibreOffice keeps a user profile (registry, lock file, caches) that it
/// assumes it owns. Two instances pointed at the same profile either refuse
/// to start or hand work to each other's process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EngineIsolation {
    /// Every invocation gets a private `-env:UserInstallation` profile inside
    /// its own workspace. Conversions run in parallel up to
    /// [`ConverterConfig::max_concurrent_conversions`]. (default)
    #[default]
    PerRequestProfile,
    /// The engine's default shared profile is used and invocations are
    /// serialised through a single permit. Throughput drops to one
    /// conversion at a time.
    Serialized,
}

/// Configuration for a [`crate::Converter`].
///
/// Built via [`ConverterConfig::builder()`], [`ConverterConfig::from_env()`]
/// or [`ConverterConfig::default()`].
///
/// # Example
/// ```rust
/// use office_modernize::ConverterConfig;
/// use std::time::Duration;
///
/// let config = ConverterConfig::builder()
///     .engine_binary("/usr/bin/soffice")
///     .conversion_timeout(Duration::from_secs(90))
///     .max_concurrent_conversions(2)
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct ConverterConfig {
    /// Program launched for conversions and probes. Default: `soffice`.
    ///
    /// A bare name is resolved through `PATH` when the process is spawned.
    pub engine_binary: PathBuf,

    /// Supported legacy → modern mappings.
    pub formats: SupportedFormatMap,

    /// Wall-clock limit for one engine run. Default: 60 s.
    pub conversion_timeout: Duration,

    /// Wall-clock limit for a liveness probe. Default: 5 s.
    ///
    /// Must not exceed `conversion_timeout`.
    pub probe_timeout: Duration,

    /// Time allowed between SIGTERM and SIGKILL. Default: 3 s.
    ///
    /// A timed-out conversion returns within
    /// `conversion_timeout + 2 × kill_grace`.
    pub kill_grace: Duration,

    /// Upper bound on simultaneously running engine processes.
    /// Default: available CPUs, capped at 4.
    ///
    /// Each LibreOffice instance holds a few hundred MB; this gate is the
    /// throughput limit of the whole service. Ignored (forced to 1) under
    /// [`EngineIsolation::Serialized`].
    pub max_concurrent_conversions: usize,

    /// Profile isolation strategy. Default: per-request profile.
    pub isolation: EngineIsolation,

    /// Bytes of engine stderr kept for diagnostics. Default: 2048.
    pub stderr_excerpt_bytes: usize,

    /// Parent directory for request workspaces. Default: system temp dir.
    pub workspace_root: Option<PathBuf>,

    /// Receives request lifecycle events. Default: none.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for ConverterConfig {
    fn default() -> Self {
        Self {
            engine_binary: PathBuf::from(soffice_locate::DEFAULT_BINARY),
            formats: SupportedFormatMap::standard(),
            conversion_timeout: Duration::from_secs(60),
            probe_timeout: Duration::from_secs(5),
            kill_grace: Duration::from_secs(3),
            max_concurrent_conversions: default_concurrency(),
            isolation: EngineIsolation::default(),
            stderr_excerpt_bytes: 2048,
            workspace_root: None,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for ConverterConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConverterConfig")
            .field("engine_binary", &self.engine_binary)
            .field("formats", &self.formats.source_extensions())
            .field("conversion_timeout", &self.conversion_timeout)
            .field("probe_timeout", &self.probe_timeout)
            .field("kill_grace", &self.kill_grace)
            .field("max_concurrent_conversions", &self.max_concurrent_conversions)
            .field("isolation", &self.isolation)
            .field("stderr_excerpt_bytes", &self.stderr_excerpt_bytes)
            .field("workspace_root", &self.workspace_root)
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<dyn ConversionProgressCallback>"),
            )
            .finish()
    }
}

impl ConverterConfig {
    /// Create a new builder for `ConverterConfig`.
    pub fn builder() -> ConverterConfigBuilder {
        ConverterConfigBuilder {
            config: Self::default(),
        }
    }

    /// Defaults, with the engine taken from `LIBREOFFICE_BINARY` or located
    /// on this machine (see [`soffice_locate::default_binary`]).
    pub fn from_env() -> Self {
        Self {
            engine_binary: soffice_locate::default_binary(),
            ..Self::default()
        }
    }

    /// Number of engine processes allowed to run at once.
    pub fn effective_concurrency(&self) -> usize {
        match self.isolation {
            EngineIsolation::PerRequestProfile => self.max_concurrent_conversions.max(1),
            EngineIsolation::Serialized => 1,
        }
    }
}

fn default_concurrency() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
        .clamp(1, 4)
}

/// Builder for [`ConverterConfig`].
#[derive(Debug)]
pub struct ConverterConfigBuilder {
    config: ConverterConfig,
}

impl ConverterConfigBuilder {
    pub fn engine_binary(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.engine_binary = path.into();
        self
    }

    pub fn conversion_timeout(mut self, timeout: Duration) -> Self {
        self.config.conversion_timeout = timeout;
        self
    }

    pub fn probe_timeout(mut self, timeout: Duration) -> Self {
        self.config.probe_timeout = timeout;
        self
    }

    pub fn kill_grace(mut self, grace: Duration) -> Self {
        self.config.kill_grace = grace;
        self
    }

    pub fn max_concurrent_conversions(mut self, n: usize) -> Self {
        self.config.max_concurrent_conversions = n.max(1);
        self
    }

    pub fn isolation(mut self, isolation: EngineIsolation) -> Self {
        self.config.isolation = isolation;
        self
    }

    pub fn stderr_excerpt_bytes(mut self, n: usize) -> Self {
        self.config.stderr_excerpt_bytes = n;
        self
    }

    pub fn workspace_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.config.workspace_root = Some(root.into());
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ConverterConfig, ConvertError> {
        let c = &self.config;
        if c.engine_binary.as_os_str().is_empty() {
            return Err(ConvertError::InvalidConfig(
                "engine binary must not be empty".into(),
            ));
        }
        if c.conversion_timeout.is_zero() {
            return Err(ConvertError::InvalidConfig(
                "conversion timeout must be > 0".into(),
            ));
        }
        if c.probe_timeout.is_zero() || c.probe_timeout > c.conversion_timeout {
            return Err(ConvertError::InvalidConfig(format!(
                "probe timeout must be > 0 and ≤ conversion timeout ({:?}), got {:?}",
                c.conversion_timeout, c.probe_timeout
            )));
        }
        if c.kill_grace.is_zero() {
            return Err(ConvertError::InvalidConfig("kill grace must be > 0".into()));
        }
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_service_contract() {
        let c = ConverterConfig::default();
        assert_eq!(c.engine_binary, PathBuf::from("soffice"));
        assert_eq!(c.conversion_timeout, Duration::from_secs(60));
        assert!(c.probe_timeout < c.conversion_timeout);
        assert_eq!(c.isolation, EngineIsolation::PerRequestProfile);
        assert!((1..=4).contains(&c.max_concurrent_conversions));
    }

    #[test]
    fn builder_rejects_probe_longer_than_conversion() {
        let err = ConverterConfig::builder()
            .conversion_timeout(Duration::from_secs(2))
            .probe_timeout(Duration::from_secs(5))
            .build()
            .unwrap_err();
        assert!(matches!(err, ConvertError::InvalidConfig(_)));
    }

    #[test]
    fn builder_rejects_zero_timeout() {
        assert!(ConverterConfig::builder()
            .conversion_timeout(Duration::ZERO)
            .build()
            .is_err());
        assert!(ConverterConfig::builder()
            .kill_grace(Duration::ZERO)
            .build()
            .is_err());
    }

    #[test]
    fn builder_clamps_concurrency() {
        let c = ConverterConfig::builder()
            .max_concurrent_conversions(0)
            .build()
            .unwrap();
        assert_eq!(c.max_concurrent_conversions, 1);
    }

    #[test]
    fn serialized_isolation_forces_single_permit() {
        let c = ConverterConfig::builder()
            .max_concurrent_conversions(8)
            .isolation(EngineIsolation::Serialized)
            .build()
            .unwrap();
        assert_eq!(c.effective_concurrency(), 1);
    }

    #[test]
    fn debug_hides_callback() {
        let c = ConverterConfig::builder()
            .progress_callback(std::sync::Arc::new(crate::progress::NoopProgressCallback))
            .build()
            .unwrap();
        let dbg = format!("{c:?}");
        assert!(dbg.contains("<dyn ConversionProgressCallback>"));
    }
}

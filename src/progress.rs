//! Progress-callback trait for per-request lifecycle events.
//!
//! Inject an [`Arc<dyn ConversionProgressCallback>`] via
//! [`crate::config::ConverterConfigBuilder::progress_callback`] to observe
//! requests as they move through the converter:
//!
//! ```text
//! on_conversion_start ─▶ (queue for a permit) ─▶ on_engine_start ─▶ on_conversion_complete
//! ```
//!
//! Unsupported formats fail before `on_conversion_start`; workspace failures
//! skip `on_engine_start` but still report `on_conversion_complete`.
//!
//! # Example
//!
//! ```rust
//! use office_modernize::{ConversionProgressCallback, ConverterConfig};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//! use uuid::Uuid;
//!
//! struct Launches(AtomicUsize);
//!
//! impl ConversionProgressCallback for Launches {
//!     fn on_engine_start(&self, _id: Uuid, file_name: &str) {
//!         let n = self.0.fetch_add(1, Ordering::SeqCst) + 1;
//!         eprintln!("engine #{n} started for {file_name}");
//!     }
//! }
//!
//! let config = ConverterConfig::builder()
//!     .progress_callback(Arc::new(Launches(AtomicUsize::new(0))))
//!     .build()
//!     .unwrap();
//! ```

use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

/// Called by the converter as a request progresses.
///
/// Implementations must be `Send + Sync`: concurrent requests call in from
/// different tasks. All methods default to no-ops.
pub trait ConversionProgressCallback: Send + Sync {
    /// The request passed format validation and is about to get a workspace.
    fn on_conversion_start(&self, request_id: Uuid, file_name: &str) {
        let _ = (request_id, file_name);
    }

    /// A concurrency permit was granted and the engine is being launched.
    fn on_engine_start(&self, request_id: Uuid, file_name: &str) {
        let _ = (request_id, file_name);
    }

    /// The request reached a terminal state.
    ///
    /// # Arguments
    /// * `outcome`: `Ok(output_name)` or the error's display text
    /// * `elapsed`: wall-clock time since `on_conversion_start`
    fn on_conversion_complete(
        &self,
        request_id: Uuid,
        file_name: &str,
        outcome: Result<&str, &str>,
        elapsed: Duration,
    ) {
        let _ = (request_id, file_name, outcome, elapsed);
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl ConversionProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::ConverterConfig`].
pub type ProgressCallback = Arc<dyn ConversionProgressCallback>;

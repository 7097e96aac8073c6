//! Progress-callback trait for per-file batch events.
//!
//! Inject an [`Arc<dyn BatchProgressCallback>`] via
//! [`crate::config::OcrConfigBuilder::progress_callback`] to receive events
//! as [`crate::process::OcrProcessor::process_directory`] works through a
//! directory.
//!
//! # Why callbacks instead of channels?
//!
//! Callers can forward events to a terminal progress bar, a log, or a
//! channel without the library knowing how the host application reports
//! progress.
//!
//! # Example
//!
//! ```rust
//! use edgequake_ocr::{BatchProgressCallback, OcrConfig};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct CountingCallback {
//!     done: AtomicUsize,
//! }
//!
//! impl BatchProgressCallback for CountingCallback {
//!     fn on_file_complete(&self, index: usize, total: usize, name: &str, _len: usize) {
//!         self.done.fetch_add(1, Ordering::SeqCst);
//!         eprintln!("{index}/{total} {name}");
//!     }
//! }
//!
//! let config = OcrConfig::builder()
//!     .progress_callback(Arc::new(CountingCallback { done: AtomicUsize::new(0) }))
//!     .build()
//!     .unwrap();
//! ```

use std::sync::Arc;

/// Called by batch processing as it handles each file.
///
/// All methods have default no-op implementations so callers only override
/// what they care about. Files are processed sequentially, so events for
/// one file never interleave with another's.
pub trait BatchProgressCallback: Send + Sync {
    /// Called once before any file is processed.
    fn on_batch_start(&self, total_files: usize) {
        let _ = total_files;
    }

    /// Called before a file is submitted.
    ///
    /// # Arguments
    /// * `index` — 1-indexed position in the batch
    /// * `total` — number of files in the batch
    /// * `name`  — file name without directory
    fn on_file_start(&self, index: usize, total: usize, name: &str) {
        let _ = (index, total, name);
    }

    /// Called when a file produced a success result.
    ///
    /// `content_len` is the byte length of the assembled content.
    fn on_file_complete(&self, index: usize, total: usize, name: &str, content_len: usize) {
        let _ = (index, total, name, content_len);
    }

    /// Called when a file produced an error result.
    fn on_file_error(&self, index: usize, total: usize, name: &str, error: &str) {
        let _ = (index, total, name, error);
    }

    /// Called once after every file has been attempted.
    fn on_batch_complete(&self, total_files: usize, success_count: usize) {
        let _ = (total_files, success_count);
    }
}

/// A no-op implementation; the default when no callback is configured.
pub struct NoopProgressCallback;

impl BatchProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::OcrConfig`].
pub type ProgressCallback = Arc<dyn BatchProgressCallback>;

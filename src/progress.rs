//! Progress-callback trait for per-file upload events.
//!
//! Pass an [`Arc<dyn UploadProgressCallback>`] in
//! [`crate::upload::UploadOptions::progress`] to be told what the upload loop
//! is doing as it works through a batch. The library never prints; the
//! binary renders these events with a terminal progress bar.
//!
//! # Example
//!
//! ```rust
//! use papra_ingest::{UploadOptions, UploadProgressCallback};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct CountingCallback {
//!     uploaded: AtomicUsize,
//! }
//!
//! impl UploadProgressCallback for CountingCallback {
//!     fn on_file_complete(&self, index: usize, total: usize, document_id: Option<&str>) {
//!         self.uploaded.fetch_add(1, Ordering::SeqCst);
//!         eprintln!("{index}/{total} uploaded as {document_id:?}");
//!     }
//! }
//!
//! let counter = Arc::new(CountingCallback {
//!     uploaded: AtomicUsize::new(0),
//! });
//!
//! let options = UploadOptions {
//!     progress: Some(counter as Arc<dyn UploadProgressCallback>),
//!     ..Default::default()
//! };
//! ```

use std::path::Path;
use std::sync::Arc;

/// Called by the upload loop as it processes each file.
///
/// Files are processed one after another, but the trait is `Send + Sync` so
/// the callback can be shared with other tasks. Every method has a no-op
/// default. Indices are 1-based.
pub trait UploadProgressCallback: Send + Sync {
    /// Called once, after the source path has been resolved to files.
    fn on_batch_start(&self, total_files: usize) {
        let _ = total_files;
    }

    /// Called before a file is tagged and uploaded.
    fn on_file_start(&self, index: usize, total: usize, path: &Path) {
        let _ = (index, total, path);
    }

    /// Called when autotagging produced tags for the current file.
    fn on_tags_generated(&self, index: usize, tags: &[String]) {
        let _ = (index, tags);
    }

    /// Called with a non-fatal problem for the current file: autotag fell
    /// back to the manual tags, an upload attempt is being retried, or tags
    /// could not be attached.
    fn on_file_warning(&self, index: usize, message: &str) {
        let _ = (index, message);
    }

    /// Called when the file was uploaded.
    fn on_file_complete(&self, index: usize, total: usize, document_id: Option<&str>) {
        let _ = (index, total, document_id);
    }

    /// Called when the file could not be uploaded after all retries.
    fn on_file_error(&self, index: usize, total: usize, error: &str) {
        let _ = (index, total, error);
    }

    /// Called once after every file has been attempted.
    fn on_batch_complete(&self, total_files: usize, succeeded: usize) {
        let _ = (total_files, succeeded);
    }
}

/// A callback that ignores every event. Used when none is configured.
pub struct NoopProgressCallback;

impl UploadProgressCallback for NoopProgressCallback {}

/// The shared callback type held by [`crate::upload::UploadOptions`].
pub type ProgressCallback = Arc<dyn UploadProgressCallback>;

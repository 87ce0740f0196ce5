//! Progress-callback trait for per-slide download events.
//!
//! Inject an [`Arc<dyn DownloadProgressCallback>`] via
//! [`crate::config::DeckConfigBuilder::progress_callback`] to receive events
//! as the fetch scheduler works through the deck.
//!
//! # Example
//!
//! ```rust
//! use slidedeck_dl::{DownloadProgressCallback, DeckConfig};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct CountingCallback {
//!     completed: AtomicUsize,
//! }
//!
//! impl DownloadProgressCallback for CountingCallback {
//!     fn on_slide_complete(&self, slide: u32, total: u32, bytes: usize) {
//!         let done = self.completed.fetch_add(1, Ordering::SeqCst) + 1;
//!         eprintln!("slide {slide}/{total} ({bytes} bytes), {done} done");
//!     }
//! }
//!
//! let config = DeckConfig::builder()
//!     .progress_callback(Arc::new(CountingCallback { completed: AtomicUsize::new(0) }))
//!     .build()
//!     .unwrap();
//! ```

use std::sync::Arc;

/// Called by the fetch scheduler as it processes each slide.
///
/// Slides are fetched concurrently, so `on_slide_*` may be called from
/// several tasks at once and in any order. All methods default to no-ops.
pub trait DownloadProgressCallback: Send + Sync {
    /// Called once before the first chunk starts.
    fn on_download_start(&self, total_slides: u32) {
        let _ = total_slides;
    }

    /// Called when a chunk acquires its proxy and becomes eligible to run.
    ///
    /// # Arguments
    /// * `chunk`  — 1-indexed chunk number
    /// * `slides` — number of slides in the chunk
    /// * `proxy`  — the proxy shared by the chunk, `None` for direct connections
    fn on_chunk_start(&self, chunk: usize, slides: usize, proxy: Option<&str>) {
        let _ = (chunk, slides, proxy);
    }

    /// Called when a slide has been downloaded and normalised.
    ///
    /// `bytes` is the size of the normalised JPEG.
    fn on_slide_complete(&self, slide: u32, total_slides: u32, bytes: usize) {
        let _ = (slide, total_slides, bytes);
    }

    /// Called when a slide fails. The whole download fails with it.
    fn on_slide_error(&self, slide: u32, total_slides: u32, error: &str) {
        let _ = (slide, total_slides, error);
    }

    /// Called once after every slide has been fetched successfully.
    fn on_download_complete(&self, total_slides: u32, elapsed_ms: u64) {
        let _ = (total_slides, elapsed_ms);
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl DownloadProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::DeckConfig`].
pub type ProgressCallback = Arc<dyn DownloadProgressCallback>;

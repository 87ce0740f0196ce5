//! Error types for the slidedeck-dl library.
//!
//! Every failure that reaches a caller is fatal for the request: the pipeline
//! never hands back a partial image set or a partial document. Soft
//! "not found" outcomes of the markup scrape are not errors at all; they are
//! carried as [`crate::pipeline::extract::Lookup`] values and only become a
//! [`DeckError`] when an entry point decides it cannot proceed without them.

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the slidedeck-dl library.
#[derive(Debug, Error)]
pub enum DeckError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// The encoded deck address is not valid base64 / ASCII / percent-encoding.
    #[error("Encoded deck address could not be decoded: {reason}")]
    InvalidEncodedUrl { reason: String },

    /// The decoded input is not an absolute HTTP/HTTPS URL.
    #[error("Invalid input '{input}': not a valid HTTP/HTTPS URL")]
    InvalidInput { input: String },

    /// The deck's viewer page could not be downloaded.
    #[error("Failed to download viewer page '{url}': {reason}")]
    PageFetchFailed { url: String, reason: String },

    /// The viewer page download exceeded the configured timeout.
    #[error("Viewer page download timed out after {secs}s for '{url}'")]
    PageTimeout { url: String, secs: u64 },

    // ── Markup errors ─────────────────────────────────────────────────────
    /// The slide count is unknown, so no fetch jobs can be generated.
    #[error("Slide count unavailable: {reason}")]
    SlideCountUnavailable { reason: String },

    /// No multi-resolution descriptor was found for the first slide image.
    #[error("Slide image descriptor not found: {reason}")]
    VariantNotFound { reason: String },

    /// The highest-resolution descriptor entry could not be parsed.
    #[error("Malformed slide image descriptor entry '{entry}': {reason}")]
    MalformedVariant { entry: String, reason: String },

    /// The sampled image URL does not contain the `-1-<width>` marker.
    #[error("Slide image URL '{url}' does not contain the marker '{marker}'")]
    TemplateMismatch { url: String, marker: String },

    /// A slide number outside `1..=slide_count` was requested.
    #[error("Slide {slide} is out of range (deck has {total} slides)")]
    SlideOutOfRange { slide: u32, total: u32 },

    // ── Fetch errors ──────────────────────────────────────────────────────
    /// A slide image request failed (connection error or non-success status).
    #[error("Failed to download slide {slide} from '{url}': {reason}")]
    SlideFetchFailed {
        slide: u32,
        url: String,
        reason: String,
    },

    /// A slide image request exceeded the per-fetch timeout.
    #[error("Slide {slide} download timed out after {secs}s")]
    SlideTimeout { slide: u32, secs: u64 },

    /// A slide image body exceeded the configured size cap.
    #[error("Slide {slide} is larger than {max_bytes} bytes")]
    SlideTooLarge { slide: u32, max_bytes: u64 },

    /// The proxy source could not supply a proxy.
    #[error("No proxy available: {reason}")]
    ProxyUnavailable { reason: String },

    // ── Image / document errors ───────────────────────────────────────────
    /// A fetched blob could not be decoded or re-encoded.
    #[error("Slide {slide}: image decode failed: {detail}")]
    DecodeFailed { slide: u32, detail: String },

    /// The assembler was asked for a slide that was never fetched.
    #[error("Slide {slide} is missing from the downloaded image set")]
    MissingSlide { slide: u32 },

    /// Serialising the presentation package failed.
    #[error("Failed to write presentation: {0}")]
    DocumentWrite(String),

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Could not create or write the output file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl DeckError {
    /// Whether the failure came from the network and might succeed on a
    /// later request. Only used to grade log output; nothing is retried.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            DeckError::PageFetchFailed { .. }
                | DeckError::PageTimeout { .. }
                | DeckError::SlideFetchFailed { .. }
                | DeckError::SlideTimeout { .. }
                | DeckError::ProxyUnavailable { .. }
        )
    }

    /// The slide number the error is attached to, if any.
    pub fn slide(&self) -> Option<u32> {
        match self {
            DeckError::SlideFetchFailed { slide, .. }
            | DeckError::SlideTimeout { slide, .. }
            | DeckError::SlideTooLarge { slide, .. }
            | DeckError::DecodeFailed { slide, .. }
            | DeckError::MissingSlide { slide }
            | DeckError::SlideOutOfRange { slide, .. } => Some(*slide),
            _ => None,
        }
    }
}

impl From<zip::result::ZipError> for DeckError {
    fn from(e: zip::result::ZipError) -> Self {
        DeckError::DocumentWrite(e.to_string())
    }
}

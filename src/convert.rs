//! Entry points: inspect a deck, download it whole, or fetch one slide.
//!
//! Every entry point starts from the deck's viewer URL, downloads the page
//! once and scrapes it. [`inspect`] stops there. [`download`] runs the
//! whole pipeline and refuses to start fetching unless the page yielded
//! both a slide count and a usable image template.

use crate::config::DeckConfig;
use crate::error::DeckError;
use crate::output::{DeckMetadata, DeckOutput, DownloadStats};
use crate::pipeline::extract::{self, Lookup, PageScrape, SlideImageVariant};
use crate::pipeline::normalize::NormalizedImage;
use crate::pipeline::template::{FetchJob, SlideUrlTemplate};
use crate::pipeline::{assemble, fetch::FetchScheduler, input};
use crate::proxy::proxy_source;
use std::path::Path;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Read title, slide count and image template without fetching any slide.
///
/// A missing slide count or image descriptor is not an error here; the
/// corresponding fields are `None`. A descriptor that exists but cannot be
/// parsed, or whose URL has no `-1-<width>` marker, is.
pub async fn inspect(
    url: impl AsRef<str>,
    config: &DeckConfig,
) -> Result<DeckMetadata, DeckError> {
    let (url, page) = load_page(url.as_ref(), config).await?;

    let slide_count = match page.slide_count {
        Lookup::Found(n) => Some(n),
        Lookup::NotFound(reason) => {
            debug!("Slide count not found: {}", reason);
            None
        }
        Lookup::Malformed(detail) => {
            warn!("Slide count unreadable: {}", detail);
            None
        }
    };

    let template = match page.variant {
        Lookup::Found(variant) => Some(SlideUrlTemplate::derive(&variant)?),
        Lookup::NotFound(reason) => {
            debug!("Slide image descriptor not found: {}", reason);
            None
        }
        Lookup::Malformed(detail) => return Err(malformed_variant(detail)),
    };

    Ok(metadata(url, page.title, slide_count, template, config))
}

/// Download every slide of a deck and assemble the `.pptx` package.
///
/// # Errors
/// Any failure aborts the whole request; no partial document is produced.
/// Besides network and decode failures this includes a viewer page that
/// does not state a slide count of at least one
/// ([`DeckError::SlideCountUnavailable`]) or carries no image descriptor
/// ([`DeckError::VariantNotFound`]).
pub async fn download(url: impl AsRef<str>, config: &DeckConfig) -> Result<DeckOutput, DeckError> {
    let total_start = Instant::now();
    let (url, page) = load_page(url.as_ref(), config).await?;
    info!("Starting download: {}", url);

    let slide_count = require_slide_count(page.slide_count)?;
    let template = SlideUrlTemplate::derive(&require_variant(page.variant)?)?;
    info!(
        "Deck has {} slides at {}px: {}",
        slide_count, template.pixel_width, template.pattern
    );

    let scheduler = FetchScheduler::new(proxy_source(config)?, config);
    let report = scheduler.fetch_all(&template, slide_count).await?;

    let title = page.title.clone();
    let images = report.images;
    let bytes = tokio::task::spawn_blocking(move || assemble::assemble(&title, images, slide_count))
        .await
        .map_err(|e| DeckError::Internal(format!("Assemble task panicked: {e}")))??;

    let stats = DownloadStats {
        slide_count,
        chunks: report.chunks,
        fetch_duration_ms: report.elapsed_ms,
        total_duration_ms: total_start.elapsed().as_millis() as u64,
        output_bytes: bytes.len(),
    };
    info!(
        "Download complete: {} slides, {} bytes, {}ms total",
        stats.slide_count, stats.output_bytes, stats.total_duration_ms
    );

    Ok(DeckOutput {
        bytes,
        metadata: metadata(url, page.title, Some(slide_count), Some(template), config),
        stats,
    })
}

/// Download a deck and write the package to `output_path`.
///
/// Uses atomic write (temp file + rename) to prevent partial files.
pub async fn download_to_file(
    url: impl AsRef<str>,
    output_path: impl AsRef<Path>,
    config: &DeckConfig,
) -> Result<DownloadStats, DeckError> {
    let output = download(url, config).await?;
    let path = output_path.as_ref();
    write_atomic(path, &output.bytes).await?;
    info!("Wrote {}", path.display());
    Ok(output.stats)
}

/// Synchronous wrapper around [`download`].
///
/// Creates a temporary tokio runtime internally.
pub fn download_sync(url: impl AsRef<str>, config: &DeckConfig) -> Result<DeckOutput, DeckError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| DeckError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(download(url, config))
}

/// Fetch and normalise a single slide (1-based).
pub async fn fetch_slide(
    url: impl AsRef<str>,
    slide: u32,
    config: &DeckConfig,
) -> Result<NormalizedImage, DeckError> {
    let (url, page) = load_page(url.as_ref(), config).await?;

    let total = require_slide_count(page.slide_count)?;
    if slide == 0 || slide > total {
        return Err(DeckError::SlideOutOfRange { slide, total });
    }
    let template = SlideUrlTemplate::derive(&require_variant(page.variant)?)?;

    let job = FetchJob {
        index: slide,
        url: template.url_for(slide),
    };
    debug!("Fetching slide {} of {} from {}", slide, url, job.url);

    FetchScheduler::new(proxy_source(config)?, config)
        .fetch_one(&job)
        .await
}

// ── Internal helpers ─────────────────────────────────────────────────────

async fn load_page(url: &str, config: &DeckConfig) -> Result<(String, PageScrape), DeckError> {
    let url = input::validate_url(url)?;
    let html = input::fetch_viewer_page(&url, config).await?;
    Ok((url, extract::scrape(&html)))
}

fn require_slide_count(lookup: Lookup<u32>) -> Result<u32, DeckError> {
    match lookup {
        Lookup::Found(0) => Err(DeckError::SlideCountUnavailable {
            reason: "deck reports zero slides".into(),
        }),
        Lookup::Found(n) => Ok(n),
        Lookup::NotFound(reason) => Err(DeckError::SlideCountUnavailable {
            reason: reason.to_string(),
        }),
        Lookup::Malformed(detail) => Err(DeckError::SlideCountUnavailable { reason: detail }),
    }
}

fn require_variant(lookup: Lookup<SlideImageVariant>) -> Result<SlideImageVariant, DeckError> {
    match lookup {
        Lookup::Found(variant) => Ok(variant),
        Lookup::NotFound(reason) => Err(DeckError::VariantNotFound {
            reason: reason.to_string(),
        }),
        Lookup::Malformed(detail) => Err(malformed_variant(detail)),
    }
}

fn malformed_variant(detail: String) -> DeckError {
    DeckError::MalformedVariant {
        entry: "srcset".into(),
        reason: detail,
    }
}

fn metadata(
    url: String,
    title: String,
    slide_count: Option<u32>,
    template: Option<SlideUrlTemplate>,
    config: &DeckConfig,
) -> DeckMetadata {
    DeckMetadata {
        url,
        title,
        slide_count,
        template,
        estimated_seconds: slide_count.map_or(0, |n| u64::from(n) * config.seconds_per_slide),
    }
}

async fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), DeckError> {
    let failed = |e: std::io::Error| DeckError::OutputWriteFailed {
        path: path.to_path_buf(),
        source: e,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await.map_err(failed)?;
    }

    let tmp_path = path.with_extension("pptx.tmp");
    tokio::fs::write(&tmp_path, bytes).await.map_err(failed)?;
    tokio::fs::rename(&tmp_path, path).await.map_err(failed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_slides_is_unavailable() {
        assert!(matches!(
            require_slide_count(Lookup::Found(0)),
            Err(DeckError::SlideCountUnavailable { .. })
        ));
        assert_eq!(require_slide_count(Lookup::Found(7)).unwrap(), 7);
    }

    #[test]
    fn unknown_slide_count_is_unavailable() {
        assert!(require_slide_count(Lookup::NotFound("gone")).is_err());
        assert!(require_slide_count(Lookup::Malformed("x".into())).is_err());
    }

    #[test]
    fn missing_variant_is_reported_as_such() {
        assert!(matches!(
            require_variant(Lookup::NotFound("gone")),
            Err(DeckError::VariantNotFound { .. })
        ));
        assert!(matches!(
            require_variant(Lookup::Malformed("bad".into())),
            Err(DeckError::MalformedVariant { .. })
        ));
    }

    #[test]
    fn estimate_scales_with_slide_count() {
        let config = DeckConfig::default();
        let m = metadata("https://x.test/d".into(), "t".into(), Some(12), None, &config);
        assert_eq!(m.estimated_seconds, 24);
        let m = metadata("https://x.test/d".into(), "t".into(), None, None, &config);
        assert_eq!(m.estimated_seconds, 0);
    }

    #[tokio::test]
    async fn invalid_url_fails_before_network() {
        let err = inspect("not-a-url", &DeckConfig::default()).await.unwrap_err();
        assert!(matches!(err, DeckError::InvalidInput { .. }));
    }
}

//! # slidedeck-dl
//!
//! Rebuild a hosted slide deck as a `.pptx` presentation.
//!
//! The deck's viewer page only links one image per slide, but its first
//! slide image carries a `srcset` listing every resolution. The URL of the
//! widest entry encodes the slide index next to the width
//! (`…-1-2048.jpg`), so swapping the index yields the URL of every other
//! slide. This crate scrapes that template, fetches all slides in small
//! proxy-sharing chunks, re-encodes each as an RGB JPEG and lays them out
//! one per page.
//!
//! ## Pipeline Overview
//!
//! ```text
//! viewer URL
//!  │
//!  ├─ 1. Input      validate / decode the address, download the page
//!  ├─ 2. Extract    title, slide count, widest srcset entry
//!  ├─ 3. Template   `-1-<width>` → `-SLIDE_NUMBER-<width>`
//!  ├─ 4. Fetch      chunks of 4, one proxy per chunk, fail fast
//!  ├─ 5. Normalize  any image → RGB JPEG (spawn_blocking)
//!  └─ 6. Assemble   page size from slide 1 at 72 px/inch → .pptx bytes
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use slidedeck_dl::{download, DeckConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = DeckConfig::default();
//!     let output = download("https://www.slideshare.net/someone/deck", &config).await?;
//!     std::fs::write("deck.pptx", &output.bytes)?;
//!     eprintln!("{} slides in {}ms", output.stats.slide_count, output.stats.total_duration_ms);
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature  | Default | Description |
//! |----------|---------|-------------|
//! | `cli`    | on      | Enables the `deckdl` binary (clap + anyhow + tracing-subscriber + indicatif) |
//! | `server` | on      | Enables [`server`], the HTTP surface (axum + tower-http) |
//!
//! Disable both when using only the library:
//! ```toml
//! slidedeck-dl = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod convert;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod pptx;
pub mod progress;
pub mod proxy;
#[cfg(feature = "server")]
pub mod server;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{DeckConfig, DeckConfigBuilder, ProxyConfig, Scheduling};
pub use convert::{download, download_sync, download_to_file, fetch_slide, inspect};
pub use error::DeckError;
pub use output::{DeckMetadata, DeckOutput, DownloadStats};
pub use pipeline::extract::{Lookup, SlideImageVariant};
pub use pipeline::input::decode_deck_url;
pub use pipeline::normalize::NormalizedImage;
pub use pipeline::template::SlideUrlTemplate;
pub use progress::{DownloadProgressCallback, NoopProgressCallback, ProgressCallback};
pub use proxy::{DirectConnection, FreeProxyList, ProxyPool, ProxySource};

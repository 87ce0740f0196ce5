//! Configuration types for deck downloads.
//!
//! All download behaviour is controlled through [`DeckConfig`], built via its
//! [`DeckConfigBuilder`]. The proxy switch lives here as an explicit value;
//! nothing inside the pipeline reads process environment.

use crate::error::DeckError;
use crate::progress::ProgressCallback;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Default listing scraped by [`ProxyConfig::FreeList`].
pub const DEFAULT_FREE_PROXY_LIST_URL: &str = "https://free-proxy-list.net/";

/// Configuration for a deck download.
///
/// Built via [`DeckConfig::builder()`] or using [`DeckConfig::default()`].
///
/// # Example
/// ```rust
/// use slidedeck_dl::{DeckConfig, Scheduling};
///
/// let config = DeckConfig::builder()
///     .chunk_width(4)
///     .scheduling(Scheduling::ChunkBarrier)
///     .slide_timeout_secs(20)
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct DeckConfig {
    /// Number of slides fetched concurrently, and the size of each proxy
    /// group. Default: 4.
    pub chunk_width: usize,

    /// How chunks are executed. Default: [`Scheduling::Rolling`].
    pub scheduling: Scheduling,

    /// Where outbound proxies come from. Default: [`ProxyConfig::Disabled`].
    pub proxy: ProxyConfig,

    /// Timeout for downloading the viewer page in seconds. Default: 30.
    pub page_timeout_secs: u64,

    /// Timeout for each slide image request in seconds. Default: 30.
    ///
    /// A hung fetch would otherwise block its chunk and therefore the whole
    /// request.
    pub slide_timeout_secs: u64,

    /// Upper bound on a single slide image body. Default: 32 MiB.
    pub max_slide_bytes: u64,

    /// JPEG quality used when normalising slides (1–100). Default: 75.
    pub jpeg_quality: u8,

    /// Heuristic used for `estimated_seconds` in [`crate::DeckMetadata`]. Default: 2.
    pub seconds_per_slide: u64,

    /// `User-Agent` header sent with every request.
    pub user_agent: String,

    /// Optional per-slide progress events.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for DeckConfig {
    fn default() -> Self {
        Self {
            chunk_width: 4,
            scheduling: Scheduling::default(),
            proxy: ProxyConfig::default(),
            page_timeout_secs: 30,
            slide_timeout_secs: 30,
            max_slide_bytes: 32 * 1024 * 1024,
            jpeg_quality: 75,
            seconds_per_slide: 2,
            user_agent: concat!("slidedeck-dl/", env!("CARGO_PKG_VERSION")).to_string(),
            progress_callback: None,
        }
    }
}

impl fmt::Debug for DeckConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeckConfig")
            .field("chunk_width", &self.chunk_width)
            .field("scheduling", &self.scheduling)
            .field("proxy", &self.proxy)
            .field("page_timeout_secs", &self.page_timeout_secs)
            .field("slide_timeout_secs", &self.slide_timeout_secs)
            .field("max_slide_bytes", &self.max_slide_bytes)
            .field("jpeg_quality", &self.jpeg_quality)
            .field("seconds_per_slide", &self.seconds_per_slide)
            .field("user_agent", &self.user_agent)
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<dyn DownloadProgressCallback>"),
            )
            .finish()
    }
}

impl DeckConfig {
    /// Create a new builder for `DeckConfig`.
    pub fn builder() -> DeckConfigBuilder {
        DeckConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`DeckConfig`].
pub struct DeckConfigBuilder {
    config: DeckConfig,
}

impl fmt::Debug for DeckConfigBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeckConfigBuilder")
            .field("config", &self.config)
            .finish()
    }
}

impl DeckConfigBuilder {
    pub fn chunk_width(mut self, n: usize) -> Self {
        self.config.chunk_width = n;
        self
    }

    pub fn scheduling(mut self, scheduling: Scheduling) -> Self {
        self.config.scheduling = scheduling;
        self
    }

    pub fn proxy(mut self, proxy: ProxyConfig) -> Self {
        self.config.proxy = proxy;
        self
    }

    pub fn page_timeout_secs(mut self, secs: u64) -> Self {
        self.config.page_timeout_secs = secs;
        self
    }

    pub fn slide_timeout_secs(mut self, secs: u64) -> Self {
        self.config.slide_timeout_secs = secs;
        self
    }

    pub fn max_slide_bytes(mut self, bytes: u64) -> Self {
        self.config.max_slide_bytes = bytes;
        self
    }

    pub fn jpeg_quality(mut self, quality: u8) -> Self {
        self.config.jpeg_quality = quality;
        self
    }

    pub fn seconds_per_slide(mut self, secs: u64) -> Self {
        self.config.seconds_per_slide = secs;
        self
    }

    pub fn user_agent(mut self, ua: impl Into<String>) -> Self {
        self.config.user_agent = ua.into();
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<DeckConfig, DeckError> {
        let c = &self.config;
        if c.chunk_width == 0 {
            return Err(DeckError::InvalidConfig("Chunk width must be ≥ 1".into()));
        }
        if !(1..=100).contains(&c.jpeg_quality) {
            return Err(DeckError::InvalidConfig(format!(
                "JPEG quality must be 1–100, got {}",
                c.jpeg_quality
            )));
        }
        if c.page_timeout_secs == 0 || c.slide_timeout_secs == 0 {
            return Err(DeckError::InvalidConfig("Timeouts must be ≥ 1 second".into()));
        }
        if let ProxyConfig::Pool(ref proxies) = c.proxy {
            if proxies.is_empty() {
                return Err(DeckError::InvalidConfig(
                    "Proxy pool must contain at least one proxy".into(),
                ));
            }
            if let Some(bad) = proxies.iter().find(|p| reqwest::Proxy::all(p.as_str()).is_err()) {
                return Err(DeckError::InvalidConfig(format!("Invalid proxy URL '{bad}'")));
            }
        }
        Ok(self.config)
    }
}

// ── Enums ────────────────────────────────────────────────────────────────

/// How the fetch scheduler executes chunks.
///
/// Both modes group slides into consecutive chunks of `chunk_width` and use
/// one proxy per chunk; they differ only in when the next chunk may start.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Scheduling {
    /// A fixed-width pool: a new slide starts as soon as any in-flight slide
    /// finishes, even if that crosses into the next chunk. (default)
    #[default]
    Rolling,
    /// One task per slide in the chunk, and every task of chunk `k` must
    /// finish before chunk `k + 1` starts.
    ChunkBarrier,
}

/// Where the fetch scheduler gets its egress proxies.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProxyConfig {
    /// Direct connections only. (default)
    #[default]
    Disabled,
    /// Rotate round-robin through a fixed list of proxy URLs.
    Pool(Vec<String>),
    /// Pick a random entry from a public free-proxy listing page.
    FreeList { list_url: String },
}

impl ProxyConfig {
    /// The free-list source pointed at [`DEFAULT_FREE_PROXY_LIST_URL`].
    pub fn free_list() -> Self {
        ProxyConfig::FreeList {
            list_url: DEFAULT_FREE_PROXY_LIST_URL.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_service_conventions() {
        let c = DeckConfig::default();
        assert_eq!(c.chunk_width, 4);
        assert_eq!(c.seconds_per_slide, 2);
        assert_eq!(c.scheduling, Scheduling::Rolling);
        assert_eq!(c.proxy, ProxyConfig::Disabled);
    }

    #[test]
    fn zero_chunk_width_is_rejected() {
        let err = DeckConfig::builder().chunk_width(0).build().unwrap_err();
        assert!(matches!(err, DeckError::InvalidConfig(_)));
    }

    #[test]
    fn jpeg_quality_is_validated() {
        assert!(DeckConfig::builder().jpeg_quality(0).build().is_err());
        assert!(DeckConfig::builder().jpeg_quality(90).build().is_ok());
    }

    #[test]
    fn empty_proxy_pool_is_rejected() {
        let err = DeckConfig::builder()
            .proxy(ProxyConfig::Pool(vec![]))
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("at least one proxy"));
    }

    #[test]
    fn free_list_uses_default_url() {
        match ProxyConfig::free_list() {
            ProxyConfig::FreeList { list_url } => assert_eq!(list_url, DEFAULT_FREE_PROXY_LIST_URL),
            other => panic!("unexpected {other:?}"),
        }
    }
}

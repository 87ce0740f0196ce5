//! Egress proxy sources for the fetch scheduler.
//!
//! The scheduler asks for one proxy per chunk and shares it among the
//! chunk's requests. Sources make no promise that a proxy works, or that two
//! calls return different proxies; a dead proxy shows up later as an
//! ordinary slide fetch failure.

use crate::config::{DeckConfig, ProxyConfig};
use crate::error::DeckError;
use async_trait::async_trait;
use once_cell::sync::Lazy;
use rand::seq::IndexedRandom;
use regex::Regex;
use scraper::{Html, Selector};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::{debug, info};

static ROWS: Lazy<Selector> = Lazy::new(|| Selector::parse("table tbody tr").unwrap());
static CELLS: Lazy<Selector> = Lazy::new(|| Selector::parse("td").unwrap());
static IPV4: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d{1,3}(\.\d{1,3}){3}$").unwrap());

/// How long a scraped free-proxy listing is reused before it is fetched again.
pub const FREE_LIST_REFRESH: Duration = Duration::from_secs(300);

/// Supplies an egress proxy on demand.
#[async_trait]
pub trait ProxySource: Send + Sync {
    /// The proxy URL to use for the next chunk, or `None` for a direct connection.
    async fn next_proxy(&self) -> Result<Option<String>, DeckError>;
}

/// Always connects directly.
#[derive(Debug, Default, Clone, Copy)]
pub struct DirectConnection;

#[async_trait]
impl ProxySource for DirectConnection {
    async fn next_proxy(&self) -> Result<Option<String>, DeckError> {
        Ok(None)
    }
}

/// Rotates round-robin through a fixed list of proxies.
#[derive(Debug)]
pub struct ProxyPool {
    proxies: Vec<String>,
    cursor: AtomicUsize,
}

impl ProxyPool {
    pub fn new(proxies: Vec<String>) -> Result<Self, DeckError> {
        if proxies.is_empty() {
            return Err(DeckError::InvalidConfig(
                "Proxy pool must contain at least one proxy".into(),
            ));
        }
        Ok(Self {
            proxies,
            cursor: AtomicUsize::new(0),
        })
    }
}

#[async_trait]
impl ProxySource for ProxyPool {
    async fn next_proxy(&self) -> Result<Option<String>, DeckError> {
        let n = self.cursor.fetch_add(1, Ordering::Relaxed);
        Ok(Some(self.proxies[n % self.proxies.len()].clone()))
    }
}

struct CachedListing {
    fetched_at: Instant,
    proxies: Vec<String>,
}

/// Picks a random proxy from a public free-proxy listing page.
///
/// The listing is scraped on first use and again once it is older than the
/// refresh interval.
pub struct FreeProxyList {
    client: reqwest::Client,
    list_url: String,
    cache: Mutex<Option<CachedListing>>,
}

impl FreeProxyList {
    pub fn new(list_url: impl Into<String>, timeout: Duration, user_agent: &str) -> Result<Self, DeckError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .build()
            .map_err(|e| DeckError::Internal(format!("Failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            list_url: list_url.into(),
            cache: Mutex::new(None),
        })
    }

    async fn fetch_listing(&self) -> Result<Vec<String>, DeckError> {
        let unavailable = |reason: String| DeckError::ProxyUnavailable { reason };

        let response = self
            .client
            .get(&self.list_url)
            .send()
            .await
            .map_err(|e| unavailable(format!("listing '{}': {e}", self.list_url)))?;
        if !response.status().is_success() {
            return Err(unavailable(format!(
                "listing '{}': HTTP {}",
                self.list_url,
                response.status()
            )));
        }
        let body = response
            .text()
            .await
            .map_err(|e| unavailable(format!("listing '{}': {e}", self.list_url)))?;

        let proxies = parse_proxy_listing(&body);
        info!("Loaded {} proxies from {}", proxies.len(), self.list_url);
        Ok(proxies)
    }
}

#[async_trait]
impl ProxySource for FreeProxyList {
    async fn next_proxy(&self) -> Result<Option<String>, DeckError> {
        let mut cache = self.cache.lock().await;

        let stale = cache
            .as_ref()
            .map_or(true, |c| c.proxies.is_empty() || c.fetched_at.elapsed() >= FREE_LIST_REFRESH);
        if stale {
            let proxies = self.fetch_listing().await?;
            *cache = Some(CachedListing {
                fetched_at: Instant::now(),
                proxies,
            });
        }

        let picked = cache
            .as_ref()
            .and_then(|c| c.proxies.choose(&mut rand::rng()).cloned());
        match picked {
            Some(proxy) => {
                debug!("Selected proxy {}", proxy);
                Ok(Some(proxy))
            }
            None => Err(DeckError::ProxyUnavailable {
                reason: format!("listing '{}' contained no proxies", self.list_url),
            }),
        }
    }
}

/// Extract `http://ip:port` entries from a free-proxy listing table.
///
/// Rows whose first cell is not an IPv4 address or whose second cell is not
/// a port number are skipped.
pub fn parse_proxy_listing(html: &str) -> Vec<String> {
    let doc = Html::parse_document(html);
    doc.select(&ROWS)
        .filter_map(|row| {
            let mut cells = row.select(&CELLS).map(|c| c.text().collect::<String>());
            let ip = cells.next()?;
            let port = cells.next()?;
            let (ip, port) = (ip.trim(), port.trim());
            if !IPV4.is_match(ip) || port.parse::<u16>().is_err() {
                return None;
            }
            Some(format!("http://{ip}:{port}"))
        })
        .collect()
}

/// Materialise the configured proxy source.
pub fn proxy_source(config: &DeckConfig) -> Result<Arc<dyn ProxySource>, DeckError> {
    Ok(match &config.proxy {
        ProxyConfig::Disabled => Arc::new(DirectConnection),
        ProxyConfig::Pool(proxies) => Arc::new(ProxyPool::new(proxies.clone())?),
        ProxyConfig::FreeList { list_url } => Arc::new(FreeProxyList::new(
            list_url.clone(),
            Duration::from_secs(config.page_timeout_secs),
            &config.user_agent,
        )?),
    })
}
